//! Entity schema: declared fields validated and compiled into SQL templates once per type.

use crate::error::SchemaError;
use crate::orm::field::Field;
use crate::sql::SqlTemplates;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// What an entity type declares: its name, optional table override, and fields in order.
#[derive(Clone, Debug)]
pub struct SchemaDef {
    pub name: String,
    pub table: Option<String>,
    pub fields: Vec<Field>,
}

impl SchemaDef {
    pub fn new(name: impl Into<String>) -> Self {
        SchemaDef {
            name: name.into(),
            table: None,
            fields: Vec::new(),
        }
    }

    /// Named after the last path segment of `T`'s type name.
    pub fn of<T: ?Sized>() -> Self {
        let full = std::any::type_name::<T>();
        let base = full.split('<').next().unwrap_or(full);
        Self::new(base.rsplit("::").next().unwrap_or(base))
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }
}

/// Compiled mapping metadata. Immutable once derived.
#[derive(Clone, Debug)]
pub struct EntitySchema {
    pub entity: String,
    pub table: String,
    pub primary_key: Field,
    /// Non-key fields in declaration order.
    pub fields: Vec<Field>,
    pub templates: SqlTemplates,
}

impl EntitySchema {
    pub fn derive(def: SchemaDef) -> Result<Self, SchemaError> {
        let SchemaDef { name, table, fields } = def;
        let mut seen = HashSet::new();
        let mut primary_key: Option<Field> = None;
        let mut others = Vec::with_capacity(fields.len());
        for f in fields {
            if !seen.insert(f.name.clone()) {
                return Err(SchemaError::DuplicateField {
                    entity: name,
                    field: f.name,
                });
            }
            tracing::debug!(entity = %name, field = %f.name, sql_type = %f.sql_type, pk = f.primary_key, "found mapping");
            if f.primary_key {
                if primary_key.is_some() {
                    return Err(SchemaError::DuplicatePrimaryKey {
                        entity: name,
                        field: f.name,
                    });
                }
                primary_key = Some(f);
            } else {
                others.push(f);
            }
        }
        let primary_key = primary_key.ok_or_else(|| SchemaError::NoPrimaryKey(name.clone()))?;
        let table = table.unwrap_or_else(|| name.clone());
        let non_key: Vec<String> = others.iter().map(|f| f.name.clone()).collect();
        let templates = SqlTemplates::compile(&table, &primary_key.name, &non_key);
        tracing::info!(entity = %name, table = %table, "found model");
        Ok(EntitySchema {
            entity: name,
            table,
            primary_key,
            fields: others,
            templates,
        })
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        if self.primary_key.name == name {
            return Some(&self.primary_key);
        }
        self.fields.iter().find(|f| f.name == name)
    }

    /// Set value for `name`, or the field's default when unset (missing or null).
    /// A resolved default is written back into `values`.
    pub fn value_or_default(&self, values: &mut Map<String, Value>, name: &str) -> Value {
        if let Some(v) = values.get(name).filter(|v| !v.is_null()) {
            return v.clone();
        }
        let Some(field) = self.field(name) else {
            return Value::Null;
        };
        match field.default.resolve() {
            Some(v) => {
                tracing::debug!(field = %name, value = %v, "using default value");
                values.insert(name.to_string(), v.clone());
                v
            }
            None => Value::Null,
        }
    }

    /// Args for the insert template: non-key values (defaults applied), then the primary key.
    pub fn insert_args(&self, values: &mut Map<String, Value>) -> Vec<Value> {
        let mut args: Vec<Value> = self
            .fields
            .iter()
            .map(|f| self.value_or_default(values, &f.name))
            .collect();
        args.push(self.value_or_default(values, &self.primary_key.name));
        args
    }

    /// Args for the update template: non-key values as set, then the primary key.
    pub fn update_args(&self, values: &Map<String, Value>) -> Vec<Value> {
        let get = |name: &str| values.get(name).cloned().unwrap_or(Value::Null);
        let mut args: Vec<Value> = self.fields.iter().map(|f| get(&f.name)).collect();
        args.push(get(&self.primary_key.name));
        args
    }

    pub fn primary_key_value(&self, values: &Map<String, Value>) -> Value {
        values.get(&self.primary_key.name).cloned().unwrap_or(Value::Null)
    }
}
