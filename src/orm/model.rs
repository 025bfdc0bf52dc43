//! Entity registry and CRUD against the pool.

use crate::error::{OrmError, SchemaError};
use crate::orm::schema::{EntitySchema, SchemaDef};
use crate::pool::Pool;
use crate::sql::{select_all, select_number, FindAll};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A mapped record type. Unset fields serialize as `null` (use `Option`).
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn schema() -> SchemaDef;
}

/// Owns the pool handle and the compiled schema of every registered entity type.
pub struct Orm {
    pool: Pool,
    schemas: RwLock<HashMap<TypeId, Arc<EntitySchema>>>,
}

impl Orm {
    pub fn new(pool: Pool) -> Self {
        Orm {
            pool,
            schemas: RwLock::new(HashMap::new()),
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Derive and cache `T`'s schema. Registering the same type again returns the cached schema.
    pub fn register<T: Entity>(&self) -> Result<Arc<EntitySchema>, SchemaError> {
        if let Ok(schema) = self.schema::<T>() {
            return Ok(schema);
        }
        let schema = Arc::new(EntitySchema::derive(T::schema())?);
        let mut schemas = self.schemas.write().unwrap_or_else(|e| e.into_inner());
        Ok(schemas.entry(TypeId::of::<T>()).or_insert(schema).clone())
    }

    pub fn schema<T: Entity>(&self) -> Result<Arc<EntitySchema>, SchemaError> {
        let schemas = self.schemas.read().unwrap_or_else(|e| e.into_inner());
        schemas
            .get(&TypeId::of::<T>())
            .cloned()
            .ok_or(SchemaError::Unregistered(std::any::type_name::<T>()))
    }

    /// Fetch by primary key.
    pub async fn find<T: Entity>(&self, pk: impl Into<Value> + Send) -> Result<Option<T>, OrmError> {
        let schema = self.schema::<T>()?;
        let mut rows = self.pool.query(&schema.templates.find, &[pk.into()], Some(1)).await?;
        match rows.pop() {
            Some(row) => Ok(Some(from_row(row)?)),
            None => Ok(None),
        }
    }

    pub async fn find_all<T: Entity>(&self, opts: &FindAll) -> Result<Vec<T>, OrmError> {
        let schema = self.schema::<T>()?;
        let q = select_all(&schema.templates.select, opts)?;
        let rows = self.pool.query(&q.sql, &q.params, None).await?;
        rows.into_iter().map(from_row).collect()
    }

    /// Scalar from `select <select_expr> as _num_ from <table> [where ...]`, or None when no row.
    pub async fn find_number<T: Entity>(
        &self,
        select_expr: &str,
        where_: Option<&str>,
        args: &[Value],
    ) -> Result<Option<Value>, OrmError> {
        let schema = self.schema::<T>()?;
        let q = select_number(&schema.templates.from, select_expr, where_, args);
        let mut rows = self.pool.query(&q.sql, &q.params, Some(1)).await?;
        Ok(rows.pop().and_then(|mut r| r.remove("_num_")))
    }

    /// Insert. Unset fields take their defaults, which are also written back onto `entity`.
    pub async fn save<T: Entity>(&self, entity: &mut T) -> Result<(), OrmError> {
        let schema = self.schema::<T>()?;
        let args = prepare_insert(&schema, entity)?;
        let rows = self.pool.execute(&schema.templates.insert, &args, self.pool.autocommit()).await?;
        if rows != 1 {
            tracing::warn!(table = %schema.table, affected = rows, "failed to insert record: affected rows != 1");
        }
        Ok(())
    }

    pub async fn update<T: Entity>(&self, entity: &T) -> Result<(), OrmError> {
        let schema = self.schema::<T>()?;
        let values = to_map(entity)?;
        let args = schema.update_args(&values);
        let rows = self.pool.execute(&schema.templates.update, &args, self.pool.autocommit()).await?;
        if rows != 1 {
            tracing::warn!(table = %schema.table, affected = rows, "failed to update by primary key: affected rows != 1");
        }
        Ok(())
    }

    pub async fn remove<T: Entity>(&self, entity: &T) -> Result<(), OrmError> {
        let schema = self.schema::<T>()?;
        let values = to_map(entity)?;
        let args = [schema.primary_key_value(&values)];
        let rows = self.pool.execute(&schema.templates.delete, &args, self.pool.autocommit()).await?;
        if rows != 1 {
            tracing::warn!(table = %schema.table, affected = rows, "failed to remove by primary key: affected rows != 1");
        }
        Ok(())
    }
}

/// Collect insert args for `entity`, writing resolved defaults back onto it.
pub fn prepare_insert<T: Entity>(schema: &EntitySchema, entity: &mut T) -> Result<Vec<Value>, OrmError> {
    let mut values = to_map(entity)?;
    let args = schema.insert_args(&mut values);
    *entity = serde_json::from_value(Value::Object(values))?;
    Ok(args)
}

fn to_map<T: Entity>(entity: &T) -> Result<Map<String, Value>, OrmError> {
    match serde_json::to_value(entity)? {
        Value::Object(m) => Ok(m),
        _ => Err(OrmError::NotAnObject),
    }
}

fn from_row<T: Entity>(row: Map<String, Value>) -> Result<T, OrmError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// Call-site sugar: `User::find(&orm, id)`, `user.save(&orm)`.
#[async_trait]
pub trait Model: Entity + Sized {
    async fn find<K: Into<Value> + Send>(orm: &Orm, pk: K) -> Result<Option<Self>, OrmError> {
        orm.find::<Self>(pk).await
    }

    async fn find_all(orm: &Orm, opts: &FindAll) -> Result<Vec<Self>, OrmError> {
        orm.find_all::<Self>(opts).await
    }

    async fn find_number(
        orm: &Orm,
        select_expr: &str,
        where_: Option<&str>,
        args: &[Value],
    ) -> Result<Option<Value>, OrmError> {
        orm.find_number::<Self>(select_expr, where_, args).await
    }

    async fn save(&mut self, orm: &Orm) -> Result<(), OrmError> {
        orm.save(self).await
    }

    async fn update(&self, orm: &Orm) -> Result<(), OrmError> {
        orm.update(self).await
    }

    async fn remove(&self, orm: &Orm) -> Result<(), OrmError> {
        orm.remove(self).await
    }
}

impl<T: Entity> Model for T {}
