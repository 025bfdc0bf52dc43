//! Declarative mapper: fields, compiled schemas, CRUD.

pub mod field;
pub mod model;
pub mod schema;

pub use field::{next_id, now_ts, Field, FieldDefault, SqlType};
pub use model::{prepare_insert, Entity, Model, Orm};
pub use schema::{EntitySchema, SchemaDef};
