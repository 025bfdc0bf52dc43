//! Blog site entities.

use blogkit::orm::SqlType;
use blogkit::{next_id, now_ts, Entity, Field, SchemaDef};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct User {
    pub id: Option<String>,
    pub email: Option<String>,
    pub passwd: Option<String>,
    pub admin: Option<bool>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub created_at: Option<f64>,
}

impl Entity for User {
    fn schema() -> SchemaDef {
        SchemaDef::of::<Self>()
            .table("users")
            .field(Field::string("id").primary_key().default_with(next_id))
            .field(Field::string("email"))
            .field(Field::string("passwd"))
            .field(Field::boolean("admin"))
            .field(Field::string("name"))
            .field(Field::string("image").sql_type(SqlType::Varchar(500)))
            .field(Field::float("created_at").default_with(now_ts))
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Blog {
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub user_image: Option<String>,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub created_at: Option<f64>,
}

impl Entity for Blog {
    fn schema() -> SchemaDef {
        SchemaDef::of::<Self>()
            .table("blogs")
            .field(Field::string("id").primary_key().default_with(next_id))
            .field(Field::string("user_id"))
            .field(Field::string("user_name"))
            .field(Field::string("user_image").sql_type(SqlType::Varchar(500)))
            .field(Field::string("name"))
            .field(Field::string("summary").sql_type(SqlType::Varchar(200)))
            .field(Field::text("content"))
            .field(Field::float("created_at").default_with(now_ts))
    }
}
