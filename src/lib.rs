//! blogkit: explicit route registration with argument binding, and a MySQL micro-ORM.

pub mod binding;
pub mod config;
pub mod error;
pub mod handler;
pub mod orm;
pub mod pool;
pub mod response;
pub mod routes;
pub mod sql;
pub mod state;
pub mod telemetry;

pub use binding::{BindingSpec, Param, RequestContext};
pub use config::{AppConfig, DbConfig, ServerConfig};
pub use error::{ApiError, AppError, BindingError, ConfigError, OrmError, SchemaError};
pub use handler::{Args, Handler};
pub use orm::{next_id, now_ts, Entity, Field, Model, Orm, SchemaDef};
pub use pool::Pool;
pub use response::Reply;
pub use routes::{common_routes, common_routes_with_ready, get, post, Endpoint, HttpMethod, RouteTable};
pub use sql::FindAll;
pub use state::AppState;
pub use telemetry::init_tracing;
