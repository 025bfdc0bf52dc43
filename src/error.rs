//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Startup and registration failures. Never recovered.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing database setting: {0}")]
    MissingCredential(&'static str),
    #[error("invalid setting {key}: {message}")]
    InvalidSetting { key: String, message: String },
    #[error("handler '{0}' has no HTTP method; register it with get() or post()")]
    MissingMethod(String),
    #[error("handler '{0}' has no path")]
    MissingPath(String),
    #[error("request parameter must be the last positional parameter in handler: {0}")]
    ContextPosition(String),
    #[error("positional-only parameter '{param}' cannot be bound in handler: {handler}")]
    PositionalOnly { handler: String, param: String },
    #[error("duplicate parameter '{param}' in handler: {handler}")]
    DuplicateParameter { handler: String, param: String },
    #[error("route {method} {path} is already registered")]
    DuplicateRoute { method: String, path: String },
    #[error("config load: {0}")]
    Load(String),
}

/// Entity registration failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    #[error("primary key not found for {0}")]
    NoPrimaryKey(String),
    #[error("duplicate primary key for {entity}: {field}")]
    DuplicatePrimaryKey { entity: String, field: String },
    #[error("duplicate field {field} on {entity}")]
    DuplicateField { entity: String, field: String },
    #[error("entity not registered: {0}")]
    Unregistered(&'static str),
}

/// Mapper failures raised before or after a statement runs.
#[derive(Error, Debug)]
pub enum OrmError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("invalid limit value: {0}")]
    InvalidLimit(String),
    #[error("entity is not a JSON object")]
    NotAnObject,
    #[error("row does not match entity: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

/// Request could not be turned into handler arguments.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BindingError {
    #[error("Missing Content-Type")]
    MissingContentType,
    #[error("Unsupported Content-Type: {0}")]
    UnsupportedContentType(String),
    #[error("JSON body must be object.")]
    JsonNotObject,
    #[error("Invalid body: {0}")]
    InvalidBody(String),
    #[error("Missing argument: {0}")]
    MissingArgument(String),
    #[error("Invalid path parameter: {0}")]
    InvalidPathParam(String),
    #[error("Request body too large")]
    PayloadTooLarge,
}

/// Business error raised on purpose by a handler. Rendered as a structured body, never as a fault page.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: String,
    pub data: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, data: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError {
            code: code.into(),
            data: data.into(),
            message: message.into(),
        }
    }

    pub fn value_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::new("value:invalid", field, message)
    }

    pub fn not_found(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::new("value:notfound", field, message)
    }

    pub fn permission(message: impl Into<String>) -> Self {
        ApiError::new("permission:forbidden", "permission", message)
    }

    /// Mapping handed back to the client in place of the handler's result.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "error": self.code,
            "data": self.data,
            "message": self.message,
        })
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Orm(OrmError),
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("internal: {0}")]
    Internal(String),
}

impl From<OrmError> for AppError {
    fn from(e: OrmError) -> Self {
        match e {
            OrmError::Db(db) => AppError::Db(db),
            OrmError::Schema(s) => AppError::Schema(s),
            other => AppError::Orm(other),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Api(e) => return (StatusCode::OK, Json(e.to_value())).into_response(),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Schema(_) => (StatusCode::INTERNAL_SERVER_ERROR, "schema_error"),
            AppError::Orm(OrmError::InvalidLimit(_)) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Orm(_) => (StatusCode::INTERNAL_SERVER_ERROR, "orm_error"),
            AppError::Binding(BindingError::PayloadTooLarge) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            AppError::Binding(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
