//! Handler results and how they become HTTP responses.

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

/// Prefix that turns a plain string result into a redirect.
pub const REDIRECT_PREFIX: &str = "redirect:";

#[derive(Debug)]
pub enum Reply {
    /// JSON document, 200.
    Json(Value),
    /// `text/html`, 200.
    Html(String),
    /// `text/plain`, 200.
    Text(String),
    /// 302 to the given location.
    Redirect(String),
    /// Passed through unchanged.
    Response(Response),
}

impl Reply {
    pub fn json<T: Serialize>(data: &T) -> Result<Self, serde_json::Error> {
        Ok(Reply::Json(serde_json::to_value(data)?))
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Reply::Redirect(location.into())
    }
}

impl From<Value> for Reply {
    fn from(v: Value) -> Self {
        Reply::Json(v)
    }
}

impl From<Map<String, Value>> for Reply {
    fn from(m: Map<String, Value>) -> Self {
        Reply::Json(Value::Object(m))
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        match s.strip_prefix(REDIRECT_PREFIX) {
            Some(location) => Reply::Redirect(location.trim().to_string()),
            None => Reply::Text(s),
        }
    }
}

impl From<&'static str> for Reply {
    fn from(s: &'static str) -> Self {
        Reply::from(s.to_string())
    }
}

impl From<Html<String>> for Reply {
    fn from(h: Html<String>) -> Self {
        Reply::Html(h.0)
    }
}

impl From<Response> for Reply {
    fn from(r: Response) -> Self {
        Reply::Response(r)
    }
}

impl From<StatusCode> for Reply {
    fn from(status: StatusCode) -> Self {
        Reply::Response(status.into_response())
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Json(v) => Json(v).into_response(),
            Reply::Html(s) => Html(s).into_response(),
            Reply::Text(s) => s.into_response(),
            Reply::Redirect(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
            Reply::Response(r) => r,
        }
    }
}
