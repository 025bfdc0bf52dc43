//! Turns an HTTP request into the named arguments a handler declared.

pub mod body;
pub mod context;
pub mod spec;

pub use context::RequestContext;
pub use spec::{BindingSpec, Param, ParamKind, CONTEXT_PARAM};

use crate::error::BindingError;
use crate::handler::Args;
use axum::{
    body::Body,
    http::{request::Parts, Method},
};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Build handler arguments from the request parts, its body and the matched path params.
///
/// The body is read only for POST and the query string only for GET, and only when the
/// handler takes keyword arguments. Path params always win over body or query values.
pub async fn bind(
    spec: &Arc<BindingSpec>,
    parts: Parts,
    body: Body,
    path_params: Vec<(String, String)>,
) -> Result<Args, BindingError> {
    let mut keywords: Option<Map<String, Value>> = None;
    if spec.wants_keywords() {
        if parts.method == Method::POST {
            keywords = Some(body::read_body(&parts, body).await?);
        } else if parts.method == Method::GET {
            if let Some(q) = parts.uri.query().filter(|q| !q.is_empty()) {
                tracing::trace!(handler = %spec.handler, query = %q, "binding query string");
                keywords = Some(body::read_query(&parts.uri)?);
            }
        }
    }

    let mut values = match keywords {
        None => path_params
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect::<Map<String, Value>>(),
        Some(mut kw) => {
            if !spec.has_catchall && !spec.named_keywords.is_empty() {
                kw.retain(|k, _| spec.is_named(k));
            }
            for (k, v) in &path_params {
                if kw.contains_key(k) {
                    tracing::warn!(handler = %spec.handler, arg = %k, "duplicate arg name in named arg and kw args");
                }
                kw.insert(k.clone(), Value::String(v.clone()));
            }
            kw
        }
    };

    let request = if spec.has_context {
        values.remove(CONTEXT_PARAM);
        Some(RequestContext::new(parts, path_params))
    } else {
        None
    };

    if let Some(missing) = spec.required_keywords.iter().find(|name| !values.contains_key(name.as_str())) {
        return Err(BindingError::MissingArgument(missing.clone()));
    }

    tracing::debug!(handler = %spec.handler, args = ?values.keys().collect::<Vec<_>>(), "call with args");
    Ok(Args::new(values, request, spec.clone()))
}
