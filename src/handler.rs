//! Handler abstraction: a named async function over bound arguments.

use crate::binding::{BindingSpec, RequestContext};
use crate::error::{AppError, BindingError};
use crate::response::Reply;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

/// Arguments bound for one call. Lookups fall back to the declared keyword default.
#[derive(Debug)]
pub struct Args {
    values: Map<String, Value>,
    request: Option<RequestContext>,
    spec: Arc<BindingSpec>,
}

impl Args {
    pub fn new(values: Map<String, Value>, request: Option<RequestContext>, spec: Arc<BindingSpec>) -> Self {
        Args { values, request, spec }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).or_else(|| self.spec.default_for(name))
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Bound string value; a missing argument is a binding error.
    pub fn required_str(&self, name: &str) -> Result<&str, AppError> {
        self.str(name)
            .ok_or_else(|| BindingError::MissingArgument(name.to_string()).into())
    }

    /// Deserialize one argument. Form and query values arrive as strings.
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, AppError> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => serde_json::from_value(v.clone())
                .map(Some)
                .map_err(|e| BindingError::InvalidBody(format!("{name}: {e}")).into()),
        }
    }

    /// The request context, present when the handler declared it.
    pub fn request(&self) -> Option<&RequestContext> {
        self.request.as_ref()
    }

    /// Values actually bound from the request, without defaults.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }

    pub fn spec(&self) -> &BindingSpec {
        &self.spec
    }
}

#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, args: Args) -> Result<Reply, AppError>;
}

#[async_trait]
impl<F, Fut, R> Handler for F
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, AppError>> + Send + 'static,
    R: Into<Reply> + 'static,
{
    async fn call(&self, args: Args) -> Result<Reply, AppError> {
        (self)(args).await.map(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Param;
    use serde_json::json;

    fn args(values: Value, params: Vec<Param>) -> Args {
        let spec = Arc::new(BindingSpec::derive("h", params).unwrap());
        Args::new(values.as_object().cloned().unwrap(), None, spec)
    }

    #[test]
    fn falls_back_to_declared_default() {
        let a = args(json!({}), vec![Param::keyword_or("page", "1")]);
        assert_eq!(a.str("page"), Some("1"));
        assert!(a.values().is_empty());
    }

    #[test]
    fn parse_and_required() {
        let a = args(json!({ "n": 3, "s": "x" }), vec![Param::catchall("kw")]);
        assert_eq!(a.parse::<i64>("n").unwrap(), Some(3));
        assert_eq!(a.parse::<i64>("missing").unwrap(), None);
        assert!(a.parse::<i64>("s").is_err());
        assert_eq!(a.required_str("s").unwrap(), "x");
        assert!(matches!(
            a.required_str("nope"),
            Err(AppError::Binding(BindingError::MissingArgument(_)))
        ));
    }

    #[tokio::test]
    async fn closures_are_handlers() {
        let h = |a: Args| async move { Ok::<_, AppError>(json!({ "echo": a.str("s") })) };
        let reply = Handler::call(&h, args(json!({ "s": "hi" }), vec![Param::catchall("kw")]))
            .await
            .unwrap();
        assert!(matches!(reply, Reply::Json(v) if v == json!({ "echo": "hi" })));
    }
}
