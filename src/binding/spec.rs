//! Per-handler parameter declaration, classified once at registration.

use crate::error::ConfigError;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Reserved name of the request context parameter.
pub const CONTEXT_PARAM: &str = "request";

#[derive(Clone, Debug, PartialEq)]
pub enum ParamKind {
    /// Cannot be passed by name, so it can never be bound.
    PositionalOnly,
    /// Positional-or-keyword; bound by name, normally from a path placeholder.
    Positional,
    /// The request context.
    Context,
    /// Keyword-only. Required when there is no default.
    Keyword { default: Option<Value> },
    /// Accepts any additional named argument.
    Catchall,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
}

impl Param {
    pub fn positional(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::Positional,
        }
    }

    pub fn positional_only(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::PositionalOnly,
        }
    }

    pub fn request() -> Self {
        Param {
            name: CONTEXT_PARAM.into(),
            kind: ParamKind::Context,
        }
    }

    /// Required keyword-only parameter.
    pub fn keyword(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::Keyword { default: None },
        }
    }

    /// Keyword-only parameter with a default.
    pub fn keyword_or(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::Keyword {
                default: Some(default.into()),
            },
        }
    }

    pub fn catchall(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::Catchall,
        }
    }

    fn is_keyword_like(&self) -> bool {
        matches!(self.kind, ParamKind::Keyword { .. } | ParamKind::Catchall)
    }
}

/// What the binder needs to know about one handler.
#[derive(Clone, Debug, Default)]
pub struct BindingSpec {
    pub handler: String,
    pub params: Vec<Param>,
    pub has_context: bool,
    pub has_catchall: bool,
    /// Keyword-only names in declaration order.
    pub named_keywords: Vec<String>,
    /// Keyword-only names without default, in declaration order.
    pub required_keywords: Vec<String>,
    defaults: HashMap<String, Value>,
}

impl BindingSpec {
    pub fn derive(handler: &str, params: Vec<Param>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        let mut spec = BindingSpec {
            handler: handler.to_string(),
            ..Default::default()
        };
        let mut keyword_seen = false;
        let mut context_seen = false;
        for p in &params {
            if !seen.insert(p.name.as_str()) {
                return Err(ConfigError::DuplicateParameter {
                    handler: handler.to_string(),
                    param: p.name.clone(),
                });
            }
            // The context must sit in the last positional slot: no keyword before it, no positional after it.
            let named_context = p.name == CONTEXT_PARAM || p.kind == ParamKind::Context;
            if named_context && (keyword_seen || p.kind != ParamKind::Context) {
                return Err(ConfigError::ContextPosition(describe(handler, &params)));
            }
            if context_seen && !p.is_keyword_like() {
                return Err(ConfigError::ContextPosition(describe(handler, &params)));
            }
            match &p.kind {
                ParamKind::PositionalOnly => {
                    return Err(ConfigError::PositionalOnly {
                        handler: handler.to_string(),
                        param: p.name.clone(),
                    });
                }
                ParamKind::Positional => {}
                ParamKind::Context => {
                    context_seen = true;
                    spec.has_context = true;
                }
                ParamKind::Keyword { default } => {
                    keyword_seen = true;
                    spec.named_keywords.push(p.name.clone());
                    match default {
                        Some(v) => {
                            spec.defaults.insert(p.name.clone(), v.clone());
                        }
                        None => spec.required_keywords.push(p.name.clone()),
                    }
                }
                ParamKind::Catchall => {
                    keyword_seen = true;
                    spec.has_catchall = true;
                }
            }
        }
        spec.params = params;
        Ok(spec)
    }

    /// True when the handler takes any keyword argument, i.e. the body or query string matters.
    pub fn wants_keywords(&self) -> bool {
        self.has_catchall || !self.named_keywords.is_empty() || !self.required_keywords.is_empty()
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.named_keywords.iter().any(|n| n == name)
    }

    pub fn default_for(&self, name: &str) -> Option<&Value> {
        self.defaults.get(name)
    }

    /// Positional parameters other than the context, bound by name.
    pub fn positional_names(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(|p| p.kind == ParamKind::Positional)
            .map(|p| p.name.as_str())
    }

    /// `name(a, request, *, b, c='1', **kw)`.
    pub fn signature(&self) -> String {
        describe(&self.handler, &self.params)
    }
}

fn describe(handler: &str, params: &[Param]) -> String {
    let mut parts = Vec::with_capacity(params.len() + 1);
    let mut star = false;
    for p in params {
        match &p.kind {
            ParamKind::PositionalOnly | ParamKind::Positional | ParamKind::Context => parts.push(p.name.clone()),
            ParamKind::Keyword { default } => {
                if !star {
                    parts.push("*".into());
                    star = true;
                }
                match default {
                    Some(v) => parts.push(format!("{}={}", p.name, v)),
                    None => parts.push(p.name.clone()),
                }
            }
            ParamKind::Catchall => parts.push(format!("**{}", p.name)),
        }
    }
    format!("{}({})", handler, parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_parameters() {
        let spec = BindingSpec::derive(
            "api_create_blog",
            vec![
                Param::request(),
                Param::keyword("name"),
                Param::keyword_or("summary", ""),
                Param::keyword("content"),
            ],
        )
        .unwrap();
        assert!(spec.has_context);
        assert!(!spec.has_catchall);
        assert_eq!(spec.named_keywords, ["name", "summary", "content"]);
        assert_eq!(spec.required_keywords, ["name", "content"]);
        assert_eq!(spec.default_for("summary"), Some(&json!("")));
        assert!(spec.wants_keywords());
        assert_eq!(spec.signature(), "api_create_blog(request, *, name, summary=\"\", content)");
    }

    #[test]
    fn context_before_keywords_registers() {
        let spec = BindingSpec::derive("get_blog", vec![Param::request(), Param::keyword("id")]).unwrap();
        assert!(spec.has_context);
        assert_eq!(spec.required_keywords, ["id"]);
    }

    #[test]
    fn context_after_keywords_is_rejected() {
        let err = BindingSpec::derive("get_blog", vec![Param::keyword("id"), Param::request()]).unwrap_err();
        assert!(matches!(err, ConfigError::ContextPosition(_)));
        let err = BindingSpec::derive("get_blog", vec![Param::keyword("id"), Param::keyword("request")]).unwrap_err();
        assert!(matches!(err, ConfigError::ContextPosition(_)));
    }

    #[test]
    fn positional_after_context_is_rejected() {
        let err = BindingSpec::derive("h", vec![Param::request(), Param::positional("id")]).unwrap_err();
        assert!(matches!(err, ConfigError::ContextPosition(_)));
    }

    #[test]
    fn positional_only_cannot_be_bound() {
        let err = BindingSpec::derive("h", vec![Param::positional_only("x")]).unwrap_err();
        assert!(matches!(err, ConfigError::PositionalOnly { .. }));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = BindingSpec::derive("h", vec![Param::keyword("a"), Param::keyword_or("a", 1)]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateParameter { .. }));
    }

    #[test]
    fn no_keywords_means_no_body() {
        let spec = BindingSpec::derive("get_blog", vec![Param::positional("id"), Param::request()]).unwrap();
        assert!(!spec.wants_keywords());
        assert_eq!(spec.positional_names().collect::<Vec<_>>(), ["id"]);
        let spec = BindingSpec::derive("echo", vec![Param::catchall("kw")]).unwrap();
        assert!(spec.wants_keywords());
    }
}
