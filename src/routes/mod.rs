//! Route table: handlers annotated with method and path, bound into an axum Router.
//! Path patterns use `{name}` placeholders and are translated to axum syntax when the router is built.

pub mod common;

pub use common::{common_routes, common_routes_with_ready};

use crate::binding::{bind, BindingSpec, Param};
use crate::error::{AppError, BindingError, ConfigError};
use crate::handler::Handler;
use crate::response::Reply;
use axum::{
    extract::{rejection::RawPathParamsRejection, FromRequestParts, RawPathParams, Request},
    response::{IntoResponse, Response},
    routing::{on, MethodFilter},
    Router,
};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tower_http::limit::RequestBodyLimitLayer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    fn filter(self) -> MethodFilter {
        match self {
            HttpMethod::Get => MethodFilter::GET,
            HttpMethod::Post => MethodFilter::POST,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        })
    }
}

/// A handler with its declared parameters and, when annotated, its method and path.
pub struct Endpoint {
    pub name: String,
    pub method: Option<HttpMethod>,
    pub path: Option<String>,
    pub params: Vec<Param>,
    handler: Arc<dyn Handler>,
}

impl Endpoint {
    /// Unannotated handler. Named after the function.
    pub fn new<H: Handler>(handler: H) -> Self {
        Endpoint {
            name: short_type_name::<H>(),
            method: None,
            path: None,
            params: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn route(mut self, method: HttpMethod, path: impl Into<String>) -> Self {
        self.method = Some(method);
        self.path = Some(path.into());
        self
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("params", &self.params)
            .finish()
    }
}

/// Method and path annotation waiting for its handler.
#[derive(Clone, Debug)]
pub struct RouteAnnotation {
    method: HttpMethod,
    path: String,
    params: Vec<Param>,
}

impl RouteAnnotation {
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn to<H: Handler>(self, handler: H) -> Endpoint {
        Endpoint::new(handler)
            .params(self.params)
            .route(self.method, self.path)
    }
}

/// `get("/api/blogs/{id}").param(Param::positional("id")).to(api_get_blog)`
pub fn get(path: impl Into<String>) -> RouteAnnotation {
    RouteAnnotation {
        method: HttpMethod::Get,
        path: path.into(),
        params: Vec::new(),
    }
}

pub fn post(path: impl Into<String>) -> RouteAnnotation {
    RouteAnnotation {
        method: HttpMethod::Post,
        path: path.into(),
        params: Vec::new(),
    }
}

/// A registered route: binding spec derived, ready to serve.
pub struct RouteEntry {
    pub method: HttpMethod,
    pub path: String,
    pub name: String,
    pub spec: Arc<BindingSpec>,
    handler: Arc<dyn Handler>,
}

impl RouteEntry {
    /// Bind, call, and normalize the handler result. Business errors become a 200 body.
    pub async fn dispatch(&self, req: Request) -> Response {
        match self.handle(req).await {
            Ok(reply) => reply.into_response(),
            Err(e) => {
                tracing::warn!(handler = %self.name, error = %e, "request failed");
                e.into_response()
            }
        }
    }

    async fn handle(&self, req: Request) -> Result<Reply, AppError> {
        let (mut parts, body) = req.into_parts();
        let path_params: Vec<(String, String)> = match RawPathParams::from_request_parts(&mut parts, &()).await {
            Ok(raw) => raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            Err(RawPathParamsRejection::MissingPathParams(_)) => Vec::new(),
            Err(e) => return Err(BindingError::InvalidPathParam(e.body_text()).into()),
        };
        let args = bind(&self.spec, parts, body, path_params).await?;
        match self.handler.call(args).await {
            Err(AppError::Api(e)) => {
                tracing::info!(handler = %self.name, code = %e.code, "api error");
                Ok(Reply::Json(e.to_value()))
            }
            other => other,
        }
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("name", &self.name)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct RouteTable {
    entries: Vec<Arc<RouteEntry>>,
    seen: HashSet<(HttpMethod, String)>,
    body_limit: Option<usize>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap request bodies for every route in this table.
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = Some(limit);
        self
    }

    /// Register one handler. It must carry a method and a path.
    pub fn add_route(&mut self, endpoint: Endpoint) -> Result<&mut Self, ConfigError> {
        let Endpoint {
            name,
            method,
            path,
            params,
            handler,
        } = endpoint;
        let method = method.ok_or_else(|| ConfigError::MissingMethod(name.clone()))?;
        let path = path.ok_or_else(|| ConfigError::MissingPath(name.clone()))?;
        let spec = BindingSpec::derive(&name, params)?;
        if !self.seen.insert((method, path.clone())) {
            return Err(ConfigError::DuplicateRoute {
                method: method.to_string(),
                path,
            });
        }
        let names = placeholders(&path);
        for p in spec.positional_names() {
            if !names.iter().any(|ph| ph == p) {
                tracing::warn!(handler = %name, param = %p, path = %path, "positional parameter has no path placeholder");
            }
        }
        tracing::info!(method = %method, path = %path, handler = %spec.signature(), "add route");
        self.entries.push(Arc::new(RouteEntry {
            method,
            path,
            name,
            spec: Arc::new(spec),
            handler,
        }));
        Ok(self)
    }

    /// Register every annotated endpoint. Names starting with `_` and unannotated
    /// endpoints are skipped. Returns how many were registered.
    pub fn add_routes(&mut self, endpoints: impl IntoIterator<Item = Endpoint>) -> Result<usize, ConfigError> {
        let mut added = 0;
        for ep in endpoints {
            if ep.name.starts_with('_') {
                continue;
            }
            if ep.method.is_none() || ep.path.is_none() {
                tracing::debug!(handler = %ep.name, "skipping unannotated handler");
                continue;
            }
            self.add_route(ep)?;
            added += 1;
        }
        Ok(added)
    }

    pub fn entries(&self) -> &[Arc<RouteEntry>] {
        &self.entries
    }

    pub fn into_router(self) -> Router {
        let mut router = Router::new();
        for entry in self.entries {
            let path = axum_path(&entry.path);
            let filter = entry.method.filter();
            let svc = move |req: Request| {
                let entry = entry.clone();
                async move { entry.dispatch(req).await }
            };
            router = router.route(&path, on(filter, svc));
        }
        match self.body_limit {
            Some(limit) => router.layer(RequestBodyLimitLayer::new(limit)),
            None => router,
        }
    }
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)(?::[^}]*)?\}").expect("placeholder pattern"))
}

/// Placeholder names in a `{name}` path pattern.
pub fn placeholders(path: &str) -> Vec<String> {
    placeholder_re()
        .captures_iter(path)
        .map(|c| c[1].to_string())
        .collect()
}

/// `/blog/{id}` to axum's `/blog/:id`. A `{name:regex}` constraint is dropped.
pub fn axum_path(path: &str) -> String {
    placeholder_re().replace_all(path, ":$1").into_owned()
}

fn short_type_name<T>() -> String {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full).to_string()
}
