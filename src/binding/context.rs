use axum::http::{header, request::Parts, Extensions, HeaderMap, Method, Uri};

/// The request as seen by a handler that declares the context parameter.
/// The body is already consumed by binding; everything else is kept.
#[derive(Debug)]
pub struct RequestContext {
    parts: Parts,
    path_params: Vec<(String, String)>,
}

impl RequestContext {
    pub fn new(parts: Parts, path_params: Vec<(String, String)>) -> Self {
        RequestContext { parts, path_params }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn query_string(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Values placed on the request by middleware.
    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn path_params(&self) -> &[(String, String)] {
        &self.path_params
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn reads_headers_cookies_and_path_params() {
        let (parts, _) = Request::builder()
            .uri("/blog/42?x=1")
            .header(header::COOKIE, "a=1; session=abc")
            .header("x-trace", "t1")
            .body(())
            .unwrap()
            .into_parts();
        let ctx = RequestContext::new(parts, vec![("id".into(), "42".into())]);
        assert_eq!(ctx.path(), "/blog/42");
        assert_eq!(ctx.query_string(), Some("x=1"));
        assert_eq!(ctx.cookie("session"), Some("abc"));
        assert_eq!(ctx.cookie("missing"), None);
        assert_eq!(ctx.header("x-trace"), Some("t1"));
        assert_eq!(ctx.path_param("id"), Some("42"));
    }
}
