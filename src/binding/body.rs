//! Request body and query string to a name/value mapping.

use crate::error::BindingError;
use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, Query},
    http::{header, request::Parts, Method, Request, StatusCode, Uri},
    Form,
};
use serde_json::{Map, Value};

/// Parse a POST body by its declared content type. Every reader honours the
/// router's body limit; exceeding it is `PayloadTooLarge`.
pub async fn read_body(parts: &Parts, body: Body) -> Result<Map<String, Value>, BindingError> {
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .ok_or(BindingError::MissingContentType)?;
    let lower = content_type.to_ascii_lowercase();
    if lower.starts_with("application/json") {
        let req = rebuild(parts, content_type, body)?;
        let bytes = Bytes::from_request(req, &())
            .await
            .map_err(|e| rejected(e.status(), e.body_text()))?;
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(BindingError::JsonNotObject),
            Err(e) => Err(BindingError::InvalidBody(e.to_string())),
        }
    } else if lower.starts_with("application/x-www-form-urlencoded") {
        let req = rebuild(parts, content_type, body)?;
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, &())
            .await
            .map_err(|e| rejected(e.status(), e.body_text()))?;
        Ok(first_wins(pairs))
    } else if lower.starts_with("multipart/form-data") {
        let req = rebuild(parts, content_type, body)?;
        let mut multipart = Multipart::from_request(req, &())
            .await
            .map_err(|e| rejected(e.status(), e.body_text()))?;
        let mut map = Map::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| rejected(e.status(), e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let text = field
                .text()
                .await
                .map_err(|e| rejected(e.status(), e.body_text()))?;
            map.entry(name).or_insert(Value::String(text));
        }
        Ok(map)
    } else {
        Err(BindingError::UnsupportedContentType(content_type.to_string()))
    }
}

/// Parse the query string, keeping the first value of each repeated key.
pub fn read_query(uri: &Uri) -> Result<Map<String, Value>, BindingError> {
    let Query(pairs) =
        Query::<Vec<(String, String)>>::try_from_uri(uri).map_err(|e| BindingError::InvalidBody(e.body_text()))?;
    Ok(first_wins(pairs))
}

fn first_wins(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.entry(k).or_insert(Value::String(v));
    }
    map
}

fn rejected(status: StatusCode, text: String) -> BindingError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        BindingError::PayloadTooLarge
    } else {
        BindingError::InvalidBody(text)
    }
}

/// Fresh request for a body extractor. Extensions carry any `DefaultBodyLimit` override.
fn rebuild(parts: &Parts, content_type: &str, body: Body) -> Result<Request<Body>, BindingError> {
    let mut req = Request::builder()
        .method(Method::POST)
        .header(header::CONTENT_TYPE, content_type)
        .body(body)
        .map_err(|e| BindingError::InvalidBody(e.to_string()))?;
    *req.extensions_mut() = parts.extensions.clone();
    Ok(req)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(content_type: Option<&str>, body: &'static str) -> (Parts, Body) {
        let mut b = Request::builder().method(Method::POST).uri("/api/users");
        if let Some(ct) = content_type {
            b = b.header(header::CONTENT_TYPE, ct);
        }
        b.body(Body::from(body)).unwrap().into_parts()
    }

    #[tokio::test]
    async fn json_object_body() {
        let (parts, body) = post(Some("application/json; charset=utf-8"), r#"{"email":"a@b.c","n":2}"#);
        let map = read_body(&parts, body).await.unwrap();
        assert_eq!(map["email"], json!("a@b.c"));
        assert_eq!(map["n"], json!(2));
    }

    #[tokio::test]
    async fn json_array_body_is_rejected() {
        let (parts, body) = post(Some("application/json"), "[1,2]");
        assert_eq!(read_body(&parts, body).await.unwrap_err(), BindingError::JsonNotObject);
    }

    #[tokio::test]
    async fn malformed_json_is_invalid_body() {
        let (parts, body) = post(Some("application/json"), "{");
        assert!(matches!(read_body(&parts, body).await, Err(BindingError::InvalidBody(_))));
    }

    #[tokio::test]
    async fn form_body_keeps_first_value() {
        let (parts, body) = post(Some("application/x-www-form-urlencoded"), "a=1&b=two+words&a=3");
        let map = read_body(&parts, body).await.unwrap();
        assert_eq!(map["a"], json!("1"));
        assert_eq!(map["b"], json!("two words"));
    }

    #[tokio::test]
    async fn multipart_body() {
        let payload = "--X\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nalice\r\n--X--\r\n";
        let (parts, body) = post(Some("multipart/form-data; boundary=X"), payload);
        let map = read_body(&parts, body).await.unwrap();
        assert_eq!(map["name"], json!("alice"));
    }

    #[tokio::test]
    async fn content_type_required_and_checked() {
        let (parts, body) = post(None, "a=1");
        assert_eq!(read_body(&parts, body).await.unwrap_err(), BindingError::MissingContentType);
        let (parts, body) = post(Some("text/plain"), "a=1");
        assert_eq!(
            read_body(&parts, body).await.unwrap_err(),
            BindingError::UnsupportedContentType("text/plain".into())
        );
    }

    fn oversized(content_type: &str, body: String) -> (Parts, Body) {
        Request::builder()
            .method(Method::POST)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
            .into_parts()
    }

    #[tokio::test]
    async fn bodies_over_default_limit_are_too_large() {
        let big = "a".repeat(3 * 1024 * 1024);
        let (parts, body) = oversized("application/json", format!(r#"{{"email":"{}"}}"#, big));
        assert_eq!(read_body(&parts, body).await.unwrap_err(), BindingError::PayloadTooLarge);
        let (parts, body) = oversized("application/x-www-form-urlencoded", format!("email={}", big));
        assert_eq!(read_body(&parts, body).await.unwrap_err(), BindingError::PayloadTooLarge);
    }

    #[test]
    fn query_first_value_wins() {
        let uri: Uri = "/api/blogs?page=2&page=5&q=x%20y".parse().unwrap();
        let map = read_query(&uri).unwrap();
        assert_eq!(map["page"], json!("2"));
        assert_eq!(map["q"], json!("x y"));
    }
}
