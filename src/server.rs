//! HTTP front door.
//!
//! Adapts live HTTP requests into the push event shape and returns the
//! pipeline's status. Any path is accepted, since the path segments ARE the
//! payload (the encoded target list), so there is nothing to route on.
//!
//! The body arrives as raw bytes and is re-encoded as standard base64 before
//! entering the pipeline, so events that pass through here are always
//! binary-safe; the `NotBinarySafe` rejection exists for replayed events
//! captured from front doors without that guarantee.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::config::Config;
use crate::pipeline;
use crate::request::{PushRequest, RequestContext};

/// Binds the listen address and serves the front door until terminated.
pub async fn serve(config: Config) -> Result<()> {
    let addr = config.bind_addr.clone();
    let app = router(Arc::new(config));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log::info!("[Server] listening on {addr}");
    axum::serve(listener, app).await.context("server terminated")
}

/// Builds the router: every path and method lands in the push handler.
pub fn router(config: Arc<Config>) -> Router {
    Router::new().fallback(push_handler).with_state(config)
}

async fn push_handler(
    State(config): State<Arc<Config>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let request = adapt(uri.path(), &headers, &body);
    let response = pipeline::handle(&request, &config).await;
    (
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(header::CONTENT_TYPE, "application/json")],
        response.body,
    )
}

/// Lowercases header names, re-encodes the body, and takes the hostname from
/// the Host header.
fn adapt(path: &str, headers: &HeaderMap, body: &[u8]) -> PushRequest {
    let mut header_map = HashMap::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            header_map.insert(name.as_str().to_ascii_lowercase(), value.to_string());
        }
    }
    let domain_name = header_map.get("host").cloned().unwrap_or_default();

    PushRequest {
        raw_path: path.to_string(),
        headers: header_map,
        body: BASE64.encode(body),
        is_base64_encoded: true,
        request_context: RequestContext { domain_name },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_adapt_lowercases_headers_and_encodes_body() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("WebPush token"));
        headers.insert("Host", HeaderValue::from_static("push.example.com"));

        let request = adapt("/YWJj/ZGVm", &headers, b"\x00\x01binary");

        assert_eq!(request.raw_path, "/YWJj/ZGVm");
        assert_eq!(
            request.headers.get("authorization").map(String::as_str),
            Some("WebPush token")
        );
        assert_eq!(request.request_context.domain_name, "push.example.com");
        assert!(request.is_base64_encoded);
        assert_eq!(
            BASE64.decode(&request.body).unwrap(),
            b"\x00\x01binary"
        );
    }

    #[test]
    fn test_adapt_without_host_leaves_domain_empty() {
        let request = adapt("/", &HeaderMap::new(), b"");
        assert_eq!(request.request_context.domain_name, "");
    }
}
