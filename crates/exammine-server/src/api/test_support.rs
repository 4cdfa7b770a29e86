//! Router builders and request helpers shared by the API tests.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderValue, Request};
use axum::response::Response;
use axum::Router;

pub(super) use crate::agents::testing::{StubGenerator, StubReply};
use crate::agents::testing::{agents_with, empty_search};
use crate::agents::Agents;
use crate::middleware::AuthState;

use super::{build_app, default_rate_limit_state, AppState};

pub(super) const TEST_ORIGIN: &str = "http://localhost:5173";
const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const BOUNDARY: &str = "EXAMMINEBOUNDARY";

pub(super) fn app_from(agents: Agents, auth: AuthState) -> Router {
    build_app(
        AppState {
            agents,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        },
        auth,
        default_rate_limit_state(),
        HeaderValue::from_static(TEST_ORIGIN),
    )
}

/// App with auth disabled and no scraping sources.
pub(super) fn app_with(llm: Arc<StubGenerator>) -> Router {
    app_from(agents_with(llm, empty_search()), AuthState::disabled())
}

/// App requiring one of `keys` on protected routes.
pub(super) fn app_with_keys(llm: Arc<StubGenerator>, keys: &[&str]) -> Router {
    let keys: Vec<String> = keys.iter().map(|k| (*k).to_owned()).collect();
    let auth = AuthState::new(&keys, false).expect("auth");
    app_from(agents_with(llm, empty_search()), auth)
}

pub(super) fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub(super) fn post_form(uri: &str, content_type: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body.to_owned()))
        .expect("request")
}

/// A multipart analyze-exam upload, optionally carrying a bearer token.
pub(super) fn multipart_upload(filename: &str, bytes: &[u8], token: Option<&str>) -> Request<Body> {
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/agents/analyze-exam")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).expect("request")
}

pub(super) async fn json_body(response: Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json parse")
}
