//! Relays client requests to the upstream functions endpoint.
//!
//! The upstream sees the caller's method, headers and body, plus the project
//! API key and the caller's session token. Its status and body come back
//! untouched, except that JSON bodies are re-serialized.

use crate::config::BackendConfig;
use crate::error::app_error::AppError;
use rocket::http::Method;
use tracing::{debug, warn};

/// Headers that describe the inbound hop or carry credentials the proxy sets
/// itself; they are never copied upstream.
const SKIPPED_HEADERS: &[&str] = &[
    "host",
    "content-length",
    "connection",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
    "te",
    "trailer",
    "proxy-authorization",
    "proxy-connection",
    "accept-encoding",
    "cookie",
    "apikey",
    "authorization",
    "x-session-token",
    "x-admin-token",
];

/// The parts of an inbound request the proxy needs.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub path: Option<String>,
    /// Raw query string forwarded as is, without the `path` parameter.
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub session_token: String,
}

#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: reqwest::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    Json(serde_json::Value),
    Raw(Vec<u8>),
}

impl UpstreamBody {
    pub fn from_parts(content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        let is_json = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));
        if is_json && let Ok(value) = serde_json::from_slice(&bytes) {
            return UpstreamBody::Json(value);
        }

        UpstreamBody::Raw(bytes)
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: UpstreamBody,
}

pub fn upstream_url(base: &str, functions_path: &str, path: Option<&str>) -> String {
    let mut url = format!("{}/{}", base.trim_end_matches('/'), functions_path.trim_matches('/'));

    if let Some(suffix) = path.map(|p| p.trim_start_matches('/')).filter(|p| !p.is_empty()) {
        url.push('/');
        url.push_str(suffix);
    }

    url
}

fn carries_body(method: Method) -> bool {
    !matches!(method, Method::Get | Method::Head)
}

pub struct ProxyForwarder {
    client: reqwest::Client,
    backend: BackendConfig,
}

impl ProxyForwarder {
    pub fn new(backend: BackendConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, backend })
    }

    /// Builds the upstream request. Fails only when the backend is not configured.
    pub fn prepare(&self, inbound: InboundRequest) -> Result<UpstreamRequest, AppError> {
        let base = self
            .backend
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or(AppError::MissingConfiguration("BACKEND_URL"))?;
        let anon_key = self
            .backend
            .anon_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AppError::MissingConfiguration("BACKEND_ANON_KEY"))?;

        let method = reqwest::Method::from_bytes(inbound.method.as_str().as_bytes())
            .map_err(|_| AppError::BadRequest(format!("Unsupported method {}", inbound.method)))?;

        let mut headers: Vec<(String, String)> = inbound
            .headers
            .into_iter()
            .filter(|(name, _)| !SKIPPED_HEADERS.iter().any(|skipped| name.eq_ignore_ascii_case(skipped)))
            .collect();
        headers.push(("apikey".to_string(), anon_key.to_string()));
        headers.push(("authorization".to_string(), format!("Bearer {anon_key}")));
        if !inbound.session_token.is_empty() {
            headers.push(("x-session-token".to_string(), inbound.session_token));
        }

        let body = carries_body(inbound.method).then_some(inbound.body);

        let mut url = upstream_url(base, &self.backend.functions_path, inbound.path.as_deref());
        if let Some(query) = inbound.query.as_deref().filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }

        Ok(UpstreamRequest {
            method,
            url,
            headers,
            body,
        })
    }

    pub async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, AppError> {
        debug!(method = %request.method, upstream = %request.url, "forwarding request");

        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(upstream = %request.url, error = %e, "upstream request failed");
            AppError::upstream("Upstream request failed", e)
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::upstream("Failed to read upstream response", e))?;

        debug!(upstream = %request.url, status, "upstream responded");

        Ok(UpstreamResponse {
            status,
            body: UpstreamBody::from_parts(content_type.as_deref(), bytes.to_vec()),
            content_type,
        })
    }

    pub async fn forward(&self, inbound: InboundRequest) -> Result<UpstreamResponse, AppError> {
        let request = self.prepare(inbound)?;
        self.send(request).await
    }
}
