use crate::auth::{TokenLocations, request_session_token};
use crate::config::Config;
use crate::error::app_error::AppError;
use crate::realm::SESSION_TOKEN_HEADER;
use crate::service::proxy::{InboundRequest, ProxyForwarder, UpstreamBody, UpstreamResponse};
use rocket::data::{Data, ToByteUnit};
use rocket::http::{ContentType, Method, Status};
use rocket::request::{FromRequest, Outcome, Request};
use rocket::response::{self, Responder, Response};
use rocket::{State, delete, get, head, patch, post, put, routes};
use std::io::Cursor;

const PROXY_BODY_LIMIT_MIB: u64 = 2;
const FALLBACK_SESSION_COOKIE: &str = "admin_session";

/// Method, headers, extra query and session token of a request bound for the
/// upstream.
pub struct ProxyCall {
    method: Method,
    query: Option<String>,
    headers: Vec<(String, String)>,
    session_token: String,
}

impl ProxyCall {
    fn into_inbound(self, path: Option<String>, body: Vec<u8>) -> InboundRequest {
        InboundRequest {
            method: self.method,
            path,
            query: self.query,
            headers: self.headers,
            body,
            session_token: self.session_token,
        }
    }
}

/// Query segments other than `path`, still percent-encoded.
fn forwarded_query(req: &Request<'_>) -> Option<String> {
    let query = req.uri().query()?;
    let kept: Vec<&str> = query
        .raw_segments()
        .map(|segment| segment.as_str())
        .filter(|segment| segment.split('=').next() != Some("path"))
        .collect();

    (!kept.is_empty()).then(|| kept.join("&"))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ProxyCall {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, ()> {
        let cookie = req
            .rocket()
            .state::<Config>()
            .map(|config| config.proxy.session_cookie.as_str())
            .unwrap_or(FALLBACK_SESSION_COOKIE);
        let locations = TokenLocations {
            primary_header: SESSION_TOKEN_HEADER,
            secondary_header: "x-admin-token",
            cookie,
        };

        Outcome::Success(ProxyCall {
            method: req.method(),
            query: forwarded_query(req),
            headers: req.headers().iter().map(|h| (h.name().to_string(), h.value().to_string())).collect(),
            session_token: request_session_token(req, &locations),
        })
    }
}

async fn read_body(data: Data<'_>) -> Result<Vec<u8>, AppError> {
    let bytes = data
        .open(PROXY_BODY_LIMIT_MIB.mebibytes())
        .into_bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("Unreadable request body: {e}")))?;

    if !bytes.is_complete() {
        return Err(AppError::BadRequest("Request body too large".to_string()));
    }

    Ok(bytes.into_inner())
}

async fn relay(forwarder: &ProxyForwarder, call: ProxyCall, path: Option<String>, data: Option<Data<'_>>) -> Result<UpstreamResponse, AppError> {
    let body = match data {
        Some(data) => read_body(data).await?,
        None => Vec::new(),
    };

    forwarder.forward(call.into_inbound(path, body)).await
}

#[get("/?<path>")]
pub async fn proxy_get(forwarder: &State<ProxyForwarder>, call: ProxyCall, path: Option<String>) -> Result<UpstreamResponse, AppError> {
    relay(forwarder, call, path, None).await
}

#[head("/?<path>")]
pub async fn proxy_head(forwarder: &State<ProxyForwarder>, call: ProxyCall, path: Option<String>) -> Result<UpstreamResponse, AppError> {
    relay(forwarder, call, path, None).await
}

#[post("/?<path>", data = "<data>")]
pub async fn proxy_post(forwarder: &State<ProxyForwarder>, call: ProxyCall, path: Option<String>, data: Data<'_>) -> Result<UpstreamResponse, AppError> {
    relay(forwarder, call, path, Some(data)).await
}

#[put("/?<path>", data = "<data>")]
pub async fn proxy_put(forwarder: &State<ProxyForwarder>, call: ProxyCall, path: Option<String>, data: Data<'_>) -> Result<UpstreamResponse, AppError> {
    relay(forwarder, call, path, Some(data)).await
}

#[patch("/?<path>", data = "<data>")]
pub async fn proxy_patch(forwarder: &State<ProxyForwarder>, call: ProxyCall, path: Option<String>, data: Data<'_>) -> Result<UpstreamResponse, AppError> {
    relay(forwarder, call, path, Some(data)).await
}

#[delete("/?<path>", data = "<data>")]
pub async fn proxy_delete(forwarder: &State<ProxyForwarder>, call: ProxyCall, path: Option<String>, data: Data<'_>) -> Result<UpstreamResponse, AppError> {
    relay(forwarder, call, path, Some(data)).await
}

/// Replays the upstream status and body. JSON is re-serialized, anything else
/// is passed through with the upstream content type.
impl<'r> Responder<'r, 'static> for UpstreamResponse {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let status = Status::new(self.status);
        let (content_type, bytes) = match self.body {
            UpstreamBody::Json(value) => (ContentType::JSON, serde_json::to_vec(&value).map_err(|_| Status::InternalServerError)?),
            UpstreamBody::Raw(bytes) => {
                let content_type = self.content_type.as_deref().and_then(ContentType::parse_flexible).unwrap_or(ContentType::Plain);
                (content_type, bytes)
            }
        };

        Response::build().status(status).header(content_type).sized_body(bytes.len(), Cursor::new(bytes)).ok()
    }
}

pub fn routes() -> Vec<rocket::Route> {
    routes![proxy_get, proxy_head, proxy_post, proxy_put, proxy_patch, proxy_delete]
}
