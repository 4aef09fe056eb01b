//! Client side of the session handshake, for front ends and tools written in
//! Rust.
//!
//! A gate starts out [`GateState::Pending`], asks the realm's `me` endpoint who
//! the caller is, and settles on either the principal or a redirect to the
//! login view. It never retries and keeps nothing between mounts; only the
//! cookie jar of its HTTP client outlives a call.

use crate::models::session::LoginRequest;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum GateState<P> {
    Pending,
    Authenticated(P),
    Redirected(String),
}

impl<P> GateState<P> {
    pub fn principal(&self) -> Option<&P> {
        match self {
            GateState::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }
}

pub struct AuthGate {
    client: reqwest::Client,
    realm_url: String,
    login_view: String,
}

impl AuthGate {
    /// `realm_path` is the realm's API prefix (e.g. `/api/admin`); `login_view`
    /// is where unauthenticated visitors are sent.
    pub fn new(base_url: &str, realm_path: &str, login_view: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().cookie_store(true).build()?;

        Ok(Self {
            client,
            realm_url: format!("{}/{}", base_url.trim_end_matches('/'), realm_path.trim_matches('/')),
            login_view: login_view.into(),
        })
    }

    pub fn initial_state<P>(&self) -> GateState<P> {
        GateState::Pending
    }

    /// Logs in through the realm's login endpoint. The session cookie lands in
    /// this gate's cookie jar, so later mounts need no explicit token.
    pub async fn login(&self, request: &LoginRequest) -> Result<(), reqwest::Error> {
        self.client
            .post(format!("{}/login", self.realm_url))
            .json(&serde_json::json!({"login": request.login, "password": request.password}))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    /// One call to the `me` endpoint. Any failure, including an undecodable
    /// body, redirects.
    pub async fn mount<P: DeserializeOwned>(&self, token: Option<&str>) -> GateState<P> {
        let me_url = format!("{}/me", self.realm_url);
        let mut request = self.client.get(&me_url);
        if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %me_url, error = %e, "session check failed");
                return self.redirect();
            }
        };

        if !response.status().is_success() {
            debug!(url = %me_url, status = %response.status(), "no active session");
            return self.redirect();
        }

        match response.json::<P>().await {
            Ok(principal) => GateState::Authenticated(principal),
            Err(e) => {
                warn!(url = %me_url, error = %e, "unreadable session response");
                self.redirect()
            }
        }
    }

    fn redirect<P>(&self) -> GateState<P> {
        GateState::Redirected(self.login_view.clone())
    }
}
