use crate::database::session::SessionRepository;
use crate::error::app_error::AppError;
use crate::realm::{Principal, Realm};
use chrono::Utc;
use password_hash::rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use tracing::debug;

const TOKEN_BYTES: usize = 32;

/// Generates a session token. Returns `(plain_token, token_hash)`; only the hash
/// is ever stored.
pub fn generate_session_token() -> (String, String) {
    let mut token_bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut token_bytes);
    let token = hex::encode(token_bytes);
    let token_hash = hash_session_token(&token);

    (token, token_hash)
}

pub fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Resolves a session token to the principal of realm `R` it belongs to.
pub struct SessionResolver<'a, S> {
    repo: &'a S,
}

impl<'a, S: SessionRepository> SessionResolver<'a, S> {
    pub fn new(repo: &'a S) -> Self {
        Self { repo }
    }

    /// `Ok(None)` covers every "not authenticated" case: empty token, unknown
    /// token, expired session, inactive principal. An empty token never reaches
    /// the store.
    pub async fn resolve<R: Realm>(&self, token: &str) -> Result<Option<R::Principal>, AppError> {
        if token.is_empty() {
            return Ok(None);
        }

        let record = self.repo.find_session::<R>(&hash_session_token(token)).await?;
        let now = Utc::now();

        Ok(record.and_then(|record| {
            if record.is_expired_at(now) {
                debug!(realm = %R::KIND, principal_id = %record.principal_id, "session expired");
                None
            } else if !record.principal.is_active() {
                debug!(realm = %R::KIND, principal_id = %record.principal_id, "principal inactive");
                None
            } else {
                Some(record.principal)
            }
        }))
    }
}
