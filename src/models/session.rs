use crate::realm::RealmKind;
use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;
use validator::Validate;

/// A freshly issued session. `token` is the only copy of the plain token; the
/// store keeps its digest.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub realm: RealmKind,
    pub principal_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A session row joined to the principal it belongs to.
#[derive(Debug, Clone)]
pub struct SessionRecord<P> {
    pub principal_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub principal: P,
}

impl<P> SessionRecord<P> {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl<'r, P> FromRow<'r, PgRow> for SessionRecord<P>
where
    P: FromRow<'r, PgRow>,
{
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            principal_id: row.try_get("principal_id")?,
            created_at: row.try_get("session_created_at")?,
            expires_at: row.try_get("session_expires_at")?,
            principal: P::from_row(row)?,
        })
    }
}

/// Principal credentials used only during login.
#[derive(Debug, sqlx::FromRow)]
pub struct Credentials {
    pub id: Uuid,
    pub password_hash: String,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct LoginRequest {
    /// Username, email, CPF or CNPJ depending on the realm.
    #[validate(length(min = 1, max = 254))]
    pub login: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct LoginResponse<P> {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub principal: P,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(expires_at: DateTime<Utc>) -> SessionRecord<()> {
        SessionRecord {
            principal_id: Uuid::new_v4(),
            created_at: expires_at - Duration::hours(1),
            expires_at,
            principal: (),
        }
    }

    #[test]
    fn session_is_expired_at_its_expiry_instant() {
        let now = Utc::now();
        assert!(record(now).is_expired_at(now));
        assert!(record(now - Duration::seconds(1)).is_expired_at(now));
        assert!(!record(now + Duration::seconds(1)).is_expired_at(now));
    }
}
