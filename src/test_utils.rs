use crate::database::credentials::hash_password;
use crate::database::session::{PrincipalRepository, SessionRepository};
use crate::error::app_error::AppError;
use crate::models::admin::AdminUser;
use crate::models::affiliate::Affiliate;
use crate::models::company::Company;
use crate::models::session::{Credentials, SessionRecord};
use crate::realm::{Principal, Realm, RealmKind};
use crate::service::session::hash_session_token;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

pub fn admin_user(username: &str, is_active: bool) -> AdminUser {
    AdminUser {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        is_active,
        created_at: Utc::now(),
    }
}

pub fn affiliate(email: &str, is_active: bool) -> Affiliate {
    Affiliate {
        id: Uuid::new_v4(),
        name: "Maria Silva".to_string(),
        email: email.to_string(),
        cpf: "52998224725".to_string(),
        company_id: None,
        is_active,
        created_at: Utc::now(),
    }
}

pub fn company(email: &str, is_active: bool) -> Company {
    Company {
        id: Uuid::new_v4(),
        name: "Acme Ltda".to_string(),
        email: email.to_string(),
        cnpj: "11222333000181".to_string(),
        is_active,
        created_at: Utc::now(),
    }
}

struct StoredSession {
    token_hash: String,
    realm: RealmKind,
    principal_id: Uuid,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

struct StoredPrincipal {
    realm: RealmKind,
    id: Uuid,
    login: Option<String>,
    password_hash: String,
    is_active: bool,
    row: serde_json::Value,
}

/// In-memory store. Unlike Postgres it does not filter expired sessions or
/// inactive principals, so callers are exercised against raw rows.
#[derive(Default)]
pub struct MockRepository {
    sessions: Mutex<Vec<StoredSession>>,
    principals: Mutex<Vec<StoredPrincipal>>,
    lookups: AtomicUsize,
    failing: bool,
}

impl MockRepository {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn session_lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    fn store_principal<R: Realm>(&self, login: Option<&str>, password_hash: String, principal: &R::Principal) {
        let mut principals = self.principals.lock().unwrap();
        principals.retain(|p| !(p.realm == R::KIND && p.id == principal.id()));
        principals.push(StoredPrincipal {
            realm: R::KIND,
            id: principal.id(),
            login: login.map(str::to_string),
            password_hash,
            is_active: principal.is_active(),
            row: serde_json::to_value(principal).unwrap(),
        });
    }

    pub fn insert_principal<R: Realm>(&self, login: &str, password: &str, principal: &R::Principal) {
        self.store_principal::<R>(Some(login), hash_password(password).unwrap(), principal);
    }

    pub fn insert_session<R: Realm>(&self, token: &str, principal: &R::Principal, expires_at: DateTime<Utc>) {
        let known = self.principals.lock().unwrap().iter().any(|p| p.realm == R::KIND && p.id == principal.id());
        if !known {
            self.store_principal::<R>(None, String::new(), principal);
        }

        self.sessions.lock().unwrap().push(StoredSession {
            token_hash: hash_session_token(token),
            realm: R::KIND,
            principal_id: principal.id(),
            created_at: Utc::now(),
            expires_at,
        });
    }

    fn principal_row<R: Realm>(&self, id: &Uuid) -> Option<R::Principal> {
        self.principals
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.realm == R::KIND && p.id == *id)
            .map(|p| serde_json::from_value(p.row.clone()).unwrap())
    }

    fn check_failing(&self) -> Result<(), AppError> {
        if self.failing {
            Err(AppError::db("mock store unavailable", sqlx::Error::PoolClosed))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl SessionRepository for MockRepository {
    async fn find_session<R: Realm>(&self, token_hash: &str) -> Result<Option<SessionRecord<R::Principal>>, AppError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;

        let session = self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.token_hash == token_hash && s.realm == R::KIND)
            .map(|s| (s.principal_id, s.created_at, s.expires_at));

        Ok(session.and_then(|(principal_id, created_at, expires_at)| {
            self.principal_row::<R>(&principal_id).map(|principal| SessionRecord {
                principal_id,
                created_at,
                expires_at,
                principal,
            })
        }))
    }

    async fn create_session<R: Realm>(&self, principal_id: &Uuid, token_hash: &str, expires_at: DateTime<Utc>, _user_agent: Option<&str>) -> Result<DateTime<Utc>, AppError> {
        self.check_failing()?;
        let created_at = Utc::now();
        self.sessions.lock().unwrap().push(StoredSession {
            token_hash: token_hash.to_string(),
            realm: R::KIND,
            principal_id: *principal_id,
            created_at,
            expires_at,
        });
        Ok(created_at)
    }

    async fn delete_session(&self, token_hash: &str) -> Result<bool, AppError> {
        self.check_failing()?;
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| s.token_hash != token_hash);
        Ok(sessions.len() < before)
    }

    async fn delete_expired_sessions(&self) -> Result<u64, AppError> {
        self.check_failing()?;
        let now = Utc::now();
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| s.expires_at > now);
        Ok((before - sessions.len()) as u64)
    }
}

#[async_trait::async_trait]
impl PrincipalRepository for MockRepository {
    async fn find_credentials<R: Realm>(&self, login: &str) -> Result<Option<Credentials>, AppError> {
        self.check_failing()?;
        Ok(self
            .principals
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.realm == R::KIND && p.login.as_deref() == Some(login))
            .map(|p| Credentials {
                id: p.id,
                password_hash: p.password_hash.clone(),
                is_active: p.is_active,
            }))
    }

    async fn get_principal<R: Realm>(&self, id: &Uuid) -> Result<Option<R::Principal>, AppError> {
        self.check_failing()?;
        Ok(self.principal_row::<R>(id))
    }
}
