use crate::config::SessionConfig;
use crate::database::credentials::{dummy_verify, verify_password};
use crate::database::session::{PrincipalRepository, SessionRepository};
use crate::error::app_error::AppError;
use crate::models::session::{LoginRequest, Session};
use crate::realm::Realm;
use crate::service::session::{generate_session_token, hash_session_token};
use chrono::{Duration, Utc};
use tracing::{info, warn};
use validator::Validate;

/// Login and logout for any realm.
pub struct AuthService<'a, S> {
    repo: &'a S,
    session_config: &'a SessionConfig,
}

impl<'a, S> AuthService<'a, S>
where
    S: SessionRepository + PrincipalRepository,
{
    pub fn new(repo: &'a S, session_config: &'a SessionConfig) -> Self {
        Self { repo, session_config }
    }

    /// Verifies credentials and issues a session. Unknown logins, wrong
    /// passwords and inactive principals are indistinguishable to the caller.
    pub async fn login<R: Realm>(&self, request: &LoginRequest, user_agent: Option<&str>) -> Result<(Session, R::Principal), AppError> {
        request.validate()?;

        let login = R::normalize_login(&request.login);
        let credentials = match self.repo.find_credentials::<R>(&login).await? {
            Some(credentials) => credentials,
            None => {
                dummy_verify(&request.password);
                info!(realm = %R::KIND, "login rejected: unknown identifier");
                return Err(AppError::InvalidCredentials);
            }
        };

        verify_password(&credentials.password_hash, &request.password).inspect_err(|_| {
            info!(realm = %R::KIND, principal_id = %credentials.id, "login rejected: wrong password");
        })?;

        if !credentials.is_active {
            warn!(realm = %R::KIND, principal_id = %credentials.id, "login rejected: principal inactive");
            return Err(AppError::InvalidCredentials);
        }

        let principal = self
            .repo
            .get_principal::<R>(&credentials.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} principal", R::KIND)))?;

        let (token, token_hash) = generate_session_token();
        let expires_at = Utc::now() + Duration::seconds(self.session_config.ttl_seconds);
        let created_at = self.repo.create_session::<R>(&credentials.id, &token_hash, expires_at, user_agent).await?;

        let session = Session {
            token,
            realm: R::KIND,
            principal_id: credentials.id,
            created_at,
            expires_at,
        };
        info!(
            realm = %session.realm,
            principal_id = %session.principal_id,
            created_at = %session.created_at,
            expires_at = %session.expires_at,
            "session created"
        );

        Ok((session, principal))
    }

    /// Deletes the session behind `token`. Returns whether one existed.
    pub async fn logout<R: Realm>(&self, token: &str) -> Result<bool, AppError> {
        if token.is_empty() {
            return Ok(false);
        }

        let deleted = self.repo.delete_session(&hash_session_token(token)).await?;
        if deleted {
            info!(realm = %R::KIND, "session deleted");
        }

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realm::{AdminRealm, AffiliateRealm, CompanyRealm, RealmKind};
    use crate::service::session::SessionResolver;
    use crate::test_utils::{MockRepository, admin_user, affiliate, company};

    fn login(login: &str, password: &str) -> LoginRequest {
        LoginRequest {
            login: login.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn login_issues_a_session_that_resolves() {
        let repo = MockRepository::default();
        let admin = admin_user("root", true);
        repo.insert_principal::<AdminRealm>("root", "correct-password", &admin);
        let config = SessionConfig::default();
        let service = AuthService::new(&repo, &config);

        let (session, principal) = service.login::<AdminRealm>(&login(" Root ", "correct-password"), Some("tests")).await.unwrap();
        assert_eq!(principal.id, admin.id);
        assert_eq!(session.principal_id, admin.id);
        assert_eq!(session.realm, RealmKind::Admin);
        assert!(session.created_at <= session.expires_at);
        assert_eq!(session.token.len(), 64);
        assert!(session.expires_at > Utc::now() + Duration::seconds(config.ttl_seconds - 60));

        let resolved = SessionResolver::new(&repo).resolve::<AdminRealm>(&session.token).await.unwrap();
        assert_eq!(resolved.map(|a| a.id), Some(admin.id));
    }

    #[tokio::test]
    async fn affiliate_can_log_in_with_formatted_cpf() {
        let repo = MockRepository::default();
        let member = affiliate("maria@example.com", true);
        repo.insert_principal::<AffiliateRealm>(&member.cpf, "correct-password", &member);
        let config = SessionConfig::default();

        let result = AuthService::new(&repo, &config)
            .login::<AffiliateRealm>(&login("529.982.247-25", "correct-password"), None)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let repo = MockRepository::default();
        let admin = admin_user("root", true);
        repo.insert_principal::<AdminRealm>("root", "correct-password", &admin);
        let config = SessionConfig::default();

        let result = AuthService::new(&repo, &config).login::<AdminRealm>(&login("root", "wrong-password"), None).await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
        assert_eq!(repo.session_count(), 0);
    }

    #[tokio::test]
    async fn unknown_login_is_invalid_credentials() {
        let repo = MockRepository::default();
        let config = SessionConfig::default();

        let result = AuthService::new(&repo, &config).login::<CompanyRealm>(&login("nobody@example.com", "whatever"), None).await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn inactive_principal_cannot_log_in() {
        let repo = MockRepository::default();
        let acme = company("contact@acme.example", false);
        repo.insert_principal::<CompanyRealm>("contact@acme.example", "correct-password", &acme);
        let config = SessionConfig::default();

        let result = AuthService::new(&repo, &config)
            .login::<CompanyRealm>(&login("contact@acme.example", "correct-password"), None)
            .await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
        assert_eq!(repo.session_count(), 0);
    }

    #[tokio::test]
    async fn empty_login_fails_validation() {
        let repo = MockRepository::default();
        let config = SessionConfig::default();

        let result = AuthService::new(&repo, &config).login::<AdminRealm>(&login("", "x"), None).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn logout_deletes_the_session() {
        let repo = MockRepository::default();
        let admin = admin_user("root", true);
        repo.insert_principal::<AdminRealm>("root", "correct-password", &admin);
        let config = SessionConfig::default();
        let service = AuthService::new(&repo, &config);

        let (session, _) = service.login::<AdminRealm>(&login("root", "correct-password"), None).await.unwrap();
        assert!(service.logout::<AdminRealm>(&session.token).await.unwrap());
        assert!(!service.logout::<AdminRealm>(&session.token).await.unwrap());
        assert!(SessionResolver::new(&repo).resolve::<AdminRealm>(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn logout_without_token_is_a_no_op() {
        let repo = MockRepository::default();
        let config = SessionConfig::default();

        assert!(!AuthService::new(&repo, &config).logout::<AdminRealm>("").await.unwrap());
    }
}
