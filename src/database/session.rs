use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::session::{Credentials, SessionRecord};
use crate::realm::Realm;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait::async_trait]
pub trait SessionRepository: Send + Sync {
    /// Single lookup of a live session of realm `R` joined to an active principal.
    async fn find_session<R: Realm>(&self, token_hash: &str) -> Result<Option<SessionRecord<R::Principal>>, AppError>;
    /// Stores a new session and returns its creation time.
    async fn create_session<R: Realm>(&self, principal_id: &Uuid, token_hash: &str, expires_at: DateTime<Utc>, user_agent: Option<&str>) -> Result<DateTime<Utc>, AppError>;
    async fn delete_session(&self, token_hash: &str) -> Result<bool, AppError>;
    async fn delete_expired_sessions(&self) -> Result<u64, AppError>;
}

#[async_trait::async_trait]
pub trait PrincipalRepository: Send + Sync {
    async fn find_credentials<R: Realm>(&self, login: &str) -> Result<Option<Credentials>, AppError>;
    async fn get_principal<R: Realm>(&self, id: &Uuid) -> Result<Option<R::Principal>, AppError>;
}

#[async_trait::async_trait]
impl SessionRepository for PostgresRepository {
    async fn find_session<R: Realm>(&self, token_hash: &str) -> Result<Option<SessionRecord<R::Principal>>, AppError> {
        let query = format!(
            r#"
            SELECT s.principal_id,
                   s.created_at AS session_created_at,
                   s.expires_at AS session_expires_at,
                   {columns}
            FROM sessions s
            JOIN {table} p ON p.id = s.principal_id
            WHERE s.token_hash = $1
              AND s.realm = $2
              AND s.expires_at > now()
              AND p.is_active = TRUE
            "#,
            columns = R::PRINCIPAL_COLUMNS,
            table = R::PRINCIPAL_TABLE,
        );

        let record = sqlx::query_as::<_, SessionRecord<R::Principal>>(&query)
            .bind(token_hash)
            .bind(R::KIND.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    async fn create_session<R: Realm>(&self, principal_id: &Uuid, token_hash: &str, expires_at: DateTime<Utc>, user_agent: Option<&str>) -> Result<DateTime<Utc>, AppError> {
        sqlx::query("DELETE FROM sessions WHERE realm = $1 AND principal_id = $2 AND expires_at <= now()")
            .bind(R::KIND.as_str())
            .bind(principal_id)
            .execute(&self.pool)
            .await?;

        let created_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            INSERT INTO sessions (token_hash, realm, principal_id, user_agent, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING created_at
            "#,
        )
        .bind(token_hash)
        .bind(R::KIND.as_str())
        .bind(principal_id)
        .bind(user_agent)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created_at)
    }

    async fn delete_session(&self, token_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_sessions(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()").execute(&self.pool).await?;

        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl PrincipalRepository for PostgresRepository {
    async fn find_credentials<R: Realm>(&self, login: &str) -> Result<Option<Credentials>, AppError> {
        let query = format!(
            "SELECT p.id, p.password_hash, p.is_active FROM {table} p WHERE {matcher}",
            table = R::PRINCIPAL_TABLE,
            matcher = R::LOGIN_MATCH,
        );

        let credentials = sqlx::query_as::<_, Credentials>(&query).bind(login).fetch_optional(&self.pool).await?;

        Ok(credentials)
    }

    async fn get_principal<R: Realm>(&self, id: &Uuid) -> Result<Option<R::Principal>, AppError> {
        let query = format!(
            "SELECT {columns} FROM {table} p WHERE p.id = $1",
            columns = R::PRINCIPAL_COLUMNS,
            table = R::PRINCIPAL_TABLE,
        );

        let principal = sqlx::query_as::<_, R::Principal>(&query).bind(id).fetch_optional(&self.pool).await?;

        Ok(principal)
    }
}
