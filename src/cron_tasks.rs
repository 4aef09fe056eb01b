use crate::Config;
use crate::database::credentials::hash_password;
use crate::database::postgres_repository::PostgresRepository;
use crate::database::session::SessionRepository;
use crate::db::init_pool;
use crate::models::admin::{AdminUser, CreateAdminRequest};
use validator::Validate;

async fn connect(config: &Config) -> Result<PostgresRepository, String> {
    let pool = init_pool(&config.database)
        .await
        .map_err(|err| format!("Failed to initialize database pool: {err}"))?;

    Ok(PostgresRepository { pool })
}

/// Deletes every expired session, returning how many rows went.
pub async fn purge_expired_sessions(config: &Config) -> Result<u64, String> {
    let repo = connect(config).await?;
    let result = repo
        .delete_expired_sessions()
        .await
        .map_err(|err| format!("Failed to purge expired sessions: {err:?}"));

    repo.pool.close().await;
    result
}

pub async fn create_admin(config: &Config, username: &str, email: &str, password: &str) -> Result<AdminUser, String> {
    let request = CreateAdminRequest {
        username: username.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    };
    request.validate().map_err(|err| format!("Invalid admin: {err}"))?;
    let password_hash = hash_password(&request.password).map_err(|err| format!("Failed to hash password: {err:?}"))?;

    let repo = connect(config).await?;
    let result = repo
        .create_admin(&request, &password_hash)
        .await
        .map_err(|err| format!("Failed to create admin: {err}"));

    repo.pool.close().await;
    result
}
