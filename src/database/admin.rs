use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::admin::{AdminUser, CreateAdminRequest};
use uuid::Uuid;

impl PostgresRepository {
    pub async fn create_admin(&self, request: &CreateAdminRequest, password_hash: &str) -> Result<AdminUser, AppError> {
        sqlx::query_as::<_, AdminUser>(
            r#"
            INSERT INTO admin_users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, is_active, created_at
            "#,
        )
        .bind(request.username.trim().to_lowercase())
        .bind(request.email.trim().to_lowercase())
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::unique_violation(e, format!("Admin {}", request.username)))
    }

    pub async fn set_admin_active(&self, id: &Uuid, is_active: bool) -> Result<Option<AdminUser>, AppError> {
        let admin = sqlx::query_as::<_, AdminUser>(
            r#"
            UPDATE admin_users
            SET is_active = $2
            WHERE id = $1
            RETURNING id, username, email, is_active, created_at
            "#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(admin)
    }
}
