use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::company::{Company, CompanyRegistration};
use crate::models::document::digits_only;
use uuid::Uuid;

impl PostgresRepository {
    pub async fn create_company(&self, registration: &CompanyRegistration, password_hash: &str, is_active: bool) -> Result<Company, AppError> {
        sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name, email, cnpj, password_hash, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, cnpj, is_active, created_at
            "#,
        )
        .bind(registration.name.trim())
        .bind(registration.email.trim().to_lowercase())
        .bind(digits_only(&registration.cnpj))
        .bind(password_hash)
        .bind(is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::unique_violation(e, "Company with this email or CNPJ"))
    }

    pub async fn list_companies(&self) -> Result<Vec<Company>, AppError> {
        let companies = sqlx::query_as::<_, Company>(
            r#"
            SELECT id, name, email, cnpj, is_active, created_at
            FROM companies
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(companies)
    }

    pub async fn set_company_active(&self, id: &Uuid, is_active: bool) -> Result<Option<Company>, AppError> {
        let company = sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
            SET is_active = $2
            WHERE id = $1
            RETURNING id, name, email, cnpj, is_active, created_at
            "#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(company)
    }
}
