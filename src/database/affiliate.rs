use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::affiliate::{Affiliate, AffiliateRegistration};
use crate::models::document::digits_only;
use uuid::Uuid;

const AFFILIATE_COLUMNS: &str = "id, name, email, cpf, company_id, is_active, created_at";

impl PostgresRepository {
    pub async fn create_affiliate(&self, registration: &AffiliateRegistration, password_hash: &str, is_active: bool) -> Result<Affiliate, AppError> {
        let query = format!(
            r#"
            INSERT INTO affiliates (name, email, cpf, company_id, password_hash, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {AFFILIATE_COLUMNS}
            "#
        );

        let result = sqlx::query_as::<_, Affiliate>(&query)
            .bind(registration.name.trim())
            .bind(registration.email.trim().to_lowercase())
            .bind(digits_only(&registration.cpf))
            .bind(registration.company_id)
            .bind(password_hash)
            .bind(is_active)
            .fetch_one(&self.pool)
            .await;

        match result {
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => Err(AppError::BadRequest("Unknown company".to_string())),
            other => other.map_err(|e| AppError::unique_violation(e, "Affiliate with this email or CPF")),
        }
    }

    pub async fn list_affiliates(&self) -> Result<Vec<Affiliate>, AppError> {
        let query = format!("SELECT {AFFILIATE_COLUMNS} FROM affiliates ORDER BY created_at DESC");
        let affiliates = sqlx::query_as::<_, Affiliate>(&query).fetch_all(&self.pool).await?;

        Ok(affiliates)
    }

    pub async fn list_affiliates_for_company(&self, company_id: &Uuid) -> Result<Vec<Affiliate>, AppError> {
        let query = format!("SELECT {AFFILIATE_COLUMNS} FROM affiliates WHERE company_id = $1 ORDER BY created_at DESC");
        let affiliates = sqlx::query_as::<_, Affiliate>(&query).bind(company_id).fetch_all(&self.pool).await?;

        Ok(affiliates)
    }

    pub async fn set_affiliate_active(&self, id: &Uuid, is_active: bool) -> Result<Option<Affiliate>, AppError> {
        let query = format!("UPDATE affiliates SET is_active = $2 WHERE id = $1 RETURNING {AFFILIATE_COLUMNS}");
        let affiliate = sqlx::query_as::<_, Affiliate>(&query)
            .bind(id)
            .bind(is_active)
            .fetch_optional(&self.pool)
            .await?;

        Ok(affiliate)
    }
}
