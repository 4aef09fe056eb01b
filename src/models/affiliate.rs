use crate::models::document::validate_cpf;
use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct Affiliate {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub cpf: String,
    pub company_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct AffiliateRegistration {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "validate_cpf"))]
    pub cpf: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub company_id: Option<Uuid>,
}
