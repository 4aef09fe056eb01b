use crate::models::document::validate_cnpj;
use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub cnpj: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct CompanyRegistration {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "validate_cnpj"))]
    pub cnpj: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_cnpj_fails_validation() {
        let payload = CompanyRegistration {
            name: "Acme".to_string(),
            email: "contact@acme.example".to_string(),
            cnpj: "11.222.333/0001-00".to_string(),
            password: "long-enough".to_string(),
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("cnpj"));
    }
}
