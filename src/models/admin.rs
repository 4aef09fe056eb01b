use chrono::{DateTime, Utc};
use regex::Regex;
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use std::sync::LazyLock;
use uuid::Uuid;
use validator::Validate;

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9_.-]{3,32}$").expect("valid username regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, sqlx::FromRow)]
pub struct AdminUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Admin accounts are provisioned from the maintenance binary, never over HTTP.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAdminRequest {
    #[validate(regex(path = *USERNAME_RE))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct StatusUpdateRequest {
    pub is_active: bool,
}
