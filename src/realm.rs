//! Realms are the three kinds of principal a session can belong to.
//!
//! Every realm shares one session table and one resolution path; a realm only
//! contributes its principal table, the columns to select, how a login
//! identifier is matched, and where its token travels on a request.

use crate::auth::TokenLocations;
use crate::models::admin::AdminUser;
use crate::models::affiliate::Affiliate;
use crate::models::company::Company;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::FromRow;
use sqlx::postgres::PgRow;
use std::fmt;
use uuid::Uuid;

pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RealmKind {
    Admin,
    Affiliate,
    Company,
}

impl RealmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RealmKind::Admin => "admin",
            RealmKind::Affiliate => "affiliate",
            RealmKind::Company => "company",
        }
    }
}

impl fmt::Display for RealmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated entity behind a session.
pub trait Principal: for<'r> FromRow<'r, PgRow> + Serialize + DeserializeOwned + JsonSchema + Clone + Send + Sync + Unpin + 'static {
    fn id(&self) -> Uuid;
    fn is_active(&self) -> bool;
}

pub trait Realm: Send + Sync + 'static {
    type Principal: Principal;

    const KIND: RealmKind;
    const PRINCIPAL_TABLE: &'static str;
    /// Principal columns, qualified with the `p` alias.
    const PRINCIPAL_COLUMNS: &'static str;
    /// SQL predicate over `p` matching the login identifier bound as `$1`.
    const LOGIN_MATCH: &'static str;
    const TOKEN_HEADER: &'static str;
    const SESSION_COOKIE: &'static str;

    fn token_locations() -> TokenLocations<'static> {
        TokenLocations {
            primary_header: Self::TOKEN_HEADER,
            secondary_header: SESSION_TOKEN_HEADER,
            cookie: Self::SESSION_COOKIE,
        }
    }

    /// Normalizes a login identifier before it is matched.
    fn normalize_login(login: &str) -> String {
        login.trim().to_lowercase()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AdminRealm;

#[derive(Debug, Clone, Copy)]
pub struct AffiliateRealm;

#[derive(Debug, Clone, Copy)]
pub struct CompanyRealm;

impl Principal for AdminUser {
    fn id(&self) -> Uuid {
        self.id
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}

impl Principal for Affiliate {
    fn id(&self) -> Uuid {
        self.id
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}

impl Principal for Company {
    fn id(&self) -> Uuid {
        self.id
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}

impl Realm for AdminRealm {
    type Principal = AdminUser;

    const KIND: RealmKind = RealmKind::Admin;
    const PRINCIPAL_TABLE: &'static str = "admin_users";
    const PRINCIPAL_COLUMNS: &'static str = "p.id, p.username, p.email, p.is_active, p.created_at";
    const LOGIN_MATCH: &'static str = "(p.username = $1 OR p.email = $1)";
    const TOKEN_HEADER: &'static str = "x-admin-token";
    const SESSION_COOKIE: &'static str = "admin_session";
}

impl Realm for AffiliateRealm {
    type Principal = Affiliate;

    const KIND: RealmKind = RealmKind::Affiliate;
    const PRINCIPAL_TABLE: &'static str = "affiliates";
    const PRINCIPAL_COLUMNS: &'static str = "p.id, p.name, p.email, p.cpf, p.company_id, p.is_active, p.created_at";
    const LOGIN_MATCH: &'static str = "(p.email = $1 OR p.cpf = $1)";
    const TOKEN_HEADER: &'static str = "x-affiliate-token";
    const SESSION_COOKIE: &'static str = "affiliate_session";

    fn normalize_login(login: &str) -> String {
        normalize_email_or_document(login, 11)
    }
}

impl Realm for CompanyRealm {
    type Principal = Company;

    const KIND: RealmKind = RealmKind::Company;
    const PRINCIPAL_TABLE: &'static str = "companies";
    const PRINCIPAL_COLUMNS: &'static str = "p.id, p.name, p.email, p.cnpj, p.is_active, p.created_at";
    const LOGIN_MATCH: &'static str = "(p.email = $1 OR p.cnpj = $1)";
    const TOKEN_HEADER: &'static str = "x-company-token";
    const SESSION_COOKIE: &'static str = "company_session";

    fn normalize_login(login: &str) -> String {
        normalize_email_or_document(login, 14)
    }
}

/// Emails are lowercased; anything that reduces to exactly `document_len`
/// digits once punctuation is dropped is treated as a document number.
fn normalize_email_or_document(login: &str, document_len: usize) -> String {
    let trimmed = login.trim();
    if trimmed.contains('@') {
        return trimmed.to_lowercase();
    }

    let digits = crate::models::document::digits_only(trimmed);
    if digits.len() == document_len { digits } else { trimmed.to_lowercase() }
}
