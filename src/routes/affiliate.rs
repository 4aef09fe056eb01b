use crate::auth::{Authenticated, SessionToken};
use crate::config::Config;
use crate::database::credentials::hash_password;
use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::error::json::JsonBody;
use crate::middleware::UserAgent;
use crate::models::affiliate::{Affiliate, AffiliateRegistration};
use crate::models::session::{LoginRequest, LoginResponse};
use crate::realm::AffiliateRealm;
use crate::routes::session;
use rocket::http::{CookieJar, Status};
use rocket::response::status::Created;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_okapi::openapi;
use sqlx::PgPool;
use tracing::info;
use validator::Validate;

/// Register a new affiliate. The account starts active unless registration
/// is configured to require admin approval.
#[openapi(tag = "Affiliates")]
#[post("/register", data = "<payload>")]
pub async fn post_affiliate_register(pool: &State<PgPool>, config: &State<Config>, payload: JsonBody<AffiliateRegistration>) -> Result<Created<Json<Affiliate>>, AppError> {
    payload.validate()?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let password_hash = hash_password(&payload.password)?;
    let affiliate = repo.create_affiliate(&payload, &password_hash, config.registration.auto_activate).await?;

    info!(affiliate_id = %affiliate.id, is_active = affiliate.is_active, "affiliate registered");
    let location = config.api.path_for(&format!("/admin/affiliates/{}", affiliate.id));
    Ok(Created::new(location).body(Json(affiliate)))
}

/// Log in with email or CPF
#[openapi(tag = "Affiliates")]
#[post("/login", data = "<payload>")]
pub async fn post_affiliate_login(
    pool: &State<PgPool>,
    config: &State<Config>,
    cookies: &CookieJar<'_>,
    user_agent: UserAgent,
    payload: JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse<Affiliate>>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    session::login::<AffiliateRealm>(&repo, config, cookies, user_agent, &payload).await
}

#[openapi(tag = "Affiliates")]
#[post("/logout")]
pub async fn post_affiliate_logout(pool: &State<PgPool>, config: &State<Config>, cookies: &CookieJar<'_>, token: SessionToken<AffiliateRealm>) -> Result<Status, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    session::logout::<AffiliateRealm>(&repo, config, cookies, token).await
}

#[openapi(tag = "Affiliates")]
#[get("/me")]
pub async fn get_affiliate_me(current_affiliate: Authenticated<AffiliateRealm>) -> Json<Affiliate> {
    Json(current_affiliate.into_inner())
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![post_affiliate_register, post_affiliate_login, post_affiliate_logout, get_affiliate_me]
}
