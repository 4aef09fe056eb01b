use crate::auth::{Authenticated, SessionToken};
use crate::config::Config;
use crate::database::credentials::hash_password;
use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::error::json::JsonBody;
use crate::middleware::UserAgent;
use crate::models::affiliate::Affiliate;
use crate::models::company::{Company, CompanyRegistration};
use crate::models::session::{LoginRequest, LoginResponse};
use crate::realm::CompanyRealm;
use crate::routes::session;
use rocket::http::{CookieJar, Status};
use rocket::response::status::Created;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_okapi::openapi;
use sqlx::PgPool;
use tracing::info;
use validator::Validate;

type CurrentCompany = Authenticated<CompanyRealm>;

#[openapi(tag = "Companies")]
#[post("/register", data = "<payload>")]
pub async fn post_company_register(pool: &State<PgPool>, config: &State<Config>, payload: JsonBody<CompanyRegistration>) -> Result<Created<Json<Company>>, AppError> {
    payload.validate()?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let password_hash = hash_password(&payload.password)?;
    let company = repo.create_company(&payload, &password_hash, config.registration.auto_activate).await?;

    info!(company_id = %company.id, is_active = company.is_active, "company registered");
    let location = config.api.path_for(&format!("/admin/companies/{}", company.id));
    Ok(Created::new(location).body(Json(company)))
}

/// Log in with email or CNPJ
#[openapi(tag = "Companies")]
#[post("/login", data = "<payload>")]
pub async fn post_company_login(
    pool: &State<PgPool>,
    config: &State<Config>,
    cookies: &CookieJar<'_>,
    user_agent: UserAgent,
    payload: JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse<Company>>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    session::login::<CompanyRealm>(&repo, config, cookies, user_agent, &payload).await
}

#[openapi(tag = "Companies")]
#[post("/logout")]
pub async fn post_company_logout(pool: &State<PgPool>, config: &State<Config>, cookies: &CookieJar<'_>, token: SessionToken<CompanyRealm>) -> Result<Status, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    session::logout::<CompanyRealm>(&repo, config, cookies, token).await
}

#[openapi(tag = "Companies")]
#[get("/me")]
pub async fn get_company_me(current_company: CurrentCompany) -> Json<Company> {
    Json(current_company.into_inner())
}

/// Affiliates linked to the company behind the current session
#[openapi(tag = "Companies")]
#[get("/affiliates")]
pub async fn list_company_affiliates(pool: &State<PgPool>, current_company: CurrentCompany) -> Result<Json<Vec<Affiliate>>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    Ok(Json(repo.list_affiliates_for_company(&current_company.principal.id).await?))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![
        post_company_register,
        post_company_login,
        post_company_logout,
        get_company_me,
        list_company_affiliates
    ]
}
