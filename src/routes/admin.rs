use crate::auth::{Authenticated, SessionToken};
use crate::config::Config;
use crate::database::postgres_repository::PostgresRepository;
use crate::database::session::PrincipalRepository;
use crate::error::app_error::AppError;
use crate::error::json::JsonBody;
use crate::middleware::UserAgent;
use crate::models::admin::{AdminUser, StatusUpdateRequest};
use crate::models::affiliate::Affiliate;
use crate::models::company::Company;
use crate::models::session::{LoginRequest, LoginResponse};
use crate::realm::{AdminRealm, AffiliateRealm, CompanyRealm};
use crate::routes::session;
use rocket::http::{CookieJar, Status};
use rocket::serde::json::Json;
use rocket::{State, get, patch, post};
use rocket_okapi::openapi;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

type CurrentAdmin = Authenticated<AdminRealm>;

/// Log in as an admin with username or email
#[openapi(tag = "Admin")]
#[post("/login", data = "<payload>")]
pub async fn post_admin_login(
    pool: &State<PgPool>,
    config: &State<Config>,
    cookies: &CookieJar<'_>,
    user_agent: UserAgent,
    payload: JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse<AdminUser>>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    session::login::<AdminRealm>(&repo, config, cookies, user_agent, &payload).await
}

#[openapi(tag = "Admin")]
#[post("/logout")]
pub async fn post_admin_logout(pool: &State<PgPool>, config: &State<Config>, cookies: &CookieJar<'_>, token: SessionToken<AdminRealm>) -> Result<Status, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    session::logout::<AdminRealm>(&repo, config, cookies, token).await
}

/// The admin behind the current session
#[openapi(tag = "Admin")]
#[get("/me")]
pub async fn get_admin_me(current_admin: CurrentAdmin) -> Json<AdminUser> {
    Json(current_admin.into_inner())
}

#[openapi(tag = "Admin")]
#[get("/affiliates")]
pub async fn list_affiliates(pool: &State<PgPool>, _current_admin: CurrentAdmin) -> Result<Json<Vec<Affiliate>>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    Ok(Json(repo.list_affiliates().await?))
}

#[openapi(tag = "Admin")]
#[get("/affiliates/<id>")]
pub async fn get_affiliate(pool: &State<PgPool>, _current_admin: CurrentAdmin, id: &str) -> Result<Json<Affiliate>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let uuid = Uuid::parse_str(id)?;
    repo.get_principal::<AffiliateRealm>(&uuid)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Affiliate not found".to_string()))
}

/// Activate or deactivate an affiliate. Deactivation invalidates its sessions
/// on their next use.
#[openapi(tag = "Admin")]
#[patch("/affiliates/<id>/status", data = "<payload>")]
pub async fn patch_affiliate_status(
    pool: &State<PgPool>,
    current_admin: CurrentAdmin,
    id: &str,
    payload: JsonBody<StatusUpdateRequest>,
) -> Result<Json<Affiliate>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let uuid = Uuid::parse_str(id)?;
    let affiliate = repo
        .set_affiliate_active(&uuid, payload.is_active)
        .await?
        .ok_or_else(|| AppError::NotFound("Affiliate not found".to_string()))?;

    info!(admin_id = %current_admin.principal.id, affiliate_id = %uuid, is_active = payload.is_active, "affiliate status changed");
    Ok(Json(affiliate))
}

#[openapi(tag = "Admin")]
#[get("/companies")]
pub async fn list_companies(pool: &State<PgPool>, _current_admin: CurrentAdmin) -> Result<Json<Vec<Company>>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    Ok(Json(repo.list_companies().await?))
}

#[openapi(tag = "Admin")]
#[get("/companies/<id>")]
pub async fn get_company(pool: &State<PgPool>, _current_admin: CurrentAdmin, id: &str) -> Result<Json<Company>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let uuid = Uuid::parse_str(id)?;
    repo.get_principal::<CompanyRealm>(&uuid)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))
}

#[openapi(tag = "Admin")]
#[patch("/companies/<id>/status", data = "<payload>")]
pub async fn patch_company_status(
    pool: &State<PgPool>,
    current_admin: CurrentAdmin,
    id: &str,
    payload: JsonBody<StatusUpdateRequest>,
) -> Result<Json<Company>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let uuid = Uuid::parse_str(id)?;
    let company = repo
        .set_company_active(&uuid, payload.is_active)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

    info!(admin_id = %current_admin.principal.id, company_id = %uuid, is_active = payload.is_active, "company status changed");
    Ok(Json(company))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![
        post_admin_login,
        post_admin_logout,
        get_admin_me,
        list_affiliates,
        get_affiliate,
        patch_affiliate_status,
        list_companies,
        get_company,
        patch_company_status
    ]
}

#[cfg(test)]
mod tests {
    use crate::{Config, build_rocket};
    use rocket::http::{Cookie, Header, Status};
    use rocket::local::asynchronous::Client;

    async fn client() -> Client {
        Client::tracked(build_rocket(Config::default())).await.expect("valid rocket instance")
    }

    #[rocket::async_test]
    async fn me_without_token_is_401_json() {
        let client = client().await;
        let response = client.get("/api/admin/me").dispatch().await;

        assert_eq!(response.status(), Status::Unauthorized);
        let body: serde_json::Value = response.into_json().await.expect("json body");
        assert!(body["error"].is_string());
    }

    #[rocket::async_test]
    async fn listing_affiliates_requires_admin_session() {
        let client = client().await;
        let response = client.get("/api/admin/affiliates").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn affiliate_cookie_does_not_authenticate_admin_routes() {
        let client = client().await;
        let response = client
            .get("/api/admin/me")
            .cookie(Cookie::new("affiliate_session", "some-token"))
            .header(Header::new("x-affiliate-token", "some-token"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn logout_without_session_still_succeeds() {
        let client = client().await;
        let response = client.post("/api/admin/logout").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
    }

    #[rocket::async_test]
    async fn malformed_login_body_is_rejected_before_lookup() {
        let client = client().await;
        let response = client
            .post("/api/admin/login")
            .header(rocket::http::ContentType::JSON)
            .body("{\"login\": 42")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
        let body: serde_json::Value = response.into_json().await.expect("json body");
        assert!(body["error"].is_string());
    }
}
