use crate::auth::SessionToken;
use crate::config::{Config, SessionConfig};
use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::middleware::UserAgent;
use crate::models::session::{LoginRequest, LoginResponse, Session};
use crate::realm::Realm;
use crate::service::auth::AuthService;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::serde::json::Json;

pub(crate) fn session_cookie<R: Realm>(session: &Session, config: &SessionConfig) -> Cookie<'static> {
    Cookie::build((R::SESSION_COOKIE, session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(rocket::time::Duration::seconds(config.ttl_seconds))
        .build()
}

/// Shared body of every realm's login route.
pub(crate) async fn login<R: Realm>(
    repo: &PostgresRepository,
    config: &Config,
    cookies: &CookieJar<'_>,
    user_agent: UserAgent,
    payload: &LoginRequest,
) -> Result<Json<LoginResponse<R::Principal>>, AppError> {
    let service = AuthService::new(repo, &config.session);
    let (session, principal) = service.login::<R>(payload, user_agent.0.as_deref()).await?;

    cookies.add(session_cookie::<R>(&session, &config.session));

    Ok(Json(LoginResponse {
        token: session.token,
        expires_at: session.expires_at,
        principal,
    }))
}

/// Shared body of every realm's logout route. Succeeds whether or not a live
/// session was attached.
pub(crate) async fn logout<R: Realm>(repo: &PostgresRepository, config: &Config, cookies: &CookieJar<'_>, token: SessionToken<R>) -> Result<Status, AppError> {
    AuthService::new(repo, &config.session).logout::<R>(&token.token).await?;
    cookies.remove(Cookie::build(R::SESSION_COOKIE).path("/").build());

    Ok(Status::Ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realm::{AdminRealm, RealmKind};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn session_cookie_is_http_only_and_scoped_to_root() {
        let session = Session {
            token: "abc".to_string(),
            realm: RealmKind::Admin,
            principal_id: Uuid::new_v4(),
            created_at: Utc::now(),
            expires_at: Utc::now(),
        };
        let config = SessionConfig::default();

        let cookie = session_cookie::<AdminRealm>(&session, &config);
        assert_eq!(cookie.name(), "admin_session");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(rocket::time::Duration::seconds(config.ttl_seconds)));
    }
}
