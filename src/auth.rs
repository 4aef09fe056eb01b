use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::realm::{Realm, RealmKind};
use crate::service::session::SessionResolver;
use rocket::http::{HeaderMap, Status};
use rocket::outcome::Outcome;
use rocket::request::{FromRequest, Outcome as RequestOutcome, Request};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{Object, Responses, SecurityRequirement, SecurityScheme, SecuritySchemeData};
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use sqlx::PgPool;
use std::marker::PhantomData;
use tracing::{debug, error};
use uuid::Uuid;

const BEARER_PREFIX: &str = "bearer ";

/// Where a session token may travel on a request, in precedence order after
/// the two custom headers: `Authorization: Bearer`, then the cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLocations<'a> {
    pub primary_header: &'a str,
    pub secondary_header: &'a str,
    pub cookie: &'a str,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn bearer_token(authorization: Option<&str>) -> Option<&str> {
    let value = authorization?.trim();
    let prefix = value.get(..BEARER_PREFIX.len())?;
    if prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
        non_empty(value.get(BEARER_PREFIX.len()..))
    } else {
        None
    }
}

/// Returns the first non-empty token found, or an empty string.
pub fn extract_session_token(headers: &HeaderMap<'_>, cookie_value: Option<&str>, locations: &TokenLocations<'_>) -> String {
    non_empty(headers.get_one(locations.primary_header))
        .or_else(|| non_empty(headers.get_one(locations.secondary_header)))
        .or_else(|| bearer_token(headers.get_one("Authorization")))
        .or_else(|| non_empty(cookie_value))
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn request_session_token(req: &Request<'_>, locations: &TokenLocations<'_>) -> String {
    let cookie = req.cookies().get(locations.cookie).map(|c| c.value());
    extract_session_token(req.headers(), cookie, locations)
}

/// Identity of the authenticated caller, cached per request for logging.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal {
    pub realm: RealmKind,
    pub id: Uuid,
}

/// Request guard that admits only callers holding a live session of realm `R`.
pub struct Authenticated<R: Realm> {
    pub principal: R::Principal,
    _realm: PhantomData<R>,
}

impl<R: Realm> Authenticated<R> {
    pub fn into_inner(self) -> R::Principal {
        self.principal
    }
}

#[rocket::async_trait]
impl<'r, R: Realm> FromRequest<'r> for Authenticated<R> {
    type Error = AppError;

    async fn from_request(req: &'r Request<'_>) -> RequestOutcome<Self, Self::Error> {
        let token = request_session_token(req, &R::token_locations());
        if token.is_empty() {
            debug!(realm = %R::KIND, "request carried no session token");
            return Outcome::Error((Status::Unauthorized, AppError::Unauthorized));
        }

        let pool = match req.rocket().state::<PgPool>() {
            Some(pool) => pool,
            None => return Outcome::Error((Status::InternalServerError, AppError::MissingConfiguration("DATABASE_URL"))),
        };

        let repo = PostgresRepository { pool: pool.clone() };

        match SessionResolver::new(&repo).resolve::<R>(&token).await {
            Ok(Some(principal)) => {
                let current = CurrentPrincipal {
                    realm: R::KIND,
                    id: crate::realm::Principal::id(&principal),
                };
                req.local_cache(|| Some(current));
                Outcome::Success(Authenticated {
                    principal,
                    _realm: PhantomData,
                })
            }
            Ok(None) => Outcome::Error((Status::Unauthorized, AppError::Unauthorized)),
            Err(err) => {
                error!(realm = %R::KIND, error = ?err, "session lookup failed");
                Outcome::Error((Status::InternalServerError, err))
            }
        }
    }
}

/// The raw session token of realm `R`, possibly empty. Never fails; used where
/// a stale or missing session must not block the handler (logout).
pub struct SessionToken<R: Realm> {
    pub token: String,
    _realm: PhantomData<R>,
}

#[rocket::async_trait]
impl<'r, R: Realm> FromRequest<'r> for SessionToken<R> {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> RequestOutcome<Self, Self::Error> {
        Outcome::Success(SessionToken {
            token: request_session_token(req, &R::token_locations()),
            _realm: PhantomData,
        })
    }
}

fn security_input<R: Realm>() -> RequestHeaderInput {
    let scheme_name = format!("{}Session", R::KIND);
    let security_scheme = SecurityScheme {
        description: Some(format!(
            "Session token from POST /api/{}/login, sent as the `{}` or `x-session-token` header, \
             as `Authorization: Bearer <token>`, or as the `{}` cookie.",
            R::KIND,
            R::TOKEN_HEADER,
            R::SESSION_COOKIE
        )),
        data: SecuritySchemeData::ApiKey {
            name: R::TOKEN_HEADER.to_string(),
            location: "header".to_string(),
        },
        extensions: Object::default(),
    };

    let mut security_req = SecurityRequirement::new();
    security_req.insert(scheme_name.clone(), Vec::new());

    RequestHeaderInput::Security(scheme_name, security_scheme, security_req)
}

impl<'a, R: Realm> OpenApiFromRequest<'a> for Authenticated<R> {
    fn from_request_input(_gen: &mut OpenApiGenerator, _name: String, _required: bool) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(security_input::<R>())
    }

    fn get_responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        use rocket_okapi::okapi::openapi3::{RefOr, Response};
        let mut responses = Responses::default();
        responses.responses.insert(
            "401".to_string(),
            RefOr::Object(Response {
                description: "Unauthorized - missing, expired or inactive session".to_string(),
                ..Default::default()
            }),
        );
        Ok(responses)
    }
}

impl<'a, R: Realm> OpenApiFromRequest<'a> for SessionToken<R> {
    fn from_request_input(_gen: &mut OpenApiGenerator, _name: String, _required: bool) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(security_input::<R>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rocket::http::Header;

    const LOCATIONS: TokenLocations<'static> = TokenLocations {
        primary_header: "x-admin-token",
        secondary_header: "x-session-token",
        cookie: "admin_session",
    };

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap<'static> {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.add(Header::new(*name, *value));
        }
        map
    }

    #[test]
    fn returns_empty_when_no_source_present() {
        assert_eq!(extract_session_token(&HeaderMap::new(), None, &LOCATIONS), "");
    }

    #[test]
    fn reads_each_source_on_its_own() {
        assert_eq!(extract_session_token(&headers(&[("x-admin-token", "a")]), None, &LOCATIONS), "a");
        assert_eq!(extract_session_token(&headers(&[("x-session-token", "b")]), None, &LOCATIONS), "b");
        assert_eq!(extract_session_token(&headers(&[("Authorization", "Bearer c")]), None, &LOCATIONS), "c");
        assert_eq!(extract_session_token(&HeaderMap::new(), Some("d"), &LOCATIONS), "d");
    }

    #[test]
    fn primary_header_wins_over_everything() {
        let map = headers(&[("x-admin-token", "a"), ("x-session-token", "b"), ("Authorization", "Bearer c")]);
        assert_eq!(extract_session_token(&map, Some("d"), &LOCATIONS), "a");
    }

    #[test]
    fn secondary_header_wins_over_bearer_and_cookie() {
        let map = headers(&[("x-session-token", "b"), ("Authorization", "Bearer c")]);
        assert_eq!(extract_session_token(&map, Some("d"), &LOCATIONS), "b");
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let map = headers(&[("Authorization", "Bearer c")]);
        assert_eq!(extract_session_token(&map, Some("d"), &LOCATIONS), "c");
    }

    #[test]
    fn bearer_prefix_is_case_insensitive() {
        for value in ["bearer tok", "BEARER tok", "BeArEr tok"] {
            let mut map = HeaderMap::new();
            map.add(Header::new("Authorization", value));
            assert_eq!(extract_session_token(&map, None, &LOCATIONS), "tok");
        }
    }

    #[test]
    fn non_bearer_authorization_is_ignored() {
        let map = headers(&[("Authorization", "Basic dXNlcjpwYXNz")]);
        assert_eq!(extract_session_token(&map, Some("cookie-token"), &LOCATIONS), "cookie-token");
    }

    #[test]
    fn blank_values_fall_through_to_next_source() {
        let map = headers(&[("x-admin-token", "   "), ("x-session-token", ""), ("Authorization", "Bearer ")]);
        assert_eq!(extract_session_token(&map, Some("from-cookie"), &LOCATIONS), "from-cookie");
    }

    #[test]
    fn header_names_match_case_insensitively() {
        let map = headers(&[("X-Admin-Token", "upper")]);
        assert_eq!(extract_session_token(&map, None, &LOCATIONS), "upper");
    }

    proptest! {
        #[test]
        fn single_source_is_returned_verbatim(token in "[A-Za-z0-9]{1,64}", source in 0usize..4) {
            let mut map = HeaderMap::new();
            let mut cookie = None;
            match source {
                0 => map.add(Header::new("x-admin-token", token.clone())),
                1 => map.add(Header::new("x-session-token", token.clone())),
                2 => map.add(Header::new("Authorization", format!("Bearer {token}"))),
                _ => cookie = Some(token.clone()),
            }
            prop_assert_eq!(extract_session_token(&map, cookie.as_deref(), &LOCATIONS), token);
        }

        #[test]
        fn earliest_present_source_wins(tokens in proptest::collection::vec("[a-f0-9]{8}", 4), present in proptest::collection::vec(any::<bool>(), 4)) {
            let mut map = HeaderMap::new();
            if present[0] { map.add(Header::new("x-admin-token", tokens[0].clone())); }
            if present[1] { map.add(Header::new("x-session-token", tokens[1].clone())); }
            if present[2] { map.add(Header::new("Authorization", format!("Bearer {}", tokens[2]))); }
            let cookie = present[3].then(|| tokens[3].clone());

            let expected = present.iter().position(|p| *p).map(|i| tokens[i].clone()).unwrap_or_default();
            prop_assert_eq!(extract_session_token(&map, cookie.as_deref(), &LOCATIONS), expected);
        }
    }
}
