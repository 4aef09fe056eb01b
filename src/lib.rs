mod auth;
pub mod client;
mod config;
mod cron_tasks;
mod database;
mod db;
mod error;
mod middleware;
mod models;
mod realm;
mod routes;
mod service;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;
pub use cron_tasks::{create_admin, purge_expired_sessions};
pub use models::admin::AdminUser;
pub use models::affiliate::Affiliate;
pub use models::company::Company;
pub use models::session::LoginRequest;

use crate::config::{join_base_path, normalize_base_path};
use crate::db::stage_db;
use crate::middleware::RequestLogger;
use crate::routes as app_routes;
use crate::service::proxy::ProxyForwarder;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket, http::Method};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};
use rocket_okapi::{get_openapi_route, okapi::merge::marge_spec_list};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` overrides `log_level`, e.g.
/// `RUST_LOG=info,affiliate_hub::auth=debug`. A second call is a no-op.
pub fn init_tracing(log_level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_line_number(true);

    let _ = if json_format { subscriber.json().try_init() } else { subscriber.try_init() };
}

const TOKEN_HEADERS: &[&str] = &["x-admin-token", "x-affiliate-token", "x-company-token", "x-session-token"];

fn build_cors(cors_config: &config::CorsConfig) -> CorsOptions {
    let is_wildcard = cors_config.allowed_origins.len() == 1 && cors_config.allowed_origins[0] == "*";

    if is_wildcard && cors_config.allow_credentials {
        panic!(
            "Invalid CORS configuration: Cannot use wildcard origins (*) with credentials enabled. \
            Either set specific origins or disable credentials."
        );
    }

    let allowed_origins = if cors_config.allowed_origins.is_empty() {
        AllowedOrigins::some_exact::<&str>(&[])
    } else if is_wildcard {
        AllowedOrigins::all()
    } else {
        AllowedOrigins::some_exact(&cors_config.allowed_origins.iter().map(String::as_str).collect::<Vec<_>>())
    };

    let mut allowed_headers = vec!["Content-Type", "Authorization", "Accept", "apikey"];
    allowed_headers.extend_from_slice(TOKEN_HEADERS);

    CorsOptions {
        allowed_origins,
        allowed_methods: vec![
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Delete,
            Method::Patch,
            Method::Options,
            Method::Head,
        ]
        .into_iter()
        .map(From::from)
        .collect(),
        allowed_headers: rocket_cors::AllowedHeaders::some(&allowed_headers),
        allow_credentials: cors_config.allow_credentials,
        ..Default::default()
    }
}

fn get_swagger_config(openapi_url: &str) -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: openapi_url.to_string(),
        ..Default::default()
    }
}

struct RouteSpec {
    path: &'static str,
    routes: Vec<rocket::Route>,
    openapi: rocket_okapi::okapi::openapi3::OpenApi,
}

fn collect_route_specs() -> Vec<RouteSpec> {
    let (health_routes, health_openapi) = app_routes::health::routes();
    let (admin_routes, admin_openapi) = app_routes::admin::routes();
    let (affiliate_routes, affiliate_openapi) = app_routes::affiliate::routes();
    let (company_routes, company_openapi) = app_routes::company::routes();

    vec![
        RouteSpec {
            path: "/health",
            routes: health_routes,
            openapi: health_openapi,
        },
        RouteSpec {
            path: "/admin",
            routes: admin_routes,
            openapi: admin_openapi,
        },
        RouteSpec {
            path: "/affiliate",
            routes: affiliate_routes,
            openapi: affiliate_openapi,
        },
        RouteSpec {
            path: "/company",
            routes: company_routes,
            openapi: company_openapi,
        },
    ]
}

fn mount_api_routes(mut rocket: Rocket<Build>, base_path: &str, enable_swagger: bool) -> Rocket<Build> {
    let route_specs = collect_route_specs();

    if enable_swagger {
        let mut openapi_list = Vec::new();
        for spec in route_specs {
            rocket = rocket.mount(join_base_path(base_path, spec.path), spec.routes);
            openapi_list.push((spec.path, spec.openapi));
        }

        let openapi_docs = match marge_spec_list(&openapi_list) {
            Ok(docs) => docs,
            Err(err) => panic!("Could not merge OpenAPI spec: {}", err),
        };

        let settings = rocket_okapi::settings::OpenApiSettings::default();
        rocket = rocket.mount(base_path, vec![get_openapi_route(openapi_docs, &settings)]);

        let docs_path = join_base_path(base_path, "docs");
        let openapi_url = join_base_path(base_path, "openapi.json");
        rocket = rocket.mount(docs_path, make_swagger_ui(&get_swagger_config(&openapi_url)));
    } else {
        for spec in route_specs {
            rocket = rocket.mount(join_base_path(base_path, spec.path), spec.routes);
        }
    }

    // The proxy forwards arbitrary upstream calls and is kept out of the OpenAPI document.
    rocket.mount(join_base_path(base_path, "proxy"), app_routes::proxy::routes())
}

fn stage_proxy(backend: config::BackendConfig) -> AdHoc {
    AdHoc::try_on_ignite("Proxy Forwarder", |rocket| async move {
        match ProxyForwarder::new(backend) {
            Ok(forwarder) => Ok(rocket.manage(forwarder)),
            Err(e) => {
                tracing::error!("Failed to build upstream HTTP client: {}", e);
                Err(rocket)
            }
        }
    })
}

pub fn build_rocket(config: Config) -> Rocket<Build> {
    init_tracing(&config.logging.level, config.logging.json_format);

    let cors = build_cors(&config.cors).to_cors().expect("Failed to create CORS fairing");
    let base_path = normalize_base_path(&config.api.base_path);

    let figment = rocket::Config::figment()
        .merge(("port", config.server.port))
        .merge(("address", config.server.address.clone()));

    let mut rocket = rocket::custom(figment)
        .attach(cors)
        .attach(RequestLogger)
        .attach(stage_db(config.database.clone()))
        .attach(stage_proxy(config.backend.clone()));

    rocket = mount_api_routes(rocket, &base_path, config.api.enable_swagger);
    rocket = rocket.register(base_path.as_str(), app_routes::error::catchers());

    rocket.manage(config)
}
