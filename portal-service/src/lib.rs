//! Portal Service - Multi-tenant parent portal backend for childcare centers.

pub mod config;
pub mod graphql;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    http::{HeaderValue, Method},
    middleware::from_fn,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::PortalConfig;
use crate::graphql::{build_schema, PortalSchema};
use crate::services::{Database, JwtService};
use service_core::middleware::{
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};

/// Application state shared by resolvers and handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: PortalConfig,
    pub db: Database,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(config: PortalConfig, db: Database) -> Self {
        let jwt = JwtService::new(&config.jwt);
        Self { config, db, jwt }
    }
}

/// Router state: application state plus the built GraphQL schema.
#[derive(Clone)]
pub struct ServerState {
    pub app: AppState,
    pub schema: PortalSchema,
}

pub fn build_router(app: AppState) -> Router {
    let schema = build_schema(app.clone());

    let ip_limiter = create_ip_rate_limiter(app.config.rate_limit.requests_per_minute, 60);

    let cors = CorsLayer::new()
        .allow_origin(
            app.config
                .security
                .allowed_origins
                .iter()
                .map(|o| {
                    o.parse::<HeaderValue>().unwrap_or_else(|e| {
                        tracing::error!("Invalid CORS origin '{}': {}. Using fallback.", o, e);
                        HeaderValue::from_static("*")
                    })
                })
                .collect::<Vec<HeaderValue>>(),
        )
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::HeaderName::from_static(handlers::TENANT_HEADER),
            axum::http::header::HeaderName::from_static("x-request-id"),
        ]);

    let state = ServerState { app, schema };

    Router::new()
        .route(
            "/graphql",
            get(handlers::graphiql).post(handlers::graphql_handler),
        )
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .with_state(state)
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}
