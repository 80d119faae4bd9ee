//! HTTP handlers: the GraphQL endpoint with identity extraction, the
//! GraphiQL playground, health and metrics.

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use serde_json::json;

use crate::graphql::{AuthSession, TenantSelector};
use crate::services::metrics::{self, GRAPHQL_REQUESTS_TOTAL};
use crate::ServerState;
use service_core::error::AppError;

/// Header carrying the tenant subdomain for public auth operations.
pub const TENANT_HEADER: &str = "x-tenant";

/// Extract the decoded identity from the Authorization header.
///
/// Fails open to "no session": an absent or invalid token means the
/// request proceeds unauthenticated and resolvers decide what that
/// implies.
fn extract_session(state: &ServerState, headers: &HeaderMap) -> Option<AuthSession> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))?;

    let claims = match state.app.jwt.verify(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            return None;
        }
    };

    let role = claims.parsed_role()?;

    Some(AuthSession {
        user_id: claims.sub,
        email: claims.email,
        role,
        tenant_id: claims.tenant_id,
    })
}

pub async fn graphql_handler(
    State(state): State<ServerState>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let mut req = req.into_inner();

    if let Some(session) = extract_session(&state, &headers) {
        req = req.data(session);
    }

    if let Some(tenant) = headers
        .get(TENANT_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        req = req.data(TenantSelector(tenant.trim().to_string()));
    }

    let operation = req.operation_name.clone().unwrap_or_else(|| "-".to_string());
    let response = state.schema.execute(req).await;

    let status = if response.is_ok() { "ok" } else { "error" };
    GRAPHQL_REQUESTS_TOTAL
        .with_label_values(&[&operation, status])
        .inc();

    response.into()
}

pub async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

/// Service health check: liveness plus a database ping.
pub async fn health_check(
    State(state): State<ServerState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.app.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Database health check failed");
        e
    })?;

    Ok(Json(json!({
        "status": "healthy",
        "service": state.app.config.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {
            "postgres": "up"
        }
    })))
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        metrics::gather(),
    )
}
