//! GraphQL schema: typed operations gated by role/ownership checks.

pub mod mutation;
pub mod query;
pub mod types;

use async_graphql::{Context, EmptySubscription, Error, ErrorExtensions, Schema};
use uuid::Uuid;

use crate::models::{Student, UserRole};
use crate::AppState;
use service_core::error::AppError;

pub use mutation::MutationRoot;
pub use query::QueryRoot;

pub type PortalSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the schema with application state available to every resolver.
pub fn build_schema(state: AppState) -> PortalSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(state)
        .finish()
}

/// Decoded token claims carried as per-request data. Absent when the
/// request had no (or an invalid) bearer token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub tenant_id: Uuid,
}

impl AuthSession {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Tenant subdomain from the `x-tenant` header, used only by the public
/// login/register operations.
#[derive(Debug, Clone)]
pub struct TenantSelector(pub String);

pub fn unauthenticated() -> Error {
    Error::new("Not authenticated").extend_with(|_, e| e.set("code", "UNAUTHENTICATED"))
}

pub fn forbidden() -> Error {
    Error::new("Not authorized").extend_with(|_, e| e.set("code", "FORBIDDEN"))
}

pub fn not_found(what: &str) -> Error {
    Error::new(format!("{} not found", what)).extend_with(|_, e| e.set("code", "NOT_FOUND"))
}

pub fn validation(message: impl Into<String>) -> Error {
    Error::new(message.into()).extend_with(|_, e| e.set("code", "VALIDATION"))
}

/// Map a data-layer error onto the GraphQL error taxonomy. Internal
/// failures are logged and surfaced without their cause.
pub fn map_app_error(err: AppError) -> Error {
    match err {
        AppError::Conflict(e) => validation(e.to_string()),
        AppError::BadRequest(e) => validation(e.to_string()),
        AppError::ValidationError(e) => validation(e.to_string()),
        AppError::NotFound(e) => {
            Error::new(e.to_string()).extend_with(|_, ext| ext.set("code", "NOT_FOUND"))
        }
        AppError::Unauthorized(_) | AppError::AuthError(_) => unauthenticated(),
        AppError::Forbidden(_) => forbidden(),
        other => {
            tracing::error!(error = %other, "Internal error in resolver");
            Error::new("Internal server error").extend_with(|_, e| e.set("code", "INTERNAL"))
        }
    }
}

/// Parse a GraphQL ID into a Uuid.
pub fn parse_id(id: &async_graphql::ID) -> Result<Uuid, Error> {
    Uuid::parse_str(id.as_str()).map_err(|_| validation(format!("Invalid id: {}", id.as_str())))
}

/// Resolve the calling identity or fail with UNAUTHENTICATED.
pub fn require_user<'a>(ctx: &'a Context<'_>) -> Result<&'a AuthSession, Error> {
    ctx.data_opt::<AuthSession>().ok_or_else(unauthenticated)
}

/// Resolve the calling identity and require the ADMIN role.
pub fn require_admin<'a>(ctx: &'a Context<'_>) -> Result<&'a AuthSession, Error> {
    let session = require_user(ctx)?;
    if !session.is_admin() {
        return Err(forbidden());
    }
    Ok(session)
}

/// Fetch a student and check the caller may read it: ADMIN of the
/// tenant, or the owning parent. Absent ids yield NOT_FOUND before any
/// ownership comparison.
pub async fn ensure_student_access(
    ctx: &Context<'_>,
    session: &AuthSession,
    student_id: Uuid,
) -> Result<Student, Error> {
    let state = ctx.data::<AppState>()?;
    let student = state
        .db
        .get_student(session.tenant_id, student_id)
        .await
        .map_err(map_app_error)?
        .ok_or_else(|| not_found("Student"))?;

    if !session.is_admin() && student.parent_id != session.user_id {
        return Err(forbidden());
    }

    Ok(student)
}
