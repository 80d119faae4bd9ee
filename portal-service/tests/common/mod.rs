//! Common test utilities for portal-service integration tests.
//!
//! Tests drive the full router in-process and need a PostgreSQL
//! database named by TEST_DATABASE_URL.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use portal_service::config::{
    DatabaseConfig, JwtConfig, PortalConfig, RateLimitConfig, SecurityConfig,
};
use portal_service::models::Tenant;
use portal_service::services::Database;
use portal_service::{build_router, AppState};
use serde_json::{json, Value};
use service_core::config::Config as CommonConfig;
use sqlx::postgres::PgPoolOptions;
use std::sync::Once;
use tower::util::ServiceExt;
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,portal_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub struct TestApp {
    pub router: Router,
    pub db: Database,
    pub tenant: Tenant,
}

fn test_config(database_url: &str) -> PortalConfig {
    PortalConfig {
        common: CommonConfig { port: 0 },
        service_name: "portal-service-test".to_string(),
        log_level: "debug".to_string(),
        database: DatabaseConfig {
            url: database_url.to_string(),
            max_connections: 2,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: "test-secret-key".to_string(),
            token_expiry_hours: 1,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        rate_limit: RateLimitConfig {
            requests_per_minute: 10_000,
        },
    }
}

/// Spawn a test application with a fresh tenant.
pub async fn spawn_app() -> TestApp {
    init_tracing();

    let database_url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set to run integration tests");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    let db = Database::from_pool(pool);
    db.run_migrations().await.expect("Failed to run migrations");

    let tenant = db
        .create_tenant(&Tenant::new(format!("t{}", Uuid::new_v4().simple())))
        .await
        .expect("Failed to create test tenant");

    let state = AppState::new(test_config(&database_url), db.clone());
    let router = build_router(state);

    TestApp { router, db, tenant }
}

impl TestApp {
    /// POST a GraphQL request with explicit tenant and token headers.
    pub async fn graphql_as(
        &self,
        tenant: Option<&str>,
        token: Option<&str>,
        query: &str,
        variables: Value,
    ) -> Value {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/graphql")
            .header("content-type", "application/json");

        if let Some(tenant) = tenant {
            builder = builder.header("x-tenant", tenant);
        }
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let body = json!({ "query": query, "variables": variables });
        let response = self
            .router
            .clone()
            .oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        serde_json::from_slice(&bytes).expect("Response was not JSON")
    }

    /// POST a GraphQL request against this app's tenant.
    pub async fn graphql(&self, token: Option<&str>, query: &str, variables: Value) -> Value {
        self.graphql_as(Some(&self.tenant.subdomain), token, query, variables)
            .await
    }
}

/// Extract the error code extension of the first GraphQL error, if any.
pub fn error_code(response: &Value) -> Option<&str> {
    response["errors"][0]["extensions"]["code"].as_str()
}

pub const REGISTER_MUTATION: &str = r#"
    mutation Register($input: RegisterInput!) {
        register(input: $input) {
            token
            user { id email name role }
        }
    }
"#;

pub const LOGIN_MUTATION: &str = r#"
    mutation Login($input: LoginInput!) {
        login(input: $input) {
            token
            user { id email role }
        }
    }
"#;

/// Register a user and return (token, user_id).
pub async fn register_user(app: &TestApp, email: &str, role: &str) -> (String, String) {
    let response = app
        .graphql(
            None,
            REGISTER_MUTATION,
            json!({
                "input": {
                    "email": email,
                    "password": "password123",
                    "name": format!("Test {}", role),
                    "role": role,
                }
            }),
        )
        .await;

    let payload = &response["data"]["register"];
    let token = payload["token"].as_str().expect("register returned no token");
    let user_id = payload["user"]["id"].as_str().expect("register returned no user id");
    (token.to_string(), user_id.to_string())
}

pub const CREATE_STUDENT_MUTATION: &str = r#"
    mutation CreateStudent($input: CreateStudentInput!) {
        createStudent(input: $input) {
            id
            name
            class
            parent { id }
        }
    }
"#;

/// Create a student as admin and return its id.
pub async fn create_student(
    app: &TestApp,
    admin_token: &str,
    parent_id: &str,
    name: &str,
) -> String {
    let response = app
        .graphql(
            Some(admin_token),
            CREATE_STUDENT_MUTATION,
            json!({
                "input": {
                    "name": name,
                    "class": "Junior",
                    "parentId": parent_id,
                }
            }),
        )
        .await;

    response["data"]["createStudent"]["id"]
        .as_str()
        .unwrap_or_else(|| panic!("createStudent failed: {}", response))
        .to_string()
}
