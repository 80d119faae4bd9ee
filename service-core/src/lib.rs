//! service-core: Shared infrastructure for portal services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
