//! Tenant model - root of the multi-tenancy hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Tenant entity. One row per childcare center.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub tenant_id: Uuid,
    pub subdomain: String,
    pub plan: String,
    pub max_students: i32,
    pub active: bool,
    pub settings: Option<serde_json::Value>,
    pub created_utc: DateTime<Utc>,
}

impl Tenant {
    /// Create a new tenant with default plan and capacity.
    pub fn new(subdomain: String) -> Self {
        Self {
            tenant_id: Uuid::new_v4(),
            subdomain,
            plan: "standard".to_string(),
            max_students: 100,
            active: true,
            settings: None,
            created_utc: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tenant_starts_active() {
        let tenant = Tenant::new("sunshine".to_string());
        assert!(tenant.active);
        assert_eq!(tenant.subdomain, "sunshine");
        assert_eq!(tenant.max_students, 100);
    }
}
