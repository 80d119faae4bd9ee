//! User model - tenant-scoped accounts for parents and administrators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Role gating operation access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Parent,
    Admin,
}

impl UserRole {
    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parent => "PARENT",
            Self::Admin => "ADMIN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PARENT" => Some(Self::Parent),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User entity (tenant-scoped). The password hash never leaves the
/// data layer; response shaping strips it.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl User {
    /// Get parsed role. Rows only ever hold values written through `UserRole::as_str`.
    pub fn parsed_role(&self) -> Option<UserRole> {
        UserRole::parse(&self.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin.as_str()
    }
}

/// Input for creating a new user.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub tenant_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        assert_eq!(UserRole::parse(UserRole::Admin.as_str()), Some(UserRole::Admin));
        assert_eq!(UserRole::parse(UserRole::Parent.as_str()), Some(UserRole::Parent));
        assert_eq!(UserRole::parse("TEACHER"), None);
    }
}
