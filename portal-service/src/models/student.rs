//! Student model. Each student is owned by exactly one parent user;
//! the parent reference is immutable after creation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Student entity (tenant-scoped).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub student_id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub class_label: String,
    pub date_of_birth: Option<NaiveDate>,
    pub parent_id: Uuid,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating a new student.
#[derive(Debug, Clone)]
pub struct CreateStudent {
    pub tenant_id: Uuid,
    pub name: String,
    pub class_label: String,
    pub date_of_birth: Option<NaiveDate>,
    pub parent_id: Uuid,
}

/// Partial update for a student. `None` fields are left untouched.
/// The owning parent is deliberately absent.
#[derive(Debug, Clone, Default)]
pub struct UpdateStudent {
    pub name: Option<String>,
    pub class_label: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}
