//! Activity model - meal, clock-in/out and free-form activity entries
//! logged against a student by center staff.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Activity kinds shown on the parent feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    Meal,
    ClockIn,
    ClockOut,
    Activity,
}

impl ActivityType {
    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meal => "MEAL",
            Self::ClockIn => "CLOCK_IN",
            Self::ClockOut => "CLOCK_OUT",
            Self::Activity => "ACTIVITY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MEAL" => Some(Self::Meal),
            "CLOCK_IN" => Some(Self::ClockIn),
            "CLOCK_OUT" => Some(Self::ClockOut),
            "ACTIVITY" => Some(Self::Activity),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Activity entity (tenant-scoped). `image_urls` is a jsonb array of
/// reference strings.
#[derive(Debug, Clone, FromRow)]
pub struct Activity {
    pub activity_id: Uuid,
    pub tenant_id: Uuid,
    pub student_id: Uuid,
    pub activity_type: String,
    pub description: Option<String>,
    pub image_urls: serde_json::Value,
    pub created_by: Uuid,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Activity {
    /// Decode the stored image list, tolerating malformed data.
    pub fn image_url_list(&self) -> Vec<String> {
        serde_json::from_value(self.image_urls.clone()).unwrap_or_default()
    }
}

/// Input for creating a new activity.
#[derive(Debug, Clone)]
pub struct CreateActivity {
    pub tenant_id: Uuid,
    pub student_id: Uuid,
    pub activity_type: ActivityType,
    pub description: Option<String>,
    pub image_urls: Vec<String>,
    pub created_by: Uuid,
}

/// Partial update for an activity.
#[derive(Debug, Clone, Default)]
pub struct UpdateActivity {
    pub description: Option<String>,
    pub image_urls: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_type_round_trips_through_str() {
        for ty in [
            ActivityType::Meal,
            ActivityType::ClockIn,
            ActivityType::ClockOut,
            ActivityType::Activity,
        ] {
            assert_eq!(ActivityType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(ActivityType::parse("NAP"), None);
    }

    #[test]
    fn malformed_image_urls_decode_to_empty() {
        let activity = Activity {
            activity_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            activity_type: "MEAL".to_string(),
            description: None,
            image_urls: serde_json::json!({"not": "a list"}),
            created_by: Uuid::new_v4(),
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        };
        assert!(activity.image_url_list().is_empty());
    }
}
