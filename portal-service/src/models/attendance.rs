//! Attendance model. At most one record per (student, date); writes go
//! through an upsert keyed on that pair.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Daily attendance status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "PRESENT",
            Self::Absent => "ABSENT",
            Self::Late => "LATE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PRESENT" => Some(Self::Present),
            "ABSENT" => Some(Self::Absent),
            "LATE" => Some(Self::Late),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Attendance record entity (tenant-scoped, day granularity).
#[derive(Debug, Clone, FromRow)]
pub struct AttendanceRecord {
    pub record_id: Uuid,
    pub tenant_id: Uuid,
    pub student_id: Uuid,
    pub attendance_date: NaiveDate,
    pub status: String,
    pub notes: Option<String>,
    pub marked_by: Uuid,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for marking attendance (insert-or-update on (student, date)).
#[derive(Debug, Clone)]
pub struct MarkAttendance {
    pub tenant_id: Uuid,
    pub student_id: Uuid,
    pub attendance_date: NaiveDate,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
    pub marked_by: Uuid,
}

/// Input for updating an existing record by id.
#[derive(Debug, Clone)]
pub struct UpdateAttendance {
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}

/// Aggregated attendance counts for a single day across a tenant.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceStats {
    pub total_students: i64,
    pub present_count: i64,
    pub absent_count: i64,
    pub late_count: i64,
    pub attendance_rate: f64,
}

impl AttendanceStats {
    pub fn compute(total_students: i64, present: i64, absent: i64, late: i64) -> Self {
        let attendance_rate = if total_students > 0 {
            (present as f64 / total_students as f64) * 100.0
        } else {
            0.0
        };
        Self {
            total_students,
            present_count: present,
            absent_count: absent,
            late_count: late,
            attendance_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            AttendanceStatus::Present,
            AttendanceStatus::Absent,
            AttendanceStatus::Late,
        ] {
            assert_eq!(AttendanceStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AttendanceStatus::parse("EXCUSED"), None);
    }

    #[test]
    fn stats_rate_is_percentage_of_total() {
        let stats = AttendanceStats::compute(10, 7, 2, 1);
        assert_eq!(stats.attendance_rate, 70.0);
    }

    #[test]
    fn stats_rate_with_no_students_is_zero() {
        let stats = AttendanceStats::compute(0, 0, 0, 0);
        assert_eq!(stats.attendance_rate, 0.0);
    }
}
