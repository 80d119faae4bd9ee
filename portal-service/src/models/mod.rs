pub mod activity;
pub mod attendance;
pub mod student;
pub mod tenant;
pub mod user;

pub use activity::{Activity, ActivityType, CreateActivity, UpdateActivity};
pub use attendance::{
    AttendanceRecord, AttendanceStats, AttendanceStatus, MarkAttendance, UpdateAttendance,
};
pub use student::{CreateStudent, Student, UpdateStudent};
pub use tenant::Tenant;
pub use user::{CreateUser, User, UserRole};
