//! GraphQL object, input and enum types. Wrappers hold the database
//! row; relation fields resolve lazily with tenant-scoped lookups.

use async_graphql::{Context, Enum, Error, InputObject, Object, Result as GraphQLResult, ID};
use chrono::{DateTime, NaiveDate, Utc};
use validator::Validate;

use super::{map_app_error, not_found};
use crate::models::{self, Activity, AttendanceRecord, AttendanceStats, Student, User};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
#[graphql(name = "UserRole")]
pub enum UserRoleEnum {
    Parent,
    Admin,
}

impl From<UserRoleEnum> for models::UserRole {
    fn from(role: UserRoleEnum) -> Self {
        match role {
            UserRoleEnum::Parent => models::UserRole::Parent,
            UserRoleEnum::Admin => models::UserRole::Admin,
        }
    }
}

impl From<models::UserRole> for UserRoleEnum {
    fn from(role: models::UserRole) -> Self {
        match role {
            models::UserRole::Parent => UserRoleEnum::Parent,
            models::UserRole::Admin => UserRoleEnum::Admin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
#[graphql(name = "ActivityType")]
pub enum ActivityTypeEnum {
    Meal,
    ClockIn,
    ClockOut,
    Activity,
}

impl From<ActivityTypeEnum> for models::ActivityType {
    fn from(ty: ActivityTypeEnum) -> Self {
        match ty {
            ActivityTypeEnum::Meal => models::ActivityType::Meal,
            ActivityTypeEnum::ClockIn => models::ActivityType::ClockIn,
            ActivityTypeEnum::ClockOut => models::ActivityType::ClockOut,
            ActivityTypeEnum::Activity => models::ActivityType::Activity,
        }
    }
}

impl From<models::ActivityType> for ActivityTypeEnum {
    fn from(ty: models::ActivityType) -> Self {
        match ty {
            models::ActivityType::Meal => ActivityTypeEnum::Meal,
            models::ActivityType::ClockIn => ActivityTypeEnum::ClockIn,
            models::ActivityType::ClockOut => ActivityTypeEnum::ClockOut,
            models::ActivityType::Activity => ActivityTypeEnum::Activity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
#[graphql(name = "AttendanceStatus")]
pub enum AttendanceStatusEnum {
    Present,
    Absent,
    Late,
}

impl From<AttendanceStatusEnum> for models::AttendanceStatus {
    fn from(status: AttendanceStatusEnum) -> Self {
        match status {
            AttendanceStatusEnum::Present => models::AttendanceStatus::Present,
            AttendanceStatusEnum::Absent => models::AttendanceStatus::Absent,
            AttendanceStatusEnum::Late => models::AttendanceStatus::Late,
        }
    }
}

impl From<models::AttendanceStatus> for AttendanceStatusEnum {
    fn from(status: models::AttendanceStatus) -> Self {
        match status {
            models::AttendanceStatus::Present => AttendanceStatusEnum::Present,
            models::AttendanceStatus::Absent => AttendanceStatusEnum::Absent,
            models::AttendanceStatus::Late => AttendanceStatusEnum::Late,
        }
    }
}

fn corrupt_row() -> Error {
    Error::new("Internal server error")
}

#[derive(Debug, Clone)]
pub struct UserObject(pub User);

#[Object(name = "User")]
impl UserObject {
    async fn id(&self) -> ID {
        ID::from(self.0.user_id.to_string())
    }

    async fn email(&self) -> &str {
        &self.0.email
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn role(&self) -> GraphQLResult<UserRoleEnum> {
        self.0
            .parsed_role()
            .map(UserRoleEnum::from)
            .ok_or_else(corrupt_row)
    }

    async fn phone(&self) -> Option<&str> {
        self.0.phone.as_deref()
    }

    async fn address(&self) -> Option<&str> {
        self.0.address.as_deref()
    }

    async fn children(&self, ctx: &Context<'_>) -> GraphQLResult<Vec<StudentObject>> {
        let state = ctx.data::<AppState>()?;
        let students = state
            .db
            .list_students(self.0.tenant_id, Some(self.0.user_id))
            .await
            .map_err(map_app_error)?;
        Ok(students.into_iter().map(StudentObject).collect())
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_utc
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.0.updated_utc
    }
}

#[derive(Debug, Clone)]
pub struct StudentObject(pub Student);

#[Object(name = "Student")]
impl StudentObject {
    async fn id(&self) -> ID {
        ID::from(self.0.student_id.to_string())
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    #[graphql(name = "class")]
    async fn class_label(&self) -> &str {
        &self.0.class_label
    }

    async fn date_of_birth(&self) -> Option<NaiveDate> {
        self.0.date_of_birth
    }

    async fn parent(&self, ctx: &Context<'_>) -> GraphQLResult<UserObject> {
        let state = ctx.data::<AppState>()?;
        let parent = state
            .db
            .get_user(self.0.tenant_id, self.0.parent_id)
            .await
            .map_err(map_app_error)?
            .ok_or_else(|| not_found("User"))?;
        Ok(UserObject(parent))
    }

    async fn activities(&self, ctx: &Context<'_>) -> GraphQLResult<Vec<ActivityObject>> {
        let state = ctx.data::<AppState>()?;
        let activities = state
            .db
            .list_activities(self.0.tenant_id, Some(self.0.student_id), None, 50, 0)
            .await
            .map_err(map_app_error)?;
        Ok(activities.into_iter().map(ActivityObject).collect())
    }

    async fn attendance_records(
        &self,
        ctx: &Context<'_>,
    ) -> GraphQLResult<Vec<AttendanceRecordObject>> {
        let state = ctx.data::<AppState>()?;
        let records = state
            .db
            .list_student_attendance(self.0.tenant_id, self.0.student_id, None, None)
            .await
            .map_err(map_app_error)?;
        Ok(records.into_iter().map(AttendanceRecordObject).collect())
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_utc
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.0.updated_utc
    }
}

#[derive(Debug, Clone)]
pub struct ActivityObject(pub Activity);

#[Object(name = "Activity")]
impl ActivityObject {
    async fn id(&self) -> ID {
        ID::from(self.0.activity_id.to_string())
    }

    #[graphql(name = "type")]
    async fn activity_type(&self) -> GraphQLResult<ActivityTypeEnum> {
        models::ActivityType::parse(&self.0.activity_type)
            .map(ActivityTypeEnum::from)
            .ok_or_else(corrupt_row)
    }

    async fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    async fn image_urls(&self) -> Vec<String> {
        self.0.image_url_list()
    }

    async fn student(&self, ctx: &Context<'_>) -> GraphQLResult<StudentObject> {
        let state = ctx.data::<AppState>()?;
        let student = state
            .db
            .get_student(self.0.tenant_id, self.0.student_id)
            .await
            .map_err(map_app_error)?
            .ok_or_else(|| not_found("Student"))?;
        Ok(StudentObject(student))
    }

    async fn created_by(&self, ctx: &Context<'_>) -> GraphQLResult<UserObject> {
        let state = ctx.data::<AppState>()?;
        let user = state
            .db
            .get_user(self.0.tenant_id, self.0.created_by)
            .await
            .map_err(map_app_error)?
            .ok_or_else(|| not_found("User"))?;
        Ok(UserObject(user))
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_utc
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.0.updated_utc
    }
}

#[derive(Debug, Clone)]
pub struct AttendanceRecordObject(pub AttendanceRecord);

#[Object(name = "AttendanceRecord")]
impl AttendanceRecordObject {
    async fn id(&self) -> ID {
        ID::from(self.0.record_id.to_string())
    }

    async fn date(&self) -> NaiveDate {
        self.0.attendance_date
    }

    async fn status(&self) -> GraphQLResult<AttendanceStatusEnum> {
        models::AttendanceStatus::parse(&self.0.status)
            .map(AttendanceStatusEnum::from)
            .ok_or_else(corrupt_row)
    }

    async fn notes(&self) -> Option<&str> {
        self.0.notes.as_deref()
    }

    async fn student(&self, ctx: &Context<'_>) -> GraphQLResult<StudentObject> {
        let state = ctx.data::<AppState>()?;
        let student = state
            .db
            .get_student(self.0.tenant_id, self.0.student_id)
            .await
            .map_err(map_app_error)?
            .ok_or_else(|| not_found("Student"))?;
        Ok(StudentObject(student))
    }

    async fn marked_by(&self, ctx: &Context<'_>) -> GraphQLResult<UserObject> {
        let state = ctx.data::<AppState>()?;
        let user = state
            .db
            .get_user(self.0.tenant_id, self.0.marked_by)
            .await
            .map_err(map_app_error)?
            .ok_or_else(|| not_found("User"))?;
        Ok(UserObject(user))
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_utc
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.0.updated_utc
    }
}

#[derive(Debug, Clone)]
pub struct AttendanceStatsObject(pub AttendanceStats);

#[Object(name = "AttendanceStats")]
impl AttendanceStatsObject {
    async fn total_students(&self) -> i64 {
        self.0.total_students
    }

    async fn present_count(&self) -> i64 {
        self.0.present_count
    }

    async fn absent_count(&self) -> i64 {
        self.0.absent_count
    }

    async fn late_count(&self) -> i64 {
        self.0.late_count
    }

    async fn attendance_rate(&self) -> f64 {
        self.0.attendance_rate
    }
}

#[derive(Debug, Clone)]
pub struct AuthPayloadObject {
    pub token: String,
    pub user: User,
}

#[Object(name = "AuthPayload")]
impl AuthPayloadObject {
    async fn token(&self) -> &str {
        &self.token
    }

    async fn user(&self) -> UserObject {
        UserObject(self.user.clone())
    }
}

#[derive(Debug, Clone, InputObject, Validate)]
pub struct RegisterInput {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    pub role: UserRoleEnum,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, InputObject, Validate)]
pub struct LoginInput {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
}

#[derive(Debug, Clone, InputObject)]
pub struct CreateStudentInput {
    pub name: String,
    #[graphql(name = "class")]
    pub class_label: String,
    pub date_of_birth: Option<NaiveDate>,
    pub parent_id: ID,
}

#[derive(Debug, Clone, InputObject)]
pub struct CreateActivityInput {
    #[graphql(name = "type")]
    pub activity_type: ActivityTypeEnum,
    pub description: Option<String>,
    pub image_urls: Option<Vec<String>>,
    pub student_id: ID,
}

#[derive(Debug, Clone, InputObject)]
pub struct MarkAttendanceInput {
    pub student_id: ID,
    pub date: NaiveDate,
    pub status: AttendanceStatusEnum,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, InputObject)]
pub struct UpdateAttendanceInput {
    pub id: ID,
    pub status: AttendanceStatusEnum,
    pub notes: Option<String>,
}
