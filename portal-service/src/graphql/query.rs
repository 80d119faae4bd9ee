use async_graphql::{Context, Object, Result as GraphQLResult, ID};
use chrono::NaiveDate;

use super::types::{
    ActivityObject, AttendanceRecordObject, AttendanceStatsObject, StudentObject, UserObject,
    UserRoleEnum,
};
use super::{
    ensure_student_access, forbidden, map_app_error, not_found, parse_id, require_admin,
    require_user,
};
use crate::AppState;

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The calling user, resolved from the bearer token.
    async fn me(&self, ctx: &Context<'_>) -> GraphQLResult<Option<UserObject>> {
        let session = require_user(ctx)?;
        let state = ctx.data::<AppState>()?;

        let user = state
            .db
            .get_user(session.tenant_id, session.user_id)
            .await
            .map_err(map_app_error)?;

        Ok(user.map(UserObject))
    }

    /// List users in the tenant, optionally filtered by role.
    async fn users(
        &self,
        ctx: &Context<'_>,
        role: Option<UserRoleEnum>,
    ) -> GraphQLResult<Vec<UserObject>> {
        let session = require_admin(ctx)?;
        let state = ctx.data::<AppState>()?;

        let users = state
            .db
            .list_users(session.tenant_id, role.map(Into::into))
            .await
            .map_err(map_app_error)?;

        Ok(users.into_iter().map(UserObject).collect())
    }

    async fn user(&self, ctx: &Context<'_>, id: ID) -> GraphQLResult<Option<UserObject>> {
        let session = require_user(ctx)?;
        let state = ctx.data::<AppState>()?;
        let user_id = parse_id(&id)?;

        let user = state
            .db
            .get_user(session.tenant_id, user_id)
            .await
            .map_err(map_app_error)?;

        Ok(user.map(UserObject))
    }

    /// Students visible to the caller: all of the tenant's for ADMIN,
    /// exactly the caller's own children for PARENT.
    async fn students(&self, ctx: &Context<'_>) -> GraphQLResult<Vec<StudentObject>> {
        let session = require_user(ctx)?;
        let state = ctx.data::<AppState>()?;

        let parent_scope = if session.is_admin() {
            None
        } else {
            Some(session.user_id)
        };

        let students = state
            .db
            .list_students(session.tenant_id, parent_scope)
            .await
            .map_err(map_app_error)?;

        Ok(students.into_iter().map(StudentObject).collect())
    }

    async fn student(&self, ctx: &Context<'_>, id: ID) -> GraphQLResult<StudentObject> {
        let session = require_user(ctx)?;
        let student_id = parse_id(&id)?;

        let student = ensure_student_access(ctx, session, student_id).await?;

        Ok(StudentObject(student))
    }

    async fn my_children(&self, ctx: &Context<'_>) -> GraphQLResult<Vec<StudentObject>> {
        let session = require_user(ctx)?;
        let state = ctx.data::<AppState>()?;

        let students = state
            .db
            .list_students(session.tenant_id, Some(session.user_id))
            .await
            .map_err(map_app_error)?;

        Ok(students.into_iter().map(StudentObject).collect())
    }

    /// Activity feed, most recent first. With `student_id` the caller
    /// must be allowed to read that student; without it, ADMIN sees the
    /// whole tenant and PARENT only their children.
    async fn activities(
        &self,
        ctx: &Context<'_>,
        student_id: Option<ID>,
        #[graphql(default = 50)] limit: i64,
        #[graphql(default = 0)] offset: i64,
    ) -> GraphQLResult<Vec<ActivityObject>> {
        let session = require_user(ctx)?;
        let state = ctx.data::<AppState>()?;

        let student_filter = match student_id {
            Some(id) => {
                let student_id = parse_id(&id)?;
                ensure_student_access(ctx, session, student_id).await?;
                Some(student_id)
            }
            None => None,
        };

        let parent_scope = if session.is_admin() || student_filter.is_some() {
            None
        } else {
            Some(session.user_id)
        };

        let activities = state
            .db
            .list_activities(session.tenant_id, student_filter, parent_scope, limit, offset)
            .await
            .map_err(map_app_error)?;

        Ok(activities.into_iter().map(ActivityObject).collect())
    }

    async fn activity(&self, ctx: &Context<'_>, id: ID) -> GraphQLResult<ActivityObject> {
        let session = require_user(ctx)?;
        let state = ctx.data::<AppState>()?;
        let activity_id = parse_id(&id)?;

        let activity = state
            .db
            .get_activity(session.tenant_id, activity_id)
            .await
            .map_err(map_app_error)?
            .ok_or_else(|| not_found("Activity"))?;

        if !session.is_admin() {
            let student = state
                .db
                .get_student(session.tenant_id, activity.student_id)
                .await
                .map_err(map_app_error)?
                .ok_or_else(|| not_found("Student"))?;
            if student.parent_id != session.user_id {
                return Err(forbidden());
            }
        }

        Ok(ActivityObject(activity))
    }

    async fn recent_activities(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 10)] limit: i64,
    ) -> GraphQLResult<Vec<ActivityObject>> {
        let session = require_user(ctx)?;
        let state = ctx.data::<AppState>()?;

        let parent_scope = if session.is_admin() {
            None
        } else {
            Some(session.user_id)
        };

        let activities = state
            .db
            .list_activities(session.tenant_id, None, parent_scope, limit, 0)
            .await
            .map_err(map_app_error)?;

        Ok(activities.into_iter().map(ActivityObject).collect())
    }

    /// Attendance records, most recent first, scoped like `activities`.
    async fn attendance_records(
        &self,
        ctx: &Context<'_>,
        student_id: Option<ID>,
        date: Option<NaiveDate>,
    ) -> GraphQLResult<Vec<AttendanceRecordObject>> {
        let session = require_user(ctx)?;
        let state = ctx.data::<AppState>()?;

        let student_filter = match student_id {
            Some(id) => {
                let student_id = parse_id(&id)?;
                ensure_student_access(ctx, session, student_id).await?;
                Some(student_id)
            }
            None => None,
        };

        let parent_scope = if session.is_admin() || student_filter.is_some() {
            None
        } else {
            Some(session.user_id)
        };

        let records = state
            .db
            .list_attendance(session.tenant_id, student_filter, parent_scope, date)
            .await
            .map_err(map_app_error)?;

        Ok(records.into_iter().map(AttendanceRecordObject).collect())
    }

    async fn attendance_record(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> GraphQLResult<AttendanceRecordObject> {
        let session = require_user(ctx)?;
        let state = ctx.data::<AppState>()?;
        let record_id = parse_id(&id)?;

        let record = state
            .db
            .get_attendance_record(session.tenant_id, record_id)
            .await
            .map_err(map_app_error)?
            .ok_or_else(|| not_found("Attendance record"))?;

        if !session.is_admin() {
            let student = state
                .db
                .get_student(session.tenant_id, record.student_id)
                .await
                .map_err(map_app_error)?
                .ok_or_else(|| not_found("Student"))?;
            if student.parent_id != session.user_id {
                return Err(forbidden());
            }
        }

        Ok(AttendanceRecordObject(record))
    }

    /// Tenant-wide attendance counts for one day.
    async fn attendance_stats(
        &self,
        ctx: &Context<'_>,
        date: NaiveDate,
    ) -> GraphQLResult<AttendanceStatsObject> {
        let session = require_admin(ctx)?;
        let state = ctx.data::<AppState>()?;

        let stats = state
            .db
            .attendance_stats(session.tenant_id, date)
            .await
            .map_err(map_app_error)?;

        Ok(AttendanceStatsObject(stats))
    }

    /// One student's attendance within an optional date range.
    async fn student_attendance(
        &self,
        ctx: &Context<'_>,
        student_id: ID,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> GraphQLResult<Vec<AttendanceRecordObject>> {
        let session = require_user(ctx)?;
        let state = ctx.data::<AppState>()?;
        let student_id = parse_id(&student_id)?;

        ensure_student_access(ctx, session, student_id).await?;

        let records = state
            .db
            .list_student_attendance(session.tenant_id, student_id, start_date, end_date)
            .await
            .map_err(map_app_error)?;

        Ok(records.into_iter().map(AttendanceRecordObject).collect())
    }
}
