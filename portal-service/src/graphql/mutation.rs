use async_graphql::{Context, Object, Result as GraphQLResult, ID};
use chrono::NaiveDate;
use validator::Validate;

use super::types::{
    ActivityObject, AttendanceRecordObject, AuthPayloadObject, CreateActivityInput,
    CreateStudentInput, LoginInput, MarkAttendanceInput, RegisterInput, StudentObject,
    UpdateAttendanceInput,
};
use super::{
    map_app_error, not_found, parse_id, require_admin, validation, TenantSelector,
};
use crate::models::{
    CreateActivity, CreateStudent, CreateUser, MarkAttendance, Tenant, UpdateActivity,
    UpdateAttendance, UpdateStudent,
};
use crate::services::metrics::AUTH_ATTEMPTS_TOTAL;
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};
use crate::AppState;

pub struct MutationRoot;

/// Resolve the tenant addressed by the `x-tenant` header for the public
/// auth operations. Unknown or inactive tenants are indistinguishable.
async fn resolve_tenant(ctx: &Context<'_>) -> Result<Tenant, async_graphql::Error> {
    let selector = ctx
        .data_opt::<TenantSelector>()
        .ok_or_else(|| validation("Missing x-tenant header"))?;
    let state = ctx.data::<AppState>()?;

    let tenant = state
        .db
        .find_tenant_by_subdomain(&selector.0)
        .await
        .map_err(map_app_error)?
        .filter(|t| t.active)
        .ok_or_else(|| validation("Unknown tenant"))?;

    Ok(tenant)
}

#[Object]
impl MutationRoot {
    /// Register a new account in the tenant addressed by `x-tenant`.
    async fn register(
        &self,
        ctx: &Context<'_>,
        input: RegisterInput,
    ) -> GraphQLResult<AuthPayloadObject> {
        input
            .validate()
            .map_err(|e| validation(e.to_string()))?;

        let tenant = resolve_tenant(ctx).await?;
        let state = ctx.data::<AppState>()?;

        let password_hash = hash_password(&Password::new(input.password))
            .map_err(|e| map_app_error(e.into()))?;

        let role = input.role.into();
        let result = state
            .db
            .create_user(&CreateUser {
                tenant_id: tenant.tenant_id,
                email: input.email.trim().to_ascii_lowercase(),
                password_hash: password_hash.into_string(),
                name: input.name,
                role,
                phone: input.phone,
                address: input.address,
            })
            .await;

        let user = match result {
            Ok(user) => user,
            Err(e) => {
                AUTH_ATTEMPTS_TOTAL
                    .with_label_values(&["register", "failure"])
                    .inc();
                return Err(map_app_error(e));
            }
        };

        let token = state
            .jwt
            .issue(user.user_id, &user.email, role, user.tenant_id)
            .map_err(|e| map_app_error(e.into()))?;

        AUTH_ATTEMPTS_TOTAL
            .with_label_values(&["register", "success"])
            .inc();

        Ok(AuthPayloadObject { token, user })
    }

    /// Login with email and password. A failed lookup and a failed
    /// password check produce the same error, and no token.
    async fn login(&self, ctx: &Context<'_>, input: LoginInput) -> GraphQLResult<AuthPayloadObject> {
        input
            .validate()
            .map_err(|e| validation(e.to_string()))?;

        let tenant = resolve_tenant(ctx).await?;
        let state = ctx.data::<AppState>()?;

        let invalid_credentials = || {
            AUTH_ATTEMPTS_TOTAL
                .with_label_values(&["login", "failure"])
                .inc();
            validation("Invalid credentials")
        };

        let email = input.email.trim().to_ascii_lowercase();
        let user = state
            .db
            .find_user_by_email(tenant.tenant_id, &email)
            .await
            .map_err(map_app_error)?
            .ok_or_else(invalid_credentials)?;

        verify_password(
            &Password::new(input.password),
            &PasswordHashString::new(user.password_hash.clone()),
        )
        .map_err(|_| invalid_credentials())?;

        let role = user.parsed_role().ok_or_else(invalid_credentials)?;
        let token = state
            .jwt
            .issue(user.user_id, &user.email, role, user.tenant_id)
            .map_err(|e| map_app_error(e.into()))?;

        AUTH_ATTEMPTS_TOTAL
            .with_label_values(&["login", "success"])
            .inc();

        Ok(AuthPayloadObject { token, user })
    }

    /// Create a student owned by an existing parent user. Fails when
    /// the tenant is inactive or its student capacity is reached.
    async fn create_student(
        &self,
        ctx: &Context<'_>,
        input: CreateStudentInput,
    ) -> GraphQLResult<StudentObject> {
        let session = require_admin(ctx)?;
        let state = ctx.data::<AppState>()?;
        let parent_id = parse_id(&input.parent_id)?;

        state
            .db
            .get_user(session.tenant_id, parent_id)
            .await
            .map_err(map_app_error)?
            .ok_or_else(|| validation("Parent user not found"))?;

        let tenant = state
            .db
            .get_tenant(session.tenant_id)
            .await
            .map_err(map_app_error)?
            .ok_or_else(|| validation("Unknown tenant"))?;
        if !tenant.active {
            return Err(validation("Tenant is not active"));
        }

        let current = state
            .db
            .count_students(session.tenant_id)
            .await
            .map_err(map_app_error)?;
        if current >= tenant.max_students as i64 {
            return Err(validation("Student capacity reached for this tenant"));
        }

        let student = state
            .db
            .create_student(&CreateStudent {
                tenant_id: session.tenant_id,
                name: input.name,
                class_label: input.class_label,
                date_of_birth: input.date_of_birth,
                parent_id,
            })
            .await
            .map_err(map_app_error)?;

        Ok(StudentObject(student))
    }

    /// Update a student's details. The owning parent cannot be changed.
    async fn update_student(
        &self,
        ctx: &Context<'_>,
        id: ID,
        name: Option<String>,
        #[graphql(name = "class")] class_label: Option<String>,
        date_of_birth: Option<NaiveDate>,
    ) -> GraphQLResult<StudentObject> {
        let session = require_admin(ctx)?;
        let state = ctx.data::<AppState>()?;
        let student_id = parse_id(&id)?;

        let student = state
            .db
            .update_student(
                session.tenant_id,
                student_id,
                &UpdateStudent {
                    name,
                    class_label,
                    date_of_birth,
                },
            )
            .await
            .map_err(map_app_error)?
            .ok_or_else(|| not_found("Student"))?;

        Ok(StudentObject(student))
    }

    async fn delete_student(&self, ctx: &Context<'_>, id: ID) -> GraphQLResult<bool> {
        let session = require_admin(ctx)?;
        let state = ctx.data::<AppState>()?;
        let student_id = parse_id(&id)?;

        let deleted = state
            .db
            .delete_student(session.tenant_id, student_id)
            .await
            .map_err(map_app_error)?;

        if !deleted {
            return Err(not_found("Student"));
        }

        Ok(true)
    }

    async fn create_activity(
        &self,
        ctx: &Context<'_>,
        input: CreateActivityInput,
    ) -> GraphQLResult<ActivityObject> {
        let session = require_admin(ctx)?;
        let state = ctx.data::<AppState>()?;
        let student_id = parse_id(&input.student_id)?;

        state
            .db
            .get_student(session.tenant_id, student_id)
            .await
            .map_err(map_app_error)?
            .ok_or_else(|| not_found("Student"))?;

        let activity = state
            .db
            .create_activity(&CreateActivity {
                tenant_id: session.tenant_id,
                student_id,
                activity_type: input.activity_type.into(),
                description: input.description,
                image_urls: input.image_urls.unwrap_or_default(),
                created_by: session.user_id,
            })
            .await
            .map_err(map_app_error)?;

        Ok(ActivityObject(activity))
    }

    async fn update_activity(
        &self,
        ctx: &Context<'_>,
        id: ID,
        description: Option<String>,
        image_urls: Option<Vec<String>>,
    ) -> GraphQLResult<ActivityObject> {
        let session = require_admin(ctx)?;
        let state = ctx.data::<AppState>()?;
        let activity_id = parse_id(&id)?;

        let activity = state
            .db
            .update_activity(
                session.tenant_id,
                activity_id,
                &UpdateActivity {
                    description,
                    image_urls,
                },
            )
            .await
            .map_err(map_app_error)?
            .ok_or_else(|| not_found("Activity"))?;

        Ok(ActivityObject(activity))
    }

    async fn delete_activity(&self, ctx: &Context<'_>, id: ID) -> GraphQLResult<bool> {
        let session = require_admin(ctx)?;
        let state = ctx.data::<AppState>()?;
        let activity_id = parse_id(&id)?;

        let deleted = state
            .db
            .delete_activity(session.tenant_id, activity_id)
            .await
            .map_err(map_app_error)?;

        if !deleted {
            return Err(not_found("Activity"));
        }

        Ok(true)
    }

    /// Mark attendance: insert-or-update on (student, date).
    async fn mark_attendance(
        &self,
        ctx: &Context<'_>,
        input: MarkAttendanceInput,
    ) -> GraphQLResult<AttendanceRecordObject> {
        let session = require_admin(ctx)?;
        let state = ctx.data::<AppState>()?;
        let student_id = parse_id(&input.student_id)?;

        state
            .db
            .get_student(session.tenant_id, student_id)
            .await
            .map_err(map_app_error)?
            .ok_or_else(|| not_found("Student"))?;

        let record = state
            .db
            .upsert_attendance(&MarkAttendance {
                tenant_id: session.tenant_id,
                student_id,
                attendance_date: input.date,
                status: input.status.into(),
                notes: input.notes,
                marked_by: session.user_id,
            })
            .await
            .map_err(map_app_error)?;

        Ok(AttendanceRecordObject(record))
    }

    async fn update_attendance(
        &self,
        ctx: &Context<'_>,
        input: UpdateAttendanceInput,
    ) -> GraphQLResult<AttendanceRecordObject> {
        let session = require_admin(ctx)?;
        let state = ctx.data::<AppState>()?;
        let record_id = parse_id(&input.id)?;

        let record = state
            .db
            .update_attendance(
                session.tenant_id,
                record_id,
                &UpdateAttendance {
                    status: input.status.into(),
                    notes: input.notes,
                },
            )
            .await
            .map_err(map_app_error)?
            .ok_or_else(|| not_found("Attendance record"))?;

        Ok(AttendanceRecordObject(record))
    }

    /// Mark attendance for many students at once. The batch is
    /// transactional: either every input is upserted or none are.
    async fn mark_bulk_attendance(
        &self,
        ctx: &Context<'_>,
        inputs: Vec<MarkAttendanceInput>,
    ) -> GraphQLResult<Vec<AttendanceRecordObject>> {
        let session = require_admin(ctx)?;
        let state = ctx.data::<AppState>()?;

        if inputs.is_empty() {
            return Err(validation("inputs must not be empty"));
        }

        let mut marks = Vec::with_capacity(inputs.len());
        for input in inputs {
            let student_id = parse_id(&input.student_id)?;
            state
                .db
                .get_student(session.tenant_id, student_id)
                .await
                .map_err(map_app_error)?
                .ok_or_else(|| not_found("Student"))?;

            marks.push(MarkAttendance {
                tenant_id: session.tenant_id,
                student_id,
                attendance_date: input.date,
                status: input.status.into(),
                notes: input.notes,
                marked_by: session.user_id,
            });
        }

        let records = state
            .db
            .upsert_attendance_bulk(&marks)
            .await
            .map_err(map_app_error)?;

        Ok(records.into_iter().map(AttendanceRecordObject).collect())
    }

    async fn delete_attendance_record(&self, ctx: &Context<'_>, id: ID) -> GraphQLResult<bool> {
        let session = require_admin(ctx)?;
        let state = ctx.data::<AppState>()?;
        let record_id = parse_id(&id)?;

        let deleted = state
            .db
            .delete_attendance_record(session.tenant_id, record_id)
            .await
            .map_err(map_app_error)?;

        if !deleted {
            return Err(not_found("Attendance record"));
        }

        Ok(true)
    }
}
