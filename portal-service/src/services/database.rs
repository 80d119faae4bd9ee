//! Database service for portal-service.
//!
//! One async method per logical operation. Every query filters on
//! tenant_id, so cross-tenant reads are impossible by construction.

use crate::models::{
    Activity, AttendanceRecord, AttendanceStats, CreateActivity, CreateStudent, CreateUser,
    MarkAttendance, Student, Tenant, UpdateActivity, UpdateAttendance, UpdateStudent, User,
    UserRole,
};
use crate::services::metrics::DB_QUERY_DURATION;
use chrono::NaiveDate;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "portal-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool (used by tests).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Tenant Operations
    // -------------------------------------------------------------------------

    /// Create a new tenant.
    #[instrument(skip(self, tenant), fields(subdomain = %tenant.subdomain))]
    pub async fn create_tenant(&self, tenant: &Tenant) -> Result<Tenant, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_tenant"])
            .start_timer();

        let created = sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (tenant_id, subdomain, plan, max_students, active, settings)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING tenant_id, subdomain, plan, max_students, active, settings, created_utc
            "#,
        )
        .bind(tenant.tenant_id)
        .bind(&tenant.subdomain)
        .bind(&tenant.plan)
        .bind(tenant.max_students)
        .bind(tenant.active)
        .bind(&tenant.settings)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Tenant with subdomain '{}' already exists",
                    tenant.subdomain
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create tenant: {}", e)),
        })?;

        timer.observe_duration();

        info!(tenant_id = %created.tenant_id, "Tenant created");

        Ok(created)
    }

    /// Look up a tenant by its subdomain slug.
    #[instrument(skip(self))]
    pub async fn find_tenant_by_subdomain(
        &self,
        subdomain: &str,
    ) -> Result<Option<Tenant>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_tenant_by_subdomain"])
            .start_timer();

        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT tenant_id, subdomain, plan, max_students, active, settings, created_utc
            FROM tenants
            WHERE subdomain = $1
            "#,
        )
        .bind(subdomain)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find tenant: {}", e)))?;

        timer.observe_duration();

        Ok(tenant)
    }

    /// Get a tenant by ID.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_tenant"])
            .start_timer();

        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT tenant_id, subdomain, plan, max_students, active, settings, created_utc
            FROM tenants
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get tenant: {}", e)))?;

        timer.observe_duration();

        Ok(tenant)
    }

    // -------------------------------------------------------------------------
    // User Operations
    // -------------------------------------------------------------------------

    /// Create a new user. Email is unique per tenant.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id))]
    pub async fn create_user(&self, input: &CreateUser) -> Result<User, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_user"])
            .start_timer();

        let user_id = Uuid::new_v4();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_id, tenant_id, email, password_hash, name, role, phone, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING user_id, tenant_id, email, password_hash, name, role, phone, address, created_utc, updated_utc
            "#,
        )
        .bind(user_id)
        .bind(input.tenant_id)
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(&input.name)
        .bind(input.role.as_str())
        .bind(&input.phone)
        .bind(&input.address)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create user: {}", e)),
        })?;

        timer.observe_duration();

        info!(user_id = %user.user_id, role = %user.role, "User created");

        Ok(user)
    }

    /// Look up a user by email within a tenant.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn find_user_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_user_by_email"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, tenant_id, email, password_hash, name, role, phone, address, created_utc, updated_utc
            FROM users
            WHERE tenant_id = $1 AND email = $2
            "#,
        )
        .bind(tenant_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find user: {}", e)))?;

        timer.observe_duration();

        Ok(user)
    }

    /// Get a user by ID within a tenant.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, user_id = %user_id))]
    pub async fn get_user(&self, tenant_id: Uuid, user_id: Uuid) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_user"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, tenant_id, email, password_hash, name, role, phone, address, created_utc, updated_utc
            FROM users
            WHERE tenant_id = $1 AND user_id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get user: {}", e)))?;

        timer.observe_duration();

        Ok(user)
    }

    /// List users for a tenant with an optional role filter.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn list_users(
        &self,
        tenant_id: Uuid,
        role: Option<UserRole>,
    ) -> Result<Vec<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_users"])
            .start_timer();

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, tenant_id, email, password_hash, name, role, phone, address, created_utc, updated_utc
            FROM users
            WHERE tenant_id = $1
              AND ($2::varchar IS NULL OR role = $2)
            ORDER BY created_utc
            "#,
        )
        .bind(tenant_id)
        .bind(role.map(|r| r.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list users: {}", e)))?;

        timer.observe_duration();

        Ok(users)
    }

    // -------------------------------------------------------------------------
    // Student Operations
    // -------------------------------------------------------------------------

    /// Create a new student.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, parent_id = %input.parent_id))]
    pub async fn create_student(&self, input: &CreateStudent) -> Result<Student, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_student"])
            .start_timer();

        let student_id = Uuid::new_v4();
        let student = sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO students (student_id, tenant_id, name, class_label, date_of_birth, parent_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING student_id, tenant_id, name, class_label, date_of_birth, parent_id, created_utc, updated_utc
            "#,
        )
        .bind(student_id)
        .bind(input.tenant_id)
        .bind(&input.name)
        .bind(&input.class_label)
        .bind(input.date_of_birth)
        .bind(input.parent_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create student: {}", e)))?;

        timer.observe_duration();

        info!(student_id = %student.student_id, "Student created");

        Ok(student)
    }

    /// Get a student by ID within a tenant.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, student_id = %student_id))]
    pub async fn get_student(
        &self,
        tenant_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<Student>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_student"])
            .start_timer();

        let student = sqlx::query_as::<_, Student>(
            r#"
            SELECT student_id, tenant_id, name, class_label, date_of_birth, parent_id, created_utc, updated_utc
            FROM students
            WHERE tenant_id = $1 AND student_id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get student: {}", e)))?;

        timer.observe_duration();

        Ok(student)
    }

    /// List students for a tenant, optionally restricted to one parent.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn list_students(
        &self,
        tenant_id: Uuid,
        parent_id: Option<Uuid>,
    ) -> Result<Vec<Student>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_students"])
            .start_timer();

        let students = sqlx::query_as::<_, Student>(
            r#"
            SELECT student_id, tenant_id, name, class_label, date_of_birth, parent_id, created_utc, updated_utc
            FROM students
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR parent_id = $2)
            ORDER BY created_utc
            "#,
        )
        .bind(tenant_id)
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list students: {}", e)))?;

        timer.observe_duration();

        Ok(students)
    }

    /// Count students in a tenant (capacity checks).
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn count_students(&self, tenant_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to count students: {}", e))
            })?;

        Ok(count)
    }

    /// Update a student. The parent reference is immutable and not updatable.
    #[instrument(skip(self, update), fields(tenant_id = %tenant_id, student_id = %student_id))]
    pub async fn update_student(
        &self,
        tenant_id: Uuid,
        student_id: Uuid,
        update: &UpdateStudent,
    ) -> Result<Option<Student>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_student"])
            .start_timer();

        let student = sqlx::query_as::<_, Student>(
            r#"
            UPDATE students
            SET name = COALESCE($3, name),
                class_label = COALESCE($4, class_label),
                date_of_birth = COALESCE($5, date_of_birth),
                updated_utc = NOW()
            WHERE tenant_id = $1 AND student_id = $2
            RETURNING student_id, tenant_id, name, class_label, date_of_birth, parent_id, created_utc, updated_utc
            "#,
        )
        .bind(tenant_id)
        .bind(student_id)
        .bind(&update.name)
        .bind(&update.class_label)
        .bind(update.date_of_birth)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update student: {}", e)))?;

        timer.observe_duration();

        Ok(student)
    }

    /// Delete a student. Activities and attendance records cascade.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, student_id = %student_id))]
    pub async fn delete_student(&self, tenant_id: Uuid, student_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_student"])
            .start_timer();

        let result = sqlx::query("DELETE FROM students WHERE tenant_id = $1 AND student_id = $2")
            .bind(tenant_id)
            .bind(student_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete student: {}", e))
            })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Activity Operations
    // -------------------------------------------------------------------------

    /// Create a new activity.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, student_id = %input.student_id))]
    pub async fn create_activity(&self, input: &CreateActivity) -> Result<Activity, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_activity"])
            .start_timer();

        let activity_id = Uuid::new_v4();
        let image_urls = serde_json::to_value(&input.image_urls)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to encode image list: {}", e)))?;

        let activity = sqlx::query_as::<_, Activity>(
            r#"
            INSERT INTO activities (activity_id, tenant_id, student_id, activity_type, description, image_urls, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING activity_id, tenant_id, student_id, activity_type, description, image_urls, created_by, created_utc, updated_utc
            "#,
        )
        .bind(activity_id)
        .bind(input.tenant_id)
        .bind(input.student_id)
        .bind(input.activity_type.as_str())
        .bind(&input.description)
        .bind(&image_urls)
        .bind(input.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create activity: {}", e)))?;

        timer.observe_duration();

        info!(activity_id = %activity.activity_id, activity_type = %activity.activity_type, "Activity created");

        Ok(activity)
    }

    /// Get an activity by ID within a tenant.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, activity_id = %activity_id))]
    pub async fn get_activity(
        &self,
        tenant_id: Uuid,
        activity_id: Uuid,
    ) -> Result<Option<Activity>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_activity"])
            .start_timer();

        let activity = sqlx::query_as::<_, Activity>(
            r#"
            SELECT activity_id, tenant_id, student_id, activity_type, description, image_urls, created_by, created_utc, updated_utc
            FROM activities
            WHERE tenant_id = $1 AND activity_id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(activity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get activity: {}", e)))?;

        timer.observe_duration();

        Ok(activity)
    }

    /// List activities most recent first. `student_id` narrows to one
    /// student; `parent_id` narrows to the children of one parent.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn list_activities(
        &self,
        tenant_id: Uuid,
        student_id: Option<Uuid>,
        parent_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Activity>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_activities"])
            .start_timer();

        let limit = limit.clamp(1, 200);
        let offset = offset.max(0);

        let activities = sqlx::query_as::<_, Activity>(
            r#"
            SELECT a.activity_id, a.tenant_id, a.student_id, a.activity_type, a.description, a.image_urls, a.created_by, a.created_utc, a.updated_utc
            FROM activities a
            WHERE a.tenant_id = $1
              AND ($2::uuid IS NULL OR a.student_id = $2)
              AND ($3::uuid IS NULL OR a.student_id IN (
                    SELECT s.student_id FROM students s
                    WHERE s.tenant_id = $1 AND s.parent_id = $3
              ))
            ORDER BY a.created_utc DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(tenant_id)
        .bind(student_id)
        .bind(parent_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list activities: {}", e)))?;

        timer.observe_duration();

        Ok(activities)
    }

    /// Update an activity's description and/or image list.
    #[instrument(skip(self, update), fields(tenant_id = %tenant_id, activity_id = %activity_id))]
    pub async fn update_activity(
        &self,
        tenant_id: Uuid,
        activity_id: Uuid,
        update: &UpdateActivity,
    ) -> Result<Option<Activity>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_activity"])
            .start_timer();

        let image_urls = match &update.image_urls {
            Some(list) => Some(serde_json::to_value(list).map_err(|e| {
                AppError::InternalError(anyhow::anyhow!("Failed to encode image list: {}", e))
            })?),
            None => None,
        };

        let activity = sqlx::query_as::<_, Activity>(
            r#"
            UPDATE activities
            SET description = COALESCE($3, description),
                image_urls = COALESCE($4, image_urls),
                updated_utc = NOW()
            WHERE tenant_id = $1 AND activity_id = $2
            RETURNING activity_id, tenant_id, student_id, activity_type, description, image_urls, created_by, created_utc, updated_utc
            "#,
        )
        .bind(tenant_id)
        .bind(activity_id)
        .bind(&update.description)
        .bind(&image_urls)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update activity: {}", e)))?;

        timer.observe_duration();

        Ok(activity)
    }

    /// Delete an activity.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, activity_id = %activity_id))]
    pub async fn delete_activity(
        &self,
        tenant_id: Uuid,
        activity_id: Uuid,
    ) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_activity"])
            .start_timer();

        let result =
            sqlx::query("DELETE FROM activities WHERE tenant_id = $1 AND activity_id = $2")
                .bind(tenant_id)
                .bind(activity_id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to delete activity: {}", e))
                })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Attendance Operations
    // -------------------------------------------------------------------------

    /// Mark attendance: insert-or-update keyed on (student, date). The
    /// unique constraint makes concurrent marks for the same pair a
    /// benign last-writer-wins race.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, student_id = %input.student_id, date = %input.attendance_date))]
    pub async fn upsert_attendance(
        &self,
        input: &MarkAttendance,
    ) -> Result<AttendanceRecord, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_attendance"])
            .start_timer();

        let record = Self::upsert_attendance_on(&self.pool, input).await?;

        timer.observe_duration();

        Ok(record)
    }

    /// Mark attendance for many students in one transaction. Either
    /// every input is upserted or none are.
    #[instrument(skip(self, inputs), fields(count = inputs.len()))]
    pub async fn upsert_attendance_bulk(
        &self,
        inputs: &[MarkAttendance],
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_attendance_bulk"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let mut records = Vec::with_capacity(inputs.len());
        for input in inputs {
            let record = Self::upsert_attendance_on(&mut *tx, input).await?;
            records.push(record);
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(count = records.len(), "Bulk attendance marked");

        Ok(records)
    }

    async fn upsert_attendance_on<'e, E>(
        executor: E,
        input: &MarkAttendance,
    ) -> Result<AttendanceRecord, AppError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let record_id = Uuid::new_v4();
        sqlx::query_as::<_, AttendanceRecord>(
            r#"
            INSERT INTO attendance_records (record_id, tenant_id, student_id, attendance_date, status, notes, marked_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (student_id, attendance_date)
            DO UPDATE SET status = EXCLUDED.status,
                          notes = EXCLUDED.notes,
                          marked_by = EXCLUDED.marked_by,
                          updated_utc = NOW()
            RETURNING record_id, tenant_id, student_id, attendance_date, status, notes, marked_by, created_utc, updated_utc
            "#,
        )
        .bind(record_id)
        .bind(input.tenant_id)
        .bind(input.student_id)
        .bind(input.attendance_date)
        .bind(input.status.as_str())
        .bind(&input.notes)
        .bind(input.marked_by)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to mark attendance: {}", e)))
    }

    /// Get an attendance record by ID within a tenant.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, record_id = %record_id))]
    pub async fn get_attendance_record(
        &self,
        tenant_id: Uuid,
        record_id: Uuid,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_attendance_record"])
            .start_timer();

        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT record_id, tenant_id, student_id, attendance_date, status, notes, marked_by, created_utc, updated_utc
            FROM attendance_records
            WHERE tenant_id = $1 AND record_id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get attendance record: {}", e))
        })?;

        timer.observe_duration();

        Ok(record)
    }

    /// Update an existing attendance record by ID.
    #[instrument(skip(self, update), fields(tenant_id = %tenant_id, record_id = %record_id))]
    pub async fn update_attendance(
        &self,
        tenant_id: Uuid,
        record_id: Uuid,
        update: &UpdateAttendance,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_attendance"])
            .start_timer();

        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            UPDATE attendance_records
            SET status = $3,
                notes = $4,
                updated_utc = NOW()
            WHERE tenant_id = $1 AND record_id = $2
            RETURNING record_id, tenant_id, student_id, attendance_date, status, notes, marked_by, created_utc, updated_utc
            "#,
        )
        .bind(tenant_id)
        .bind(record_id)
        .bind(update.status.as_str())
        .bind(&update.notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update attendance: {}", e))
        })?;

        timer.observe_duration();

        Ok(record)
    }

    /// Delete an attendance record.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, record_id = %record_id))]
    pub async fn delete_attendance_record(
        &self,
        tenant_id: Uuid,
        record_id: Uuid,
    ) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_attendance_record"])
            .start_timer();

        let result =
            sqlx::query("DELETE FROM attendance_records WHERE tenant_id = $1 AND record_id = $2")
                .bind(tenant_id)
                .bind(record_id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!(
                        "Failed to delete attendance record: {}",
                        e
                    ))
                })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    /// List attendance records most recent first. `student_id` narrows
    /// to one student, `parent_id` to the children of one parent,
    /// `date` to a single day.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn list_attendance(
        &self,
        tenant_id: Uuid,
        student_id: Option<Uuid>,
        parent_id: Option<Uuid>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_attendance"])
            .start_timer();

        let records = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT r.record_id, r.tenant_id, r.student_id, r.attendance_date, r.status, r.notes, r.marked_by, r.created_utc, r.updated_utc
            FROM attendance_records r
            WHERE r.tenant_id = $1
              AND ($2::uuid IS NULL OR r.student_id = $2)
              AND ($3::uuid IS NULL OR r.student_id IN (
                    SELECT s.student_id FROM students s
                    WHERE s.tenant_id = $1 AND s.parent_id = $3
              ))
              AND ($4::date IS NULL OR r.attendance_date = $4)
            ORDER BY r.attendance_date DESC, r.created_utc DESC
            "#,
        )
        .bind(tenant_id)
        .bind(student_id)
        .bind(parent_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list attendance: {}", e)))?;

        timer.observe_duration();

        Ok(records)
    }

    /// List one student's attendance within an optional date range.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, student_id = %student_id))]
    pub async fn list_student_attendance(
        &self,
        tenant_id: Uuid,
        student_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_student_attendance"])
            .start_timer();

        let records = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT record_id, tenant_id, student_id, attendance_date, status, notes, marked_by, created_utc, updated_utc
            FROM attendance_records
            WHERE tenant_id = $1
              AND student_id = $2
              AND ($3::date IS NULL OR attendance_date >= $3)
              AND ($4::date IS NULL OR attendance_date <= $4)
            ORDER BY attendance_date DESC
            "#,
        )
        .bind(tenant_id)
        .bind(student_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list student attendance: {}", e))
        })?;

        timer.observe_duration();

        Ok(records)
    }

    /// Attendance counts for one day across a tenant.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, date = %date))]
    pub async fn attendance_stats(
        &self,
        tenant_id: Uuid,
        date: NaiveDate,
    ) -> Result<AttendanceStats, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["attendance_stats"])
            .start_timer();

        let total_students = self.count_students(tenant_id).await?;

        let (present, absent, late): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE status = 'PRESENT'),
                   COUNT(*) FILTER (WHERE status = 'ABSENT'),
                   COUNT(*) FILTER (WHERE status = 'LATE')
            FROM attendance_records
            WHERE tenant_id = $1 AND attendance_date = $2
            "#,
        )
        .bind(tenant_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to compute attendance stats: {}", e))
        })?;

        timer.observe_duration();

        Ok(AttendanceStats::compute(total_students, present, absent, late))
    }
}
