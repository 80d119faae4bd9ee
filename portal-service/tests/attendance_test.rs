//! Attendance integration tests: upsert invariant, bulk marking, stats.
//!
//! Requires TEST_DATABASE_URL pointing at a PostgreSQL database.

mod common;

use common::{create_student, error_code, register_user, spawn_app};
use serde_json::json;

const MARK_ATTENDANCE_MUTATION: &str = r#"
    mutation Mark($input: MarkAttendanceInput!) {
        markAttendance(input: $input) {
            id
            date
            status
            notes
            student { id }
            markedBy { id }
        }
    }
"#;

const STUDENT_ATTENDANCE_QUERY: &str = r#"
    query Attendance($studentId: ID!, $startDate: NaiveDate, $endDate: NaiveDate) {
        studentAttendance(studentId: $studentId, startDate: $startDate, endDate: $endDate) {
            id
            date
            status
        }
    }
"#;

#[tokio::test]
#[ignore] // Requires database
async fn marking_twice_updates_in_place() {
    let app = spawn_app().await;
    let (admin_token, _) = register_user(&app, "admin@example.com", "ADMIN").await;
    let (_, parent_id) = register_user(&app, "p1@example.com", "PARENT").await;
    let student_id = create_student(&app, &admin_token, &parent_id, "Aiman").await;

    let first = app
        .graphql(
            Some(&admin_token),
            MARK_ATTENDANCE_MUTATION,
            json!({
                "input": { "studentId": student_id, "date": "2026-03-02", "status": "PRESENT" }
            }),
        )
        .await;
    assert_eq!(
        first["data"]["markAttendance"]["status"].as_str().unwrap(),
        "PRESENT"
    );

    let second = app
        .graphql(
            Some(&admin_token),
            MARK_ATTENDANCE_MUTATION,
            json!({
                "input": {
                    "studentId": student_id,
                    "date": "2026-03-02",
                    "status": "LATE",
                    "notes": "arrived 9:40",
                }
            }),
        )
        .await;
    assert_eq!(
        second["data"]["markAttendance"]["status"].as_str().unwrap(),
        "LATE"
    );

    // At most one record per (student, date).
    let records = app
        .graphql(
            Some(&admin_token),
            STUDENT_ATTENDANCE_QUERY,
            json!({ "studentId": student_id }),
        )
        .await;
    let records = records["data"]["studentAttendance"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"].as_str().unwrap(), "LATE");
}

#[tokio::test]
#[ignore]
async fn bulk_marking_is_idempotent_under_replay() {
    let app = spawn_app().await;
    let (admin_token, _) = register_user(&app, "admin@example.com", "ADMIN").await;
    let (_, parent_id) = register_user(&app, "p1@example.com", "PARENT").await;

    let mut inputs = Vec::new();
    for i in 0..3 {
        let student_id = create_student(&app, &admin_token, &parent_id, &format!("S{}", i)).await;
        inputs.push(json!({
            "studentId": student_id,
            "date": "2026-03-03",
            "status": "PRESENT",
        }));
    }

    let mutation = r#"
        mutation Bulk($inputs: [MarkAttendanceInput!]!) {
            markBulkAttendance(inputs: $inputs) { id status }
        }
    "#;

    let first = app
        .graphql(Some(&admin_token), mutation, json!({ "inputs": inputs.clone() }))
        .await;
    let first_records = first["data"]["markBulkAttendance"].as_array().unwrap();
    assert_eq!(first_records.len(), 3);

    // Replay with identical inputs: same rows, updated in place.
    let replay = app
        .graphql(Some(&admin_token), mutation, json!({ "inputs": inputs }))
        .await;
    let replay_records = replay["data"]["markBulkAttendance"].as_array().unwrap();
    assert_eq!(replay_records.len(), 3);

    let all = app
        .graphql(
            Some(&admin_token),
            "query Records($date: NaiveDate) { attendanceRecords(date: $date) { id } }",
            json!({ "date": "2026-03-03" }),
        )
        .await;
    assert_eq!(all["data"]["attendanceRecords"].as_array().unwrap().len(), 3);
}

#[tokio::test]
#[ignore]
async fn bulk_marking_with_unknown_student_writes_nothing() {
    let app = spawn_app().await;
    let (admin_token, _) = register_user(&app, "admin@example.com", "ADMIN").await;
    let (_, parent_id) = register_user(&app, "p1@example.com", "PARENT").await;
    let student_id = create_student(&app, &admin_token, &parent_id, "Aiman").await;

    let mutation = r#"
        mutation Bulk($inputs: [MarkAttendanceInput!]!) {
            markBulkAttendance(inputs: $inputs) { id }
        }
    "#;

    let response = app
        .graphql(
            Some(&admin_token),
            mutation,
            json!({
                "inputs": [
                    { "studentId": student_id, "date": "2026-03-04", "status": "PRESENT" },
                    { "studentId": uuid::Uuid::new_v4().to_string(), "date": "2026-03-04", "status": "PRESENT" },
                ]
            }),
        )
        .await;
    assert_eq!(error_code(&response), Some("NOT_FOUND"));

    let records = app
        .graphql(
            Some(&admin_token),
            "query Records($date: NaiveDate) { attendanceRecords(date: $date) { id } }",
            json!({ "date": "2026-03-04" }),
        )
        .await;
    assert_eq!(records["data"]["attendanceRecords"].as_array().unwrap().len(), 0);
}

#[tokio::test]
#[ignore]
async fn attendance_stats_counts_one_day_for_admin_only() {
    let app = spawn_app().await;
    let (admin_token, _) = register_user(&app, "admin@example.com", "ADMIN").await;
    let (parent_token, parent_id) = register_user(&app, "p1@example.com", "PARENT").await;

    let mut student_ids = Vec::new();
    for i in 0..4 {
        student_ids.push(create_student(&app, &admin_token, &parent_id, &format!("S{}", i)).await);
    }

    for (student_id, status) in student_ids.iter().zip(["PRESENT", "PRESENT", "ABSENT", "LATE"]) {
        app.graphql(
            Some(&admin_token),
            MARK_ATTENDANCE_MUTATION,
            json!({
                "input": { "studentId": student_id, "date": "2026-03-05", "status": status }
            }),
        )
        .await;
    }

    let query = r#"
        query Stats($date: NaiveDate!) {
            attendanceStats(date: $date) {
                totalStudents
                presentCount
                absentCount
                lateCount
                attendanceRate
            }
        }
    "#;

    let stats = app
        .graphql(Some(&admin_token), query, json!({ "date": "2026-03-05" }))
        .await;
    let stats = &stats["data"]["attendanceStats"];
    assert_eq!(stats["totalStudents"].as_i64().unwrap(), 4);
    assert_eq!(stats["presentCount"].as_i64().unwrap(), 2);
    assert_eq!(stats["absentCount"].as_i64().unwrap(), 1);
    assert_eq!(stats["lateCount"].as_i64().unwrap(), 1);
    assert_eq!(stats["attendanceRate"].as_f64().unwrap(), 50.0);

    let denied = app
        .graphql(Some(&parent_token), query, json!({ "date": "2026-03-05" }))
        .await;
    assert_eq!(error_code(&denied), Some("FORBIDDEN"));
}

#[tokio::test]
#[ignore]
async fn parent_reads_own_child_attendance_but_not_others() {
    let app = spawn_app().await;
    let (admin_token, _) = register_user(&app, "admin@example.com", "ADMIN").await;
    let (parent1_token, parent1_id) = register_user(&app, "p1@example.com", "PARENT").await;
    let (_, parent2_id) = register_user(&app, "p2@example.com", "PARENT").await;

    let own = create_student(&app, &admin_token, &parent1_id, "Mine").await;
    let other = create_student(&app, &admin_token, &parent2_id, "Theirs").await;

    for student_id in [&own, &other] {
        app.graphql(
            Some(&admin_token),
            MARK_ATTENDANCE_MUTATION,
            json!({
                "input": { "studentId": student_id, "date": "2026-03-06", "status": "PRESENT" }
            }),
        )
        .await;
    }

    let allowed = app
        .graphql(
            Some(&parent1_token),
            STUDENT_ATTENDANCE_QUERY,
            json!({ "studentId": own }),
        )
        .await;
    assert_eq!(
        allowed["data"]["studentAttendance"].as_array().unwrap().len(),
        1
    );

    let denied = app
        .graphql(
            Some(&parent1_token),
            STUDENT_ATTENDANCE_QUERY,
            json!({ "studentId": other }),
        )
        .await;
    assert_eq!(error_code(&denied), Some("FORBIDDEN"));

    // The unfiltered listing is scoped to the caller's children.
    let listing = app
        .graphql(
            Some(&parent1_token),
            "{ attendanceRecords { student { id } } }",
            json!({}),
        )
        .await;
    let listing = listing["data"]["attendanceRecords"].as_array().unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0]["student"]["id"].as_str().unwrap(), own);
}

#[tokio::test]
#[ignore]
async fn update_attendance_by_id_and_delete() {
    let app = spawn_app().await;
    let (admin_token, _) = register_user(&app, "admin@example.com", "ADMIN").await;
    let (_, parent_id) = register_user(&app, "p1@example.com", "PARENT").await;
    let student_id = create_student(&app, &admin_token, &parent_id, "Aiman").await;

    let marked = app
        .graphql(
            Some(&admin_token),
            MARK_ATTENDANCE_MUTATION,
            json!({
                "input": { "studentId": student_id, "date": "2026-03-07", "status": "PRESENT" }
            }),
        )
        .await;
    let record_id = marked["data"]["markAttendance"]["id"].as_str().unwrap().to_string();

    let updated = app
        .graphql(
            Some(&admin_token),
            r#"
            mutation Update($input: UpdateAttendanceInput!) {
                updateAttendance(input: $input) { id status notes }
            }
            "#,
            json!({ "input": { "id": record_id, "status": "ABSENT", "notes": "sick" } }),
        )
        .await;
    assert_eq!(
        updated["data"]["updateAttendance"]["status"].as_str().unwrap(),
        "ABSENT"
    );

    let deleted = app
        .graphql(
            Some(&admin_token),
            "mutation Delete($id: ID!) { deleteAttendanceRecord(id: $id) }",
            json!({ "id": record_id }),
        )
        .await;
    assert_eq!(deleted["data"]["deleteAttendanceRecord"], true);

    let read = app
        .graphql(
            Some(&admin_token),
            "query Record($id: ID!) { attendanceRecord(id: $id) { id } }",
            json!({ "id": record_id }),
        )
        .await;
    assert_eq!(error_code(&read), Some("NOT_FOUND"));
}

#[tokio::test]
#[ignore]
async fn parent_cannot_mark_attendance() {
    let app = spawn_app().await;
    let (admin_token, _) = register_user(&app, "admin@example.com", "ADMIN").await;
    let (parent_token, parent_id) = register_user(&app, "p1@example.com", "PARENT").await;
    let student_id = create_student(&app, &admin_token, &parent_id, "Aiman").await;

    let response = app
        .graphql(
            Some(&parent_token),
            MARK_ATTENDANCE_MUTATION,
            json!({
                "input": { "studentId": student_id, "date": "2026-03-08", "status": "PRESENT" }
            }),
        )
        .await;

    assert_eq!(error_code(&response), Some("FORBIDDEN"));
}
