#![allow(dead_code)]

use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

use timetable_backend::db::repository;
use timetable_backend::models::*;
use timetable_backend::services::{OfferingService, VersionManager};

pub async fn test_pool() -> SqlitePool {
    // A single connection keeps every query on the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test db");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub async fn seed_version(pool: &SqlitePool, name: &str) -> TimetableVersion {
    VersionManager::new(pool.clone())
        .create_version(NewVersionRequest {
            name: name.to_string(),
            display_name: name.to_string(),
            start_date: "2026-03-01".to_string(),
            end_date: "2026-08-31".to_string(),
            description: String::new(),
            order: 0,
        })
        .await
        .expect("Failed to create version")
}

pub async fn seed_teacher(pool: &SqlitePool, version_id: &str, name: &str) -> Teacher {
    let now = Utc::now().to_rfc3339();
    let teacher = Teacher {
        id: Uuid::new_v4().to_string(),
        version_id: version_id.to_string(),
        name: name.to_string(),
        subjects: vec!["math".to_string()],
        email: None,
        phone: None,
        created_at: now.clone(),
        updated_at: now,
    };
    repository::insert_teacher(pool, &teacher)
        .await
        .expect("Failed to insert teacher");
    teacher
}

pub async fn seed_classroom(pool: &SqlitePool, name: &str) -> Classroom {
    let now = Utc::now().to_rfc3339();
    let classroom = Classroom {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        capacity: Some(30),
        location: None,
        created_at: now.clone(),
        updated_at: now,
    };
    repository::insert_classroom(pool, &classroom)
        .await
        .expect("Failed to insert classroom");
    classroom
}

pub async fn seed_student(pool: &SqlitePool, name: &str) -> Student {
    let now = Utc::now().to_rfc3339();
    let student = Student {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        grade: None,
        created_at: now.clone(),
        updated_at: now,
    };
    repository::insert_student(pool, &student)
        .await
        .expect("Failed to insert student");
    student
}

pub fn block(day: DayOfWeek, start: &str, end: &str) -> ScheduleBlock {
    ScheduleBlock {
        day_of_week: day,
        start_time: start.to_string(),
        end_time: end.to_string(),
    }
}

pub async fn seed_offering(
    pool: &SqlitePool,
    version_id: &str,
    teacher_id: &str,
    classroom_id: &str,
    name: &str,
    schedule: Vec<ScheduleBlock>,
    max_students: i64,
) -> ClassOffering {
    OfferingService::new(pool.clone())
        .create_offering(NewOfferingRequest {
            version_id: Some(version_id.to_string()),
            course_id: None,
            course: Some(NewCourseRequest {
                name: format!("{} course", name),
                subject: "math".to_string(),
                difficulty: "basic".to_string(),
            }),
            teacher_id: teacher_id.to_string(),
            classroom_id: classroom_id.to_string(),
            name: name.to_string(),
            schedule,
            max_students,
            status: OfferingStatus::Active,
        })
        .await
        .expect("Failed to create offering")
}

pub async fn seed_attendance(pool: &SqlitePool, offering_id: &str, student_id: &str) {
    let record = AttendanceRecord {
        id: Uuid::new_v4().to_string(),
        class_offering_id: offering_id.to_string(),
        student_id: student_id.to_string(),
        payload: "{}".to_string(),
    };
    repository::insert_attendance_record(pool, &record)
        .await
        .expect("Failed to insert attendance record");
}
