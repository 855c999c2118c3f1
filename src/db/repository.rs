use sqlx::sqlite::SqliteConnection;
use sqlx::SqliteExecutor;

use crate::error::AppError;
use crate::models::{
    AttendanceRecord, ClassOffering, ClassOfferingRow, Classroom, Course, EnrollmentRecord,
    EnrollmentRecordRow, Student, Teacher, TeacherRow, TimetableVersion,
};

use super::{placeholders, ID_LOOKUP_LIMIT};

// ==================== versions ====================

const VERSION_COLUMNS: &str =
    "id, name, display_name, start_date, end_date, description, sort_order, is_active, created_at, updated_at";

pub async fn insert_version(
    db: impl SqliteExecutor<'_>,
    version: &TimetableVersion,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO timetable_versions (id, name, display_name, start_date, end_date, description, sort_order, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&version.id)
    .bind(&version.name)
    .bind(&version.display_name)
    .bind(&version.start_date)
    .bind(&version.end_date)
    .bind(&version.description)
    .bind(version.order)
    .bind(version.is_active)
    .bind(&version.created_at)
    .bind(&version.updated_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn fetch_versions(db: impl SqliteExecutor<'_>) -> Result<Vec<TimetableVersion>, AppError> {
    let rows = sqlx::query_as::<_, TimetableVersion>(&format!(
        "SELECT {} FROM timetable_versions ORDER BY sort_order, created_at",
        VERSION_COLUMNS
    ))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_version_by_id(
    db: impl SqliteExecutor<'_>,
    id: &str,
) -> Result<Option<TimetableVersion>, AppError> {
    let row = sqlx::query_as::<_, TimetableVersion>(&format!(
        "SELECT {} FROM timetable_versions WHERE id = ?",
        VERSION_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn fetch_active_version(
    db: impl SqliteExecutor<'_>,
) -> Result<Option<TimetableVersion>, AppError> {
    let row = sqlx::query_as::<_, TimetableVersion>(&format!(
        "SELECT {} FROM timetable_versions WHERE is_active = 1",
        VERSION_COLUMNS
    ))
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn deactivate_all_versions(
    db: impl SqliteExecutor<'_>,
    now: &str,
) -> Result<(), AppError> {
    sqlx::query("UPDATE timetable_versions SET is_active = 0, updated_at = ? WHERE is_active = 1")
        .bind(now)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn mark_version_active(
    db: impl SqliteExecutor<'_>,
    id: &str,
    now: &str,
) -> Result<bool, AppError> {
    let result =
        sqlx::query("UPDATE timetable_versions SET is_active = 1, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(db)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_version_row(
    db: impl SqliteExecutor<'_>,
    version: &TimetableVersion,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE timetable_versions SET name = ?, display_name = ?, start_date = ?, end_date = ?, description = ?, sort_order = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&version.name)
    .bind(&version.display_name)
    .bind(&version.start_date)
    .bind(&version.end_date)
    .bind(&version.description)
    .bind(version.order)
    .bind(&version.updated_at)
    .bind(&version.id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn delete_version_row(db: impl SqliteExecutor<'_>, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM timetable_versions WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ==================== teachers ====================

const TEACHER_COLUMNS: &str =
    "id, version_id, name, subjects, email, phone, created_at, updated_at";

pub async fn insert_teacher(db: impl SqliteExecutor<'_>, teacher: &Teacher) -> Result<(), AppError> {
    let subjects = serde_json::to_string(&teacher.subjects)?;
    sqlx::query(
        "INSERT INTO teachers (id, version_id, name, subjects, email, phone, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&teacher.id)
    .bind(&teacher.version_id)
    .bind(&teacher.name)
    .bind(subjects)
    .bind(&teacher.email)
    .bind(&teacher.phone)
    .bind(&teacher.created_at)
    .bind(&teacher.updated_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn find_teacher_by_id(
    db: impl SqliteExecutor<'_>,
    id: &str,
) -> Result<Option<Teacher>, AppError> {
    let row = sqlx::query_as::<_, TeacherRow>(&format!(
        "SELECT {} FROM teachers WHERE id = ?",
        TEACHER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    row.map(Teacher::try_from).transpose().map_err(Into::into)
}

pub async fn fetch_teachers_by_version(
    db: impl SqliteExecutor<'_>,
    version_id: &str,
) -> Result<Vec<Teacher>, AppError> {
    let rows = sqlx::query_as::<_, TeacherRow>(&format!(
        "SELECT {} FROM teachers WHERE version_id = ? ORDER BY name",
        TEACHER_COLUMNS
    ))
    .bind(version_id)
    .fetch_all(db)
    .await?;
    rows.into_iter()
        .map(|row| Teacher::try_from(row).map_err(Into::into))
        .collect()
}

pub async fn delete_teacher_row(db: impl SqliteExecutor<'_>, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM teachers WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ==================== classrooms ====================

const CLASSROOM_COLUMNS: &str = "id, name, capacity, location, created_at, updated_at";

pub async fn insert_classroom(
    db: impl SqliteExecutor<'_>,
    classroom: &Classroom,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO classrooms (id, name, capacity, location, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&classroom.id)
    .bind(&classroom.name)
    .bind(classroom.capacity)
    .bind(&classroom.location)
    .bind(&classroom.created_at)
    .bind(&classroom.updated_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn fetch_classrooms(db: impl SqliteExecutor<'_>) -> Result<Vec<Classroom>, AppError> {
    let rows = sqlx::query_as::<_, Classroom>(&format!(
        "SELECT {} FROM classrooms ORDER BY name",
        CLASSROOM_COLUMNS
    ))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_classroom_by_id(
    db: impl SqliteExecutor<'_>,
    id: &str,
) -> Result<Option<Classroom>, AppError> {
    let row = sqlx::query_as::<_, Classroom>(&format!(
        "SELECT {} FROM classrooms WHERE id = ?",
        CLASSROOM_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn delete_classroom_row(db: impl SqliteExecutor<'_>, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM classrooms WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ==================== courses ====================

const COURSE_COLUMNS: &str = "id, name, subject, difficulty, created_at, updated_at";

pub async fn insert_course(db: impl SqliteExecutor<'_>, course: &Course) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO courses (id, name, subject, difficulty, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&course.id)
    .bind(&course.name)
    .bind(&course.subject)
    .bind(&course.difficulty)
    .bind(&course.created_at)
    .bind(&course.updated_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn fetch_courses(db: impl SqliteExecutor<'_>) -> Result<Vec<Course>, AppError> {
    let rows = sqlx::query_as::<_, Course>(&format!(
        "SELECT {} FROM courses ORDER BY name",
        COURSE_COLUMNS
    ))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_course_by_id(
    db: impl SqliteExecutor<'_>,
    id: &str,
) -> Result<Option<Course>, AppError> {
    let row = sqlx::query_as::<_, Course>(&format!(
        "SELECT {} FROM courses WHERE id = ?",
        COURSE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Dedup lookup used on create: courses are shared across versions and keyed
/// by (name, subject, difficulty).
pub async fn find_course_by_fields(
    db: impl SqliteExecutor<'_>,
    name: &str,
    subject: &str,
    difficulty: &str,
) -> Result<Option<Course>, AppError> {
    let row = sqlx::query_as::<_, Course>(&format!(
        "SELECT {} FROM courses WHERE name = ? AND subject = ? AND difficulty = ?",
        COURSE_COLUMNS
    ))
    .bind(name)
    .bind(subject)
    .bind(difficulty)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

// ==================== students ====================

const STUDENT_COLUMNS: &str = "id, name, grade, created_at, updated_at";

pub async fn insert_student(db: impl SqliteExecutor<'_>, student: &Student) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO students (id, name, grade, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&student.id)
    .bind(&student.name)
    .bind(&student.grade)
    .bind(&student.created_at)
    .bind(&student.updated_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn fetch_students(db: impl SqliteExecutor<'_>) -> Result<Vec<Student>, AppError> {
    let rows = sqlx::query_as::<_, Student>(&format!(
        "SELECT {} FROM students ORDER BY name",
        STUDENT_COLUMNS
    ))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_student_by_id(
    db: impl SqliteExecutor<'_>,
    id: &str,
) -> Result<Option<Student>, AppError> {
    let row = sqlx::query_as::<_, Student>(&format!(
        "SELECT {} FROM students WHERE id = ?",
        STUDENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Fetch-by-id-list, chunked to the store's lookup limit.
pub async fn fetch_students_by_ids(
    conn: &mut SqliteConnection,
    ids: &[String],
) -> Result<Vec<Student>, AppError> {
    let mut students = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(ID_LOOKUP_LIMIT) {
        let sql = format!(
            "SELECT {} FROM students WHERE id IN ({})",
            STUDENT_COLUMNS,
            placeholders(chunk.len())
        );
        let mut query = sqlx::query_as::<_, Student>(&sql);
        for id in chunk {
            query = query.bind(id);
        }
        students.extend(query.fetch_all(&mut *conn).await?);
    }
    Ok(students)
}

pub async fn delete_student_row(db: impl SqliteExecutor<'_>, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM students WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ==================== class offerings ====================

const OFFERING_COLUMNS: &str =
    "id, version_id, course_id, teacher_id, classroom_id, name, schedule, max_students, current_students, color, status, created_at, updated_at";

pub async fn insert_offering(
    db: impl SqliteExecutor<'_>,
    offering: &ClassOffering,
) -> Result<(), AppError> {
    let schedule = serde_json::to_string(&offering.schedule)?;
    sqlx::query(
        "INSERT INTO class_offerings (id, version_id, course_id, teacher_id, classroom_id, name, schedule, max_students, current_students, color, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&offering.id)
    .bind(&offering.version_id)
    .bind(&offering.course_id)
    .bind(&offering.teacher_id)
    .bind(&offering.classroom_id)
    .bind(&offering.name)
    .bind(schedule)
    .bind(offering.max_students)
    .bind(offering.current_students)
    .bind(&offering.color)
    .bind(offering.status.as_str())
    .bind(&offering.created_at)
    .bind(&offering.updated_at)
    .execute(db)
    .await?;
    Ok(())
}

fn offerings_from_rows(rows: Vec<ClassOfferingRow>) -> Result<Vec<ClassOffering>, AppError> {
    rows.into_iter()
        .map(|row| ClassOffering::try_from(row).map_err(Into::into))
        .collect()
}

pub async fn find_offering_by_id(
    db: impl SqliteExecutor<'_>,
    id: &str,
) -> Result<Option<ClassOffering>, AppError> {
    let row = sqlx::query_as::<_, ClassOfferingRow>(&format!(
        "SELECT {} FROM class_offerings WHERE id = ?",
        OFFERING_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    row.map(ClassOffering::try_from)
        .transpose()
        .map_err(Into::into)
}

pub async fn fetch_offerings_by_version(
    db: impl SqliteExecutor<'_>,
    version_id: &str,
) -> Result<Vec<ClassOffering>, AppError> {
    let rows = sqlx::query_as::<_, ClassOfferingRow>(&format!(
        "SELECT {} FROM class_offerings WHERE version_id = ? ORDER BY name",
        OFFERING_COLUMNS
    ))
    .bind(version_id)
    .fetch_all(db)
    .await?;
    offerings_from_rows(rows)
}

pub async fn fetch_offerings_by_teacher(
    db: impl SqliteExecutor<'_>,
    teacher_id: &str,
) -> Result<Vec<ClassOffering>, AppError> {
    let rows = sqlx::query_as::<_, ClassOfferingRow>(&format!(
        "SELECT {} FROM class_offerings WHERE teacher_id = ?",
        OFFERING_COLUMNS
    ))
    .bind(teacher_id)
    .fetch_all(db)
    .await?;
    offerings_from_rows(rows)
}

pub async fn fetch_offerings_by_classroom(
    db: impl SqliteExecutor<'_>,
    classroom_id: &str,
) -> Result<Vec<ClassOffering>, AppError> {
    let rows = sqlx::query_as::<_, ClassOfferingRow>(&format!(
        "SELECT {} FROM class_offerings WHERE classroom_id = ?",
        OFFERING_COLUMNS
    ))
    .bind(classroom_id)
    .fetch_all(db)
    .await?;
    offerings_from_rows(rows)
}

pub async fn fetch_offerings_missing_color(
    db: impl SqliteExecutor<'_>,
    version_id: &str,
) -> Result<Vec<ClassOffering>, AppError> {
    let rows = sqlx::query_as::<_, ClassOfferingRow>(&format!(
        "SELECT {} FROM class_offerings WHERE version_id = ? AND color = ''",
        OFFERING_COLUMNS
    ))
    .bind(version_id)
    .fetch_all(db)
    .await?;
    offerings_from_rows(rows)
}

pub async fn update_offering_row(
    db: impl SqliteExecutor<'_>,
    offering: &ClassOffering,
) -> Result<(), AppError> {
    let schedule = serde_json::to_string(&offering.schedule)?;
    sqlx::query(
        "UPDATE class_offerings SET teacher_id = ?, classroom_id = ?, name = ?, schedule = ?, max_students = ?, color = ?, status = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&offering.teacher_id)
    .bind(&offering.classroom_id)
    .bind(&offering.name)
    .bind(schedule)
    .bind(offering.max_students)
    .bind(&offering.color)
    .bind(offering.status.as_str())
    .bind(&offering.updated_at)
    .bind(&offering.id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn update_offering_color(
    db: impl SqliteExecutor<'_>,
    id: &str,
    color: &str,
    now: &str,
) -> Result<(), AppError> {
    sqlx::query("UPDATE class_offerings SET color = ?, updated_at = ? WHERE id = ?")
        .bind(color)
        .bind(now)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

/// In-place counter adjustment. Never read-modify-write: the store applies
/// the delta atomically, clamped at zero so drift repair cannot go negative.
pub async fn adjust_current_students(
    db: impl SqliteExecutor<'_>,
    id: &str,
    delta: i64,
    now: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE class_offerings SET current_students = MAX(current_students + ?, 0), updated_at = ? WHERE id = ?",
    )
    .bind(delta)
    .bind(now)
    .bind(id)
    .execute(db)
    .await?;
    Ok(())
}

/// Authoritative overwrite used only by reconcile.
pub async fn set_current_students(
    db: impl SqliteExecutor<'_>,
    id: &str,
    count: i64,
    now: &str,
) -> Result<(), AppError> {
    sqlx::query("UPDATE class_offerings SET current_students = ?, updated_at = ? WHERE id = ?")
        .bind(count)
        .bind(now)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete_offering_rows(
    conn: &mut SqliteConnection,
    ids: &[String],
) -> Result<u64, AppError> {
    let mut deleted = 0;
    for chunk in ids.chunks(ID_LOOKUP_LIMIT) {
        let sql = format!(
            "DELETE FROM class_offerings WHERE id IN ({})",
            placeholders(chunk.len())
        );
        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(id);
        }
        deleted += query.execute(&mut *conn).await?.rows_affected();
    }
    Ok(deleted)
}

// ==================== enrollment records ====================

const ENROLLMENT_COLUMNS: &str =
    "id, student_id, version_id, class_offering_ids, notes, created_at, updated_at";

pub async fn insert_enrollment_record(
    db: impl SqliteExecutor<'_>,
    record: &EnrollmentRecord,
) -> Result<(), AppError> {
    let ids = serde_json::to_string(&record.class_offering_ids)?;
    sqlx::query(
        "INSERT INTO enrollment_records (id, student_id, version_id, class_offering_ids, notes, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.id)
    .bind(&record.student_id)
    .bind(&record.version_id)
    .bind(ids)
    .bind(&record.notes)
    .bind(&record.created_at)
    .bind(&record.updated_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn find_enrollment_by_student_version(
    db: impl SqliteExecutor<'_>,
    student_id: &str,
    version_id: &str,
) -> Result<Option<EnrollmentRecord>, AppError> {
    let row = sqlx::query_as::<_, EnrollmentRecordRow>(&format!(
        "SELECT {} FROM enrollment_records WHERE student_id = ? AND version_id = ?",
        ENROLLMENT_COLUMNS
    ))
    .bind(student_id)
    .bind(version_id)
    .fetch_optional(db)
    .await?;
    row.map(EnrollmentRecord::try_from)
        .transpose()
        .map_err(Into::into)
}

pub async fn fetch_enrollments_by_version(
    db: impl SqliteExecutor<'_>,
    version_id: &str,
) -> Result<Vec<EnrollmentRecord>, AppError> {
    let rows = sqlx::query_as::<_, EnrollmentRecordRow>(&format!(
        "SELECT {} FROM enrollment_records WHERE version_id = ?",
        ENROLLMENT_COLUMNS
    ))
    .bind(version_id)
    .fetch_all(db)
    .await?;
    rows.into_iter()
        .map(|row| EnrollmentRecord::try_from(row).map_err(Into::into))
        .collect()
}

pub async fn fetch_enrollments_by_student(
    db: impl SqliteExecutor<'_>,
    student_id: &str,
) -> Result<Vec<EnrollmentRecord>, AppError> {
    let rows = sqlx::query_as::<_, EnrollmentRecordRow>(&format!(
        "SELECT {} FROM enrollment_records WHERE student_id = ?",
        ENROLLMENT_COLUMNS
    ))
    .bind(student_id)
    .fetch_all(db)
    .await?;
    rows.into_iter()
        .map(|row| EnrollmentRecord::try_from(row).map_err(Into::into))
        .collect()
}

pub async fn update_enrollment_offering_ids(
    db: impl SqliteExecutor<'_>,
    record_id: &str,
    offering_ids: &[String],
    now: &str,
) -> Result<(), AppError> {
    let ids = serde_json::to_string(offering_ids)?;
    sqlx::query(
        "UPDATE enrollment_records SET class_offering_ids = ?, updated_at = ? WHERE id = ?",
    )
    .bind(ids)
    .bind(now)
    .bind(record_id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn delete_enrollment_record(
    db: impl SqliteExecutor<'_>,
    record_id: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM enrollment_records WHERE id = ?")
        .bind(record_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ==================== attendance records ====================

const ATTENDANCE_COLUMNS: &str = "id, class_offering_id, student_id, payload";

pub async fn insert_attendance_record(
    db: impl SqliteExecutor<'_>,
    record: &AttendanceRecord,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO attendance_records (id, class_offering_id, student_id, payload) VALUES (?, ?, ?, ?)",
    )
    .bind(&record.id)
    .bind(&record.class_offering_id)
    .bind(&record.student_id)
    .bind(&record.payload)
    .execute(db)
    .await?;
    Ok(())
}

/// All attendance rows referencing any of the given offerings, chunked.
pub async fn fetch_attendance_by_offering_ids(
    conn: &mut SqliteConnection,
    offering_ids: &[String],
) -> Result<Vec<AttendanceRecord>, AppError> {
    let mut records = Vec::new();
    for chunk in offering_ids.chunks(ID_LOOKUP_LIMIT) {
        let sql = format!(
            "SELECT {} FROM attendance_records WHERE class_offering_id IN ({})",
            ATTENDANCE_COLUMNS,
            placeholders(chunk.len())
        );
        let mut query = sqlx::query_as::<_, AttendanceRecord>(&sql);
        for id in chunk {
            query = query.bind(id);
        }
        records.extend(query.fetch_all(&mut *conn).await?);
    }
    Ok(records)
}

pub async fn fetch_attendance_by_student(
    db: impl SqliteExecutor<'_>,
    student_id: &str,
) -> Result<Vec<AttendanceRecord>, AppError> {
    let rows = sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {} FROM attendance_records WHERE student_id = ?",
        ATTENDANCE_COLUMNS
    ))
    .bind(student_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn delete_attendance_rows(
    conn: &mut SqliteConnection,
    record_ids: &[String],
) -> Result<u64, AppError> {
    let mut deleted = 0;
    for chunk in record_ids.chunks(ID_LOOKUP_LIMIT) {
        let sql = format!(
            "DELETE FROM attendance_records WHERE id IN ({})",
            placeholders(chunk.len())
        );
        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(id);
        }
        deleted += query.execute(&mut *conn).await?.rows_affected();
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use uuid::Uuid;

    async fn setup_test_db() -> SqlitePool {
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

    fn version(name: &str) -> TimetableVersion {
        let now = Utc::now().to_rfc3339();
        TimetableVersion {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            display_name: name.to_string(),
            start_date: "2026-03-01".to_string(),
            end_date: "2026-08-31".to_string(),
            description: String::new(),
            order: 0,
            is_active: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_version() {
        let pool = setup_test_db().await;
        let v = version("2026-spring");
        insert_version(&pool, &v).await.expect("insert");

        let found = find_version_by_id(&pool, &v.id)
            .await
            .expect("find")
            .expect("version exists");
        assert_eq!(found.name, "2026-spring");
        assert!(!found.is_active);

        let all = fetch_versions(&pool).await.expect("fetch");
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn teacher_subjects_round_trip_through_json_column() {
        let pool = setup_test_db().await;
        let v = version("v");
        insert_version(&pool, &v).await.expect("insert version");

        let now = Utc::now().to_rfc3339();
        let teacher = Teacher {
            id: Uuid::new_v4().to_string(),
            version_id: v.id.clone(),
            name: "Kim".to_string(),
            subjects: vec!["math".to_string(), "physics".to_string()],
            email: None,
            phone: None,
            created_at: now.clone(),
            updated_at: now,
        };
        insert_teacher(&pool, &teacher).await.expect("insert");

        let found = find_teacher_by_id(&pool, &teacher.id)
            .await
            .expect("find")
            .expect("teacher exists");
        assert_eq!(found.subjects, vec!["math", "physics"]);
    }

    #[tokio::test]
    async fn chunked_student_lookup_crosses_the_limit() {
        let pool = setup_test_db().await;
        let now = Utc::now().to_rfc3339();
        let mut ids = Vec::new();
        // 23 students forces three chunks under the limit of 10.
        for i in 0..23 {
            let student = Student {
                id: format!("student-{:02}", i),
                name: format!("Student {}", i),
                grade: None,
                created_at: now.clone(),
                updated_at: now.clone(),
            };
            insert_student(&pool, &student).await.expect("insert");
            ids.push(student.id);
        }

        let mut conn = pool.acquire().await.expect("acquire");
        let students = fetch_students_by_ids(&mut conn, &ids).await.expect("fetch");
        assert_eq!(students.len(), 23);
    }

    #[tokio::test]
    async fn counter_adjustment_is_clamped_at_zero() {
        let pool = setup_test_db().await;
        let v = version("v");
        insert_version(&pool, &v).await.expect("insert version");

        let now = Utc::now().to_rfc3339();
        let offering = ClassOffering {
            id: Uuid::new_v4().to_string(),
            version_id: v.id.clone(),
            course_id: "c".to_string(),
            teacher_id: "t".to_string(),
            classroom_id: "r".to_string(),
            name: "Algebra".to_string(),
            schedule: vec![],
            max_students: 5,
            current_students: 0,
            color: "#F44336".to_string(),
            status: crate::models::OfferingStatus::Active,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        insert_offering(&pool, &offering).await.expect("insert");

        adjust_current_students(&pool, &offering.id, -1, &now)
            .await
            .expect("adjust");
        let found = find_offering_by_id(&pool, &offering.id)
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(found.current_students, 0);

        adjust_current_students(&pool, &offering.id, 1, &now)
            .await
            .expect("adjust");
        let found = find_offering_by_id(&pool, &offering.id)
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(found.current_students, 1);
    }
}
