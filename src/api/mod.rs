use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{delete, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::models::*;
use crate::services::{
    CascadeSummary, CloneStats, ColorMigrationStats, DependencyReport, DependencyResolver,
    EnrollmentLedger, EntityType, OfferingService, VersionCloner, VersionManager,
};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/versions", get(list_versions).post(create_version))
        .route("/versions/active", get(get_active_version))
        .route(
            "/versions/{id}",
            get(get_version).patch(update_version).delete(delete_version),
        )
        .route("/versions/{id}/activate", post(activate_version))
        .route("/versions/{id}/copy", post(copy_version))
        .route("/versions/{id}/timetables/bulk-init", post(bulk_init_timetables))
        .route("/teachers", get(list_teachers).post(create_teacher))
        .route("/classrooms", get(list_classrooms).post(create_classroom))
        .route("/courses", get(list_courses).post(create_course))
        .route("/students", get(list_students).post(create_student))
        .route("/offerings", get(list_offerings).post(create_offering))
        .route("/offerings/migrate-colors", post(migrate_colors))
        .route("/offerings/{id}", get(get_offering).patch(update_offering))
        .route(
            "/offerings/{id}/enrollments",
            get(list_enrolled_students).post(add_enrollment),
        )
        .route(
            "/offerings/{id}/enrollments/{student_id}",
            delete(remove_enrollment),
        )
        .route("/offerings/{id}/reconcile", post(reconcile_offering))
        .route(
            "/dependencies/{entity_type}/{id}",
            get(get_dependencies).delete(delete_hierarchically),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

// ==================== versions ====================

async fn list_versions(
    State(state): State<AppState>,
) -> Result<Json<Vec<TimetableVersion>>, AppError> {
    let versions = VersionManager::new(state.db).list_versions().await?;
    Ok(Json(versions))
}

async fn create_version(
    State(state): State<AppState>,
    Json(req): Json<NewVersionRequest>,
) -> Result<Json<TimetableVersion>, AppError> {
    let version = VersionManager::new(state.db).create_version(req).await?;
    Ok(Json(version))
}

async fn get_active_version(
    State(state): State<AppState>,
) -> Result<Json<TimetableVersion>, AppError> {
    let version = VersionManager::new(state.db).get_active_version().await?;
    Ok(Json(version))
}

async fn get_version(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TimetableVersion>, AppError> {
    let version = VersionManager::new(state.db).get_version(&id).await?;
    Ok(Json(version))
}

async fn update_version(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateVersionRequest>,
) -> Result<Json<TimetableVersion>, AppError> {
    let version = VersionManager::new(state.db).update_version(&id, req).await?;
    Ok(Json(version))
}

async fn delete_version(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    VersionManager::new(state.db).delete_version(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn activate_version(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TimetableVersion>, AppError> {
    let version = VersionManager::new(state.db).activate_version(&id).await?;
    Ok(Json(version))
}

async fn copy_version(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NewVersionRequest>,
) -> Result<Json<CloneStats>, AppError> {
    let stats = VersionCloner::new(state.db).copy_version(&id, req).await?;
    Ok(Json(stats))
}

#[derive(Deserialize)]
struct BulkInitRequest {
    student_ids: Vec<String>,
}

#[derive(Serialize)]
struct BulkInitResponse {
    created: usize,
}

async fn bulk_init_timetables(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<BulkInitRequest>,
) -> Result<Json<BulkInitResponse>, AppError> {
    let created = VersionCloner::new(state.db)
        .bulk_initialize_empty_timetables(&id, &req.student_ids)
        .await?;
    Ok(Json(BulkInitResponse { created }))
}

// ==================== catalog entities ====================

#[derive(Deserialize)]
struct VersionQueryParams {
    version_id: Option<String>,
}

async fn list_teachers(
    State(state): State<AppState>,
    Query(params): Query<VersionQueryParams>,
) -> Result<Json<Vec<Teacher>>, AppError> {
    let version = VersionManager::new(state.db.clone())
        .resolve_version(params.version_id.as_deref())
        .await?;
    let teachers = repository::fetch_teachers_by_version(&state.db, &version.id).await?;
    Ok(Json(teachers))
}

async fn create_teacher(
    State(state): State<AppState>,
    Json(req): Json<NewTeacherRequest>,
) -> Result<Json<Teacher>, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("teacher name is required".to_string()));
    }
    let version = VersionManager::new(state.db.clone())
        .resolve_version(req.version_id.as_deref())
        .await?;
    let now = Utc::now().to_rfc3339();
    let teacher = Teacher {
        id: Uuid::new_v4().to_string(),
        version_id: version.id,
        name: req.name,
        subjects: req.subjects,
        email: req.email,
        phone: req.phone,
        created_at: now.clone(),
        updated_at: now,
    };
    repository::insert_teacher(&state.db, &teacher).await?;
    Ok(Json(teacher))
}

async fn list_classrooms(
    State(state): State<AppState>,
) -> Result<Json<Vec<Classroom>>, AppError> {
    let classrooms = repository::fetch_classrooms(&state.db).await?;
    Ok(Json(classrooms))
}

async fn create_classroom(
    State(state): State<AppState>,
    Json(req): Json<NewClassroomRequest>,
) -> Result<Json<Classroom>, AppError> {
    let now = Utc::now().to_rfc3339();
    let classroom = Classroom {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        capacity: req.capacity,
        location: req.location,
        created_at: now.clone(),
        updated_at: now,
    };
    repository::insert_classroom(&state.db, &classroom).await?;
    Ok(Json(classroom))
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    let courses = repository::fetch_courses(&state.db).await?;
    Ok(Json(courses))
}

/// Courses are deduplicated on create: an existing (name, subject,
/// difficulty) triple returns the existing course instead of a new row.
async fn create_course(
    State(state): State<AppState>,
    Json(req): Json<NewCourseRequest>,
) -> Result<Json<Course>, AppError> {
    if let Some(existing) = repository::find_course_by_fields(
        &state.db,
        &req.name,
        &req.subject,
        &req.difficulty,
    )
    .await?
    {
        return Ok(Json(existing));
    }
    let now = Utc::now().to_rfc3339();
    let course = Course {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        subject: req.subject,
        difficulty: req.difficulty,
        created_at: now.clone(),
        updated_at: now,
    };
    repository::insert_course(&state.db, &course).await?;
    Ok(Json(course))
}

async fn list_students(State(state): State<AppState>) -> Result<Json<Vec<Student>>, AppError> {
    let students = repository::fetch_students(&state.db).await?;
    Ok(Json(students))
}

async fn create_student(
    State(state): State<AppState>,
    Json(req): Json<NewStudentRequest>,
) -> Result<Json<Student>, AppError> {
    let now = Utc::now().to_rfc3339();
    let student = Student {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        grade: req.grade,
        created_at: now.clone(),
        updated_at: now,
    };
    repository::insert_student(&state.db, &student).await?;
    Ok(Json(student))
}

// ==================== offerings ====================

async fn list_offerings(
    State(state): State<AppState>,
    Query(params): Query<VersionQueryParams>,
) -> Result<Json<Vec<ClassOffering>>, AppError> {
    let version = VersionManager::new(state.db.clone())
        .resolve_version(params.version_id.as_deref())
        .await?;
    let offerings = OfferingService::new(state.db).list_offerings(&version.id).await?;
    Ok(Json(offerings))
}

async fn create_offering(
    State(state): State<AppState>,
    Json(req): Json<NewOfferingRequest>,
) -> Result<Json<ClassOffering>, AppError> {
    let offering = OfferingService::new(state.db).create_offering(req).await?;
    Ok(Json(offering))
}

async fn get_offering(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClassOffering>, AppError> {
    let offering = OfferingService::new(state.db).get_offering(&id).await?;
    Ok(Json(offering))
}

async fn update_offering(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateOfferingRequest>,
) -> Result<Json<ClassOffering>, AppError> {
    let offering = OfferingService::new(state.db).update_offering(&id, req).await?;
    Ok(Json(offering))
}

async fn migrate_colors(
    State(state): State<AppState>,
    Query(params): Query<VersionQueryParams>,
) -> Result<Json<ColorMigrationStats>, AppError> {
    let stats = OfferingService::new(state.db)
        .migrate_missing_colors(params.version_id.as_deref())
        .await?;
    Ok(Json(stats))
}

// ==================== enrollments ====================

async fn add_enrollment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<EnrollmentRequest>,
) -> Result<Json<EnrollmentRecord>, AppError> {
    let record = EnrollmentLedger::new(state.db)
        .add_enrollment(&req.student_id, &id, req.version_id.as_deref())
        .await?;
    Ok(Json(record))
}

async fn list_enrolled_students(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<VersionQueryParams>,
) -> Result<Json<Vec<Student>>, AppError> {
    let students = EnrollmentLedger::new(state.db)
        .get_enrolled_students(&id, params.version_id.as_deref())
        .await?;
    Ok(Json(students))
}

async fn remove_enrollment(
    State(state): State<AppState>,
    Path((id, student_id)): Path<(String, String)>,
    Query(params): Query<VersionQueryParams>,
) -> Result<StatusCode, AppError> {
    EnrollmentLedger::new(state.db)
        .remove_enrollment(&student_id, &id, params.version_id.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct ReconcileResponse {
    current_students: i64,
}

async fn reconcile_offering(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let current_students = EnrollmentLedger::new(state.db)
        .reconcile_current_students(&id)
        .await?;
    Ok(Json(ReconcileResponse { current_students }))
}

// ==================== dependencies / cascading delete ====================

fn parse_entity_type(raw: &str) -> Result<EntityType, AppError> {
    EntityType::parse(raw).ok_or_else(|| {
        AppError::Validation(format!(
            "unknown entity type '{}'; expected student, teacher, classroom or class_offering",
            raw
        ))
    })
}

async fn get_dependencies(
    State(state): State<AppState>,
    Path((entity_type, id)): Path<(String, String)>,
) -> Result<Json<DependencyReport>, AppError> {
    let entity_type = parse_entity_type(&entity_type)?;
    let report = DependencyResolver::new(state.db)
        .get_dependencies(entity_type, &id)
        .await?;
    Ok(Json(report))
}

#[derive(Deserialize)]
struct ConfirmParams {
    #[serde(default)]
    confirm: bool,
}

/// Destructive half of the two-step delete contract: callers must have
/// fetched the dependency report and must pass `confirm=true` explicitly.
async fn delete_hierarchically(
    State(state): State<AppState>,
    Path((entity_type, id)): Path<(String, String)>,
    Query(params): Query<ConfirmParams>,
) -> Result<Json<CascadeSummary>, AppError> {
    let entity_type = parse_entity_type(&entity_type)?;
    if !params.confirm {
        return Err(AppError::Validation(
            "cascading delete requires confirm=true; fetch the dependency report first"
                .to_string(),
        ));
    }
    let summary = DependencyResolver::new(state.db)
        .delete_hierarchically(entity_type, &id)
        .await?;
    Ok(Json(summary))
}
