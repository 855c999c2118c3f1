use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{ClassOffering, EnrollmentRecord};

/// Entities that can anchor a cascading delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Student,
    Teacher,
    Classroom,
    ClassOffering,
}

impl EntityType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(EntityType::Student),
            "teacher" => Some(EntityType::Teacher),
            "classroom" => Some(EntityType::Classroom),
            "class_offering" | "offering" => Some(EntityType::ClassOffering),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Student => "student",
            EntityType::Teacher => "teacher",
            EntityType::Classroom => "classroom",
            EntityType::ClassOffering => "class_offering",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DependencyItem {
    pub label: &'static str,
    pub count: i64,
}

/// Non-destructive pre-delete breakdown. Callers must fetch this and confirm
/// before the destructive call; the two-step contract is part of the API.
#[derive(Debug, Serialize)]
pub struct DependencyReport {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub items: Vec<DependencyItem>,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct CascadeSummary {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub offerings_deleted: u64,
    pub attendance_deleted: u64,
    pub enrollments_updated: u64,
    pub enrollments_deleted: u64,
}

/// Per-entity-type fan-out strategy: each inspector yields uniform
/// label/count items that compose into one report.
#[async_trait]
trait DependencyInspector: Send + Sync {
    async fn inspect(
        &self,
        conn: &mut SqliteConnection,
        entity_id: &str,
    ) -> Result<Vec<DependencyItem>, AppError>;
}

struct OwnerInspector {
    entity_type: EntityType,
}

struct OfferingInspector;

struct StudentInspector;

/// Offerings owned by the anchor entity. A student owns none; an offering
/// owns itself.
async fn owned_offerings(
    conn: &mut SqliteConnection,
    entity_type: EntityType,
    entity_id: &str,
) -> Result<Vec<ClassOffering>, AppError> {
    match entity_type {
        EntityType::Teacher => repository::fetch_offerings_by_teacher(&mut *conn, entity_id).await,
        EntityType::Classroom => {
            repository::fetch_offerings_by_classroom(&mut *conn, entity_id).await
        }
        EntityType::ClassOffering => {
            let offering = repository::find_offering_by_id(&mut *conn, entity_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("offering {}", entity_id)))?;
            Ok(vec![offering])
        }
        EntityType::Student => Ok(vec![]),
    }
}

/// Enrollment records referencing any of the given offerings, found by
/// traversing the records of each offering's version.
async fn enrollments_referencing(
    conn: &mut SqliteConnection,
    offerings: &[ClassOffering],
) -> Result<Vec<EnrollmentRecord>, AppError> {
    let offering_ids: HashSet<&str> = offerings.iter().map(|o| o.id.as_str()).collect();
    let versions: HashSet<&str> = offerings.iter().map(|o| o.version_id.as_str()).collect();

    let mut affected = Vec::new();
    for version_id in versions {
        let records = repository::fetch_enrollments_by_version(&mut *conn, version_id).await?;
        affected.extend(records.into_iter().filter(|record| {
            record
                .class_offering_ids
                .iter()
                .any(|id| offering_ids.contains(id.as_str()))
        }));
    }
    Ok(affected)
}

#[async_trait]
impl DependencyInspector for OwnerInspector {
    async fn inspect(
        &self,
        conn: &mut SqliteConnection,
        entity_id: &str,
    ) -> Result<Vec<DependencyItem>, AppError> {
        let offerings = owned_offerings(conn, self.entity_type, entity_id).await?;
        let offering_ids: Vec<String> = offerings.iter().map(|o| o.id.clone()).collect();

        let enrollments = enrollments_referencing(conn, &offerings).await?;
        let students: HashSet<&str> = enrollments.iter().map(|r| r.student_id.as_str()).collect();

        let attendance =
            repository::fetch_attendance_by_offering_ids(conn, &offering_ids).await?;

        Ok(vec![
            DependencyItem {
                label: "class_offerings",
                count: offerings.len() as i64,
            },
            DependencyItem {
                label: "affected_students",
                count: students.len() as i64,
            },
            DependencyItem {
                label: "attendance_records",
                count: attendance.len() as i64,
            },
        ])
    }
}

#[async_trait]
impl DependencyInspector for OfferingInspector {
    async fn inspect(
        &self,
        conn: &mut SqliteConnection,
        entity_id: &str,
    ) -> Result<Vec<DependencyItem>, AppError> {
        let offerings = owned_offerings(conn, EntityType::ClassOffering, entity_id).await?;
        let enrollments = enrollments_referencing(conn, &offerings).await?;
        let students: HashSet<&str> = enrollments.iter().map(|r| r.student_id.as_str()).collect();
        let attendance = repository::fetch_attendance_by_offering_ids(
            conn,
            &[entity_id.to_string()],
        )
        .await?;

        Ok(vec![
            DependencyItem {
                label: "enrolled_students",
                count: students.len() as i64,
            },
            DependencyItem {
                label: "attendance_records",
                count: attendance.len() as i64,
            },
        ])
    }
}

#[async_trait]
impl DependencyInspector for StudentInspector {
    async fn inspect(
        &self,
        conn: &mut SqliteConnection,
        entity_id: &str,
    ) -> Result<Vec<DependencyItem>, AppError> {
        let enrollments = repository::fetch_enrollments_by_student(&mut *conn, entity_id).await?;
        let attendance = repository::fetch_attendance_by_student(&mut *conn, entity_id).await?;

        Ok(vec![
            DependencyItem {
                label: "enrollment_records",
                count: enrollments.len() as i64,
            },
            DependencyItem {
                label: "attendance_records",
                count: attendance.len() as i64,
            },
        ])
    }
}

fn inspector_for(entity_type: EntityType) -> Box<dyn DependencyInspector> {
    match entity_type {
        EntityType::Teacher | EntityType::Classroom => Box::new(OwnerInspector { entity_type }),
        EntityType::ClassOffering => Box::new(OfferingInspector),
        EntityType::Student => Box::new(StudentInspector),
    }
}

/// Computes pre-delete dependency reports and executes cascading deletes.
pub struct DependencyResolver {
    db: SqlitePool,
}

impl DependencyResolver {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn ensure_exists(
        &self,
        conn: &mut SqliteConnection,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<(), AppError> {
        let found = match entity_type {
            EntityType::Student => repository::find_student_by_id(&mut *conn, entity_id)
                .await?
                .is_some(),
            EntityType::Teacher => repository::find_teacher_by_id(&mut *conn, entity_id)
                .await?
                .is_some(),
            EntityType::Classroom => repository::find_classroom_by_id(&mut *conn, entity_id)
                .await?
                .is_some(),
            EntityType::ClassOffering => repository::find_offering_by_id(&mut *conn, entity_id)
                .await?
                .is_some(),
        };
        if !found {
            return Err(AppError::NotFound(format!(
                "{} {}",
                entity_type.as_str(),
                entity_id
            )));
        }
        Ok(())
    }

    /// Non-mutating dependency breakdown for pre-delete confirmation.
    pub async fn get_dependencies(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<DependencyReport, AppError> {
        let mut conn = self.db.acquire().await?;
        self.ensure_exists(&mut conn, entity_type, entity_id).await?;

        let items = inspector_for(entity_type)
            .inspect(&mut conn, entity_id)
            .await?;
        let total = items.iter().map(|item| item.count).sum();

        Ok(DependencyReport {
            entity_type,
            entity_id: entity_id.to_string(),
            items,
            total,
        })
    }

    /// Deletes the entity and everything hanging off it as one transaction.
    /// Every read completes before the first write; afterwards no enrollment
    /// record references a deleted offering. Any store rejection aborts the
    /// whole unit with no partial effect.
    pub async fn delete_hierarchically(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<CascadeSummary, AppError> {
        let mut tx = self.db.begin().await?;
        let conn = &mut *tx;

        self.ensure_exists(conn, entity_type, entity_id).await?;

        // Read phase.
        let offerings = owned_offerings(conn, entity_type, entity_id).await?;
        let offering_ids: Vec<String> = offerings.iter().map(|o| o.id.clone()).collect();
        let offering_id_set: HashSet<&str> = offering_ids.iter().map(String::as_str).collect();

        let attendance = match entity_type {
            EntityType::Student => {
                repository::fetch_attendance_by_student(&mut *conn, entity_id).await?
            }
            _ => repository::fetch_attendance_by_offering_ids(conn, &offering_ids).await?,
        };
        let attendance_ids: Vec<String> = attendance.iter().map(|a| a.id.clone()).collect();

        let enrollments = match entity_type {
            EntityType::Student => {
                repository::fetch_enrollments_by_student(&mut *conn, entity_id).await?
            }
            _ => enrollments_referencing(conn, &offerings).await?,
        };

        // Write phase.
        let now = chrono::Utc::now().to_rfc3339();
        let mut enrollments_updated = 0;
        let mut enrollments_deleted = 0;

        for record in &enrollments {
            if entity_type == EntityType::Student {
                // The records belong to the student being deleted; release
                // their seats so cached counts stay truthful.
                for offering_id in &record.class_offering_ids {
                    repository::adjust_current_students(&mut *conn, offering_id, -1, &now).await?;
                }
                repository::delete_enrollment_record(&mut *conn, &record.id).await?;
                enrollments_deleted += 1;
                continue;
            }

            let remaining: Vec<String> = record
                .class_offering_ids
                .iter()
                .filter(|id| !offering_id_set.contains(id.as_str()))
                .cloned()
                .collect();
            if remaining.is_empty() {
                repository::delete_enrollment_record(&mut *conn, &record.id).await?;
                enrollments_deleted += 1;
            } else {
                repository::update_enrollment_offering_ids(&mut *conn, &record.id, &remaining, &now)
                    .await?;
                enrollments_updated += 1;
            }
        }

        let attendance_deleted = repository::delete_attendance_rows(conn, &attendance_ids).await?;
        let offerings_deleted = repository::delete_offering_rows(conn, &offering_ids).await?;

        match entity_type {
            EntityType::Teacher => {
                repository::delete_teacher_row(&mut *conn, entity_id).await?;
            }
            EntityType::Classroom => {
                repository::delete_classroom_row(&mut *conn, entity_id).await?;
            }
            EntityType::Student => {
                repository::delete_student_row(&mut *conn, entity_id).await?;
            }
            // The offering row itself was covered by delete_offering_rows.
            EntityType::ClassOffering => {}
        }

        tx.commit()
            .await
            .map_err(|e| AppError::TransactionAbort(e.to_string()))?;

        let summary = CascadeSummary {
            entity_type,
            entity_id: entity_id.to_string(),
            offerings_deleted,
            attendance_deleted,
            enrollments_updated,
            enrollments_deleted,
        };
        info!(
            "cascading delete of {} {}: {} offerings, {} attendance, {} enrollment records updated, {} deleted",
            entity_type.as_str(),
            entity_id,
            summary.offerings_deleted,
            summary.attendance_deleted,
            summary.enrollments_updated,
            summary.enrollments_deleted
        );
        Ok(summary)
    }
}
