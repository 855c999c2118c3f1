use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{repository, WRITE_BATCH_LIMIT};
use crate::error::AppError;
use crate::models::{
    ClassOffering, EnrollmentRecord, NewVersionRequest, Teacher, TimetableVersion,
};

use super::versions::VersionManager;

/// Deep-copies a version: teachers, offerings, and enrollment records, each
/// with fresh ids and cross-references rewritten through old-to-new maps.
///
/// Each phase commits its writes in chunks of [`WRITE_BATCH_LIMIT`]. There is
/// no cross-phase rollback: if a later phase fails after an earlier one
/// committed, the error names the committed phases and recovery is deleting
/// the half-built version and re-running.
pub struct VersionCloner {
    db: SqlitePool,
}

#[derive(Debug, Serialize)]
pub struct CloneStats {
    pub version: TimetableVersion,
    pub teachers_copied: usize,
    pub offerings_copied: usize,
    pub enrollments_copied: usize,
}

impl VersionCloner {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn copy_version(
        &self,
        source_version_id: &str,
        metadata: NewVersionRequest,
    ) -> Result<CloneStats, AppError> {
        repository::find_version_by_id(&self.db, source_version_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("version {}", source_version_id)))?;

        // The new version is created inactive and never activated here.
        let versions = VersionManager::new(self.db.clone());
        let new_version = versions.create_version(metadata).await?;

        let mut completed: Vec<&'static str> = vec!["version"];

        // Phase 1: teachers.
        let teacher_map = self
            .copy_teachers(source_version_id, &new_version.id)
            .await
            .map_err(|e| partial(&completed, "teachers", e))?;
        completed.push("teachers");

        // Phase 2: offerings, teacher ids rewritten. Classroom and course
        // ids pass through unchanged; those entities are unversioned.
        let offering_map = self
            .copy_offerings(source_version_id, &new_version.id, &teacher_map)
            .await
            .map_err(|e| partial(&completed, "offerings", e))?;
        completed.push("offerings");

        // Phase 3: enrollment records, offering-id sets rewritten.
        let enrollments_copied = self
            .copy_enrollments(source_version_id, &new_version.id, &offering_map)
            .await
            .map_err(|e| partial(&completed, "enrollments", e))?;

        info!(
            "copied version {} -> {}: {} teachers, {} offerings, {} enrollment records",
            source_version_id,
            new_version.id,
            teacher_map.len(),
            offering_map.len(),
            enrollments_copied
        );
        Ok(CloneStats {
            version: new_version,
            teachers_copied: teacher_map.len(),
            offerings_copied: offering_map.len(),
            enrollments_copied,
        })
    }

    async fn copy_teachers(
        &self,
        source_version_id: &str,
        new_version_id: &str,
    ) -> Result<HashMap<String, String>, AppError> {
        let source = repository::fetch_teachers_by_version(&self.db, source_version_id).await?;
        let now = Utc::now().to_rfc3339();

        let mut map = HashMap::with_capacity(source.len());
        let copies: Vec<Teacher> = source
            .into_iter()
            .map(|teacher| {
                let new_id = Uuid::new_v4().to_string();
                map.insert(teacher.id.clone(), new_id.clone());
                Teacher {
                    id: new_id,
                    version_id: new_version_id.to_string(),
                    created_at: now.clone(),
                    updated_at: now.clone(),
                    ..teacher
                }
            })
            .collect();

        for chunk in copies.chunks(WRITE_BATCH_LIMIT) {
            let mut tx = self.db.begin().await?;
            for teacher in chunk {
                repository::insert_teacher(&mut *tx, teacher).await?;
            }
            tx.commit()
                .await
                .map_err(|e| AppError::TransactionAbort(e.to_string()))?;
        }
        Ok(map)
    }

    async fn copy_offerings(
        &self,
        source_version_id: &str,
        new_version_id: &str,
        teacher_map: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, AppError> {
        let source = repository::fetch_offerings_by_version(&self.db, source_version_id).await?;
        let now = Utc::now().to_rfc3339();

        let mut map = HashMap::with_capacity(source.len());
        let copies: Vec<ClassOffering> = source
            .into_iter()
            .map(|offering| {
                let new_id = Uuid::new_v4().to_string();
                map.insert(offering.id.clone(), new_id.clone());
                // An unmapped teacher id passes through rather than failing.
                let teacher_id = teacher_map
                    .get(&offering.teacher_id)
                    .cloned()
                    .unwrap_or_else(|| {
                        warn!(
                            "offering {} references teacher {} outside the source version",
                            offering.id, offering.teacher_id
                        );
                        offering.teacher_id.clone()
                    });
                ClassOffering {
                    id: new_id,
                    version_id: new_version_id.to_string(),
                    teacher_id,
                    created_at: now.clone(),
                    updated_at: now.clone(),
                    ..offering
                }
            })
            .collect();

        for chunk in copies.chunks(WRITE_BATCH_LIMIT) {
            let mut tx = self.db.begin().await?;
            for offering in chunk {
                repository::insert_offering(&mut *tx, offering).await?;
            }
            tx.commit()
                .await
                .map_err(|e| AppError::TransactionAbort(e.to_string()))?;
        }
        Ok(map)
    }

    async fn copy_enrollments(
        &self,
        source_version_id: &str,
        new_version_id: &str,
        offering_map: &HashMap<String, String>,
    ) -> Result<usize, AppError> {
        let source = repository::fetch_enrollments_by_version(&self.db, source_version_id).await?;
        let now = Utc::now().to_rfc3339();

        let copies: Vec<EnrollmentRecord> = source
            .into_iter()
            .map(|record| {
                let ids = record
                    .class_offering_ids
                    .iter()
                    .map(|id| offering_map.get(id).cloned().unwrap_or_else(|| id.clone()))
                    .collect();
                EnrollmentRecord {
                    id: Uuid::new_v4().to_string(),
                    version_id: new_version_id.to_string(),
                    class_offering_ids: ids,
                    created_at: now.clone(),
                    updated_at: now.clone(),
                    ..record
                }
            })
            .collect();

        for chunk in copies.chunks(WRITE_BATCH_LIMIT) {
            let mut tx = self.db.begin().await?;
            for record in chunk {
                repository::insert_enrollment_record(&mut *tx, record).await?;
            }
            tx.commit()
                .await
                .map_err(|e| AppError::TransactionAbort(e.to_string()))?;
        }
        Ok(copies.len())
    }

    /// Seeds empty enrollment records for students who lack one in the
    /// version. Existing records are never overwritten; only the diff is
    /// created. Returns how many records were created.
    pub async fn bulk_initialize_empty_timetables(
        &self,
        version_id: &str,
        student_ids: &[String],
    ) -> Result<usize, AppError> {
        repository::find_version_by_id(&self.db, version_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("version {}", version_id)))?;

        let existing = repository::fetch_enrollments_by_version(&self.db, version_id).await?;
        let already_seeded: HashSet<&str> =
            existing.iter().map(|r| r.student_id.as_str()).collect();

        let mut seen = HashSet::new();
        let now = Utc::now().to_rfc3339();
        let missing: Vec<EnrollmentRecord> = student_ids
            .iter()
            .filter(|id| !already_seeded.contains(id.as_str()))
            .filter(|id| seen.insert(id.as_str()))
            .map(|student_id| EnrollmentRecord {
                id: Uuid::new_v4().to_string(),
                student_id: student_id.clone(),
                version_id: version_id.to_string(),
                class_offering_ids: vec![],
                notes: String::new(),
                created_at: now.clone(),
                updated_at: now.clone(),
            })
            .collect();

        for chunk in missing.chunks(WRITE_BATCH_LIMIT) {
            let mut tx = self.db.begin().await?;
            for record in chunk {
                repository::insert_enrollment_record(&mut *tx, record).await?;
            }
            tx.commit()
                .await
                .map_err(|e| AppError::TransactionAbort(e.to_string()))?;
        }

        info!(
            "bulk-initialized {} empty timetables in version {}",
            missing.len(),
            version_id
        );
        Ok(missing.len())
    }
}

fn partial(completed: &[&'static str], failed_phase: &str, error: AppError) -> AppError {
    AppError::PartialClone {
        completed_phases: completed.to_vec(),
        message: format!("phase '{}' failed: {}", failed_phase, error),
    }
}
