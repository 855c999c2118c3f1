use std::collections::HashSet;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{EnrollmentRecord, Student};

/// Maintains the student-to-offering relation and the cached
/// `current_students` count on each offering.
///
/// Every mutation runs as one transaction whose reads all precede its
/// writes, so a capacity check cannot race another enrollment into the same
/// offering. The counter itself is only ever adjusted in place; reconcile is
/// the sole authoritative overwrite.
pub struct EnrollmentLedger {
    db: SqlitePool,
}

impl EnrollmentLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn add_enrollment(
        &self,
        student_id: &str,
        offering_id: &str,
        version_id: Option<&str>,
    ) -> Result<EnrollmentRecord, AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.db.begin().await?;

        let offering = repository::find_offering_by_id(&mut *tx, offering_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("offering {}", offering_id)))?;

        let version_id = match version_id {
            Some(id) if id != offering.version_id => {
                return Err(AppError::Validation(format!(
                    "offering {} belongs to version {}, not {}",
                    offering_id, offering.version_id, id
                )));
            }
            Some(id) => id.to_string(),
            None => offering.version_id.clone(),
        };

        repository::find_student_by_id(&mut *tx, student_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("student {}", student_id)))?;

        if offering.current_students >= offering.max_students {
            return Err(AppError::CapacityExceeded {
                offering_id: offering_id.to_string(),
                max_students: offering.max_students,
            });
        }

        let existing =
            repository::find_enrollment_by_student_version(&mut *tx, student_id, &version_id)
                .await?;

        let record = match existing {
            Some(mut record) => {
                if record.contains_offering(offering_id) {
                    return Err(AppError::DuplicateEnrollment {
                        student_id: student_id.to_string(),
                        offering_id: offering_id.to_string(),
                    });
                }
                record.class_offering_ids.push(offering_id.to_string());
                record.updated_at = now.clone();
                repository::update_enrollment_offering_ids(
                    &mut *tx,
                    &record.id,
                    &record.class_offering_ids,
                    &now,
                )
                .await?;
                record
            }
            None => {
                let record = EnrollmentRecord {
                    id: Uuid::new_v4().to_string(),
                    student_id: student_id.to_string(),
                    version_id: version_id.clone(),
                    class_offering_ids: vec![offering_id.to_string()],
                    notes: String::new(),
                    created_at: now.clone(),
                    updated_at: now.clone(),
                };
                repository::insert_enrollment_record(&mut *tx, &record).await?;
                record
            }
        };

        repository::adjust_current_students(&mut *tx, offering_id, 1, &now).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::TransactionAbort(e.to_string()))?;

        info!(
            "enrolled student {} into offering {} (version {})",
            student_id, offering_id, version_id
        );
        Ok(record)
    }

    /// Removal is tolerant: a missing record or a missing id is logged, not
    /// an error, and the counter still decrements so stale counts converge
    /// back toward the truth. An emptied record is deleted, not kept.
    pub async fn remove_enrollment(
        &self,
        student_id: &str,
        offering_id: &str,
        version_id: Option<&str>,
    ) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.db.begin().await?;

        let offering = repository::find_offering_by_id(&mut *tx, offering_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("offering {}", offering_id)))?;
        let version_id = version_id.unwrap_or(&offering.version_id).to_string();

        let existing =
            repository::find_enrollment_by_student_version(&mut *tx, student_id, &version_id)
                .await?;

        match existing {
            Some(mut record) => {
                let before = record.class_offering_ids.len();
                record.class_offering_ids.retain(|id| id != offering_id);
                if record.class_offering_ids.len() == before {
                    warn!(
                        "offering {} not present in enrollment record {}; decrementing anyway",
                        offering_id, record.id
                    );
                } else if record.class_offering_ids.is_empty() {
                    repository::delete_enrollment_record(&mut *tx, &record.id).await?;
                } else {
                    repository::update_enrollment_offering_ids(
                        &mut *tx,
                        &record.id,
                        &record.class_offering_ids,
                        &now,
                    )
                    .await?;
                }
            }
            None => {
                warn!(
                    "no enrollment record for student {} in version {}; decrementing anyway",
                    student_id, version_id
                );
            }
        }

        repository::adjust_current_students(&mut *tx, offering_id, -1, &now).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::TransactionAbort(e.to_string()))?;

        info!(
            "removed student {} from offering {} (version {})",
            student_id, offering_id, version_id
        );
        Ok(())
    }

    /// Recomputes `current_students` from the enrollment records of the
    /// offering's version and overwrites the cached value if it drifted.
    /// Idempotent and safe to call at any time.
    pub async fn reconcile_current_students(&self, offering_id: &str) -> Result<i64, AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.db.begin().await?;

        let offering = repository::find_offering_by_id(&mut *tx, offering_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("offering {}", offering_id)))?;

        let records =
            repository::fetch_enrollments_by_version(&mut *tx, &offering.version_id).await?;
        let actual = records
            .iter()
            .filter(|r| r.contains_offering(offering_id))
            .count() as i64;

        if actual != offering.current_students {
            warn!(
                "offering {} current_students drifted: cached {}, actual {}",
                offering_id, offering.current_students, actual
            );
            repository::set_current_students(&mut *tx, offering_id, actual, &now).await?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::TransactionAbort(e.to_string()))?;
        Ok(actual)
    }

    /// Deduplicated students enrolled in the offering, resolved through
    /// chunked id-list lookups.
    pub async fn get_enrolled_students(
        &self,
        offering_id: &str,
        version_id: Option<&str>,
    ) -> Result<Vec<Student>, AppError> {
        let offering = repository::find_offering_by_id(&self.db, offering_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("offering {}", offering_id)))?;
        let version_id = version_id.unwrap_or(&offering.version_id);

        let records = repository::fetch_enrollments_by_version(&self.db, version_id).await?;
        let mut seen = HashSet::new();
        let student_ids: Vec<String> = records
            .iter()
            .filter(|r| r.contains_offering(offering_id))
            .filter(|r| seen.insert(r.student_id.clone()))
            .map(|r| r.student_id.clone())
            .collect();

        let mut conn = self.db.acquire().await?;
        repository::fetch_students_by_ids(&mut conn, &student_ids).await
    }
}
