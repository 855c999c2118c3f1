use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{repository, COLOR_MIGRATION_CHUNK};
use crate::error::AppError;
use crate::models::{
    ClassOffering, Course, NewOfferingRequest, ScheduleBlock, UpdateOfferingRequest,
};
use crate::schedule::color::{assign_color, DEFAULT_COLOR};
use crate::schedule::conflict::{find_teacher_conflicts, schedules_overlap};
use crate::schedule::time::validate_blocks;

use super::versions::VersionManager;

/// Create/edit pipeline for class offerings: schedule validation, course
/// dedup, teacher conflict detection, then color assignment against the
/// offerings it overlaps. The offering id is allocated up front so the color
/// hash runs against the real identifier exactly once.
pub struct OfferingService {
    db: SqlitePool,
}

#[derive(Debug, Serialize)]
pub struct ColorMigrationStats {
    pub migrated: usize,
    pub defaulted: usize,
}

impl OfferingService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn list_offerings(&self, version_id: &str) -> Result<Vec<ClassOffering>, AppError> {
        repository::fetch_offerings_by_version(&self.db, version_id).await
    }

    pub async fn get_offering(&self, id: &str) -> Result<ClassOffering, AppError> {
        repository::find_offering_by_id(&self.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("offering {}", id)))
    }

    pub async fn create_offering(
        &self,
        req: NewOfferingRequest,
    ) -> Result<ClassOffering, AppError> {
        let versions = VersionManager::new(self.db.clone());
        let version = versions.resolve_version(req.version_id.as_deref()).await?;

        validate_blocks(&req.schedule)?;
        if req.max_students < 1 {
            return Err(AppError::Validation(
                "max_students must be at least 1".to_string(),
            ));
        }

        let teacher = repository::find_teacher_by_id(&self.db, &req.teacher_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("teacher {}", req.teacher_id)))?;
        if teacher.version_id != version.id {
            return Err(AppError::Validation(format!(
                "teacher {} belongs to version {}, not {}",
                teacher.id, teacher.version_id, version.id
            )));
        }
        repository::find_classroom_by_id(&self.db, &req.classroom_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("classroom {}", req.classroom_id)))?;

        let (course, new_course) = self.resolve_course(&req).await?;

        let existing = repository::fetch_offerings_by_version(&self.db, &version.id).await?;
        let conflicts =
            find_teacher_conflicts(&req.schedule, &req.teacher_id, &existing, None)?;
        if let Some(first) = conflicts.first() {
            return Err(AppError::ScheduleConflict(format!(
                "teacher {} already teaches '{}' on {} {}-{} ({} overlap(s) total)",
                teacher.name,
                first.offering_name,
                first.day,
                first.existing_start,
                first.existing_end,
                conflicts.len()
            )));
        }

        // Real id first, derived color second.
        let id = Uuid::new_v4().to_string();
        let color = self.pick_color(
            &id,
            &req.teacher_id,
            &req.classroom_id,
            &req.schedule,
            &existing,
            None,
        )?;

        let now = Utc::now().to_rfc3339();
        let offering = ClassOffering {
            id,
            version_id: version.id.clone(),
            course_id: course.id.clone(),
            teacher_id: req.teacher_id,
            classroom_id: req.classroom_id,
            name: req.name,
            schedule: req.schedule,
            max_students: req.max_students,
            current_students: 0,
            color,
            status: req.status,
            created_at: now.clone(),
            updated_at: now,
        };

        let mut tx = self.db.begin().await?;
        if new_course {
            repository::insert_course(&mut *tx, &course).await?;
        }
        repository::insert_offering(&mut *tx, &offering).await?;
        tx.commit()
            .await
            .map_err(|e| AppError::TransactionAbort(e.to_string()))?;

        info!(
            "created offering {} ({}) in version {}",
            offering.name, offering.id, offering.version_id
        );
        Ok(offering)
    }

    pub async fn update_offering(
        &self,
        id: &str,
        req: UpdateOfferingRequest,
    ) -> Result<ClassOffering, AppError> {
        let mut offering = self.get_offering(id).await?;

        let schedule_changed = req.schedule.is_some();
        let placement_changed =
            schedule_changed || req.teacher_id.is_some() || req.classroom_id.is_some();

        if let Some(teacher_id) = req.teacher_id {
            let teacher = repository::find_teacher_by_id(&self.db, &teacher_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("teacher {}", teacher_id)))?;
            if teacher.version_id != offering.version_id {
                return Err(AppError::Validation(format!(
                    "teacher {} belongs to version {}, not {}",
                    teacher.id, teacher.version_id, offering.version_id
                )));
            }
            offering.teacher_id = teacher_id;
        }
        if let Some(classroom_id) = req.classroom_id {
            repository::find_classroom_by_id(&self.db, &classroom_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("classroom {}", classroom_id)))?;
            offering.classroom_id = classroom_id;
        }
        if let Some(name) = req.name {
            offering.name = name;
        }
        if let Some(schedule) = req.schedule {
            validate_blocks(&schedule)?;
            offering.schedule = schedule;
        }
        if let Some(max_students) = req.max_students {
            if max_students < 1 {
                return Err(AppError::Validation(
                    "max_students must be at least 1".to_string(),
                ));
            }
            offering.max_students = max_students;
        }
        if let Some(status) = req.status {
            offering.status = status;
        }

        let existing =
            repository::fetch_offerings_by_version(&self.db, &offering.version_id).await?;

        if placement_changed {
            let conflicts = find_teacher_conflicts(
                &offering.schedule,
                &offering.teacher_id,
                &existing,
                Some(id),
            )?;
            if let Some(first) = conflicts.first() {
                return Err(AppError::ScheduleConflict(format!(
                    "teacher already teaches '{}' on {} {}-{} ({} overlap(s) total)",
                    first.offering_name,
                    first.day,
                    first.existing_start,
                    first.existing_end,
                    conflicts.len()
                )));
            }
            offering.color = self.pick_color(
                &offering.id,
                &offering.teacher_id,
                &offering.classroom_id,
                &offering.schedule,
                &existing,
                Some(id),
            )?;
        }

        offering.updated_at = Utc::now().to_rfc3339();
        repository::update_offering_row(&self.db, &offering).await?;
        Ok(offering)
    }

    /// Backfills colors for offerings that lack one, in bounded chunks. One
    /// item's failure falls back to the default color instead of aborting
    /// the batch.
    pub async fn migrate_missing_colors(
        &self,
        version_id: Option<&str>,
    ) -> Result<ColorMigrationStats, AppError> {
        let versions = VersionManager::new(self.db.clone());
        let version = versions.resolve_version(version_id).await?;

        let missing = repository::fetch_offerings_missing_color(&self.db, &version.id).await?;
        let all = repository::fetch_offerings_by_version(&self.db, &version.id).await?;

        let mut stats = ColorMigrationStats {
            migrated: 0,
            defaulted: 0,
        };

        for chunk in missing.chunks(COLOR_MIGRATION_CHUNK) {
            let now = Utc::now().to_rfc3339();
            let mut tx = self.db.begin().await?;
            for offering in chunk {
                let color = match self.pick_color(
                    &offering.id,
                    &offering.teacher_id,
                    &offering.classroom_id,
                    &offering.schedule,
                    &all,
                    Some(&offering.id),
                ) {
                    Ok(color) => {
                        stats.migrated += 1;
                        color
                    }
                    Err(e) => {
                        warn!(
                            "color migration failed for offering {}: {}; using default",
                            offering.id, e
                        );
                        stats.defaulted += 1;
                        DEFAULT_COLOR.to_string()
                    }
                };
                repository::update_offering_color(&mut *tx, &offering.id, &color, &now).await?;
            }
            tx.commit()
                .await
                .map_err(|e| AppError::TransactionAbort(e.to_string()))?;
        }

        info!(
            "color migration for version {}: {} assigned, {} defaulted",
            version.id, stats.migrated, stats.defaulted
        );
        Ok(stats)
    }

    /// Colors of every other offering in the version whose schedule overlaps
    /// the given one, across all teachers, feed the clash check.
    fn pick_color(
        &self,
        offering_id: &str,
        teacher_id: &str,
        classroom_id: &str,
        schedule: &[ScheduleBlock],
        existing: &[ClassOffering],
        exclude_id: Option<&str>,
    ) -> Result<String, AppError> {
        let mut conflicting_colors = Vec::new();
        for other in existing {
            if exclude_id.is_some_and(|id| id == other.id) {
                continue;
            }
            if other.color.is_empty() {
                continue;
            }
            if schedules_overlap(schedule, &other.schedule)? {
                conflicting_colors.push(other.color.clone());
            }
        }
        Ok(assign_color(
            offering_id,
            teacher_id,
            classroom_id,
            schedule,
            &conflicting_colors,
        ))
    }

    /// Courses are shared and deduplicated by (name, subject, difficulty);
    /// creating an offering with a new course spec creates the course as a
    /// side effect. Returns the course and whether it still needs inserting.
    async fn resolve_course(&self, req: &NewOfferingRequest) -> Result<(Course, bool), AppError> {
        if let Some(course_id) = &req.course_id {
            let course = repository::find_course_by_id(&self.db, course_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("course {}", course_id)))?;
            return Ok((course, false));
        }
        let spec = req.course.as_ref().ok_or_else(|| {
            AppError::Validation("either course_id or course is required".to_string())
        })?;
        if let Some(existing) = repository::find_course_by_fields(
            &self.db,
            &spec.name,
            &spec.subject,
            &spec.difficulty,
        )
        .await?
        {
            return Ok((existing, false));
        }
        let now = Utc::now().to_rfc3339();
        Ok((
            Course {
                id: Uuid::new_v4().to_string(),
                name: spec.name.clone(),
                subject: spec.subject.clone(),
                difficulty: spec.difficulty.clone(),
                created_at: now.clone(),
                updated_at: now,
            },
            true,
        ))
    }
}
