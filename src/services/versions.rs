use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{NewVersionRequest, TimetableVersion, UpdateVersionRequest};

/// Owns the single-active-version invariant. Activation is the only write
/// path for the `is_active` flag, and it runs as one transaction so two
/// concurrent activations cannot leave two versions active.
pub struct VersionManager {
    db: SqlitePool,
}

impl VersionManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Versions are always created inactive; activation is a separate step.
    pub async fn create_version(
        &self,
        req: NewVersionRequest,
    ) -> Result<TimetableVersion, AppError> {
        if req.name.trim().is_empty() {
            return Err(AppError::Validation("version name is required".to_string()));
        }
        let now = Utc::now().to_rfc3339();
        let version = TimetableVersion {
            id: Uuid::new_v4().to_string(),
            name: req.name,
            display_name: req.display_name,
            start_date: req.start_date,
            end_date: req.end_date,
            description: req.description,
            order: req.order,
            is_active: false,
            created_at: now.clone(),
            updated_at: now,
        };
        repository::insert_version(&self.db, &version).await?;
        info!("created version {} ({})", version.name, version.id);
        Ok(version)
    }

    pub async fn list_versions(&self) -> Result<Vec<TimetableVersion>, AppError> {
        repository::fetch_versions(&self.db).await
    }

    pub async fn get_version(&self, id: &str) -> Result<TimetableVersion, AppError> {
        repository::find_version_by_id(&self.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("version {}", id)))
    }

    /// The unique active version. Callers that default to it must fail fast
    /// when none exists instead of guessing.
    pub async fn get_active_version(&self) -> Result<TimetableVersion, AppError> {
        repository::fetch_active_version(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("active version".to_string()))
    }

    /// Resolves an optional version id: the given version when present,
    /// otherwise the active one.
    pub async fn resolve_version(
        &self,
        version_id: Option<&str>,
    ) -> Result<TimetableVersion, AppError> {
        match version_id {
            Some(id) => self.get_version(id).await,
            None => self.get_active_version().await,
        }
    }

    /// Deactivates every version and activates only the target, as one
    /// indivisible unit. Reads the full version set implicitly via the
    /// blanket deactivate; fine while version counts stay small.
    pub async fn activate_version(&self, id: &str) -> Result<TimetableVersion, AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.db.begin().await?;

        let target = repository::find_version_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("version {}", id)))?;

        repository::deactivate_all_versions(&mut *tx, &now).await?;
        repository::mark_version_active(&mut *tx, id, &now).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::TransactionAbort(e.to_string()))?;

        info!("activated version {} ({})", target.name, target.id);
        Ok(TimetableVersion {
            is_active: true,
            updated_at: now,
            ..target
        })
    }

    /// Metadata patch; never touches the active flag.
    pub async fn update_version(
        &self,
        id: &str,
        req: UpdateVersionRequest,
    ) -> Result<TimetableVersion, AppError> {
        let mut current = self.get_version(id).await?;
        if let Some(name) = req.name {
            current.name = name;
        }
        if let Some(display_name) = req.display_name {
            current.display_name = display_name;
        }
        if let Some(start_date) = req.start_date {
            current.start_date = start_date;
        }
        if let Some(end_date) = req.end_date {
            current.end_date = end_date;
        }
        if let Some(description) = req.description {
            current.description = description;
        }
        if let Some(order) = req.order {
            current.order = order;
        }
        current.updated_at = Utc::now().to_rfc3339();
        repository::update_version_row(&self.db, &current).await?;
        Ok(current)
    }

    /// Deleting the active version is rejected unconditionally; there is no
    /// automatic failover to another version.
    pub async fn delete_version(&self, id: &str) -> Result<(), AppError> {
        let version = self.get_version(id).await?;
        if version.is_active {
            return Err(AppError::Conflict(format!(
                "version {} is active and cannot be deleted",
                id
            )));
        }
        repository::delete_version_row(&self.db, id).await?;
        info!("deleted version {} ({})", version.name, version.id);
        Ok(())
    }
}
