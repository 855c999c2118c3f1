use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One student's timetable within one version. The offering relation is
/// materialized only as the id array, kept duplicate-free by every mutator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub id: String,
    pub student_id: String,
    pub version_id: String,
    pub class_offering_ids: Vec<String>,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

impl EnrollmentRecord {
    pub fn contains_offering(&self, offering_id: &str) -> bool {
        self.class_offering_ids.iter().any(|id| id == offering_id)
    }
}

/// Raw row shape; `class_offering_ids` is a JSON text column.
#[derive(Debug, FromRow)]
pub struct EnrollmentRecordRow {
    pub id: String,
    pub student_id: String,
    pub version_id: String,
    pub class_offering_ids: String,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<EnrollmentRecordRow> for EnrollmentRecord {
    type Error = serde_json::Error;

    fn try_from(row: EnrollmentRecordRow) -> Result<Self, Self::Error> {
        Ok(EnrollmentRecord {
            id: row.id,
            student_id: row.student_id,
            version_id: row.version_id,
            class_offering_ids: serde_json::from_str(&row.class_offering_ids)?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    pub student_id: String,
    /// Defaults to the offering's version when omitted.
    pub version_id: Option<String>,
}
