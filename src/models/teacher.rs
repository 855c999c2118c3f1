use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    pub id: String,
    pub version_id: String,
    pub name: String,
    pub subjects: Vec<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Raw row shape; `subjects` is a JSON text column.
#[derive(Debug, FromRow)]
pub struct TeacherRow {
    pub id: String,
    pub version_id: String,
    pub name: String,
    pub subjects: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<TeacherRow> for Teacher {
    type Error = serde_json::Error;

    fn try_from(row: TeacherRow) -> Result<Self, Self::Error> {
        Ok(Teacher {
            id: row.id,
            version_id: row.version_id,
            name: row.name,
            subjects: serde_json::from_str(&row.subjects)?,
            email: row.email,
            phone: row.phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTeacherRequest {
    /// Defaults to the active version when omitted.
    pub version_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub subjects: Vec<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}
