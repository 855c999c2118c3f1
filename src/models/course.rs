use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Courses are shared across versions and deduplicated on create
/// by (name, subject, difficulty).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub subject: String,
    pub difficulty: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourseRequest {
    pub name: String,
    pub subject: String,
    pub difficulty: String,
}
