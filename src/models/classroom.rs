use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Classroom {
    pub id: String,
    pub name: String,
    pub capacity: Option<i64>,
    pub location: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClassroomRequest {
    pub name: String,
    pub capacity: Option<i64>,
    pub location: Option<String>,
}
