use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TimetableVersion {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
    #[serde(rename = "order")]
    #[sqlx(rename = "sort_order")]
    pub order: i64,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVersionRequest {
    pub name: String,
    pub display_name: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "order", default)]
    pub order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateVersionRequest {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "order")]
    pub order: Option<i64>,
}
