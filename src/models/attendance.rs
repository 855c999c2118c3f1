use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Attendance lives in a peer service; this side only reads and deletes it,
/// keyed by offering and student. Everything else rides in `payload`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceRecord {
    pub id: String,
    pub class_offering_id: String,
    pub student_id: String,
    pub payload: String,
}
