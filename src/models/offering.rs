use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

/// One weekly recurring block. Times are strict "HH:MM", 24-hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleBlock {
    pub day_of_week: DayOfWeek,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferingStatus {
    Active,
    Inactive,
    Completed,
}

impl OfferingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferingStatus::Active => "active",
            OfferingStatus::Inactive => "inactive",
            OfferingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(OfferingStatus::Active),
            "inactive" => Some(OfferingStatus::Inactive),
            "completed" => Some(OfferingStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassOffering {
    pub id: String,
    pub version_id: String,
    pub course_id: String,
    pub teacher_id: String,
    pub classroom_id: String,
    pub name: String,
    pub schedule: Vec<ScheduleBlock>,
    pub max_students: i64,
    pub current_students: i64,
    pub color: String,
    pub status: OfferingStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Raw row shape; `schedule` is a JSON text column, `status` a checked TEXT.
#[derive(Debug, FromRow)]
pub struct ClassOfferingRow {
    pub id: String,
    pub version_id: String,
    pub course_id: String,
    pub teacher_id: String,
    pub classroom_id: String,
    pub name: String,
    pub schedule: String,
    pub max_students: i64,
    pub current_students: i64,
    pub color: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<ClassOfferingRow> for ClassOffering {
    type Error = serde_json::Error;

    fn try_from(row: ClassOfferingRow) -> Result<Self, Self::Error> {
        let status = OfferingStatus::parse(&row.status).unwrap_or(OfferingStatus::Active);
        Ok(ClassOffering {
            id: row.id,
            version_id: row.version_id,
            course_id: row.course_id,
            teacher_id: row.teacher_id,
            classroom_id: row.classroom_id,
            name: row.name,
            schedule: serde_json::from_str(&row.schedule)?,
            max_students: row.max_students,
            current_students: row.current_students,
            color: row.color,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOfferingRequest {
    /// Defaults to the active version when omitted.
    pub version_id: Option<String>,
    /// Either an existing course id, or a new course spec (dedup on create).
    pub course_id: Option<String>,
    pub course: Option<super::NewCourseRequest>,
    pub teacher_id: String,
    pub classroom_id: String,
    pub name: String,
    pub schedule: Vec<ScheduleBlock>,
    pub max_students: i64,
    #[serde(default = "default_status")]
    pub status: OfferingStatus,
}

fn default_status() -> OfferingStatus {
    OfferingStatus::Active
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOfferingRequest {
    pub teacher_id: Option<String>,
    pub classroom_id: Option<String>,
    pub name: Option<String>,
    pub schedule: Option<Vec<ScheduleBlock>>,
    pub max_students: Option<i64>,
    pub status: Option<OfferingStatus>,
}
