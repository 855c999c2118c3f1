use crate::error::AppError;
use crate::models::{ClassOffering, OfferingStatus, ScheduleBlock};

use super::time::parse_time;

/// A single detected overlap between a proposed block and an existing one.
#[derive(Debug, Clone)]
pub struct Conflict {
    pub offering_id: String,
    pub offering_name: String,
    pub day: &'static str,
    pub existing_start: String,
    pub existing_end: String,
}

/// Half-open interval overlap on the same day:
/// `proposed.start < existing.end && existing.start < proposed.end`.
/// Blocks that merely touch (10:00 end against 10:00 start) do not overlap.
pub fn blocks_overlap(a: &ScheduleBlock, b: &ScheduleBlock) -> Result<bool, AppError> {
    if a.day_of_week != b.day_of_week {
        return Ok(false);
    }
    let a_start = parse_time(&a.start_time)?;
    let a_end = parse_time(&a.end_time)?;
    let b_start = parse_time(&b.start_time)?;
    let b_end = parse_time(&b.end_time)?;
    Ok(a_start < b_end && b_start < a_end)
}

/// True when any block of `a` overlaps any block of `b`.
pub fn schedules_overlap(a: &[ScheduleBlock], b: &[ScheduleBlock]) -> Result<bool, AppError> {
    for block_a in a {
        for block_b in b {
            if blocks_overlap(block_a, block_b)? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Teacher-side conflict scan: collects every overlap between the proposed
/// blocks and active offerings taught by the same teacher in the same
/// version. `exclude_offering_id` skips the offering being edited in place.
///
/// Only the teacher axis is checked. Two different teachers booked into the
/// same classroom at the same time pass this scan; classroom double-booking
/// is left to operators on purpose.
pub fn find_teacher_conflicts(
    proposed: &[ScheduleBlock],
    teacher_id: &str,
    existing: &[ClassOffering],
    exclude_offering_id: Option<&str>,
) -> Result<Vec<Conflict>, AppError> {
    let mut conflicts = Vec::new();

    for offering in existing {
        if offering.teacher_id != teacher_id {
            continue;
        }
        if offering.status != OfferingStatus::Active {
            continue;
        }
        if exclude_offering_id.is_some_and(|id| id == offering.id) {
            continue;
        }

        for block in proposed {
            for existing_block in &offering.schedule {
                if blocks_overlap(block, existing_block)? {
                    conflicts.push(Conflict {
                        offering_id: offering.id.clone(),
                        offering_name: offering.name.clone(),
                        day: existing_block.day_of_week.as_str(),
                        existing_start: existing_block.start_time.clone(),
                        existing_end: existing_block.end_time.clone(),
                    });
                }
            }
        }
    }

    Ok(conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DayOfWeek;

    fn block(day: DayOfWeek, start: &str, end: &str) -> ScheduleBlock {
        ScheduleBlock {
            day_of_week: day,
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    fn offering(id: &str, teacher_id: &str, blocks: Vec<ScheduleBlock>) -> ClassOffering {
        ClassOffering {
            id: id.to_string(),
            version_id: "v1".to_string(),
            course_id: "c1".to_string(),
            teacher_id: teacher_id.to_string(),
            classroom_id: "r1".to_string(),
            name: format!("offering-{}", id),
            schedule: blocks,
            max_students: 10,
            current_students: 0,
            color: "#F44336".to_string(),
            status: OfferingStatus::Active,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn overlapping_blocks_conflict() {
        let existing = vec![offering(
            "a",
            "t1",
            vec![block(DayOfWeek::Monday, "09:00", "10:00")],
        )];
        let proposed = vec![block(DayOfWeek::Monday, "09:30", "10:30")];
        let conflicts = find_teacher_conflicts(&proposed, "t1", &existing, None).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].offering_id, "a");
    }

    #[test]
    fn touching_blocks_do_not_conflict() {
        let existing = vec![offering(
            "a",
            "t1",
            vec![block(DayOfWeek::Monday, "09:00", "10:00")],
        )];
        let proposed = vec![block(DayOfWeek::Monday, "10:00", "11:00")];
        let conflicts = find_teacher_conflicts(&proposed, "t1", &existing, None).unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn different_days_do_not_conflict() {
        let existing = vec![offering(
            "a",
            "t1",
            vec![block(DayOfWeek::Monday, "09:00", "10:00")],
        )];
        let proposed = vec![block(DayOfWeek::Tuesday, "09:00", "10:00")];
        let conflicts = find_teacher_conflicts(&proposed, "t1", &existing, None).unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn different_teachers_do_not_conflict() {
        // Classroom double-booking across teachers is not prevented.
        let existing = vec![offering(
            "a",
            "t2",
            vec![block(DayOfWeek::Monday, "09:00", "10:00")],
        )];
        let proposed = vec![block(DayOfWeek::Monday, "09:00", "10:00")];
        let conflicts = find_teacher_conflicts(&proposed, "t1", &existing, None).unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn excluded_offering_is_skipped() {
        let existing = vec![offering(
            "a",
            "t1",
            vec![block(DayOfWeek::Monday, "09:00", "10:00")],
        )];
        let proposed = vec![block(DayOfWeek::Monday, "09:00", "10:00")];
        let conflicts =
            find_teacher_conflicts(&proposed, "t1", &existing, Some("a")).unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn inactive_offerings_are_ignored() {
        let mut existing = offering(
            "a",
            "t1",
            vec![block(DayOfWeek::Monday, "09:00", "10:00")],
        );
        existing.status = OfferingStatus::Inactive;
        let proposed = vec![block(DayOfWeek::Monday, "09:00", "10:00")];
        let conflicts =
            find_teacher_conflicts(&proposed, "t1", &[existing], None).unwrap();
        assert!(conflicts.is_empty());
    }
}
