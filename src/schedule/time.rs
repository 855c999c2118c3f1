use crate::error::AppError;
use crate::models::ScheduleBlock;

/// Parses a strict 24-hour "HH:MM" string into minutes since midnight.
/// Exactly five characters, zero-padded; anything else is a validation error.
pub fn parse_time(value: &str) -> Result<u16, AppError> {
    let bytes = value.as_bytes();
    let well_formed = bytes.len() == 5
        && bytes[2] == b':'
        && bytes[0].is_ascii_digit()
        && bytes[1].is_ascii_digit()
        && bytes[3].is_ascii_digit()
        && bytes[4].is_ascii_digit();
    if !well_formed {
        return Err(AppError::Validation(format!(
            "time '{}' is not in HH:MM format",
            value
        )));
    }

    let hours = (bytes[0] - b'0') as u16 * 10 + (bytes[1] - b'0') as u16;
    let minutes = (bytes[3] - b'0') as u16 * 10 + (bytes[4] - b'0') as u16;
    if hours > 23 || minutes > 59 {
        return Err(AppError::Validation(format!(
            "time '{}' is out of range",
            value
        )));
    }

    Ok(hours * 60 + minutes)
}

/// Validates every block of a proposed schedule: time format and start < end.
/// Runs before any conflict check or persistence.
pub fn validate_blocks(blocks: &[ScheduleBlock]) -> Result<(), AppError> {
    for block in blocks {
        let start = parse_time(&block.start_time)?;
        let end = parse_time(&block.end_time)?;
        if start >= end {
            return Err(AppError::Validation(format!(
                "block on {} must start before it ends ({} >= {})",
                block.day_of_week.as_str(),
                block.start_time,
                block.end_time
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DayOfWeek;

    #[test]
    fn parses_valid_times() {
        assert_eq!(parse_time("00:00").unwrap(), 0);
        assert_eq!(parse_time("09:30").unwrap(), 570);
        assert_eq!(parse_time("23:59").unwrap(), 1439);
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in ["9:30", "09:3", "0930", "24:00", "12:60", "ab:cd", "", "09:30 "] {
            assert!(parse_time(bad).is_err(), "expected '{}' to be rejected", bad);
        }
    }

    #[test]
    fn rejects_inverted_blocks() {
        let block = ScheduleBlock {
            day_of_week: DayOfWeek::Monday,
            start_time: "10:00".to_string(),
            end_time: "09:00".to_string(),
        };
        assert!(validate_blocks(&[block]).is_err());
    }

    #[test]
    fn rejects_zero_length_blocks() {
        let block = ScheduleBlock {
            day_of_week: DayOfWeek::Monday,
            start_time: "10:00".to_string(),
            end_time: "10:00".to_string(),
        };
        assert!(validate_blocks(&[block]).is_err());
    }
}
