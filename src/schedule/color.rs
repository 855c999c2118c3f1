//! Deterministic, conflict-aware color assignment for class offerings.
//!
//! Every offering gets a palette color derived from stable hashes of its id,
//! teacher, classroom and schedule, so identical inputs always produce the
//! same color. Offerings that overlap in time are pushed apart visually: a
//! candidate too close (RGB distance < 30) to an overlapping offering's
//! color is replaced by the first non-clashing unused palette entry.

use crate::models::ScheduleBlock;

/// Fallback when every palette entry clashes with a neighbor.
pub const DEFAULT_COLOR: &str = "#9E9E9E";

/// Minimum RGB Euclidean distance between time-overlapping offerings.
const CLASH_THRESHOLD: f64 = 30.0;

/// Fixed named palette. Entries are grouped into hue families of six; a
/// teacher hashes into one family so their offerings lean the same way.
pub const PALETTE: &[(&str, &str)] = &[
    ("Red 300", "#E57373"),
    ("Red 400", "#EF5350"),
    ("Red 500", "#F44336"),
    ("Red 600", "#E53935"),
    ("Red 700", "#D32F2F"),
    ("Red 800", "#C62828"),
    ("Pink 300", "#F06292"),
    ("Pink 400", "#EC407A"),
    ("Pink 500", "#E91E63"),
    ("Pink 600", "#D81B60"),
    ("Pink 700", "#C2185B"),
    ("Pink 800", "#AD1457"),
    ("Purple 300", "#BA68C8"),
    ("Purple 400", "#AB47BC"),
    ("Purple 500", "#9C27B0"),
    ("Purple 600", "#8E24AA"),
    ("Purple 700", "#7B1FA2"),
    ("Purple 800", "#6A1B9A"),
    ("Indigo 300", "#7986CB"),
    ("Indigo 400", "#5C6BC0"),
    ("Indigo 500", "#3F51B5"),
    ("Indigo 600", "#3949AB"),
    ("Indigo 700", "#303F9F"),
    ("Indigo 800", "#283593"),
    ("Blue 300", "#64B5F6"),
    ("Blue 400", "#42A5F5"),
    ("Blue 500", "#2196F3"),
    ("Blue 600", "#1E88E5"),
    ("Blue 700", "#1976D2"),
    ("Blue 800", "#1565C0"),
    ("Cyan 300", "#4DD0E1"),
    ("Cyan 400", "#26C6DA"),
    ("Cyan 500", "#00BCD4"),
    ("Cyan 600", "#00ACC1"),
    ("Cyan 700", "#0097A7"),
    ("Cyan 800", "#00838F"),
    ("Green 300", "#81C784"),
    ("Green 400", "#66BB6A"),
    ("Green 500", "#4CAF50"),
    ("Green 600", "#43A047"),
    ("Green 700", "#388E3C"),
    ("Green 800", "#2E7D32"),
    ("Lime 300", "#DCE775"),
    ("Lime 400", "#D4E157"),
    ("Lime 500", "#CDDC39"),
    ("Lime 600", "#C0CA33"),
    ("Lime 700", "#AFB42B"),
    ("Lime 800", "#9E9D24"),
    ("Orange 300", "#FFB74D"),
    ("Orange 400", "#FFA726"),
    ("Orange 500", "#FF9800"),
    ("Orange 600", "#FB8C00"),
    ("Orange 700", "#F57C00"),
    ("Orange 800", "#EF6C00"),
    ("Brown 300", "#A1887F"),
    ("Brown 400", "#8D6E63"),
    ("Brown 500", "#795548"),
    ("Brown 600", "#6D4C41"),
    ("Blue Grey 300", "#90A4AE"),
    ("Blue Grey 400", "#78909C"),
];

const FAMILY_SIZE: usize = 6;
const FAMILY_COUNT: usize = PALETTE.len() / FAMILY_SIZE;

// Index blend weights: offering id, teacher family, classroom, schedule times.
const WEIGHT_BASE: f64 = 0.4;
const WEIGHT_FAMILY: f64 = 0.3;
const WEIGHT_CLASSROOM: f64 = 0.2;
const WEIGHT_TIME: f64 = 0.1;

/// FNV-1a over the string bytes. Std hashers have unspecified keys across
/// builds; assignment must be stable across processes and releases.
fn stable_hash(value: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in value.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn family_index(teacher_id: &str) -> usize {
    let hash = stable_hash(teacher_id);
    let family = (hash as usize) % FAMILY_COUNT;
    let member = ((hash >> 32) as usize) % FAMILY_SIZE;
    family * FAMILY_SIZE + member
}

fn time_key(schedule: &[ScheduleBlock]) -> String {
    let mut key = String::new();
    for block in schedule {
        key.push_str(block.day_of_week.as_str());
        key.push_str(&block.start_time);
        key.push_str(&block.end_time);
    }
    key
}

/// Weighted, rounded, modulo-palette-size blend of the four hash indices.
fn blended_index(
    offering_id: &str,
    teacher_id: &str,
    classroom_id: &str,
    schedule: &[ScheduleBlock],
) -> usize {
    let n = PALETTE.len();
    let base = (stable_hash(offering_id) as usize) % n;
    let family = family_index(teacher_id);
    let classroom = (stable_hash(classroom_id) as usize) % n;
    let time = (stable_hash(&time_key(schedule)) as usize) % n;

    let blended = WEIGHT_BASE * base as f64
        + WEIGHT_FAMILY * family as f64
        + WEIGHT_CLASSROOM * classroom as f64
        + WEIGHT_TIME * time as f64;
    (blended.round() as usize) % n
}

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

fn rgb_distance(a: (u8, u8, u8), b: (u8, u8, u8)) -> f64 {
    let dr = f64::from(a.0) - f64::from(b.0);
    let dg = f64::from(a.1) - f64::from(b.1);
    let db = f64::from(a.2) - f64::from(b.2);
    (dr * dr + dg * dg + db * db).sqrt()
}

/// True when `candidate` sits too close to any of the given colors.
/// Unparseable neighbor colors are ignored rather than treated as clashes.
fn clashes_with(candidate: (u8, u8, u8), colors: &[String]) -> bool {
    colors
        .iter()
        .filter_map(|c| parse_hex(c))
        .any(|rgb| rgb_distance(candidate, rgb) < CLASH_THRESHOLD)
}

/// Picks the color for an offering. `conflicting_colors` holds the colors of
/// every offering in the same version whose schedule overlaps this one,
/// across all teachers. Deterministic for identical inputs; the fallback scan
/// depends on the order of `conflicting_colors` only through set membership,
/// so equal sets give equal answers.
pub fn assign_color(
    offering_id: &str,
    teacher_id: &str,
    classroom_id: &str,
    schedule: &[ScheduleBlock],
    conflicting_colors: &[String],
) -> String {
    let index = blended_index(offering_id, teacher_id, classroom_id, schedule);
    let candidate = PALETTE[index].1;

    let Some(candidate_rgb) = parse_hex(candidate) else {
        return DEFAULT_COLOR.to_string();
    };
    if !clashes_with(candidate_rgb, conflicting_colors) {
        return candidate.to_string();
    }

    // Rescan the unused palette subset for a non-clashing alternative.
    for (_, hex) in PALETTE {
        if conflicting_colors.iter().any(|c| c.eq_ignore_ascii_case(hex)) {
            continue;
        }
        let Some(rgb) = parse_hex(hex) else { continue };
        if !clashes_with(rgb, conflicting_colors) {
            return (*hex).to_string();
        }
    }

    DEFAULT_COLOR.to_string()
}
