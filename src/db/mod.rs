//! Data access over the shared store.
//!
//! Two store limits shape every multi-document operation and are enforced by
//! the chunk helpers here: at most [`WRITE_BATCH_LIMIT`] writes per committed
//! batch and at most [`ID_LOOKUP_LIMIT`] ids per fetch-by-id-list query.

pub mod repository;

/// Per-transaction write ceiling for bulk operations (clone, bulk-init).
pub const WRITE_BATCH_LIMIT: usize = 500;

/// Maximum ids per IN-clause lookup.
pub const ID_LOOKUP_LIMIT: usize = 10;

/// Chunk size for the color backfill migration.
pub const COLOR_MIGRATION_CHUNK: usize = 50;

/// Builds the `?, ?, ...` placeholder list for an IN clause.
pub(crate) fn placeholders(count: usize) -> String {
    let mut out = String::with_capacity(count * 3);
    for i in 0..count {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('?');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::placeholders;

    #[test]
    fn placeholder_lists() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
        assert_eq!(placeholders(0), "");
    }
}
