// Canonical job table: merge, dedupe, persist.

pub mod merger;
pub mod quality;
pub mod snapshot;

pub use merger::run_merge_stage;
pub use snapshot::{read_snapshot, write_snapshot};
