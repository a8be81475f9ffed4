pub mod job;

pub use job::{CanonicalJob, JobDraft, Source, CANONICAL_COLUMNS};
