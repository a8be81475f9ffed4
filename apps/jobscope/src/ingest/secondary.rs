//! Secondary Kaggle dumps with unpredictable headers ("Job Title (EN)",
//! "Key Skills", ...). Columns are matched by substring; there is no native id
//! and no URL, so these rows always dedupe on the composite key.

use crate::ingest::columns::{ColumnResolver, LogicalField, MatchMode};
use crate::ingest::SourceCleaner;
use crate::models::Source;

#[derive(Debug, Clone, Copy, Default)]
pub struct SecondaryCleaner;

impl SourceCleaner for SecondaryCleaner {
    fn source(&self) -> Source {
        Source::KaggleSecondary
    }

    fn resolver(&self) -> ColumnResolver {
        ColumnResolver::new(MatchMode::Contains)
            .field(LogicalField::Title, &["Job Title", "title", "role"])
            .field(LogicalField::Company, &["Company Name", "company"])
            .field(LogicalField::Location, &["Location", "city", "country"])
            .field(
                LogicalField::Description,
                &["Job Description", "description", "summary"],
            )
            .field(LogicalField::Skills, &["Skills", "Key Skills", "Tags"])
            .field(LogicalField::SalaryText, &["Salary", "Pay"])
            .field(LogicalField::PublishedAt, &["Date", "Posted"])
    }
}
