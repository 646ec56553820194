//! Run statistics accumulated during translation and reported at teardown.

use std::fmt;

#[derive(Debug, Default)]
pub struct Stats {
    pub schemas: usize,
    pub tables: usize,
    pub rows: usize,
    pub lobs_materialized: usize,
    pub lobs_failed: usize,
    pub duplicate_tables: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} schema(s), {} table(s), {} row(s), {} lob(s) materialized, {} lob(s) failed, {} duplicate table(s) skipped",
            self.schemas, self.tables, self.rows, self.lobs_materialized, self.lobs_failed, self.duplicate_tables
        )
    }
}
