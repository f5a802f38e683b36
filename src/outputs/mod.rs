//! Output views over a finished [`ExtractionBatch`].
//!
//! # Submodules
//!
//! - [`table`]: the flat promotion table, one row per record
//! - [`calendar`]: weekday pivot with category/company filtering
//! - [`summary`]: promotion counts per company and category
//! - [`json`]: writes a [`Report`] to a timestamped JSON file
//! - [`markdown`]: renders a [`Report`] as a Markdown document
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06_143000.json
//!
//! markdown_output_dir/
//! └── 2025-05-06_143000.md
//! ```

pub mod calendar;
pub mod json;
pub mod markdown;
pub mod summary;
pub mod table;

use crate::models::ExtractionBatch;
use calendar::{CalendarFilter, CalendarRow, day_pivot};
use chrono::{DateTime, Local};
use serde::Serialize;
use summary::{CategorySummary, category_summary};
use table::{TableRow, table_rows};

/// All views of one batch, as written to disk.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub generated_at: String,
    pub urls: &'a [String],
    pub table: Vec<TableRow<'a>>,
    pub calendar: Vec<CalendarRow>,
    pub summary: Vec<CategorySummary>,
}

impl<'a> Report<'a> {
    pub fn build(
        batch: &'a ExtractionBatch,
        urls: &'a [String],
        filter: &CalendarFilter,
        now: DateTime<Local>,
    ) -> Self {
        Self {
            generated_at: now.to_rfc3339(),
            urls,
            table: table_rows(batch),
            calendar: filter.apply(day_pivot(batch)),
            summary: category_summary(batch),
        }
    }
}

/// File stem shared by the JSON and Markdown outputs of one run.
pub fn file_stem(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d_%H%M%S").to_string()
}
