//! Day-of-week pivot of the batch.
//!
//! Each record's `valid_days` list is exploded into weekdays, then pivoted
//! to one row per (category, company, promotion, partner) with a 1/0 cell
//! per weekday. Rows are ordered by category, then company.

use crate::models::ExtractionBatch;
use crate::normalize::{Weekday, parse_days};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::BTreeMap;

/// One pivot row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarRow {
    pub category: String,
    pub company: String,
    pub promo_name: String,
    pub partner_merchant: String,
    /// Presence per weekday, Monday first.
    pub days: [u8; 7],
}

impl Serialize for CalendarRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_struct("CalendarRow", 4 + Weekday::ALL.len())?;
        row.serialize_field("Category", &self.category)?;
        row.serialize_field("Company", &self.company)?;
        row.serialize_field("Promo Name", &self.promo_name)?;
        row.serialize_field("Partner Merchant", &self.partner_merchant)?;
        for day in Weekday::ALL {
            row.serialize_field(day.token(), &self.days[day as usize])?;
        }
        row.end()
    }
}

/// Build the weekday pivot of `batch`.
pub fn day_pivot(batch: &ExtractionBatch) -> Vec<CalendarRow> {
    let mut groups: BTreeMap<(&str, &str, &str, &str), [u8; 7]> = BTreeMap::new();
    for r in &batch.records {
        let key = (
            r.category.as_str(),
            r.company_name.as_str(),
            r.promo_name.as_str(),
            r.partner_merchant.as_str(),
        );
        let days = groups.entry(key).or_insert([0; 7]);
        for day in parse_days(&r.valid_days) {
            days[day as usize] = 1;
        }
    }
    groups
        .into_iter()
        .map(|((category, company, promo_name, partner_merchant), days)| CalendarRow {
            category: category.to_string(),
            company: company.to_string(),
            promo_name: promo_name.to_string(),
            partner_merchant: partner_merchant.to_string(),
            days,
        })
        .collect()
}

/// Category / company filter over pivot rows. An empty list keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarFilter {
    pub categories: Vec<String>,
    pub companies: Vec<String>,
}

impl CalendarFilter {
    pub fn matches(&self, row: &CalendarRow) -> bool {
        (self.categories.is_empty() || self.categories.contains(&row.category))
            && (self.companies.is_empty() || self.companies.contains(&row.company))
    }

    pub fn apply(&self, rows: Vec<CalendarRow>) -> Vec<CalendarRow> {
        rows.into_iter().filter(|row| self.matches(row)).collect()
    }
}
