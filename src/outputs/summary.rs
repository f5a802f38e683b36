//! Promotions per company and category.

use crate::models::ExtractionBatch;
use serde::Serialize;
use std::collections::BTreeMap;

/// Promotion count for one (company, category) pair, with the partner
/// merchants involved, in batch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Count")]
    pub count: usize,
    #[serde(rename = "Partners")]
    pub partners: Vec<String>,
}

pub fn category_summary(batch: &ExtractionBatch) -> Vec<CategorySummary> {
    let mut groups: BTreeMap<(&str, &str), Vec<String>> = BTreeMap::new();
    for r in &batch.records {
        groups
            .entry((r.company_name.as_str(), r.category.as_str()))
            .or_default()
            .push(r.partner_merchant.clone());
    }
    groups
        .into_iter()
        .map(|((company, category), partners)| CategorySummary {
            company: company.to_string(),
            category: category.to_string(),
            count: partners.len(),
            partners,
        })
        .collect()
}
