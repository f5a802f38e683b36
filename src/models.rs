//! Data models for extracted promotions and the consolidated batch.
//!
//! - [`SiteExtraction`]: the decoded per-site LLM response, before validation
//! - [`PromotionRecord`]: one accepted offer with its site provenance
//! - [`ExtractionBatch`]: every record of a run, in input URL order
//!
//! The per-site response keeps promotions as positional string lists, exactly
//! as the LLM returns them. Only lists that pass the eight-field gate in
//! [`crate::extract`] are turned into [`PromotionRecord`]s.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of positional fields the LLM must produce per promotion.
pub const PROMOTION_FIELDS: usize = 8;

/// Sentinel for "discount value not applicable".
pub const VALUE_NOT_APPLICABLE: f64 = -1.0;

/// The per-site structured response requested from the LLM.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteExtraction {
    pub company_name: String,
    /// Representative brand color, e.g. `"rgb(255, 165, 0)"`.
    pub company_color: String,
    /// One positional list per detected promotion.
    pub promotions: Vec<Vec<String>>,
}

/// How a promotion's discount is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Money,
}

impl DiscountType {
    /// Interpret the free-text type label the LLM produced.
    ///
    /// Accepts the English labels and the Spanish ones (`porcentaje`,
    /// `dinero`). Anything else falls back on the value text: a `%` there
    /// means a percentage, otherwise a money discount.
    pub fn from_label(label: &str, value_text: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "percentage" | "percent" | "porcentaje" | "porcentual" | "%" => Self::Percentage,
            "money" | "amount" | "dinero" | "monto" | "monetario" => Self::Money,
            _ if value_text.contains('%') => Self::Percentage,
            _ => Self::Money,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Money => "money",
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-?\d{1,3}(?:\.\d{3})+(?:,\d+)?|-?\d+(?:[.,]\d+)?").expect("valid number regex")
});

/// Read the first number out of a free-text discount value.
///
/// `"15%"` → 15, `"$5.000"` → 5000, `"12,5"` → 12.5. Text without any
/// number (e.g. `"N/A"`) maps to [`VALUE_NOT_APPLICABLE`].
pub fn parse_discount_value(text: &str) -> f64 {
    let Some(m) = NUMBER_RE.find(text) else {
        return VALUE_NOT_APPLICABLE;
    };
    let raw = m.as_str();
    let normalized = if is_grouped(raw) {
        raw.replace('.', "").replace(',', ".")
    } else {
        raw.replace(',', ".")
    };
    normalized.parse().unwrap_or(VALUE_NOT_APPLICABLE)
}

/// `true` for numbers written with `.` as thousands separator (`5.000`).
fn is_grouped(raw: &str) -> bool {
    let int_part = raw.split(',').next().unwrap_or(raw);
    let mut groups = int_part.trim_start_matches('-').split('.');
    let head_ok = groups.next().is_some_and(|g| (1..=3).contains(&g.len()));
    let rest: Vec<&str> = groups.collect();
    head_ok && !rest.is_empty() && rest.iter().all(|g| g.len() == 3)
}

/// One detected offer, with the three provenance fields prepended.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PromotionRecord {
    pub site_url: String,
    pub company_name: String,
    pub company_color: String,
    pub promo_name: String,
    pub description: String,
    pub category: String,
    pub partner_merchant: String,
    pub discount_type: DiscountType,
    /// Discount amount; [`VALUE_NOT_APPLICABLE`] when not applicable.
    pub discount_value: f64,
    /// Comma-joined day tokens, canonicalized after aggregation.
    pub valid_days: String,
    pub restrictions: String,
}

impl PromotionRecord {
    /// Build a record from one positional promotion list.
    ///
    /// Returns `None` unless `fields` has exactly [`PROMOTION_FIELDS`]
    /// entries. Callers are expected to have gated the whole site already.
    pub fn from_fields(
        site_url: &str,
        company_name: &str,
        company_color: &str,
        fields: &[String],
    ) -> Option<Self> {
        let [name, description, category, partner, kind, value, days, restrictions] = fields
        else {
            return None;
        };
        Some(Self {
            site_url: site_url.to_string(),
            company_name: company_name.to_string(),
            company_color: company_color.to_string(),
            promo_name: name.trim().to_string(),
            description: description.trim().to_string(),
            category: category.trim().to_string(),
            partner_merchant: partner.trim().to_string(),
            discount_type: DiscountType::from_label(kind, value),
            discount_value: parse_discount_value(value),
            valid_days: days.trim().to_string(),
            restrictions: restrictions.trim().to_string(),
        })
    }
}

/// All promotion records of one run, in input URL order.
///
/// Built append-only by [`crate::pipeline`], then rewritten once by category
/// normalization and day canonicalization. Callers own the finished value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionBatch {
    pub records: Vec<PromotionRecord>,
}

impl ExtractionBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append one site's contribution.
    pub fn extend_site(&mut self, records: Vec<PromotionRecord>) {
        self.records.extend(records);
    }

    /// Rows paired with a fresh 0-based ordinal index.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &PromotionRecord)> {
        self.records.iter().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(values: [&str; 8]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_record_from_eight_fields() {
        let record = PromotionRecord::from_fields(
            "http://a.example",
            "Burger Co",
            "rgb(255, 0, 0)",
            &fields([
                "Burger Tuesday",
                "10% discount on burgers",
                "food",
                "",
                "percentage",
                "10",
                "martes",
                "dine-in only",
            ]),
        )
        .unwrap();

        assert_eq!(record.site_url, "http://a.example");
        assert_eq!(record.company_name, "Burger Co");
        assert_eq!(record.discount_type, DiscountType::Percentage);
        assert_eq!(record.discount_value, 10.0);
        assert_eq!(record.valid_days, "martes");
    }

    #[test]
    fn test_record_rejects_wrong_arity() {
        let short: Vec<String> = vec!["only".into(), "two".into()];
        assert!(PromotionRecord::from_fields("u", "c", "rgb(0, 0, 0)", &short).is_none());
    }

    #[test]
    fn test_discount_type_labels() {
        assert_eq!(DiscountType::from_label("Porcentaje", "20"), DiscountType::Percentage);
        assert_eq!(DiscountType::from_label("dinero", "5000"), DiscountType::Money);
        assert_eq!(DiscountType::from_label("cashback", "15%"), DiscountType::Percentage);
        assert_eq!(DiscountType::from_label("cashback", "$15"), DiscountType::Money);
    }

    #[test]
    fn test_parse_discount_value() {
        assert_eq!(parse_discount_value("15%"), 15.0);
        assert_eq!(parse_discount_value("hasta 30%"), 30.0);
        assert_eq!(parse_discount_value("$5.000"), 5000.0);
        assert_eq!(parse_discount_value("12,5"), 12.5);
        assert_eq!(parse_discount_value("12.5"), 12.5);
        assert_eq!(parse_discount_value("-1"), VALUE_NOT_APPLICABLE);
        assert_eq!(parse_discount_value("N/A"), VALUE_NOT_APPLICABLE);
    }

    #[test]
    fn test_site_extraction_deserialization() {
        let json = r#"{
            "company_name": "Acme",
            "company_color": "rgb(1, 2, 3)",
            "promotions": [["a","b","c","d","e","f","g","h"]]
        }"#;
        let parsed: SiteExtraction = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.company_name, "Acme");
        assert_eq!(parsed.promotions.len(), 1);
        assert_eq!(parsed.promotions[0].len(), PROMOTION_FIELDS);
    }

    #[test]
    fn test_batch_rows_are_indexed_from_zero() {
        let record = PromotionRecord::from_fields(
            "u",
            "c",
            "rgb(0, 0, 0)",
            &fields(["n", "d", "cat", "", "money", "100", "lunes", ""]),
        )
        .unwrap();
        let mut batch = ExtractionBatch::default();
        batch.extend_site(vec![record.clone(), record]);
        let indexes: Vec<usize> = batch.rows().map(|(i, _)| i).collect();
        assert_eq!(indexes, vec![0, 1]);
    }
}
