//! The flat promotion table handed to presentation layers.

use crate::models::{DiscountType, ExtractionBatch};
use serde::Serialize;

/// Column headers, in display order (after the row index).
pub const COLUMNS: [&str; 11] = [
    "Site",
    "Company",
    "Company Color",
    "Promo Name",
    "Description",
    "Category",
    "Partner Merchant",
    "Type",
    "Value",
    "Valid Days",
    "Restrictions",
];

/// One row of the external table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow<'a> {
    #[serde(rename = "index")]
    pub index: usize,
    #[serde(rename = "Site")]
    pub site: &'a str,
    #[serde(rename = "Company")]
    pub company: &'a str,
    #[serde(rename = "Company Color")]
    pub company_color: &'a str,
    #[serde(rename = "Promo Name")]
    pub promo_name: &'a str,
    #[serde(rename = "Description")]
    pub description: &'a str,
    #[serde(rename = "Category")]
    pub category: &'a str,
    #[serde(rename = "Partner Merchant")]
    pub partner_merchant: &'a str,
    #[serde(rename = "Type")]
    pub discount_type: DiscountType,
    #[serde(rename = "Value")]
    pub value: f64,
    #[serde(rename = "Valid Days")]
    pub valid_days: &'a str,
    #[serde(rename = "Restrictions")]
    pub restrictions: &'a str,
}

/// Rows of `batch`, indexed from zero in batch order.
pub fn table_rows(batch: &ExtractionBatch) -> Vec<TableRow<'_>> {
    batch
        .rows()
        .map(|(index, r)| TableRow {
            index,
            site: &r.site_url,
            company: &r.company_name,
            company_color: &r.company_color,
            promo_name: &r.promo_name,
            description: &r.description,
            category: &r.category,
            partner_merchant: &r.partner_merchant,
            discount_type: r.discount_type,
            value: r.discount_value,
            valid_days: &r.valid_days,
            restrictions: &r.restrictions,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PromotionRecord;

    #[test]
    fn test_table_row_uses_display_column_names() {
        let fields: Vec<String> = ["Promo", "Desc", "Food", "Cinema", "money", "2000", "lunes", "none"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let record = PromotionRecord::from_fields("http://a.example", "Acme", "rgb(0, 0, 0)", &fields).unwrap();
        let batch = ExtractionBatch { records: vec![record] };

        let rows = table_rows(&batch);
        let json = serde_json::to_value(&rows[0]).unwrap();
        for column in COLUMNS {
            assert!(json.get(column).is_some(), "missing column {column}");
        }
        assert_eq!(json["index"], 0);
        assert_eq!(json["Type"], "money");
        assert_eq!(json["Value"], 2000.0);
        assert_eq!(json["Partner Merchant"], "Cinema");
    }
}
