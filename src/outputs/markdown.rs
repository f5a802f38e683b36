//! Markdown rendering of a run's [`Report`].

use super::Report;
use crate::models::VALUE_NOT_APPLICABLE;
use crate::normalize::Weekday;
use itertools::Itertools;
use std::fmt::Write;

/// Table columns shown in the report; the brand color is left out.
const DETAIL_COLUMNS: [&str; 10] = [
    "Site",
    "Company",
    "Promo Name",
    "Description",
    "Category",
    "Partner Merchant",
    "Type",
    "Value",
    "Valid Days",
    "Restrictions",
];

/// Escape a value for use inside a Markdown table cell.
fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

fn value_cell(value: f64) -> String {
    if value == VALUE_NOT_APPLICABLE {
        "n/a".to_string()
    } else {
        value.to_string()
    }
}

/// Render the promotion table, the category summary, and the weekday pivot.
pub fn report_to_markdown(report: &Report<'_>) -> String {
    let mut md = String::new();

    writeln!(md, "# Promotions\n").unwrap();
    writeln!(md, "_Generated {}_\n", report.generated_at).unwrap();
    writeln!(md, "Sites: {}\n", report.urls.iter().join(", ")).unwrap();

    writeln!(md, "## Promotion details\n").unwrap();
    if report.table.is_empty() {
        writeln!(md, "No promotions were found.\n").unwrap();
    } else {
        writeln!(md, "| {} |", DETAIL_COLUMNS.iter().join(" | ")).unwrap();
        writeln!(md, "|{}", "---|".repeat(DETAIL_COLUMNS.len())).unwrap();
        for row in &report.table {
            let cells = [
                cell(row.site),
                cell(row.company),
                cell(row.promo_name),
                cell(row.description),
                cell(row.category),
                cell(row.partner_merchant),
                row.discount_type.to_string(),
                value_cell(row.value),
                cell(row.valid_days),
                cell(row.restrictions),
            ];
            writeln!(md, "| {} |", cells.iter().join(" | ")).unwrap();
        }
        writeln!(md).unwrap();
    }

    writeln!(md, "## Promotions by category\n").unwrap();
    writeln!(md, "| Company | Category | Count | Partners |").unwrap();
    writeln!(md, "|---|---|---|---|").unwrap();
    for s in &report.summary {
        let partners = s.partners.iter().filter(|p| !p.is_empty()).map(|p| cell(p)).join(", ");
        writeln!(md, "| {} | {} | {} | {} |", cell(&s.company), cell(&s.category), s.count, partners).unwrap();
    }
    writeln!(md).unwrap();

    writeln!(md, "## Promotions by day\n").unwrap();
    writeln!(
        md,
        "| Category | Company | Promo Name | Partner Merchant | {} |",
        Weekday::ALL.iter().map(Weekday::token).join(" | ")
    )
    .unwrap();
    writeln!(md, "|{}", "---|".repeat(4 + Weekday::ALL.len())).unwrap();
    for row in &report.calendar {
        writeln!(
            md,
            "| {} | {} | {} | {} | {} |",
            cell(&row.category),
            cell(&row.company),
            cell(&row.promo_name),
            cell(&row.partner_merchant),
            row.days.iter().join(" | ")
        )
        .unwrap();
    }

    md
}
