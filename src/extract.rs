//! Per-site promotion extraction.
//!
//! One LLM call per site: the page text goes in, a [`SiteExtraction`] comes
//! back. The reply is accepted all-or-nothing: if any promotion list does
//! not have exactly eight fields (or there are no promotions at all), the
//! whole site contributes zero records. Partial sites are never kept.

use crate::api::{AskAsync, StructuredPrompt, ask_structured};
use crate::error::LlmError;
use crate::models::{PROMOTION_FIELDS, PromotionRecord, SiteExtraction};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

const SYSTEM_INSTRUCTION: &str = r#"You are an expert at reading the text content of company websites and identifying every promotion or offer on them (words such as "descuento", "dcto", "discount" or the "%" sign usually mark promotional text).
Given the text of a company's website, identify the company name and the color that best represents the company according to its logo, in RGB format (example: "rgb(255, 165, 0)").
In addition, for every promotion detected in the text produce a list of exactly 8 elements, in this order:
1. Promotion name
2. Promotion description
3. Promotion category (financial, food, events, products, etc.)
4. Partner merchant (if the promotion is redeemed at another company or chain, name it; otherwise leave empty)
5. Promotion type: "percentage" for a percentage discount or "money" for a monetary discount
6. Promotion value (the discount amount or percentage; if not applicable write -1)
7. Valid days (for example "lunes, miercoles, jueves"; if the promotion applies every day write all days separated by commas: "lunes,martes,miercoles,jueves,viernes,sabado,domingo"; for a range such as "de lunes a miercoles" write every day of the range: "lunes,martes,miercoles")
8. Restrictions (time limits, maximum amounts or other conditions)"#;

/// JSON schema of the per-site reply.
pub fn site_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "company_name": {"type": "string"},
            "company_color": {"type": "string"},
            "promotions": {
                "type": "array",
                "items": {"type": "array", "items": {"type": "string"}}
            }
        },
        "required": ["company_name", "company_color", "promotions"],
        "additionalProperties": false
    })
}

/// Build the extraction request for one site.
pub fn site_prompt(site_url: &str, page_text: &str) -> StructuredPrompt {
    StructuredPrompt {
        name: "promotions",
        system_instruction: SYSTEM_INSTRUCTION.to_string(),
        user_message: format!("The text content of the site {site_url} is the following: {page_text}"),
        response_schema: site_schema(),
    }
}

/// `true` only if there is at least one promotion and every promotion list
/// has exactly [`PROMOTION_FIELDS`] entries.
///
/// An empty list fails the gate: there is no well-defined minimum or maximum
/// length to compare, so the site is treated as having no usable promotions.
pub fn all_promotions_well_formed(promotions: &[Vec<String>]) -> bool {
    !promotions.is_empty() && promotions.iter().all(|p| p.len() == PROMOTION_FIELDS)
}

/// Turn a decoded site reply into records, applying the all-or-nothing gate.
pub fn records_from_extraction(site_url: &str, extraction: &SiteExtraction) -> Vec<PromotionRecord> {
    if !all_promotions_well_formed(&extraction.promotions) {
        let lengths: Vec<usize> = extraction.promotions.iter().map(Vec::len).collect();
        warn!(%site_url, ?lengths, "Promotion lists are not all eight fields; discarding site");
        return Vec::new();
    }
    extraction
        .promotions
        .iter()
        .filter_map(|fields| {
            PromotionRecord::from_fields(
                site_url,
                &extraction.company_name,
                &extraction.company_color,
                fields,
            )
        })
        .collect()
}

/// Extract every promotion from one site's text.
///
/// LLM failures (transport, API, undecodable reply) are returned as errors;
/// a reply that fails the eight-field gate yields `Ok(vec![])`.
#[instrument(level = "info", skip_all, fields(%site_url, text_bytes = page_text.len()))]
pub async fn extract_promotions<A: AskAsync>(
    api: &A,
    credential: &str,
    site_url: &str,
    page_text: &str,
) -> Result<Vec<PromotionRecord>, LlmError> {
    let extraction: SiteExtraction =
        ask_structured(api, credential, &site_prompt(site_url, page_text)).await?;
    let records = records_from_extraction(site_url, &extraction);
    info!(
        company = %extraction.company_name,
        detected = extraction.promotions.len(),
        accepted = records.len(),
        "Site extraction finished"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DiscountType;

    struct Scripted(String);

    impl AskAsync for Scripted {
        async fn ask(&self, _: &str, _: &StructuredPrompt) -> Result<String, LlmError> {
            Ok(self.0.clone())
        }
    }

    fn promo(len: usize) -> Vec<String> {
        let full = ["2x1", "Two for one", "food", "", "percentage", "50", "lunes", "none"];
        full.iter().cycle().take(len).map(|s| s.to_string()).collect()
    }

    fn extraction(promotions: Vec<Vec<String>>) -> SiteExtraction {
        SiteExtraction {
            company_name: "Acme".to_string(),
            company_color: "rgb(0, 128, 0)".to_string(),
            promotions,
        }
    }

    #[test]
    fn test_gate_accepts_all_eight() {
        assert!(all_promotions_well_formed(&[promo(8), promo(8)]));
    }

    #[test]
    fn test_gate_rejects_any_other_length() {
        assert!(!all_promotions_well_formed(&[promo(8), promo(7)]));
        assert!(!all_promotions_well_formed(&[promo(9)]));
        assert!(!all_promotions_well_formed(&[promo(0)]));
    }

    #[test]
    fn test_gate_rejects_empty_list() {
        assert!(!all_promotions_well_formed(&[]));
    }

    #[test]
    fn test_records_carry_provenance() {
        let records = records_from_extraction("http://a.example", &extraction(vec![promo(8), promo(8)]));
        assert_eq!(records.len(), 2);
        for r in &records {
            assert_eq!(r.site_url, "http://a.example");
            assert_eq!(r.company_name, "Acme");
            assert_eq!(r.company_color, "rgb(0, 128, 0)");
            assert_eq!(r.promo_name, "2x1");
            assert_eq!(r.discount_type, DiscountType::Percentage);
        }
    }

    #[test]
    fn test_one_bad_list_discards_whole_site() {
        let records = records_from_extraction("u", &extraction(vec![promo(8), promo(8), promo(6)]));
        assert!(records.is_empty());
    }

    #[test]
    fn test_site_prompt_embeds_url_and_text() {
        let prompt = site_prompt("http://a.example", "10% discount on burgers");
        assert!(prompt.user_message.contains("http://a.example"));
        assert!(prompt.user_message.contains("10% discount on burgers"));
        assert_eq!(prompt.response_schema["required"][2], "promotions");
    }

    #[tokio::test]
    async fn test_extract_promotions_end_to_end() {
        let reply = json!({
            "company_name": "Burger Co",
            "company_color": "rgb(255, 0, 0)",
            "promotions": [promo(8)]
        });
        let api = Scripted(reply.to_string());
        let records = extract_promotions(&api, "sk", "http://a.example", "text").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].company_name, "Burger Co");
    }

    #[tokio::test]
    async fn test_extract_promotions_empty_list_is_zero_records() {
        let reply = json!({"company_name": "X", "company_color": "rgb(0, 0, 0)", "promotions": []});
        let api = Scripted(reply.to_string());
        let records = extract_promotions(&api, "sk", "u", "text").await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_extract_promotions_malformed_reply_is_fatal() {
        let api = Scripted(r#"{"company_name": "X"}"#.to_string());
        let err = extract_promotions(&api, "sk", "u", "text").await.unwrap_err();
        assert!(matches!(err, LlmError::Parse { .. }));
    }
}
