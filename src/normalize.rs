//! Batch-wide normalization passes.
//!
//! - Category normalization: one LLM call maps every record's free-text
//!   category to a shared canonical label. The reply must have exactly one
//!   label per record; anything else aborts the run.
//! - Day canonicalization: deterministic rewrite of `valid_days` that expands
//!   "todos los días" to the seven weekdays and strips accents, so weekday
//!   tokens are stable grouping keys.

use crate::api::{AskAsync, StructuredPrompt, ask_structured};
use crate::error::PipelineError;
use crate::models::PromotionRecord;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{info, instrument};

const CATEGORY_INSTRUCTION: &str = r#"You will be given a list of promotion categories. Return a list with exactly the same number of elements, in the same order, where each category is replaced by a standardized label. Categories that mean the same thing must share one label: if one element says "comida" and another "Alimentos", map both to a single category (for example "Comida")."#;

/// Full week as written after canonicalization.
pub const FULL_WEEK: &str = "lunes,martes,miercoles,jueves,viernes,sabado,domingo";

/// "Every day" in the source language, after accent stripping.
const EVERY_DAY_PHRASE: &str = "todos los dias";

#[derive(Debug, Deserialize)]
struct CategoryReply {
    category: Vec<String>,
}

/// JSON schema of the category normalization reply.
pub fn category_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "category": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["category"],
        "additionalProperties": false
    })
}

pub fn category_prompt(categories: &[String]) -> StructuredPrompt {
    StructuredPrompt {
        name: "category",
        system_instruction: CATEGORY_INSTRUCTION.to_string(),
        user_message: format!("The list of categories is the following: {categories:?}"),
        response_schema: category_schema(),
    }
}

/// Replace every record's category with the LLM's canonical label.
///
/// The replacement is positional. A reply with a different number of labels
/// than records is [`PipelineError::CategoryCountMismatch`] and leaves the
/// records untouched.
#[instrument(level = "info", skip_all, fields(records = records.len()))]
pub async fn normalize_categories<A: AskAsync>(
    api: &A,
    credential: &str,
    records: &mut [PromotionRecord],
) -> Result<(), PipelineError> {
    let categories: Vec<String> = records.iter().map(|r| r.category.clone()).collect();
    let reply: CategoryReply = ask_structured(api, credential, &category_prompt(&categories)).await?;

    if reply.category.len() != records.len() {
        return Err(PipelineError::CategoryCountMismatch {
            expected: records.len(),
            actual: reply.category.len(),
        });
    }

    for (record, label) in records.iter_mut().zip(reply.category) {
        record.category = label;
    }
    let distinct: BTreeSet<&str> = records.iter().map(|r| r.category.as_str()).collect();
    info!(distinct = distinct.len(), "Categories normalized");
    Ok(())
}

/// Strip accents from a day list, then expand "todos los dias".
///
/// Applying it twice gives the same result as applying it once.
pub fn canonicalize_days(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !is_combining_mark(*c))
        .map(strip_accent)
        .collect();
    stripped.replace(EVERY_DAY_PHRASE, FULL_WEEK)
}

/// Combining diacritics left over from decomposed (NFD) text.
fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
}

fn strip_accent(c: char) -> char {
    match c {
        'á' => 'a',
        'é' => 'e',
        'í' => 'i',
        'ó' => 'o',
        'ú' => 'u',
        'Á' => 'A',
        'É' => 'E',
        'Í' => 'I',
        'Ó' => 'O',
        'Ú' => 'U',
        other => other,
    }
}

/// Canonicalize `valid_days` on every record.
pub fn canonicalize_record_days(records: &mut [PromotionRecord]) {
    for record in records.iter_mut() {
        record.valid_days = canonicalize_days(&record.valid_days);
    }
}

/// Day of the week, ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Canonical (accent-free) token used in tables and pivots.
    pub fn token(&self) -> &'static str {
        match self {
            Weekday::Monday => "lunes",
            Weekday::Tuesday => "martes",
            Weekday::Wednesday => "miercoles",
            Weekday::Thursday => "jueves",
            Weekday::Friday => "viernes",
            Weekday::Saturday => "sabado",
            Weekday::Sunday => "domingo",
        }
    }

    /// Parse one day token; case- and accent-insensitive, English accepted.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = canonicalize_days(token.trim()).to_lowercase();
        let day = match token.as_str() {
            "lunes" | "monday" => Weekday::Monday,
            "martes" | "tuesday" => Weekday::Tuesday,
            "miercoles" | "wednesday" => Weekday::Wednesday,
            "jueves" | "thursday" => Weekday::Thursday,
            "viernes" | "friday" => Weekday::Friday,
            "sabado" | "saturday" => Weekday::Saturday,
            "domingo" | "sunday" => Weekday::Sunday,
            _ => return None,
        };
        Some(day)
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// The set of weekdays named in a comma-separated day list.
///
/// Tokens that are not weekday names are ignored.
pub fn parse_days(text: &str) -> BTreeSet<Weekday> {
    canonicalize_days(text)
        .split(',')
        .filter_map(Weekday::from_token)
        .collect()
}
