//! Command-line interface definitions for promo_extract.
//!
//! The CLI stands in for an interactive front end: it takes the comma
//! separated URL list and the API credential, runs the pipeline, and writes
//! the resulting views to disk.

use clap::Parser;

/// Command-line arguments for promo_extract.
///
/// # Examples
///
/// ```sh
/// # Extract promotions from two sites
/// promo_extract -u "https://bank-a.example/promos, https://bank-b.example/beneficios" -j ./json
///
/// # Markdown report, only food promotions in the day view
/// promo_extract -u "$URLS" -j ./json -m ./markdown --category Food
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Comma-separated list of pages to extract promotions from
    #[arg(short, long)]
    pub urls: String,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Output directory for the JSON report
    #[arg(short, long)]
    pub json_output_dir: String,

    /// Output directory for the Markdown report
    #[arg(short, long)]
    pub markdown_output_dir: Option<String>,

    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Only show these categories in the day view (repeatable)
    #[arg(long = "category")]
    pub categories: Vec<String>,

    /// Only show these companies in the day view (repeatable)
    #[arg(long = "company")]
    pub companies: Vec<String>,
}

/// Split a comma-separated URL list into trimmed, non-empty URLs, in order.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
