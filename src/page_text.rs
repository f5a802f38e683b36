//! Page fetching and HTML-to-text reduction.
//!
//! A company page is reduced to the text of its headings, paragraphs and
//! list items, in document order. Anything inside `script`, `style`,
//! `button`, `nav`, `footer`, `form` or `aside` is dropped, even when it is
//! nested inside a content element.
//!
//! Fetching soft-fails: a connection error, timeout, or non-2xx status
//! yields an empty string so one bad URL never aborts a batch.

use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Elements whose text never reaches the output.
const NOISE_TAGS: [&str; 7] = ["script", "style", "button", "nav", "footer", "form", "aside"];

static CONTENT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6, p, li").expect("valid content selector")
});

/// Anything that can turn a URL into page text.
// Awaited in place like `AskAsync`; no `Send` bound.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    /// Text of the page at `url`, or `""` if it could not be fetched.
    async fn page_text(&self, url: &str) -> String;
}

/// HTTP implementation of [`PageSource`].
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(timeout_secs: u64, user_agent: &str) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_html(&self, url: &str) -> reqwest::Result<String> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

impl PageSource for PageFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn page_text(&self, url: &str) -> String {
        match self.fetch_html(url).await {
            Ok(html) => {
                let text = html_to_text(&html);
                info!(bytes = text.len(), "Extracted page text");
                text
            }
            Err(e) => {
                warn!(error = %e, "Page fetch failed; skipping site");
                String::new()
            }
        }
    }
}

/// Reduce an HTML document to its relevant text.
///
/// Headings are wrapped in newlines; body elements are not. Empty elements
/// are skipped, fragments are joined with `\n`, and the result is trimmed.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut fragments = Vec::new();

    for element in document.select(&CONTENT_SELECTOR) {
        if has_noise_ancestor(&element) {
            continue;
        }
        let content = element_text(&element);
        if content.is_empty() {
            continue;
        }
        if is_heading(element.value().name()) {
            fragments.push(format!("\n{content}\n"));
        } else {
            fragments.push(content);
        }
    }

    fragments.join("\n").trim().to_string()
}

fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

fn is_noise(element: &ElementRef) -> bool {
    NOISE_TAGS.contains(&element.value().name())
}

fn has_noise_ancestor(element: &ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| is_noise(&ancestor))
}

/// Text of `element`, skipping text under nested noise elements, with
/// whitespace runs collapsed to single spaces.
fn element_text(element: &ElementRef) -> String {
    let mut raw = String::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let inside_noise = node
            .ancestors()
            .take_while(|a| a.id() != element.id())
            .filter_map(ElementRef::wrap)
            .any(|a| is_noise(&a));
        if !inside_noise {
            raw.push_str(text);
        }
    }
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"
        <html>
          <head><style>p { color: red; }</style><script>var promo = "SECRET";</script></head>
          <body>
            <nav><ul><li>Home</li><li>Promos</li></ul></nav>
            <h1>Promociones</h1>
            <p>10% discount on   burgers</p>
            <p>   </p>
            <ul>
              <li>2x1 in cinemas <button>Buy now</button></li>
            </ul>
            <form><p>Subscribe</p></form>
            <aside><p>Sidebar ad</p></aside>
            <footer><p>Copyright</p></footer>
          </body>
        </html>
    "#;

    #[test]
    fn test_html_to_text_keeps_content_in_order() {
        let text = html_to_text(PAGE);
        assert_eq!(text, "Promociones\n\n10% discount on burgers\n2x1 in cinemas");
    }

    #[test]
    fn test_html_to_text_drops_noise_elements() {
        let text = html_to_text(PAGE);
        for noise in ["SECRET", "color", "Home", "Buy now", "Subscribe", "Sidebar", "Copyright"] {
            assert!(!text.contains(noise), "{noise} leaked into {text:?}");
        }
    }

    #[test]
    fn test_headings_are_separated_by_blank_lines() {
        let text = html_to_text("<h2>Title</h2><p>Body</p><h3>Next</h3><p>More</p>");
        assert_eq!(text, "Title\n\nBody\n\nNext\n\nMore");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(html_to_text("<html><body><div>no content tags</div></body></html>"), "");
    }

    #[tokio::test]
    async fn test_page_text_fetches_and_reduces() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/promos"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>10% discount on burgers</p>"))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(5, "promo_extract-test").unwrap();
        let text = fetcher.page_text(&format!("{}/promos", server.uri())).await;
        assert_eq!(text, "10% discount on burgers");
    }

    #[tokio::test]
    async fn test_page_text_soft_fails_on_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("<p>maintenance</p>"))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(5, "promo_extract-test").unwrap();
        assert_eq!(fetcher.page_text(&server.uri()).await, "");
    }

    #[tokio::test]
    async fn test_page_text_soft_fails_on_connection_error() {
        let fetcher = PageFetcher::new(5, "promo_extract-test").unwrap();
        assert_eq!(fetcher.page_text("http://127.0.0.1:1/").await, "");
    }
}
