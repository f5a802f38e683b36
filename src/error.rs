//! Error types for the extraction pipeline.
//!
//! Two layers:
//! - [`LlmError`]: failures of the LLM extraction capability (transport, API,
//!   decoding). These are always fatal for the run.
//! - [`PipelineError`]: everything that can abort a batch, including input
//!   validation done before any network call.
//!
//! Page fetch failures have no variant: they soft-fail to empty text inside
//! [`crate::page_text`].

use thiserror::Error;

/// Failures of a single call to the LLM extraction capability.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Connection failed, DNS error, or the request could not be sent.
    #[error("LLM network error: {0}")]
    Network(String),

    /// Non-2xx response from the provider (bad key, rate limit, bad request).
    #[error("LLM API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// The response body or its content did not match the expected schema.
    #[error("LLM response for {context} did not match schema: {source}")]
    Parse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The model declined to produce structured output.
    #[error("LLM refused the request: {0}")]
    Refusal(String),

    /// The provider answered without any message content.
    #[error("LLM returned no content")]
    EmptyResponse,
}

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no URLs were supplied")]
    EmptyUrlList,

    #[error("no API credential was supplied")]
    MissingCredential,

    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The category normalization call returned a list whose length differs
    /// from the number of records in the batch.
    #[error("category normalization returned {actual} labels for {expected} records")]
    CategoryCountMismatch { expected: usize, actual: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_mismatch_message() {
        let e = PipelineError::CategoryCountMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            e.to_string(),
            "category normalization returned 2 labels for 3 records"
        );
    }

    #[test]
    fn test_llm_error_converts_transparently() {
        let e: PipelineError = LlmError::EmptyResponse.into();
        assert!(matches!(e, PipelineError::Llm(LlmError::EmptyResponse)));
        assert_eq!(e.to_string(), "LLM returned no content");
    }
}
