//! LLM extraction capability.
//!
//! The pipeline only needs one thing from the model: given a system
//! instruction, a user message, and a JSON schema, return a JSON document that
//! follows the schema. That contract is the [`AskAsync`] trait.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait, one structured request per call
//! - [`OpenAiAsk`]: implementation against an OpenAI-compatible
//!   `/chat/completions` endpoint using `json_schema` response format
//! - [`ask_structured`]: sends a prompt and decodes the reply into a typed
//!   struct; decoding is explicit and strict, independent of the provider
//!
//! The credential is passed on every call and never stored. There is no
//! retry and no timeout on LLM calls: a failure is returned to the caller as
//! a fatal [`LlmError`].

use crate::error::LlmError;
use crate::utils::{looks_truncated, truncate_for_log};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// One structured-output request.
#[derive(Debug, Clone)]
pub struct StructuredPrompt {
    /// Schema name reported to the provider (e.g. `"promotions"`).
    pub name: &'static str,
    pub system_instruction: String,
    pub user_message: String,
    /// JSON schema the reply must satisfy.
    pub response_schema: Value,
}

/// Trait for async structured LLM calls.
///
/// Implementors send a [`StructuredPrompt`] and return the raw JSON text of
/// the reply. Tests substitute scripted implementations.
// Futures are awaited in place, never spawned, so no `Send` bound is needed.
#[allow(async_fn_in_trait)]
pub trait AskAsync {
    async fn ask(&self, credential: &str, prompt: &StructuredPrompt) -> Result<String, LlmError>;
}

/// Send `prompt` and decode the reply into `T`.
///
/// A reply that does not deserialize into `T` is a [`LlmError::Parse`].
#[instrument(level = "info", skip_all, fields(schema = prompt.name))]
pub async fn ask_structured<A, T>(
    api: &A,
    credential: &str,
    prompt: &StructuredPrompt,
) -> Result<T, LlmError>
where
    A: AskAsync,
    T: DeserializeOwned,
{
    let raw = api.ask(credential, prompt).await?;
    serde_json::from_str::<T>(&raw).map_err(|e| {
        if looks_truncated(&e) {
            warn!(error = %e, "LLM reply looks truncated");
        }
        error!(
            error = %e,
            response_preview = %truncate_for_log(&raw, 300),
            "LLM reply did not match schema"
        );
        LlmError::Parse {
            context: prompt.name.to_string(),
            source: e,
        }
    })
}

/// OpenAI-compatible chat completions client.
#[derive(Debug, Clone)]
pub struct OpenAiAsk {
    http_client: Client,
    base_url: String,
    model: String,
}

impl OpenAiAsk {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    fn request_body<'a>(&'a self, prompt: &'a StructuredPrompt) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user_message,
                },
            ],
            temperature: 0.0,
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": prompt.name,
                    "strict": true,
                    "schema": prompt.response_schema,
                }
            }),
        }
    }
}

impl AskAsync for OpenAiAsk {
    #[instrument(level = "info", skip_all, fields(model = %self.model, schema = prompt.name))]
    async fn ask(&self, credential: &str, prompt: &StructuredPrompt) -> Result<String, LlmError> {
        let t0 = Instant::now();
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(credential)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "LLM request failed");
                LlmError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %truncate_for_log(&body, 300), "LLM API error");
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.text().await.map_err(|e| LlmError::Network(e.to_string()))?;
        let chat: ChatResponse = serde_json::from_str(&raw).map_err(|e| LlmError::Parse {
            context: "chat completion envelope".to_string(),
            source: e,
        })?;

        let message = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or(LlmError::EmptyResponse)?;
        if let Some(refusal) = message.refusal {
            return Err(LlmError::Refusal(refusal));
        }
        let content = message.content.ok_or(LlmError::EmptyResponse)?;

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            bytes = content.len(),
            "LLM reply received"
        );
        debug!(reply = %truncate_for_log(&content, 500), "LLM reply");
        Ok(content)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: Value,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prompt() -> StructuredPrompt {
        StructuredPrompt {
            name: "category",
            system_instruction: "normalize".to_string(),
            user_message: "['food']".to_string(),
            response_schema: json!({"type": "object"}),
        }
    }

    fn completion(content: &str) -> Value {
        json!({
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content, "refusal": null}
            }]
        })
    }

    #[derive(Debug, Deserialize)]
    struct Category {
        category: Vec<String>,
    }

    #[tokio::test]
    async fn test_ask_sends_bearer_and_schema() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-test",
                "response_format": {"type": "json_schema", "json_schema": {"name": "category", "strict": true}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(r#"{"category":["Food"]}"#)))
            .expect(1)
            .mount(&server)
            .await;

        let api = OpenAiAsk::new(format!("{}/v1", server.uri()), "gpt-test");
        let reply: Category = ask_structured(&api, "sk-test", &prompt()).await.unwrap();
        assert_eq!(reply.category, vec!["Food"]);
    }

    #[tokio::test]
    async fn test_ask_maps_non_2xx_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let api = OpenAiAsk::new(format!("{}/v1", server.uri()), "gpt-test");
        let err = api.ask("bad", &prompt()).await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 401, .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_ask_surfaces_refusal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": null, "refusal": "no"}}]
            })))
            .mount(&server)
            .await;

        let api = OpenAiAsk::new(format!("{}/v1", server.uri()), "gpt-test");
        let err = api.ask("sk-test", &prompt()).await.unwrap_err();
        assert!(matches!(err, LlmError::Refusal(_)));
    }

    #[tokio::test]
    async fn test_ask_structured_rejects_schema_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(r#"{"category":"Food"}"#)))
            .mount(&server)
            .await;

        let api = OpenAiAsk::new(format!("{}/v1", server.uri()), "gpt-test");
        let err = ask_structured::<_, Category>(&api, "sk-test", &prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_ask_connection_failure_is_network_error() {
        let api = OpenAiAsk::new("http://127.0.0.1:1/v1", "gpt-test");
        let err = api.ask("sk-test", &prompt()).await.unwrap_err();
        assert!(matches!(err, LlmError::Network(_)));
    }
}
