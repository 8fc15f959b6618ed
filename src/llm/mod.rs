pub mod models;
pub mod prompt;
pub mod providers;
pub mod response;

use crate::config::LlmConfig;
use crate::llm::models::{ChatMessage, SqlResponse};
use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use tracing::{debug, error};

#[derive(Debug)]
pub enum LlmError {
    ConnectionError(String),
    ResponseError(String),
    ConfigError(String),
    /// The reply could not be parsed as `{"sql": "..."}` once unwrapped.
    FormatError { reason: String, raw: String },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ConnectionError(msg) => write!(f, "LLM connection error: {}", msg),
            LlmError::ResponseError(msg) => write!(f, "LLM response error: {}", msg),
            LlmError::ConfigError(msg) => write!(f, "LLM configuration error: {}", msg),
            LlmError::FormatError { reason, raw } => write!(
                f,
                "LLM output is not valid JSON: {}\nReply:\n{}",
                reason, raw
            ),
        }
    }
}

impl Error for LlmError {}

/// A chat-completion backend: send messages, get back the text of the first choice.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

pub struct LlmManager {
    provider: Box<dyn ChatCompletion>,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let provider: Box<dyn ChatCompletion> = match config.backend.as_str() {
            "openai" => Box::new(providers::openai::OpenAiProvider::new(config)?),
            "ollama" => Box::new(providers::ollama::OllamaProvider::new(config)?),
            _ => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        Ok(Self { provider })
    }

    pub fn with_provider(provider: Box<dyn ChatCompletion>) -> Self {
        Self { provider }
    }

    /// Asks the model for a query answering `question` against `schema`.
    pub async fn generate_sql(&self, schema: &str, question: &str) -> Result<SqlResponse, LlmError> {
        let messages = prompt::compose_messages(schema, question);

        let raw = self.provider.complete(&messages).await.map_err(|e| {
            error!("Completion request failed: {}", e);
            e
        })?;
        debug!("Completion returned {} bytes", raw.len());

        response::unwrap_reply(&raw).map_err(|e| {
            error!("Unusable completion output: {}", e);
            e
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::StubCompletion;
    use super::*;
    use crate::llm::models::Role;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_generate_sql_runs_the_pipeline() {
        let stub = StubCompletion::replying("```json\n{\"sql\": \"SELECT COUNT(*) FROM users\"}\n```");
        let calls = stub.calls.clone();
        let sent = stub.last_messages.clone();
        let manager = LlmManager::with_provider(Box::new(stub));

        let result = manager
            .generate_sql("Table: users\n - id (int)\n\n", "how many users?")
            .await
            .unwrap();

        assert_eq!(result.sql, "SELECT COUNT(*) FROM users");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].role, Role::System);
        assert!(sent[1].content.contains("Table: users"));
        assert!(sent[1].content.ends_with("how many users?"));
    }

    #[tokio::test]
    async fn test_upstream_error_is_passed_through() {
        let manager = LlmManager::with_provider(Box::new(StubCompletion::failing("rate limited")));

        let err = manager.generate_sql("", "anything").await.unwrap_err();

        assert!(matches!(err, LlmError::ResponseError(ref msg) if msg == "rate limited"));
    }

    #[tokio::test]
    async fn test_format_error_keeps_raw_reply() {
        let manager = LlmManager::with_provider(Box::new(StubCompletion::replying("I cannot help")));

        let err = manager.generate_sql("", "anything").await.unwrap_err();

        assert!(matches!(err, LlmError::FormatError { ref raw, .. } if raw == "I cannot help"));
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let config = LlmConfig {
            backend: "carrier-pigeon".to_string(),
            model: "gpt-4-turbo".to_string(),
            api_key: None,
            api_url: None,
        };

        assert!(matches!(LlmManager::new(&config), Err(LlmError::ConfigError(_))));
    }
}
