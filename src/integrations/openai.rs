//! OpenAI API client for phrasing answers from retrieved context.

use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::{Error, Result};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Used when `prompts/citizen_assistant.md` is not deployed alongside
/// the binary.
const FALLBACK_SYSTEM_PROMPT: &str = "Tu es un assistant civique neutre. Réponds uniquement à \
     partir du contexte vérifié fourni. Si le contexte indique qu'aucune information n'a été \
     trouvée, dis-le simplement sans inventer de réponse.";

/// OpenAI client.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    /// Create client from environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| Error::InvalidArgument("OPENAI_API_KEY is not set".to_string()))?;
        Self::new(api_key)
    }

    /// Create client with API key.
    pub fn new<S: Into<String>>(api_key: S) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::InvalidArgument("OPENAI_API_KEY is empty".to_string()));
        }

        let http = Client::builder()
            .user_agent("poliscope/0.1.0")
            .build()
            .map_err(|e| Error::InvalidArgument(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            base_url: OPENAI_API_URL.to_string(),
        })
    }

    /// Chat completion.
    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        let request = ChatRequest {
            model: model.to_string(),
            messages,
            temperature,
            max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::OpenAiError(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::OpenAiError(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::OpenAiError(format!("{}: {}", status, text)));
        }

        let chat_response: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| Error::OpenAiError(format!("invalid response: {}", e)))?;

        chat_response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| Error::OpenAiError("empty response".to_string()))
    }

    /// Phrase an answer to a citizen question from the retrieved
    /// context. The system prompt binds the model to that context,
    /// including the wording for "nothing found".
    pub async fn answer_with_context(
        &self,
        question: &str,
        context: &str,
        config: &Config,
    ) -> Result<String> {
        let mut system_prompt = crate::Prompt::CitizenAssistant
            .load()
            .unwrap_or_else(|_| FALLBACK_SYSTEM_PROMPT.to_string());

        system_prompt.push_str(&format!("\n\nContexte vérifié :\n{}", context));

        let messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: Some(system_prompt),
            },
            ChatMessage {
                role: "user".to_string(),
                content: Some(question.to_string()),
            },
        ];

        self.chat_completion(
            messages,
            &config.openai_model,
            config.openai_temperature,
            config.openai_max_tokens,
        )
        .await
    }
}

/// Chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_new_rejects_empty_key() {
        let err = OpenAIClient::new("   ").unwrap_err();
        assert!(format!("{}", err).contains("empty"));
    }

    fn client(server: &MockServer) -> OpenAIClient {
        let mut client = OpenAIClient::new("test_key").expect("client");
        client.base_url = server.base_url();
        client
    }

    #[tokio::test]
    async fn chat_completion_returns_first_choice_content() {
        let server = MockServer::start_async().await;

        let completion_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("Authorization", "Bearer test_key");
            then.status(200).json_body(json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "Bonjour !" } }
                ]
            }));
        });

        let reply = client(&server)
            .chat_completion(
                vec![ChatMessage {
                    role: "user".to_string(),
                    content: Some("Salut".to_string()),
                }],
                "gpt-4o-mini",
                0.2,
                32,
            )
            .await
            .unwrap();

        assert_eq!(reply, "Bonjour !");
        completion_mock.assert_calls(1);
    }

    #[tokio::test]
    async fn chat_completion_returns_error_on_non_success_status() {
        let server = MockServer::start_async().await;

        let completion_mock = server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(429).body("rate limited");
        });

        let err = client(&server)
            .chat_completion(vec![], "gpt-4o-mini", 0.2, 32)
            .await
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("429"));
        assert!(msg.contains("rate limited"));
        completion_mock.assert_calls(1);
    }

    #[tokio::test]
    async fn chat_completion_returns_error_on_invalid_json() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).body("not json");
        });

        let err = client(&server)
            .chat_completion(vec![], "gpt-4o-mini", 0.2, 32)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("invalid response"));
    }

    #[tokio::test]
    async fn chat_completion_returns_error_on_empty_choices() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(json!({ "choices": [] }));
        });

        let err = client(&server)
            .chat_completion(vec![], "gpt-4o-mini", 0.2, 32)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("empty response"));
    }

    #[tokio::test]
    async fn chat_completion_returns_error_on_missing_message_content() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(json!({
                "choices": [
                    { "message": { "role": "assistant", "content": null } }
                ]
            }));
        });

        let err = client(&server)
            .chat_completion(vec![], "gpt-4o-mini", 0.2, 32)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("empty response"));
    }

    #[tokio::test]
    async fn answer_with_context_sends_context_in_system_prompt() {
        let server = MockServer::start_async().await;

        let completion_mock = server.mock(|when, then| {
            when.method(POST).path("/chat/completions").is_true(|req| {
                let body = String::from_utf8_lossy(req.body().as_ref());
                body.contains("Contexte vérifié") && body.contains("54 sièges")
            });
            then.status(200).json_body(json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "Réponse." } }
                ]
            }));
        });

        let reply = client(&server)
            .answer_with_context(
                "Combien de sièges pour ce parti ?",
                "Parti : Exemple. 54 sièges à l'Assemblée.",
                &Config::default(),
            )
            .await
            .unwrap();

        assert_eq!(reply, "Réponse.");
        completion_mock.assert_calls(1);
    }

    #[tokio::test]
    async fn answer_with_context_uses_configured_model() {
        let server = MockServer::start_async().await;

        let completion_mock = server.mock(|when, then| {
            when.method(POST).path("/chat/completions").is_true(|req| {
                let body = String::from_utf8_lossy(req.body().as_ref());
                body.contains("\"model\":\"gpt-4o-mini\"")
            });
            then.status(200).json_body(json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "Ok" } }
                ]
            }));
        });

        client(&server)
            .answer_with_context("Question ?", "Contexte.", &Config::default())
            .await
            .unwrap();

        completion_mock.assert_calls(1);
    }
}
