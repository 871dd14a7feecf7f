use crate::config::{LlmConfig, PromptConfig};
use crate::error::HttpError;
use crate::http::send_with_retry;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: i32,
    temperature: f32,
    cache_prompt: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: String,
}

/// Client for a llama.cpp style `/completion` endpoint.
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
    backoff: Duration,
}

impl LlmClient {
    pub fn new(config: LlmConfig, backoff: Duration) -> Self {
        LlmClient {
            client: reqwest::Client::new(),
            config,
            backoff,
        }
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, HttpError> {
        let url = format!("{}/completion", self.config.base_url.trim_end_matches('/'));
        let body = CompletionRequest {
            prompt,
            n_predict: self.config.n_predict,
            temperature: self.config.temperature,
            cache_prompt: false,
        };
        debug!("Requesting completion from {}", url);

        let response = send_with_retry(|| self.client.post(&url).json(&body), self.backoff).await?;
        let parsed: CompletionResponse = response.json().await?;
        info!("Model returned {} chars", parsed.content.chars().count());
        Ok(parsed.content)
    }

    /// Generates a raw dialogue: the seed lines followed by what the model wrote.
    pub async fn generate_dialogue(&self, prompt: &PromptConfig) -> Result<String, HttpError> {
        let content = self.complete(&build_prompt(prompt)).await?;
        Ok(format!("{}{}", prompt.seed, content))
    }
}

fn build_prompt(prompt: &PromptConfig) -> String {
    format!("{}\n{}", prompt.preamble.trim_end(), prompt.seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{parse_dialogue, Speaker};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn prompt_ends_on_the_open_seed_line() {
        let prompt = PromptConfig::default();
        let full = build_prompt(&prompt);
        assert!(full.starts_with("Deux amis"));
        assert!(full.ends_with("\nA: "));
    }

    #[test]
    fn seed_and_completion_parse_as_one_dialogue() {
        let prompt = PromptConfig::default();
        let content = "Pourquoi les plongeurs plongent en arrière ?\nB: Aucune idée.\n";
        let raw = format!("{}{}", prompt.seed, content);
        let turns = parse_dialogue(&raw, prompt.max_turns).turns;
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[2].speaker, Speaker::Received);
        assert_eq!(turns[2].text, "Pourquoi les plongeurs plongent en arrière ?");
    }

    #[test]
    fn completion_response_ignores_extra_fields() {
        let raw = r#"{"content":"B: ok","stop":true,"tokens_predicted":3}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.content, "B: ok");
    }

    #[tokio::test]
    async fn completion_keeps_accented_text_intact() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/completion"))
            .and(body_partial_json(serde_json::json!({ "prompt": "A: ", "cache_prompt": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": "Ça va, et toi ? 🚀",
                "stop": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = LlmConfig {
            base_url: format!("{}/", server.uri()),
            ..LlmConfig::default()
        };
        let client = LlmClient::new(config, Duration::from_millis(10));
        let content = client.complete("A: ").await.unwrap();
        assert_eq!(content, "Ça va, et toi ? 🚀");
        assert_eq!(content.chars().count(), 17);
    }
}
