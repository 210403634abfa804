use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use lorelei_core::generator::{Generator, Role, Turn};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Deserialize)]
struct LlmResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI chat-completions adapter. The persona prompt is sent as the leading
/// `system` message.
pub struct OpenAiGenerator {
    client: Client,
    api_key: SecretString,
    model: String,
    system_prompt: String,
}

impl OpenAiGenerator {
    pub fn new(
        api_key: SecretString,
        model: String,
        system_prompt: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key,
            model,
            system_prompt,
        })
    }

    fn request_body(&self, history: &[Turn]) -> serde_json::Value {
        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": self.system_prompt,
        })];
        messages.extend(history.iter().map(|turn| {
            let role = match turn.role {
                Role::User => "user",
                Role::Model => "assistant",
            };
            serde_json::json!({ "role": role, "content": turn.content })
        }));

        serde_json::json!({
            "model": self.model,
            "messages": messages,
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, history: &[Turn]) -> Result<String> {
        let resp = self
            .client
            .post(COMPLETIONS_URL)
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request_body(history))
            .send()
            .await
            .context("OpenAI request failed")?
            .error_for_status()
            .context("OpenAI returned an error status")?
            .json::<LlmResponse>()
            .await
            .context("Failed to decode OpenAI response")?;

        resp.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| anyhow!("No response from LLM"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn body_starts_with_system_message_and_maps_roles() {
        let generator = OpenAiGenerator::new(
            SecretString::from("key".to_string()),
            "gpt-4o".into(),
            "You are Lorelei.".into(),
            Duration::from_secs(5),
        )
        .unwrap();

        let body = generator.request_body(&[Turn::user("hi"), Turn::model("hey!")]);

        assert_eq!(
            body,
            serde_json::json!({
                "model": "gpt-4o",
                "messages": [
                    { "role": "system", "content": "You are Lorelei." },
                    { "role": "user", "content": "hi" },
                    { "role": "assistant", "content": "hey!" }
                ]
            })
        );
    }

    #[test]
    fn null_content_decodes_as_empty() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let resp: LlmResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.choices[0].message.content, None);
    }

    // This is an integration test against the live API; it needs OPENAI_API_KEY.
    #[tokio::test]
    #[ignore]
    async fn live_generate() {
        dotenvy::dotenv_override().ok();
        let api_key = env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
        let generator = OpenAiGenerator::new(
            SecretString::from(api_key),
            "gpt-4o".into(),
            "You are a friendly chat bot. Keep replies short.".into(),
            Duration::from_secs(30),
        )
        .unwrap();

        let reply = generator
            .generate(&[Turn::user("Say hello to chat.")])
            .await
            .unwrap();
        println!("Reply: {reply}");
        assert!(!reply.trim().is_empty());
    }
}
