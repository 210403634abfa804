use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use lorelei_core::generator::{Generator, Role, Turn};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

// --- Wire types for `models/{model}:generateContent` ---

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Gemini chat adapter. The persona prompt travels as the system instruction
/// on every call.
pub struct GeminiGenerator {
    client: Client,
    api_key: SecretString,
    model: String,
    system_prompt: String,
}

impl GeminiGenerator {
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

    fn request_body<'a>(&'a self, history: &'a [Turn]) -> GenerateRequest<'a> {
        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &self.system_prompt,
                }],
            },
            contents: history
                .iter()
                .map(|turn| Content {
                    role: Some(match turn.role {
                        Role::User => "user",
                        Role::Model => "model",
                    }),
                    // The API rejects empty parts.
                    parts: vec![Part {
                        text: if turn.content.trim().is_empty() {
                            "..."
                        } else {
                            turn.content.as_str()
                        },
                    }],
                })
                .collect(),
        }
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, history: &[Turn]) -> Result<String> {
        let url = format!("{API_BASE}/{}:generateContent", self.model);
        let resp = self
            .client
            .post(url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&self.request_body(history))
            .send()
            .await
            .context("Gemini request failed")?
            .error_for_status()
            .context("Gemini returned an error status")?
            .json::<GenerateResponse>()
            .await
            .context("Failed to decode Gemini response")?;

        let content = resp
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| anyhow!("No candidates in Gemini response"))?;
        Ok(content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}
