//! Text-generation backend used by `/generate`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("code generation service is not configured")]
    NotConfigured,
    #[error("generation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("generation service returned {status}: {body}")]
    Upstream {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("generation service returned no content")]
    EmptyResponse,
}

/// Anything that can turn a language and a prompt into source code.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate(&self, language: &str, prompt: &str) -> Result<String, GenerateError>;
}

pub fn build_instruction(language: &str, prompt: &str) -> String {
    format!(
        "Generate {language} code for: {prompt}. Return ONLY the raw code. \
         Do not include markdown formatting, backticks, or any explanations."
    )
}

/// Strip a surrounding markdown code fence if the model added one anyway.
pub fn clean_code(raw: &str) -> String {
    let mut code = raw.trim();
    if code.starts_with("```") {
        if let Some(idx) = code.find('\n') {
            code = &code[idx + 1..];
        }
    }
    code = code.strip_suffix("```").unwrap_or(code);
    code.trim().to_string()
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl GeminiClient {
    pub fn new(
        api_key: Option<String>,
        model: String,
        timeout: Duration,
    ) -> Result<Self, GenerateError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            model,
        })
    }
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: [GeminiContent<'a>; 1],
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl CodeGenerator for GeminiClient {
    async fn generate(&self, language: &str, prompt: &str) -> Result<String, GenerateError> {
        let api_key = self.api_key.as_deref().ok_or(GenerateError::NotConfigured)?;
        let instruction = build_instruction(language, prompt);
        let body = GeminiRequest {
            contents: [GeminiContent {
                parts: [GeminiPart { text: &instruction }],
            }],
        };

        let resp = self
            .http
            .post(format!("{GEMINI_BASE_URL}/{}:generateContent", self.model))
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerateError::Upstream { status, body });
        }

        let parsed: GeminiResponse = resp.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or(GenerateError::EmptyResponse)?;

        Ok(clean_code(&text))
    }
}
