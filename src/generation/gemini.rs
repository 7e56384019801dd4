use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use url::Url;

use super::{GenerationError, ModelConnector, TextModel};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockNone,
    BlockLowAndAbove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// Política fija para todos los intentos: acoso y odio sin bloqueo,
/// contenido peligroso bloqueado desde nivel bajo.
pub const SAFETY_SETTINGS: [SafetySetting; 3] = [
    SafetySetting {
        category: HarmCategory::Harassment,
        threshold: HarmBlockThreshold::BlockNone,
    },
    SafetySetting {
        category: HarmCategory::HateSpeech,
        threshold: HarmBlockThreshold::BlockNone,
    },
    SafetySetting {
        category: HarmCategory::DangerousContent,
        threshold: HarmBlockThreshold::BlockLowAndAbove,
    },
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    safety_settings: &'a [SafetySetting],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            safety_settings: &SAFETY_SETTINGS,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Concatena el texto del primer candidato
fn extract_text(response: GenerateResponse) -> Result<String, GenerationError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GenerationError::EmptyResponse {
            reason: format!("prompt blocked ({})", reason),
        });
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(GenerationError::EmptyResponse {
            reason: "no candidates".to_string(),
        });
    };

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate
            .finish_reason
            .map(|r| format!("finish reason {}", r))
            .unwrap_or_else(|| "empty candidate".to_string());
        return Err(GenerationError::EmptyResponse { reason });
    }

    Ok(text)
}

/// Clasifica la respuesta HTTP: 429 dispara la rotación de credenciales,
/// cualquier otro estado no exitoso es un error definitivo.
fn classify(status: StatusCode, body: String) -> Result<String, GenerationError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(GenerationError::RateLimited(body));
    }

    if !status.is_success() {
        error!("❌ Gemini API error: {} - {}", status, body);
        return Err(GenerationError::Api { status, body });
    }

    let parsed: GenerateResponse = serde_json::from_str(&body)?;
    extract_text(parsed)
}

/// Cliente de Gemini ligado a una credencial
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateRequest::new(prompt))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        classify(status, body)
    }
}

/// Crea un [`GeminiClient`] nuevo por credencial, compartiendo el pool HTTP
#[derive(Clone)]
pub struct GeminiConnector {
    http: reqwest::Client,
    endpoint: Url,
}

impl GeminiConnector {
    pub fn new(http: reqwest::Client, base_url: &Url, model: &str) -> Result<Self, url::ParseError> {
        let endpoint = Url::parse(&format!(
            "{}/v1beta/models/{}:generateContent",
            base_url.as_str().trim_end_matches('/'),
            model
        ))?;
        debug!(endpoint = %endpoint, "Conector Gemini inicializado");

        Ok(Self { http, endpoint })
    }

    #[allow(dead_code)]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl ModelConnector for GeminiConnector {
    fn connect(&self, credential: &str) -> Box<dyn TextModel> {
        Box::new(GeminiClient {
            http: self.http.clone(),
            endpoint: self.endpoint.clone(),
            api_key: credential.to_string(),
        })
    }
}
