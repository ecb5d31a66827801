use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::capture::{CaptureData, ChartScreenshot};
#[cfg(debug_assertions)]
use crate::config::DEBUG_FLAGS;
use crate::config::ProviderSettings;
use crate::models::extract_json_object;

const SYSTEM_PROMPT: &str = "You are a price-action analyst. You answer with exactly one JSON \
                             object matching the requested schema and no other text.";

/// Turns captured chart data plus instructions into the model's raw JSON.
/// Schema checks happen afterwards, in `TimeframeAnalysis::from_response`.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn analyze(&self, data: &CaptureData, instructions: &str) -> Result<Value>;

    /// A unique identifier for this implementation (so that afterwards we know which one we used).
    fn signature(&self) -> &'static str;
}

// ============================================================================
// ChatCompletionsProvider: OpenAI-compatible HTTP endpoint
// ============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: MessageContent,
}

/// Plain text for series, text plus an inline image for screenshots
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

pub struct ChatCompletionsProvider {
    http: reqwest::Client,
    settings: ProviderSettings,
    api_key: Option<String>,
}

impl ChatCompletionsProvider {
    /// Reads the API key from the environment variable named in the settings.
    /// A missing key is only an error once a request is attempted.
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            log::warn!(
                "{} is not set; AI analysis will fail over to the offline heuristic",
                settings.api_key_env
            );
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("signal-sniper/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            settings,
            api_key,
        })
    }

    async fn user_message(&self, data: &CaptureData, instructions: &str) -> Result<MessageContent> {
        match data {
            CaptureData::Series(series) => {
                let decimals = crate::domain::Instrument::new(&series.symbol)
                    .class
                    .price_decimals();
                Ok(MessageContent::Text(format!(
                    "{}\n\nOHLCV data for {} {} (oldest first):\n{}",
                    instructions,
                    series.symbol,
                    series.timeframe,
                    series.to_prompt_csv(self.settings.max_prompt_bars, decimals)
                )))
            }
            CaptureData::Screenshot(shot) => {
                let url = image_data_url(shot).await?;
                Ok(MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: instructions.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url },
                    },
                ]))
            }
        }
    }
}

/// The screenshot inlined as a `data:` URL
async fn image_data_url(shot: &ChartScreenshot) -> Result<String> {
    let bytes = tokio::fs::read(&shot.path)
        .await
        .context(format!("Failed to read chart image: {}", shot.path.display()))?;
    if bytes.is_empty() {
        bail!("Chart image is empty: {}", shot.path.display());
    }
    Ok(format!(
        "data:{};base64,{}",
        image_mime(&shot.path),
        BASE64.encode(&bytes)
    ))
}

fn image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

#[async_trait]
impl AnalysisProvider for ChatCompletionsProvider {
    async fn analyze(&self, data: &CaptureData, instructions: &str) -> Result<Value> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("API key missing: set {}", self.settings.api_key_env))?;
        let user = self.user_message(data, instructions).await?;

        let request = ChatRequest {
            model: &self.settings.model,
            temperature: self.settings.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(SYSTEM_PROMPT.to_string()),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let resp = self
            .http
            .post(&self.settings.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .context("AI request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            bail!("AI provider returned {}: {}", status, preview);
        }
        let reply: ChatResponse = resp.json().await.context("Malformed AI provider reply")?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("AI provider reply has no content"))?;

        #[cfg(debug_assertions)]
        if DEBUG_FLAGS.print_raw_responses {
            log::info!("Raw AI response: {}", content);
        }

        Ok(extract_json_object(&content)?)
    }

    fn signature(&self) -> &'static str {
        "Chat completions"
    }
}

// ============================================================================
// OfflineProvider: never available, so every analysis takes the fallback path
// ============================================================================

pub struct OfflineProvider;

#[async_trait]
impl AnalysisProvider for OfflineProvider {
    async fn analyze(&self, _data: &CaptureData, _instructions: &str) -> Result<Value> {
        Err(anyhow!("AI provider disabled (offline mode)"))
    }

    fn signature(&self) -> &'static str {
        "Offline"
    }
}
