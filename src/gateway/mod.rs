//! Gemini API client for content generation
//!
//! Thin, best-effort boundary to the generative-AI service: fully-formed
//! prompts and configuration in, text or structured JSON out. Uses a
//! long-lived reqwest::Client for connection pooling. The `TextGenerator`
//! trait is the seam the content studio is tested against.

use crate::error::GatewayError;
use crate::models::SourceLink;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

pub const FLASH_MODEL: &str = "gemini-3-flash-preview";
pub const PRO_MODEL: &str = "gemini-3-pro-preview";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// One generateContent call, vendor-agnostic from the caller's side.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: &'static str,
    pub prompt: String,
    pub system_instruction: Option<String>,
    /// Ask the model for a JSON document instead of prose.
    pub json_output: bool,
    /// Attach the google-search grounding tool.
    pub search_grounding: bool,
    /// Optional inline image payload: (base64 data, mime type).
    pub inline_data: Option<(String, String)>,
}

impl GenerateRequest {
    pub fn new(model: &'static str, prompt: impl Into<String>) -> Self {
        Self {
            model,
            prompt: prompt.into(),
            system_instruction: None,
            json_output: false,
            search_grounding: false,
            inline_data: None,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }

    pub fn with_search_grounding(mut self) -> Self {
        self.search_grounding = true;
        self
    }

    pub fn with_inline_data(mut self, data: impl Into<String>, mime: impl Into<String>) -> Self {
        self.inline_data = Some((data.into(), mime.into()));
        self
    }
}

/// Model reply: text plus any grounding sources.
#[derive(Debug, Clone)]
pub struct GenerateReply {
    pub text: String,
    pub sources: Vec<SourceLink>,
}

/// Trait over the gateway so callers can be exercised without the network.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateReply, GatewayError>;
}

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateReply, GatewayError> {
        if self.api_key.is_empty() {
            return Err(GatewayError::NotConfigured(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url, request.model, self.api_key
        );

        let body = build_wire_request(&request);

        info!(model = request.model, "Calling Gemini API");

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            error!("Gemini API request failed: {}", e);
            GatewayError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let raw = response.text().await.map_err(GatewayError::from)?;
        let reply: WireResponse = serde_json::from_str(&raw).map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            GatewayError::MalformedJson {
                reason: e.to_string(),
                raw: truncate(&raw, 512),
            }
        })?;

        extract_reply(reply)
    }
}

fn build_wire_request(request: &GenerateRequest) -> WireRequest {
    let mut parts = Vec::new();
    if let Some((data, mime)) = &request.inline_data {
        parts.push(WirePart {
            text: None,
            inline_data: Some(WireInlineData {
                data: data.clone(),
                mime_type: mime.clone(),
            }),
        });
    }
    parts.push(WirePart {
        text: Some(request.prompt.clone()),
        inline_data: None,
    });

    WireRequest {
        contents: vec![WireContent { parts }],
        generation_config: WireGenerationConfig {
            temperature: 0.3,
            top_p: 0.9,
            top_k: 40,
            max_output_tokens: 8192,
            response_mime_type: request.json_output.then(|| "application/json".to_string()),
        },
        system_instruction: request.system_instruction.as_ref().map(|text| {
            WireSystemInstruction {
                parts: vec![WirePart {
                    text: Some(text.clone()),
                    inline_data: None,
                }],
            }
        }),
        tools: request.search_grounding.then(|| {
            vec![WireTool {
                google_search: serde_json::json!({}),
            }]
        }),
    }
}

fn extract_reply(reply: WireResponse) -> Result<GenerateReply, GatewayError> {
    let candidate = reply
        .candidates
        .into_iter()
        .next()
        .ok_or(GatewayError::EmptyResponse)?;

    let text = candidate
        .content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() {
        return Err(GatewayError::EmptyResponse);
    }

    let sources = candidate
        .grounding_metadata
        .map(|meta| {
            meta.grounding_chunks
                .into_iter()
                .filter_map(|chunk| chunk.web)
                .map(|web| SourceLink {
                    title: web.title.unwrap_or_else(|| "Source".to_string()),
                    url: web.uri.unwrap_or_else(|| "#".to_string()),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(GenerateReply { text, sources })
}

fn truncate(raw: &str, limit: usize) -> String {
    if raw.len() <= limit {
        raw.to_string()
    } else {
        let mut end = limit;
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &raw[..end])
    }
}

//
// ================= Wire Types =================
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    contents: Vec<WireContent>,
    generation_config: WireGenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<WireInlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireInlineData {
    data: String,
    mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireSystemInstruction {
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    google_search: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    content: WireContent,
    #[serde(default)]
    grounding_metadata: Option<WireGroundingMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<WireGroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct WireGroundingChunk {
    web: Option<WireWebSource>,
}

#[derive(Debug, Deserialize)]
struct WireWebSource {
    title: Option<String>,
    uri: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = GenerateRequest::new(FLASH_MODEL, "Create a market analysis for Benidorm")
            .with_system_instruction("You are a real estate advisor")
            .with_json_output()
            .with_search_grounding();

        let wire = build_wire_request(&request);
        let json = serde_json::to_string(&wire).unwrap();

        assert!(json.contains("Create a market analysis for Benidorm"));
        assert!(json.contains("\"systemInstruction\""));
        assert!(json.contains("\"responseMimeType\":\"application/json\""));
        assert!(json.contains("\"googleSearch\":{}"));
        assert!(json.contains("\"maxOutputTokens\""));
    }

    #[test]
    fn test_inline_data_precedes_prompt() {
        let request = GenerateRequest::new(FLASH_MODEL, "Extract leads from this form")
            .with_inline_data("aGVsbG8=", "image/png");

        let wire = build_wire_request(&request);
        let parts = &wire.contents[0].parts;
        assert_eq!(parts.len(), 2);
        assert!(parts[0].inline_data.is_some());
        assert_eq!(parts[1].text.as_deref(), Some("Extract leads from this form"));

        let json = serde_json::to_string(&wire).unwrap();
        assert!(json.contains("\"inlineData\""));
        assert!(json.contains("\"mimeType\":\"image/png\""));
    }

    #[test]
    fn test_reply_extraction_with_sources() {
        let raw = r#"{
            "candidates": [{
                "content": { "parts": [{ "text": "Prices rose 4%." }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "title": "Idealista", "uri": "https://idealista.com" } },
                        { "web": {} }
                    ]
                }
            }]
        }"#;

        let reply: WireResponse = serde_json::from_str(raw).unwrap();
        let extracted = extract_reply(reply).unwrap();
        assert_eq!(extracted.text, "Prices rose 4%.");
        assert_eq!(extracted.sources.len(), 2);
        assert_eq!(extracted.sources[0].title, "Idealista");
        assert_eq!(extracted.sources[1].url, "#");
    }

    #[test]
    fn test_empty_candidates_is_typed_error() {
        let reply: WireResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(
            extract_reply(reply),
            Err(GatewayError::EmptyResponse)
        ));
    }
}
