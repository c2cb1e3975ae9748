//! Tier-1 AI classification over HTTP, with the heuristic tier as the
//! per-batch fallback.
//!
//! Batches are independent and processed concurrently; each one resolves
//! to a complete classification through
//! [`fieldmap_core::classify::with_fallback`], and everything is merged
//! under a single accumulation point before the template is built.

use std::collections::BTreeMap;
use std::time::Duration;

use fieldmap_core::classify::{
    self, build_batch_prompt, parse_classification_response, AnalyzedField, FieldInfo, ParseError,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::config::{AiConfig, AiProvider};
use crate::prelude::*;

/// A Tier-1 failure for one batch. Recovered locally by reprocessing the
/// batch with the heuristic tier; never fatal for the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("request timed out")]
    Timeout,
    #[error("provider returned status {0}: {1}")]
    Status(u16, String),
    #[error("provider returned no content")]
    NoContent,
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Classify every field, batching through the configured AI provider and
/// falling back to heuristics per failed batch.
///
/// The returned map contains exactly one entry per input field name.
pub async fn classify_fields(
    config: &AiConfig,
    fields: &[FieldInfo],
) -> Result<BTreeMap<String, AnalyzedField>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    let batches = classify::partition(fields);
    log::debug!(
        "classifying {} fields in {} batches via {}",
        fields.len(),
        batches.len(),
        config.provider.as_str()
    );

    let futures = batches.into_iter().enumerate().map(|(i, batch)| {
        let client = &client;
        async move {
            let outcome = classify_batch_ai(client, config, batch).await;
            if let Err(err) = &outcome {
                log::warn!(
                    "classification batch {} failed ({}); falling back to heuristics",
                    i + 1,
                    err
                );
            }
            classify::with_fallback(outcome, batch)
        }
    });

    let results = join_all(futures).await;

    // Batches write to disjoint keys; merge them under one accumulation
    // point so nothing is lost before persistence.
    let mut merged = BTreeMap::new();
    for field in results.into_iter().flatten() {
        merged.entry(field.field_name.clone()).or_insert(field);
    }
    Ok(merged)
}

/// Heuristics-only classification, used with `--no-ai` or when no
/// provider is configured.
pub fn classify_fields_heuristic(fields: &[FieldInfo]) -> BTreeMap<String, AnalyzedField> {
    let mut merged = BTreeMap::new();
    for field in classify::heuristics::classify_batch(fields) {
        merged.entry(field.field_name.clone()).or_insert(field);
    }
    merged
}

/// Run one batch through the configured provider.
async fn classify_batch_ai(
    client: &reqwest::Client,
    config: &AiConfig,
    batch: &[FieldInfo],
) -> std::result::Result<Vec<AnalyzedField>, BatchError> {
    let prompt = build_batch_prompt(batch);

    let text = match config.provider {
        AiProvider::OpenAi => openai_complete(client, config, &prompt).await?,
        AiProvider::Anthropic => anthropic_complete(client, config, &prompt).await?,
    };

    Ok(parse_classification_response(&text)?)
}

fn request_error(err: reqwest::Error) -> BatchError {
    if err.is_timeout() {
        BatchError::Timeout
    } else {
        BatchError::Http(err.to_string())
    }
}

async fn error_status(response: reqwest::Response) -> BatchError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    BatchError::Status(status, snippet)
}

// ---------------------------------------------------------------------------
// OpenAI-compatible chat completions
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

async fn openai_complete(
    client: &reqwest::Client,
    config: &AiConfig,
    prompt: &str,
) -> std::result::Result<String, BatchError> {
    let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

    let body = ChatRequest {
        model: &config.model,
        messages: vec![ChatMessage {
            role: "user",
            content: prompt,
        }],
        temperature: 0.0,
    };

    let mut request = client.post(&url).json(&body);
    if let Some(key) = &config.api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await.map_err(request_error)?;
    if !response.status().is_success() {
        return Err(error_status(response).await);
    }

    let parsed: ChatResponse = response.json().await.map_err(request_error)?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(BatchError::NoContent);
    }
    Ok(content)
}

// ---------------------------------------------------------------------------
// Anthropic messages
// ---------------------------------------------------------------------------

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<MessagesContentBlock>,
}

#[derive(Debug, Deserialize)]
struct MessagesContentBlock {
    #[serde(default)]
    text: String,
}

async fn anthropic_complete(
    client: &reqwest::Client,
    config: &AiConfig,
    prompt: &str,
) -> std::result::Result<String, BatchError> {
    let url = format!("{}/v1/messages", config.base_url.trim_end_matches('/'));

    let body = MessagesRequest {
        model: &config.model,
        max_tokens: ANTHROPIC_MAX_TOKENS,
        messages: vec![ChatMessage {
            role: "user",
            content: prompt,
        }],
    };

    let mut request = client
        .post(&url)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&body);
    if let Some(key) = &config.api_key {
        request = request.header("x-api-key", key);
    }

    let response = request.send().await.map_err(request_error)?;
    if !response.status().is_success() {
        return Err(error_status(response).await);
    }

    let parsed: MessagesResponse = response.json().await.map_err(request_error)?;
    let content = parsed
        .content
        .into_iter()
        .map(|block| block.text)
        .collect::<Vec<_>>()
        .join("");

    if content.trim().is_empty() {
        return Err(BatchError::NoContent);
    }
    Ok(content)
}
