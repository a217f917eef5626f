use crate::config::NerConfig;
use crate::entity::{count_tokens, EntityType, Span};
use crate::error::{Result, WikitreeError};
use crate::ner::EntityRecognizer;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request body for a token-classification endpoint
#[derive(Serialize)]
struct NerRequest<'a> {
    inputs: &'a str,
    parameters: NerParameters,
}

#[derive(Serialize)]
struct NerParameters {
    aggregation_strategy: &'static str,
}

/// One grouped entity in the endpoint's response
#[derive(Debug, Deserialize)]
struct RawEntity {
    entity_group: String,
    word: String,
    /// Character offsets into the submitted chunk
    start: Option<usize>,
    end: Option<usize>,
}

/// Split `text` into windows of at most `max_chars` characters, breaking at
/// the last whitespace inside a window when there is one.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let Some((limit, _)) = rest.char_indices().nth(max_chars) else {
            chunks.push(rest);
            break;
        };
        let split = rest[..limit]
            .rfind(char::is_whitespace)
            .filter(|&i| i > 0)
            .unwrap_or(limit);
        let (chunk, tail) = rest.split_at(split);
        chunks.push(chunk);
        rest = tail;
    }

    chunks
}

/// True when the `[start, end)` char range neither starts nor ends inside a word.
fn on_word_boundaries(chars: &[char], start: usize, end: usize) -> bool {
    if start >= end || end > chars.len() {
        return false;
    }
    let before = start.checked_sub(1).map(|i| chars[i]);
    let after = chars.get(end).copied();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

fn to_span(raw: RawEntity, chunk_chars: &[char]) -> Option<Span> {
    let fragment_marker = raw.word.starts_with("##");
    let word = raw.word.trim_start_matches("##").trim();
    if word.is_empty() {
        return None;
    }

    let complete = !fragment_marker
        && match (raw.start, raw.end) {
            (Some(start), Some(end)) => on_word_boundaries(chunk_chars, start, end),
            _ => true,
        };

    Some(Span {
        text: word.to_string(),
        entity_type: EntityType::from_label(&raw.entity_group),
        token_count: count_tokens(word),
        is_complete_token: complete,
    })
}

/// HTTP NER client
///
/// Talks to a Hugging Face style token-classification endpoint with simple
/// aggregation. Long texts are sent in chunks; spans come back in text order.
pub struct HttpRecognizer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    chunk_chars: usize,
}

impl HttpRecognizer {
    pub fn new(config: &NerConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WikitreeError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            chunk_chars: config.chunk_chars,
        })
    }

    async fn extract_chunk(&self, chunk: &str) -> Result<Vec<Span>> {
        let request = NerRequest {
            inputs: chunk,
            parameters: NerParameters {
                aggregation_strategy: "simple",
            },
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| WikitreeError::NerUnavailable(format!("Network error: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            let message = format!("NER endpoint error {}: {}", status, body);
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                WikitreeError::NerUnavailable(message)
            } else {
                WikitreeError::Ner(message)
            });
        }

        let raw: Vec<RawEntity> = response
            .json()
            .await
            .map_err(|e| WikitreeError::Ner(format!("Failed to parse response: {}", e)))?;

        let chars: Vec<char> = chunk.chars().collect();
        Ok(raw.into_iter().filter_map(|r| to_span(r, &chars)).collect())
    }
}

impl EntityRecognizer for HttpRecognizer {
    async fn extract_spans(&self, text: &str) -> Result<Vec<Span>> {
        let mut spans = Vec::new();
        for chunk in chunk_text(text, self.chunk_chars) {
            if chunk.trim().is_empty() {
                continue;
            }
            spans.extend(self.extract_chunk(chunk).await?);
        }
        log::debug!("Extracted {} spans from {} chars", spans.len(), text.len());
        Ok(spans)
    }
}
