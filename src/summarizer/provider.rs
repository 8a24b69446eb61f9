//! Chat-completions summarization provider.
//!
//! Sends the captured text to an OpenAI-compatible `/v1/chat/completions`
//! endpoint and turns the reply into a list of short bullet points.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{SummaryBackend, SummaryError};
use crate::config::SummarizerConfig;

const SYSTEM_PROMPT: &str = "You summarize text for a speed reader. Reply with 3 to 5 bullet points, \
one per line, each starting with \"- \". Each bullet is a short incomplete-sentence fragment \
(no full prose, no trailing period). Output ONLY the bullets, nothing else.";

pub struct OpenAiSummarizer {
    host: String,
    model: String,
    api_key: String,
    max_input_chars: usize,
    client: Client,
}

impl OpenAiSummarizer {
    /// Build a provider client. Fails if no key is configured or the HTTP
    /// client cannot be constructed.
    pub fn new(config: &SummarizerConfig, api_key: Option<String>) -> Result<Self, SummaryError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(SummaryError::MissingApiKey)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            host: config.host.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            max_input_chars: config.max_input_chars,
            client,
        })
    }
}

#[async_trait]
impl SummaryBackend for OpenAiSummarizer {
    async fn summarize(&self, text: &str) -> Result<Vec<String>, SummaryError> {
        let t_start = Instant::now();
        let input = truncate_chars(text, self.max_input_chars);

        let body = json!({
            "model": self.model,
            "temperature": 0.3,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": input }
            ]
        });

        let url = format!("{}/v1/chat/completions", self.host);
        debug!("Requesting summary from {url} (model '{}')", self.model);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SummaryError::Status(resp.status()));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| SummaryError::Malformed(e.to_string()))?;
        let bullets = parse_completion(&data)?;

        let latency_ms = t_start.elapsed().as_secs_f64() * 1000.0;
        info!(
            "Summarized {} chars → {} bullets ({latency_ms:.0}ms)",
            input.len(),
            bullets.len()
        );
        Ok(bullets)
    }
}

/// Cut to at most `max_chars` chars without splitting a code point.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn parse_completion(data: &Value) -> Result<Vec<String>, SummaryError> {
    let content = data["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| SummaryError::Malformed("missing message content".into()))?;

    let bullets = parse_bullets(content);
    if bullets.is_empty() {
        return Err(SummaryError::Malformed("no bullet points in reply".into()));
    }
    Ok(bullets)
}

/// One bullet per non-blank line, list markers removed.
pub fn parse_bullets(content: &str) -> Vec<String> {
    content
        .lines()
        .map(strip_marker)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_marker(line: &str) -> &str {
    let line = line.trim();
    for marker in ["- ", "* ", "• ", "– "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim();
        }
    }

    // Numbered lists: "1. text" / "2) text"
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest.trim();
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bullets_lose_their_markers() {
        let reply = "- first point\n* second point\n\n• third point\n1. fourth point\n2) fifth point\n";
        assert_eq!(
            parse_bullets(reply),
            vec![
                "first point",
                "second point",
                "third point",
                "fourth point",
                "fifth point"
            ]
        );
    }

    #[test]
    fn unmarked_lines_are_kept_as_is() {
        assert_eq!(parse_bullets("  plain line  \n2024 budget"), vec!["plain line", "2024 budget"]);
    }

    #[test]
    fn completion_content_is_extracted() {
        let data = json!({
            "choices": [{ "message": { "role": "assistant", "content": "- alpha\n- beta" } }]
        });
        assert_eq!(parse_completion(&data).unwrap(), vec!["alpha", "beta"]);
    }

    #[test]
    fn missing_or_empty_content_is_malformed() {
        let no_choices = json!({ "error": { "message": "bad" } });
        assert!(matches!(parse_completion(&no_choices), Err(SummaryError::Malformed(_))));

        let blank = json!({ "choices": [{ "message": { "content": " \n \n" } }] });
        assert!(matches!(parse_completion(&blank), Err(SummaryError::Malformed(_))));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 50), "short");
    }

    #[test]
    fn construction_requires_a_key() {
        let cfg = SummarizerConfig::default();
        assert!(matches!(
            OpenAiSummarizer::new(&cfg, None),
            Err(SummaryError::MissingApiKey)
        ));
        assert!(matches!(
            OpenAiSummarizer::new(&cfg, Some("  ".into())),
            Err(SummaryError::MissingApiKey)
        ));
        assert!(OpenAiSummarizer::new(&cfg, Some("sk-test".into())).is_ok());
    }
}
