//! Topic segmentation of interview transcripts.
//!
//! [`TopicSegmenter`] asks an OpenAI-compatible chat-completions endpoint to
//! group transcript lines into question-led segments. [`FixedSegments`]
//! replays a segment list loaded from disk, for reruns without the API.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reelcut_models::{parse_segments_json, render_for_prompt, TopicSegment, TranscriptLine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Transcript characters sent to the model; the rest is cut off.
pub const MAX_PROMPT_CHARS: usize = 16_000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const SYSTEM_PROMPT: &str = "\
You are a helpful assistant that segments a YouTube transcript of an interview.
- The interview has two people: an interviewer and a guest.
- The interviewer typically starts with a question or new topic.
- The transcript lines are provided, each in the format: [start=TIMESTAMP] TEXT.
- Please group consecutive lines so that each segment starts with the interviewer's question.
- Make sure you use good time windows for each timestamped text so that the segment doesn't end abruptly and always make sure two segments don't have overlapping ideas.
- Also make sure the segments are not too short, at least 20 seconds long and not more than 1 minute 30 seconds.
- Use the 'start' time of that question as 'start'.
- Use the 'start' time of the next interviewer question as 'end' (or the last line's start if it's the final segment).
- Return valid JSON only: an array of objects, each with:
   { \"topic\": \"...\", \"start\": float, \"end\": float }
- The 'topic' should be a short phrase describing the question or topic.
- 'start' and 'end' must be from the existing [start=...] lines.
- Do not add extra text outside the JSON.
";

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json(.*?)```").expect("fence pattern is valid"));

/// Produces topic segments for a transcript.
#[async_trait]
pub trait Segmenter: Send + Sync {
    async fn segment(&self, transcript: &[TranscriptLine]) -> WorkerResult<Vec<TopicSegment>>;
}

/// Segments known ahead of time.
#[derive(Debug, Clone)]
pub struct FixedSegments(pub Vec<TopicSegment>);

impl FixedSegments {
    /// Load and normalize a JSON segment array.
    pub async fn from_file(path: &std::path::Path) -> WorkerResult<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Ok(Self(parse_segments_json(&json)?))
    }
}

#[async_trait]
impl Segmenter for FixedSegments {
    async fn segment(&self, _transcript: &[TranscriptLine]) -> WorkerResult<Vec<TopicSegment>> {
        Ok(self.0.clone())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI chat-completions segmenter.
#[derive(Debug, Clone)]
pub struct TopicSegmenter {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl TopicSegmenter {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> WorkerResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| WorkerError::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build from worker config; fails without an API key.
    pub fn from_config(config: &WorkerConfig) -> WorkerResult<Self> {
        let key = config.require_openai_key()?;
        Self::new(key, &config.openai_model, &config.openai_base_url)
    }

    async fn complete(&self, user_prompt: &str) -> WorkerResult<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| WorkerError::segmentation_failed(format!("OpenAI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(WorkerError::segmentation_failed(format!(
                "OpenAI API returned {}: {}",
                status, error_text
            )));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            WorkerError::segmentation_failed(format!("Failed to parse OpenAI response: {}", e))
        })?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| WorkerError::segmentation_failed("No content in OpenAI response"))
    }
}

#[async_trait]
impl Segmenter for TopicSegmenter {
    async fn segment(&self, transcript: &[TranscriptLine]) -> WorkerResult<Vec<TopicSegment>> {
        if transcript.is_empty() {
            return Err(WorkerError::transcript_failed("transcript is empty"));
        }

        let prompt = build_user_prompt(&render_for_prompt(transcript));
        info!(
            model = %self.model,
            lines = transcript.len(),
            prompt_chars = prompt.chars().count(),
            "Requesting topic segments"
        );

        let content = self.complete(&prompt).await?;
        let segments = parse_segment_reply(&content)?;

        info!(segments = segments.len(), "Received topic segments");
        Ok(segments)
    }
}

/// User message: the transcript, cut to [`MAX_PROMPT_CHARS`] characters.
pub fn build_user_prompt(transcript: &str) -> String {
    let truncated: String = transcript.chars().take(MAX_PROMPT_CHARS).collect();
    format!(
        "Here is the transcript with timestamps:\n\n{}\n\nPlease return only the JSON array as your answer.",
        truncated
    )
}

/// Body of the first ```json fence, or the whole reply.
pub fn extract_json_block(content: &str) -> &str {
    let content = content.trim();
    JSON_FENCE
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(content)
}

/// Parse a model reply into normalized segments.
pub fn parse_segment_reply(content: &str) -> WorkerResult<Vec<TopicSegment>> {
    let json = extract_json_block(content);
    parse_segments_json(json).map_err(|e| {
        warn!("Unparseable segmentation reply: {}", content);
        debug!(error = %e, "Segment JSON rejected");
        WorkerError::segmentation_failed(format!("Failed to parse segments JSON: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transcript() -> Vec<TranscriptLine> {
        vec![
            TranscriptLine::new("So tell me how it started?", 0.0, 3.0),
            TranscriptLine::new("It started in a garage.", 3.0, 20.0),
            TranscriptLine::new("What came next?", 42.5, 2.0),
        ]
    }

    #[test]
    fn test_extract_json_block() {
        let fenced = "Sure!\n```json\n[{\"topic\":\"a\",\"start\":0,\"end\":1}]\n```\nDone.";
        assert_eq!(
            extract_json_block(fenced).trim(),
            "[{\"topic\":\"a\",\"start\":0,\"end\":1}]"
        );
        assert_eq!(extract_json_block("  [] "), "[]");
    }

    #[test]
    fn test_parse_segment_reply_normalizes() {
        let reply = r#"```json
[
  {"topic": " Later ", "start": "42.5", "end": 90},
  {"topic": "Origins", "start": 0.0, "end": 42.5},
  {"topic": "Backwards", "start": 10, "end": 5}
]
```"#;
        let segments = parse_segment_reply(reply).unwrap();
        assert_eq!(
            segments,
            vec![
                TopicSegment::new("Origins", 0.0, 42.5),
                TopicSegment::new("Later", 42.5, 90.0),
            ]
        );
    }

    #[test]
    fn test_parse_segment_reply_rejects_prose() {
        let result = parse_segment_reply("I could not find any topics.");
        assert!(matches!(result, Err(WorkerError::SegmentationFailed(_))));
    }

    #[test]
    fn test_user_prompt_is_truncated() {
        let long = "x".repeat(MAX_PROMPT_CHARS + 500);
        let prompt = build_user_prompt(&long);
        assert_eq!(prompt.matches('x').count(), MAX_PROMPT_CHARS);
        assert!(prompt.ends_with("Please return only the JSON array as your answer."));
    }

    #[tokio::test]
    async fn test_segment_via_chat_completions() {
        let server = MockServer::start().await;
        let reply = serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "```json\n[{\"topic\":\"Origins\",\"start\":0.0,\"end\":42.5}]\n```"
                }
            }]
        });

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4",
                "temperature": 0.0
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply))
            .expect(1)
            .mount(&server)
            .await;

        let segmenter =
            TopicSegmenter::new("sk-test", "gpt-4", format!("{}/v1/", server.uri())).unwrap();
        let segments = segmenter.segment(&transcript()).await.unwrap();

        assert_eq!(segments, vec![TopicSegment::new("Origins", 0.0, 42.5)]);
    }

    #[tokio::test]
    async fn test_api_error_is_segmentation_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let segmenter = TopicSegmenter::new("sk-test", "gpt-4", server.uri()).unwrap();
        let err = segmenter.segment(&transcript()).await.unwrap_err();

        assert!(err.is_retryable());
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_empty_transcript_skips_request() {
        let segmenter = TopicSegmenter::new("sk-test", "gpt-4", "http://127.0.0.1:9").unwrap();
        let err = segmenter.segment(&[]).await.unwrap_err();
        assert!(matches!(err, WorkerError::TranscriptFailed(_)));
    }

    #[tokio::test]
    async fn test_fixed_segments_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("segments.json");
        tokio::fs::write(&path, r#"[{"topic":"B","start":5,"end":9},{"topic":"A","start":1,"end":4}]"#)
            .await
            .unwrap();

        let fixed = FixedSegments::from_file(&path).await.unwrap();
        let segments = fixed.segment(&[]).await.unwrap();
        assert_eq!(segments[0].topic, "A");
        assert_eq!(segments.len(), 2);
    }
}
