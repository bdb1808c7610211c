//! Meeting transcription backend
//!
//! Wraps an AssemblyAI-shaped HTTP API: upload the audio bytes, request a
//! transcript with summarization and highlight extraction, then poll until
//! the job completes. Mock mode returns canned text so the rest of the
//! pipeline works without vendor credentials.

use sapphire_common::config::{AiConfig, AiMode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Transcription backend errors
#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Transcription job failed: {0}")]
    JobFailed(String),

    #[error("Timed out waiting for transcript completion")]
    Timeout,

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Transcript, summary, and action items extracted from one recording
#[derive(Debug, Clone)]
pub struct MeetingInsights {
    pub transcript: String,
    pub summary: String,
    pub action_items: Vec<String>,
}

/// Transcription backend, resolved once at startup
pub enum Transcriber {
    Mock,
    Live(LiveTranscriber),
}

impl Transcriber {
    pub fn from_config(config: &AiConfig) -> sapphire_common::Result<Self> {
        match config.mode {
            AiMode::Mock => {
                info!("Transcription mock mode enabled; returning placeholder transcripts");
                Ok(Transcriber::Mock)
            }
            AiMode::Live => {
                let api_key = config.api_key.clone().ok_or_else(|| {
                    sapphire_common::Error::Config(
                        "AI mode 'live' requires an API key".to_string(),
                    )
                })?;
                Ok(Transcriber::Live(LiveTranscriber::new(config, api_key)?))
            }
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, Transcriber::Mock)
    }

    /// Produce insights for an uploaded recording
    pub async fn generate(
        &self,
        audio: &[u8],
        original_name: &str,
    ) -> Result<MeetingInsights, TranscriptionError> {
        match self {
            Transcriber::Mock => Ok(MeetingInsights {
                transcript: format!("Mock transcript for {}.", original_name),
                summary: format!("Mock summary generated locally for {}.", original_name),
                action_items: vec![
                    "Review recording and capture notes".to_string(),
                    "Assign follow-ups to attendees".to_string(),
                ],
            }),
            Transcriber::Live(live) => live.generate(audio).await,
        }
    }
}

/// Live client against the vendor transcription API
pub struct LiveTranscriber {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    summary_model: String,
    summary_type: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

#[derive(Debug, Deserialize)]
struct UploadedAudio {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptJob {
    id: String,
    status: String,
    text: Option<String>,
    summary: Option<String>,
    error: Option<String>,
    auto_highlights_result: Option<Highlights>,
}

#[derive(Debug, Deserialize)]
struct Highlights {
    #[serde(default)]
    results: Vec<Highlight>,
}

#[derive(Debug, Deserialize)]
struct Highlight {
    text: String,
}

impl LiveTranscriber {
    fn new(config: &AiConfig, api_key: String) -> sapphire_common::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                sapphire_common::Error::Config(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            summary_model: config.summary_model.clone(),
            summary_type: config.summary_type.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_poll_attempts: config.max_poll_attempts,
        })
    }

    async fn generate(&self, audio: &[u8]) -> Result<MeetingInsights, TranscriptionError> {
        let upload_url = self.upload_audio(audio).await?;
        let job_id = self.request_transcript(&upload_url).await?;
        let job = self.poll_until_complete(&job_id).await?;

        let action_items = job
            .auto_highlights_result
            .map(|h| h.results.into_iter().take(5).map(|r| r.text).collect())
            .unwrap_or_default();

        Ok(MeetingInsights {
            transcript: job.text.unwrap_or_default(),
            summary: job.summary.unwrap_or_default(),
            action_items,
        })
    }

    /// Upload raw audio bytes, returning the vendor-hosted URL
    async fn upload_audio(&self, audio: &[u8]) -> Result<String, TranscriptionError> {
        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .header("authorization", &self.api_key)
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| TranscriptionError::Network(e.to_string()))?;

        let uploaded: UploadedAudio = Self::parse_response(response).await?;
        Ok(uploaded.upload_url)
    }

    /// Create the transcription job with summarization + highlights enabled
    async fn request_transcript(&self, audio_url: &str) -> Result<String, TranscriptionError> {
        let body = json!({
            "audio_url": audio_url,
            "summarization": true,
            "summary_model": self.summary_model,
            "summary_type": self.summary_type,
            "auto_highlights": true,
        });

        let response = self
            .http
            .post(format!("{}/transcript", self.base_url))
            .header("authorization", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TranscriptionError::Network(e.to_string()))?;

        let job: TranscriptJob = Self::parse_response(response).await?;
        Ok(job.id)
    }

    async fn poll_until_complete(&self, job_id: &str) -> Result<TranscriptJob, TranscriptionError> {
        for attempt in 0..self.max_poll_attempts {
            let response = self
                .http
                .get(format!("{}/transcript/{}", self.base_url, job_id))
                .header("authorization", &self.api_key)
                .send()
                .await
                .map_err(|e| TranscriptionError::Network(e.to_string()))?;

            let job: TranscriptJob = Self::parse_response(response).await?;
            match job.status.as_str() {
                "completed" => return Ok(job),
                "error" => {
                    return Err(TranscriptionError::JobFailed(
                        job.error.unwrap_or_else(|| "unknown error".to_string()),
                    ))
                }
                status => {
                    debug!(
                        "Transcript {} still {} (attempt {}/{})",
                        job_id,
                        status,
                        attempt + 1,
                        self.max_poll_attempts
                    );
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }

        Err(TranscriptionError::Timeout)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TranscriptionError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Api(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| TranscriptionError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_insights_mention_the_recording() {
        let transcriber = Transcriber::Mock;
        let insights = transcriber
            .generate(b"not real audio", "standup.mp3")
            .await
            .unwrap();

        assert!(insights.transcript.contains("standup.mp3"));
        assert!(insights.summary.contains("standup.mp3"));
        assert_eq!(insights.action_items.len(), 2);
    }

    #[test]
    fn transcript_job_parses_vendor_payload() {
        let payload = r#"{
            "id": "tr_123",
            "status": "completed",
            "text": "hello world",
            "summary": "- greeting",
            "auto_highlights_result": {
                "results": [
                    {"text": "hello"},
                    {"text": "world"}
                ]
            }
        }"#;

        let job: TranscriptJob = serde_json::from_str(payload).unwrap();
        assert_eq!(job.status, "completed");
        assert_eq!(job.text.as_deref(), Some("hello world"));
        assert_eq!(job.auto_highlights_result.unwrap().results.len(), 2);
    }
}
