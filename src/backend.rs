use crate::audio::playback::{PlaybackCommand, PlaybackEvent};
use crate::config::Config;
use crate::protocol::{AnswerResponse, TtsResponse};
use anyhow::{Context, Result};
use base64::Engine;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// One question-answering round trip. Exactly one of these is produced per
/// completed hold gesture with a non-empty transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct AskRequest {
    pub question: String,
    pub document_ids: Vec<String>,
}

/// Outcome of a question-answering round trip, fed back into the event loop.
#[derive(Debug, Clone)]
pub enum AnswerEvent {
    Answer(AnswerResponse),
    Failed(String),
}

/// Thin client for the two remote collaborators: the question-answering
/// backend and the text-to-speech service.
pub struct Backend {
    client: Client,
    qa_url: String,
    api_token: &'static str,
    tts_url: String,
    config: Config,
    user_agent: String,
}

impl Backend {
    pub fn new(config: Config) -> Result<Self> {
        let base = Url::parse(config.backend_base_url)
            .with_context(|| format!("Invalid backend base URL: {}", config.backend_base_url))?;
        let qa_url = format!("{}/api/qa/ask", base.as_str().trim_end_matches('/'));

        // TTS服务通过URL参数携带key
        let tts_url = if config.tts_api_key.is_empty() {
            config.tts_url.to_string()
        } else {
            format!("{}?key={}", config.tts_url, config.tts_api_key)
        };

        let user_agent = format!("{}/{}", env!("APP_NAME"), env!("APP_VERSION"));

        Ok(Self {
            client: Client::new(),
            qa_url,
            api_token: config.backend_api_token,
            tts_url,
            config,
            user_agent,
        })
    }

    /// Ask the backend a question about the selected documents.
    pub async fn ask_question(
        &self,
        question: &str,
        document_ids: &[String],
    ) -> Result<AnswerResponse> {
        let body = json!({
            "question": question,
            "document_ids": document_ids,
        });

        let response = self
            .client
            .post(&self.qa_url)
            .bearer_auth(self.api_token)
            .header("Device-Id", &self.config.device_id)
            .header("Client-Id", &self.config.client_id)
            .header("User-Agent", &self.user_agent)
            .json(&body)
            .send()
            .await
            .context("Question-answering request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("{}", status_message(status));
        }

        response
            .json::<AnswerResponse>()
            .await
            .context("Failed to parse question-answering response")
    }

    /// Synthesize speech for `text`, returning the raw encoded audio bytes.
    pub async fn text_to_speech(&self, text: &str) -> Result<Bytes> {
        let body = json!({
            "input": { "text": text },
            "voice": {
                "languageCode": self.config.tts_voice_language,
                "name": self.config.tts_voice_name,
                "ssmlGender": self.config.tts_voice_gender,
            },
            "audioConfig": {
                "audioEncoding": self.config.tts_audio_encoding,
                "pitch": 0,
                "speakingRate": 1,
                "volumeGainDb": 0,
                "effectsProfileId": ["small-bluetooth-speaker-class-device"],
            },
        });

        let response = self
            .client
            .post(&self.tts_url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Text-to-speech request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Text-to-speech request failed with status {}", status);
        }

        let tts: TtsResponse = response
            .json()
            .await
            .context("Failed to parse text-to-speech response")?;

        let encoded = match tts.audio_content {
            Some(content) if !content.is_empty() => content,
            _ => anyhow::bail!("No audio content received from text-to-speech service"),
        };

        let audio = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .context("Failed to decode synthesized audio payload")?;

        Ok(Bytes::from(audio))
    }
}

/// User-facing message for an HTTP error status.
pub fn status_message(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "The request was invalid. Please check your input and try again.",
        401 => "You need to be logged in to access this resource.",
        403 => "You don't have permission to access this resource.",
        404 => "The requested resource was not found.",
        409 => "This operation couldn't be completed due to a conflict with existing data.",
        422 => "The provided data is invalid. Please check your input and try again.",
        429 => "Too many requests. Please try again later.",
        500 => "An unexpected error occurred on our servers. Please try again later.",
        502 => "We're having trouble connecting to our servers. Please try again later.",
        503 => "Our service is temporarily unavailable. Please try again later.",
        504 => "The server took too long to respond. Please try again later.",
        _ => "Something went wrong. Please try again later.",
    }
}

/// Runs question-answering round trips off the event loop. One request is in
/// flight at a time; the controller guarantees it never issues a second one
/// while the first is outstanding.
pub async fn qa_task(
    backend: Arc<Backend>,
    mut rx: mpsc::Receiver<AskRequest>,
    tx: mpsc::Sender<AnswerEvent>,
) {
    while let Some(req) = rx.recv().await {
        log::info!(
            "Asking question ({} documents): {}",
            req.document_ids.len(),
            req.question
        );
        let event = match backend.ask_question(&req.question, &req.document_ids).await {
            Ok(answer) => AnswerEvent::Answer(answer),
            Err(e) => {
                log::error!("Question-answering call failed: {:#}", e);
                AnswerEvent::Failed(format!("{:#}", e))
            }
        };
        if tx.send(event).await.is_err() {
            break;
        }
    }
}

/// Fetches synthesized audio for answer text and hands it to the playback
/// thread. Synthesis failures surface as playback errors so the controller
/// resets the same way for both.
pub async fn speak_task(
    backend: Arc<Backend>,
    mut rx: mpsc::Receiver<String>,
    play_tx: mpsc::Sender<PlaybackCommand>,
    event_tx: mpsc::Sender<PlaybackEvent>,
) {
    while let Some(text) = rx.recv().await {
        match backend.text_to_speech(&text).await {
            Ok(audio) => {
                log::info!("Synthesized {} bytes of speech", audio.len());
                if play_tx.send(PlaybackCommand::Play(audio.to_vec())).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                log::error!("Text-to-speech call failed: {:#}", e);
                if event_tx
                    .send(PlaybackEvent::Error(format!("{:#}", e)))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_messages_distinguish_client_errors() {
        assert!(status_message(StatusCode::UNAUTHORIZED).contains("logged in"));
        assert!(status_message(StatusCode::TOO_MANY_REQUESTS).contains("Too many requests"));
        assert_ne!(
            status_message(StatusCode::BAD_REQUEST),
            status_message(StatusCode::UNPROCESSABLE_ENTITY)
        );
    }

    #[test]
    fn unknown_status_falls_back_to_generic_message() {
        assert_eq!(
            status_message(StatusCode::IM_A_TEAPOT),
            "Something went wrong. Please try again later."
        );
    }
}
