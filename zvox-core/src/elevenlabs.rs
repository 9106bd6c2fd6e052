//! ElevenLabs text-to-speech encoder (REST API).

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::encoder::{Encoder, EncoderOptions};
use crate::error::{Error, Result};
use crate::progress::Progress;
use crate::retry::RetryPolicy;
use crate::voice::{ElevenLabsVoice, Voice};

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";
const API_KEY_ENV: &str = "ELEVENLABS_API_KEY";
const DEFAULT_AUDIO_FORMAT: &str = "mp3_44100_128";
const HISTORY_PAGE_SIZE: u32 = 100;

fn file_extension_for(format: &str) -> Option<&'static str> {
    match format {
        "mp3_44100_64" | "mp3_44100_96" | "mp3_44100_128" | "mp3_44100_192" => Some("mp3"),
        "pcm_16000" | "pcm_22050" | "pcm_24000" | "pcm_44100" | "ulaw_8000" => Some("wav"),
        _ => None,
    }
}

/// JSON request body for one synthesis call; `voice_settings` carries only
/// the scalars actually set on the voice.
fn synthesis_request(text: &str, voice: &ElevenLabsVoice) -> Value {
    let mut body = serde_json::Map::new();
    body.insert("text".to_string(), json!(text));
    if let Some(ref model) = voice.model {
        body.insert("model_id".to_string(), json!(model));
    }
    let mut settings = serde_json::Map::new();
    if let Some(stability) = voice.stability {
        settings.insert("stability".to_string(), json!(stability));
    }
    if let Some(boost) = voice.similarity_boost {
        settings.insert("similarity_boost".to_string(), json!(boost));
    }
    if let Some(style) = voice.style {
        settings.insert("style".to_string(), json!(style));
    }
    if let Some(speaker_boost) = voice.use_speaker_boost {
        settings.insert("use_speaker_boost".to_string(), json!(speaker_boost));
    }
    if !settings.is_empty() {
        body.insert("voice_settings".to_string(), Value::Object(settings));
    }
    Value::Object(body)
}

#[derive(Deserialize)]
struct HistoryItem {
    history_item_id: String,
}

#[derive(Deserialize)]
struct HistoryPage {
    history: Vec<HistoryItem>,
    #[serde(default)]
    has_more: bool,
}

/// Encoder backed by the ElevenLabs text-to-speech API.
pub struct ElevenLabsEncoder {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
    audio_format: String,
    retry: RetryPolicy,
}

impl ElevenLabsEncoder {
    pub fn new(options: &EncoderOptions) -> Self {
        ElevenLabsEncoder {
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: options
                .api_key
                .clone()
                .or_else(|| std::env::var(API_KEY_ENV).ok()),
            audio_format: options
                .audio_format
                .clone()
                .unwrap_or_else(|| DEFAULT_AUDIO_FORMAT.to_string()),
            retry: RetryPolicy::default(),
        }
    }

    /// Point at a different API host, e.g. a local test server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::input(format!("no ElevenLabs API key ({API_KEY_ENV})")))
    }

    fn history_page(&self) -> Result<HistoryPage> {
        let api_key = self.api_key()?;
        let response = self
            .client
            .get(format!("{}/v1/history", self.base_url))
            .query(&[("page_size", HISTORY_PAGE_SIZE)])
            .header("xi-api-key", api_key)
            .send()
            .map_err(|err| Error::provider("elevenlabs", err.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::provider(
                "elevenlabs",
                format!("history returned {}", response.status()),
            ));
        }
        response
            .json()
            .map_err(|err| Error::provider("elevenlabs", err.to_string()))
    }

    /// Deletes all synthesis history items, page by page.
    pub fn delete_history(&self) -> Result<()> {
        loop {
            let page = self.retry.run(|| self.history_page())?;
            if page.history.is_empty() {
                return Ok(());
            }
            let progress = Progress::new("Deleting history", page.history.len() as u64);
            for item in &page.history {
                let api_key = self.api_key()?;
                self.retry.run(|| {
                    let response = self
                        .client
                        .delete(format!(
                            "{}/v1/history/{}",
                            self.base_url, item.history_item_id
                        ))
                        .header("xi-api-key", api_key)
                        .send()
                        .map_err(|err| Error::provider("elevenlabs", err.to_string()))?;
                    if !response.status().is_success() {
                        return Err(Error::provider(
                            "elevenlabs",
                            format!("history delete returned {}", response.status()),
                        ));
                    }
                    Ok(())
                })?;
                progress.inc(1);
            }
            progress.finish();
            if !page.has_more {
                return Ok(());
            }
        }
    }
}

impl Encoder for ElevenLabsEncoder {
    fn name(&self) -> &'static str {
        "elevenlabs"
    }

    fn audio_format(&self) -> &str {
        &self.audio_format
    }

    fn file_extension(&self) -> Result<&'static str> {
        file_extension_for(&self.audio_format).ok_or_else(|| {
            Error::input(format!(
                "audio format \"{}\" is not supported by the elevenlabs encoder",
                self.audio_format
            ))
        })
    }

    fn t2s(&self, text: &str, voice: &Voice, path: &Path) -> Result<()> {
        let Voice::ElevenLabs(voice) = voice else {
            return Err(Error::VoiceMismatch {
                expected: "elevenlabs",
            });
        };
        let api_key = self.api_key()?;
        let url = format!("{}/v1/text-to-speech/{}", self.base_url, voice.voice_id);
        let body = synthesis_request(text, voice);
        self.retry.run(|| {
            let response = self
                .client
                .post(&url)
                .query(&[("output_format", self.audio_format.as_str())])
                .header("xi-api-key", api_key)
                .json(&body)
                .send()
                .map_err(|err| Error::provider("elevenlabs", err.to_string()))?;
            if !response.status().is_success() {
                return Err(Error::provider(
                    "elevenlabs",
                    format!("text-to-speech returned {}", response.status()),
                ));
            }
            let audio = response
                .bytes()
                .map_err(|err| Error::provider("elevenlabs", err.to_string()))?;
            std::fs::write(path, &audio)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::GoogleVoice;

    fn encoder(format: &str) -> ElevenLabsEncoder {
        ElevenLabsEncoder::new(&EncoderOptions {
            audio_format: Some(format.to_string()),
            api_key: Some("test-key".to_string()),
        })
    }

    #[test]
    fn file_extensions_per_format() {
        assert_eq!(encoder("mp3_44100_128").file_extension().unwrap(), "mp3");
        assert_eq!(encoder("pcm_22050").file_extension().unwrap(), "wav");
        assert_eq!(encoder("ulaw_8000").file_extension().unwrap(), "wav");
        assert!(matches!(
            encoder("opus_48000").file_extension(),
            Err(Error::Input(_))
        ));
    }

    #[test]
    fn t2s_rejects_foreign_voice() {
        let voice = Voice::Google(GoogleVoice::new("A", "en", "US", "Wavenet"));
        let err = encoder("mp3_44100_128")
            .t2s("hi", &voice, Path::new("/tmp/never-written.mp3"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::VoiceMismatch {
                expected: "elevenlabs"
            }
        ));
    }

    #[test]
    fn request_omits_empty_voice_settings() {
        let voice = ElevenLabsVoice::new("Ford");
        let body = synthesis_request("hello", &voice);
        assert_eq!(body["text"], "hello");
        assert_eq!(body["model_id"], "eleven_multilingual_v2");
        assert!(body.get("voice_settings").is_none());

        let mut tuned = ElevenLabsVoice::new("Ford");
        tuned.stability = Some(0.4);
        let body = synthesis_request("hello", &tuned);
        assert_eq!(body["voice_settings"]["stability"], 0.4);
    }
}
