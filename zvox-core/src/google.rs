//! Google Cloud Text-to-Speech encoder (REST `text:synthesize` endpoint).

use std::path::Path;
use std::time::Duration;

use base64::prelude::{Engine, BASE64_STANDARD};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::encoder::{Encoder, EncoderOptions};
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::voice::{GoogleVoice, Voice};

const DEFAULT_ENDPOINT: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";
const API_KEY_ENV: &str = "GOOGLE_API_KEY";
const DEFAULT_AUDIO_FORMAT: &str = "linear16";

/// File extension and API encoding name for each supported audio format.
fn audio_info(format: &str) -> Option<(&'static str, &'static str)> {
    match format {
        "linear16" => Some(("wav", "LINEAR16")),
        "mp3_44100_32" => Some(("mp3", "MP3")),
        "ogg_opus" => Some(("ogg", "OGG_OPUS")),
        "mulaw" => Some(("wav", "MULAW")),
        "alaw" => Some(("wav", "ALAW")),
        _ => None,
    }
}

/// JSON request body for one synthesis call. Optional tuning fields are only
/// present when set on the voice.
fn synthesis_request(text: &str, voice: &GoogleVoice, audio_encoding: &str) -> Value {
    let mut audio_config = serde_json::Map::new();
    audio_config.insert("audioEncoding".to_string(), json!(audio_encoding));
    if let Some(rate) = voice.speaking_rate {
        audio_config.insert("speakingRate".to_string(), json!(rate));
    }
    if let Some(pitch) = voice.pitch {
        audio_config.insert("pitch".to_string(), json!(pitch));
    }
    if let Some(gain) = voice.volume_gain_db {
        audio_config.insert("volumeGainDb".to_string(), json!(gain));
    }
    if let Some(hertz) = voice.sample_rate_hertz {
        audio_config.insert("sampleRateHertz".to_string(), json!(hertz));
    }
    if let Some(ref profiles) = voice.effects_profile_id {
        audio_config.insert("effectsProfileId".to_string(), json!(profiles));
    }
    json!({
        "input": {"text": text},
        "voice": {
            "languageCode": voice.language_code(),
            "name": voice.voice_name(),
        },
        "audioConfig": Value::Object(audio_config),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// Encoder backed by the Google Cloud Text-to-Speech API.
pub struct GoogleEncoder {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
    audio_format: String,
    retry: RetryPolicy,
}

impl GoogleEncoder {
    pub fn new(options: &EncoderOptions) -> Self {
        GoogleEncoder {
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
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

    /// Point at a different endpoint, e.g. a local test server.
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    fn audio_encoding(&self) -> Result<&'static str> {
        audio_info(&self.audio_format)
            .map(|(_, encoding)| encoding)
            .ok_or_else(|| {
                Error::input(format!(
                    "audio format \"{}\" is not supported by the google encoder",
                    self.audio_format
                ))
            })
    }

    fn synthesize(&self, body: &Value, path: &Path) -> Result<()> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::input(format!("no Google API key ({API_KEY_ENV})")))?;
        self.retry.run(|| {
            let response = self
                .client
                .post(&self.endpoint)
                .header("x-goog-api-key", api_key)
                .json(body)
                .send()
                .map_err(|err| Error::provider("google", err.to_string()))?;
            if !response.status().is_success() {
                return Err(Error::provider(
                    "google",
                    format!("synthesize returned {}", response.status()),
                ));
            }
            let parsed: SynthesizeResponse = response
                .json()
                .map_err(|err| Error::provider("google", err.to_string()))?;
            let audio = BASE64_STANDARD
                .decode(&parsed.audio_content)
                .map_err(|err| Error::provider("google", err.to_string()))?;
            std::fs::write(path, audio)?;
            Ok(())
        })
    }
}

impl Encoder for GoogleEncoder {
    fn name(&self) -> &'static str {
        "google"
    }

    fn audio_format(&self) -> &str {
        &self.audio_format
    }

    fn file_extension(&self) -> Result<&'static str> {
        audio_info(&self.audio_format)
            .map(|(ext, _)| ext)
            .ok_or_else(|| {
                Error::input(format!(
                    "audio format \"{}\" is not supported by the google encoder",
                    self.audio_format
                ))
            })
    }

    fn t2s(&self, text: &str, voice: &Voice, path: &Path) -> Result<()> {
        let Voice::Google(voice) = voice else {
            return Err(Error::VoiceMismatch { expected: "google" });
        };
        let body = synthesis_request(text, voice, self.audio_encoding()?);
        self.synthesize(&body, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::ElevenLabsVoice;

    fn encoder(format: &str) -> GoogleEncoder {
        GoogleEncoder::new(&EncoderOptions {
            audio_format: Some(format.to_string()),
            api_key: Some("test-key".to_string()),
        })
    }

    #[test]
    fn file_extensions_per_format() {
        assert_eq!(encoder("linear16").file_extension().unwrap(), "wav");
        assert_eq!(encoder("mp3_44100_32").file_extension().unwrap(), "mp3");
        assert_eq!(encoder("ogg_opus").file_extension().unwrap(), "ogg");
        assert!(matches!(
            encoder("flac").file_extension(),
            Err(Error::Input(_))
        ));
    }

    #[test]
    fn t2s_rejects_foreign_voice() {
        let voice = Voice::ElevenLabs(ElevenLabsVoice::new("Ford"));
        let err = encoder("linear16")
            .t2s("hi", &voice, Path::new("/tmp/never-written.wav"))
            .unwrap_err();
        assert!(matches!(err, Error::VoiceMismatch { expected: "google" }));
    }

    #[test]
    fn request_includes_only_set_tuning_fields() {
        let mut voice = GoogleVoice::new("A", "en", "US", "Wavenet");
        voice.speaking_rate = Some(0.9);
        let body = synthesis_request("hello", &voice, "LINEAR16");

        assert_eq!(body["input"]["text"], "hello");
        assert_eq!(body["voice"]["languageCode"], "en-US");
        assert_eq!(body["voice"]["name"], "en-US-Wavenet-A");
        assert_eq!(body["audioConfig"]["audioEncoding"], "LINEAR16");
        assert_eq!(body["audioConfig"]["speakingRate"], 0.9);
        assert!(body["audioConfig"].get("pitch").is_none());
    }
}
