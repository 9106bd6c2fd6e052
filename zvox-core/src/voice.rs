//! Voice configurations: a closed union of per-provider variants.
//!
//! Each provider variant owns its identifying fields and range rules; there is
//! no cross-provider validation. Equality is structural, including which
//! variant a value is.

use serde::{Deserialize, Serialize};

/// A provider-specific voice configuration.
///
/// Serialized untagged so a manifest embeds the bare provider object. The
/// Google variant is tried first on deserialization: its extra required fields
/// (`language`, `region`, `type`) keep the two shapes from colliding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Voice {
    Google(GoogleVoice),
    ElevenLabs(ElevenLabsVoice),
}

impl Voice {
    /// Name of the provider this voice belongs to.
    pub fn provider(&self) -> &'static str {
        match self {
            Voice::Google(_) => "google",
            Voice::ElevenLabs(_) => "elevenlabs",
        }
    }
}

/// A Google Cloud Text-to-Speech voice configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleVoice {
    pub voice_id: String,
    pub language: String,
    pub region: String,
    #[serde(rename = "type")]
    pub voice_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaking_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_gain_db: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate_hertz: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects_profile_id: Option<Vec<String>>,
}

impl GoogleVoice {
    pub fn new(voice_id: &str, language: &str, region: &str, voice_type: &str) -> Self {
        GoogleVoice {
            voice_id: voice_id.to_string(),
            language: language.to_string(),
            region: region.to_string(),
            voice_type: voice_type.to_string(),
            speaking_rate: None,
            pitch: None,
            volume_gain_db: None,
            sample_rate_hertz: None,
            effects_profile_id: None,
        }
    }

    /// BCP-47 language code, e.g. `en-US`.
    pub fn language_code(&self) -> String {
        format!("{}-{}", self.language, self.region)
    }

    /// Full API voice name, e.g. `en-US-Wavenet-A`.
    pub fn voice_name(&self) -> String {
        format!("{}-{}-{}", self.language_code(), self.voice_type, self.voice_id)
    }
}

pub const DEFAULT_ELEVENLABS_MODEL: &str = "eleven_multilingual_v2";

/// An ElevenLabs voice configuration. Scalar fields are 0.0..=1.0, enforced at
/// the CLI edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevenLabsVoice {
    pub voice_id: String,
    #[serde(default = "default_model")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_boost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_speaker_boost: Option<bool>,
}

fn default_model() -> Option<String> {
    Some(DEFAULT_ELEVENLABS_MODEL.to_string())
}

impl ElevenLabsVoice {
    pub fn new(voice_id: &str) -> Self {
        ElevenLabsVoice {
            voice_id: voice_id.to_string(),
            model: default_model(),
            stability: None,
            similarity_boost: None,
            style: None,
            use_speaker_boost: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_roundtrip_google() {
        let voice = Voice::Google(GoogleVoice::new("A", "en", "US", "Wavenet"));
        let json = serde_json::to_string(&voice).unwrap();
        let back: Voice = serde_json::from_str(&json).unwrap();
        assert_eq!(back, voice);
        assert_eq!(back.provider(), "google");
    }

    #[test]
    fn untagged_roundtrip_elevenlabs() {
        let voice = Voice::ElevenLabs(ElevenLabsVoice::new("Ford"));
        let json = serde_json::to_string(&voice).unwrap();
        let back: Voice = serde_json::from_str(&json).unwrap();
        assert_eq!(back, voice);
        assert_eq!(back.provider(), "elevenlabs");
    }

    #[test]
    fn elevenlabs_model_defaults() {
        let voice: ElevenLabsVoice = serde_json::from_str(r#"{"voice_id": "Ford"}"#).unwrap();
        assert_eq!(voice, ElevenLabsVoice::new("Ford"));
        assert_eq!(voice.model.as_deref(), Some(DEFAULT_ELEVENLABS_MODEL));
    }

    #[test]
    fn structural_equality_across_variants() {
        let google = Voice::Google(GoogleVoice::new("A", "en", "US", "Wavenet"));
        let eleven = Voice::ElevenLabs(ElevenLabsVoice::new("A"));
        assert_ne!(google, eleven);
    }

    #[test]
    fn google_voice_name() {
        let voice = GoogleVoice::new("A", "en", "GB", "Neural2");
        assert_eq!(voice.language_code(), "en-GB");
        assert_eq!(voice.voice_name(), "en-GB-Neural2-A");
    }
}
