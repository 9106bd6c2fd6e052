//! Named voice registry: symbolic name to per-provider voice bundles.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::voice::{ElevenLabsVoice, GoogleVoice, Voice};

/// Per-provider voice configurations under one symbolic name. At most one
/// slot per provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google: Option<GoogleVoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevenlabs: Option<ElevenLabsVoice>,
}

impl VoiceBundle {
    /// The slot matching `provider`, if populated.
    pub fn provider_voice(&self, provider: &str) -> Option<Voice> {
        match provider {
            "google" => self.google.clone().map(Voice::Google),
            "elevenlabs" => self.elevenlabs.clone().map(Voice::ElevenLabs),
            _ => None,
        }
    }
}

/// Registry of named voices, merged once at startup and read-only after.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedVoices {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voices: Option<BTreeMap<String, VoiceBundle>>,
}

impl NamedVoices {
    /// Parse from a `{"voices": {...}}` JSON document.
    pub fn from_json(s: &str) -> Result<Self> {
        let voices: NamedVoices = serde_json::from_str(s)?;
        Ok(voices)
    }

    /// Load from a file path.
    pub fn load_path(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json(&s)
    }

    /// Merges `incoming` into the registry. Names already present win ties, so
    /// explicit file-level overrides are never lost to manifest-embedded
    /// entries.
    pub fn add_voices(&mut self, incoming: Option<&BTreeMap<String, VoiceBundle>>) {
        let Some(incoming) = incoming else {
            return;
        };
        if incoming.is_empty() {
            return;
        }
        let table = self.voices.get_or_insert_with(BTreeMap::new);
        for (name, bundle) in incoming {
            table
                .entry(name.clone())
                .or_insert_with(|| bundle.clone());
        }
    }

    /// Per-name voices for one provider. Names whose bundle has no slot for
    /// the provider map to `None`. Empty when no provider is given or the
    /// registry is empty.
    pub fn encoder_voices(&self, provider: Option<&str>) -> BTreeMap<String, Option<Voice>> {
        let mut resolved = BTreeMap::new();
        if let (Some(table), Some(provider)) = (&self.voices, provider) {
            for (name, bundle) in table {
                resolved.insert(name.clone(), bundle.provider_voice(provider));
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOICES_JSON: &str = r#"{
        "voices": {
            "voice_1": {
                "google": {
                    "voice_id": "A",
                    "language": "en",
                    "region": "US",
                    "type": "Wavenet"
                },
                "elevenlabs": {"voice_id": "Ford"}
            },
            "voice_2": {
                "elevenlabs": {
                    "voice_id": "Arthur",
                    "model": "eleven_multilingual_v2"
                }
            }
        }
    }"#;

    #[test]
    fn encoder_voices_google() {
        let voices = NamedVoices::from_json(VOICES_JSON).unwrap();
        let google = voices.encoder_voices(Some("google"));
        assert_eq!(
            google.get("voice_1").unwrap(),
            &Some(Voice::Google(GoogleVoice::new("A", "en", "US", "Wavenet")))
        );
        assert_eq!(google.get("voice_2").unwrap(), &None);
    }

    #[test]
    fn encoder_voices_elevenlabs() {
        let voices = NamedVoices::from_json(VOICES_JSON).unwrap();
        let eleven = voices.encoder_voices(Some("elevenlabs"));
        assert_eq!(
            eleven.get("voice_1").unwrap(),
            &Some(Voice::ElevenLabs(ElevenLabsVoice::new("Ford")))
        );
        assert_eq!(
            eleven.get("voice_2").unwrap(),
            &Some(Voice::ElevenLabs(ElevenLabsVoice::new("Arthur")))
        );
    }

    #[test]
    fn encoder_voices_empty_registry() {
        let voices = NamedVoices::default();
        assert!(voices.encoder_voices(Some("google")).is_empty());
        assert!(voices.encoder_voices(None).is_empty());
    }

    #[test]
    fn add_voices_never_overwrites() {
        let mut voices = NamedVoices::from_json(VOICES_JSON).unwrap();
        let mut incoming = BTreeMap::new();
        incoming.insert(
            "voice_1".to_string(),
            VoiceBundle {
                google: Some(GoogleVoice::new("Z", "fr", "FR", "Standard")),
                elevenlabs: None,
            },
        );
        incoming.insert(
            "voice_3".to_string(),
            VoiceBundle {
                elevenlabs: Some(ElevenLabsVoice::new("Zaphod")),
                google: None,
            },
        );
        voices.add_voices(Some(&incoming));

        let table = voices.voices.unwrap();
        // Existing entry untouched, new entry added.
        assert_eq!(table["voice_1"].google.as_ref().unwrap().voice_id, "A");
        assert!(table.contains_key("voice_3"));
    }

    #[test]
    fn add_voices_into_empty_registry() {
        let mut voices = NamedVoices::default();
        voices.add_voices(None);
        assert!(voices.voices.is_none());

        let mut incoming = BTreeMap::new();
        incoming.insert("n".to_string(), VoiceBundle::default());
        voices.add_voices(Some(&incoming));
        assert!(voices.voices.unwrap().contains_key("n"));
    }
}
