//! Manifest: the persisted plan of speech fragments plus referenced voices.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::voice::Voice;
use crate::voices::VoiceBundle;

/// One planned unit of speech or silence, destined for one audio file.
///
/// Empty `text` signals silence: voice fields are irrelevant and cleared at
/// planning time, and `silence_duration` governs whether a silent file is
/// produced at all. `voice_name` is the source of a binding, `voice` the
/// resolved form; persisting the name lets a manifest re-resolve correctly
/// under a different provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<Voice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_name: Option<String>,
    /// Milliseconds of silence; only meaningful when `text` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silence_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded: Option<DateTime<Utc>>,
}

impl Fragment {
    pub fn new(text: &str, voice: Option<Voice>, voice_name: Option<String>) -> Self {
        Fragment {
            text: text.to_string(),
            voice,
            voice_name,
            ..Fragment::default()
        }
    }

    /// An empty-text fragment marking a paragraph/silence break.
    pub fn silence(duration: Option<u64>) -> Self {
        Fragment {
            silence_duration: duration,
            ..Fragment::default()
        }
    }
}

/// Ordered fragments plus the subset of named voices they reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub fragments: Vec<Fragment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voices: Option<BTreeMap<String, VoiceBundle>>,
}

impl Manifest {
    /// Parse from a JSON document.
    pub fn from_json(s: &str) -> Result<Self> {
        let manifest: Manifest = serde_json::from_str(s)?;
        Ok(manifest)
    }

    pub fn to_json(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(json)
    }

    /// Load from a file path.
    pub fn load_path(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json(&s)
    }

    /// Write to a file path.
    pub fn save_path(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Derives an encoding plan from parsed fragments: deterministic
    /// zero-padded filenames by ordinal position, silence defaults for empty
    /// fragments. Pure and re-entrant; the same inputs always produce the
    /// same plan.
    pub fn plan(
        fragments: &[Fragment],
        basename: &str,
        file_ext: &str,
        silence_duration: Option<u64>,
    ) -> Manifest {
        let mut manifest = Manifest::default();
        for (i, fragment) in fragments.iter().enumerate() {
            let mut planned = Fragment {
                text: fragment.text.clone(),
                filename: Some(format!("{basename}-{i:05}.{file_ext}")),
                voice: fragment.voice.clone(),
                voice_name: fragment.voice_name.clone(),
                ..Fragment::default()
            };
            if planned.text.is_empty() {
                planned.voice = None;
                planned.voice_name = None;
                planned.silence_duration = silence_duration.or(fragment.silence_duration);
            }
            manifest.fragments.push(planned);
        }
        manifest
    }

    /// Recomputes the embedded voice table as exactly the subset of
    /// `voice_table` referenced by fragment `voice_name`s. An empty subset
    /// clears the table entirely rather than persisting an empty map.
    pub fn set_used_voices(&mut self, voice_table: Option<&BTreeMap<String, VoiceBundle>>) {
        self.voices = None;
        let Some(table) = voice_table else {
            return;
        };
        let used: BTreeSet<&String> = self
            .fragments
            .iter()
            .filter_map(|f| f.voice_name.as_ref())
            .collect();
        let subset: BTreeMap<String, VoiceBundle> = used
            .into_iter()
            .filter_map(|name| table.get(name).map(|b| (name.clone(), b.clone())))
            .collect();
        if !subset.is_empty() {
            self.voices = Some(subset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::{GoogleVoice, Voice};

    fn google_voice() -> Voice {
        Voice::Google(GoogleVoice::new("A", "en", "US", "Wavenet"))
    }

    #[test]
    fn plan_assigns_ordinal_filenames() {
        let fragments = vec![
            Fragment::new("one", Some(google_voice()), None),
            Fragment::silence(None),
            Fragment::new("two", Some(google_voice()), None),
        ];
        let manifest = Manifest::plan(&fragments, "book", "wav", Some(500));

        let names: Vec<_> = manifest
            .fragments
            .iter()
            .map(|f| f.filename.clone().unwrap())
            .collect();
        assert_eq!(names, ["book-00000.wav", "book-00001.wav", "book-00002.wav"]);
        assert_eq!(manifest.fragments[0].text, "one");
        assert_eq!(manifest.fragments[0].voice, Some(google_voice()));
        // Empty fragment: voice cleared, silence default applied.
        assert!(manifest.fragments[1].voice.is_none());
        assert_eq!(manifest.fragments[1].silence_duration, Some(500));
    }

    #[test]
    fn plan_is_reentrant() {
        let fragments = vec![Fragment::new("x", Some(google_voice()), None)];
        let first = Manifest::plan(&fragments, "b", "mp3", None);
        let second = Manifest::plan(&fragments, "b", "mp3", None);
        assert_eq!(first, second);
    }

    #[test]
    fn plan_keeps_source_silence_without_override() {
        let fragments = vec![Fragment::silence(Some(250))];
        let manifest = Manifest::plan(&fragments, "b", "wav", None);
        assert_eq!(manifest.fragments[0].silence_duration, Some(250));
    }

    #[test]
    fn set_used_voices_keeps_referenced_subset() {
        let mut table = BTreeMap::new();
        table.insert(
            "joe".to_string(),
            VoiceBundle {
                google: Some(GoogleVoice::new("A", "en", "US", "Wavenet")),
                elevenlabs: None,
            },
        );
        table.insert("unused".to_string(), VoiceBundle::default());

        let mut manifest = Manifest {
            fragments: vec![
                Fragment::new("a", None, Some("joe".to_string())),
                Fragment::new("b", None, Some("missing".to_string())),
            ],
            voices: None,
        };
        manifest.set_used_voices(Some(&table));

        let voices = manifest.voices.unwrap();
        assert_eq!(voices.len(), 1);
        assert!(voices.contains_key("joe"));
    }

    #[test]
    fn set_used_voices_clears_when_nothing_referenced() {
        let mut table = BTreeMap::new();
        table.insert("joe".to_string(), VoiceBundle::default());
        let mut manifest = Manifest {
            fragments: vec![Fragment::new("a", Some(google_voice()), None)],
            voices: Some(table.clone()),
        };
        manifest.set_used_voices(Some(&table));
        assert!(manifest.voices.is_none());
    }

    #[test]
    fn json_roundtrip() {
        let fragments = vec![
            Fragment::new("hello", Some(google_voice()), None),
            Fragment::new("there", None, Some("joe".to_string())),
            Fragment::silence(Some(500)),
        ];
        let manifest = Manifest::plan(&fragments, "book", "wav", None);

        let json = manifest.to_json().unwrap();
        let back = Manifest::from_json(&json).unwrap();
        assert_eq!(back, manifest);
        assert_eq!(back.fragments.len(), 3);
        assert_eq!(back.fragments[1].voice_name.as_deref(), Some("joe"));
    }

    #[test]
    fn from_json_rejects_plain_text() {
        assert!(Manifest::from_json("Once upon a time").is_err());
    }
}
