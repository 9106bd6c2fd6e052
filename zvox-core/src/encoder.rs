//! Encoder contract and the explicit name-to-factory registry.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;

use crate::audio::create_silence;
use crate::elevenlabs::ElevenLabsEncoder;
use crate::error::{Error, Result};
use crate::google::GoogleEncoder;
use crate::manifest::Manifest;
use crate::progress::Progress;
use crate::voice::Voice;

/// Settings shared by all encoder factories.
#[derive(Debug, Clone, Default)]
pub struct EncoderOptions {
    /// Provider-specific audio format name; each encoder has its own default.
    pub audio_format: Option<String>,
    /// API key; falls back to the provider's environment variable.
    pub api_key: Option<String>,
}

/// A text-to-speech backend bound to one provider.
pub trait Encoder {
    fn name(&self) -> &'static str;

    fn audio_format(&self) -> &str;

    /// File extension for the configured audio format. An unsupported format
    /// is an input error.
    fn file_extension(&self) -> Result<&'static str>;

    /// Synthesizes non-empty text at the given voice, writing one audio file.
    /// Fails with a voice mismatch when the variant does not belong to this
    /// provider, or with a provider error once the retry budget is exhausted.
    fn t2s(&self, text: &str, voice: &Voice, path: &Path) -> Result<()>;

    /// Encodes the selected fragments of a manifest into `encode_dir`,
    /// strictly in ordinal order. An index outside the manifest is an input
    /// error.
    ///
    /// Explicit fragment voices take priority over `voice_name` lookups in
    /// `voices`. Empty-text fragments produce a silent file when a duration
    /// is set (the `silence_duration` argument overrides per-fragment
    /// values) and are skipped entirely otherwise: no file, no provenance.
    /// A non-empty fragment with no resolvable voice fails the whole run.
    fn encode_manifest(
        &self,
        manifest: &mut Manifest,
        encode_dir: &Path,
        indexes: Option<&[usize]>,
        voices: &BTreeMap<String, Option<Voice>>,
        silence_duration: Option<u64>,
    ) -> Result<()> {
        let file_ext = self.file_extension()?;
        let selected: Vec<usize> = match indexes {
            Some(indexes) => indexes.to_vec(),
            None => (0..manifest.fragments.len()).collect(),
        };
        let total_chars: u64 = selected
            .iter()
            .filter_map(|&i| manifest.fragments.get(i))
            .map(|f| f.text.chars().count() as u64)
            .sum();
        let progress = Progress::new("Encode", total_chars);
        for &i in &selected {
            let Some(fragment) = manifest.fragments.get_mut(i) else {
                return Err(Error::input(format!("manifest index {i} out of range")));
            };
            let Some(filename) = fragment.filename.clone() else {
                continue;
            };
            let filepath = encode_dir.join(filename).with_extension(file_ext);
            let duration = silence_duration.or(fragment.silence_duration);
            if !fragment.text.is_empty() {
                let named = fragment
                    .voice_name
                    .as_ref()
                    .and_then(|name| voices.get(name))
                    .and_then(|v| v.clone());
                let voice = fragment
                    .voice
                    .clone()
                    .or(named)
                    .ok_or_else(|| Error::input("no voice specified"))?;
                self.t2s(&fragment.text, &voice, &filepath)?;
                fragment.voice = Some(voice);
                progress.inc(fragment.text.chars().count() as u64);
            } else if duration.is_some_and(|d| d > 0) {
                create_silence(duration.unwrap_or(0), &filepath, file_ext)?;
            } else {
                // No text, no silence: no file is emitted at all.
                continue;
            }
            fragment.filename = filepath
                .file_name()
                .map(|name| name.to_string_lossy().into_owned());
            fragment.encoder = Some(self.name().to_string());
            fragment.audio_format = Some(self.audio_format().to_string());
            fragment.encoded = Some(Utc::now());
        }
        progress.finish();
        Ok(())
    }
}

type EncoderFactory = fn(&EncoderOptions) -> Result<Box<dyn Encoder>>;

/// Explicit registration table dispatching `--encoder` names to factories,
/// constructed once at startup.
pub struct EncoderRegistry {
    factories: BTreeMap<&'static str, EncoderFactory>,
}

impl EncoderRegistry {
    pub fn new() -> Self {
        EncoderRegistry {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the built-in providers.
    pub fn builtin() -> Self {
        let mut registry = EncoderRegistry::new();
        registry.register("google", |options| {
            Ok(Box::new(GoogleEncoder::new(options)))
        });
        registry.register("elevenlabs", |options| {
            Ok(Box::new(ElevenLabsEncoder::new(options)))
        });
        registry
    }

    pub fn register(&mut self, name: &'static str, factory: EncoderFactory) {
        self.factories.insert(name, factory);
    }

    pub fn create(&self, name: &str, options: &EncoderOptions) -> Result<Box<dyn Encoder>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::input(format!("encoder \"{name}\" not found")))?;
        factory(options)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for EncoderRegistry {
    fn default() -> Self {
        EncoderRegistry::builtin()
    }
}
