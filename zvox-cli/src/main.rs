//! zvox CLI: clean, plan, and encode a text file to synthetic speech audio.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use zvox_core::audio::{concat_files, copy_files};
use zvox_core::{
    clean_text, parse_text, ElevenLabsEncoder, ElevenLabsVoice, Encoder, EncoderOptions,
    EncoderRegistry, Fragment, GoogleVoice, Manifest, NamedVoices, Voice,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Provider {
    Google,
    Elevenlabs,
}

impl Provider {
    fn as_str(self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Elevenlabs => "elevenlabs",
        }
    }
}

/// Scalar voice settings are 0.0..=1.0.
fn unit_scalar(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("`{s}` must be between 0.0 and 1.0"));
    }
    Ok(value)
}

#[derive(Debug, Parser)]
#[command(name = "zvox", version)]
#[command(about = "Encode a text file to synthetic speech audio file(s)")]
struct Cli {
    /// The text or manifest file to encode (e.g. "gone_bananas.txt")
    inputfile: PathBuf,

    /// The encoder to use
    #[arg(long, value_enum, default_value_t = Provider::Google)]
    encoder: Provider,

    /// A JSON file containing named voices
    #[arg(long)]
    voices: Option<PathBuf>,

    /// The voice ID to use
    #[arg(long)]
    voice_id: Option<String>,

    /// The maximum number of characters per fragment (default: one fragment
    /// per line)
    #[arg(long)]
    max_chars: Option<usize>,

    /// The milliseconds of silence to use for empty fragments
    #[arg(long, default_value_t = 500)]
    silence_duration: u64,

    /// The basename of any output file(s) (default: basename of inputfile)
    #[arg(long)]
    basename: Option<String>,

    /// Clean the input text (before encoding) and write to file
    #[arg(long)]
    clean: bool,

    /// The clean text output file (default: [basename]-clean.txt)
    #[arg(long)]
    clean_out: Option<PathBuf>,

    /// Write the encoding plan manifest without encoding
    #[arg(long)]
    plan: bool,

    /// The plan output file (default: [basename]-plan.json)
    #[arg(long)]
    plan_out: Option<PathBuf>,

    /// Encode the text to audio file(s)
    #[arg(long)]
    encode: bool,

    /// The directory for encoded segment files (default: a temporary
    /// directory, released when the run ends)
    #[arg(long)]
    encode_dir: Option<PathBuf>,

    /// Manifest fragment indexes to encode (default: all)
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    manifest_indexes: Vec<usize>,

    /// Copy the encoded segment files to the copy directory
    #[arg(long)]
    copy: bool,

    /// The directory to copy encoded files into (default: working directory)
    #[arg(long)]
    copy_dir: Option<PathBuf>,

    /// Concatenate the encoded segment files into one audio file
    #[arg(long)]
    concat: bool,

    /// The concatenated audio output file (default: [basename].[wav|ogg|mp3])
    #[arg(long)]
    concat_out: Option<PathBuf>,

    /// The manifest output file (default: [basename]-manifest.json)
    #[arg(long)]
    manifest_out: Option<PathBuf>,

    /// The API key for the selected provider (default: GOOGLE_API_KEY or
    /// ELEVENLABS_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    // Google options (see: https://cloud.google.com/text-to-speech/docs)
    /// The Google language to use
    #[arg(long, default_value = "en")]
    voice_language: String,

    /// The Google language region to use
    #[arg(long, default_value = "US")]
    voice_region: String,

    /// The Google voice type to use
    #[arg(long, default_value = "Wavenet")]
    voice_type: String,

    /// The Google speaking rate
    #[arg(long)]
    voice_speaking_rate: Option<f64>,

    /// The Google pitch
    #[arg(long)]
    voice_pitch: Option<f64>,

    /// The Google volume gain
    #[arg(long)]
    voice_volume_gain_db: Option<f64>,

    /// The Google sample rate in hertz
    #[arg(long)]
    voice_sample_rate_hertz: Option<u32>,

    /// The Google effects profile ID(s)
    #[arg(long, num_args = 1..)]
    voice_effects_profile_id: Option<Vec<String>>,

    /// The Google audio output format
    #[arg(long, default_value = "linear16")]
    google_audio_format: String,

    // ElevenLabs options (see: https://elevenlabs.io/docs)
    /// The ElevenLabs model to use
    #[arg(long, default_value = "eleven_multilingual_v2")]
    voice_model: String,

    /// The ElevenLabs voice stability
    #[arg(long, value_parser = unit_scalar)]
    voice_stability: Option<f64>,

    /// The ElevenLabs voice similarity boost
    #[arg(long, value_parser = unit_scalar)]
    voice_similarity_boost: Option<f64>,

    /// The ElevenLabs voice style
    #[arg(long, value_parser = unit_scalar)]
    voice_style: Option<f64>,

    /// Use ElevenLabs voice speaker boost
    #[arg(long)]
    voice_use_speaker_boost: Option<bool>,

    /// The ElevenLabs audio output format
    #[arg(long, default_value = "mp3_44100_128")]
    elevenlabs_audio_format: String,

    /// Delete all ElevenLabs history items after encoding
    #[arg(long)]
    delete_history: bool,
}

impl Cli {
    fn encoder_options(&self) -> EncoderOptions {
        let audio_format = match self.encoder {
            Provider::Google => self.google_audio_format.clone(),
            Provider::Elevenlabs => self.elevenlabs_audio_format.clone(),
        };
        EncoderOptions {
            audio_format: Some(audio_format),
            api_key: self.api_key.clone(),
        }
    }

    /// The default voice built from command-line arguments, if a voice ID was
    /// given.
    fn default_voice(&self) -> Option<Voice> {
        let voice_id = self.voice_id.as_deref()?;
        Some(match self.encoder {
            Provider::Google => {
                let mut voice = GoogleVoice::new(
                    voice_id,
                    &self.voice_language,
                    &self.voice_region,
                    &self.voice_type,
                );
                voice.speaking_rate = self.voice_speaking_rate;
                voice.pitch = self.voice_pitch;
                voice.volume_gain_db = self.voice_volume_gain_db;
                voice.sample_rate_hertz = self.voice_sample_rate_hertz;
                voice.effects_profile_id = self.voice_effects_profile_id.clone();
                Voice::Google(voice)
            }
            Provider::Elevenlabs => {
                let mut voice = ElevenLabsVoice::new(voice_id);
                voice.model = Some(self.voice_model.clone());
                voice.stability = self.voice_stability;
                voice.similarity_boost = self.voice_similarity_boost;
                voice.style = self.voice_style;
                voice.use_speaker_boost = self.voice_use_speaker_boost;
                Voice::ElevenLabs(voice)
            }
        })
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if !(cli.clean || cli.plan || cli.encode || cli.delete_history) {
        println!(
            "Nothing to do... I'd give you advice, but you wouldn't listen. \
             No one ever does."
        );
        return Ok(());
    }

    let basename = cli.basename.clone().unwrap_or_else(|| {
        cli.inputfile
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "zvox".to_string())
    });
    let parent_dir = cli
        .inputfile
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut named_voices = match &cli.voices {
        Some(path) => NamedVoices::load_path(path)
            .with_context(|| format!("read voices file {}", path.display()))?,
        None => NamedVoices::default(),
    };

    let text = std::fs::read_to_string(&cli.inputfile)
        .with_context(|| format!("read input file {}", cli.inputfile.display()))?;
    // The input may be a previously produced manifest instead of plain text.
    let manifest = Manifest::from_json(&text).ok();
    if manifest.is_some() {
        info!("input file is a manifest; re-encoding its fragments");
    }

    let options = cli.encoder_options();
    let registry = EncoderRegistry::builtin();
    let encoder = registry.create(cli.encoder.as_str(), &options)?;

    let mut plan_manifest = clean_plan(
        &cli,
        &basename,
        &parent_dir,
        &text,
        manifest.as_ref(),
        &named_voices,
        encoder.as_ref(),
    )?;
    named_voices.add_voices(plan_manifest.voices.as_ref());

    if cli.encode {
        let indexes = if manifest.is_some() && !cli.manifest_indexes.is_empty() {
            Some(cli.manifest_indexes.clone())
        } else {
            None
        };
        // Re-encoding a manifest defaults to durable output beside it.
        let encode_dir = cli
            .encode_dir
            .clone()
            .or_else(|| manifest.is_some().then(|| parent_dir.clone()));
        encode_concat_copy(
            &cli,
            &basename,
            encoder.as_ref(),
            &named_voices,
            &mut plan_manifest,
            encode_dir,
            indexes,
        )?;
    }

    if cli.delete_history {
        if cli.encoder == Provider::Elevenlabs {
            ElevenLabsEncoder::new(&options).delete_history()?;
        } else {
            warn!("history deletion is only supported by the elevenlabs encoder");
        }
    }
    Ok(())
}

/// Optionally cleans the text, then derives the plan manifest, writing either
/// to file when requested.
fn clean_plan(
    cli: &Cli,
    basename: &str,
    parent_dir: &Path,
    text: &str,
    manifest: Option<&Manifest>,
    named_voices: &NamedVoices,
    encoder: &dyn Encoder,
) -> Result<Manifest> {
    let mut text = text.to_string();
    if cli.clean && manifest.is_none() {
        text = clean_text(&text, cli.max_chars);
        let clean_out = cli
            .clean_out
            .clone()
            .unwrap_or_else(|| parent_dir.join(format!("{basename}-clean.txt")));
        std::fs::write(&clean_out, &text)
            .with_context(|| format!("write cleaned text {}", clean_out.display()))?;
        info!(path = %clean_out.display(), "wrote cleaned text");
    }

    let mut plan_manifest = Manifest::default();
    if cli.plan || cli.encode {
        let mut combined = named_voices.clone();
        combined.add_voices(manifest.and_then(|m| m.voices.as_ref()));
        let encoder_voices = combined.encoder_voices(Some(cli.encoder.as_str()));
        let default_voice = cli.default_voice();

        let fragments: Vec<Fragment> = match manifest {
            Some(manifest) => manifest
                .fragments
                .iter()
                .cloned()
                .map(|mut fragment| {
                    // Re-resolve persisted names for the selected provider.
                    fragment.voice = match &fragment.voice_name {
                        Some(name) => encoder_voices.get(name).cloned().flatten(),
                        None => default_voice.clone(),
                    };
                    fragment
                })
                .collect(),
            None => parse_text(
                &text,
                default_voice.as_ref(),
                &encoder_voices,
                cli.max_chars,
            )?,
        };

        plan_manifest = Manifest::plan(
            &fragments,
            basename,
            encoder.file_extension()?,
            Some(cli.silence_duration),
        );
        plan_manifest.set_used_voices(combined.voices.as_ref());

        if cli.plan {
            let plan_out = cli
                .plan_out
                .clone()
                .unwrap_or_else(|| parent_dir.join(format!("{basename}-plan.json")));
            plan_manifest.save_path(&plan_out)?;
            info!(path = %plan_out.display(), "wrote plan manifest");
        }
    }
    Ok(plan_manifest)
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Encodes the manifest, then concatenates and/or copies the results. On any
/// failure, already-produced fragment files and the manifest are still copied
/// out before the error propagates.
fn encode_concat_copy(
    cli: &Cli,
    basename: &str,
    encoder: &dyn Encoder,
    named_voices: &NamedVoices,
    manifest: &mut Manifest,
    encode_dir: Option<PathBuf>,
    indexes: Option<Vec<usize>>,
) -> Result<()> {
    if let Some(dir) = &encode_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create encode directory {}", dir.display()))?;
    }
    let temp_dir = tempfile::tempdir().context("create temporary encode directory")?;
    let encoding_dir: &Path = encode_dir.as_deref().unwrap_or_else(|| temp_dir.path());

    let mut copy_dir = Some(match &cli.copy_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("resolve working directory")?,
    });
    if let Some(dir) = &copy_dir {
        if encode_dir.is_some() && same_dir(dir, encoding_dir) {
            copy_dir = None;
        }
    }

    let encoder_voices = named_voices.encoder_voices(Some(cli.encoder.as_str()));
    let result = (|| -> Result<()> {
        encoder.encode_manifest(
            manifest,
            encoding_dir,
            indexes.as_deref(),
            &encoder_voices,
            Some(cli.silence_duration),
        )?;
        manifest.set_used_voices(named_voices.voices.as_ref());

        let dest_dir = copy_dir
            .clone()
            .unwrap_or_else(|| encoding_dir.to_path_buf());
        let manifest_out = cli
            .manifest_out
            .clone()
            .unwrap_or_else(|| dest_dir.join(format!("{basename}-manifest.json")));
        manifest.save_path(&manifest_out)?;
        info!(path = %manifest_out.display(), "wrote manifest");

        if cli.concat {
            let file_ext = encoder.file_extension()?;
            let concat_out = cli
                .concat_out
                .clone()
                .unwrap_or_else(|| dest_dir.join(format!("{basename}.{file_ext}")));
            concat_files(encoding_dir, manifest, file_ext, &concat_out)?;
            info!(path = %concat_out.display(), "wrote concatenated audio");
        }
        if cli.copy || !cli.concat {
            if let Some(dir) = &copy_dir {
                std::fs::create_dir_all(dir)?;
                copy_files(encoding_dir, manifest, dir)?;
            }
        }
        Ok(())
    })();

    if let Err(err) = result {
        // Best-effort salvage of whatever was already produced.
        if let Some(dir) = &copy_dir {
            let _ = std::fs::create_dir_all(dir);
            let _ = copy_files(encoding_dir, manifest, dir);
            let _ = manifest.save_path(&dir.join(format!("{basename}-manifest.json")));
        }
        return Err(err);
    }
    Ok(())
}
