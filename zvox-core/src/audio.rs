//! Audio segment helpers: silence generation, concatenation, and copying.
//!
//! Thin wrappers around external collaborators: wav files are handled
//! natively with hound, anything else is delegated to an `ffmpeg` subprocess.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::progress::Progress;

/// Sample rate for generated wav silence.
const SILENCE_SAMPLE_RATE: u32 = 24_000;

fn audio_err(err: impl std::fmt::Display) -> Error {
    Error::Audio(err.to_string())
}

fn run_ffmpeg(args: &[&str]) -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-y")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|err| audio_err(format!("ffmpeg: {err}")))?;
    if !output.status.success() {
        return Err(audio_err(format!(
            "ffmpeg failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(())
}

/// Writes a silent audio file of `duration_ms` milliseconds.
pub fn create_silence(duration_ms: u64, path: &Path, format: &str) -> Result<()> {
    if format == "wav" {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SILENCE_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).map_err(audio_err)?;
        let samples = u64::from(SILENCE_SAMPLE_RATE) * duration_ms / 1000;
        for _ in 0..samples {
            writer.write_sample(0i16).map_err(audio_err)?;
        }
        writer.finalize().map_err(audio_err)?;
        return Ok(());
    }
    let duration = format!("{}", duration_ms as f64 / 1000.0);
    let source = format!("anullsrc=r={SILENCE_SAMPLE_RATE}:cl=mono");
    let out = path.to_string_lossy();
    run_ffmpeg(&["-f", "lavfi", "-i", &source, "-t", &duration, &out])
}

/// Audio files a manifest's fragments actually produced: in fragment order,
/// with filenames, existing on disk. Skipped silences never appear.
fn fragment_files(audio_dir: &Path, manifest: &Manifest) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = manifest
        .fragments
        .iter()
        .filter_map(|f| f.filename.as_ref())
        .map(|name| audio_dir.join(name))
        .filter(|path| path.exists())
        .collect();
    files.sort();
    files
}

/// Concatenates the manifest's audio segments into `output_path`.
pub fn concat_files(
    audio_dir: &Path,
    manifest: &Manifest,
    format: &str,
    output_path: &Path,
) -> Result<()> {
    let files = fragment_files(audio_dir, manifest);
    if files.is_empty() {
        return Err(audio_err("no audio segments to concatenate"));
    }
    let progress = Progress::new("Concat", files.len() as u64);
    if format == "wav" {
        let spec = hound::WavReader::open(&files[0]).map_err(audio_err)?.spec();
        let mut writer = hound::WavWriter::create(output_path, spec).map_err(audio_err)?;
        for file in &files {
            let mut reader = hound::WavReader::open(file).map_err(audio_err)?;
            if reader.spec() != spec {
                return Err(audio_err(format!(
                    "wav spec mismatch in {}",
                    file.display()
                )));
            }
            for sample in reader.samples::<i16>() {
                writer.write_sample(sample.map_err(audio_err)?).map_err(audio_err)?;
            }
            progress.inc(1);
        }
        writer.finalize().map_err(audio_err)?;
    } else {
        let mut list = tempfile::NamedTempFile::new()?;
        for file in &files {
            writeln!(list, "file '{}'", file.display())?;
        }
        list.flush()?;
        let list_path = list.path().to_string_lossy().into_owned();
        let out = output_path.to_string_lossy().into_owned();
        run_ffmpeg(&["-f", "concat", "-safe", "0", "-i", &list_path, "-c", "copy", &out])?;
        progress.inc(files.len() as u64);
    }
    progress.finish();
    Ok(())
}

/// Copies the manifest's audio segments into `dest_dir`. Missing segments are
/// skipped, so this doubles as the best-effort salvage pass after a failed
/// encode.
pub fn copy_files(audio_dir: &Path, manifest: &Manifest, dest_dir: &Path) -> Result<()> {
    let files = fragment_files(audio_dir, manifest);
    let progress = Progress::new("Copy", files.len() as u64);
    for file in &files {
        let Some(name) = file.file_name() else {
            continue;
        };
        std::fs::copy(file, dest_dir.join(name))?;
        progress.inc(1);
    }
    progress.finish();
    Ok(())
}
