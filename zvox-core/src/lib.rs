//! zvox core: text cleaning, fragment planning, manifests, named voices, encoders.

pub mod audio;
pub mod elevenlabs;
pub mod encoder;
pub mod error;
pub mod google;
pub mod manifest;
pub mod planner;
pub mod progress;
pub mod retry;
pub mod text;
pub mod voice;
pub mod voices;

pub use elevenlabs::ElevenLabsEncoder;
pub use encoder::{Encoder, EncoderOptions, EncoderRegistry};
pub use error::{Error, Result};
pub use google::GoogleEncoder;
pub use manifest::{Fragment, Manifest};
pub use planner::{match_voice, parse_text};
pub use progress::Progress;
pub use retry::RetryPolicy;
pub use text::{clean_text, split_text};
pub use voice::{ElevenLabsVoice, GoogleVoice, Voice};
pub use voices::{NamedVoices, VoiceBundle};
