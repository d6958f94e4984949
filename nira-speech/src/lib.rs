//! Thin wrappers over the external speech and animation tools NIRA uses.
//!
//! These stages are deliberately shallow: the heavy lifting belongs to the
//! tools themselves (whisper, espeak-ng, sadtalker) and the wrappers only
//! manage process invocation, output files, and failure fallbacks.

mod avatar;
mod error;
mod stt;
mod tts;

pub use avatar::AvatarAnimator;
pub use error::{Result, SpeechError};
pub use stt::{Transcriber, WHISPER_MODEL_DIR_ENV};
pub use tts::Synthesizer;
