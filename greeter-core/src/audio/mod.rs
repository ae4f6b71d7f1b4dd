//! src/audio/mod.rs
//!
//! Encoder and voice sink backends driven by external programs.

pub mod ffmpeg;
pub mod command_sink;

use std::path::Path;

use async_trait::async_trait;

use greeter_common::error::Error;
use greeter_common::traits::{AudioEncoder, EncodedAudio};

pub use command_sink::CommandSink;
pub use ffmpeg::FfmpegEncoder;

/// Hands the staged file to the sink untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughEncoder;

#[async_trait]
impl AudioEncoder for PassthroughEncoder {
    async fn encode(&self, source: &Path) -> Result<EncodedAudio, Error> {
        Ok(EncodedAudio::passthrough(source))
    }
}
