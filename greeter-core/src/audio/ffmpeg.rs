// File: src/audio/ffmpeg.rs

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tracing::debug;

use greeter_common::error::Error;
use greeter_common::traits::{AudioEncoder, EncodedAudio};

/// Voice channels take 48 kHz stereo Opus.
pub const DEFAULT_BITRATE_KBPS: u32 = 128;

/// Transcodes staged clips to Ogg/Opus next to the source file.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: PathBuf,
    bitrate_kbps: u32,
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
        }
    }

    pub fn with_bitrate(mut self, kbps: u32) -> Self {
        self.bitrate_kbps = kbps;
        self
    }

    fn output_for(source: &Path) -> PathBuf {
        let mut name = source.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".opus.ogg");
        source.with_file_name(name)
    }

    fn args(&self, source: &Path, output: &Path) -> Vec<String> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-i".into(),
            source.display().to_string(),
            "-vn".into(),
            "-c:a".into(),
            "libopus".into(),
            "-b:a".into(),
            format!("{}k", self.bitrate_kbps),
            "-ar".into(),
            "48000".into(),
            "-ac".into(),
            "2".into(),
            "-f".into(),
            "ogg".into(),
            output.display().to_string(),
        ]
    }
}

#[async_trait]
impl AudioEncoder for FfmpegEncoder {
    async fn encode(&self, source: &Path) -> Result<EncodedAudio, Error> {
        let output = Self::output_for(source);
        debug!("ffmpeg: {} -> {}", source.display(), output.display());

        let result = tokio::process::Command::new(&self.binary)
            .args(self.args(source, &output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::Stream(format!("could not run {}: {}", self.binary.display(), e)))?;

        if !result.status.success() {
            let _ = tokio::fs::remove_file(&output).await;
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::Stream(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        Ok(EncodedAudio {
            path: output,
            temporary: true,
        })
    }
}
