// File: src/audio/command_sink.rs

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use greeter_common::error::Error;
use greeter_common::traits::{CompletionReceiver, EncodedAudio, StreamCompletion, VoiceConnection, VoiceSink};

/// Streams by running an external player per track.
///
/// Arguments may contain `{file}`, `{guild}` and `{channel}`; exit status 0 means
/// the whole track was sent.
#[derive(Debug, Clone)]
pub struct CommandSink {
    program: String,
    args: Vec<String>,
}

impl CommandSink {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parses a whitespace separated command line such as `voice-play --guild {guild} {file}`.
    pub fn from_template(template: &str) -> Result<Self, Error> {
        let mut parts = template.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| Error::Config("player command is empty".into()))?;
        Ok(Self::new(program, parts.collect()))
    }

    fn expand(&self, connection: &dyn VoiceConnection, audio: &EncodedAudio) -> Vec<String> {
        let file = audio.path.display().to_string();
        let guild = connection.guild_id().to_string();
        let channel = connection.channel_id().to_string();
        self.args
            .iter()
            .map(|a| {
                a.replace("{file}", &file)
                    .replace("{guild}", &guild)
                    .replace("{channel}", &channel)
            })
            .collect()
    }
}

#[async_trait]
impl VoiceSink for CommandSink {
    async fn stream(
        &self,
        connection: Arc<dyn VoiceConnection>,
        audio: EncodedAudio,
    ) -> Result<CompletionReceiver, Error> {
        let args = self.expand(connection.as_ref(), &audio);
        let mut child = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Stream(format!("could not start {}: {}", self.program, e)))?;

        debug!(
            "Streaming {} into guild {} channel {}",
            audio.path.display(),
            connection.guild_id(),
            connection.channel_id()
        );

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let completion = match child.wait().await {
                Ok(status) if status.success() => StreamCompletion::EndOfStream,
                Ok(status) => StreamCompletion::Failed(format!("player exited with {status}")),
                Err(e) => StreamCompletion::Failed(format!("waiting for player: {e}")),
            };
            if tx.send(completion).is_err() {
                warn!("Stream completion for guild {} had no listener", connection.guild_id());
            }
        });
        Ok(rx)
    }
}
