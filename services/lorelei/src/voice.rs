//! Streamer voice input.
//!
//! Speech recognition runs outside the bot. Its transcript arrives one
//! utterance per line, either from a child process (`VOICE_COMMAND`) or from
//! stdin, and each non-blank line is queued for the voice loop.

use anyhow::{Context, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Wait before restarting a transcriber that exited or failed.
pub const RESTART_DELAY: Duration = Duration::from_secs(5);

pub struct VoiceSource {
    command: Option<String>,
    restart_delay: Duration,
}

impl VoiceSource {
    pub fn new(command: Option<String>) -> Self {
        Self {
            command,
            restart_delay: RESTART_DELAY,
        }
    }

    /// Runs the source in the background until the voice queue is closed.
    pub fn start(self, utterances: mpsc::UnboundedSender<String>) -> JoinHandle<()> {
        tokio::spawn(async move {
            match self.command {
                Some(command) => run_command(&command, self.restart_delay, &utterances).await,
                None => {
                    tracing::info!("Reading streamer voice transcript from stdin.");
                    let stdin = BufReader::new(tokio::io::stdin());
                    if let Err(e) = forward_lines(stdin, &utterances).await {
                        tracing::error!("Voice input failed: {:?}", e);
                    }
                }
            }
        })
    }
}

async fn run_command(
    command: &str,
    restart_delay: Duration,
    utterances: &mpsc::UnboundedSender<String>,
) {
    loop {
        tracing::info!("Starting voice transcriber: {}", command);
        match transcribe_once(command, utterances).await {
            Ok(false) => return,
            Ok(true) => tracing::warn!("Voice transcriber exited."),
            Err(e) => tracing::error!("Voice transcriber failed: {:?}", e),
        }
        if utterances.is_closed() {
            return;
        }
        tokio::time::sleep(restart_delay).await;
    }
}

async fn transcribe_once(
    command: &str,
    utterances: &mpsc::UnboundedSender<String>,
) -> Result<bool> {
    let mut child = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdout(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .context("Failed to start voice transcriber")?;
    let stdout = child
        .stdout
        .take()
        .context("Voice transcriber has no stdout")?;

    let keep_going = forward_lines(BufReader::new(stdout), utterances).await?;
    if keep_going {
        let status = child.wait().await?;
        tracing::debug!("Voice transcriber status: {}", status);
    }
    Ok(keep_going)
}

/// Queues each non-blank line. Returns `Ok(false)` once the queue is closed,
/// `Ok(true)` when the reader hits end of input.
pub async fn forward_lines<R>(reader: R, utterances: &mpsc::UnboundedSender<String>) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        tracing::info!("[voice]: {}", text);
        if utterances.send(text.to_string()).is_err() {
            return Ok(false);
        }
    }
    Ok(true)
}
