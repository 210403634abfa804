use crate::irc::{self, IrcLine};
use crate::reconnect::ReconnectPolicy;
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use secrecy::SecretString;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

pub const DEFAULT_URL: &str = "wss://irc-ws.chat.twitch.tv:443";

/// Connection settings for one channel.
#[derive(Debug)]
pub struct ChatConfig {
    pub url: String,
    pub nick: String,
    pub token: SecretString,
    pub channel: String,
}

/// A chat line received from the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub username: String,
    pub text: String,
}

/// Handle to the background connection task.
#[derive(Clone)]
pub struct ChatClient {
    channel: String,
    outgoing: mpsc::UnboundedSender<String>,
    connected: Arc<AtomicBool>,
}

enum SessionEnd {
    Disconnected,
    Shutdown,
}

/// Starts the connection task and returns the send handle plus the stream of
/// incoming chat lines.
///
/// The task keeps reconnecting according to `policy`. Each reconnect
/// authenticates and joins the channel again before messages flow.
pub fn spawn(
    config: ChatConfig,
    policy: ReconnectPolicy,
) -> (ChatClient, mpsc::UnboundedReceiver<ChatMessage>) {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let connected = Arc::new(AtomicBool::new(false));

    let client = ChatClient {
        channel: config.channel.clone(),
        outgoing: out_tx,
        connected: connected.clone(),
    };
    tokio::spawn(run(config, policy, out_rx, in_tx, connected));
    (client, in_rx)
}

impl ChatClient {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Queues `text` for the channel. Returns `false` if the client is not
    /// connected; such messages are dropped, not buffered.
    pub fn send(&self, text: &str) -> bool {
        if !self.is_connected() {
            tracing::warn!("Not connected to chat, dropping message: {}", text);
            return false;
        }
        tracing::info!("[bot]: {}", text);
        self.outgoing.send(irc::privmsg(&self.channel, text)).is_ok()
    }
}

async fn run(
    config: ChatConfig,
    policy: ReconnectPolicy,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    incoming: mpsc::UnboundedSender<ChatMessage>,
    connected: Arc<AtomicBool>,
) {
    let mut attempt = 0;
    loop {
        tracing::info!("Connecting to {}...", config.url);
        match session(&config, &mut outgoing, &incoming, &connected).await {
            Ok(SessionEnd::Shutdown) => {
                tracing::info!("Chat client dropped, closing connection.");
                connected.store(false, Ordering::SeqCst);
                return;
            }
            Ok(SessionEnd::Disconnected) => tracing::warn!("Chat connection closed."),
            Err(e) => tracing::error!("Chat connection failed: {:?}", e),
        }

        // A session that made it into the channel starts a fresh retry count.
        if connected.swap(false, Ordering::SeqCst) {
            attempt = 0;
        }
        attempt += 1;
        let Some(delay) = policy.next_delay(attempt) else {
            tracing::error!("Giving up on chat after {} attempts.", attempt - 1);
            return;
        };
        tracing::info!("Reconnecting in {:?} (attempt {})...", delay, attempt);
        tokio::time::sleep(delay).await;
    }
}

async fn session(
    config: &ChatConfig,
    outgoing: &mut mpsc::UnboundedReceiver<String>,
    incoming: &mpsc::UnboundedSender<ChatMessage>,
    connected: &AtomicBool,
) -> Result<SessionEnd> {
    let (ws_stream, _) = connect_async(config.url.as_str())
        .await
        .context("Failed to connect to chat WebSocket")?;
    let (mut write, mut read) = ws_stream.split();

    for line in irc::login_lines(&config.nick, &config.token, &config.channel) {
        write
            .send(Message::Text(line))
            .await
            .context("Failed to send login line")?;
    }

    loop {
        tokio::select! {
            message = read.next() => {
                let text = match message {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(reason))) => {
                        tracing::info!("Chat server closed the connection: {:?}", reason);
                        return Ok(SessionEnd::Disconnected);
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e).context("Failed to read from chat WebSocket"),
                    None => return Ok(SessionEnd::Disconnected),
                };

                for raw in text.split("\r\n") {
                    let Some(line) = irc::parse_line(raw) else {
                        if !raw.is_empty() {
                            tracing::debug!("Discarding malformed line: {:?}", raw);
                        }
                        continue;
                    };
                    match line {
                        IrcLine::Ping(payload) => {
                            write
                                .send(Message::Text(format!("PONG :{payload}")))
                                .await
                                .context("Failed to answer PING")?;
                            tracing::debug!("PONG sent");
                        }
                        IrcLine::Joined { username, channel }
                            if username.eq_ignore_ascii_case(&config.nick)
                                && channel.eq_ignore_ascii_case(&config.channel) =>
                        {
                            tracing::info!("Connected to #{} as {}", channel, username);
                            connected.store(true, Ordering::SeqCst);
                        }
                        IrcLine::PrivMsg { username, text, .. } => {
                            if incoming.send(ChatMessage { username, text }).is_err() {
                                return Ok(SessionEnd::Shutdown);
                            }
                        }
                        IrcLine::Notice(notice) => tracing::warn!("Server notice: {}", notice),
                        IrcLine::Reconnect => {
                            tracing::info!("Server requested a reconnect.");
                            return Ok(SessionEnd::Disconnected);
                        }
                        _ => {}
                    }
                }
            }
            line = outgoing.recv() => {
                let Some(line) = line else {
                    return Ok(SessionEnd::Shutdown);
                };
                write
                    .send(Message::Text(line))
                    .await
                    .context("Failed to send chat message")?;
            }
        }
    }
}
