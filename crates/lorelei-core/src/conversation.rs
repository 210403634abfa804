//! The conversation state machine.
//!
//! `Conversation` owns the bot state and the dialogue session. Every inbound
//! event is handled through `&mut self`, so whoever owns the value (or the
//! mutex around it) serializes all state transitions.

use crate::config::EngineConfig;
use crate::dialogue::{DialogueSession, is_ignore_signal};
use crate::{Command, InboundEvent};
use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

const FORGET_COMMAND: &str = "forget";

/// Mutable bot state. Ephemeral to the process run.
#[derive(Debug, Clone)]
pub struct BotState {
    pub is_waiting_for_reply: bool,
    pub last_question_time: Option<Instant>,
    pub last_activity_time: Instant,
    pub last_ai_call_time: Option<Instant>,
    pub last_streamer_utterance: Option<String>,
    pub inactivity_prompt_sent: bool,
}

impl BotState {
    pub fn new() -> Self {
        Self {
            is_waiting_for_reply: false,
            last_question_time: None,
            last_activity_time: Instant::now(),
            last_ai_call_time: None,
            last_streamer_utterance: None,
            inactivity_prompt_sent: false,
        }
    }
}

impl Default for BotState {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of offering an utterance to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceOutcome {
    Handled,
    /// The cooldown is still running; retry after this long.
    Deferred(Duration),
}

pub struct Conversation {
    config: EngineConfig,
    state: BotState,
    dialogue: DialogueSession,
    command_tx: mpsc::Sender<Command>,
}

impl Conversation {
    pub fn new(
        config: EngineConfig,
        dialogue: DialogueSession,
        command_tx: mpsc::Sender<Command>,
    ) -> Self {
        Self {
            config,
            state: BotState::new(),
            dialogue,
            command_tx,
        }
    }

    pub fn state(&self) -> &BotState {
        &self.state
    }

    pub fn dialogue(&self) -> &DialogueSession {
        &self.dialogue
    }

    /// Time left before the generator may be called again.
    pub fn cooldown_remaining(&self) -> Duration {
        match self.state.last_ai_call_time {
            Some(at) => self.config.ai_call_cooldown.saturating_sub(at.elapsed()),
            None => Duration::ZERO,
        }
    }

    pub async fn handle_event(&mut self, event: InboundEvent) -> Result<()> {
        match event {
            InboundEvent::Chat { username, text } => self.handle_chat(&username, &text).await,
        }
    }

    /// Handles one chat line. Only prefixed lines can reach the generator;
    /// everything else just counts as activity.
    pub async fn handle_chat(&mut self, username: &str, text: &str) -> Result<()> {
        tracing::info!("[{}]: {}", username, text);
        self.state.last_activity_time = Instant::now();
        self.state.inactivity_prompt_sent = false;

        let Some(query) = strip_command_prefix(text, &self.config.command_prefix) else {
            return Ok(());
        };

        if query.is_empty() {
            let hint = format!(
                "Hi @{}! To use me, type {} followed by your question.",
                username, self.config.command_prefix
            );
            return self.send_chat(hint).await;
        }

        if username.eq_ignore_ascii_case(&self.config.streamer) {
            if let Some(topic) = strip_command_prefix(query, FORGET_COMMAND) {
                if !topic.is_empty() {
                    return self.forget_topic(topic).await;
                }
            }
        }

        if !self.cooldown_remaining().is_zero() {
            tracing::info!("[COOLDOWN] {} command ignored due to AI cooldown.", self.config.command_prefix);
            return Ok(());
        }

        self.state.last_ai_call_time = Some(Instant::now());
        let reply = self.dialogue.request(query).await;
        if is_no_action(&reply) {
            tracing::info!("Generator chose not to answer @{}.", username);
            return Ok(());
        }

        self.send_chat(reply).await?;
        self.state.last_activity_time = Instant::now();
        Ok(())
    }

    /// Handles one transcribed utterance.
    ///
    /// Unlike chat, an utterance that arrives during the cooldown is not
    /// dropped: nothing changes and the remaining wait is returned so the
    /// caller can retry once it has passed.
    pub async fn handle_voice(&mut self, text: &str) -> Result<VoiceOutcome> {
        let wait = self.cooldown_remaining();
        if !wait.is_zero() {
            return Ok(VoiceOutcome::Deferred(wait));
        }

        self.state.last_streamer_utterance = Some(text.to_string());
        let is_direct_mention = self.mentions_bot(text);

        if self.state.is_waiting_for_reply {
            let question_age = self
                .state
                .last_question_time
                .map(|at| at.elapsed())
                .unwrap_or(Duration::MAX);
            if question_age > self.config.reply_timeout {
                tracing::info!("Reply timeout. Forgetting previous question.");
                self.state.is_waiting_for_reply = false;
            }
        }

        let prompt = if is_direct_mention || self.state.is_waiting_for_reply {
            tracing::info!("[STATE] Active conversation state.");
            if is_direct_mention {
                self.state.is_waiting_for_reply = false;
            }
            text.to_string()
        } else {
            if self.state.last_activity_time.elapsed() < self.config.chat_silence_threshold {
                tracing::info!("[STATE] Chat is busy. Ignoring ambient speech.");
                return Ok(VoiceOutcome::Handled);
            }
            tracing::info!("Processing as a new topic (from voice)...");
            format!(
                "The streamer, {}, just said: \"{}\"",
                self.config.streamer, text
            )
        };

        self.state.last_ai_call_time = Some(Instant::now());
        let reply = self.dialogue.request(&prompt).await;
        if is_no_action(&reply) {
            tracing::info!("Generator decided to ignore the voice command. Staying silent.");
            return Ok(VoiceOutcome::Handled);
        }

        if reply.ends_with('?') {
            self.state.is_waiting_for_reply = true;
            self.state.last_question_time = Some(Instant::now());
            tracing::info!("[STATE] Awaiting reply. Conversation remains active.");
        } else {
            self.state.is_waiting_for_reply = false;
            tracing::info!("[STATE] Concluded topic. Conversation is now inactive.");
        }

        self.send_chat(reply).await?;
        self.state.last_activity_time = Instant::now();
        Ok(VoiceOutcome::Handled)
    }

    /// Sends a proactive prompt once the channel has been quiet for longer than
    /// the inactivity threshold. At most one prompt fires per quiet period.
    pub async fn check_inactivity(&mut self) -> Result<()> {
        if self.state.inactivity_prompt_sent
            || self.state.last_activity_time.elapsed() <= self.config.inactivity_threshold
        {
            return Ok(());
        }

        if !self.cooldown_remaining().is_zero() {
            tracing::info!("[COOLDOWN] Inactivity prompt skipped due to recent AI activity.");
            self.state.inactivity_prompt_sent = true;
            return Ok(());
        }

        tracing::info!("Inactivity detected. Engaging proactive question mode...");
        let prompt = if self
            .dialogue
            .facts()
            .contains_topic(&self.config.bootstrap_topic)
        {
            "It's quiet. Based on your memory, ask an interesting, open-ended question to learn more about an existing topic (like the current game or the streamer's preferences)."
        } else {
            "It's quiet and you don't know the current game. Ask the streamer what they are playing."
        };

        self.state.last_ai_call_time = Some(Instant::now());
        let reply = self.dialogue.request(prompt).await;
        self.state.inactivity_prompt_sent = true;

        if is_no_action(&reply) {
            tracing::info!("Generator decided not to ask a question right now.");
            return Ok(());
        }
        tracing::info!("Generated proactive question: {}", reply);
        self.send_chat(reply).await?;
        self.state.last_activity_time = Instant::now();
        Ok(())
    }

    async fn forget_topic(&mut self, topic: &str) -> Result<()> {
        let message = if self.dialogue.facts_mut().forget(topic) {
            format!("Okay, I forgot everything about {topic}.")
        } else {
            format!("I don't know anything about {topic}.")
        };
        self.send_chat(message).await
    }

    fn mentions_bot(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.config
            .wake_words
            .iter()
            .any(|word| lower.contains(word.as_str()))
    }

    async fn send_chat(&self, text: String) -> Result<()> {
        self.command_tx
            .send(Command::SendChat(text))
            .await
            .context("Failed to send SendChat command")
    }
}

fn is_no_action(reply: &str) -> bool {
    reply.trim().is_empty() || is_ignore_signal(reply)
}

/// Returns the remainder if `text` starts with `prefix`, compared
/// case-insensitively. The prefix must not run into a letter or digit
/// (`!lorelei` is not `!lor`). Separators such as `,` or `:` after it are
/// dropped along with surrounding whitespace.
fn strip_command_prefix<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let text = text.trim_start();
    let head = text.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = &text[prefix.len()..];
    if rest.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
        return None;
    }
    Some(
        rest.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ':' | ';'))
            .trim(),
    )
}
