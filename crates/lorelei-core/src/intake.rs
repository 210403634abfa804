//! Event intake: the consumer loops that feed the conversation engine.
//!
//! Chat lines and voice transcripts arrive on separate unbounded queues so
//! producers never block. Both consumers take the same mutex before touching
//! the conversation, which keeps every state transition serialized.

use crate::InboundEvent;
use crate::conversation::{Conversation, VoiceOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::time::MissedTickBehavior;

/// Pause after a handler fails before the loop picks up the next event.
pub const ERROR_PAUSE: Duration = Duration::from_secs(5);

/// Consumes chat events and runs the inactivity check on every tick.
///
/// Returns when the chat queue is closed.
pub async fn run_chat_loop(
    conversation: Arc<Mutex<Conversation>>,
    mut events: mpsc::UnboundedReceiver<InboundEvent>,
    poll_interval: Duration,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let result = tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    tracing::info!("Chat event queue closed, stopping chat loop.");
                    break;
                };
                conversation.lock().await.handle_event(event).await
            }
            _ = ticker.tick() => conversation.lock().await.check_inactivity().await,
        };

        if let Err(e) = result {
            // Log the error from the handler, but don't stop consuming events.
            tracing::error!("Error in chat loop: {:?}", e);
            tokio::time::sleep(ERROR_PAUSE).await;
        }
    }
}

/// Consumes voice transcripts one at a time.
///
/// The cooldown is checked and the utterance handled under one lock
/// acquisition. A deferred utterance is retried after waiting without the
/// lock, so chat keeps flowing while a voice command is pending.
pub async fn run_voice_loop(
    conversation: Arc<Mutex<Conversation>>,
    mut utterances: mpsc::UnboundedReceiver<String>,
) {
    while let Some(text) = utterances.recv().await {
        tracing::info!("Voice command dequeued: '{}'", text);
        loop {
            let result = conversation.lock().await.handle_voice(&text).await;
            match result {
                Ok(VoiceOutcome::Handled) => break,
                Ok(VoiceOutcome::Deferred(wait)) => {
                    tracing::info!(
                        "[COOLDOWN] Waiting for {:.1}s before processing next voice command...",
                        wait.as_secs_f32()
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    tracing::error!("Error in voice loop: {:?}", e);
                    tokio::time::sleep(ERROR_PAUSE).await;
                    break;
                }
            }
        }
    }
    tracing::info!("Voice queue closed, stopping voice loop.");
}
