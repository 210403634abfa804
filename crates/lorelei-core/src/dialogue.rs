use crate::directive::scan_reply;
use crate::fact_store::FactStore;
use crate::generator::{Generator, Turn};

/// Sent to chat whenever the generator cannot be reached.
pub const FALLBACK_REPLY: &str = "Sorry, I'm having a bit of brain fog right now.";

/// Token the generator answers with when a prompt is not worth a reply.
pub const IGNORE_SIGNAL: &str = "IGNORE";

/// True if `reply` is the "no action" signal rather than a chat message.
pub fn is_ignore_signal(reply: &str) -> bool {
    reply.trim().eq_ignore_ascii_case(IGNORE_SIGNAL)
}

/// Wraps the generator with a bounded, role-balanced history and applies
/// the `[LEARN]` directives it emits to the fact store.
pub struct DialogueSession {
    generator: Box<dyn Generator>,
    facts: FactStore,
    history: Vec<Turn>,
    max_history: usize,
}

impl DialogueSession {
    pub fn new(generator: Box<dyn Generator>, facts: FactStore, max_history: usize) -> Self {
        Self {
            generator,
            facts,
            history: Vec::new(),
            max_history,
        }
    }

    pub fn facts(&self) -> &FactStore {
        &self.facts
    }

    pub fn facts_mut(&mut self) -> &mut FactStore {
        &mut self.facts
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Sends `prompt` to the generator and returns the visible reply.
    ///
    /// Never fails: a generator error rolls back the pending user turn and
    /// yields [`FALLBACK_REPLY`].
    pub async fn request(&mut self, prompt: &str) -> String {
        let memory = self.facts.render_for_prompt();
        let input = if memory.is_empty() {
            prompt.to_string()
        } else {
            format!("{memory}\n{prompt}")
        };
        self.history.push(Turn::user(input));

        let raw = match self.generator.generate(&self.history).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Generator request failed: {:?}", e);
                self.history.pop();
                return FALLBACK_REPLY.to_string();
            }
        };

        let scanned = scan_reply(&raw);
        for directive in &scanned.learned {
            match &directive.category {
                Some(category) => {
                    self.facts
                        .learn_with_category(&directive.topic, &directive.fact, category)
                }
                None => self.facts.learn(&directive.topic, &directive.fact),
            }
        }
        for err in &scanned.malformed {
            tracing::warn!("Dropping directive line: {}", err);
        }

        self.history.push(Turn::model(scanned.visible.clone()));
        self.trim_history();
        scanned.visible
    }

    // Evict whole (user, model) pairs so roles keep alternating.
    fn trim_history(&mut self) {
        while self.history.len() > self.max_history && self.history.len() >= 2 {
            self.history.drain(..2);
        }
    }
}
