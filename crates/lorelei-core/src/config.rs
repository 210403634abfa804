use std::time::Duration;

pub const DEFAULT_COMMAND_PREFIX: &str = "!lor";
pub const DEFAULT_STREAMER: &str = "remmold";
pub const DEFAULT_BOOTSTRAP_TOPIC: &str = "Current Game";

pub const DEFAULT_WAKE_WORDS: &[&str] = &[
    "lorelei",
    "laurelei",
    "loralei",
    "lor",
    "lore",
    "lei",
    "lorelei_the_bot",
    "laurel",
    "laura",
    "relay",
    "lorelai",
    "loreleibot",
];

/// Timing and wording knobs of the conversation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Chat messages starting with this prefix are direct queries.
    pub command_prefix: String,
    /// Words that count as addressing the bot in speech. Must be lower-case;
    /// they are matched against the lower-cased utterance.
    pub wake_words: Vec<String>,
    /// Name of the streamer whose voice is transcribed.
    pub streamer: String,
    /// Topic whose absence makes the inactivity prompt ask what is being played.
    pub bootstrap_topic: String,
    pub chat_silence_threshold: Duration,
    pub inactivity_threshold: Duration,
    pub ai_call_cooldown: Duration,
    pub reply_timeout: Duration,
    pub max_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
            wake_words: DEFAULT_WAKE_WORDS.iter().map(|w| w.to_string()).collect(),
            streamer: DEFAULT_STREAMER.to_string(),
            bootstrap_topic: DEFAULT_BOOTSTRAP_TOPIC.to_string(),
            chat_silence_threshold: Duration::from_secs(30),
            inactivity_threshold: Duration::from_secs(300),
            ai_call_cooldown: Duration::from_secs(10),
            reply_timeout: Duration::from_secs(60),
            max_history: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_wake_words_are_lower_case() {
        for word in EngineConfig::default().wake_words {
            assert_eq!(word, word.to_lowercase(), "wake word {word:?}");
        }
    }
}
