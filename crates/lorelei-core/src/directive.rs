//! Extraction of `[LEARN]` side-channel directives from generator replies.

use serde::Deserialize;

pub const LEARN_MARKER: &str = "[LEARN]";

/// A fact the generator asked to remember.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LearnDirective {
    pub topic: String,
    pub fact: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("malformed directive payload {payload:?}: {source}")]
pub struct DirectiveError {
    pub payload: String,
    #[source]
    pub source: serde_json::Error,
}

/// A reply split into what the audience sees and what the bot should learn.
#[derive(Debug, Default)]
pub struct ScannedReply {
    pub visible: String,
    pub learned: Vec<LearnDirective>,
    pub malformed: Vec<DirectiveError>,
}

/// Splits `raw` into visible text and directives, one directive per line.
///
/// Directive lines are always removed from the visible text, including the
/// ones whose payload fails to parse.
pub fn scan_reply(raw: &str) -> ScannedReply {
    let mut scanned = ScannedReply::default();
    let mut visible = Vec::new();

    for line in raw.lines() {
        let Some(payload) = line.trim_start().strip_prefix(LEARN_MARKER) else {
            visible.push(line);
            continue;
        };
        let payload = payload.trim();
        match serde_json::from_str::<LearnDirective>(payload) {
            Ok(directive) => scanned.learned.push(directive),
            Err(source) => scanned.malformed.push(DirectiveError {
                payload: payload.to_string(),
                source,
            }),
        }
    }

    scanned.visible = visible.join("\n").trim().to_string();
    scanned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learn_line_is_extracted_and_stripped() {
        let scanned =
            scan_reply("[LEARN] {\"topic\":\"Game\",\"fact\":\"It's a roguelike\"}\nCool, thanks!");

        assert_eq!(scanned.visible, "Cool, thanks!");
        assert_eq!(
            scanned.learned,
            vec![LearnDirective {
                topic: "Game".into(),
                fact: "It's a roguelike".into(),
                category: None,
            }]
        );
        assert!(scanned.malformed.is_empty());
    }

    #[test]
    fn malformed_line_is_dropped_without_losing_the_rest() {
        let raw = "Nice run!\n\
                   [LEARN] {\"topic\": \"Game\", \"fact\": }\n\
                   [LEARN] {\"topic\": \"Streamer\", \"fact\": \"Hates spiders\", \"category\": \"People\"}\n\
                   What's next?";
        let scanned = scan_reply(raw);

        assert_eq!(scanned.visible, "Nice run!\nWhat's next?");
        assert_eq!(scanned.learned.len(), 1);
        assert_eq!(scanned.learned[0].topic, "Streamer");
        assert_eq!(scanned.learned[0].category.as_deref(), Some("People"));
        assert_eq!(scanned.malformed.len(), 1);
        assert!(scanned.malformed[0].payload.starts_with("{\"topic\": \"Game\""));
    }

    #[test]
    fn reply_without_directives_is_trimmed_verbatim() {
        let scanned = scan_reply("  \nHello chat!\n\n");
        assert_eq!(scanned.visible, "Hello chat!");
        assert!(scanned.learned.is_empty());
    }

    #[test]
    fn indented_marker_still_counts() {
        let scanned = scan_reply("Got it.\n   [LEARN] {\"topic\":\"A\",\"fact\":\"B\"}");
        assert_eq!(scanned.visible, "Got it.");
        assert_eq!(scanned.learned[0].fact, "B");
    }

    #[test]
    fn reply_made_only_of_directives_has_empty_visible_text() {
        let scanned = scan_reply("[LEARN] {\"topic\":\"A\",\"fact\":\"B\"}");
        assert_eq!(scanned.visible, "");
        assert_eq!(scanned.learned.len(), 1);
    }
}
