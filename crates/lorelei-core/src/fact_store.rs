//! Durable, topic-keyed knowledge base.
//!
//! The store keeps topics in insertion order and rewrites the whole JSON
//! document on every mutation. Storage failures never escape: they are logged
//! and the store keeps working from memory.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const DEFAULT_CATEGORY: &str = "General";

const PROMPT_HEADER: &str = "[MEMORY] You have learned the following:";

/// Errors raised while reading or writing the fact file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read fact file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse fact file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write fact file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub facts: Vec<String>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

pub struct FactStore {
    path: Option<PathBuf>,
    topics: Vec<(String, Topic)>,
}

impl FactStore {
    /// A store with no backing file. Mutations only live in memory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            topics: Vec::new(),
        }
    }

    /// Loads the store from `path`.
    ///
    /// A missing file is created empty. An unreadable or unparseable file is
    /// treated the same as a missing one: the store starts empty and the file is
    /// recreated on the first write. A single malformed topic is skipped with a
    /// warning and the rest of the document is kept.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let topics = match read_topics(&path) {
            Ok(Some(topics)) => {
                tracing::info!("Loaded {} topics from {}", topics.len(), path.display());
                topics
            }
            Ok(None) => {
                tracing::info!(
                    "Fact file not found. Creating a new one at {}",
                    path.display()
                );
                if let Err(e) = fs::write(&path, "{}") {
                    tracing::error!("Could not create fact file {}: {}", path.display(), e);
                }
                Vec::new()
            }
            Err(e) => {
                tracing::error!("{}. Starting with empty memory.", e);
                Vec::new()
            }
        };
        Self {
            path: Some(path),
            topics,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn contains_topic(&self, topic: &str) -> bool {
        self.topic(topic).is_some()
    }

    pub fn topic(&self, topic: &str) -> Option<&Topic> {
        self.topics
            .iter()
            .find(|(name, _)| name == topic)
            .map(|(_, t)| t)
    }

    pub fn topics(&self) -> impl Iterator<Item = (&str, &Topic)> {
        self.topics.iter().map(|(name, t)| (name.as_str(), t))
    }

    /// Adds `fact` under `topic` in the default category.
    pub fn learn(&mut self, topic: &str, fact: &str) {
        self.learn_with_category(topic, fact, DEFAULT_CATEGORY);
    }

    /// Adds `fact` under `topic`, creating the topic with `category` if needed.
    ///
    /// Both strings are trimmed; empty input is ignored. Re-learning a fact the
    /// topic already holds is a silent no-op.
    pub fn learn_with_category(&mut self, topic: &str, fact: &str, category: &str) {
        let topic = topic.trim();
        let fact = fact.trim();
        if topic.is_empty() || fact.is_empty() {
            return;
        }

        let idx = match self.topics.iter().position(|(name, _)| name == topic) {
            Some(idx) => idx,
            None => {
                tracing::info!("Creating new topic: '{}'", topic);
                self.topics.push((
                    topic.to_string(),
                    Topic {
                        category: category.to_string(),
                        facts: Vec::new(),
                    },
                ));
                self.topics.len() - 1
            }
        };

        let facts = &mut self.topics[idx].1.facts;
        if facts.iter().any(|f| f == fact) {
            return;
        }
        tracing::info!("Learning new fact for topic '{}': '{}'", topic, fact);
        facts.push(fact.to_string());
        self.persist();
    }

    /// Removes `topic` and all of its facts. Unknown topics are ignored.
    pub fn forget(&mut self, topic: &str) -> bool {
        let topic = topic.trim();
        let Some(idx) = self.topics.iter().position(|(name, _)| name == topic) else {
            return false;
        };
        tracing::info!("Forgetting entire topic: '{}'", topic);
        self.topics.remove(idx);
        self.persist();
        true
    }

    /// Summary of every topic for injection into the generator context.
    ///
    /// Returns an empty string when nothing has been learned.
    pub fn render_for_prompt(&self) -> String {
        if self.topics.is_empty() {
            return String::new();
        }
        let mut out = String::from(PROMPT_HEADER);
        out.push('\n');
        for (name, topic) in &self.topics {
            out.push_str(&format!(
                "- Topic: {} | Facts: {}\n",
                name,
                topic.facts.join("; ")
            ));
        }
        out
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = write_topics(path, &self.topics) {
            tracing::error!("{}. Continuing with in-memory facts.", e);
        }
    }
}

fn read_topics(path: &Path) -> Result<Option<Vec<(String, Topic)>>, StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let parse_err = |source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let doc: Map<String, Value> = serde_json::from_str(&raw).map_err(parse_err)?;

    // One bad entry must not cost the rest of the document.
    let mut topics = Vec::with_capacity(doc.len());
    for (name, value) in doc {
        match serde_json::from_value::<Topic>(value) {
            Ok(topic) => topics.push((name, topic)),
            Err(e) => tracing::warn!(
                "Skipping malformed topic '{}' in {}: {}",
                name,
                path.display(),
                e
            ),
        }
    }
    Ok(Some(topics))
}

fn write_topics(path: &Path, topics: &[(String, Topic)]) -> Result<(), StoreError> {
    let mut doc = Map::new();
    for (name, topic) in topics {
        // Serializing a plain struct of strings cannot fail.
        let value = serde_json::to_value(topic).unwrap_or(Value::Null);
        doc.insert(name.clone(), value);
    }
    let body = serde_json::to_string_pretty(&Value::Object(doc)).unwrap_or_else(|_| "{}".into());

    let write_err = |source: std::io::Error| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    // Write a sibling file and rename it over the original so a crash never
    // leaves a half-written document behind.
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(body.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn learning_the_same_fact_twice_keeps_one_copy() {
        let mut store = FactStore::in_memory();
        store.learn("Game", "It's a roguelike");
        store.learn("Game", "It's a roguelike");
        store.learn("  Game ", " It's a roguelike  ");

        let topic = store.topic("Game").unwrap();
        assert_eq!(topic.facts, vec!["It's a roguelike".to_string()]);
        assert_eq!(topic.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn blank_topic_or_fact_is_ignored() {
        let mut store = FactStore::in_memory();
        store.learn("   ", "something");
        store.learn("Game", "  ");
        assert!(store.is_empty());
    }

    #[test]
    fn forget_removes_the_whole_topic() {
        let mut store = FactStore::in_memory();
        store.learn("Game", "It's a roguelike");
        store.learn("Game", "Permadeath is on");
        store.learn("Streamer", "Likes cats");

        assert!(store.forget("Game"));
        assert!(!store.contains_topic("Game"));
        assert!(store.contains_topic("Streamer"));
        assert!(!store.forget("Game"), "forgetting twice is a no-op");
    }

    #[test]
    fn render_for_prompt_is_empty_for_empty_store() {
        assert_eq!(FactStore::in_memory().render_for_prompt(), "");
    }

    #[test]
    fn render_for_prompt_keeps_insertion_order() {
        let mut store = FactStore::in_memory();
        store.learn("Zelda", "Link is the hero");
        store.learn("Apex", "Battle royale");
        store.learn("Zelda", "Set in Hyrule");

        assert_eq!(
            store.render_for_prompt(),
            "[MEMORY] You have learned the following:\n\
             - Topic: Zelda | Facts: Link is the hero; Set in Hyrule\n\
             - Topic: Apex | Facts: Battle royale\n"
        );
    }

    #[test]
    fn mutations_are_persisted_and_reloaded_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.json");

        let mut store = FactStore::open(&path);
        store.learn_with_category("Current Game", "Hades", "Games");
        store.learn("Streamer", "Plays at night");
        store.learn("Streamer", "Likes synthwave");
        store.learn("Temp", "Delete me");
        store.forget("Temp");
        drop(store);

        let reloaded = FactStore::open(&path);
        let names: Vec<&str> = reloaded.topics().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Current Game", "Streamer"]);
        assert_eq!(reloaded.topic("Current Game").unwrap().category, "Games");
        assert_eq!(
            reloaded.topic("Streamer").unwrap().facts,
            vec!["Plays at night", "Likes synthwave"]
        );
    }

    #[test]
    fn missing_file_is_created_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fresh.json");

        let store = FactStore::open(&path);
        assert!(store.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn corrupt_file_starts_empty_and_is_rewritten_on_learn() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut store = FactStore::open(&path);
        assert!(store.is_empty());

        store.learn("Game", "Celeste");
        let reloaded = FactStore::open(&path);
        assert_eq!(reloaded.topic("Game").unwrap().facts, vec!["Celeste"]);
    }

    #[test]
    fn unwritable_path_degrades_to_memory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("memory.json");

        let mut store = FactStore::open(&path);
        store.learn("Game", "Celeste");
        assert!(store.contains_topic("Game"));
    }

    #[test]
    fn malformed_topic_is_skipped_and_missing_category_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(
            &path,
            r#"{
                "Current Game": {"facts": ["Hades"]},
                "Broken": {"category": "Games", "facts": "not a list"},
                "Streamer": {"category": "People", "facts": ["Likes cats"]}
            }"#,
        )
        .unwrap();

        let mut store = FactStore::open(&path);
        let names: Vec<&str> = store.topics().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Current Game", "Streamer"]);
        assert_eq!(store.topic("Current Game").unwrap().category, DEFAULT_CATEGORY);

        store.learn("New", "fact");
        let reloaded = FactStore::open(&path);
        assert_eq!(reloaded.topic("Current Game").unwrap().facts, vec!["Hades"]);
        assert_eq!(reloaded.topic("Streamer").unwrap().facts, vec!["Likes cats"]);
        assert!(reloaded.contains_topic("New"));
    }

    #[test]
    fn persist_replaces_the_file_without_leaving_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.json");

        let mut store = FactStore::open(&path);
        store.learn("Game", "Celeste");
        store.learn("Game", "Strawberries everywhere");

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("memory.json")]);
        let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["Game"]["facts"][1], "Strawberries everywhere");
    }
}
