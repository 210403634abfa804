use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Key of the persona prompt inside the prompts directory (`system.md`).
pub const SYSTEM_PROMPT_KEY: &str = "system";

const STREAMER_PLACEHOLDER: &str = "{streamer}";

/// Reads every `.md` file in `dir_path`, keyed by file stem.
pub fn load_prompts(dir_path: &Path) -> Result<HashMap<String, String>> {
    let entries = fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read prompts directory: {}", dir_path.display()))?;

    let mut prompts = HashMap::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("md") {
            continue;
        }
        let key = path
            .file_stem()
            .and_then(|s| s.to_str())
            .context("Could not get file stem for prompt file")?
            .to_string();
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;
        prompts.insert(key, content);
    }

    Ok(prompts)
}

/// The persona prompt with the streamer's name filled in.
pub fn system_prompt(prompts: &HashMap<String, String>, streamer: &str) -> Result<String> {
    let template = prompts
        .get(SYSTEM_PROMPT_KEY)
        .with_context(|| format!("Missing '{SYSTEM_PROMPT_KEY}.md' in prompts directory"))?;
    Ok(template.replace(STREAMER_PLACEHOLDER, streamer).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn loads_only_markdown_files() -> Result<()> {
        let dir = tempdir()?;
        let dir_path = dir.path();

        let mut system = File::create(dir_path.join("system.md"))?;
        writeln!(system, "You hang out in {{streamer}}'s chat.")?;
        let mut notes = File::create(dir_path.join("notes.txt"))?;
        writeln!(notes, "not a prompt")?;
        std::fs::create_dir(dir_path.join("drafts.md"))?;

        let prompts = load_prompts(dir_path)?;

        assert_eq!(prompts.len(), 1, "Should only load .md files");
        assert_eq!(
            prompts.get("system").unwrap(),
            "You hang out in {streamer}'s chat.\n"
        );
        Ok(())
    }

    #[test]
    fn nonexistent_dir_is_an_error() {
        let result = load_prompts(Path::new("nonexistent_dir_for_testing_prompts"));
        assert!(result.is_err());
    }

    #[test]
    fn system_prompt_fills_in_the_streamer() -> Result<()> {
        let mut prompts = HashMap::new();
        prompts.insert(
            "system".to_string(),
            "Be nice to {streamer}. {streamer} is the boss.\n".to_string(),
        );

        assert_eq!(
            system_prompt(&prompts, "remmold")?,
            "Be nice to remmold. remmold is the boss."
        );
        Ok(())
    }

    #[test]
    fn missing_system_prompt_is_an_error() {
        let err = system_prompt(&HashMap::new(), "remmold").unwrap_err();
        assert!(err.to_string().contains("system.md"));
    }
}
