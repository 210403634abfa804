use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Copies the fact file to `<stem>_backup_<YYYYmmdd-HHMMSS><ext>` next to it.
///
/// Returns `Ok(None)` when there is nothing to back up yet.
pub fn backup_fact_file(path: &Path) -> Result<Option<PathBuf>> {
    if !path.is_file() {
        return Ok(None);
    }
    let target = backup_path(path, &Local::now().format("%Y%m%d-%H%M%S").to_string());
    fs::copy(path, &target).with_context(|| {
        format!(
            "Failed to back up {} to {}",
            path.display(),
            target.display()
        )
    })?;
    Ok(Some(target))
}

fn backup_path(path: &Path, stamp: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    path.with_file_name(format!("{stem}_backup_{stamp}{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn backup_name_keeps_stem_and_extension() {
        assert_eq!(
            backup_path(Path::new("data/lorelei_memory.json"), "20240101-120000"),
            PathBuf::from("data/lorelei_memory_backup_20240101-120000.json")
        );
        assert_eq!(
            backup_path(Path::new("memory"), "20240101-120000"),
            PathBuf::from("memory_backup_20240101-120000")
        );
    }

    #[test]
    fn copies_existing_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("lorelei_memory.json");
        fs::write(&path, r#"{"Current Game":{"category":"General","facts":["Hades"]}}"#)?;

        let backup = backup_fact_file(&path)?.expect("backup should be written");

        assert!(backup.starts_with(dir.path()));
        let name = backup.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("lorelei_memory_backup_"));
        assert!(name.ends_with(".json"));
        assert_eq!(fs::read_to_string(&backup)?, fs::read_to_string(&path)?);
        Ok(())
    }

    #[test]
    fn missing_file_is_skipped() -> Result<()> {
        let dir = tempdir()?;
        assert_eq!(backup_fact_file(&dir.path().join("absent.json"))?, None);
        Ok(())
    }
}
