use anyhow::{Context, Result};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Post ids that have already been reposted, mirrored to a JSON file.
#[derive(Debug)]
pub struct History {
    path: PathBuf,
    ids: HashSet<String>,
}

impl History {
    /// Load history from `path`. A missing or unreadable file starts an empty history.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let ids = match read_ids(&path) {
            Ok(Some(ids)) => {
                info!("Loaded {} posts from history file", ids.len());
                ids
            }
            Ok(None) => {
                info!("No history file found. Starting with empty history");
                HashSet::new()
            }
            Err(e) => {
                error!("Error loading history file: {:#}", e);
                HashSet::new()
            }
        };

        Self { path, ids }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Add `id` and rewrite the file before returning.
    pub fn record(&mut self, id: &str) -> Result<()> {
        if self.ids.insert(id.to_string()) {
            self.save()?;
        }
        Ok(())
    }

    /// Write the full set to disk, replacing the previous file in one rename.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create history directory")?;
        }

        let sorted: BTreeSet<&String> = self.ids.iter().collect();
        let json = serde_json::to_string_pretty(&sorted).context("Failed to serialize history")?;

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        fs::write(&temp_path, json)
            .with_context(|| format!("Failed to write history file: {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("Failed to replace history file: {}", self.path.display()))?;

        info!("Saved {} posts to history file", self.ids.len());
        Ok(())
    }
}

fn read_ids(path: &Path) -> Result<Option<HashSet<String>>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file: {}", path.display()))?;

    let ids: Vec<String> = serde_json::from_str(&content).with_context(|| {
        format!(
            "Failed to parse history JSON from {}. The file may be corrupted.",
            path.display()
        )
    })?;

    Ok(Some(ids.into_iter().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let history = History::load(dir.path().join("history.json"));

        assert!(history.is_empty());
        assert!(!history.contains("1"));
    }

    #[test]
    fn test_record_persists_across_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");

        let mut history = History::load(&path);
        history.record("123_456").unwrap();
        assert!(history.contains("123_456"));

        let reloaded = History::load(&path);
        assert!(reloaded.contains("123_456"));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_file_is_sorted_json_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");

        let mut history = History::load(&path);
        history.record("b").unwrap();
        history.record("a").unwrap();
        history.record("b").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let ids: Vec<String> = serde_json::from_str(&content).unwrap();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
        assert!(!dir.path().join("history.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{not valid").unwrap();

        let mut history = History::load(&path);
        assert!(history.is_empty());

        // Recording overwrites the corrupt file with a valid one
        history.record("1").unwrap();
        assert!(History::load(&path).contains("1"));
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("history.json");

        let mut history = History::load(&path);
        history.record("9").unwrap();

        assert!(path.exists());
        assert_eq!(history.path(), path.as_path());
    }
}
