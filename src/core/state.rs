use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Last-read chapter per novel, persisted as json in the cache folder.
/// Chapter content itself is never persisted.
#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct ReadingState {
    pub last_read: HashMap<String, usize>,
}

fn state_path(cache_dir: &str) -> PathBuf {
    Path::new(cache_dir).join("state.json")
}

impl ReadingState {
    pub fn load(cache_dir: &str) -> Result<Self> {
        let path = state_path(cache_dir);
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(ReadingState::default())
        }
    }

    pub fn save(&self, cache_dir: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(state_path(cache_dir), content)?;
        Ok(())
    }

    pub fn bookmark(&mut self, novel: &str, index: usize) {
        self.last_read.insert(novel.to_string(), index);
    }

    pub fn resume(&self, novel: &str) -> Option<usize> {
        self.last_read.get(novel).copied()
    }
}
