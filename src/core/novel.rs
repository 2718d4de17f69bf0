use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache and dedup identity of a single chapter: novel title plus
/// zero-based chapter index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChapterKey {
    pub novel: String,
    pub index: usize,
}

impl ChapterKey {
    pub fn new(novel: impl Into<String>, index: usize) -> Self {
        Self {
            novel: novel.into(),
            index,
        }
    }

    pub fn next(&self) -> Self {
        Self::new(self.novel.clone(), self.index + 1)
    }
}

impl fmt::Display for ChapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.novel, self.index)
    }
}

/// Generated chapter content. Immutable once produced; the body is opaque
/// text apart from the minimum-length check in the fetch layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterPayload {
    pub key: ChapterKey,
    pub title: String,
    pub body: String,
    pub sequence: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NovelSummary {
    pub title: String,
    pub author: String,
    pub intro: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub popularity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display_is_stable() {
        assert_eq!(ChapterKey::new("NovelA", 0).to_string(), "NovelA-0");
    }

    #[test]
    fn next_advances_index_only() {
        let key = ChapterKey::new("NovelA", 3);
        let next = key.next();
        assert_eq!(next.novel, "NovelA");
        assert_eq!(next.index, 4);
    }
}
