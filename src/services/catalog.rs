use crate::core::novel::NovelSummary;
use crate::services::generator::strip_code_blocks;
use crate::services::llm::LlmClient;
use anyhow::{Context, Result};
use log::info;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub const RANKING_CATEGORIES: &[&str] = &["trending", "fantasy", "scifi", "romance", "mystery"];

const CATALOG_SYSTEM_PROMPT: &str =
    "You are the catalog service of a fiction platform. Respond with valid JSON only.";

/// Ranking lists and search over the generated catalog. Rankings are cached
/// in memory and mirrored to disk under the cache folder; search results are
/// not cached.
pub struct CatalogService {
    llm: Arc<dyn LlmClient>,
    cache_dir: PathBuf,
    rankings: Mutex<HashMap<String, Vec<NovelSummary>>>,
}

impl CatalogService {
    pub fn new(llm: Arc<dyn LlmClient>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            llm,
            cache_dir: cache_dir.into(),
            rankings: Mutex::new(HashMap::new()),
        }
    }

    pub async fn rankings(&self, category: &str) -> Result<Vec<NovelSummary>> {
        if let Some(hit) = self.rankings.lock().unwrap().get(category) {
            return Ok(hit.clone());
        }

        let path = self.ranking_cache_path(category);
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            if let Ok(list) = serde_json::from_str::<Vec<NovelSummary>>(&content) {
                info!("loaded {category} ranking from {}", path.display());
                self.remember(category, &list);
                return Ok(list);
            }
            // An unreadable cache file falls through to regeneration.
        }

        let prompt = format!(
            "List the current top 10 {category} web novels on the platform. \
             Return a JSON array of objects with fields \
             \"title\", \"author\", \"intro\" (one sentence), \
             \"category\" and \"popularity\" (integer 0-100)."
        );
        let list = self.ask(&prompt).await?;

        fs::create_dir_all(&self.cache_dir)?;
        fs::write(&path, serde_json::to_string_pretty(&list)?)?;
        self.remember(category, &list);
        Ok(list)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<NovelSummary>> {
        let prompt = format!(
            "A reader searched the platform for \"{query}\". \
             Return the matching web novels as a JSON array of objects with \
             fields \"title\", \"author\", \"intro\" (one sentence), \
             \"category\" and \"popularity\" (integer 0-100). \
             Return an empty array if nothing plausibly matches."
        );
        self.ask(&prompt).await
    }

    async fn ask(&self, prompt: &str) -> Result<Vec<NovelSummary>> {
        let raw = self.llm.chat(CATALOG_SYSTEM_PROMPT, prompt).await?;
        let clean = strip_code_blocks(&raw);
        serde_json::from_str(&clean)
            .with_context(|| format!("Failed to parse catalog JSON: {clean}"))
    }

    fn remember(&self, category: &str, list: &[NovelSummary]) {
        self.rankings
            .lock()
            .unwrap()
            .insert(category.to_string(), list.to_vec());
    }

    fn ranking_cache_path(&self, category: &str) -> PathBuf {
        self.cache_dir.join(format!("ranking_{category}.json"))
    }
}
