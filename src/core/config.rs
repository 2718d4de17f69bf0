use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::services::llm::LlmConfig;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_cache")]
    pub cache_folder: String,

    #[serde(default)]
    pub reading: ReadingConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub sources: SourceSimConfig,

    pub llm: LlmConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReadingConfig {
    #[serde(default = "default_line_width")]
    pub line_width: usize,
    #[serde(default = "default_page_lines")]
    pub page_lines: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_min_body_chars")]
    pub min_body_chars: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_preload_workers")]
    pub preload_workers: usize,
    #[serde(default = "default_preload_depth")]
    pub preload_depth: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SourceSimConfig {
    #[serde(default = "default_source_count")]
    pub count: usize,
    #[serde(default = "default_min_latency_ms")]
    pub min_latency_ms: u64,
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,
    #[serde(default = "default_drop_rate")]
    pub drop_rate: f64,
}

fn default_cache() -> String {
    "cache".to_string()
}
fn default_line_width() -> usize {
    78
}
fn default_page_lines() -> usize {
    18
}
fn default_min_body_chars() -> usize {
    64
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    750
}
fn default_preload_workers() -> usize {
    3
}
fn default_preload_depth() -> usize {
    2
}
fn default_source_count() -> usize {
    4
}
fn default_min_latency_ms() -> u64 {
    120
}
fn default_max_latency_ms() -> u64 {
    900
}
fn default_drop_rate() -> f64 {
    0.15
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            line_width: default_line_width(),
            page_lines: default_page_lines(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            min_body_chars: default_min_body_chars(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            preload_workers: default_preload_workers(),
            preload_depth: default_preload_depth(),
        }
    }
}

impl Default for SourceSimConfig {
    fn default() -> Self {
        Self {
            count: default_source_count(),
            min_latency_ms: default_min_latency_ms(),
            max_latency_ms: default_max_latency_ms(),
            drop_rate: default_drop_rate(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Path::new("config.yml");
        if !path.exists() {
            anyhow::bail!("config.yml not found. Please create one.");
        }

        let content = fs::read_to_string(path).context("Failed to read config.yml")?;
        let config: Config =
            serde_yaml_ng::from_str(&content).context("Failed to parse config.yml")?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_yaml_ng::to_string(self)?;
        fs::write("config.yml", content).context("Failed to write config.yml")?;
        Ok(())
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.cache_folder)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_fills_defaults() {
        let yaml = r#"
llm:
  provider: ollama
  ollama:
    base_url: "http://localhost:11434"
    model: "llama3"
"#;
        let config: Config = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.cache_folder, "cache");
        assert_eq!(config.fetch.max_attempts, 3);
        assert_eq!(config.fetch.preload_workers, 3);
        assert_eq!(config.fetch.min_body_chars, 64);
        assert_eq!(config.reading.line_width, 78);
        assert_eq!(config.sources.count, 4);
    }
}
