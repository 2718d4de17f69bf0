use crate::core::config::SourceSimConfig;
use crate::core::novel::ChapterPayload;
use crate::services::generator::ChapterGenerator;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::Rng;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A synthetic delivery source. There is no real network selection behind
/// these; latency and drop rate are simulated per source.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub name: String,
    pub latency: Duration,
    pub drop_rate: f64,
}

pub struct SourceDirectory {
    sources: Vec<SourceInfo>,
    active: Mutex<usize>,
}

impl SourceDirectory {
    pub fn simulate(cfg: &SourceSimConfig) -> Self {
        let mut rng = rand::rng();
        let count = cfg.count.max(1);
        let low = cfg.min_latency_ms.min(cfg.max_latency_ms);
        let high = cfg.max_latency_ms.max(cfg.min_latency_ms);

        let sources = (0..count)
            .map(|i| SourceInfo {
                name: if i == 0 {
                    "primary".to_string()
                } else {
                    format!("mirror-{i}")
                },
                latency: Duration::from_millis(rng.random_range(low..=high)),
                drop_rate: cfg.drop_rate.clamp(0.0, 1.0),
            })
            .collect();

        Self {
            sources,
            active: Mutex::new(0),
        }
    }

    pub fn list(&self) -> &[SourceInfo] {
        &self.sources
    }

    pub fn select(&self, index: usize) {
        if index < self.sources.len() {
            *self.active.lock().unwrap() = index;
        }
    }

    /// Rotate to the next source; called when the reader switches away from
    /// a failing source.
    pub fn advance(&self) {
        let mut active = self.active.lock().unwrap();
        *active = (*active + 1) % self.sources.len();
    }

    pub fn active(&self) -> SourceInfo {
        self.sources[*self.active.lock().unwrap()].clone()
    }
}

/// Decorates a generator with the active source's simulated latency and
/// transient drops.
pub struct SourcedGenerator {
    inner: Arc<dyn ChapterGenerator>,
    directory: Arc<SourceDirectory>,
}

impl SourcedGenerator {
    pub fn new(inner: Arc<dyn ChapterGenerator>, directory: Arc<SourceDirectory>) -> Self {
        Self { inner, directory }
    }
}

#[async_trait]
impl ChapterGenerator for SourcedGenerator {
    async fn generate(&self, novel: &str, index: usize) -> Result<ChapterPayload> {
        let source = self.directory.active();
        let dropped = rand::rng().random::<f64>() < source.drop_rate;

        tokio::time::sleep(source.latency).await;

        if dropped {
            return Err(anyhow!("source {} dropped the request", source.name));
        }
        self.inner.generate(novel, index).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim_config() -> SourceSimConfig {
        SourceSimConfig {
            count: 3,
            min_latency_ms: 10,
            max_latency_ms: 50,
            drop_rate: 0.0,
        }
    }

    #[test]
    fn simulate_respects_count_and_latency_bounds() {
        let directory = SourceDirectory::simulate(&sim_config());
        assert_eq!(directory.list().len(), 3);
        for source in directory.list() {
            let ms = source.latency.as_millis() as u64;
            assert!((10..=50).contains(&ms), "latency out of range: {ms}");
        }
        assert_eq!(directory.list()[0].name, "primary");
        assert_eq!(directory.list()[1].name, "mirror-1");
    }

    #[test]
    fn advance_wraps_around() {
        let directory = SourceDirectory::simulate(&sim_config());
        assert_eq!(directory.active().name, "primary");
        directory.advance();
        assert_eq!(directory.active().name, "mirror-1");
        directory.advance();
        directory.advance();
        assert_eq!(directory.active().name, "primary");
    }

    #[test]
    fn select_out_of_range_is_ignored() {
        let directory = SourceDirectory::simulate(&sim_config());
        directory.select(2);
        assert_eq!(directory.active().name, "mirror-2");
        directory.select(99);
        assert_eq!(directory.active().name, "mirror-2");
    }
}
