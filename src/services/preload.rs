use crate::core::novel::ChapterKey;
use crate::services::chapters::ChapterService;
use log::debug;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Best-effort background warming of upcoming chapters. A fixed worker pool
/// drains a FIFO queue, so preloads can never occupy more than `workers`
/// generator slots; foreground fetches bypass the pool entirely.
pub struct PreloadScheduler {
    tx: mpsc::UnboundedSender<ChapterKey>,
    queued: Arc<Mutex<HashSet<ChapterKey>>>,
    chapters: ChapterService,
}

impl PreloadScheduler {
    pub fn new(chapters: ChapterService, workers: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let queued = Arc::new(Mutex::new(HashSet::new()));

        for slot in 0..workers.max(1) {
            tokio::spawn(Self::worker(
                slot,
                Arc::clone(&rx),
                chapters.clone(),
                Arc::clone(&queued),
            ));
        }

        Self {
            tx,
            queued,
            chapters,
        }
    }

    /// Fire-and-forget. Skips keys that are cached, in flight, or already
    /// queued; duplicates that slip past the queued set still coalesce on
    /// the coordinator's in-flight table.
    pub fn schedule(&self, key: ChapterKey) {
        if self.chapters.is_resident(&key) {
            return;
        }
        if !self.queued.lock().unwrap().insert(key.clone()) {
            return;
        }
        debug!("queueing preload for {key}");
        let _ = self.tx.send(key);
    }

    async fn worker(
        slot: usize,
        rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<ChapterKey>>>,
        chapters: ChapterService,
        queued: Arc<Mutex<HashSet<ChapterKey>>>,
    ) {
        loop {
            let key = {
                let mut guard = rx.lock().await;
                match guard.recv().await {
                    Some(key) => key,
                    None => break,
                }
            };
            queued.lock().unwrap().remove(&key);

            // Preload failures are invisible to the reader: log and move on.
            match chapters.fetch(&key).await {
                Ok(_) => debug!("preload worker {slot} warmed {key}"),
                Err(e) => debug!("preload worker {slot} discarded {key}: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::novel::ChapterPayload;
    use crate::services::generator::ChapterGenerator;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct TrackingGenerator {
        calls: AtomicUsize,
        running: AtomicUsize,
        peak: AtomicUsize,
        fail_for: Mutex<HashSet<ChapterKey>>,
        delay: Duration,
    }

    impl TrackingGenerator {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                fail_for: Mutex::new(HashSet::new()),
                delay,
            })
        }
    }

    #[async_trait]
    impl ChapterGenerator for TrackingGenerator {
        async fn generate(&self, novel: &str, index: usize) -> Result<ChapterPayload> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            let key = ChapterKey::new(novel, index);
            if self.fail_for.lock().unwrap().contains(&key) {
                return Err(anyhow!("simulated preload failure for {key}"));
            }
            Ok(ChapterPayload {
                title: format!("Chapter {}", index + 1),
                body: "A long dusk settled over the valley. ".repeat(64),
                sequence: index + 1,
                key,
            })
        }
    }

    async fn wait_until(what: &str, mut check: impl FnMut() -> bool) {
        for _ in 0..500 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {what}");
    }

    #[tokio::test]
    async fn pool_bounds_concurrent_preloads() {
        let generator = TrackingGenerator::new(Duration::from_millis(40));
        let service = ChapterService::new(generator.clone(), 64);
        let scheduler = PreloadScheduler::new(service.clone(), 3);

        for index in 0..9 {
            scheduler.schedule(ChapterKey::new("NovelA", index));
        }

        wait_until("all preloads to land in cache", || {
            (0..9).all(|i| service.cached(&ChapterKey::new("NovelA", i)).is_some())
        })
        .await;

        assert_eq!(generator.calls.load(Ordering::SeqCst), 9);
        assert!(
            generator.peak.load(Ordering::SeqCst) <= 3,
            "preload concurrency exceeded the pool size"
        );
    }

    #[tokio::test]
    async fn duplicate_schedule_coalesces() {
        let generator = TrackingGenerator::new(Duration::from_millis(30));
        let service = ChapterService::new(generator.clone(), 64);
        let scheduler = PreloadScheduler::new(service.clone(), 3);
        let key = ChapterKey::new("NovelA", 0);

        scheduler.schedule(key.clone());
        scheduler.schedule(key.clone());
        scheduler.schedule(key.clone());

        wait_until("chapter to be cached", || service.cached(&key).is_some()).await;
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

        // Scheduling a resolved key is a no-op.
        scheduler.schedule(key.clone());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_preload_is_swallowed_and_queue_continues() {
        let generator = TrackingGenerator::new(Duration::from_millis(10));
        let bad = ChapterKey::new("NovelA", 0);
        generator.fail_for.lock().unwrap().insert(bad.clone());

        let service = ChapterService::new(generator.clone(), 64);
        let scheduler = PreloadScheduler::new(service.clone(), 1);

        scheduler.schedule(bad.clone());
        let good = ChapterKey::new("NovelA", 1);
        scheduler.schedule(good.clone());

        wait_until("the second preload to complete", || {
            service.cached(&good).is_some()
        })
        .await;
        assert!(service.cached(&bad).is_none());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }
}
