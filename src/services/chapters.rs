use crate::core::novel::{ChapterKey, ChapterPayload};
use crate::services::generator::ChapterGenerator;
use anyhow::anyhow;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Failure of a single coordinated fetch. Clone so every caller joined on
/// the same in-flight request receives the identical error.
#[derive(Debug, Clone)]
pub enum FetchError {
    Adapter(Arc<anyhow::Error>),
    TooShort { chars: usize, min: usize },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Adapter(e) => write!(f, "chapter generation failed: {e:#}"),
            FetchError::TooShort { chars, min } => {
                write!(f, "generated body too short ({chars} chars, minimum {min})")
            }
        }
    }
}

impl std::error::Error for FetchError {}

type PendingFetch = Shared<BoxFuture<'static, Result<Arc<ChapterPayload>, FetchError>>>;

#[derive(Default)]
struct Maps {
    cache: HashMap<ChapterKey, Arc<ChapterPayload>>,
    in_flight: HashMap<ChapterKey, PendingFetch>,
}

struct Inner {
    generator: Arc<dyn ChapterGenerator>,
    min_body_chars: usize,
    // A key lives in at most one map at a time; both are only touched inside
    // the same critical section, and the lock is never held across an await.
    maps: Mutex<Maps>,
}

/// Memoizing fetch front for chapter generation. Cheap to clone; all clones
/// share the same cache and in-flight table.
#[derive(Clone)]
pub struct ChapterService {
    inner: Arc<Inner>,
}

impl ChapterService {
    pub fn new(generator: Arc<dyn ChapterGenerator>, min_body_chars: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                generator,
                min_body_chars,
                maps: Mutex::new(Maps::default()),
            }),
        }
    }

    /// Resolve a chapter: cache hit, join of the existing in-flight request,
    /// or a fresh generator invocation. For any number of concurrent callers
    /// there is at most one generator call per key until it settles.
    pub async fn fetch(&self, key: &ChapterKey) -> Result<Arc<ChapterPayload>, FetchError> {
        let pending = {
            let mut maps = self.inner.maps.lock().unwrap();
            if let Some(hit) = maps.cache.get(key) {
                return Ok(Arc::clone(hit));
            }
            if let Some(joined) = maps.in_flight.get(key) {
                debug!("joining in-flight fetch for {key}");
                joined.clone()
            } else {
                // Detached task: callers that stop waiting must not cancel
                // the generation, so a late result still warms the cache.
                let task = tokio::spawn(Inner::resolve(Arc::clone(&self.inner), key.clone()));
                let pending: PendingFetch = async move {
                    task.await.unwrap_or_else(|e| {
                        Err(FetchError::Adapter(Arc::new(anyhow!(
                            "generation task aborted: {e}"
                        ))))
                    })
                }
                .boxed()
                .shared();
                maps.in_flight.insert(key.clone(), pending.clone());
                pending
            }
        };
        pending.await
    }

    pub fn cached(&self, key: &ChapterKey) -> Option<Arc<ChapterPayload>> {
        self.inner.maps.lock().unwrap().cache.get(key).cloned()
    }

    /// True if the key is already resolved or currently being resolved.
    pub fn is_resident(&self, key: &ChapterKey) -> bool {
        let maps = self.inner.maps.lock().unwrap();
        maps.cache.contains_key(key) || maps.in_flight.contains_key(key)
    }
}

impl Inner {
    async fn resolve(self: Arc<Self>, key: ChapterKey) -> Result<Arc<ChapterPayload>, FetchError> {
        let outcome = match self.generator.generate(&key.novel, key.index).await {
            Ok(payload) => {
                let chars = payload.body.chars().count();
                if chars < self.min_body_chars {
                    Err(FetchError::TooShort {
                        chars,
                        min: self.min_body_chars,
                    })
                } else {
                    Ok(Arc::new(payload))
                }
            }
            Err(e) => Err(FetchError::Adapter(Arc::new(e))),
        };

        // Settle: vacate the in-flight slot first, then publish on success.
        // A failed key ends up in neither map and may be retried.
        let mut maps = self.maps.lock().unwrap();
        maps.in_flight.remove(&key);
        if let Ok(payload) = &outcome {
            maps.cache.insert(key, Arc::clone(payload));
        }
        outcome
    }
}
