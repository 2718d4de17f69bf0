use crate::core::novel::{ChapterKey, ChapterPayload};
use crate::services::chapters::{ChapterService, FetchError};
use log::warn;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const PRIMARY_SOURCE_LABEL: &str = "primary";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPhase {
    Idle,
    Loading,
    Retrying,
    Success,
    FinalFailure,
}

/// The whole of the session state visible to the surrounding UI.
#[derive(Debug, Clone)]
pub struct ReadStatus {
    pub phase: ReadPhase,
    pub attempt: u32,
    pub source_label: String,
}

/// One foreground read of one chapter. Drives a bounded retry loop over the
/// fetch coordinator and reports every transition on the event channel.
/// Exactly one fetch is in flight per session; dropping the session mid-read
/// never cancels a fetch the coordinator already started.
pub struct ReaderSession {
    chapters: ChapterService,
    key: ChapterKey,
    max_attempts: u32,
    retry_delay: Duration,
    events: mpsc::UnboundedSender<ReadStatus>,
}

impl ReaderSession {
    pub fn new(
        chapters: ChapterService,
        key: ChapterKey,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<ReadStatus>) {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            chapters,
            key,
            max_attempts: max_attempts.max(1),
            retry_delay,
            events,
        };
        (session, rx)
    }

    fn emit(&self, phase: ReadPhase, attempt: u32, label: &str) {
        // The receiver may already be gone for an abandoned session.
        let _ = self.events.send(ReadStatus {
            phase,
            attempt,
            source_label: label.to_string(),
        });
    }

    pub async fn run(self) -> Result<Arc<ChapterPayload>, FetchError> {
        let mut attempt = 0u32;
        let mut label = PRIMARY_SOURCE_LABEL.to_string();
        self.emit(ReadPhase::Loading, attempt, &label);

        loop {
            match self.chapters.fetch(&self.key).await {
                Ok(payload) => {
                    self.emit(ReadPhase::Success, attempt, &label);
                    return Ok(payload);
                }
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        warn!(
                            "giving up on {} after {} attempts: {}",
                            self.key, attempt, err
                        );
                        self.emit(ReadPhase::FinalFailure, attempt, &label);
                        return Err(err);
                    }
                    // Each retry is a fresh coordinator attempt; the failed
                    // one already vacated the in-flight table.
                    label = format!("fallback-{attempt}");
                    self.emit(ReadPhase::Retrying, attempt, &label);
                    tokio::time::sleep(self.retry_delay).await;
                    self.emit(ReadPhase::Loading, attempt, &label);
                }
            }
        }
    }
}
