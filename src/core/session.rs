//! Background consumption of a started response.
//!
//! Each generation gets its own [`StreamingSession`]: a freshly allocated
//! candidate set plus a tokio task that drains the delta stream into it. When
//! the stream closes the task reports [`GenerationComplete`] over a channel
//! that the control loop polls on every tick.

use futures_util::StreamExt;
use std::error::Error as StdError;
use std::fmt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::backend::ResponseStream;
use super::candidates::SharedCandidates;

/// Sent by the consumption task once its stream has closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationComplete {
    pub generation: u64,
    pub candidates: usize,
}

/// The consumption task for a generation stopped without reporting closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionError {
    pub generation: u64,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "generation {} stopped before its response stream closed",
            self.generation
        )
    }
}

impl StdError for SessionError {}

pub struct StreamingSession {
    generation: u64,
    candidates: SharedCandidates,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl StreamingSession {
    /// Spawns the consumption task. Must be called from within a tokio runtime.
    pub fn spawn(
        generation: u64,
        response: ResponseStream,
        done_tx: mpsc::UnboundedSender<GenerationComplete>,
    ) -> Self {
        let ResponseStream {
            expected,
            mut deltas,
            cancel,
        } = response;
        let candidates = SharedCandidates::new(expected);
        let sink = candidates.clone();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut received = 0usize;
            loop {
                tokio::select! {
                    biased;
                    _ = task_cancel.cancelled() => {
                        debug!(generation, received, "generation abandoned");
                        return;
                    }
                    next = deltas.next() => match next {
                        Some(delta) => {
                            sink.apply_delta(delta.index, &delta.fragment);
                            received += 1;
                        }
                        None => break,
                    },
                }
            }

            debug!(generation, received, "response stream closed");
            let _ = done_tx.send(GenerationComplete {
                generation,
                candidates: expected,
            });
        });

        Self {
            generation,
            candidates,
            cancel,
            handle,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn candidates(&self) -> &SharedCandidates {
        &self.candidates
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops the producer and the consumption task without waiting for either.
    pub fn abandon(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::Delta;
    use std::time::Duration;

    fn response(expected: usize) -> (mpsc::UnboundedSender<Delta>, ResponseStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        let response = ResponseStream::from_receiver(expected, rx, CancellationToken::new());
        (tx, response)
    }

    #[tokio::test]
    async fn closure_reports_completion_with_partial_candidates() {
        let (tx, response) = response(3);
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let session = StreamingSession::spawn(7, response, done_tx);

        tx.send(Delta::new(0, "zero")).expect("send");
        tx.send(Delta::new(2, "two")).expect("send");
        drop(tx);

        let done = tokio::time::timeout(Duration::from_secs(1), done_rx.recv())
            .await
            .expect("completion in time")
            .expect("completion event");
        assert_eq!(
            done,
            GenerationComplete {
                generation: 7,
                candidates: 3
            }
        );

        let set = session.candidates().snapshot();
        assert_eq!(set.get(0), Some("zero"));
        assert_eq!(set.get(1), Some(""));
        assert_eq!(set.get(2), Some("two"));
    }

    #[tokio::test]
    async fn abandoned_session_never_reports_completion() {
        let (tx, response) = response(1);
        let token = response.cancel.clone();
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let session = StreamingSession::spawn(1, response, done_tx);

        session.abandon();
        assert!(token.is_cancelled());

        for _ in 0..50 {
            if session.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(session.is_finished());
        assert!(done_rx.try_recv().is_err());
        drop(tx);
    }

    #[tokio::test]
    async fn each_session_writes_only_its_own_set() {
        let (old_tx, old_response) = response(1);
        let (new_tx, new_response) = response(1);
        let (done_tx, _done_rx) = mpsc::unbounded_channel();

        let old = StreamingSession::spawn(1, old_response, done_tx.clone());
        let new = StreamingSession::spawn(2, new_response, done_tx);

        old_tx.send(Delta::new(0, "stale")).expect("send");
        new_tx.send(Delta::new(0, "fresh")).expect("send");
        drop(old_tx);
        drop(new_tx);

        for _ in 0..50 {
            if old.is_finished() && new.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(old.candidates().get(0).as_deref(), Some("stale"));
        assert_eq!(new.candidates().get(0).as_deref(), Some("fresh"));
    }
}
