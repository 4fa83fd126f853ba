//! The model backend seam.
//!
//! The turn controller only needs three operations from whatever produces
//! replies: set the system message, start a response that streams deltas for
//! a fixed number of candidates, and record the reply the user picked.

use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// An incremental piece of text for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub index: usize,
    pub fragment: String,
}

impl Delta {
    pub fn new(index: usize, fragment: impl Into<String>) -> Self {
        Self {
            index,
            fragment: fragment.into(),
        }
    }
}

pub type DeltaStream = BoxStream<'static, Delta>;

/// A started response.
///
/// `deltas` yields events for indices in `0..expected` and ends exactly once,
/// after every candidate has finished or failed. Cancelling `cancel` asks the
/// producer to stop early.
pub struct ResponseStream {
    pub expected: usize,
    pub deltas: DeltaStream,
    pub cancel: CancellationToken,
}

impl ResponseStream {
    /// Wraps a channel receiver; the stream ends once every sender is dropped.
    pub fn from_receiver(
        expected: usize,
        mut rx: mpsc::UnboundedReceiver<Delta>,
        cancel: CancellationToken,
    ) -> Self {
        let deltas = stream::poll_fn(move |cx| rx.poll_recv(cx)).boxed();
        Self {
            expected,
            deltas,
            cancel,
        }
    }
}

pub trait ModelBackend: Send {
    /// Replaces the system message sent with every request. An empty string
    /// clears it.
    fn set_system_message(&mut self, text: &str);

    /// Starts generating candidates for `prompt`. An empty prompt asks for new
    /// candidates from the existing history.
    fn create_response(&mut self, prompt: &str) -> ResponseStream;

    /// Records the chosen reply in the backend's own history.
    fn append_assistant_message(&mut self, text: &str);
}

impl<B: ModelBackend + ?Sized> ModelBackend for Box<B> {
    fn set_system_message(&mut self, text: &str) {
        (**self).set_system_message(text)
    }

    fn create_response(&mut self, prompt: &str) -> ResponseStream {
        (**self).create_response(prompt)
    }

    fn append_assistant_message(&mut self, text: &str) {
        (**self).append_assistant_message(text)
    }
}
