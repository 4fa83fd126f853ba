use crate::core::app::App;
use crate::core::backend::{Delta, ModelBackend, ResponseStream};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// In-memory backend whose streams are driven by the test.
pub struct ScriptedBackend {
    pub expected: usize,
    pub system_messages: Vec<String>,
    pub prompts: Vec<String>,
    pub assistant_messages: Vec<String>,
    pub cancel_tokens: Vec<CancellationToken>,
    sender: Option<mpsc::UnboundedSender<Delta>>,
}

impl ScriptedBackend {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            system_messages: Vec::new(),
            prompts: Vec::new(),
            assistant_messages: Vec::new(),
            cancel_tokens: Vec::new(),
            sender: None,
        }
    }

    /// Emits a delta on the most recent response stream.
    pub fn send(&self, index: usize, fragment: &str) {
        if let Some(tx) = &self.sender {
            let _ = tx.send(Delta::new(index, fragment));
        }
    }

    /// Closes the most recent response stream.
    pub fn close(&mut self) {
        self.sender = None;
    }

    pub fn last_cancel_token(&self) -> Option<&CancellationToken> {
        self.cancel_tokens.last()
    }
}

impl ModelBackend for ScriptedBackend {
    fn set_system_message(&mut self, text: &str) {
        self.system_messages.push(text.to_string());
    }

    fn create_response(&mut self, prompt: &str) -> ResponseStream {
        self.prompts.push(prompt.to_string());
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        self.cancel_tokens.push(cancel.clone());
        self.sender = Some(tx);
        ResponseStream::from_receiver(self.expected, rx, cancel)
    }

    fn append_assistant_message(&mut self, text: &str) {
        self.assistant_messages.push(text.to_string());
    }
}

pub fn create_test_app(expected: usize) -> App<ScriptedBackend> {
    App::new(ScriptedBackend::new(expected))
}

/// Ticks the app until `done` holds, yielding to the runtime between ticks.
pub async fn tick_until(
    app: &mut App<ScriptedBackend>,
    mut done: impl FnMut(&App<ScriptedBackend>) -> bool,
) {
    for _ in 0..200 {
        app.tick().expect("consumption task alive");
        if done(app) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached; phase is {:?}", app.phase());
}
