//! The turn controller.
//!
//! [`App`] owns the conversation log, the current phase and the active
//! streaming session. Every input is turned into a [`TurnEvent`], run through
//! [`transition`], and the resulting effects are applied here. Only this type
//! writes to the log.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::core::backend::ModelBackend;
use crate::core::candidates::CandidateSet;
use crate::core::display::compute_display;
use crate::core::message::{ConversationLog, Role};
use crate::core::session::{GenerationComplete, SessionError, StreamingSession};
use crate::core::turn::{transition, Instruction, TurnEffect, TurnEvent, TurnPhase};

/// What the view has to do after an event was applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppOutcome {
    pub clear_input: bool,
    pub exit: bool,
}

impl AppOutcome {
    fn merge(&mut self, other: AppOutcome) {
        self.clear_input |= other.clear_input;
        self.exit |= other.exit;
    }
}

pub struct App<B> {
    backend: B,
    log: ConversationLog,
    phase: TurnPhase,
    instruction: Instruction,
    session: Option<StreamingSession>,
    next_generation: u64,
    done_tx: mpsc::UnboundedSender<GenerationComplete>,
    done_rx: mpsc::UnboundedReceiver<GenerationComplete>,
    exit_requested: bool,
}

impl<B: ModelBackend> App<B> {
    pub fn new(backend: B) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            log: ConversationLog::new(),
            phase: TurnPhase::AwaitingSystemPrompt,
            instruction: Instruction::SystemPrompt,
            session: None,
            next_generation: 0,
            done_tx,
            done_rx,
            exit_requested: false,
        }
    }

    pub fn submit(&mut self, text: &str) -> AppOutcome {
        self.apply(TurnEvent::Submit(text.to_string()))
    }

    pub fn quit(&mut self) -> AppOutcome {
        self.apply(TurnEvent::Quit)
    }

    /// Advances time by one control-loop tick.
    ///
    /// A phase that became ready on the previous tick moves on first, then
    /// completion reports from the background task are drained. An error means
    /// the consumption task died without closing its stream.
    pub fn tick(&mut self) -> Result<AppOutcome, SessionError> {
        let mut outcome = self.apply(TurnEvent::Tick);
        outcome.merge(self.poll_generation()?);
        Ok(outcome)
    }

    pub fn apply(&mut self, event: TurnEvent) -> AppOutcome {
        let from = self.phase;
        let step = transition(from, event);
        if step.phase != from {
            debug!(?from, to = ?step.phase, "turn transition");
        }
        self.phase = step.phase;

        let mut outcome = AppOutcome::default();
        for effect in step.effects {
            self.run_effect(effect, &mut outcome);
        }
        outcome
    }

    fn run_effect(&mut self, effect: TurnEffect, outcome: &mut AppOutcome) {
        match effect {
            TurnEffect::SetSystemMessage(text) => {
                info!(empty = text.is_empty(), "system message set");
                self.backend.set_system_message(&text);
            }
            TurnEffect::AppendMessage(message) => self.log.push(message),
            TurnEffect::StartGeneration { prompt } => self.start_generation(&prompt),
            TurnEffect::CommitCandidate { index } => self.commit_candidate(index),
            TurnEffect::ClearInput => outcome.clear_input = true,
            TurnEffect::SetInstruction(instruction) => self.instruction = instruction,
            TurnEffect::Exit => {
                if let Some(session) = self.session.take() {
                    debug!(
                        generation = session.generation(),
                        "abandoning session on exit"
                    );
                    session.abandon();
                }
                self.exit_requested = true;
                outcome.exit = true;
            }
        }
    }

    fn start_generation(&mut self, prompt: &str) {
        if let Some(previous) = self.session.take() {
            previous.abandon();
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let response = self.backend.create_response(prompt);
        info!(
            generation,
            candidates = response.expected,
            regenerate = prompt.is_empty(),
            "generation started"
        );
        self.session = Some(StreamingSession::spawn(
            generation,
            response,
            self.done_tx.clone(),
        ));
    }

    fn commit_candidate(&mut self, index: usize) {
        let Some(session) = self.session.take() else {
            return;
        };
        let text = session.candidates().get(index).unwrap_or_default();
        info!(
            generation = session.generation(),
            index,
            chars = text.chars().count(),
            "candidate committed"
        );
        self.backend.append_assistant_message(&text);
        self.log.append(Role::Assistant, text);
    }

    fn poll_generation(&mut self) -> Result<AppOutcome, SessionError> {
        let mut outcome = self.drain_completions();
        if self.phase.is_busy() {
            if let Some(session) = &self.session {
                if session.is_finished() {
                    // The task may have reported between the drain and this check.
                    outcome.merge(self.drain_completions());
                    if self.phase.is_busy() {
                        if let Some(session) = &self.session {
                            return Err(SessionError {
                                generation: session.generation(),
                            });
                        }
                    }
                }
            }
        }
        Ok(outcome)
    }

    fn drain_completions(&mut self) -> AppOutcome {
        let mut outcome = AppOutcome::default();
        while let Ok(done) = self.done_rx.try_recv() {
            let current = self.session.as_ref().map(StreamingSession::generation);
            if current != Some(done.generation) {
                debug!(generation = done.generation, "ignoring stale completion");
                continue;
            }
            outcome.merge(self.apply(TurnEvent::GenerationFinished {
                candidates: done.candidates,
            }));
        }
        outcome
    }

    pub fn display(&self) -> String {
        let snapshot = self.candidates();
        compute_display(self.phase, &self.log, snapshot.as_ref())
    }

    pub fn candidates(&self) -> Option<CandidateSet> {
        self.session
            .as_ref()
            .map(|session| session.candidates().snapshot())
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn instruction(&self) -> &'static str {
        self.instruction.text()
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }
}
