//! The turn state machine.
//!
//! [`transition`] is a pure function from the current [`TurnPhase`] and an
//! incoming [`TurnEvent`] to the next phase plus the [`TurnEffect`]s the
//! controller has to carry out. It never touches the backend, the log or the
//! candidates itself.

use super::message::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingSystemPrompt,
    AwaitingUserMessage,
    /// A response is streaming. Only quitting is accepted.
    Generating,
    /// The stream closed; becomes `ChoosingCandidate` on the next tick.
    CandidatesReady { candidates: usize },
    ChoosingCandidate { candidates: usize },
}

impl TurnPhase {
    pub fn is_busy(self) -> bool {
        matches!(self, TurnPhase::Generating)
    }

    /// Whether the pending turn's candidates belong on screen.
    pub fn shows_candidates(self) -> bool {
        matches!(
            self,
            TurnPhase::Generating
                | TurnPhase::CandidatesReady { .. }
                | TurnPhase::ChoosingCandidate { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    Submit(String),
    GenerationFinished { candidates: usize },
    Tick,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    SystemPrompt,
    UserMessage,
    Wait,
    ChooseCandidate,
}

impl Instruction {
    pub fn text(self) -> &'static str {
        match self {
            Instruction::SystemPrompt => {
                "Enter a system message (or leave empty) and press Enter to set it. Press Ctrl+C to quit."
            }
            Instruction::UserMessage => {
                "Enter a message and press Enter to send it. Press Ctrl+C to quit."
            }
            Instruction::Wait => "Wait...",
            Instruction::ChooseCandidate => {
                "Choose an option by typing its number and pressing Enter, typing anything else will regenerate the reply. Press Ctrl+C to quit."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEffect {
    SetSystemMessage(String),
    AppendMessage(Message),
    /// Abandon any previous candidates and start streaming new ones.
    StartGeneration { prompt: String },
    /// Move candidate `index` into the log and the backend history.
    CommitCandidate { index: usize },
    ClearInput,
    SetInstruction(Instruction),
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub phase: TurnPhase,
    pub effects: Vec<TurnEffect>,
}

impl Transition {
    fn stay(phase: TurnPhase) -> Self {
        Self {
            phase,
            effects: Vec::new(),
        }
    }

    fn to(phase: TurnPhase, effects: Vec<TurnEffect>) -> Self {
        Self { phase, effects }
    }
}

pub fn transition(phase: TurnPhase, event: TurnEvent) -> Transition {
    if event == TurnEvent::Quit {
        return Transition::to(phase, vec![TurnEffect::Exit]);
    }

    match (phase, event) {
        (TurnPhase::AwaitingSystemPrompt, TurnEvent::Submit(text)) => {
            let prompt = text.trim().to_string();
            let mut effects = vec![TurnEffect::SetSystemMessage(prompt.clone())];
            if !prompt.is_empty() {
                effects.push(TurnEffect::AppendMessage(Message::system(prompt)));
            }
            effects.push(TurnEffect::ClearInput);
            effects.push(TurnEffect::SetInstruction(Instruction::UserMessage));
            Transition::to(TurnPhase::AwaitingUserMessage, effects)
        }

        (TurnPhase::AwaitingUserMessage, TurnEvent::Submit(text)) => start_generation(&text),

        (TurnPhase::Generating, TurnEvent::GenerationFinished { candidates }) => {
            Transition::stay(TurnPhase::CandidatesReady { candidates })
        }

        (TurnPhase::CandidatesReady { candidates }, TurnEvent::Tick) => Transition::to(
            TurnPhase::ChoosingCandidate { candidates },
            vec![
                TurnEffect::ClearInput,
                TurnEffect::SetInstruction(Instruction::ChooseCandidate),
            ],
        ),

        (TurnPhase::ChoosingCandidate { candidates }, TurnEvent::Submit(text)) => {
            match parse_selection(&text, candidates) {
                Some(index) => Transition::to(
                    TurnPhase::AwaitingUserMessage,
                    vec![
                        TurnEffect::CommitCandidate { index },
                        TurnEffect::ClearInput,
                        TurnEffect::SetInstruction(Instruction::UserMessage),
                    ],
                ),
                None => start_generation(&text),
            }
        }

        (phase, _) => Transition::stay(phase),
    }
}

fn start_generation(text: &str) -> Transition {
    let prompt = text.trim().to_string();
    let mut effects = Vec::with_capacity(4);
    if !prompt.is_empty() {
        effects.push(TurnEffect::AppendMessage(Message::user(prompt.clone())));
    }
    effects.push(TurnEffect::StartGeneration { prompt });
    effects.push(TurnEffect::ClearInput);
    effects.push(TurnEffect::SetInstruction(Instruction::Wait));
    Transition::to(TurnPhase::Generating, effects)
}

/// Returns the candidate index `text` names, if it names one.
pub fn parse_selection(text: &str, candidates: usize) -> Option<usize> {
    let value = text.trim().parse::<i64>().ok()?;
    usize::try_from(value).ok().filter(|index| *index < candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choosing(candidates: usize) -> TurnPhase {
        TurnPhase::ChoosingCandidate { candidates }
    }

    fn submit(text: &str) -> TurnEvent {
        TurnEvent::Submit(text.to_string())
    }

    #[test]
    fn system_prompt_is_trimmed_set_and_logged() {
        let t = transition(TurnPhase::AwaitingSystemPrompt, submit("  be terse \n"));
        assert_eq!(t.phase, TurnPhase::AwaitingUserMessage);
        assert_eq!(
            t.effects,
            vec![
                TurnEffect::SetSystemMessage("be terse".into()),
                TurnEffect::AppendMessage(Message::system("be terse")),
                TurnEffect::ClearInput,
                TurnEffect::SetInstruction(Instruction::UserMessage),
            ]
        );
    }

    #[test]
    fn empty_system_prompt_still_sets_message_once_without_logging() {
        let t = transition(TurnPhase::AwaitingSystemPrompt, submit("   "));
        assert_eq!(t.phase, TurnPhase::AwaitingUserMessage);
        let sets: Vec<_> = t
            .effects
            .iter()
            .filter(|e| matches!(e, TurnEffect::SetSystemMessage(_)))
            .collect();
        assert_eq!(sets, vec![&TurnEffect::SetSystemMessage(String::new())]);
        assert!(!t
            .effects
            .iter()
            .any(|e| matches!(e, TurnEffect::AppendMessage(_))));
    }

    #[test]
    fn user_message_starts_generation() {
        let t = transition(TurnPhase::AwaitingUserMessage, submit(" hi "));
        assert_eq!(t.phase, TurnPhase::Generating);
        assert_eq!(
            t.effects,
            vec![
                TurnEffect::AppendMessage(Message::user("hi")),
                TurnEffect::StartGeneration {
                    prompt: "hi".into()
                },
                TurnEffect::ClearInput,
                TurnEffect::SetInstruction(Instruction::Wait),
            ]
        );
    }

    #[test]
    fn generating_ignores_everything_but_completion_and_quit() {
        for event in [submit("0"), submit("hello"), TurnEvent::Tick] {
            let t = transition(TurnPhase::Generating, event);
            assert_eq!(t, Transition::stay(TurnPhase::Generating));
        }

        let t = transition(
            TurnPhase::Generating,
            TurnEvent::GenerationFinished { candidates: 3 },
        );
        assert_eq!(t.phase, TurnPhase::CandidatesReady { candidates: 3 });
        assert!(t.effects.is_empty());
    }

    #[test]
    fn candidates_ready_advances_on_tick_only() {
        let ready = TurnPhase::CandidatesReady { candidates: 2 };
        assert_eq!(transition(ready, submit("1")), Transition::stay(ready));

        let t = transition(ready, TurnEvent::Tick);
        assert_eq!(t.phase, choosing(2));
        assert_eq!(
            t.effects,
            vec![
                TurnEffect::ClearInput,
                TurnEffect::SetInstruction(Instruction::ChooseCandidate),
            ]
        );
    }

    #[test]
    fn valid_selection_commits_candidate() {
        let t = transition(choosing(2), submit("1"));
        assert_eq!(t.phase, TurnPhase::AwaitingUserMessage);
        assert_eq!(t.effects[0], TurnEffect::CommitCandidate { index: 1 });

        let t = transition(choosing(2), submit(" 0 "));
        assert_eq!(t.effects[0], TurnEffect::CommitCandidate { index: 0 });
    }

    #[test]
    fn anything_else_while_choosing_regenerates() {
        for text in ["5", "2", "-1", "abc", "", "1.0", "99999999999999999999"] {
            let t = transition(choosing(2), submit(text));
            assert_eq!(t.phase, TurnPhase::Generating, "input {text:?}");
            assert!(
                t.effects
                    .iter()
                    .any(|e| matches!(e, TurnEffect::StartGeneration { .. })),
                "input {text:?}"
            );
            assert!(!t
                .effects
                .iter()
                .any(|e| matches!(e, TurnEffect::CommitCandidate { .. })));
        }
    }

    #[test]
    fn empty_regeneration_does_not_log_a_user_message() {
        let t = transition(choosing(2), submit("  "));
        assert_eq!(
            t.effects[0],
            TurnEffect::StartGeneration {
                prompt: String::new()
            }
        );
    }

    #[test]
    fn quit_is_accepted_in_every_phase() {
        let phases = [
            TurnPhase::AwaitingSystemPrompt,
            TurnPhase::AwaitingUserMessage,
            TurnPhase::Generating,
            TurnPhase::CandidatesReady { candidates: 1 },
            choosing(1),
        ];
        for phase in phases {
            let t = transition(phase, TurnEvent::Quit);
            assert_eq!(t.phase, phase);
            assert_eq!(t.effects, vec![TurnEffect::Exit]);
        }
    }

    #[test]
    fn stray_events_leave_phase_untouched() {
        let cases = [
            (TurnPhase::AwaitingSystemPrompt, TurnEvent::Tick),
            (
                TurnPhase::AwaitingSystemPrompt,
                TurnEvent::GenerationFinished { candidates: 1 },
            ),
            (TurnPhase::AwaitingUserMessage, TurnEvent::Tick),
            (
                TurnPhase::AwaitingUserMessage,
                TurnEvent::GenerationFinished { candidates: 1 },
            ),
            (choosing(2), TurnEvent::Tick),
            (choosing(2), TurnEvent::GenerationFinished { candidates: 5 }),
        ];
        for (phase, event) in cases {
            assert_eq!(transition(phase, event), Transition::stay(phase));
        }
    }

    #[test]
    fn selection_parsing() {
        assert_eq!(parse_selection("0", 1), Some(0));
        assert_eq!(parse_selection("+1", 2), Some(1));
        assert_eq!(parse_selection("1", 1), None);
        assert_eq!(parse_selection("-0", 1), Some(0));
        assert_eq!(parse_selection("", 3), None);
        assert_eq!(parse_selection("0", 0), None);
    }

    #[test]
    fn busy_and_display_flags() {
        assert!(TurnPhase::Generating.is_busy());
        assert!(!choosing(1).is_busy());
        assert!(TurnPhase::Generating.shows_candidates());
        assert!(choosing(1).shows_candidates());
        assert!(!TurnPhase::AwaitingUserMessage.shows_candidates());
    }
}
