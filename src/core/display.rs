use super::candidates::CandidateSet;
use super::message::ConversationLog;
use super::turn::TurnPhase;

/// Builds the transcript text for the current frame.
///
/// Candidates are appended while a turn is pending, so they stay visible as
/// they stream in and while the user picks one.
pub fn compute_display(
    phase: TurnPhase,
    log: &ConversationLog,
    candidates: Option<&CandidateSet>,
) -> String {
    match candidates {
        Some(set) if phase.shows_candidates() => {
            format!("{}\n{}", log.render(), set.render_all())
        }
        _ => log.render(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Role;

    fn sample_log() -> ConversationLog {
        let mut log = ConversationLog::new();
        log.append(Role::User, "pick a colour");
        log
    }

    #[test]
    fn log_only_without_candidates() {
        let log = sample_log();
        assert_eq!(
            compute_display(TurnPhase::ChoosingCandidate { candidates: 0 }, &log, None),
            "User: pick a colour"
        );
    }

    #[test]
    fn pending_turn_shows_candidates_under_log() {
        let log = sample_log();
        let mut set = CandidateSet::new(2);
        set.apply_delta(0, "red");
        set.apply_delta(1, "blue");

        let expected = "User: pick a colour\n\nResponse 0: red\n\nResponse 1: blue\n";
        for phase in [
            TurnPhase::Generating,
            TurnPhase::CandidatesReady { candidates: 2 },
            TurnPhase::ChoosingCandidate { candidates: 2 },
        ] {
            assert_eq!(compute_display(phase, &log, Some(&set)), expected);
        }
    }

    #[test]
    fn settled_phases_hide_leftover_candidates() {
        let log = sample_log();
        let set = CandidateSet::new(1);
        assert_eq!(
            compute_display(TurnPhase::AwaitingUserMessage, &log, Some(&set)),
            log.render()
        );
    }

    #[test]
    fn display_is_idempotent() {
        let log = sample_log();
        let mut set = CandidateSet::new(1);
        set.apply_delta(0, "green");
        let phase = TurnPhase::Generating;

        let first = compute_display(phase, &log, Some(&set));
        let second = compute_display(phase, &log, Some(&set));
        assert_eq!(first, second);
    }
}
