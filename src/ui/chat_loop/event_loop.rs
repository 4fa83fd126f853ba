//! Key routing for the chat screen.
//!
//! Keys become controller inputs or view changes. While a response streams
//! only Ctrl+C and scrolling do anything.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::debug;

use crate::core::app::{App, AppOutcome};
use crate::core::backend::ModelBackend;
use crate::ui::view::ViewState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyboardEventOutcome {
    pub request_redraw: bool,
    pub exit_requested: bool,
}

pub fn handle_terminal_event<B: ModelBackend>(
    app: &mut App<B>,
    view: &mut ViewState,
    event: Event,
) -> KeyboardEventOutcome {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => route_key(app, view, key),
        Event::Resize(..) => KeyboardEventOutcome {
            request_redraw: true,
            exit_requested: false,
        },
        _ => KeyboardEventOutcome::default(),
    }
}

pub fn route_key<B: ModelBackend>(
    app: &mut App<B>,
    view: &mut ViewState,
    key: KeyEvent,
) -> KeyboardEventOutcome {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        let outcome = app.quit();
        return apply_outcome(view, outcome);
    }

    match key.code {
        KeyCode::PageUp => {
            view.scroll_up();
            redraw()
        }
        KeyCode::PageDown => {
            view.scroll_down();
            redraw()
        }
        _ if app.phase().is_busy() => {
            debug!(code = ?key.code, "input ignored while generating");
            KeyboardEventOutcome::default()
        }
        KeyCode::Enter => {
            let text = view.input_text();
            let outcome = app.submit(&text);
            view.reset_scroll();
            apply_outcome(view, outcome)
        }
        _ => KeyboardEventOutcome {
            request_redraw: view.handle_input(key),
            exit_requested: false,
        },
    }
}

/// Carries a controller outcome over to the view.
pub fn apply_outcome(view: &mut ViewState, outcome: AppOutcome) -> KeyboardEventOutcome {
    if outcome.clear_input {
        view.clear_input();
    }
    KeyboardEventOutcome {
        request_redraw: true,
        exit_requested: outcome.exit,
    }
}

fn redraw() -> KeyboardEventOutcome {
    KeyboardEventOutcome {
        request_redraw: true,
        exit_requested: false,
    }
}
