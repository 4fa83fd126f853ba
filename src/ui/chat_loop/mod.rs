//! The interactive chat loop.
//!
//! Terminal events arrive over a channel from a reader task; a fixed-interval
//! ticker advances the controller so streamed text and phase changes show up
//! without any key being pressed. The screen is redrawn after every event.

pub mod event_loop;
pub mod lifecycle;

use std::error::Error;
use std::time::Duration;

use ratatui::backend::Backend;
use ratatui::crossterm::event::{self, Event};
use ratatui::Terminal;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use self::event_loop::{apply_outcome, handle_terminal_event};
use self::lifecycle::{restore_terminal, setup_terminal};
use crate::core::app::App;
use crate::core::backend::ModelBackend;
use crate::ui::renderer::ui;
use crate::ui::view::ViewState;

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<Event>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(ev).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        continue;
                    }
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

pub async fn run_chat<B: ModelBackend>(backend: B, tick: Duration) -> Result<(), Box<dyn Error>> {
    let mut terminal = setup_terminal()?;

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let reader = spawn_event_reader(event_tx);

    let result = drive(&mut terminal, App::new(backend), event_rx, tick).await;
    reader.abort();

    let restored = restore_terminal(&mut terminal);
    if let Err(e) = &result {
        error!(error = %e, "chat loop failed");
    }
    result?;
    restored
}

/// Runs the controller against `terminal` until the user quits.
///
/// Fails when drawing fails or when a generation's consumption task dies.
pub async fn drive<B, T>(
    terminal: &mut Terminal<T>,
    mut app: App<B>,
    mut events: mpsc::UnboundedReceiver<Event>,
    tick: Duration,
) -> Result<(), Box<dyn Error>>
where
    B: ModelBackend,
    T: Backend,
{
    let mut view = ViewState::new();
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(tick_ms = tick.as_millis() as u64, "chat loop started");

    loop {
        terminal.draw(|f| ui(f, &app, &mut view))?;

        tokio::select! {
            Some(ev) = events.recv() => {
                let outcome = handle_terminal_event(&mut app, &mut view, ev);
                if outcome.exit_requested {
                    break;
                }
            }
            _ = ticker.tick() => {
                let outcome = app.tick()?;
                apply_outcome(&mut view, outcome);
            }
        }
    }

    debug!(messages = app.log().len(), "chat loop finished");
    Ok(())
}
