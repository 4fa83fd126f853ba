//! Terminal-only state: the input box and the transcript scroll position.
//!
//! None of this is part of the conversation. The controller in
//! [`crate::core::app`] decides what is shown; this decides where.

use ratatui::crossterm::event::KeyEvent;
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders};
use tui_textarea::{Input, Key, TextArea};

pub struct ViewState {
    textarea: TextArea<'static>,
    /// Lines scrolled up from the bottom of the transcript.
    scroll_back: u16,
    /// Transcript height at the last draw.
    viewport_height: u16,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            textarea: new_textarea(),
            scroll_back: 0,
            viewport_height: 0,
        }
    }

    pub fn textarea(&self) -> &TextArea<'static> {
        &self.textarea
    }

    pub fn input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn clear_input(&mut self) {
        self.textarea = new_textarea();
    }

    /// Feeds a key to the input box. Returns whether it was consumed.
    pub fn handle_input(&mut self, key: KeyEvent) -> bool {
        let input = Input::from(key);
        if inserts_newline(&input) {
            return false;
        }
        self.textarea.input(input)
    }

    pub fn set_busy(&mut self, busy: bool) {
        let style = if busy {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };
        self.textarea.set_style(style);
    }

    pub fn scroll_back(&self) -> u16 {
        self.scroll_back
    }

    pub fn scroll_up(&mut self) {
        self.scroll_back = self.scroll_back.saturating_add(self.page());
    }

    pub fn scroll_down(&mut self) {
        self.scroll_back = self.scroll_back.saturating_sub(self.page());
    }

    pub fn reset_scroll(&mut self) {
        self.scroll_back = 0;
    }

    /// Records the drawn viewport and clamps the scroll to what exists.
    pub fn update_viewport(&mut self, height: u16, max_scroll_back: u16) {
        self.viewport_height = height;
        self.scroll_back = self.scroll_back.min(max_scroll_back);
    }

    fn page(&self) -> u16 {
        self.viewport_height.saturating_sub(1).max(1)
    }
}

fn new_textarea() -> TextArea<'static> {
    let mut textarea = TextArea::default();
    textarea.set_block(Block::default().borders(Borders::ALL));
    textarea.set_cursor_line_style(Style::default());
    textarea
}

fn inserts_newline(input: &Input) -> bool {
    matches!(
        input,
        Input {
            key: Key::Enter,
            ..
        } | Input {
            key: Key::Char('m') | Key::Char('j'),
            ctrl: true,
            ..
        }
    )
}
