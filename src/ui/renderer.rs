use crate::core::app::App;
use crate::core::backend::ModelBackend;
use crate::ui::view::ViewState;
use crate::ui::wrap::wrap_text;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::Paragraph,
    Frame,
};

const INPUT_HEIGHT: u16 = 3;

pub fn ui<B: ModelBackend>(f: &mut Frame, app: &App<B>, view: &mut ViewState) {
    let width = f.area().width as usize;
    let instruction = wrap_text(app.instruction(), width);
    let instruction_height = u16::try_from(instruction.len()).unwrap_or(u16::MAX);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(instruction_height),
            Constraint::Length(INPUT_HEIGHT),
        ])
        .split(f.area());

    let title = format!("Multichat v{}", env!("CARGO_PKG_VERSION"));
    f.render_widget(
        Paragraph::new(title).style(Style::default().add_modifier(Modifier::DIM)),
        chunks[0],
    );

    let transcript_area = chunks[1];
    let lines = wrap_text(&app.display(), transcript_area.width as usize);
    let (top, max_back) = scroll_window(lines.len(), transcript_area.height, view.scroll_back());
    view.update_viewport(transcript_area.height, max_back);

    let transcript =
        Paragraph::new(lines.into_iter().map(Line::from).collect::<Vec<_>>()).scroll((top, 0));
    f.render_widget(transcript, transcript_area);

    let instruction_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let instruction = Paragraph::new(instruction.into_iter().map(Line::from).collect::<Vec<_>>())
        .style(instruction_style);
    f.render_widget(instruction, chunks[2]);

    view.set_busy(app.phase().is_busy());
    f.render_widget(view.textarea(), chunks[3]);
}

/// Returns the first visible line and the largest useful scroll-back for a
/// transcript of `total` lines shown `height` lines at a time.
pub fn scroll_window(total: usize, height: u16, scroll_back: u16) -> (u16, u16) {
    let total = u16::try_from(total).unwrap_or(u16::MAX);
    let max_back = total.saturating_sub(height);
    let back = scroll_back.min(max_back);
    (max_back - back, max_back)
}
