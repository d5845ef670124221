// Status bar widget: event name, active phase, tab indicator.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use podium_app::protocol::TabId;
use podium_core::race::Phase;

use crate::ViewState;

/// Render the status bar into the given area.
///
/// Layout: [event name] [phase badge] [tab bar]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut spans = vec![Span::styled(
        format!(" {} ", state.event_name),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )];

    spans.push(phase_badge(state.phase));
    spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
    spans.extend(tab_spans(state.active_tab));

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

pub fn phase_badge(phase: Phase) -> Span<'static> {
    let color = match phase {
        Phase::One => Color::Cyan,
        Phase::Two => Color::Magenta,
    };
    Span::styled(
        format!("[{phase}]"),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )
}

/// Build tab indicator spans with the active tab highlighted.
/// E.g. "[1:Race] [2:Leaderboard] [3:Teams] [4:Draw] [5:Scores]"
pub fn tab_spans(active: TabId) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for (i, tab_id) in TabId::ALL.into_iter().enumerate() {
        let style = if tab_id == active {
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(format!("[{}:{}]", i + 1, tab_id.title()), style));
        spans.push(Span::raw(" "));
    }
    spans
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
