// Race clock banner: shared elapsed time, session stage and the latest notice.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use podium_app::protocol::{NoticeLevel, SessionStage};
use podium_core::race::clock::format_time;

use crate::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let session = &state.session;
    let cap = state.phase.cap_cs();

    let clock_line = Line::from(vec![
        Span::styled(
            format_time(session.elapsed_cs),
            Style::default()
                .fg(stage_color(session.stage))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" / {}", format_time(cap)),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("   "),
        Span::styled(stage_label(session.stage), Style::default().fg(Color::White)),
        Span::styled(
            format!("   {}", remaining_label(session.elapsed_cs, cap)),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let notice_line = match &state.notice {
        Some(notice) => {
            let color = match notice.level {
                NoticeLevel::Info => Color::Green,
                NoticeLevel::Error => Color::Red,
            };
            Line::from(Span::styled(notice.text.clone(), Style::default().fg(color)))
        }
        None => Line::from(""),
    };

    let participants = if session.participants.is_empty() {
        Line::from(Span::styled(
            "No teams selected",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(format!(
            "Teams ({}/{}): {}",
            session.participants.len(),
            session.max_participants,
            session.participants.join(", ")
        ))
    };

    let paragraph = Paragraph::new(vec![clock_line, participants, notice_line]).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("{} Clock", state.phase)),
    );
    frame.render_widget(paragraph, area);
}

pub fn stage_label(stage: SessionStage) -> &'static str {
    match stage {
        SessionStage::Idle => "READY",
        SessionStage::Selecting => "SELECTING",
        SessionStage::Running => "RUNNING",
        SessionStage::Terminal => "STOPPED",
    }
}

fn stage_color(stage: SessionStage) -> Color {
    match stage {
        SessionStage::Running => Color::Yellow,
        SessionStage::Terminal => Color::Cyan,
        _ => Color::White,
    }
}

/// Time left before the cap, e.g. "04:59:00 left".
pub fn remaining_label(elapsed_cs: u32, cap_cs: u32) -> String {
    format!("{} left", format_time(cap_cs.saturating_sub(elapsed_cs)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
