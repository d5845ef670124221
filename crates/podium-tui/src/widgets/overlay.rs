// Modal overlays: text prompt and yes/no confirmation.
//
// Rendered centered on top of the main layout when `ViewState::prompt` or
// `ViewState::confirm` is set.

use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::{Confirm, Prompt};

const PROMPT_WIDTH: u16 = 56;
const DIALOG_HEIGHT: u16 = 5;

/// Render a one-line text prompt with a block cursor.
pub fn render_prompt(frame: &mut Frame, area: Rect, prompt: &Prompt) {
    let dialog_area = centered_rect(PROMPT_WIDTH, DIALOG_HEIGHT, area);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            format!(" {} ", prompt.title()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let lines = vec![
        Line::from(vec![
            Span::raw(" > "),
            Span::raw(prompt.input.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]),
        Line::from(Span::styled(
            " Enter: ok   Esc: cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog_area);
}

/// Render a yes/no confirmation for a destructive action.
pub fn render_confirm(frame: &mut Frame, area: Rect, confirm: &Confirm) {
    let question = confirm.question();
    let width = (question.len() as u16 + 12).max(28);
    let dialog_area = centered_rect(width, DIALOG_HEIGHT, area);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            " Confirm ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));

    let text = Line::from(vec![
        Span::raw(format!("  {question} (")),
        Span::styled("y", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::raw("/"),
        Span::styled("n", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        Span::raw(")"),
    ]);

    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog_area);
}

/// Compute a centered rectangle of the given size within `area`, clamped to
/// the available space.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let clamped_width = width.min(area.width);
    let clamped_height = height.min(area.height);

    let vertical = Layout::vertical([Constraint::Length(clamped_height)])
        .flex(Flex::Center)
        .split(area);

    let horizontal = Layout::horizontal([Constraint::Length(clamped_width)])
        .flex(Flex::Center)
        .split(vertical[0]);

    horizontal[0]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PromptKind;
    use podium_core::race::Phase;

    #[test]
    fn centered_rect_is_centered() {
        let area = Rect::new(0, 0, 80, 24);
        let result = centered_rect(PROMPT_WIDTH, DIALOG_HEIGHT, area);
        assert_eq!(result.width, PROMPT_WIDTH);
        assert_eq!(result.height, DIALOG_HEIGHT);
        let dx = (result.x + result.width / 2) as i32 - 40;
        let dy = (result.y + result.height / 2) as i32 - 12;
        assert!(dx.abs() <= 1);
        assert!(dy.abs() <= 1);
    }

    #[test]
    fn centered_rect_clamps_to_small_area() {
        let area = Rect::new(0, 0, 10, 3);
        let result = centered_rect(PROMPT_WIDTH, DIALOG_HEIGHT, area);
        assert!(result.width <= area.width);
        assert!(result.height <= area.height);
    }

    #[test]
    fn prompt_shows_typed_text() {
        let backend = ratatui::backend::TestBackend::new(80, 24);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let mut prompt = Prompt::new(PromptKind::Distance("Alpha".into()));
        prompt.input = "123.5".into();
        terminal
            .draw(|frame| render_prompt(frame, frame.area(), &prompt))
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("123.5"));
        assert!(text.contains("Distance for Alpha"));
    }

    #[test]
    fn confirm_does_not_panic_on_tiny_terminal() {
        let backend = ratatui::backend::TestBackend::new(12, 3);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| render_confirm(frame, frame.area(), &Confirm::ClearPhase(Phase::Two)))
            .unwrap();
    }
}
