// Draw widget: the wheel pool, the order drawn so far, and saved draws.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

use crate::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(35),
            Constraint::Percentage(35),
        ])
        .split(area);

    let pool: Vec<ListItem> = state
        .draw
        .remaining
        .iter()
        .map(|t| ListItem::new(t.clone()))
        .collect();
    frame.render_widget(
        List::new(pool).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Wheel ({})", state.draw.remaining.len())),
        ),
        columns[0],
    );

    let order_title = if state.draw.complete {
        "Order (complete, s to save)".to_string()
    } else {
        format!("Order ({} drawn)", state.draw.drawn.len())
    };
    let order = Paragraph::new(
        state
            .draw
            .drawn
            .iter()
            .enumerate()
            .map(|(i, t)| Line::from(format!("{:>2}. {}", i + 1, t)))
            .collect::<Vec<_>>(),
    )
    .block(Block::default().borders(Borders::ALL).title(order_title));
    frame.render_widget(order, columns[1]);

    let cursor = state.cursor();
    let history: Vec<ListItem> = state
        .draw
        .history
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let style = if i == cursor {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    record.date.format("%Y-%m-%d %H:%M").to_string(),
                    Style::default().fg(Color::Gray),
                ),
                Span::raw("  "),
                Span::raw(summarize_order(&record.order)),
            ]))
            .style(style)
        })
        .collect();
    frame.render_widget(
        List::new(history).block(Block::default().borders(Borders::ALL).title("Saved draws")),
        columns[2],
    );
}

/// First three teams of a draw, e.g. "A, B, C +2".
pub fn summarize_order(order: &[String]) -> String {
    let head: Vec<&str> = order.iter().take(3).map(String::as_str).collect();
    let rest = order.len().saturating_sub(3);
    if rest > 0 {
        format!("{} +{}", head.join(", "), rest)
    } else {
        head.join(", ")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
