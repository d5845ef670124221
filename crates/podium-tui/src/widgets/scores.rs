// Scores widget: the manually entered team-score ledger.
//
// Ranked ledger entries first, then roster teams with no entry yet.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Row, Table};
use ratatui::Frame;

use crate::{ScoreRow, ViewState};

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let header = Row::new(vec!["#", "Team", "Score", "Penalties", "Races"])
        .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));

    let cursor = state.cursor();
    let rows: Vec<Row> = state
        .score_rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let style = if i == cursor {
                Style::default().add_modifier(Modifier::REVERSED)
            } else if row.position.is_none() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            Row::new(score_cells(row)).style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Min(16),
        Constraint::Length(8),
        Constraint::Length(10),
        Constraint::Length(6),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Team scores"));
    frame.render_widget(table, area);
}

pub fn score_cells(row: &ScoreRow) -> Vec<String> {
    vec![
        row.position.map(|p| p.to_string()).unwrap_or_default(),
        row.team.clone(),
        row.score.to_string(),
        if row.penalties > 0 {
            format!("-{}", row.penalties)
        } else {
            "0".to_string()
        },
        row.races.to_string(),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
