// Teams widget: the roster, with the phases each team has raced in.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Row, Table};
use ratatui::Frame;

use crate::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let header = Row::new(vec![Cell::from("Team"), Cell::from("Raced")])
        .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));

    let cursor = state.cursor();
    let rows: Vec<Row> = if state.teams.is_empty() {
        vec![Row::new(vec![Cell::from("  No teams. Press a to add one.")])]
    } else {
        state
            .teams
            .iter()
            .enumerate()
            .map(|(i, team)| {
                let style = if i == cursor {
                    Style::default().add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                };
                Row::new(vec![
                    Cell::from(team.clone()),
                    Cell::from(raced_label(state, team)),
                ])
                .style(style)
            })
            .collect()
    };

    let table = Table::new(rows, [Constraint::Min(20), Constraint::Length(16)])
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Teams ({})", state.teams.len())),
        );
    frame.render_widget(table, area);
}

/// Phases with a saved race for `team`, e.g. "Phase 1".
pub fn raced_label(state: &ViewState, team: &str) -> String {
    let mut phases: Vec<String> = Vec::new();
    for race in &state.saved_races {
        let tag = race.phase.to_string();
        if race.teams.iter().any(|t| t == team) && !phases.contains(&tag) {
            phases.push(tag);
        }
    }
    phases.sort();
    phases.join(", ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
