// Leaderboard widget: phase ranking on top, saved races of the phase below.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Row, Table};
use ratatui::Frame;

use podium_core::leaderboard::LeaderboardRow;
use podium_core::race::clock::format_time;

use crate::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    render_ranking(frame, sections[0], state);
    render_saved_races(frame, sections[1], state);
}

fn render_ranking(frame: &mut Frame, area: Rect, state: &ViewState) {
    let header = Row::new(vec!["#", "Team", "Score", "Time", "Penalties", "Status"])
        .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = if state.leaderboard.is_empty() {
        vec![Row::new(vec![Cell::from(""), Cell::from("No teams yet")])]
    } else {
        state
            .leaderboard
            .iter()
            .map(|row| Row::new(ranking_cells(row)).style(row_style(row)))
            .collect()
    };

    let widths = [
        Constraint::Length(4),
        Constraint::Min(16),
        Constraint::Length(9),
        Constraint::Length(9),
        Constraint::Length(10),
        Constraint::Length(11),
    ];
    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("{} Leaderboard", state.phase)),
    );
    frame.render_widget(table, area);
}

/// Display cells for one leaderboard row; unraced teams show dashes.
pub fn ranking_cells(row: &LeaderboardRow) -> Vec<String> {
    let dash = || "--".to_string();
    vec![
        row.position.map(|p| p.to_string()).unwrap_or_else(dash),
        row.team.clone(),
        row.score.map(|s| format!("{s:.2}")).unwrap_or_else(dash),
        row.elapsed_cs.map(format_time).unwrap_or_else(dash),
        row.penalty_points.map(|p| p.to_string()).unwrap_or_else(dash),
        row.status
            .map(|s| s.label().to_string())
            .unwrap_or_else(|| "NOT RACED".to_string()),
    ]
}

fn row_style(row: &LeaderboardRow) -> Style {
    match row.position {
        Some(1) => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        Some(_) => Style::default(),
        None => Style::default().fg(Color::DarkGray),
    }
}

fn render_saved_races(frame: &mut Frame, area: Rect, state: &ViewState) {
    let cursor = state.cursor();
    let races = state.phase_races();
    let rows: Vec<Row> = races
        .iter()
        .enumerate()
        .map(|(i, race)| {
            let style = if i == cursor {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(race.id.clone()),
                Cell::from(race.teams.join(", ")),
                Cell::from(format!("{:.2}", race.best_score)),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(26),
            Constraint::Min(20),
            Constraint::Length(9),
        ],
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Saved races ({})", races.len())),
    );
    frame.render_widget(table, area);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_view;

    #[test]
    fn ranking_cells_for_raced_and_unraced() {
        let state = sample_view();
        assert_eq!(
            ranking_cells(&state.leaderboard[0]),
            vec!["1", "Alpha", "180.00", "05:00:00", "0", "FINISHED"]
        );
        assert_eq!(
            ranking_cells(&state.leaderboard[1]),
            vec!["--", "Beta", "--", "--", "--", "NOT RACED"]
        );
    }

    #[test]
    fn render_does_not_panic_empty() {
        let backend = ratatui::backend::TestBackend::new(80, 20);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = ViewState::default();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
    }

    #[test]
    fn render_lists_saved_race() {
        let backend = ratatui::backend::TestBackend::new(100, 20);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = sample_view();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("race_20261019_101500_000"));
    }
}
