// Race widget: team selection before the start, live timers afterwards.
//
// Selection: eligible teams with a check mark for each selected one.
// Running/stopped: one row per timer with status, scoring inputs and the
// provisional score. Once the heat is stopped the rows are the ranked
// results. Missing or out-of-range distances are shown in red.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Row, Table};
use ratatui::Frame;

use podium_app::protocol::SessionStage;
use podium_core::race::clock::format_time;
use podium_core::race::{Challenge, PenaltyKind, Phase, TeamTimer, TimerRecord, TimerStatus};
use podium_core::scoring;

use crate::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    match state.session.stage {
        SessionStage::Idle | SessionStage::Selecting => render_selection(frame, area, state),
        SessionStage::Running | SessionStage::Terminal => render_timers(frame, area, state),
    }
}

fn cursor_style(selected: bool) -> Style {
    if selected {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    }
}

fn render_selection(frame: &mut Frame, area: Rect, state: &ViewState) {
    let cursor = state.cursor();
    let rows: Vec<Row> = state
        .race_rows()
        .into_iter()
        .enumerate()
        .map(|(i, team)| {
            let mark = if state.session.participants.contains(&team) {
                "[x]"
            } else {
                "[ ]"
            };
            Row::new(vec![Cell::from(mark), Cell::from(team)]).style(cursor_style(i == cursor))
        })
        .collect();

    let title = if rows.is_empty() {
        format!("{}: every team has raced", state.phase)
    } else {
        format!(
            "Select teams ({} max)",
            state.session.max_participants.max(1)
        )
    };

    let table = Table::new(rows, [Constraint::Length(4), Constraint::Min(16)])
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(table, area);
}

fn render_timers(frame: &mut Frame, area: Rect, state: &ViewState) {
    let cursor = state.cursor();
    let header = Row::new(header_cells(state))
        .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = state
        .timer_rows()
        .into_iter()
        .enumerate()
        .map(|(i, (timer, score))| {
            let invalid = state.session.invalid_distances.contains(&timer.team);
            let mut cells = vec![
                Cell::from(timer.team.clone()),
                Cell::from(format_time(timer.elapsed_cs)),
                Cell::from(timer.status.label()).style(status_style(timer.status)),
                Cell::from(format_distance(timer.distance_cm)).style(if invalid {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default()
                }),
            ];
            cells.extend(record_cells(timer).into_iter().map(Cell::from));
            cells.push(Cell::from(format!("{score:.2}")));
            Row::new(cells).style(cursor_style(i == cursor))
        })
        .collect();

    let mut widths = vec![
        Constraint::Min(14),
        Constraint::Length(9),
        Constraint::Length(11),
        Constraint::Length(9),
    ];
    widths.extend([Constraint::Length(9); 4]);
    widths.push(Constraint::Length(9));

    let title = match (state.session.stage, state.session.late_corrections) {
        (SessionStage::Terminal, true) => "Results (corrections allowed)",
        (SessionStage::Terminal, false) => "Results",
        (_, true) => "Timers (corrections allowed after stop)",
        (_, false) => "Timers",
    };
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(table, area);
}

fn header_cells(state: &ViewState) -> Vec<Cell<'static>> {
    let mut cells = vec![
        Cell::from("Team"),
        Cell::from("Time"),
        Cell::from("Status"),
        Cell::from("Dist cm"),
    ];
    match state.phase {
        Phase::One => {
            cells.extend(PenaltyKind::ALL.iter().map(|k| Cell::from(k.label())));
            cells.push(Cell::from("Penalty"));
        }
        Phase::Two => {
            cells.extend(Challenge::ALL.iter().map(|c| Cell::from(c.label())));
            cells.push(Cell::from("Interv"));
        }
    }
    cells.push(Cell::from("Score"));
    cells
}

/// Four per-phase columns: penalty counts plus total, or challenge marks plus
/// interventions.
pub fn record_cells(timer: &TeamTimer) -> Vec<String> {
    match &timer.record {
        TimerRecord::Phase1(p) => {
            let mut cells: Vec<String> = PenaltyKind::ALL
                .iter()
                .map(|k| p.count(*k).to_string())
                .collect();
            cells.push(format!("-{}", scoring::phase1_penalty_points(p)));
            cells
        }
        TimerRecord::Phase2(c) => {
            let mut cells: Vec<String> = Challenge::ALL
                .iter()
                .map(|ch| if c.is_complete(*ch) { "done" } else { "-" }.to_string())
                .collect();
            cells.push(c.interventions.to_string());
            cells
        }
    }
}

pub fn format_distance(distance_cm: Option<f64>) -> String {
    match distance_cm {
        Some(d) => format!("{d:.1}"),
        None => "--".to_string(),
    }
}

fn status_style(status: TimerStatus) -> Style {
    match status {
        TimerStatus::Running => Style::default().fg(Color::Yellow),
        TimerStatus::Finished => Style::default().fg(Color::Green),
        TimerStatus::Dnf { .. } => Style::default().fg(Color::Red),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_view;
    use podium_core::race::Phase2Challenges;

    #[test]
    fn format_distance_basic() {
        assert_eq!(format_distance(Some(152.26)), "152.3");
        assert_eq!(format_distance(None), "--");
    }

    #[test]
    fn phase1_record_cells() {
        let mut timer = TeamTimer::new("Alpha", Phase::One);
        if let TimerRecord::Phase1(p) = &mut timer.record {
            p.add(PenaltyKind::BarrierContact);
            p.add(PenaltyKind::HumanIntervention);
        }
        assert_eq!(record_cells(&timer), vec!["1", "0", "1", "-70"]);
    }

    #[test]
    fn phase2_record_cells() {
        let mut timer = TeamTimer::new("Beta", Phase::Two);
        timer.record = TimerRecord::Phase2(Phase2Challenges {
            plan_incline: true,
            distance_measure: false,
            stairs: true,
            interventions: 2,
        });
        assert_eq!(record_cells(&timer), vec!["done", "-", "done", "2"]);
    }

    #[test]
    fn render_does_not_panic_selecting() {
        let backend = ratatui::backend::TestBackend::new(80, 20);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let mut state = ViewState::default();
        state.eligible = vec!["Alpha".into(), "Beta".into()];
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
    }

    #[test]
    fn stopped_heat_renders_ranked_results() {
        let backend = ratatui::backend::TestBackend::new(120, 10);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let mut state = sample_view();
        state.session.stage = SessionStage::Terminal;
        state.session.timers[0].status = TimerStatus::Finished;
        state.session.timers[0].distance_cm = Some(40.0);
        state.session.timers[1].status = TimerStatus::Finished;
        state.session.timers[1].distance_cm = Some(180.0);
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
        assert!(text.contains("Results"));
        let gamma = text.find("Gamma").unwrap();
        let beta = text.find("Beta").unwrap();
        assert!(gamma < beta);
    }

    #[test]
    fn render_does_not_panic_running() {
        let backend = ratatui::backend::TestBackend::new(120, 20);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = sample_view();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
    }
}
