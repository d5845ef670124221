// Leaderboard aggregation: ranks saved races per phase and per heat, and
// exports the ranking for the awards presentation.

use std::collections::HashSet;
use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::race::clock::format_time;
use crate::race::{Phase, Race, TeamTimer, TimerStatus};
use crate::scoring;

/// One line of a phase leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardRow {
    pub team: String,
    /// 1-based rank among raced teams; `None` for teams yet to race.
    pub position: Option<usize>,
    pub score: Option<f64>,
    pub elapsed_cs: Option<u32>,
    pub status: Option<TimerStatus>,
    pub penalty_points: Option<u32>,
}

impl LeaderboardRow {
    pub fn raced(&self) -> bool {
        self.position.is_some()
    }
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Rank every team for `phase`.
///
/// Teams with a saved race come first, sorted by descending score. Equal
/// scores keep the order in which the races were saved. Roster teams with no
/// race follow in roster order. A raced team that has since left the roster
/// still keeps its row.
pub fn rank_phase<'a, I>(phase: Phase, races: I, roster: &[String]) -> Vec<LeaderboardRow>
where
    I: IntoIterator<Item = &'a Race>,
{
    let mut seen = HashSet::new();
    let mut raced: Vec<(f64, &TeamTimer)> = Vec::new();

    for race in races.into_iter().filter(|r| r.phase == phase) {
        for timer in &race.timers {
            if seen.insert(timer.team.as_str()) {
                raced.push((scoring::score(timer), timer));
            }
        }
    }

    raced.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut rows: Vec<LeaderboardRow> = raced
        .iter()
        .enumerate()
        .map(|(i, (score, timer))| LeaderboardRow {
            team: timer.team.clone(),
            position: Some(i + 1),
            score: Some(*score),
            elapsed_cs: Some(timer.elapsed_cs),
            status: Some(timer.status),
            penalty_points: Some(scoring::penalty_points(timer)),
        })
        .collect();

    rows.extend(
        roster
            .iter()
            .filter(|team| !seen.contains(team.as_str()))
            .map(|team| LeaderboardRow {
                team: team.clone(),
                position: None,
                score: None,
                elapsed_cs: None,
                status: None,
                penalty_points: None,
            }),
    );
    rows
}

/// Order the timers of a single heat: finished teams by descending score,
/// then everyone else in entry order.
pub fn rank_race(timers: &[TeamTimer]) -> Vec<(&TeamTimer, f64)> {
    let mut finished: Vec<(&TeamTimer, f64)> = timers
        .iter()
        .filter(|t| t.finished())
        .map(|t| (t, scoring::score(t)))
        .collect();
    finished.sort_by(|a, b| b.1.total_cmp(&a.1));

    finished.extend(
        timers
            .iter()
            .filter(|t| !t.finished())
            .map(|t| (t, scoring::score(t))),
    );
    finished
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CsvRow<'a> {
    position: String,
    team: &'a str,
    score: String,
    time: String,
    penalties: String,
    status: &'a str,
}

/// Write the ranked rows as CSV with a header line.
pub fn write_csv<W: Write>(rows: &[LeaderboardRow], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(CsvRow {
            position: row.position.map(|p| p.to_string()).unwrap_or_default(),
            team: &row.team,
            score: row.score.map(|s| format!("{s:.2}")).unwrap_or_default(),
            time: row.elapsed_cs.map(format_time).unwrap_or_default(),
            penalties: row.penalty_points.map(|p| p.to_string()).unwrap_or_default(),
            status: row.status.map(TimerStatus::label).unwrap_or("NOT RACED"),
        })
        .with_context(|| format!("failed to write leaderboard row for {}", row.team))?;
    }
    wtr.flush().context("failed to flush leaderboard CSV")?;
    Ok(())
}
