// Application state and orchestration logic.
//
// The central event loop that turns user commands from the TUI into race
// session actions, drives the race clock while a race is running, persists
// every change through the repositories, and pushes UI updates back to the
// TUI render loop.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Utc;
use podium_core::config::Config;
use podium_core::leaderboard::{self, LeaderboardRow};
use podium_core::race::log::RaceLog;
use podium_core::race::session::{RaceSession, SessionState, Tick};
use podium_core::race::{Phase, Race};
use podium_core::roster::draw::{DrawSession, WheelHistory};
use podium_core::roster::{eligible_teams, Roster};
use podium_core::scores::ScoreBoard;
use podium_core::scoring;
use podium_core::store::SharedStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::protocol::{
    AppSnapshot, DrawSnapshot, Notice, RaceSummary, SessionSnapshot, SessionStage, TabId,
    UiUpdate, UserCommand,
};

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state.
pub struct AppState {
    pub config: Config,
    pub roster: Roster,
    pub races: RaceLog,
    pub history: WheelHistory,
    pub scores: ScoreBoard,
    pub draw: DrawSession,
    /// The race being set up or run for the active phase.
    pub session: RaceSession,
    pub active_tab: TabId,
    rng: StdRng,
}

impl AppState {
    /// Load every repository from `store` and start idle in Phase 1.
    pub fn new(config: Config, store: SharedStore) -> Self {
        let roster = Roster::load(store.clone());
        let races = RaceLog::load(store.clone());
        let history = WheelHistory::load(store.clone());
        let scores = ScoreBoard::load(store);
        let draw = DrawSession::new(roster.teams());
        let session = RaceSession::new(Phase::One, config.event.session_config(Phase::One));

        AppState {
            config,
            roster,
            races,
            history,
            scores,
            draw,
            session,
            active_tab: TabId::default(),
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Replace the draw RNG, e.g. with a seeded one for reproducible draws.
    pub fn set_rng(&mut self, rng: StdRng) {
        self.rng = rng;
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    /// Teams that may still be selected for the active phase.
    pub fn eligible(&self) -> Vec<String> {
        let raced = self.races.raced_teams(self.phase());
        eligible_teams(self.phase(), self.roster.teams(), &raced, self.roster.order())
            .unwrap_or_default()
    }

    pub fn leaderboard(&self, phase: Phase) -> Vec<LeaderboardRow> {
        leaderboard::rank_phase(phase, self.races.all(), self.roster.teams())
    }

    /// Build an `AppSnapshot` of everything the TUI renders.
    pub fn build_snapshot(&self, now: Instant) -> AppSnapshot {
        let phase = self.phase();
        let session = &self.session;
        let stage = match session.state() {
            SessionState::Idle => SessionStage::Idle,
            SessionState::Selecting { .. } => SessionStage::Selecting,
            SessionState::Running { .. } => SessionStage::Running,
            SessionState::Terminal { .. } => SessionStage::Terminal,
        };

        let saved_races = self
            .races
            .all()
            .iter()
            .map(|r| RaceSummary {
                id: r.id.clone(),
                phase: r.phase,
                teams: r.participants.clone(),
                best_score: r
                    .timers
                    .iter()
                    .map(scoring::score)
                    .fold(f64::NEG_INFINITY, f64::max),
            })
            .collect();

        AppSnapshot {
            event_name: self.config.event.name.clone(),
            phase,
            session: SessionSnapshot {
                stage,
                participants: session.participants(),
                timers: session.timers().to_vec(),
                elapsed_cs: session.elapsed_cs(now.into_std()),
                invalid_distances: session.invalid_distances(),
                max_participants: session.config().max_participants,
                late_corrections: session.config().late_corrections,
            },
            eligible: self.eligible(),
            leaderboard: self.leaderboard(phase),
            saved_races,
            teams: self.roster.teams().to_vec(),
            draw: DrawSnapshot {
                remaining: self.draw.remaining().to_vec(),
                drawn: self.draw.drawn().to_vec(),
                complete: self.draw.is_complete(),
                history: self.history.records().to_vec(),
            },
            scores: self.scores.ranked(),
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Apply one user command. Returns an optional confirmation message;
    /// errors are reported to the user and leave the console usable.
    pub fn apply_command(&mut self, cmd: UserCommand, now: Instant) -> anyhow::Result<Option<String>> {
        let clock = now.into_std();
        match cmd {
            UserCommand::SwitchTab(tab) => {
                self.active_tab = tab;
                debug!("Switched to tab: {:?}", tab);
                Ok(None)
            }
            UserCommand::SwitchPhase(phase) => self.switch_phase(phase),

            UserCommand::SelectTeam(team) => {
                if !self.roster.contains(&team) {
                    bail!("team '{team}' is not on the roster");
                }
                let raced = self.races.raced_teams(self.phase());
                self.session.select(&team, &raced)?;
                Ok(None)
            }
            UserCommand::DeselectTeam(team) => {
                self.session.deselect(&team)?;
                Ok(None)
            }
            UserCommand::BeginRace => {
                self.session.begin(clock, Utc::now())?;
                Ok(Some(format!("{} race started", self.phase())))
            }
            UserCommand::FinishTeam(team) => {
                let status = self.session.finish(&team, clock)?;
                Ok(Some(format!("{team}: {}", status.label())))
            }
            UserCommand::AbandonTeam(team) => {
                let status = self.session.abandon(&team, clock)?;
                Ok(Some(format!("{team}: {}", status.label())))
            }
            UserCommand::StopRace => {
                self.session.stop_race(clock)?;
                Ok(Some("Race stopped".into()))
            }
            UserCommand::AddPenalty { team, kind } => {
                self.session.add_penalty(&team, kind)?;
                Ok(None)
            }
            UserCommand::ToggleChallenge { team, challenge } => {
                self.session.toggle_challenge(&team, challenge)?;
                Ok(None)
            }
            UserCommand::AddIntervention(team) => {
                self.session.add_intervention(&team)?;
                Ok(None)
            }
            UserCommand::RemoveIntervention(team) => {
                self.session.remove_intervention(&team)?;
                Ok(None)
            }
            UserCommand::SetDistance { team, distance_cm } => {
                self.session.set_distance(&team, distance_cm)?;
                Ok(None)
            }
            UserCommand::SaveRace => {
                let race = self.save_race()?;
                Ok(Some(format!("Saved {}", race.id)))
            }
            UserCommand::CancelRace => {
                self.session.cancel();
                Ok(Some("Race discarded".into()))
            }

            UserCommand::DeleteRace(id) => {
                if !self.races.delete(&id)? {
                    bail!("race '{id}' not found");
                }
                Ok(Some(format!("Deleted {id}")))
            }
            UserCommand::ClearPhase(phase) => {
                if self.session.is_active() && self.phase() == phase {
                    bail!("finish or cancel the current race first");
                }
                let removed = self.races.clear_phase(phase)?;
                Ok(Some(format!("Cleared {removed} {phase} races")))
            }
            UserCommand::ExportLeaderboard { phase, path } => {
                self.export_leaderboard(phase, &path)?;
                Ok(Some(format!("Leaderboard written to {}", path.display())))
            }

            UserCommand::AddTeam(name) => {
                let name = self.roster.add_team(&name)?;
                self.reset_draw();
                Ok(Some(format!("Added {name}")))
            }
            UserCommand::RemoveTeam(name) => {
                self.roster.remove_team(&name)?;
                self.reset_draw();
                Ok(Some(format!("Removed {name}")))
            }
            UserCommand::ImportTeams(path) => {
                let added = self.roster.import_csv(&path)?;
                self.reset_draw();
                Ok(Some(format!("Imported {added} teams")))
            }

            UserCommand::SpinWheel => {
                let spin = self.draw.spin(&mut self.rng)?;
                let msg = match spin.auto_drawn {
                    Some(last) => format!("Drew {}, {} goes last", spin.team, last),
                    None => format!("Drew {}", spin.team),
                };
                Ok(Some(msg))
            }
            UserCommand::ResetDraw => {
                self.reset_draw();
                Ok(Some("Draw reset".into()))
            }
            UserCommand::SaveDraw => {
                let record = self.history.save_draw(&self.draw, Utc::now())?;
                self.roster.set_teams_order(record.order.clone())?;
                Ok(Some("Draw saved as race order".into()))
            }
            UserCommand::RemoveDraw(id) => {
                self.history.remove_draw(&id)?;
                Ok(Some("Draw removed".into()))
            }

            UserCommand::SetScore { team, score } => {
                self.scores.set_score(&team, score)?;
                Ok(None)
            }
            UserCommand::ResetScores => {
                self.scores.reset()?;
                Ok(Some("Scores reset".into()))
            }

            UserCommand::Quit => Ok(None),
        }
    }

    fn switch_phase(&mut self, phase: Phase) -> anyhow::Result<Option<String>> {
        if phase == self.phase() {
            return Ok(None);
        }
        if self.session.is_active() {
            bail!("finish or cancel the current race first");
        }
        self.session = RaceSession::new(phase, self.config.event.session_config(phase));
        info!("Switched to {}", phase);
        Ok(Some(format!("{phase} selected")))
    }

    fn reset_draw(&mut self) {
        self.draw.reset(self.roster.teams());
    }

    /// Finalize the current race and persist it. If the write fails the
    /// session is restored so nothing is lost.
    pub fn save_race(&mut self) -> anyhow::Result<Race> {
        let before = self.session.clone();
        let race = self.session.save(Utc::now())?;

        if let Err(e) = self.races.add(race.clone()) {
            self.session = before;
            return Err(e.context("race was not saved"));
        }

        if race.phase == Phase::One {
            for timer in race.timers.iter().filter(|t| t.finished()) {
                let points = scoring::penalty_points(timer);
                if points > 0 {
                    if let Err(e) = self.scores.add_penalties(&timer.team, points, 1) {
                        warn!("Failed to record penalties for {}: {:#}", timer.team, e);
                    }
                }
            }
        }
        Ok(race)
    }

    fn export_leaderboard(&self, phase: Phase, path: &Path) -> anyhow::Result<()> {
        let rows = self.leaderboard(phase);
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        leaderboard::write_csv(&rows, file)?;
        info!("Exported {} leaderboard ({} rows) to {}", phase, rows.len(), path.display());
        Ok(())
    }

    /// Advance the race clock. Returns the tick outcome so the caller can
    /// drop the interval once the race stops.
    pub fn tick(&mut self, now: Instant) -> Tick {
        self.session.tick(now.into_std())
    }

    /// Whether a cap expiry in the current phase should save automatically.
    fn auto_save_on_cap(&self) -> bool {
        self.config.event.rules(self.phase()).auto_save_on_cap
    }
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

/// Seed an empty roster from `config/teams.csv` when one is configured.
/// Returns how many teams were imported.
pub fn seed_roster(state: &mut AppState) -> anyhow::Result<usize> {
    if !state.roster.is_empty() {
        info!(
            "Restored {} teams, {} saved races, {} draws",
            state.roster.teams().len(),
            state.races.all().len(),
            state.history.records().len()
        );
        return Ok(0);
    }
    let Some(path) = state.config.teams_csv.clone() else {
        info!("Roster is empty and no teams.csv is configured");
        return Ok(0);
    };
    let added = state
        .roster
        .import_csv(&path)
        .with_context(|| format!("failed to seed roster from {}", path.display()))?;
    state.reset_draw();
    Ok(added)
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

fn race_clock(period: Duration) -> Interval {
    let mut clock = tokio::time::interval_at(Instant::now() + period, period);
    clock.set_missed_tick_behavior(MissedTickBehavior::Skip);
    clock
}

async fn next_tick(clock: &mut Option<Interval>) {
    match clock {
        Some(clock) => {
            clock.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn send_snapshot(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let snapshot = state.build_snapshot(Instant::now());
    let _ = ui_tx
        .send(UiUpdate::StateSnapshot(Box::new(snapshot)))
        .await;
}

/// Run the main application event loop.
///
/// Listens on two sources using `tokio::select!`:
/// 1. User commands from the TUI
/// 2. The race clock, which only exists while a race is running
///
/// Pushes UI updates through `ui_tx` for the TUI render loop.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    let period = Duration::from_millis(state.config.clock_tick_ms);
    let mut clock: Option<Interval> = None;

    send_snapshot(&state, &ui_tx).await;

    loop {
        tokio::select! {
            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Race clock (only while running) ---
            _ = next_tick(&mut clock), if clock.is_some() => {
                handle_clock_tick(&mut state, &ui_tx).await;
            }
        }

        // Keep the clock alive exactly while the race runs.
        match (state.session.is_running(), clock.is_some()) {
            (true, false) => {
                debug!("Race clock started");
                clock = Some(race_clock(period));
            }
            (false, true) => {
                debug!("Race clock stopped");
                clock = None;
            }
            _ => {}
        }
    }

    if state.session.is_active() {
        warn!("Exiting with an unsaved {} race; it is discarded", state.phase());
    }
    info!("Application event loop exiting");
    Ok(())
}

async fn handle_clock_tick(state: &mut AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let now = Instant::now();
    match state.tick(now) {
        Tick::Inactive => {}
        Tick::Advanced => {
            let _ = ui_tx
                .send(UiUpdate::Clock {
                    elapsed_cs: state.session.elapsed_cs(now.into_std()),
                    timers: state.session.timers().to_vec(),
                })
                .await;
        }
        Tick::Expired => {
            let _ = ui_tx
                .send(UiUpdate::Notice(Notice::info("Time cap reached")))
                .await;
            if state.auto_save_on_cap() {
                let notice = match state.save_race() {
                    Ok(race) => Notice::info(format!("Saved {} automatically", race.id)),
                    Err(e) => {
                        warn!("Automatic save blocked: {:#}", e);
                        Notice::error(format!("Auto-save blocked: {e:#}"))
                    }
                };
                let _ = ui_tx.send(UiUpdate::Notice(notice)).await;
            }
            send_snapshot(state, ui_tx).await;
        }
    }
}

/// Handle a user command from the TUI.
async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let result = state.apply_command(cmd, Instant::now());
    match result {
        Ok(Some(message)) => {
            info!("{}", message);
            let _ = ui_tx.send(UiUpdate::Notice(Notice::info(message))).await;
        }
        Ok(None) => {}
        Err(e) => {
            warn!("Command failed: {:#}", e);
            let _ = ui_tx
                .send(UiUpdate::Notice(Notice::error(format!("{e:#}"))))
                .await;
        }
    }
    send_snapshot(state, ui_tx).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use podium_core::config::EventConfig;
    use podium_core::race::{PenaltyKind, TimerStatus};
    use podium_core::store::MemoryStore;
    use std::path::PathBuf;

    fn test_config() -> Config {
        Config {
            event: EventConfig::default(),
            db_path: PathBuf::from(":memory:"),
            clock_tick_ms: 50,
            display_tick_ms: 33,
            teams_csv: None,
        }
    }

    fn create_test_app_state(teams: &[&str]) -> AppState {
        let mut state = AppState::new(test_config(), MemoryStore::shared());
        for team in teams {
            state.roster.add_team(team).unwrap();
        }
        state.reset_draw();
        state.set_rng(StdRng::seed_from_u64(42));
        state
    }

    fn apply(state: &mut AppState, cmd: UserCommand, now: Instant) -> anyhow::Result<Option<String>> {
        state.apply_command(cmd, now)
    }

    #[test]
    fn select_rejects_team_off_roster() {
        let mut state = create_test_app_state(&["Alpha"]);
        let err = apply(&mut state, UserCommand::SelectTeam("Ghost".into()), Instant::now())
            .unwrap_err();
        assert!(err.to_string().contains("not on the roster"));
    }

    #[test]
    fn full_phase1_heat_saves_and_records_penalties() {
        let mut state = create_test_app_state(&["Alpha", "Beta"]);
        let t0 = Instant::now();

        apply(&mut state, UserCommand::SelectTeam("Alpha".into()), t0).unwrap();
        apply(&mut state, UserCommand::SelectTeam("Beta".into()), t0).unwrap();
        apply(&mut state, UserCommand::BeginRace, t0).unwrap();
        apply(
            &mut state,
            UserCommand::AddPenalty {
                team: "Alpha".into(),
                kind: PenaltyKind::BarrierContact,
            },
            t0,
        )
        .unwrap();
        apply(
            &mut state,
            UserCommand::FinishTeam("Alpha".into()),
            t0 + Duration::from_secs(300),
        )
        .unwrap();
        apply(
            &mut state,
            UserCommand::AbandonTeam("Beta".into()),
            t0 + Duration::from_secs(310),
        )
        .unwrap();
        for (team, d) in [("Alpha", 150.0), ("Beta", 90.0)] {
            apply(
                &mut state,
                UserCommand::SetDistance {
                    team: team.into(),
                    distance_cm: Some(d),
                },
                t0,
            )
            .unwrap();
        }
        apply(&mut state, UserCommand::SaveRace, t0).unwrap();

        assert_eq!(state.races.all().len(), 1);
        assert!(state.session.state() == &SessionState::Idle);
        assert_eq!(state.scores.penalties_of("Alpha"), 20);
        assert_eq!(state.scores.penalties_of("Beta"), 0);

        let board = state.leaderboard(Phase::One);
        assert_eq!(board[0].team, "Alpha");
        assert!((board[0].score.unwrap() - 160.0).abs() < 1e-9);
        assert_eq!(board[1].team, "Beta");
    }

    #[test]
    fn raced_team_cannot_race_again() {
        let mut state = create_test_app_state(&["Alpha", "Beta"]);
        let t0 = Instant::now();
        apply(&mut state, UserCommand::SwitchPhase(Phase::Two), t0).unwrap();
        apply(&mut state, UserCommand::SelectTeam("Alpha".into()), t0).unwrap();
        apply(&mut state, UserCommand::BeginRace, t0).unwrap();
        apply(&mut state, UserCommand::FinishTeam("Alpha".into()), t0).unwrap();
        apply(
            &mut state,
            UserCommand::SetDistance {
                team: "Alpha".into(),
                distance_cm: Some(10.0),
            },
            t0,
        )
        .unwrap();
        apply(&mut state, UserCommand::SaveRace, t0).unwrap();

        assert_eq!(state.eligible(), vec!["Beta"]);
        let err = apply(&mut state, UserCommand::SelectTeam("Alpha".into()), t0).unwrap_err();
        assert!(err.to_string().contains("already raced"));
        assert!(state.session.state() == &SessionState::Idle);
    }

    #[test]
    fn phase_switch_blocked_while_racing() {
        let mut state = create_test_app_state(&["Alpha"]);
        let t0 = Instant::now();
        apply(&mut state, UserCommand::SelectTeam("Alpha".into()), t0).unwrap();
        apply(&mut state, UserCommand::BeginRace, t0).unwrap();
        assert!(apply(&mut state, UserCommand::SwitchPhase(Phase::Two), t0).is_err());

        apply(&mut state, UserCommand::CancelRace, t0).unwrap();
        apply(&mut state, UserCommand::SwitchPhase(Phase::Two), t0).unwrap();
        assert_eq!(state.phase(), Phase::Two);
        assert!(state.session.config().late_corrections);
    }

    #[test]
    fn save_blocked_by_validation_keeps_race() {
        let mut state = create_test_app_state(&["Alpha"]);
        let t0 = Instant::now();
        apply(&mut state, UserCommand::SelectTeam("Alpha".into()), t0).unwrap();
        apply(&mut state, UserCommand::BeginRace, t0).unwrap();
        apply(&mut state, UserCommand::StopRace, t0).unwrap();

        let err = apply(&mut state, UserCommand::SaveRace, t0).unwrap_err();
        assert!(err.to_string().contains("Alpha"));
        assert!(state.races.all().is_empty());
        assert!(state.session.is_active());
    }

    #[test]
    fn draw_completes_and_sets_race_order() {
        let mut state = create_test_app_state(&["A", "B", "C"]);
        let t0 = Instant::now();
        assert!(apply(&mut state, UserCommand::SaveDraw, t0).is_err());

        apply(&mut state, UserCommand::SpinWheel, t0).unwrap();
        apply(&mut state, UserCommand::SpinWheel, t0).unwrap();
        assert!(state.draw.is_complete());

        apply(&mut state, UserCommand::SaveDraw, t0).unwrap();
        assert_eq!(state.history.records().len(), 1);
        assert_eq!(state.roster.order(), state.draw.drawn());
        assert_eq!(state.eligible(), state.draw.drawn().to_vec());
    }

    #[test]
    fn roster_change_resets_draw() {
        let mut state = create_test_app_state(&["A", "B", "C"]);
        apply(&mut state, UserCommand::SpinWheel, Instant::now()).unwrap();
        apply(&mut state, UserCommand::AddTeam("D".into()), Instant::now()).unwrap();
        assert!(state.draw.drawn().is_empty());
        assert_eq!(state.draw.remaining().len(), 4);
    }

    #[test]
    fn snapshot_reflects_session() {
        let mut state = create_test_app_state(&["Alpha", "Beta"]);
        let t0 = Instant::now();
        apply(&mut state, UserCommand::SelectTeam("Beta".into()), t0).unwrap();
        apply(&mut state, UserCommand::BeginRace, t0).unwrap();

        let snap = state.build_snapshot(t0 + Duration::from_secs(2));
        assert_eq!(snap.session.stage, SessionStage::Running);
        assert_eq!(snap.session.participants, vec!["Beta"]);
        assert_eq!(snap.session.elapsed_cs, 200);
        assert_eq!(snap.session.invalid_distances, vec!["Beta"]);
        assert_eq!(snap.teams, vec!["Alpha", "Beta"]);
        assert_eq!(snap.leaderboard.len(), 2);
    }

    #[test]
    fn seed_roster_skips_when_roster_exists() {
        let mut state = create_test_app_state(&["Alpha"]);
        state.config.teams_csv = Some(PathBuf::from("/nonexistent.csv"));
        assert_eq!(seed_roster(&mut state).unwrap(), 0);
    }

    #[test]
    fn seed_roster_reports_missing_file() {
        let mut state = create_test_app_state(&[]);
        state.config.teams_csv = Some(PathBuf::from("/nonexistent/teams.csv"));
        assert!(seed_roster(&mut state).is_err());
    }

    // -----------------------------------------------------------------------
    // Tests: Async event loop
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn event_loop_handles_quit_command() {
        let state = create_test_app_state(&[]);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, _ui_rx) = mpsc::channel(64);

        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));
        cmd_tx.send(UserCommand::Quit).await.unwrap();

        let result = handle.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn event_loop_reports_errors_as_notices() {
        let state = create_test_app_state(&["Alpha"]);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));

        // Initial snapshot.
        assert!(matches!(ui_rx.recv().await, Some(UiUpdate::StateSnapshot(_))));

        cmd_tx.send(UserCommand::BeginRace).await.unwrap();
        match ui_rx.recv().await {
            Some(UiUpdate::Notice(n)) => {
                assert_eq!(n.level, crate::protocol::NoticeLevel::Error);
                assert!(n.text.contains("begin"));
            }
            other => panic!("expected error notice, got {:?}", other),
        }

        cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = handle.await;
    }

    #[tokio::test(start_paused = true)]
    async fn clock_expires_race_at_cap() {
        let state = create_test_app_state(&["Alpha"]);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(4096);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));

        cmd_tx.send(UserCommand::SwitchPhase(Phase::Two)).await.unwrap();
        cmd_tx.send(UserCommand::SelectTeam("Alpha".into())).await.unwrap();
        cmd_tx.send(UserCommand::BeginRace).await.unwrap();

        let mut saw_clock = false;
        let expired_timers = loop {
            match ui_rx.recv().await {
                Some(UiUpdate::Clock { .. }) => saw_clock = true,
                Some(UiUpdate::StateSnapshot(snap))
                    if snap.session.stage == SessionStage::Terminal =>
                {
                    break snap.session.timers;
                }
                Some(_) => {}
                None => panic!("ui channel closed"),
            }
        };

        assert!(saw_clock);
        assert_eq!(expired_timers[0].elapsed_cs, Phase::Two.cap_cs());
        assert!(matches!(expired_timers[0].status, TimerStatus::Dnf { .. }));

        cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = handle.await;
    }
}
