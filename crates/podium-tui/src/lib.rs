// Terminal console: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that mirrors the parts of the application state
// it renders. The app orchestrator pushes `UiUpdate` messages over an mpsc
// channel; the TUI applies them to `ViewState` and re-renders on a fixed tick.

pub mod input;
pub mod layout;
pub mod widgets;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::Frame;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use podium_app::protocol::{
    AppSnapshot, DrawSnapshot, Notice, RaceSummary, SessionSnapshot, SessionStage, TabId,
    UiUpdate, UserCommand,
};
use podium_core::leaderboard::{self, LeaderboardRow};
use podium_core::race::{Phase, TeamTimer};
use podium_core::scores::RankedScore;

use layout::build_layout;

// ---------------------------------------------------------------------------
// Prompts and confirmations
// ---------------------------------------------------------------------------

/// What a text prompt is collecting.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptKind {
    AddTeam,
    ImportTeams,
    Distance(String),
    Score(String),
    Export(Phase),
}

/// A one-line text input shown over the main panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

impl Prompt {
    pub fn new(kind: PromptKind) -> Self {
        let input = match &kind {
            PromptKind::Export(phase) => format!("leaderboard-{}.csv", phase.tag()),
            _ => String::new(),
        };
        Prompt { kind, input }
    }

    pub fn title(&self) -> String {
        match &self.kind {
            PromptKind::AddTeam => "Team name".into(),
            PromptKind::ImportTeams => "Import teams from CSV".into(),
            PromptKind::Distance(team) => format!("Distance for {team} (cm, empty clears)"),
            PromptKind::Score(team) => format!("Score for {team}"),
            PromptKind::Export(phase) => format!("Export {phase} leaderboard to"),
        }
    }

    /// Turn the typed text into a command, or explain why it was rejected.
    pub fn submit(&self) -> Result<UserCommand, String> {
        let text = self.input.trim();
        match &self.kind {
            PromptKind::AddTeam => {
                if text.is_empty() {
                    return Err("team name cannot be empty".into());
                }
                Ok(UserCommand::AddTeam(text.to_string()))
            }
            PromptKind::ImportTeams => {
                if text.is_empty() {
                    return Err("enter a file path".into());
                }
                Ok(UserCommand::ImportTeams(PathBuf::from(text)))
            }
            PromptKind::Distance(team) => {
                let distance_cm = if text.is_empty() {
                    None
                } else {
                    Some(
                        text.parse::<f64>()
                            .map_err(|_| format!("'{text}' is not a number"))?,
                    )
                };
                Ok(UserCommand::SetDistance {
                    team: team.clone(),
                    distance_cm,
                })
            }
            PromptKind::Score(team) => {
                let score = text
                    .parse::<i64>()
                    .map_err(|_| format!("'{text}' is not a whole number"))?;
                Ok(UserCommand::SetScore {
                    team: team.clone(),
                    score,
                })
            }
            PromptKind::Export(phase) => {
                if text.is_empty() {
                    return Err("enter a file path".into());
                }
                Ok(UserCommand::ExportLeaderboard {
                    phase: *phase,
                    path: PathBuf::from(text),
                })
            }
        }
    }
}

/// A yes/no question guarding a destructive action.
#[derive(Debug, Clone, PartialEq)]
pub enum Confirm {
    Quit,
    CancelRace,
    DeleteRace(String),
    ClearPhase(Phase),
    RemoveTeam(String),
    RemoveDraw(String),
    ResetScores,
}

impl Confirm {
    pub fn question(&self) -> String {
        match self {
            Confirm::Quit => "Really quit?".into(),
            Confirm::CancelRace => "Discard this race?".into(),
            Confirm::DeleteRace(id) => format!("Delete {id}?"),
            Confirm::ClearPhase(phase) => format!("Clear all {phase} races?"),
            Confirm::RemoveTeam(team) => format!("Remove {team}?"),
            Confirm::RemoveDraw(_) => "Remove this draw?".into(),
            Confirm::ResetScores => "Reset all team scores?".into(),
        }
    }

    pub fn command(&self) -> UserCommand {
        match self {
            Confirm::Quit => UserCommand::Quit,
            Confirm::CancelRace => UserCommand::CancelRace,
            Confirm::DeleteRace(id) => UserCommand::DeleteRace(id.clone()),
            Confirm::ClearPhase(phase) => UserCommand::ClearPhase(*phase),
            Confirm::RemoveTeam(team) => UserCommand::RemoveTeam(team.clone()),
            Confirm::RemoveDraw(id) => UserCommand::RemoveDraw(id.clone()),
            Confirm::ResetScores => UserCommand::ResetScores,
        }
    }
}

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// One line of the Scores tab.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
    pub position: Option<usize>,
    pub team: String,
    pub score: i64,
    pub penalties: u32,
    pub races: u32,
}

/// TUI-local state that mirrors the application state for rendering.
pub struct ViewState {
    pub event_name: String,
    pub phase: Phase,
    pub session: SessionSnapshot,
    /// Teams still to race in the current phase, in race order.
    pub eligible: Vec<String>,
    pub leaderboard: Vec<LeaderboardRow>,
    pub saved_races: Vec<RaceSummary>,
    pub teams: Vec<String>,
    pub draw: DrawSnapshot,
    pub scores: Vec<RankedScore>,
    pub active_tab: TabId,
    /// Highlighted row per tab.
    pub cursor: HashMap<TabId, usize>,
    pub notice: Option<Notice>,
    pub prompt: Option<Prompt>,
    pub confirm: Option<Confirm>,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            event_name: String::new(),
            phase: Phase::One,
            session: SessionSnapshot::default(),
            eligible: Vec::new(),
            leaderboard: Vec::new(),
            saved_races: Vec::new(),
            teams: Vec::new(),
            draw: DrawSnapshot::default(),
            scores: Vec::new(),
            active_tab: TabId::Race,
            cursor: HashMap::new(),
            notice: None,
            prompt: None,
            confirm: None,
        }
    }
}

impl ViewState {
    /// Apply a full state snapshot from the app orchestrator. The active tab,
    /// cursors and any open prompt are TUI-local and left alone.
    pub fn apply_snapshot(&mut self, snapshot: AppSnapshot) {
        self.event_name = snapshot.event_name;
        self.phase = snapshot.phase;
        self.session = snapshot.session;
        self.eligible = snapshot.eligible;
        self.leaderboard = snapshot.leaderboard;
        self.saved_races = snapshot.saved_races;
        self.teams = snapshot.teams;
        self.draw = snapshot.draw;
        self.scores = snapshot.scores;
        self.clamp_cursors();
    }

    /// Teams listed on the Race tab: candidates while selecting, racers once
    /// the clock has started.
    pub fn race_rows(&self) -> Vec<String> {
        match self.session.stage {
            SessionStage::Idle | SessionStage::Selecting => {
                let mut rows = self.eligible.clone();
                for team in &self.session.participants {
                    if !rows.contains(team) {
                        rows.push(team.clone());
                    }
                }
                rows
            }
            SessionStage::Running | SessionStage::Terminal => self
                .timer_rows()
                .into_iter()
                .map(|(t, _)| t.team.clone())
                .collect(),
        }
    }

    /// Timers with their scores. Entry order while the clock runs; once the
    /// heat is over, finished teams by score and then everyone else.
    pub fn timer_rows(&self) -> Vec<(&TeamTimer, f64)> {
        match self.session.stage {
            SessionStage::Terminal => leaderboard::rank_race(&self.session.timers),
            SessionStage::Running => self
                .session
                .timers
                .iter()
                .map(|t| (t, podium_core::scoring::score(t)))
                .collect(),
            SessionStage::Idle | SessionStage::Selecting => Vec::new(),
        }
    }

    /// Saved races of the current phase, oldest first.
    pub fn phase_races(&self) -> Vec<&RaceSummary> {
        self.saved_races
            .iter()
            .filter(|r| r.phase == self.phase)
            .collect()
    }

    /// Ledger entries by rank, then roster teams without an entry.
    pub fn score_rows(&self) -> Vec<ScoreRow> {
        let mut rows: Vec<ScoreRow> = self
            .scores
            .iter()
            .map(|r| ScoreRow {
                position: Some(r.position),
                team: r.entry.name.clone(),
                score: r.entry.score,
                penalties: r.entry.total_penalties,
                races: r.entry.races,
            })
            .collect();
        for team in &self.teams {
            if !rows.iter().any(|r| &r.team == team) {
                rows.push(ScoreRow {
                    position: None,
                    team: team.clone(),
                    score: 0,
                    penalties: 0,
                    races: 0,
                });
            }
        }
        rows
    }

    fn row_count(&self, tab: TabId) -> usize {
        match tab {
            TabId::Race => self.race_rows().len(),
            TabId::Leaderboard => self.phase_races().len(),
            TabId::Teams => self.teams.len(),
            TabId::Draw => self.draw.history.len(),
            TabId::Scores => self.score_rows().len(),
        }
    }

    /// Highlighted row of the active tab.
    pub fn cursor(&self) -> usize {
        self.cursor.get(&self.active_tab).copied().unwrap_or(0)
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.row_count(self.active_tab);
        let current = self.cursor() as isize;
        let next = (current + delta).clamp(0, len.saturating_sub(1) as isize);
        self.cursor.insert(self.active_tab, next as usize);
    }

    fn clamp_cursors(&mut self) {
        for tab in TabId::ALL {
            let len = self.row_count(tab);
            if let Some(c) = self.cursor.get_mut(&tab) {
                *c = (*c).min(len.saturating_sub(1));
            }
        }
    }

    /// Team under the cursor on the Race tab.
    pub fn selected_race_team(&self) -> Option<String> {
        self.race_rows().into_iter().nth(self.cursor())
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::StateSnapshot(snapshot) => {
            state.apply_snapshot(*snapshot);
        }
        UiUpdate::Clock { elapsed_cs, timers } => {
            state.session.elapsed_cs = elapsed_cs;
            state.session.timers = timers;
        }
        UiUpdate::Notice(notice) => {
            state.notice = Some(notice);
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete console frame.
pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    widgets::race_clock::render(frame, layout.clock_banner, state);
    match state.active_tab {
        TabId::Race => widgets::race::render(frame, layout.main_panel, state),
        TabId::Leaderboard => widgets::leaderboard::render(frame, layout.main_panel, state),
        TabId::Teams => widgets::teams::render(frame, layout.main_panel, state),
        TabId::Draw => widgets::draw::render(frame, layout.main_panel, state),
        TabId::Scores => widgets::scores::render(frame, layout.main_panel, state),
    }
    widgets::help_bar::render(frame, layout.help_bar, state);

    if let Some(prompt) = &state.prompt {
        widgets::overlay::render_prompt(frame, frame.area(), prompt);
    } else if let Some(confirm) = &state.confirm {
        widgets::overlay::render_confirm(frame, frame.area(), confirm);
    }
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// 1. Initializes the terminal (raw mode, alternate screen).
/// 2. Installs a panic hook to restore the terminal on crash.
/// 3. Runs an async select loop: UI updates, keyboard input, render ticks.
/// 4. Restores the terminal on exit.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
    render_period: Duration,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(render_period);
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    // App is shutting down
                    None => break Ok(()),
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            debug!("Sending command: {:?}", cmd);
                            let quit = cmd == UserCommand::Quit;
                            if cmd_tx.send(cmd).await.is_err() || quit {
                                break Ok(());
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Terminal input error: {}", e);
                        break Err(e.into());
                    }
                    None => break Ok(()),
                }
            }

            _ = render_tick.tick() => {
                if let Err(e) = terminal.draw(|frame| render_frame(frame, &view_state)) {
                    break Err(e.into());
                }
            }
        }
    };

    ratatui::restore();
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use podium_core::race::{TeamTimer, TimerStatus};
    use podium_core::scores::TeamScore;

    /// A view with three teams, one saved Phase 1 race and a running heat.
    pub fn sample_view() -> ViewState {
        let mut state = ViewState::default();
        state.event_name = "Test Challenge".into();
        state.teams = vec!["Alpha".into(), "Beta".into(), "Gamma".into()];
        state.eligible = vec!["Beta".into(), "Gamma".into()];

        state.leaderboard = vec![
            LeaderboardRow {
                team: "Alpha".into(),
                position: Some(1),
                score: Some(180.0),
                elapsed_cs: Some(30_000),
                status: Some(TimerStatus::Finished),
                penalty_points: Some(0),
            },
            LeaderboardRow {
                team: "Beta".into(),
                position: None,
                score: None,
                elapsed_cs: None,
                status: None,
                penalty_points: None,
            },
        ];
        state.saved_races = vec![RaceSummary {
            id: "race_20261019_101500_000".into(),
            phase: Phase::One,
            teams: vec!["Alpha".into()],
            best_score: 180.0,
        }];

        let mut beta = TeamTimer::new("Beta", Phase::One);
        beta.elapsed_cs = 1_234;
        state.session = SessionSnapshot {
            stage: SessionStage::Running,
            participants: vec!["Beta".into(), "Gamma".into()],
            timers: vec![beta, TeamTimer::new("Gamma", Phase::One)],
            elapsed_cs: 1_234,
            invalid_distances: vec!["Beta".into(), "Gamma".into()],
            max_participants: 5,
            late_corrections: false,
        };
        state.scores = vec![RankedScore {
            position: 1,
            entry: TeamScore {
                name: "Alpha".into(),
                score: 40,
                total_penalties: 20,
                races: 1,
            },
        }];
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podium_core::race::{DnfReason, TimerStatus};
    use test_support::sample_view;

    #[test]
    fn view_state_default_is_sensible() {
        let state = ViewState::default();
        assert_eq!(state.phase, Phase::One);
        assert_eq!(state.active_tab, TabId::Race);
        assert_eq!(state.session.stage, SessionStage::Idle);
        assert!(state.teams.is_empty());
        assert!(state.prompt.is_none());
        assert!(state.confirm.is_none());
        assert_eq!(state.cursor(), 0);
    }

    #[test]
    fn clock_update_only_touches_timers() {
        let mut state = sample_view();
        let mut timers = state.session.timers.clone();
        timers[0].elapsed_cs = 5_000;
        apply_ui_update(
            &mut state,
            UiUpdate::Clock {
                elapsed_cs: 5_000,
                timers,
            },
        );
        assert_eq!(state.session.elapsed_cs, 5_000);
        assert_eq!(state.session.timers[0].elapsed_cs, 5_000);
        assert_eq!(state.teams.len(), 3);
    }

    #[test]
    fn notice_update_is_kept() {
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::Notice(Notice::error("boom")));
        assert_eq!(state.notice, Some(Notice::error("boom")));
    }

    #[test]
    fn snapshot_clamps_cursor() {
        let mut state = sample_view();
        state.active_tab = TabId::Teams;
        state.move_cursor(10);
        assert_eq!(state.cursor(), 2);

        let snapshot = AppSnapshot {
            event_name: "E".into(),
            phase: Phase::One,
            session: SessionSnapshot::default(),
            eligible: vec![],
            leaderboard: vec![],
            saved_races: vec![],
            teams: vec!["Only".into()],
            draw: DrawSnapshot::default(),
            scores: vec![],
        };
        apply_ui_update(&mut state, UiUpdate::StateSnapshot(Box::new(snapshot)));
        assert_eq!(state.cursor(), 0);
        assert_eq!(state.active_tab, TabId::Teams);
    }

    #[test]
    fn race_rows_follow_stage() {
        let mut state = sample_view();
        assert_eq!(state.race_rows(), vec!["Beta", "Gamma"]);

        state.session = SessionSnapshot {
            stage: SessionStage::Selecting,
            participants: vec!["Gamma".into()],
            ..SessionSnapshot::default()
        };
        state.eligible = vec!["Beta".into()];
        assert_eq!(state.race_rows(), vec!["Beta", "Gamma"]);
    }

    #[test]
    fn stopped_heat_is_ranked_by_score() {
        let mut state = sample_view();
        state.session.timers[0].status = TimerStatus::Finished;
        state.session.timers[0].distance_cm = Some(90.0);
        state.session.timers[1].status = TimerStatus::Finished;
        state.session.timers[1].distance_cm = Some(150.0);

        // Entry order while running.
        assert_eq!(state.race_rows(), vec!["Beta", "Gamma"]);

        state.session.stage = SessionStage::Terminal;
        let ranked: Vec<&str> = state
            .timer_rows()
            .iter()
            .map(|(t, _)| t.team.as_str())
            .collect();
        assert_eq!(ranked, vec!["Gamma", "Beta"]);
        assert_eq!(state.race_rows(), vec!["Gamma", "Beta"]);
        assert_eq!(state.selected_race_team().as_deref(), Some("Gamma"));
    }

    #[test]
    fn dnf_teams_follow_finishers_in_entry_order() {
        let mut state = sample_view();
        state.session.stage = SessionStage::Terminal;
        state.session.timers[0].status = TimerStatus::Dnf {
            reason: DnfReason::Abandoned,
        };
        state.session.timers[0].distance_cm = Some(200.0);
        state.session.timers[1].status = TimerStatus::Finished;
        state.session.timers[1].distance_cm = Some(10.0);
        assert_eq!(state.race_rows(), vec!["Gamma", "Beta"]);
    }

    #[test]
    fn score_rows_append_unscored_teams() {
        let state = sample_view();
        let rows = state.score_rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].team, "Alpha");
        assert_eq!(rows[0].position, Some(1));
        assert_eq!(rows[1].position, None);
    }

    #[test]
    fn prompt_parses_distance() {
        let mut prompt = Prompt::new(PromptKind::Distance("Alpha".into()));
        prompt.input = "152.5".into();
        assert_eq!(
            prompt.submit(),
            Ok(UserCommand::SetDistance {
                team: "Alpha".into(),
                distance_cm: Some(152.5)
            })
        );

        prompt.input = "".into();
        assert_eq!(
            prompt.submit(),
            Ok(UserCommand::SetDistance {
                team: "Alpha".into(),
                distance_cm: None
            })
        );

        prompt.input = "far".into();
        assert!(prompt.submit().is_err());
    }

    #[test]
    fn prompt_parses_score_and_export() {
        let mut prompt = Prompt::new(PromptKind::Score("Beta".into()));
        prompt.input = "-15".into();
        assert_eq!(
            prompt.submit(),
            Ok(UserCommand::SetScore {
                team: "Beta".into(),
                score: -15
            })
        );

        let export = Prompt::new(PromptKind::Export(Phase::Two));
        assert_eq!(export.input, "leaderboard-phase-2.csv");
        assert!(matches!(
            export.submit(),
            Ok(UserCommand::ExportLeaderboard { phase: Phase::Two, .. })
        ));
    }

    #[test]
    fn confirm_maps_to_command() {
        assert_eq!(Confirm::Quit.command(), UserCommand::Quit);
        assert_eq!(
            Confirm::ClearPhase(Phase::One).command(),
            UserCommand::ClearPhase(Phase::One)
        );
        assert!(Confirm::RemoveTeam("Alpha".into())
            .question()
            .contains("Alpha"));
    }

    #[test]
    fn render_frame_every_tab() {
        let mut state = sample_view();
        for tab in TabId::ALL {
            state.active_tab = tab;
            let backend = ratatui::backend::TestBackend::new(120, 40);
            let mut terminal = ratatui::Terminal::new(backend).unwrap();
            terminal
                .draw(|frame| render_frame(frame, &state))
                .unwrap();
        }
    }

    #[test]
    fn render_frame_with_overlays() {
        let mut state = sample_view();
        state.confirm = Some(Confirm::Quit);
        let backend = ratatui::backend::TestBackend::new(80, 24);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| render_frame(frame, &state))
            .unwrap();

        state.prompt = Some(Prompt::new(PromptKind::AddTeam));
        terminal
            .draw(|frame| render_frame(frame, &state))
            .unwrap();
    }
}
