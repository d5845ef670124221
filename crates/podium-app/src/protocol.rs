// Message types exchanged between the TUI and the app orchestrator.
//
// The TUI sends `UserCommand`s; the orchestrator answers with `UiUpdate`s.
// Snapshots are self-contained so the TUI never reaches into app state.

use std::path::PathBuf;

use podium_core::leaderboard::LeaderboardRow;
use podium_core::race::{Challenge, PenaltyKind, Phase, TeamTimer};
use podium_core::roster::draw::DrawRecord;
use podium_core::scores::RankedScore;

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TabId {
    #[default]
    Race,
    Leaderboard,
    Teams,
    Draw,
    Scores,
}

impl TabId {
    pub const ALL: [TabId; 5] = [
        TabId::Race,
        TabId::Leaderboard,
        TabId::Teams,
        TabId::Draw,
        TabId::Scores,
    ];

    pub fn title(self) -> &'static str {
        match self {
            TabId::Race => "Race",
            TabId::Leaderboard => "Leaderboard",
            TabId::Teams => "Teams",
            TabId::Draw => "Draw",
            TabId::Scores => "Scores",
        }
    }
}

// ---------------------------------------------------------------------------
// UserCommand (TUI -> app)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    SwitchTab(TabId),
    SwitchPhase(Phase),

    // Race session
    SelectTeam(String),
    DeselectTeam(String),
    BeginRace,
    FinishTeam(String),
    AbandonTeam(String),
    StopRace,
    AddPenalty { team: String, kind: PenaltyKind },
    ToggleChallenge { team: String, challenge: Challenge },
    AddIntervention(String),
    RemoveIntervention(String),
    SetDistance { team: String, distance_cm: Option<f64> },
    SaveRace,
    CancelRace,

    // Saved races
    DeleteRace(String),
    ClearPhase(Phase),
    ExportLeaderboard { phase: Phase, path: PathBuf },

    // Roster
    AddTeam(String),
    RemoveTeam(String),
    ImportTeams(PathBuf),

    // Wheel draw
    SpinWheel,
    ResetDraw,
    SaveDraw,
    RemoveDraw(String),

    // Team scores
    SetScore { team: String, score: i64 },
    ResetScores,

    Quit,
}

// ---------------------------------------------------------------------------
// UiUpdate (app -> TUI)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum UiUpdate {
    /// Full state after any command.
    StateSnapshot(Box<AppSnapshot>),
    /// Lightweight clock refresh while a race is running.
    Clock {
        elapsed_cs: u32,
        timers: Vec<TeamTimer>,
    },
    Notice(Notice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// One-line message for the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Coarse session state for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStage {
    #[default]
    Idle,
    Selecting,
    Running,
    Terminal,
}

#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub stage: SessionStage,
    /// Selected teams (selecting) or racing teams (running/terminal).
    pub participants: Vec<String>,
    pub timers: Vec<TeamTimer>,
    pub elapsed_cs: u32,
    /// Teams whose distance currently blocks a save.
    pub invalid_distances: Vec<String>,
    pub max_participants: usize,
    pub late_corrections: bool,
}

/// Summary line for a saved race.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceSummary {
    pub id: String,
    pub phase: Phase,
    pub teams: Vec<String>,
    pub best_score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DrawSnapshot {
    pub remaining: Vec<String>,
    pub drawn: Vec<String>,
    pub complete: bool,
    pub history: Vec<DrawRecord>,
}

#[derive(Debug, Clone)]
pub struct AppSnapshot {
    pub event_name: String,
    pub phase: Phase,
    pub session: SessionSnapshot,
    /// Teams that may still race in the current phase, in race order.
    pub eligible: Vec<String>,
    pub leaderboard: Vec<LeaderboardRow>,
    pub saved_races: Vec<RaceSummary>,
    pub teams: Vec<String>,
    pub draw: DrawSnapshot,
    pub scores: Vec<RankedScore>,
}
