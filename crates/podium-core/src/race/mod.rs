// Race data model: phases, per-team timers and saved race records.

pub mod clock;
pub mod log;
pub mod session;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the two independently scored competition stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "phase-1")]
    One,
    #[serde(rename = "phase-2")]
    Two,
}

impl Phase {
    /// Time cap in centiseconds: 6 minutes for Phase 1, 10 minutes for Phase 2.
    pub fn cap_cs(self) -> u32 {
        match self {
            Phase::One => 36_000,
            Phase::Two => 60_000,
        }
    }

    /// Hard upper bound on heat size. Phase 2 is always a single team.
    pub fn max_participants(self) -> usize {
        match self {
            Phase::One => 5,
            Phase::Two => 1,
        }
    }

    /// Storage tag, e.g. `phase-1`.
    pub fn tag(self) -> &'static str {
        match self {
            Phase::One => "phase-1",
            Phase::Two => "phase-2",
        }
    }

    pub fn other(self) -> Phase {
        match self {
            Phase::One => Phase::Two,
            Phase::Two => Phase::One,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::One => write!(f, "Phase 1"),
            Phase::Two => write!(f, "Phase 2"),
        }
    }
}

/// Why a timer ended without completing the course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnfReason {
    Abandoned,
    TimeExpired,
}

/// Where a single team's attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TimerStatus {
    Running,
    Finished,
    Dnf { reason: DnfReason },
}

impl TimerStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TimerStatus::Running)
    }

    pub fn label(self) -> &'static str {
        match self {
            TimerStatus::Running => "RUNNING",
            TimerStatus::Finished => "FINISHED",
            TimerStatus::Dnf {
                reason: DnfReason::Abandoned,
            } => "DNF",
            TimerStatus::Dnf {
                reason: DnfReason::TimeExpired,
            } => "DNF (TIME)",
        }
    }
}

/// Phase 1 penalty categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyKind {
    BarrierContact,
    StopSignal,
    HumanIntervention,
}

impl PenaltyKind {
    pub const ALL: [PenaltyKind; 3] = [
        PenaltyKind::BarrierContact,
        PenaltyKind::StopSignal,
        PenaltyKind::HumanIntervention,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PenaltyKind::BarrierContact => "Barrier",
            PenaltyKind::StopSignal => "Stop signal",
            PenaltyKind::HumanIntervention => "Intervention",
        }
    }
}

/// Phase 2 course challenges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Challenge {
    PlanIncline,
    DistanceMeasure,
    Stairs,
}

impl Challenge {
    pub const ALL: [Challenge; 3] = [
        Challenge::PlanIncline,
        Challenge::DistanceMeasure,
        Challenge::Stairs,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Challenge::PlanIncline => "Incline",
            Challenge::DistanceMeasure => "Distance",
            Challenge::Stairs => "Stairs",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase1Penalties {
    pub barrier_contacts: u32,
    pub stop_signal_violations: u32,
    pub human_interventions: u32,
}

impl Phase1Penalties {
    pub fn count(&self, kind: PenaltyKind) -> u32 {
        match kind {
            PenaltyKind::BarrierContact => self.barrier_contacts,
            PenaltyKind::StopSignal => self.stop_signal_violations,
            PenaltyKind::HumanIntervention => self.human_interventions,
        }
    }

    fn count_mut(&mut self, kind: PenaltyKind) -> &mut u32 {
        match kind {
            PenaltyKind::BarrierContact => &mut self.barrier_contacts,
            PenaltyKind::StopSignal => &mut self.stop_signal_violations,
            PenaltyKind::HumanIntervention => &mut self.human_interventions,
        }
    }

    pub fn add(&mut self, kind: PenaltyKind) -> u32 {
        let count = self.count_mut(kind);
        *count = count.saturating_add(1);
        *count
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase2Challenges {
    pub plan_incline: bool,
    pub distance_measure: bool,
    pub stairs: bool,
    pub interventions: u32,
}

impl Phase2Challenges {
    pub fn is_complete(&self, challenge: Challenge) -> bool {
        match challenge {
            Challenge::PlanIncline => self.plan_incline,
            Challenge::DistanceMeasure => self.distance_measure,
            Challenge::Stairs => self.stairs,
        }
    }

    pub fn toggle(&mut self, challenge: Challenge) -> bool {
        let flag = match challenge {
            Challenge::PlanIncline => &mut self.plan_incline,
            Challenge::DistanceMeasure => &mut self.distance_measure,
            Challenge::Stairs => &mut self.stairs,
        };
        *flag = !*flag;
        *flag
    }

    pub fn add_intervention(&mut self) -> u32 {
        self.interventions = self.interventions.saturating_add(1);
        self.interventions
    }

    /// Undo one intervention; never goes below zero.
    pub fn remove_intervention(&mut self) -> u32 {
        self.interventions = self.interventions.saturating_sub(1);
        self.interventions
    }
}

/// Phase-specific scoring inputs of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase")]
pub enum TimerRecord {
    #[serde(rename = "phase-1")]
    Phase1(Phase1Penalties),
    #[serde(rename = "phase-2")]
    Phase2(Phase2Challenges),
}

impl TimerRecord {
    pub fn empty(phase: Phase) -> Self {
        match phase {
            Phase::One => TimerRecord::Phase1(Phase1Penalties::default()),
            Phase::Two => TimerRecord::Phase2(Phase2Challenges::default()),
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            TimerRecord::Phase1(_) => Phase::One,
            TimerRecord::Phase2(_) => Phase::Two,
        }
    }
}

/// One team's performance within a race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamTimer {
    pub team: String,
    /// Elapsed time in centiseconds. Never decreases and never exceeds the
    /// phase cap.
    pub elapsed_cs: u32,
    pub status: TimerStatus,
    /// Distance travelled in centimetres. `None` until entered.
    pub distance_cm: Option<f64>,
    pub record: TimerRecord,
}

impl TeamTimer {
    pub fn new(team: impl Into<String>, phase: Phase) -> Self {
        TeamTimer {
            team: team.into(),
            elapsed_cs: 0,
            status: TimerStatus::Running,
            distance_cm: None,
            record: TimerRecord::empty(phase),
        }
    }

    /// Completed the course (not DNF).
    pub fn finished(&self) -> bool {
        self.status == TimerStatus::Finished
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn phase(&self) -> Phase {
        self.record.phase()
    }
}

/// A saved, immutable timed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Race {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub phase: Phase,
    pub participants: Vec<String>,
    pub timers: Vec<TeamTimer>,
    pub finished: bool,
}

impl Race {
    /// Generate a unique race ID from the current UTC time.
    ///
    /// Format: `race_YYYYMMDD_HHMMSS_SSS`.
    pub fn generate_id(now: DateTime<Utc>) -> String {
        now.format("race_%Y%m%d_%H%M%S_%3f").to_string()
    }

    pub fn includes(&self, team: &str) -> bool {
        self.participants.iter().any(|p| p == team) || self.timers.iter().any(|t| t.team == team)
    }
}
