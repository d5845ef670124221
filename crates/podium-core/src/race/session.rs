// Race session state machine.
//
// idle -> selecting -> running -> terminal -> (saved) idle. Cancel returns to
// idle from anywhere. Time is supplied by the caller on every action so the
// machine stays deterministic and the scheduler stays outside it.

use std::collections::BTreeSet;
use std::time::Instant;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::clock::{derive_elapsed, format_time};
use super::{Challenge, DnfReason, PenaltyKind, Phase, Race, TeamTimer, TimerRecord, TimerStatus};
use crate::scoring;

/// Inclusive distance bounds for Phase 1, in centimetres.
pub const PHASE1_DISTANCE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=200.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("{team} has already raced in {phase}")]
    DuplicateParticipant { team: String, phase: Phase },

    #[error("missing or invalid distance for: {}", teams.join(", "))]
    Validation { teams: Vec<String> },

    #[error("cannot {action} while the session is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("team '{0}' is not part of this race")]
    UnknownTeam(String),

    #[error("{phase} allows at most {max} team(s) per race")]
    TooManyTeams { phase: Phase, max: usize },

    #[error("no teams selected")]
    NoTeamsSelected,

    #[error("timer for {0} has already stopped")]
    TimerTerminal(String),

    #[error("{action} is not available in {phase}")]
    WrongPhase { action: &'static str, phase: Phase },

    #[error("every team has already raced in {0}")]
    AllTeamsRaced(Phase),
}

/// Per-phase behaviour switches, normally read from `event.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Heat size limit; clamped to the phase's hard maximum.
    pub max_participants: usize,
    /// Allow penalty, challenge and intervention edits after a timer stopped.
    pub late_corrections: bool,
}

impl SessionConfig {
    pub fn for_phase(phase: Phase) -> Self {
        SessionConfig {
            max_participants: phase.max_participants(),
            late_corrections: phase == Phase::Two,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Selecting {
        selected: Vec<String>,
    },
    Running {
        started_at: Instant,
        created_at: DateTime<Utc>,
        timers: Vec<TeamTimer>,
    },
    /// Every timer has stopped; waiting for save or cancel.
    Terminal {
        created_at: DateTime<Utc>,
        timers: Vec<TeamTimer>,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Selecting { .. } => "selecting teams",
            SessionState::Running { .. } => "running",
            SessionState::Terminal { .. } => "terminal",
        }
    }
}

/// Result of a clock tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// No race running; nothing changed.
    Inactive,
    Advanced,
    /// The cap was reached on this tick and the race is now terminal.
    Expired,
}

#[derive(Debug, Clone)]
pub struct RaceSession {
    phase: Phase,
    config: SessionConfig,
    state: SessionState,
}

impl RaceSession {
    pub fn new(phase: Phase, config: SessionConfig) -> Self {
        let max = config.max_participants.clamp(1, phase.max_participants());
        RaceSession {
            phase,
            config: SessionConfig {
                max_participants: max,
                ..config
            },
            state: SessionState::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Running { .. })
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            SessionState::Running { .. } | SessionState::Terminal { .. }
        )
    }

    /// Teams picked so far (selection) or racing (running/terminal).
    pub fn participants(&self) -> Vec<String> {
        match &self.state {
            SessionState::Idle => Vec::new(),
            SessionState::Selecting { selected } => selected.clone(),
            SessionState::Running { timers, .. } | SessionState::Terminal { timers, .. } => {
                timers.iter().map(|t| t.team.clone()).collect()
            }
        }
    }

    pub fn timers(&self) -> &[TeamTimer] {
        match &self.state {
            SessionState::Running { timers, .. } | SessionState::Terminal { timers, .. } => timers,
            _ => &[],
        }
    }

    /// Shared elapsed time of the running clock, or the largest recorded
    /// elapsed once stopped.
    pub fn elapsed_cs(&self, now: Instant) -> u32 {
        match &self.state {
            SessionState::Running { started_at, .. } => {
                derive_elapsed(*started_at, now, self.phase.cap_cs()).0
            }
            SessionState::Terminal { timers, .. } => {
                timers.iter().map(|t| t.elapsed_cs).max().unwrap_or(0)
            }
            _ => 0,
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Add `team` to the heat. `raced` holds the teams that already have a
    /// saved race in this phase. Selecting a team twice is a no-op.
    pub fn select(&mut self, team: &str, raced: &BTreeSet<String>) -> Result<(), SessionError> {
        if raced.contains(team) {
            warn!("Rejected {} for {}: already raced", team, self.phase);
            return Err(SessionError::DuplicateParticipant {
                team: team.to_string(),
                phase: self.phase,
            });
        }

        match &mut self.state {
            SessionState::Idle => {
                self.state = SessionState::Selecting {
                    selected: vec![team.to_string()],
                };
            }
            SessionState::Selecting { selected } => {
                if selected.iter().any(|s| s == team) {
                    return Ok(());
                }
                if selected.len() >= self.config.max_participants {
                    return Err(SessionError::TooManyTeams {
                        phase: self.phase,
                        max: self.config.max_participants,
                    });
                }
                selected.push(team.to_string());
            }
            other => {
                return Err(SessionError::InvalidTransition {
                    action: "select teams",
                    state: other.name(),
                })
            }
        }

        debug!("Selected {} for {}", team, self.phase);
        Ok(())
    }

    pub fn deselect(&mut self, team: &str) -> Result<(), SessionError> {
        match &mut self.state {
            SessionState::Selecting { selected } => {
                let before = selected.len();
                selected.retain(|s| s != team);
                if selected.len() == before {
                    return Err(SessionError::UnknownTeam(team.to_string()));
                }
                Ok(())
            }
            other => Err(SessionError::InvalidTransition {
                action: "deselect teams",
                state: other.name(),
            }),
        }
    }

    /// Start the clock for every selected team.
    pub fn begin(&mut self, now: Instant, created_at: DateTime<Utc>) -> Result<(), SessionError> {
        let selected = match &self.state {
            SessionState::Selecting { selected } => selected,
            other => {
                return Err(SessionError::InvalidTransition {
                    action: "begin",
                    state: other.name(),
                })
            }
        };
        if selected.is_empty() {
            return Err(SessionError::NoTeamsSelected);
        }

        let timers: Vec<TeamTimer> = selected
            .iter()
            .map(|team| TeamTimer::new(team.clone(), self.phase))
            .collect();

        info!(
            "{} race started: {}",
            self.phase,
            selected.join(", ")
        );
        self.state = SessionState::Running {
            started_at: now,
            created_at,
            timers,
        };
        Ok(())
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    /// Recompute elapsed time for every running timer. Reaching the cap turns
    /// every running timer into a time-expired DNF. Idempotent once the
    /// race has left `running`.
    pub fn tick(&mut self, now: Instant) -> Tick {
        let cap = self.phase.cap_cs();
        let SessionState::Running {
            started_at, timers, ..
        } = &mut self.state
        else {
            return Tick::Inactive;
        };

        let (elapsed, capped) = derive_elapsed(*started_at, now, cap);
        for timer in timers.iter_mut().filter(|t| !t.is_terminal()) {
            timer.elapsed_cs = timer.elapsed_cs.max(elapsed);
            if capped {
                timer.status = TimerStatus::Dnf {
                    reason: DnfReason::TimeExpired,
                };
            }
        }

        if capped {
            info!("{} time cap reached at {}", self.phase, format_time(cap));
        }
        self.settle();

        if capped {
            Tick::Expired
        } else {
            Tick::Advanced
        }
    }

    /// Move to `terminal` once no timer is still running.
    fn settle(&mut self) {
        if let SessionState::Running {
            created_at, timers, ..
        } = &mut self.state
        {
            if timers.iter().all(TeamTimer::is_terminal) {
                let timers = std::mem::take(timers);
                let created_at = *created_at;
                self.state = SessionState::Terminal { created_at, timers };
                info!("{} race stopped", self.phase);
            }
        }
    }

    // ------------------------------------------------------------------
    // Per-team transitions
    // ------------------------------------------------------------------

    fn running_timer(&mut self, team: &str, action: &'static str) -> Result<&mut TeamTimer, SessionError> {
        let timers = match &mut self.state {
            SessionState::Running { timers, .. } => timers,
            other => {
                return Err(SessionError::InvalidTransition {
                    action,
                    state: other.name(),
                })
            }
        };
        let timer = timers
            .iter_mut()
            .find(|t| t.team == team)
            .ok_or_else(|| SessionError::UnknownTeam(team.to_string()))?;
        if timer.is_terminal() {
            return Err(SessionError::TimerTerminal(team.to_string()));
        }
        Ok(timer)
    }

    /// Stop `team`'s clock as a completed run. If the cap has already passed
    /// the race expires instead and the timer ends as a time-expired DNF.
    pub fn finish(&mut self, team: &str, now: Instant) -> Result<TimerStatus, SessionError> {
        self.running_timer(team, "finish")?;
        if self.tick(now) == Tick::Expired {
            return Ok(TimerStatus::Dnf {
                reason: DnfReason::TimeExpired,
            });
        }

        let timer = self.running_timer(team, "finish")?;
        timer.status = TimerStatus::Finished;
        info!("{} finished in {}", team, format_time(timer.elapsed_cs));
        self.settle();
        Ok(TimerStatus::Finished)
    }

    /// Mark `team` as DNF (abandoned) at the current elapsed time.
    pub fn abandon(&mut self, team: &str, now: Instant) -> Result<TimerStatus, SessionError> {
        self.running_timer(team, "abandon")?;
        if self.tick(now) == Tick::Expired {
            return Ok(TimerStatus::Dnf {
                reason: DnfReason::TimeExpired,
            });
        }

        let timer = self.running_timer(team, "abandon")?;
        timer.status = TimerStatus::Dnf {
            reason: DnfReason::Abandoned,
        };
        info!("{} abandoned at {}", team, format_time(timer.elapsed_cs));
        self.settle();
        Ok(timer_status_abandoned())
    }

    /// End the heat: every timer still running becomes an abandoned DNF.
    pub fn stop_race(&mut self, now: Instant) -> Result<(), SessionError> {
        if !self.is_running() {
            return Err(SessionError::InvalidTransition {
                action: "stop the race",
                state: self.state.name(),
            });
        }
        if self.tick(now) == Tick::Expired {
            return Ok(());
        }

        if let SessionState::Running { timers, .. } = &mut self.state {
            for timer in timers.iter_mut().filter(|t| !t.is_terminal()) {
                timer.status = timer_status_abandoned();
                info!("{} stopped at {}", timer.team, format_time(timer.elapsed_cs));
            }
        }
        self.settle();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Scoring inputs
    // ------------------------------------------------------------------

    /// Timer open for penalty, challenge and intervention edits.
    fn correctable_timer(&mut self, team: &str, action: &'static str) -> Result<&mut TeamTimer, SessionError> {
        let late = self.config.late_corrections;
        let timer = self.active_timer(team, action)?;
        if timer.is_terminal() && !late {
            return Err(SessionError::TimerTerminal(team.to_string()));
        }
        Ok(timer)
    }

    fn active_timer(&mut self, team: &str, action: &'static str) -> Result<&mut TeamTimer, SessionError> {
        let timers = match &mut self.state {
            SessionState::Running { timers, .. } | SessionState::Terminal { timers, .. } => timers,
            other => {
                return Err(SessionError::InvalidTransition {
                    action,
                    state: other.name(),
                })
            }
        };
        timers
            .iter_mut()
            .find(|t| t.team == team)
            .ok_or_else(|| SessionError::UnknownTeam(team.to_string()))
    }

    fn require_phase(&self, phase: Phase, action: &'static str) -> Result<(), SessionError> {
        if self.phase != phase {
            return Err(SessionError::WrongPhase {
                action,
                phase: self.phase,
            });
        }
        Ok(())
    }

    /// Record one Phase 1 penalty. Returns the new count for that category.
    pub fn add_penalty(&mut self, team: &str, kind: PenaltyKind) -> Result<u32, SessionError> {
        self.require_phase(Phase::One, "penalties")?;
        let timer = self.correctable_timer(team, "add a penalty")?;
        let TimerRecord::Phase1(penalties) = &mut timer.record else {
            return Err(SessionError::WrongPhase {
                action: "penalties",
                phase: Phase::Two,
            });
        };
        let count = penalties.add(kind);
        debug!("{} penalty for {} (now {})", kind.label(), team, count);
        Ok(count)
    }

    /// Flip a Phase 2 challenge. Returns whether it is now complete.
    pub fn toggle_challenge(&mut self, team: &str, challenge: Challenge) -> Result<bool, SessionError> {
        self.require_phase(Phase::Two, "challenges")?;
        let timer = self.correctable_timer(team, "toggle a challenge")?;
        let TimerRecord::Phase2(challenges) = &mut timer.record else {
            return Err(SessionError::WrongPhase {
                action: "challenges",
                phase: Phase::One,
            });
        };
        let done = challenges.toggle(challenge);
        debug!("{} challenge for {} -> {}", challenge.label(), team, done);
        Ok(done)
    }

    pub fn add_intervention(&mut self, team: &str) -> Result<u32, SessionError> {
        self.adjust_interventions(team, true)
    }

    /// Undo one Phase 2 intervention, never below zero.
    pub fn remove_intervention(&mut self, team: &str) -> Result<u32, SessionError> {
        self.adjust_interventions(team, false)
    }

    fn adjust_interventions(&mut self, team: &str, add: bool) -> Result<u32, SessionError> {
        self.require_phase(Phase::Two, "interventions")?;
        let timer = self.correctable_timer(team, "change interventions")?;
        let TimerRecord::Phase2(challenges) = &mut timer.record else {
            return Err(SessionError::WrongPhase {
                action: "interventions",
                phase: Phase::One,
            });
        };
        let count = if add {
            challenges.add_intervention()
        } else {
            challenges.remove_intervention()
        };
        debug!("Interventions for {} -> {}", team, count);
        Ok(count)
    }

    /// Enter or clear the measured distance. Allowed whenever the race is
    /// running or stopped; values are checked at save time.
    pub fn set_distance(&mut self, team: &str, distance_cm: Option<f64>) -> Result<(), SessionError> {
        let timer = self.active_timer(team, "set a distance")?;
        timer.distance_cm = distance_cm;
        debug!("Distance for {} -> {:?}", team, distance_cm);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Save / cancel
    // ------------------------------------------------------------------

    fn distance_is_valid(&self, distance: Option<f64>) -> bool {
        match distance {
            Some(d) if d.is_finite() => match self.phase {
                Phase::One => PHASE1_DISTANCE_RANGE.contains(&d),
                Phase::Two => d >= 0.0,
            },
            _ => false,
        }
    }

    /// Teams whose distance would block a save, in entry order.
    pub fn invalid_distances(&self) -> Vec<String> {
        self.timers()
            .iter()
            .filter(|t| !self.distance_is_valid(t.distance_cm))
            .map(|t| t.team.clone())
            .collect()
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        let teams = self.invalid_distances();
        if teams.is_empty() {
            Ok(())
        } else {
            Err(SessionError::Validation { teams })
        }
    }

    /// Finalize the race. Fails without side effects unless the race is
    /// terminal and every distance is valid; on success the session returns
    /// to idle and the caller persists the returned record.
    pub fn save(&mut self, saved_at: DateTime<Utc>) -> Result<Race, SessionError> {
        let SessionState::Terminal { .. } = &self.state else {
            return Err(SessionError::InvalidTransition {
                action: "save",
                state: self.state.name(),
            });
        };
        if let Err(e) = self.validate() {
            warn!("{} save blocked: {}", self.phase, e);
            return Err(e);
        }

        let SessionState::Terminal { created_at, timers } =
            std::mem::replace(&mut self.state, SessionState::Idle)
        else {
            return Err(SessionError::InvalidTransition {
                action: "save",
                state: "idle",
            });
        };

        for timer in &timers {
            let b = scoring::breakdown(timer);
            info!(
                "{} {}: {} {} distance={} challenges={} bonus={:.2} penalties={} total={:.2}",
                self.phase,
                timer.team,
                timer.status.label(),
                format_time(timer.elapsed_cs),
                b.distance_points,
                b.challenge_points,
                b.time_bonus,
                b.penalty_points,
                b.total
            );
        }

        let race = Race {
            id: Race::generate_id(saved_at),
            created_at,
            phase: self.phase,
            participants: timers.iter().map(|t| t.team.clone()).collect(),
            timers,
            finished: true,
        };
        info!("Saved {} race {}", self.phase, race.id);
        Ok(race)
    }

    /// Discard the in-progress race without persisting.
    pub fn cancel(&mut self) {
        if !matches!(self.state, SessionState::Idle) {
            info!("{} session cancelled from {}", self.phase, self.state.name());
        }
        self.state = SessionState::Idle;
    }
}

fn timer_status_abandoned() -> TimerStatus {
    TimerStatus::Dnf {
        reason: DnfReason::Abandoned,
    }
}
