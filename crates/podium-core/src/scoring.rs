// Scoring engine: pure functions from a timer record to points.
//
// Phase 1: distance + time bonus - penalties (no floor).
// Phase 2: challenges - interventions + time bonus, floored at zero.

use serde::Serialize;

use crate::race::clock::as_seconds;
use crate::race::{Phase, Phase1Penalties, Phase2Challenges, TeamTimer, TimerRecord};

pub const BARRIER_CONTACT_POINTS: u32 = 20;
pub const STOP_SIGNAL_POINTS: u32 = 30;
pub const HUMAN_INTERVENTION_POINTS: u32 = 50;

pub const CHALLENGE_POINTS: u32 = 150;
pub const PHASE2_INTERVENTION_POINTS: u32 = 20;

/// Points per second saved below the cap.
pub const TIME_BONUS_RATE: f64 = 0.5;

/// Itemized score, for display and audit logs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub distance_points: f64,
    pub challenge_points: u32,
    pub time_bonus: f64,
    pub penalty_points: u32,
    pub total: f64,
}

/// Bonus for finishing before the cap. Zero for DNF, for a time-expired
/// timer, or for any elapsed value at or beyond the cap.
pub fn time_bonus(timer: &TeamTimer, phase: Phase) -> f64 {
    let cap = phase.cap_cs();
    if timer.finished() && timer.elapsed_cs < cap {
        (as_seconds(cap) - as_seconds(timer.elapsed_cs)) * TIME_BONUS_RATE
    } else {
        0.0
    }
}

pub fn phase1_penalty_points(p: &Phase1Penalties) -> u32 {
    p.barrier_contacts
        .saturating_mul(BARRIER_CONTACT_POINTS)
        .saturating_add(p.stop_signal_violations.saturating_mul(STOP_SIGNAL_POINTS))
        .saturating_add(p.human_interventions.saturating_mul(HUMAN_INTERVENTION_POINTS))
}

pub fn phase2_challenge_points(c: &Phase2Challenges) -> u32 {
    [c.plan_incline, c.distance_measure, c.stairs]
        .iter()
        .filter(|done| **done)
        .count() as u32
        * CHALLENGE_POINTS
}

/// Total penalty points carried by a timer, whatever its phase.
pub fn penalty_points(timer: &TeamTimer) -> u32 {
    match &timer.record {
        TimerRecord::Phase1(p) => phase1_penalty_points(p),
        TimerRecord::Phase2(c) => c.interventions.saturating_mul(PHASE2_INTERVENTION_POINTS),
    }
}

/// Full breakdown of a timer's score under its phase's rules.
pub fn breakdown(timer: &TeamTimer) -> ScoreBreakdown {
    let phase = timer.phase();
    let bonus = time_bonus(timer, phase);
    let penalties = penalty_points(timer);

    match &timer.record {
        TimerRecord::Phase1(_) => {
            let distance = timer.distance_cm.unwrap_or(0.0);
            ScoreBreakdown {
                distance_points: distance,
                challenge_points: 0,
                time_bonus: bonus,
                penalty_points: penalties,
                total: distance + bonus - f64::from(penalties),
            }
        }
        TimerRecord::Phase2(c) => {
            let challenges = phase2_challenge_points(c);
            let raw = f64::from(challenges) - f64::from(penalties) + bonus;
            ScoreBreakdown {
                distance_points: 0.0,
                challenge_points: challenges,
                time_bonus: bonus,
                penalty_points: penalties,
                total: raw.max(0.0),
            }
        }
    }
}

/// Score of a timer under its phase's rules.
pub fn score(timer: &TeamTimer) -> f64 {
    breakdown(timer).total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::{DnfReason, TimerStatus};

    fn phase1_timer(
        distance: f64,
        elapsed_cs: u32,
        status: TimerStatus,
        barrier: u32,
        stop: u32,
        human: u32,
    ) -> TeamTimer {
        TeamTimer {
            team: "Alpha".into(),
            elapsed_cs,
            status,
            distance_cm: Some(distance),
            record: TimerRecord::Phase1(Phase1Penalties {
                barrier_contacts: barrier,
                stop_signal_violations: stop,
                human_interventions: human,
            }),
        }
    }

    fn phase2_timer(
        incline: bool,
        measure: bool,
        stairs: bool,
        interventions: u32,
        elapsed_cs: u32,
        status: TimerStatus,
    ) -> TeamTimer {
        TeamTimer {
            team: "Beta".into(),
            elapsed_cs,
            status,
            distance_cm: Some(40.0),
            record: TimerRecord::Phase2(Phase2Challenges {
                plan_incline: incline,
                distance_measure: measure,
                stairs,
                interventions,
            }),
        }
    }

    const DNF: TimerStatus = TimerStatus::Dnf {
        reason: DnfReason::Abandoned,
    };
    const EXPIRED: TimerStatus = TimerStatus::Dnf {
        reason: DnfReason::TimeExpired,
    };

    #[test]
    fn phase1_worked_example() {
        let t = phase1_timer(150.0, 30_000, TimerStatus::Finished, 1, 0, 0);
        assert!((score(&t) - 160.0).abs() < 1e-9);
    }

    #[test]
    fn phase2_worked_example() {
        let t = phase2_timer(true, false, true, 2, 50_000, TimerStatus::Finished);
        assert!((score(&t) - 310.0).abs() < 1e-9);
    }

    #[test]
    fn phase1_bonus_just_below_cap() {
        let t = phase1_timer(0.0, 35_999, TimerStatus::Finished, 0, 0, 0);
        assert!((time_bonus(&t, Phase::One) - 0.005).abs() < 1e-9);
    }

    #[test]
    fn no_bonus_at_cap_even_if_finished() {
        let t = phase1_timer(0.0, 36_000, TimerStatus::Finished, 0, 0, 0);
        assert_eq!(time_bonus(&t, Phase::One), 0.0);

        let t = phase2_timer(false, false, false, 0, 60_000, TimerStatus::Finished);
        assert_eq!(time_bonus(&t, Phase::Two), 0.0);
    }

    #[test]
    fn no_bonus_for_dnf() {
        let t = phase1_timer(100.0, 1_000, DNF, 0, 0, 0);
        assert_eq!(time_bonus(&t, Phase::One), 0.0);
        assert!((score(&t) - 100.0).abs() < 1e-9);

        let t = phase2_timer(true, true, true, 0, 60_000, EXPIRED);
        assert!((score(&t) - 450.0).abs() < 1e-9);
    }

    #[test]
    fn phase1_can_go_negative() {
        let t = phase1_timer(10.0, 36_000, EXPIRED, 1, 1, 1);
        assert!((score(&t) - (10.0 - 100.0)).abs() < 1e-9);
        assert!(score(&t) < 0.0);
    }

    #[test]
    fn phase2_is_floored_at_zero() {
        let t = phase2_timer(false, false, false, 7, 10_000, DNF);
        assert_eq!(score(&t), 0.0);
    }

    #[test]
    fn phase2_ignores_distance() {
        let mut t = phase2_timer(true, false, false, 0, 0, DNF);
        t.distance_cm = Some(999.0);
        assert!((score(&t) - 150.0).abs() < 1e-9);
    }

    #[test]
    fn missing_distance_counts_as_zero() {
        let mut t = phase1_timer(0.0, 0, DNF, 0, 0, 0);
        t.distance_cm = None;
        assert_eq!(score(&t), 0.0);
    }

    #[test]
    fn penalty_points_by_phase() {
        let t = phase1_timer(0.0, 0, DNF, 2, 1, 1);
        assert_eq!(penalty_points(&t), 40 + 30 + 50);

        let t = phase2_timer(false, false, false, 3, 0, DNF);
        assert_eq!(penalty_points(&t), 60);
    }

    #[test]
    fn phase2_floor_holds_over_a_grid() {
        for interventions in (0..30).chain([214_748_364, 300_000_000, u32::MAX]) {
            for elapsed in [0, 12_345, 59_999, 60_000] {
                for status in [TimerStatus::Finished, DNF, EXPIRED] {
                    let t = phase2_timer(interventions % 2 == 0, false, interventions % 3 == 0, interventions, elapsed, status);
                    assert!(score(&t) >= 0.0);
                }
            }
        }
    }

    #[test]
    fn huge_penalty_counts_saturate() {
        let t = phase2_timer(true, true, true, 300_000_000, 0, DNF);
        assert_eq!(penalty_points(&t), u32::MAX);
        assert_eq!(score(&t), 0.0);

        let t = phase1_timer(50.0, 0, DNF, u32::MAX, u32::MAX, u32::MAX);
        assert_eq!(penalty_points(&t), u32::MAX);
        assert!((score(&t) - (50.0 - f64::from(u32::MAX))).abs() < 1e-6);
    }

    #[test]
    fn breakdown_itemizes_phase1() {
        let t = phase1_timer(150.0, 30_000, TimerStatus::Finished, 1, 0, 0);
        let b = breakdown(&t);
        assert_eq!(b.distance_points, 150.0);
        assert!((b.time_bonus - 30.0).abs() < 1e-9);
        assert_eq!(b.penalty_points, 20);
        assert_eq!(b.challenge_points, 0);
    }
}
