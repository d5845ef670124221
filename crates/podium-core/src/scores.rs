// Manually entered team scores, kept apart from race timers.

use serde::{Deserialize, Serialize};
use tracing::info;

use anyhow::Result;

use crate::store::{load_namespace, save_namespace, SharedStore, TEAM_SCORES_KEY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamScore {
    pub name: String,
    pub score: i64,
    /// Accumulated penalty points, stored as a positive magnitude.
    #[serde(default, rename = "totalPenalties")]
    pub total_penalties: u32,
    #[serde(default)]
    pub races: u32,
}

impl TeamScore {
    fn new(name: &str) -> Self {
        TeamScore {
            name: name.to_string(),
            score: 0,
            total_penalties: 0,
            races: 0,
        }
    }
}

/// A ledger entry with its 1-based rank.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedScore {
    pub position: usize,
    pub entry: TeamScore,
}

pub struct ScoreBoard {
    store: SharedStore,
    entries: Vec<TeamScore>,
}

impl ScoreBoard {
    pub fn load(store: SharedStore) -> Self {
        let entries: Vec<TeamScore> = load_namespace(store.as_ref(), TEAM_SCORES_KEY);
        ScoreBoard { store, entries }
    }

    pub fn entries(&self) -> &[TeamScore] {
        &self.entries
    }

    fn get(&self, team: &str) -> Option<&TeamScore> {
        self.entries.iter().find(|e| e.name == team)
    }

    /// Apply `f` to the entry for `team` (creating it if needed) and persist.
    /// The in-memory ledger is left untouched if the write fails.
    fn update(&mut self, team: &str, f: impl FnOnce(&mut TeamScore)) -> Result<()> {
        let mut next = self.entries.clone();
        match next.iter_mut().find(|e| e.name == team) {
            Some(entry) => f(entry),
            None => {
                let mut entry = TeamScore::new(team);
                f(&mut entry);
                next.push(entry);
            }
        }
        save_namespace(self.store.as_ref(), TEAM_SCORES_KEY, &next)?;
        self.entries = next;
        Ok(())
    }

    /// Insert or overwrite the score for `team`.
    pub fn set_score(&mut self, team: &str, score: i64) -> Result<()> {
        self.update(team, |e| e.score = score)?;
        info!("Score for {} set to {}", team, score);
        Ok(())
    }

    /// Zero when the team has no entry.
    pub fn score_of(&self, team: &str) -> i64 {
        self.get(team).map_or(0, |e| e.score)
    }

    pub fn add_penalties(&mut self, team: &str, points: u32, race_count: u32) -> Result<()> {
        self.update(team, |e| {
            e.total_penalties = e.total_penalties.saturating_add(points);
            e.races = e.races.saturating_add(race_count);
        })?;
        info!("Added {} penalty points for {}", points, team);
        Ok(())
    }

    pub fn penalties_of(&self, team: &str) -> u32 {
        self.get(team).map_or(0, |e| e.total_penalties)
    }

    /// Entries by descending score; ties keep entry order.
    pub fn ranked(&self) -> Vec<RankedScore> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| b.score.cmp(&a.score));
        sorted
            .into_iter()
            .enumerate()
            .map(|(i, entry)| RankedScore {
                position: i + 1,
                entry,
            })
            .collect()
    }

    pub fn reset(&mut self) -> Result<()> {
        save_namespace(self.store.as_ref(), TEAM_SCORES_KEY, &Vec::<TeamScore>::new())?;
        self.entries.clear();
        info!("Team scores reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyValueStore, MemoryStore};

    #[test]
    fn set_score_inserts_then_updates() {
        let mut board = ScoreBoard::load(MemoryStore::shared());
        board.set_score("Alpha", 40).unwrap();
        board.set_score("Alpha", 55).unwrap();
        assert_eq!(board.entries().len(), 1);
        assert_eq!(board.score_of("Alpha"), 55);
        assert_eq!(board.score_of("Nobody"), 0);
    }

    #[test]
    fn penalties_accumulate_with_race_count() {
        let mut board = ScoreBoard::load(MemoryStore::shared());
        board.add_penalties("Beta", 20, 1).unwrap();
        board.add_penalties("Beta", 50, 1).unwrap();
        let entry = &board.entries()[0];
        assert_eq!(entry.total_penalties, 70);
        assert_eq!(entry.races, 2);
        assert_eq!(entry.score, 0);
        assert_eq!(board.penalties_of("Beta"), 70);
    }

    #[test]
    fn ranked_is_descending_and_stable() {
        let mut board = ScoreBoard::load(MemoryStore::shared());
        board.set_score("A", 10).unwrap();
        board.set_score("B", 30).unwrap();
        board.set_score("C", 10).unwrap();

        let ranked = board.ranked();
        let names: Vec<&str> = ranked.iter().map(|r| r.entry.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
        let positions: Vec<usize> = ranked.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[test]
    fn persists_and_resets() {
        let store = MemoryStore::shared();
        let mut board = ScoreBoard::load(store.clone());
        board.set_score("A", 5).unwrap();
        assert_eq!(ScoreBoard::load(store.clone()).score_of("A"), 5);

        board.reset().unwrap();
        assert!(board.entries().is_empty());
        assert!(ScoreBoard::load(store.clone()).entries().is_empty());
        assert_eq!(store.get(TEAM_SCORES_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn stored_entries_use_camel_case_penalty_field() {
        let store = MemoryStore::shared();
        let mut board = ScoreBoard::load(store.clone());
        board.add_penalties("A", 30, 1).unwrap();

        let json = store.get(TEAM_SCORES_KEY).unwrap().unwrap();
        assert_eq!(
            json,
            r#"[{"name":"A","score":0,"totalPenalties":30,"races":1}]"#
        );

        store
            .set(
                TEAM_SCORES_KEY,
                r#"[{"name":"B","score":7,"totalPenalties":50,"races":2}]"#,
            )
            .unwrap();
        assert_eq!(ScoreBoard::load(store).penalties_of("B"), 50);
    }

    #[test]
    fn older_entries_without_penalty_fields_load() {
        let store = MemoryStore::shared();
        store
            .set(TEAM_SCORES_KEY, r#"[{"name":"A","score":12}]"#)
            .unwrap();
        let board = ScoreBoard::load(store);
        assert_eq!(board.score_of("A"), 12);
        assert_eq!(board.penalties_of("A"), 0);
    }
}
