// Saved race repository. Append and delete only; a saved race is never
// edited in place.

use std::collections::BTreeSet;

use anyhow::Result;
use tracing::info;

use super::{Phase, Race};
use crate::store::{load_namespace, save_namespace, SharedStore, RACES_KEY};

pub struct RaceLog {
    store: SharedStore,
    races: Vec<Race>,
}

impl RaceLog {
    /// Load saved races from `store`. Corrupt data yields an empty log.
    pub fn load(store: SharedStore) -> Self {
        let races: Vec<Race> = load_namespace(store.as_ref(), RACES_KEY);
        info!("Loaded {} saved races", races.len());
        RaceLog { store, races }
    }

    fn persist(&self) -> Result<()> {
        save_namespace(self.store.as_ref(), RACES_KEY, &self.races)
    }

    pub fn all(&self) -> &[Race] {
        &self.races
    }

    pub fn add(&mut self, race: Race) -> Result<()> {
        self.races.push(race);
        if let Err(e) = self.persist() {
            self.races.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Remove the race with `id`. Returns false if no such race exists.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let Some(pos) = self.races.iter().position(|r| r.id == id) else {
            return Ok(false);
        };
        let removed = self.races.remove(pos);
        if let Err(e) = self.persist() {
            self.races.insert(pos, removed);
            return Err(e);
        }
        info!("Deleted race {}", id);
        Ok(true)
    }

    pub fn by_phase(&self, phase: Phase) -> Vec<&Race> {
        self.races.iter().filter(|r| r.phase == phase).collect()
    }

    /// Drop every saved race of `phase`. Returns how many were removed.
    pub fn clear_phase(&mut self, phase: Phase) -> Result<usize> {
        let before = self.races.clone();
        self.races.retain(|r| r.phase != phase);
        let removed = before.len() - self.races.len();
        if let Err(e) = self.persist() {
            self.races = before;
            return Err(e);
        }
        info!("Cleared {} {} races", removed, phase);
        Ok(removed)
    }

    /// Teams that appear in any saved race of `phase`.
    pub fn raced_teams(&self, phase: Phase) -> BTreeSet<String> {
        self.races
            .iter()
            .filter(|r| r.phase == phase)
            .flat_map(|r| {
                r.participants
                    .iter()
                    .cloned()
                    .chain(r.timers.iter().map(|t| t.team.clone()))
            })
            .collect()
    }

    pub fn has_raced(&self, team: &str, phase: Phase) -> bool {
        self.races
            .iter()
            .any(|r| r.phase == phase && r.includes(team))
    }
}
