// Wheel draw: randomized race order, one spin at a time.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::{load_namespace, save_namespace, SharedStore, WHEEL_HISTORY_KEY};

#[derive(Debug, thiserror::Error)]
pub enum DrawError {
    #[error("no teams on the wheel")]
    EmptyPool,

    #[error("draw is incomplete: {drawn} of {total} teams drawn")]
    Incomplete { drawn: usize, total: usize },

    #[error("draw '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Outcome of one spin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spin {
    pub team: String,
    /// The last remaining team, appended without a spin.
    pub auto_drawn: Option<String>,
}

/// An in-progress draw over a snapshot of the roster.
#[derive(Debug, Clone, Default)]
pub struct DrawSession {
    total: usize,
    pool: Vec<String>,
    drawn: Vec<String>,
}

impl DrawSession {
    pub fn new(teams: &[String]) -> Self {
        DrawSession {
            total: teams.len(),
            pool: teams.to_vec(),
            drawn: Vec::new(),
        }
    }

    pub fn remaining(&self) -> &[String] {
        &self.pool
    }

    pub fn drawn(&self) -> &[String] {
        &self.drawn
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.pool.is_empty() && self.drawn.len() == self.total
    }

    /// Pick one team uniformly from the pool and append it to the order.
    /// When a single team is left afterwards it is appended too.
    pub fn spin<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Spin, DrawError> {
        if self.pool.is_empty() {
            return Err(DrawError::EmptyPool);
        }
        let idx = rng.random_range(0..self.pool.len());
        let team = self.pool.remove(idx);
        self.drawn.push(team.clone());

        let auto_drawn = if self.pool.len() == 1 {
            let last = self.pool.remove(0);
            self.drawn.push(last.clone());
            Some(last)
        } else {
            None
        };

        info!(
            "Drew {} ({} of {})",
            team,
            self.drawn.len(),
            self.total
        );
        Ok(Spin { team, auto_drawn })
    }

    /// Start over with the current roster.
    pub fn reset(&mut self, teams: &[String]) {
        *self = DrawSession::new(teams);
    }
}

/// A saved, complete draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawRecord {
    pub id: String,
    pub date: DateTime<Utc>,
    pub order: Vec<String>,
}

/// Saved draws, oldest first.
pub struct WheelHistory {
    store: SharedStore,
    records: Vec<DrawRecord>,
}

impl WheelHistory {
    pub fn load(store: SharedStore) -> Self {
        let records: Vec<DrawRecord> = load_namespace(store.as_ref(), WHEEL_HISTORY_KEY);
        WheelHistory { store, records }
    }

    pub fn records(&self) -> &[DrawRecord] {
        &self.records
    }

    pub fn latest(&self) -> Option<&DrawRecord> {
        self.records.last()
    }

    fn persist(&self) -> anyhow::Result<()> {
        save_namespace(self.store.as_ref(), WHEEL_HISTORY_KEY, &self.records)
    }

    /// Append a completed draw. Incomplete draws are refused.
    pub fn save_draw(&mut self, draw: &DrawSession, now: DateTime<Utc>) -> Result<DrawRecord, DrawError> {
        if !draw.is_complete() {
            return Err(DrawError::Incomplete {
                drawn: draw.drawn.len(),
                total: draw.total,
            });
        }
        let record = DrawRecord {
            id: now.timestamp_millis().to_string(),
            date: now,
            order: draw.drawn.clone(),
        };
        self.records.push(record.clone());
        if let Err(e) = self.persist() {
            self.records.pop();
            return Err(e.into());
        }
        info!("Saved draw {} ({} teams)", record.id, record.order.len());
        Ok(record)
    }

    pub fn remove_draw(&mut self, id: &str) -> Result<DrawRecord, DrawError> {
        let pos = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| DrawError::NotFound(id.to_string()))?;
        let removed = self.records.remove(pos);
        if let Err(e) = self.persist() {
            self.records.insert(pos, removed);
            return Err(e.into());
        }
        info!("Removed draw {}", id);
        Ok(removed)
    }
}
