// Team roster repository and race-order helpers.

pub mod draw;

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::race::session::SessionError;
use crate::race::Phase;
use crate::store::{load_namespace, save_namespace, SharedStore, TEAMS_KEY, TEAMS_ORDER_KEY};

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("team name cannot be empty")]
    EmptyName,

    #[error("team '{0}' already exists")]
    Duplicate(String),

    #[error("team '{0}' not found")]
    NotFound(String),

    #[error("failed to read team list {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Deserialize)]
struct RawTeamRow {
    #[serde(alias = "Name", alias = "team", alias = "Team")]
    name: String,
}

/// Ordered list of unique team names plus the order from the last draw.
pub struct Roster {
    store: SharedStore,
    teams: Vec<String>,
    order: Vec<String>,
}

impl Roster {
    pub fn load(store: SharedStore) -> Self {
        let teams: Vec<String> = load_namespace(store.as_ref(), TEAMS_KEY);
        let order: Vec<String> = load_namespace(store.as_ref(), TEAMS_ORDER_KEY);
        info!("Loaded roster with {} teams", teams.len());
        Roster {
            store,
            teams,
            order,
        }
    }

    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    /// Order produced by the most recent wheel draw; empty without a draw.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn contains(&self, team: &str) -> bool {
        self.teams.iter().any(|t| t == team)
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    fn persist_teams(&self) -> anyhow::Result<()> {
        save_namespace(self.store.as_ref(), TEAMS_KEY, &self.teams)
    }

    /// Append a team. The name is trimmed; blank and duplicate names are
    /// rejected.
    pub fn add_team(&mut self, name: &str) -> Result<String, RosterError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RosterError::EmptyName);
        }
        if self.contains(name) {
            return Err(RosterError::Duplicate(name.to_string()));
        }
        self.teams.push(name.to_string());
        if let Err(e) = self.persist_teams() {
            self.teams.pop();
            return Err(e.into());
        }
        info!("Added team {}", name);
        Ok(name.to_string())
    }

    pub fn remove_team(&mut self, name: &str) -> Result<(), RosterError> {
        let pos = self
            .teams
            .iter()
            .position(|t| t == name)
            .ok_or_else(|| RosterError::NotFound(name.to_string()))?;
        let removed = self.teams.remove(pos);
        if let Err(e) = self.persist_teams() {
            self.teams.insert(pos, removed);
            return Err(e.into());
        }
        info!("Removed team {}", name);
        Ok(())
    }

    /// Replace the whole roster. Names are trimmed; blanks and repeats are
    /// dropped, keeping first occurrence.
    pub fn set_teams<I, S>(&mut self, names: I) -> Result<(), RosterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = BTreeSet::new();
        let teams: Vec<String> = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty() && seen.insert(n.clone()))
            .collect();
        save_namespace(self.store.as_ref(), TEAMS_KEY, &teams)?;
        self.teams = teams;
        Ok(())
    }

    pub fn set_teams_order(&mut self, order: Vec<String>) -> Result<(), RosterError> {
        save_namespace(self.store.as_ref(), TEAMS_ORDER_KEY, &order)?;
        self.order = order;
        Ok(())
    }

    /// Append teams from a CSV with a `name` column, skipping blanks and
    /// teams already on the roster. Returns how many were added.
    pub fn import_csv(&mut self, path: &Path) -> Result<usize, RosterError> {
        let path_str = path.display().to_string();
        let file = std::fs::File::open(path).map_err(|source| RosterError::Io {
            path: path_str.clone(),
            source,
        })?;
        let names = read_team_names(file).map_err(|source| RosterError::Csv {
            path: path_str.clone(),
            source,
        })?;
        self.import_names(names, &path_str)
    }

    fn import_names(&mut self, names: Vec<String>, origin: &str) -> Result<usize, RosterError> {
        let before = self.teams.len();
        let mut merged = self.teams.clone();
        for name in names {
            if !merged.contains(&name) {
                merged.push(name);
            }
        }
        self.set_teams(merged)?;
        let added = self.teams.len() - before;
        info!("Imported {} teams from {}", added, origin);
        Ok(added)
    }
}

fn read_team_names<R: Read>(rdr: R) -> Result<Vec<String>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut names = Vec::new();
    for result in reader.deserialize::<RawTeamRow>() {
        match result {
            Ok(raw) => {
                let name = raw.name.trim();
                if name.is_empty() {
                    continue;
                }
                names.push(name.to_string());
            }
            Err(e) => {
                warn!("skipping malformed team row: {}", e);
            }
        }
    }
    Ok(names)
}

// ---------------------------------------------------------------------------
// Race selection
// ---------------------------------------------------------------------------

/// Teams still to race in `phase`, in draw order when a draw exists (only
/// draw entries still on the roster, followed by roster teams the draw
/// missed) or roster order otherwise.
pub fn eligible_teams(
    phase: Phase,
    roster: &[String],
    raced: &BTreeSet<String>,
    draw_order: &[String],
) -> Result<Vec<String>, SessionError> {
    let ordered: Vec<&String> = if draw_order.is_empty() {
        roster.iter().collect()
    } else {
        draw_order
            .iter()
            .filter(|t| roster.contains(t))
            .chain(roster.iter().filter(|t| !draw_order.contains(t)))
            .collect()
    };

    let eligible: Vec<String> = ordered
        .into_iter()
        .filter(|t| !raced.contains(t.as_str()))
        .cloned()
        .collect();

    if eligible.is_empty() {
        return Err(SessionError::AllTeamsRaced(phase));
    }
    Ok(eligible)
}
