// Key-value persistence contract shared by the repositories.
//
// Each namespace holds one JSON document that is overwritten whole on every
// mutation. Loading never fails: unreadable or corrupt data is logged and
// replaced by the namespace's empty value.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Ordered list of unique team names.
pub const TEAMS_KEY: &str = "teams";
/// Team order produced by the most recent wheel draw.
pub const TEAMS_ORDER_KEY: &str = "teams_order";
/// Saved wheel draws.
pub const WHEEL_HISTORY_KEY: &str = "wheel_history";
/// Saved race records, both phases.
pub const RACES_KEY: &str = "races";
/// Manually entered team scores.
pub const TEAM_SCORES_KEY: &str = "team_scores";

/// String-keyed, string-valued store surviving across sessions.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    /// All keys currently present, sorted.
    fn keys(&self) -> Result<Vec<String>>;
}

/// Shared handle passed to every repository.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Volatile store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries().keys().cloned().collect())
    }
}

/// Load a namespace, falling back to `T::default()` when the key is absent,
/// the store cannot be read, or the stored JSON does not parse.
pub fn load_namespace<T>(store: &dyn KeyValueStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("Namespace '{}' is empty, starting fresh", key);
            return T::default();
        }
        Err(e) => {
            warn!("Failed to read namespace '{}': {:#}", key, e);
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Error parsing namespace '{}', using empty state: {}", key, e);
            T::default()
        }
    }
}

/// Serialize `value` and overwrite the whole namespace.
pub fn save_namespace<T>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string(value)
        .with_context(|| format!("failed to serialize namespace '{key}'"))?;
    store
        .set(key, &json)
        .with_context(|| format!("failed to write namespace '{key}'"))?;
    debug!("Saved namespace '{}' ({} bytes)", key, json.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);

        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.keys().unwrap(), vec!["b"]);
    }

    #[test]
    fn memory_store_survives_poisoned_lock() {
        let store = Arc::new(MemoryStore::new());
        store.set("a", "1").unwrap();

        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.lock().unwrap();
            panic!("writer crashed");
        })
        .join();

        assert!(store.entries.is_poisoned());
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        store.set("b", "2").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn load_namespace_defaults_when_missing() {
        let store = MemoryStore::new();
        let teams: Vec<String> = load_namespace(&store, TEAMS_KEY);
        assert!(teams.is_empty());
    }

    #[test]
    fn load_namespace_recovers_from_corrupt_json() {
        let store = MemoryStore::new();
        store.set(TEAMS_KEY, "[\"Alpha\", oops").unwrap();
        let teams: Vec<String> = load_namespace(&store, TEAMS_KEY);
        assert!(teams.is_empty());
    }

    #[test]
    fn save_then_load_namespace() {
        let store = MemoryStore::new();
        let teams = vec!["Alpha".to_string(), "Beta".to_string()];
        save_namespace(&store, TEAMS_KEY, &teams).unwrap();

        let loaded: Vec<String> = load_namespace(&store, TEAMS_KEY);
        assert_eq!(loaded, teams);
        assert_eq!(
            store.get(TEAMS_KEY).unwrap().as_deref(),
            Some(r#"["Alpha","Beta"]"#)
        );
    }
}
