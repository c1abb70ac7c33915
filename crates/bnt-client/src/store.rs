use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::broadcast;

/// The platform's persistent same-origin storage, as the synchronizer
/// sees it: string keys, string values, and a changed-key notification
/// delivered to every attached view.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    /// Changed-key notifications. Payloads are hints; observers re-read.
    fn changes(&self) -> broadcast::Receiver<String>;
}

/// In-process storage shared by every tab of one simulated profile.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    changes: broadcast::Sender<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            entries: RwLock::new(HashMap::new()),
            changes,
        }
    }
    fn notify(&self, key: &str) {
        // no receivers is fine; tabs may not be listening yet
        let _ = self.changes.send(key.to_string());
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().expect("store lock").get(key).cloned()
    }
    fn set(&self, key: &str, value: &str) {
        self.entries
            .write()
            .expect("store lock")
            .insert(key.to_string(), value.to_string());
        self.notify(key);
    }
    fn remove(&self, key: &str) {
        let evicted = self.entries.write().expect("store lock").remove(key);
        if evicted.is_some() {
            self.notify(key);
        }
    }
    fn changes(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }
}
