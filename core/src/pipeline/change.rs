//! Change detection across fetches.
//!
//! The tracker owns the "last seen status" map explicitly so a widget
//! instance can seed and inspect it; nothing here is global.

use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Side effect fired once per batch of newly changed rows (e.g. a chime)
#[cfg_attr(test, mockall::automock)]
pub trait ChangeNotifier: Send + Sync {
    fn notify(&self, changed: &[String]);
}

/// Keys that moved into a terminal status in one fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    pub changed: Vec<String>,
}

impl ChangeBatch {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    /// Call the notifier once if anything changed
    pub fn notify(&self, notifier: &dyn ChangeNotifier) -> bool {
        if self.is_empty() {
            return false;
        }
        notifier.notify(&self.changed);
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    previous: HashMap<String, String>,
    terminal: HashSet<String>,
}

impl ChangeTracker {
    pub fn new<I, S>(terminal: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            previous: HashMap::new(),
            terminal: terminal.into_iter().map(Into::into).collect(),
        }
    }

    /// Start from a known map of key -> last status
    pub fn with_previous(mut self, previous: HashMap<String, String>) -> Self {
        self.previous = previous;
        self
    }

    pub fn previous(&self) -> &HashMap<String, String> {
        &self.previous
    }

    pub fn is_terminal(&self, status: &str) -> bool {
        self.terminal.contains(status)
    }

    /// Compare a fetch against the previous one.
    ///
    /// A key is reported when its status is terminal now and it was last seen
    /// with a non-terminal status. Keys seen for the first time never fire.
    /// Afterwards the map holds exactly this fetch's statuses.
    pub fn observe<I>(&mut self, rows: I) -> ChangeBatch
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let mut current = HashMap::new();
        let mut changed = Vec::new();

        for (key, status) in rows {
            let Some(status) = status else {
                continue;
            };
            if self.is_terminal(&status) {
                if let Some(prev) = self.previous.get(&key) {
                    if !self.is_terminal(prev) && !changed.contains(&key) {
                        changed.push(key.clone());
                    }
                }
            }
            current.insert(key, status);
        }

        if !changed.is_empty() {
            debug!(target: "pipeline", count = changed.len(), "Rows reached a terminal status");
        }
        self.previous = current;
        ChangeBatch { changed }
    }
}

/// Transient highlight marks that expire after a fixed hold time
#[derive(Debug, Clone)]
pub struct HighlightSet {
    hold: Duration,
    until: HashMap<String, Instant>,
}

impl HighlightSet {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            until: HashMap::new(),
        }
    }

    pub fn mark(&mut self, keys: &[String], now: Instant) {
        let expires = now + self.hold;
        for key in keys {
            self.until.insert(key.clone(), expires);
        }
    }

    /// Drop expired marks
    pub fn purge(&mut self, now: Instant) {
        self.until.retain(|_, expires| *expires > now);
    }

    pub fn is_active(&self, key: &str, now: Instant) -> bool {
        self.until.get(key).is_some_and(|expires| *expires > now)
    }

    /// Earliest instant at which a mark still active at `now` expires
    pub fn next_expiry(&self, now: Instant) -> Option<Instant> {
        self.until.values().copied().filter(|expires| *expires > now).min()
    }

    /// Active keys, sorted
    pub fn active(&self, now: Instant) -> Vec<String> {
        let mut keys: Vec<String> = self
            .until
            .iter()
            .filter(|(_, expires)| **expires > now)
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}
