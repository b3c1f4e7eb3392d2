// Observable fetch state of one widget instance
use serde::{Deserialize, Serialize};

/// What a widget exposes to its render callback.
///
/// `data` keeps the last successful payload across failures; it is only
/// `None` before the first success (or forever for a widget without a source).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchState<T> {
    pub data: Option<Vec<T>>,
    pub loading: bool,
    pub error: Option<String>,
    pub retry_countdown_seconds: Option<u64>,
}

impl<T> FetchState<T> {
    /// State right after mount, before the first response
    pub fn initial() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
            retry_countdown_seconds: None,
        }
    }

    /// Settled state of a widget that never fetches
    pub fn idle() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            retry_countdown_seconds: None,
        }
    }

    pub fn is_retrying(&self) -> bool {
        self.retry_countdown_seconds.is_some()
    }

    /// True when there is nothing to show and nothing is pending
    pub fn is_empty(&self) -> bool {
        !self.loading && self.data.as_ref().map_or(true, |rows| rows.is_empty())
    }
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self::initial()
    }
}
