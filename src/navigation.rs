// Client-side navigation
// Route constants and the history used by auth flows to redirect

use std::sync::{Mutex, PoisonError};

pub mod routes {
    pub const HOME: &str = "/";
    pub const SIGN_IN: &str = "/signin";
    pub const SIGN_UP: &str = "/signup";
    pub const CREATE_POST: &str = "/posts/create";
    pub const FEED: &str = "/feed";
    pub const LIKED: &str = "/liked";

    pub fn profile(profile_id: u64) -> String {
        format!("/profiles/{}", profile_id)
    }
}

/// Something that can move the user between routes
pub trait Navigator: Send + Sync {
    /// Navigate to a new route
    fn push(&self, path: &str);

    /// Return to the previous route, no-op at the first entry
    fn go_back(&self);

    /// Route currently shown
    fn current(&self) -> String;
}

/// In-memory history stack
#[derive(Debug)]
pub struct History {
    entries: Mutex<Vec<String>>,
}

impl History {
    /// Start at the given route
    pub fn starting_at(path: &str) -> Self {
        Self {
            entries: Mutex::new(vec![path.to_string()]),
        }
    }

    /// Snapshot of every entry, oldest first
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::starting_at(routes::HOME)
    }
}

impl Navigator for History {
    fn push(&self, path: &str) {
        tracing::debug!(path, "Navigating");
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }

    fn go_back(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() > 1 {
            entries.pop();
        }
        tracing::debug!(path = entries.last().map(String::as_str), "Navigated back");
    }

    fn current(&self) -> String {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
            .unwrap_or_else(|| routes::HOME.to_string())
    }
}
