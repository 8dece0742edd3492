//! Per-login session payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the server remembers about a logged-in user between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    /// Authenticated username.
    pub username: String,
    /// Workouts completed during this session.
    pub workouts_completed: u32,
    /// When the most recent workout was completed.
    pub last_workout_at: Option<DateTime<Utc>>,
}

impl UserSession {
    /// Fresh session for a user who just logged in.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            workouts_completed: 0,
            last_workout_at: None,
        }
    }

    /// Record a completed workout.
    pub fn complete_workout(&mut self, at: DateTime<Utc>) {
        self.workouts_completed = self.workouts_completed.saturating_add(1);
        self.last_workout_at = Some(at);
    }
}
