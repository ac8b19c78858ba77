use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Username = String;

/// A single chat line. Timestamps are assigned by the server when the message
/// is appended to the log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub username: Username,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// `[HH:MM:SS] username: content`, in local time.
    pub fn console_line(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.timestamp.with_timezone(&chrono::Local).format("%H:%M:%S"),
            self.username,
            self.content
        )
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.username, self.content)
    }
}
