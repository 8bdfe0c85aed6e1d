use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Network state as reported by the host OS. Says nothing about backend reachability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NetworkStatus {
    Online,
    Offline,
}

impl Display for NetworkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            NetworkStatus::Online => "online",
            NetworkStatus::Offline => "offline",
        };
        write!(f, "{}", status)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ConnectivityEvent {
    pub reachable: bool,
    pub previously_reachable: Option<bool>,
    pub observed_at: DateTime<Utc>,
}

impl ConnectivityEvent {
    pub fn is_restored(&self) -> bool {
        self.reachable && self.previously_reachable != Some(true)
    }
}
