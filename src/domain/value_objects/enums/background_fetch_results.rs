use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Tri-state answer the host platform expects from a periodic background task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundFetchResult {
    NewData,
    NoData,
    Failed,
}

impl Display for BackgroundFetchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = match self {
            BackgroundFetchResult::NewData => "new_data",
            BackgroundFetchResult::NoData => "no_data",
            BackgroundFetchResult::Failed => "failed",
        };
        write!(f, "{}", result)
    }
}
