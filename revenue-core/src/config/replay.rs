use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// What a batch run does after a storage failure on one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageFailurePolicy {
    /// Log, count, and move on to the next record.
    #[default]
    Continue,
    /// Stop the run and report the failure with the partial summary.
    Abort,
}

impl FromStr for StorageFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "continue" => Ok(Self::Continue),
            "abort" => Ok(Self::Abort),
            other => Err(format!(
                "unknown storage failure policy {other:?}, expected \"continue\" or \"abort\""
            )),
        }
    }
}

impl std::fmt::Display for StorageFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageFailurePolicy::Continue => write!(f, "continue"),
            StorageFailurePolicy::Abort => write!(f, "abort"),
        }
    }
}

/// Batch replay configuration.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub log_path: PathBuf,
    pub on_storage_error: StorageFailurePolicy,
}
