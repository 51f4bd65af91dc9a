//! Execution stage signal.

use serde::{Deserialize, Serialize};

/// Stage of the caller's current step.
///
/// A trial actively selects a ruler and piece and records the choice. A
/// replay reproduces the choice recorded by the latest trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Trial,
    Replay,
    /// Neither trial nor replay. Accepted by `create`, rejected by `execute`.
    Neither,
}

impl Stage {
    pub const fn is_trial(self) -> bool {
        matches!(self, Self::Trial)
    }

    pub const fn is_replay(self) -> bool {
        matches!(self, Self::Replay)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Replay => "replay",
            Self::Neither => "neither",
        }
    }
}
