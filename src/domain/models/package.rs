//! Game package entries.
//!
//! The job-role-to-game-package lookup is an external collaborator; the
//! engine only consumes the ordered entry list when materializing items.

use serde::{Deserialize, Serialize};

/// One entry of a job role's ordered game package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePackageEntry {
    pub game_code: String,
    pub order_index: u32,
    pub timer_seconds: u32,
    /// Per-item configuration snapshot applied when materializing
    #[serde(default)]
    pub config: serde_json::Value,
}
