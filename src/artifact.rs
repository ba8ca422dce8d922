use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SlotError, SlotResult};
use crate::metrics::Metrics;
use crate::reel::ReelSet;
use crate::search::{SearchOutcome, Targets};

pub const DEFAULT_ARTIFACT_PATH: &str = "reels_config.json";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    pub rtp: f64,
    pub min_win_rate: f64,
}

impl Default for Requirements {
    fn default() -> Self {
        let targets = Targets::default();
        Requirements {
            rtp: targets.rtp,
            min_win_rate: targets.min_win_rate,
        }
    }
}

/// Chosen reels plus the exact metrics they were validated with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReelArtifact {
    pub reels: ReelSet,
    pub validation: Metrics,
    #[serde(default)]
    pub requirements: Requirements,
}

impl ReelArtifact {
    pub fn from_outcome(outcome: &SearchOutcome, targets: &Targets) -> ReelArtifact {
        ReelArtifact {
            reels: outcome.reels.clone(),
            validation: outcome.metrics,
            requirements: Requirements {
                rtp: targets.rtp,
                min_win_rate: targets.min_win_rate,
            },
        }
    }

    pub fn save(&self, path: &Path) -> SlotResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// A file that exists but does not parse is the caller's mistake.
    pub fn load(path: &Path) -> SlotResult<ReelArtifact> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| SlotError::InvalidRequest(format!("{}: {}", path.display(), e)))
    }
}
