use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Asset categories handled by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Markup,
    Styles,
    Scripts,
    Images,
    Fonts,
    Favicon,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 6] = [
        AssetCategory::Markup,
        AssetCategory::Styles,
        AssetCategory::Scripts,
        AssetCategory::Images,
        AssetCategory::Fonts,
        AssetCategory::Favicon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCategory::Markup => "markup",
            AssetCategory::Styles => "styles",
            AssetCategory::Scripts => "scripts",
            AssetCategory::Images => "images",
            AssetCategory::Fonts => "fonts",
            AssetCategory::Favicon => "favicon",
        }
    }

    /// Name of the CLI task that builds this category.
    pub fn task_name(&self) -> &'static str {
        match self {
            AssetCategory::Markup => "html",
            AssetCategory::Styles => "css",
            AssetCategory::Scripts => "js",
            AssetCategory::Images => "images",
            AssetCategory::Fonts => "fonts",
            AssetCategory::Favicon => "favicon",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behaviour when a watch binding is triggered while its previous run is
/// still in flight.
///
/// - `Queue`: remember the trigger and run once more when the current run
///   finishes. Any number of triggers coalesce into one follow-up run.
/// - `Drop`: ignore triggers that arrive while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Drop,
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "drop" => Ok(TriggerWhileRunningBehaviour::Drop),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"drop\")"
            )),
        }
    }
}

/// Where optimised image bytes are memoised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheStorageMode {
    /// Entries live under `cache_dir` and survive restarts.
    #[default]
    Disk,
    /// Entries are lost when the process exits.
    Memory,
}
