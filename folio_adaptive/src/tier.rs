use std::{fmt, str::FromStr};

use folio_shared::thiserror;
use serde::{Deserialize, Serialize};

/// Discrete device-capability classification used to scale rendering cost.
///
/// The ordering is `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown performance tier: '{0}'")]
pub struct UnknownTier(pub String);

impl PerformanceTier {
    pub const ALL: [PerformanceTier; 3] = [PerformanceTier::Low, PerformanceTier::Medium, PerformanceTier::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceTier::Low => "low",
            PerformanceTier::Medium => "medium",
            PerformanceTier::High => "high",
        }
    }

    /// Parses a tier name. Names that are not recognized map to [`PerformanceTier::Medium`].
    pub fn from_name_or_medium(name: &str) -> Self {
        name.parse().unwrap_or(PerformanceTier::Medium)
    }

    /// Returns the lower of the two tiers. A tier can only ever move down.
    pub fn downgraded_to(self, target: PerformanceTier) -> Self {
        self.min(target)
    }
}

impl FromStr for PerformanceTier {
    type Err = UnknownTier;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(PerformanceTier::Low),
            "medium" => Ok(PerformanceTier::Medium),
            "high" => Ok(PerformanceTier::High),
            _ => Err(UnknownTier(name.to_owned())),
        }
    }
}

impl fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
