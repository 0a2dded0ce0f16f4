use folio_shared::num_cpus;
use serde::{Deserialize, Serialize};

use crate::PerformanceTier;

/// What the host knows about the device. Browsers don't always expose memory
/// and core counts, so both are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub memory_gb: Option<f32>,
    pub logical_cores: Option<u32>,
    pub user_agent: String,
    pub prefers_reduced_motion: bool,
}

impl DeviceProfile {
    /// Profile of the machine the process runs on. The memory size is not detected.
    pub fn detect_native() -> Self {
        Self {
            memory_gb: None,
            logical_cores: u32::try_from(num_cpus::get()).ok(),
            user_agent: String::new(),
            prefers_reduced_motion: false,
        }
    }

    /// Mobile devices identify themselves with `Mobi` or `Android` in the user agent.
    pub fn is_mobile(&self) -> bool {
        let user_agent = self.user_agent.to_ascii_lowercase();
        user_agent.contains("mobi") || user_agent.contains("android")
    }
}

/// One step of the device classification.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    pub name: &'static str,
    pub applies: fn(&DeviceProfile) -> bool,
    pub tier: PerformanceTier,
}

/// Rules in order of precedence. The first rule that applies decides the tier.
/// When no rule applies the device is [`PerformanceTier::High`].
pub const CLASSIFICATION_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        name: "prefers reduced motion",
        applies: prefers_reduced_motion,
        tier: PerformanceTier::Low,
    },
    ClassificationRule {
        name: "memory below 2 GB",
        applies: very_low_memory,
        tier: PerformanceTier::Low,
    },
    ClassificationRule {
        name: "fewer than 2 cores",
        applies: very_low_cores,
        tier: PerformanceTier::Low,
    },
    ClassificationRule {
        name: "mobile user agent",
        applies: DeviceProfile::is_mobile,
        tier: PerformanceTier::Medium,
    },
    ClassificationRule {
        name: "memory below 4 GB",
        applies: low_memory,
        tier: PerformanceTier::Medium,
    },
    ClassificationRule {
        name: "fewer than 4 cores",
        applies: low_cores,
        tier: PerformanceTier::Medium,
    },
    ClassificationRule {
        name: "unknown capability",
        applies: unknown_capability,
        tier: PerformanceTier::Medium,
    },
];

/// Result of the one-shot device classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub tier: PerformanceTier,
    /// Name of the rule that decided the tier. `None` for the default.
    pub rule: Option<&'static str>,
}

/// Classifies the device with [`CLASSIFICATION_RULES`].
pub fn classify(profile: &DeviceProfile) -> Classification {
    classify_with(CLASSIFICATION_RULES, profile)
}

/// Evaluates `rules` top to bottom and stops at the first one that applies.
pub fn classify_with(rules: &[ClassificationRule], profile: &DeviceProfile) -> Classification {
    rules
        .iter()
        .find(|rule| (rule.applies)(profile))
        .map(|rule| Classification {
            tier: rule.tier,
            rule: Some(rule.name),
        })
        .unwrap_or(Classification {
            tier: PerformanceTier::High,
            rule: None,
        })
}

fn prefers_reduced_motion(profile: &DeviceProfile) -> bool {
    profile.prefers_reduced_motion
}

fn very_low_memory(profile: &DeviceProfile) -> bool {
    profile.memory_gb.is_some_and(|memory_gb| memory_gb < 2.0)
}

fn very_low_cores(profile: &DeviceProfile) -> bool {
    profile.logical_cores.is_some_and(|cores| cores < 2)
}

fn low_memory(profile: &DeviceProfile) -> bool {
    profile.memory_gb.is_some_and(|memory_gb| memory_gb < 4.0)
}

fn low_cores(profile: &DeviceProfile) -> bool {
    profile.logical_cores.is_some_and(|cores| cores < 4)
}

fn unknown_capability(profile: &DeviceProfile) -> bool {
    profile.memory_gb.is_none() || profile.logical_cores.is_none()
}
