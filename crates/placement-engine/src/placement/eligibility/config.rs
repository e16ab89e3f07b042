use serde::{Deserialize, Serialize};

/// How far back the "already placed" rule looks for a `selected` application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacedScope {
    /// Any selected application, regardless of cycle.
    #[default]
    AllTime,
    /// Only selections for jobs in the same cycle as the job being evaluated.
    SameCycle,
}

impl PlacedScope {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "all_time" | "all" => Some(Self::AllTime),
            "same_cycle" | "cycle" => Some(Self::SameCycle),
            _ => None,
        }
    }
}

/// Tunables for the eligibility evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EligibilityConfig {
    pub placed_scope: PlacedScope,
}
