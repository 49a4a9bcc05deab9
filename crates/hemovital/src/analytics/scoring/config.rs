use serde::{Deserialize, Serialize};

/// How the two additive parts of the location sub-score are bounded.
///
/// City/state proximity (max 15) plus radius credit (max 10) cannot exceed
/// 25 with the current weights, but the cap is applied to the total so any
/// reweighting keeps the sub-score inside its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationCapPolicy {
    #[default]
    ClampTotal,
    Uncapped,
}

/// Ordering applied between donors with equal composite scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep the order the data-access layer returned donors in.
    #[default]
    InputOrder,
    DonorId,
}

/// Weights and thresholds for donor scoring and match ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub minimum_match_score: u8,
    pub default_top_n: usize,
    pub response_window_days: i64,
    pub location_cap: LocationCapPolicy,
    pub tie_break: TieBreak,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            minimum_match_score: 40,
            default_top_n: 15,
            response_window_days: 180,
            location_cap: LocationCapPolicy::default(),
            tie_break: TieBreak::default(),
        }
    }
}
