use serde::{Deserialize, Serialize};

/// Relative weights of the three daily-rate estimators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatorWeights {
    pub trend: f64,
    pub moving_average: f64,
    pub seasonal: f64,
}

impl Default for EstimatorWeights {
    fn default() -> Self {
        Self {
            trend: 0.4,
            moving_average: 0.3,
            seasonal: 0.3,
        }
    }
}

/// Windows and thresholds for demand forecasting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Trailing days of request history bucketed into the daily series.
    pub history_days: u32,
    pub default_horizon_days: u32,
    /// Largest horizon a caller may request.
    pub max_horizon_days: u32,
    /// Window used by the fallback estimator.
    pub fallback_lookback_days: u32,
    /// Series shorter than this use the fallback estimator.
    pub minimum_points: usize,
    pub moving_average_window: usize,
    pub seasonal_min_points: usize,
    pub weights: EstimatorWeights,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            history_days: 90,
            default_horizon_days: 7,
            max_horizon_days: 90,
            fallback_lookback_days: 30,
            minimum_points: 7,
            moving_average_window: 7,
            seasonal_min_points: 14,
            weights: EstimatorWeights::default(),
        }
    }
}
