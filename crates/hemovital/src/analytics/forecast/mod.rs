//! Per-blood-type demand forecasting for a hospital.
//!
//! The daily request history is blended from three estimators (linear trend,
//! moving average, weekly seasonality) and scaled by the horizon. Types with
//! too little history fall back to a mean-units estimate with low confidence.

mod config;
pub(crate) mod estimators;
mod history;

pub use config::{EstimatorWeights, ForecastConfig};
pub use history::{daily_demand, DailySeries};

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::audit::{AuditRecord, PredictionKind};
use super::domain::{BloodRequest, BloodType, HospitalId};

const FALLBACK_CONFIDENCE: f64 = 0.3;
const FLAT_SERIES_CONFIDENCE: f64 = 0.9;
const MINIMUM_CONFIDENCE: f64 = 0.1;
const TREND_WINDOW: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            ConfidenceLevel::High
        } else if score >= 0.6 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfidence {
    pub level: ConfidenceLevel,
    pub score: f64,
    pub data_points: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemandTrend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

impl DemandTrend {
    pub const fn label(self) -> &'static str {
        match self {
            DemandTrend::Increasing => "Increasing",
            DemandTrend::Decreasing => "Decreasing",
            DemandTrend::Stable => "Stable",
            DemandTrend::InsufficientData => "Insufficient data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    Blended,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandForecast {
    pub predicted_demand: u32,
    pub confidence: ForecastConfidence,
    pub trend: DemandTrend,
    pub recommendation: String,
    pub current_stock: u32,
    pub method: ForecastMethod,
}

/// Forecasts for every blood type at one hospital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandOutlook {
    pub hospital_id: HospitalId,
    pub horizon_days: u32,
    pub generated_on: NaiveDate,
    pub forecasts: BTreeMap<BloodType, DemandForecast>,
}

impl DemandOutlook {
    pub fn average_confidence(&self) -> f64 {
        if self.forecasts.is_empty() {
            return 0.0;
        }
        self.forecasts
            .values()
            .map(|forecast| forecast.confidence.score)
            .sum::<f64>()
            / self.forecasts.len() as f64
    }

    pub fn forecast(&self, blood_type: BloodType) -> Option<&DemandForecast> {
        self.forecasts.get(&blood_type)
    }
}

#[derive(Debug, Clone)]
pub struct ForecastRun {
    pub outlook: DemandOutlook,
    pub audit: AuditRecord,
}

/// Inputs for one forecasting run. `stock` maps each type to units available;
/// absent types count as zero.
pub struct ForecastInput<'a> {
    pub hospital_id: &'a HospitalId,
    pub requests: &'a [BloodRequest],
    pub stock: &'a BTreeMap<BloodType, u32>,
    pub as_of: DateTime<Utc>,
    pub horizon_days: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ForecastEngine {
    config: ForecastConfig,
}

impl ForecastEngine {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn forecast(&self, input: &ForecastInput<'_>) -> ForecastRun {
        let horizon_days = input.horizon_days.clamp(1, self.config.max_horizon_days.max(1));
        let today = input.as_of.date_naive();
        let series = daily_demand(input.requests, today, self.config.history_days);

        let forecasts: BTreeMap<BloodType, DemandForecast> = series
            .iter()
            .map(|(blood_type, daily)| {
                let current_stock = input.stock.get(blood_type).copied().unwrap_or(0);
                let forecast = if daily.len() >= self.config.minimum_points {
                    self.blended(*blood_type, &daily.values, horizon_days, current_stock)
                } else {
                    self.fallback(*blood_type, input, horizon_days, current_stock)
                };
                (*blood_type, forecast)
            })
            .collect();

        let outlook = DemandOutlook {
            hospital_id: input.hospital_id.clone(),
            horizon_days,
            generated_on: today,
            forecasts,
        };

        let predictions: BTreeMap<String, u32> = outlook
            .forecasts
            .iter()
            .map(|(blood_type, forecast)| (blood_type.to_string(), forecast.predicted_demand))
            .collect();
        let average_confidence = outlook.average_confidence();

        let audit = AuditRecord {
            kind: PredictionKind::DemandPrediction,
            subject: Some(input.hospital_id.to_string()),
            input: json!({
                "hospital_id": input.hospital_id,
                "prediction_days": horizon_days,
                "blood_groups_analyzed": outlook.forecasts.len(),
            }),
            output: json!({
                "predictions": predictions,
                "average_confidence": average_confidence,
            }),
            confidence: average_confidence,
            recorded_at: input.as_of,
        };

        ForecastRun { outlook, audit }
    }

    fn blended(
        &self,
        blood_type: BloodType,
        values: &[f64],
        horizon_days: u32,
        current_stock: u32,
    ) -> DemandForecast {
        let weights = self.config.weights;
        let trend = estimators::linear_trend(values, horizon_days);
        let moving = estimators::moving_average(values, self.config.moving_average_window);
        let seasonal =
            estimators::seasonal(values, horizon_days, self.config.seasonal_min_points);

        let daily_rate =
            weights.trend * trend + weights.moving_average * moving + weights.seasonal * seasonal;
        let predicted = (daily_rate * f64::from(horizon_days)).max(0.0);

        debug!(
            blood_type = %blood_type,
            trend,
            moving_average = moving,
            seasonal,
            predicted,
            "blended demand estimators"
        );

        DemandForecast {
            predicted_demand: predicted.round() as u32,
            confidence: confidence(values),
            trend: demand_trend(values),
            recommendation: stock_recommendation(current_stock, predicted).to_string(),
            current_stock,
            method: ForecastMethod::Blended,
        }
    }

    fn fallback(
        &self,
        blood_type: BloodType,
        input: &ForecastInput<'_>,
        horizon_days: u32,
        current_stock: u32,
    ) -> DemandForecast {
        let cutoff = input.as_of - Duration::days(i64::from(self.config.fallback_lookback_days));
        let (mean_units, data_points) =
            history::mean_units_since(input.requests, blood_type, cutoff).unwrap_or((1.0, 0));
        let predicted = (mean_units * f64::from(horizon_days)).round().max(1.0);

        DemandForecast {
            predicted_demand: predicted as u32,
            confidence: ForecastConfidence {
                level: ConfidenceLevel::Low,
                score: FALLBACK_CONFIDENCE,
                data_points,
                reason: "Limited historical data".to_string(),
            },
            trend: DemandTrend::InsufficientData,
            recommendation: "Monitor closely - limited data available".to_string(),
            current_stock,
            method: ForecastMethod::Fallback,
        }
    }
}

/// Confidence from series dispersion; a perfectly flat series scores 0.9.
pub fn confidence(values: &[f64]) -> ForecastConfidence {
    let variance = estimators::variance(values);
    let score = if variance == 0.0 {
        FLAT_SERIES_CONFIDENCE
    } else {
        (1.0 - variance / (estimators::mean(values) + 1.0)).max(MINIMUM_CONFIDENCE)
    };

    ForecastConfidence {
        level: ConfidenceLevel::from_score(score),
        score,
        data_points: values.len(),
        reason: format!("Based on {} data points", values.len()),
    }
}

/// Compare the last week with the week before it.
pub fn demand_trend(values: &[f64]) -> DemandTrend {
    let n = values.len();
    if n < TREND_WINDOW {
        return DemandTrend::InsufficientData;
    }

    let recent = estimators::mean(&values[n - TREND_WINDOW..]);
    let previous_start = n.saturating_sub(2 * TREND_WINDOW);
    let previous = &values[previous_start..n - TREND_WINDOW];
    if previous.is_empty() {
        return DemandTrend::Stable;
    }
    let previous = estimators::mean(previous);

    if recent > previous * 1.2 {
        DemandTrend::Increasing
    } else if recent < previous * 0.8 {
        DemandTrend::Decreasing
    } else {
        DemandTrend::Stable
    }
}

pub fn stock_recommendation(current_stock: u32, predicted_demand: f64) -> &'static str {
    let ratio = f64::from(current_stock) / (predicted_demand + 1.0);
    if ratio >= 2.0 {
        "Adequate stock - maintain current levels"
    } else if ratio >= 1.0 {
        "Sufficient stock - monitor closely"
    } else if ratio >= 0.5 {
        "Low stock - consider replenishment"
    } else {
        "Critical stock - urgent replenishment needed"
    }
}
