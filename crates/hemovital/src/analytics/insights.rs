use serde::{Deserialize, Serialize};

use super::forecast::DemandOutlook;

const MAX_INSIGHTS: usize = 5;
const MIN_INSIGHTS: usize = 2;
const HIGH_DEMAND_UNITS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Demand,
    Retention,
    Performance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub title: String,
    pub message: String,
    pub priority: InsightPriority,
}

impl Insight {
    fn new(
        kind: InsightKind,
        priority: InsightPriority,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            priority,
        }
    }
}

/// Dashboard insights for a hospital, most urgent first.
pub fn dashboard_insights(
    outlook: &DemandOutlook,
    high_risk_donors: usize,
    fulfillment_rate: f64,
) -> Vec<Insight> {
    let mut insights = Vec::new();
    let mut empty_types = Vec::new();

    for (blood_type, forecast) in &outlook.forecasts {
        if forecast.current_stock == 0 {
            empty_types.push(blood_type.to_string());
        } else if forecast.current_stock < forecast.predicted_demand {
            insights.push(Insight::new(
                InsightKind::Demand,
                InsightPriority::Medium,
                format!("Low stock alert for {blood_type}"),
                format!(
                    "Current stock ({}) below predicted demand ({})",
                    forecast.current_stock, forecast.predicted_demand
                ),
            ));
        }
    }

    if !empty_types.is_empty() {
        insights.push(Insight::new(
            InsightKind::Demand,
            InsightPriority::High,
            "Critical stock shortage",
            format!(
                "No stock available for {} - urgent action needed",
                empty_types.join(", ")
            ),
        ));
    }

    let high_demand: Vec<String> = outlook
        .forecasts
        .iter()
        .filter(|(_, forecast)| forecast.predicted_demand > HIGH_DEMAND_UNITS)
        .map(|(blood_type, _)| blood_type.to_string())
        .collect();
    if !high_demand.is_empty() {
        insights.push(Insight::new(
            InsightKind::Demand,
            InsightPriority::Medium,
            "High demand predicted",
            format!("Increased demand expected for {}", high_demand.join(", ")),
        ));
    }

    if high_risk_donors > 0 {
        insights.push(Insight::new(
            InsightKind::Retention,
            InsightPriority::Medium,
            "Donor retention risk",
            format!(
                "{high_risk_donors} high-risk donors identified - engagement campaign recommended"
            ),
        ));
    }

    if fulfillment_rate < 60.0 {
        insights.push(Insight::new(
            InsightKind::Performance,
            InsightPriority::Medium,
            "Low fulfillment rate",
            format!("Current fulfillment rate {fulfillment_rate:.1}% needs improvement"),
        ));
    } else if fulfillment_rate > 85.0 {
        insights.push(Insight::new(
            InsightKind::Performance,
            InsightPriority::Low,
            "Excellent fulfillment rate",
            format!("Great job! {fulfillment_rate:.1}% fulfillment rate achieved"),
        ));
    }

    if insights.len() < MIN_INSIGHTS {
        insights.push(Insight::new(
            InsightKind::Performance,
            InsightPriority::Low,
            "Analytics active",
            "System is monitoring blood demand and donor engagement patterns",
        ));
        insights.push(Insight::new(
            InsightKind::Demand,
            InsightPriority::Low,
            "Regular monitoring recommended",
            "Continue monitoring stock levels and donor activity",
        ));
    }

    insights.truncate(MAX_INSIGHTS);
    insights
}
