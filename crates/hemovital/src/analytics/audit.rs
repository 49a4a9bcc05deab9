use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::repository::AuditSink;

/// Confidence recorded for runs that do not compute their own.
pub const DEFAULT_AUDIT_CONFIDENCE: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredictionKind {
    DonorMatch,
    EligibilityPrediction,
    DemandPrediction,
    RetentionRisk,
}

impl PredictionKind {
    pub const fn label(self) -> &'static str {
        match self {
            PredictionKind::DonorMatch => "Donor Matching",
            PredictionKind::EligibilityPrediction => "Eligibility Prediction",
            PredictionKind::DemandPrediction => "Demand Prediction",
            PredictionKind::RetentionRisk => "Retention Risk Analysis",
        }
    }
}

/// Snapshot of one scoring or forecast run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub kind: PredictionKind,
    pub subject: Option<String>,
    pub input: Value,
    pub output: Value,
    pub confidence: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Fire-and-forget writer in front of an [`AuditSink`].
pub struct AuditTrail<A> {
    sink: Arc<A>,
}

impl<A> Clone for AuditTrail<A> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<A> AuditTrail<A>
where
    A: AuditSink,
{
    pub fn new(sink: Arc<A>) -> Self {
        Self { sink }
    }

    /// Append a record. Failures are logged and never reach the caller.
    pub fn record(&self, record: AuditRecord) {
        let kind = record.kind;
        if let Err(err) = self.sink.append(record) {
            warn!(kind = kind.label(), error = %err, "dropping prediction audit record");
        }
    }
}
