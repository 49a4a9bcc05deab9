//! Donor matching, demand forecasting and retention analytics.
//!
//! The engines are deterministic heuristics over a snapshot read through
//! [`DonationRepository`]. Every matching, forecast and retention run appends
//! an [`AuditRecord`] to an [`AuditSink`]; sink failures are logged and never
//! reach the caller.

pub mod activity;
pub mod audit;
pub mod compatibility;
pub mod domain;
pub mod eligibility;
pub mod forecast;
pub mod import;
pub mod insights;
pub mod lifecycle;
pub mod matching;
pub mod repository;
pub mod retention;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use audit::{AuditRecord, AuditTrail, PredictionKind};
pub use compatibility::compatibility;
pub use domain::{
    BloodRequest, BloodType, DonationId, DonationRecord, DonationStatus, DonorEngagement,
    DonorId, DonorProfile, Gender, HospitalId, HospitalProfile, PersonalDetails, RequestId,
    RequestStatus, StockLevel, StockStatus, Urgency,
};
pub use eligibility::{EligibilityConfig, EligibilityReport, EligibilityRules};
pub use forecast::{
    ConfidenceLevel, DemandForecast, DemandOutlook, DemandTrend, ForecastConfig, ForecastEngine,
    ForecastMethod,
};
pub use import::{ImportError, RequestHistoryImporter};
pub use insights::{Insight, InsightKind, InsightPriority};
pub use lifecycle::LifecycleError;
pub use matching::{MatchResult, MatchTier};
pub use repository::{
    AuditError, AuditSink, DateRange, DonationFilter, DonationRepository, HospitalAnalytics,
    RepositoryError, RequestFilter,
};
pub use retention::{
    InactivityPolicy, PopulationRetention, RetentionAssessment, RetentionConfig, RetentionEngine,
    RetentionSummary, RiskTier,
};
pub use router::analytics_router;
pub use scoring::{
    DonorScore, LocationCapPolicy, ScoreComponent, ScoreFactor, ScoringConfig, ScoringEngine,
    TieBreak,
};
pub use service::{DonorAnalyticsService, EligibilityView, EngineConfig, EngineError};
