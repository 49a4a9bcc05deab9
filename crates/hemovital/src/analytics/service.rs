use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::activity::{DonorHistory, RequestLedger};
use super::audit::AuditTrail;
use super::domain::{
    BloodRequest, BloodType, DonationId, DonationRecord, DonationStatus, DonorId, DonorProfile,
    HospitalId, HospitalProfile, RequestId,
};
use super::eligibility::{EligibilityConfig, EligibilityReport, EligibilityRules};
use super::forecast::{DemandOutlook, ForecastConfig, ForecastEngine, ForecastInput};
use super::insights::{dashboard_insights, Insight};
use super::lifecycle::{self, LifecycleError};
use super::matching::{rank_donors, MatchContext, MatchResult};
use super::repository::{
    AuditSink, DonationFilter, DonationRepository, RepositoryError, RequestFilter,
};
use super::retention::{
    PopulationRetention, RetentionAssessment, RetentionConfig, RetentionEngine, RetentionInput,
};
use super::scoring::{ScoringConfig, ScoringEngine};

/// Tunables for every engine behind the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub forecast: ForecastConfig,
    pub retention: RetentionConfig,
    pub eligibility: EligibilityConfig,
}

/// Eligibility verdict together with the projected next donation date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityView {
    pub donor_id: DonorId,
    pub report: EligibilityReport,
    pub next_eligible_date: NaiveDate,
}

/// Facade composing the data-access seam, the audit sink and the engines.
pub struct DonorAnalyticsService<R, A> {
    repository: Arc<R>,
    audit: AuditTrail<A>,
    scoring: Arc<ScoringEngine>,
    forecasting: Arc<ForecastEngine>,
    retention: Arc<RetentionEngine>,
    eligibility: Arc<EligibilityRules>,
}

static DONATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_donation_id() -> DonationId {
    let id = DONATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DonationId(format!("don-{id:06}"))
}

impl<R, A> DonorAnalyticsService<R, A>
where
    R: DonationRepository + 'static,
    A: AuditSink + 'static,
{
    pub fn new(repository: Arc<R>, audit: Arc<A>, config: EngineConfig) -> Self {
        Self {
            repository,
            audit: AuditTrail::new(audit),
            scoring: Arc::new(ScoringEngine::new(config.scoring)),
            forecasting: Arc::new(ForecastEngine::new(config.forecast)),
            retention: Arc::new(RetentionEngine::new(config.retention)),
            eligibility: Arc::new(EligibilityRules::new(config.eligibility)),
        }
    }

    /// Rank available donors for a request; `top_n` defaults to the configured size.
    pub fn match_donors(
        &self,
        request_id: &RequestId,
        top_n: Option<usize>,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<MatchResult>, EngineError> {
        let request = self.require_request(request_id)?;
        let hospital = self.require_hospital(&request.hospital_id)?;
        let donors = self.repository.available_donors(None)?;
        let histories = self.histories()?;
        let requests = self.repository.requests(&RequestFilter::default())?;

        let top_n = top_n.unwrap_or(self.scoring.config().default_top_n);
        let context = MatchContext {
            request: &request,
            hospital: &hospital,
            donors: &donors,
            histories: &histories,
            ledger: RequestLedger::new(&requests),
            as_of,
        };
        let run = rank_donors(&self.scoring, &context, top_n);

        info!(
            request_id = %request.id,
            blood_type = %request.blood_type,
            population = run.population,
            qualified = run.qualified,
            returned = run.results.len(),
            "donor matching completed"
        );
        self.audit.record(run.audit);
        Ok(run.results)
    }

    pub fn forecast_demand(
        &self,
        hospital_id: &HospitalId,
        horizon_days: Option<u32>,
        as_of: DateTime<Utc>,
    ) -> Result<DemandOutlook, EngineError> {
        self.require_hospital(hospital_id)?;
        let requests = self.repository.requests(&RequestFilter {
            hospital: Some(hospital_id.clone()),
            ..RequestFilter::default()
        })?;

        let mut stock = BTreeMap::new();
        for blood_type in BloodType::ALL {
            if let Some(level) = self.repository.stock(hospital_id, blood_type)? {
                stock.insert(blood_type, level.units_available);
            }
        }

        let horizon_days =
            horizon_days.unwrap_or(self.forecasting.config().default_horizon_days);
        let run = self.forecasting.forecast(&ForecastInput {
            hospital_id,
            requests: &requests,
            stock: &stock,
            as_of,
            horizon_days,
        });

        info!(
            hospital_id = %hospital_id,
            horizon_days = run.outlook.horizon_days,
            requests = requests.len(),
            average_confidence = run.outlook.average_confidence(),
            "demand forecast completed"
        );
        self.audit.record(run.audit);
        Ok(run.outlook)
    }

    pub fn assess_retention_risk(
        &self,
        donor_id: &DonorId,
        as_of: DateTime<Utc>,
    ) -> Result<RetentionAssessment, EngineError> {
        let donor = self.require_donor(donor_id)?;
        let history = DonorHistory::new(
            self.repository
                .donations(&DonationFilter::for_donor(donor_id.clone()))?,
        );
        let requests = self.repository.requests(&RequestFilter::default())?;

        let assessment = self.retention.assess(&RetentionInput {
            donor: &donor,
            history: &history,
            ledger: RequestLedger::new(&requests),
            as_of,
        });

        info!(
            donor_id = %donor_id,
            risk_score = assessment.risk_score,
            tier = assessment.tier.label(),
            "retention risk assessed"
        );
        self.audit.record(assessment.audit_record(as_of));
        Ok(assessment)
    }

    /// Assess every registered donor. The hospital, when given, must exist and
    /// becomes the audit subject; it does not narrow the donor population.
    pub fn assess_population_retention(
        &self,
        hospital_id: Option<&HospitalId>,
        as_of: DateTime<Utc>,
    ) -> Result<PopulationRetention, EngineError> {
        if let Some(id) = hospital_id {
            self.require_hospital(id)?;
        }
        let donors = self.repository.all_donors()?;
        let histories = self.histories()?;
        let requests = self.repository.requests(&RequestFilter::default())?;

        let population = self.retention.assess_population(
            &donors,
            &histories,
            RequestLedger::new(&requests),
            as_of,
        );

        info!(
            total_donors = population.summary.total_donors,
            high_risk = population.summary.high_risk_count,
            retention_rate = population.summary.retention_rate,
            "population retention assessed"
        );
        self.audit.record(
            population.audit_record(hospital_id.map(ToString::to_string), as_of),
        );
        Ok(population)
    }

    pub fn check_eligibility(
        &self,
        donor_id: &DonorId,
        today: NaiveDate,
    ) -> Result<EligibilityView, EngineError> {
        let donor = self.require_donor(donor_id)?;
        Ok(EligibilityView {
            donor_id: donor.id.clone(),
            report: self.eligibility.check(&donor, today),
            next_eligible_date: self.eligibility.next_eligible_date(&donor, today),
        })
    }

    pub fn hospital_insights(
        &self,
        hospital_id: &HospitalId,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Insight>, EngineError> {
        let outlook = self.forecast_demand(hospital_id, None, as_of)?;
        let population = self.assess_population_retention(Some(hospital_id), as_of)?;
        let requests = self.repository.requests(&RequestFilter {
            hospital: Some(hospital_id.clone()),
            ..RequestFilter::default()
        })?;
        let analytics = lifecycle::hospital_analytics(hospital_id, &requests);

        Ok(dashboard_insights(
            &outlook,
            population.summary.high_risk_count,
            analytics.fulfillment_rate,
        ))
    }

    /// Record a donor's response to an open request as a pending donation.
    pub fn respond_to_request(
        &self,
        donor_id: &DonorId,
        request_id: &RequestId,
        as_of: DateTime<Utc>,
    ) -> Result<DonationRecord, EngineError> {
        let donor = self.require_donor(donor_id)?;
        let request = self.require_request(request_id)?;
        let existing = self.repository.donations(&DonationFilter {
            donor: Some(donor_id.clone()),
            request: Some(request_id.clone()),
            ..DonationFilter::default()
        })?;
        let eligibility = self.eligibility.check(&donor, as_of.date_naive());

        let record = lifecycle::new_response(
            next_donation_id(),
            &donor,
            &request,
            &existing,
            &eligibility,
            as_of,
        )?;
        let stored = self.repository.insert_donation(record)?;
        info!(donation_id = %stored.id, request_id = %request_id, "donor responded to request");
        Ok(stored)
    }

    pub fn confirm_donation(
        &self,
        donation_id: &DonationId,
        as_of: DateTime<Utc>,
    ) -> Result<DonationRecord, EngineError> {
        self.apply_transition(donation_id, DonationStatus::Confirmed, as_of)
    }

    pub fn reject_donation(
        &self,
        donation_id: &DonationId,
        as_of: DateTime<Utc>,
    ) -> Result<DonationRecord, EngineError> {
        self.apply_transition(donation_id, DonationStatus::Rejected, as_of)
    }

    pub fn complete_donation(
        &self,
        donation_id: &DonationId,
        as_of: DateTime<Utc>,
    ) -> Result<DonationRecord, EngineError> {
        self.apply_transition(donation_id, DonationStatus::Completed, as_of)
    }

    fn apply_transition(
        &self,
        donation_id: &DonationId,
        to: DonationStatus,
        as_of: DateTime<Utc>,
    ) -> Result<DonationRecord, EngineError> {
        let mut record = self
            .repository
            .donation(donation_id)?
            .ok_or_else(|| EngineError::DonationNotFound(donation_id.clone()))?;
        let from = record.status;
        lifecycle::transition(&mut record, to)?;
        self.repository.update_donation(record.clone())?;
        info!(donation_id = %donation_id, from = from.label(), to = to.label(), "donation status changed");

        let mut hospital = None;
        if let Some(request_id) = record.request_id.as_ref() {
            if let Some(mut request) = self.repository.request(request_id)? {
                if to == DonationStatus::Confirmed {
                    let linked = self
                        .repository
                        .donations(&DonationFilter::for_request(request_id.clone()))?;
                    lifecycle::recompute_fulfillment(&mut request, &linked);
                    debug!(
                        request_id = %request_id,
                        fulfillment = request.fulfillment_percentage,
                        "request fulfillment recomputed"
                    );
                    hospital = Some(request.hospital_id.clone());
                    self.repository.update_request(request)?;
                } else {
                    hospital = Some(request.hospital_id);
                }
            }
        }

        self.refresh_donor_analytics(&record.donor_id, as_of)?;
        if let Some(hospital_id) = hospital {
            self.refresh_hospital_analytics(&hospital_id)?;
        }

        Ok(record)
    }

    fn refresh_donor_analytics(
        &self,
        donor_id: &DonorId,
        as_of: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let Some(mut donor) = self.repository.donor(donor_id)? else {
            return Ok(());
        };
        let history = DonorHistory::new(
            self.repository
                .donations(&DonationFilter::for_donor(donor_id.clone()))?,
        );

        let completed = history.completed_count();
        donor.total_donations = completed;
        if let Some(last) = history.last_completed() {
            donor.last_donation_date = Some(donor.last_donation_date.map_or(last, |d| d.max(last)));
        }
        donor.engagement.engagement_score =
            lifecycle::engagement_score(completed, donor.completeness());
        donor.engagement.last_activity = Some(as_of);

        self.repository.update_donor(donor)?;
        Ok(())
    }

    fn refresh_hospital_analytics(&self, hospital_id: &HospitalId) -> Result<(), EngineError> {
        let requests = self.repository.requests(&RequestFilter {
            hospital: Some(hospital_id.clone()),
            ..RequestFilter::default()
        })?;
        self.repository
            .save_hospital_analytics(lifecycle::hospital_analytics(hospital_id, &requests))?;
        Ok(())
    }

    fn histories(&self) -> Result<HashMap<DonorId, DonorHistory>, EngineError> {
        let donations = self.repository.donations(&DonationFilter::default())?;
        Ok(DonorHistory::group_by_donor(donations))
    }

    fn require_request(&self, id: &RequestId) -> Result<BloodRequest, EngineError> {
        self.repository
            .request(id)?
            .ok_or_else(|| EngineError::RequestNotFound(id.clone()))
    }

    fn require_hospital(&self, id: &HospitalId) -> Result<HospitalProfile, EngineError> {
        self.repository
            .hospital(id)?
            .ok_or_else(|| EngineError::HospitalNotFound(id.clone()))
    }

    fn require_donor(&self, id: &DonorId) -> Result<DonorProfile, EngineError> {
        self.repository
            .donor(id)?
            .ok_or_else(|| EngineError::DonorNotFound(id.clone()))
    }
}

/// Error raised by the analytics service.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("blood request {0} not found")]
    RequestNotFound(RequestId),
    #[error("hospital {0} not found")]
    HospitalNotFound(HospitalId),
    #[error("donor {0} not found")]
    DonorNotFound(DonorId),
    #[error("donation {0} not found")]
    DonationNotFound(DonationId),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::RequestNotFound(_)
                | EngineError::HospitalNotFound(_)
                | EngineError::DonorNotFound(_)
                | EngineError::DonationNotFound(_)
                | EngineError::Repository(RepositoryError::NotFound)
        )
    }
}
