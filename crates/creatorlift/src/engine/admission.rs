use chrono::{DateTime, Duration, Utc};

use super::domain::InfluencerId;
use super::repository::{ApplicationStore, StoreError};
use super::reputation::Tier;

/// Expected, user-facing admission failures. None of these are retryable
/// without a state change on the influencer or campaign side.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("influencer profile is incomplete")]
    ProfileIncomplete,
    #[error("influencer account is restricted")]
    Restricted,
    #[error("campaign has no remaining inventory")]
    CapacityExceeded,
    #[error("starting tier allows a single active campaign")]
    SingleActiveCampaignLimit,
    #[error("daily application limit of {max} reached")]
    DailyApplicationLimitExceeded { max: u32 },
    #[error("campaign is not accepting applications")]
    CampaignClosed,
}

const STANDARD_DAILY_CAP: u32 = 3;

/// Tier-gated admission rule, selected from the computed tier at apply
/// time. One capability, three strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionRule {
    /// Starting: at most one non-terminal application campaign-wide.
    SingleActive,
    /// Standard: a rolling 24-hour cap on new applications.
    RollingDailyCap { max: u32 },
    /// Vip: no limit; applications are auto-approved when capacity allows.
    Unlimited,
}

impl AdmissionRule {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Starting => AdmissionRule::SingleActive,
            Tier::Standard => AdmissionRule::RollingDailyCap {
                max: STANDARD_DAILY_CAP,
            },
            Tier::Vip => AdmissionRule::Unlimited,
        }
    }

    /// Whether the rule's tier bypasses admin review at apply time.
    pub fn auto_approves(self) -> bool {
        matches!(self, AdmissionRule::Unlimited)
    }

    /// Check the rule against current storage state. Admission is re-checked
    /// at commit time by the store's uniqueness guard; this check exists to
    /// fail fast with the precise user-facing error.
    pub fn admit<S>(
        &self,
        applications: &S,
        influencer_id: &InfluencerId,
        now: DateTime<Utc>,
    ) -> Result<(), AdmissionCheckError>
    where
        S: ApplicationStore + ?Sized,
    {
        match self {
            AdmissionRule::SingleActive => {
                if applications.active_count(influencer_id)? > 0 {
                    return Err(AdmissionError::SingleActiveCampaignLimit.into());
                }
            }
            AdmissionRule::RollingDailyCap { max } => {
                let since = now - Duration::hours(24);
                if applications.applied_since(influencer_id, since)? >= *max {
                    return Err(AdmissionError::DailyApplicationLimitExceeded { max: *max }.into());
                }
            }
            AdmissionRule::Unlimited => {}
        }
        Ok(())
    }
}

/// An admission check can fail on the rule itself or on the storage lookup
/// backing it.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionCheckError {
    #[error(transparent)]
    Admission(#[from] AdmissionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
