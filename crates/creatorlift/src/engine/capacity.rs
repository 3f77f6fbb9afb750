use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::domain::{Campaign, CampaignId};
use super::repository::{CampaignStore, StoreError};

/// Failure modes of a slot reservation.
#[derive(Debug, thiserror::Error)]
pub enum CapacityError {
    #[error("campaign {} has no remaining inventory", (.0).0)]
    Exceeded(CampaignId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Admits or rejects approval attempts against campaign inventory. The gate
/// itself holds no counters; both operations delegate to the store's atomic
/// primitives so concurrent admins can never over-admit.
pub struct CapacityGate<C> {
    campaigns: Arc<C>,
}

impl<C> CapacityGate<C>
where
    C: CampaignStore + 'static,
{
    pub fn new(campaigns: Arc<C>) -> Self {
        Self { campaigns }
    }

    /// Claim one slot, or fail with `Exceeded` when the campaign is full.
    pub fn try_reserve(&self, id: &CampaignId) -> Result<Campaign, CapacityError> {
        match self.campaigns.try_reserve_slot(id)? {
            Some(campaign) => Ok(campaign),
            None => Err(CapacityError::Exceeded(id.clone())),
        }
    }

    /// Return a slot, reverting `Full` to `Active` when the application
    /// deadline is still open.
    pub fn release(&self, id: &CampaignId, now: DateTime<Utc>) -> Result<Campaign, StoreError> {
        self.campaigns.release_slot(id, now)
    }
}
