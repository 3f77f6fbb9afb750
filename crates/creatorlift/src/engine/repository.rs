use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Campaign, CampaignId, InfluencerId,
    InfluencerProfile,
};
use super::reputation::LedgerEntry;

/// Error enumeration for storage failures. `StatusConflict` and `Timeout`
/// are retryable: the caller re-fetches current state and decides whether to
/// try again. The others are fatal to the operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("status changed since read")]
    StatusConflict,
    #[error("storage operation timed out")]
    Timeout,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::StatusConflict | StoreError::Timeout)
    }
}

/// Campaign storage. `try_reserve_slot` and `release_slot` are the atomic
/// primitives behind the capacity gate: implementations perform a single
/// compare-and-increment (or decrement) together with the Active/Full status
/// recompute, never a read-then-write at the application layer.
pub trait CampaignStore: Send + Sync {
    fn insert(&self, campaign: Campaign) -> Result<Campaign, StoreError>;
    fn fetch(&self, id: &CampaignId) -> Result<Option<Campaign>, StoreError>;

    /// Atomically claim one slot if `approved_count < inventory`, flipping
    /// status to `Full` when the last slot is taken. Returns `Ok(None)` when
    /// the campaign has no remaining inventory.
    fn try_reserve_slot(&self, id: &CampaignId) -> Result<Option<Campaign>, StoreError>;

    /// Atomically release one slot, never decrementing below zero. A `Full`
    /// campaign reverts to `Active` when its application deadline has not
    /// passed; manually closed or archived campaigns keep their status.
    fn release_slot(&self, id: &CampaignId, now: DateTime<Utc>) -> Result<Campaign, StoreError>;
}

/// Application storage with the conditional-update primitive every status
/// transition rides on.
pub trait ApplicationStore: Send + Sync {
    /// Insert a new application. Fails with `Conflict` when a non-terminal
    /// application already exists for the same (influencer, campaign) pair.
    fn insert(&self, application: Application) -> Result<Application, StoreError>;

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError>;

    /// Compare-and-swap on the current status: apply `mutate` and commit only
    /// if the stored status still equals `expected`, otherwise fail with
    /// `StatusConflict` without touching the record. This is the single
    /// guard that serializes racing transitions. `mutate` observes the
    /// current record under the store's update guard, so callers may fold
    /// further checks into it (the late-penalty marker rides on this).
    fn update_if_status(
        &self,
        id: &ApplicationId,
        expected: ApplicationStatus,
        mutate: &dyn Fn(&mut Application),
    ) -> Result<Application, StoreError>;

    /// Count of non-terminal applications held by the influencer across all
    /// campaigns.
    fn active_count(&self, influencer_id: &InfluencerId) -> Result<u32, StoreError>;

    /// Count of applications the influencer has created since `since`,
    /// regardless of current status.
    fn applied_since(
        &self,
        influencer_id: &InfluencerId,
        since: DateTime<Utc>,
    ) -> Result<u32, StoreError>;

    /// All applications currently in the given status. The sweeper scans
    /// `Delivered` through this.
    fn in_status(&self, status: ApplicationStatus) -> Result<Vec<Application>, StoreError>;
}

/// Running totals maintained transactionally with each ledger insert. The
/// score must always equal the sum of all entries for the influencer;
/// `penalty` accumulates only the negative deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub score: i32,
    pub penalty: i32,
}

/// Append-only ledger storage. Entries are never edited or deleted.
pub trait LedgerStore: Send + Sync {
    /// Insert the entry and update the influencer's running totals in the
    /// same atomic step, returning the new totals.
    fn append(&self, entry: LedgerEntry) -> Result<LedgerTotals, StoreError>;

    fn totals(&self, influencer_id: &InfluencerId) -> Result<LedgerTotals, StoreError>;

    fn entries(&self, influencer_id: &InfluencerId) -> Result<Vec<LedgerEntry>, StoreError>;
}

/// Influencer account collaborator. The engine reads profile completeness
/// and flags; its only writes are the suspension hook (downward score
/// crossing) and the completed-campaign counter (finalize of an uploaded
/// application).
pub trait InfluencerDirectory: Send + Sync {
    fn register(&self, profile: InfluencerProfile) -> Result<(), StoreError>;
    fn profile(&self, id: &InfluencerId) -> Result<Option<InfluencerProfile>, StoreError>;
    fn completed_campaigns(&self, id: &InfluencerId) -> Result<u32, StoreError>;
    fn increment_completed(&self, id: &InfluencerId) -> Result<u32, StoreError>;
    fn set_suspended(&self, id: &InfluencerId) -> Result<(), StoreError>;
}
