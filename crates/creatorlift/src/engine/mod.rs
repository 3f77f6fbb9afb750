//! Application lifecycle and reputation engine.
//!
//! Owns campaign capacity admission, the per-application state machine, the
//! influencer scoring/tier system, and the deadline sweeper. Presentation
//! layers consume it through the service facade and the HTTP router; storage
//! and notification transports plug in through the traits in `repository`
//! and `notify`.

pub mod admission;
pub mod capacity;
pub mod domain;
pub mod lifecycle;
pub mod notify;
pub mod repository;
pub mod reputation;
pub mod router;
pub mod sweeper;

#[cfg(test)]
mod tests;

pub use admission::{AdmissionError, AdmissionRule};
pub use capacity::{CapacityError, CapacityGate};
pub use domain::{
    AccountFlags, AccountStanding, Application, ApplicationId, ApplicationStatus, BioLink,
    Campaign, CampaignId, CampaignStatus, InfluencerId, InfluencerProfile, LatePenaltyTier,
    ReputationState, RewardType, ShippingAddress, ShippingSnapshot,
};
pub use lifecycle::{
    BulkFailure, BulkOutcome, LifecycleEngine, LifecycleError, ShipmentDetails, UPLOAD_GRACE_HOURS,
};
pub use notify::{EventSink, Notification, NotificationKind, NotifyError};
pub use repository::{
    ApplicationStore, CampaignStore, InfluencerDirectory, LedgerStore, LedgerTotals, StoreError,
};
pub use reputation::{
    tier_for, AppendOutcome, LedgerEntry, LedgerEntryId, ReputationLedger, ScoreReason, ScoreTable,
    Tier,
};
pub use router::{engine_router, ApplicationView};
pub use sweeper::{SweepAction, SweepActionKind};
