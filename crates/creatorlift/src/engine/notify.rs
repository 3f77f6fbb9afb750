use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ApplicationId, CampaignId, InfluencerId};

/// Influencer-facing notification type tags, one per transition outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Approved,
    Rejected,
    ShippingShipped,
    ShippingDelivered,
    UploadVerified,
    DeadlineMissed,
    ScoreUpdated,
    TierUpgraded,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationKind::Approved => "approved",
            NotificationKind::Rejected => "rejected",
            NotificationKind::ShippingShipped => "shipping_shipped",
            NotificationKind::ShippingDelivered => "shipping_delivered",
            NotificationKind::UploadVerified => "upload_verified",
            NotificationKind::DeadlineMissed => "deadline_missed",
            NotificationKind::ScoreUpdated => "score_updated",
            NotificationKind::TierUpgraded => "tier_upgraded",
        }
    }
}

/// Persisted notification record plus outward event signal. The emitter is a
/// side-effect sink: it never decides business rules and is invoked exactly
/// once per transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub influencer_id: InfluencerId,
    pub application_id: Option<ApplicationId>,
    pub campaign_id: Option<CampaignId>,
    pub details: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, influencer_id: InfluencerId, created_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            influencer_id,
            application_id: None,
            campaign_id: None,
            details: BTreeMap::new(),
            created_at,
        }
    }

    pub fn for_application(mut self, application_id: ApplicationId, campaign_id: CampaignId) -> Self {
        self.application_id = Some(application_id);
        self.campaign_id = Some(campaign_id);
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Outbound transport hook (dashboard badges, socket pushes, e-mail relays).
/// Delivery guarantees belong to the transport, not the engine.
pub trait EventSink: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
