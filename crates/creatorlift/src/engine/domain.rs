use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for campaigns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CampaignId(pub String);

/// Identifier wrapper for applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for influencer accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InfluencerId(pub String);

/// Campaign lifecycle status. `Full` is entered exactly when the approved
/// count reaches inventory and reverts to `Active` when a slot frees, unless
/// the campaign was manually closed or archived in the meantime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignStatus {
    Draft,
    Active,
    Full,
    Closed,
    Archived,
}

impl CampaignStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Active => "active",
            CampaignStatus::Full => "full",
            CampaignStatus::Closed => "closed",
            CampaignStatus::Archived => "archived",
        }
    }
}

/// What an approved influencer receives for the campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardType {
    Gift,
    FixedCash { amount_cents: u32 },
}

/// A campaign with fixed inventory. `approved_count` is a cached counter
/// maintained only by the storage layer's atomic reserve/release primitives;
/// the invariant `approved_count <= inventory` must hold at all times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub title: String,
    pub inventory: u32,
    pub approved_count: u32,
    pub application_deadline: DateTime<Utc>,
    pub upload_deadline: DateTime<Utc>,
    pub status: CampaignStatus,
    pub reward: RewardType,
}

impl Campaign {
    pub fn has_open_slot(&self) -> bool {
        self.approved_count < self.inventory
    }

    pub fn accepts_applications(&self, now: DateTime<Utc>) -> bool {
        self.status == CampaignStatus::Active && now <= self.application_deadline
    }
}

/// Per-application state machine status. Terminal statuses never re-enter
/// the machine; the record is retained for history only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Shipped,
    Delivered,
    Uploaded,
    DeadlineMissed,
    Rejected,
    Completed,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Shipped => "shipped",
            ApplicationStatus::Delivered => "delivered",
            ApplicationStatus::Uploaded => "uploaded",
            ApplicationStatus::DeadlineMissed => "deadline_missed",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Completed => "completed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Rejected
                | ApplicationStatus::Completed
                | ApplicationStatus::DeadlineMissed
        )
    }
}

/// Which late penalty has already been charged for a delivered application,
/// so the 24h and 48h tiers are never both applied in full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LatePenaltyTier {
    TwentyFourHour,
    FortyEightHour,
}

/// Shipping address captured at ship time. An owned copy, never a live
/// reference to the influencer profile, so later profile edits cannot
/// retroactively alter a shipment already sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// Snapshot of courier details and destination recorded when a shipment
/// leaves the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingSnapshot {
    pub courier: String,
    pub tracking_number: String,
    pub tracking_url: Option<String>,
    pub address: ShippingAddress,
}

/// Bio link details for the link-in-bio campaign variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BioLink {
    pub url: String,
    pub verified_at: Option<DateTime<Utc>>,
}

/// One influencer's application to one campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub campaign_id: CampaignId,
    pub influencer_id: InfluencerId,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub points_awarded: Option<i32>,
    pub bio_link: Option<BioLink>,
    pub shipping: Option<ShippingSnapshot>,
    pub late_penalty: Option<LatePenaltyTier>,
}

impl Application {
    pub fn new(
        id: ApplicationId,
        campaign_id: CampaignId,
        influencer_id: InfluencerId,
        applied_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            campaign_id,
            influencer_id,
            status: ApplicationStatus::Pending,
            applied_at,
            approved_at: None,
            shipped_at: None,
            delivered_at: None,
            points_awarded: None,
            bio_link: None,
            shipping: None,
            late_penalty: None,
        }
    }
}

/// Independent account flags. They can coexist; consumers evaluate them in
/// priority order blocked > suspended > restricted. Flags never mutate each
/// other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFlags {
    pub blocked: bool,
    pub suspended: bool,
    pub restricted: bool,
}

/// Collapsed view of the flags under the documented priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStanding {
    Blocked,
    Suspended,
    Restricted,
    Clear,
}

impl AccountStanding {
    pub const fn label(self) -> &'static str {
        match self {
            AccountStanding::Blocked => "blocked",
            AccountStanding::Suspended => "suspended",
            AccountStanding::Restricted => "restricted",
            AccountStanding::Clear => "clear",
        }
    }
}

impl AccountFlags {
    pub fn standing(self) -> AccountStanding {
        if self.blocked {
            AccountStanding::Blocked
        } else if self.suspended {
            AccountStanding::Suspended
        } else if self.restricted {
            AccountStanding::Restricted
        } else {
            AccountStanding::Clear
        }
    }

    /// Any raised flag bars new applications.
    pub fn bars_application(self) -> bool {
        self.blocked || self.suspended || self.restricted
    }
}

/// Read model of an influencer account as the engine sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluencerProfile {
    pub id: InfluencerId,
    pub profile_completed: bool,
    pub flags: AccountFlags,
}

/// Aggregated reputation figures for one influencer. `score` and `penalty`
/// come from the ledger's running totals; `completed_campaigns` is mutated
/// only when an uploaded application is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationState {
    pub score: i32,
    pub penalty: i32,
    pub completed_campaigns: u32,
}
