use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::engine::domain::{
    AccountFlags, Application, ApplicationId, ApplicationStatus, Campaign, CampaignId,
    CampaignStatus, InfluencerId, InfluencerProfile, RewardType, ShippingAddress,
};
use crate::engine::lifecycle::{LifecycleEngine, ShipmentDetails};
use crate::engine::notify::{EventSink, Notification, NotifyError};
use crate::engine::repository::{
    ApplicationStore, CampaignStore, InfluencerDirectory, LedgerStore, LedgerTotals, StoreError,
};
use crate::engine::reputation::{LedgerEntry, ScoreReason, ScoreTable};

pub(super) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid instant")
}

/// Base time shifted by whole hours, for deadline arithmetic in tests.
pub(super) fn hours_from_base(hours: i64) -> DateTime<Utc> {
    base_time() + Duration::hours(hours)
}

#[derive(Default, Clone)]
pub(super) struct MemoryCampaigns {
    records: Arc<Mutex<HashMap<CampaignId, Campaign>>>,
}

impl CampaignStore for MemoryCampaigns {
    fn insert(&self, campaign: Campaign) -> Result<Campaign, StoreError> {
        let mut guard = self.records.lock().expect("campaign mutex poisoned");
        if guard.contains_key(&campaign.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(campaign.id.clone(), campaign.clone());
        Ok(campaign)
    }

    fn fetch(&self, id: &CampaignId) -> Result<Option<Campaign>, StoreError> {
        let guard = self.records.lock().expect("campaign mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn try_reserve_slot(&self, id: &CampaignId) -> Result<Option<Campaign>, StoreError> {
        let mut guard = self.records.lock().expect("campaign mutex poisoned");
        let campaign = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        if !campaign.has_open_slot() {
            return Ok(None);
        }
        campaign.approved_count += 1;
        if campaign.approved_count == campaign.inventory
            && campaign.status == CampaignStatus::Active
        {
            campaign.status = CampaignStatus::Full;
        }
        Ok(Some(campaign.clone()))
    }

    fn release_slot(&self, id: &CampaignId, now: DateTime<Utc>) -> Result<Campaign, StoreError> {
        let mut guard = self.records.lock().expect("campaign mutex poisoned");
        let campaign = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        campaign.approved_count = campaign.approved_count.saturating_sub(1);
        if campaign.status == CampaignStatus::Full && now <= campaign.application_deadline {
            campaign.status = CampaignStatus::Active;
        }
        Ok(campaign.clone())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryApplications {
    records: Arc<Mutex<HashMap<ApplicationId, Application>>>,
}

impl ApplicationStore for MemoryApplications {
    fn insert(&self, application: Application) -> Result<Application, StoreError> {
        let mut guard = self.records.lock().expect("application mutex poisoned");
        let duplicate = guard.values().any(|existing| {
            existing.influencer_id == application.influencer_id
                && existing.campaign_id == application.campaign_id
                && !existing.status.is_terminal()
        });
        if duplicate {
            return Err(StoreError::Conflict);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        let guard = self.records.lock().expect("application mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_if_status(
        &self,
        id: &ApplicationId,
        expected: ApplicationStatus,
        mutate: &dyn Fn(&mut Application),
    ) -> Result<Application, StoreError> {
        let mut guard = self.records.lock().expect("application mutex poisoned");
        let application = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        if application.status != expected {
            return Err(StoreError::StatusConflict);
        }
        mutate(application);
        Ok(application.clone())
    }

    fn active_count(&self, influencer_id: &InfluencerId) -> Result<u32, StoreError> {
        let guard = self.records.lock().expect("application mutex poisoned");
        Ok(guard
            .values()
            .filter(|app| &app.influencer_id == influencer_id && !app.status.is_terminal())
            .count() as u32)
    }

    fn applied_since(
        &self,
        influencer_id: &InfluencerId,
        since: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let guard = self.records.lock().expect("application mutex poisoned");
        Ok(guard
            .values()
            .filter(|app| &app.influencer_id == influencer_id && app.applied_at >= since)
            .count() as u32)
    }

    fn in_status(&self, status: ApplicationStatus) -> Result<Vec<Application>, StoreError> {
        let guard = self.records.lock().expect("application mutex poisoned");
        Ok(guard
            .values()
            .filter(|app| app.status == status)
            .cloned()
            .collect())
    }
}

/// Application store that fails the next N status swaps with a transient
/// timeout, then behaves normally again.
#[derive(Default)]
pub(super) struct FlakyApplications {
    inner: MemoryApplications,
    swap_failures: AtomicUsize,
}

impl FlakyApplications {
    pub(super) fn fail_next_swaps(&self, count: usize) {
        self.swap_failures.store(count, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.swap_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl ApplicationStore for FlakyApplications {
    fn insert(&self, application: Application) -> Result<Application, StoreError> {
        self.inner.insert(application)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        self.inner.fetch(id)
    }

    fn update_if_status(
        &self,
        id: &ApplicationId,
        expected: ApplicationStatus,
        mutate: &dyn Fn(&mut Application),
    ) -> Result<Application, StoreError> {
        if self.take_failure() {
            return Err(StoreError::Timeout);
        }
        self.inner.update_if_status(id, expected, mutate)
    }

    fn active_count(&self, influencer_id: &InfluencerId) -> Result<u32, StoreError> {
        self.inner.active_count(influencer_id)
    }

    fn applied_since(
        &self,
        influencer_id: &InfluencerId,
        since: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        self.inner.applied_since(influencer_id, since)
    }

    fn in_status(&self, status: ApplicationStatus) -> Result<Vec<Application>, StoreError> {
        self.inner.in_status(status)
    }
}

/// Ledger that fails the next N appends, for exercising recovery paths.
#[derive(Default)]
pub(super) struct FlakyLedger {
    inner: MemoryLedger,
    append_failures: AtomicUsize,
}

impl FlakyLedger {
    pub(super) fn fail_next_appends(&self, count: usize) {
        self.append_failures.store(count, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.append_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl LedgerStore for FlakyLedger {
    fn append(&self, entry: LedgerEntry) -> Result<LedgerTotals, StoreError> {
        if self.take_failure() {
            return Err(StoreError::Timeout);
        }
        self.inner.append(entry)
    }

    fn totals(&self, influencer_id: &InfluencerId) -> Result<LedgerTotals, StoreError> {
        self.inner.totals(influencer_id)
    }

    fn entries(&self, influencer_id: &InfluencerId) -> Result<Vec<LedgerEntry>, StoreError> {
        self.inner.entries(influencer_id)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryLedger {
    entries: Arc<Mutex<Vec<LedgerEntry>>>,
    totals: Arc<Mutex<HashMap<InfluencerId, LedgerTotals>>>,
}

impl LedgerStore for MemoryLedger {
    fn append(&self, entry: LedgerEntry) -> Result<LedgerTotals, StoreError> {
        let mut entries = self.entries.lock().expect("ledger mutex poisoned");
        let mut totals = self.totals.lock().expect("totals mutex poisoned");
        let record = totals.entry(entry.influencer_id.clone()).or_default();
        record.score += entry.delta;
        if entry.delta < 0 {
            record.penalty += -entry.delta;
        }
        let updated = *record;
        entries.push(entry);
        Ok(updated)
    }

    fn totals(&self, influencer_id: &InfluencerId) -> Result<LedgerTotals, StoreError> {
        let totals = self.totals.lock().expect("totals mutex poisoned");
        Ok(totals.get(influencer_id).copied().unwrap_or_default())
    }

    fn entries(&self, influencer_id: &InfluencerId) -> Result<Vec<LedgerEntry>, StoreError> {
        let entries = self.entries.lock().expect("ledger mutex poisoned");
        Ok(entries
            .iter()
            .filter(|entry| &entry.influencer_id == influencer_id)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryDirectory {
    records: Arc<Mutex<HashMap<InfluencerId, (InfluencerProfile, u32)>>>,
}

impl InfluencerDirectory for MemoryDirectory {
    fn register(&self, profile: InfluencerProfile) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("directory mutex poisoned");
        if guard.contains_key(&profile.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(profile.id.clone(), (profile, 0));
        Ok(())
    }

    fn profile(&self, id: &InfluencerId) -> Result<Option<InfluencerProfile>, StoreError> {
        let guard = self.records.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).map(|(profile, _)| profile.clone()))
    }

    fn completed_campaigns(&self, id: &InfluencerId) -> Result<u32, StoreError> {
        let guard = self.records.lock().expect("directory mutex poisoned");
        guard
            .get(id)
            .map(|(_, completed)| *completed)
            .ok_or(StoreError::NotFound)
    }

    fn increment_completed(&self, id: &InfluencerId) -> Result<u32, StoreError> {
        let mut guard = self.records.lock().expect("directory mutex poisoned");
        let (_, completed) = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        *completed += 1;
        Ok(*completed)
    }

    fn set_suspended(&self, id: &InfluencerId) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("directory mutex poisoned");
        let (profile, _) = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        profile.flags.suspended = true;
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryEvents {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryEvents {
    pub(super) fn published(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .expect("event mutex poisoned")
            .clone()
    }
}

impl EventSink for MemoryEvents {
    fn publish(&self, notification: Notification) -> Result<(), NotifyError> {
        self.notifications
            .lock()
            .expect("event mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) type TestEngine =
    LifecycleEngine<MemoryCampaigns, MemoryApplications, MemoryLedger, MemoryDirectory, MemoryEvents>;

pub(super) struct Harness {
    pub(super) engine: Arc<TestEngine>,
    pub(super) campaigns: Arc<MemoryCampaigns>,
    pub(super) applications: Arc<MemoryApplications>,
    pub(super) ledger: Arc<MemoryLedger>,
    pub(super) directory: Arc<MemoryDirectory>,
    pub(super) events: Arc<MemoryEvents>,
}

pub(super) fn harness() -> Harness {
    let campaigns = Arc::new(MemoryCampaigns::default());
    let applications = Arc::new(MemoryApplications::default());
    let ledger = Arc::new(MemoryLedger::default());
    let directory = Arc::new(MemoryDirectory::default());
    let events = Arc::new(MemoryEvents::default());
    let engine = Arc::new(LifecycleEngine::new(
        campaigns.clone(),
        applications.clone(),
        ledger.clone(),
        directory.clone(),
        events.clone(),
        ScoreTable::default(),
    ));
    Harness {
        engine,
        campaigns,
        applications,
        ledger,
        directory,
        events,
    }
}

pub(super) fn campaign(id: &str, inventory: u32) -> Campaign {
    Campaign {
        id: CampaignId(id.to_string()),
        title: format!("Campaign {id}"),
        inventory,
        approved_count: 0,
        application_deadline: hours_from_base(24 * 7),
        upload_deadline: hours_from_base(24 * 21),
        status: CampaignStatus::Active,
        reward: RewardType::Gift,
    }
}

pub(super) fn register_influencer(harness: &Harness, id: &str) -> InfluencerId {
    let influencer_id = InfluencerId(id.to_string());
    harness
        .directory
        .register(InfluencerProfile {
            id: influencer_id.clone(),
            profile_completed: true,
            flags: AccountFlags::default(),
        })
        .expect("register influencer");
    influencer_id
}

/// Registered influencer with the signup bonus: score 50, zero completed
/// campaigns, which is still the Starting tier.
pub(super) fn starting_influencer(harness: &Harness, id: &str) -> InfluencerId {
    let influencer_id = register_influencer(harness, id);
    harness
        .engine
        .grant(&influencer_id, ScoreReason::SignupBonus, base_time())
        .expect("signup bonus");
    influencer_id
}

/// Standard tier: one completed campaign and a score inside [50, 85).
pub(super) fn standard_influencer(harness: &Harness, id: &str) -> InfluencerId {
    let influencer_id = starting_influencer(harness, id);
    harness
        .directory
        .increment_completed(&influencer_id)
        .expect("completed campaign");
    influencer_id
}

/// Vip tier: one completed campaign and a score at or above 85.
pub(super) fn vip_influencer(harness: &Harness, id: &str) -> InfluencerId {
    let influencer_id = standard_influencer(harness, id);
    harness
        .engine
        .adjust_score(&influencer_id, 35, None, base_time())
        .expect("vip boost");
    influencer_id
}

pub(super) fn shipping_address() -> ShippingAddress {
    ShippingAddress {
        recipient: "Jordan Vega".to_string(),
        line1: "88 Harbor Street".to_string(),
        line2: None,
        city: "Rotterdam".to_string(),
        postal_code: "3011 XA".to_string(),
        country: "NL".to_string(),
    }
}

pub(super) fn shipment() -> ShipmentDetails {
    ShipmentDetails {
        courier: "PostNL".to_string(),
        tracking_number: "3SABCD1234567".to_string(),
        tracking_url: Some("https://postnl.nl/track/3SABCD1234567".to_string()),
        address: shipping_address(),
    }
}

/// Drive a fresh application to the delivered status.
pub(super) fn delivered_application(
    harness: &Harness,
    influencer: &InfluencerId,
    campaign_id: &CampaignId,
) -> Application {
    let application = harness
        .engine
        .apply(influencer, campaign_id, base_time())
        .expect("apply");
    harness
        .engine
        .approve(&application.id, base_time())
        .expect("approve");
    harness
        .engine
        .ship(&application.id, shipment(), base_time())
        .expect("ship");
    harness
        .engine
        .mark_delivered(&application.id, base_time())
        .expect("deliver")
}
