use chrono::{DateTime, Utc};
use creatorlift::engine::{
    Application, ApplicationId, ApplicationStatus, ApplicationStore, Campaign, CampaignId,
    CampaignStatus, CampaignStore, EventSink, InfluencerDirectory, InfluencerId, InfluencerProfile,
    LedgerEntry, LedgerStore, LedgerTotals, LifecycleEngine, Notification, NotifyError,
    StoreError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type ApiEngine = LifecycleEngine<
    InMemoryCampaignStore,
    InMemoryApplicationStore,
    InMemoryLedgerStore,
    InMemoryInfluencerDirectory,
    LoggingEventSink,
>;

#[derive(Default, Clone)]
pub(crate) struct InMemoryCampaignStore {
    records: Arc<Mutex<HashMap<CampaignId, Campaign>>>,
}

impl CampaignStore for InMemoryCampaignStore {
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
pub(crate) struct InMemoryApplicationStore {
    records: Arc<Mutex<HashMap<ApplicationId, Application>>>,
}

impl ApplicationStore for InMemoryApplicationStore {
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

#[derive(Default, Clone)]
pub(crate) struct InMemoryLedgerStore {
    entries: Arc<Mutex<Vec<LedgerEntry>>>,
    totals: Arc<Mutex<HashMap<InfluencerId, LedgerTotals>>>,
}

impl LedgerStore for InMemoryLedgerStore {
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
pub(crate) struct InMemoryInfluencerDirectory {
    records: Arc<Mutex<HashMap<InfluencerId, (InfluencerProfile, u32)>>>,
}

impl InfluencerDirectory for InMemoryInfluencerDirectory {
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

/// Event sink that surfaces notifications on the service log. A queue or
/// webhook transport slots in here without touching the engine.
#[derive(Default, Clone)]
pub(crate) struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn publish(&self, notification: Notification) -> Result<(), NotifyError> {
        info!(
            kind = notification.kind.label(),
            influencer = %notification.influencer_id.0,
            "notification published"
        );
        Ok(())
    }
}

pub(crate) fn build_engine(
    table: creatorlift::engine::ScoreTable,
) -> (Arc<ApiEngine>, Arc<InMemoryCampaignStore>) {
    let campaigns = Arc::new(InMemoryCampaignStore::default());
    let engine = Arc::new(LifecycleEngine::new(
        campaigns.clone(),
        Arc::new(InMemoryApplicationStore::default()),
        Arc::new(InMemoryLedgerStore::default()),
        Arc::new(InMemoryInfluencerDirectory::default()),
        Arc::new(LoggingEventSink),
        table,
    ));
    (engine, campaigns)
}
