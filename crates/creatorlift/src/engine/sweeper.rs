use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::warn;

use super::domain::{ApplicationId, ApplicationStatus, InfluencerId};
use super::lifecycle::{LifecycleEngine, LifecycleError};
use super::notify::EventSink;
use super::repository::{
    ApplicationStore, CampaignStore, InfluencerDirectory, LedgerStore, StoreError,
};

/// One transition applied by a sweep pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepAction {
    pub application_id: ApplicationId,
    pub influencer_id: InfluencerId,
    pub kind: SweepActionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepActionKind {
    /// 24h tier charged; the application stays delivered.
    LatePenaltyApplied,
    /// 48h tier reached; the application is now deadline_missed.
    MarkedMissed,
}

impl<C, A, L, D, E> LifecycleEngine<C, A, L, D, E>
where
    C: CampaignStore + 'static,
    A: ApplicationStore + 'static,
    L: LedgerStore + 'static,
    D: InfluencerDirectory + 'static,
    E: EventSink + 'static,
{
    /// Scan delivered applications whose campaign upload deadline has
    /// passed and drive the automatic penalty transitions. Scheduling is the
    /// caller's concern; `now` is explicit so sweeps are deterministic under
    /// test. Idempotent: the per-application penalty marker and the status
    /// compare-and-swap make repeat passes and races with manual admin
    /// actions no-ops.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<Vec<SweepAction>, LifecycleError> {
        let mut actions = Vec::new();

        for application in self.applications.in_status(ApplicationStatus::Delivered)? {
            let campaign = match self.campaigns.fetch(&application.campaign_id)? {
                Some(campaign) => campaign,
                None => {
                    warn!(application = %application.id.0, "delivered application references missing campaign");
                    continue;
                }
            };
            let lateness = now - campaign.upload_deadline;
            if lateness < Duration::hours(24) {
                continue;
            }

            if lateness >= Duration::hours(48) {
                match self.settle_missed(&application, lateness, now) {
                    Ok(missed) => actions.push(SweepAction {
                        application_id: missed.id,
                        influencer_id: missed.influencer_id,
                        kind: SweepActionKind::MarkedMissed,
                    }),
                    // A manual action won the race; nothing to report.
                    Err(LifecycleError::AlreadySettled)
                    | Err(LifecycleError::Store(StoreError::StatusConflict)) => continue,
                    Err(err) => return Err(err),
                }
            } else if let Some(marked) = self.charge_late_penalty(&application, now)? {
                actions.push(SweepAction {
                    application_id: marked.id,
                    influencer_id: marked.influencer_id,
                    kind: SweepActionKind::LatePenaltyApplied,
                });
            }
        }

        Ok(actions)
    }
}
