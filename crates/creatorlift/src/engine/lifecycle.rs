use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::admission::{AdmissionCheckError, AdmissionError, AdmissionRule};
use super::capacity::{CapacityError, CapacityGate};
use super::domain::{
    Application, ApplicationId, ApplicationStatus, BioLink, CampaignId, CampaignStatus,
    InfluencerId, LatePenaltyTier, ShippingAddress, ShippingSnapshot,
};
use super::notify::{EventSink, Notification, NotificationKind, NotifyError};
use super::repository::{
    ApplicationStore, CampaignStore, InfluencerDirectory, LedgerStore, StoreError,
};
use super::reputation::{tier_for, AppendOutcome, ReputationLedger, ScoreReason, ScoreTable};

/// Hours past the upload deadline during which an admin may still verify
/// content as uploaded.
pub const UPLOAD_GRACE_HOURS: i64 = 48;

/// Error raised by the lifecycle engine.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Admission(#[from] AdmissionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error("courier and tracking number are required")]
    MissingFields,
    #[error("transition not permitted from status '{from}'")]
    InvalidTransition { from: &'static str },
    #[error("transition already settled")]
    AlreadySettled,
    #[error("upload verification window has closed")]
    UploadWindowClosed,
    #[error("upload deadline has not lapsed far enough to mark missed")]
    DeadlineNotReached,
    #[error("reason '{0}' is not caller-grantable")]
    UnsupportedGrant(&'static str),
}

impl From<AdmissionCheckError> for LifecycleError {
    fn from(value: AdmissionCheckError) -> Self {
        match value {
            AdmissionCheckError::Admission(err) => LifecycleError::Admission(err),
            AdmissionCheckError::Store(err) => LifecycleError::Store(err),
        }
    }
}

impl From<CapacityError> for LifecycleError {
    fn from(value: CapacityError) -> Self {
        match value {
            CapacityError::Exceeded(_) => LifecycleError::Admission(AdmissionError::CapacityExceeded),
            CapacityError::Store(err) => LifecycleError::Store(err),
        }
    }
}

/// Courier details supplied by the admin at ship time. The address is the
/// resolved destination; the engine stores it as an owned snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentDetails {
    pub courier: String,
    pub tracking_number: String,
    pub tracking_url: Option<String>,
    pub address: ShippingAddress,
}

/// Partial-success summary for bulk operations. A failure on one item never
/// rolls back approvals that already succeeded in the same batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkOutcome {
    pub approved: Vec<ApplicationId>,
    pub failed: Vec<BulkFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkFailure {
    pub application_id: ApplicationId,
    /// True for transient storage failures worth resubmitting as-is.
    pub retryable: bool,
    pub error: String,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

/// Service owning the per-application state machine, composed from the
/// capacity gate, reputation ledger, influencer directory, and event sink.
/// Every status mutation is a compare-and-swap through the application
/// store; ledger and notification effects run only after the swap commits,
/// so a lost race never partially applies side effects.
pub struct LifecycleEngine<C, A, L, D, E> {
    pub(crate) campaigns: Arc<C>,
    pub(crate) applications: Arc<A>,
    pub(crate) gate: CapacityGate<C>,
    pub(crate) reputation: ReputationLedger<L, D>,
    pub(crate) directory: Arc<D>,
    pub(crate) events: Arc<E>,
}

impl<C, A, L, D, E> LifecycleEngine<C, A, L, D, E>
where
    C: CampaignStore + 'static,
    A: ApplicationStore + 'static,
    L: LedgerStore + 'static,
    D: InfluencerDirectory + 'static,
    E: EventSink + 'static,
{
    pub fn new(
        campaigns: Arc<C>,
        applications: Arc<A>,
        ledger: Arc<L>,
        directory: Arc<D>,
        events: Arc<E>,
        table: ScoreTable,
    ) -> Self {
        let gate = CapacityGate::new(campaigns.clone());
        let reputation = ReputationLedger::new(ledger, directory.clone(), table);
        Self {
            campaigns,
            applications,
            gate,
            reputation,
            directory,
            events,
        }
    }

    pub fn reputation(&self) -> &ReputationLedger<L, D> {
        &self.reputation
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// An influencer applies to a campaign. Guards: campaign is active and
    /// inside its application deadline, the profile is complete, no account
    /// flag is raised, and the tier admission rule passes. Vip applications
    /// are auto-approved when a slot reserves, otherwise they stay pending.
    pub fn apply(
        &self,
        influencer_id: &InfluencerId,
        campaign_id: &CampaignId,
        now: DateTime<Utc>,
    ) -> Result<Application, LifecycleError> {
        let profile = self
            .directory
            .profile(influencer_id)?
            .ok_or(StoreError::NotFound)?;
        if !profile.profile_completed {
            return Err(AdmissionError::ProfileIncomplete.into());
        }
        if profile.flags.bars_application() {
            return Err(AdmissionError::Restricted.into());
        }

        let campaign = self
            .campaigns
            .fetch(campaign_id)?
            .ok_or(StoreError::NotFound)?;
        if campaign.status == CampaignStatus::Full {
            return Err(AdmissionError::CapacityExceeded.into());
        }
        if !campaign.accepts_applications(now) {
            return Err(AdmissionError::CampaignClosed.into());
        }

        let tier = self.reputation.tier(influencer_id)?;
        let rule = AdmissionRule::for_tier(tier);
        rule.admit(self.applications.as_ref(), influencer_id, now)?;

        let application = Application::new(
            next_application_id(),
            campaign_id.clone(),
            influencer_id.clone(),
            now,
        );
        let stored = self.applications.insert(application)?;
        info!(application = %stored.id.0, campaign = %campaign_id.0, tier = tier.label(), "application created");

        if rule.auto_approves() {
            return self.auto_approve(stored, now);
        }
        Ok(stored)
    }

    fn auto_approve(
        &self,
        application: Application,
        now: DateTime<Utc>,
    ) -> Result<Application, LifecycleError> {
        match self.gate.try_reserve(&application.campaign_id) {
            Ok(_) => {}
            // No free slot: the application stays pending until one frees.
            Err(CapacityError::Exceeded(_)) => return Ok(application),
            Err(CapacityError::Store(err)) => return Err(err.into()),
        }

        match self.applications.update_if_status(
            &application.id,
            ApplicationStatus::Pending,
            &|app| {
                app.status = ApplicationStatus::Approved;
                app.approved_at = Some(now);
            },
        ) {
            Ok(approved) => {
                self.notify_transition(NotificationKind::Approved, &approved, now)?;
                Ok(approved)
            }
            Err(err) => {
                // Any failed swap hands the slot back; otherwise the campaign
                // would count an approval that never happened.
                self.release_reserved(&application.campaign_id, now);
                match err {
                    StoreError::StatusConflict => Ok(application),
                    other => Err(other.into()),
                }
            }
        }
    }

    /// Admin approval. Capacity reservation and the status swap commit
    /// together: when the swap loses a race the reserved slot is returned,
    /// and an approval that fails capacity leaves the application pending.
    pub fn approve(
        &self,
        application_id: &ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<Application, LifecycleError> {
        let application = self.fetch_application(application_id)?;
        if application.status.is_terminal() {
            return Err(LifecycleError::AlreadySettled);
        }
        if application.status != ApplicationStatus::Pending {
            return Err(LifecycleError::InvalidTransition {
                from: application.status.label(),
            });
        }

        self.gate.try_reserve(&application.campaign_id)?;

        match self.applications.update_if_status(
            application_id,
            ApplicationStatus::Pending,
            &|app| {
                app.status = ApplicationStatus::Approved;
                app.approved_at = Some(now);
            },
        ) {
            Ok(approved) => {
                info!(application = %approved.id.0, "application approved");
                self.notify_transition(NotificationKind::Approved, &approved, now)?;
                Ok(approved)
            }
            Err(err) => {
                // The reservation and the swap commit together: a swap that
                // fails for any reason returns the slot, so a retry is never
                // refused for capacity the campaign does not actually hold.
                self.release_reserved(&application.campaign_id, now);
                match err {
                    StoreError::StatusConflict => Err(self.race_outcome(application_id)),
                    other => Err(other.into()),
                }
            }
        }
    }

    /// Approve a batch independently; capacity exhaustion mid-batch fails
    /// the remaining items without rolling back earlier successes.
    pub fn bulk_approve(
        &self,
        application_ids: &[ApplicationId],
        now: DateTime<Utc>,
    ) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for id in application_ids {
            match self.approve(id, now) {
                Ok(_) => outcome.approved.push(id.clone()),
                Err(err) => outcome.failed.push(BulkFailure {
                    application_id: id.clone(),
                    retryable: matches!(&err, LifecycleError::Store(store) if store.is_retryable()),
                    error: err.to_string(),
                }),
            }
        }
        outcome
    }

    /// Reject a pending or approved application. Rejecting after approval
    /// releases the reserved slot. No ledger effect.
    pub fn reject(
        &self,
        application_id: &ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<Application, LifecycleError> {
        let application = self.fetch_application(application_id)?;
        if application.status.is_terminal() {
            return Err(LifecycleError::AlreadySettled);
        }
        let from = application.status;
        if from != ApplicationStatus::Pending && from != ApplicationStatus::Approved {
            return Err(LifecycleError::InvalidTransition { from: from.label() });
        }

        match self
            .applications
            .update_if_status(application_id, from, &|app| {
                app.status = ApplicationStatus::Rejected;
            }) {
            Ok(rejected) => {
                if from == ApplicationStatus::Approved {
                    self.gate.release(&rejected.campaign_id, now)?;
                }
                self.notify_transition(NotificationKind::Rejected, &rejected, now)?;
                Ok(rejected)
            }
            Err(StoreError::StatusConflict) => Err(self.race_outcome(application_id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Record the shipment. Courier and tracking number are required; the
    /// destination address is snapshotted on the application.
    pub fn ship(
        &self,
        application_id: &ApplicationId,
        details: ShipmentDetails,
        now: DateTime<Utc>,
    ) -> Result<Application, LifecycleError> {
        if details.courier.trim().is_empty() || details.tracking_number.trim().is_empty() {
            return Err(LifecycleError::MissingFields);
        }

        let snapshot = ShippingSnapshot {
            courier: details.courier,
            tracking_number: details.tracking_number,
            tracking_url: details.tracking_url,
            address: details.address,
        };
        let shipped = self.transition(application_id, ApplicationStatus::Approved, &|app| {
            app.status = ApplicationStatus::Shipped;
            app.shipped_at = Some(now);
            app.shipping = Some(snapshot.clone());
        })?;

        let mut notification = self.transition_notification(NotificationKind::ShippingShipped, &shipped, now);
        if let Some(shipping) = &shipped.shipping {
            notification = notification
                .with_detail("courier", shipping.courier.clone())
                .with_detail("tracking_number", shipping.tracking_number.clone());
        }
        self.events.publish(notification)?;
        Ok(shipped)
    }

    /// Confirm delivery of the shipped product.
    pub fn mark_delivered(
        &self,
        application_id: &ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<Application, LifecycleError> {
        let delivered = self.transition(application_id, ApplicationStatus::Shipped, &|app| {
            app.status = ApplicationStatus::Delivered;
            app.delivered_at = Some(now);
        })?;
        self.notify_transition(NotificationKind::ShippingDelivered, &delivered, now)?;
        Ok(delivered)
    }

    /// Verify uploaded content. The admin chooses between the quality bonus
    /// and the on-time bonus; the two are mutually exclusive. A supplied
    /// content link is recorded on the application with its verification
    /// instant. Points are awarded once: a repeat of an already-verified
    /// application settles quietly instead of double-awarding.
    pub fn mark_uploaded(
        &self,
        application_id: &ApplicationId,
        quality: bool,
        link: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<i32, LifecycleError> {
        let application = self.fetch_application(application_id)?;
        if application.status.is_terminal() || application.status == ApplicationStatus::Uploaded {
            return Err(LifecycleError::AlreadySettled);
        }
        if application.status != ApplicationStatus::Delivered {
            return Err(LifecycleError::InvalidTransition {
                from: application.status.label(),
            });
        }

        let campaign = self
            .campaigns
            .fetch(&application.campaign_id)?
            .ok_or(StoreError::NotFound)?;
        if now > campaign.upload_deadline + Duration::hours(UPLOAD_GRACE_HOURS) {
            return Err(LifecycleError::UploadWindowClosed);
        }

        let table = self.reputation.table();
        let (reason, points) = if quality {
            (ScoreReason::QualityBonus, table.quality_bonus)
        } else {
            (ScoreReason::UploadOnTime, table.upload_on_time)
        };

        let uploaded = match self.applications.update_if_status(
            application_id,
            ApplicationStatus::Delivered,
            &|app| {
                app.status = ApplicationStatus::Uploaded;
                app.points_awarded = Some(points);
                app.bio_link = link.as_ref().map(|url| BioLink {
                    url: url.clone(),
                    verified_at: Some(now),
                });
            },
        ) {
            Ok(app) => app,
            Err(StoreError::StatusConflict) => return Err(self.race_outcome(application_id)),
            Err(err) => return Err(err.into()),
        };

        let outcome = match self
            .reputation
            .append(&uploaded.influencer_id, points, reason, None, now)
        {
            Ok(outcome) => outcome,
            Err(err) => {
                // An uploaded status must imply a ledger entry. Put the
                // record back so the verification can be retried once the
                // ledger recovers, instead of settling with the points lost.
                let revert = self.applications.update_if_status(
                    application_id,
                    ApplicationStatus::Uploaded,
                    &|app| {
                        app.status = ApplicationStatus::Delivered;
                        app.points_awarded = None;
                        app.bio_link = None;
                    },
                );
                if let Err(revert_err) = revert {
                    warn!(
                        application = %application_id.0,
                        error = %revert_err,
                        "upload verification could not be reverted after ledger failure"
                    );
                }
                return Err(err.into());
            }
        };
        let notification = self
            .transition_notification(NotificationKind::UploadVerified, &uploaded, now)
            .with_detail("points_awarded", points.to_string());
        self.events.publish(notification)?;
        self.notify_tier_change(&uploaded.influencer_id, &outcome, now)?;
        Ok(points)
    }

    /// Manual twin of the sweeper's missed-deadline transition. Requires the
    /// upload deadline to be at least 24 hours past; the higher-severity
    /// penalty that has become due is charged, never both tiers in full.
    pub fn mark_missed(
        &self,
        application_id: &ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<Application, LifecycleError> {
        let application = self.fetch_application(application_id)?;
        if application.status.is_terminal() {
            return Err(LifecycleError::AlreadySettled);
        }
        if application.status != ApplicationStatus::Delivered {
            return Err(LifecycleError::InvalidTransition {
                from: application.status.label(),
            });
        }

        let campaign = self
            .campaigns
            .fetch(&application.campaign_id)?
            .ok_or(StoreError::NotFound)?;
        let lateness = now - campaign.upload_deadline;
        if lateness < Duration::hours(24) {
            return Err(LifecycleError::DeadlineNotReached);
        }

        self.settle_missed(&application, lateness, now)
    }

    /// Shared missed-deadline settlement for the manual action and the
    /// sweeper. The penalty charged is whatever remains of the due tier
    /// after anything already applied, so the net for a full miss is exactly
    /// the 48h figure. Caller guarantees lateness >= 24h and status
    /// Delivered as observed.
    pub(crate) fn settle_missed(
        &self,
        application: &Application,
        lateness: Duration,
        now: DateTime<Utc>,
    ) -> Result<Application, LifecycleError> {
        let table = self.reputation.table();
        let (due_tier, due_total, reason) = if lateness >= Duration::hours(48) {
            (
                LatePenaltyTier::FortyEightHour,
                table.deadline_48h_late,
                ScoreReason::Deadline48hLate,
            )
        } else {
            (
                LatePenaltyTier::TwentyFourHour,
                table.deadline_24h_late,
                ScoreReason::Deadline24hLate,
            )
        };
        // The already-charged tier is read inside the swap, not from the
        // caller's snapshot, so a penalty applied since the fetch still
        // counts against the total.
        let prior_penalty = Cell::new(application.late_penalty);
        let missed = match self.applications.update_if_status(
            &application.id,
            ApplicationStatus::Delivered,
            &|app| {
                prior_penalty.set(app.late_penalty);
                app.status = ApplicationStatus::DeadlineMissed;
                app.late_penalty = Some(due_tier);
            },
        ) {
            Ok(app) => app,
            Err(StoreError::StatusConflict) => return Err(self.race_outcome(&application.id)),
            Err(err) => return Err(err.into()),
        };

        let already_charged = match prior_penalty.get() {
            Some(LatePenaltyTier::TwentyFourHour) => table.deadline_24h_late,
            Some(LatePenaltyTier::FortyEightHour) => table.deadline_48h_late,
            None => 0,
        };
        let delta = due_total - already_charged;

        if delta != 0 {
            self.reputation
                .append(&missed.influencer_id, delta, reason, None, now)?;
        }
        self.notify_transition(NotificationKind::DeadlineMissed, &missed, now)?;
        Ok(missed)
    }

    /// Charge the 24-hour late penalty without changing status. Used by the
    /// sweeper between 24h and 48h past the deadline; the per-application
    /// marker keeps repeat sweeps from double-charging.
    pub(crate) fn charge_late_penalty(
        &self,
        application: &Application,
        now: DateTime<Utc>,
    ) -> Result<Option<Application>, LifecycleError> {
        if application.late_penalty.is_some() {
            return Ok(None);
        }
        // The marker is re-checked inside the swap: a caller holding a stale
        // snapshot claims nothing when another pass marked first.
        let already_marked = Cell::new(false);
        let marked = match self.applications.update_if_status(
            &application.id,
            ApplicationStatus::Delivered,
            &|app| {
                if app.late_penalty.is_some() {
                    already_marked.set(true);
                } else {
                    app.late_penalty = Some(LatePenaltyTier::TwentyFourHour);
                }
            },
        ) {
            Ok(app) => app,
            // A racing manual action won; skip quietly.
            Err(StoreError::StatusConflict) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if already_marked.get() {
            return Ok(None);
        }

        let outcome = self.reputation.award(
            &marked.influencer_id,
            ScoreReason::Deadline24hLate,
            None,
            now,
        )?;
        let notification = self
            .transition_notification(NotificationKind::ScoreUpdated, &marked, now)
            .with_detail("score", outcome.score_after.to_string())
            .with_detail("reason", ScoreReason::Deadline24hLate.label());
        self.events.publish(notification)?;
        Ok(Some(marked))
    }

    /// Finalize an uploaded or deadline-missed application at campaign
    /// close. Only uploaded applications count toward the influencer's
    /// completed-campaign total, which may in turn unlock a higher tier.
    pub fn finalize(
        &self,
        application_id: &ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<Application, LifecycleError> {
        let application = self.fetch_application(application_id)?;
        if application.status == ApplicationStatus::Completed {
            return Err(LifecycleError::AlreadySettled);
        }
        let from = application.status;
        if from != ApplicationStatus::Uploaded && from != ApplicationStatus::DeadlineMissed {
            return Err(LifecycleError::InvalidTransition { from: from.label() });
        }

        let completed = match self
            .applications
            .update_if_status(application_id, from, &|app| {
                app.status = ApplicationStatus::Completed;
            }) {
            Ok(app) => app,
            Err(StoreError::StatusConflict) => return Err(self.race_outcome(application_id)),
            Err(err) => return Err(err.into()),
        };

        if from == ApplicationStatus::Uploaded {
            let score = self.reputation.current_score(&completed.influencer_id)?;
            let table = self.reputation.table();
            let before = self.directory.completed_campaigns(&completed.influencer_id)?;
            let after = self.directory.increment_completed(&completed.influencer_id)?;
            let tier_before = tier_for(table, score, before);
            let tier_after = tier_for(table, score, after);
            if tier_after != tier_before {
                let notification = Notification::new(
                    NotificationKind::TierUpgraded,
                    completed.influencer_id.clone(),
                    now,
                )
                .with_detail("tier", tier_after.label());
                self.events.publish(notification)?;
            }
        }
        Ok(completed)
    }

    /// Explicit admin score adjustment, recorded as its own ledger reason.
    pub fn adjust_score(
        &self,
        influencer_id: &InfluencerId,
        delta: i32,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<AppendOutcome, LifecycleError> {
        let outcome =
            self.reputation
                .append(influencer_id, delta, ScoreReason::AdminAdjustment, note, now)?;
        self.notify_score(influencer_id, &outcome, now)?;
        Ok(outcome)
    }

    /// Record a caller-grantable reputation event (signup, address
    /// completion, brand repurchase) with its fixed table delta.
    pub fn grant(
        &self,
        influencer_id: &InfluencerId,
        reason: ScoreReason,
        now: DateTime<Utc>,
    ) -> Result<AppendOutcome, LifecycleError> {
        match reason {
            ScoreReason::SignupBonus
            | ScoreReason::AddressCompletion
            | ScoreReason::BrandRepurchase => {}
            other => return Err(LifecycleError::UnsupportedGrant(other.label())),
        }
        let outcome = self.reputation.award(influencer_id, reason, None, now)?;
        self.notify_score(influencer_id, &outcome, now)?;
        Ok(outcome)
    }

    pub fn get(&self, application_id: &ApplicationId) -> Result<Application, LifecycleError> {
        self.fetch_application(application_id)
    }

    fn fetch_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Application, LifecycleError> {
        Ok(self
            .applications
            .fetch(application_id)?
            .ok_or(StoreError::NotFound)?)
    }

    /// Single-guard transition helper: CAS on the expected status, mapping a
    /// lost race against a now-terminal record to the quiet
    /// `AlreadySettled`.
    fn transition(
        &self,
        application_id: &ApplicationId,
        expected: ApplicationStatus,
        mutate: &dyn Fn(&mut Application),
    ) -> Result<Application, LifecycleError> {
        let application = self.fetch_application(application_id)?;
        if application.status.is_terminal() {
            return Err(LifecycleError::AlreadySettled);
        }
        if application.status != expected {
            return Err(LifecycleError::InvalidTransition {
                from: application.status.label(),
            });
        }
        match self
            .applications
            .update_if_status(application_id, expected, mutate)
        {
            Ok(updated) => Ok(updated),
            Err(StoreError::StatusConflict) => Err(self.race_outcome(application_id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Hand a reserved slot back after a failed swap. A failed release is
    /// logged rather than allowed to mask the error the caller is surfacing.
    fn release_reserved(&self, campaign_id: &CampaignId, now: DateTime<Utc>) {
        if let Err(err) = self.gate.release(campaign_id, now) {
            warn!(campaign = %campaign_id.0, error = %err, "reserved slot could not be released");
        }
    }

    /// Classify a lost status race: a now-terminal record settles quietly,
    /// anything else surfaces as a retryable conflict.
    fn race_outcome(&self, application_id: &ApplicationId) -> LifecycleError {
        match self.fetch_application(application_id) {
            Ok(current) if current.status.is_terminal() => LifecycleError::AlreadySettled,
            Ok(_) => StoreError::StatusConflict.into(),
            Err(err) => err,
        }
    }

    fn transition_notification(
        &self,
        kind: NotificationKind,
        application: &Application,
        now: DateTime<Utc>,
    ) -> Notification {
        Notification::new(kind, application.influencer_id.clone(), now)
            .for_application(application.id.clone(), application.campaign_id.clone())
            .with_detail("status", application.status.label())
    }

    fn notify_transition(
        &self,
        kind: NotificationKind,
        application: &Application,
        now: DateTime<Utc>,
    ) -> Result<(), NotifyError> {
        self.events
            .publish(self.transition_notification(kind, application, now))
    }

    fn notify_score(
        &self,
        influencer_id: &InfluencerId,
        outcome: &AppendOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), NotifyError> {
        let notification = Notification::new(NotificationKind::ScoreUpdated, influencer_id.clone(), now)
            .with_detail("score", outcome.score_after.to_string())
            .with_detail("reason", outcome.entry.reason.label());
        self.events.publish(notification)?;
        self.notify_tier_change(influencer_id, outcome, now)
    }

    fn notify_tier_change(
        &self,
        influencer_id: &InfluencerId,
        outcome: &AppendOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), NotifyError> {
        if outcome.tier_upgraded() {
            let notification =
                Notification::new(NotificationKind::TierUpgraded, influencer_id.clone(), now)
                    .with_detail("tier", outcome.tier_after.label());
            self.events.publish(notification)?;
        }
        Ok(())
    }
}
