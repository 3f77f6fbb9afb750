mod config;

pub use config::ScoreTable;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{InfluencerId, ReputationState};
use super::repository::{InfluencerDirectory, LedgerStore, StoreError};

/// Identifier wrapper for ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerEntryId(pub String);

/// Reason codes for score adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreReason {
    SignupBonus,
    AddressCompletion,
    UploadOnTime,
    QualityBonus,
    BrandRepurchase,
    Deadline24hLate,
    Deadline48hLate,
    AdminAdjustment,
}

impl ScoreReason {
    pub const fn label(self) -> &'static str {
        match self {
            ScoreReason::SignupBonus => "signup_bonus",
            ScoreReason::AddressCompletion => "address_completion",
            ScoreReason::UploadOnTime => "upload_on_time",
            ScoreReason::QualityBonus => "quality_bonus",
            ScoreReason::BrandRepurchase => "brand_repurchase",
            ScoreReason::Deadline24hLate => "deadline_24h_late",
            ScoreReason::Deadline48hLate => "deadline_48h_late",
            ScoreReason::AdminAdjustment => "admin_adjustment",
        }
    }
}

/// Immutable score adjustment. Entries are only ever appended; the running
/// score for an influencer must always equal the sum of their entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub influencer_id: InfluencerId,
    pub delta: i32,
    pub reason: ScoreReason,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Derived influencer classification gating admission limits and review
/// requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Starting,
    Standard,
    Vip,
}

impl Tier {
    pub const fn label(self) -> &'static str {
        match self {
            Tier::Starting => "starting",
            Tier::Standard => "standard",
            Tier::Vip => "vip",
        }
    }
}

/// Completed-campaign gate: an influencer with zero completed campaigns is
/// Starting no matter how high their score is. Score alone never promotes.
pub fn tier_for(table: &ScoreTable, score: i32, completed_campaigns: u32) -> Tier {
    if completed_campaigns == 0 || score < table.standard_threshold {
        return Tier::Starting;
    }
    if score >= table.vip_threshold {
        Tier::Vip
    } else {
        Tier::Standard
    }
}

static LEDGER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_entry_id() -> LedgerEntryId {
    let id = LEDGER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    LedgerEntryId(format!("led-{id:06}"))
}

/// Result of a ledger write, carrying the totals and tiers on both sides of
/// the entry so callers can emit notifications without re-reading.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendOutcome {
    pub entry: LedgerEntry,
    pub score_before: i32,
    pub score_after: i32,
    pub tier_before: Tier,
    pub tier_after: Tier,
    /// True when this write moved the score from at-or-above the Standard
    /// threshold to below it. Only score-decreasing writes can set this.
    pub crossed_below_standard: bool,
}

impl AppendOutcome {
    pub fn tier_upgraded(&self) -> bool {
        tier_rank(self.tier_after) > tier_rank(self.tier_before)
    }
}

const fn tier_rank(tier: Tier) -> u8 {
    match tier {
        Tier::Starting => 0,
        Tier::Standard => 1,
        Tier::Vip => 2,
    }
}

/// Append-only reputation ledger. Writes go through the store's atomic
/// append primitive so the running total can never diverge from the entry
/// sum; a downward crossing below the Standard threshold signals the
/// account-flags collaborator to suspend the influencer.
pub struct ReputationLedger<L, D> {
    entries: Arc<L>,
    directory: Arc<D>,
    table: ScoreTable,
}

impl<L, D> ReputationLedger<L, D>
where
    L: LedgerStore + 'static,
    D: InfluencerDirectory + 'static,
{
    pub fn new(entries: Arc<L>, directory: Arc<D>, table: ScoreTable) -> Self {
        Self {
            entries,
            directory,
            table,
        }
    }

    pub fn table(&self) -> &ScoreTable {
        &self.table
    }

    /// Append an entry and update the running totals atomically. Callers own
    /// idempotency: the same business event must not be recorded twice.
    pub fn append(
        &self,
        influencer_id: &InfluencerId,
        delta: i32,
        reason: ScoreReason,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<AppendOutcome, StoreError> {
        let completed = self.directory.completed_campaigns(influencer_id)?;
        let entry = LedgerEntry {
            id: next_entry_id(),
            influencer_id: influencer_id.clone(),
            delta,
            reason,
            message,
            created_at: now,
        };
        let totals = self.entries.append(entry.clone())?;

        let score_after = totals.score;
        let score_before = score_after - delta;
        let tier_before = tier_for(&self.table, score_before, completed);
        let tier_after = tier_for(&self.table, score_after, completed);

        // The crossing check runs only for score-decreasing writes and is
        // evaluated against the new total, not the delta alone.
        let crossed_below_standard = delta < 0
            && score_before >= self.table.standard_threshold
            && score_after < self.table.standard_threshold;
        if crossed_below_standard {
            self.directory.set_suspended(influencer_id)?;
        }

        Ok(AppendOutcome {
            entry,
            score_before,
            score_after,
            tier_before,
            tier_after,
            crossed_below_standard,
        })
    }

    /// Append using the fixed delta from the score table.
    pub fn award(
        &self,
        influencer_id: &InfluencerId,
        reason: ScoreReason,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<AppendOutcome, StoreError> {
        let delta = self
            .table
            .delta_for(reason)
            .ok_or_else(|| StoreError::Unavailable("admin adjustments carry their own delta".to_string()))?;
        self.append(influencer_id, delta, reason, message, now)
    }

    pub fn current_score(&self, influencer_id: &InfluencerId) -> Result<i32, StoreError> {
        Ok(self.entries.totals(influencer_id)?.score)
    }

    pub fn state(&self, influencer_id: &InfluencerId) -> Result<ReputationState, StoreError> {
        let totals = self.entries.totals(influencer_id)?;
        let completed = self.directory.completed_campaigns(influencer_id)?;
        Ok(ReputationState {
            score: totals.score,
            penalty: totals.penalty,
            completed_campaigns: completed,
        })
    }

    pub fn tier(&self, influencer_id: &InfluencerId) -> Result<Tier, StoreError> {
        let state = self.state(influencer_id)?;
        Ok(tier_for(&self.table, state.score, state.completed_campaigns))
    }
}
