use serde::{Deserialize, Serialize};

use super::ScoreReason;

/// Versioned table of score deltas and tier thresholds. Business-rule
/// changes ship as a new table version; transition logic never hard-codes
/// these numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreTable {
    pub version: u32,
    pub standard_threshold: i32,
    pub vip_threshold: i32,
    pub signup_bonus: i32,
    pub address_completion: i32,
    pub upload_on_time: i32,
    pub quality_bonus: i32,
    pub brand_repurchase: i32,
    pub deadline_24h_late: i32,
    pub deadline_48h_late: i32,
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self {
            version: 1,
            standard_threshold: 50,
            vip_threshold: 85,
            signup_bonus: 50,
            address_completion: 10,
            upload_on_time: 3,
            quality_bonus: 5,
            brand_repurchase: 10,
            deadline_24h_late: -3,
            deadline_48h_late: -10,
        }
    }
}

impl ScoreTable {
    /// Fixed delta for a reason code. `AdminAdjustment` has no table value;
    /// the delta is supplied by the administrator.
    pub fn delta_for(&self, reason: ScoreReason) -> Option<i32> {
        match reason {
            ScoreReason::SignupBonus => Some(self.signup_bonus),
            ScoreReason::AddressCompletion => Some(self.address_completion),
            ScoreReason::UploadOnTime => Some(self.upload_on_time),
            ScoreReason::QualityBonus => Some(self.quality_bonus),
            ScoreReason::BrandRepurchase => Some(self.brand_repurchase),
            ScoreReason::Deadline24hLate => Some(self.deadline_24h_late),
            ScoreReason::Deadline48hLate => Some(self.deadline_48h_late),
            ScoreReason::AdminAdjustment => None,
        }
    }
}
