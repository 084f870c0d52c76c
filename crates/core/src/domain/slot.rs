// Slot Suggestion Domain Model

use crate::domain::directory::UserId;
use crate::domain::time_range::TimeRange;
use serde::{Deserialize, Serialize};

/// Ranked interview time proposed to a recruiter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSuggestion {
    pub range: TimeRange,
    /// 0.0 - 100.0, higher is better
    pub score: f64,
    /// Optional participants who are free for the whole slot
    pub optional_available: Vec<UserId>,
}
