// Slot suggestion engine
// Free time of every required participant -> candidate starts -> ranked, non-overlapping picks

use super::interval;
use super::working_hours::local_day;
use super::AvailabilityReader;
use crate::domain::{SlotSuggestion, TimeRange, UserId, MINUTE_MS};
use crate::error::{AppError, Result};
use crate::port::{DirectoryRepository, TimeProvider};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

pub const MIN_DURATION_MINUTES: u32 = 15;
pub const MAX_DURATION_MINUTES: u32 = 480;

/// Busy time this close to a slot counts against its spacing score
pub const SPACING_GAP_MS: i64 = 30 * MINUTE_MS;

const EARLINESS_WEIGHT: f64 = 0.4;
const OPTIONAL_WEIGHT: f64 = 0.3;
const COMFORT_WEIGHT: f64 = 0.2;
const SPACING_WEIGHT: f64 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestSlotsRequest {
    pub tenant_id: String,
    pub required_participants: Vec<UserId>,
    #[serde(default)]
    pub optional_participants: Vec<UserId>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub window_start: Option<i64>,
    #[serde(default)]
    pub window_end: Option<i64>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// One participant's calendar over the search window
#[derive(Debug, Clone)]
pub struct ParticipantAvailability {
    pub user_id: UserId,
    pub utc_offset_minutes: i32,
    /// Working ranges, not clipped to the window
    pub working: Vec<TimeRange>,
    /// Unpadded busy ranges (blocks and active interviews)
    pub busy: Vec<TimeRange>,
    /// Working time minus padded busy time, clipped to the window
    pub free: Vec<TimeRange>,
    /// Active interviews per local day
    pub interviews_per_day: HashMap<i64, u32>,
}

impl ParticipantAvailability {
    /// Busy `[b0, b1)` blocks `[b0 - buffer_after, b1 + buffer_before)`
    pub fn new(
        user_id: impl Into<String>,
        utc_offset_minutes: i32,
        working: Vec<TimeRange>,
        busy: Vec<TimeRange>,
        window: TimeRange,
        buffer_before_ms: i64,
        buffer_after_ms: i64,
    ) -> Self {
        let working = interval::normalize(working);
        let busy = interval::normalize(busy);
        let padded: Vec<TimeRange> = busy
            .iter()
            .map(|b| b.pad(buffer_after_ms, buffer_before_ms))
            .collect();
        let free = interval::clip(&interval::subtract(&working, &padded), window);

        Self {
            user_id: user_id.into(),
            utc_offset_minutes,
            working,
            busy,
            free,
            interviews_per_day: HashMap::new(),
        }
    }

    pub fn with_interviews_per_day(mut self, counts: HashMap<i64, u32>) -> Self {
        self.interviews_per_day = counts;
        self
    }

    fn is_free_for(&self, slot: &TimeRange) -> bool {
        interval::containing(&self.free, slot).is_some()
    }

    fn day_is_full(&self, slot: &TimeRange, max_per_day: u32) -> bool {
        let day = local_day(slot.start, self.utc_offset_minutes);
        self.interviews_per_day.get(&day).copied().unwrap_or(0) >= max_per_day
    }

    /// 1.0 in the middle of the working range, 0.0 at its edges
    fn comfort(&self, slot: &TimeRange) -> f64 {
        let Some(working) = interval::containing(&self.working, slot) else {
            return 0.0;
        };
        let half = working.duration_ms() as f64 / 2.0;
        if half <= 0.0 {
            return 0.0;
        }
        let margin = (slot.start - working.start).min(working.end - slot.end) as f64;
        (margin / half).min(1.0)
    }

    fn is_spaced(&self, slot: &TimeRange) -> bool {
        !self.busy.iter().any(|b| {
            (b.end >= slot.start - SPACING_GAP_MS && b.end < slot.start)
                || (b.start >= slot.end && b.start < slot.end + SPACING_GAP_MS)
        })
    }
}

/// Knobs of one ranking run
#[derive(Debug, Clone)]
pub struct SlotPlan {
    pub window: TimeRange,
    pub duration_ms: i64,
    pub increment_ms: i64,
    pub max_interviews_per_day: u32,
    pub max_slots_per_day: u32,
    pub limit: usize,
}

/// Rank candidate slots; the first required participant is the organiser
pub fn rank_slots(
    plan: &SlotPlan,
    required: &[ParticipantAvailability],
    optional: &[ParticipantAvailability],
) -> Vec<SlotSuggestion> {
    let Some(organiser) = required.first() else {
        return Vec::new();
    };
    if plan.window.is_empty() || plan.duration_ms <= 0 || plan.increment_ms <= 0 {
        return Vec::new();
    }

    let free_sets: Vec<Vec<TimeRange>> = required.iter().map(|p| p.free.clone()).collect();
    let common = interval::intersect_all(&free_sets);

    let mut scored: Vec<SlotSuggestion> = candidate_starts(&common, plan)
        .into_iter()
        .filter(|slot| {
            !required
                .iter()
                .any(|p| p.day_is_full(slot, plan.max_interviews_per_day))
        })
        .map(|slot| score_slot(plan, slot, required, optional))
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.range.start.cmp(&b.range.start))
    });

    let mut selected: Vec<SlotSuggestion> = Vec::new();
    let mut per_day: HashMap<i64, u32> = HashMap::new();
    for suggestion in scored {
        if selected.len() >= plan.limit {
            break;
        }
        if selected.iter().any(|s| s.range.overlaps(&suggestion.range)) {
            continue;
        }
        let day = local_day(suggestion.range.start, organiser.utc_offset_minutes);
        let used = per_day.entry(day).or_insert(0);
        if *used >= plan.max_slots_per_day {
            continue;
        }
        *used += 1;
        selected.push(suggestion);
    }

    selected
}

/// Grid-aligned starts (multiples of the increment since epoch) that fit the duration
fn candidate_starts(common: &[TimeRange], plan: &SlotPlan) -> Vec<TimeRange> {
    let mut slots = Vec::new();
    for range in common {
        let mut start = align_up(range.start, plan.increment_ms);
        while start + plan.duration_ms <= range.end {
            slots.push(TimeRange::from_bounds(start, start + plan.duration_ms));
            start += plan.increment_ms;
        }
    }
    slots
}

fn align_up(t: i64, step: i64) -> i64 {
    let rem = t.rem_euclid(step);
    if rem == 0 {
        t
    } else {
        t - rem + step
    }
}

fn score_slot(
    plan: &SlotPlan,
    slot: TimeRange,
    required: &[ParticipantAvailability],
    optional: &[ParticipantAvailability],
) -> SlotSuggestion {
    let window_len = plan.window.duration_ms() as f64;
    let earliness = 1.0 - (slot.start - plan.window.start) as f64 / window_len;

    let optional_available: Vec<UserId> = optional
        .iter()
        .filter(|p| p.is_free_for(&slot))
        .map(|p| p.user_id.clone())
        .collect();
    let optional_ratio = if optional.is_empty() {
        1.0
    } else {
        optional_available.len() as f64 / optional.len() as f64
    };

    let count = required.len() as f64;
    let comfort = required.iter().map(|p| p.comfort(&slot)).sum::<f64>() / count;
    let spacing = required.iter().filter(|p| p.is_spaced(&slot)).count() as f64 / count;

    let score = 100.0
        * (EARLINESS_WEIGHT * earliness
            + OPTIONAL_WEIGHT * optional_ratio
            + COMFORT_WEIGHT * comfort
            + SPACING_WEIGHT * spacing);

    SlotSuggestion {
        range: slot,
        score: (score.clamp(0.0, 100.0) * 100.0).round() / 100.0,
        optional_available,
    }
}

/// `[max(start ?? now, now + notice), min(end, now + horizon))`, `None` when empty
pub fn effective_window(
    now: i64,
    min_notice_ms: i64,
    horizon_ms: i64,
    window_start: Option<i64>,
    window_end: Option<i64>,
) -> Option<TimeRange> {
    let start = window_start
        .unwrap_or(now)
        .max(now.saturating_add(min_notice_ms));
    let end = window_end
        .unwrap_or(i64::MAX)
        .min(now.saturating_add(horizon_ms));
    TimeRange::new(start, end).ok()
}

fn validate_request(req: &SuggestSlotsRequest) -> Result<()> {
    if req.required_participants.is_empty() {
        return Err(AppError::Validation(
            "At least one required participant is needed".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for user_id in req
        .required_participants
        .iter()
        .chain(req.optional_participants.iter())
    {
        if !seen.insert(user_id.as_str()) {
            return Err(AppError::Validation(format!(
                "Participant {} is listed more than once",
                user_id
            )));
        }
    }

    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&req.duration_minutes) {
        return Err(AppError::Validation(format!(
            "Duration must be between {} and {} minutes, got {}",
            MIN_DURATION_MINUTES, MAX_DURATION_MINUTES, req.duration_minutes
        )));
    }

    if let (Some(start), Some(end)) = (req.window_start, req.window_end) {
        if start >= end {
            return Err(AppError::Validation(
                "window_start must be before window_end".to_string(),
            ));
        }
    }

    if req.limit == Some(0) {
        return Err(AppError::Validation("limit must be at least 1".to_string()));
    }

    Ok(())
}

/// Use case: suggest interview slots for a set of participants
pub struct SlotService {
    directory: Arc<dyn DirectoryRepository>,
    reader: Arc<AvailabilityReader>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SlotService {
    pub fn new(
        directory: Arc<dyn DirectoryRepository>,
        reader: Arc<AvailabilityReader>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            directory,
            reader,
            time_provider,
        }
    }

    pub async fn suggest(&self, req: SuggestSlotsRequest) -> Result<Vec<SlotSuggestion>> {
        validate_request(&req)?;

        let mut required_users = Vec::with_capacity(req.required_participants.len());
        for user_id in &req.required_participants {
            required_users.push(self.load_user(&req.tenant_id, user_id).await?);
        }
        let mut optional_users = Vec::with_capacity(req.optional_participants.len());
        for user_id in &req.optional_participants {
            optional_users.push(self.load_user(&req.tenant_id, user_id).await?);
        }

        let rule = self.reader.rule(&req.tenant_id).await?;
        let now = self.time_provider.now_millis();

        let Some(window) = effective_window(
            now,
            rule.min_notice_ms(),
            rule.horizon_ms(),
            req.window_start,
            req.window_end,
        ) else {
            debug!(tenant_id = %req.tenant_id, "Effective window is empty");
            return Ok(Vec::new());
        };

        let mut required = Vec::with_capacity(required_users.len());
        for user in &required_users {
            required.push(self.reader.participant(user, window, &rule).await?);
        }
        let mut optional = Vec::with_capacity(optional_users.len());
        for user in &optional_users {
            optional.push(self.reader.participant(user, window, &rule).await?);
        }

        let limit = req
            .limit
            .unwrap_or(rule.max_suggestions)
            .min(rule.max_suggestions) as usize;

        let plan = SlotPlan {
            window,
            duration_ms: req.duration_minutes as i64 * MINUTE_MS,
            increment_ms: rule.slot_increment_ms(),
            max_interviews_per_day: rule.max_interviews_per_day,
            max_slots_per_day: rule.max_slots_per_day,
            limit,
        };

        let suggestions = rank_slots(&plan, &required, &optional);

        info!(
            tenant_id = %req.tenant_id,
            participants = required.len() + optional.len(),
            suggestions = suggestions.len(),
            "Slots suggested"
        );

        Ok(suggestions)
    }

    async fn load_user(&self, tenant_id: &str, user_id: &str) -> Result<crate::domain::User> {
        self.directory
            .find_user(tenant_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DAY_MS, HOUR_MS};

    /// 2024-01-01T00:00:00Z, a Monday
    const MONDAY: i64 = 1_704_067_200_000;

    fn r(start_h: i64, end_h: i64) -> TimeRange {
        TimeRange::from_bounds(MONDAY + start_h * HOUR_MS, MONDAY + end_h * HOUR_MS)
    }

    fn plan(window: TimeRange) -> SlotPlan {
        SlotPlan {
            window,
            duration_ms: HOUR_MS,
            increment_ms: 30 * MINUTE_MS,
            max_interviews_per_day: 4,
            max_slots_per_day: 3,
            limit: 10,
        }
    }

    fn person(id: &str, working: Vec<TimeRange>, busy: Vec<TimeRange>, window: TimeRange) -> ParticipantAvailability {
        ParticipantAvailability::new(id, 0, working, busy, window, 0, 0)
    }

    #[test]
    fn test_common_free_time_of_required_participants() {
        let window = r(0, 24);
        let alice = person("alice", vec![r(9, 17)], vec![r(9, 12)], window);
        let bob = person("bob", vec![r(9, 17)], vec![r(14, 17)], window);

        let slots = rank_slots(&plan(window), &[alice, bob], &[]);

        // Only 12:00-14:00 is common: 12:00 and 13:00 fit without overlapping
        assert_eq!(slots.len(), 2);
        assert!(slots.iter().all(|s| r(12, 14).contains(&s.range)));
        assert!(!slots[0].range.overlaps(&slots[1].range));
    }

    #[test]
    fn test_buffers_pad_busy_time() {
        let window = r(0, 24);
        // Busy 10-11, 60 min after-buffer blocks from 9:00, 30 min before-buffer until 11:30
        let alice = ParticipantAvailability::new(
            "alice",
            0,
            vec![r(9, 13)],
            vec![r(10, 11)],
            window,
            30 * MINUTE_MS,
            HOUR_MS,
        );
        assert_eq!(
            alice.free,
            vec![TimeRange::from_bounds(MONDAY + 11 * HOUR_MS + 30 * MINUTE_MS, MONDAY + 13 * HOUR_MS)]
        );
    }

    #[test]
    fn test_busy_across_all_time_leaves_nothing_free() {
        let window = r(0, 24);
        let always = TimeRange::from_bounds(i64::MIN + 1, i64::MAX - 1);
        let alice = ParticipantAvailability::new(
            "alice",
            0,
            vec![r(9, 17)],
            vec![always],
            window,
            10 * MINUTE_MS,
            10 * MINUTE_MS,
        );
        assert!(alice.free.is_empty());
        assert!(rank_slots(&plan(window), &[alice], &[]).is_empty());
    }

    #[test]
    fn test_spacing_windows_are_half_open() {
        let window = r(0, 24);
        let slot = r(10, 11);
        let half = 30 * MINUTE_MS;
        let with_busy = |busy: TimeRange| person("alice", vec![r(8, 17)], vec![busy], window);

        // Ends exactly at the slot start
        assert!(with_busy(r(9, 10)).is_spaced(&slot));
        // Ends inside the half hour before
        assert!(!with_busy(TimeRange::from_bounds(slot.start - 2 * half, slot.start - half)).is_spaced(&slot));
        // Starts exactly at the slot end
        assert!(!with_busy(r(11, 12)).is_spaced(&slot));
        // Starts exactly half an hour after the slot end
        assert!(with_busy(TimeRange::from_bounds(slot.end + half, slot.end + 2 * half)).is_spaced(&slot));
    }

    #[test]
    fn test_adjacent_busy_time_does_not_lower_score() {
        let window = r(0, 24);
        let free = person("alice", vec![r(9, 10)], vec![], window);
        let after_meeting = person("alice", vec![r(9, 10)], vec![r(8, 9)], window);

        let plain = rank_slots(&plan(window), &[free], &[]);
        let adjacent = rank_slots(&plan(window), &[after_meeting], &[]);

        assert_eq!(plain.len(), 1);
        assert_eq!(adjacent.len(), 1);
        assert_eq!(plain[0].score, adjacent[0].score);
    }

    #[test]
    fn test_starts_are_grid_aligned() {
        let window = r(0, 24);
        let working = vec![TimeRange::from_bounds(
            MONDAY + 9 * HOUR_MS + 10 * MINUTE_MS,
            MONDAY + 11 * HOUR_MS,
        )];
        let alice = person("alice", working, vec![], window);

        let slots = rank_slots(&plan(window), &[alice], &[]);
        assert!(!slots.is_empty());
        assert!(slots
            .iter()
            .all(|s| s.range.start % (30 * MINUTE_MS) == 0));
        assert_eq!(slots[0].range.start, MONDAY + 9 * HOUR_MS + 30 * MINUTE_MS);
    }

    #[test]
    fn test_earlier_slots_rank_higher_and_limit_applies() {
        let window = TimeRange::from_bounds(MONDAY, MONDAY + 3 * DAY_MS);
        let working = vec![r(9, 17), r(33, 41), r(57, 65)];
        let alice = person("alice", working, vec![], window);

        let mut p = plan(window);
        p.limit = 4;
        let slots = rank_slots(&p, &[alice], &[]);

        assert_eq!(slots.len(), 4);
        for pair in slots.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert!(slots.iter().all(|s| s.score >= 0.0 && s.score <= 100.0));
    }

    #[test]
    fn test_max_slots_per_day_spreads_suggestions() {
        let window = TimeRange::from_bounds(MONDAY, MONDAY + 2 * DAY_MS);
        let alice = person("alice", vec![r(9, 17), r(33, 41)], vec![], window);

        let mut p = plan(window);
        p.max_slots_per_day = 2;
        let slots = rank_slots(&p, &[alice], &[]);

        assert_eq!(slots.len(), 4);
        let first_day = slots.iter().filter(|s| s.range.start < MONDAY + DAY_MS).count();
        assert_eq!(first_day, 2);
    }

    #[test]
    fn test_daily_interview_cap_drops_full_days() {
        let window = TimeRange::from_bounds(MONDAY, MONDAY + 2 * DAY_MS);
        let mut counts = HashMap::new();
        counts.insert(local_day(MONDAY, 0), 4);
        let alice =
            person("alice", vec![r(9, 17), r(33, 41)], vec![], window).with_interviews_per_day(counts);

        let slots = rank_slots(&plan(window), &[alice], &[]);
        assert!(!slots.is_empty());
        assert!(slots.iter().all(|s| s.range.start >= MONDAY + DAY_MS));
    }

    #[test]
    fn test_optional_participants_raise_score() {
        let window = r(0, 24);
        let alice = person("alice", vec![r(9, 17)], vec![], window);
        let carol = person("carol", vec![r(13, 17)], vec![], window);

        let mut p = plan(window);
        p.limit = 20;
        p.max_slots_per_day = 20;
        let slots = rank_slots(&p, &[alice], &[carol]);

        let with_carol = slots
            .iter()
            .find(|s| s.range.start == MONDAY + 13 * HOUR_MS)
            .unwrap();
        assert_eq!(with_carol.optional_available, vec!["carol".to_string()]);
        let without = slots
            .iter()
            .find(|s| s.range.start == MONDAY + 9 * HOUR_MS)
            .unwrap();
        assert!(without.optional_available.is_empty());
    }

    #[test]
    fn test_selected_slots_never_overlap() {
        let window = r(0, 24);
        let alice = person("alice", vec![r(9, 17)], vec![], window);
        let mut p = plan(window);
        p.max_slots_per_day = 100;
        let slots = rank_slots(&p, &[alice], &[]);

        for (i, a) in slots.iter().enumerate() {
            for b in &slots[i + 1..] {
                assert!(!a.range.overlaps(&b.range));
            }
        }
        // Greedy picks radiate from the 12:30 peak, leaving half-hour gaps at both ends
        assert_eq!(slots.len(), 7);
    }

    #[test]
    fn test_no_required_participants_yields_nothing() {
        let window = r(0, 24);
        assert!(rank_slots(&plan(window), &[], &[]).is_empty());
    }

    #[test]
    fn test_effective_window() {
        let now = MONDAY;
        let w = effective_window(now, 4 * HOUR_MS, 14 * DAY_MS, None, None).unwrap();
        assert_eq!(w.start, now + 4 * HOUR_MS);
        assert_eq!(w.end, now + 14 * DAY_MS);

        let w = effective_window(now, 0, DAY_MS, Some(now + HOUR_MS), Some(now + 30 * DAY_MS)).unwrap();
        assert_eq!(w, TimeRange::from_bounds(now + HOUR_MS, now + DAY_MS));

        assert!(effective_window(now, 4 * HOUR_MS, DAY_MS, None, Some(now + HOUR_MS)).is_none());
    }

    #[test]
    fn test_validate_request() {
        let base = SuggestSlotsRequest {
            tenant_id: "t".to_string(),
            required_participants: vec!["a".to_string()],
            optional_participants: vec![],
            duration_minutes: 60,
            window_start: None,
            window_end: None,
            limit: None,
        };
        assert!(validate_request(&base).is_ok());

        let mut req = base.clone();
        req.required_participants.clear();
        assert!(matches!(validate_request(&req), Err(AppError::Validation(_))));

        let mut req = base.clone();
        req.optional_participants = vec!["a".to_string()];
        assert!(matches!(validate_request(&req), Err(AppError::Validation(_))));

        let mut req = base.clone();
        req.duration_minutes = 10;
        assert!(matches!(validate_request(&req), Err(AppError::Validation(_))));

        let mut req = base;
        req.window_start = Some(10);
        req.window_end = Some(10);
        assert!(matches!(validate_request(&req), Err(AppError::Validation(_))));
    }
}
