//! Cross-platform activity reconciliation
//!
//! The same ride often arrives from two or three platforms. Duplicates are
//! collapsed before strain aggregation so nothing double counts. The
//! reducer is pure and deterministic: identical input sets produce the
//! identical canonical record regardless of arrival order.

use chrono::Duration;

use crate::config::DedupSettings;
use crate::models::Activity;

/// Collapses duplicate activity records across platforms
#[derive(Debug, Clone)]
pub struct Deduplicator {
    config: DedupSettings,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::with_config(DedupSettings::default())
    }

    pub fn with_config(config: DedupSettings) -> Self {
        Deduplicator { config }
    }

    /// Reduce a batch to canonical records.
    ///
    /// Two records are duplicates when their starts fall within the start
    /// tolerance and their durations within the duration tolerance. The
    /// canonical pick prefers the most complete power/HR data, then the
    /// configured platform precedence, then the lexicographically smallest
    /// id.
    pub fn dedup(&self, mut activities: Vec<Activity>) -> Vec<Activity> {
        // Canonical processing order, independent of fetch order
        activities.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

        let start_tol = Duration::seconds(self.config.start_tolerance_seconds);
        let duration_tol = self.config.duration_tolerance_seconds;

        let mut groups: Vec<Vec<Activity>> = Vec::new();
        for activity in activities {
            let group = groups.iter_mut().find(|group| {
                let head = &group[0];
                let start_delta = (activity.start - head.start).abs();
                let duration_delta =
                    (activity.duration_seconds as i64 - head.duration_seconds as i64).abs();
                start_delta <= start_tol && duration_delta <= duration_tol
            });

            match group {
                Some(group) => group.push(activity),
                None => groups.push(vec![activity]),
            }
        }

        let mut canonical: Vec<Activity> = groups
            .into_iter()
            .map(|group| self.pick_canonical(group))
            .collect();
        canonical.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

        canonical
    }

    fn pick_canonical(&self, mut group: Vec<Activity>) -> Activity {
        if group.len() > 1 {
            tracing::debug!(
                count = group.len(),
                start = %group[0].start,
                "collapsing duplicate activities"
            );
        }

        group.sort_by(|a, b| {
            completeness(b)
                .cmp(&completeness(a))
                .then_with(|| self.platform_rank(a).cmp(&self.platform_rank(b)))
                .then_with(|| a.id.cmp(&b.id))
        });

        group.swap_remove(0)
    }

    fn platform_rank(&self, activity: &Activity) -> usize {
        self.config
            .platform_priority
            .iter()
            .position(|p| p.eq_ignore_ascii_case(&activity.source_platform))
            .unwrap_or(usize::MAX)
    }
}

/// Field-completeness score; richer power/HR data wins
fn completeness(activity: &Activity) -> u32 {
    let mut score = 0;
    if activity.normalized_power.is_some() {
        score += 3;
    }
    if activity.tss.is_some() {
        score += 3;
    }
    if activity.average_power.is_some() {
        score += 2;
    }
    if activity.intensity_factor.is_some() {
        score += 2;
    }
    if activity.average_hr.is_some() {
        score += 1;
    }
    if activity.max_hr.is_some() {
        score += 1;
    }
    if activity.distance_meters.is_some() {
        score += 1;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityCategory;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn start_at(offset_seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 17, 0, 0).unwrap() + Duration::seconds(offset_seconds)
    }

    fn ride(id: &str, platform: &str, offset_seconds: i64, duration: u32) -> Activity {
        let mut a = Activity::new(start_at(offset_seconds), duration, ActivityCategory::Cardio);
        a.id = id.to_string();
        a.source_platform = platform.to_string();
        a
    }

    #[test]
    fn test_duplicates_collapse_to_richest_record() {
        let mut rich = ride("strava-1", "strava", 0, 3600);
        rich.normalized_power = Some(230);
        rich.tss = Some(dec!(85));
        rich.average_hr = Some(152);

        let poor = ride("garmin-1", "garmin", 60, 3650);

        let result = Deduplicator::new().dedup(vec![poor, rich]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "strava-1");
    }

    #[test]
    fn test_completeness_tie_falls_to_platform_priority() {
        let a = ride("zwift-1", "zwift", 0, 3600);
        let b = ride("garmin-1", "garmin", 30, 3600);

        let result = Deduplicator::new().dedup(vec![a, b]);
        assert_eq!(result.len(), 1);
        // garmin outranks zwift in the default priority list
        assert_eq!(result[0].id, "garmin-1");
    }

    #[test]
    fn test_unknown_platforms_tie_break_on_id() {
        let a = ride("bbb", "somefit", 0, 3600);
        let b = ride("aaa", "otherfit", 30, 3600);

        let result = Deduplicator::new().dedup(vec![a, b]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "aaa");
    }

    #[test]
    fn test_result_independent_of_input_order() {
        let mut rich = ride("strava-1", "strava", 0, 3600);
        rich.average_power = Some(210);
        let poor = ride("garmin-1", "garmin", 90, 3580);
        let other = ride("garmin-2", "garmin", 7200, 1800);

        let dedup = Deduplicator::new();
        let forward = dedup.dedup(vec![rich.clone(), poor.clone(), other.clone()]);
        let reverse = dedup.dedup(vec![other, poor, rich]);

        assert_eq!(forward, reverse);
        assert_eq!(forward.len(), 2);
    }

    #[test]
    fn test_far_apart_starts_are_not_duplicates() {
        let a = ride("a", "garmin", 0, 3600);
        let b = ride("b", "strava", 600, 3600);

        let result = Deduplicator::new().dedup(vec![a, b]);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_duration_mismatch_is_not_a_duplicate() {
        let a = ride("a", "garmin", 0, 3600);
        let b = ride("b", "strava", 30, 3900);

        let result = Deduplicator::new().dedup(vec![a, b]);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(Deduplicator::new().dedup(vec![]).is_empty());
    }
}
