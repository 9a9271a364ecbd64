//! Single-flight computation registry
//!
//! At most one task computes a given (date, score family) at a time.
//! The first caller gets a publisher slot; concurrent callers join the
//! in-flight watch channel instead of duplicating work. A published
//! result stays on the slot as a done marker until it is explicitly
//! cleared for recompute. Abandonment drops the slot without publishing,
//! so joiners observe completion without a result.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::watch;

use crate::models::{DailyScore, ScoreType};

type SlotKey = (NaiveDate, ScoreType);

/// Outcome of asking to compute a (date, score family) pair
pub enum Computation {
    /// Caller owns the computation and must publish or abandon the slot
    Started(ComputationSlot),

    /// Another task is already computing; await the channel
    Joined(watch::Receiver<Option<DailyScore>>),

    /// The result was already published
    Done(DailyScore),
}

/// Publisher half of an in-flight computation
pub struct ComputationSlot {
    key: SlotKey,
    sender: watch::Sender<Option<DailyScore>>,
}

impl ComputationSlot {
    /// New receiver on this slot's channel, for callers that start a
    /// computation and also want to await it
    pub fn subscribe(&self) -> watch::Receiver<Option<DailyScore>> {
        self.sender.subscribe()
    }
}

/// Registry of in-flight and completed computations
#[derive(Debug, Default)]
pub struct ComputationRegistry {
    slots: Mutex<HashMap<SlotKey, watch::Receiver<Option<DailyScore>>>>,
}

impl ComputationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim or join the computation for one (date, score family).
    ///
    /// A slot whose owner vanished without publishing (channel closed,
    /// value still empty) is treated as dead and silently reclaimed.
    pub fn begin(&self, date: NaiveDate, score_type: ScoreType) -> Computation {
        let key = (date, score_type);
        let mut slots = self.lock();

        if let Some(rx) = slots.get(&key) {
            if let Some(score) = rx.borrow().clone() {
                return Computation::Done(score);
            }
            if rx.has_changed().is_ok() {
                return Computation::Joined(rx.clone());
            }
            // Owner dropped the slot without publishing
            tracing::warn!(%date, ?score_type, "reclaiming dead computation slot");
            slots.remove(&key);
        }

        let (sender, receiver) = watch::channel(None);
        slots.insert(key, receiver);
        Computation::Started(ComputationSlot { key, sender })
    }

    /// Publish a finished score; joiners wake and the slot becomes a
    /// done marker
    pub fn publish(&self, slot: ComputationSlot, score: &DailyScore) {
        slot.sender.send_replace(Some(score.clone()));
        tracing::debug!(date = %slot.key.0, score_type = ?slot.key.1, "computation published");
    }

    /// Drop an in-flight computation without publishing
    pub fn abandon(&self, slot: ComputationSlot) {
        self.lock().remove(&slot.key);
        tracing::debug!(date = %slot.key.0, score_type = ?slot.key.1, "computation abandoned");
    }

    /// Remove any slot for the pair so the next `begin` starts fresh
    pub fn clear(&self, date: NaiveDate, score_type: ScoreType) {
        self.lock().remove(&(date, score_type));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SlotKey, watch::Receiver<Option<DailyScore>>>> {
        // Slot bookkeeping stays valid even if a holder panicked
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Await a joined computation, bounded by `timeout`.
///
/// Returns the published score, or None when the owner abandoned the
/// slot or the wait timed out.
pub async fn await_published(
    mut receiver: watch::Receiver<Option<DailyScore>>,
    timeout: Duration,
) -> Option<DailyScore> {
    if let Some(score) = receiver.borrow_and_update().clone() {
        return Some(score);
    }
    match tokio::time::timeout(timeout, receiver.changed()).await {
        // Published, or closed after publishing
        Ok(Ok(())) => receiver.borrow().clone(),
        // Closed without a publish
        Ok(Err(_)) => receiver.borrow().clone(),
        Err(_) => {
            tracing::warn!("computation wait timed out");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn score(value: f64) -> DailyScore {
        DailyScore::new(day(), ScoreType::Sleep, value)
    }

    #[tokio::test]
    async fn test_first_caller_starts_second_joins() {
        let registry = ComputationRegistry::new();

        let slot = match registry.begin(day(), ScoreType::Sleep) {
            Computation::Started(slot) => slot,
            _ => panic!("first caller should start"),
        };

        let rx = match registry.begin(day(), ScoreType::Sleep) {
            Computation::Joined(rx) => rx,
            _ => panic!("second caller should join"),
        };

        registry.publish(slot, &score(81.0));

        let joined = await_published(rx, Duration::from_millis(100)).await;
        assert_eq!(joined.unwrap().value, 81.0);
    }

    #[tokio::test]
    async fn test_published_slot_is_a_done_marker() {
        let registry = ComputationRegistry::new();

        if let Computation::Started(slot) = registry.begin(day(), ScoreType::Recovery) {
            registry.publish(slot, &score(64.0));
        }

        match registry.begin(day(), ScoreType::Recovery) {
            Computation::Done(s) => assert_eq!(s.value, 64.0),
            _ => panic!("published result should surface as done"),
        }
    }

    #[tokio::test]
    async fn test_abandon_wakes_joiners_with_no_result() {
        let registry = ComputationRegistry::new();

        let slot = match registry.begin(day(), ScoreType::Sleep) {
            Computation::Started(slot) => slot,
            _ => panic!("expected start"),
        };
        let rx = match registry.begin(day(), ScoreType::Sleep) {
            Computation::Joined(rx) => rx,
            _ => panic!("expected join"),
        };

        registry.abandon(slot);

        assert!(await_published(rx, Duration::from_millis(100)).await.is_none());

        // Slot is free again
        assert!(matches!(
            registry.begin(day(), ScoreType::Sleep),
            Computation::Started(_)
        ));
    }

    #[tokio::test]
    async fn test_clear_reopens_a_done_slot() {
        let registry = ComputationRegistry::new();

        if let Computation::Started(slot) = registry.begin(day(), ScoreType::Strain) {
            registry.publish(slot, &score(40.0));
        }
        registry.clear(day(), ScoreType::Strain);

        assert!(matches!(
            registry.begin(day(), ScoreType::Strain),
            Computation::Started(_)
        ));
    }

    #[tokio::test]
    async fn test_dead_slot_is_reclaimed() {
        let registry = ComputationRegistry::new();

        match registry.begin(day(), ScoreType::Sleep) {
            Computation::Started(slot) => drop(slot),
            _ => panic!("expected start"),
        }

        // Owner vanished without publish or abandon
        assert!(matches!(
            registry.begin(day(), ScoreType::Sleep),
            Computation::Started(_)
        ));
    }

    #[tokio::test]
    async fn test_join_after_publish_sees_the_value() {
        let registry = ComputationRegistry::new();

        let slot = match registry.begin(day(), ScoreType::Sleep) {
            Computation::Started(slot) => slot,
            _ => panic!("expected start"),
        };
        let rx = match registry.begin(day(), ScoreType::Sleep) {
            Computation::Joined(rx) => rx,
            _ => panic!("expected join"),
        };

        registry.publish(slot, &score(77.0));

        // Receiver reads the value even though the publish happened first
        let result = await_published(rx, Duration::from_millis(100)).await;
        assert_eq!(result.unwrap().value, 77.0);
    }
}
