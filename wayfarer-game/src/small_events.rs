//! Small-event slot scheduling and rarity-weighted selection.

use chrono::{DateTime, Duration, Utc};
use std::cell::Cell;

use crate::PlayerStore;
use crate::data::SmallEventSpec;
use crate::random::SelectionError;
use crate::state::PlayerState;
use crate::travel::elapsed_travel_time;

/// Schedules the small flavor events of a travel leg.
///
/// The big-event interval is partitioned into `slot_count + 1` equal windows;
/// slots `1..=slot_count` each fire at most once per leg. The total rarity of
/// the catalog is a lazily computed derived value owned by this scheduler and
/// recomputed only when the catalog is reloaded.
#[derive(Debug, Clone)]
pub struct SmallEventScheduler {
    specs: Vec<SmallEventSpec>,
    slot_count: u8,
    interval: Duration,
    total_rarity: Cell<Option<u64>>,
}

impl SmallEventScheduler {
    #[must_use]
    pub fn new(specs: Vec<SmallEventSpec>, slot_count: u8, interval: Duration) -> Self {
        Self {
            specs,
            slot_count,
            interval,
            total_rarity: Cell::new(None),
        }
    }

    /// Replace the catalog, invalidating the cached rarity total.
    pub fn reload(&mut self, specs: Vec<SmallEventSpec>) {
        self.specs = specs;
        self.total_rarity.set(None);
    }

    #[must_use]
    pub fn specs(&self) -> &[SmallEventSpec] {
        &self.specs
    }

    fn total_rarity(&self) -> u64 {
        if let Some(total) = self.total_rarity.get() {
            return total;
        }
        let total = self
            .specs
            .iter()
            .map(|spec| u64::from(spec.rarity))
            .sum::<u64>();
        self.total_rarity.set(Some(total));
        total
    }

    /// The slot index due at `now`, if any.
    ///
    /// A slot is due when `now` falls strictly inside its window and it has
    /// not already fired this leg. Pure query: calling it twice with the same
    /// arguments returns the same answer.
    #[must_use]
    pub fn due_slot(&self, state: &PlayerState, now: DateTime<Utc>) -> Option<u8> {
        let elapsed_ms = elapsed_travel_time(state, now)?.num_milliseconds();
        let window_ms = self.interval.num_milliseconds() / (i64::from(self.slot_count) + 1);
        for slot in 1..=self.slot_count {
            let opens = i64::from(slot) * window_ms;
            let closes = (i64::from(slot) + 1) * window_ms;
            if opens < elapsed_ms && elapsed_ms < closes {
                if state.completed_small_event_slots.contains(&slot) {
                    return None;
                }
                return Some(slot);
            }
        }
        None
    }

    /// Rarity-weighted pick over the catalog, using the cached total as the
    /// denominator.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::EmptyCollection` when the catalog is empty or
    /// carries no rarity weight.
    pub fn pick_small_event<R: rand::Rng>(&self, rng: &mut R) -> Result<&str, SelectionError> {
        let total = self.total_rarity();
        if total == 0 {
            return Err(SelectionError::EmptyCollection);
        }
        let roll = rng.gen_range(1..=total);
        let mut cumulative = 0_u64;
        for spec in &self.specs {
            cumulative += u64::from(spec.rarity);
            if cumulative >= roll {
                return Ok(&spec.id);
            }
        }
        self.specs
            .first()
            .map(|spec| spec.id.as_str())
            .ok_or(SelectionError::EmptyCollection)
    }
}

/// Mark a slot as completed and persist the history record.
///
/// Safe under retry: the store dedupes history by `(player_id, slot)`, and
/// the local slot set only ever holds one copy of an index.
///
/// # Errors
///
/// Propagates the store failure unmodified; the local slot set is only
/// updated after the history write succeeds.
pub fn record_slot_completion<S: PlayerStore>(
    store: &S,
    state: &mut PlayerState,
    slot: u8,
    event_id: &str,
) -> Result<(), S::Error> {
    store.record_small_event(state.player_id, event_id, slot)?;
    if !state.completed_small_event_slots.contains(&slot) {
        state.completed_small_event_slots.push(slot);
    }
    Ok(())
}
