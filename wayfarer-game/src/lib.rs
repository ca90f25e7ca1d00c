//! Wayfarer Game Engine
//!
//! Platform-agnostic core game logic for the Wayfarer narrative travel RPG.
//! This crate provides the report state machine and its selection mechanics
//! without transport or platform-specific dependencies.

pub mod constants;
pub mod data;
pub mod numbers;
pub mod outcome;
pub mod random;
pub mod report;
pub mod small_events;
pub mod state;
pub mod travel;

// Re-export commonly used types
pub use constants::{BOOTSTRAP_EVENT_ID, END_REACTION_LABEL, SENTINEL_EVENT_ID};
pub use data::{BigEvent, EventCatalog, MapLink, Possibility, SmallEventSpec};
pub use outcome::{
    DeltaSet, OutcomeError, Resolution, compute_deltas, resolve_outcome, select_big_event_id,
};
pub use random::{RngBundle, SelectionError, uniform_int, uniform_pick, weighted_pick};
pub use report::{
    MessageKey, ReportConfig, ReportConfigError, ReportEngine, ReportError, ReportOptions,
    ReportOutcome,
};
pub use small_events::{SmallEventScheduler, record_slot_completion};
pub use state::{PlayerState, SlotSet, StatusEffect};
pub use travel::{
    elapsed_travel_time, has_reached_big_event_threshold, is_travelling, progress_percent,
    start_travel, stop_travel,
};

use chrono::{DateTime, Utc};
use std::time::Duration as StdDuration;

/// Trait for abstracting player persistence.
/// Platform-specific implementations should provide this.
pub trait PlayerStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch the player entity, registering a fresh one when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity cannot be loaded or created.
    fn get_or_register(
        &self,
        player_id: u64,
        now: DateTime<Utc>,
    ) -> Result<(PlayerState, bool), Self::Error>;

    /// Persist the player entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity cannot be saved.
    fn save(&self, state: &PlayerState) -> Result<(), Self::Error>;

    /// Append a small-event history record, deduplicated by
    /// `(player_id, slot)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn record_small_event(
        &self,
        player_id: u64,
        event_id: &str,
        slot: u8,
    ) -> Result<(), Self::Error>;
}

/// Trait for abstracting read-only catalog access.
/// Catalog data is loaded once and never mutated by the engine.
pub trait CatalogSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Look up a big event by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    fn big_event(&self, id: u32) -> Result<Option<BigEvent>, Self::Error>;

    /// All big-event ids known to the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    fn big_event_ids(&self) -> Result<Vec<u32>, Self::Error>;

    /// The possibility pool for a `(event, label)` pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    fn possibilities(&self, event_id: u32, label: &str) -> Result<Vec<Possibility>, Self::Error>;

    /// The small-event catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    fn small_events(&self) -> Result<Vec<SmallEventSpec>, Self::Error>;

    /// Destinations reachable from a map location.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    fn reachable_destinations(&self, map_id: u32) -> Result<Vec<u32>, Self::Error>;
}

/// Trait for abstracting the message/reaction transport.
///
/// The engine sends opaque message keys and consumes resolved reaction
/// labels; rendering, collection, and cancellation are the transport's
/// concern. `await_reaction` resolves exactly once per displayed message:
/// either the first valid reaction within the timeout, or the literal
/// [`END_REACTION_LABEL`].
pub trait Messenger {
    type Error: std::error::Error + Send + Sync + 'static;
    type Handle;

    /// Send a message, returning a handle for reaction collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport rejects the send.
    fn send(&self, message: &MessageKey) -> Result<Self::Handle, Self::Error>;

    /// Pre-populate a reaction on a sent message.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport rejects the reaction.
    fn react(&self, handle: &Self::Handle, label: &str) -> Result<(), Self::Error>;

    /// Wait for the first valid reaction, or the `end` label on timeout.
    ///
    /// # Errors
    ///
    /// Returns an error only on transport failure; a timeout is a normal
    /// resolution, not an error.
    fn await_reaction(
        &self,
        handle: &Self::Handle,
        valid_labels: &[String],
        timeout: StdDuration,
    ) -> Result<String, Self::Error>;
}

/// Trait for abstracting access control and the per-player cooldown lock.
pub trait AccessControl {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether an external block (moderation, pending interaction) applies.
    ///
    /// # Errors
    ///
    /// Returns an error if the check cannot be performed.
    fn is_blocked(&self, state: &PlayerState) -> Result<bool, Self::Error>;

    /// Whether the player is currently rate limited.
    ///
    /// # Errors
    ///
    /// Returns an error if the check cannot be performed.
    fn is_rate_limited(&self, player_id: u64) -> Result<bool, Self::Error>;

    /// Take the cooldown lock for `window`; `false` when already held.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock state cannot be read or written.
    fn acquire_cooldown(&self, player_id: u64, window: StdDuration) -> Result<bool, Self::Error>;

    /// Release the cooldown lock. Must be idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock state cannot be written.
    fn release_cooldown(&self, player_id: u64) -> Result<(), Self::Error>;
}
