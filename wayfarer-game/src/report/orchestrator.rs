//! Top-level report orchestration.
//!
//! One invocation per report command: access checks, the cooldown guard,
//! then exactly one of the bootstrap, destination, big-event, small-event,
//! or travel-path branches. Player state is owned for the duration of the
//! invocation and persisted once at the end.

use chrono::{DateTime, Utc};

use super::{MessageKey, ReportConfig, ReportError, ReportOptions, ReportOutcome};
use crate::constants::{
    ADVICE_KEYS, BOOTSTRAP_EVENT_ID, BOOTSTRAP_FORCED_SCORE, DESTINATION_CHOICE_LABELS,
    END_REACTION_LABEL, MSG_BOOTSTRAP_END, MSG_DEATH, MSG_DESTINATION_CHOSEN,
    MSG_DESTINATION_PROMPT, MSG_EVENT_PROMPT, MSG_EVENT_RESULT, MSG_LEVEL_UP, MSG_SMALL_EVENT,
    MSG_TRAVEL_PATH,
};
use crate::outcome::{self, DeltaSet, OutcomeError, Resolution};
use crate::random::{RngBundle, uniform_pick};
use crate::small_events::{self, SmallEventScheduler};
use crate::state::{PlayerState, StatusEffect};
use crate::travel;
use crate::{AccessControl, CatalogSource, Messenger, PlayerStore};

fn collab<E: std::error::Error + Send + Sync + 'static>(err: E) -> ReportError {
    ReportError::Collaborator(anyhow::Error::new(err))
}

/// Releases the per-player cooldown lock on every exit path.
///
/// Dropping twice is harmless: release is performed at most once here and the
/// access-control contract makes release itself idempotent.
struct CooldownGuard<'a, A: AccessControl> {
    access: &'a A,
    player_id: u64,
    released: bool,
}

impl<'a, A: AccessControl> CooldownGuard<'a, A> {
    const fn hold(access: &'a A, player_id: u64) -> Self {
        Self {
            access,
            player_id,
            released: false,
        }
    }
}

impl<A: AccessControl> Drop for CooldownGuard<'_, A> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = self.access.release_cooldown(self.player_id) {
            log::warn!("cooldown release failed for player {}: {err}", self.player_id);
        }
    }
}

/// Report engine binding the catalog, persistence, transport, and access
/// control collaborators to the report state machine.
pub struct ReportEngine<C, P, M, A> {
    catalog: C,
    players: P,
    messenger: M,
    access: A,
    cfg: ReportConfig,
    scheduler: SmallEventScheduler,
    rng: RngBundle,
}

impl<C, P, M, A> ReportEngine<C, P, M, A>
where
    C: CatalogSource,
    P: PlayerStore,
    M: Messenger,
    A: AccessControl,
{
    /// Create an engine with the provided collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid or the small-event
    /// catalog cannot be loaded.
    pub fn new(
        catalog: C,
        players: P,
        messenger: M,
        access: A,
        cfg: ReportConfig,
        seed: u64,
    ) -> Result<Self, ReportError> {
        cfg.validate()?;
        let mut cfg = cfg;
        cfg.sanitize();
        let specs = catalog.small_events().map_err(collab)?;
        let scheduler =
            SmallEventScheduler::new(specs, cfg.small_event_count, cfg.big_event_interval());
        Ok(Self {
            catalog,
            players,
            messenger,
            access,
            cfg,
            scheduler,
            rng: RngBundle::from_user_seed(seed),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &ReportConfig {
        &self.cfg
    }

    /// Deterministically reseed the engine's RNG streams.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = RngBundle::from_user_seed(seed);
    }

    /// Re-read the small-event catalog, recomputing the rarity total.
    ///
    /// # Errors
    ///
    /// Propagates the catalog failure unmodified.
    pub fn reload_small_events(&mut self) -> Result<(), ReportError> {
        let specs = self.catalog.small_events().map_err(collab)?;
        self.scheduler.reload(specs);
        Ok(())
    }

    /// Run one report invocation for `player_id` at `now`.
    ///
    /// # Errors
    ///
    /// Rejections (`Blocked`, `RateLimited`, `CooldownHeld`) leave no state
    /// change; collaborator and catalog faults abort the invocation without
    /// persisting, and the cooldown lock is released on every path.
    pub fn run_report(
        &self,
        player_id: u64,
        now: DateTime<Utc>,
        options: &ReportOptions,
    ) -> Result<ReportOutcome, ReportError> {
        let (mut player, _created) = self.players.get_or_register(player_id, now).map_err(collab)?;

        if player.status_effect.blocks_report() || self.access.is_blocked(&player).map_err(collab)?
        {
            return Err(ReportError::Blocked);
        }
        if self.access.is_rate_limited(player_id).map_err(collab)? {
            return Err(ReportError::RateLimited);
        }
        if !self
            .access
            .acquire_cooldown(player_id, self.cfg.cooldown_window())
            .map_err(collab)?
        {
            return Err(ReportError::CooldownHeld);
        }
        let _guard = CooldownGuard::hold(&self.access, player_id);

        let outcome = self.dispatch(&mut player, now, options)?;
        self.players.save(&player).map_err(collab)?;
        Ok(outcome)
    }

    fn dispatch(
        &self,
        player: &mut PlayerState,
        now: DateTime<Utc>,
        options: &ReportOptions,
    ) -> Result<ReportOutcome, ReportError> {
        if player.score == 0 && player.status_effect == StatusEffect::Newcomer {
            log::debug!("report dispatch | player {} bootstrap", player.player_id);
            return self.run_big_event(player, now, None, true);
        }

        if !travel::is_travelling(player) {
            let destination = self.choose_destination(player, now)?;
            return Ok(ReportOutcome::DestinationPrompt { destination });
        }

        if travel::has_reached_big_event_threshold(player, now, self.cfg.big_event_interval()) {
            return self.run_big_event(player, now, options.force_big_event, false);
        }

        let forced_small = options.force_small_event.as_deref();
        if forced_small.is_some() || self.scheduler.due_slot(player, now).is_some() {
            return self.run_small_event(player, now, forced_small);
        }

        self.show_travel_path(player, now)
    }

    fn run_big_event(
        &self,
        player: &mut PlayerState,
        now: DateTime<Utc>,
        force: Option<u32>,
        bootstrap: bool,
    ) -> Result<ReportOutcome, ReportError> {
        let elapsed = if bootstrap {
            self.cfg.big_event_interval_mins
        } else if force.is_some() {
            self.cfg.time_max_mins + 1
        } else {
            (now - player.last_report_at).num_minutes()
        };
        let elapsed = elapsed.clamp(0, self.cfg.time_limit_mins);

        let event_id = if bootstrap {
            BOOTSTRAP_EVENT_ID
        } else {
            travel::stop_travel(player);
            let catalog_ids = self.catalog.big_event_ids().map_err(collab)?;
            outcome::select_big_event_id(&mut *self.rng.event(), player, &catalog_ids, force)?
        };
        log::debug!(
            "report event | player {} event {event_id} elapsed {elapsed}m",
            player.player_id
        );

        let event = self
            .catalog
            .big_event(event_id)
            .map_err(collab)?
            .ok_or(OutcomeError::UnknownEvent { event_id })?;

        let prompt = MessageKey::new(MSG_EVENT_PROMPT).with("event", event.text_key.clone());
        let handle = self.messenger.send(&prompt).map_err(collab)?;
        for label in event.visible_reactions() {
            self.messenger.react(&handle, label).map_err(collab)?;
        }
        let label = self
            .messenger
            .await_reaction(&handle, &event.reactions, self.cfg.reaction_timeout())
            .map_err(collab)?;
        let label = if event.accepts(&label) {
            label
        } else {
            END_REACTION_LABEL.to_string()
        };

        let pool = self
            .catalog
            .possibilities(event.id, &label)
            .map_err(collab)?;
        let resolution = outcome::resolve_outcome(&mut *self.rng.reward(), event.id, &label, &pool)?;

        let possibility = match resolution {
            Resolution::Terminal => {
                self.messenger
                    .send(&MessageKey::new(MSG_BOOTSTRAP_END))
                    .map_err(collab)?;
                return Ok(ReportOutcome::BigEventResolved {
                    event_id: event.id,
                    deltas: DeltaSet::default(),
                });
            }
            Resolution::Chosen(possibility) => possibility,
        };

        let forced_score = bootstrap.then_some(BOOTSTRAP_FORCED_SCORE);
        let deltas = outcome::compute_deltas(
            &mut *self.rng.reward(),
            &possibility,
            elapsed,
            player.level,
            forced_score,
        )?;
        player.apply_deltas(&deltas, now);

        self.messenger
            .send(
                &MessageKey::new(MSG_EVENT_RESULT)
                    .with("outcome", possibility.text_key.clone())
                    .with("score", deltas.score)
                    .with("money", deltas.money),
            )
            .map_err(collab)?;

        let gained = player.cascade_level_ups();
        if gained > 0 {
            self.messenger
                .send(&MessageKey::new(MSG_LEVEL_UP).with("level", player.level))
                .map_err(collab)?;
        }
        if player.die_if_needed() {
            self.messenger
                .send(&MessageKey::new(MSG_DEATH))
                .map_err(collab)?;
        } else {
            self.choose_destination(player, now)?;
        }

        Ok(ReportOutcome::BigEventResolved {
            event_id: event.id,
            deltas,
        })
    }

    fn choose_destination(
        &self,
        player: &mut PlayerState,
        now: DateTime<Utc>,
    ) -> Result<u32, ReportError> {
        let destinations = self
            .catalog
            .reachable_destinations(player.map_id)
            .map_err(collab)?;
        if destinations.is_empty() {
            return Err(ReportError::NoDestination {
                map_id: player.map_id,
            });
        }

        let destination = if destinations.len() == 1 {
            destinations[0]
        } else {
            let labels: Vec<String> = DESTINATION_CHOICE_LABELS
                .iter()
                .take(destinations.len())
                .map(|label| (*label).to_string())
                .collect();
            let prompt = MessageKey::new(MSG_DESTINATION_PROMPT).with("count", destinations.len());
            let handle = self.messenger.send(&prompt).map_err(collab)?;
            for label in &labels {
                self.messenger.react(&handle, label).map_err(collab)?;
            }
            let picked = self
                .messenger
                .await_reaction(&handle, &labels, self.cfg.reaction_timeout())
                .map_err(collab)?;
            match labels.iter().position(|label| *label == picked) {
                Some(index) => destinations[index],
                // Timeout keeps the journey moving with a random road.
                None => *uniform_pick(&mut *self.rng.travel(), &destinations)?,
            }
        };

        travel::start_travel(player, destination, now);
        self.messenger
            .send(&MessageKey::new(MSG_DESTINATION_CHOSEN).with("map", destination))
            .map_err(collab)?;
        Ok(destination)
    }

    fn run_small_event(
        &self,
        player: &mut PlayerState,
        now: DateTime<Utc>,
        forced: Option<&str>,
    ) -> Result<ReportOutcome, ReportError> {
        let slot = self.scheduler.due_slot(player, now).unwrap_or(0);
        let event_id = match forced {
            Some(id) => id.to_string(),
            None => self
                .scheduler
                .pick_small_event(&mut *self.rng.small_event())?
                .to_string(),
        };
        log::debug!(
            "report small event | player {} slot {slot} event {event_id}",
            player.player_id
        );

        self.messenger
            .send(&MessageKey::new(MSG_SMALL_EVENT).with("event", event_id.clone()))
            .map_err(collab)?;
        small_events::record_slot_completion(&self.players, player, slot, &event_id)
            .map_err(collab)?;

        Ok(ReportOutcome::SmallEventResolved { event_id })
    }

    fn show_travel_path(
        &self,
        player: &PlayerState,
        now: DateTime<Utc>,
    ) -> Result<ReportOutcome, ReportError> {
        let percent = travel::progress_percent(player, now, self.cfg.big_event_interval());
        let advice = *uniform_pick(&mut *self.rng.travel(), &ADVICE_KEYS)?;
        self.messenger
            .send(
                &MessageKey::new(MSG_TRAVEL_PATH)
                    .with("from", player.previous_map_id)
                    .with("to", player.map_id)
                    .with("percent", percent)
                    .with("advice", advice),
            )
            .map_err(collab)?;
        Ok(ReportOutcome::ProgressShown { percent })
    }
}
