use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

use crate::constants::{DEFAULT_MAX_HEALTH, LEVEL_UP_HEALTH_BONUS, LEVEL_XP_BASE, LEVEL_XP_STEP};
use crate::outcome::DeltaSet;

/// Completed small-event slot indices for the current travel leg.
///
/// Slot counts are tiny, so the set stays inline without allocations.
pub type SlotSet = SmallVec<[u8; 4]>;

/// Condition applied to a player by an event outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusEffect {
    #[default]
    None,
    /// Fresh account that has never resolved a report.
    Newcomer,
    /// Time-locked by a lost-time outcome.
    Occupied,
    Sleeping,
    Drunk,
    Sick,
    Injured,
    Frozen,
    Dead,
}

impl StatusEffect {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Newcomer => "newcomer",
            Self::Occupied => "occupied",
            Self::Sleeping => "sleeping",
            Self::Drunk => "drunk",
            Self::Sick => "sick",
            Self::Injured => "injured",
            Self::Frozen => "frozen",
            Self::Dead => "dead",
        }
    }

    /// Whether the effect bars the player from reporting entirely.
    #[must_use]
    pub const fn blocks_report(self) -> bool {
        matches!(self, Self::Dead)
    }
}

impl fmt::Display for StatusEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusEffect {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "newcomer" => Ok(Self::Newcomer),
            "occupied" => Ok(Self::Occupied),
            "sleeping" => Ok(Self::Sleeping),
            "drunk" => Ok(Self::Drunk),
            "sick" => Ok(Self::Sick),
            "injured" => Ok(Self::Injured),
            "frozen" => Ok(Self::Frozen),
            "dead" => Ok(Self::Dead),
            _ => Err(()),
        }
    }
}

/// Persisted player entity subset consumed by the report loop.
///
/// Exclusively owned and mutated by the orchestrator for the duration of one
/// report invocation, then handed back to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub player_id: u64,
    pub map_id: u32,
    pub previous_map_id: u32,
    /// `None` when the player is not travelling.
    pub start_travel_date: Option<DateTime<Utc>>,
    pub last_report_at: DateTime<Utc>,
    /// Forced-event override chained by a prior outcome.
    pub next_event_id: Option<u32>,
    #[serde(default)]
    pub completed_small_event_slots: SlotSet,
    pub score: i64,
    pub weekly_score: i64,
    pub money: i64,
    pub health: i32,
    pub max_health: i32,
    pub experience: i64,
    pub level: u32,
    pub status_effect: StatusEffect,
    /// End of a timed status effect, when one is active.
    pub effect_end: Option<DateTime<Utc>>,
}

impl PlayerState {
    /// A freshly registered player at `now`, positioned at `map_id`.
    #[must_use]
    pub fn register(player_id: u64, map_id: u32, now: DateTime<Utc>) -> Self {
        Self {
            player_id,
            map_id,
            previous_map_id: map_id,
            start_travel_date: None,
            last_report_at: now,
            next_event_id: None,
            completed_small_event_slots: SlotSet::new(),
            score: 0,
            weekly_score: 0,
            money: 0,
            health: DEFAULT_MAX_HEALTH,
            max_health: DEFAULT_MAX_HEALTH,
            experience: 0,
            level: 1,
            status_effect: StatusEffect::Newcomer,
            effect_end: None,
        }
    }

    /// Experience required to advance past the current level.
    #[must_use]
    pub fn experience_needed(&self) -> i64 {
        LEVEL_XP_BASE + LEVEL_XP_STEP * i64::from(self.level)
    }

    /// Whether accumulated experience crosses the current threshold.
    #[must_use]
    pub fn needs_level_up(&self) -> bool {
        self.experience >= self.experience_needed()
    }

    /// Apply a resolved outcome to the player.
    ///
    /// Health is clamped to `[0, max_health]`; a lost-time penalty pushes the
    /// effect window past `now`. Cascades are the orchestrator's concern and
    /// run separately after this.
    pub fn apply_deltas(&mut self, deltas: &DeltaSet, now: DateTime<Utc>) {
        self.score += deltas.score;
        self.weekly_score += deltas.score;
        self.money += deltas.money;
        self.add_health(deltas.health);
        self.experience += i64::from(deltas.experience);
        if let Some(effect) = deltas.status_effect {
            self.status_effect = effect;
        } else if self.status_effect == StatusEffect::Newcomer {
            self.status_effect = StatusEffect::None;
        }
        if deltas.next_event_id.is_some() {
            self.next_event_id = deltas.next_event_id;
        }
        self.set_last_report(now, deltas.lost_time);
    }

    /// Record the report resolution time, extending the effect window by any
    /// lost-time penalty.
    pub fn set_last_report(&mut self, now: DateTime<Utc>, lost_time: i64) {
        self.last_report_at = now;
        self.effect_end = if lost_time > 0 {
            Some(now + Duration::minutes(lost_time))
        } else {
            None
        };
    }

    /// Add (or subtract) health, clamped to `[0, max_health]`.
    pub fn add_health(&mut self, delta: i32) {
        self.health = self.health.saturating_add(delta).clamp(0, self.max_health);
    }

    /// Consume experience while thresholds are crossed, one level at a time.
    ///
    /// The threshold is recomputed from current state on every iteration; a
    /// single large gain may cross several levels.
    pub fn cascade_level_ups(&mut self) -> u32 {
        let mut gained = 0;
        while self.needs_level_up() {
            self.experience -= self.experience_needed();
            self.level += 1;
            self.add_health(LEVEL_UP_HEALTH_BONUS);
            gained += 1;
        }
        gained
    }

    /// Pronounce the player dead when health is exhausted.
    ///
    /// Returns true when the player is dead after the check.
    pub fn die_if_needed(&mut self) -> bool {
        if self.health <= 0 {
            self.status_effect = StatusEffect::Dead;
        }
        self.status_effect == StatusEffect::Dead
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn deltas() -> DeltaSet {
        DeltaSet {
            score: 30,
            money: 12,
            experience: 0,
            health: 0,
            lost_time: 0,
            status_effect: None,
            next_event_id: None,
            item_granted: false,
        }
    }

    #[test]
    fn apply_deltas_updates_score_and_weekly_score_together() {
        let mut player = PlayerState::register(1, 1, now());
        player.apply_deltas(&deltas(), now());
        assert_eq!(player.score, 30);
        assert_eq!(player.weekly_score, 30);
        assert_eq!(player.money, 12);
        assert_eq!(player.status_effect, StatusEffect::None);
    }

    #[test]
    fn lost_time_pushes_the_effect_window_forward() {
        let mut player = PlayerState::register(1, 1, now());
        let penalized = DeltaSet {
            lost_time: 45,
            status_effect: Some(StatusEffect::Occupied),
            ..deltas()
        };
        player.apply_deltas(&penalized, now());
        assert_eq!(player.status_effect, StatusEffect::Occupied);
        assert_eq!(player.effect_end, Some(now() + Duration::minutes(45)));
    }

    #[test]
    fn health_is_clamped_to_bounds() {
        let mut player = PlayerState::register(1, 1, now());
        player.add_health(50);
        assert_eq!(player.health, player.max_health);
        player.add_health(-500);
        assert_eq!(player.health, 0);
    }

    #[test]
    fn one_large_gain_crosses_multiple_levels() {
        let mut player = PlayerState::register(1, 1, now());
        // level 1 needs 75, level 2 needs 100; 200 xp crosses both.
        player.experience = 200;
        let gained = player.cascade_level_ups();
        assert_eq!(gained, 2);
        assert_eq!(player.level, 3);
        assert_eq!(player.experience, 25);
        assert!(!player.needs_level_up());
    }

    #[test]
    fn death_check_fires_on_exhausted_health() {
        let mut player = PlayerState::register(1, 1, now());
        player.health = 0;
        assert!(player.die_if_needed());
        assert_eq!(player.status_effect, StatusEffect::Dead);
        assert!(player.status_effect.blocks_report());
    }

    #[test]
    fn status_effect_round_trips_through_strings() {
        for effect in [
            StatusEffect::None,
            StatusEffect::Newcomer,
            StatusEffect::Occupied,
            StatusEffect::Dead,
        ] {
            assert_eq!(effect.as_str().parse::<StatusEffect>(), Ok(effect));
        }
        assert!("gone".parse::<StatusEffect>().is_err());
    }
}
