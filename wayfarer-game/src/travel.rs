//! Travel-leg state tracking.
//!
//! Elapsed travel time is always derived from `start_travel_date`, never
//! stored, so it stays monotonic for the lifetime of a leg.

use chrono::{DateTime, Duration, Utc};

use crate::numbers::i64_to_f64;
use crate::state::PlayerState;

/// Whether the player is currently on a travel leg.
#[must_use]
pub fn is_travelling(state: &PlayerState) -> bool {
    state.start_travel_date.is_some()
}

/// Time elapsed since the current leg started; `None` when not travelling.
#[must_use]
pub fn elapsed_travel_time(state: &PlayerState, now: DateTime<Utc>) -> Option<Duration> {
    state.start_travel_date.map(|started| now - started)
}

/// True when the leg has run at least the full big-event interval.
#[must_use]
pub fn has_reached_big_event_threshold(
    state: &PlayerState,
    now: DateTime<Utc>,
    interval: Duration,
) -> bool {
    elapsed_travel_time(state, now).is_some_and(|elapsed| elapsed >= interval)
}

/// Begin a new travel leg toward `destination`.
///
/// Resets the completed small-event slots; a new leg gets fresh windows.
pub fn start_travel(state: &mut PlayerState, destination: u32, now: DateTime<Utc>) {
    state.previous_map_id = state.map_id;
    state.map_id = destination;
    state.start_travel_date = Some(now);
    state.completed_small_event_slots.clear();
}

/// Mark the player as arrived.
pub fn stop_travel(state: &mut PlayerState) {
    state.start_travel_date = None;
}

/// Travel progression as a percentage with two decimals, clamped to
/// `[0, 100]`.
#[must_use]
pub fn progress_percent(state: &PlayerState, now: DateTime<Utc>, interval: Duration) -> f64 {
    let Some(elapsed) = elapsed_travel_time(state, now) else {
        return 0.0;
    };
    let interval_ms = interval.num_milliseconds();
    if interval_ms <= 0 {
        return 0.0;
    }
    let ratio = i64_to_f64(elapsed.num_milliseconds()) / i64_to_f64(interval_ms);
    let percent = (10_000.0 * ratio).floor() / 100.0;
    percent.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn travelling_since(minutes_ago: i64) -> PlayerState {
        let mut player = PlayerState::register(1, 1, now() - Duration::hours(12));
        start_travel(&mut player, 2, now() - Duration::minutes(minutes_ago));
        player
    }

    #[test]
    fn threshold_is_inclusive_at_the_exact_interval() {
        let interval = Duration::minutes(120);
        let player = travelling_since(120);
        assert!(has_reached_big_event_threshold(&player, now(), interval));
        let early = travelling_since(119);
        assert!(!has_reached_big_event_threshold(&early, now(), interval));
    }

    #[test]
    fn starting_a_leg_resets_slots_and_tracks_origin() {
        let mut player = PlayerState::register(1, 7, now());
        player.completed_small_event_slots.push(2);
        start_travel(&mut player, 9, now());
        assert_eq!(player.previous_map_id, 7);
        assert_eq!(player.map_id, 9);
        assert!(player.completed_small_event_slots.is_empty());
        assert!(is_travelling(&player));

        stop_travel(&mut player);
        assert!(!is_travelling(&player));
        assert_eq!(elapsed_travel_time(&player, now()), None);
    }

    #[test]
    fn progress_percent_floors_to_two_decimals_and_clamps() {
        let interval = Duration::minutes(120);
        let third = travelling_since(40);
        assert!((progress_percent(&third, now(), interval) - 33.33).abs() < 1e-9);

        let overdue = travelling_since(500);
        assert!((progress_percent(&overdue, now(), interval) - 100.0).abs() < f64::EPSILON);

        let idle = PlayerState::register(1, 1, now());
        assert!((progress_percent(&idle, now(), interval) - 0.0).abs() < f64::EPSILON);
    }
}
