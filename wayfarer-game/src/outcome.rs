//! Big-event selection and outcome resolution.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    BOOTSTRAP_EVENT_ID, END_REACTION_LABEL, MONEY_LEVEL_DIVISOR, SCORE_LEVEL_DIVISOR,
    SENTINEL_EVENT_ID,
};
use crate::data::Possibility;
use crate::numbers::{i64_to_f64, round_f64_to_i64};
use crate::random::{SelectionError, uniform_int, uniform_pick};
use crate::state::{PlayerState, StatusEffect};

/// Errors raised while resolving an event outcome. These are data-integrity
/// faults in the catalog, not user-facing retry cases.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OutcomeError {
    #[error("no possibility found for event {event_id} label '{label}'")]
    NoPossibilityFound { event_id: u32, label: String },
    #[error("unknown big event {event_id}")]
    UnknownEvent { event_id: u32 },
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// Net effect of a resolved possibility on the player.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeltaSet {
    pub score: i64,
    pub money: i64,
    pub experience: i32,
    pub health: i32,
    /// Minutes of travel time lost to the outcome.
    pub lost_time: i64,
    pub status_effect: Option<StatusEffect>,
    pub next_event_id: Option<u32>,
    pub item_granted: bool,
}

/// Result of resolving a possibility pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The bootstrap event ended without a reaction; nothing applies.
    Terminal,
    /// A concrete possibility was drawn from the pool.
    Chosen(Possibility),
}

/// Choose the big event to run.
///
/// A chained override on the player wins and is consumed; an explicit force
/// (ops/test) comes next; otherwise one id is drawn uniformly from the
/// catalog ids strictly between the bootstrap and sentinel ids.
///
/// # Errors
///
/// Returns `SelectionError::EmptyCollection` when no selectable id exists.
pub fn select_big_event_id<R: rand::Rng>(
    rng: &mut R,
    state: &mut PlayerState,
    catalog_ids: &[u32],
    force: Option<u32>,
) -> Result<u32, SelectionError> {
    if let Some(chained) = state.next_event_id.take() {
        return Ok(chained);
    }
    if let Some(forced) = force {
        return Ok(forced);
    }
    let eligible: Vec<u32> = catalog_ids
        .iter()
        .copied()
        .filter(|id| *id > BOOTSTRAP_EVENT_ID && *id < SENTINEL_EVENT_ID)
        .collect();
    uniform_pick(rng, &eligible).copied()
}

/// Resolve the possibility pool for `(event_id, label)`.
///
/// The sole `(bootstrap, end)` entry short-circuits as a terminal no-op; any
/// other pool is resolved with a uniform pick.
///
/// # Errors
///
/// Returns `OutcomeError::NoPossibilityFound` on an empty pool.
pub fn resolve_outcome<R: rand::Rng>(
    rng: &mut R,
    event_id: u32,
    label: &str,
    pool: &[Possibility],
) -> Result<Resolution, OutcomeError> {
    if pool.is_empty() {
        log::error!("possibility pool missing for event {event_id} label '{label}'");
        return Err(OutcomeError::NoPossibilityFound {
            event_id,
            label: label.to_string(),
        });
    }
    if pool.len() == 1
        && pool[0].event_id == BOOTSTRAP_EVENT_ID
        && pool[0].label == END_REACTION_LABEL
    {
        return Ok(Resolution::Terminal);
    }
    let possibility = uniform_pick(rng, pool)?;
    Ok(Resolution::Chosen(possibility.clone()))
}

/// Compute the reward/penalty deltas for a chosen possibility.
///
/// Random components scale with elapsed minutes and level; a negative bound
/// degrades the draw to zero rather than erroring, so very low-level players
/// with no elapsed time still resolve. A negative base money that randomness
/// would flip positive is clamped to half the base, keeping the outcome a
/// penalty.
///
/// # Errors
///
/// Propagates `SelectionError` from the underlying draws.
pub fn compute_deltas<R: rand::Rng>(
    rng: &mut R,
    possibility: &Possibility,
    elapsed_minutes: i64,
    level: u32,
    forced_score: Option<i64>,
) -> Result<DeltaSet, SelectionError> {
    let score = match forced_score {
        Some(forced) if forced != 0 => forced,
        _ => {
            let bound = elapsed_minutes / SCORE_LEVEL_DIVISOR + i64::from(level) - 1;
            let roll = if bound >= 0 {
                uniform_int(rng, 0, bound)?
            } else {
                0
            };
            elapsed_minutes + roll
        }
    };

    let money_bound =
        elapsed_minutes / SCORE_LEVEL_DIVISOR + i64::from(level) / MONEY_LEVEL_DIVISOR - 1;
    let money_roll = if money_bound >= 0 {
        uniform_int(rng, 0, money_bound)?
    } else {
        0
    };
    let travel_bonus = round_f64_to_i64(
        i64_to_f64(elapsed_minutes) / i64_to_f64(SCORE_LEVEL_DIVISOR) + i64_to_f64(money_roll),
    );
    let mut money = i64::from(possibility.money) + travel_bonus;
    if possibility.money < 0 && money > 0 {
        money = round_f64_to_i64(f64::from(possibility.money) / 2.0);
    }

    Ok(DeltaSet {
        score,
        money,
        experience: possibility.experience,
        health: possibility.health,
        lost_time: possibility.lost_time,
        status_effect: possibility.status_effect,
        next_event_id: possibility.next_event_id,
        item_granted: possibility.item_granted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::from_seed([9u8; 32])
    }

    fn possibility(money: i32) -> Possibility {
        Possibility {
            event_id: 4,
            label: "sword".to_string(),
            text_key: "event.4.sword".to_string(),
            money,
            experience: 10,
            health: -3,
            lost_time: 0,
            status_effect: None,
            next_event_id: None,
            item_granted: false,
        }
    }

    #[test]
    fn chained_event_wins_and_is_consumed() {
        let mut player = crate::state::PlayerState::register(1, 1, chrono::Utc::now());
        player.next_event_id = Some(17);
        let id = select_big_event_id(&mut rng(), &mut player, &[1, 2, 3], Some(5)).unwrap();
        assert_eq!(id, 17);
        assert_eq!(player.next_event_id, None);
    }

    #[test]
    fn random_selection_excludes_reserved_ids() {
        let mut player = crate::state::PlayerState::register(1, 1, chrono::Utc::now());
        let ids = [0, 3, 8, 9999];
        let mut sampler = rng();
        for _ in 0..64 {
            let id = select_big_event_id(&mut sampler, &mut player, &ids, None).unwrap();
            assert!(id == 3 || id == 8, "reserved id {id} selected");
        }
    }

    #[test]
    fn only_reserved_ids_means_no_selection() {
        let mut player = crate::state::PlayerState::register(1, 1, chrono::Utc::now());
        assert_eq!(
            select_big_event_id(&mut rng(), &mut player, &[0, 9999], None),
            Err(SelectionError::EmptyCollection)
        );
    }

    #[test]
    fn bootstrap_end_pool_is_terminal() {
        let pool = [Possibility {
            event_id: 0,
            label: "end".to_string(),
            text_key: "event.0.end".to_string(),
            money: 0,
            experience: 0,
            health: 0,
            lost_time: 0,
            status_effect: None,
            next_event_id: None,
            item_granted: false,
        }];
        assert_eq!(
            resolve_outcome(&mut rng(), 0, "end", &pool),
            Ok(Resolution::Terminal)
        );
    }

    #[test]
    fn empty_pool_is_a_data_fault() {
        let result = resolve_outcome(&mut rng(), 4, "flee", &[]);
        assert_eq!(
            result,
            Err(OutcomeError::NoPossibilityFound {
                event_id: 4,
                label: "flee".to_string(),
            })
        );
    }

    #[test]
    fn negative_base_money_stays_a_penalty() {
        // elapsed/10 = 144 always exceeds the 100-coin penalty, so the raw
        // delta is positive on every draw and the clamp must trigger.
        let deltas =
            compute_deltas(&mut rng(), &possibility(-100), 1440, 10, None).unwrap();
        assert_eq!(deltas.money, -50);
    }

    #[test]
    fn fresh_player_with_no_elapsed_time_does_not_crash() {
        let deltas = compute_deltas(&mut rng(), &possibility(0), 0, 1, None).unwrap();
        assert!(deltas.score >= 0);
        assert_eq!(deltas.experience, 10);
        assert_eq!(deltas.health, -3);
    }

    #[test]
    fn degenerate_bounds_degrade_the_draw_to_zero() {
        // level 1, elapsed 0: money bound is negative, score bound is zero.
        let deltas = compute_deltas(&mut rng(), &possibility(7), 0, 1, None).unwrap();
        assert_eq!(deltas.score, 0);
        assert_eq!(deltas.money, 7);
    }

    #[test]
    fn forced_score_bypasses_the_random_component() {
        let deltas = compute_deltas(&mut rng(), &possibility(0), 60, 3, Some(100)).unwrap();
        assert_eq!(deltas.score, 100);
    }

    #[test]
    fn score_stays_within_the_documented_bounds() {
        let elapsed = 120_i64;
        let level: u32 = 5;
        let bound = elapsed / 10 + i64::from(level) - 1;
        let mut sampler = rng();
        for _ in 0..256 {
            let deltas =
                compute_deltas(&mut sampler, &possibility(0), elapsed, level, None).unwrap();
            assert!(deltas.score >= elapsed);
            assert!(deltas.score <= elapsed + bound);
        }
    }

    #[test]
    fn passthrough_fields_are_untouched() {
        let mut source = possibility(5);
        source.lost_time = 30;
        source.status_effect = Some(StatusEffect::Occupied);
        source.next_event_id = Some(21);
        source.item_granted = true;
        let deltas = compute_deltas(&mut rng(), &source, 60, 2, None).unwrap();
        assert_eq!(deltas.lost_time, 30);
        assert_eq!(deltas.status_effect, Some(StatusEffect::Occupied));
        assert_eq!(deltas.next_event_id, Some(21));
        assert!(deltas.item_granted);
    }
}
