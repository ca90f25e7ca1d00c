//! Random selection primitives shared by every event-selection path.
//!
//! All draws route through a caller-supplied [`rand::Rng`] so that tests can
//! reproduce any selection sequence from a fixed seed.

use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use sha2::Sha256;
use std::cell::{RefCell, RefMut};
use thiserror::Error;

/// Errors raised by the selection primitives. These indicate catalog or
/// caller faults and must propagate rather than be silently defaulted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("invalid range: min {min} exceeds max {max}")]
    InvalidRange { min: i64, max: i64 },
    #[error("cannot pick from an empty collection")]
    EmptyCollection,
}

/// Draw a uniformly distributed integer in `[min, max]` (both inclusive).
///
/// # Errors
///
/// Returns `SelectionError::InvalidRange` when `min > max`.
pub fn uniform_int<R: rand::Rng>(rng: &mut R, min: i64, max: i64) -> Result<i64, SelectionError> {
    if min > max {
        return Err(SelectionError::InvalidRange { min, max });
    }
    Ok(rng.gen_range(min..=max))
}

/// Pick one entry with probability proportional to its weight.
///
/// Cumulative sums are accumulated in slice order; the draw is taken in
/// `[1, total]` and the first entry whose running sum reaches it wins, so a
/// fixed iteration order plus a fixed RNG seed reproduces the same pick.
///
/// # Errors
///
/// Returns `SelectionError::EmptyCollection` when the slice is empty or all
/// weights are zero.
pub fn weighted_pick<'a, T, R: rand::Rng>(
    rng: &mut R,
    entries: &'a [(T, u32)],
) -> Result<&'a T, SelectionError> {
    let total: u64 = entries.iter().map(|(_, weight)| u64::from(*weight)).sum();
    if total == 0 {
        return Err(SelectionError::EmptyCollection);
    }

    let roll = rng.gen_range(1..=total);
    let mut cumulative = 0_u64;
    for (value, weight) in entries {
        cumulative += u64::from(*weight);
        if cumulative >= roll {
            return Ok(value);
        }
    }

    entries
        .first()
        .map(|(value, _)| value)
        .ok_or(SelectionError::EmptyCollection)
}

/// Pick one element with equal probability.
///
/// # Errors
///
/// Returns `SelectionError::EmptyCollection` on empty input.
pub fn uniform_pick<'a, T, R: rand::Rng>(
    rng: &mut R,
    items: &'a [T],
) -> Result<&'a T, SelectionError> {
    if items.is_empty() {
        return Err(SelectionError::EmptyCollection);
    }
    let index = rng.gen_range(0..items.len());
    Ok(&items[index])
}

/// Deterministic bundle of RNG streams segregated by selection domain.
///
/// Keeping the domains on independent streams means a change in how many
/// draws one path consumes cannot shift the outcomes of another.
#[derive(Debug, Clone)]
pub struct RngBundle {
    event: RefCell<CountingRng<SmallRng>>,
    small_event: RefCell<CountingRng<SmallRng>>,
    reward: RefCell<CountingRng<SmallRng>>,
    travel: RefCell<CountingRng<SmallRng>>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        let event = CountingRng::new(derive_stream_seed(seed, b"event"));
        let small_event = CountingRng::new(derive_stream_seed(seed, b"small_event"));
        let reward = CountingRng::new(derive_stream_seed(seed, b"reward"));
        let travel = CountingRng::new(derive_stream_seed(seed, b"travel"));
        Self {
            event: RefCell::new(event),
            small_event: RefCell::new(small_event),
            reward: RefCell::new(reward),
            travel: RefCell::new(travel),
        }
    }

    /// Access the big-event selection stream.
    #[must_use]
    pub fn event(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.event.borrow_mut()
    }

    /// Access the small-event selection stream.
    #[must_use]
    pub fn small_event(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.small_event.borrow_mut()
    }

    /// Access the reward/penalty computation stream.
    #[must_use]
    pub fn reward(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.reward.borrow_mut()
    }

    /// Access the destination/advice stream.
    #[must_use]
    pub fn travel(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.travel.borrow_mut()
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let seed_bytes: [u8; 8] = digest[..8].try_into().expect("digest slice length");
    u64::from_le_bytes(seed_bytes)
}
