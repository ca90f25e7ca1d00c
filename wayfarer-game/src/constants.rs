//! Centralized balance and tuning constants for Wayfarer game logic.
//!
//! These values define the deterministic math for the report loop.
//! Keeping them together ensures that gameplay can only be adjusted via
//! code changes reviewed in version control, rather than through external
//! JSON assets.

// Message keys -------------------------------------------------------------
pub(crate) const MSG_EVENT_PROMPT: &str = "report.event.prompt";
pub(crate) const MSG_EVENT_RESULT: &str = "report.event.result";
pub(crate) const MSG_BOOTSTRAP_END: &str = "report.event.bootstrap-end";
pub(crate) const MSG_DESTINATION_PROMPT: &str = "report.destination.prompt";
pub(crate) const MSG_DESTINATION_CHOSEN: &str = "report.destination.chosen";
pub(crate) const MSG_SMALL_EVENT: &str = "report.small-event";
pub(crate) const MSG_TRAVEL_PATH: &str = "report.travel.path";
pub(crate) const MSG_LEVEL_UP: &str = "report.level-up";
pub(crate) const MSG_DEATH: &str = "report.death";

// Advice tips shown under the travel path display. Rendering is the
// transport's concern; the engine only ever picks a key.
pub(crate) const ADVICE_KEYS: [&str; 6] = [
    "report.advice.rest",
    "report.advice.supplies",
    "report.advice.guild",
    "report.advice.shop",
    "report.advice.daily",
    "report.advice.patience",
];

// Reserved catalog ids -----------------------------------------------------
/// Bootstrap event resolved on a player's very first report.
pub const BOOTSTRAP_EVENT_ID: u32 = 0;
/// Reserved sentinel id; never selected at random.
pub const SENTINEL_EVENT_ID: u32 = 9999;
/// Reaction label of the implicit no-reaction/timeout outcome.
pub const END_REACTION_LABEL: &str = "end";

// Report pacing ------------------------------------------------------------
pub(crate) const DEFAULT_BIG_EVENT_INTERVAL_MINS: i64 = 120;
pub(crate) const DEFAULT_SMALL_EVENT_COUNT: u8 = 4;
pub(crate) const DEFAULT_REACTION_TIMEOUT_SECS: u64 = 120;
pub(crate) const DEFAULT_COOLDOWN_MILLIS: u64 = 500;
pub(crate) const DEFAULT_TIME_LIMIT_MINS: i64 = 1440;
pub(crate) const DEFAULT_TIME_MAX_MINS: i64 = 120;

// Reward tuning ------------------------------------------------------------
pub(crate) const BOOTSTRAP_FORCED_SCORE: i64 = 100;
pub(crate) const SCORE_LEVEL_DIVISOR: i64 = 10;
pub(crate) const MONEY_LEVEL_DIVISOR: i64 = 5;

// Progression tuning -------------------------------------------------------
pub(crate) const LEVEL_XP_BASE: i64 = 50;
pub(crate) const LEVEL_XP_STEP: i64 = 25;
pub(crate) const LEVEL_UP_HEALTH_BONUS: i32 = 10;
pub(crate) const DEFAULT_MAX_HEALTH: i32 = 100;

// Destination prompt -------------------------------------------------------
pub(crate) const DESTINATION_CHOICE_LABELS: [&str; 9] =
    ["1", "2", "3", "4", "5", "6", "7", "8", "9"];
