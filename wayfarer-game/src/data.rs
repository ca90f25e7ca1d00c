use serde::{Deserialize, Serialize};

use crate::constants::END_REACTION_LABEL;
use crate::state::StatusEffect;

/// A story event reached at the end of a travel leg.
///
/// `text_key` is an opaque localization key; rendering belongs to the
/// transport. The reaction set always contains the implicit `end` label used
/// for the no-reaction/timeout outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BigEvent {
    pub id: u32,
    pub text_key: String,
    #[serde(default = "default_reactions")]
    pub reactions: Vec<String>,
}

fn default_reactions() -> Vec<String> {
    vec![END_REACTION_LABEL.to_string()]
}

impl BigEvent {
    /// Reaction labels the transport should display, excluding the implicit
    /// timeout label.
    pub fn visible_reactions(&self) -> impl Iterator<Item = &str> {
        self.reactions
            .iter()
            .map(String::as_str)
            .filter(|label| *label != END_REACTION_LABEL)
    }

    /// Whether `label` is a valid resolution for this event.
    #[must_use]
    pub fn accepts(&self, label: &str) -> bool {
        self.reactions.iter().any(|reaction| reaction == label)
    }
}

/// One weighted outcome of a `(event, reaction)` pair.
///
/// Several possibilities may share the same key; the pool is resolved with a
/// uniform pick at outcome time. Optional fields stay `None` when the record
/// does not override them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Possibility {
    pub event_id: u32,
    pub label: String,
    pub text_key: String,
    #[serde(default)]
    pub money: i32,
    #[serde(default)]
    pub experience: i32,
    #[serde(default)]
    pub health: i32,
    #[serde(default)]
    pub lost_time: i64,
    #[serde(default)]
    pub status_effect: Option<StatusEffect>,
    #[serde(default)]
    pub next_event_id: Option<u32>,
    #[serde(default)]
    pub item_granted: bool,
}

/// Catalog entry for a rarity-weighted small flavor event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmallEventSpec {
    pub id: String,
    #[serde(default = "default_rarity")]
    pub rarity: u32,
}

fn default_rarity() -> u32 {
    5
}

/// Container for all report catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EventCatalog {
    #[serde(default)]
    pub big_events: Vec<BigEvent>,
    #[serde(default)]
    pub possibilities: Vec<Possibility>,
    #[serde(default)]
    pub small_events: Vec<SmallEventSpec>,
    #[serde(default)]
    pub destinations: Vec<MapLink>,
}

/// Directed link between two map locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapLink {
    pub from: u32,
    pub to: u32,
}

impl EventCatalog {
    /// Create an empty catalog (useful for tests).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load catalog data from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into valid catalog data.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Look up a big event by id.
    #[must_use]
    pub fn big_event(&self, id: u32) -> Option<&BigEvent> {
        self.big_events.iter().find(|event| event.id == id)
    }

    /// All catalog event ids, in catalog order.
    #[must_use]
    pub fn big_event_ids(&self) -> Vec<u32> {
        self.big_events.iter().map(|event| event.id).collect()
    }

    /// The possibility pool for a `(event, label)` pair, in catalog order.
    #[must_use]
    pub fn possibilities(&self, event_id: u32, label: &str) -> Vec<Possibility> {
        self.possibilities
            .iter()
            .filter(|possibility| possibility.event_id == event_id && possibility.label == label)
            .cloned()
            .collect()
    }

    /// Destinations reachable from a map location, in catalog order.
    #[must_use]
    pub fn reachable_destinations(&self, map_id: u32) -> Vec<u32> {
        self.destinations
            .iter()
            .filter(|link| link.from == map_id)
            .map(|link| link.to)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_parses_from_json_with_field_defaults() {
        let json = r#"{
            "big_events": [
                {
                    "id": 12,
                    "text_key": "event.12",
                    "reactions": ["sword", "flee", "end"]
                }
            ],
            "possibilities": [
                {
                    "event_id": 12,
                    "label": "sword",
                    "text_key": "event.12.sword.win",
                    "money": 40,
                    "experience": 5
                }
            ],
            "small_events": [
                { "id": "find_item", "rarity": 3 },
                { "id": "nothing" }
            ]
        }"#;

        let catalog = EventCatalog::from_json(json).unwrap();
        assert_eq!(catalog.big_events.len(), 1);
        assert_eq!(catalog.big_event(12).unwrap().text_key, "event.12");
        let pool = catalog.possibilities(12, "sword");
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].money, 40);
        assert_eq!(pool[0].health, 0);
        assert!(pool[0].status_effect.is_none());
        assert_eq!(catalog.small_events[1].rarity, 5);
    }

    #[test]
    fn visible_reactions_hide_the_end_label() {
        let event = BigEvent {
            id: 3,
            text_key: "event.3".to_string(),
            reactions: vec!["left".to_string(), "right".to_string(), "end".to_string()],
        };
        let visible: Vec<_> = event.visible_reactions().collect();
        assert_eq!(visible, vec!["left", "right"]);
        assert!(event.accepts("end"));
        assert!(!event.accepts("up"));
    }

    #[test]
    fn reachable_destinations_follow_links() {
        let catalog = EventCatalog {
            destinations: vec![
                MapLink { from: 1, to: 2 },
                MapLink { from: 1, to: 5 },
                MapLink { from: 2, to: 1 },
            ],
            ..EventCatalog::default()
        };
        assert_eq!(catalog.reachable_destinations(1), vec![2, 5]);
        assert_eq!(catalog.reachable_destinations(9), Vec::<u32>::new());
    }
}
