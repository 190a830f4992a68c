//! Export Record Classification
//!
//! Pure predicates over raw export records. Exports are loosely typed, so the
//! parser never trusts a single field: level detection is a weighted score
//! and actor detection is a shape test.
//!
//! ## Level score signals
//!
//! | Signal | Weight |
//! |---|---|
//! | `Type` is `World` or `Level` | 100 |
//! | class mentions `uworld` | 60 |
//! | class mentions `world` | 50 |
//! | class mentions `level` | 40 |
//! | has `PersistentLevel` | 30 |
//! | name mentions `PersistentLevel` | 25 |
//! | has `StreamingLevels` | 20 |
//! | has `WorldSettings` | 20 |
//! | has `Actors` | 15 |

use serde_json::{Map, Value};

/// Explicit `Type` discriminator.
pub const KEY_TYPE: &str = "Type";
/// Class identifier.
pub const KEY_CLASS: &str = "Class";
/// Object name.
pub const KEY_NAME: &str = "Name";
/// Persistent level container.
pub const KEY_PERSISTENT_LEVEL: &str = "PersistentLevel";
/// Streaming sublevel list.
pub const KEY_STREAMING_LEVELS: &str = "StreamingLevels";
/// World settings block.
pub const KEY_WORLD_SETTINGS: &str = "WorldSettings";
/// Level script actor reference.
pub const KEY_LEVEL_SCRIPT_ACTOR: &str = "LevelScriptActor";
/// Direct actor list.
pub const KEY_ACTORS: &str = "Actors";
/// Property block.
pub const KEY_PROPERTIES: &str = "Properties";
/// Actor transform.
pub const KEY_TRANSFORM: &str = "Transform";
/// Actor root component.
pub const KEY_ROOT_COMPONENT: &str = "RootComponent";

/// Asset paths under this prefix are maps.
pub const MAP_PATH_PREFIX: &str = "Maps/";

/// One weighted level signal.
pub struct LevelSignal {
    /// Signal name, for logging
    pub name: &'static str,
    /// Score contribution when the predicate holds
    pub weight: i32,
    /// Predicate over the record
    pub test: fn(&Map<String, Value>) -> bool,
}

/// All level signals, applied additively.
pub const LEVEL_SIGNALS: &[LevelSignal] = &[
    LevelSignal { name: "type_world_or_level", weight: 100, test: type_is_world_or_level },
    LevelSignal { name: "class_uworld", weight: 60, test: class_mentions_uworld },
    LevelSignal { name: "class_world", weight: 50, test: class_mentions_world },
    LevelSignal { name: "class_level", weight: 40, test: class_mentions_level },
    LevelSignal { name: "has_persistent_level", weight: 30, test: has_persistent_level },
    LevelSignal { name: "name_persistent_level", weight: 25, test: name_mentions_persistent_level },
    LevelSignal { name: "has_streaming_levels", weight: 20, test: has_streaming_levels },
    LevelSignal { name: "has_world_settings", weight: 20, test: has_world_settings },
    LevelSignal { name: "has_actors", weight: 15, test: has_actors },
];

/// String field, `None` when absent or not a string.
pub fn str_field<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

fn type_is_world_or_level(record: &Map<String, Value>) -> bool {
    matches!(str_field(record, KEY_TYPE), Some("World") | Some("Level"))
}

fn class_contains(record: &Map<String, Value>, needle: &str) -> bool {
    str_field(record, KEY_CLASS).is_some_and(|class| class.to_ascii_lowercase().contains(needle))
}

fn class_mentions_uworld(record: &Map<String, Value>) -> bool {
    class_contains(record, "uworld")
}

fn class_mentions_world(record: &Map<String, Value>) -> bool {
    class_contains(record, "world")
}

fn class_mentions_level(record: &Map<String, Value>) -> bool {
    class_contains(record, "level")
}

fn has_persistent_level(record: &Map<String, Value>) -> bool {
    record.contains_key(KEY_PERSISTENT_LEVEL)
}

fn has_streaming_levels(record: &Map<String, Value>) -> bool {
    record.contains_key(KEY_STREAMING_LEVELS)
}

fn has_world_settings(record: &Map<String, Value>) -> bool {
    record.contains_key(KEY_WORLD_SETTINGS)
}

fn has_actors(record: &Map<String, Value>) -> bool {
    record.contains_key(KEY_ACTORS)
}

fn name_mentions_persistent_level(record: &Map<String, Value>) -> bool {
    str_field(record, KEY_NAME).is_some_and(|name| name.contains("PersistentLevel"))
}

/// Level likelihood of an export record.
pub fn level_score(record: &Map<String, Value>) -> i32 {
    LEVEL_SIGNALS
        .iter()
        .filter(|signal| (signal.test)(record))
        .map(|signal| signal.weight)
        .sum()
}

/// Index of the best level candidate in an export array.
///
/// Highest score wins; ties go to the earliest record. Records that are not
/// objects, or score zero, are never selected.
pub fn select_level_candidate(records: &[Value]) -> Option<(usize, i32)> {
    let mut best: Option<(usize, i32)> = None;

    for (index, record) in records.iter().enumerate() {
        let Some(object) = record.as_object() else {
            continue;
        };
        let score = level_score(object);
        if score > best.map_or(0, |(_, s)| s) {
            best = Some((index, score));
        }
    }

    best
}

/// True for paths under the map content root.
pub fn is_map_path(asset_path: &str) -> bool {
    asset_path
        .get(..MAP_PATH_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(MAP_PATH_PREFIX))
}

/// Whether a single record should be built as a level.
pub fn is_level_record(record: &Map<String, Value>, asset_path: &str) -> bool {
    type_is_world_or_level(record)
        || class_contains(record, "world")
        || class_contains(record, "level")
        || is_map_path(asset_path)
        || [
            KEY_PERSISTENT_LEVEL,
            KEY_STREAMING_LEVELS,
            KEY_LEVEL_SCRIPT_ACTOR,
            KEY_WORLD_SETTINGS,
        ]
        .iter()
        .any(|key| record.contains_key(*key))
}

/// Whether a record looks like a placed actor.
pub fn is_actor_shaped(record: &Map<String, Value>) -> bool {
    let Some(class) = str_field(record, KEY_CLASS).filter(|c| !c.is_empty()) else {
        return false;
    };

    let class = class.to_ascii_lowercase();
    ["actor", "pawn", "playerstart", "character"]
        .iter()
        .any(|needle| class.contains(needle))
        || record.contains_key(KEY_TRANSFORM)
        || record.contains_key(KEY_ROOT_COMPONENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_level_score_signals() {
        assert_eq!(level_score(&obj(json!({"Type": "World"}))), 100);
        // "UScriptClass'World'" hits world only
        assert_eq!(level_score(&obj(json!({"Class": "UScriptClass'World'"}))), 50);
        // "UWorld" hits uworld + world
        assert_eq!(level_score(&obj(json!({"Class": "UWorld"}))), 110);
        assert_eq!(level_score(&obj(json!({"Class": "UScriptClass'Level'"}))), 40);
        assert_eq!(
            level_score(&obj(json!({
                "PersistentLevel": {},
                "StreamingLevels": [],
                "WorldSettings": {},
                "Actors": []
            }))),
            85
        );
        assert_eq!(level_score(&obj(json!({"Name": "PersistentLevel_1"}))), 25);
        assert_eq!(level_score(&obj(json!({"Type": "StaticMesh"}))), 0);
    }

    #[test]
    fn test_select_highest_score() {
        let records = vec![
            json!({"Type": "StaticMesh"}),
            json!({"Actors": []}),
            json!({"Type": "Level", "Name": "PersistentLevel"}),
            json!("not an object"),
        ];
        assert_eq!(select_level_candidate(&records), Some((2, 125)));
    }

    #[test]
    fn test_select_tie_prefers_first() {
        let records = vec![
            json!({"Type": "Other"}),
            json!({"Type": "World", "Name": "A"}),
            json!({"Type": "Level", "Name": "B"}),
        ];
        assert_eq!(select_level_candidate(&records), Some((1, 100)));
    }

    #[test]
    fn test_select_none_when_all_zero() {
        let records = vec![json!({"Type": "Texture2D"}), json!({"Name": "Foo"})];
        assert_eq!(select_level_candidate(&records), None);
        assert_eq!(select_level_candidate(&[]), None);
    }

    #[test]
    fn test_map_path() {
        assert!(is_map_path("Maps/MP/MAP01/MP_Map01_P"));
        assert!(is_map_path("maps/Station"));
        assert!(!is_map_path("DataTables/MapsInfos_DT"));
        assert!(!is_map_path("Map"));
    }

    #[test]
    fn test_level_record_detection() {
        assert!(is_level_record(&obj(json!({"Type": "Level"})), "Other/Path"));
        assert!(is_level_record(&obj(json!({"Class": "UScriptClass'World'"})), "Other/Path"));
        assert!(is_level_record(&obj(json!({})), "Maps/Any"));
        assert!(is_level_record(&obj(json!({"LevelScriptActor": {}})), "Other/Path"));
        assert!(!is_level_record(&obj(json!({"Type": "Actor"})), "Other/Path"));
    }

    #[test]
    fn test_actor_shape() {
        assert!(is_actor_shaped(&obj(json!({"Class": "UScriptClass'PlayerStart'"}))));
        assert!(is_actor_shaped(&obj(json!({"Class": "BP_Enemy_Character_C"}))));
        assert!(is_actor_shaped(&obj(json!({"Class": "Thing", "Transform": {}}))));
        assert!(is_actor_shaped(&obj(json!({"Class": "Thing", "RootComponent": {}}))));
        assert!(!is_actor_shaped(&obj(json!({"Class": "Material"}))));
        // class is required even when a transform is present
        assert!(!is_actor_shaped(&obj(json!({"Transform": {}}))));
    }

    fn record_strategy() -> impl Strategy<Value = Value> {
        (
            prop::option::of(prop::sample::select(vec!["World", "Level", "Actor", "StaticMesh"])),
            prop::option::of(prop::sample::select(vec!["UWorld", "UScriptClass'Level'", "Actor"])),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(ty, class, persistent, actors)| {
                let mut map = Map::new();
                if let Some(ty) = ty {
                    map.insert(KEY_TYPE.into(), json!(ty));
                }
                if let Some(class) = class {
                    map.insert(KEY_CLASS.into(), json!(class));
                }
                if persistent {
                    map.insert(KEY_PERSISTENT_LEVEL.into(), json!({}));
                }
                if actors {
                    map.insert(KEY_ACTORS.into(), json!([]));
                }
                Value::Object(map)
            })
    }

    proptest! {
        #[test]
        fn test_selection_picks_max_regardless_of_order(
            records in prop::collection::vec(record_strategy(), 1..12),
            rotate in 0usize..12,
        ) {
            let scores: Vec<i32> = records
                .iter()
                .map(|r| level_score(r.as_object().unwrap()))
                .collect();
            let max = *scores.iter().max().unwrap();

            let mut rotated = records.clone();
            let len = rotated.len();
            rotated.rotate_left(rotate % len);

            match select_level_candidate(&rotated) {
                Some((index, score)) => {
                    prop_assert_eq!(score, max);
                    let first_max = rotated
                        .iter()
                        .position(|r| level_score(r.as_object().unwrap()) == max)
                        .unwrap();
                    prop_assert_eq!(index, first_max);
                }
                None => prop_assert_eq!(max, 0),
            }
        }
    }
}
