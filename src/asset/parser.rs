//! Interchange Parser
//!
//! Loads interchange documents by asset path and rebuilds the typed object
//! graph. Each path is read at most once: cache slots are shared
//! `OnceCell`s, so concurrent first loads of the same path wait on a single
//! read instead of racing.
//!
//! ## Dispatch
//!
//! ```text
//! document
//!   ├── array of exports ── best level score > 0 ──► Level (+ sibling actors)
//!   │                    ├─ map path ──────────────► Level (first record)
//!   │                    └─ otherwise ─────────────► first record, single-object rules
//!   └── single object ──── level-like ─────────────► Level
//!                       ├─ DataTable / StaticMesh ─► Object
//!                       ├─ Actor / Pawn / PlayerStart ► Actor
//!                       └─ anything else ──────────► Object (properties copied)
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument, warn};

use crate::asset::actor::{ActorObject, ReplicationInfo, Transform};
use crate::asset::classify::{
    is_actor_shaped, is_level_record, is_map_path, select_level_candidate, str_field, KEY_ACTORS,
    KEY_CLASS, KEY_NAME, KEY_PERSISTENT_LEVEL, KEY_PROPERTIES, KEY_STREAMING_LEVELS,
    KEY_TRANSFORM, KEY_TYPE,
};
use crate::asset::level::LevelObject;
use crate::asset::object::AssetObject;
use crate::asset::source::{AssetSource, FsSource};
use crate::core::property::PropertyBag;

/// Engine content root stripped by [`resolve_asset_reference`].
pub const GAME_ROOT_PREFIX: &str = "/Game/";

const KEY_FLAGS: &str = "Flags";
const KEY_ROWS: &str = "Rows";
const KEY_COMPONENTS: &str = "Components";
const KEY_TAGS: &str = "Tags";
const KEY_CHILDREN: &str = "Children";
const KEY_PACKAGE_NAME: &str = "PackageName";

// ============================================================================
// Parsed assets
// ============================================================================

/// A parsed asset. Cached values are shared, never copied.
#[derive(Clone, Debug, PartialEq)]
pub enum Asset {
    /// Generic object (data tables, meshes, unrecognized types)
    Object(Arc<AssetObject>),
    /// Placed actor
    Actor(Arc<ActorObject>),
    /// Level or world
    Level(Arc<LevelObject>),
}

impl Asset {
    /// Base object data.
    pub fn object(&self) -> &AssetObject {
        match self {
            Asset::Object(object) => object.as_ref(),
            Asset::Actor(actor) => &actor.object,
            Asset::Level(level) => &level.object,
        }
    }

    /// The level, if this asset is one.
    pub fn as_level(&self) -> Option<&Arc<LevelObject>> {
        match self {
            Asset::Level(level) => Some(level),
            _ => None,
        }
    }

    /// The actor, if this asset is one.
    pub fn as_actor(&self) -> Option<&Arc<ActorObject>> {
        match self {
            Asset::Actor(actor) => Some(actor),
            _ => None,
        }
    }

    /// Short kind label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Asset::Object(_) => "object",
            Asset::Actor(_) => "actor",
            Asset::Level(_) => "level",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Level(level) => fmt::Display::fmt(level.as_ref(), f),
            other => fmt::Display::fmt(other.object(), f),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Asset loading errors. A missing document is not an error.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// The document exists but could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Document location
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// The document is not valid JSON.
    #[error("Malformed document {path}: {source}")]
    Malformed {
        /// Document location
        path: String,
        /// Parse error
        source: serde_json::Error,
    },
}

/// Why a cache slot stayed empty.
enum LoadMiss {
    NotFound,
    Failed(AssetError),
}

// ============================================================================
// Parser
// ============================================================================

/// Cache statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Fully loaded entries
    pub entries: usize,
    /// Loads currently in flight
    pub in_flight: usize,
}

type Slot = Arc<OnceCell<Asset>>;

/// Path-keyed, single-flight asset loader.
pub struct AssetParser {
    /// Document source
    source: Arc<dyn AssetSource>,
    /// Normalized path -> load slot
    cache: Mutex<HashMap<String, Slot>>,
}

impl AssetParser {
    /// Create a parser over any document source.
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Create a parser over `<base>/<domain>` on disk.
    pub fn from_fs(base: impl AsRef<std::path::Path>, domain: impl AsRef<std::path::Path>) -> Self {
        Self::new(Arc::new(FsSource::new(base, domain)))
    }

    /// Load an asset by relative path.
    ///
    /// `Ok(None)` when the document does not exist. Successful loads are
    /// cached; misses and errors are not, so a later call retries.
    #[instrument(skip(self))]
    pub async fn load_asset(&self, path: &str) -> Result<Option<Asset>, AssetError> {
        let key = normalize_path(path);
        if key.is_empty() {
            warn!("Empty asset path");
            return Ok(None);
        }

        let slot = {
            let mut cache = self.cache.lock().await;
            cache.entry(key.clone()).or_default().clone()
        };

        match slot.get_or_try_init(|| self.read_document(&key)).await {
            Ok(asset) => Ok(Some(asset.clone())),
            Err(miss) => {
                self.forget(&key, &slot).await;
                match miss {
                    LoadMiss::NotFound => Ok(None),
                    LoadMiss::Failed(e) => Err(e),
                }
            }
        }
    }

    /// Load an asset and return it only if it is a level.
    pub async fn load_level(&self, path: &str) -> Result<Option<Arc<LevelObject>>, AssetError> {
        match self.load_asset(path).await? {
            Some(Asset::Level(level)) => Ok(Some(level)),
            Some(other) => {
                warn!("Asset {} is a {}, not a level", path, other.kind());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Drop one cached asset. Returns whether it was cached.
    pub async fn evict(&self, path: &str) -> bool {
        self.cache.lock().await.remove(&normalize_path(path)).is_some()
    }

    /// Drop every cached asset.
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.lock().await;
        let count = cache.len();
        cache.clear();
        info!("Cleared asset cache ({} entries)", count);
    }

    /// Current cache statistics.
    pub async fn cache_stats(&self) -> CacheStats {
        let cache = self.cache.lock().await;
        let entries = cache.values().filter(|slot| slot.initialized()).count();
        CacheStats {
            entries,
            in_flight: cache.len() - entries,
        }
    }

    async fn read_document(&self, key: &str) -> Result<Asset, LoadMiss> {
        let location = self.source.locate(key);
        let text = match self.source.read(key).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                warn!("Asset file not found: {}", location);
                return Err(LoadMiss::NotFound);
            }
            Err(source) => {
                return Err(LoadMiss::Failed(AssetError::Io {
                    path: location,
                    source,
                }))
            }
        };

        let document: Value = serde_json::from_str(&text).map_err(|source| {
            LoadMiss::Failed(AssetError::Malformed {
                path: location.clone(),
                source,
            })
        })?;

        let asset = build_asset(&document, key);
        info!("Loaded {} as {}: {}", key, asset.kind(), asset);
        Ok(asset)
    }

    /// Remove a slot left empty by a failed load, unless it was replaced.
    async fn forget(&self, key: &str, slot: &Slot) {
        let mut cache = self.cache.lock().await;
        if let Some(current) = cache.get(key) {
            if Arc::ptr_eq(current, slot) && !current.initialized() {
                cache.remove(key);
            }
        }
    }
}

/// Cache key for a relative asset path.
fn normalize_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    let path = path.trim_start_matches('/');
    path.strip_suffix(".json").unwrap_or(path).to_string()
}

/// Map an engine reference (`/Game/Maps/X/Foo_P.Foo_P`) to a relative asset
/// path (`Maps/X/Foo_P`). `None` for an empty reference.
pub fn resolve_asset_reference(engine_path: &str) -> Option<String> {
    let trimmed = engine_path.trim();
    let path = trimmed
        .strip_prefix(GAME_ROOT_PREFIX)
        .unwrap_or(trimmed)
        .trim_start_matches('/');
    if path.is_empty() {
        return None;
    }

    let base_start = path.rfind('/').map_or(0, |slash| slash + 1);
    if let Some(dot) = path.rfind('.') {
        if dot > base_start && path[base_start..dot] == path[dot + 1..] {
            return Some(path[..dot].to_string());
        }
    }

    Some(path.to_string())
}

// ============================================================================
// Builders
// ============================================================================

/// Build an asset from a parsed document. Never fails: unrecognized shapes
/// become generic objects.
pub fn build_asset(document: &Value, path: &str) -> Asset {
    match document {
        Value::Array(records) => build_from_exports(records, path),
        Value::Object(record) => build_from_record(record, path),
        other => {
            warn!("Unexpected document root in {}: {}", path, json_kind(other));
            Asset::Object(Arc::new(AssetObject::new(None, None, path)))
        }
    }
}

fn build_from_exports(records: &[Value], path: &str) -> Asset {
    let objects: Vec<(usize, &Map<String, Value>)> = records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| record.as_object().map(|object| (index, object)))
        .collect();

    // Only map paths hold a level somewhere in the array
    let level_index = if is_map_path(path) {
        match select_level_candidate(records) {
            Some((index, score)) => {
                debug!("Selected export {} of {} as level (score {})", index, records.len(), score);
                Some(index)
            }
            None => objects.first().map(|(index, _)| *index),
        }
    } else {
        None
    };

    if let Some(level_index) = level_index {
        let level = &records[level_index];
        let siblings: Vec<&Map<String, Value>> = objects
            .iter()
            .filter(|(index, _)| *index != level_index)
            .map(|(_, object)| *object)
            .collect();
        if let Some(record) = level.as_object() {
            return Asset::Level(Arc::new(build_level(record, path, &siblings)));
        }
    }

    match objects.first() {
        Some((_, record)) => build_from_record(record, path),
        None => {
            warn!("No object exports in {}", path);
            Asset::Object(Arc::new(AssetObject::new(None, None, path)))
        }
    }
}

fn build_from_record(record: &Map<String, Value>, path: &str) -> Asset {
    if is_level_record(record, path) {
        return Asset::Level(Arc::new(build_level(record, path, &[])));
    }

    match str_field(record, KEY_TYPE) {
        Some("DataTable") => Asset::Object(Arc::new(build_data_table(record, path))),
        Some("StaticMesh") => Asset::Object(Arc::new(build_object(record, path))),
        Some("Actor") | Some("Pawn") | Some("PlayerStart") => {
            Asset::Actor(Arc::new(build_actor(record, path)))
        }
        other => {
            if let Some(kind) = other {
                debug!("Generic object for type {} in {}", kind, path);
            }
            Asset::Object(Arc::new(build_object(record, path)))
        }
    }
}

/// Base object: name, class, flags, a copy of `Properties`, and children.
fn build_object(record: &Map<String, Value>, path: &str) -> AssetObject {
    let mut object = AssetObject::new(
        str_field(record, KEY_NAME).map(str::to_string),
        str_field(record, KEY_CLASS).map(str::to_string),
        path,
    );
    object.flags = str_field(record, KEY_FLAGS).map(str::to_string);
    if let Some(Value::Object(properties)) = record.get(KEY_PROPERTIES) {
        object.properties = PropertyBag::from_map(properties.clone());
    }
    if let Some(Value::Array(children)) = record.get(KEY_CHILDREN) {
        object.children = children
            .iter()
            .filter_map(Value::as_object)
            .map(|child| build_object(child, path))
            .collect();
    }
    object
}

fn build_data_table(record: &Map<String, Value>, path: &str) -> AssetObject {
    let mut object = build_object(record, path);
    if let Some(rows) = record.get(KEY_ROWS) {
        object.properties.insert_raw(KEY_ROWS, rows.clone());
    }
    object
}

fn build_actor(record: &Map<String, Value>, path: &str) -> ActorObject {
    let object = build_object(record, path);

    let transform = record
        .get(KEY_TRANSFORM)
        .or_else(|| object.properties.get_raw(KEY_TRANSFORM))
        .and_then(|value| match Transform::deserialize(value) {
            Ok(transform) => Some(transform),
            Err(e) => {
                debug!("Ignoring unreadable transform on {}: {}", object, e);
                None
            }
        })
        .unwrap_or_default();

    let components = match record.get(KEY_COMPONENTS) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .map(|component| build_object(component, path))
            .collect(),
        _ => Vec::new(),
    };

    let tags: BTreeSet<String> = record
        .get(KEY_TAGS)
        .or_else(|| object.properties.get_raw(KEY_TAGS))
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let replication = ReplicationInfo {
        replicates: object.get_property("bReplicates", false),
        replicate_movement: object.get_property("bReplicateMovement", false),
        net_cull_distance_squared: object.get_property(
            "NetCullDistanceSquared",
            ReplicationInfo::DEFAULT_CULL_DISTANCE_SQUARED,
        ),
        net_update_frequency: object
            .get_property("NetUpdateFrequency", ReplicationInfo::DEFAULT_UPDATE_FREQUENCY),
    };

    ActorObject {
        object,
        transform,
        components,
        tags,
        replication,
    }
}

fn build_level(record: &Map<String, Value>, path: &str, siblings: &[&Map<String, Value>]) -> LevelObject {
    let object = build_object(record, path);

    let mut actors = Vec::new();
    collect_actors(record, path, &mut actors);
    for sibling in siblings {
        if is_actor_shaped(sibling) {
            actors.push(build_actor(sibling, path));
        } else {
            collect_actors(sibling, path, &mut actors);
        }
    }

    let streaming_levels = record
        .get(KEY_STREAMING_LEVELS)
        .or_else(|| object.properties.get_raw(KEY_STREAMING_LEVELS))
        .map(streaming_level_names)
        .unwrap_or_default();

    LevelObject::new(object, actors, streaming_levels)
}

/// Gather actors from a level-like container, in document order.
fn collect_actors(record: &Map<String, Value>, path: &str, out: &mut Vec<ActorObject>) {
    if let Some(Value::Array(items)) = record.get(KEY_ACTORS) {
        for item in items.iter().filter_map(Value::as_object) {
            if !is_bare_reference(item) {
                out.push(build_actor(item, path));
            }
        }
    }

    match record.get(KEY_PERSISTENT_LEVEL) {
        Some(Value::Object(inner)) => collect_actors(inner, path, out),
        Some(Value::Array(items)) => {
            for inner in items.iter().filter_map(Value::as_object) {
                collect_actors(inner, path, out);
            }
        }
        _ => {}
    }

    if let Some(Value::Object(properties)) = record.get(KEY_PROPERTIES) {
        for value in properties.values() {
            match value {
                Value::Array(items) => {
                    for item in items.iter().filter_map(Value::as_object) {
                        if is_actor_shaped(item) {
                            out.push(build_actor(item, path));
                        }
                    }
                }
                Value::Object(item) if is_actor_shaped(item) => out.push(build_actor(item, path)),
                _ => {}
            }
        }
    }
}

/// `{"ObjectName": .., "ObjectPath": ..}` pointers carry no actor data.
fn is_bare_reference(record: &Map<String, Value>) -> bool {
    record.contains_key("ObjectPath") && !record.contains_key(KEY_CLASS) && !record.contains_key(KEY_TYPE)
}

fn streaming_level_names(value: &Value) -> Vec<String> {
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(name) => Some(name.clone()),
            Value::Object(fields) => str_field(fields, KEY_PACKAGE_NAME).map(str::to_string),
            _ => None,
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::source::MemorySource;
    use std::time::Duration;

    const LEVEL_DOC: &str = r#"{
        "Type": "Level",
        "Name": "PersistentLevel",
        "Class": "UScriptClass'Level'",
        "Actors": [
            {"Name": "PlayerStart_0", "Class": "UScriptClass'PlayerStart'",
             "Transform": {"Translation": {"X": 100, "Y": 0, "Z": 50}}}
        ],
        "PersistentLevel": {
            "Actors": [{"Name": "Light", "Class": "UScriptClass'PointLight'"}]
        },
        "Properties": {
            "Spawns": [
                {"Name": "PlayerStart_1", "Class": "UScriptClass'PlayerStart'",
                 "Transform": {"Translation": {"X": -100}}},
                {"Name": "Mat", "Class": "Material"}
            ],
            "Boss": {"Name": "Boss", "Class": "BP_Boss_Character_C"}
        },
        "StreamingLevels": [{"PackageName": "/Game/Maps/Test/Sub_A"}, "/Game/Maps/Test/Sub_B"]
    }"#;

    const EXPORTS_DOC: &str = r#"[
        {"Type": "StaticMesh", "Name": "Rock"},
        {"Type": "PlayerStart", "Name": "PS_A", "Class": "UScriptClass'PlayerStart'",
         "Transform": {"Translation": {"X": 10, "Y": 20, "Z": 30}}},
        {"Type": "Level", "Name": "PersistentLevel",
         "Actors": [{"ObjectName": "PS_A", "ObjectPath": "Maps/Arr/Arr_P.0"}]},
        {"Type": "PlayerStart", "Name": "PS_B", "Class": "UScriptClass'PlayerStart'"}
    ]"#;

    fn parser(source: MemorySource) -> (AssetParser, Arc<MemorySource>) {
        let source = Arc::new(source);
        (AssetParser::new(source.clone()), source)
    }

    fn names(level: &LevelObject) -> Vec<String> {
        level
            .actors()
            .iter()
            .map(|a| a.name.clone().unwrap_or_default())
            .collect()
    }

    #[tokio::test]
    async fn test_level_actor_discovery() {
        let (parser, _) = parser(MemorySource::with(&[("Maps/Test/Test_P", LEVEL_DOC)]));
        let level = parser.load_level("Maps/Test/Test_P").await.unwrap().unwrap();

        assert_eq!(names(&level), vec!["PlayerStart_0", "Light", "PlayerStart_1", "Boss"]);
        assert_eq!(level.player_starts().len(), 2);
        assert_eq!(level.actors()[0].location().x, 100.0);
        assert_eq!(level.actors()[2].location().x, -100.0);
        assert_eq!(
            level.streaming_levels,
            vec!["/Game/Maps/Test/Sub_A", "/Game/Maps/Test/Sub_B"]
        );
    }

    #[tokio::test]
    async fn test_export_array_selects_level_and_siblings() {
        let (parser, _) = parser(MemorySource::with(&[("Maps/Arr/Arr_P", EXPORTS_DOC)]));
        let asset = parser.load_asset("Maps/Arr/Arr_P").await.unwrap().unwrap();
        let level = asset.as_level().unwrap();

        assert_eq!(level.name.as_deref(), Some("PersistentLevel"));
        // bare references are skipped; sibling actors are collected
        assert_eq!(names(level), vec!["PS_A", "PS_B"]);
        assert_eq!(level.actors()[0].location().z, 30.0);
    }

    #[tokio::test]
    async fn test_non_map_array_uses_first_record() {
        let doc = r#"[{"Type": "StaticMesh", "Name": "Rock"}, {"Type": "StaticMesh", "Name": "Tree"}]"#;
        let (parser, _) = parser(MemorySource::with(&[("Meshes/Rocks", doc)]));
        let asset = parser.load_asset("Meshes/Rocks").await.unwrap().unwrap();
        assert!(matches!(&asset, Asset::Object(o) if o.name.as_deref() == Some("Rock")));
    }

    #[test]
    fn test_non_map_array_ignores_level_records() {
        let doc = serde_json::json!([
            {"Type": "StaticMesh", "Name": "Rock"},
            {"Type": "Level", "Name": "Lvl"}
        ]);
        let asset = build_asset(&doc, "Meshes/Pack");
        assert!(asset.as_level().is_none());
        assert!(matches!(&asset, Asset::Object(o) if o.name.as_deref() == Some("Rock")));
    }

    #[tokio::test]
    async fn test_map_array_without_signals_is_level() {
        let doc = r#"[{"Name": "Thing"}, {"Name": "PS", "Class": "UScriptClass'PlayerStart'"}]"#;
        let (parser, _) = parser(MemorySource::with(&[("Maps/Bare", doc)]));
        let level = parser.load_level("Maps/Bare").await.unwrap().unwrap();
        assert_eq!(level.name.as_deref(), Some("Thing"));
        assert_eq!(names(&level), vec!["PS"]);
    }

    #[tokio::test]
    async fn test_single_object_dispatch() {
        let (parser, _) = parser(MemorySource::with(&[
            ("Audio/Boom", r#"{"Type": "SoundCue", "Name": "Boom", "Properties": {"Volume": 0.5}}"#),
            ("DataTables/T", r#"{"Type": "DataTable", "Name": "T", "Rows": {"A": {}}}"#),
            (
                "Blueprints/Spawn",
                r#"{"Type": "PlayerStart", "Name": "PS", "Class": "UScriptClass'PlayerStart'",
                    "Components": [{"Name": "Capsule", "Class": "UScriptClass'CapsuleComponent'"}],
                    "Tags": ["Solo", "Squad"],
                    "Properties": {"bReplicates": true, "NetUpdateFrequency": 10}}"#,
            ),
        ]));

        let sound = parser.load_asset("Audio/Boom").await.unwrap().unwrap();
        assert_eq!(sound.kind(), "object");
        assert_eq!(sound.object().get_property("Volume", 0.0f64), 0.5);

        let table = parser.load_asset("DataTables/T").await.unwrap().unwrap();
        assert!(table.object().has_property("Rows"));

        let spawn = parser.load_asset("Blueprints/Spawn").await.unwrap().unwrap();
        let actor = spawn.as_actor().unwrap();
        assert!(actor.component_by_class("Capsule").is_some());
        assert!(actor.has_tag("Squad"));
        assert!(actor.replication.replicates);
        assert!(!actor.replication.replicate_movement);
        assert_eq!(actor.replication.net_update_frequency, 10.0);
        assert_eq!(actor.transform, Transform::default());
    }

    #[tokio::test]
    async fn test_idempotent_cache() {
        let (parser, source) = parser(MemorySource::with(&[("Maps/Test/Test_P", LEVEL_DOC)]));

        let first = parser.load_level("Maps/Test/Test_P").await.unwrap().unwrap();
        let second = parser.load_level("/Maps/Test/Test_P.json").await.unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.reads(), 1);
        assert_eq!(parser.cache_stats().await, CacheStats { entries: 1, in_flight: 0 });

        assert!(parser.evict("Maps/Test/Test_P").await);
        assert!(!parser.evict("Maps/Test/Test_P").await);
        parser.load_level("Maps/Test/Test_P").await.unwrap();
        assert_eq!(source.reads(), 2);

        parser.clear_cache().await;
        let third = parser.load_level("Maps/Test/Test_P").await.unwrap().unwrap();
        assert_eq!(*first, *third);
        assert_eq!(source.reads(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_first_loads_share_one_read() {
        let source = MemorySource::with(&[("Maps/Test/Test_P", LEVEL_DOC)])
            .delayed(Duration::from_millis(20));
        let (parser, source) = parser(source);

        let (a, b) = tokio::join!(
            parser.load_asset("Maps/Test/Test_P"),
            parser.load_asset("Maps/Test/Test_P")
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(source.reads(), 1);
    }

    #[tokio::test]
    async fn test_missing_is_not_cached() {
        let (parser, source) = parser(MemorySource::default());

        assert!(parser.load_asset("Maps/Nowhere").await.unwrap().is_none());
        assert!(parser.load_asset("Maps/Nowhere").await.unwrap().is_none());
        assert_eq!(source.reads(), 2);
        assert_eq!(parser.cache_stats().await, CacheStats::default());
    }

    #[tokio::test]
    async fn test_malformed_document_is_error() {
        let (parser, _) = parser(MemorySource::with(&[("Maps/Broken", "{ not json")]));
        let result = parser.load_asset("Maps/Broken").await;
        assert!(matches!(result, Err(AssetError::Malformed { .. })));
    }

    #[test]
    fn test_unexpected_root_is_generic() {
        let asset = build_asset(&Value::from(42), "Odd/Path");
        assert_eq!(asset.kind(), "object");
        assert_eq!(asset.object().asset_path, "Odd/Path");
    }

    #[test]
    fn test_resolve_asset_reference() {
        assert_eq!(
            resolve_asset_reference("/Game/Maps/MP/MAP01/MP_Map01_P.MP_Map01_P").as_deref(),
            Some("Maps/MP/MAP01/MP_Map01_P")
        );
        assert_eq!(
            resolve_asset_reference("/Game/Maps/Station/Station_P").as_deref(),
            Some("Maps/Station/Station_P")
        );
        assert_eq!(
            resolve_asset_reference("/Game/Blueprints/BP_Pod.BP_Pod_C").as_deref(),
            Some("Blueprints/BP_Pod.BP_Pod_C")
        );
        assert_eq!(resolve_asset_reference("/Game/"), None);
        assert_eq!(resolve_asset_reference("  "), None);
    }
}
