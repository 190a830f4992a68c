//! Generic Asset Object
//!
//! Base node for every entity reconstructed from an interchange document.

use std::fmt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::property::PropertyBag;

/// Class identifier as exported, plus its normalized short form.
///
/// Exports name classes either as engine paths (`UScriptClass'PlayerStart'`,
/// `/Script/Engine.PlayerStart`) or as blueprint paths
/// (`BlueprintGeneratedClass'/Game/Blueprints/BP_Spawn.BP_Spawn_C'`).
/// Both collapse to a short name (`PlayerStart`, `BP_Spawn`) computed once.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ClassName {
    raw: Option<String>,
    simple: String,
}

impl ClassName {
    /// Short name used when no class was exported.
    pub const UNKNOWN: &'static str = "Unknown";

    /// Normalize a raw class identifier.
    pub fn new(raw: Option<String>) -> Self {
        let simple = raw
            .as_deref()
            .map(simplify_class_name)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Self::UNKNOWN.to_string());
        Self { raw, simple }
    }

    /// Raw identifier as it appeared in the document.
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Normalized short name.
    pub fn simple(&self) -> &str {
        &self.simple
    }

    /// Loose type test: case-insensitive equality or containment.
    pub fn is_a(&self, class_name: &str) -> bool {
        if class_name.is_empty() {
            return false;
        }
        let simple = self.simple.to_ascii_lowercase();
        let wanted = class_name.to_ascii_lowercase();
        simple == wanted || simple.contains(&wanted)
    }
}

/// Strip the quoted wrapper, take the trailing path and dot segment, drop `_C`.
fn simplify_class_name(raw: &str) -> String {
    let mut name = raw.trim();

    // Prefix'inner' -> inner
    if let Some(open) = name.find('\'') {
        if name.len() > open + 1 && name.ends_with('\'') {
            name = &name[open + 1..name.len() - 1];
        }
    }

    if let Some(slash) = name.rfind('/') {
        name = &name[slash + 1..];
    }
    if let Some(dot) = name.rfind('.') {
        name = &name[dot + 1..];
    }
    if let Some(stripped) = name.strip_suffix("_C") {
        name = stripped;
    }

    name.to_string()
}

/// Generic object node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssetObject {
    /// Object name
    pub name: Option<String>,
    /// Class identifier (immutable after construction)
    class: ClassName,
    /// Asset path this object was loaded from
    pub asset_path: String,
    /// Object flags as exported
    pub flags: Option<String>,
    /// Dynamic properties
    pub properties: PropertyBag,
    /// Owned child objects
    pub children: Vec<AssetObject>,
}

impl AssetObject {
    /// Create an object with a normalized class.
    pub fn new(name: Option<String>, class: Option<String>, asset_path: impl Into<String>) -> Self {
        Self {
            name,
            class: ClassName::new(class),
            asset_path: asset_path.into(),
            flags: None,
            properties: PropertyBag::new(),
            children: Vec::new(),
        }
    }

    /// Class identifier.
    pub fn class(&self) -> &ClassName {
        &self.class
    }

    /// Normalized class name.
    pub fn simple_class_name(&self) -> &str {
        self.class.simple()
    }

    /// Loose class test (see [`ClassName::is_a`]).
    pub fn is_a(&self, class_name: &str) -> bool {
        self.class.is_a(class_name)
    }

    /// Best-effort property read, `default` on absence or mismatch.
    pub fn get_property<T: DeserializeOwned>(&self, name: &str, default: T) -> T {
        self.properties.get(name, default)
    }

    /// Set a property value.
    pub fn set_property<T: Serialize>(&mut self, name: impl Into<String>, value: T) {
        self.properties.set(name, value);
    }

    /// Check if a property exists.
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains(name)
    }
}

impl fmt::Display for AssetObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({})",
            self.simple_class_name(),
            self.name.as_deref().unwrap_or("Unnamed"),
            self.asset_path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(raw: &str) -> ClassName {
        ClassName::new(Some(raw.to_string()))
    }

    #[test]
    fn test_script_class_normalization() {
        assert_eq!(class("UScriptClass'PlayerStart'").simple(), "PlayerStart");
        assert_eq!(class("/Script/Engine.PlayerStart").simple(), "PlayerStart");
        assert_eq!(class("Actor").simple(), "Actor");
    }

    #[test]
    fn test_blueprint_class_normalization() {
        let c = class("BlueprintGeneratedClass'/Game/Blueprints/Spawns/BP_DropPod.BP_DropPod_C'");
        assert_eq!(c.simple(), "BP_DropPod");
        assert_eq!(class("BlueprintGeneratedClass'/Game/Foo/Bar_C'").simple(), "Bar");
        assert_eq!(
            c.raw(),
            Some("BlueprintGeneratedClass'/Game/Blueprints/Spawns/BP_DropPod.BP_DropPod_C'")
        );
    }

    #[test]
    fn test_missing_class_is_unknown() {
        assert_eq!(ClassName::new(None).simple(), ClassName::UNKNOWN);
        assert_eq!(class("  ").simple(), ClassName::UNKNOWN);
    }

    #[test]
    fn test_is_a_loose_match() {
        let c = class("UScriptClass'YPlayerStartSolo'");
        assert!(c.is_a("PlayerStart"));
        assert!(c.is_a("playerstart"));
        assert!(c.is_a("YPlayerStartSolo"));
        assert!(!c.is_a("Pawn"));
        assert!(!c.is_a(""));
    }

    #[test]
    fn test_properties_and_display() {
        let mut obj = AssetObject::new(
            Some("Crate_01".into()),
            Some("UScriptClass'StaticMeshActor'".into()),
            "Maps/Test",
        );
        obj.set_property("Health", 250);
        assert!(obj.has_property("Health"));
        assert_eq!(obj.get_property("Health", 0i32), 250);
        assert_eq!(obj.get_property("Armor", 5i32), 5);
        assert_eq!(obj.to_string(), "StaticMeshActor: Crate_01 (Maps/Test)");
    }
}
