//! Map Configuration Rows
//!
//! One row per playable map in `MapsInfos_DT`. Spawn clustering and crowd
//! scoring read their parameters from here.

use serde::{Deserialize, Serialize};

use crate::asset::parser::GAME_ROOT_PREFIX;
use crate::core::vec3::Vec3;

/// Reference to another engine asset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetReference {
    /// Engine path, `None` when unset
    #[serde(rename = "AssetPathName")]
    pub asset_path_name: Option<String>,
    /// Sub-object path
    #[serde(rename = "SubPathString")]
    pub sub_path_string: Option<String>,
}

impl AssetReference {
    /// Check that the reference points somewhere.
    pub fn is_valid(&self) -> bool {
        self.asset_path_name
            .as_deref()
            .is_some_and(|path| !path.is_empty() && path != "None")
    }
}

/// Localizable display text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct LocalizedText {
    /// Localization namespace
    pub namespace: Option<String>,
    /// Localization key
    pub key: Option<String>,
    /// Untranslated text
    pub source_string: Option<String>,
    /// Translated text
    pub localized_string: Option<String>,
    /// String table holding the text
    pub table_id: Option<String>,
    /// Text that is never translated
    pub culture_invariant_string: Option<String>,
}

impl LocalizedText {
    /// Best available text: localized, source, invariant, then key.
    pub fn display_text(&self) -> &str {
        self.localized_string
            .as_deref()
            .or(self.source_string.as_deref())
            .or(self.culture_invariant_string.as_deref())
            .or(self.key.as_deref())
            .unwrap_or("")
    }
}

/// Crowd penalty applied per nearby player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStartScoreRule {
    /// Radius in world units
    #[serde(rename = "m_radius")]
    pub radius: f32,
    /// Penalty per player inside the radius
    #[serde(rename = "m_scorePerPlayerInRadius")]
    pub score_per_player_in_radius: i32,
}

/// Storm occlusion volumes used by map VFX.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfxMapInfo {
    // the exported key names carry the "Occusion" misspelling
    /// First occlusion volume centre
    #[serde(rename = "StormOccusionCenter01")]
    pub storm_occlusion_center_01: Vec3,
    /// First occlusion volume radius
    #[serde(rename = "StormOcclusionRadius01")]
    pub storm_occlusion_radius_01: f32,
    /// Second occlusion volume centre
    #[serde(rename = "StormOccusionCenter02")]
    pub storm_occlusion_center_02: Vec3,
    /// Second occlusion volume radius
    #[serde(rename = "StormOccusionRadius02")]
    pub storm_occlusion_radius_02: f32,
}

/// Map configuration row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapInfo {
    /// Persistent level of the map
    #[serde(rename = "m_persistentMap")]
    pub persistent_map: AssetReference,
    /// Minimum distance between accepted spawn points
    #[serde(rename = "m_playerStartClusterRadius")]
    pub player_start_cluster_radius: f32,
    /// Seconds before a used spawn cluster is reused
    #[serde(rename = "m_playerStartClusterCooldown")]
    pub player_start_cluster_cooldown: f32,
    /// Upper bound on a spawn score
    #[serde(rename = "m_maxScoreAllowed")]
    pub max_score_allowed: i32,
    /// Crowd scoring rules, applied in order
    #[serde(rename = "m_playerStartScoreRules")]
    pub player_start_score_rules: Vec<PlayerStartScoreRule>,
    /// Storm VFX volumes
    #[serde(rename = "m_VFXNiagaraMapInfo")]
    pub vfx_map_info: Option<VfxMapInfo>,
    /// Difficulty label
    #[serde(rename = "m_difficulty")]
    pub difficulty: Option<String>,
    /// Map has a void area
    #[serde(rename = "m_hasVoid")]
    pub has_void: bool,
    /// Map has an alien forge
    #[serde(rename = "m_containsAlienForge")]
    pub contains_alien_forge: bool,
    /// Listed in map selection
    #[serde(rename = "m_isVisible")]
    pub is_visible: bool,
    /// Display name
    #[serde(rename = "m_name")]
    pub name: Option<LocalizedText>,
    /// Display description
    #[serde(rename = "m_description")]
    pub description: Option<LocalizedText>,
    /// Selection tooltip
    #[serde(rename = "m_tooltip")]
    pub tooltip: Option<LocalizedText>,
    /// Preview image
    #[serde(rename = "m_image")]
    pub image: Option<AssetReference>,
    /// Map selection image
    #[serde(rename = "m_mapSelectionImage")]
    pub map_selection_image: Option<AssetReference>,
    /// Hologram material
    #[serde(rename = "m_hologramMaterial")]
    pub hologram_material: Option<AssetReference>,
}

impl MapInfo {
    /// Persistent level as a content-relative path (`/Game/` stripped).
    pub fn persistent_map_path(&self) -> Option<&str> {
        let path = self.persistent_map.asset_path_name.as_deref()?;
        if !self.persistent_map.is_valid() {
            return None;
        }
        Some(path.strip_prefix(GAME_ROOT_PREFIX).unwrap_or(path))
    }

    /// Display name, falling back to `fallback`.
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.name
            .as_ref()
            .map(LocalizedText::display_text)
            .filter(|text| !text.is_empty())
            .unwrap_or(fallback)
    }
}
