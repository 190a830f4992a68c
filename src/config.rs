//! World Configuration
//!
//! Plain values supplied at construction time. Only the binary reads the
//! environment, through [`WorldConfig::from_env`].

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::asset::source::FsSource;
use crate::core::vec3::Vec3;
use crate::data::service::DEFAULT_PLAYER_TUNING_ID;
use crate::world::grid::GridCellId;
use crate::world::movement::MovementValidation;
use crate::world::spawn::DEFAULT_DUPLICATE_THRESHOLD;

/// Highest tick rate with a whole-microsecond period.
pub const MAX_TICK_RATE: u32 = 1_000_000;

/// Configuration for one world instance.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Root of the exported content tree.
    pub assets_path: PathBuf,
    /// Content domain under `assets_path`.
    pub content_domain: String,
    /// Map id in the map table.
    pub map_id: String,
    /// Game mode id in the game mode table.
    pub game_mode: String,
    /// Player tuning row.
    pub player_tuning_id: String,
    /// Persistent level path. Resolved from the map config when unset.
    pub level_path: Option<String>,
    /// Tick rate for the world loop (Hz).
    pub tick_rate: u32,
    /// Grid cells loaded with the level and never evicted.
    pub core_cells: Vec<GridCellId>,
    /// Spawn candidates closer than this are duplicates.
    pub duplicate_threshold: f32,
    /// Spawn position when no candidate is available.
    pub fallback_spawn: Vec3,
    /// No accepted movement for this long marks a player idle.
    pub idle_threshold: Duration,
    /// Movement tolerances.
    pub movement: MovementValidation,
    /// Pending command capacity of the world task.
    pub command_buffer: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            assets_path: PathBuf::from("Exports"),
            content_domain: FsSource::DEFAULT_DOMAIN.to_string(),
            map_id: "Map01".to_string(),
            game_mode: "LOOP".to_string(),
            player_tuning_id: DEFAULT_PLAYER_TUNING_ID.to_string(),
            level_path: None,
            tick_rate: crate::TICK_RATE,
            core_cells: GridCellId::CORE.to_vec(),
            duplicate_threshold: DEFAULT_DUPLICATE_THRESHOLD,
            fallback_spawn: Vec3::new(0.0, 0.0, 100.0),
            idle_threshold: Duration::from_secs(60),
            movement: MovementValidation::default(),
            command_buffer: 256,
        }
    }
}

impl WorldConfig {
    /// Load overrides from environment variables.
    ///
    /// `ASSETS_PATH`, `DEFAULT_MAP`, `GAME_MODE`, `TICK_RATE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("ASSETS_PATH").filter(|v| !v.is_empty()) {
            config.assets_path = PathBuf::from(path);
        }
        if let Some(map_id) = lookup("DEFAULT_MAP").filter(|v| !v.is_empty()) {
            config.map_id = map_id;
        }
        if let Some(game_mode) = lookup("GAME_MODE").filter(|v| !v.is_empty()) {
            config.game_mode = game_mode;
        }
        if let Some(raw) = lookup("TICK_RATE") {
            match raw.parse::<u32>() {
                Ok(rate) if (1..=MAX_TICK_RATE).contains(&rate) => config.tick_rate = rate,
                _ => warn!("Ignoring invalid TICK_RATE {:?}", raw),
            }
        }

        config
    }

    /// Time between ticks. Never zero.
    pub fn tick_duration(&self) -> Duration {
        let rate = self.tick_rate.clamp(1, MAX_TICK_RATE);
        Duration::from_micros(1_000_000 / u64::from(rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_world_config_default() {
        let config = WorldConfig::default();
        assert_eq!(config.map_id, "Map01");
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.core_cells.len(), 4);
        assert_eq!(config.fallback_spawn, Vec3::new(0.0, 0.0, 100.0));
        assert_eq!(config.tick_duration(), Duration::from_micros(16_666));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ASSETS_PATH", "/srv/exports"),
            ("DEFAULT_MAP", "Map02"),
            ("TICK_RATE", "30"),
        ]
        .into_iter()
        .collect();

        let config = WorldConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.assets_path, PathBuf::from("/srv/exports"));
        assert_eq!(config.map_id, "Map02");
        assert_eq!(config.game_mode, "LOOP");
        assert_eq!(config.tick_rate, 30);
    }

    #[test]
    fn test_invalid_tick_rate_keeps_default() {
        let config = WorldConfig::from_lookup(|key| (key == "TICK_RATE").then(|| "fast".to_string()));
        assert_eq!(config.tick_rate, 60);
        let config = WorldConfig::from_lookup(|key| (key == "TICK_RATE").then(|| "0".to_string()));
        assert_eq!(config.tick_rate, 60);
        let config = WorldConfig::from_lookup(|key| (key == "TICK_RATE").then(|| "2000000".to_string()));
        assert_eq!(config.tick_rate, 60);
    }

    #[test]
    fn test_tick_duration_never_zero() {
        let config = WorldConfig {
            tick_rate: 2_000_000,
            ..WorldConfig::default()
        };
        assert_eq!(config.tick_duration(), Duration::from_micros(1));

        let config = WorldConfig {
            tick_rate: 0,
            ..WorldConfig::default()
        };
        assert_eq!(config.tick_duration(), Duration::from_secs(1));
    }
}
