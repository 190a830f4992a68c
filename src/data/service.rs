//! Game Data Service
//!
//! Holds the map, game mode and player tuning tables as one generation.
//! Readers take a snapshot `Arc`; a reload builds a complete new generation
//! before swapping it in, so no reader ever mixes tables from two loads.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::data::map_info::MapInfo;
use crate::data::table::{DataError, DataTable, DataTableLoader};
use crate::data::tuning::{GameModeTuning, PlayerTuning};

/// Map configuration table.
pub const MAPS_INFOS_TABLE: &str = "MapsInfos_DT";

/// Game mode tuning table.
pub const GAME_MODE_TUNING_TABLE: &str = "GameModeTuning_DT";

/// Player tuning table.
pub const PLAYER_TUNING_TABLE: &str = "PlayerTuning_DT";

/// Player tuning row used when none is named.
pub const DEFAULT_PLAYER_TUNING_ID: &str = "Default";

/// One consistent generation of all game data tables.
#[derive(Debug, Default)]
pub struct GameDataSet {
    /// Load counter, 0 before the first load
    pub generation: u64,
    /// Map configurations by map id
    pub maps: Arc<DataTable<MapInfo>>,
    /// Game mode tuning by mode id
    pub game_modes: Arc<DataTable<GameModeTuning>>,
    /// Player tuning by tuning id
    pub player_tuning: Arc<DataTable<PlayerTuning>>,
}

impl GameDataSet {
    /// Map configuration by id.
    pub fn map_info(&self, map_id: &str) -> Option<&MapInfo> {
        self.maps.get(map_id)
    }

    /// Game mode tuning by id.
    pub fn game_mode_tuning(&self, game_mode: &str) -> Option<&GameModeTuning> {
        self.game_modes.get(game_mode)
    }

    /// Player tuning by id, else the first row, else engine defaults.
    pub fn player_tuning(&self, tuning_id: &str) -> PlayerTuning {
        if let Some(tuning) = self.player_tuning.get(tuning_id) {
            return tuning.clone();
        }
        if let Some((name, tuning)) = self.player_tuning.first() {
            info!("Using player tuning {} for {}", name, tuning_id);
            return tuning.clone();
        }
        warn!("No PlayerTuning found, using defaults");
        PlayerTuning::default()
    }
}

/// Game data tables with atomic reload.
pub struct GameDataService {
    loader: DataTableLoader,
    current: RwLock<Arc<GameDataSet>>,
}

impl GameDataService {
    /// Create an empty service. Call [`initialize`](Self::initialize) before use.
    pub fn new(loader: DataTableLoader) -> Self {
        Self {
            loader,
            current: RwLock::new(Arc::new(GameDataSet::default())),
        }
    }

    /// Load every table. Missing tables become empty; malformed ones fail.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<(), DataError> {
        info!("Initializing GameDataService...");
        self.load_generation().await?;
        info!("GameDataService initialized");
        Ok(())
    }

    /// Clear the table cache and load a fresh generation.
    ///
    /// On error the previous generation stays published.
    #[instrument(skip(self))]
    pub async fn reload_all(&self) -> Result<(), DataError> {
        info!("Reloading all data tables...");
        self.loader.clear_cache().await;
        self.load_generation().await?;
        info!("Data tables reloaded");
        Ok(())
    }

    async fn load_generation(&self) -> Result<(), DataError> {
        let maps = self.load_or_empty::<MapInfo>(MAPS_INFOS_TABLE, "map").await?;
        let game_modes = self
            .load_or_empty::<GameModeTuning>(GAME_MODE_TUNING_TABLE, "game mode")
            .await?;
        let player_tuning = self
            .load_or_empty::<PlayerTuning>(PLAYER_TUNING_TABLE, "player tuning")
            .await?;

        let mut current = self.current.write().await;
        let generation = current.generation + 1;
        *current = Arc::new(GameDataSet {
            generation,
            maps,
            game_modes,
            player_tuning,
        });
        info!("Published game data generation {}", generation);
        Ok(())
    }

    async fn load_or_empty<T>(&self, table: &str, label: &str) -> Result<Arc<DataTable<T>>, DataError>
    where
        T: serde::de::DeserializeOwned + Send + Sync + 'static,
    {
        match self.loader.load_table::<T>(table).await? {
            Some(rows) => {
                info!("Loaded {} {} configurations", rows.len(), label);
                Ok(rows)
            }
            None => {
                warn!("Failed to load {}, using empty collection", table);
                Ok(Arc::new(DataTable::default()))
            }
        }
    }

    /// Current generation.
    pub async fn snapshot(&self) -> Arc<GameDataSet> {
        self.current.read().await.clone()
    }

    /// Current generation number.
    pub async fn generation(&self) -> u64 {
        self.current.read().await.generation
    }

    /// Map configuration by id.
    pub async fn map_info(&self, map_id: &str) -> Option<MapInfo> {
        let info = self.snapshot().await.map_info(map_id).cloned();
        if info.is_none() {
            warn!("MapInfo not found for map: {}", map_id);
        }
        info
    }

    /// Game mode tuning by id.
    pub async fn game_mode_tuning(&self, game_mode: &str) -> Option<GameModeTuning> {
        let tuning = self.snapshot().await.game_mode_tuning(game_mode).cloned();
        if tuning.is_none() {
            warn!("GameModeTuning not found for mode: {}", game_mode);
        }
        tuning
    }

    /// Player tuning with first-row and default fallbacks.
    pub async fn player_tuning(&self, tuning_id: &str) -> PlayerTuning {
        self.snapshot().await.player_tuning(tuning_id)
    }

    /// Whether the map table has this map.
    pub async fn is_map_supported(&self, map_id: &str) -> bool {
        self.snapshot().await.maps.contains(map_id)
    }

    /// Whether the game mode table has this mode.
    pub async fn is_game_mode_supported(&self, game_mode: &str) -> bool {
        self.snapshot().await.game_modes.contains(game_mode)
    }

    /// Map ids in table order.
    pub async fn supported_maps(&self) -> Vec<String> {
        self.snapshot().await.maps.names().map(str::to_string).collect()
    }

    /// Game mode ids in table order.
    pub async fn supported_game_modes(&self) -> Vec<String> {
        self.snapshot().await.game_modes.names().map(str::to_string).collect()
    }

    /// Log a summary of the loaded configuration.
    pub async fn log_configuration(&self) {
        let data = self.snapshot().await;
        info!("=== GAME CONFIGURATION (generation {}) ===", data.generation);

        if !data.maps.is_empty() {
            info!("Available maps:");
            for (map_id, map) in data.maps.iter() {
                info!(
                    "  {}: {} ({})",
                    map_id,
                    map.display_name("Unknown"),
                    map.persistent_map_path().unwrap_or("no persistent map")
                );
            }
        }

        if !data.game_modes.is_empty() {
            info!("Available game modes:");
            for (mode_id, mode) in data.game_modes.iter() {
                info!(
                    "  {}: score sharing={}, timer shutdown={}",
                    mode_id,
                    mode.allows_score_sharing(),
                    mode.has_timer_shutdown()
                );
            }
        }
    }
}
