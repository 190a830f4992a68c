//! World Driver
//!
//! Owns the state of one running map: the persistent level, its streamed
//! grid cells, the spawn candidates collected from both, and every
//! connected player's controller. A `World` is not shared; the scheduler
//! task owns it and serializes all access.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::asset::actor::ActorObject;
use crate::asset::level::{LevelObject, LevelStats};
use crate::asset::parser::{resolve_asset_reference, AssetError, AssetParser};
use crate::config::WorldConfig;
use crate::core::vec3::{Quat, Vec3};
use crate::data::map_info::MapInfo;
use crate::data::service::GameDataService;
use crate::world::grid::{GridCellId, GridStreamingManager};
use crate::world::movement::{
    LifecycleError, LifecycleState, MoveOutcome, MovementLimits, PlayerController, PlayerId, PlayerStatus,
};
use crate::world::spawn::{merge_unique, select_spawn, validate_cluster, SpawnReason};

/// World errors.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// No level document at the path.
    #[error("Level not found: {0}")]
    LevelNotFound(String),

    /// The document exists but is not a level.
    #[error("{path} is a {kind}, not a level")]
    NotALevel {
        /// Requested path
        path: String,
        /// Kind of asset found there
        kind: &'static str,
    },

    /// Neither the config nor the map table names a level.
    #[error("No level path for map {0}")]
    NoLevelPath(String),

    /// No player with this id is in the world.
    #[error("Unknown player {0}")]
    UnknownPlayer(PlayerId),

    /// A player with this id is already in the world.
    #[error("Player {0} is already in the world")]
    PlayerExists(PlayerId),

    /// Rejected lifecycle transition.
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Level document could not be read.
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// The world task has stopped.
    #[error("World scheduler closed")]
    SchedulerClosed,
}

/// What a level load produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSummary {
    /// Persistent level that was loaded
    pub level_path: String,
    /// Player starts in the persistent level
    pub level_player_starts: usize,
    /// Player starts kept after cluster validation
    pub validated_player_starts: usize,
    /// Grid cells available after preload
    pub cells_loaded: usize,
    /// Candidates added from grid cells
    pub cell_candidates: usize,
    /// Final candidate count
    pub total_candidates: usize,
}

/// Where a joining player was placed.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    /// Joined player
    pub player_id: PlayerId,
    /// Spawn position
    pub position: Vec3,
    /// `None` when the fallback position was used
    pub reason: Option<SpawnReason>,
}

impl JoinOutcome {
    /// Whether no candidate was available.
    pub fn used_fallback(&self) -> bool {
        self.reason.is_none()
    }
}

/// State of one running map.
pub struct World {
    config: WorldConfig,
    parser: Arc<AssetParser>,
    game_data: Arc<GameDataService>,
    map_info: Option<MapInfo>,
    level: Option<Arc<LevelObject>>,
    level_path: Option<String>,
    grid: Option<GridStreamingManager>,
    candidates: Vec<Arc<ActorObject>>,
    players: BTreeMap<PlayerId, PlayerController>,
    tick: u64,
}

impl World {
    /// Create an empty world. Call [`load_level`](Self::load_level) before
    /// players join.
    pub fn new(config: WorldConfig, parser: Arc<AssetParser>, game_data: Arc<GameDataService>) -> Self {
        Self {
            config,
            parser,
            game_data,
            map_info: None,
            level: None,
            level_path: None,
            grid: None,
            candidates: Vec::new(),
            players: BTreeMap::new(),
            tick: 0,
        }
    }

    /// Configuration the world was built with.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Active map configuration, if the map table has one.
    pub fn map_info(&self) -> Option<&MapInfo> {
        self.map_info.as_ref()
    }

    /// Persistent level, once loaded.
    pub fn level(&self) -> Option<&Arc<LevelObject>> {
        self.level.as_ref()
    }

    /// Path of the loaded persistent level.
    pub fn level_path(&self) -> Option<&str> {
        self.level_path.as_deref()
    }

    /// Grid cell cache for the loaded level.
    pub fn grid(&self) -> Option<&GridStreamingManager> {
        self.grid.as_ref()
    }

    /// Spawn candidates in discovery order.
    pub fn candidates(&self) -> &[Arc<ActorObject>] {
        &self.candidates
    }

    /// Ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    // ========================================================================
    // Level loading
    // ========================================================================

    /// Load the configured map's persistent level.
    ///
    /// The level path comes from the config, else from the map table.
    #[instrument(skip(self), fields(map = %self.config.map_id))]
    pub async fn load_level(&mut self) -> Result<LevelSummary, WorldError> {
        let map_info = self.game_data.map_info(&self.config.map_id).await;

        let level_path = self
            .config
            .level_path
            .clone()
            .or_else(|| {
                map_info
                    .as_ref()
                    .and_then(MapInfo::persistent_map_path)
                    .and_then(resolve_asset_reference)
            })
            .ok_or_else(|| WorldError::NoLevelPath(self.config.map_id.clone()))?;

        self.load_level_at(&level_path, map_info).await
    }

    /// Load a specific persistent level with an optional map configuration.
    #[instrument(skip(self, map_info))]
    pub async fn load_level_at(
        &mut self,
        level_path: &str,
        map_info: Option<MapInfo>,
    ) -> Result<LevelSummary, WorldError> {
        let asset = self
            .parser
            .load_asset(level_path)
            .await?
            .ok_or_else(|| WorldError::LevelNotFound(level_path.to_string()))?;

        let level = match asset.as_level() {
            Some(level) => level.clone(),
            None => {
                return Err(WorldError::NotALevel {
                    path: level_path.to_string(),
                    kind: asset.kind(),
                })
            }
        };
        info!("Level loaded: {}", level.stats());

        let level_starts = level.player_starts();
        let validated = match &map_info {
            Some(map_info) => validate_cluster(&level_starts, map_info.player_start_cluster_radius),
            None => {
                warn!("No map config for {}, keeping all player starts", self.config.map_id);
                level_starts.clone()
            }
        };

        let grid = GridStreamingManager::new(self.parser.clone(), level_path, self.config.core_cells.clone());
        let cells_loaded = grid.preload_core().await;

        let mut candidates = validated.clone();
        let mut cell_candidates = 0;
        for (cell, cell_level) in grid.loaded_levels().await {
            let added = merge_unique(&mut candidates, cell_level.player_starts(), self.config.duplicate_threshold);
            info!("Grid cell {} contributed {} spawn candidates", cell, added);
            cell_candidates += added;
        }

        let summary = LevelSummary {
            level_path: level_path.to_string(),
            level_player_starts: level_starts.len(),
            validated_player_starts: validated.len(),
            cells_loaded,
            cell_candidates,
            total_candidates: candidates.len(),
        };
        info!(
            "World ready: {} spawn candidates ({} from level, {} from {} grid cells)",
            summary.total_candidates, summary.validated_player_starts, summary.cell_candidates, summary.cells_loaded
        );

        self.map_info = map_info;
        self.level = Some(level);
        self.level_path = Some(level_path.to_string());
        self.grid = Some(grid);
        self.candidates = candidates;
        Ok(summary)
    }

    /// Load one more grid cell and merge its player starts.
    /// Returns how many candidates were added.
    pub async fn stream_cell(&mut self, cell: GridCellId) -> usize {
        let Some(grid) = &self.grid else {
            warn!("No level loaded, cannot stream cell {}", cell);
            return 0;
        };
        let Some(cell_level) = grid.load_cell(cell).await else {
            return 0;
        };
        let added = merge_unique(&mut self.candidates, cell_level.player_starts(), self.config.duplicate_threshold);
        info!("Grid cell {} contributed {} spawn candidates", cell, added);
        added
    }

    /// Unload non-core grid cells far from every playing player.
    pub async fn evict_distant_cells(&self, radius: f32) -> Vec<GridCellId> {
        match &self.grid {
            Some(grid) => grid.evict_distant(&self.player_positions(), radius).await,
            None => Vec::new(),
        }
    }

    /// Summary of the persistent level.
    pub fn level_stats(&self) -> Option<LevelStats> {
        self.level.as_ref().map(|level| level.stats())
    }

    // ========================================================================
    // Players
    // ========================================================================

    /// Positions of players occupying the world (spawning or playing).
    pub fn player_positions(&self) -> Vec<Vec3> {
        self.players
            .values()
            .filter(|player| matches!(player.state(), LifecycleState::Spawning | LifecycleState::Playing))
            .map(PlayerController::position)
            .collect()
    }

    /// Place a new player and put them in play.
    ///
    /// `leave` drops the player's state, so a later join under the same id
    /// starts a fresh controller.
    pub async fn join(&mut self, player_id: PlayerId) -> Result<JoinOutcome, WorldError> {
        if self.players.contains_key(&player_id) {
            return Err(WorldError::PlayerExists(player_id));
        }

        let occupied = self.player_positions();
        let choice = select_spawn(&self.candidates, &occupied, self.map_info.as_ref());
        let (position, reason) = match choice {
            Some(choice) => (choice.position(), Some(choice.reason)),
            None => {
                warn!(
                    "No spawn candidates, placing player {} at fallback {}",
                    player_id, self.config.fallback_spawn
                );
                (self.config.fallback_spawn, None)
            }
        };

        let tuning = self.game_data.player_tuning(&self.config.player_tuning_id).await;
        let mut controller = PlayerController::new(player_id, MovementLimits::from_tuning(&tuning), self.config.movement);
        controller.initialize_player(position)?;
        controller.complete_spawning();
        self.players.insert(player_id, controller);

        info!("Player {} joined at {} ({} in world)", player_id, position, self.players.len());
        Ok(JoinOutcome {
            player_id,
            position,
            reason,
        })
    }

    /// Validate and apply a movement report.
    pub fn apply_movement(
        &mut self,
        player_id: PlayerId,
        position: Vec3,
        velocity: Vec3,
        delta_time: f32,
    ) -> Result<MoveOutcome, WorldError> {
        Ok(self.player_mut(player_id)?.update_movement(position, velocity, delta_time))
    }

    /// Set a player's sprint flag.
    pub fn set_sprinting(&mut self, player_id: PlayerId, sprinting: bool) -> Result<(), WorldError> {
        self.player_mut(player_id)?.set_sprinting(sprinting);
        Ok(())
    }

    /// Apply a rotation. Returns false when the player is not in play.
    pub fn update_rotation(&mut self, player_id: PlayerId, rotation: Quat) -> Result<bool, WorldError> {
        Ok(self.player_mut(player_id)?.update_rotation(rotation))
    }

    /// Disconnect a player and drop their state.
    pub fn leave(&mut self, player_id: PlayerId, reason: &str) -> Result<PlayerStatus, WorldError> {
        let mut player = self
            .players
            .remove(&player_id)
            .ok_or(WorldError::UnknownPlayer(player_id))?;
        player.disconnect(reason);
        info!("Player {} left ({} in world)", player_id, self.players.len());
        Ok(player.status())
    }

    /// Snapshot of one player.
    pub fn player_status(&self, player_id: PlayerId) -> Option<PlayerStatus> {
        self.players.get(&player_id).map(PlayerController::status)
    }

    /// Every player, ordered by id.
    pub fn players(&self) -> Vec<PlayerStatus> {
        self.players.values().map(PlayerController::status).collect()
    }

    /// Players in the world.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Playing players with no accepted movement for longer than `threshold`.
    pub fn idle_players(&self, threshold: Duration) -> Vec<PlayerId> {
        self.players
            .values()
            .filter(|player| player.is_playing() && player.is_idle(threshold))
            .map(PlayerController::id)
            .collect()
    }

    fn player_mut(&mut self, player_id: PlayerId) -> Result<&mut PlayerController, WorldError> {
        self.players
            .get_mut(&player_id)
            .ok_or(WorldError::UnknownPlayer(player_id))
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advance one tick. Returns every player currently idle.
    pub fn tick(&mut self) -> Vec<PlayerId> {
        self.tick += 1;
        self.idle_players(self.config.idle_threshold)
    }
}
