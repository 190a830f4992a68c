//! World Scheduler
//!
//! Runs a [`World`] on its own task at a fixed tick rate. Other tasks never
//! touch the world directly: they send a [`WorldCommand`] through a
//! [`WorldHandle`] and wait for the reply, so joins, movement and queries
//! are applied one at a time between ticks.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::asset::level::LevelStats;
use crate::core::vec3::{Quat, Vec3};
use crate::world::driver::{JoinOutcome, World, WorldError};
use crate::world::grid::GridCellId;
use crate::world::movement::{MoveOutcome, PlayerId, PlayerStatus};

type Reply<T> = oneshot::Sender<T>;

/// Requests handled by the world task.
#[derive(Debug)]
pub enum WorldCommand {
    /// Place a new player
    Join {
        /// Target player
        player_id: PlayerId,
        /// Reply channel
        reply: Reply<Result<JoinOutcome, WorldError>>,
    },
    /// Movement report
    Move {
        /// Target player
        player_id: PlayerId,
        /// Reported position
        position: Vec3,
        /// Reported velocity
        velocity: Vec3,
        /// Seconds since the previous report
        delta_time: f32,
        /// Reply channel
        reply: Reply<Result<MoveOutcome, WorldError>>,
    },
    /// Sprint toggle
    SetSprinting {
        /// Target player
        player_id: PlayerId,
        /// Sprint flag
        sprinting: bool,
        /// Reply channel
        reply: Reply<Result<(), WorldError>>,
    },
    /// Rotation report
    UpdateRotation {
        /// Target player
        player_id: PlayerId,
        /// Reported rotation
        rotation: Quat,
        /// Reply channel
        reply: Reply<Result<bool, WorldError>>,
    },
    /// Remove a player
    Leave {
        /// Target player
        player_id: PlayerId,
        /// Disconnect reason
        reason: String,
        /// Reply channel
        reply: Reply<Result<PlayerStatus, WorldError>>,
    },
    /// Snapshot of one player
    PlayerStatus {
        /// Target player
        player_id: PlayerId,
        /// Reply channel
        reply: Reply<Option<PlayerStatus>>,
    },
    /// Snapshot of every player
    Players {
        /// Reply channel
        reply: Reply<Vec<PlayerStatus>>,
    },
    /// Persistent level summary
    LevelStats {
        /// Reply channel
        reply: Reply<Option<LevelStats>>,
    },
    /// Load a grid cell
    StreamCell {
        /// Cell to load
        cell: GridCellId,
        /// Reply channel
        reply: Reply<usize>,
    },
    /// Unload cells far from players
    EvictDistantCells {
        /// Keep cells within this distance
        radius: f32,
        /// Reply channel
        reply: Reply<Vec<GridCellId>>,
    },
}

/// Cloneable handle to a running world.
#[derive(Clone)]
pub struct WorldHandle {
    commands: mpsc::Sender<WorldCommand>,
    shutdown_tx: broadcast::Sender<()>,
}

impl WorldHandle {
    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> WorldCommand) -> Result<T, WorldError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| WorldError::SchedulerClosed)?;
        response.await.map_err(|_| WorldError::SchedulerClosed)
    }

    /// Place a new player.
    pub async fn join(&self, player_id: PlayerId) -> Result<JoinOutcome, WorldError> {
        self.request(|reply| WorldCommand::Join { player_id, reply }).await?
    }

    /// Validate and apply a movement report.
    pub async fn move_player(
        &self,
        player_id: PlayerId,
        position: Vec3,
        velocity: Vec3,
        delta_time: f32,
    ) -> Result<MoveOutcome, WorldError> {
        self.request(|reply| WorldCommand::Move {
            player_id,
            position,
            velocity,
            delta_time,
            reply,
        })
        .await?
    }

    /// Set a player's sprint flag.
    pub async fn set_sprinting(&self, player_id: PlayerId, sprinting: bool) -> Result<(), WorldError> {
        self.request(|reply| WorldCommand::SetSprinting {
            player_id,
            sprinting,
            reply,
        })
        .await?
    }

    /// Apply a rotation. Returns false when the player is not in play.
    pub async fn update_rotation(&self, player_id: PlayerId, rotation: Quat) -> Result<bool, WorldError> {
        self.request(|reply| WorldCommand::UpdateRotation {
            player_id,
            rotation,
            reply,
        })
        .await?
    }

    /// Disconnect a player and drop their state.
    pub async fn leave(&self, player_id: PlayerId, reason: impl Into<String>) -> Result<PlayerStatus, WorldError> {
        let reason = reason.into();
        self.request(|reply| WorldCommand::Leave {
            player_id,
            reason,
            reply,
        })
        .await?
    }

    /// Snapshot of one player.
    pub async fn player_status(&self, player_id: PlayerId) -> Result<Option<PlayerStatus>, WorldError> {
        self.request(|reply| WorldCommand::PlayerStatus { player_id, reply }).await
    }

    /// Every player, ordered by id.
    pub async fn players(&self) -> Result<Vec<PlayerStatus>, WorldError> {
        self.request(|reply| WorldCommand::Players { reply }).await
    }

    /// Summary of the persistent level.
    pub async fn level_stats(&self) -> Result<Option<LevelStats>, WorldError> {
        self.request(|reply| WorldCommand::LevelStats { reply }).await
    }

    /// Stream in a grid cell; returns candidates added.
    pub async fn stream_cell(&self, cell: GridCellId) -> Result<usize, WorldError> {
        self.request(|reply| WorldCommand::StreamCell { cell, reply }).await
    }

    /// Unload non-core cells far from every player.
    pub async fn evict_distant_cells(&self, radius: f32) -> Result<Vec<GridCellId>, WorldError> {
        self.request(|reply| WorldCommand::EvictDistantCells { radius, reply })
            .await
    }

    /// Stop the world task after the command in progress.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Start the world task. The join handle yields the world back on shutdown.
pub fn spawn_world(world: World) -> (WorldHandle, JoinHandle<World>) {
    let (commands_tx, commands_rx) = mpsc::channel(world.config().command_buffer.max(1));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let tick_duration = world.config().tick_duration();

    let task = tokio::spawn(run_world(world, commands_rx, shutdown_rx, tick_duration));
    let handle = WorldHandle {
        commands: commands_tx,
        shutdown_tx,
    };
    (handle, task)
}

async fn run_world(
    mut world: World,
    mut commands: mpsc::Receiver<WorldCommand>,
    mut shutdown_rx: broadcast::Receiver<()>,
    tick_duration: Duration,
) -> World {
    info!(
        "World loop started at {} Hz",
        1_000_000 / tick_duration.as_micros().max(1)
    );

    let mut tick_interval = interval(tick_duration);
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut reported_idle: BTreeSet<PlayerId> = BTreeSet::new();

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                let idle: BTreeSet<PlayerId> = world.tick().into_iter().collect();
                for player_id in idle.difference(&reported_idle) {
                    warn!("Player {} is idle", player_id);
                }
                reported_idle = idle;
            }
            command = commands.recv() => {
                match command {
                    Some(command) => handle_command(&mut world, command).await,
                    None => {
                        info!("All world handles dropped");
                        break;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("World loop stopped after {} ticks", world.tick_count());
    world
}

async fn handle_command(world: &mut World, command: WorldCommand) {
    debug!("World command: {:?}", command);

    // a dropped reply only means the requester gave up waiting
    match command {
        WorldCommand::Join { player_id, reply } => {
            let _ = reply.send(world.join(player_id).await);
        }
        WorldCommand::Move {
            player_id,
            position,
            velocity,
            delta_time,
            reply,
        } => {
            let _ = reply.send(world.apply_movement(player_id, position, velocity, delta_time));
        }
        WorldCommand::SetSprinting {
            player_id,
            sprinting,
            reply,
        } => {
            let _ = reply.send(world.set_sprinting(player_id, sprinting));
        }
        WorldCommand::UpdateRotation {
            player_id,
            rotation,
            reply,
        } => {
            let _ = reply.send(world.update_rotation(player_id, rotation));
        }
        WorldCommand::Leave {
            player_id,
            reason,
            reply,
        } => {
            let _ = reply.send(world.leave(player_id, &reason));
        }
        WorldCommand::PlayerStatus { player_id, reply } => {
            let _ = reply.send(world.player_status(player_id));
        }
        WorldCommand::Players { reply } => {
            let _ = reply.send(world.players());
        }
        WorldCommand::LevelStats { reply } => {
            let _ = reply.send(world.level_stats());
        }
        WorldCommand::StreamCell { cell, reply } => {
            let _ = reply.send(world.stream_cell(cell).await);
        }
        WorldCommand::EvictDistantCells { radius, reply } => {
            let _ = reply.send(world.evict_distant_cells(radius).await);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::world::driver::tests::{seeded_source, world_with};
    use crate::world::movement::LifecycleState;

    async fn running_world() -> (WorldHandle, JoinHandle<World>) {
        let mut world = world_with(seeded_source(), WorldConfig::default()).await;
        world.load_level().await.unwrap();
        spawn_world(world)
    }

    #[tokio::test]
    async fn test_commands_round_trip() {
        let (handle, task) = running_world().await;
        let id = PlayerId::new([1; 16]);

        let outcome = handle.join(id).await.unwrap();
        assert_eq!(outcome.position, Vec3::ZERO);

        let moved = handle
            .move_player(id, Vec3::new(10.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 0.0), 0.1)
            .await
            .unwrap();
        assert!(moved.is_accepted());
        handle.set_sprinting(id, true).await.unwrap();
        assert!(handle.update_rotation(id, Quat::IDENTITY).await.unwrap());

        let status = handle.player_status(id).await.unwrap().unwrap();
        assert_eq!(status.position, Vec3::new(10.0, 0.0, 0.0));
        assert!(status.sprinting);
        assert_eq!(handle.players().await.unwrap().len(), 1);
        assert_eq!(handle.level_stats().await.unwrap().unwrap().total_actors, 3);

        let left = handle.leave(id, "quit").await.unwrap();
        assert_eq!(left.state, LifecycleState::Disconnected);
        assert!(handle.player_status(id).await.unwrap().is_none());

        handle.shutdown();
        let world = task.await.unwrap();
        assert_eq!(world.player_count(), 0);
    }

    #[tokio::test]
    async fn test_world_errors_pass_through() {
        let (handle, task) = running_world().await;
        let stranger = PlayerId::new([7; 16]);

        assert!(matches!(
            handle.move_player(stranger, Vec3::ZERO, Vec3::ZERO, 0.1).await,
            Err(WorldError::UnknownPlayer(_))
        ));

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_after_shutdown() {
        let (handle, task) = running_world().await;
        handle.shutdown();
        task.await.unwrap();

        assert!(matches!(
            handle.join(PlayerId::new([1; 16])).await,
            Err(WorldError::SchedulerClosed)
        ));
    }

    #[tokio::test]
    async fn test_ticks_advance() {
        let (handle, task) = running_world().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.shutdown();

        let world = task.await.unwrap();
        assert!(world.tick_count() > 0);
    }

    #[tokio::test]
    async fn test_concurrent_joins_are_serialized() {
        let (handle, task) = running_world().await;

        let joins = (0..3u8).map(|i| {
            let handle = handle.clone();
            tokio::spawn(async move { handle.join(PlayerId::new([i + 1; 16])).await })
        });
        let mut positions = Vec::new();
        for join in joins {
            positions.push(join.await.unwrap().unwrap().position);
        }

        // every spawn candidate is used exactly once
        positions.sort_by(|a, b| a.x.total_cmp(&b.x));
        assert_eq!(
            positions,
            vec![
                Vec3::ZERO,
                Vec3::new(1000.0, 0.0, 0.0),
                Vec3::new(5000.0, 0.0, 0.0)
            ]
        );

        handle.shutdown();
        task.await.unwrap();
    }
}
