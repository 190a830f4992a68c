//! World Runtime
//!
//! Everything that changes while a map is running.
//!
//! ## Module Structure
//!
//! - `grid`: Grid cell ids and the cell streaming cache
//! - `spawn`: Spawn candidate filtering and selection
//! - `movement`: Player lifecycle and movement validation
//! - `driver`: The `World` tying level, candidates and players together
//! - `scheduler`: Fixed-rate world task and its command handle

pub mod grid;
pub mod spawn;
pub mod movement;
pub mod driver;
pub mod scheduler;

// Re-export key types
pub use grid::{GridCellId, GridLayout, GridStreamingManager, GridCellParseError};
pub use spawn::{select_spawn, validate_cluster, merge_unique, SpawnChoice, SpawnReason};
pub use movement::{
    PlayerId, PlayerController, PlayerStatus, LifecycleState, LifecycleError,
    MovementValidation, MovementLimits, MoveOutcome, MoveRejection,
};
pub use driver::{World, WorldError, JoinOutcome, LevelSummary};
pub use scheduler::{spawn_world, WorldCommand, WorldHandle};
