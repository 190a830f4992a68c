//! # World State Server
//!
//! Runtime world-state layer for a dedicated game server. Loads exported
//! engine content, places joining players and keeps their movement honest.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   WORLD STATE SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Shared primitives                         │
//! │  ├── vec3.rs     - 3D vector and quaternion                  │
//! │  └── property.rs - Loosely typed property bag                │
//! │                                                              │
//! │  asset/          - Exported content                          │
//! │  ├── object.rs   - Generic objects, class names              │
//! │  ├── actor.rs    - Placed actors                             │
//! │  ├── level.rs    - Levels and actor queries                  │
//! │  ├── classify.rs - Level scoring heuristics                  │
//! │  ├── source.rs   - Document sources                          │
//! │  └── parser.rs   - Cached interchange parser                 │
//! │                                                              │
//! │  data/           - Row tables                                │
//! │  ├── table.rs    - Table loader                              │
//! │  ├── map_info.rs - Map configuration                         │
//! │  ├── tuning.rs   - Game mode and player tuning               │
//! │  └── service.rs  - Atomic reload of all tables               │
//! │                                                              │
//! │  world/          - Running map                               │
//! │  ├── grid.rs     - Grid cell streaming                       │
//! │  ├── spawn.rs    - Spawn resolution                          │
//! │  ├── movement.rs - Lifecycle and movement validation         │
//! │  ├── driver.rs   - World state                               │
//! │  └── scheduler.rs- Fixed-rate world task                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//!
//! The asset parser, table loader and grid caches are shared and safe to
//! call from any task. A `World` is owned by exactly one scheduler task;
//! everything else reaches it through a `WorldHandle`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod asset;
pub mod data;
pub mod world;
pub mod config;

// Re-export commonly used types
pub use core::vec3::{Vec3, Quat};
pub use asset::{Asset, AssetParser, AssetError, ActorObject, LevelObject};
pub use data::{GameDataService, DataTableLoader, MapInfo, PlayerTuning};
pub use world::{World, WorldError, WorldHandle, PlayerId, spawn_world};
pub use config::WorldConfig;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default world tick rate (Hz)
pub const TICK_RATE: u32 = 60;
