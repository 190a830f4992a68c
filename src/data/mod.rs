//! Game Data
//!
//! Row tables exported from the engine: map configuration, game mode rules
//! and player movement tuning.
//!
//! ## Module Structure
//!
//! - `table`: Ordered row tables and the cached table loader
//! - `map_info`: Map configuration rows (spawn clustering and scoring)
//! - `tuning`: Game mode and player tuning rows
//! - `service`: Generation-swapped access to all three tables

pub mod table;
pub mod map_info;
pub mod tuning;
pub mod service;

// Re-export key types
pub use table::{DataTable, DataTableLoader, DataError};
pub use map_info::{MapInfo, PlayerStartScoreRule, VfxMapInfo, AssetReference, LocalizedText};
pub use tuning::{GameModeTuning, PlayerTuning, RotationRate, MovementMode};
pub use service::{GameDataService, GameDataSet};
