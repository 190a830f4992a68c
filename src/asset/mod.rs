//! Asset Layer
//!
//! Typed object graph rebuilt from exported interchange documents.
//!
//! ## Module Structure
//!
//! - `object`: Generic object node and class-name normalization
//! - `actor`: Placed actors (transform, components, tags, replication)
//! - `level`: Levels and their actor queries
//! - `classify`: Level scoring and actor shape predicates
//! - `source`: Document sources (filesystem, test stores)
//! - `parser`: Cached, single-flight document loading

pub mod object;
pub mod actor;
pub mod level;
pub mod classify;
pub mod source;
pub mod parser;

// Re-export key types
pub use object::{AssetObject, ClassName};
pub use actor::{ActorObject, Transform, ReplicationInfo};
pub use level::{LevelObject, LevelStats, Bounds};
pub use source::{AssetSource, FsSource};
pub use parser::{Asset, AssetParser, AssetError, CacheStats, resolve_asset_reference};
