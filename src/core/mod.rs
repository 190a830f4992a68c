//! Core primitives.
//!
//! Math and dynamic-value types shared by the asset, data and world layers.

pub mod vec3;
pub mod property;

// Re-export core types
pub use vec3::{Vec3, Quat};
pub use property::PropertyBag;
