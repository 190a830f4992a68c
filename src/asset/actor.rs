//! Placed Actors
//!
//! Actors are asset objects with a world transform, components, tags and
//! replication settings. They are built once by the parser and shared
//! read-only afterwards.

use std::collections::BTreeSet;
use std::ops::Deref;
use serde::{Deserialize, Serialize};

use crate::asset::object::AssetObject;
use crate::core::vec3::{Quat, Vec3};

/// World transform. Every part is optional in the document.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position (defaults to zero)
    #[serde(rename = "Translation", default)]
    pub translation: Vec3,
    /// Rotation (defaults to identity)
    #[serde(rename = "Rotation", default)]
    pub rotation: Quat,
    /// Scale (defaults to one)
    #[serde(rename = "Scale3D", default = "unit_scale")]
    pub scale: Vec3,
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Transform at a position with no rotation or scale.
    pub fn at(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }
}

/// Network replication settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReplicationInfo {
    /// Actor is replicated to clients
    pub replicates: bool,
    /// Movement is replicated
    pub replicate_movement: bool,
    /// Squared relevance distance
    pub net_cull_distance_squared: f32,
    /// Updates per second
    pub net_update_frequency: f32,
}

impl ReplicationInfo {
    /// Default relevance distance (15000 units, squared).
    pub const DEFAULT_CULL_DISTANCE_SQUARED: f32 = 15_000.0 * 15_000.0;

    /// Default update frequency (Hz).
    pub const DEFAULT_UPDATE_FREQUENCY: f32 = 100.0;

    /// Check whether an actor at `actor_location` is relevant to a player.
    pub fn is_network_relevant(&self, player_location: Vec3, actor_location: Vec3) -> bool {
        self.replicates
            && player_location.distance_squared(actor_location) <= self.net_cull_distance_squared
    }
}

impl Default for ReplicationInfo {
    fn default() -> Self {
        Self {
            replicates: false,
            replicate_movement: false,
            net_cull_distance_squared: Self::DEFAULT_CULL_DISTANCE_SQUARED,
            net_update_frequency: Self::DEFAULT_UPDATE_FREQUENCY,
        }
    }
}

/// Actor placed in a level.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActorObject {
    /// Base object data
    pub object: AssetObject,
    /// World transform
    pub transform: Transform,
    /// Attached components
    pub components: Vec<AssetObject>,
    /// Identification tags
    pub tags: BTreeSet<String>,
    /// Replication settings
    pub replication: ReplicationInfo,
}

impl ActorObject {
    /// Wrap a base object with a transform.
    pub fn new(object: AssetObject, transform: Transform) -> Self {
        Self {
            object,
            transform,
            ..Self::default()
        }
    }

    /// World position.
    #[inline]
    pub fn location(&self) -> Vec3 {
        self.transform.translation
    }

    /// World rotation.
    #[inline]
    pub fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    /// Distance to another actor.
    pub fn distance_to(&self, other: &ActorObject) -> f32 {
        self.location().distance(other.location())
    }

    /// Check if within `distance` of a point (inclusive).
    pub fn is_within_distance(&self, point: Vec3, distance: f32) -> bool {
        self.location().distance(point) <= distance
    }

    /// Check for a tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// First component whose class matches.
    pub fn component_by_class(&self, class_name: &str) -> Option<&AssetObject> {
        self.components.iter().find(|c| c.is_a(class_name))
    }
}

impl Deref for ActorObject {
    type Target = AssetObject;

    fn deref(&self) -> &AssetObject {
        &self.object
    }
}
