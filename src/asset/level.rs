//! Levels
//!
//! A level owns an ordered actor list and the names of its streaming
//! sublevels. The persistent level of a map and every streamed grid cell are
//! both `LevelObject`s.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::asset::actor::ActorObject;
use crate::asset::object::AssetObject;
use crate::core::vec3::Vec3;

/// Axis-aligned bounds of a level's actors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Bounds {
    /// Smallest bounds containing every point, `None` for no points.
    pub fn from_points(mut points: impl Iterator<Item = Vec3>) -> Option<Self> {
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    /// Centre point.
    pub fn center(&self) -> Vec3 {
        self.min.midpoint(self.max)
    }

    /// Extent on each axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}

/// Summary of a level's contents.
#[derive(Clone, Debug, Default)]
pub struct LevelStats {
    /// Total actors
    pub total_actors: usize,
    /// Streaming sublevel references
    pub streaming_level_count: usize,
    /// Actor count per simple class name
    pub actor_type_counts: BTreeMap<String, usize>,
    /// Actor bounds
    pub bounds: Option<Bounds>,
}

impl fmt::Display for LevelStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} actors, {} streaming levels",
            self.total_actors, self.streaming_level_count
        )?;
        if let Some(bounds) = self.bounds {
            write!(f, ", bounds {} to {}", bounds.min, bounds.max)?;
        }
        Ok(())
    }
}

/// Loaded level.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LevelObject {
    /// Base object data
    pub object: AssetObject,
    /// Actors in discovery order
    actors: Vec<Arc<ActorObject>>,
    /// Streaming sublevel package names
    pub streaming_levels: Vec<String>,
    bounds: Option<Bounds>,
}

impl LevelObject {
    /// Build a level; bounds are derived from the actors.
    pub fn new(object: AssetObject, actors: Vec<ActorObject>, streaming_levels: Vec<String>) -> Self {
        let bounds = Bounds::from_points(actors.iter().map(ActorObject::location));
        Self {
            object,
            actors: actors.into_iter().map(Arc::new).collect(),
            streaming_levels,
            bounds,
        }
    }

    /// Actors in discovery order.
    pub fn actors(&self) -> &[Arc<ActorObject>] {
        &self.actors
    }

    /// Bounds of all actor positions.
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Actors whose class matches `actor_type` (loose match).
    pub fn find_actors_by_type(&self, actor_type: &str) -> Vec<Arc<ActorObject>> {
        self.actors
            .iter()
            .filter(|actor| actor.is_a(actor_type))
            .cloned()
            .collect()
    }

    /// Actor by name (case-insensitive).
    pub fn find_actor_by_name(&self, name: &str) -> Option<Arc<ActorObject>> {
        self.actors
            .iter()
            .find(|actor| {
                actor
                    .name
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
            .cloned()
    }

    /// All PlayerStart actors.
    pub fn player_starts(&self) -> Vec<Arc<ActorObject>> {
        self.find_actors_by_type("PlayerStart")
    }

    /// Actors within `radius` of `position` (inclusive).
    pub fn find_actors_in_radius(&self, position: Vec3, radius: f32) -> Vec<Arc<ActorObject>> {
        self.actors
            .iter()
            .filter(|actor| actor.is_within_distance(position, radius))
            .cloned()
            .collect()
    }

    /// Summary statistics.
    pub fn stats(&self) -> LevelStats {
        let mut actor_type_counts = BTreeMap::new();
        for actor in &self.actors {
            *actor_type_counts
                .entry(actor.simple_class_name().to_string())
                .or_insert(0) += 1;
        }

        LevelStats {
            total_actors: self.actors.len(),
            streaming_level_count: self.streaming_levels.len(),
            actor_type_counts,
            bounds: self.bounds,
        }
    }
}

impl Deref for LevelObject {
    type Target = AssetObject;

    fn deref(&self) -> &AssetObject {
        &self.object
    }
}

impl fmt::Display for LevelObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Level: {} ({} actors, {} streaming levels)",
            self.name.as_deref().unwrap_or("Unnamed"),
            self.actors.len(),
            self.streaming_levels.len()
        )
    }
}
