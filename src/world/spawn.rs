//! Spawn Resolution
//!
//! Picks where a joining player appears. All functions are pure: they take
//! the candidate list in discovery order and the positions of players
//! already in the world, and never reorder candidates. Order matters because
//! every tie and every clustering decision goes to the earlier candidate.
//!
//! ## Selection
//!
//! ```text
//! no candidates          -> None (caller uses a fallback position)
//! no players             -> first candidate
//! map config available   -> highest crowd score (least crowded)
//! no map config          -> largest distance to the nearest player
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::asset::actor::ActorObject;
use crate::core::vec3::Vec3;
use crate::data::map_info::{MapInfo, PlayerStartScoreRule};

/// Candidates closer than this to an existing one are duplicates.
pub const DEFAULT_DUPLICATE_THRESHOLD: f32 = 10.0;

/// Why a candidate was chosen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpawnReason {
    /// Nobody else is in the world yet
    FirstCandidate,
    /// Best crowd score under the map's scoring rules
    CrowdScore(i64),
    /// Farthest from the nearest player (no map rules)
    FarthestFromPlayers(f32),
}

impl fmt::Display for SpawnReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnReason::FirstCandidate => write!(f, "first candidate"),
            SpawnReason::CrowdScore(score) => write!(f, "crowd score {}", score),
            SpawnReason::FarthestFromPlayers(distance) => {
                write!(f, "nearest player {:.1} away", distance)
            }
        }
    }
}

/// Selected spawn point.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnChoice {
    /// Chosen candidate
    pub actor: Arc<ActorObject>,
    /// Selection rule that picked it
    pub reason: SpawnReason,
}

impl SpawnChoice {
    /// Spawn position.
    pub fn position(&self) -> Vec3 {
        self.actor.location()
    }
}

// ============================================================================
// Candidate filtering
// ============================================================================

/// Greedy cluster filter.
///
/// Walks candidates in order and keeps one only if it is at least
/// `cluster_radius` from every candidate kept so far.
pub fn validate_cluster(candidates: &[Arc<ActorObject>], cluster_radius: f32) -> Vec<Arc<ActorObject>> {
    let mut accepted: Vec<Arc<ActorObject>> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let clear = accepted
            .iter()
            .all(|kept| kept.location().distance(candidate.location()) >= cluster_radius);
        if clear {
            accepted.push(candidate.clone());
        }
    }

    info!(
        "Cluster validation: {}/{} candidates kept (radius {})",
        accepted.len(),
        candidates.len(),
        cluster_radius
    );
    accepted
}

/// True if `position` is within `threshold` of any existing candidate.
pub fn is_duplicate(position: Vec3, existing: &[Arc<ActorObject>], threshold: f32) -> bool {
    existing
        .iter()
        .any(|actor| actor.location().distance(position) < threshold)
}

/// Append candidates that are not duplicates of ones already present.
/// Returns how many were added.
pub fn merge_unique(
    target: &mut Vec<Arc<ActorObject>>,
    incoming: impl IntoIterator<Item = Arc<ActorObject>>,
    threshold: f32,
) -> usize {
    let mut added = 0;
    for actor in incoming {
        if is_duplicate(actor.location(), target, threshold) {
            debug!("Skipping duplicate candidate at {}", actor.location());
            continue;
        }
        target.push(actor);
        added += 1;
    }
    added
}

// ============================================================================
// Selection
// ============================================================================

/// Crowd score of a position: minus `score_per_player_in_radius` for every
/// player within each rule's radius (inclusive). Higher is better.
pub fn crowd_score(position: Vec3, players: &[Vec3], rules: &[PlayerStartScoreRule]) -> i64 {
    rules
        .iter()
        .map(|rule| {
            let in_radius = players
                .iter()
                .filter(|player| player.distance(position) <= rule.radius)
                .count() as i64;
            -(in_radius * i64::from(rule.score_per_player_in_radius))
        })
        .sum()
}

/// Candidate with the highest crowd score; ties go to the earlier candidate.
pub fn select_by_score(
    candidates: &[Arc<ActorObject>],
    players: &[Vec3],
    rules: &[PlayerStartScoreRule],
) -> Option<(Arc<ActorObject>, i64)> {
    let mut best: Option<(&Arc<ActorObject>, i64)> = None;

    for candidate in candidates {
        let score = crowd_score(candidate.location(), players, rules);
        debug!("Candidate {} scored {}", candidate.object, score);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }

    best.map(|(actor, score)| (actor.clone(), score))
}

/// Candidate whose nearest player is farthest away; ties go to the earlier
/// candidate.
pub fn select_farthest(candidates: &[Arc<ActorObject>], players: &[Vec3]) -> Option<(Arc<ActorObject>, f32)> {
    let mut best: Option<(&Arc<ActorObject>, f32)> = None;

    for candidate in candidates {
        let nearest = players
            .iter()
            .map(|player| player.distance(candidate.location()))
            .fold(f32::INFINITY, f32::min);
        if best.map_or(true, |(_, best_distance)| nearest > best_distance) {
            best = Some((candidate, nearest));
        }
    }

    best.map(|(actor, distance)| (actor.clone(), distance))
}

/// Choose a spawn point for a joining player.
pub fn select_spawn(
    candidates: &[Arc<ActorObject>],
    players: &[Vec3],
    map_info: Option<&MapInfo>,
) -> Option<SpawnChoice> {
    let first = candidates.first()?;

    let choice = if players.is_empty() {
        SpawnChoice {
            actor: first.clone(),
            reason: SpawnReason::FirstCandidate,
        }
    } else if let Some(map_info) = map_info {
        let (actor, score) = select_by_score(candidates, players, &map_info.player_start_score_rules)?;
        SpawnChoice {
            actor,
            reason: SpawnReason::CrowdScore(score),
        }
    } else {
        let (actor, distance) = select_farthest(candidates, players)?;
        SpawnChoice {
            actor,
            reason: SpawnReason::FarthestFromPlayers(distance),
        }
    };

    info!(
        "Selected spawn point {} at {} ({})",
        choice.actor.object,
        choice.position(),
        choice.reason
    );
    Some(choice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::actor::Transform;
    use crate::asset::object::AssetObject;

    fn start(name: &str, x: f32) -> Arc<ActorObject> {
        Arc::new(ActorObject::new(
            AssetObject::new(Some(name.into()), Some("UScriptClass'PlayerStart'".into()), "Maps/Test"),
            Transform::at(Vec3::new(x, 0.0, 0.0)),
        ))
    }

    fn names(actors: &[Arc<ActorObject>]) -> Vec<&str> {
        actors.iter().filter_map(|a| a.name.as_deref()).collect()
    }

    fn rule(radius: f32, score: i32) -> PlayerStartScoreRule {
        PlayerStartScoreRule {
            radius,
            score_per_player_in_radius: score,
        }
    }

    fn map_with_rules(rules: Vec<PlayerStartScoreRule>) -> MapInfo {
        MapInfo {
            player_start_cluster_radius: 500.0,
            player_start_score_rules: rules,
            ..MapInfo::default()
        }
    }

    #[test]
    fn test_cluster_validation_is_greedy() {
        let candidates = vec![start("A", 0.0), start("B", 100.0), start("C", 1000.0)];
        let kept = validate_cluster(&candidates, 500.0);
        assert_eq!(names(&kept), vec!["A", "C"]);
    }

    #[test]
    fn test_cluster_radius_boundary_is_accepted() {
        let candidates = vec![start("A", 0.0), start("B", 500.0)];
        assert_eq!(validate_cluster(&candidates, 500.0).len(), 2);
        assert_eq!(validate_cluster(&candidates, 500.5).len(), 1);
    }

    #[test]
    fn test_crowd_avoidance() {
        let candidates = vec![start("A", 0.0), start("C", 1000.0)];
        let players = [Vec3::ZERO];
        let rules = [rule(300.0, 10)];

        assert_eq!(crowd_score(candidates[0].location(), &players, &rules), -10);
        assert_eq!(crowd_score(candidates[1].location(), &players, &rules), 0);

        let map = map_with_rules(rules.to_vec());
        let choice = select_spawn(&candidates, &players, Some(&map)).unwrap();
        assert_eq!(choice.actor.name.as_deref(), Some("C"));
        assert_eq!(choice.reason, SpawnReason::CrowdScore(0));
    }

    #[test]
    fn test_scoring_rules_stack() {
        let players = [Vec3::ZERO, Vec3::new(250.0, 0.0, 0.0)];
        let rules = [rule(300.0, 10), rule(1000.0, 1)];
        // both players are inside both rules
        assert_eq!(crowd_score(Vec3::new(100.0, 0.0, 0.0), &players, &rules), -22);
        // radius is inclusive
        assert_eq!(crowd_score(Vec3::new(300.0, 0.0, 0.0), &players, &rules), -22);
        assert_eq!(crowd_score(Vec3::new(301.0, 0.0, 0.0), &players, &rules), -12);
    }

    #[test]
    fn test_score_ties_prefer_first() {
        let candidates = vec![start("A", 5000.0), start("B", -5000.0)];
        let map = map_with_rules(vec![rule(300.0, 10)]);
        let choice = select_spawn(&candidates, &[Vec3::ZERO], Some(&map)).unwrap();
        assert_eq!(choice.actor.name.as_deref(), Some("A"));
    }

    #[test]
    fn test_zero_players_returns_first() {
        let candidates = vec![start("A", 0.0), start("B", 1000.0)];
        let map = map_with_rules(vec![rule(5000.0, 100)]);
        let choice = select_spawn(&candidates, &[], Some(&map)).unwrap();
        assert_eq!(choice.actor.name.as_deref(), Some("A"));
        assert_eq!(choice.reason, SpawnReason::FirstCandidate);
    }

    #[test]
    fn test_farthest_fallback_without_map_config() {
        let candidates = vec![start("A", 100.0), start("B", 2000.0), start("C", -800.0)];
        let players = [Vec3::ZERO, Vec3::new(1500.0, 0.0, 0.0)];
        let choice = select_spawn(&candidates, &players, None).unwrap();
        // nearest player distances: A 100, B 500, C 800
        assert_eq!(choice.actor.name.as_deref(), Some("C"));
        assert_eq!(choice.reason, SpawnReason::FarthestFromPlayers(800.0));
    }

    #[test]
    fn test_farthest_fallback_never_empty() {
        // every candidate sits on a player
        let candidates = vec![start("A", 0.0), start("B", 0.0)];
        let choice = select_spawn(&candidates, &[Vec3::ZERO], None).unwrap();
        assert_eq!(choice.actor.name.as_deref(), Some("A"));
    }

    #[test]
    fn test_no_candidates() {
        assert!(select_spawn(&[], &[Vec3::ZERO], None).is_none());
        assert!(select_spawn(&[], &[], None).is_none());
    }

    #[test]
    fn test_duplicate_suppression() {
        let mut candidates = vec![start("A", 0.0)];
        let added = merge_unique(
            &mut candidates,
            vec![start("A_copy", 9.99), start("B", 10.0), start("B_copy", 15.0)],
            DEFAULT_DUPLICATE_THRESHOLD,
        );
        assert_eq!(added, 1);
        assert_eq!(names(&candidates), vec!["A", "B"]);
    }
}
