//! Player Movement Validation
//!
//! Server-authoritative per-player state. Clients report position and
//! velocity; the controller accepts a report only when the player is in
//! play and the report is physically plausible under the player tuning.
//! A rejected report changes nothing.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized -> Spawning -> Playing -> Dead | Spectating
//!                                  any -> Disconnected
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::core::vec3::{Quat, Vec3};
use crate::data::tuning::PlayerTuning;

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier (UUID as bytes).
///
/// Implements Ord so player maps iterate in a stable order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub [u8; 16]);

impl PlayerId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Fresh random id.
    pub fn random() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s).ok().map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uuid_string())
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Player lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Connected but not yet placed in the world
    #[default]
    Uninitialized,
    /// Placed at a spawn point, waiting for the client to confirm
    Spawning,
    /// In play; the only state that accepts movement
    Playing,
    /// Killed in play
    Dead,
    /// Left play to watch
    Spectating,
    /// Gone; terminal
    Disconnected,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Lifecycle transition errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// The requested state is not reachable from the current one
    #[error("cannot move from {from} to {to}")]
    InvalidTransition {
        /// State the player was in
        from: LifecycleState,
        /// State that was requested
        to: LifecycleState,
    },
}

// =============================================================================
// LIMITS
// =============================================================================

/// Anti-cheat tolerances applied on top of the tuned speeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementValidation {
    /// Allowed overshoot of the reported velocity over max speed.
    pub speed_tolerance: f32,
    /// Allowed overshoot of the position change over max speed * dt.
    pub position_tolerance: f32,
    /// Lifecycle is always enforced; this only gates the physics checks.
    pub enable_anti_cheat: bool,
}

impl Default for MovementValidation {
    fn default() -> Self {
        Self {
            speed_tolerance: 1.15,
            position_tolerance: 1.25,
            enable_anti_cheat: true,
        }
    }
}

/// Tuned speed limits for one player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementLimits {
    /// Walking speed (units/s)
    pub base_max_speed: f32,
    /// Factor applied to `base_max_speed` while sprinting
    pub sprint_multiplier: f32,
}

impl MovementLimits {
    /// Limits from a player tuning row.
    pub fn from_tuning(tuning: &PlayerTuning) -> Self {
        Self {
            base_max_speed: tuning.walk_speed,
            sprint_multiplier: tuning.sprint_speed_multiplier,
        }
    }

    /// Max speed for the current stance.
    #[inline]
    pub fn max_speed(&self, sprinting: bool) -> f32 {
        if sprinting {
            self.base_max_speed * self.sprint_multiplier
        } else {
            self.base_max_speed
        }
    }
}

impl Default for MovementLimits {
    fn default() -> Self {
        Self::from_tuning(&PlayerTuning::default())
    }
}

// =============================================================================
// OUTCOMES
// =============================================================================

/// Why a movement report was discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveRejection {
    /// Player is not in `Playing`
    NotPlaying(LifecycleState),
    /// Non-finite values or a negative delta time
    InvalidInput,
    /// Reported speed above the tolerated max
    SpeedExceeded {
        /// Reported speed
        speed: f32,
        /// Tolerated max speed
        max: f32,
    },
    /// Position moved further than the tolerated max for the elapsed time
    PositionDeltaExceeded {
        /// Distance moved
        delta: f32,
        /// Tolerated max distance
        max: f32,
    },
}

impl fmt::Display for MoveRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveRejection::NotPlaying(state) => write!(f, "player is {}", state),
            MoveRejection::InvalidInput => write!(f, "invalid movement input"),
            MoveRejection::SpeedExceeded { speed, max } => {
                write!(f, "speed {:.2} exceeds {:.2}", speed, max)
            }
            MoveRejection::PositionDeltaExceeded { delta, max } => {
                write!(f, "position delta {:.2} exceeds {:.2}", delta, max)
            }
        }
    }
}

/// Result of a movement report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    /// Report applied
    Accepted,
    /// Report discarded, state unchanged
    Rejected(MoveRejection),
}

impl MoveOutcome {
    /// Whether the report was applied.
    pub fn is_accepted(&self) -> bool {
        matches!(self, MoveOutcome::Accepted)
    }
}

/// Point-in-time view of a player, for callers outside the world task.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatus {
    /// Player id
    pub id: PlayerId,
    /// Lifecycle state
    pub state: LifecycleState,
    /// Last accepted position
    pub position: Vec3,
    /// Last accepted velocity
    pub velocity: Vec3,
    /// Last reported rotation
    pub rotation: Quat,
    /// Sprint flag
    pub sprinting: bool,
    /// Movement reports applied
    pub accepted_moves: u64,
    /// Movement reports discarded
    pub rejected_moves: u64,
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Authoritative movement state of one player.
#[derive(Debug, Clone)]
pub struct PlayerController {
    id: PlayerId,
    state: LifecycleState,
    position: Vec3,
    velocity: Vec3,
    rotation: Quat,
    sprinting: bool,
    spawn_position: Option<Vec3>,
    spawned_at: Option<Instant>,
    last_movement: Instant,
    limits: MovementLimits,
    validation: MovementValidation,
    accepted_moves: u64,
    rejected_moves: u64,
    disconnect_reason: Option<String>,
}

impl PlayerController {
    /// Create an uninitialized controller.
    pub fn new(id: PlayerId, limits: MovementLimits, validation: MovementValidation) -> Self {
        Self {
            id,
            state: LifecycleState::Uninitialized,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            sprinting: false,
            spawn_position: None,
            spawned_at: None,
            last_movement: Instant::now(),
            limits,
            validation,
            accepted_moves: 0,
            rejected_moves: 0,
            disconnect_reason: None,
        }
    }

    /// Player id.
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Last accepted position.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Last accepted velocity.
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Last reported rotation.
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Sprint flag.
    pub fn is_sprinting(&self) -> bool {
        self.sprinting
    }

    /// Whether movement reports are accepted.
    pub fn is_playing(&self) -> bool {
        self.state == LifecycleState::Playing
    }

    /// Where the player last spawned.
    pub fn spawn_position(&self) -> Option<Vec3> {
        self.spawn_position
    }

    /// Time spent since the last spawn.
    pub fn time_since_spawn(&self) -> Option<Duration> {
        self.spawned_at.map(|at| Instant::now().saturating_duration_since(at))
    }

    /// Reason given on disconnect.
    pub fn disconnect_reason(&self) -> Option<&str> {
        self.disconnect_reason.as_deref()
    }

    /// Tuned speed limits.
    pub fn limits(&self) -> MovementLimits {
        self.limits
    }

    /// Current max speed for the player's stance.
    pub fn max_speed(&self) -> f32 {
        self.limits.max_speed(self.sprinting)
    }

    /// Place the player at a spawn point. Only valid once, from `Uninitialized`.
    pub fn initialize_player(&mut self, spawn_position: Vec3) -> Result<(), LifecycleError> {
        if self.state != LifecycleState::Uninitialized {
            return Err(LifecycleError::InvalidTransition {
                from: self.state,
                to: LifecycleState::Spawning,
            });
        }

        let now = Instant::now();
        self.position = spawn_position;
        self.velocity = Vec3::ZERO;
        self.sprinting = false;
        self.spawn_position = Some(spawn_position);
        self.spawned_at = Some(now);
        self.last_movement = now;
        self.transition(LifecycleState::Spawning);
        Ok(())
    }

    /// Finish spawning. No-op unless `Spawning`; returns whether it moved.
    pub fn complete_spawning(&mut self) -> bool {
        if self.state != LifecycleState::Spawning {
            debug!("Player {} not spawning ({}), ignoring", self.id, self.state);
            return false;
        }
        self.transition(LifecycleState::Playing);
        true
    }

    /// `Playing` -> `Dead`.
    pub fn kill(&mut self) -> Result<(), LifecycleError> {
        self.leave_play(LifecycleState::Dead)
    }

    /// `Playing` -> `Spectating`.
    pub fn spectate(&mut self) -> Result<(), LifecycleError> {
        self.leave_play(LifecycleState::Spectating)
    }

    /// Force `Disconnected` from any state.
    pub fn disconnect(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        info!("Player {} disconnected: {}", self.id, reason);
        self.velocity = Vec3::ZERO;
        self.sprinting = false;
        self.disconnect_reason = Some(reason);
        self.transition(LifecycleState::Disconnected);
    }

    fn leave_play(&mut self, to: LifecycleState) -> Result<(), LifecycleError> {
        if self.state != LifecycleState::Playing {
            return Err(LifecycleError::InvalidTransition { from: self.state, to });
        }
        self.velocity = Vec3::ZERO;
        self.sprinting = false;
        self.transition(to);
        Ok(())
    }

    fn transition(&mut self, to: LifecycleState) {
        info!("Player {} {} -> {}", self.id, self.state, to);
        self.state = to;
    }

    /// Validate and apply a movement report.
    pub fn update_movement(&mut self, new_position: Vec3, new_velocity: Vec3, delta_time: f32) -> MoveOutcome {
        match self.validate(new_position, new_velocity, delta_time) {
            Ok(()) => {
                self.position = new_position;
                self.velocity = new_velocity;
                self.last_movement = Instant::now().max(self.last_movement);
                self.accepted_moves += 1;
                MoveOutcome::Accepted
            }
            Err(rejection) => {
                warn!("Rejected movement for player {}: {}", self.id, rejection);
                self.rejected_moves += 1;
                MoveOutcome::Rejected(rejection)
            }
        }
    }

    fn validate(&self, new_position: Vec3, new_velocity: Vec3, delta_time: f32) -> Result<(), MoveRejection> {
        if self.state != LifecycleState::Playing {
            return Err(MoveRejection::NotPlaying(self.state));
        }
        if !is_finite(new_position) || !is_finite(new_velocity) || !delta_time.is_finite() || delta_time < 0.0 {
            return Err(MoveRejection::InvalidInput);
        }
        if !self.validation.enable_anti_cheat {
            return Ok(());
        }

        let max_speed = self.max_speed();

        let speed = new_velocity.length();
        let speed_limit = max_speed * self.validation.speed_tolerance;
        if speed > speed_limit {
            return Err(MoveRejection::SpeedExceeded { speed, max: speed_limit });
        }

        let delta = self.position.distance(new_position);
        let delta_limit = max_speed * delta_time * self.validation.position_tolerance;
        if delta > delta_limit {
            return Err(MoveRejection::PositionDeltaExceeded { delta, max: delta_limit });
        }

        Ok(())
    }

    /// Set the sprint flag used for the speed limit.
    pub fn set_sprinting(&mut self, sprinting: bool) {
        self.sprinting = sprinting;
    }

    /// Rotation is client-owned; only lifecycle is checked.
    pub fn update_rotation(&mut self, rotation: Quat) -> bool {
        if self.state != LifecycleState::Playing {
            return false;
        }
        self.rotation = rotation;
        true
    }

    /// No accepted movement for longer than `threshold`.
    pub fn is_idle(&self, threshold: Duration) -> bool {
        Instant::now().saturating_duration_since(self.last_movement) > threshold
    }

    /// Time since the last accepted movement (or spawn).
    pub fn idle_for(&self) -> Duration {
        Instant::now().saturating_duration_since(self.last_movement)
    }

    /// Snapshot for callers outside the world task.
    pub fn status(&self) -> PlayerStatus {
        PlayerStatus {
            id: self.id,
            state: self.state,
            position: self.position,
            velocity: self.velocity,
            rotation: self.rotation,
            sprinting: self.sprinting,
            accepted_moves: self.accepted_moves,
            rejected_moves: self.rejected_moves,
        }
    }
}

fn is_finite(v: Vec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}
