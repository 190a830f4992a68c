//! Tuning Rows
//!
//! Game mode rules (`GameModeTuning_DT`) and character movement tuning
//! (`PlayerTuning_DT`). Missing fields take the engine defaults.

use serde::{Deserialize, Serialize};

// ============================================================================
// Game mode tuning
// ============================================================================

/// Game mode tuning row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameModeTuning {
    /// Gameplay tags whose XP is scaled
    #[serde(rename = "m_gameplayTagsModifiedXP")]
    pub gameplay_tags_modified_xp: Vec<String>,
    /// XP scale for tagged sources
    #[serde(rename = "m_xpModificationOnGameplayTagsMultiplier")]
    pub xp_modification_on_gameplay_tags_multiplier: f32,
    /// Quest list that ends the match
    #[serde(rename = "m_questVictoryConditionQuestList")]
    pub quest_victory_condition_quest_list: i32,
    /// Delay before new quests (s)
    #[serde(rename = "m_addQuestTimerDelay")]
    pub add_quest_timer_delay: f32,
    /// Hard quests offered
    #[serde(rename = "m_amountOfHardQuests")]
    pub amount_of_hard_quests: i32,
    /// Medium quests offered
    #[serde(rename = "m_amountOfMediumQuests")]
    pub amount_of_medium_quests: i32,
    /// Share of score passed to squad mates
    #[serde(rename = "m_scoreSharingMultiplier")]
    pub score_sharing_multiplier: f32,
    /// Share of currency passed to squad mates
    #[serde(rename = "m_currencySharingMultiplier")]
    pub currency_sharing_multiplier: f32,
    /// Share of XP passed to squad mates
    #[serde(rename = "m_xpSharingMultiplier")]
    pub xp_sharing_multiplier: f32,
    /// Hold time to break a pact (s)
    #[serde(rename = "m_pactBreakInteractionTime")]
    pub pact_break_interaction_time: f32,
    /// Track the activity heatmap
    #[serde(rename = "m_heatmapEnabled")]
    pub heatmap_enabled: bool,
    /// Heat from the player itself
    #[serde(rename = "m_ownPlayerHeatScore")]
    pub own_player_heat_score: f32,
    /// Heat from pact mates
    #[serde(rename = "m_pactMateHeatScore")]
    pub pact_mate_heat_score: f32,
    /// Heat from non-player characters
    #[serde(rename = "m_nonPlayerHeatScore")]
    pub non_player_heat_score: f32,
    /// Heat from other players
    #[serde(rename = "m_playerHeatScore")]
    pub player_heat_score: f32,
    /// Heat from vehicles
    #[serde(rename = "m_vehicleHeatScore")]
    pub vehicle_heat_score: f32,
    /// Heat from recent damage
    #[serde(rename = "m_recentlyDealtDamageScore")]
    pub recently_dealt_damage_score: f32,
    /// Window for recent damage (s)
    #[serde(rename = "m_recentlyDealDamageHeatMapTimeSpan")]
    pub recently_deal_damage_heat_map_time_span: f32,
    /// Reward callback timeout (s)
    #[serde(rename = "m_sessionTimeoutCallbackRewards")]
    pub session_timeout_callback_rewards: f32,
    /// Session owns resource nodes
    #[serde(rename = "m_sessionManagesResources")]
    pub session_manages_resources: bool,
    /// Interaction speed multiplier
    #[serde(rename = "m_interactionMultiplier")]
    pub interaction_multiplier: f32,
    /// Interaction trace radius
    #[serde(rename = "m_interactionTraceSphere")]
    pub interaction_trace_sphere: f32,
    /// Trace through attached actors
    #[serde(rename = "m_checkRecursiveTrace")]
    pub check_recursive_trace: bool,
    /// Prefer NPCs when targeting
    #[serde(rename = "m_prioritizeNonPlayerCharacters")]
    pub prioritize_non_player_characters: bool,
    /// Shut the session down when its timer expires
    #[serde(rename = "m_useSessionTimerShutdown")]
    pub use_session_timer_shutdown: bool,
    /// Hostile outline time after damage (s)
    #[serde(rename = "m_damageOutlineHostilePlayersDuration")]
    pub damage_outline_hostile_players_duration: f32,
    /// Down-but-not-out charges
    #[serde(rename = "m_DBNOCharges")]
    pub dbno_charges: i32,
    /// Mode identifier (`LOOP`, `STATION`, ...)
    #[serde(rename = "m_rowName")]
    pub row_name: Option<String>,
}

impl GameModeTuning {
    fn row_is(&self, name: &str) -> bool {
        self.row_name.as_deref() == Some(name)
    }

    /// Main extraction loop.
    pub fn is_loop_mode(&self) -> bool {
        self.row_is("LOOP")
    }

    /// Solo training match.
    pub fn is_solo_training_mode(&self) -> bool {
        self.row_is("SOLOTRAININGMATCH")
    }

    /// Limited-time event.
    pub fn is_event_mode(&self) -> bool {
        self.row_is("EVENT")
    }

    /// Sandbox.
    pub fn is_sandbox_mode(&self) -> bool {
        self.row_is("SANDBOX")
    }

    /// Social hub.
    pub fn is_station_mode(&self) -> bool {
        self.row_is("STATION")
    }

    /// Score is shared with squad mates.
    pub fn allows_score_sharing(&self) -> bool {
        self.score_sharing_multiplier > 0.0
    }

    /// Currency is shared with squad mates.
    pub fn allows_currency_sharing(&self) -> bool {
        self.currency_sharing_multiplier > 0.0
    }

    /// XP is shared with squad mates.
    pub fn allows_xp_sharing(&self) -> bool {
        self.xp_sharing_multiplier > 0.0
    }

    /// Session ends when its timer expires.
    pub fn has_timer_shutdown(&self) -> bool {
        self.use_session_timer_shutdown
    }
}

// ============================================================================
// Player tuning
// ============================================================================

/// Character movement mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementMode {
    /// On the ground
    Walking,
    /// Crouched on the ground
    Crouching,
    /// Flying
    Flying,
    /// In water
    Swimming,
    /// In the air
    Falling,
}

/// Rotation speeds in degrees per second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct RotationRate {
    /// Pitch rate
    pub pitch: f32,
    /// Yaw rate
    pub yaw: f32,
    /// Roll rate
    pub roll: f32,
}

/// Character movement tuning row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PlayerTuning {
    /// Base walking speed (units/s)
    pub walk_speed: f32,
    /// Absolute sprint speed (units/s)
    pub sprint_speed: f32,
    /// Crouched speed (units/s)
    pub crouch_speed: f32,
    /// Multiplier on walk speed while sprinting
    pub sprint_speed_multiplier: f32,
    /// Initial jump velocity
    #[serde(rename = "JumpZVelocity")]
    pub jump_z_velocity: f32,
    /// Max acceleration
    pub max_acceleration: f32,
    /// Deceleration with no input
    pub braking_deceleration: f32,
    /// Ground friction
    pub ground_friction: f32,
    /// Engine walk speed cap
    pub max_walk_speed: f32,
    /// Engine crouch speed cap
    pub max_walk_speed_crouched: f32,
    /// Fly speed cap
    pub max_fly_speed: f32,
    /// Swim speed cap
    pub max_swim_speed: f32,
    /// Lateral control while falling
    pub air_control: f32,
    /// Air control boost at low speed
    pub air_control_boost_multiplier: f32,
    /// Lateral friction while falling
    pub falling_lateral_friction: f32,
    /// Gravity multiplier
    pub gravity_scale: f32,
    /// Max step-up height
    pub max_step_height: f32,
    /// Slowest analog walk speed
    pub min_analog_walk_speed: f32,
    /// Turn rates
    pub rotation_rate: Option<RotationRate>,
    /// Face the controller rotation
    pub use_controller_desired_rotation: bool,
    /// Face the movement direction
    pub orient_rotation_to_movement: bool,
    /// Use `braking_friction` when braking
    #[serde(rename = "bUseSeparateBrakingFriction")]
    pub use_separate_braking_friction: bool,
    /// Braking friction
    pub braking_friction: f32,
    /// Braking simulation step (s)
    pub braking_sub_step_time: f32,
    /// Max simulation step (s)
    pub max_simulation_time_step: f32,
    /// Max simulation iterations per tick
    pub max_simulation_iterations: i32,
}

impl PlayerTuning {
    /// Default walk speed (units/s).
    pub const DEFAULT_WALK_SPEED: f32 = 357.0;

    /// Default crouch speed (units/s).
    pub const DEFAULT_CROUCH_SPEED: f32 = 150.0;

    /// Default sprint multiplier.
    pub const DEFAULT_SPRINT_MULTIPLIER: f32 = 1.91;

    /// Speed for the current stance. Crouching wins over sprinting.
    pub fn effective_walk_speed(&self, sprinting: bool, crouching: bool) -> f32 {
        if crouching {
            self.crouch_speed
        } else if sprinting {
            self.walk_speed * self.sprint_speed_multiplier
        } else {
            self.walk_speed
        }
    }

    /// Configured speed cap for a movement mode.
    pub fn max_speed_for_mode(&self, mode: MovementMode) -> f32 {
        match mode {
            MovementMode::Walking => self.max_walk_speed,
            MovementMode::Crouching => self.max_walk_speed_crouched,
            MovementMode::Flying => self.max_fly_speed,
            MovementMode::Swimming => self.max_swim_speed,
            MovementMode::Falling => self.max_walk_speed,
        }
    }
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            walk_speed: Self::DEFAULT_WALK_SPEED,
            sprint_speed: 0.0,
            crouch_speed: Self::DEFAULT_CROUCH_SPEED,
            sprint_speed_multiplier: Self::DEFAULT_SPRINT_MULTIPLIER,
            jump_z_velocity: 0.0,
            max_acceleration: 0.0,
            braking_deceleration: 0.0,
            ground_friction: 0.0,
            max_walk_speed: 0.0,
            max_walk_speed_crouched: 0.0,
            max_fly_speed: 0.0,
            max_swim_speed: 0.0,
            air_control: 0.0,
            air_control_boost_multiplier: 0.0,
            falling_lateral_friction: 0.0,
            gravity_scale: 1.0,
            max_step_height: 0.0,
            min_analog_walk_speed: 0.0,
            rotation_rate: None,
            use_controller_desired_rotation: false,
            orient_rotation_to_movement: false,
            use_separate_braking_friction: false,
            braking_friction: 0.0,
            braking_sub_step_time: 0.0,
            max_simulation_time_step: 0.0,
            max_simulation_iterations: 0,
        }
    }
}
