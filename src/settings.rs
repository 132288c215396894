//! Character configuration and the fixed tolerances of the controller.
//!
//! The tolerance constants are part of the observable behavior of the
//! controller; changing them changes how characters rest on and slide along
//! geometry.

use crate::error::CharacterError;
use crate::shape::CharacterShape;

/// Gap kept between the character and everything it touches.
pub const CHARACTER_PADDING: f32 = 0.02;
/// Contacts are discovered up to this far away from the character.
pub const PREDICTIVE_CONTACT_DISTANCE: f32 = 0.1;
/// Distance below which a contact counts as touching.
pub const COLLISION_TOLERANCE: f32 = 1.0e-3;
/// Sub-iterations stop once less time than this remains.
pub const MIN_TIME_REMAINING: f32 = 1.0e-4;
/// Both contacts must penetrate at least this deep to be considered conflicting.
pub const MIN_REQUIRED_PENETRATION: f32 = 0.005 + CHARACTER_PADDING;
/// A slope cosine at or above this value means "no slope limit".
pub const NO_SLOPE_LIMIT_COS: f32 = 0.999;

/// Default max walkable slope (50 degrees).
pub const DEFAULT_MAX_SLOPE_ANGLE: f32 = 50.0 * std::f32::consts::PI / 180.0;
/// Default max push force in Newtons.
pub const DEFAULT_MAX_STRENGTH: f32 = 100.0;
/// Default character mass in kg.
pub const DEFAULT_MASS: f32 = 70.0;
/// Default penetration recovery speed (1.0 resolves a penetration within one second).
pub const DEFAULT_PENETRATION_RECOVERY_SPEED: f32 = 1.0;

/// Work bounds for one character step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverLimits {
    /// Constraint solver iterations per sub-iteration. Default: 15.
    pub max_constraint_iterations: usize,
    /// Discover/solve/sweep sub-iterations per step. Default: 5.
    pub max_collision_iterations: usize,
    /// Contacts collected per world query. Default: 256.
    pub max_num_hits: usize,
}

impl Default for SolverLimits {
    fn default() -> Self {
        Self {
            max_constraint_iterations: 15,
            max_collision_iterations: 5,
            max_num_hits: 256,
        }
    }
}

impl SolverLimits {
    fn validate(&self) -> Result<(), CharacterError> {
        if self.max_constraint_iterations == 0 {
            return Err(CharacterError::InvalidLimit("max_constraint_iterations"));
        }
        if self.max_collision_iterations == 0 {
            return Err(CharacterError::InvalidLimit("max_collision_iterations"));
        }
        if self.max_num_hits == 0 {
            return Err(CharacterError::InvalidLimit("max_num_hits"));
        }
        Ok(())
    }
}

/// Configuration for a [`CharacterVirtual`](crate::CharacterVirtual).
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterSettings {
    /// Collision shape. Default: capsule, radius 0.3, half height 0.675.
    pub shape: CharacterShape,
    /// Steepest walkable slope in radians. Default: 50 degrees.
    pub max_slope_angle: f32,
    /// Maximum force used to push dynamic bodies. Default: 100.
    pub max_strength: f32,
    /// Character mass, used for pushing and standing on dynamic bodies. Default: 70.
    pub mass: f32,
    /// Fraction of a penetration resolved per second. Default: 1.0.
    pub penetration_recovery_speed: f32,
    /// Iteration caps.
    pub limits: SolverLimits,
}

impl Default for CharacterSettings {
    fn default() -> Self {
        Self {
            shape: CharacterShape::Capsule {
                radius: 0.3,
                half_height: 0.675,
            },
            max_slope_angle: DEFAULT_MAX_SLOPE_ANGLE,
            max_strength: DEFAULT_MAX_STRENGTH,
            mass: DEFAULT_MASS,
            penetration_recovery_speed: DEFAULT_PENETRATION_RECOVERY_SPEED,
            limits: SolverLimits::default(),
        }
    }
}

impl CharacterSettings {
    /// Check every field, returning the first invalid one.
    pub fn validate(&self) -> Result<(), CharacterError> {
        self.shape.validate()?;
        validate_slope_angle(self.max_slope_angle)?;
        validate_mass(self.mass)?;
        validate_strength(self.max_strength)?;
        validate_recovery_speed(self.penetration_recovery_speed)?;
        self.limits.validate()
    }
}

pub(crate) fn validate_slope_angle(angle: f32) -> Result<(), CharacterError> {
    if angle.is_finite() && (0.0..=std::f32::consts::FRAC_PI_2).contains(&angle) {
        Ok(())
    } else {
        Err(CharacterError::InvalidSlopeAngle(angle))
    }
}

pub(crate) fn validate_mass(mass: f32) -> Result<(), CharacterError> {
    if mass.is_finite() && mass > 0.0 {
        Ok(())
    } else {
        Err(CharacterError::InvalidMass(mass))
    }
}

pub(crate) fn validate_strength(strength: f32) -> Result<(), CharacterError> {
    if strength.is_finite() && strength >= 0.0 {
        Ok(())
    } else {
        Err(CharacterError::InvalidStrength(strength))
    }
}

pub(crate) fn validate_recovery_speed(speed: f32) -> Result<(), CharacterError> {
    if speed.is_finite() && speed >= 0.0 {
        Ok(())
    } else {
        Err(CharacterError::InvalidRecoverySpeed(speed))
    }
}
