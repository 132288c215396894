//! Configuration errors for the character controller.

use thiserror::Error;

/// Rejected character configuration.
///
/// Stepping a character never fails; only building or reconfiguring one does.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CharacterError {
    #[error("max slope angle must be within [0, pi/2] radians, got {0}")]
    InvalidSlopeAngle(f32),

    #[error("character mass must be positive and finite, got {0}")]
    InvalidMass(f32),

    #[error("max strength must be non-negative and finite, got {0}")]
    InvalidStrength(f32),

    #[error("penetration recovery speed must be non-negative and finite, got {0}")]
    InvalidRecoverySpeed(f32),

    #[error("invalid character shape: {0}")]
    InvalidShape(&'static str),

    #[error("solver limit `{0}` must be at least 1")]
    InvalidLimit(&'static str),
}
