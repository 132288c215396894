//! Character collision shapes.

use glam::{Quat, Vec3};

use crate::error::CharacterError;

/// Convex shape swept through the scene by a character.
///
/// Both variants are a core segment inflated by a radius. The capsule axis is
/// the character's local Y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CharacterShape {
    Sphere { radius: f32 },
    Capsule { radius: f32, half_height: f32 },
}

impl CharacterShape {
    /// Capsule from total height (cap to cap) and radius.
    pub fn capsule_from_height(height: f32, radius: f32) -> Self {
        CharacterShape::Capsule {
            radius,
            half_height: (0.5 * height - radius).max(0.0),
        }
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        match self {
            CharacterShape::Sphere { radius } | CharacterShape::Capsule { radius, .. } => *radius,
        }
    }

    /// Half length of the core segment (zero for a sphere).
    #[inline]
    pub fn half_height(&self) -> f32 {
        match self {
            CharacterShape::Sphere { .. } => 0.0,
            CharacterShape::Capsule { half_height, .. } => *half_height,
        }
    }

    /// World-space endpoints of the core segment, bottom first.
    #[inline]
    pub fn core_segment(&self, position: Vec3, rotation: Quat) -> (Vec3, Vec3) {
        let axis = rotation * Vec3::new(0.0, self.half_height(), 0.0);
        (position - axis, position + axis)
    }

    pub(crate) fn validate(&self) -> Result<(), CharacterError> {
        let radius = self.radius();
        if !radius.is_finite() || radius <= 0.0 {
            return Err(CharacterError::InvalidShape("radius must be positive and finite"));
        }
        let half_height = self.half_height();
        if !half_height.is_finite() || half_height < 0.0 {
            return Err(CharacterError::InvalidShape(
                "half height must be non-negative and finite",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capsule_core_segment() {
        let shape = CharacterShape::Capsule {
            radius: 0.3,
            half_height: 0.5,
        };
        let (a, b) = shape.core_segment(Vec3::new(1.0, 2.0, 0.0), Quat::IDENTITY);
        let eps = 1e-6;
        assert!((a - Vec3::new(1.0, 1.5, 0.0)).length() < eps);
        assert!((b - Vec3::new(1.0, 2.5, 0.0)).length() < eps);
    }

    #[test]
    fn test_sphere_core_is_point() {
        let shape = CharacterShape::Sphere { radius: 0.5 };
        let (a, b) = shape.core_segment(Vec3::ONE, Quat::from_rotation_z(1.0));
        assert_eq!(a, b);
        assert_eq!(shape.half_height(), 0.0);
    }

    #[test]
    fn test_capsule_from_height() {
        let shape = CharacterShape::capsule_from_height(1.8, 0.3);
        assert!((shape.half_height() - 0.6).abs() < 1e-6);
        assert!((shape.radius() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_validate_rejects_bad_radius() {
        assert!(CharacterShape::Sphere { radius: 0.0 }.validate().is_err());
        assert!(CharacterShape::Sphere { radius: f32::NAN }.validate().is_err());
        assert!(CharacterShape::Capsule {
            radius: 0.3,
            half_height: -1.0
        }
        .validate()
        .is_err());
        assert!(CharacterShape::Sphere { radius: 0.3 }.validate().is_ok());
    }
}
