//! The collision world interface consumed by the character controller.
//!
//! The controller never owns scene data. It asks a [`PhysicsWorld`] for shape
//! overlaps and shape casts, and reads or pushes obstacle bodies through
//! scoped per-body locks.

use std::ops::ControlFlow;

use glam::{Mat3, Quat, Vec3};

use crate::shape::CharacterShape;

/// Opaque identifier of a body in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u64);

/// Identifier of a sub-part (triangle, compound child) within a body's shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubShapeId(pub u32);

/// Surface material handle. `MaterialId::default()` is the world's default material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

/// How an obstacle moves.
///
/// Ordered from least to most mobile; the solver prefers less mobile obstacles
/// when two constraints are hit at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MotionType {
    /// Immovable.
    Static,
    /// Moved by the user, not affected by impulses.
    Kinematic,
    /// Affected by impulses.
    Dynamic,
}

/// Bit set of object layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: LayerMask = LayerMask(u32::MAX);
    pub const NONE: LayerMask = LayerMask(0);

    /// True if any of `layers` is in the mask.
    #[inline]
    pub fn intersects(self, layers: u32) -> bool {
        self.0 & layers != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::ALL
    }
}

/// Decides which bodies a query may report.
#[derive(Clone, Copy, Default)]
pub struct QueryFilter<'a> {
    /// Object layers that participate. Default: all.
    pub layers: LayerMask,
    /// A single body to skip, e.g. a physical proxy of the character.
    pub ignore_body: Option<BodyId>,
    /// Extra per-body predicate; `false` skips the body.
    pub body_filter: Option<&'a (dyn Fn(BodyId) -> bool + Sync)>,
}

impl<'a> QueryFilter<'a> {
    pub fn with_layers(layers: LayerMask) -> Self {
        Self {
            layers,
            ..Self::default()
        }
    }

    pub fn ignoring(body: BodyId) -> Self {
        Self {
            ignore_body: Some(body),
            ..Self::default()
        }
    }

    /// Whether a body living on `layers` passes the filter.
    pub fn should_collide(&self, body: BodyId, layers: u32) -> bool {
        self.layers.intersects(layers)
            && self.ignore_body != Some(body)
            && self.body_filter.map_or(true, |filter| filter(body))
    }
}

impl std::fmt::Debug for QueryFilter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryFilter")
            .field("layers", &self.layers)
            .field("ignore_body", &self.ignore_body)
            .field("body_filter", &self.body_filter.is_some())
            .finish()
    }
}

/// Settings for [`PhysicsWorld::collide_shape`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollideShapeSettings {
    /// Report shapes up to this far away from the query shape (depth down to minus this value).
    pub max_separation_distance: f32,
    /// Movement direction hint, lets mesh backends drop inactive edges behind the motion.
    pub active_edge_movement_direction: Vec3,
}

impl Default for CollideShapeSettings {
    fn default() -> Self {
        Self {
            max_separation_distance: 0.0,
            active_edge_movement_direction: Vec3::ZERO,
        }
    }
}

/// One overlap (or near miss) between the query shape and a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollideShapeHit {
    pub body: BodyId,
    pub sub_shape: SubShapeId,
    /// Contact point on the surface of the body.
    pub contact_point: Vec3,
    /// Direction the query shape would have to move to resolve the overlap, reversed
    /// (points from the query shape into the body). Not necessarily normalized.
    pub penetration_axis: Vec3,
    /// Overlap depth; negative when separated.
    pub penetration_depth: f32,
    pub material: MaterialId,
}

/// A body hit by a shape cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeCastHit {
    /// Fraction of the displacement travelled before touching, in `[0, 1]`.
    pub fraction: f32,
    /// Contact at the time of impact.
    pub contact: CollideShapeHit,
}

/// Read access to a body, valid for the duration of a [`PhysicsWorld::read_body`] call.
pub trait BodyRead {
    fn motion_type(&self) -> MotionType;

    /// Velocity of the body's material at a world-space point.
    fn point_velocity(&self, point: Vec3) -> Vec3;

    fn center_of_mass(&self) -> Vec3;

    /// Zero for static and kinematic bodies.
    fn inverse_mass(&self) -> f32;

    /// World-space inverse inertia tensor.
    fn inverse_inertia(&self) -> Mat3;

    /// Application data attached to the body.
    fn user_data(&self) -> u64 {
        0
    }
}

/// Write access to a body, valid for the duration of a [`PhysicsWorld::write_body`] call.
pub trait BodyWrite: BodyRead {
    /// Apply `impulse` at world-space `point`.
    fn add_impulse(&mut self, impulse: Vec3, point: Vec3);
}

/// Collision queries and body access used by the character controller.
///
/// Implementations must be usable from several threads at once when characters
/// are updated in parallel. A `None` from `read_body` or `write_body` means
/// the body no longer exists (or could not be locked) and is treated as if the
/// contact had never been found.
pub trait PhysicsWorld {
    /// Report every body within `settings.max_separation_distance` of `shape`
    /// placed at `position`/`rotation`. Stops when `collector` breaks.
    fn collide_shape(
        &self,
        shape: &CharacterShape,
        position: Vec3,
        rotation: Quat,
        settings: &CollideShapeSettings,
        filter: &QueryFilter<'_>,
        collector: &mut dyn FnMut(CollideShapeHit) -> ControlFlow<()>,
    );

    /// Sweep `shape` from `position` along `displacement`, reporting every body it
    /// touches, in any order. Stops when `collector` breaks.
    fn cast_shape(
        &self,
        shape: &CharacterShape,
        position: Vec3,
        rotation: Quat,
        displacement: Vec3,
        filter: &QueryFilter<'_>,
        collector: &mut dyn FnMut(ShapeCastHit) -> ControlFlow<()>,
    );

    /// Run `f` while holding a read lock on `body`.
    fn read_body<R>(&self, body: BodyId, f: impl FnOnce(&dyn BodyRead) -> R) -> Option<R>;

    /// Run `f` while holding a write lock on `body`.
    fn write_body<R>(&self, body: BodyId, f: impl FnOnce(&mut dyn BodyWrite) -> R) -> Option<R>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_type_order() {
        assert!(MotionType::Static < MotionType::Kinematic);
        assert!(MotionType::Kinematic < MotionType::Dynamic);
    }

    #[test]
    fn test_query_filter() {
        let filter = QueryFilter::default();
        assert!(filter.should_collide(BodyId(1), 1));

        let filter = QueryFilter::with_layers(LayerMask(0b10));
        assert!(!filter.should_collide(BodyId(1), 0b01));
        assert!(filter.should_collide(BodyId(1), 0b11));

        let filter = QueryFilter::ignoring(BodyId(7));
        assert!(!filter.should_collide(BodyId(7), 1));
        assert!(filter.should_collide(BodyId(8), 1));

        let only_even = |id: BodyId| id.0 % 2 == 0;
        let filter = QueryFilter {
            body_filter: Some(&only_even),
            ..QueryFilter::default()
        };
        assert!(filter.should_collide(BodyId(2), 1));
        assert!(!filter.should_collide(BodyId(3), 1));
    }
}
