//! Contact and constraint records produced during a character step.

use glam::Vec3;

use crate::math::Plane;
use crate::world::{BodyId, BodyRead, CollideShapeHit, MaterialId, MotionType, SubShapeId};

/// A surface near or touching the character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Contact point on the obstacle.
    pub position: Vec3,
    /// Velocity of the obstacle surface at `position`.
    pub linear_velocity: Vec3,
    /// Unit normal pointing from the obstacle toward the character (zero if degenerate).
    pub normal: Vec3,
    /// Signed separation, padding already subtracted; negative means penetrating.
    pub distance: f32,
    /// Time of impact along a sweep, 0 for overlap contacts.
    pub fraction: f32,
    pub body: BodyId,
    pub sub_shape: SubShapeId,
    pub motion_type: MotionType,
    pub material: MaterialId,
    pub user_data: u64,
    /// The character touched this contact during the step.
    pub had_collision: bool,
    /// Rejected by the contact listener; ignored for the rest of the step.
    pub was_discarded: bool,
    /// When false the obstacle's velocity is not imparted on the character.
    pub can_push_character: bool,
}

impl Contact {
    /// Build a contact from a world hit while the obstacle is read-locked.
    pub(crate) fn from_hit<B: BodyRead + ?Sized>(
        hit: &CollideShapeHit,
        body: &B,
        fraction: f32,
    ) -> Self {
        Self {
            position: hit.contact_point,
            linear_velocity: body.point_velocity(hit.contact_point),
            normal: -hit.penetration_axis.normalize_or_zero(),
            distance: -hit.penetration_depth,
            fraction,
            body: hit.body,
            sub_shape: hit.sub_shape,
            motion_type: body.motion_type(),
            material: hit.material,
            user_data: body.user_data(),
            had_collision: false,
            was_discarded: false,
            can_push_character: true,
        }
    }

    /// Same obstacle part as `ignored`.
    #[inline]
    pub fn matches(&self, ignored: &IgnoredContact) -> bool {
        self.body == ignored.body && self.sub_shape == ignored.sub_shape
    }
}

/// Obstacle part excluded from sweep validation for the rest of a sub-iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IgnoredContact {
    pub body: BodyId,
    pub sub_shape: SubShapeId,
}

impl IgnoredContact {
    pub fn new(body: BodyId, sub_shape: SubShapeId) -> Self {
        Self { body, sub_shape }
    }
}

/// Velocity constraint derived from a contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    /// Index of the originating contact in the sub-iteration's contact list.
    pub contact: usize,
    /// Boundary the displacement may not cross, relative to the sub-iteration start.
    pub plane: Plane,
    /// Velocity at which the boundary moves.
    pub linear_velocity: Vec3,
    /// Closing speed toward the plane, refreshed every solver iteration.
    pub projected_velocity: f32,
    /// Time until the plane is reached, refreshed every solver iteration.
    pub toi: f32,
}

impl Constraint {
    pub fn new(contact: usize, plane: Plane, linear_velocity: Vec3) -> Self {
        Self {
            contact,
            plane,
            linear_velocity,
            projected_velocity: 0.0,
            toi: 0.0,
        }
    }
}
