//! Collider bounds and compound traversal.

use std::ops::ControlFlow;

use glam::{Mat3, Vec3};

use crate::world::SubShapeId;

use super::components::{Collider, ColliderShape, Transform};

/// Axis-aligned bounding box for broadphase queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsAabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl PhysicsAabb {
    /// Unbounded box, overlaps everything.
    pub const INFINITE: PhysicsAabb = PhysicsAabb {
        min: Vec3::splat(f32::NEG_INFINITY),
        max: Vec3::splat(f32::INFINITY),
    };

    /// Empty box, overlaps nothing and is the identity of [`union`](Self::union).
    pub const EMPTY: PhysicsAabb = PhysicsAabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Test whether two AABBs overlap.
    #[inline]
    pub fn overlaps(&self, other: &PhysicsAabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    #[inline]
    pub fn union(&self, other: &PhysicsAabb) -> PhysicsAabb {
        PhysicsAabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Bounds of a segment inflated by `radius`.
    #[inline]
    pub fn from_segment(a: Vec3, b: Vec3, radius: f32) -> PhysicsAabb {
        PhysicsAabb {
            min: a.min(b) - Vec3::splat(radius),
            max: a.max(b) + Vec3::splat(radius),
        }
    }
}

impl ColliderShape {
    /// Compute the world-space AABB for this shape.
    pub fn compute_aabb(&self, transform: &Transform) -> PhysicsAabb {
        match self {
            ColliderShape::Sphere { radius } => PhysicsAabb {
                min: transform.position - Vec3::splat(*radius),
                max: transform.position + Vec3::splat(*radius),
            },
            ColliderShape::Box { half_extents } => aabb_from_extents(*half_extents, transform),
            ColliderShape::Capsule {
                radius,
                half_height,
            } => {
                let axis = transform.rotation * Vec3::new(0.0, *half_height, 0.0);
                PhysicsAabb::from_segment(
                    transform.position - axis,
                    transform.position + axis,
                    *radius,
                )
            }
            ColliderShape::Cylinder {
                radius,
                half_height,
            } => {
                let extents = Vec3::new(*radius, *half_height, *radius);
                aabb_from_extents(extents, transform)
            }
            ColliderShape::HalfSpace => PhysicsAabb::INFINITE,
            ColliderShape::Compound { parts } => {
                parts.iter().fold(PhysicsAabb::EMPTY, |aabb, part| {
                    let child = transform.compose(part.offset, part.rotation);
                    aabb.union(&part.shape.compute_aabb(&child))
                })
            }
        }
    }

    /// Call `f` for every non-compound shape with its world transform and
    /// sub-shape id. Ids number the leaves depth first, starting at 0.
    pub fn visit_leaves(
        &self,
        transform: &Transform,
        f: &mut dyn FnMut(SubShapeId, &ColliderShape, &Transform) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        let mut next = 0;
        self.visit_leaves_from(transform, &mut next, f)
    }

    fn visit_leaves_from(
        &self,
        transform: &Transform,
        next: &mut u32,
        f: &mut dyn FnMut(SubShapeId, &ColliderShape, &Transform) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        match self {
            ColliderShape::Compound { parts } => {
                for part in parts {
                    let child = transform.compose(part.offset, part.rotation);
                    if part.shape.visit_leaves_from(&child, next, f).is_break() {
                        return ControlFlow::Break(());
                    }
                }
                ControlFlow::Continue(())
            }
            leaf => {
                let id = SubShapeId(*next);
                *next += 1;
                f(id, leaf, transform)
            }
        }
    }
}

impl Collider {
    /// World transform of the collider given its body's transform.
    #[inline]
    pub fn world_transform(&self, body: &Transform) -> Transform {
        Transform {
            position: body.to_world(self.offset),
            rotation: body.rotation,
        }
    }

    pub fn compute_aabb(&self, body: &Transform) -> PhysicsAabb {
        self.shape.compute_aabb(&self.world_transform(body))
    }
}

/// Compute world-space AABB from local half-extents and a transform.
#[inline]
fn aabb_from_extents(half_extents: Vec3, transform: &Transform) -> PhysicsAabb {
    let rot = Mat3::from_quat(transform.rotation);

    // For each world axis, compute the extent by projecting the local box axes
    let extent = rot.x_axis.abs() * half_extents.x
        + rot.y_axis.abs() * half_extents.y
        + rot.z_axis.abs() * half_extents.z;

    PhysicsAabb {
        min: transform.position - extent,
        max: transform.position + extent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::components::CompoundPart;
    use glam::Quat;

    #[test]
    fn test_sphere_aabb() {
        let shape = ColliderShape::Sphere { radius: 1.0 };
        let transform = Transform::from_position(Vec3::new(0.0, 5.0, 0.0));
        let aabb = shape.compute_aabb(&transform);

        let eps = 1e-5;
        assert!((aabb.min - Vec3::new(-1.0, 4.0, -1.0)).length() < eps);
        assert!((aabb.max - Vec3::new(1.0, 6.0, 1.0)).length() < eps);
    }

    #[test]
    fn test_rotated_box_aabb() {
        let shape = ColliderShape::Box {
            half_extents: Vec3::new(1.0, 2.0, 3.0),
        };
        let transform = Transform::from_position_rotation(
            Vec3::ZERO,
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        );
        let aabb = shape.compute_aabb(&transform);

        let eps = 1e-5;
        assert!((aabb.min - Vec3::new(-2.0, -1.0, -3.0)).length() < eps);
        assert!((aabb.max - Vec3::new(2.0, 1.0, 3.0)).length() < eps);
    }

    #[test]
    fn test_aabb_overlap() {
        let a = PhysicsAabb {
            min: Vec3::new(-1.0, -1.0, -1.0),
            max: Vec3::new(1.0, 1.0, 1.0),
        };
        let b = PhysicsAabb {
            min: Vec3::new(0.5, 0.5, 0.5),
            max: Vec3::new(2.0, 2.0, 2.0),
        };
        let c = PhysicsAabb {
            min: Vec3::new(2.0, 2.0, 2.0),
            max: Vec3::new(3.0, 3.0, 3.0),
        };
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(PhysicsAabb::INFINITE.overlaps(&c));
        assert!(!PhysicsAabb::EMPTY.overlaps(&a));
    }

    #[test]
    fn test_compound_aabb_and_leaf_ids() {
        let shape = ColliderShape::Compound {
            parts: vec![
                CompoundPart::new(
                    Vec3::new(-2.0, 0.0, 0.0),
                    Quat::IDENTITY,
                    ColliderShape::Sphere { radius: 0.5 },
                ),
                CompoundPart::new(
                    Vec3::ZERO,
                    Quat::IDENTITY,
                    ColliderShape::Compound {
                        parts: vec![CompoundPart::new(
                            Vec3::new(2.0, 0.0, 0.0),
                            Quat::IDENTITY,
                            ColliderShape::Box {
                                half_extents: Vec3::splat(0.5),
                            },
                        )],
                    },
                ),
            ],
        };
        let transform = Transform::identity();
        let aabb = shape.compute_aabb(&transform);
        let eps = 1e-5;
        assert!((aabb.min - Vec3::new(-2.5, -0.5, -0.5)).length() < eps);
        assert!((aabb.max - Vec3::new(2.5, 0.5, 0.5)).length() < eps);

        let mut leaves = Vec::new();
        let mut record = |id: SubShapeId, _: &ColliderShape, tf: &Transform| {
            leaves.push((id, tf.position));
            ControlFlow::Continue(())
        };
        let flow = shape.visit_leaves(&transform, &mut record);
        assert!(flow.is_continue());
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].0, SubShapeId(0));
        assert_eq!(leaves[1].0, SubShapeId(1));
        assert!((leaves[1].1 - Vec3::new(2.0, 0.0, 0.0)).length() < eps);
    }

    #[test]
    fn test_collider_offset_is_rotated() {
        let collider = Collider::new(ColliderShape::Sphere { radius: 1.0 })
            .with_offset(Vec3::new(0.0, 0.0, 1.0));
        let body = Transform::from_position_rotation(
            Vec3::ZERO,
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        );
        let aabb = collider.compute_aabb(&body);
        let eps = 1e-5;
        assert!((aabb.min - Vec3::new(0.0, -1.0, -1.0)).length() < eps);
    }
}
