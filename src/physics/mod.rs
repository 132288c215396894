//! Reference collision scene for characters, built on a `hecs` world.
//!
//! # Architecture
//!
//! Every query runs the same pipeline:
//!
//! 1. Broadphase candidate search (AABB overlap against the query bounds)
//! 2. Compound traversal down to leaf shapes
//! 3. Narrowphase signed distance (overlap queries) or conservative advancement (shape casts)
//! 4. Hits handed to the caller's collector until it breaks
//!
//! Body state lives behind a per-body lock, so any number of characters can
//! query and push bodies through a shared `&PhysicsScene` at the same time.
//! [`PhysicsScene::step`] then integrates the pushed bodies; bodies do not
//! collide with each other.

pub mod broadphase;
pub mod collider;
pub mod components;
pub mod narrowphase;
pub mod rigid_body;

use std::ops::{ControlFlow, Deref, DerefMut};

use glam::{Mat3, Quat, Vec3};

use crate::shape::CharacterShape;
use crate::world::{
    BodyId, BodyRead, BodyWrite, CollideShapeHit, CollideShapeSettings, MaterialId, MotionType,
    PhysicsWorld, QueryFilter, ShapeCastHit, SubShapeId,
};

pub use self::components::{
    Collider, ColliderShape, CompoundPart, RigidBody, RigidBodyType, Transform,
};

use self::broadphase::overlapping_bodies;
use self::collider::PhysicsAabb;
use self::rigid_body::SharedBody;

/// Errors returned by [`PhysicsScene`] mutators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("no body with id {0:?} in the scene")]
    NoSuchBody(BodyId),
}

/// Named surface material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicsMaterial {
    pub name: String,
}

impl From<hecs::Entity> for BodyId {
    fn from(entity: hecs::Entity) -> Self {
        body_id(entity)
    }
}

#[inline]
pub(crate) fn body_id(entity: hecs::Entity) -> BodyId {
    BodyId(entity.to_bits().get())
}

#[inline]
fn entity(body: BodyId) -> Option<hecs::Entity> {
    hecs::Entity::from_bits(body.0)
}

/// Scene of static, kinematic and dynamic bodies that characters move through.
pub struct PhysicsScene {
    world: hecs::World,
    materials: Vec<PhysicsMaterial>,
    gravity: Vec3,
}

impl Default for PhysicsScene {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PhysicsScene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsScene")
            .field("bodies", &self.world.len())
            .field("materials", &self.materials)
            .field("gravity", &self.gravity)
            .finish()
    }
}

impl PhysicsScene {
    /// Create an empty scene with only the default material and no gravity.
    pub fn new() -> Self {
        Self {
            world: hecs::World::new(),
            materials: vec![PhysicsMaterial {
                name: "default".to_string(),
            }],
            gravity: Vec3::ZERO,
        }
    }

    /// Register a material and return its id.
    pub fn add_material(&mut self, name: impl Into<String>) -> MaterialId {
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(PhysicsMaterial { name: name.into() });
        id
    }

    pub fn material(&self, id: MaterialId) -> Option<&PhysicsMaterial> {
        self.materials.get(id.0 as usize)
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Gravity applied to dynamic bodies by [`step`](Self::step). Default: zero.
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    pub fn add_body(
        &mut self,
        transform: Transform,
        body: RigidBody,
        collider: Collider,
    ) -> BodyId {
        let entity = self
            .world
            .spawn((transform, collider, SharedBody::new(body)));
        let id = body_id(entity);
        tracing::debug!(body = ?id, "body added to scene");
        id
    }

    pub fn remove_body(&mut self, id: BodyId) -> Result<(), SceneError> {
        let entity = entity(id).ok_or(SceneError::NoSuchBody(id))?;
        self.world
            .despawn(entity)
            .map_err(|_| SceneError::NoSuchBody(id))?;
        tracing::debug!(body = ?id, "body removed from scene");
        Ok(())
    }

    pub fn body_count(&self) -> usize {
        self.world.len() as usize
    }

    /// Copy of a body's current state.
    pub fn body(&self, id: BodyId) -> Option<RigidBody> {
        let shared = self.world.get::<&SharedBody>(entity(id)?).ok()?;
        Some(shared.snapshot())
    }

    pub fn transform(&self, id: BodyId) -> Option<Transform> {
        self.world
            .get::<&Transform>(entity(id)?)
            .ok()
            .map(|transform| *transform)
    }

    pub fn collider(&self, id: BodyId) -> Option<Collider> {
        self.world
            .get::<&Collider>(entity(id)?)
            .ok()
            .map(|collider| (*collider).clone())
    }

    pub fn set_transform(&mut self, id: BodyId, transform: Transform) -> Result<(), SceneError> {
        let entity = entity(id).ok_or(SceneError::NoSuchBody(id))?;
        let mut current = self
            .world
            .get::<&mut Transform>(entity)
            .map_err(|_| SceneError::NoSuchBody(id))?;
        *current = transform;
        Ok(())
    }

    /// Set the velocity of a dynamic or kinematic body.
    pub fn set_linear_velocity(&mut self, id: BodyId, velocity: Vec3) -> Result<(), SceneError> {
        let entity = entity(id).ok_or(SceneError::NoSuchBody(id))?;
        let mut shared = self
            .world
            .get::<&mut SharedBody>(entity)
            .map_err(|_| SceneError::NoSuchBody(id))?;
        shared.body_mut().linear_velocity = velocity;
        Ok(())
    }

    /// Advance bodies by `dt`: gravity, damping and position integration.
    pub fn step(&mut self, dt: f32) {
        if !(dt > 0.0 && dt.is_finite()) {
            tracing::warn!(dt, "scene step skipped: invalid delta time");
            return;
        }
        rigid_body::apply_gravity(&mut self.world, self.gravity * dt);
        rigid_body::integrate_positions(&mut self.world, dt);
    }
}

/// Body state seen through a held lock guard.
struct BodyView<B> {
    body: B,
    transform: Transform,
}

impl<B: Deref<Target = RigidBody>> BodyRead for BodyView<B> {
    fn motion_type(&self) -> MotionType {
        self.body.body_type.into()
    }

    fn point_velocity(&self, point: Vec3) -> Vec3 {
        rigid_body::point_velocity(&self.body, &self.transform, point)
    }

    fn center_of_mass(&self) -> Vec3 {
        self.transform.position
    }

    fn inverse_mass(&self) -> f32 {
        self.body.inverse_mass()
    }

    fn inverse_inertia(&self) -> Mat3 {
        self.body.inverse_inertia_world(self.transform.rotation)
    }

    fn user_data(&self) -> u64 {
        self.body.user_data
    }
}

impl<B: DerefMut<Target = RigidBody>> BodyWrite for BodyView<B> {
    fn add_impulse(&mut self, impulse: Vec3, point: Vec3) {
        rigid_body::apply_impulse(&mut self.body, &self.transform, impulse, point);
    }
}

/// Visitor over the leaf shapes of candidate bodies.
type LeafVisitor<'a> =
    dyn FnMut(BodyId, &Collider, SubShapeId, &ColliderShape, &Transform) -> ControlFlow<()> + 'a;

impl PhysicsScene {
    /// Run `f` on every leaf of every candidate collider. Stops when `f` breaks.
    fn for_each_leaf(
        &self,
        bounds: &PhysicsAabb,
        filter: &QueryFilter<'_>,
        f: &mut LeafVisitor<'_>,
    ) {
        for entity in overlapping_bodies(&self.world, bounds, filter) {
            let (Ok(collider), Ok(transform)) = (
                self.world.get::<&Collider>(entity),
                self.world.get::<&Transform>(entity),
            ) else {
                continue;
            };
            let body = body_id(entity);
            let world_transform = collider.world_transform(&transform);
            let flow = collider.shape.visit_leaves(
                &world_transform,
                &mut |sub_shape: SubShapeId, leaf: &ColliderShape, leaf_transform: &Transform| {
                    f(body, &*collider, sub_shape, leaf, leaf_transform)
                },
            );
            if flow.is_break() {
                return;
            }
        }
    }
}

impl PhysicsWorld for PhysicsScene {
    fn collide_shape(
        &self,
        shape: &CharacterShape,
        position: Vec3,
        rotation: Quat,
        settings: &CollideShapeSettings,
        filter: &QueryFilter<'_>,
        collector: &mut dyn FnMut(CollideShapeHit) -> ControlFlow<()>,
    ) {
        let (a, b) = shape.core_segment(position, rotation);
        let radius = shape.radius();
        let max_separation = settings.max_separation_distance.max(0.0);
        let bounds = PhysicsAabb::from_segment(a, b, radius + max_separation);

        self.for_each_leaf(
            &bounds,
            filter,
            &mut |body: BodyId,
                  collider: &Collider,
                  sub_shape: SubShapeId,
                  leaf: &ColliderShape,
                  leaf_transform: &Transform| {
                let Some(surface) = narrowphase::closest_to_segment(leaf, leaf_transform, a, b)
                else {
                    return ControlFlow::Continue(());
                };
                let gap = surface.distance - radius;
                if gap > max_separation {
                    return ControlFlow::Continue(());
                }
                collector(CollideShapeHit {
                    body,
                    sub_shape,
                    contact_point: surface.point,
                    penetration_axis: -surface.normal,
                    penetration_depth: -gap,
                    material: collider.material,
                })
            },
        );
    }

    fn cast_shape(
        &self,
        shape: &CharacterShape,
        position: Vec3,
        rotation: Quat,
        displacement: Vec3,
        filter: &QueryFilter<'_>,
        collector: &mut dyn FnMut(ShapeCastHit) -> ControlFlow<()>,
    ) {
        let (a, b) = shape.core_segment(position, rotation);
        let radius = shape.radius();
        let bounds = PhysicsAabb::from_segment(a, b, radius)
            .union(&PhysicsAabb::from_segment(a + displacement, b + displacement, radius));

        self.for_each_leaf(
            &bounds,
            filter,
            &mut |body: BodyId,
                  collider: &Collider,
                  sub_shape: SubShapeId,
                  leaf: &ColliderShape,
                  leaf_transform: &Transform| {
                let Some((fraction, surface)) =
                    narrowphase::cast_segment(leaf, leaf_transform, a, b, radius, displacement)
                else {
                    return ControlFlow::Continue(());
                };
                collector(ShapeCastHit {
                    fraction,
                    contact: CollideShapeHit {
                        body,
                        sub_shape,
                        contact_point: surface.point,
                        penetration_axis: -surface.normal,
                        penetration_depth: (radius - surface.distance).max(0.0),
                        material: collider.material,
                    },
                })
            },
        );
    }

    fn read_body<R>(&self, body: BodyId, f: impl FnOnce(&dyn BodyRead) -> R) -> Option<R> {
        let entity = entity(body)?;
        let transform = *self.world.get::<&Transform>(entity).ok()?;
        let shared = self.world.get::<&SharedBody>(entity).ok()?;
        let Ok(guard) = shared.0.read() else {
            tracing::debug!(?body, "body lock poisoned");
            return None;
        };
        let result = f(&BodyView {
            body: guard,
            transform,
        });
        Some(result)
    }

    fn write_body<R>(&self, body: BodyId, f: impl FnOnce(&mut dyn BodyWrite) -> R) -> Option<R> {
        let entity = entity(body)?;
        let transform = *self.world.get::<&Transform>(entity).ok()?;
        let shared = self.world.get::<&SharedBody>(entity).ok()?;
        let Ok(guard) = shared.0.write() else {
            tracing::debug!(?body, "body lock poisoned");
            return None;
        };
        let result = f(&mut BodyView {
            body: guard,
            transform,
        });
        Some(result)
    }
}
