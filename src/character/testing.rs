//! Scripted world used by the character pipeline tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ops::ControlFlow;

use glam::{Mat3, Quat, Vec3};

use crate::shape::CharacterShape;
use crate::world::{
    BodyId, BodyRead, BodyWrite, CollideShapeHit, CollideShapeSettings, MotionType, PhysicsWorld,
    QueryFilter, ShapeCastHit,
};

#[derive(Debug, Clone)]
pub struct MockBody {
    pub motion_type: MotionType,
    pub velocity: Vec3,
    pub center_of_mass: Vec3,
    pub inverse_mass: f32,
    pub inverse_inertia: Mat3,
    pub impulses: Vec<(Vec3, Vec3)>,
}

impl MockBody {
    pub fn fixed() -> Self {
        Self {
            motion_type: MotionType::Static,
            velocity: Vec3::ZERO,
            center_of_mass: Vec3::ZERO,
            inverse_mass: 0.0,
            inverse_inertia: Mat3::ZERO,
            impulses: Vec::new(),
        }
    }

    /// Dynamic body with unit mass and no rotation.
    pub fn moving(velocity: Vec3) -> Self {
        Self {
            motion_type: MotionType::Dynamic,
            velocity,
            inverse_mass: 1.0,
            ..Self::fixed()
        }
    }
}

impl BodyRead for MockBody {
    fn motion_type(&self) -> MotionType {
        self.motion_type
    }

    fn point_velocity(&self, _point: Vec3) -> Vec3 {
        self.velocity
    }

    fn center_of_mass(&self) -> Vec3 {
        self.center_of_mass
    }

    fn inverse_mass(&self) -> f32 {
        self.inverse_mass
    }

    fn inverse_inertia(&self) -> Mat3 {
        self.inverse_inertia
    }
}

impl BodyWrite for MockBody {
    fn add_impulse(&mut self, impulse: Vec3, point: Vec3) {
        self.impulses.push((impulse, point));
    }
}

/// Replays fixed hit lists regardless of the query shape.
#[derive(Default)]
pub struct MockWorld {
    pub collide_hits: Vec<CollideShapeHit>,
    pub cast_hits: Vec<ShapeCastHit>,
    bodies: RefCell<HashMap<BodyId, MockBody>>,
    reported: Cell<usize>,
}

impl MockWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_body(&mut self, id: BodyId, body: MockBody) {
        self.bodies.get_mut().insert(id, body);
    }

    /// Number of hits handed to collectors so far.
    pub fn reported_hits(&self) -> usize {
        self.reported.get()
    }

    pub fn impulses(&self, id: BodyId) -> Vec<(Vec3, Vec3)> {
        self.bodies
            .borrow()
            .get(&id)
            .map(|body| body.impulses.clone())
            .unwrap_or_default()
    }
}

impl PhysicsWorld for MockWorld {
    fn collide_shape(
        &self,
        _shape: &CharacterShape,
        _position: Vec3,
        _rotation: Quat,
        _settings: &CollideShapeSettings,
        filter: &QueryFilter<'_>,
        collector: &mut dyn FnMut(CollideShapeHit) -> ControlFlow<()>,
    ) {
        for hit in &self.collide_hits {
            if !filter.should_collide(hit.body, 1) {
                continue;
            }
            self.reported.set(self.reported.get() + 1);
            if collector(*hit).is_break() {
                return;
            }
        }
    }

    fn cast_shape(
        &self,
        _shape: &CharacterShape,
        _position: Vec3,
        _rotation: Quat,
        _displacement: Vec3,
        filter: &QueryFilter<'_>,
        collector: &mut dyn FnMut(ShapeCastHit) -> ControlFlow<()>,
    ) {
        for hit in &self.cast_hits {
            if !filter.should_collide(hit.contact.body, 1) {
                continue;
            }
            self.reported.set(self.reported.get() + 1);
            if collector(*hit).is_break() {
                return;
            }
        }
    }

    fn read_body<R>(&self, body: BodyId, f: impl FnOnce(&dyn BodyRead) -> R) -> Option<R> {
        let bodies = self.bodies.borrow();
        bodies.get(&body).map(|b| f(b))
    }

    fn write_body<R>(&self, body: BodyId, f: impl FnOnce(&mut dyn BodyWrite) -> R) -> Option<R> {
        let mut bodies = self.bodies.borrow_mut();
        bodies.get_mut(&body).map(|b| f(b))
    }
}
