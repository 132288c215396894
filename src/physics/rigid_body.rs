//! Rigid body integration and impulse application.

use std::sync::{PoisonError, RwLock};

use glam::{Quat, Vec3};

use super::components::{RigidBody, RigidBodyType, Transform};

/// Body state behind a per-body lock so characters can push bodies from
/// several threads while the scene itself is only borrowed immutably.
#[derive(Debug)]
pub struct SharedBody(pub RwLock<RigidBody>);

impl SharedBody {
    pub fn new(body: RigidBody) -> Self {
        Self(RwLock::new(body))
    }

    /// Exclusive access without locking; a poisoned lock still yields the body.
    pub fn body_mut(&mut self) -> &mut RigidBody {
        self.0.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current body state.
    pub fn snapshot(&self) -> RigidBody {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Velocity of the body's material at world-space `point`, with the center of
/// mass at `transform.position`.
#[inline]
pub fn point_velocity(body: &RigidBody, transform: &Transform, point: Vec3) -> Vec3 {
    body.linear_velocity + body.angular_velocity.cross(point - transform.position)
}

/// Apply `impulse` at world-space `point`. Non-dynamic bodies are unaffected.
pub fn apply_impulse(body: &mut RigidBody, transform: &Transform, impulse: Vec3, point: Vec3) {
    if body.body_type != RigidBodyType::Dynamic {
        return;
    }
    body.linear_velocity += impulse * body.inverse_mass();
    let arm = point - transform.position;
    body.angular_velocity += body.inverse_inertia_world(transform.rotation) * arm.cross(impulse);
}

/// Integrate positions: p += v * dt, q += 0.5 * omega * q * dt.
///
/// Dynamic bodies are damped first; kinematic bodies move at their set velocity.
pub fn integrate_positions(world: &mut hecs::World, dt: f32) {
    for (_, (shared, transform)) in world.query_mut::<(&mut SharedBody, &mut Transform)>() {
        let rb = shared.body_mut();
        match rb.body_type {
            RigidBodyType::Static => continue,
            RigidBodyType::Dynamic => {
                rb.linear_velocity *= (1.0 - rb.linear_damping).max(0.0);
                rb.angular_velocity *= (1.0 - rb.angular_damping).max(0.0);
            }
            RigidBodyType::Kinematic => {}
        }

        // Update position
        transform.position += rb.linear_velocity * dt;

        // Update rotation using quaternion integration
        // q' = q + 0.5 * dt * omega_quat * q
        let omega = rb.angular_velocity;
        if omega.length_squared() > 1e-10 {
            let omega_quat = Quat::from_xyzw(omega.x, omega.y, omega.z, 0.0);
            let q_dot = omega_quat * transform.rotation * 0.5;
            transform.rotation = Quat::from_xyzw(
                transform.rotation.x + q_dot.x * dt,
                transform.rotation.y + q_dot.y * dt,
                transform.rotation.z + q_dot.z * dt,
                transform.rotation.w + q_dot.w * dt,
            )
            .normalize();
        }
    }
}

/// Add `delta_v` to the linear velocity of every dynamic body.
pub fn apply_gravity(world: &mut hecs::World, delta_v: Vec3) {
    for (_, shared) in world.query_mut::<&mut SharedBody>() {
        let rb = shared.body_mut();
        if rb.body_type == RigidBodyType::Dynamic && rb.mass > 0.0 {
            rb.linear_velocity += delta_v;
        }
    }
}
