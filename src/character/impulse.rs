//! Momentum exchange between the character and the bodies it touches.

use glam::Vec3;

use crate::world::{BodyRead, MotionType, PhysicsWorld};

use super::contact::Contact;
use super::listener::{CharacterContactListener, CharacterContactSettings};

/// Fraction of the closing velocity removed by a push.
const IMPULSE_DAMPING: f32 = 0.9;
/// Fraction of a penetration resolved per step by a push.
const PENETRATION_RESOLUTION: f32 = 0.4;

/// Called by the solver the first time a contact is collided with.
pub trait ContactHandler {
    /// Return false to discard the contact for the rest of the step.
    fn handle_contact(&mut self, velocity: Vec3, contact: &mut Contact) -> bool;
}

/// Consults the contact listener and pushes dynamic bodies.
pub struct ImpulseExchanger<'a, W> {
    pub world: &'a W,
    pub listener: &'a dyn CharacterContactListener,
    pub gravity: Vec3,
    pub delta_time: f32,
    pub mass: f32,
    pub max_strength: f32,
}

impl<W: PhysicsWorld> ContactHandler for ImpulseExchanger<'_, W> {
    fn handle_contact(&mut self, velocity: Vec3, contact: &mut Contact) -> bool {
        if !self.listener.on_contact_validate(contact.body, contact.sub_shape) {
            tracing::debug!(body = ?contact.body, "character contact rejected by listener");
            return false;
        }

        let mut settings = CharacterContactSettings::default();
        self.listener.on_contact_added(
            contact.body,
            contact.sub_shape,
            contact.position,
            -contact.normal,
            &mut settings,
        );
        contact.can_push_character = settings.can_push_character;

        if !settings.can_receive_impulses || contact.motion_type != MotionType::Dynamic {
            return true;
        }

        let contact = *contact;
        let pushed = self.world.write_body(contact.body, |body| {
            if let Some(impulse) = contact_impulse(
                velocity,
                &contact,
                &*body,
                self.gravity,
                self.delta_time,
                self.mass,
                self.max_strength,
            ) {
                body.add_impulse(impulse, contact.position);
                tracing::trace!(body = ?contact.body, ?impulse, "character impulse");
            }
        });
        if pushed.is_none() {
            tracing::debug!(body = ?contact.body, "pushed body no longer exists");
        }
        pushed.is_some()
    }
}

/// Impulse the character applies to `body` through `contact`, or `None` when
/// the character is not pushing into it.
///
/// The push is limited to `max_strength * delta_time`. A character standing on
/// the body additionally presses it down with its own weight.
pub fn contact_impulse<B: BodyRead + ?Sized>(
    velocity: Vec3,
    contact: &Contact,
    body: &B,
    gravity: Vec3,
    delta_time: f32,
    mass: f32,
    max_strength: f32,
) -> Option<Vec3> {
    let relative_velocity = velocity - contact.linear_velocity;
    let projected_velocity = relative_velocity.dot(contact.normal);

    let delta_velocity = -projected_velocity * IMPULSE_DAMPING
        - contact.distance.min(0.0) * PENETRATION_RESOLUTION / delta_time;
    if delta_velocity < 0.0 {
        return None;
    }

    let jacobian = (contact.position - body.center_of_mass()).cross(contact.normal);
    let inv_effective_mass =
        (body.inverse_inertia() * jacobian).dot(jacobian) + body.inverse_mass();
    if inv_effective_mass <= 0.0 {
        return None;
    }

    let impulse = (delta_velocity / inv_effective_mass).min(max_strength * delta_time);
    let mut world_impulse = -impulse * contact.normal;

    let normal_dot_gravity = contact.normal.dot(gravity);
    if normal_dot_gravity < 0.0 {
        world_impulse -= (mass * normal_dot_gravity / gravity.length() * delta_time) * gravity;
    }

    Some(world_impulse)
}
