//! Gather contacts around a hypothetical character pose.

use std::ops::ControlFlow;

use glam::{Quat, Vec3};

use crate::settings::{CHARACTER_PADDING, PREDICTIVE_CONTACT_DISTANCE};
use crate::shape::CharacterShape;
use crate::world::{CollideShapeHit, CollideShapeSettings, PhysicsWorld, QueryFilter};

use super::contact::Contact;

/// Fill `out` with every obstacle within the predictive contact distance of
/// `shape` at `position`/`rotation`.
///
/// Contacts whose body can no longer be read are dropped. At most `max_hits`
/// contacts are collected; the world query stops as soon as the cap is reached.
/// Returned distances have [`CHARACTER_PADDING`] subtracted.
#[allow(clippy::too_many_arguments)]
pub fn contacts_at_position<W: PhysicsWorld>(
    world: &W,
    position: Vec3,
    rotation: Quat,
    movement_direction: Vec3,
    shape: &CharacterShape,
    filter: &QueryFilter<'_>,
    max_hits: usize,
    out: &mut Vec<Contact>,
) {
    out.clear();

    let settings = CollideShapeSettings {
        max_separation_distance: PREDICTIVE_CONTACT_DISTANCE,
        active_edge_movement_direction: movement_direction,
    };

    let mut truncated = false;
    world.collide_shape(
        shape,
        position,
        rotation,
        &settings,
        filter,
        &mut |hit: CollideShapeHit| {
            let contact = world.read_body(hit.body, |body| Contact::from_hit(&hit, body, 0.0));
            if let Some(contact) = contact {
                out.push(contact);
                if out.len() >= max_hits {
                    truncated = true;
                    return ControlFlow::Break(());
                }
            }
            ControlFlow::Continue(())
        },
    );

    if truncated {
        tracing::debug!(max_hits, "character contact query truncated");
    }

    for contact in out.iter_mut() {
        contact.distance -= CHARACTER_PADDING;
    }
}
