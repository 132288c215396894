//! Broadphase candidate search using AABB overlap tests.

use crate::world::QueryFilter;

use super::collider::PhysicsAabb;
use super::components::{Collider, Transform};
use super::body_id;

/// Find every entity whose collider AABB overlaps `bounds` and passes `filter`.
///
/// Sensors are never returned. The scan is a linear pass over all colliders,
/// which is sufficient for the scene sizes a character moves through.
pub fn overlapping_bodies(
    world: &hecs::World,
    bounds: &PhysicsAabb,
    filter: &QueryFilter<'_>,
) -> Vec<hecs::Entity> {
    let mut candidates = Vec::new();

    for (entity, (collider, transform)) in world.query::<(&Collider, &Transform)>().iter() {
        if collider.is_sensor {
            continue;
        }
        if !filter.should_collide(body_id(entity), collider.layers) {
            continue;
        }
        if collider.compute_aabb(transform).overlaps(bounds) {
            candidates.push(entity);
        }
    }

    candidates
}
