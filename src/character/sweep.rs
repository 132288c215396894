//! Validate a solved displacement with a shape cast.

use std::ops::ControlFlow;

use glam::{Quat, Vec3};

use crate::settings::{CHARACTER_PADDING, COLLISION_TOLERANCE};
use crate::shape::CharacterShape;
use crate::world::{PhysicsWorld, QueryFilter, ShapeCastHit};

use super::contact::{Contact, IgnoredContact};
use super::listener::CharacterContactListener;

/// Shape cast parameters for [`first_contact_for_sweep`].
#[derive(Debug, Clone, Copy)]
pub struct Sweep<'a> {
    pub shape: &'a CharacterShape,
    pub position: Vec3,
    pub rotation: Quat,
    pub displacement: Vec3,
}

/// Find the first contact that genuinely blocks `sweep.displacement`.
///
/// The returned contact's `fraction` is pulled back so the character stops
/// [`CHARACTER_PADDING`] short of the surface. Parts in `ignored` and hits the
/// listener rejects never block.
pub fn first_contact_for_sweep<W: PhysicsWorld>(
    world: &W,
    listener: &dyn CharacterContactListener,
    sweep: Sweep<'_>,
    ignored: &[IgnoredContact],
    filter: &QueryFilter<'_>,
    max_hits: usize,
) -> Option<Contact> {
    let displacement = sweep.displacement;
    if displacement.length_squared() < 1.0e-8 {
        return None;
    }

    let mut contacts: Vec<Contact> = Vec::new();
    world.cast_shape(
        sweep.shape,
        sweep.position,
        sweep.rotation,
        displacement,
        filter,
        &mut |hit: ShapeCastHit| {
            // Initial overlaps and hits we are moving away from are handled by the solver
            if hit.fraction <= 0.0 || hit.contact.penetration_axis.dot(displacement) <= 0.0 {
                return ControlFlow::Continue(());
            }
            if ignored
                .iter()
                .any(|i| i.body == hit.contact.body && i.sub_shape == hit.contact.sub_shape)
            {
                return ControlFlow::Continue(());
            }
            let contact = world.read_body(hit.contact.body, |body| {
                Contact::from_hit(&hit.contact, body, hit.fraction)
            });
            if let Some(contact) = contact {
                contacts.push(contact);
                if contacts.len() >= max_hits {
                    return ControlFlow::Break(());
                }
            }
            ControlFlow::Continue(())
        },
    );

    contacts.sort_by(|a, b| a.fraction.total_cmp(&b.fraction));

    let mut hit = contacts.into_iter().find(|c| {
        c.distance + c.normal.dot(displacement) < -COLLISION_TOLERANCE
            && listener.on_contact_validate(c.body, c.sub_shape)
    })?;

    // normal · displacement < 0 is guaranteed by the collector above
    hit.fraction = (hit.fraction + CHARACTER_PADDING / hit.normal.dot(displacement)).max(0.0);
    tracing::trace!(body = ?hit.body, fraction = hit.fraction, "sweep blocked");
    Some(hit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::listener::DefaultContactListener;
    use crate::character::testing::{MockBody, MockWorld};
    use crate::world::{BodyId, CollideShapeHit, MaterialId, SubShapeId};

    const SPHERE: CharacterShape = CharacterShape::Sphere { radius: 0.5 };

    fn cast_hit(body: u64, fraction: f32, axis: Vec3) -> ShapeCastHit {
        ShapeCastHit {
            fraction,
            contact: CollideShapeHit {
                body: BodyId(body),
                sub_shape: SubShapeId(0),
                contact_point: Vec3::ZERO,
                penetration_axis: axis,
                penetration_depth: 0.0,
                material: MaterialId::default(),
            },
        }
    }

    fn sweep(displacement: Vec3) -> Sweep<'static> {
        Sweep {
            shape: &SPHERE,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            displacement,
        }
    }

    struct RejectBody(BodyId);

    impl CharacterContactListener for RejectBody {
        fn on_contact_validate(&self, body: BodyId, _sub_shape: SubShapeId) -> bool {
            body != self.0
        }
    }

    fn world_with(hits: Vec<ShapeCastHit>) -> MockWorld {
        let mut world = MockWorld::new();
        for hit in &hits {
            world.add_body(hit.contact.body, MockBody::fixed());
        }
        world.cast_hits = hits;
        world
    }

    #[test]
    fn test_earliest_valid_hit_with_padding_correction() {
        let world = world_with(vec![cast_hit(1, 0.8, Vec3::X), cast_hit(2, 0.5, Vec3::X)]);
        let displacement = Vec3::new(2.0, 0.0, 0.0);

        let hit = first_contact_for_sweep(
            &world,
            &DefaultContactListener,
            sweep(displacement),
            &[],
            &QueryFilter::default(),
            256,
        )
        .unwrap();

        assert_eq!(hit.body, BodyId(2));
        // 0.5 - 0.02 / 2.0
        assert!((hit.fraction - 0.49).abs() < 1e-6);
    }

    #[test]
    fn test_filters_initial_overlap_and_receding_hits() {
        let world = world_with(vec![
            cast_hit(1, 0.0, Vec3::X),
            cast_hit(2, 0.3, Vec3::NEG_X),
        ]);
        let hit = first_contact_for_sweep(
            &world,
            &DefaultContactListener,
            sweep(Vec3::X),
            &[],
            &QueryFilter::default(),
            256,
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_ignored_and_rejected_parts_do_not_block() {
        let world = world_with(vec![cast_hit(1, 0.2, Vec3::X), cast_hit(2, 0.4, Vec3::X)]);

        let ignored = [IgnoredContact::new(BodyId(1), SubShapeId(0))];
        let hit = first_contact_for_sweep(
            &world,
            &DefaultContactListener,
            sweep(Vec3::X),
            &ignored,
            &QueryFilter::default(),
            256,
        )
        .unwrap();
        assert_eq!(hit.body, BodyId(2));

        let hit = first_contact_for_sweep(
            &world,
            &RejectBody(BodyId(2)),
            sweep(Vec3::X),
            &ignored,
            &QueryFilter::default(),
            256,
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_fraction_clamped_at_zero() {
        let world = world_with(vec![cast_hit(1, 0.001, Vec3::X)]);
        let hit = first_contact_for_sweep(
            &world,
            &DefaultContactListener,
            sweep(Vec3::new(0.1, 0.0, 0.0)),
            &[],
            &QueryFilter::default(),
            256,
        )
        .unwrap();
        assert_eq!(hit.fraction, 0.0);
    }

    #[test]
    fn test_negligible_displacement_skips_cast() {
        let world = world_with(vec![cast_hit(1, 0.5, Vec3::X)]);
        let hit = first_contact_for_sweep(
            &world,
            &DefaultContactListener,
            sweep(Vec3::new(1.0e-5, 0.0, 0.0)),
            &[],
            &QueryFilter::default(),
            256,
        );
        assert!(hit.is_none());
        assert_eq!(world.reported_hits(), 0);
    }
}
