//! Turn contacts into velocity constraints.

use glam::Vec3;

use crate::math::Plane;
use crate::settings::NO_SLOPE_LIMIT_COS;

use super::contact::{Constraint, Contact};

/// Append a constraint to `out` for every contact `velocity` moves into.
///
/// Penetrating contacts get a boundary velocity that pushes the character out
/// at `recovery_speed`. A contact steeper than the walkable slope also gets
/// a horizontal constraint so the character cannot climb it.
pub fn determine_constraints(
    velocity: Vec3,
    contacts: &[Contact],
    cos_max_slope: f32,
    recovery_speed: f32,
    out: &mut Vec<Constraint>,
) {
    let slope_limited = cos_max_slope < NO_SLOPE_LIMIT_COS;

    for (index, contact) in contacts.iter().enumerate() {
        let mut contact_velocity = contact.linear_velocity;
        if contact.distance < 0.0 {
            contact_velocity -= contact.normal * contact.distance * recovery_speed;
        }

        // Moving apart, no constraint needed
        if contact.normal.dot(velocity - contact_velocity) >= 0.0 {
            continue;
        }

        out.push(Constraint::new(
            index,
            Plane::new(contact.normal, contact.distance),
            contact_velocity,
        ));

        if slope_limited && contact.normal.y > 0.0 && contact.normal.y < cos_max_slope {
            let normal = Vec3::new(contact.normal.x, 0.0, contact.normal.z).normalize_or_zero();
            let dot = normal.dot(contact.normal);
            if dot <= 0.0 {
                continue;
            }
            out.push(Constraint::new(
                index,
                Plane::new(normal, contact.distance / dot),
                normal * contact_velocity.dot(normal),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{BodyId, MaterialId, MotionType, SubShapeId};

    fn contact(normal: Vec3, distance: f32, linear_velocity: Vec3) -> Contact {
        Contact {
            position: Vec3::ZERO,
            linear_velocity,
            normal,
            distance,
            fraction: 0.0,
            body: BodyId(1),
            sub_shape: SubShapeId(0),
            motion_type: MotionType::Static,
            material: MaterialId::default(),
            user_data: 0,
            had_collision: false,
            was_discarded: false,
            can_push_character: true,
        }
    }

    fn cos_50() -> f32 {
        50f32.to_radians().cos()
    }

    #[test]
    fn test_separating_contacts_produce_nothing() {
        let contacts = [
            contact(Vec3::Y, 0.0, Vec3::ZERO),
            contact(Vec3::X, 0.05, Vec3::ZERO),
        ];
        let mut out = Vec::new();
        // Moving up and sideways along the wall
        determine_constraints(Vec3::new(0.0, 1.0, 2.0), &contacts, cos_50(), 1.0, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_approaching_contact_gives_primary_plane() {
        let contacts = [contact(Vec3::Y, 0.03, Vec3::ZERO)];
        let mut out = Vec::new();
        determine_constraints(Vec3::new(1.0, -1.0, 0.0), &contacts, cos_50(), 1.0, &mut out);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].contact, 0);
        assert_eq!(out[0].plane.normal, Vec3::Y);
        assert!((out[0].plane.constant - 0.03).abs() < 1e-6);
        assert_eq!(out[0].linear_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_penetration_adds_recovery_velocity() {
        let contacts = [contact(Vec3::Y, -0.1, Vec3::ZERO)];
        let mut out = Vec::new();
        // Standing still while penetrating: recovery velocity (0, 0.2, 0) makes it approach
        determine_constraints(Vec3::ZERO, &contacts, cos_50(), 2.0, &mut out);

        assert_eq!(out.len(), 1);
        assert!((out[0].linear_velocity - Vec3::new(0.0, 0.2, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_steep_slope_adds_horizontal_constraint() {
        let normal = Vec3::new(-60f32.to_radians().sin(), 60f32.to_radians().cos(), 0.0);
        let contacts = [contact(normal, 0.04, Vec3::new(1.0, 0.0, 3.0))];
        let mut out = Vec::new();
        determine_constraints(Vec3::new(5.0, 0.0, 0.0), &contacts, cos_50(), 1.0, &mut out);

        assert_eq!(out.len(), 2);
        let horizontal = out[1];
        assert_eq!(horizontal.contact, 0);
        let eps = 1e-5;
        assert!((horizontal.plane.normal - Vec3::NEG_X).length() < eps);
        // 0.04 / sin(60)
        assert!((horizontal.plane.constant - 0.04 / 60f32.to_radians().sin()).abs() < eps);
        // Only the horizontal part of the obstacle velocity along the new normal survives
        assert!((horizontal.linear_velocity - Vec3::new(1.0, 0.0, 0.0)).length() < eps);
    }

    #[test]
    fn test_walkable_slope_and_disabled_limit() {
        let steep = Vec3::new(-60f32.to_radians().sin(), 60f32.to_radians().cos(), 0.0);
        let gentle = Vec3::new(-20f32.to_radians().sin(), 20f32.to_radians().cos(), 0.0);
        let velocity = Vec3::new(5.0, 0.0, 0.0);

        let mut out = Vec::new();
        determine_constraints(
            velocity,
            &[contact(gentle, 0.0, Vec3::ZERO)],
            cos_50(),
            1.0,
            &mut out,
        );
        assert_eq!(out.len(), 1);

        out.clear();
        determine_constraints(velocity, &[contact(steep, 0.0, Vec3::ZERO)], 1.0, 1.0, &mut out);
        assert_eq!(out.len(), 1);
    }
}
