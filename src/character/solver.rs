//! Iterative velocity constraint solver.
//!
//! Walks the character along its velocity, stopping at the earliest
//! constraint plane it reaches, sliding along that plane and repeating until
//! the time budget is used up, the velocity vanishes or the iteration cap is
//! hit. When the character is wedged between two planes it slides along their
//! intersection line instead of bouncing between them.

use std::cmp::Ordering;

use glam::Vec3;

use crate::settings::MIN_TIME_REMAINING;

use super::contact::{Constraint, Contact};
use super::impulse::ContactHandler;

/// Below this closing speed a constraint is never reached.
const MIN_PROJECTED_VELOCITY: f32 = 1.0e-6;
/// A constraint that would be penetrated by less than this is ignored.
const MIN_PENETRATION: f32 = -1.0e-4;
/// Moving further than this along a constraint forgets earlier constraints.
const SIGNIFICANT_TOI: f32 = 1.0e-4;
/// Constraint normals more aligned than this are treated as parallel.
const PARALLEL_DOT: f32 = 0.984;
const MIN_VELOCITY_SQ: f32 = 1.0e-8;

/// Outcome of [`solve_constraints`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveResult {
    pub displacement: Vec3,
    pub time_simulated: f32,
}

/// Find how far the character can move at `velocity` within `time_remaining`.
///
/// `constraints` reference `contacts` by index. The first time a contact is
/// reached `handler` decides whether it blocks (and may push the obstacle);
/// a rejected contact is marked discarded.
pub fn solve_constraints<H: ContactHandler + ?Sized>(
    velocity: Vec3,
    time_remaining: f32,
    constraints: &mut [Constraint],
    contacts: &mut [Contact],
    handler: &mut H,
    max_iterations: usize,
) -> SolveResult {
    if constraints.is_empty() {
        return SolveResult {
            displacement: velocity * time_remaining,
            time_simulated: time_remaining,
        };
    }

    let mut velocity = velocity;
    let mut time_remaining = time_remaining;
    let mut result = SolveResult {
        displacement: Vec3::ZERO,
        time_simulated: 0.0,
    };

    let mut sorted: Vec<usize> = (0..constraints.len()).collect();
    // Constraints collided with since the character last moved a meaningful distance
    let mut previous: Vec<usize> = Vec::with_capacity(max_iterations);

    for iteration in 0..max_iterations {
        for c in constraints.iter_mut() {
            c.projected_velocity = c.plane.normal.dot(c.linear_velocity - velocity);
            c.toi = if c.projected_velocity < MIN_PROJECTED_VELOCITY {
                f32::MAX
            } else {
                let distance = c.plane.signed_distance(result.displacement);
                if distance - c.projected_velocity * time_remaining > MIN_PENETRATION {
                    f32::MAX
                } else {
                    (distance / c.projected_velocity).max(0.0)
                }
            };
        }

        sorted.sort_by(|&a, &b| constraint_order(&constraints[a], &constraints[b], contacts));

        let mut selected = None;
        for &index in &sorted {
            let toi = constraints[index].toi;
            if toi >= time_remaining {
                break;
            }

            let contact = &mut contacts[constraints[index].contact];
            if contact.was_discarded {
                continue;
            }
            if !contact.had_collision {
                if !handler.handle_contact(velocity, contact) {
                    contact.was_discarded = true;
                    continue;
                }
                contact.had_collision = true;
            }

            // Obstacle cannot drag the character along, treat it as stationary
            if !contact.can_push_character {
                constraints[index].linear_velocity = Vec3::ZERO;
            }

            selected = Some(index);
            break;
        }

        // Nothing in the way: move for the rest of the budget
        let Some(index) = selected else {
            result.displacement += velocity * time_remaining;
            result.time_simulated += time_remaining;
            return result;
        };

        let toi = constraints[index].toi;
        result.displacement += velocity * toi;
        time_remaining -= toi;
        result.time_simulated += toi;
        if time_remaining < MIN_TIME_REMAINING {
            return result;
        }

        if toi > SIGNIFICANT_TOI {
            previous.clear();
        }

        let plane_normal = constraints[index].plane.normal;
        let relative_velocity = velocity - constraints[index].linear_velocity;
        let new_velocity = velocity - relative_velocity.dot(plane_normal) * plane_normal;

        // Earlier constraint that the slid velocity pushes into the most
        let mut highest_penetration = 0.0;
        let mut other = None;
        for &p in &previous {
            if p == index {
                continue;
            }
            let other_normal = constraints[p].plane.normal;
            let penetration = (constraints[p].linear_velocity - new_velocity).dot(other_normal);
            if penetration > highest_penetration {
                let dot = other_normal.dot(plane_normal);
                if dot < PARALLEL_DOT && dot > -PARALLEL_DOT {
                    highest_penetration = penetration;
                    other = Some(p);
                }
            }
        }

        velocity = match other {
            Some(other) => {
                let other_normal = constraints[other].plane.normal;
                let slide_dir = plane_normal.cross(other_normal).normalize_or_zero();
                let velocity_in_slide_dir = new_velocity.dot(slide_dir) * slide_dir;

                // Only let each boundary push the character away from the other plane
                let v1 = constraints[index].linear_velocity;
                let v1 = v1 - v1.dot(other_normal).min(0.0) * other_normal;
                constraints[index].linear_velocity = v1;
                let v2 = constraints[other].linear_velocity;
                let v2 = v2 - v2.dot(plane_normal).min(0.0) * plane_normal;
                constraints[other].linear_velocity = v2;

                let perpendicular = v1 - v1.dot(slide_dir) * slide_dir;
                let other_perpendicular = v2 - v2.dot(slide_dir) * slide_dir;
                velocity_in_slide_dir + perpendicular + other_perpendicular
            }
            None => new_velocity,
        };

        previous.push(index);

        if velocity.length_squared() < MIN_VELOCITY_SQ {
            return result;
        }

        tracing::trace!(iteration, toi, ?velocity, "character constraint solved");
    }

    tracing::debug!(max_iterations, "character solver hit its iteration cap");
    result
}

/// Earliest first; among already-reached constraints the fastest approach first;
/// ties go to the less mobile obstacle.
fn constraint_order(a: &Constraint, b: &Constraint, contacts: &[Contact]) -> Ordering {
    if a.toi <= 0.0 && b.toi <= 0.0 {
        return b.projected_velocity.total_cmp(&a.projected_velocity);
    }
    a.toi
        .total_cmp(&b.toi)
        .then_with(|| contacts[a.contact].motion_type.cmp(&contacts[b.contact].motion_type))
}
