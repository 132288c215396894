//! Signed-distance narrowphase between a character core and collider shapes.
//!
//! The character is a segment (a point for spheres) inflated by a radius, so
//! every query reduces to the signed distance from the segment to a convex
//! leaf shape. Distance to a convex shape is a convex function along the
//! segment, which a golden-section search minimizes.

use glam::Vec3;

use crate::math::closest_segment_parameter;

use super::components::{ColliderShape, Transform};

/// Golden-section iterations along the core segment.
const SEGMENT_SEARCH_ITERATIONS: usize = 40;
/// Conservative advancement steps before a cast gives up.
const MAX_CAST_ITERATIONS: usize = 256;
/// Gap at which a cast counts as touching.
const CAST_TOLERANCE: f32 = 1.0e-4;

/// Closest surface feature of a shape relative to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    /// Point on the shape's surface.
    pub point: Vec3,
    /// Outward unit normal at `point`, toward the query point.
    pub normal: Vec3,
    /// Signed distance of the query point; negative inside the shape.
    pub distance: f32,
}

/// Closest point on the surface of a leaf shape to `query`.
///
/// Returns `None` for compound shapes; visit their leaves instead.
pub fn closest_point(
    shape: &ColliderShape,
    transform: &Transform,
    query: Vec3,
) -> Option<SurfacePoint> {
    match shape {
        ColliderShape::Sphere { radius } => Some(round_point(transform.position, *radius, query)),
        ColliderShape::Capsule {
            radius,
            half_height,
        } => {
            let axis = transform.rotation * Vec3::new(0.0, *half_height, 0.0);
            let (a, b) = (transform.position - axis, transform.position + axis);
            let t = closest_segment_parameter(a, b, query);
            Some(round_point(a.lerp(b, t), *radius, query))
        }
        ColliderShape::Box { half_extents } => Some(box_point(*half_extents, transform, query)),
        ColliderShape::Cylinder {
            radius,
            half_height,
        } => Some(cylinder_point(*radius, *half_height, transform, query)),
        ColliderShape::HalfSpace => {
            let normal = transform.rotation * Vec3::Y;
            let distance = normal.dot(query - transform.position);
            Some(SurfacePoint {
                point: query - normal * distance,
                normal,
                distance,
            })
        }
        ColliderShape::Compound { .. } => None,
    }
}

/// Sphere of `radius` around `center`.
fn round_point(center: Vec3, radius: f32, query: Vec3) -> SurfacePoint {
    let diff = query - center;
    let dist = diff.length();
    let normal = if dist > 1e-6 { diff / dist } else { Vec3::Y };
    SurfacePoint {
        point: center + normal * radius,
        normal,
        distance: dist - radius,
    }
}

fn box_point(half_extents: Vec3, transform: &Transform, query: Vec3) -> SurfacePoint {
    let local = transform.to_local(query);

    // Clamp to box extents to find closest point on box
    let clamped = local.clamp(-half_extents, half_extents);
    let to_query = local - clamped;
    let dist = to_query.length();

    if dist > 1e-6 {
        return SurfacePoint {
            point: transform.to_world(clamped),
            normal: transform.rotation * (to_query / dist),
            distance: dist,
        };
    }

    // Query point is inside the box: leave through the nearest face
    let mut min_pen = f32::MAX;
    let mut local_normal = Vec3::Y;
    for i in 0..3 {
        let pen_pos = half_extents[i] - local[i];
        let pen_neg = half_extents[i] + local[i];
        if pen_pos < min_pen {
            min_pen = pen_pos;
            local_normal = Vec3::ZERO;
            local_normal[i] = 1.0;
        }
        if pen_neg < min_pen {
            min_pen = pen_neg;
            local_normal = Vec3::ZERO;
            local_normal[i] = -1.0;
        }
    }
    SurfacePoint {
        point: transform.to_world(local + local_normal * min_pen),
        normal: transform.rotation * local_normal,
        distance: -min_pen,
    }
}

fn cylinder_point(
    radius: f32,
    half_height: f32,
    transform: &Transform,
    query: Vec3,
) -> SurfacePoint {
    let local = transform.to_local(query);
    let radial = Vec3::new(local.x, 0.0, local.z);
    let radial_len = radial.length();
    let radial_dir = if radial_len > 1e-6 {
        radial / radial_len
    } else {
        Vec3::X
    };

    let outside_side = radial_len > radius;
    let outside_cap = local.y.abs() > half_height;
    if outside_side || outside_cap {
        let closest_radial = if outside_side {
            radial_dir * radius
        } else {
            radial
        };
        let closest = Vec3::new(
            closest_radial.x,
            local.y.clamp(-half_height, half_height),
            closest_radial.z,
        );
        let to_query = local - closest;
        let dist = to_query.length();
        return SurfacePoint {
            point: transform.to_world(closest),
            normal: transform.rotation * (to_query / dist.max(1e-12)),
            distance: dist,
        };
    }

    let side_pen = radius - radial_len;
    let cap_pen = half_height - local.y.abs();
    let cap_sign = if local.y >= 0.0 { 1.0 } else { -1.0 };
    let (local_normal, pen) = if side_pen < cap_pen {
        (radial_dir, side_pen)
    } else {
        (Vec3::new(0.0, cap_sign, 0.0), cap_pen)
    };
    SurfacePoint {
        point: transform.to_world(local + local_normal * pen),
        normal: transform.rotation * local_normal,
        distance: -pen,
    }
}

/// Closest surface point of a leaf shape to the segment `[a, b]`, evaluated
/// at the segment point where the signed distance is smallest.
pub fn closest_to_segment(
    shape: &ColliderShape,
    transform: &Transform,
    a: Vec3,
    b: Vec3,
) -> Option<SurfacePoint> {
    if (b - a).length_squared() < 1e-12 {
        return closest_point(shape, transform, a);
    }

    let eval = |t: f32| closest_point(shape, transform, a.lerp(b, t));

    // Golden-section search for the minimum signed distance over t in [0, 1]
    let inv_phi = 0.5 * (5f32.sqrt() - 1.0);
    let (mut lo, mut hi) = (0.0f32, 1.0f32);
    let mut t1 = hi - inv_phi * (hi - lo);
    let mut t2 = lo + inv_phi * (hi - lo);
    let mut f1 = eval(t1)?.distance;
    let mut f2 = eval(t2)?.distance;
    for _ in 0..SEGMENT_SEARCH_ITERATIONS {
        if f1 <= f2 {
            hi = t2;
            t2 = t1;
            f2 = f1;
            t1 = hi - inv_phi * (hi - lo);
            f1 = eval(t1)?.distance;
        } else {
            lo = t1;
            t1 = t2;
            f1 = f2;
            t2 = lo + inv_phi * (hi - lo);
            f2 = eval(t2)?.distance;
        }
    }

    // The minimum of a linear distance sits exactly on an endpoint
    [0.5 * (lo + hi), 0.0, 1.0]
        .into_iter()
        .filter_map(eval)
        .min_by(|x, y| x.distance.total_cmp(&y.distance))
}

/// Time of impact of a segment inflated by `radius` moving along `displacement`.
///
/// Returns the fraction of `displacement` travelled and the surface point at
/// that time, or `None` if the shape is never touched. Already touching
/// shapes are reported at fraction 0.
pub fn cast_segment(
    shape: &ColliderShape,
    transform: &Transform,
    a: Vec3,
    b: Vec3,
    radius: f32,
    displacement: Vec3,
) -> Option<(f32, SurfacePoint)> {
    let length = displacement.length();
    if length < 1e-6 {
        return None;
    }

    // Conservative advancement: the gap shrinks at most `length` per unit fraction
    let mut fraction = 0.0;
    for _ in 0..MAX_CAST_ITERATIONS {
        let offset = displacement * fraction;
        let surface = closest_to_segment(shape, transform, a + offset, b + offset)?;
        let gap = surface.distance - radius;
        if gap <= CAST_TOLERANCE {
            return Some((fraction, surface));
        }
        fraction += gap / length;
        if fraction > 1.0 {
            return None;
        }
    }
    None
}
