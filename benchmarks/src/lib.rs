//! Shared setup helpers for rein-character benchmarks.
//!
//! ## Running
//!
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench character
//!
//! Filter by group:
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench character -- solver
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench character -- update

use glam::{Quat, Vec3};
use rein_character::character::impulse::ContactHandler;
use rein_character::physics::{Collider, ColliderShape, RigidBody, Transform};
use rein_character::{
    BodyId, CharacterSettings, CharacterShape, CharacterVirtual, Contact, MaterialId, MotionType,
    PhysicsScene, SubShapeId,
};

pub const DT: f32 = 1.0 / 60.0;
pub const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

// ---------------------------------------------------------------------------
// Solver inputs
// ---------------------------------------------------------------------------

/// Accepts every contact without touching a world.
pub struct AcceptAll;

impl ContactHandler for AcceptAll {
    fn handle_contact(&mut self, _velocity: Vec3, _contact: &mut Contact) -> bool {
        true
    }
}

/// Touching static contact with the given outward normal.
pub fn static_contact(body: u64, normal: Vec3) -> Contact {
    Contact {
        position: -normal * 0.5,
        linear_velocity: Vec3::ZERO,
        normal: normal.normalize(),
        distance: 0.0,
        fraction: 0.0,
        body: BodyId(body),
        sub_shape: SubShapeId(0),
        motion_type: MotionType::Static,
        material: MaterialId::default(),
        user_data: 0,
        had_collision: false,
        was_discarded: false,
        can_push_character: true,
    }
}

/// Floor plus two walls meeting at a corner.
pub fn corner_contacts() -> Vec<Contact> {
    vec![
        static_contact(1, Vec3::Y),
        static_contact(2, Vec3::NEG_X),
        static_contact(3, Vec3::NEG_Z),
    ]
}

/// `n` wall contacts fanned around the character, all facing inward.
pub fn ring_contacts(n: usize) -> Vec<Contact> {
    (0..n)
        .map(|i| {
            let angle = i as f32 / n as f32 * std::f32::consts::TAU;
            let normal = -Vec3::new(angle.cos(), 0.0, angle.sin());
            static_contact(i as u64 + 1, normal)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

/// Floor plus a grid of `n` static and dynamic obstacles around the origin.
#[allow(clippy::manual_is_multiple_of)]
pub fn setup_obstacle_scene(n: usize) -> PhysicsScene {
    let mut scene = PhysicsScene::new();
    scene.add_body(
        Transform::identity(),
        RigidBody::new_static(),
        Collider::new(ColliderShape::HalfSpace),
    );

    let cols = (n as f32).sqrt().ceil() as usize;
    for i in 0..n {
        let x = (i % cols) as f32 * 1.5 - cols as f32 * 0.75;
        let z = (i / cols) as f32 * 1.5 - cols as f32 * 0.75;
        let position = Vec3::new(x, 0.5, z);

        if i % 2 == 0 {
            let half_extents = Vec3::splat(0.4);
            scene.add_body(
                Transform::from_position(position),
                RigidBody::new_dynamic_box(5.0, half_extents),
                Collider::new(ColliderShape::Box { half_extents }),
            );
        } else {
            scene.add_body(
                Transform::from_position(position),
                RigidBody::new_static(),
                Collider::new(ColliderShape::Cylinder {
                    radius: 0.3,
                    half_height: 0.5,
                }),
            );
        }
    }
    scene
}

/// Default capsule character standing on the floor at `position`.
pub fn standing_character(position: Vec3) -> CharacterVirtual {
    let settings = CharacterSettings::default();
    let height = match settings.shape {
        CharacterShape::Capsule {
            radius,
            half_height,
        } => radius + half_height,
        CharacterShape::Sphere { radius } => radius,
    };
    let start = position + Vec3::new(0.0, height + 0.02, 0.0);
    let mut character = CharacterVirtual::new(settings, start, Quat::IDENTITY)
        .expect("default settings are valid");
    character.set_linear_velocity(Vec3::new(3.0, 0.0, 1.0));
    character
}
