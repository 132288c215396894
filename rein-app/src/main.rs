use anyhow::Context;
use glam::{Quat, Vec3};
use rein_character::physics::{Collider, ColliderShape, RigidBody, Transform};
use rein_character::{
    CharacterSettings, CharacterShape, CharacterVirtual, GroundState, PhysicsScene, QueryFilter,
};

const CHARACTER_SPEED: f32 = 6.0;
const JUMP_SPEED: f32 = 4.0;
const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);
const DT: f32 = 1.0 / 60.0;
/// Deepest overlap allowed when switching stance.
const STANCE_PENETRATION: f32 = 0.03;

const STANDING: CharacterShape = CharacterShape::Capsule {
    radius: 0.3,
    half_height: 0.675,
};
const CROUCHING: CharacterShape = CharacterShape::Capsule {
    radius: 0.3,
    half_height: 0.2,
};

/// One scripted stretch of player input.
struct Phase {
    label: &'static str,
    frames: u32,
    input: Vec3,
    jump: bool,
    switch_stance: bool,
}

impl Phase {
    fn walk(label: &'static str, frames: u32, input: Vec3) -> Self {
        Self {
            label,
            frames,
            input,
            jump: false,
            switch_stance: false,
        }
    }

    fn jump(mut self) -> Self {
        self.jump = true;
        self
    }

    fn switch_stance(mut self) -> Self {
        self.switch_stance = true;
        self
    }
}

fn build_scene() -> PhysicsScene {
    let mut scene = PhysicsScene::new();
    let concrete = scene.add_material("concrete");
    let wood = scene.add_material("wood");

    // Floor
    scene.add_body(
        Transform::identity(),
        RigidBody::new_static(),
        Collider::new(ColliderShape::HalfSpace).with_material(concrete),
    );

    // Walkable ramp rising toward +X
    scene.add_body(
        Transform::from_position_rotation(
            Vec3::new(8.0, -1.0, 0.0),
            Quat::from_rotation_z(20f32.to_radians()),
        ),
        RigidBody::new_static(),
        Collider::new(ColliderShape::Box {
            half_extents: Vec3::new(4.0, 1.0, 2.0),
        }),
    );

    // Steep ramp rising toward -Z
    scene.add_body(
        Transform::from_position_rotation(
            Vec3::new(0.0, -1.0, -8.0),
            Quat::from_rotation_x(-60f32.to_radians()),
        ),
        RigidBody::new_static(),
        Collider::new(ColliderShape::Box {
            half_extents: Vec3::new(2.0, 1.0, 4.0),
        }),
    );

    // Pushable crate
    let half_extents = Vec3::splat(0.5);
    scene.add_body(
        Transform::from_position(Vec3::new(-3.0, 0.5, 0.0)),
        RigidBody::new_dynamic_box(20.0, half_extents),
        Collider::new(ColliderShape::Box { half_extents }).with_material(wood),
    );

    // Low ceiling, only passable crouched
    scene.add_body(
        Transform::from_position(Vec3::new(0.0, 1.6, 6.0)),
        RigidBody::new_static(),
        Collider::new(ColliderShape::Box {
            half_extents: Vec3::new(2.0, 0.5, 2.0),
        }),
    );

    scene
}

fn script() -> Vec<Phase> {
    vec![
        Phase::walk("settle", 30, Vec3::ZERO),
        Phase::walk("walk up the ramp", 150, Vec3::X),
        Phase::walk("walk back", 150, Vec3::NEG_X),
        Phase::walk("push the crate", 90, Vec3::NEG_X),
        Phase::walk("jump", 60, Vec3::ZERO).jump(),
        Phase::walk("crouch", 10, Vec3::ZERO).switch_stance(),
        Phase::walk("walk under the ceiling", 100, Vec3::new(0.5, 0.0, 1.0)),
        Phase::walk("try to stand up", 10, Vec3::ZERO).switch_stance(),
        Phase::walk("leave the ceiling", 120, Vec3::NEG_Z),
        Phase::walk("stand up", 10, Vec3::ZERO).switch_stance(),
        Phase::walk("climb the steep ramp", 180, Vec3::NEG_Z),
    ]
}

/// Player control for one frame: smoothed input, no pushing into steep slopes,
/// jumping only from the ground.
fn control_velocity(character: &CharacterVirtual, input: Vec3, jump: bool) -> Vec3 {
    let ground_state = character.ground_state();

    let mut input = input.normalize_or_zero();
    if ground_state == GroundState::Sliding {
        if let Some(normal) = character.ground_normal() {
            let horizontal = Vec3::new(normal.x, 0.0, normal.z);
            if horizontal.dot(input) <= 0.0 {
                input = Vec3::ZERO;
            }
        }
    }

    let current = character.linear_velocity();
    let mut desired = CHARACTER_SPEED * input;
    desired.y = current.y;
    let mut velocity = 0.75 * current + 0.25 * desired;

    if jump && ground_state == GroundState::OnGround {
        velocity.y += JUMP_SPEED;
    }

    velocity + GRAVITY * DT
}

fn switch_stance(character: &mut CharacterVirtual, scene: &PhysicsScene, filter: &QueryFilter<'_>) {
    let target = if *character.shape() == STANDING {
        CROUCHING
    } else {
        STANDING
    };
    if character.set_shape(scene, target, STANCE_PENETRATION, filter) {
        log::info!("stance switched to {:?}", target);
    } else {
        log::info!("stance switch blocked");
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut scene = build_scene();
    let filter = QueryFilter::default();

    let settings = CharacterSettings {
        shape: STANDING,
        ..CharacterSettings::default()
    };
    let start = Vec3::new(0.0, 1.5, 0.0);
    let mut character = CharacterVirtual::new(settings, start, Quat::IDENTITY)
        .context("invalid character settings")?;

    for phase in script() {
        log::info!("phase: {}", phase.label);
        if phase.switch_stance {
            switch_stance(&mut character, &scene, &filter);
        }

        for frame in 0..phase.frames {
            let jump = phase.jump && frame == 0;
            let velocity = control_velocity(&character, phase.input, jump);
            character.set_linear_velocity(velocity);
            character.update(&scene, DT, GRAVITY, &filter);
            scene.step(DT);
        }

        let material = character
            .ground_material()
            .and_then(|id| scene.material(id))
            .map_or("-", |material| material.name.as_str());
        log::info!(
            "position {:.2} velocity {:.2} ground {:?} on {}",
            character.position(),
            character.linear_velocity(),
            character.ground_state(),
            material
        );
    }

    Ok(())
}
