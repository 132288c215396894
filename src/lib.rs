//! Rein virtual character controller
//!
//! A kinematic character that walks through a scene of static, kinematic and
//! dynamic bodies without being simulated as a rigid body itself.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **world** - The narrow collision/body-access interface the controller consumes
//! 2. **shape** / **settings** / **error** - Character shape, configuration and errors
//! 3. **character** - Contact discovery, constraint solving and the motion driver
//! 4. **physics** - hecs-backed reference scene implementing the world interface
//!    (feature = "scene")
//!
//! # Example
//!
//! ```no_run
//! use glam::{Quat, Vec3};
//! use rein_character::physics::{Collider, ColliderShape, PhysicsScene, RigidBody, Transform};
//! use rein_character::{CharacterSettings, CharacterVirtual, QueryFilter};
//!
//! let mut scene = PhysicsScene::new();
//! scene.add_body(
//!     Transform::identity(),
//!     RigidBody::new_static(),
//!     Collider::new(ColliderShape::HalfSpace),
//! );
//!
//! let start = Vec3::new(0.0, 1.0, 0.0);
//! let mut character = CharacterVirtual::new(CharacterSettings::default(), start, Quat::IDENTITY)?;
//! let gravity = Vec3::new(0.0, -9.81, 0.0);
//! let dt = 1.0 / 60.0;
//! for _ in 0..60 {
//!     character.set_linear_velocity(character.linear_velocity() + gravity * dt);
//!     character.update(&scene, dt, gravity, &QueryFilter::default());
//! }
//! # Ok::<(), rein_character::CharacterError>(())
//! ```

pub mod character;
pub mod error;
pub mod math;
pub mod settings;
pub mod shape;
pub mod world;

#[cfg(feature = "scene")]
pub mod physics;

// Re-export commonly used types
pub use character::{
    CharacterContactListener, CharacterContactSettings, CharacterVirtual, Constraint, Contact,
    DefaultContactListener, GroundState, IgnoredContact, MoveShapeResult,
};

pub use error::CharacterError;

pub use settings::{CharacterSettings, SolverLimits};

pub use shape::CharacterShape;

pub use world::{
    BodyId, BodyRead, BodyWrite, CollideShapeHit, CollideShapeSettings, LayerMask, MaterialId,
    MotionType, PhysicsWorld, QueryFilter, ShapeCastHit, SubShapeId,
};

#[cfg(feature = "scene")]
pub use physics::{PhysicsScene, SceneError};

// Re-export glam for convenience
pub use glam;
