//! Scene components for bodies the character collides with.

use glam::{Mat3, Quat, Vec3};

use crate::world::{MaterialId, MotionType};

/// Rigid body type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigidBodyType {
    /// Affected by impulses.
    Dynamic,
    /// Immovable.
    Static,
    /// Position controlled by user through its velocity, not affected by impulses.
    Kinematic,
}

impl From<RigidBodyType> for MotionType {
    fn from(body_type: RigidBodyType) -> Self {
        match body_type {
            RigidBodyType::Dynamic => MotionType::Dynamic,
            RigidBodyType::Static => MotionType::Static,
            RigidBodyType::Kinematic => MotionType::Kinematic,
        }
    }
}

/// Rigid body component.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    pub body_type: RigidBodyType,
    pub mass: f32,
    /// Local inertia tensor stored as column-major 3x3 matrix.
    pub inertia_tensor: [f32; 9],
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Linear damping factor (default: 0.01).
    pub linear_damping: f32,
    /// Angular damping factor (default: 0.01).
    pub angular_damping: f32,
    /// Application data reported with every contact against this body.
    pub user_data: u64,
}

impl RigidBody {
    /// Create a new dynamic rigid body with the given mass.
    pub fn new_dynamic(mass: f32) -> Self {
        // Default inertia tensor: identity * mass (unit sphere approximation)
        let i = mass;
        Self {
            body_type: RigidBodyType::Dynamic,
            mass,
            inertia_tensor: [i, 0.0, 0.0, 0.0, i, 0.0, 0.0, 0.0, i],
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            linear_damping: 0.01,
            angular_damping: 0.01,
            user_data: 0,
        }
    }

    /// Dynamic body with the inertia of a solid box.
    pub fn new_dynamic_box(mass: f32, half_extents: Vec3) -> Self {
        let sq = half_extents * half_extents;
        let k = mass / 3.0;
        let (ix, iy, iz) = (k * (sq.y + sq.z), k * (sq.x + sq.z), k * (sq.x + sq.y));
        Self {
            inertia_tensor: [ix, 0.0, 0.0, 0.0, iy, 0.0, 0.0, 0.0, iz],
            ..Self::new_dynamic(mass)
        }
    }

    /// Create a new static rigid body.
    pub fn new_static() -> Self {
        Self {
            body_type: RigidBodyType::Static,
            mass: 0.0,
            inertia_tensor: [0.0; 9],
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            linear_damping: 0.0,
            angular_damping: 0.0,
            user_data: 0,
        }
    }

    /// Create a new kinematic rigid body moving at `linear_velocity`.
    pub fn new_kinematic(linear_velocity: Vec3) -> Self {
        Self {
            body_type: RigidBodyType::Kinematic,
            linear_velocity,
            ..Self::new_static()
        }
    }

    pub fn with_user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }

    pub fn inverse_mass(&self) -> f32 {
        if self.body_type == RigidBodyType::Dynamic && self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    /// World-space inverse inertia `R * I^-1 * R^T`, zero for non-dynamic bodies.
    pub fn inverse_inertia_world(&self, rotation: Quat) -> Mat3 {
        if self.body_type != RigidBodyType::Dynamic {
            return Mat3::ZERO;
        }
        let local = Mat3::from_cols_array(&self.inertia_tensor);
        if local.determinant().abs() < 1e-12 {
            return Mat3::ZERO;
        }
        let r = Mat3::from_quat(rotation);
        r * local.inverse() * r.transpose()
    }
}

/// Position and orientation of a body. Bodies rotate about their origin,
/// which is also their center of mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// Create an identity transform.
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    /// Create a transform from a position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Child transform at local `offset`/`rotation` relative to `self`.
    #[inline]
    pub fn compose(&self, offset: Vec3, rotation: Quat) -> Self {
        Self {
            position: self.position + self.rotation * offset,
            rotation: self.rotation * rotation,
        }
    }

    #[inline]
    pub fn to_local(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.position)
    }

    #[inline]
    pub fn to_world(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * point
    }
}

/// Collider shape. Capsule and cylinder axes are local Y.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
    Capsule { radius: f32, half_height: f32 },
    Cylinder { radius: f32, half_height: f32 },
    /// Everything below the local XZ plane; the surface normal is local +Y.
    HalfSpace,
    /// Child shapes, each addressed by its own sub-shape id.
    Compound { parts: Vec<CompoundPart> },
}

/// One child of a compound collider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundPart {
    pub offset: Vec3,
    pub rotation: Quat,
    pub shape: ColliderShape,
}

impl CompoundPart {
    pub fn new(offset: Vec3, rotation: Quat, shape: ColliderShape) -> Self {
        Self {
            offset,
            rotation,
            shape,
        }
    }
}

/// Collision detection component.
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    pub shape: ColliderShape,
    /// Offset from the entity's transform origin.
    pub offset: Vec3,
    /// If true, ignored by character queries.
    pub is_sensor: bool,
    /// Object layers this collider lives on (default: layer bit 0).
    pub layers: u32,
    pub material: MaterialId,
}

impl Default for Collider {
    fn default() -> Self {
        Self::new(ColliderShape::Sphere { radius: 0.5 })
    }
}

impl Collider {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            offset: Vec3::ZERO,
            is_sensor: false,
            layers: 1,
            material: MaterialId::default(),
        }
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_layers(mut self, layers: u32) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = material;
        self
    }

    pub fn sensor(mut self) -> Self {
        self.is_sensor = true;
        self
    }
}
