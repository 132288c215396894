//! Virtual character controller.
//!
//! # Pipeline
//!
//! Each step runs a bounded number of sub-iterations:
//!
//! 1. Discover contacts around the current pose
//! 2. Drop contradictory contacts
//! 3. Build velocity constraints from the desired velocity
//! 4. Solve the constraints (pushing dynamic bodies on first contact)
//! 5. Sweep the solved displacement to catch anything the contacts missed
//! 6. Move and continue with the remaining time

pub mod conflict;
pub mod constraint;
pub mod contact;
pub mod discovery;
pub mod impulse;
pub mod listener;
pub mod solver;
pub mod sweep;

#[cfg(test)]
pub(crate) mod testing;

use glam::{Quat, Vec3};

use crate::error::CharacterError;
use crate::settings::{self, CharacterSettings, COLLISION_TOLERANCE, MIN_TIME_REMAINING};
use crate::shape::CharacterShape;
use crate::world::{BodyId, MaterialId, PhysicsWorld, QueryFilter, SubShapeId};

use self::conflict::remove_conflicting_contacts;
use self::constraint::determine_constraints;
use self::discovery::contacts_at_position;
use self::impulse::ImpulseExchanger;
use self::solver::solve_constraints;
use self::sweep::{first_contact_for_sweep, Sweep};

pub use self::contact::{Constraint, Contact, IgnoredContact};
pub use self::listener::{
    CharacterContactListener, CharacterContactSettings, DefaultContactListener,
};

/// What the character is standing on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundState {
    /// Supported by a walkable surface.
    OnGround,
    /// Supported only by a surface steeper than the max slope.
    Sliding,
    /// No supporting contact.
    InAir,
}

/// Result of [`CharacterVirtual::move_shape`].
#[derive(Debug, Clone, Default)]
pub struct MoveShapeResult {
    pub position: Vec3,
    /// Contacts of the last sub-iteration, `None` when `delta_time` was too
    /// short for any sub-iteration to run.
    pub active_contacts: Option<Vec<Contact>>,
}

/// A character moved by collision queries rather than by the rigid body solver.
pub struct CharacterVirtual {
    settings: CharacterSettings,
    cos_max_slope: f32,
    position: Vec3,
    rotation: Quat,
    linear_velocity: Vec3,
    active_contacts: Vec<Contact>,
    supporting_contact: Option<usize>,
    listener: Box<dyn CharacterContactListener>,
}

impl std::fmt::Debug for CharacterVirtual {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharacterVirtual")
            .field("settings", &self.settings)
            .field("position", &self.position)
            .field("rotation", &self.rotation)
            .field("linear_velocity", &self.linear_velocity)
            .field("active_contacts", &self.active_contacts.len())
            .field("ground_state", &self.ground_state())
            .finish()
    }
}

impl CharacterVirtual {
    /// Create a character at `position`/`rotation`. Contacts are empty until
    /// the first [`update`](Self::update) or [`refresh_contacts`](Self::refresh_contacts).
    pub fn new(
        settings: CharacterSettings,
        position: Vec3,
        rotation: Quat,
    ) -> Result<Self, CharacterError> {
        settings.validate()?;
        Ok(Self {
            cos_max_slope: settings.max_slope_angle.cos(),
            settings,
            position,
            rotation,
            linear_velocity: Vec3::ZERO,
            active_contacts: Vec::new(),
            supporting_contact: None,
            listener: Box::new(DefaultContactListener),
        })
    }

    /// Replace the contact listener.
    pub fn set_listener(&mut self, listener: Box<dyn CharacterContactListener>) {
        self.listener = listener;
    }

    pub fn settings(&self) -> &CharacterSettings {
        &self.settings
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Teleport the character. Contacts are refreshed on the next update.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    pub fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    /// Desired velocity for the next update.
    pub fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.linear_velocity = velocity;
    }

    pub fn shape(&self) -> &CharacterShape {
        &self.settings.shape
    }

    pub fn max_slope_angle(&self) -> f32 {
        self.settings.max_slope_angle
    }

    pub fn set_max_slope_angle(&mut self, angle: f32) -> Result<(), CharacterError> {
        settings::validate_slope_angle(angle)?;
        self.settings.max_slope_angle = angle;
        self.cos_max_slope = angle.cos();
        Ok(())
    }

    pub fn max_strength(&self) -> f32 {
        self.settings.max_strength
    }

    pub fn set_max_strength(&mut self, strength: f32) -> Result<(), CharacterError> {
        settings::validate_strength(strength)?;
        self.settings.max_strength = strength;
        Ok(())
    }

    pub fn mass(&self) -> f32 {
        self.settings.mass
    }

    pub fn set_mass(&mut self, mass: f32) -> Result<(), CharacterError> {
        settings::validate_mass(mass)?;
        self.settings.mass = mass;
        Ok(())
    }

    pub fn penetration_recovery_speed(&self) -> f32 {
        self.settings.penetration_recovery_speed
    }

    pub fn set_penetration_recovery_speed(&mut self, speed: f32) -> Result<(), CharacterError> {
        settings::validate_recovery_speed(speed)?;
        self.settings.penetration_recovery_speed = speed;
        Ok(())
    }

    /// Contacts found during the last update, refresh or shape change.
    pub fn active_contacts(&self) -> &[Contact] {
        &self.active_contacts
    }

    /// The collided contact whose normal points most upward.
    pub fn supporting_contact(&self) -> Option<&Contact> {
        self.supporting_contact.map(|index| &self.active_contacts[index])
    }

    pub fn ground_state(&self) -> GroundState {
        let Some(contact) = self.supporting_contact() else {
            return GroundState::InAir;
        };
        if self.is_slope_too_steep(contact.normal) {
            GroundState::Sliding
        } else {
            GroundState::OnGround
        }
    }

    /// Whether the character is on a walkable surface.
    pub fn is_supported(&self) -> bool {
        self.ground_state() == GroundState::OnGround
    }

    pub fn ground_position(&self) -> Option<Vec3> {
        self.supporting_contact().map(|c| c.position)
    }

    pub fn ground_normal(&self) -> Option<Vec3> {
        self.supporting_contact().map(|c| c.normal)
    }

    pub fn ground_velocity(&self) -> Option<Vec3> {
        self.supporting_contact().map(|c| c.linear_velocity)
    }

    pub fn ground_material(&self) -> Option<MaterialId> {
        self.supporting_contact().map(|c| c.material)
    }

    pub fn ground_body_id(&self) -> Option<BodyId> {
        self.supporting_contact().map(|c| c.body)
    }

    pub fn ground_sub_shape_id(&self) -> Option<SubShapeId> {
        self.supporting_contact().map(|c| c.sub_shape)
    }

    pub fn ground_user_data(&self) -> Option<u64> {
        self.supporting_contact().map(|c| c.user_data)
    }

    fn is_slope_too_steep(&self, normal: Vec3) -> bool {
        self.cos_max_slope < settings::NO_SLOPE_LIMIT_COS
            && normal.y > 0.0
            && normal.y < self.cos_max_slope
    }

    /// Advance the character by `delta_time` using its current linear velocity.
    ///
    /// Afterwards the linear velocity is the velocity actually achieved and the
    /// ground state reflects the new contacts. `gravity` is only used to press
    /// down on dynamic bodies the character stands on; apply it to the velocity
    /// yourself before calling.
    pub fn update<W: PhysicsWorld>(
        &mut self,
        world: &W,
        delta_time: f32,
        gravity: Vec3,
        filter: &QueryFilter<'_>,
    ) {
        if !(delta_time > 0.0 && delta_time.is_finite()) {
            tracing::warn!(delta_time, "character update skipped: invalid delta time");
            return;
        }

        let old_position = self.position;
        let result = self.move_shape(
            world,
            self.position,
            self.linear_velocity,
            gravity,
            delta_time,
            filter,
        );
        self.position = result.position;
        self.linear_velocity = (self.position - old_position) / delta_time;
        match result.active_contacts {
            Some(contacts) => self.store_active_contacts(contacts),
            None => self.update_supporting_contact(),
        }

        tracing::trace!(
            position = ?self.position,
            velocity = ?self.linear_velocity,
            ground_state = ?self.ground_state(),
            "character updated"
        );
    }

    /// Move the character shape from `position` at `velocity` for `delta_time`,
    /// without changing the character itself.
    ///
    /// Dynamic bodies in the way are still pushed.
    pub fn move_shape<W: PhysicsWorld>(
        &self,
        world: &W,
        position: Vec3,
        velocity: Vec3,
        gravity: Vec3,
        delta_time: f32,
        filter: &QueryFilter<'_>,
    ) -> MoveShapeResult {
        let limits = self.settings.limits;
        let movement_direction = velocity.normalize_or_zero();
        let listener = self.listener.as_ref();

        let mut position = position;
        let mut time_remaining = delta_time;
        let mut active_contacts = None;
        let mut contacts = Vec::new();
        let mut ignored = Vec::new();
        let mut constraints = Vec::new();

        for iteration in 0..limits.max_collision_iterations {
            if time_remaining < MIN_TIME_REMAINING {
                break;
            }

            contacts_at_position(
                world,
                position,
                self.rotation,
                movement_direction,
                &self.settings.shape,
                filter,
                limits.max_num_hits,
                &mut contacts,
            );

            ignored.clear();
            remove_conflicting_contacts(&mut contacts, &mut ignored);

            constraints.clear();
            determine_constraints(
                velocity,
                &contacts,
                self.cos_max_slope,
                self.settings.penetration_recovery_speed,
                &mut constraints,
            );

            let mut exchanger = ImpulseExchanger {
                world,
                listener,
                gravity,
                delta_time,
                mass: self.settings.mass,
                max_strength: self.settings.max_strength,
            };
            let solved = solve_constraints(
                velocity,
                time_remaining,
                &mut constraints,
                &mut contacts,
                &mut exchanger,
                limits.max_constraint_iterations,
            );

            active_contacts = Some(contacts.clone());

            let mut displacement = solved.displacement;
            let mut time_simulated = solved.time_simulated;
            let sweep = Sweep {
                shape: &self.settings.shape,
                position,
                rotation: self.rotation,
                displacement,
            };
            if let Some(hit) = first_contact_for_sweep(
                world,
                listener,
                sweep,
                &ignored,
                filter,
                limits.max_num_hits,
            ) {
                displacement *= hit.fraction;
                time_simulated *= hit.fraction;
            }

            position += displacement;
            time_remaining -= time_simulated;

            tracing::trace!(
                iteration,
                contacts = contacts.len(),
                constraints = constraints.len(),
                ?displacement,
                time_remaining,
                "character sub-iteration"
            );

            if displacement.length_squared() < 1.0e-8 {
                break;
            }
        }

        MoveShapeResult {
            position,
            active_contacts,
        }
    }

    /// Re-discover contacts at the current pose without moving.
    pub fn refresh_contacts<W: PhysicsWorld>(&mut self, world: &W, filter: &QueryFilter<'_>) {
        let mut contacts = Vec::new();
        contacts_at_position(
            world,
            self.position,
            self.rotation,
            self.linear_velocity.normalize_or_zero(),
            &self.settings.shape,
            filter,
            self.settings.limits.max_num_hits,
            &mut contacts,
        );
        self.store_active_contacts(contacts);
    }

    /// Switch to `shape` (e.g. standing to crouching).
    ///
    /// Fails, keeping the current shape, when the new shape would penetrate
    /// any obstacle deeper than `max_penetration_depth` (pass `f32::MAX` to
    /// always switch) or when the shape is invalid.
    pub fn set_shape<W: PhysicsWorld>(
        &mut self,
        world: &W,
        shape: CharacterShape,
        max_penetration_depth: f32,
        filter: &QueryFilter<'_>,
    ) -> bool {
        if shape == self.settings.shape {
            return true;
        }
        if shape.validate().is_err() {
            return false;
        }

        let mut contacts = Vec::new();
        contacts_at_position(
            world,
            self.position,
            self.rotation,
            self.linear_velocity.normalize_or_zero(),
            &shape,
            filter,
            self.settings.limits.max_num_hits,
            &mut contacts,
        );

        if max_penetration_depth < f32::MAX
            && contacts.iter().any(|c| c.distance < -max_penetration_depth)
        {
            tracing::debug!(?shape, "character shape change blocked by penetration");
            return false;
        }

        self.settings.shape = shape;
        self.store_active_contacts(contacts);
        true
    }

    fn store_active_contacts(&mut self, contacts: Vec<Contact>) {
        self.active_contacts = contacts;
        self.update_supporting_contact();
    }

    fn update_supporting_contact(&mut self) {
        let mut supporting = None;
        let mut max_y = f32::MIN;
        for (index, contact) in self.active_contacts.iter_mut().enumerate() {
            if contact.was_discarded {
                continue;
            }
            contact.had_collision |= contact.distance < COLLISION_TOLERANCE;
            if contact.had_collision && contact.normal.y > max_y {
                max_y = contact.normal.y;
                supporting = Some(index);
            }
        }
        self.supporting_contact = supporting;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::testing::{MockBody, MockWorld};
    use crate::world::{CollideShapeHit, MotionType};

    /// Resting gap that leaves a padded distance of zero.
    const CHARACTER_GAP: f32 = settings::CHARACTER_PADDING;

    fn sphere_settings(radius: f32) -> CharacterSettings {
        CharacterSettings {
            shape: CharacterShape::Sphere { radius },
            ..CharacterSettings::default()
        }
    }

    fn ground_hit(body: u64, normal: Vec3, gap: f32) -> CollideShapeHit {
        CollideShapeHit {
            body: BodyId(body),
            sub_shape: SubShapeId(0),
            contact_point: Vec3::ZERO,
            penetration_axis: -normal,
            penetration_depth: -gap,
            material: MaterialId(body as u32),
        }
    }

    fn character_on(hits: Vec<CollideShapeHit>) -> (CharacterVirtual, MockWorld) {
        let mut world = MockWorld::new();
        for hit in &hits {
            world.add_body(hit.body, MockBody::fixed());
        }
        world.collide_hits = hits;
        let mut character =
            CharacterVirtual::new(sphere_settings(0.5), Vec3::ZERO, Quat::IDENTITY).unwrap();
        character.refresh_contacts(&world, &QueryFilter::default());
        (character, world)
    }

    fn slope_normal(degrees: f32) -> Vec3 {
        Vec3::new(-degrees.to_radians().sin(), degrees.to_radians().cos(), 0.0)
    }

    #[test]
    fn test_new_rejects_invalid_settings() {
        let mut settings = CharacterSettings::default();
        settings.mass = -1.0;
        assert!(CharacterVirtual::new(settings, Vec3::ZERO, Quat::IDENTITY).is_err());
    }

    #[test]
    fn test_ground_states() {
        let (character, _) = character_on(vec![]);
        assert_eq!(character.ground_state(), GroundState::InAir);
        assert!(character.ground_normal().is_none());

        let (character, _) = character_on(vec![ground_hit(1, Vec3::Y, CHARACTER_GAP)]);
        assert_eq!(character.ground_state(), GroundState::OnGround);
        assert!(character.is_supported());

        let (character, _) = character_on(vec![ground_hit(1, slope_normal(60.0), CHARACTER_GAP)]);
        assert_eq!(character.ground_state(), GroundState::Sliding);

        let (character, _) = character_on(vec![ground_hit(1, slope_normal(30.0), CHARACTER_GAP)]);
        assert_eq!(character.ground_state(), GroundState::OnGround);

        // Too far away to count as touching
        let (character, _) = character_on(vec![ground_hit(1, Vec3::Y, 0.08)]);
        assert_eq!(character.ground_state(), GroundState::InAir);
    }

    #[test]
    fn test_supporting_contact_is_most_upright() {
        let (character, _) = character_on(vec![
            ground_hit(1, slope_normal(60.0), CHARACTER_GAP),
            ground_hit(2, Vec3::Y, CHARACTER_GAP),
            ground_hit(3, Vec3::X, CHARACTER_GAP),
        ]);
        assert_eq!(character.ground_body_id(), Some(BodyId(2)));
        assert_eq!(character.ground_material(), Some(MaterialId(2)));
        assert_eq!(character.ground_state(), GroundState::OnGround);
    }

    #[test]
    fn test_slope_limit_can_be_disabled() {
        let (mut character, _) =
            character_on(vec![ground_hit(1, slope_normal(60.0), CHARACTER_GAP)]);
        assert_eq!(character.ground_state(), GroundState::Sliding);
        character.set_max_slope_angle(0.0).unwrap();
        assert_eq!(character.ground_state(), GroundState::OnGround);
        assert!(character.set_max_slope_angle(-1.0).is_err());
    }

    #[test]
    fn test_update_without_obstacles_moves_freely() {
        let world = MockWorld::new();
        let mut character =
            CharacterVirtual::new(sphere_settings(0.5), Vec3::ZERO, Quat::IDENTITY).unwrap();
        let velocity = Vec3::new(3.0, -1.0, 2.0);
        character.set_linear_velocity(velocity);
        character.update(&world, 0.1, Vec3::ZERO, &QueryFilter::default());

        let eps = 1e-5;
        assert!((character.position() - velocity * 0.1).length() < eps);
        assert!((character.linear_velocity() - velocity).length() < eps);
        assert_eq!(character.ground_state(), GroundState::InAir);
    }

    #[test]
    fn test_invalid_delta_time_is_ignored() {
        let world = MockWorld::new();
        let mut character =
            CharacterVirtual::new(sphere_settings(0.5), Vec3::ZERO, Quat::IDENTITY).unwrap();
        character.set_linear_velocity(Vec3::X);
        character.update(&world, 0.0, Vec3::ZERO, &QueryFilter::default());
        character.update(&world, f32::NAN, Vec3::ZERO, &QueryFilter::default());
        assert_eq!(character.position(), Vec3::ZERO);
        assert_eq!(character.linear_velocity(), Vec3::X);
    }

    #[test]
    fn test_discarded_contacts_never_support() {
        let (mut character, _) = character_on(vec![ground_hit(1, Vec3::Y, CHARACTER_GAP)]);
        character.active_contacts[0].was_discarded = true;
        character.active_contacts[0].had_collision = false;
        character.update_supporting_contact();
        assert_eq!(character.ground_state(), GroundState::InAir);
    }

    #[test]
    fn test_move_shape_leaves_character_untouched() {
        let world = MockWorld::new();
        let character =
            CharacterVirtual::new(sphere_settings(0.5), Vec3::ZERO, Quat::IDENTITY).unwrap();
        let result = character.move_shape(
            &world,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 4.0),
            Vec3::ZERO,
            0.25,
            &QueryFilter::default(),
        );
        assert!((result.position - Vec3::new(1.0, 0.0, 1.0)).length() < 1e-5);
        assert_eq!(result.active_contacts.map(|c| c.len()), Some(0));
        assert_eq!(character.position(), Vec3::ZERO);
    }

    #[test]
    fn test_tiny_delta_time_keeps_ground_contacts() {
        let (mut character, world) = character_on(vec![ground_hit(1, Vec3::Y, CHARACTER_GAP)]);
        assert_eq!(character.ground_state(), GroundState::OnGround);

        character.update(&world, 5.0e-5, Vec3::new(0.0, -9.81, 0.0), &QueryFilter::default());
        assert_eq!(character.active_contacts().len(), 1);
        assert_eq!(character.ground_state(), GroundState::OnGround);
        assert_eq!(character.position(), Vec3::ZERO);
    }

    #[test]
    fn test_contact_user_data_and_motion_type_are_copied() {
        let (character, _) = character_on(vec![ground_hit(4, Vec3::Y, CHARACTER_GAP)]);
        let ground = character.supporting_contact().unwrap();
        assert_eq!(ground.motion_type, MotionType::Static);
        assert_eq!(character.ground_user_data(), Some(0));
        assert_eq!(character.ground_sub_shape_id(), Some(SubShapeId(0)));
    }
}
