//! Contact callbacks for character controllers.

use glam::Vec3;

use crate::world::{BodyId, SubShapeId};

/// Per-contact behavior chosen by [`CharacterContactListener::on_contact_added`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterContactSettings {
    /// The obstacle's velocity is imparted on the character (moving platforms). Default: true.
    pub can_push_character: bool,
    /// The character pushes the obstacle if it is dynamic. Default: true.
    pub can_receive_impulses: bool,
}

impl Default for CharacterContactSettings {
    fn default() -> Self {
        Self {
            can_push_character: true,
            can_receive_impulses: true,
        }
    }
}

/// Receives contact events from a character.
///
/// Called from inside the character step; implementations must not mutate
/// the character and must be thread safe, since characters may be stepped in
/// parallel.
pub trait CharacterContactListener: Send + Sync {
    /// Return false to ignore the contact for the rest of the step.
    fn on_contact_validate(&self, _body: BodyId, _sub_shape: SubShapeId) -> bool {
        true
    }

    /// A contact is about to be collided with. `normal` points from the
    /// character into the obstacle.
    fn on_contact_added(
        &self,
        _body: BodyId,
        _sub_shape: SubShapeId,
        _position: Vec3,
        _normal: Vec3,
        _settings: &mut CharacterContactSettings,
    ) {
    }
}

/// Accepts every contact with default settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultContactListener;

impl CharacterContactListener for DefaultContactListener {}
