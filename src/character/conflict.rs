//! Remove contradictory contacts against the same obstacle.
//!
//! Penetrating a mesh edge can report two contacts on the same body whose
//! normals point against each other. Keeping both would pin the character in
//! place, so the shallower one is dropped and its part is excluded from the
//! sweep that follows.

use crate::settings::MIN_REQUIRED_PENETRATION;

use super::contact::{Contact, IgnoredContact};

/// Drop the shallower of every pair of opposing, penetrating contacts on one body.
///
/// Order of the surviving contacts is preserved. Every dropped contact's
/// `(body, sub_shape)` is appended to `ignored`.
pub fn remove_conflicting_contacts(contacts: &mut Vec<Contact>, ignored: &mut Vec<IgnoredContact>) {
    let mut discarded = vec![false; contacts.len()];
    let previously_ignored = ignored.len();

    for i in 0..contacts.len() {
        if discarded[i] {
            continue;
        }
        let c1 = contacts[i];
        if c1.distance > -MIN_REQUIRED_PENETRATION {
            continue;
        }
        for j in (i + 1)..contacts.len() {
            if discarded[j] {
                continue;
            }
            let c2 = contacts[j];
            if c1.body != c2.body
                || c2.distance > -MIN_REQUIRED_PENETRATION
                || c1.normal.dot(c2.normal) >= 0.0
            {
                continue;
            }
            if c1.distance < c2.distance {
                discarded[j] = true;
                ignored.push(IgnoredContact::new(c2.body, c2.sub_shape));
            } else {
                discarded[i] = true;
                ignored.push(IgnoredContact::new(c1.body, c1.sub_shape));
                break;
            }
        }
    }

    let removed = ignored.len() - previously_ignored;
    if removed == 0 {
        return;
    }
    tracing::trace!(removed, "discarded conflicting character contacts");

    let mut index = 0;
    contacts.retain(|_| {
        let keep = !discarded[index];
        index += 1;
        keep
    });
}
