// Copyright (c) 2019-present the project contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Contact & Trigger Tracker: turns `rapier3d`'s raw collision
//! callbacks into the begin/update/end event stream the Tick Pipeline
//! dispatches to game objects.
//!
//! `rapier3d`'s own [`rapier3d::pipeline::EventHandler`] callbacks may run
//! from a solver worker thread, so [`ContactTracker`] buffers everything it
//! sees behind a mutex and only interprets the buffer from the tick
//! thread, in [`ContactTracker::collect`]. The shape of the raw event
//! (collider pair + started/stopped + sensor flag) is the one
//! `rapier3d::pipeline::EventHandler` always hands out, and per-contact
//! impulses are read back from `NarrowPhase::contact_pairs` after the step
//! completes, the same place `rapier3d`'s own `ChannelEventCollector`
//! example reads them from.

use crate::handle::{ContactKey, ExtendedHandle};
use fyrox_core::algebra::Vector3;
use fyrox_core::parking_lot::Mutex;
use rapier3d::geometry::{Collider, ColliderHandle, ColliderSet, ContactManifold, NarrowPhase};
use rapier3d::pipeline::{CollisionEvent, CollisionEventFlags};
use std::collections::HashMap;

/// Lifecycle stage of a contact or overlap, relative to the previous tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    Began,
    Updated,
    Ended,
}

/// A single manifold point, transformed into world space, with its
/// estimated collision-response impulse.
#[derive(Copy, Clone, Debug)]
pub struct ContactPoint {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub impulse: f32,
}

/// A solid-body contact event. `dispatch_first`/`dispatch_second` say
/// whether `first`'s/`second`'s owner asked for contact callbacks
/// (`DISPATCH_CONTACT_EVENTS`) at the moment the contact began; the Tick
/// Pipeline only calls back owners for whom its side is `true`.
#[derive(Clone, Debug)]
pub struct ContactEvent {
    pub kind: EventKind,
    pub first: ExtendedHandle,
    pub second: ExtendedHandle,
    pub dispatch_first: bool,
    pub dispatch_second: bool,
    pub points: Vec<ContactPoint>,
}

/// A sensor overlap event, handed to the trigger's owner.
#[derive(Copy, Clone, Debug)]
pub struct TriggerEvent {
    pub kind: EventKind,
    pub trigger: ExtendedHandle,
    pub other: ExtendedHandle,
}

/// Bookkeeping for one live trigger overlap, keyed by [`ContactKey`].
#[derive(Copy, Clone, Debug)]
struct TriggerContactEntry {
    trigger: ExtendedHandle,
    other: ExtendedHandle,
}

/// Bookkeeping for one live solid-body contact, keyed by [`ContactKey`].
/// `dispatch_first`/`dispatch_second` record which side(s) had
/// `DISPATCH_CONTACT_EVENTS` set when the contact began, so the Tick
/// Pipeline knows whom to call back without re-resolving flags on every
/// Updated/Ended event.
#[derive(Copy, Clone, Debug)]
struct BodyContactEntry {
    first: ExtendedHandle,
    second: ExtendedHandle,
    dispatch_first: bool,
    dispatch_second: bool,
}

/// Bookkeeping for one live character-vs-trigger overlap, stamped by the
/// Character Controller's extended update rather than discovered through
/// `rapier3d`'s collision-event stream.
/// A character's collider never requests `ActiveEvents::COLLISION_EVENTS`,
/// so it never reaches [`ContactTracker::collect`]; liveness here is
/// tracked by the last tick the entry was re-stamped instead of a
/// start/stop event pair.
#[derive(Copy, Clone, Debug)]
struct CharacterTriggerEntry {
    trigger: ExtendedHandle,
    character: ExtendedHandle,
    last_frame: u64,
}

/// Bookkeeping for one live character-vs-body contact.
#[derive(Copy, Clone, Debug)]
struct CharacterContactEntry {
    other: ExtendedHandle,
    character: ExtendedHandle,
    last_frame: u64,
}

struct RawCollisionEvent {
    collider1: ColliderHandle,
    collider2: ColliderHandle,
    started: bool,
    sensor: bool,
}

#[derive(Default)]
struct RawBuffer {
    events: Vec<RawCollisionEvent>,
}

/// Implements `rapier3d`'s event-handler contract by buffering raw events
/// behind a mutex, and separately owns the per-tick maps of live overlaps
/// and contacts those raw events are folded into.
pub struct ContactTracker {
    raw: Mutex<RawBuffer>,
    trigger_contacts: HashMap<ContactKey, TriggerContactEntry>,
    body_contacts: HashMap<ContactKey, BodyContactEntry>,
    character_triggers: HashMap<ContactKey, CharacterTriggerEntry>,
    character_contacts: HashMap<ContactKey, CharacterContactEntry>,
}

impl Default for ContactTracker {
    fn default() -> Self {
        Self {
            raw: Mutex::new(RawBuffer::default()),
            trigger_contacts: HashMap::new(),
            body_contacts: HashMap::new(),
            character_triggers: HashMap::new(),
            character_contacts: HashMap::new(),
        }
    }
}

impl ContactTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out an `EventHandler` view for one solver step. The returned
    /// reference only ever appends to the mutex-guarded buffer, so it is
    /// safe to share with solver worker threads even while `self` is
    /// otherwise borrowed immutably.
    pub fn as_event_handler(&self) -> &dyn rapier3d::pipeline::EventHandler {
        self
    }

    /// Drains the raw buffer and derives this tick's begin/update/end event
    /// streams. `lookup` resolves a live collider's packed `user_data` field
    /// to the `(BodyHandle, BodyKindTag)` pair the caller's component
    /// registries are keyed on — only the registry (in `body.rs`) knows how
    /// to decode the user-data arena, so it is passed in rather than
    /// duplicated here.
    pub fn collect(
        &mut self,
        colliders: &ColliderSet,
        narrow_phase: &NarrowPhase,
        lookup: &dyn Fn(u128) -> Option<ExtendedHandle>,
        dispatch: &dyn Fn(ExtendedHandle) -> bool,
    ) -> (Vec<TriggerEvent>, Vec<ContactEvent>) {
        let raw = std::mem::take(&mut self.raw.lock().events);

        let mut triggers = Vec::new();
        let mut contacts = Vec::new();

        for event in raw {
            let Some(a) = collider_user_data(colliders, event.collider1).and_then(|d| lookup(d))
            else {
                continue;
            };
            let Some(b) = collider_user_data(colliders, event.collider2).and_then(|d| lookup(d))
            else {
                continue;
            };
            let key = ContactKey::new(a.handle, b.handle);

            if event.sensor {
                if event.started {
                    let (trigger, other) = if matches!(a.kind, crate::body::BodyKindTag::Trigger) {
                        (a, b)
                    } else {
                        (b, a)
                    };
                    self.trigger_contacts
                        .insert(key, TriggerContactEntry { trigger, other });
                    triggers.push(TriggerEvent {
                        kind: EventKind::Began,
                        trigger,
                        other,
                    });
                } else if let Some(entry) = self.trigger_contacts.remove(&key) {
                    triggers.push(TriggerEvent {
                        kind: EventKind::Ended,
                        trigger: entry.trigger,
                        other: entry.other,
                    });
                }
                continue;
            }

            // Per-side dispatch gating: a contact is only surfaced
            // at all if at least one owner asked for it via
            // `DISPATCH_CONTACT_EVENTS`.
            let dispatch_first = dispatch(a);
            let dispatch_second = dispatch(b);
            if !dispatch_first && !dispatch_second {
                continue;
            }

            if event.started {
                self.body_contacts.insert(
                    key,
                    BodyContactEntry {
                        first: a,
                        second: b,
                        dispatch_first,
                        dispatch_second,
                    },
                );
                contacts.push(ContactEvent {
                    kind: EventKind::Began,
                    first: a,
                    second: b,
                    dispatch_first,
                    dispatch_second,
                    points: manifold_points(colliders, event.collider1, event.collider2, narrow_phase),
                });
            } else if let Some(entry) = self.body_contacts.remove(&key) {
                contacts.push(ContactEvent {
                    kind: EventKind::Ended,
                    first: entry.first,
                    second: entry.second,
                    dispatch_first: entry.dispatch_first,
                    dispatch_second: entry.dispatch_second,
                    points: Vec::new(),
                });
            }
        }

        // Anything still touching gets an Updated event with this tick's
        // manifold points.
        for (pair, entry) in self.body_contacts.iter() {
            let _ = pair;
            if let Some(contact_pair) = narrow_phase.contact_pairs().find(|p| {
                resolves_to(colliders, p.collider1, entry.first, lookup)
                    && resolves_to(colliders, p.collider2, entry.second, lookup)
                    || resolves_to(colliders, p.collider1, entry.second, lookup)
                        && resolves_to(colliders, p.collider2, entry.first, lookup)
            }) {
                if contact_pair.has_any_active_contact {
                    contacts.push(ContactEvent {
                        kind: EventKind::Updated,
                        first: entry.first,
                        second: entry.second,
                        dispatch_first: entry.dispatch_first,
                        dispatch_second: entry.dispatch_second,
                        points: manifold_points(
                            colliders,
                            contact_pair.collider1,
                            contact_pair.collider2,
                            narrow_phase,
                        ),
                    });
                }
            }
        }

        (triggers, contacts)
    }

    /// Records that `character` touched `trigger` during this tick's
    /// extended update. Returns a `Began` event the first time the pair is
    /// seen; on every later tick it just refreshes `last_frame` and returns
    /// `None`, leaving [`ContactTracker::sweep_character_contacts`] to emit
    /// the eventual `Ended` event once the pair stops being restamped.
    pub fn observe_character_trigger(
        &mut self,
        character: ExtendedHandle,
        trigger: ExtendedHandle,
        frame: u64,
    ) -> Option<TriggerEvent> {
        let key = ContactKey::new(character.handle, trigger.handle);
        match self.character_triggers.entry(key) {
            std::collections::hash_map::Entry::Occupied(mut e) => {
                e.get_mut().last_frame = frame;
                None
            }
            std::collections::hash_map::Entry::Vacant(v) => {
                v.insert(CharacterTriggerEntry {
                    trigger,
                    character,
                    last_frame: frame,
                });
                Some(TriggerEvent {
                    kind: EventKind::Began,
                    trigger,
                    other: character,
                })
            }
        }
    }

    /// Records that `character` touched `other` during this tick's extended
    /// update, provided `other`'s owner asked for contact dispatch. Returns
    /// a Contact Event from `other`'s perspective, `Began` on first
    /// contact and `Updated` on every later tick while the pair keeps
    /// getting restamped.
    pub fn observe_character_contact(
        &mut self,
        character: ExtendedHandle,
        other: ExtendedHandle,
        frame: u64,
        normal: Vector3<f32>,
        position: Vector3<f32>,
    ) -> Option<ContactEvent> {
        let key = ContactKey::new(character.handle, other.handle);
        let point = ContactPoint {
            position,
            normal,
            impulse: 0.0,
        };
        let kind = match self.character_contacts.entry(key) {
            std::collections::hash_map::Entry::Occupied(mut e) => {
                e.get_mut().last_frame = frame;
                EventKind::Updated
            }
            std::collections::hash_map::Entry::Vacant(v) => {
                v.insert(CharacterContactEntry {
                    other,
                    character,
                    last_frame: frame,
                });
                EventKind::Began
            }
        };
        Some(ContactEvent {
            kind,
            first: other,
            second: character,
            dispatch_first: true,
            dispatch_second: false,
            points: vec![point],
        })
    }

    /// Closes out character-linked entries that weren't restamped this tick
    ///: called once per tick after the Character
    /// Controller Driver has run every live character through its extended
    /// update.
    pub fn sweep_character_contacts(&mut self, current_frame: u64) -> (Vec<TriggerEvent>, Vec<ContactEvent>) {
        let mut triggers = Vec::new();
        self.character_triggers.retain(|_, entry| {
            if entry.last_frame < current_frame {
                triggers.push(TriggerEvent {
                    kind: EventKind::Ended,
                    trigger: entry.trigger,
                    other: entry.character,
                });
                false
            } else {
                true
            }
        });

        let mut contacts = Vec::new();
        self.character_contacts.retain(|_, entry| {
            if entry.last_frame < current_frame {
                contacts.push(ContactEvent {
                    kind: EventKind::Ended,
                    first: entry.other,
                    second: entry.character,
                    dispatch_first: true,
                    dispatch_second: false,
                    points: Vec::new(),
                });
                false
            } else {
                true
            }
        });

        (triggers, contacts)
    }
}

fn resolves_to(
    colliders: &ColliderSet,
    handle: ColliderHandle,
    expected: ExtendedHandle,
    lookup: &dyn Fn(u128) -> Option<ExtendedHandle>,
) -> bool {
    collider_user_data(colliders, handle)
        .and_then(lookup)
        .is_some_and(|resolved| resolved == expected)
}

fn collider_user_data(colliders: &ColliderSet, handle: ColliderHandle) -> Option<u128> {
    colliders.get(handle).map(|c| c.user_data)
}

fn manifold_points(
    colliders: &ColliderSet,
    collider1: ColliderHandle,
    collider2: ColliderHandle,
    narrow_phase: &NarrowPhase,
) -> Vec<ContactPoint> {
    let Some(pair) = narrow_phase.contact_pair(collider1, collider2) else {
        return Vec::new();
    };
    let Some(c1) = colliders.get(collider1) else {
        return Vec::new();
    };

    pair.manifolds
        .iter()
        .flat_map(|manifold| manifold_points_one(c1, manifold))
        .collect()
}

fn manifold_points_one(collider1: &Collider, manifold: &ContactManifold) -> Vec<ContactPoint> {
    let world_normal = collider1.position() * manifold.local_n1;
    manifold
        .points
        .iter()
        .map(|point| {
            let world_position = collider1.position() * point.local_p1;
            ContactPoint {
                position: Vector3::new(world_position.x, world_position.y, world_position.z),
                normal: Vector3::new(world_normal.x, world_normal.y, world_normal.z),
                impulse: point.data.impulse,
            }
        })
        .collect()
}

impl rapier3d::pipeline::EventHandler for ContactTracker {
    fn handle_collision_event(
        &self,
        _bodies: &rapier3d::dynamics::RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&rapier3d::geometry::ContactPair>,
    ) {
        let mut raw = self.raw.lock();
        match event {
            CollisionEvent::Started(a, b, flags) => raw.events.push(RawCollisionEvent {
                collider1: a,
                collider2: b,
                started: true,
                sensor: flags.contains(CollisionEventFlags::SENSOR),
            }),
            CollisionEvent::Stopped(a, b, flags) => raw.events.push(RawCollisionEvent {
                collider1: a,
                collider2: b,
                started: false,
                sensor: flags.contains(CollisionEventFlags::SENSOR),
            }),
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: rapier3d::math::Real,
        _bodies: &rapier3d::dynamics::RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &rapier3d::geometry::ContactPair,
        _total_force_magnitude: rapier3d::math::Real,
    ) {
        // Impulses are read back from `NarrowPhase::contact_pairs` in
        // `collect` instead, so there's nothing to buffer here.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyKindTag;
    use fyrox_core::pool::Handle;

    #[test]
    fn trigger_entry_round_trips_through_contact_key() {
        let trigger = ExtendedHandle::new(Handle::new(1, 1), BodyKindTag::Trigger);
        let other = ExtendedHandle::new(Handle::new(2, 1), BodyKindTag::Dynamic);
        let key_ab = ContactKey::new(trigger.handle, other.handle);
        let key_ba = ContactKey::new(other.handle, trigger.handle);
        assert_eq!(key_ab, key_ba);
    }

    #[test]
    fn tracker_starts_with_no_live_contacts() {
        let tracker = ContactTracker::new();
        assert!(tracker.trigger_contacts.is_empty());
        assert!(tracker.body_contacts.is_empty());
        assert!(tracker.character_triggers.is_empty());
        assert!(tracker.character_contacts.is_empty());
    }

    #[test]
    fn character_trigger_begins_once_then_sweeps_to_an_end_event() {
        let mut tracker = ContactTracker::new();
        let character = ExtendedHandle::new(Handle::new(1, 1), BodyKindTag::Character);
        let trigger = ExtendedHandle::new(Handle::new(2, 1), BodyKindTag::Trigger);

        let begin = tracker.observe_character_trigger(character, trigger, 0);
        assert!(matches!(begin, Some(TriggerEvent { kind: EventKind::Began, .. })));

        let restamp = tracker.observe_character_trigger(character, trigger, 1);
        assert!(restamp.is_none());

        let (ended, _) = tracker.sweep_character_contacts(2);
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].kind, EventKind::Ended);
    }
}
