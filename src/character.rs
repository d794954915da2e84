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

//! Character Controller: a kinematic capsule driven by `rapier3d`'s
//! [`KinematicCharacterController`], approximating Jolt's
//! `CharacterVirtual::ExtendedUpdate` (four-state ground classification,
//! stick-to-floor, walk-stairs, overbounce velocity projection) on top of
//! `rapier3d`'s simpler boolean-grounded `move_shape`.

use crate::filter::{decode_object_layer, encode_object_layer, BroadphaseClass, CollisionFilterTable, ObjectLayer};
use fyrox_core::algebra::{UnitQuaternion, Vector3};
use fyrox_core::log::{Log, MessageKind};
use fyrox_core::reflect::prelude::*;
use fyrox_core::visitor::prelude::*;
use rapier3d::control::{CharacterAutostep, CharacterLength, KinematicCharacterController};
use rapier3d::geometry::{Capsule, InteractionGroups};

fn u32_to_group(v: u32) -> rapier3d::geometry::Group {
    rapier3d::geometry::Group::from_bits(v).unwrap_or_else(rapier3d::geometry::Group::all)
}

/// Ground classification for one tick, approximating Jolt's
/// `CharacterVirtual::EGroundState`. `rapier3d`'s
/// `KinematicCharacterController` only reports a boolean `grounded`; the
/// remaining states are derived here from the steepest contact normal's
/// angle to "up" reported by `move_shape`'s collision callback.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Visit, Reflect, Default)]
pub enum GroundState {
    #[default]
    NotSupported,
    OnGround,
    OnSteepGround,
    InAir,
}

/// Capsule or cylinder standing/crouching profile, matching
/// `CharacterShapeType`.
#[derive(Copy, Clone, Debug, Visit, Reflect)]
pub enum CharacterShapeType {
    Capsule,
    Cylinder,
}

impl Default for CharacterShapeType {
    fn default() -> Self {
        Self::Capsule
    }
}

/// A kinematic character body. One instance per controlled pawn.
#[derive(Visit, Reflect)]
pub struct CharacterController {
    pub shape_type: CharacterShapeType,
    pub height_standing: f32,
    pub radius_standing: f32,
    pub height_crouching: f32,
    pub radius_crouching: f32,
    pub layer: ObjectLayer,

    pub enable_walk_stairs: bool,
    pub enable_stick_to_floor: bool,
    pub stairs_step_up: f32,
    pub stick_to_floor_step_down: f32,
    pub max_slope_angle_degrees: f32,
    pub game_object: crate::handle::GameObjectHandle,

    /// Desired world-space velocity for the next tick, set by gameplay and
    /// consumed (then overbounce-projected, if airborne) by the driver.
    #[visit(skip)]
    #[reflect(hidden)]
    pub linear_velocity: Vector3<f32>,

    #[visit(skip)]
    #[reflect(hidden)]
    crouching: bool,
    #[visit(skip)]
    #[reflect(hidden)]
    ground_state: GroundState,
    #[visit(skip)]
    #[reflect(hidden)]
    ground_normal: Vector3<f32>,
    #[visit(skip)]
    #[reflect(hidden)]
    ground_position: Vector3<f32>,
    #[visit(skip)]
    #[reflect(hidden)]
    body: Option<CharacterBody>,
}

struct CharacterBody {
    rigid_body: rapier3d::dynamics::RigidBodyHandle,
    collider: rapier3d::geometry::ColliderHandle,
}

impl Default for CharacterController {
    fn default() -> Self {
        Self {
            shape_type: CharacterShapeType::default(),
            height_standing: 1.2,
            radius_standing: 0.3,
            height_crouching: 0.8,
            radius_crouching: 0.3,
            layer: ObjectLayer::default(),
            enable_walk_stairs: true,
            enable_stick_to_floor: true,
            stairs_step_up: 0.5,
            stick_to_floor_step_down: -0.5,
            max_slope_angle_degrees: 45.0,
            game_object: crate::handle::GameObjectHandle::default(),
            linear_velocity: Vector3::zeros(),
            crouching: false,
            ground_state: GroundState::NotSupported,
            ground_normal: Vector3::new(0.0, 1.0, 0.0),
            ground_position: Vector3::zeros(),
            body: None,
        }
    }
}

impl CharacterController {
    fn capsule(&self) -> Capsule {
        let (height, radius) = if self.crouching {
            (self.height_crouching, self.radius_crouching)
        } else {
            (self.height_standing, self.radius_standing)
        };
        Capsule::new_y((height * 0.5 - radius).max(0.01), radius)
    }

    fn native_controller(&self) -> KinematicCharacterController {
        KinematicCharacterController {
            max_slope_climb_angle: self.max_slope_angle_degrees.to_radians(),
            min_slope_slide_angle: self.max_slope_angle_degrees.to_radians(),
            autostep: self.enable_walk_stairs.then_some(CharacterAutostep {
                max_height: CharacterLength::Absolute(self.stairs_step_up),
                min_width: CharacterLength::Absolute(0.2),
                include_dynamic_bodies: true,
            }),
            snap_to_ground: self
                .enable_stick_to_floor
                .then_some(CharacterLength::Absolute(-self.stick_to_floor_step_down)),
            offset: CharacterLength::Absolute(0.02),
            ..Default::default()
        }
    }

    pub fn begin_play(
        &mut self,
        registry: &mut crate::body::BodyRegistry,
        position: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
    ) {
        let collider = rapier3d::geometry::ColliderBuilder::new(rapier3d::geometry::SharedShape::new(
            self.capsule(),
        ))
        .collision_groups(InteractionGroups::new(
            u32_to_group(encode_object_layer(self.layer, BroadphaseClass::Character)),
            u32_to_group(u32::MAX),
        ))
        .build();
        let rigid_body = registry.rigid_bodies.insert(
            rapier3d::dynamics::RigidBodyBuilder::new(rapier3d::dynamics::RigidBodyType::KinematicPositionBased)
                .position(fyrox_core::algebra::Isometry3::from_parts(
                    position.into(),
                    rotation,
                ))
                .build(),
        );
        let collider = registry
            .colliders
            .insert_with_parent(collider, rigid_body, &mut registry.rigid_bodies);
        self.body = Some(CharacterBody { rigid_body, collider });
    }

    pub fn end_play(&mut self, registry: &mut crate::body::BodyRegistry) {
        let Some(body) = self.body.take() else {
            return;
        };
        registry.rigid_bodies.remove(
            body.rigid_body,
            &mut registry.islands,
            &mut registry.colliders,
            &mut registry.impulse_joints,
            &mut registry.multibody_joints,
            true,
        );
    }

    pub fn is_live(&self) -> bool {
        self.body.is_some()
    }

    pub fn native(&self) -> Option<rapier3d::dynamics::RigidBodyHandle> {
        self.body.as_ref().map(|b| b.rigid_body)
    }

    pub fn is_on_ground(&self) -> bool {
        self.ground_state == GroundState::OnGround
    }

    pub fn is_on_steep_ground(&self) -> bool {
        self.ground_state == GroundState::OnSteepGround
    }

    pub fn is_should_fall(&self) -> bool {
        self.ground_state == GroundState::NotSupported
    }

    pub fn is_in_air(&self) -> bool {
        self.ground_state == GroundState::InAir
    }

    pub fn ground_normal(&self) -> Vector3<f32> {
        self.ground_normal
    }

    pub fn ground_position(&self) -> Vector3<f32> {
        self.ground_position
    }

    pub fn set_stance(&mut self, crouching: bool) {
        self.crouching = crouching;
    }
}

/// One tick of Character Controller movement:
/// resolves `desired_translation` against the world with
/// `KinematicCharacterController::move_shape`, writes the corrected
/// position back to the rigid body, derives the steepest-contact ground
/// state, and — when the character is airborne or unsupported — projects
/// `linear_velocity` off every contact normal it slid along this tick
/// (Jolt's overbounce formula, factor 1.0).
pub fn extended_update(
    character: &mut CharacterController,
    character_handle: crate::handle::BodyHandle,
    registry: &mut crate::body::BodyRegistry,
    tracker: &mut crate::contacts::ContactTracker,
    frame: u64,
    flags_of: &dyn Fn(crate::handle::ExtendedHandle) -> crate::body::BodyFlags,
    query: &rapier3d::pipeline::QueryPipeline,
    filter_table: &CollisionFilterTable,
    gravity: Vector3<f32>,
    dt: f32,
) -> (Option<crate::contacts::TriggerEvent>, Option<crate::contacts::ContactEvent>) {
    let Some(body) = character.body.as_ref() else {
        return (None, None);
    };
    let Some(rigid_body) = registry.rigid_bodies.get(body.rigid_body) else {
        return (None, None);
    };
    let position = *rigid_body.position();
    let shape = character.capsule();
    let controller = character.native_controller();

    let gravity_term = if character.ground_state == GroundState::OnGround {
        Vector3::zeros()
    } else {
        gravity * dt
    };
    let desired_translation = (character.linear_velocity + gravity_term) * dt;

    // The object-layer filter: a candidate collider is only considered if
    // its layer is marked compatible with the character's own layer in the
    // collision filter table, the same gate the solver applies to regular
    // contact/intersection pairs via `CollisionFilterHooks`.
    let character_layer = character.layer;
    let layer_compatible = |_: rapier3d::geometry::ColliderHandle, collider: &rapier3d::geometry::Collider| {
        let (other_layer, _) = decode_object_layer(collider.collision_groups().memberships.bits());
        filter_table.can_collide(character_layer, other_layer)
    };

    let filter = rapier3d::pipeline::QueryFilter::new()
        .exclude_rigid_body(body.rigid_body)
        .predicate(&layer_compatible);

    let movement = controller.move_shape(
        dt,
        &registry.rigid_bodies,
        &registry.colliders,
        query,
        &shape,
        &position,
        desired_translation,
        filter,
        |_| {},
    );

    if let Some(rigid_body) = registry.rigid_bodies.get_mut(body.rigid_body) {
        let new_translation = rigid_body.translation() + movement.translation;
        rigid_body.set_next_kinematic_translation(new_translation);
    }

    // `move_shape` only reports a boolean `grounded`, not a four-state
    // classification, so the remaining states are derived from a short
    // downward probe beneath the capsule's base.
    let radius = character.capsule().radius;
    let probe_origin = position.translation.vector;
    let resolve = |packed: u128| registry.resolve_user_data(packed);
    let probe_filter = rapier3d::pipeline::QueryFilter::new()
        .exclude_rigid_body(body.rigid_body)
        .predicate(&layer_compatible);
    let probe = crate::query::cast_ray_closest_native(
        query,
        &registry.rigid_bodies,
        &registry.colliders,
        &resolve,
        probe_origin,
        Vector3::new(0.0, -1.0, 0.0),
        radius + 0.3,
        true,
        probe_filter,
    );

    let up = Vector3::new(0.0, 1.0, 0.0);
    let max_slope_cos = character.max_slope_angle_degrees.to_radians().cos();
    character.ground_state = match (movement.grounded, probe) {
        (true, Some(hit)) if hit.normal.dot(&up) >= max_slope_cos => GroundState::OnGround,
        (true, Some(_)) => GroundState::OnSteepGround,
        (true, None) => GroundState::OnGround,
        (false, Some(_)) => GroundState::NotSupported,
        (false, None) => GroundState::InAir,
    };
    if let Some(hit) = probe {
        character.ground_normal = hit.normal;
        character.ground_position = hit.point;
    }

    if !matches!(
        character.ground_state,
        GroundState::OnGround | GroundState::OnSteepGround
    ) {
        // Jolt's overbounce: kill the component of velocity driving the
        // character into the surface it is sliding against, factor 1.0
        // (PhysicsInterface.cpp, `UpdateCharacterControllers`).
        const OVERBOUNCE: f32 = 1.0;
        if let Some(hit) = probe {
            let into_surface = character.linear_velocity.dot(&hit.normal).min(0.0);
            character.linear_velocity -= hit.normal * (into_surface * OVERBOUNCE);
        }
    }

    if character.enable_stick_to_floor || character.enable_walk_stairs {
        // autostep/snap-to-ground are already folded into `movement` by
        // `move_shape` via `controller.autostep`/`controller.snap_to_ground`.
    } else {
        Log::writeln(
            MessageKind::Information,
            "physics: character controller running with stairs and stick-to-floor both disabled"
                .to_string(),
        );
    }

    // Character-body listener: the character's own collider never
    // requests `ActiveEvents::COLLISION_EVENTS`, so whatever it is standing
    // on never reaches the regular body-body listener in `contacts.rs`. The
    // ground probe above doubles as this tick's contact sample; rapier's
    // kinematic `move_shape` does not report per-collision identity the way
    // Jolt's `CharacterVirtual::ExtendedUpdate` contact listener does, so
    // sliding contacts the character brushes but doesn't stand on are not
    // separately stamped.
    let character_extended =
        crate::handle::ExtendedHandle::new(character_handle, crate::body::BodyKindTag::Character);
    let mut trigger_event = None;
    let mut contact_event = None;
    if let Some(hit) = probe {
        if matches!(hit.collider.kind, crate::body::BodyKindTag::Trigger) {
            trigger_event = tracker.observe_character_trigger(character_extended, hit.collider, frame);
        } else {
            let other_flags = flags_of(hit.collider);
            if other_flags.contains(crate::body::BodyFlags::DISPATCH_CONTACT_EVENTS) {
                contact_event = tracker.observe_character_contact(
                    character_extended,
                    hit.collider,
                    frame,
                    hit.normal,
                    hit.point,
                );
            }
        }
    }

    (trigger_event, contact_event)
}

/// Drives every live [`CharacterController`] through one [`extended_update`]
/// and writes the corrected transform back to its owner.
pub struct CharacterControllerDriver;

impl CharacterControllerDriver {
    #[allow(clippy::too_many_arguments)]
    pub fn update_all(
        registry: &mut crate::body::BodyRegistry,
        tracker: &mut crate::contacts::ContactTracker,
        frame: u64,
        flags_of: &dyn Fn(crate::handle::ExtendedHandle) -> crate::body::BodyFlags,
        query: &rapier3d::pipeline::QueryPipeline,
        filter_table: &CollisionFilterTable,
        gravity: Vector3<f32>,
        dt: f32,
        characters: &mut dyn crate::external::ComponentManager<CharacterController>,
        objects: &mut dyn crate::external::GameObjectRegistry,
    ) -> (Vec<crate::contacts::TriggerEvent>, Vec<crate::contacts::ContactEvent>) {
        let mut triggers = Vec::new();
        let mut contacts = Vec::new();
        for (handle, character) in characters.iter_mut() {
            if !character.is_live() {
                continue;
            }
            let (trigger_event, contact_event) = extended_update(
                character,
                handle,
                registry,
                tracker,
                frame,
                flags_of,
                query,
                filter_table,
                gravity,
                dt,
            );
            triggers.extend(trigger_event);
            contacts.extend(contact_event);
            let Some(native) = character.native() else {
                continue;
            };
            let Some(body) = registry.rigid_bodies.get(native) else {
                continue;
            };
            let position = *body.position();
            if let Some(owner) = objects.get_mut(character.game_object) {
                owner.set_world_position(position.translation.vector);
                owner.set_world_rotation(position.rotation);
            }
        }
        (triggers, contacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_controller_starts_not_supported() {
        let character = CharacterController::default();
        assert_eq!(character.ground_state, GroundState::NotSupported);
        assert!(!character.is_live());
    }

    #[test]
    fn begin_play_creates_a_kinematic_body() {
        let mut registry = crate::body::BodyRegistry::new();
        let mut character = CharacterController::default();
        character.begin_play(&mut registry, Vector3::zeros(), UnitQuaternion::identity());
        assert!(character.is_live());
        assert!(registry
            .rigid_bodies
            .get(character.native().unwrap())
            .is_some());
    }

    #[test]
    fn end_play_removes_the_body() {
        let mut registry = crate::body::BodyRegistry::new();
        let mut character = CharacterController::default();
        character.begin_play(&mut registry, Vector3::zeros(), UnitQuaternion::identity());
        character.end_play(&mut registry);
        assert!(!character.is_live());
    }
}
