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

//! Body Registry: the four typed body-kind components
//! (`StaticBody`, `DynamicBody`, `Trigger`, `HeightFieldBody`) and the
//! shared [`BodyRegistry`] that owns the solver's body/collider sets, the
//! user-data arena, and the ancillary sets every kind registers itself
//! into.
//!
//! Each component stores its native handles in a `Cell`, exactly the way
//! `fyrox-impl`'s scene nodes cache their rapier handle (`native: Cell<_>`)
//! rather than keep a second handle table keyed by component handle.

use crate::filter::{encode_object_layer, BroadphaseClass, ObjectLayer};
use crate::handle::{BodyHandle, ExtendedHandle, GameObjectHandle};
use crate::material::PhysicsMaterial;
use crate::queue::{DeferredBodyQueue, DynamicBodyMessage, DynamicMessageQueue};
use crate::shape::{build_composed_shape, ComposedShape, PlacedCollider};
use bitflags::bitflags;
use fyrox_core::algebra::{UnitQuaternion, Vector3};
use fyrox_core::log::{Log, MessageKind};
use fyrox_core::pool::{Handle, Pool};
use fyrox_core::reflect::prelude::*;
use fyrox_core::visitor::prelude::*;
use rapier3d::dynamics::{
    RigidBody, RigidBodyBuilder, RigidBodyHandle, RigidBodySet, RigidBodyType,
};
use rapier3d::geometry::{Collider, ColliderBuilder, ColliderHandle, ColliderSet, InteractionGroups};
use std::cell::Cell;

bitflags! {
    /// Per-body behavior flags.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct BodyFlags: u32 {
        const ALLOW_SLEEP = 1 << 0;
        const USE_CCD = 1 << 1;
        const DISPATCH_CONTACT_EVENTS = 1 << 2;
        const CAN_PUSH_CHARACTER = 1 << 3;
        const IS_DYNAMIC_SCALING = 1 << 4;
    }
}

/// Discriminates the four body kinds so a solver-side listener callback can
/// recover the right dispatch path from a [`crate::handle::ExtendedHandle`]
/// without a dynamic cast.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Visit, Reflect, Default)]
#[repr(u8)]
pub enum BodyKindTag {
    #[default]
    Static,
    Dynamic,
    Trigger,
    HeightField,
    /// A kinematic character controller. Characters are not pooled
    /// in [`BodyRegistry`]'s user-data arena the way the other four kinds
    /// are (their collider never requests `ActiveEvents::COLLISION_EVENTS`,
    /// so they never reach the regular body-body listener); this tag only
    /// identifies a character as the "self" side of the events the
    /// character-body listener raises directly.
    Character,
}

/// Pool-allocated record recovered from a live body's `user_data` field so a
/// listener callback (running on a solver worker thread) can identify the
/// owning component without touching a pointer.
pub type UserDataArena = Pool<ExtendedHandle>;

/// Owns the solver's body/collider containers, the user-data arena, and
/// every ancillary set a live body needs. One instance per simulated world.
pub struct BodyRegistry {
    pub rigid_bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub islands: rapier3d::dynamics::IslandManager,
    pub impulse_joints: rapier3d::dynamics::ImpulseJointSet,
    pub multibody_joints: rapier3d::dynamics::MultibodyJointSet,
    user_data: UserDataArena,
    pub deferred: DeferredBodyQueue,
    pub messages: DynamicMessageQueue,
    pub active_dynamic: crate::handle::SortedHandleSet,
    pub just_deactivated: crate::handle::SortedHandleSet,
    pub kinematic_bodies: crate::handle::SortedHandleSet,
    pub dynamically_scaled: crate::handle::SortedHandleSet,
    pub movable_triggers: crate::handle::SortedHandleSet,
}

impl Default for BodyRegistry {
    fn default() -> Self {
        Self {
            rigid_bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            islands: rapier3d::dynamics::IslandManager::new(),
            impulse_joints: rapier3d::dynamics::ImpulseJointSet::new(),
            multibody_joints: rapier3d::dynamics::MultibodyJointSet::new(),
            user_data: UserDataArena::new(),
            deferred: DeferredBodyQueue::new(),
            messages: DynamicMessageQueue::new(),
            active_dynamic: crate::handle::SortedHandleSet::new(),
            just_deactivated: crate::handle::SortedHandleSet::new(),
            kinematic_bodies: crate::handle::SortedHandleSet::new(),
            dynamically_scaled: crate::handle::SortedHandleSet::new(),
            movable_triggers: crate::handle::SortedHandleSet::new(),
        }
    }
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a user-data record and returns the arena slot handle,
    /// packed into a body's `user_data` field by the caller.
    fn allocate_user_data(&mut self, extended: ExtendedHandle) -> Handle<ExtendedHandle> {
        self.user_data.spawn(extended)
    }

    /// Frees a user-data slot. This always happens before the owning body
    /// is removed from the solver.
    fn free_user_data(&mut self, handle: Handle<ExtendedHandle>) {
        self.user_data.try_free(handle);
    }

    /// Recovers the `(component handle, kind)` pair for a live body from its
    /// packed `user_data` field, as read by a listener callback.
    pub fn resolve_user_data(&self, packed: u128) -> Option<ExtendedHandle> {
        let arena_handle: Handle<ExtendedHandle> = Handle::decode_from_u128(packed);
        self.user_data.try_borrow(arena_handle).copied()
    }
}

fn u32_to_group(v: u32) -> rapier3d::geometry::Group {
    rapier3d::geometry::Group::from_bits(v).unwrap_or_else(rapier3d::geometry::Group::all)
}

fn build_collider(
    shape: rapier3d::geometry::SharedShape,
    layer: ObjectLayer,
    class: BroadphaseClass,
    material: PhysicsMaterial,
    sensor: bool,
) -> Collider {
    let membership = encode_object_layer(layer, class);
    ColliderBuilder::new(shape)
        .collision_groups(InteractionGroups::new(
            u32_to_group(membership),
            u32_to_group(u32::MAX),
        ))
        .friction(material.friction)
        .friction_combine_rule(material.friction_combine_rule.into())
        .restitution(material.restitution)
        .restitution_combine_rule(material.restitution_combine_rule.into())
        .sensor(sensor)
        .active_events(rapier3d::pipeline::ActiveEvents::COLLISION_EVENTS)
        .build()
}

/// Common begin-play machinery shared by every body kind: allocates a
/// user-data record, builds the rigid body + collider, and creates them on
/// the solver's body interface without adding them (the deferred queue does
/// that on the next tick's drain).
struct BeginPlayResult {
    rigid_body: RigidBodyHandle,
    collider: ColliderHandle,
    user_data: Handle<ExtendedHandle>,
}

#[allow(clippy::too_many_arguments)]
fn begin_play(
    registry: &mut BodyRegistry,
    handle: BodyHandle,
    kind: BodyKindTag,
    shape: &ComposedShape,
    scale: Vector3<f32>,
    position: Vector3<f32>,
    rotation: UnitQuaternion<f32>,
    motion: RigidBodyType,
    layer: ObjectLayer,
    class: BroadphaseClass,
    material: PhysicsMaterial,
    sensor: bool,
    flags: BodyFlags,
    mass_override: Option<f32>,
    gravity_factor: f32,
) -> BeginPlayResult {
    let extended = ExtendedHandle::new(handle, kind);
    let user_data = registry.allocate_user_data(extended);

    let native_shape = crate::shape::apply_scale(shape, scale);

    let mut builder = RigidBodyBuilder::new(motion)
        .position(fyrox_core::algebra::Isometry3::from_parts(
            position.into(),
            rotation,
        ))
        .can_sleep(flags.contains(BodyFlags::ALLOW_SLEEP))
        .ccd_enabled(flags.contains(BodyFlags::USE_CCD))
        .gravity_scale(gravity_factor);

    if let RigidBodyType::Dynamic = motion {
        builder = match mass_override {
            Some(mass) if mass > 0.0 => builder.additional_mass(mass),
            _ => builder,
        };
    }

    let mut rigid_body: RigidBody = builder.build();
    rigid_body.user_data = user_data.encode_to_u128();
    let rigid_body_handle = registry.rigid_bodies.insert(rigid_body);

    let mut collider = build_collider(native_shape, layer, class, material, sensor);
    collider.user_data = user_data.encode_to_u128();
    let collider_handle =
        registry
            .colliders
            .insert_with_parent(collider, rigid_body_handle, &mut registry.rigid_bodies);

    BeginPlayResult {
        rigid_body: rigid_body_handle,
        collider: collider_handle,
        user_data,
    }
}

/// Removes a body and its collider from the solver and frees its user-data
/// slot, in that order.
fn end_play(
    registry: &mut BodyRegistry,
    rigid_body: RigidBodyHandle,
    user_data: Handle<ExtendedHandle>,
) {
    registry.free_user_data(user_data);
    let BodyRegistry {
        rigid_bodies,
        colliders,
        islands,
        impulse_joints,
        multibody_joints,
        ..
    } = registry;
    rigid_bodies.remove(rigid_body, islands, colliders, impulse_joints, multibody_joints, true);
}

/// A non-moving body; may use a convex or concave shape.
pub struct StaticBody {
    pub colliders: Vec<PlacedCollider>,
    pub layer: ObjectLayer,
    pub material: PhysicsMaterial,
    pub flags: BodyFlags,
    pub game_object: GameObjectHandle,
    shape: Option<ComposedShape>,
    rigid_body: Cell<RigidBodyHandle>,
    collider: Cell<ColliderHandle>,
    user_data: Cell<Handle<ExtendedHandle>>,
}

impl Default for StaticBody {
    fn default() -> Self {
        Self {
            colliders: Vec::new(),
            layer: ObjectLayer::default(),
            material: PhysicsMaterial::default(),
            flags: BodyFlags::ALLOW_SLEEP,
            game_object: GameObjectHandle::default(),
            shape: None,
            rigid_body: Cell::new(RigidBodyHandle::invalid()),
            collider: Cell::new(ColliderHandle::invalid()),
            user_data: Cell::new(Handle::default()),
        }
    }
}

impl StaticBody {
    pub fn begin_play(
        &mut self,
        handle: BodyHandle,
        registry: &mut BodyRegistry,
        position: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
        scale: Vector3<f32>,
    ) {
        let Some(shape) = build_composed_shape(&self.colliders, true) else {
            return;
        };
        let result = begin_play(
            registry,
            handle,
            BodyKindTag::Static,
            &shape,
            scale,
            position,
            rotation,
            RigidBodyType::Fixed,
            self.layer,
            BroadphaseClass::Static,
            self.material,
            false,
            self.flags,
            None,
            1.0,
        );
        self.shape = Some(shape);
        self.rigid_body.set(result.rigid_body);
        self.collider.set(result.collider);
        self.user_data.set(result.user_data);
        // Static bodies join the solver in the sleeping list.
        registry.deferred.push_sleeping(handle);
    }

    pub fn end_play(&mut self, registry: &mut BodyRegistry) {
        if self.rigid_body.get() == RigidBodyHandle::invalid() {
            return;
        }
        end_play(registry, self.rigid_body.get(), self.user_data.get());
        self.rigid_body.set(RigidBodyHandle::invalid());
    }

    pub fn is_live(&self) -> bool {
        self.rigid_body.get() != RigidBodyHandle::invalid()
    }

    pub fn native(&self) -> RigidBodyHandle {
        self.rigid_body.get()
    }

    pub fn flags(&self) -> BodyFlags {
        self.flags
    }
}

/// A moving body: motion mode is `Dynamic` or `Kinematic`; convex shapes
/// only.
pub struct DynamicBody {
    pub colliders: Vec<PlacedCollider>,
    pub layer: ObjectLayer,
    pub material: PhysicsMaterial,
    pub flags: BodyFlags,
    pub mass_override: Option<f32>,
    pub gravity_factor: f32,
    pub game_object: GameObjectHandle,
    kinematic: bool,
    shape: Option<ComposedShape>,
    rigid_body: Cell<RigidBodyHandle>,
    collider: Cell<ColliderHandle>,
    user_data: Cell<Handle<ExtendedHandle>>,
    last_scale: Cell<Vector3<f32>>,
}

impl Default for DynamicBody {
    fn default() -> Self {
        Self {
            colliders: Vec::new(),
            layer: ObjectLayer::default(),
            material: PhysicsMaterial::default(),
            flags: BodyFlags::empty(),
            mass_override: None,
            gravity_factor: 1.0,
            game_object: GameObjectHandle::default(),
            kinematic: false,
            shape: None,
            rigid_body: Cell::new(RigidBodyHandle::invalid()),
            collider: Cell::new(ColliderHandle::invalid()),
            user_data: Cell::new(Handle::default()),
            last_scale: Cell::new(Vector3::new(1.0, 1.0, 1.0)),
        }
    }
}

impl DynamicBody {
    pub fn begin_play(
        &mut self,
        handle: BodyHandle,
        registry: &mut BodyRegistry,
        position: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
        scale: Vector3<f32>,
    ) {
        let Some(shape) = build_composed_shape(&self.colliders, false) else {
            return;
        };
        let motion = if self.kinematic {
            RigidBodyType::KinematicPositionBased
        } else {
            RigidBodyType::Dynamic
        };
        let result = begin_play(
            registry,
            handle,
            BodyKindTag::Dynamic,
            &shape,
            scale,
            position,
            rotation,
            motion,
            self.layer,
            BroadphaseClass::Dynamic,
            self.material,
            false,
            self.flags,
            self.mass_override,
            self.gravity_factor,
        );
        self.shape = Some(shape);
        self.rigid_body.set(result.rigid_body);
        self.collider.set(result.collider);
        self.user_data.set(result.user_data);
        self.last_scale.set(scale);
        registry.active_dynamic.insert(handle);
        if self.kinematic {
            registry.kinematic_bodies.insert(handle);
        }
        if self.flags.contains(BodyFlags::IS_DYNAMIC_SCALING) {
            registry.dynamically_scaled.insert(handle);
        }
        registry.deferred.push_active(handle);
    }

    pub fn end_play(&mut self, handle: BodyHandle, registry: &mut BodyRegistry) {
        if self.rigid_body.get() == RigidBodyHandle::invalid() {
            return;
        }
        registry.active_dynamic.remove(handle);
        registry.just_deactivated.remove(handle);
        registry.kinematic_bodies.remove(handle);
        registry.dynamically_scaled.remove(handle);
        end_play(registry, self.rigid_body.get(), self.user_data.get());
        self.rigid_body.set(RigidBodyHandle::invalid());
    }

    pub fn is_live(&self) -> bool {
        self.rigid_body.get() != RigidBodyHandle::invalid()
    }

    pub fn native(&self) -> RigidBodyHandle {
        self.rigid_body.get()
    }

    pub fn flags(&self) -> BodyFlags {
        self.flags
    }

    pub fn is_kinematic(&self) -> bool {
        self.kinematic
    }

    /// Switches motion mode and Kinematic-set membership, and toggles the
    /// owner's transform lock so the solver drives dynamic bodies while
    /// gameplay drives kinematic ones.
    pub fn set_kinematic(
        &mut self,
        handle: BodyHandle,
        registry: &mut BodyRegistry,
        kinematic: bool,
        owner: &mut dyn crate::external::GameObject,
    ) {
        if self.kinematic == kinematic {
            return;
        }
        self.kinematic = kinematic;
        if let Some(body) = registry.rigid_bodies.get_mut(self.rigid_body.get()) {
            body.set_body_type(
                if kinematic {
                    RigidBodyType::KinematicPositionBased
                } else {
                    RigidBodyType::Dynamic
                },
                true,
            );
        }
        if kinematic {
            registry.kinematic_bodies.insert(handle);
        } else {
            registry.kinematic_bodies.remove(handle);
        }
        owner.set_transform_locked(kinematic);
    }

    pub fn set_dynamic_scaling(&mut self, handle: BodyHandle, registry: &mut BodyRegistry, enabled: bool) {
        self.flags.set(BodyFlags::IS_DYNAMIC_SCALING, enabled);
        if enabled {
            registry.dynamically_scaled.insert(handle);
        } else {
            registry.dynamically_scaled.remove(handle);
        }
    }

    pub fn set_gravity_factor(&mut self, registry: &mut BodyRegistry, factor: f32) {
        self.gravity_factor = factor;
        if let Some(body) = registry.rigid_bodies.get_mut(self.rigid_body.get()) {
            body.set_gravity_scale(factor, true);
        }
    }

    pub fn shape(&self) -> Option<&ComposedShape> {
        self.shape.as_ref()
    }

    /// The world scale this body's collider was last rebuilt against, for
    /// the dynamic-scaling pass to detect a no-op tick and skip the rebuild.
    pub fn cached_scale(&self) -> Vector3<f32> {
        self.last_scale.get()
    }

    pub fn set_cached_scale(&self, scale: Vector3<f32>) {
        self.last_scale.set(scale);
    }

    fn push(&self, registry: &mut BodyRegistry, handle: BodyHandle, message: impl FnOnce(BodyHandle) -> DynamicBodyMessage) {
        if !self.is_live() {
            Log::writeln(
                MessageKind::Warning,
                "physics: force/impulse queued against an invalid body handle, discarding".to_string(),
            );
            return;
        }
        registry.messages.push(message(handle));
    }

    pub fn add_force(&self, registry: &mut BodyRegistry, handle: BodyHandle, force: Vector3<f32>) {
        self.push(registry, handle, |body| DynamicBodyMessage::AddForce { body, force });
    }

    pub fn add_force_at_position(
        &self,
        registry: &mut BodyRegistry,
        handle: BodyHandle,
        force: Vector3<f32>,
        position: Vector3<f32>,
    ) {
        self.push(registry, handle, |body| DynamicBodyMessage::AddForceAtPosition {
            body,
            force,
            position,
        });
    }

    pub fn add_torque(&self, registry: &mut BodyRegistry, handle: BodyHandle, torque: Vector3<f32>) {
        self.push(registry, handle, |body| DynamicBodyMessage::AddTorque { body, torque });
    }

    pub fn add_force_and_torque(
        &self,
        registry: &mut BodyRegistry,
        handle: BodyHandle,
        force: Vector3<f32>,
        torque: Vector3<f32>,
    ) {
        self.push(registry, handle, |body| DynamicBodyMessage::AddForceAndTorque {
            body,
            force,
            torque,
        });
    }

    pub fn add_impulse(&self, registry: &mut BodyRegistry, handle: BodyHandle, impulse: Vector3<f32>) {
        self.push(registry, handle, |body| DynamicBodyMessage::AddImpulse { body, impulse });
    }

    pub fn add_impulse_at_position(
        &self,
        registry: &mut BodyRegistry,
        handle: BodyHandle,
        impulse: Vector3<f32>,
        position: Vector3<f32>,
    ) {
        self.push(registry, handle, |body| DynamicBodyMessage::AddImpulseAtPosition {
            body,
            impulse,
            position,
        });
    }

    pub fn add_angular_impulse(&self, registry: &mut BodyRegistry, handle: BodyHandle, impulse: Vector3<f32>) {
        self.push(registry, handle, |body| DynamicBodyMessage::AddAngularImpulse { body, impulse });
    }
}

/// A sensor body: reports overlaps, never participates in collision
/// response.
pub struct Trigger {
    pub colliders: Vec<PlacedCollider>,
    pub layer: ObjectLayer,
    pub game_object: GameObjectHandle,
    shape: Option<ComposedShape>,
    rigid_body: Cell<RigidBodyHandle>,
    collider: Cell<ColliderHandle>,
    user_data: Cell<Handle<ExtendedHandle>>,
}

impl Default for Trigger {
    fn default() -> Self {
        Self {
            colliders: Vec::new(),
            layer: ObjectLayer::default(),
            game_object: GameObjectHandle::default(),
            shape: None,
            rigid_body: Cell::new(RigidBodyHandle::invalid()),
            collider: Cell::new(ColliderHandle::invalid()),
            user_data: Cell::new(Handle::default()),
        }
    }
}

impl Trigger {
    pub fn begin_play(
        &mut self,
        handle: BodyHandle,
        registry: &mut BodyRegistry,
        position: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
        scale: Vector3<f32>,
        owner_is_dynamic: bool,
    ) {
        let Some(shape) = build_composed_shape(&self.colliders, true) else {
            return;
        };
        let result = begin_play(
            registry,
            handle,
            BodyKindTag::Trigger,
            &shape,
            scale,
            position,
            rotation,
            // Kinematic, so contacts stay alive across sleep.
            RigidBodyType::KinematicPositionBased,
            self.layer,
            BroadphaseClass::Trigger,
            PhysicsMaterial::default(),
            true,
            BodyFlags::empty(),
            None,
            0.0,
        );
        self.shape = Some(shape);
        self.rigid_body.set(result.rigid_body);
        self.collider.set(result.collider);
        self.user_data.set(result.user_data);
        if owner_is_dynamic {
            registry.movable_triggers.insert(handle);
        }
        registry.deferred.push_active(handle);
    }

    pub fn end_play(&mut self, handle: BodyHandle, registry: &mut BodyRegistry) {
        if self.rigid_body.get() == RigidBodyHandle::invalid() {
            return;
        }
        registry.movable_triggers.remove(handle);
        end_play(registry, self.rigid_body.get(), self.user_data.get());
        self.rigid_body.set(RigidBodyHandle::invalid());
    }

    pub fn is_live(&self) -> bool {
        self.rigid_body.get() != RigidBodyHandle::invalid()
    }

    pub fn native(&self) -> RigidBodyHandle {
        self.rigid_body.get()
    }

    pub fn flags(&self) -> BodyFlags {
        BodyFlags::empty()
    }
}

/// A static body with a pre-built height field shape.
pub struct HeightFieldBody {
    pub shape: Option<rapier3d::geometry::SharedShape>,
    pub layer: ObjectLayer,
    pub material: PhysicsMaterial,
    pub flags: BodyFlags,
    pub game_object: GameObjectHandle,
    /// Bounded axis-aligned crop box, in local space, used by the Debug
    /// Geometry Gatherer so a terrain's wireframe does not span an
    /// unbounded plane.
    pub debug_crop_box: Option<(Vector3<f32>, Vector3<f32>)>,
    composed: Option<ComposedShape>,
    rigid_body: Cell<RigidBodyHandle>,
    collider: Cell<ColliderHandle>,
    user_data: Cell<Handle<ExtendedHandle>>,
}

impl Default for HeightFieldBody {
    fn default() -> Self {
        Self {
            shape: None,
            layer: ObjectLayer::default(),
            material: PhysicsMaterial::default(),
            flags: BodyFlags::ALLOW_SLEEP,
            game_object: GameObjectHandle::default(),
            debug_crop_box: None,
            composed: None,
            rigid_body: Cell::new(RigidBodyHandle::invalid()),
            collider: Cell::new(ColliderHandle::invalid()),
            user_data: Cell::new(Handle::default()),
        }
    }
}

impl HeightFieldBody {
    pub fn begin_play(
        &mut self,
        handle: BodyHandle,
        registry: &mut BodyRegistry,
        position: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
    ) {
        let Some(native_shape) = self.shape.clone() else {
            Log::writeln(
                MessageKind::Warning,
                "physics: height field body has no pre-built shape, skipping".to_string(),
            );
            return;
        };
        let shape = crate::shape::composed_shape_from_native(
            native_shape,
            crate::shape::ScalingMode::Uniform,
        );
        let result = begin_play(
            registry,
            handle,
            BodyKindTag::HeightField,
            &shape,
            Vector3::new(1.0, 1.0, 1.0),
            position,
            rotation,
            RigidBodyType::Fixed,
            self.layer,
            BroadphaseClass::Static,
            self.material,
            false,
            self.flags,
            None,
            1.0,
        );
        self.composed = Some(shape);
        self.rigid_body.set(result.rigid_body);
        self.collider.set(result.collider);
        self.user_data.set(result.user_data);
        registry.deferred.push_sleeping(handle);
    }

    pub fn end_play(&mut self, registry: &mut BodyRegistry) {
        if self.rigid_body.get() == RigidBodyHandle::invalid() {
            return;
        }
        end_play(registry, self.rigid_body.get(), self.user_data.get());
        self.rigid_body.set(RigidBodyHandle::invalid());
    }

    pub fn is_live(&self) -> bool {
        self.rigid_body.get() != RigidBodyHandle::invalid()
    }

    pub fn native(&self) -> RigidBodyHandle {
        self.rigid_body.get()
    }

    pub fn flags(&self) -> BodyFlags {
        self.flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ColliderDesc;

    fn placed_sphere() -> PlacedCollider {
        PlacedCollider {
            desc: ColliderDesc::Sphere { radius: 0.5 },
            local_position: Vector3::zeros(),
            local_rotation: UnitQuaternion::identity(),
        }
    }

    #[test]
    fn static_body_goes_live_on_begin_play() {
        let mut registry = BodyRegistry::new();
        let mut body = StaticBody {
            colliders: vec![placed_sphere()],
            ..Default::default()
        };
        let handle: BodyHandle = Handle::new(1, 1);
        body.begin_play(
            handle,
            &mut registry,
            Vector3::zeros(),
            UnitQuaternion::identity(),
            Vector3::new(1.0, 1.0, 1.0),
        );
        assert!(body.is_live());
        let (_, sleep) = registry.deferred.drain();
        assert_eq!(sleep, vec![handle]);
    }

    #[test]
    fn empty_collider_set_leaves_body_not_live() {
        let mut registry = BodyRegistry::new();
        let mut body = StaticBody::default();
        body.begin_play(
            Handle::new(1, 1),
            &mut registry,
            Vector3::zeros(),
            UnitQuaternion::identity(),
            Vector3::new(1.0, 1.0, 1.0),
        );
        assert!(!body.is_live());
    }

    #[test]
    fn dynamic_body_joins_active_set_on_begin_play() {
        let mut registry = BodyRegistry::new();
        let mut body = DynamicBody {
            colliders: vec![placed_sphere()],
            flags: BodyFlags::ALLOW_SLEEP,
            gravity_factor: 1.0,
            ..Default::default()
        };
        let handle: BodyHandle = Handle::new(5, 1);
        body.begin_play(
            handle,
            &mut registry,
            Vector3::zeros(),
            UnitQuaternion::identity(),
            Vector3::new(1.0, 1.0, 1.0),
        );
        assert!(registry.active_dynamic.contains(handle));
        let (activate, _) = registry.deferred.drain();
        assert_eq!(activate, vec![handle]);
    }

    #[test]
    fn invalid_handle_discards_queued_impulse() {
        let mut registry = BodyRegistry::new();
        let body = DynamicBody::default();
        let handle: BodyHandle = Handle::new(9, 1);
        body.add_impulse(&mut registry, handle, Vector3::new(1.0, 0.0, 0.0));
        assert!(registry.messages.drain().is_empty());
    }

    #[test]
    fn end_play_removes_from_ancillary_sets() {
        let mut registry = BodyRegistry::new();
        let mut body = DynamicBody {
            colliders: vec![placed_sphere()],
            ..Default::default()
        };
        let handle: BodyHandle = Handle::new(3, 1);
        body.begin_play(
            handle,
            &mut registry,
            Vector3::zeros(),
            UnitQuaternion::identity(),
            Vector3::new(1.0, 1.0, 1.0),
        );
        body.end_play(handle, &mut registry);
        assert!(!registry.active_dynamic.contains(handle));
        assert!(!body.is_live());
    }
}
