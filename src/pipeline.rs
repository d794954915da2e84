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

//! Tick Pipeline: the one entry point that advances the whole world
//! by one fixed step, in the same PhysicsUpdate/PostTransform grouping
//! `fyrox-impl`'s own `PhysicsWorld::update` uses around its
//! `PhysicsPipeline::step` call.

use crate::body::{BodyFlags, BodyKindTag, BodyRegistry, DynamicBody, HeightFieldBody, StaticBody, Trigger};
use crate::character::{CharacterController, CharacterControllerDriver};
use crate::config::PhysicsWorldConfig;
use crate::contacts::{ContactEvent, ContactTracker, EventKind, TriggerEvent};
use crate::external::{ComponentManager, DebugRenderer, GameObjectRegistry, TickScheduler};
use crate::filter::{decode_object_layer, CollisionFilterTable};
use crate::handle::{BodyHandle, ExtendedHandle, GameObjectHandle};
use crate::query::{QueryFilter, RayHit, ShapeCastHit};
use crate::water::WaterVolume;
use fyrox_core::algebra::{Isometry3, Point3, Vector3};
use rapier3d::dynamics::{CCDSolver, RigidBodyHandle};
use rapier3d::geometry::{ColliderHandle, ColliderSet, DefaultBroadPhase, NarrowPhase, Shape};
use rapier3d::pipeline::{PairFilterContext, PhysicsHooks, PhysicsPipeline, QueryPipeline, SolverFlags};

/// Consults the world's [`CollisionFilterTable`] on every candidate contact
/// and sensor-intersection pair the narrow phase proposes, the same point
/// in the pipeline an object-layer pair filter gates pairs at.
struct CollisionFilterHooks<'a> {
    table: &'a CollisionFilterTable,
}

impl<'a> CollisionFilterHooks<'a> {
    fn layers_compatible(&self, colliders: &ColliderSet, a: ColliderHandle, b: ColliderHandle) -> bool {
        let (Some(ca), Some(cb)) = (colliders.get(a), colliders.get(b)) else {
            return true;
        };
        let (layer_a, _) = decode_object_layer(ca.collision_groups().memberships.bits());
        let (layer_b, _) = decode_object_layer(cb.collision_groups().memberships.bits());
        self.table.can_collide(layer_a, layer_b)
    }
}

impl<'a> PhysicsHooks for CollisionFilterHooks<'a> {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        self.layers_compatible(context.colliders, context.collider1, context.collider2)
            .then_some(SolverFlags::COMPUTE_IMPULSES)
    }

    fn filter_intersection_pair(&self, context: &PairFilterContext) -> bool {
        self.layers_compatible(context.colliders, context.collider1, context.collider2)
    }
}

/// Owns the solver's stepping machinery and the [`BodyRegistry`] it steps,
/// and drives one fixed tick end-to-end. Everything it reaches
/// outside of `rapier3d` itself — component storage, scene-graph transforms,
/// the tick scheduler — comes in through the traits in [`crate::external`],
/// passed in fresh on every [`PhysicsWorld::tick`] call rather than held.
pub struct PhysicsWorld {
    pub registry: BodyRegistry,
    pub gravity: Vector3<f32>,
    pub integration_parameters: crate::config::IntegrationParameters,
    pub filter_table: CollisionFilterTable,
    pipeline: PhysicsPipeline,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    ccd_solver: CCDSolver,
    query: QueryPipeline,
    tracker: ContactTracker,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsWorldConfig) -> Self {
        let mut world = Self {
            registry: BodyRegistry::new(),
            gravity: config.gravity,
            integration_parameters: config.integration_parameters,
            filter_table: config.filter_table,
            pipeline: PhysicsPipeline::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            ccd_solver: CCDSolver::new(),
            query: QueryPipeline::new(),
            tracker: ContactTracker::new(),
        };
        // An empty query pipeline still answers "nothing hit" correctly, but
        // seed it anyway so the first tick's character/water passes see a
        // consistent (if trivially empty) broadphase rather than a
        // never-updated one.
        world.query.update(&world.registry.rigid_bodies, &world.registry.colliders);
        world
    }

    fn resolve_native(
        handle: BodyHandle,
        statics: &dyn ComponentManager<StaticBody>,
        dynamics: &dyn ComponentManager<DynamicBody>,
        triggers: &dyn ComponentManager<Trigger>,
        heightfields: &dyn ComponentManager<HeightFieldBody>,
    ) -> Option<RigidBodyHandle> {
        if let Some(b) = statics.resolve(handle) {
            return Some(b.native());
        }
        if let Some(b) = dynamics.resolve(handle) {
            return Some(b.native());
        }
        if let Some(b) = triggers.resolve(handle) {
            return Some(b.native());
        }
        if let Some(b) = heightfields.resolve(handle) {
            return Some(b.native());
        }
        None
    }

    /// Runs one fixed tick: the PhysicsUpdate group (steps 1-10),
    /// then the PostTransform group (steps 11-13). A paused scheduler still
    /// runs step 1 (bodies begun this frame still need their initial
    /// activation state applied) but skips everything after it.
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        scheduler: &dyn TickScheduler,
        statics: &dyn ComponentManager<StaticBody>,
        dynamics: &dyn ComponentManager<DynamicBody>,
        triggers: &dyn ComponentManager<Trigger>,
        heightfields: &dyn ComponentManager<HeightFieldBody>,
        characters: &mut dyn ComponentManager<CharacterController>,
        water: &dyn ComponentManager<WaterVolume>,
        objects: &mut dyn GameObjectRegistry,
    ) {
        let dt = scheduler.fixed_time_step();
        let frame = scheduler.fixed_frame_num();

        // Step 1: the Deferred Add Queue. `rapier3d` inserts a body
        // into its sets immediately at `begin_play` rather than lazily like
        // the two-phase `AddBodiesPrepare`/`AddBodiesFinalize` protocol this
        // queue was named after, so there is nothing left to "finalize" here
        // — draining the queue instead just applies each body's intended
        // initial activation state.
        let (activate, sleep) = self.registry.deferred.drain();
        for handle in activate {
            if let Some(native) = Self::resolve_native(handle, statics, dynamics, triggers, heightfields) {
                if let Some(rb) = self.registry.rigid_bodies.get_mut(native) {
                    rb.wake_up(true);
                }
            }
        }
        for handle in sleep {
            if let Some(native) = Self::resolve_native(handle, statics, dynamics, triggers, heightfields) {
                if let Some(rb) = self.registry.rigid_bodies.get_mut(native) {
                    rb.sleep();
                }
            }
        }

        // Step 2: pause gate.
        if scheduler.is_paused() {
            return;
        }

        let flags_of = |eh: ExtendedHandle| -> BodyFlags {
            match eh.kind {
                BodyKindTag::Static => statics.resolve(eh.handle).map(|b| b.flags()).unwrap_or_default(),
                BodyKindTag::Dynamic => dynamics.resolve(eh.handle).map(|b| b.flags()).unwrap_or_default(),
                BodyKindTag::HeightField => heightfields
                    .resolve(eh.handle)
                    .map(|b| b.flags())
                    .unwrap_or_default(),
                BodyKindTag::Trigger | BodyKindTag::Character => BodyFlags::empty(),
            }
        };

        // Step 3: Character Controller Driver, then its
        // post-sweep for stale character-linked trigger/contact entries.
        let (mut trigger_events, mut contact_events) = CharacterControllerDriver::update_all(
            &mut self.registry,
            &mut self.tracker,
            frame,
            &flags_of,
            &self.query,
            &self.filter_table,
            self.gravity,
            dt,
            characters,
            objects,
        );
        let (swept_triggers, swept_contacts) = self.tracker.sweep_character_contacts(frame);
        trigger_events.extend(swept_triggers);
        contact_events.extend(swept_contacts);

        // Step 4: dynamic-scaling shape rebuild pass — any `DynamicBody`
        // flagged `IS_DYNAMIC_SCALING` whose owner's world scale changed
        // since the last tick gets its collider's shape rebuilt from the
        // new scale, then reactivated so a sleeping body re-evaluates
        // broadphase/narrow-phase state against the new shape.
        for handle in self.registry.dynamically_scaled.iter().collect::<Vec<_>>() {
            let Some(component) = dynamics.resolve(handle) else {
                continue;
            };
            let Some(shape) = component.shape() else {
                continue;
            };
            let Some(owner) = objects.get(component.game_object) else {
                continue;
            };
            let world_scale = owner.world_scale();
            if world_scale == component.cached_scale() {
                continue;
            }
            let native_shape = crate::shape::apply_scale(shape, world_scale);
            let native = component.native();
            let BodyRegistry {
                rigid_bodies,
                colliders,
                ..
            } = &mut self.registry;
            let Some(rigid_body) = rigid_bodies.get_mut(native) else {
                continue;
            };
            let Some(&collider_handle) = rigid_body.colliders().first() else {
                continue;
            };
            if let Some(collider) = colliders.get_mut(collider_handle) {
                collider.set_shape(native_shape);
                rigid_body.wake_up(true);
                component.set_cached_scale(world_scale);
            }
        }

        // Step 5: movable triggers (sensors on a dynamic/animated owner)
        // track their owner's transform every tick rather than only at
        // `begin_play`.
        for handle in self.registry.movable_triggers.iter().collect::<Vec<_>>() {
            let Some(component) = triggers.resolve(handle) else {
                continue;
            };
            let Some(owner) = objects.get(component.game_object) else {
                continue;
            };
            if let Some(rb) = self.registry.rigid_bodies.get_mut(component.native()) {
                rb.set_next_kinematic_position(Isometry3::from_parts(
                    owner.world_position().into(),
                    owner.world_rotation(),
                ));
            }
        }

        // Step 6: kinematic dynamic bodies are driven by gameplay, so their
        // next position comes straight from their owner's transform.
        for handle in self.registry.kinematic_bodies.iter().collect::<Vec<_>>() {
            let Some(component) = dynamics.resolve(handle) else {
                continue;
            };
            let Some(owner) = objects.get(component.game_object) else {
                continue;
            };
            if let Some(rb) = self.registry.rigid_bodies.get_mut(component.native()) {
                rb.set_next_kinematic_position(Isometry3::from_parts(
                    owner.world_position().into(),
                    owner.world_rotation(),
                ));
            }
        }

        // Step 7: apply every force/impulse queued since the last tick,
        // in FIFO order, in one pass before the solver step.
        for message in self.registry.messages.drain() {
            let Some(component) = dynamics.resolve(message.target()) else {
                continue;
            };
            let Some(rb) = self.registry.rigid_bodies.get_mut(component.native()) else {
                continue;
            };
            match message {
                crate::queue::DynamicBodyMessage::AddForce { force, .. } => rb.add_force(force, true),
                crate::queue::DynamicBodyMessage::AddForceAtPosition { force, position, .. } => {
                    rb.add_force_at_point(force, Point3::from(position), true)
                }
                crate::queue::DynamicBodyMessage::AddTorque { torque, .. } => rb.add_torque(torque, true),
                crate::queue::DynamicBodyMessage::AddForceAndTorque { force, torque, .. } => {
                    rb.add_force(force, true);
                    rb.add_torque(torque, true);
                }
                crate::queue::DynamicBodyMessage::AddImpulse { impulse, .. } => rb.apply_impulse(impulse, true),
                crate::queue::DynamicBodyMessage::AddImpulseAtPosition { impulse, position, .. } => {
                    rb.apply_impulse_at_point(impulse, Point3::from(position), true)
                }
                crate::queue::DynamicBodyMessage::AddAngularImpulse { impulse, .. } => {
                    rb.apply_torque_impulse(impulse, true)
                }
            }
        }

        // Step 8: Water-Volume buoyancy, applied before the solver
        // step consumes this tick's forces/impulses.
        crate::water::apply_all(&mut self.registry, &self.query, objects, water, dynamics, self.gravity, dt);

        // Step 9: the solver step itself. `Some(&mut self.query)` makes
        // `rapier3d` refresh the query pipeline as part of the step, so the
        // next tick's character/water passes see this tick's final
        // positions without a separate `query.update` call. The collision
        // filter table is consulted here, via `CollisionFilterHooks`, for
        // every candidate contact/intersection pair before the narrow phase
        // does any real work on it.
        let hooks = CollisionFilterHooks { table: &self.filter_table };
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters.to_native(dt),
            &mut self.registry.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.registry.rigid_bodies,
            &mut self.registry.colliders,
            &mut self.registry.impulse_joints,
            &mut self.registry.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query),
            &hooks,
            self.tracker.as_event_handler(),
        );

        // Step 10: dynamic body transform capture. Kinematic dynamic bodies
        // are driven by gameplay (step 6), not read back; a body the solver
        // put to sleep this tick is recorded in `just_deactivated` instead
        // of having its (unchanged) transform copied again.
        for handle in self.registry.active_dynamic.iter().collect::<Vec<_>>() {
            let Some(component) = dynamics.resolve(handle) else {
                continue;
            };
            if component.is_kinematic() {
                continue;
            }
            let Some(rb) = self.registry.rigid_bodies.get(component.native()) else {
                continue;
            };
            if rb.is_sleeping() {
                self.registry.just_deactivated.insert(handle);
                continue;
            }
            self.registry.just_deactivated.remove(handle);
            let position = *rb.position();
            if let Some(owner) = objects.get_mut(component.game_object) {
                if !owner.transform_locked() {
                    owner.set_world_position(position.translation.vector);
                    owner.set_world_rotation(position.rotation);
                }
            }
        }

        let owner_of = |eh: ExtendedHandle| -> Option<GameObjectHandle> {
            match eh.kind {
                BodyKindTag::Static => statics.resolve(eh.handle).map(|b| b.game_object),
                BodyKindTag::Dynamic => dynamics.resolve(eh.handle).map(|b| b.game_object),
                BodyKindTag::Trigger => triggers.resolve(eh.handle).map(|b| b.game_object),
                BodyKindTag::HeightField => heightfields.resolve(eh.handle).map(|b| b.game_object),
                BodyKindTag::Character => characters.resolve(eh.handle).map(|c| c.game_object),
            }
        };
        let dispatch = |eh: ExtendedHandle| flags_of(eh).contains(BodyFlags::DISPATCH_CONTACT_EVENTS);

        // Step 11: drain the regular body-body/trigger-body event stream
        // on top of whatever the Character Controller Driver already
        // stamped this tick, then dispatch every trigger event.
        let (collected_triggers, collected_contacts) = self.tracker.collect(
            &self.registry.colliders,
            &self.narrow_phase,
            &|packed| self.registry.resolve_user_data(packed),
            &dispatch,
        );
        trigger_events.extend(collected_triggers);
        contact_events.extend(collected_contacts);

        for event in &trigger_events {
            dispatch_trigger_event(event, &owner_of, objects);
            // Movable triggers also notify the overlapping body's owner,
            // not just the trigger's own owner.
            if self.registry.movable_triggers.contains(event.trigger.handle) {
                if let Some(owner) = owner_of(event.other) {
                    if let Some(obj) = objects.get_mut(owner) {
                        match event.kind {
                            EventKind::Began => obj.on_begin_overlap(event.trigger, event.other),
                            EventKind::Ended => obj.on_end_overlap(event.trigger, event.other),
                            EventKind::Updated => {}
                        }
                    }
                }
            }
        }

        // Step 12: dispatch contact events to every side that asked for
        // them.
        for event in &contact_events {
            if event.dispatch_first {
                dispatch_contact_event(event.first, event, &owner_of, objects);
            }
            if event.dispatch_second {
                dispatch_contact_event(event.second, event, &owner_of, objects);
            }
        }

        // Step 13: the raw collision buffer and this tick's derived event
        // lists were already drained above; nothing further to reset.
    }

    /// Closest hit along a ray.
    #[allow(clippy::too_many_arguments)]
    pub fn cast_ray_closest(
        &self,
        origin: Vector3<f32>,
        direction: Vector3<f32>,
        max_toi: f32,
        solid: bool,
        filter: QueryFilter,
    ) -> Option<RayHit> {
        crate::query::cast_ray_closest(
            &self.query,
            &self.registry.rigid_bodies,
            &self.registry.colliders,
            &|packed| self.registry.resolve_user_data(packed),
            origin,
            direction,
            max_toi,
            solid,
            filter,
        )
    }

    /// Every hit along a ray, closest first.
    #[allow(clippy::too_many_arguments)]
    pub fn cast_ray_all(
        &self,
        origin: Vector3<f32>,
        direction: Vector3<f32>,
        max_toi: f32,
        solid: bool,
        filter: QueryFilter,
    ) -> Vec<RayHit> {
        crate::query::cast_ray_all(
            &self.query,
            &self.registry.rigid_bodies,
            &self.registry.colliders,
            &|packed| self.registry.resolve_user_data(packed),
            origin,
            direction,
            max_toi,
            solid,
            filter,
        )
    }

    /// Closest collider a moving shape would hit.
    #[allow(clippy::too_many_arguments)]
    pub fn cast_shape_closest(
        &self,
        shape: &dyn Shape,
        shape_pos: Isometry3<f32>,
        shape_vel: Vector3<f32>,
        max_toi: f32,
        stop_at_penetration: bool,
        filter: QueryFilter,
    ) -> Option<ShapeCastHit> {
        crate::query::cast_shape_closest(
            &self.query,
            &self.registry.rigid_bodies,
            &self.registry.colliders,
            &|packed| self.registry.resolve_user_data(packed),
            shape,
            shape_pos,
            shape_vel,
            max_toi,
            stop_at_penetration,
            filter,
        )
    }

    /// Every collider a moving shape would hit, closest first.
    #[allow(clippy::too_many_arguments)]
    pub fn cast_shape_all(
        &self,
        shape: &dyn Shape,
        shape_pos: Isometry3<f32>,
        shape_vel: Vector3<f32>,
        max_toi: f32,
        stop_at_penetration: bool,
        filter: QueryFilter,
        max_hits: usize,
    ) -> Vec<ShapeCastHit> {
        crate::query::cast_shape_all(
            &self.query,
            &self.registry.rigid_bodies,
            &self.registry.colliders,
            &|packed| self.registry.resolve_user_data(packed),
            shape,
            shape_pos,
            shape_vel,
            max_toi,
            stop_at_penetration,
            filter,
            max_hits,
        )
    }

    /// Every live collider whose AABB intersects `aabb`.
    pub fn overlap_aabb(&self, aabb: &rapier3d::parry::bounding_volume::Aabb) -> Vec<ExtendedHandle> {
        crate::query::overlap_aabb(
            &self.query,
            &self.registry.colliders,
            &|packed| self.registry.resolve_user_data(packed),
            aabb,
        )
    }

    /// Every live collider overlapping a sphere.
    pub fn overlap_sphere(&self, center: Vector3<f32>, radius: f32, filter: QueryFilter) -> Vec<ExtendedHandle> {
        crate::query::overlap_sphere(
            &self.query,
            &self.registry.rigid_bodies,
            &self.registry.colliders,
            &|packed| self.registry.resolve_user_data(packed),
            center,
            radius,
            filter,
        )
    }

    /// Every live collider containing `point`.
    pub fn overlap_point(&self, point: Vector3<f32>, filter: QueryFilter) -> Vec<ExtendedHandle> {
        crate::query::overlap_point(
            &self.query,
            &self.registry.rigid_bodies,
            &self.registry.colliders,
            &|packed| self.registry.resolve_user_data(packed),
            point,
            filter,
        )
    }

    /// Debug Geometry Gatherer driver: walks every live body's shape
    /// plus the water volumes' AABBs and pushes wireframe geometry into
    /// `renderer`, gated by the `com_Draw*` flags in [`crate::cvar`].
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &self,
        statics: &dyn ComponentManager<StaticBody>,
        dynamics: &dyn ComponentManager<DynamicBody>,
        triggers: &dyn ComponentManager<Trigger>,
        heightfields: &dyn ComponentManager<HeightFieldBody>,
        characters: &dyn ComponentManager<CharacterController>,
        water: &dyn ComponentManager<WaterVolume>,
        objects: &dyn GameObjectRegistry,
        renderer: &mut dyn DebugRenderer,
    ) {
        const SHAPE_COLOR: [f32; 4] = [0.0, 0.8, 0.0, 1.0];
        const TRIGGER_COLOR: [f32; 4] = [0.8, 0.8, 0.0, 1.0];
        const CHARACTER_COLOR: [f32; 4] = [0.0, 0.6, 1.0, 1.0];
        const COM_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
        const WATER_COLOR: [f32; 4] = [0.1, 0.4, 1.0, 1.0];
        const COM_AXIS_LEN: f32 = 0.1;

        let draw_collider = |native: RigidBodyHandle,
                              crop: Option<(Vector3<f32>, Vector3<f32>)>,
                              color: [f32; 4],
                              renderer: &mut dyn DebugRenderer| {
            let Some(rb) = self.registry.rigid_bodies.get(native) else {
                return;
            };
            let Some(&collider_handle) = rb.colliders().first() else {
                return;
            };
            let Some(collider) = self.registry.colliders.get(collider_handle) else {
                return;
            };
            crate::debug::gather_shape(collider.shape(), *collider.position(), crop, color, renderer);
        };

        if crate::cvar::get(&crate::cvar::com_DrawCollisionShape) || crate::cvar::get(&crate::cvar::com_DrawCollisionModel) {
            for (_, body) in statics.iter() {
                draw_collider(body.native(), None, SHAPE_COLOR, renderer);
            }
            for (_, body) in dynamics.iter() {
                draw_collider(body.native(), None, SHAPE_COLOR, renderer);
            }
            for (_, body) in heightfields.iter() {
                draw_collider(body.native(), body.debug_crop_box, SHAPE_COLOR, renderer);
            }
        }

        if crate::cvar::get(&crate::cvar::com_DrawTriggers) {
            for (_, trigger) in triggers.iter() {
                draw_collider(trigger.native(), None, TRIGGER_COLOR, renderer);
            }
        }

        if crate::cvar::get(&crate::cvar::com_DrawCharacterController) {
            for (_, character) in characters.iter() {
                if let Some(native) = character.native() {
                    draw_collider(native, None, CHARACTER_COLOR, renderer);
                }
            }
        }

        if crate::cvar::get(&crate::cvar::com_DrawCenterOfMass) {
            for handle in self.registry.active_dynamic.iter() {
                let Some(body) = dynamics.resolve(handle) else {
                    continue;
                };
                let Some(rb) = self.registry.rigid_bodies.get(body.native()) else {
                    continue;
                };
                let com = rb.center_of_mass().coords;
                renderer.add_line(com - Vector3::new(COM_AXIS_LEN, 0.0, 0.0), com + Vector3::new(COM_AXIS_LEN, 0.0, 0.0), COM_COLOR);
                renderer.add_line(com - Vector3::new(0.0, COM_AXIS_LEN, 0.0), com + Vector3::new(0.0, COM_AXIS_LEN, 0.0), COM_COLOR);
                renderer.add_line(com - Vector3::new(0.0, 0.0, COM_AXIS_LEN), com + Vector3::new(0.0, 0.0, COM_AXIS_LEN), COM_COLOR);
            }
        }

        if crate::cvar::get(&crate::cvar::com_DrawWaterVolume) {
            for (_, volume) in water.iter() {
                if let Some(owner) = objects.get(volume.game_object) {
                    draw_wire_box(owner.world_position(), volume.half_extents, WATER_COLOR, renderer);
                }
            }
        }
    }
}

/// Axis-aligned wireframe box (12 edges), used for the water-volume debug
/// overlay — volumes are axis-aligned world AABBs, so unlike
/// [`crate::debug::gather_shape`]'s collider wireframes this needs no
/// rotation.
fn draw_wire_box(center: Vector3<f32>, half_extents: Vector3<f32>, color: [f32; 4], out: &mut dyn DebugRenderer) {
    let he = half_extents;
    let corners = [
        center + Vector3::new(-he.x, -he.y, -he.z),
        center + Vector3::new(he.x, -he.y, -he.z),
        center + Vector3::new(he.x, he.y, -he.z),
        center + Vector3::new(-he.x, he.y, -he.z),
        center + Vector3::new(-he.x, -he.y, he.z),
        center + Vector3::new(he.x, -he.y, he.z),
        center + Vector3::new(he.x, he.y, he.z),
        center + Vector3::new(-he.x, he.y, he.z),
    ];
    let edges = [
        (0, 1), (1, 2), (2, 3), (3, 0),
        (4, 5), (5, 6), (6, 7), (7, 4),
        (0, 4), (1, 5), (2, 6), (3, 7),
    ];
    for (a, b) in edges {
        out.add_line(corners[a], corners[b], color);
    }
}

fn dispatch_trigger_event(
    event: &TriggerEvent,
    owner_of: &dyn Fn(ExtendedHandle) -> Option<GameObjectHandle>,
    objects: &mut dyn GameObjectRegistry,
) {
    let Some(owner) = owner_of(event.trigger) else {
        return;
    };
    let Some(obj) = objects.get_mut(owner) else {
        return;
    };
    match event.kind {
        EventKind::Began => obj.on_begin_overlap(event.trigger, event.other),
        EventKind::Ended => obj.on_end_overlap(event.trigger, event.other),
        EventKind::Updated => {}
    }
}

fn dispatch_contact_event(
    side: ExtendedHandle,
    event: &ContactEvent,
    owner_of: &dyn Fn(ExtendedHandle) -> Option<GameObjectHandle>,
    objects: &mut dyn GameObjectRegistry,
) {
    let Some(owner) = owner_of(side) else {
        return;
    };
    let Some(obj) = objects.get_mut(owner) else {
        return;
    };
    match event.kind {
        EventKind::Began => obj.on_begin_contact(event),
        EventKind::Updated => obj.on_update_contact(event),
        EventKind::Ended => obj.on_end_contact(event),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_world_starts_with_empty_registry() {
        let world = PhysicsWorld::new(PhysicsWorldConfig::default());
        assert!(world.registry.active_dynamic.is_empty());
    }
}
