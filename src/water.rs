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

//! Water-Volume buoyancy: an axis-aligned box that pushes
//! overlapping dynamic bodies upward with a drag-damped buoyancy impulse.
//!
//! `rapier3d` has no equivalent of a per-body `ApplyBuoyancyImpulse` call, so
//! the impulse itself is computed here from each overlapping body's own
//! collider AABB.

use crate::body::{BodyKindTag, BodyRegistry, DynamicBody};
use crate::external::{ComponentManager, GameObjectRegistry};
use crate::filter::ObjectLayer;
use crate::handle::GameObjectHandle;
use fyrox_core::algebra::{Point3, Vector3};
use fyrox_core::reflect::prelude::*;
use fyrox_core::visitor::prelude::*;
use rapier3d::dynamics::RigidBody;
use rapier3d::geometry::ColliderSet;
use rapier3d::parry::bounding_volume::Aabb;
use rapier3d::pipeline::QueryPipeline;

const FLUID_DENSITY: f32 = 1.1;
const LINEAR_DRAG: f32 = 0.3;
const ANGULAR_DRAG: f32 = 0.05;

/// A box-shaped body of water. Its own collision layer is tracked for
/// consistency with every other body kind, but `rapier3d`'s AABB broadphase
/// query takes no filter argument, so unlike
/// every other body kind it is not actually consulted when selecting
/// candidates — only the Dynamic broadphase class and active-dynamic gate
/// are.
#[derive(Visit, Reflect)]
pub struct WaterVolume {
    pub half_extents: Vector3<f32>,
    pub layer: ObjectLayer,
    pub game_object: GameObjectHandle,
}

impl Default for WaterVolume {
    fn default() -> Self {
        Self {
            half_extents: Vector3::new(0.5, 0.5, 0.5),
            layer: ObjectLayer::default(),
            game_object: GameObjectHandle::default(),
        }
    }
}

impl WaterVolume {
    /// A volume with any non-positive half-extent component contributes no
    /// buoyancy.
    fn is_degenerate(&self) -> bool {
        self.half_extents.x <= f32::EPSILON
            || self.half_extents.y <= f32::EPSILON
            || self.half_extents.z <= f32::EPSILON
    }
}

/// Estimates how much of a dynamic body is beneath the water surface from
/// its first collider's AABB, since there is no cheap per-shape submerged-
/// volume integral available. `0.0` is fully above the surface, `1.0` is
/// fully submerged.
fn submerged_fraction(
    rigid_body: &RigidBody,
    colliders: &ColliderSet,
    surface_position: Vector3<f32>,
    surface_normal: Vector3<f32>,
) -> f32 {
    let Some(&first) = rigid_body.colliders().first() else {
        return 0.0;
    };
    let Some(collider) = colliders.get(first) else {
        return 0.0;
    };
    let aabb = collider.compute_aabb();
    let half_height = ((aabb.maxs.y - aabb.mins.y) * 0.5).max(0.01);
    let center = rigid_body.center_of_mass();
    let center = Vector3::new(center.x, center.y, center.z);
    let depth = surface_normal.dot(&(surface_position - center));
    ((depth + half_height) / (2.0 * half_height)).clamp(0.0, 1.0)
}

/// Applies one tick's buoyancy impulse, approximating Jolt's
/// `Body::ApplyBuoyancyImpulse(surfacePos, surfaceNormal, 1.1, 0.3, 0.05,
/// fluidVelocity, gravity, dt)`: a buoyant impulse opposing gravity scaled
/// by submerged fraction, plus linear and angular drag against the fluid.
fn apply_buoyancy_impulse(
    rigid_body: &mut RigidBody,
    submerged: f32,
    fluid_velocity: Vector3<f32>,
    gravity: Vector3<f32>,
    dt: f32,
) {
    if submerged <= 0.0 {
        return;
    }
    let mass = rigid_body.mass();

    let buoyant_accel = -gravity * FLUID_DENSITY * submerged;
    rigid_body.apply_impulse(buoyant_accel * mass * dt, true);

    let relative_velocity = *rigid_body.linvel() - fluid_velocity;
    rigid_body.apply_impulse(-relative_velocity * LINEAR_DRAG * submerged * mass, true);

    let angular_velocity = *rigid_body.angvel();
    rigid_body.apply_torque_impulse(-angular_velocity * ANGULAR_DRAG * submerged, true);
}

/// Runs the Water-Volume pass for every live volume: computes
/// its world AABB, collects overlapping colliders via the Query Façade's
/// AABB overlap, and applies a buoyancy impulse to every active (non-
/// kinematic, non-sleeping) dynamic body found.
pub fn apply_all(
    registry: &mut BodyRegistry,
    query: &QueryPipeline,
    objects: &dyn GameObjectRegistry,
    volumes: &dyn ComponentManager<WaterVolume>,
    dynamic_bodies: &dyn ComponentManager<DynamicBody>,
    gravity: Vector3<f32>,
    dt: f32,
) {
    for (_, volume) in volumes.iter() {
        if volume.is_degenerate() {
            continue;
        }
        let Some(owner) = objects.get(volume.game_object) else {
            continue;
        };
        let world_position = owner.world_position();
        let scaled_extents = volume.half_extents.component_mul(&owner.world_scale());
        let mins = world_position - scaled_extents;
        let maxs = world_position + scaled_extents;
        let surface_position = Vector3::new(world_position.x, maxs.y, world_position.z);
        let aabb = Aabb::new(Point3::from(mins), Point3::from(maxs));

        let hits = {
            let resolve = |packed: u128| registry.resolve_user_data(packed);
            crate::query::overlap_aabb(query, &registry.colliders, &resolve, &aabb)
        };

        let surface_normal = Vector3::new(0.0, 1.0, 0.0);
        for hit in hits {
            if !matches!(hit.kind, BodyKindTag::Dynamic) {
                continue;
            }
            let Some(component) = dynamic_bodies.resolve(hit.handle) else {
                continue;
            };
            if !component.is_live() || component.is_kinematic() {
                continue;
            }
            let native = component.native();
            let BodyRegistry {
                rigid_bodies,
                colliders,
                ..
            } = &mut *registry;
            let Some(rigid_body) = rigid_bodies.get_mut(native) else {
                continue;
            };
            if rigid_body.is_sleeping() {
                continue;
            }
            let submerged = submerged_fraction(rigid_body, colliders, surface_position, surface_normal);
            apply_buoyancy_impulse(rigid_body, submerged, Vector3::zeros(), gravity, dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_volume_is_not_degenerate() {
        let volume = WaterVolume::default();
        assert!(!volume.is_degenerate());
    }

    #[test]
    fn zero_half_extent_is_degenerate() {
        let volume = WaterVolume {
            half_extents: Vector3::new(0.0, 0.5, 0.5),
            ..Default::default()
        };
        assert!(volume.is_degenerate());
    }

    #[test]
    fn fully_submerged_fraction_saturates_at_one() {
        let mut bodies = rapier3d::dynamics::RigidBodySet::new();
        let mut colliders = ColliderSet::new();
        let body = bodies.insert(
            rapier3d::dynamics::RigidBodyBuilder::new(rapier3d::dynamics::RigidBodyType::Dynamic)
                .translation(Vector3::new(0.0, -10.0, 0.0))
                .build(),
        );
        colliders.insert_with_parent(
            rapier3d::geometry::ColliderBuilder::ball(0.5).build(),
            body,
            &mut bodies,
        );
        let rigid_body = bodies.get(body).unwrap();
        let fraction = submerged_fraction(
            rigid_body,
            &colliders,
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        );
        assert_eq!(fraction, 1.0);
    }
}
