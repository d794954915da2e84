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

//! Query Façade: ray, shape, and overlap queries against the live
//! solver state, in the style of `fyrox-impl`'s `PhysicsWorld::cast_ray`/
//! `cast_shape` — colliders and bodies are passed straight into the held
//! `rapier3d::pipeline::QueryPipeline` rather than rebuilding a view per
//! call, and a hit's collider `user_data` is resolved back to an
//! [`ExtendedHandle`] through the same `resolve` closure `contacts.rs` uses.

use crate::handle::ExtendedHandle;
use fyrox_core::algebra::{Isometry3, Point3, UnitVector3, Vector3};
use rapier3d::dynamics::{RigidBodyHandle, RigidBodySet};
use rapier3d::geometry::{ColliderSet, Group, InteractionGroups, Ray, Shape};
use rapier3d::parry::query::ShapeCastOptions;
use rapier3d::pipeline::QueryPipeline;
use std::cmp::Ordering;

fn u32_to_group(v: u32) -> Group {
    Group::from_bits(v).unwrap_or_else(Group::all)
}

/// Narrows a query to a subset of live colliders. `exclude_body`
/// keeps a caster from hitting its own collider(s); `groups`, when set,
/// restricts the query to colliders whose membership bits intersect it.
#[derive(Copy, Clone, Default)]
pub struct QueryFilter {
    pub exclude_rigid_body: Option<RigidBodyHandle>,
    pub groups: Option<u32>,
}

impl QueryFilter {
    fn to_native(self) -> rapier3d::pipeline::QueryFilter<'static> {
        let mut filter = rapier3d::pipeline::QueryFilter::new();
        if let Some(rb) = self.exclude_rigid_body {
            filter = filter.exclude_rigid_body(rb);
        }
        if let Some(mask) = self.groups {
            filter = filter.groups(InteractionGroups::new(u32_to_group(u32::MAX), u32_to_group(mask)));
        }
        filter
    }
}

/// One ray-cast result, in world space.
#[derive(Copy, Clone, Debug)]
pub struct RayHit {
    pub collider: ExtendedHandle,
    pub point: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub toi: f32,
}

/// One shape-cast result. `witness_self`/`normal_self` describe the cast
/// shape's contact point at time of impact; `witness_other`/`normal_other`
/// describe the hit collider's, both in world space.
#[derive(Copy, Clone, Debug)]
pub struct ShapeCastHit {
    pub collider: ExtendedHandle,
    pub toi: f32,
    pub witness_self: Vector3<f32>,
    pub witness_other: Vector3<f32>,
    pub normal_self: Vector3<f32>,
    pub normal_other: Vector3<f32>,
}

fn resolve_collider(
    colliders: &ColliderSet,
    handle: rapier3d::geometry::ColliderHandle,
    resolve: &dyn Fn(u128) -> Option<ExtendedHandle>,
) -> Option<ExtendedHandle> {
    colliders.get(handle).and_then(|c| resolve(c.user_data))
}

/// Closest hit along a ray, or `None` if it misses everything.
#[allow(clippy::too_many_arguments)]
pub fn cast_ray_closest(
    query: &QueryPipeline,
    bodies: &RigidBodySet,
    colliders: &ColliderSet,
    resolve: &dyn Fn(u128) -> Option<ExtendedHandle>,
    origin: Vector3<f32>,
    direction: Vector3<f32>,
    max_toi: f32,
    solid: bool,
    filter: QueryFilter,
) -> Option<RayHit> {
    let direction = direction.try_normalize(f32::EPSILON)?;
    let ray = Ray::new(Point3::from(origin), direction);
    let (handle, intersection) =
        query.cast_ray_and_get_normal(bodies, colliders, &ray, max_toi, solid, filter.to_native())?;
    let collider = resolve_collider(colliders, handle, resolve)?;
    let point = ray.point_at(intersection.time_of_impact);
    Some(RayHit {
        collider,
        point: Vector3::new(point.x, point.y, point.z),
        normal: Vector3::new(
            intersection.normal.x,
            intersection.normal.y,
            intersection.normal.z,
        ),
        toi: intersection.time_of_impact,
    })
}

/// Like [`cast_ray_closest`], but accepts a pre-built native filter rather
/// than the crate's [`QueryFilter`] wrapper, for callers that need a
/// per-pair predicate the wrapper has no room for (the character
/// controller's collision-layer gate).
#[allow(clippy::too_many_arguments)]
pub(crate) fn cast_ray_closest_native(
    query: &QueryPipeline,
    bodies: &RigidBodySet,
    colliders: &ColliderSet,
    resolve: &dyn Fn(u128) -> Option<ExtendedHandle>,
    origin: Vector3<f32>,
    direction: Vector3<f32>,
    max_toi: f32,
    solid: bool,
    filter: rapier3d::pipeline::QueryFilter,
) -> Option<RayHit> {
    let direction = direction.try_normalize(f32::EPSILON)?;
    let ray = Ray::new(Point3::from(origin), direction);
    let (handle, intersection) =
        query.cast_ray_and_get_normal(bodies, colliders, &ray, max_toi, solid, filter)?;
    let collider = resolve_collider(colliders, handle, resolve)?;
    let point = ray.point_at(intersection.time_of_impact);
    Some(RayHit {
        collider,
        point: Vector3::new(point.x, point.y, point.z),
        normal: Vector3::new(
            intersection.normal.x,
            intersection.normal.y,
            intersection.normal.z,
        ),
        toi: intersection.time_of_impact,
    })
}

/// Every hit along a ray, sorted by ascending time-of-impact.
#[allow(clippy::too_many_arguments)]
pub fn cast_ray_all(
    query: &QueryPipeline,
    bodies: &RigidBodySet,
    colliders: &ColliderSet,
    resolve: &dyn Fn(u128) -> Option<ExtendedHandle>,
    origin: Vector3<f32>,
    direction: Vector3<f32>,
    max_toi: f32,
    solid: bool,
    filter: QueryFilter,
) -> Vec<RayHit> {
    let Some(direction) = direction.try_normalize(f32::EPSILON) else {
        return Vec::new();
    };
    let ray = Ray::new(Point3::from(origin), direction);
    let mut hits = Vec::new();
    query.intersections_with_ray(
        bodies,
        colliders,
        &ray,
        max_toi,
        solid,
        filter.to_native(),
        |handle, intersection| {
            if let Some(collider) = resolve_collider(colliders, handle, resolve) {
                let point = ray.point_at(intersection.time_of_impact);
                hits.push(RayHit {
                    collider,
                    point: Vector3::new(point.x, point.y, point.z),
                    normal: Vector3::new(
                        intersection.normal.x,
                        intersection.normal.y,
                        intersection.normal.z,
                    ),
                    toi: intersection.time_of_impact,
                });
            }
            true
        },
    );
    hits.sort_by(|a, b| a.toi.partial_cmp(&b.toi).unwrap_or(Ordering::Equal));
    hits
}

fn shape_cast_options(max_toi: f32, stop_at_penetration: bool) -> ShapeCastOptions {
    ShapeCastOptions {
        max_time_of_impact: max_toi,
        target_distance: 0.0,
        stop_at_penetration,
        compute_impact_geometry_on_penetration: true,
    }
}

fn shape_cast_hit(
    colliders: &ColliderSet,
    resolve: &dyn Fn(u128) -> Option<ExtendedHandle>,
    handle: rapier3d::geometry::ColliderHandle,
    hit: rapier3d::parry::query::ShapeCastHit,
) -> Option<ShapeCastHit> {
    let collider = resolve_collider(colliders, handle, resolve)?;
    let normal_from = |n: UnitVector3<f32>| Vector3::new(n.x, n.y, n.z);
    Some(ShapeCastHit {
        collider,
        toi: hit.time_of_impact,
        witness_self: Vector3::new(hit.witness1.x, hit.witness1.y, hit.witness1.z),
        witness_other: Vector3::new(hit.witness2.x, hit.witness2.y, hit.witness2.z),
        normal_self: normal_from(hit.normal1),
        normal_other: normal_from(hit.normal2),
    })
}

/// Closest collider a moving shape would hit along `shape_vel` before
/// `max_toi`.
#[allow(clippy::too_many_arguments)]
pub fn cast_shape_closest(
    query: &QueryPipeline,
    bodies: &RigidBodySet,
    colliders: &ColliderSet,
    resolve: &dyn Fn(u128) -> Option<ExtendedHandle>,
    shape: &dyn Shape,
    shape_pos: Isometry3<f32>,
    shape_vel: Vector3<f32>,
    max_toi: f32,
    stop_at_penetration: bool,
    filter: QueryFilter,
) -> Option<ShapeCastHit> {
    let opts = shape_cast_options(max_toi, stop_at_penetration);
    let (handle, hit) = query.cast_shape(
        bodies,
        colliders,
        &shape_pos,
        &shape_vel,
        shape,
        opts,
        filter.to_native(),
    )?;
    shape_cast_hit(colliders, resolve, handle, hit)
}

/// Every collider a moving shape would hit before `max_toi`, sorted by
/// ascending time-of-impact. `rapier3d`'s
/// `QueryPipeline` only ever reports the closest shape-cast hit per call, so
/// "all" is approximated by repeatedly casting and excluding each
/// previously-found rigid body, stopping once a cast comes back empty or
/// `max_hits` is reached — the same iterative-exclusion technique used for
/// ray casts that must report more than one hit.
#[allow(clippy::too_many_arguments)]
pub fn cast_shape_all(
    query: &QueryPipeline,
    bodies: &RigidBodySet,
    colliders: &ColliderSet,
    resolve: &dyn Fn(u128) -> Option<ExtendedHandle>,
    shape: &dyn Shape,
    shape_pos: Isometry3<f32>,
    shape_vel: Vector3<f32>,
    max_toi: f32,
    stop_at_penetration: bool,
    mut filter: QueryFilter,
    max_hits: usize,
) -> Vec<ShapeCastHit> {
    let mut hits = Vec::new();
    let opts = shape_cast_options(max_toi, stop_at_penetration);
    while hits.len() < max_hits {
        let Some((handle, hit)) = query.cast_shape(
            bodies,
            colliders,
            &shape_pos,
            &shape_vel,
            shape,
            opts,
            filter.to_native(),
        ) else {
            break;
        };
        let Some(collider) = colliders.get(handle) else {
            break;
        };
        let parent = collider.parent();
        if let Some(resolved) = shape_cast_hit(colliders, resolve, handle, hit) {
            hits.push(resolved);
        }
        // Exclude this rigid body on the next pass so repeated casts make
        // forward progress instead of re-hitting the same collider.
        match (filter.exclude_rigid_body, parent) {
            (None, Some(parent)) => filter.exclude_rigid_body = Some(parent),
            _ => break,
        }
    }
    hits.sort_by(|a, b| a.toi.partial_cmp(&b.toi).unwrap_or(Ordering::Equal));
    hits
}

/// Every live collider whose AABB intersects `aabb`.
pub fn overlap_aabb(
    query: &QueryPipeline,
    colliders: &ColliderSet,
    resolve: &dyn Fn(u128) -> Option<ExtendedHandle>,
    aabb: &rapier3d::parry::bounding_volume::Aabb,
) -> Vec<ExtendedHandle> {
    let mut hits = Vec::new();
    query.colliders_with_aabb_intersecting_aabb(aabb, |handle| {
        if let Some(resolved) = resolve_collider(colliders, *handle, resolve) {
            hits.push(resolved);
        }
        true
    });
    hits
}

/// Every live collider overlapping a sphere at `center` with `radius`
///.
pub fn overlap_sphere(
    query: &QueryPipeline,
    bodies: &RigidBodySet,
    colliders: &ColliderSet,
    resolve: &dyn Fn(u128) -> Option<ExtendedHandle>,
    center: Vector3<f32>,
    radius: f32,
    filter: QueryFilter,
) -> Vec<ExtendedHandle> {
    let shape = rapier3d::geometry::Ball::new(radius);
    let pos = Isometry3::translation(center.x, center.y, center.z);
    let mut hits = Vec::new();
    query.intersections_with_shape(bodies, colliders, &pos, &shape, filter.to_native(), |handle| {
        if let Some(resolved) = resolve_collider(colliders, handle, resolve) {
            hits.push(resolved);
        }
        true
    });
    hits
}

/// Every live collider containing `point`.
pub fn overlap_point(
    query: &QueryPipeline,
    bodies: &RigidBodySet,
    colliders: &ColliderSet,
    resolve: &dyn Fn(u128) -> Option<ExtendedHandle>,
    point: Vector3<f32>,
    filter: QueryFilter,
) -> Vec<ExtendedHandle> {
    let point = Point3::from(point);
    let mut hits = Vec::new();
    query.intersections_with_point(bodies, colliders, &point, filter.to_native(), |handle| {
        if let Some(resolved) = resolve_collider(colliders, handle, resolve) {
            hits.push(resolved);
        }
        true
    });
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier3d::dynamics::{RigidBodyBuilder, RigidBodyType};
    use rapier3d::geometry::ColliderBuilder;
    use rapier3d::pipeline::QueryPipeline;

    #[test]
    fn ray_cast_misses_when_nothing_in_the_way() {
        let bodies = RigidBodySet::new();
        let colliders = ColliderSet::new();
        let query = QueryPipeline::new();
        let hit = cast_ray_closest(
            &query,
            &bodies,
            &colliders,
            &|_| None,
            Vector3::zeros(),
            Vector3::new(0.0, -1.0, 0.0),
            100.0,
            true,
            QueryFilter::default(),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn ray_cast_hits_a_floor_collider() {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();
        let body = bodies.insert(
            RigidBodyBuilder::new(RigidBodyType::Fixed)
                .translation(Vector3::new(0.0, -1.0, 0.0))
                .build(),
        );
        colliders.insert_with_parent(
            ColliderBuilder::cuboid(5.0, 0.5, 5.0).build(),
            body,
            &mut bodies,
        );
        let mut query = QueryPipeline::new();
        query.update(&bodies, &colliders);

        let hit = cast_ray_closest(
            &query,
            &bodies,
            &colliders,
            &|_| Some(ExtendedHandle::new(
                fyrox_core::pool::Handle::new(1, 1),
                crate::body::BodyKindTag::Static,
            )),
            Vector3::new(0.0, 10.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
            100.0,
            true,
            QueryFilter::default(),
        );
        assert!(hit.is_some());
        assert!((hit.unwrap().toi - 9.5).abs() < 0.01);
    }
}
