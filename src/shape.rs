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

//! Collision Shape Builder: composes per-object shapes out of
//! collider descriptors and derives the legal scaling mode for the result.
//!
//! `rapier3d` has no generic "scaled shape" wrapper, so a scaled instance is
//! produced by rebuilding the native shape tree from its descriptors with
//! the requested scale baked into each leaf's dimensions, rather than by
//! wrapping an opaque base shape. The composed [`ComposedShape`] therefore
//! keeps its descriptor tree around for the lifetime of the body.

use fyrox_core::algebra::{Isometry3, Point3, UnitQuaternion, Vector3};
use fyrox_core::log::{Log, MessageKind};
use rapier3d::geometry::{Ball, Capsule, Cone, Cuboid, Cylinder, SharedShape};
use std::sync::Arc;

/// One collider attached to a game object, in the object's local space.
#[derive(Clone)]
pub enum ColliderDesc {
    Sphere { radius: f32 },
    Cuboid { half_extents: Vector3<f32> },
    Cylinder { half_height: f32, radius: f32 },
    Cone { half_height: f32, radius: f32 },
    Capsule { half_height: f32, radius: f32 },
    ConvexHull { points: Arc<Vec<Point3<f32>>> },
    Mesh { shape: SharedShape },
    HeightField { shape: SharedShape },
}

impl std::fmt::Debug for ColliderDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColliderDesc::Sphere { radius } => f.debug_struct("Sphere").field("radius", radius).finish(),
            ColliderDesc::Cuboid { half_extents } => {
                f.debug_struct("Cuboid").field("half_extents", half_extents).finish()
            }
            ColliderDesc::Cylinder { half_height, radius } => f
                .debug_struct("Cylinder")
                .field("half_height", half_height)
                .field("radius", radius)
                .finish(),
            ColliderDesc::Cone { half_height, radius } => f
                .debug_struct("Cone")
                .field("half_height", half_height)
                .field("radius", radius)
                .finish(),
            ColliderDesc::Capsule { half_height, radius } => f
                .debug_struct("Capsule")
                .field("half_height", half_height)
                .field("radius", radius)
                .finish(),
            ColliderDesc::ConvexHull { points } => {
                f.debug_struct("ConvexHull").field("point_count", &points.len()).finish()
            }
            ColliderDesc::Mesh { .. } => f.write_str("Mesh(..)"),
            ColliderDesc::HeightField { .. } => f.write_str("HeightField(..)"),
        }
    }
}

impl ColliderDesc {
    /// Whether this collider kind is convex. Non-convex colliders
    /// (`Mesh`, `HeightField`) may only appear on static bodies.
    pub fn is_convex(&self) -> bool {
        !matches!(
            self,
            ColliderDesc::Mesh { .. } | ColliderDesc::HeightField { .. }
        )
    }

    /// Builds the native shape for this descriptor with `scale` applied.
    /// `Mesh`/`HeightField` bake their own vertex data and only honor the
    /// uniform component of `scale` (their scaling mode is always
    /// [`ScalingMode::Uniform`], so `scale.x == scale.y == scale.z` holds
    /// by the time this is reached through [`apply_scale`]).
    fn to_native(&self, scale: Vector3<f32>) -> Option<SharedShape> {
        Some(match self {
            ColliderDesc::Sphere { radius } => SharedShape::new(Ball::new(radius * scale.x)),
            ColliderDesc::Cuboid { half_extents } => SharedShape::new(Cuboid::new(Vector3::new(
                half_extents.x * scale.x,
                half_extents.y * scale.y,
                half_extents.z * scale.z,
            ))),
            ColliderDesc::Cylinder {
                half_height,
                radius,
            } => SharedShape::new(Cylinder::new(half_height * scale.y, radius * scale.x)),
            ColliderDesc::Cone {
                half_height,
                radius,
            } => SharedShape::new(Cone::new(half_height * scale.y, radius * scale.x)),
            ColliderDesc::Capsule {
                half_height,
                radius,
            } => {
                let h = half_height * scale.y;
                let r = radius * scale.x;
                SharedShape::new(Capsule::new(
                    Point3::new(0.0, -h, 0.0),
                    Point3::new(0.0, h, 0.0),
                    r,
                ))
            }
            ColliderDesc::ConvexHull { points } => {
                let scaled: Vec<Point3<f32>> = points
                    .iter()
                    .map(|p| Point3::new(p.x * scale.x, p.y * scale.y, p.z * scale.z))
                    .collect();
                SharedShape::convex_hull(&scaled)?
            }
            ColliderDesc::Mesh { shape } => shape.clone(),
            ColliderDesc::HeightField { shape } => shape.clone(),
        })
    }
}

/// A collider plus the local offset/rotation it was placed at on its owning
/// object.
#[derive(Clone, Debug)]
pub struct PlacedCollider {
    pub desc: ColliderDesc,
    pub local_position: Vector3<f32>,
    pub local_rotation: UnitQuaternion<f32>,
}

impl PlacedCollider {
    fn is_identity_offset(&self) -> bool {
        self.local_position == Vector3::zeros()
            && self.local_rotation == UnitQuaternion::identity()
    }
}

/// Constraint on the axis set along which a shape instance can legally be
/// scaled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScalingMode {
    NonUniform,
    UniformXZ,
    Uniform,
}

/// A composed collision shape handed out by the builder: the descriptor
/// tree that produced it, its unscaled native root, and the scaling mode
/// derived once at composition time. Reference-counted so it can be shared across
/// every instance of an object prototype.
#[derive(Clone)]
pub struct ComposedShape {
    colliders: Arc<Vec<PlacedCollider>>,
    pub root: SharedShape,
    pub scaling_mode: ScalingMode,
}

/// Wraps an already-built native shape (e.g. a height field, built once by
/// the caller from terrain data) as a [`ComposedShape`] with no descriptor
/// tree. [`apply_scale`] on the result always returns the shape unchanged
/// for non-identity scale, since height fields bake their own dimensions.
pub fn composed_shape_from_native(shape: SharedShape, scaling_mode: ScalingMode) -> ComposedShape {
    ComposedShape {
        colliders: Arc::new(Vec::new()),
        root: shape,
        scaling_mode,
    }
}

/// Builds a [`ComposedShape`] from the colliders attached to a game object.
/// `allow_concave` gates whether `Mesh`/`HeightField` colliders may be used
///.
pub fn build_composed_shape(
    colliders: &[PlacedCollider],
    allow_concave: bool,
) -> Option<ComposedShape> {
    // Step 1: the collection must not be empty.
    if colliders.is_empty() {
        Log::writeln(
            MessageKind::Warning,
            "physics: collider set is empty, no body will be created".to_string(),
        );
        return None;
    }

    if !allow_concave {
        if let Some(bad) = colliders
            .iter()
            .find(|c| !c.desc.is_convex())
        {
            Log::writeln(
                MessageKind::Warning,
                format!(
                    "physics: concave collider {:?} is not allowed on this body kind, skipping",
                    bad.desc
                ),
            );
            return None;
        }
    }

    let scaling_mode = derive_scaling_mode(colliders);
    let root = compose_native(colliders, Vector3::new(1.0, 1.0, 1.0))?;

    Some(ComposedShape {
        colliders: Arc::new(colliders.to_vec()),
        root,
        scaling_mode,
    })
}

fn compose_native(colliders: &[PlacedCollider], scale: Vector3<f32>) -> Option<SharedShape> {
    let native: Vec<(Isometry3<f32>, SharedShape)> = colliders
        .iter()
        .filter_map(|c| {
            let shape = c.desc.to_native(scale)?;
            Some((
                Isometry3::from_parts(c.local_position.into(), c.local_rotation),
                shape,
            ))
        })
        .collect();

    if native.is_empty() {
        return None;
    }

    Some(if native.len() > 1 {
        // Step 2: two-or-more primitives are wrapped in a static compound.
        SharedShape::compound(native)
    } else {
        let (iso, shape) = native.into_iter().next().unwrap();
        if colliders[0].is_identity_offset() {
            // Step 4: a single primitive with an identity offset is
            // returned as-is.
            shape
        } else {
            // Step 3: a single primitive with a non-identity offset is
            // wrapped in a rotate+translate node, represented here as a
            // single-entry compound (rapier has no bare "rotate+translate"
            // leaf wrapper of its own).
            SharedShape::compound(vec![(iso, shape)])
        }
    })
}

/// Derives the legal scaling mode for a collider set:
/// starts at non-uniform; mesh/sphere/capsule forces uniform; cylinder (and
/// cone, by the same rule) forces XZ-uniform, or full uniform if rotated.
fn derive_scaling_mode(colliders: &[PlacedCollider]) -> ScalingMode {
    let mut mode = ScalingMode::NonUniform;
    for collider in colliders {
        let this_mode = match &collider.desc {
            ColliderDesc::Mesh { .. } | ColliderDesc::HeightField { .. } => ScalingMode::Uniform,
            ColliderDesc::Sphere { .. } | ColliderDesc::Capsule { .. } => ScalingMode::Uniform,
            ColliderDesc::Cylinder { .. } | ColliderDesc::Cone { .. } => {
                if collider.local_rotation != UnitQuaternion::identity() {
                    ScalingMode::Uniform
                } else {
                    ScalingMode::UniformXZ
                }
            }
            ColliderDesc::Cuboid { .. } | ColliderDesc::ConvexHull { .. } => {
                ScalingMode::NonUniform
            }
        };
        mode = combine_modes(mode, this_mode);
    }
    mode
}

fn combine_modes(a: ScalingMode, b: ScalingMode) -> ScalingMode {
    use ScalingMode::*;
    match (a, b) {
        (Uniform, _) | (_, Uniform) => Uniform,
        (UniformXZ, _) | (_, UniformXZ) => UniformXZ,
        _ => NonUniform,
    }
}

/// Derives a scaled shape instance for a base shape + scaling mode given a
/// requested world scale `s`. Rebuilds the
/// native shape tree from `base`'s descriptors with the canonicalised scale
/// baked into each leaf.
pub fn apply_scale(base: &ComposedShape, s: Vector3<f32>) -> SharedShape {
    if s == Vector3::new(1.0, 1.0, 1.0) {
        return base.root.clone();
    }

    let is_uniform = (s.x - s.y).abs() < f32::EPSILON && (s.y - s.z).abs() < f32::EPSILON;

    let canonical = match base.scaling_mode {
        ScalingMode::NonUniform => s,
        ScalingMode::Uniform if is_uniform => s,
        ScalingMode::Uniform => {
            let u = s.x.max(s.y).max(s.z);
            Log::writeln(
                MessageKind::Warning,
                format!(
                    "physics: non-uniform scale {s:?} applied to a uniform-only shape, \
                     collapsing to {u} on every axis"
                ),
            );
            Vector3::new(u, u, u)
        }
        ScalingMode::UniformXZ if is_uniform => s,
        ScalingMode::UniformXZ => {
            if (s.x - s.z).abs() >= f32::EPSILON {
                Log::writeln(
                    MessageKind::Warning,
                    format!(
                        "physics: scale {s:?} has Sx != Sz on an XZ-uniform-only shape, \
                         using max(Sx, Sz) on both axes"
                    ),
                );
            }
            let xz = s.x.max(s.z);
            Vector3::new(xz, s.y, xz)
        }
    };

    compose_native(&base.colliders, canonical).unwrap_or_else(|| base.root.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(r: f32) -> PlacedCollider {
        PlacedCollider {
            desc: ColliderDesc::Sphere { radius: r },
            local_position: Vector3::zeros(),
            local_rotation: UnitQuaternion::identity(),
        }
    }

    fn cuboid(he: Vector3<f32>) -> PlacedCollider {
        PlacedCollider {
            desc: ColliderDesc::Cuboid { half_extents: he },
            local_position: Vector3::zeros(),
            local_rotation: UnitQuaternion::identity(),
        }
    }

    #[test]
    fn empty_collider_set_fails() {
        assert!(build_composed_shape(&[], false).is_none());
    }

    #[test]
    fn single_sphere_forces_uniform_scaling() {
        let shape = build_composed_shape(&[ball(0.5)], false).unwrap();
        assert_eq!(shape.scaling_mode, ScalingMode::Uniform);
    }

    #[test]
    fn box_allows_non_uniform_scaling() {
        let shape = build_composed_shape(&[cuboid(Vector3::new(1.0, 1.0, 1.0))], false).unwrap();
        assert_eq!(shape.scaling_mode, ScalingMode::NonUniform);
    }

    #[test]
    fn rotated_cylinder_forces_full_uniform() {
        let rotated = PlacedCollider {
            desc: ColliderDesc::Cylinder {
                half_height: 1.0,
                radius: 0.5,
            },
            local_position: Vector3::zeros(),
            local_rotation: UnitQuaternion::from_axis_angle(
                &Vector3::x_axis(),
                std::f32::consts::FRAC_PI_2,
            ),
        };
        let shape = build_composed_shape(&[rotated], false).unwrap();
        assert_eq!(shape.scaling_mode, ScalingMode::Uniform);
    }

    #[test]
    fn axis_aligned_cylinder_allows_xz_uniform() {
        let upright = PlacedCollider {
            desc: ColliderDesc::Cylinder {
                half_height: 1.0,
                radius: 0.5,
            },
            local_position: Vector3::zeros(),
            local_rotation: UnitQuaternion::identity(),
        };
        let shape = build_composed_shape(&[upright], false).unwrap();
        assert_eq!(shape.scaling_mode, ScalingMode::UniformXZ);
    }

    #[test]
    fn mesh_not_allowed_without_concave_flag() {
        let mesh = PlacedCollider {
            desc: ColliderDesc::Mesh {
                shape: SharedShape::new(Cuboid::new(Vector3::new(1.0, 1.0, 1.0))),
            },
            local_position: Vector3::zeros(),
            local_rotation: UnitQuaternion::identity(),
        };
        assert!(build_composed_shape(&[mesh], false).is_none());
    }

    #[test]
    fn mesh_allowed_when_concave_flag_set() {
        let mesh = PlacedCollider {
            desc: ColliderDesc::Mesh {
                shape: SharedShape::new(Cuboid::new(Vector3::new(1.0, 1.0, 1.0))),
            },
            local_position: Vector3::zeros(),
            local_rotation: UnitQuaternion::identity(),
        };
        assert!(build_composed_shape(&[mesh], true).is_some());
    }

    #[test]
    fn two_colliders_are_wrapped_in_a_compound() {
        let shape =
            build_composed_shape(&[ball(0.5), cuboid(Vector3::new(1.0, 1.0, 1.0))], false)
                .unwrap();
        assert!(shape.root.as_compound().is_some());
    }

    #[test]
    fn applying_identity_scale_is_a_no_op() {
        let shape = build_composed_shape(&[cuboid(Vector3::new(1.0, 1.0, 1.0))], false).unwrap();
        let scaled = apply_scale(&shape, Vector3::new(1.0, 1.0, 1.0));
        assert!(std::sync::Arc::ptr_eq(&shape.root.0, &scaled.0));
    }

    #[test]
    fn scaling_a_box_is_idempotent() {
        let shape = build_composed_shape(&[cuboid(Vector3::new(1.0, 1.0, 1.0))], false).unwrap();
        let once = apply_scale(&shape, Vector3::new(2.0, 3.0, 4.0));
        let twice_base = ComposedShape {
            root: once.clone(),
            ..shape.clone()
        };
        let twice = apply_scale(&twice_base, Vector3::new(2.0, 3.0, 4.0));
        assert_eq!(
            once.as_cuboid().unwrap().half_extents,
            twice.as_cuboid().unwrap().half_extents
        );
    }
}
