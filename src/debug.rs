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

//! Debug Geometry Gatherer: walks a shape tree and pushes a wireframe
//! triangle soup through the [`DebugRenderer`] sink, in the same
//! per-primitive tessellation style as `fyrox-impl`'s
//! `SceneDrawingContext::draw_sphere`/`draw_cylinder`/`draw_capsule`
//! (`scene/debug.rs`): fixed slice/stack counts per shape kind, triangles
//! pushed one at a time rather than batched into a mesh.
//!
//! `ComposedShape` bakes the requested world scale into each leaf at
//! composition time instead of keeping a generic "scaled" wrapper (see
//! `shape.rs`), so this walker never needs a scaled-wrapper case of its own:
//! every leaf it reaches already has the right dimensions, and the only
//! recursive case is `Compound`.

use crate::external::DebugRenderer;
use fyrox_core::algebra::{Isometry3, Point3, UnitQuaternion, Vector3};
use fyrox_core::log::{Log, MessageKind};
use rapier3d::geometry::{Shape, TypedShape};

const SPHERE_SLICES: usize = 12;
const SPHERE_STACKS: usize = 8;
const CYLINDER_SIDES: usize = 8;
const CAPSULE_SLICES: usize = 8;
const CAPSULE_STACKS: usize = 6;

fn tp(transform: &Isometry3<f32>, local: Vector3<f32>) -> Vector3<f32> {
    (transform * Point3::from(local)).coords
}

/// Walks `shape`, already positioned at `transform` in world space, and
/// pushes every leaf's wireframe triangles into `out`. `crop_box`, when
/// set, bounds a `HeightField` leaf to an axis-aligned box in the leaf's
/// own local space so a terrain's
/// wireframe does not span an unbounded plane; it has no effect on any
/// other shape kind.
pub fn gather_shape(
    shape: &dyn Shape,
    transform: Isometry3<f32>,
    crop_box: Option<(Vector3<f32>, Vector3<f32>)>,
    color: [f32; 4],
    out: &mut dyn DebugRenderer,
) {
    match shape.as_typed_shape() {
        TypedShape::Ball(ball) => gather_sphere(ball.radius, transform, color, out),
        TypedShape::Cuboid(cuboid) => gather_cuboid(cuboid.half_extents, transform, color, out),
        TypedShape::Cylinder(cylinder) => {
            gather_cylinder(cylinder.radius, cylinder.half_height, true, transform, color, out)
        }
        TypedShape::Cone(cone) => gather_cone(cone.radius, cone.half_height, transform, color, out),
        TypedShape::Capsule(capsule) => gather_capsule(
            capsule.radius,
            Vector3::new(capsule.segment.a.x, capsule.segment.a.y, capsule.segment.a.z),
            Vector3::new(capsule.segment.b.x, capsule.segment.b.y, capsule.segment.b.z),
            transform,
            color,
            out,
        ),
        TypedShape::ConvexPolyhedron(hull) => {
            let (vertices, indices) = hull.to_trimesh();
            gather_triangle_list(&vertices, &indices, transform, color, out);
        }
        TypedShape::TriMesh(mesh) => {
            gather_triangle_list(mesh.vertices(), mesh.indices(), transform, color, out);
        }
        TypedShape::HeightField(field) => {
            for triangle in field.triangles() {
                if let Some((min, max)) = crop_box {
                    let centroid = (triangle.a.coords + triangle.b.coords + triangle.c.coords) / 3.0;
                    if centroid.x < min.x || centroid.x > max.x || centroid.z < min.z || centroid.z > max.z {
                        continue;
                    }
                }
                out.add_triangle(
                    tp(&transform, triangle.a.coords),
                    tp(&transform, triangle.b.coords),
                    tp(&transform, triangle.c.coords),
                    color,
                );
            }
        }
        TypedShape::Compound(compound) => {
            for (local, sub_shape) in compound.shapes() {
                gather_shape(sub_shape.0.as_ref(), transform * *local, crop_box, color, out);
            }
        }
        other => {
            // Unsupported shape in a walker: tapered capsules,
            // bare triangles/segments, half-spaces, and the round-* variants
            // have no named tessellation here. Log and skip rather than
            // panic — the walker runs on the tick thread alongside other
            // debug draw, never inside a solver callback, but errors here
            // should stay local and recoverable just the same.
            Log::writeln(
                MessageKind::Warning,
                format!("physics: debug gatherer does not support shape kind {other:?}, skipping"),
            );
        }
    }
}

fn gather_sphere(radius: f32, transform: Isometry3<f32>, color: [f32; 4], out: &mut dyn DebugRenderer) {
    let d_theta = std::f32::consts::PI / SPHERE_STACKS as f32;
    let d_phi = 2.0 * std::f32::consts::PI / SPHERE_SLICES as f32;
    for i in 0..SPHERE_STACKS {
        for j in 0..SPHERE_SLICES {
            let ni = i + 1;
            let nj = j + 1;

            let k0 = radius * (d_theta * i as f32).sin();
            let k1 = (d_phi * j as f32).cos();
            let k2 = (d_phi * j as f32).sin();
            let k3 = radius * (d_theta * i as f32).cos();

            let k4 = radius * (d_theta * ni as f32).sin();
            let k5 = (d_phi * nj as f32).cos();
            let k6 = (d_phi * nj as f32).sin();
            let k7 = radius * (d_theta * ni as f32).cos();

            if i != SPHERE_STACKS - 1 {
                out.add_triangle(
                    tp(&transform, Vector3::new(k0 * k1, k0 * k2, k3)),
                    tp(&transform, Vector3::new(k4 * k1, k4 * k2, k7)),
                    tp(&transform, Vector3::new(k4 * k5, k4 * k6, k7)),
                    color,
                );
            }
            if i != 0 {
                out.add_triangle(
                    tp(&transform, Vector3::new(k4 * k5, k4 * k6, k7)),
                    tp(&transform, Vector3::new(k0 * k5, k0 * k6, k3)),
                    tp(&transform, Vector3::new(k0 * k1, k0 * k2, k3)),
                    color,
                );
            }
        }
    }
}

fn gather_cuboid(half_extents: Vector3<f32>, transform: Isometry3<f32>, color: [f32; 4], out: &mut dyn DebugRenderer) {
    let he = half_extents;
    let corners = [
        Vector3::new(-he.x, -he.y, -he.z),
        Vector3::new(he.x, -he.y, -he.z),
        Vector3::new(he.x, he.y, -he.z),
        Vector3::new(-he.x, he.y, -he.z),
        Vector3::new(-he.x, -he.y, he.z),
        Vector3::new(he.x, -he.y, he.z),
        Vector3::new(he.x, he.y, he.z),
        Vector3::new(-he.x, he.y, he.z),
    ];
    let p: Vec<Vector3<f32>> = corners.iter().map(|c| tp(&transform, *c)).collect();
    let mut quad = |a: usize, b: usize, c: usize, d: usize| {
        out.add_triangle(p[a], p[b], p[c], color);
        out.add_triangle(p[a], p[c], p[d], color);
    };
    quad(0, 1, 2, 3); // back  (-z)
    quad(5, 4, 7, 6); // front (+z)
    quad(4, 0, 3, 7); // left  (-x)
    quad(1, 5, 6, 2); // right (+x)
    quad(3, 2, 6, 7); // top   (+y)
    quad(4, 5, 1, 0); // bottom(-y)
}

fn gather_cylinder(
    radius: f32,
    half_height: f32,
    caps: bool,
    transform: Isometry3<f32>,
    color: [f32; 4],
    out: &mut dyn DebugRenderer,
) {
    let d_phi = 2.0 * std::f32::consts::PI / CYLINDER_SIDES as f32;
    for i in 0..CYLINDER_SIDES {
        let ni = i + 1;
        let (x0, z0) = (radius * (d_phi * i as f32).cos(), radius * (d_phi * i as f32).sin());
        let (x1, z1) = (radius * (d_phi * ni as f32).cos(), radius * (d_phi * ni as f32).sin());

        if caps {
            out.add_triangle(
                tp(&transform, Vector3::new(x1, half_height, z1)),
                tp(&transform, Vector3::new(x0, half_height, z0)),
                tp(&transform, Vector3::new(0.0, half_height, 0.0)),
                color,
            );
            out.add_triangle(
                tp(&transform, Vector3::new(x0, -half_height, z0)),
                tp(&transform, Vector3::new(x1, -half_height, z1)),
                tp(&transform, Vector3::new(0.0, -half_height, 0.0)),
                color,
            );
        }

        out.add_triangle(
            tp(&transform, Vector3::new(x0, -half_height, z0)),
            tp(&transform, Vector3::new(x0, half_height, z0)),
            tp(&transform, Vector3::new(x1, -half_height, z1)),
            color,
        );
        out.add_triangle(
            tp(&transform, Vector3::new(x1, -half_height, z1)),
            tp(&transform, Vector3::new(x0, half_height, z0)),
            tp(&transform, Vector3::new(x1, half_height, z1)),
            color,
        );
    }
}

/// Wire cone, tip on `+Y`, matching `fyrox-impl`'s `draw_cone`.
fn gather_cone(radius: f32, half_height: f32, transform: Isometry3<f32>, color: [f32; 4], out: &mut dyn DebugRenderer) {
    let d_phi = 2.0 * std::f32::consts::PI / CYLINDER_SIDES as f32;
    for i in 0..CYLINDER_SIDES {
        let ni = i + 1;
        let (x0, z0) = (radius * (d_phi * i as f32).cos(), radius * (d_phi * i as f32).sin());
        let (x1, z1) = (radius * (d_phi * ni as f32).cos(), radius * (d_phi * ni as f32).sin());

        out.add_triangle(
            tp(&transform, Vector3::new(0.0, -half_height, 0.0)),
            tp(&transform, Vector3::new(x0, -half_height, z0)),
            tp(&transform, Vector3::new(x1, -half_height, z1)),
            color,
        );
        out.add_triangle(
            tp(&transform, Vector3::new(0.0, half_height, 0.0)),
            tp(&transform, Vector3::new(x1, -half_height, z1)),
            tp(&transform, Vector3::new(x0, -half_height, z0)),
            color,
        );
    }
}

fn gather_hemisphere(
    radius: f32,
    pole_offset: Vector3<f32>,
    flip: bool,
    transform: Isometry3<f32>,
    color: [f32; 4],
    out: &mut dyn DebugRenderer,
) {
    let d_theta = std::f32::consts::FRAC_PI_2 / CAPSULE_STACKS as f32;
    let d_phi = 2.0 * std::f32::consts::PI / CAPSULE_SLICES as f32;
    let sign = if flip { -1.0 } else { 1.0 };

    let vertex = |i: usize, j: usize| -> Vector3<f32> {
        let theta = d_theta * i as f32;
        let phi = d_phi * j as f32;
        let y = sign * radius * theta.cos();
        let r = radius * theta.sin();
        pole_offset + Vector3::new(r * phi.cos(), y, r * phi.sin())
    };

    for i in 0..CAPSULE_STACKS {
        for j in 0..CAPSULE_SLICES {
            let v00 = vertex(i, j);
            let v01 = vertex(i, j + 1);
            let v10 = vertex(i + 1, j);
            let v11 = vertex(i + 1, j + 1);
            out.add_triangle(tp(&transform, v00), tp(&transform, v10), tp(&transform, v11), color);
            out.add_triangle(tp(&transform, v00), tp(&transform, v11), tp(&transform, v01), color);
        }
    }
}

fn gather_capsule(
    radius: f32,
    local_a: Vector3<f32>,
    local_b: Vector3<f32>,
    transform: Isometry3<f32>,
    color: [f32; 4],
    out: &mut dyn DebugRenderer,
) {
    let axis_vec = local_b - local_a;
    let length = axis_vec.norm();
    let half_height = length * 0.5;
    let center = local_a + axis_vec * 0.5;
    let axis = if length > f32::EPSILON {
        axis_vec / length
    } else {
        Vector3::y()
    };
    let rotation = UnitQuaternion::rotation_between(&Vector3::y(), &axis).unwrap_or_else(UnitQuaternion::identity);
    let frame = transform * Isometry3::from_parts(center.into(), rotation);

    gather_hemisphere(radius, Vector3::new(0.0, half_height, 0.0), false, frame, color, out);
    gather_hemisphere(radius, Vector3::new(0.0, -half_height, 0.0), true, frame, color, out);
    if half_height > f32::EPSILON {
        gather_cylinder(radius, half_height, false, frame, color, out);
    }
}

fn gather_triangle_list(
    vertices: &[Point3<f32>],
    indices: &[[u32; 3]],
    transform: Isometry3<f32>,
    color: [f32; 4],
    out: &mut dyn DebugRenderer,
) {
    for triangle in indices {
        let a = vertices[triangle[0] as usize];
        let b = vertices[triangle[1] as usize];
        let c = vertices[triangle[2] as usize];
        out.add_triangle(tp(&transform, a.coords), tp(&transform, b.coords), tp(&transform, c.coords), color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier3d::geometry::{Ball, Compound, Cuboid, SharedShape};

    struct RecordingRenderer {
        triangles: Vec<(Vector3<f32>, Vector3<f32>, Vector3<f32>)>,
    }

    impl DebugRenderer for RecordingRenderer {
        fn add_line(&mut self, _begin: Vector3<f32>, _end: Vector3<f32>, _color: [f32; 4]) {}

        fn add_triangle(&mut self, a: Vector3<f32>, b: Vector3<f32>, c: Vector3<f32>, _color: [f32; 4]) {
            self.triangles.push((a, b, c));
        }
    }

    #[test]
    fn sphere_emits_expected_triangle_count() {
        let mut renderer = RecordingRenderer { triangles: Vec::new() };
        gather_shape(&Ball::new(1.0), Isometry3::identity(), None, [1.0; 4], &mut renderer);
        // Every (stack, slice) cell emits one triangle, except the poles
        // where one of the two candidate triangles degenerates to a point
        // and is skipped.
        let expected = SPHERE_STACKS * SPHERE_SLICES * 2 - SPHERE_SLICES * 2;
        assert_eq!(renderer.triangles.len(), expected);
    }

    #[test]
    fn cuboid_emits_twelve_triangles() {
        let mut renderer = RecordingRenderer { triangles: Vec::new() };
        gather_shape(
            &Cuboid::new(Vector3::new(1.0, 1.0, 1.0)),
            Isometry3::identity(),
            None,
            [1.0; 4],
            &mut renderer,
        );
        assert_eq!(renderer.triangles.len(), 12);
    }

    #[test]
    fn compound_recurses_into_both_children() {
        let mut renderer = RecordingRenderer { triangles: Vec::new() };
        let compound = Compound::new(vec![
            (Isometry3::translation(1.0, 0.0, 0.0), SharedShape::new(Ball::new(0.5))),
            (Isometry3::translation(-1.0, 0.0, 0.0), SharedShape::new(Cuboid::new(Vector3::new(0.5, 0.5, 0.5)))),
        ]);
        gather_shape(&compound, Isometry3::identity(), None, [1.0; 4], &mut renderer);
        let sphere_triangle_count = SPHERE_STACKS * SPHERE_SLICES * 2 - SPHERE_SLICES * 2;
        assert_eq!(renderer.triangles.len(), sphere_triangle_count + 12);
    }

    #[test]
    fn cylinder_with_caps_emits_four_triangles_per_side() {
        let mut renderer = RecordingRenderer { triangles: Vec::new() };
        gather_cylinder(1.0, 1.0, true, Isometry3::identity(), [1.0; 4], &mut renderer);
        assert_eq!(renderer.triangles.len(), CYLINDER_SIDES * 4);
    }

    #[test]
    fn capsule_includes_both_caps_and_the_body() {
        let mut renderer = RecordingRenderer { triangles: Vec::new() };
        gather_capsule(
            0.5,
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Isometry3::identity(),
            [1.0; 4],
            &mut renderer,
        );
        let hemisphere_triangles = CAPSULE_STACKS * CAPSULE_SLICES * 2;
        let expected = hemisphere_triangles * 2 + CYLINDER_SIDES * 2;
        assert_eq!(renderer.triangles.len(), expected);
    }
}
