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

//! Contracts for the collaborators this layer reaches but does not own:
//! the component/object framework, the tick scheduler, and the debug-draw
//! backend. The rigid-body solver itself is `rapier3d`, used directly.

use crate::handle::{BodyHandle, ExtendedHandle, GameObjectHandle};
use fyrox_core::algebra::{UnitQuaternion, Vector3};

/// Read/write access to a game object's world transform and its event
/// dispatch surface, implemented by the embedding scene graph.
pub trait GameObject {
    fn world_position(&self) -> Vector3<f32>;
    fn set_world_position(&mut self, position: Vector3<f32>);

    fn world_rotation(&self) -> UnitQuaternion<f32>;
    fn set_world_rotation(&mut self, rotation: UnitQuaternion<f32>);

    fn world_scale(&self) -> Vector3<f32>;

    /// Whether the owner's transform may change at runtime (i.e. is itself
    /// driven by something other than this body, such as an animation or a
    /// parent transform). Used to decide Movable-Triggers membership.
    fn is_dynamic(&self) -> bool;

    /// When `true`, the physics layer must not write this object's
    /// transform (it is being driven by gameplay instead, e.g. a kinematic
    /// body or a character controller).
    fn transform_locked(&self) -> bool;
    fn set_transform_locked(&mut self, locked: bool);

    fn on_begin_overlap(&mut self, trigger: ExtendedHandle, target: ExtendedHandle);
    fn on_end_overlap(&mut self, trigger: ExtendedHandle, target: ExtendedHandle);
    fn on_begin_contact(&mut self, event: &crate::contacts::ContactEvent);
    fn on_update_contact(&mut self, event: &crate::contacts::ContactEvent);
    fn on_end_contact(&mut self, event: &crate::contacts::ContactEvent);
}

/// Resolves a weak [`GameObjectHandle`] to the scene-graph node it names,
/// implemented by the embedding scene graph (its `Graph`/`NodePool`
/// equivalent).
pub trait GameObjectRegistry {
    fn get(&self, handle: GameObjectHandle) -> Option<&dyn GameObject>;
    fn get_mut(&mut self, handle: GameObjectHandle) -> Option<&mut dyn GameObject>;
}

/// Component-type lookup and iteration, parametrized over a single
/// component kind. The embedding engine provides one implementation per
/// body kind (`StaticBody`, `DynamicBody`, `Trigger`, `HeightFieldBody`,
/// `CharacterControllerDriver`'s characters, `WaterVolume`).
pub trait ComponentManager<C> {
    fn resolve(&self, handle: BodyHandle) -> Option<&C>;
    fn resolve_mut(&mut self, handle: BodyHandle) -> Option<&mut C>;
    fn iter(&self) -> Box<dyn Iterator<Item = (BodyHandle, &C)> + '_>;
    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = (BodyHandle, &mut C)> + '_>;
}

/// Read-only view of the current fixed-step tick, as exposed by the tick
/// scheduler.
pub trait TickScheduler {
    fn is_paused(&self) -> bool;
    fn fixed_time_step(&self) -> f32;
    fn fixed_frame_num(&self) -> u64;
}

/// A sink for debug wireframe geometry, implemented by the render backend.
pub trait DebugRenderer {
    fn add_line(&mut self, begin: Vector3<f32>, end: Vector3<f32>, color: [f32; 4]);

    fn add_triangle(
        &mut self,
        a: Vector3<f32>,
        b: Vector3<f32>,
        c: Vector3<f32>,
        color: [f32; 4],
    ) {
        self.add_line(a, b, color);
        self.add_line(b, c, color);
        self.add_line(c, a, color);
    }
}
