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

//! Physics integration layer: the bridge between a component-based scene
//! graph and a rigid-body solver.
//!
//! This crate owns body lifecycles, scaled collision shapes, per-tick
//! dispatch of forces and impulses, the character-controller update loop,
//! water-volume buoyancy, trigger overlap tracking, and the contact/event
//! pipeline consumed by gameplay callbacks. The underlying solver
//! (`rapier3d`), the component/object framework, and the debug-draw
//! backend are external collaborators reached through the traits in
//! [`external`].

pub mod body;
pub mod character;
pub mod config;
pub mod contacts;
pub mod debug;
pub mod error;
pub mod external;
pub mod filter;
pub mod handle;
pub mod material;
pub mod pipeline;
pub mod query;
pub mod queue;
pub mod shape;
pub mod water;

pub use body::{DynamicBody, HeightFieldBody, StaticBody, Trigger};
pub use character::{CharacterController, CharacterControllerDriver, CharacterShapeType, GroundState};
pub use config::{IntegrationParameters, PhysicsWorldConfig};
pub use error::PhysicsConfigError;
pub use external::{ComponentManager, DebugRenderer, GameObject, GameObjectRegistry, TickScheduler};
pub use filter::{BroadphaseClass, BroadphaseMask, CollisionFilterTable, ObjectLayer};
pub use handle::{BodyHandle, ContactKey, ExtendedHandle};
pub use pipeline::PhysicsWorld;
pub use query::{QueryFilter, RayHit, ShapeCastHit};
pub use shape::{ColliderDesc, ComposedShape, ScalingMode};
pub use water::WaterVolume;

/// Debug console variables, all boolean and defaulting to `false`.
pub mod cvar {
    use std::sync::atomic::{AtomicBool, Ordering};

    macro_rules! cvar {
        ($name:ident) => {
            #[allow(non_upper_case_globals)]
            pub static $name: AtomicBool = AtomicBool::new(false);
        };
    }

    cvar!(com_DrawCollisionModel);
    cvar!(com_DrawCollisionShape);
    cvar!(com_DrawTriggers);
    cvar!(com_DrawCenterOfMass);
    cvar!(com_DrawWaterVolume);
    cvar!(com_DrawCharacterController);

    /// Convenience accessor matching the `Ordering::Relaxed` read used for
    /// debug toggles throughout the engine.
    pub fn get(cvar: &AtomicBool) -> bool {
        cvar.load(Ordering::Relaxed)
    }
}
