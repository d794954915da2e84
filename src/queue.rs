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

//! Deferred Body Queue and the non-immediate force/impulse message
//! queue it shares a draining discipline with.

use crate::handle::BodyHandle;
use fyrox_core::algebra::Vector3;

/// Two parallel lists of pending body handles, indexed by whether the body
/// should start active or asleep. Drained once
/// per fixed tick as the first step of the Tick Pipeline; bodies queued
/// during the tick itself are deferred to the next one.
#[derive(Default)]
pub struct DeferredBodyQueue {
    activate: Vec<BodyHandle>,
    sleep: Vec<BodyHandle>,
}

impl DeferredBodyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_active(&mut self, handle: BodyHandle) {
        self.activate.push(handle);
    }

    pub fn push_sleeping(&mut self, handle: BodyHandle) {
        self.sleep.push(handle);
    }

    /// Drains both lists, returning `(activate, sleep)`. The caller inserts
    /// each list into the solver's broadphase in a single batch, per the
    /// two-phase add protocol.
    pub fn drain(&mut self) -> (Vec<BodyHandle>, Vec<BodyHandle>) {
        (
            std::mem::take(&mut self.activate),
            std::mem::take(&mut self.sleep),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.activate.is_empty() && self.sleep.is_empty()
    }
}

/// A non-immediate force/impulse request queued by [`crate::body::DynamicBody`]
/// and applied in a single ordered pass during Tick Pipeline step 7.
#[derive(Copy, Clone, Debug)]
pub enum DynamicBodyMessage {
    AddForce {
        body: BodyHandle,
        force: Vector3<f32>,
    },
    AddForceAtPosition {
        body: BodyHandle,
        force: Vector3<f32>,
        position: Vector3<f32>,
    },
    AddTorque {
        body: BodyHandle,
        torque: Vector3<f32>,
    },
    AddForceAndTorque {
        body: BodyHandle,
        force: Vector3<f32>,
        torque: Vector3<f32>,
    },
    AddImpulse {
        body: BodyHandle,
        impulse: Vector3<f32>,
    },
    AddImpulseAtPosition {
        body: BodyHandle,
        impulse: Vector3<f32>,
        position: Vector3<f32>,
    },
    AddAngularImpulse {
        body: BodyHandle,
        impulse: Vector3<f32>,
    },
}

impl DynamicBodyMessage {
    pub fn target(&self) -> BodyHandle {
        match *self {
            DynamicBodyMessage::AddForce { body, .. }
            | DynamicBodyMessage::AddForceAtPosition { body, .. }
            | DynamicBodyMessage::AddTorque { body, .. }
            | DynamicBodyMessage::AddForceAndTorque { body, .. }
            | DynamicBodyMessage::AddImpulse { body, .. }
            | DynamicBodyMessage::AddImpulseAtPosition { body, .. }
            | DynamicBodyMessage::AddAngularImpulse { body, .. } => body,
        }
    }
}

/// Per-world FIFO of queued [`DynamicBodyMessage`]s, drained once per tick.
#[derive(Default)]
pub struct DynamicMessageQueue {
    messages: Vec<DynamicBodyMessage>,
}

impl DynamicMessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: DynamicBodyMessage) {
        self.messages.push(message);
    }

    /// Drains the queue for the Tick Pipeline's force-dispatch step.
    pub fn drain(&mut self) -> Vec<DynamicBodyMessage> {
        std::mem::take(&mut self.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fyrox_core::pool::Handle;

    #[test]
    fn deferred_queue_defers_bodies_queued_mid_tick() {
        let mut queue = DeferredBodyQueue::new();
        let a: BodyHandle = Handle::new(1, 1);
        queue.push_active(a);
        let (activate, sleep) = queue.drain();
        assert_eq!(activate, vec![a]);
        assert!(sleep.is_empty());
        assert!(queue.is_empty());

        let b: BodyHandle = Handle::new(2, 1);
        queue.push_sleeping(b);
        assert!(!queue.is_empty());
        let (activate, sleep) = queue.drain();
        assert!(activate.is_empty());
        assert_eq!(sleep, vec![b]);
    }

    #[test]
    fn message_queue_drains_in_order() {
        let mut queue = DynamicMessageQueue::new();
        let a: BodyHandle = Handle::new(1, 1);
        queue.push(DynamicBodyMessage::AddForce {
            body: a,
            force: Vector3::new(1.0, 0.0, 0.0),
        });
        queue.push(DynamicBodyMessage::AddImpulse {
            body: a,
            impulse: Vector3::new(0.0, 1.0, 0.0),
        });
        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], DynamicBodyMessage::AddForce { .. }));
        assert!(matches!(drained[1], DynamicBodyMessage::AddImpulse { .. }));
        assert!(queue.drain().is_empty());
    }
}
