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

//! Collision layers, broadphase classes, and the object-layer filter table.
//!
//! Bodies carry an 8-bit collision layer and a broadphase class. Both are
//! packed into rapier's 32-bit `u32` collision-group "memberships"/"filter"
//! fields via [`encode_object_layer`], using the following layout:
//!
//! | Bit range | Field              |
//! |-----------|--------------------|
//! | 0..7      | collision layer    |
//! | 8..15     | broadphase class   |

use crate::error::PhysicsConfigError;
use bitflags::bitflags;
use fyrox_core::reflect::prelude::*;
use fyrox_core::visitor::prelude::*;

/// Coarse bucket used by the solver's spatial index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Visit, Reflect, Default)]
#[repr(u8)]
pub enum BroadphaseClass {
    #[default]
    Static = 0,
    Dynamic = 1,
    Trigger = 2,
    Character = 3,
}

impl BroadphaseClass {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => BroadphaseClass::Static,
            1 => BroadphaseClass::Dynamic,
            2 => BroadphaseClass::Trigger,
            3 => BroadphaseClass::Character,
            _ => return None,
        })
    }
}

bitflags! {
    /// A bitset of [`BroadphaseClass`] values, used to restrict queries and
    /// the character controller's extended update to particular buckets.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct BroadphaseMask: u32 {
        const STATIC = 1 << 0;
        const DYNAMIC = 1 << 1;
        const TRIGGER = 1 << 2;
        const CHARACTER = 1 << 3;
        const ALL = Self::STATIC.bits() | Self::DYNAMIC.bits() | Self::TRIGGER.bits() | Self::CHARACTER.bits();
    }
}

impl BroadphaseMask {
    pub fn contains_class(&self, class: BroadphaseClass) -> bool {
        let bit = match class {
            BroadphaseClass::Static => Self::STATIC,
            BroadphaseClass::Dynamic => Self::DYNAMIC,
            BroadphaseClass::Trigger => Self::TRIGGER,
            BroadphaseClass::Character => Self::CHARACTER,
        };
        self.contains(bit)
    }
}

/// An 8-bit collision layer tag.
pub type ObjectLayer = u8;

/// Packs a collision layer and broadphase class into the `object layer`
/// field persisted on each body, per the wire format above.
pub fn encode_object_layer(layer: ObjectLayer, class: BroadphaseClass) -> u32 {
    (layer as u32) | ((class as u32) << 8)
}

/// Unpacks an encoded object layer back into its layer and broadphase class.
pub fn decode_object_layer(encoded: u32) -> (ObjectLayer, BroadphaseClass) {
    let layer = (encoded & 0xFF) as u8;
    let class = BroadphaseClass::from_u8(((encoded >> 8) & 0xFF) as u8).unwrap_or(BroadphaseClass::Static);
    (layer, class)
}

/// Symmetric 256x256 compatibility table between collision layers, queried
/// by the solver's collision-group filter before any narrow-phase work runs
/// on a pair.
#[derive(Clone, Visit, Reflect)]
pub struct CollisionFilterTable {
    // Row-major upper triangle stored as a flat bitset; `rows[a]` holds a
    // 256-bit mask of layers compatible with layer `a`. Stored as plain
    // `u64` quadruplets rather than a bitflags type so the whole table
    // round-trips through the visitor as a flat array of integers.
    #[visit(skip)]
    #[reflect(hidden)]
    rows: Vec<[u64; 4]>,
}

impl Default for CollisionFilterTable {
    /// All layers collide with all layers by default.
    fn default() -> Self {
        Self {
            rows: vec![[u64::MAX; 4]; 256],
        }
    }
}

impl CollisionFilterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether layers `a` and `b` may collide with each other. The
    /// relation is symmetric.
    pub fn set(&mut self, a: ObjectLayer, b: ObjectLayer, enabled: bool) {
        Self::set_bit(&mut self.rows[a as usize], b, enabled);
        Self::set_bit(&mut self.rows[b as usize], a, enabled);
    }

    pub fn can_collide(&self, a: ObjectLayer, b: ObjectLayer) -> bool {
        let word = self.rows[a as usize][(b / 64) as usize];
        (word >> (b % 64)) & 1 != 0
    }

    fn set_bit(row: &mut [u64; 4], index: u8, enabled: bool) {
        let word = &mut row[(index / 64) as usize];
        let bit = 1u64 << (index % 64);
        if enabled {
            *word |= bit;
        } else {
            *word &= !bit;
        }
    }

    /// Validates that every layer referenced by `layers_in_use` is within
    /// range; collision layers are always in range because they are `u8`,
    /// but this mirrors the construction-time validation the config loader
    /// performs for data read from an untrusted source (e.g. a scene file).
    pub fn validate(&self, layers_in_use: &[u32]) -> Result<(), PhysicsConfigError> {
        for &layer in layers_in_use {
            if layer > 255 {
                return Err(PhysicsConfigError::LayerOutOfRange(layer));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_layer_round_trips() {
        let encoded = encode_object_layer(42, BroadphaseClass::Trigger);
        let (layer, class) = decode_object_layer(encoded);
        assert_eq!(layer, 42);
        assert_eq!(class, BroadphaseClass::Trigger);
    }

    #[test]
    fn filter_table_is_symmetric() {
        let mut table = CollisionFilterTable::new();
        table.set(1, 2, false);
        assert!(!table.can_collide(1, 2));
        assert!(!table.can_collide(2, 1));
        assert!(table.can_collide(1, 3));
    }
}
