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

//! Handles identifying bodies and body-kind-agnostic component references.

use crate::body::BodyKindTag;
use fyrox_core::pool::Handle;

/// A body record, as seen from outside this crate. Internally the registry
/// stores per-kind records in their own pools; `BodyHandle` is the
/// kind-erased identifier handed to callers, carrying `Handle::NONE` as its
/// invalid sentinel.
pub type BodyHandle = Handle<BodyRecordTag>;

/// Marker type used only to parametrize [`BodyHandle`]; no values of this
/// type are ever constructed.
pub struct BodyRecordTag;

/// A scene-graph game object, as seen from outside this crate. Components
/// store one of these as a weak, non-owning reference rather than a pointer
/// to the object itself.
pub type GameObjectHandle = Handle<GameObjectTag>;

/// Marker type used only to parametrize [`GameObjectHandle`].
pub struct GameObjectTag;

/// A handle plus the component kind it refers to, so a listener callback can
/// recover the owning component without a dynamic cast.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExtendedHandle {
    pub handle: BodyHandle,
    pub kind: BodyKindTag,
}

impl ExtendedHandle {
    pub fn new(handle: BodyHandle, kind: BodyKindTag) -> Self {
        Self { handle, kind }
    }
}

/// Canonical, order-independent identifier of a body pair, used as the key
/// into both the body-contact and trigger-contact maps. `key(a, b) == key(b, a)`
/// for all `a`, `b`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactKey(u64);

impl ContactKey {
    pub fn new(a: BodyHandle, b: BodyHandle) -> Self {
        let (lo, hi) = if a.index() <= b.index() {
            (a, b)
        } else {
            (b, a)
        };
        ContactKey(lo.index() as u64 | ((hi.index() as u64) << 32))
    }
}

/// A sorted-on-insert set of body handles, ordered by pool index. `BodyHandle` has no total order of its own, so
/// membership here is keyed on `index()` alone; within one fixed-step tick a
/// handle is never reinserted after being freed, so index collisions across
/// generations do not arise in practice.
#[derive(Clone, Debug, Default)]
pub struct SortedHandleSet(Vec<BodyHandle>);

impl SortedHandleSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, handle: BodyHandle) -> Result<usize, usize> {
        self.0.binary_search_by_key(&handle.index(), |h| h.index())
    }

    /// Inserts `handle`, keeping the set sorted. No-op if already present.
    pub fn insert(&mut self, handle: BodyHandle) {
        if let Err(at) = self.position(handle) {
            self.0.insert(at, handle);
        }
    }

    /// Removes `handle`. No-op if absent.
    pub fn remove(&mut self, handle: BodyHandle) {
        if let Ok(at) = self.position(handle) {
            self.0.remove(at);
        }
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.position(handle).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = BodyHandle> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_ordering_is_symmetric() {
        let a: BodyHandle = Handle::new(3, 1);
        let b: BodyHandle = Handle::new(7, 1);
        assert_eq!(ContactKey::new(a, b), ContactKey::new(b, a));
    }

    #[test]
    fn distinct_pairs_produce_distinct_keys() {
        let a: BodyHandle = Handle::new(1, 1);
        let b: BodyHandle = Handle::new(2, 1);
        let c: BodyHandle = Handle::new(3, 1);
        assert_ne!(ContactKey::new(a, b), ContactKey::new(a, c));
    }

    #[test]
    fn sorted_set_keeps_insertion_order_sorted() {
        let mut set = SortedHandleSet::new();
        let a: BodyHandle = Handle::new(5, 1);
        let b: BodyHandle = Handle::new(1, 1);
        let c: BodyHandle = Handle::new(3, 1);
        set.insert(a);
        set.insert(b);
        set.insert(c);
        assert_eq!(
            set.iter().map(|h| h.index()).collect::<Vec<_>>(),
            vec![1, 3, 5]
        );
        set.remove(b);
        assert!(!set.contains(b));
        assert_eq!(set.len(), 2);
    }
}
