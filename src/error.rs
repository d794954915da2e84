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

//! Construction-time configuration errors.
//!
//! Everything reachable from the per-tick hot path or from solver listener
//! callbacks degrades silently to a logged warning and a safe default —
//! those paths never return `Result`. This module covers the one real
//! boundary where a checked error is appropriate: building a
//! [`crate::config::PhysicsWorldConfig`] from data that has not yet been
//! validated.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhysicsConfigError {
    #[error("collision layer {0} is out of range, must be 0..=255")]
    LayerOutOfRange(u32),

    #[error("collision filter table references undefined layer {0}")]
    UndefinedLayer(u8),

    #[error("fixed time step must be positive, got {0}")]
    NonPositiveTimeStep(f32),
}
