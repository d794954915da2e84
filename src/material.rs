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

//! Per-body surface material.

use fyrox_core::reflect::prelude::*;
use fyrox_core::visitor::prelude::*;

/// Rule used to combine two coefficients (friction or restitution) of a
/// contacting pair. The rule actually used for a pair is
/// `max(first.combine_rule, second.combine_rule)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Visit, Reflect, Default)]
#[repr(u32)]
pub enum CoefficientCombineRule {
    #[default]
    Average = 0,
    Min,
    Multiply,
    Max,
}

impl From<CoefficientCombineRule> for rapier3d::dynamics::CoefficientCombineRule {
    fn from(v: CoefficientCombineRule) -> Self {
        match v {
            CoefficientCombineRule::Average => rapier3d::dynamics::CoefficientCombineRule::Average,
            CoefficientCombineRule::Min => rapier3d::dynamics::CoefficientCombineRule::Min,
            CoefficientCombineRule::Multiply => rapier3d::dynamics::CoefficientCombineRule::Multiply,
            CoefficientCombineRule::Max => rapier3d::dynamics::CoefficientCombineRule::Max,
        }
    }
}

/// Friction/restitution pair attached to every body.
#[derive(Copy, Clone, Debug, PartialEq, Visit, Reflect)]
pub struct PhysicsMaterial {
    pub friction: f32,
    pub friction_combine_rule: CoefficientCombineRule,
    pub restitution: f32,
    pub restitution_combine_rule: CoefficientCombineRule,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self {
            friction: 0.5,
            friction_combine_rule: CoefficientCombineRule::Average,
            restitution: 0.0,
            restitution_combine_rule: CoefficientCombineRule::Average,
        }
    }
}
