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

//! World-level configuration: solver tuning, gravity, and the collision
//! filter table the world is constructed with.

use crate::error::PhysicsConfigError;
use crate::filter::CollisionFilterTable;
use fyrox_core::algebra::Vector3;
use fyrox_core::reflect::prelude::*;
use fyrox_core::visitor::prelude::*;
use std::num::NonZeroUsize;

/// Near one-to-one copy of `rapier3d::dynamics::IntegrationParameters`, kept
/// as its own `Visit`/`Reflect` type so it can be tuned and persisted from an
/// editor the way every other tunable struct in the engine is.
#[derive(Copy, Clone, Visit, Reflect, Debug, PartialEq)]
#[visit(optional)]
pub struct IntegrationParameters {
    /// Overrides the engine-provided fixed time step when set.
    pub dt: Option<f32>,
    #[reflect(min_value = 0.0)]
    pub min_ccd_dt: f32,
    #[reflect(min_value = 0.0)]
    pub contact_damping_ratio: f32,
    #[reflect(min_value = 0.0)]
    pub contact_natural_frequency: f32,
    #[reflect(min_value = 0.0)]
    pub joint_natural_frequency: f32,
    #[reflect(min_value = 0.0)]
    pub joint_damping_ratio: f32,
    pub warmstart_coefficient: f32,
    #[reflect(min_value = 0.0)]
    pub allowed_linear_error: f32,
    #[reflect(min_value = 0.0)]
    pub normalized_max_corrective_velocity: f32,
    #[reflect(min_value = 0.0)]
    pub prediction_distance: f32,
    #[reflect(min_value = 1)]
    pub num_solver_iterations: usize,
    pub num_additional_friction_iterations: usize,
    pub num_internal_pgs_iterations: usize,
    pub min_island_size: u32,
    pub max_ccd_substeps: u32,
    pub length_unit: f32,
    pub num_internal_stabilization_iterations: usize,
}

impl Default for IntegrationParameters {
    fn default() -> Self {
        Self {
            dt: None,
            min_ccd_dt: 1.0 / 60.0 / 100.0,
            contact_damping_ratio: 5.0,
            contact_natural_frequency: 30.0,
            joint_natural_frequency: 1.0e6,
            joint_damping_ratio: 1.0,
            warmstart_coefficient: 1.0,
            allowed_linear_error: 0.002,
            normalized_max_corrective_velocity: 10.0,
            prediction_distance: 0.002,
            num_solver_iterations: 4,
            num_additional_friction_iterations: 4,
            num_internal_pgs_iterations: 1,
            min_island_size: 128,
            max_ccd_substeps: 1,
            length_unit: 1.0,
            num_internal_stabilization_iterations: 2,
        }
    }
}

impl IntegrationParameters {
    /// Converts to the native rapier type, substituting `dt` for
    /// `self.dt` when the world has not been configured with an override.
    pub fn to_native(self, dt: f32) -> rapier3d::dynamics::IntegrationParameters {
        rapier3d::dynamics::IntegrationParameters {
            dt: self.dt.unwrap_or(dt),
            min_ccd_dt: self.min_ccd_dt,
            contact_damping_ratio: self.contact_damping_ratio,
            contact_natural_frequency: self.contact_natural_frequency,
            joint_natural_frequency: self.joint_natural_frequency,
            joint_damping_ratio: self.joint_damping_ratio,
            warmstart_coefficient: self.warmstart_coefficient,
            length_unit: self.length_unit,
            normalized_allowed_linear_error: self.allowed_linear_error,
            normalized_max_corrective_velocity: self.normalized_max_corrective_velocity,
            normalized_prediction_distance: self.prediction_distance,
            num_solver_iterations: NonZeroUsize::new(self.num_solver_iterations.max(1)).unwrap(),
            num_additional_friction_iterations: self.num_additional_friction_iterations,
            num_internal_pgs_iterations: self.num_internal_pgs_iterations,
            num_internal_stabilization_iterations: self.num_internal_stabilization_iterations,
            min_island_size: self.min_island_size as usize,
            max_ccd_substeps: self.max_ccd_substeps as usize,
        }
    }
}

/// Tunables a [`crate::pipeline::PhysicsWorld`] is constructed with. Building
/// one from untrusted data (e.g. a scene file) is the one real boundary in
/// this crate where a checked error makes sense; everything past
/// construction degrades silently instead.
#[derive(Clone, Visit, Reflect, Debug)]
pub struct PhysicsWorldConfig {
    pub gravity: Vector3<f32>,
    pub integration_parameters: IntegrationParameters,
    pub filter_table: CollisionFilterTable,
}

impl Default for PhysicsWorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vector3::new(0.0, -9.81, 0.0),
            integration_parameters: IntegrationParameters::default(),
            filter_table: CollisionFilterTable::new(),
        }
    }
}

impl PhysicsWorldConfig {
    /// Validates layer references and the fixed time step; does not touch
    /// the solver.
    pub fn validate(&self, fixed_time_step: f32, layers_in_use: &[u32]) -> Result<(), PhysicsConfigError> {
        if fixed_time_step <= 0.0 {
            return Err(PhysicsConfigError::NonPositiveTimeStep(fixed_time_step));
        }
        self.filter_table.validate(layers_in_use)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_time_step() {
        let config = PhysicsWorldConfig::default();
        assert!(config.validate(0.0, &[]).is_err());
        assert!(config.validate(-1.0 / 60.0, &[]).is_err());
        assert!(config.validate(1.0 / 60.0, &[]).is_ok());
    }
}
