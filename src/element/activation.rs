//! Activation nonlinearities for neural fields.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::math;

/// Closed set of output nonlinearities, dispatched by match instead of
/// virtual calls.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum ActivationFunction {
    Sigmoid { x_shift: f64, steepness: f64 },
    Heaviside { x_shift: f64 },
}

impl ActivationFunction {
    pub fn apply(&self, activation: &[f64]) -> Vec<f64> {
        match *self {
            ActivationFunction::Sigmoid { x_shift, steepness } => {
                math::sigmoid(activation, steepness, x_shift)
            }
            ActivationFunction::Heaviside { x_shift } => math::heaviside(activation, x_shift),
        }
    }
}

impl Default for ActivationFunction {
    fn default() -> Self {
        ActivationFunction::Sigmoid {
            x_shift: 0.0,
            steepness: 4.0,
        }
    }
}
