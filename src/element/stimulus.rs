//! External drive: Gaussian stimuli and per-tick normal noise.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tracing::error;

use crate::element::{component, ElementDimensions};
use crate::math;
use crate::prng::Prng;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaussStimulusParameters {
    pub width: f64,
    pub amplitude: f64,
    /// Centre in physical units; validated against `[0, x_max)` at
    /// construction.
    pub position: f64,
    pub circular: bool,
    pub normalized: bool,
}

impl Default for GaussStimulusParameters {
    fn default() -> Self {
        Self {
            width: 5.0,
            amplitude: 15.0,
            position: 50.0,
            circular: true,
            normalized: false,
        }
    }
}

/// A stationary Gaussian bump, written once at init. Wired inputs are
/// folded in at the same moment, so stimuli can be chained additively.
#[derive(Debug, Clone)]
pub struct GaussStimulus {
    pub params: GaussStimulusParameters,
}

impl GaussStimulus {
    pub fn new(params: GaussStimulusParameters) -> Self {
        Self { params }
    }

    pub(crate) fn init(&mut self, dims: ElementDimensions, components: &mut HashMap<String, Vec<f64>>) {
        let p = self.params;
        let g = if p.circular {
            math::circular_gauss(dims.size, p.width, p.position / dims.d_x)
        } else {
            math::non_circular_gauss(dims.size, p.width, p.position / dims.d_x)
        };

        let mut output = if p.normalized {
            let sum = math::vector_sum(&g);
            if sum == 0.0 {
                error!("cannot normalize a gauss stimulus whose profile sums to zero");
                return;
            }
            g.iter().map(|&v| p.amplitude * v / sum).collect::<Vec<f64>>()
        } else {
            g.iter().map(|&v| p.amplitude * v).collect::<Vec<f64>>()
        };

        if let Some(input) = components.get(component::INPUT) {
            for (o, &i) in output.iter_mut().zip(input) {
                *o += i;
            }
        }
        components.insert(component::OUTPUT.to_string(), output);
    }

    pub(crate) fn step(
        &mut self,
        _dims: ElementDimensions,
        _components: &mut HashMap<String, Vec<f64>>,
        _t: f64,
        _dt: f64,
    ) {
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NormalNoiseParameters {
    pub amplitude: f64,
    /// Fixed seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for NormalNoiseParameters {
    fn default() -> Self {
        Self {
            amplitude: 0.2,
            seed: None,
        }
    }
}

/// White noise scaled for the Euler integration step:
/// `amplitude / sqrt(dt) * N(0, 1)` per sample per tick.
#[derive(Debug, Clone)]
pub struct NormalNoise {
    pub params: NormalNoiseParameters,
    rng: Prng,
}

impl NormalNoise {
    pub fn new(params: NormalNoiseParameters) -> Self {
        let rng = Prng::from_opt(params.seed);
        Self { params, rng }
    }

    pub(crate) fn init(&mut self, _dims: ElementDimensions, components: &mut HashMap<String, Vec<f64>>) {
        // Restart the sequence so repeated runs are identical.
        self.rng = Prng::from_opt(self.params.seed);
        if let Some(output) = components.get_mut(component::OUTPUT) {
            output.iter_mut().for_each(|v| *v = 0.0);
        }
    }

    pub(crate) fn step(
        &mut self,
        dims: ElementDimensions,
        components: &mut HashMap<String, Vec<f64>>,
        _t: f64,
        dt: f64,
    ) {
        let scale = self.params.amplitude / dt.sqrt();
        let output: Vec<f64> = (0..dims.size)
            .map(|_| scale * self.rng.next_gaussian())
            .collect();
        components.insert(component::OUTPUT.to_string(), output);
    }
}
