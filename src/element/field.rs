//! Neural fields: 1-D activation fields integrating the Amari field
//! equation under forward Euler, with bump segmentation and a cheap
//! steady-state detector.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::element::activation::ActivationFunction;
use crate::element::{component, ElementDimensions};
use crate::math;

/// Activation above this counts as part of a bump.
const BUMP_THRESHOLD: f64 = 1e-5;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NeuralFieldParameters {
    /// Time constant of the field equation; must be positive.
    pub tau: f64,
    pub starting_resting_level: f64,
    pub activation_function: ActivationFunction,
}

impl Default for NeuralFieldParameters {
    fn default() -> Self {
        Self {
            tau: 25.0,
            starting_resting_level: -5.0,
            activation_function: ActivationFunction::default(),
        }
    }
}

/// A contiguous supra-threshold region of the activation profile.
/// Positions and width are in physical units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bump {
    pub centroid: f64,
    pub start_position: f64,
    pub end_position: f64,
    pub amplitude: f64,
    pub width: f64,
}

/// Per-tick field metrics. Transient; rebuilt every step, zeroed on close.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NeuralFieldState {
    pub stable: bool,
    pub lowest_activation: f64,
    pub highest_activation: f64,
    pub bumps: Vec<Bump>,
    pub threshold_for_stability: f64,
    previous_sum: f64,
    previous_avg: f64,
    previous_norm: f64,
}

impl Default for NeuralFieldState {
    fn default() -> Self {
        Self {
            stable: false,
            lowest_activation: 0.0,
            highest_activation: 0.0,
            bumps: Vec::new(),
            threshold_for_stability: 0.035,
            previous_sum: 0.0,
            previous_avg: 0.0,
            previous_norm: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NeuralField {
    pub params: NeuralFieldParameters,
    pub state: NeuralFieldState,
}

impl NeuralField {
    pub fn new(params: NeuralFieldParameters) -> Self {
        Self {
            params,
            state: NeuralFieldState::default(),
        }
    }

    pub fn is_stable(&self) -> bool {
        self.state.stable
    }

    pub(crate) fn init(&mut self, _dims: ElementDimensions, components: &mut HashMap<String, Vec<f64>>) {
        // The activation profile deliberately survives re-init; only the
        // resting level and derived output are rebuilt.
        if let Some(resting) = components.get_mut(component::RESTING_LEVEL) {
            resting
                .iter_mut()
                .for_each(|v| *v = self.params.starting_resting_level);
        }
        self.state = NeuralFieldState {
            threshold_for_stability: self.state.threshold_for_stability,
            ..NeuralFieldState::default()
        };
        self.calculate_output(components);
    }

    pub(crate) fn step(
        &mut self,
        dims: ElementDimensions,
        components: &mut HashMap<String, Vec<f64>>,
        _t: f64,
        dt: f64,
    ) {
        self.calculate_activation(components, dt);
        self.calculate_output(components);
        self.update_state(dims, components);
    }

    /// Forward Euler on `tau * da/dt = -a + resting + input`.
    fn calculate_activation(&mut self, components: &mut HashMap<String, Vec<f64>>, dt: f64) {
        let mut activation = components
            .remove(component::ACTIVATION)
            .unwrap_or_default();
        {
            let resting = &components[component::RESTING_LEVEL];
            let input = &components[component::INPUT];
            let rate = dt / self.params.tau;
            for ((a, &r), &u) in activation.iter_mut().zip(resting).zip(input) {
                *a += rate * (-*a + r + u);
            }
        }
        components.insert(component::ACTIVATION.to_string(), activation);
    }

    fn calculate_output(&mut self, components: &mut HashMap<String, Vec<f64>>) {
        let output = self
            .params
            .activation_function
            .apply(&components[component::ACTIVATION]);
        components.insert(component::OUTPUT.to_string(), output);
    }

    fn update_state(&mut self, dims: ElementDimensions, components: &HashMap<String, Vec<f64>>) {
        let activation = &components[component::ACTIVATION];
        self.update_min_max(activation);
        self.update_bumps(dims, activation);
        self.check_stability(activation);
    }

    fn update_min_max(&mut self, activation: &[f64]) {
        if activation.is_empty() {
            return;
        }
        self.state.lowest_activation = activation.iter().cloned().fold(f64::INFINITY, f64::min);
        self.state.highest_activation =
            activation.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    }

    /// Left-to-right scan for contiguous supra-threshold runs. When both
    /// edge samples are supra-threshold the first and last bump are merged
    /// into one wrap-around bump — unconditionally, whether or not the
    /// field's interactions are circular (kept from the reference model).
    fn update_bumps(&mut self, dims: ElementDimensions, activation: &[f64]) {
        self.state.bumps.clear();
        let d_x = dims.d_x;
        let mut in_bump = false;
        let mut current = Bump::default();

        for (i, &a) in activation.iter().enumerate() {
            if a > BUMP_THRESHOLD {
                if in_bump {
                    current.amplitude = current.amplitude.max(a);
                } else {
                    in_bump = true;
                    current = Bump {
                        start_position: (i + 1) as f64 * d_x,
                        amplitude: a,
                        ..Bump::default()
                    };
                }
            } else if in_bump {
                current.end_position = i as f64 * d_x;
                current.width = current.end_position - current.start_position;
                current.centroid = (current.start_position + current.end_position) / 2.0;
                self.state.bumps.push(current);
                in_bump = false;
            }
        }
        if in_bump {
            // Run still open at the right edge.
            current.end_position = activation.len() as f64 * d_x;
            current.width = current.end_position - current.start_position;
            current.centroid = (current.start_position + current.end_position) / 2.0;
            self.state.bumps.push(current);
        }

        let edges_active = activation.first().is_some_and(|&a| a > BUMP_THRESHOLD)
            && activation.last().is_some_and(|&a| a > BUMP_THRESHOLD);
        if edges_active && self.state.bumps.len() >= 2 {
            let first = self.state.bumps[0];
            let last = self.state.bumps[self.state.bumps.len() - 1];
            let x_max = dims.x_max as f64;
            let merged = Bump {
                start_position: last.start_position,
                end_position: first.end_position,
                amplitude: first.amplitude.max(last.amplitude),
                width: x_max - (last.start_position - first.end_position),
                centroid: ((last.start_position + first.end_position + x_max) / 2.0) % x_max,
            };
            self.state.bumps.pop();
            self.state.bumps.remove(0);
            self.state.bumps.push(merged);
        }
    }

    /// Steady-state proxy: sum, average and L2 norm of the activation must
    /// all sit within the stability threshold of last tick's values. Cheaper
    /// than comparing the full profile, and good enough for the UI-facing
    /// flag this feeds.
    fn check_stability(&mut self, activation: &[f64]) {
        let sum = math::vector_sum(activation);
        let avg = math::vector_avg(activation);
        let norm = math::vector_norm(activation);

        let s = &mut self.state;
        s.stable = (sum - s.previous_sum).abs() < s.threshold_for_stability
            && (avg - s.previous_avg).abs() < s.threshold_for_stability
            && (norm - s.previous_norm).abs() < s.threshold_for_stability;
        s.previous_sum = sum;
        s.previous_avg = avg;
        s.previous_norm = norm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{component, Element, ElementDimensions};

    fn field(tau: f64, resting: f64) -> Element {
        let params = NeuralFieldParameters {
            tau,
            starting_resting_level: resting,
            activation_function: ActivationFunction::Heaviside { x_shift: 0.0 },
        };
        let mut el =
            Element::neural_field("field", ElementDimensions::new(50, 1.0), params).unwrap();
        el.init();
        el
    }

    #[test]
    fn zero_input_converges_to_resting_level() {
        let mut el = field(20.0, -5.0);
        let mut previous = el.get_component(component::ACTIVATION).unwrap()[0];

        for _ in 0..2000 {
            el.step(0.0, 1.0, None);
            let a = el.get_component(component::ACTIVATION).unwrap()[0];
            assert!(a <= previous, "decay toward the resting level is monotone");
            previous = a;
        }
        assert!((previous - -5.0).abs() < 1e-3);
    }

    #[test]
    fn single_gaussian_bump_is_segmented_once() {
        let mut el = field(20.0, -5.0);

        // One Euler step with dt == tau writes resting + input into the
        // activation directly.
        let input: Vec<f64> = (0..50)
            .map(|i| {
                let d = i as f64 - 24.0;
                20.0 * (-0.5 * d * d / 9.0).exp()
            })
            .collect();
        el.set_input(input);
        el.step(0.0, 20.0, None);

        let state = el.as_neural_field().unwrap().state.clone();
        assert_eq!(state.bumps.len(), 1);
        let bump = &state.bumps[0];
        assert!((bump.amplitude - 15.0).abs() < 1e-9);
        // Peak injected at sample 24 -> position 25 in physical units.
        assert!((bump.centroid - 25.0).abs() <= 1.0);
        assert!(bump.width > 0.0);
    }

    #[test]
    fn edge_bumps_merge_into_one_wraparound_bump() {
        let mut el = field(20.0, -5.0);

        let mut input = vec![0.0; 50];
        for i in [0usize, 1, 48, 49] {
            input[i] = 10.0;
        }
        el.set_input(input);
        el.step(0.0, 20.0, None);

        let state = &el.as_neural_field().unwrap().state;
        assert_eq!(state.bumps.len(), 1, "edge bumps must merge");
        let bump = &state.bumps[0];
        assert!((bump.amplitude - 5.0).abs() < 1e-9);
        // Start sits at the right edge run, end at the left edge run.
        assert!(bump.start_position > bump.end_position);
    }

    #[test]
    fn fully_active_field_reports_a_single_unmerged_bump() {
        let mut el = field(20.0, -5.0);
        el.set_input(vec![10.0; 50]);
        el.step(0.0, 20.0, None);
        assert_eq!(el.as_neural_field().unwrap().state.bumps.len(), 1);
    }

    #[test]
    fn stability_flag_raises_once_the_profile_settles() {
        let mut el = field(10.0, -2.0);
        assert!(!el.as_neural_field().unwrap().is_stable());

        for _ in 0..500 {
            el.set_input(vec![0.0; 50]);
            el.step(0.0, 1.0, None);
        }
        assert!(el.as_neural_field().unwrap().is_stable());
    }

    #[test]
    fn output_applies_the_activation_function() {
        let mut el = field(20.0, -5.0);
        let mut input = vec![0.0; 50];
        input[10] = 20.0;
        el.set_input(input);
        el.step(0.0, 20.0, None);

        let output = el.get_component(component::OUTPUT).unwrap();
        assert_eq!(output[10], 1.0);
        assert_eq!(output[0], 0.0);
    }
}
