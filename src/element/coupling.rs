//! Inter-field couplings: projections of one field's activity onto
//! another's input, either through a learned weight matrix or a fixed set
//! of Gaussian point-to-point connections.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tracing::{debug, info, warn};

use crate::element::{component, ElementDimensions};
use crate::math;
use crate::prng::Prng;

/// Online weight-update rules for a learned coupling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LearningRule {
    Hebbian,
    Oja,
    DeltaWidrowHoff,
    DeltaKroghHertz,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldCouplingParameters {
    /// Dimensions of the source field; the coupling's "input" component
    /// lives in this coordinate space.
    pub input_field_dims: ElementDimensions,
    pub learning_rule: LearningRule,
    /// Output gain applied after the projection.
    pub scalar: f64,
    pub learning_rate: f64,
    pub learning_active: bool,
    /// Seed for the initial small random weights.
    pub seed: Option<u64>,
}

impl Default for FieldCouplingParameters {
    fn default() -> Self {
        Self {
            input_field_dims: ElementDimensions::default(),
            learning_rule: LearningRule::Hebbian,
            scalar: 1.0,
            learning_rate: 0.01,
            learning_active: false,
            seed: None,
        }
    }
}

/// Teaching signals handed to a learning coupling by the driver: the
/// current activation of the wired source and destination fields.
#[derive(Debug, Clone)]
pub struct LearningSignals {
    pub input_activation: Vec<f64>,
    pub output_activation: Vec<f64>,
}

/// Learned projection through a dense `input x output` weight matrix.
#[derive(Debug, Clone)]
pub struct FieldCoupling {
    pub params: FieldCouplingParameters,
    weights: Vec<Vec<f64>>,
    weights_path: PathBuf,
    trained: bool,
}

impl FieldCoupling {
    pub fn new(name: &str, params: FieldCouplingParameters, output_size: usize) -> Self {
        let input_size = params.input_field_dims.size;
        let mut rng = Prng::from_opt(params.seed);
        let weights = (0..input_size)
            .map(|_| {
                (0..output_size)
                    .map(|_| rng.gen_range_f64(-0.05, 0.05))
                    .collect()
            })
            .collect();
        let weights_path =
            PathBuf::from("inter-field-synaptic-connections").join(format!("{name}_weights.txt"));
        Self {
            params,
            weights,
            weights_path,
            trained: false,
        }
    }

    pub fn weights(&self) -> &[Vec<f64>] {
        &self.weights
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    pub fn set_weights_path(&mut self, path: impl Into<PathBuf>) {
        self.weights_path = path.into();
    }

    pub fn set_learning(&mut self, active: bool) {
        self.params.learning_active = active;
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        self.params.learning_rate = learning_rate;
    }

    pub(crate) fn init(&mut self, _dims: ElementDimensions, components: &mut HashMap<String, Vec<f64>>) {
        for name in [component::INPUT, component::OUTPUT] {
            if let Some(c) = components.get_mut(name) {
                c.iter_mut().for_each(|v| *v = 0.0);
            }
        }
        if self.read_weights() {
            self.trained = true;
        }
    }

    pub(crate) fn step(
        &mut self,
        _dims: ElementDimensions,
        components: &mut HashMap<String, Vec<f64>>,
        _t: f64,
        _dt: f64,
        learning: Option<LearningSignals>,
    ) {
        // Only the positive part of the source activity projects.
        let input = match components.get_mut(component::INPUT) {
            Some(input) => {
                input.iter_mut().for_each(|v| *v = v.max(0.0));
                input.clone()
            }
            None => return,
        };

        let output_size = self.weights.first().map_or(0, Vec::len);
        let mut output = vec![0.0; output_size];
        for (j, row) in self.weights.iter().enumerate() {
            for (i, &w) in row.iter().enumerate() {
                output[i] += w * input[j];
            }
        }
        for v in &mut output {
            *v = v.max(0.0) * self.params.scalar;
        }
        components.insert(component::OUTPUT.to_string(), output);

        if self.params.learning_active {
            match learning {
                Some(signals) => self.learn(&signals),
                None => debug!("field coupling learning skipped: endpoints not wired"),
            }
        }
    }

    /// Apply the selected rule using the endpoint fields' activations,
    /// brought into a comparable positive range first.
    fn learn(&mut self, signals: &LearningSignals) {
        let input = math::normalize_positive(&signals.input_activation);
        let output = math::normalize_positive(&signals.output_activation);
        if input.len() != self.weights.len()
            || output.len() != self.weights.first().map_or(0, Vec::len)
        {
            debug!("field coupling learning skipped: endpoint sizes do not match the matrix");
            return;
        }
        self.update_weights(&input, &output);
    }

    /// Rule dispatch on pre-normalized vectors. Exposed for callers that
    /// drive training externally.
    pub fn update_weights(&mut self, input: &[f64], output: &[f64]) {
        let lr = self.params.learning_rate;
        match self.params.learning_rule {
            LearningRule::Hebbian => math::hebb_rule(&mut self.weights, input, output, lr),
            LearningRule::Oja => math::oja_rule(&mut self.weights, input, output, lr),
            LearningRule::DeltaWidrowHoff => {
                math::delta_widrow_hoff_rule(&mut self.weights, input, output, lr)
            }
            LearningRule::DeltaKroghHertz => {
                math::delta_krogh_hertz_rule(&mut self.weights, input, output, lr)
            }
        }
    }

    /// Load the persisted matrix. Returns false (keeping the in-memory
    /// matrix untouched) on a missing file, parse failure or dimension
    /// mismatch; none of these are fatal.
    pub fn read_weights(&mut self) -> bool {
        let text = match fs::read_to_string(&self.weights_path) {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    path = %self.weights_path.display(),
                    "failed to read coupling weights: {err}"
                );
                return false;
            }
        };

        let mut values = Vec::new();
        for token in text.split_whitespace() {
            match token.parse::<f64>() {
                Ok(v) => values.push(v),
                Err(_) => {
                    warn!(
                        path = %self.weights_path.display(),
                        "weight file contains a non-numeric entry; keeping current matrix"
                    );
                    return false;
                }
            }
        }

        let rows = self.weights.len();
        let cols = self.weights.first().map_or(0, Vec::len);
        if values.len() != rows * cols {
            warn!(
                path = %self.weights_path.display(),
                expected = rows * cols,
                found = values.len(),
                "weight file dimensionality differs from the matrix; keeping current matrix"
            );
            return false;
        }

        for (j, row) in self.weights.iter_mut().enumerate() {
            row.copy_from_slice(&values[j * cols..(j + 1) * cols]);
        }
        info!(path = %self.weights_path.display(), "coupling weights read");
        true
    }

    /// Persist the matrix: one space-separated row per input index.
    /// Returns false on I/O failure (logged, matrix untouched).
    pub fn write_weights(&self) -> bool {
        if let Some(parent) = self.weights_path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(err) = fs::create_dir_all(parent) {
                    warn!(
                        path = %self.weights_path.display(),
                        "failed to create weight directory: {err}"
                    );
                    return false;
                }
            }
        }

        let mut text = String::new();
        for row in &self.weights {
            let line: Vec<String> = row.iter().map(f64::to_string).collect();
            text.push_str(&line.join(" "));
            text.push('\n');
        }
        match fs::write(&self.weights_path, text) {
            Ok(()) => {
                info!(path = %self.weights_path.display(), "coupling weights written");
                true
            }
            Err(err) => {
                warn!(
                    path = %self.weights_path.display(),
                    "failed to write coupling weights: {err}"
                );
                false
            }
        }
    }

    /// Clear all weights to zero. Usable at any time without re-init.
    pub fn reset_weights(&mut self) {
        for row in &mut self.weights {
            row.iter_mut().for_each(|w| *w = 0.0);
        }
        self.trained = false;
    }
}

/// One fixed Gaussian connection between input coordinate `x_i` and output
/// coordinate `x_j`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaussCoupling {
    pub x_i: f64,
    pub x_j: f64,
    pub amplitude: f64,
    pub width: f64,
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaussFieldCouplingParameters {
    pub input_field_dims: ElementDimensions,
    pub couplings: Vec<GaussCoupling>,
    pub circular: bool,
    pub normalized: bool,
}

/// Fixed (non-learned) projection kernel between two coordinate spaces.
#[derive(Debug, Clone)]
pub struct GaussFieldCoupling {
    pub params: GaussFieldCouplingParameters,
}

impl GaussFieldCoupling {
    pub fn new(params: GaussFieldCouplingParameters) -> Self {
        Self { params }
    }

    pub fn add_coupling(&mut self, coupling: GaussCoupling) {
        self.params.couplings.push(coupling);
    }

    pub(crate) fn init(&mut self, dims: ElementDimensions, components: &mut HashMap<String, Vec<f64>>) {
        for name in [component::INPUT, component::OUTPUT] {
            if let Some(c) = components.get_mut(name) {
                c.iter_mut().for_each(|v| *v = 0.0);
            }
        }

        let rows = components[component::INPUT].len();
        let cols = dims.size;
        let d_x_in = self.params.input_field_dims.d_x;
        let d_x_out = dims.d_x;

        // Materialized purely as an inspection view; the step reads it, but
        // the contract is defined by the couplings list.
        let mut weights = vec![0.0; rows * cols];
        for i in 0..cols {
            for j in 0..rows {
                let mut value = 0.0;
                for coupling in &self.params.couplings {
                    let mut amplitude = coupling.amplitude;
                    if self.params.normalized {
                        amplitude /= (2.0 * std::f64::consts::PI * coupling.width * coupling.width)
                            .sqrt();
                    }
                    let mu_x = coupling.x_i / d_x_in;
                    let mu_y = coupling.x_j / d_x_out;
                    value += if self.params.circular {
                        math::gaussian_2d_periodic(
                            j as f64,
                            i as f64,
                            mu_x,
                            mu_y,
                            coupling.width,
                            amplitude,
                            rows as f64,
                            cols as f64,
                        )
                    } else {
                        math::gaussian_2d(
                            j as f64,
                            i as f64,
                            mu_x,
                            mu_y,
                            coupling.width,
                            coupling.width,
                            amplitude,
                        )
                    };
                }
                weights[j * cols + i] = value;
            }
        }
        components.insert(component::WEIGHTS.to_string(), weights);
    }

    pub(crate) fn step(
        &mut self,
        dims: ElementDimensions,
        components: &mut HashMap<String, Vec<f64>>,
        _t: f64,
        _dt: f64,
    ) {
        let input = &components[component::INPUT];
        let weights = &components[component::WEIGHTS];
        let cols = dims.size;

        let mut output = vec![0.0; cols];
        for (j, &in_j) in input.iter().enumerate() {
            for (i, o) in output.iter_mut().enumerate() {
                *o += weights[j * cols + i] * in_j;
            }
        }
        components.insert(component::OUTPUT.to_string(), output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{component, Element, ElementDimensions};

    fn coupling_element(rule: LearningRule, learning_active: bool) -> Element {
        let params = FieldCouplingParameters {
            input_field_dims: ElementDimensions::new(3, 1.0),
            learning_rule: rule,
            scalar: 2.0,
            learning_rate: 0.1,
            learning_active,
            seed: Some(9),
        };
        Element::field_coupling("coupling", ElementDimensions::new(2, 1.0), params).unwrap()
    }

    #[test]
    fn output_is_rectified_scaled_projection() {
        let mut el = coupling_element(LearningRule::Hebbian, false);
        {
            let fc = el.as_field_coupling_mut().unwrap();
            fc.reset_weights();
            fc.weights[0][0] = 1.0;
            fc.weights[2][1] = -3.0;
            fc.weights[2][0] = 0.5;
        }
        el.set_input(vec![1.0, 0.0, 2.0]);
        el.step(0.0, 1.0, None);

        let output = el.get_component(component::OUTPUT).unwrap();
        // out[0] = 1*1 + 0.5*2 = 2, scaled by 2; out[1] rectifies to 0.
        assert!((output[0] - 4.0).abs() < 1e-12);
        assert_eq!(output[1], 0.0);
    }

    #[test]
    fn negative_input_is_rectified_before_projecting() {
        let mut el = coupling_element(LearningRule::Hebbian, false);
        {
            let fc = el.as_field_coupling_mut().unwrap();
            fc.reset_weights();
            fc.weights[1][0] = 1.0;
        }
        el.set_input(vec![0.0, -5.0, 0.0]);
        el.step(0.0, 1.0, None);
        assert_eq!(el.get_component(component::OUTPUT).unwrap()[0], 0.0);
    }

    #[test]
    fn hebbian_step_learns_from_endpoint_activations() {
        let mut el = coupling_element(LearningRule::Hebbian, true);
        el.as_field_coupling_mut().unwrap().reset_weights();

        let signals = LearningSignals {
            input_activation: vec![0.0, 1.0, 2.0],
            output_activation: vec![1.0, 3.0],
        };
        el.set_input(vec![0.0; 3]);
        el.step(0.0, 1.0, Some(signals));

        // Normalized signals: input [0, .5, 1], output [0, 1].
        let fc = el.as_field_coupling().unwrap();
        assert!((fc.weights[2][1] - 0.1).abs() < 1e-12);
        assert!((fc.weights[1][1] - 0.05).abs() < 1e-12);
        assert_eq!(fc.weights[0][0], 0.0);
    }

    #[test]
    fn learning_requires_signals_and_the_active_flag() {
        let mut el = coupling_element(LearningRule::Hebbian, true);
        el.as_field_coupling_mut().unwrap().reset_weights();
        el.set_input(vec![1.0; 3]);
        el.step(0.0, 1.0, None);
        assert!(el
            .as_field_coupling()
            .unwrap()
            .weights
            .iter()
            .flatten()
            .all(|&w| w == 0.0));

        let mut el = coupling_element(LearningRule::Hebbian, false);
        el.as_field_coupling_mut().unwrap().reset_weights();
        let signals = LearningSignals {
            input_activation: vec![1.0, 2.0, 3.0],
            output_activation: vec![1.0, 2.0],
        };
        el.set_input(vec![1.0; 3]);
        el.step(0.0, 1.0, Some(signals));
        assert!(el
            .as_field_coupling()
            .unwrap()
            .weights
            .iter()
            .flatten()
            .all(|&w| w == 0.0));
    }

    #[test]
    fn weight_file_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "neurofield_weights_rt_{}.txt",
            std::process::id()
        ));

        let mut el = coupling_element(LearningRule::Hebbian, false);
        {
            let fc = el.as_field_coupling_mut().unwrap();
            fc.set_weights_path(&path);
            fc.reset_weights();
            fc.weights[1][1] = 0.25;
            fc.weights[2][0] = -1.5;
            assert!(fc.write_weights());

            fc.reset_weights();
            assert!(fc.read_weights());
            assert_eq!(fc.weights[1][1], 0.25);
            assert_eq!(fc.weights[2][0], -1.5);
        }
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn mismatched_weight_file_keeps_the_matrix() {
        let path = std::env::temp_dir().join(format!(
            "neurofield_weights_mismatch_{}.txt",
            std::process::id()
        ));
        std::fs::write(&path, "0.1 0.2 0.3\n").unwrap();

        let mut el = coupling_element(LearningRule::Hebbian, false);
        let fc = el.as_field_coupling_mut().unwrap();
        fc.set_weights_path(&path);
        fc.reset_weights();
        fc.weights[0][0] = 7.0;
        assert!(!fc.read_weights());
        assert_eq!(fc.weights[0][0], 7.0);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_weight_file_is_not_fatal() {
        let mut el = coupling_element(LearningRule::Hebbian, false);
        let fc = el.as_field_coupling_mut().unwrap();
        fc.set_weights_path("/nonexistent/neurofield/weights.txt");
        assert!(!fc.read_weights());
        assert!(!fc.is_trained());
    }

    #[test]
    fn gauss_field_coupling_projects_to_the_target_coordinate() {
        let params = GaussFieldCouplingParameters {
            input_field_dims: ElementDimensions::new(20, 1.0),
            couplings: vec![GaussCoupling {
                x_i: 10.0,
                x_j: 5.0,
                amplitude: 2.0,
                width: 2.0,
            }],
            circular: false,
            normalized: false,
        };
        let mut el =
            Element::gauss_field_coupling("gfc", ElementDimensions::new(20, 1.0), params).unwrap();
        el.init();

        let mut input = vec![0.0; 20];
        input[10] = 1.0;
        el.set_input(input);
        el.step(0.0, 1.0, None);

        let output = el.get_component(component::OUTPUT).unwrap();
        let peak = output
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 5);
        assert!((output[5] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn periodic_coupling_wraps_across_the_edge() {
        let params = GaussFieldCouplingParameters {
            input_field_dims: ElementDimensions::new(20, 1.0),
            couplings: vec![GaussCoupling {
                x_i: 0.0,
                x_j: 19.0,
                amplitude: 1.0,
                width: 1.5,
            }],
            circular: true,
            normalized: false,
        };
        let mut el =
            Element::gauss_field_coupling("gfc", ElementDimensions::new(20, 1.0), params).unwrap();
        el.init();

        let mut input = vec![0.0; 20];
        input[0] = 1.0;
        el.set_input(input);
        el.step(0.0, 1.0, None);

        let output = el.get_component(component::OUTPUT).unwrap();
        // Output coordinate 0 is one step around the ring from 19.
        assert!(output[0] > output[10]);
    }
}
