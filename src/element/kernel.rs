//! Interaction kernels: truncated spatial profiles convolved with a field's
//! output to produce lateral or inter-field interaction.
//!
//! All five kinds share the same machinery: `init()` computes the truncated
//! kernel range from the kind's width, builds the circular extended index if
//! needed and discretizes the profile over `[-left ..= right]`; `step()`
//! convolves the summed input with the stored profile and adds the global
//! term `amplitude_global * full_sum`.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::element::{component, ElementDimensions};
use crate::math;

/// Truncation multiplier on the kernel width; profiles are cut off at
/// `ceil(width * cut_off_factor)` samples per side.
pub const DEFAULT_CUT_OFF_FACTOR: f64 = 5.0;

/// Convolution bookkeeping shared by every kernel kind.
///
/// `ext_index` is only populated for circular kernels and is rebuilt on
/// `init()`, never per step.
#[derive(Debug, Clone)]
pub struct KernelGeometry {
    pub kernel_range: [usize; 2],
    pub ext_index: Vec<usize>,
    pub cut_off_factor: f64,
    pub full_sum: f64,
}

impl Default for KernelGeometry {
    fn default() -> Self {
        Self {
            kernel_range: [0, 0],
            ext_index: Vec::new(),
            cut_off_factor: DEFAULT_CUT_OFF_FACTOR,
            full_sum: 0.0,
        }
    }
}

impl KernelGeometry {
    /// Recompute range and extension for the given width, returning the
    /// symmetric sample range the profile is evaluated over.
    fn rebuild(&mut self, width: f64, circular: bool, dims: ElementDimensions) -> Vec<i64> {
        self.kernel_range =
            math::compute_kernel_range(width, self.cut_off_factor, dims.size, circular);
        self.ext_index = if circular {
            math::create_extended_index(dims.size, self.kernel_range)
        } else {
            Vec::new()
        };
        self.full_sum = 0.0;
        (-(self.kernel_range[0] as i64)..=self.kernel_range[1] as i64).collect()
    }

    /// Shared hot path: total input mass, gather-if-circular, convolve,
    /// project with the constant global term.
    fn convolve(
        &mut self,
        components: &mut HashMap<String, Vec<f64>>,
        circular: bool,
        amplitude_global: f64,
    ) {
        let input = &components[component::INPUT];
        self.full_sum = math::vector_sum(input);

        let kernel = &components[component::KERNEL];
        let convolution = if circular {
            math::conv_valid(&math::gather(&self.ext_index, input), kernel)
        } else {
            math::conv_same(input, kernel)
        };

        let full_sum = self.full_sum;
        let output: Vec<f64> = convolution
            .iter()
            .map(|&c| c + amplitude_global * full_sum)
            .collect();
        components.insert(component::OUTPUT.to_string(), output);
    }

    fn store_profile(&self, components: &mut HashMap<String, Vec<f64>>, profile: Vec<f64>) {
        components.insert(component::KERNEL.to_string(), profile);
        if let Some(input) = components.get_mut(component::INPUT) {
            input.iter_mut().for_each(|v| *v = 0.0);
        }
        if let Some(output) = components.get_mut(component::OUTPUT) {
            output.iter_mut().for_each(|v| *v = 0.0);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaussKernelParameters {
    pub width: f64,
    pub amplitude: f64,
    pub amplitude_global: f64,
    pub circular: bool,
    pub normalized: bool,
}

impl Default for GaussKernelParameters {
    fn default() -> Self {
        Self {
            width: 5.0,
            amplitude: 10.0,
            amplitude_global: 0.0,
            circular: true,
            normalized: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GaussKernel {
    pub params: GaussKernelParameters,
    pub geometry: KernelGeometry,
}

impl GaussKernel {
    pub fn new(params: GaussKernelParameters) -> Self {
        Self {
            params,
            geometry: KernelGeometry::default(),
        }
    }

    pub(crate) fn init(&mut self, dims: ElementDimensions, components: &mut HashMap<String, Vec<f64>>) {
        let range_x = self
            .geometry
            .rebuild(self.params.width, self.params.circular, dims);
        let g = if self.params.normalized {
            math::gauss_norm(&range_x, 0.0, self.params.width)
        } else {
            math::gauss(&range_x, 0.0, self.params.width)
        };
        let profile = g.iter().map(|&v| self.params.amplitude * v).collect();
        self.geometry.store_profile(components, profile);
    }

    pub(crate) fn step(
        &mut self,
        _dims: ElementDimensions,
        components: &mut HashMap<String, Vec<f64>>,
        _t: f64,
        _dt: f64,
    ) {
        self.geometry
            .convolve(components, self.params.circular, self.params.amplitude_global);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MexicanHatKernelParameters {
    pub width_exc: f64,
    pub amplitude_exc: f64,
    pub width_inh: f64,
    pub amplitude_inh: f64,
    pub amplitude_global: f64,
    pub circular: bool,
    pub normalized: bool,
}

impl Default for MexicanHatKernelParameters {
    fn default() -> Self {
        Self {
            width_exc: 5.0,
            amplitude_exc: 15.0,
            width_inh: 10.0,
            amplitude_inh: 15.0,
            amplitude_global: 0.0,
            circular: true,
            normalized: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MexicanHatKernel {
    pub params: MexicanHatKernelParameters,
    pub geometry: KernelGeometry,
}

impl MexicanHatKernel {
    pub fn new(params: MexicanHatKernelParameters) -> Self {
        Self {
            params,
            geometry: KernelGeometry::default(),
        }
    }

    pub(crate) fn init(&mut self, dims: ElementDimensions, components: &mut HashMap<String, Vec<f64>>) {
        let p = self.params;
        let profile = difference_of_gaussians(&mut self.geometry, dims, &p);
        self.geometry.store_profile(components, profile);
    }

    pub(crate) fn step(
        &mut self,
        _dims: ElementDimensions,
        components: &mut HashMap<String, Vec<f64>>,
        _t: f64,
        _dt: f64,
    ) {
        self.geometry
            .convolve(components, self.params.circular, self.params.amplitude_global);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LateralInteractionsParameters {
    pub width_exc: f64,
    pub amplitude_exc: f64,
    pub width_inh: f64,
    pub amplitude_inh: f64,
    pub amplitude_global: f64,
    pub circular: bool,
    pub normalized: bool,
}

impl Default for LateralInteractionsParameters {
    fn default() -> Self {
        Self {
            width_exc: 5.3,
            amplitude_exc: 6.0,
            width_inh: 7.4,
            amplitude_inh: 6.0,
            amplitude_global: -0.55,
            circular: true,
            normalized: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LateralInteractions {
    pub params: LateralInteractionsParameters,
    pub geometry: KernelGeometry,
}

impl LateralInteractions {
    pub fn new(params: LateralInteractionsParameters) -> Self {
        Self {
            params,
            geometry: KernelGeometry::default(),
        }
    }

    pub(crate) fn init(&mut self, dims: ElementDimensions, components: &mut HashMap<String, Vec<f64>>) {
        let p = MexicanHatKernelParameters {
            width_exc: self.params.width_exc,
            amplitude_exc: self.params.amplitude_exc,
            width_inh: self.params.width_inh,
            amplitude_inh: self.params.amplitude_inh,
            amplitude_global: self.params.amplitude_global,
            circular: self.params.circular,
            normalized: self.params.normalized,
        };
        let profile = difference_of_gaussians(&mut self.geometry, dims, &p);
        self.geometry.store_profile(components, profile);
    }

    pub(crate) fn step(
        &mut self,
        _dims: ElementDimensions,
        components: &mut HashMap<String, Vec<f64>>,
        _t: f64,
        _dt: f64,
    ) {
        self.geometry
            .convolve(components, self.params.circular, self.params.amplitude_global);
    }
}

/// Excitatory-minus-inhibitory Gaussian profile, ranged by the widest term
/// with a nonzero amplitude.
fn difference_of_gaussians(
    geometry: &mut KernelGeometry,
    dims: ElementDimensions,
    p: &MexicanHatKernelParameters,
) -> Vec<f64> {
    let exc = if p.amplitude_exc != 0.0 { p.width_exc } else { 0.0 };
    let inh = if p.amplitude_inh != 0.0 { p.width_inh } else { 0.0 };
    let range_x = geometry.rebuild(exc.max(inh), p.circular, dims);

    let (gauss_exc, gauss_inh) = if p.normalized {
        (
            math::gauss_norm(&range_x, 0.0, p.width_exc),
            math::gauss_norm(&range_x, 0.0, p.width_inh),
        )
    } else {
        (
            math::gauss(&range_x, 0.0, p.width_exc),
            math::gauss(&range_x, 0.0, p.width_inh),
        )
    };

    gauss_exc
        .iter()
        .zip(&gauss_inh)
        .map(|(&e, &i)| p.amplitude_exc * e - p.amplitude_inh * i)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OscillatoryKernelParameters {
    pub amplitude: f64,
    /// Exponential envelope decay rate; the effective support is `1/decay`.
    pub decay: f64,
    /// Oscillation frequency factor in [0, 1]; the phase is
    /// `zero_crossings * pi * x`.
    pub zero_crossings: f64,
    pub amplitude_global: f64,
    pub circular: bool,
    pub normalized: bool,
}

impl Default for OscillatoryKernelParameters {
    fn default() -> Self {
        Self {
            amplitude: 3.0,
            decay: 0.8,
            zero_crossings: 1.0,
            amplitude_global: -0.01,
            circular: true,
            normalized: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OscillatoryKernel {
    pub params: OscillatoryKernelParameters,
    pub geometry: KernelGeometry,
}

impl OscillatoryKernel {
    pub fn new(params: OscillatoryKernelParameters) -> Self {
        Self {
            params,
            geometry: KernelGeometry::default(),
        }
    }

    pub(crate) fn init(&mut self, dims: ElementDimensions, components: &mut HashMap<String, Vec<f64>>) {
        self.params.zero_crossings = self.params.zero_crossings.clamp(0.0, 1.0);
        let p = self.params;

        let support = if p.decay > 0.0 { 1.0 / p.decay } else { 0.0 };
        let range_x = self.geometry.rebuild(support, p.circular, dims);

        let alpha = p.zero_crossings * std::f64::consts::PI;
        let mut profile: Vec<f64> = range_x
            .iter()
            .map(|&x| {
                let x = x as f64;
                let envelope = (-p.decay * x.abs()).exp();
                let oscillation = (alpha * x).sin() + (alpha * x).cos();
                p.amplitude * envelope * oscillation
            })
            .collect();

        if p.normalized {
            let sum = math::vector_sum(&profile);
            if sum != 0.0 {
                for v in &mut profile {
                    *v /= sum;
                }
            }
        }

        self.geometry.store_profile(components, profile);
    }

    pub(crate) fn step(
        &mut self,
        _dims: ElementDimensions,
        components: &mut HashMap<String, Vec<f64>>,
        _t: f64,
        _dt: f64,
    ) {
        self.geometry
            .convolve(components, self.params.circular, self.params.amplitude_global);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AsymmetricGaussKernelParameters {
    pub width: f64,
    pub amplitude: f64,
    pub amplitude_global: f64,
    /// Asymmetry factor scaling the derivative term; 0 recovers a plain
    /// Gauss kernel.
    pub time_shift: f64,
    pub circular: bool,
    pub normalized: bool,
}

impl Default for AsymmetricGaussKernelParameters {
    fn default() -> Self {
        Self {
            width: 3.0,
            amplitude: 3.0,
            amplitude_global: 0.0,
            time_shift: 0.0,
            circular: true,
            normalized: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AsymmetricGaussKernel {
    pub params: AsymmetricGaussKernelParameters,
    pub geometry: KernelGeometry,
}

impl AsymmetricGaussKernel {
    pub fn new(params: AsymmetricGaussKernelParameters) -> Self {
        Self {
            params,
            geometry: KernelGeometry::default(),
        }
    }

    pub(crate) fn init(&mut self, dims: ElementDimensions, components: &mut HashMap<String, Vec<f64>>) {
        let p = self.params;
        let range_x = self.geometry.rebuild(p.width, p.circular, dims);

        let (gauss, derivative) = if p.normalized {
            (
                math::gauss_norm(&range_x, 0.0, p.width),
                math::gauss_derivative_norm(&range_x, 0.0, p.width, p.amplitude),
            )
        } else {
            (
                math::gauss(&range_x, 0.0, p.width),
                math::gauss_derivative(&range_x, 0.0, p.width, p.amplitude),
            )
        };

        let profile = gauss
            .iter()
            .zip(&derivative)
            .map(|(&g, &d)| p.amplitude * g + p.time_shift * d)
            .collect();
        self.geometry.store_profile(components, profile);
    }

    pub(crate) fn step(
        &mut self,
        _dims: ElementDimensions,
        components: &mut HashMap<String, Vec<f64>>,
        _t: f64,
        _dt: f64,
    ) {
        self.geometry
            .convolve(components, self.params.circular, self.params.amplitude_global);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{component, Element, ElementDimensions};
    use crate::math;
    use crate::prng::Prng;

    fn dims() -> ElementDimensions {
        ElementDimensions::new(50, 1.0)
    }

    #[test]
    fn gauss_profile_peaks_at_centre_with_amplitude() {
        let params = GaussKernelParameters {
            width: 3.0,
            amplitude: 2.5,
            normalized: false,
            circular: false,
            ..Default::default()
        };
        let mut el = Element::gauss_kernel("k", dims(), params).unwrap();
        el.init();

        let kernel = el.get_component(component::KERNEL).unwrap();
        let centre = kernel.len() / 2;
        assert!((kernel[centre] - 2.5).abs() < 1e-12);
        // Symmetric around the centre.
        assert!((kernel[centre - 3] - kernel[centre + 3]).abs() < 1e-12);
    }

    #[test]
    fn circular_step_matches_bruteforce_convolution() {
        let params = GaussKernelParameters {
            width: 2.0,
            amplitude: 1.5,
            normalized: false,
            circular: true,
            ..Default::default()
        };
        let mut el = Element::gauss_kernel("k", dims(), params).unwrap();
        el.init();

        let n = el.size();
        let mut rng = Prng::new(5);
        let signal: Vec<f64> = (0..n).map(|_| rng.gen_range_f64(0.0, 1.0)).collect();
        el.set_input(signal.clone());
        el.step(0.0, 1.0, None);

        let kernel = el.get_component(component::KERNEL).unwrap();
        let output = el.get_component(component::OUTPUT).unwrap();
        let kr = math::compute_kernel_range(2.0, DEFAULT_CUT_OFF_FACTOR, n, true);
        for i in 0..n {
            let mut acc = 0.0;
            for (j, &k) in kernel.iter().enumerate() {
                acc += k * signal[(i + kr[0] + n - j) % n];
            }
            assert!((output[i] - acc).abs() < 1e-12, "sample {i}");
        }
    }

    #[test]
    fn degenerate_width_yields_flat_zero_output() {
        let params = GaussKernelParameters {
            width: 0.0,
            amplitude: 5.0,
            normalized: false,
            circular: false,
            ..Default::default()
        };
        let mut el = Element::gauss_kernel("k", dims(), params).unwrap();
        el.init();
        el.set_input(vec![1.0; el.size()]);
        el.step(0.0, 1.0, None);
        assert!(el
            .get_component(component::OUTPUT)
            .unwrap()
            .iter()
            .all(|&v| v == 0.0));
    }

    #[test]
    fn mexican_hat_has_centre_excitation_and_surround_inhibition() {
        let params = MexicanHatKernelParameters {
            width_exc: 2.0,
            amplitude_exc: 2.0,
            width_inh: 6.0,
            amplitude_inh: 1.0,
            amplitude_global: 0.0,
            circular: false,
            normalized: false,
        };
        let mut el = Element::mexican_hat_kernel("mh", dims(), params).unwrap();
        el.init();
        let kernel = el.get_component(component::KERNEL).unwrap();
        let centre = kernel.len() / 2;
        assert!(kernel[centre] > 0.0);
        assert!(kernel[centre + 10] < 0.0);
    }

    #[test]
    fn lateral_interactions_add_global_term() {
        // Zero-width kernel isolates the global term.
        let params = LateralInteractionsParameters {
            width_exc: 0.0,
            amplitude_exc: 0.0,
            width_inh: 0.0,
            amplitude_inh: 0.0,
            amplitude_global: 0.5,
            circular: false,
            normalized: false,
        };
        let mut el = Element::lateral_interactions("li", dims(), params).unwrap();
        el.init();
        let mut input = vec![0.0; el.size()];
        input[3] = 1.0;
        input[40] = 1.0;
        el.set_input(input);
        el.step(0.0, 1.0, None);
        assert!(el
            .get_component(component::OUTPUT)
            .unwrap()
            .iter()
            .all(|&v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn oscillatory_profile_changes_sign() {
        let params = OscillatoryKernelParameters {
            amplitude: 1.0,
            decay: 0.3,
            zero_crossings: 0.5,
            normalized: false,
            circular: false,
            ..Default::default()
        };
        let mut el = Element::oscillatory_kernel("osc", dims(), params).unwrap();
        el.init();
        let kernel = el.get_component(component::KERNEL).unwrap();
        assert!(kernel.iter().any(|&v| v > 0.0) && kernel.iter().any(|&v| v < 0.0));
    }

    #[test]
    fn asymmetric_kernel_is_skewed_by_time_shift() {
        let params = AsymmetricGaussKernelParameters {
            width: 3.0,
            amplitude: 2.0,
            time_shift: 1.4,
            normalized: false,
            circular: false,
            ..Default::default()
        };
        let mut el = Element::asymmetric_gauss_kernel("agk", dims(), params).unwrap();
        el.init();
        let kernel = el.get_component(component::KERNEL).unwrap();
        let centre = kernel.len() / 2;
        assert!((kernel[centre - 2] - kernel[centre + 2]).abs() > 1e-6);
    }
}
