//! Pure numeric primitives for the field engine.
//!
//! Everything in here is stateless and bit-for-bit reproducible given the
//! same inputs: Gaussian profiles, activation nonlinearities, kernel
//! truncation, the circular index extension, the 1-D convolution variants
//! and the synaptic learning rules.

/// Gaussian profile over an integer sample range.
///
/// `g[i] = exp(-0.5 * ((x_i - position) / sigma)^2)`.
///
/// A non-positive `sigma` yields an all-zero profile instead of NaN; callers
/// that need strict behavior must validate the width upstream.
pub fn gauss(range_x: &[i64], position: f64, sigma: f64) -> Vec<f64> {
    if sigma <= 0.0 {
        return vec![0.0; range_x.len()];
    }
    range_x
        .iter()
        .map(|&x| {
            let d = x as f64 - position;
            (-0.5 * d * d / (sigma * sigma)).exp()
        })
        .collect()
}

/// Gaussian profile normalized to unit sum (integrates to 1 over the range).
pub fn gauss_norm(range_x: &[i64], position: f64, sigma: f64) -> Vec<f64> {
    let mut g = gauss(range_x, position, sigma);
    let sum: f64 = g.iter().sum();
    if sum != 0.0 {
        for v in &mut g {
            *v /= sum;
        }
    }
    g
}

/// First derivative of an amplitude-scaled Gaussian:
/// `-(x - position) / sigma^2 * amplitude * gauss(x)`.
pub fn gauss_derivative(range_x: &[i64], position: f64, sigma: f64, amplitude: f64) -> Vec<f64> {
    let g = gauss(range_x, position, sigma);
    range_x
        .iter()
        .zip(&g)
        .map(|(&x, &gv)| {
            if sigma <= 0.0 {
                0.0
            } else {
                -(x as f64 - position) / (sigma * sigma) * amplitude * gv
            }
        })
        .collect()
}

/// Derivative of the unit-sum Gaussian, amplitude-scaled.
pub fn gauss_derivative_norm(
    range_x: &[i64],
    position: f64,
    sigma: f64,
    amplitude: f64,
) -> Vec<f64> {
    let g = gauss_norm(range_x, position, sigma);
    range_x
        .iter()
        .zip(&g)
        .map(|(&x, &gv)| {
            if sigma <= 0.0 {
                0.0
            } else {
                -(x as f64 - position) / (sigma * sigma) * amplitude * gv
            }
        })
        .collect()
}

/// Gaussian bump over `size` samples at 1-based sample positions.
pub fn non_circular_gauss(size: usize, sigma: f64, position: f64) -> Vec<f64> {
    if sigma <= 0.0 {
        return vec![0.0; size];
    }
    (0..size)
        .map(|i| {
            let d = (i + 1) as f64 - position;
            (-0.5 * d * d / (sigma * sigma)).exp()
        })
        .collect()
}

/// Gaussian bump on a periodic domain of `size` samples.
///
/// Distance is the shorter way around the ring, so a bump centred near one
/// edge spills over to the other.
pub fn circular_gauss(size: usize, sigma: f64, position: f64) -> Vec<f64> {
    if sigma <= 0.0 {
        return vec![0.0; size];
    }
    let l = size as f64;
    // Fold the centre into the domain, keeping its fractional part.
    let position = (position - 1.0) % l + 1.0;
    (0..size)
        .map(|i| {
            let d = ((i + 1) as f64 - position).abs();
            let d = d.min(l - d);
            (-0.5 * d * d / (sigma * sigma)).exp()
        })
        .collect()
}

/// Logistic nonlinearity: `1 / (1 + exp(-steepness * (x - x_shift)))`.
pub fn sigmoid(x: &[f64], steepness: f64, x_shift: f64) -> Vec<f64> {
    x.iter()
        .map(|&v| 1.0 / (1.0 + (-steepness * (v - x_shift)).exp()))
        .collect()
}

/// Step nonlinearity: 1 where `x > threshold` (strict), else 0.
pub fn heaviside(x: &[f64], threshold: f64) -> Vec<f64> {
    x.iter()
        .map(|&v| if v > threshold { 1.0 } else { 0.0 })
        .collect()
}

/// Truncated half-widths `[left, right]` for a kernel of the given width.
///
/// The raw half-width is `ceil(width * cut_off_factor)`; it is then clamped
/// so the kernel never reaches further than the field itself — to
/// `field_size - 1` on either side for non-circular fields, and to
/// `floor/ceil((field_size - 1) / 2)` for circular ones. This keeps the hot
/// convolution loop free of bounds checks.
pub fn compute_kernel_range(
    width: f64,
    cut_off_factor: f64,
    field_size: usize,
    circular: bool,
) -> [usize; 2] {
    let half = (width * cut_off_factor).ceil().max(0.0) as usize;
    if circular {
        let aux = (field_size - 1) as f64 / 2.0;
        [
            half.min(aux.floor() as usize),
            half.min(aux.ceil() as usize),
        ]
    } else {
        [half.min(field_size - 1), half.min(field_size - 1)]
    }
}

/// Index table that logically wraps a field around itself.
///
/// Layout (0-based field indices):
/// `[N-kr1 .. N-1] ++ [0 .. N-1] ++ [0 .. kr0-1]`, total length
/// `N + kr0 + kr1`. A single valid convolution over the gathered signal then
/// reproduces circular convolution on the original without modulo
/// arithmetic in the inner loop. Rebuilt only on `init()`, not per step.
pub fn create_extended_index(field_size: usize, kernel_range: [usize; 2]) -> Vec<usize> {
    let mut ext = Vec::with_capacity(field_size + kernel_range[0] + kernel_range[1]);
    ext.extend(field_size - kernel_range[1]..field_size);
    ext.extend(0..field_size);
    ext.extend(0..kernel_range[0]);
    ext
}

/// Gather `contents` through an index table.
pub fn gather(indices: &[usize], contents: &[f64]) -> Vec<f64> {
    indices.iter().map(|&i| contents[i]).collect()
}

/// Valid convolution: `|len(f) - len(g)| + 1` outputs.
///
/// The shorter vector is flipped (true convolution). Used on the
/// circular-extended signal, where it realizes periodic lateral interaction.
pub fn conv_valid(f: &[f64], g: &[f64]) -> Vec<f64> {
    let (short, long) = if f.len() < g.len() { (f, g) } else { (g, f) };
    let m = short.len();
    let n = long.len() - m + 1;
    let mut out = vec![0.0; n];
    for (i, o) in out.iter_mut().enumerate() {
        let mut acc = 0.0;
        for j in (0..m).rev() {
            acc += short[j] * long[i + (m - 1 - j)];
        }
        *o = acc;
    }
    out
}

/// Same-length convolution: `g` centred over `f`, zero padding outside.
///
/// The kernel is NOT flipped here (cross-correlation); for the symmetric
/// kernel profiles the distinction vanishes, for the asymmetric kernel it is
/// part of the contract.
pub fn conv_same(f: &[f64], g: &[f64]) -> Vec<f64> {
    let nf = f.len();
    let ng = g.len();
    let pad = (ng - 1) / 2;
    let mut out = vec![0.0; nf];
    for (i, o) in out.iter_mut().enumerate() {
        let mut acc = 0.0;
        for (j, &gv) in g.iter().enumerate() {
            let idx = i + j;
            if idx >= pad && idx - pad < nf {
                acc += f[idx - pad] * gv;
            }
        }
        *o = acc;
    }
    out
}

/// Anisotropic 2-D Gaussian evaluated at `(x, y)`.
pub fn gaussian_2d(
    x: f64,
    y: f64,
    mu_x: f64,
    mu_y: f64,
    sigma_x: f64,
    sigma_y: f64,
    amplitude: f64,
) -> f64 {
    let ex = (x - mu_x) * (x - mu_x) / (2.0 * sigma_x * sigma_x);
    let ey = (y - mu_y) * (y - mu_y) / (2.0 * sigma_y * sigma_y);
    amplitude * (-(ex + ey)).exp()
}

/// Isotropic 2-D Gaussian on a torus: takes the minimum of the direct and
/// wrapped distance along each axis.
pub fn gaussian_2d_periodic(
    x: f64,
    y: f64,
    mu_x: f64,
    mu_y: f64,
    sigma: f64,
    amplitude: f64,
    max_x: f64,
    max_y: f64,
) -> f64 {
    let dx = (x - mu_x).abs().min(max_x - (x - mu_x).abs());
    let dy = (y - mu_y).abs().min(max_y - (y - mu_y).abs());
    amplitude * (-((dx * dx + dy * dy) / (2.0 * sigma * sigma))).exp()
}

pub fn vector_sum(x: &[f64]) -> f64 {
    x.iter().sum()
}

pub fn vector_avg(x: &[f64]) -> f64 {
    if x.is_empty() {
        0.0
    } else {
        vector_sum(x) / x.len() as f64
    }
}

/// Euclidean (L2) norm.
pub fn vector_norm(x: &[f64]) -> f64 {
    x.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Map a vector into [0, 1]: shift by the minimum, scale by the maximum.
///
/// Used to bring field activations into a comparable positive range before a
/// learning update. A (near-)constant vector maps to all zeros.
pub fn normalize_positive(x: &[f64]) -> Vec<f64> {
    const EPSILON: f64 = 1e-9;
    if x.is_empty() {
        return Vec::new();
    }
    let min = x.iter().cloned().fold(f64::INFINITY, f64::min);
    let mut v: Vec<f64> = x.iter().map(|&a| a - min).collect();
    let max = v.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max > EPSILON {
        for a in &mut v {
            *a /= max;
        }
    }
    v
}

/// Hebbian update: `w[i][j] += lr * input[i] * output[j]`.
pub fn hebb_rule(weights: &mut [Vec<f64>], input: &[f64], output: &[f64], learning_rate: f64) {
    for (i, row) in weights.iter_mut().enumerate() {
        for (j, w) in row.iter_mut().enumerate() {
            *w += learning_rate * input[i] * output[j];
        }
    }
}

/// Oja update: Hebb with a decay proportional to the current weight, which
/// bounds weight growth.
pub fn oja_rule(weights: &mut [Vec<f64>], input: &[f64], output: &[f64], learning_rate: f64) {
    for (i, row) in weights.iter_mut().enumerate() {
        for (j, w) in row.iter_mut().enumerate() {
            *w += learning_rate * (input[i] * output[j] - output[j] * input[i] * *w);
        }
    }
}

/// Widrow-Hoff delta update against a target vector.
///
/// `actual = W^T * input`, `error = target - actual`,
/// `w[i][j] += lr * error[j] * input[i]`.
pub fn delta_widrow_hoff_rule(
    weights: &mut [Vec<f64>],
    input: &[f64],
    target: &[f64],
    learning_rate: f64,
) {
    let error = delta_error(weights, input, target);
    for (i, row) in weights.iter_mut().enumerate() {
        for (j, w) in row.iter_mut().enumerate() {
            *w += learning_rate * error[j] * input[i];
        }
    }
}

/// Krogh-Hertz delta update: the Widrow-Hoff error term with weight decay
/// applied before scaling. The decay coefficient equals the learning rate.
pub fn delta_krogh_hertz_rule(
    weights: &mut [Vec<f64>],
    input: &[f64],
    target: &[f64],
    learning_rate: f64,
) {
    let error = delta_error(weights, input, target);
    for (i, row) in weights.iter_mut().enumerate() {
        for (j, w) in row.iter_mut().enumerate() {
            *w += learning_rate * (error[j] - learning_rate * *w) * input[i];
        }
    }
}

fn delta_error(weights: &[Vec<f64>], input: &[f64], target: &[f64]) -> Vec<f64> {
    let mut error = target.to_vec();
    for (i, row) in weights.iter().enumerate() {
        for (j, &w) in row.iter().enumerate() {
            error[j] -= w * input[i];
        }
    }
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prng::Prng;

    fn range(left: usize, right: usize) -> Vec<i64> {
        (-(left as i64)..=right as i64).collect()
    }

    #[test]
    fn kernel_range_never_exceeds_field_span() {
        for &size in &[1usize, 2, 3, 10, 49, 50, 100] {
            for &width in &[0.0, 0.5, 3.0, 12.0, 500.0] {
                for &cut in &[1.0, 3.0, 5.0] {
                    let [l, r] = compute_kernel_range(width, cut, size, false);
                    assert!(l <= size - 1 && r <= size - 1);

                    let [l, r] = compute_kernel_range(width, cut, size, true);
                    assert!(l + r <= size - 1, "size {size} width {width}: {l}+{r}");
                }
            }
        }
    }

    #[test]
    fn extended_index_wraps_field() {
        let ext = create_extended_index(5, [2, 2]);
        assert_eq!(ext, vec![3, 4, 0, 1, 2, 3, 4, 0, 1]);

        let ext = create_extended_index(4, [1, 2]);
        assert_eq!(ext, vec![2, 3, 0, 1, 2, 3, 0]);
    }

    #[test]
    fn valid_conv_over_extension_equals_bruteforce_circular() {
        let n = 50;
        let mut rng = Prng::new(11);
        let signal: Vec<f64> = (0..n).map(|_| rng.gen_range_f64(-1.0, 1.0)).collect();

        // Asymmetric kernel so a flip error would be caught.
        let kr = compute_kernel_range(3.0, 5.0, n, true);
        let kernel: Vec<f64> = range(kr[0], kr[1])
            .iter()
            .map(|&x| (-0.1 * (x as f64 - 0.7).abs()).exp())
            .collect();

        let ext = create_extended_index(n, kr);
        let fast = conv_valid(&gather(&ext, &signal), &kernel);
        assert_eq!(fast.len(), n);

        for i in 0..n {
            let mut acc = 0.0;
            for (j, &k) in kernel.iter().enumerate() {
                let idx = (i + kr[0] + n - j) % n;
                acc += k * signal[idx];
            }
            assert!((fast[i] - acc).abs() < 1e-12, "sample {i}");
        }
    }

    #[test]
    fn same_conv_centres_without_flipping() {
        let f = [0.0, 0.0, 1.0, 0.0, 0.0];
        let g = [1.0, 2.0, 3.0];
        // Correlation against an impulse reproduces the kernel reversed.
        assert_eq!(conv_same(&f, &g), vec![0.0, 3.0, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn valid_conv_flips_the_kernel() {
        let f = [0.0, 0.0, 1.0, 0.0, 0.0];
        let g = [1.0, 2.0, 3.0];
        assert_eq!(conv_valid(&f, &g), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn degenerate_width_gives_zero_profile() {
        let r = range(3, 3);
        assert!(gauss(&r, 0.0, 0.0).iter().all(|&v| v == 0.0));
        assert!(gauss_norm(&r, 0.0, 0.0).iter().all(|&v| v == 0.0));
        assert!(circular_gauss(10, 0.0, 3.0).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn normalized_gauss_sums_to_one() {
        let g = gauss_norm(&range(10, 10), 0.0, 2.5);
        assert!((g.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn circular_gauss_wraps_at_edges() {
        let g = circular_gauss(100, 3.0, 1.0);
        // Centre at the first sample: the last sample is one step away on
        // the ring, not 99.
        assert!(g[99] > 0.9);
        assert!(g[50] < 1e-10);
    }

    #[test]
    fn sigmoid_midpoint_and_saturation() {
        let s = sigmoid(&[0.0, 100.0, -100.0], 1.0, 0.0);
        assert!((s[0] - 0.5).abs() < 1e-12);
        assert!(s[1] > 0.999 && s[2] < 0.001);
    }

    #[test]
    fn heaviside_is_strict() {
        assert_eq!(heaviside(&[0.5, 0.0, -0.5], 0.0), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn hebb_delta_is_exact_and_linear_in_calls() {
        let input = [0.5, 0.0, 1.0];
        let output = [0.2, 0.8];
        let lr = 0.01;

        let mut w = vec![vec![0.0; 2]; 3];
        hebb_rule(&mut w, &input, &output, lr);
        for (i, row) in w.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                assert!((v - lr * input[i] * output[j]).abs() < 1e-15);
            }
        }

        let n = 7;
        let mut wn = vec![vec![0.0; 2]; 3];
        for _ in 0..n {
            hebb_rule(&mut wn, &input, &output, lr);
        }
        for (i, row) in wn.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                assert!((v - n as f64 * lr * input[i] * output[j]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn oja_matches_hebb_at_zero_weight_and_decays_otherwise() {
        let input = [1.0, 0.5];
        let output = [0.4];
        let lr = 0.1;

        let mut w = vec![vec![0.0; 1]; 2];
        oja_rule(&mut w, &input, &output, lr);
        assert!((w[0][0] - lr * 1.0 * 0.4).abs() < 1e-15);

        // Large weight: the decay term dominates and pulls it down.
        let mut w = vec![vec![10.0; 1]; 2];
        oja_rule(&mut w, &input, &output, lr);
        assert!(w[0][0] < 10.0);
    }

    #[test]
    fn delta_rule_converges_on_target() {
        let input = [1.0, 0.0];
        let target = [0.5];
        let mut w = vec![vec![0.0; 1]; 2];
        for _ in 0..200 {
            delta_widrow_hoff_rule(&mut w, &input, &target, 0.1);
        }
        assert!((w[0][0] - 0.5).abs() < 1e-6);
        assert_eq!(w[1][0], 0.0);

        // With a matching output the error vanishes and nothing moves.
        let reached = w[0][0];
        delta_widrow_hoff_rule(&mut w, &input, &[reached], 0.1);
        assert!((w[0][0] - reached).abs() < 1e-12);
    }

    #[test]
    fn krogh_hertz_applies_weight_decay() {
        let input = [1.0];
        let mut w = vec![vec![1.0]];
        // Target chosen so the raw error is zero; only decay remains.
        delta_krogh_hertz_rule(&mut w, &input, &[1.0], 0.1);
        assert!(w[0][0] < 1.0);
    }

    #[test]
    fn normalize_positive_maps_to_unit_range() {
        let v = normalize_positive(&[-5.0, -4.0, 3.0]);
        assert_eq!(v[0], 0.0);
        assert!((v[2] - 1.0).abs() < 1e-12);
        assert!(v[1] > 0.0 && v[1] < 1.0);

        assert!(normalize_positive(&[2.0, 2.0, 2.0]).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn periodic_gaussian_takes_shorter_arc() {
        let direct = gaussian_2d_periodic(0.0, 0.0, 49.0, 0.0, 2.0, 1.0, 50.0, 50.0);
        let near = gaussian_2d_periodic(0.0, 0.0, 1.0, 0.0, 2.0, 1.0, 50.0, 50.0);
        assert!((direct - near).abs() < 1e-12);
    }
}
