// Minimal PRNG (no external crates).
//
// This is NOT cryptographically secure.
// It is used only for simulation noise and reproducible weight init.

#[derive(Debug, Clone)]
pub struct Prng {
    state: u64,
}

impl Prng {
    pub fn new(seed: u64) -> Self {
        // Avoid a zero state.
        let seed = if seed == 0 { 0x9E3779B97F4A7C15 } else { seed };
        Self { state: seed }
    }

    /// Seed from an optional value, falling back to a fixed default.
    pub fn from_opt(seed: Option<u64>) -> Self {
        Self::new(seed.unwrap_or(0x5DEECE66D))
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        // Marsaglia / Vigna family. Simple, fast, decent for simulation noise.
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    #[inline]
    pub fn next_f64_01(&mut self) -> f64 {
        // Top 53 bits, converted to [0,1).
        let x = self.next_u64() >> 11;
        (x as f64) / ((1u64 << 53) as f64)
    }

    #[inline]
    pub fn gen_range_f64(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64_01()
    }

    /// Standard-normal sample via Box-Muller.
    #[inline]
    pub fn next_gaussian(&mut self) -> f64 {
        // u1 must stay away from 0 for the log.
        let u1 = 1.0 - self.next_f64_01();
        let u2 = self.next_f64_01();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Prng::new(42);
        let mut b = Prng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_f64_01(), b.next_f64_01());
        }
    }

    #[test]
    fn zero_seed_is_remapped() {
        let mut a = Prng::new(0);
        let mut b = Prng::new(0x9E3779B97F4A7C15);
        assert_eq!(a.next_f64_01(), b.next_f64_01());
    }

    #[test]
    fn uniform_stays_in_range() {
        let mut rng = Prng::new(7);
        for _ in 0..1000 {
            let v = rng.gen_range_f64(-0.05, 0.05);
            assert!((-0.05..0.05).contains(&v));
        }
    }

    #[test]
    fn gaussian_moments_are_plausible() {
        let mut rng = Prng::new(1234);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| rng.next_gaussian()).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 1.0).abs() < 0.1, "var {var}");
    }
}
