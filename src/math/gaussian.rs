//! Randomness for lattice sampling
//!
//! [`GaussianSampler`] owns a ChaCha20 stream seeded from OS entropy and
//! produces every random value the scheme needs: discrete Gaussian errors,
//! ternary secrets and uniform residues.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Discrete Gaussian sampler over Z using rejection sampling
#[derive(Clone)]
pub struct GaussianSampler {
    /// Standard deviation σ
    sigma: f64,
    /// Tailcut: reject samples beyond this many standard deviations
    tailcut: usize,
    rng: ChaCha20Rng,
}

impl GaussianSampler {
    /// Create a sampler seeded from the operating system's entropy source
    pub fn new(sigma: f64) -> Self {
        Self::from_rng(sigma, ChaCha20Rng::from_entropy())
    }

    /// Create a deterministic sampler, for tests and benchmarks only
    pub fn with_seed(sigma: f64, seed: u64) -> Self {
        Self::from_rng(sigma, ChaCha20Rng::seed_from_u64(seed))
    }

    fn from_rng(sigma: f64, rng: ChaCha20Rng) -> Self {
        Self {
            sigma,
            tailcut: (sigma * 6.0).ceil() as usize,
            rng,
        }
    }

    /// Sample a single value from the discrete Gaussian D_σ
    pub fn sample(&mut self) -> i64 {
        let sigma_sq_2 = 2.0 * self.sigma * self.sigma;
        let bound = self.tailcut as i64;

        loop {
            let x = self.rng.gen_range(-bound..=bound);

            // Accept with probability exp(-x²/(2σ²))
            let prob = (-((x * x) as f64) / sigma_sq_2).exp();
            let u: f64 = self.rng.gen();
            if u < prob {
                return x;
            }
        }
    }

    /// Sample `len` Gaussian values
    pub fn sample_vec(&mut self, len: usize) -> Vec<i64> {
        (0..len).map(|_| self.sample()).collect()
    }

    /// Sample `len` values uniformly from {-1, 0, 1}
    pub fn sample_ternary(&mut self, len: usize) -> Vec<i64> {
        (0..len).map(|_| self.rng.gen_range(-1i64..=1)).collect()
    }

    /// Sample a value uniformly from [0, q)
    #[inline]
    pub fn uniform(&mut self, q: u64) -> u64 {
        self.rng.gen_range(0..q)
    }
}

impl std::fmt::Debug for GaussianSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaussianSampler")
            .field("sigma", &self.sigma)
            .field("tailcut", &self.tailcut)
            .finish()
    }
}
