//! Number-Theoretic Transform (NTT) over one or more word-sized primes.
//!
//! Implements Cooley-Tukey / Gentleman-Sande radix-2 transforms for
//! negacyclic convolution over Z_q[X]/(X^n + 1). The same context serves
//! the RNS ciphertext ring (two primes, blocks of `n` residues laid out one
//! after the other) and the plaintext ring used by the batching encoder
//! (a single prime).
//!
//! # Theory
//!
//! For multiplication modulo X^n + 1 we use a primitive 2n-th root of unity
//! ψ with ψ^n = -1. The forward transform evaluates a polynomial at the odd
//! powers of ψ, so products become pointwise.
//!
//! # Montgomery form
//!
//! `forward` leaves values in Montgomery form (x·2^64 mod q) and `inverse`
//! converts back, so values produced by `forward` can be multiplied with
//! [`NttContext::pointwise_mul`] and added freely before `inverse`.
//!
//! # Example
//!
//! ```
//! use mailbox_pir::math::NttContext;
//! use mailbox_pir::params::{PRIME_54, PRIME_55};
//!
//! let ctx = NttContext::with_moduli(256, &[PRIME_54, PRIME_55]);
//! let mut coeffs = vec![1u64; 2 * 256];
//! ctx.forward(&mut coeffs);
//! ctx.inverse(&mut coeffs);
//! assert!(coeffs.iter().all(|&c| c == 1));
//! ```

/// Precomputed NTT context with twiddle factors.
///
/// Create once per (dimension, moduli) pair and share it; every field is
/// read-only after construction.
#[derive(Clone)]
pub struct NttContext {
    /// Ring dimension (power of two).
    n: usize,
    /// RNS moduli (length 1 for single-modulus mode).
    moduli: Vec<u64>,
    /// -q^(-1) mod 2^64 per modulus.
    q_inv_neg: Vec<u64>,
    /// 2^128 mod q per modulus.
    r_squared: Vec<u64>,
    /// Forward twiddle factors (powers of ψ, bit-reversed order).
    psi_powers: Vec<Vec<u64>>,
    /// Inverse twiddle factors (powers of ψ^(-1)).
    psi_inv_powers: Vec<Vec<u64>>,
    /// n^(-1) mod q in Montgomery form.
    n_inv: Vec<u64>,
}

impl NttContext {
    /// Creates an NTT context for a single modulus.
    ///
    /// # Panics
    ///
    /// Panics if `n` is not a power of two or `q` does not satisfy
    /// q ≡ 1 (mod 2n).
    pub fn new(n: usize, q: u64) -> Self {
        Self::with_moduli(n, &[q])
    }

    /// Creates an NTT context for several RNS moduli.
    ///
    /// # Arguments
    ///
    /// * `n` - Ring dimension (power of two)
    /// * `moduli` - RNS moduli, each odd, below 2^62 and ≡ 1 (mod 2n)
    ///
    /// # Panics
    ///
    /// Panics if any of the requirements above does not hold. Callers
    /// validate parameters first, see [`crate::params::BfvParams::validate`].
    pub fn with_moduli(n: usize, moduli: &[u64]) -> Self {
        assert!(n.is_power_of_two(), "n must be a power of two");
        assert!(!moduli.is_empty(), "moduli must be non-empty");

        let mut q_inv_neg = Vec::with_capacity(moduli.len());
        let mut r_squared = Vec::with_capacity(moduli.len());
        let mut psi_powers = Vec::with_capacity(moduli.len());
        let mut psi_inv_powers = Vec::with_capacity(moduli.len());
        let mut n_inv = Vec::with_capacity(moduli.len());

        for &q in moduli {
            assert!(q < 1 << 62, "q must be below 2^62");
            assert!(q % (2 * n as u64) == 1, "q must be ≡ 1 (mod 2n)");

            let q_inv = Self::compute_q_inv_neg(q);
            let r2 = Self::compute_r_squared(q);

            let psi = Self::find_primitive_root(2 * n as u64, q);
            let psi_mont = Self::to_montgomery(psi, q, r2, q_inv);
            let psi_pow = Self::compute_twiddle_factors(n, psi_mont, q, q_inv, r2);

            let psi_inv = Self::mod_pow(psi, q - 2, q);
            let psi_inv_mont = Self::to_montgomery(psi_inv, q, r2, q_inv);
            let psi_inv_pow = Self::compute_twiddle_factors(n, psi_inv_mont, q, q_inv, r2);

            let n_inv_val = Self::mod_pow(n as u64, q - 2, q);

            q_inv_neg.push(q_inv);
            r_squared.push(r2);
            psi_powers.push(psi_pow);
            psi_inv_powers.push(psi_inv_pow);
            n_inv.push(Self::to_montgomery(n_inv_val, q, r2, q_inv));
        }

        Self {
            n,
            moduli: moduli.to_vec(),
            q_inv_neg,
            r_squared,
            psi_powers,
            psi_inv_powers,
            n_inv,
        }
    }

    /// Returns the ring dimension.
    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Returns the RNS moduli.
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Number of RNS moduli.
    pub fn crt_count(&self) -> usize {
        self.moduli.len()
    }

    /// Performs the forward NTT in-place.
    ///
    /// Input residues must be reduced (< q_i). Output is in Montgomery form.
    ///
    /// # Panics
    ///
    /// Panics if `coeffs.len() != n * crt_count`.
    pub fn forward(&self, coeffs: &mut [u64]) {
        self.check_len(coeffs.len());

        for idx in 0..self.crt_count() {
            let block = &mut coeffs[idx * self.n..(idx + 1) * self.n];
            for c in block.iter_mut() {
                *c = self.to_mont_at(*c, idx);
            }
            self.forward_inplace_at(block, idx);
        }
    }

    fn forward_inplace_at(&self, coeffs: &mut [u64], idx: usize) {
        let n = self.n;
        let q = self.moduli[idx];
        let psi_powers = &self.psi_powers[idx];

        let mut t = n;
        let mut m = 1;

        while m < n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let j2 = j1 + t;
                let w = psi_powers[m + i];

                for j in j1..j2 {
                    let u = coeffs[j];
                    let v = self.montgomery_mul_at(coeffs[j + t], w, idx);

                    coeffs[j] = if u + v >= q { u + v - q } else { u + v };
                    coeffs[j + t] = if u >= v { u - v } else { q - v + u };
                }
            }
            m <<= 1;
        }
    }

    /// Performs the inverse NTT in-place.
    ///
    /// Input must be in Montgomery form (as produced by `forward` and
    /// `pointwise_mul`); output is in standard form.
    ///
    /// # Panics
    ///
    /// Panics if `coeffs.len() != n * crt_count`.
    pub fn inverse(&self, coeffs: &mut [u64]) {
        self.check_len(coeffs.len());

        for idx in 0..self.crt_count() {
            let block = &mut coeffs[idx * self.n..(idx + 1) * self.n];
            self.inverse_inplace_at(block, idx);
            for c in block.iter_mut() {
                *c = self.montgomery_mul_at(*c, 1, idx);
            }
        }
    }

    fn inverse_inplace_at(&self, coeffs: &mut [u64], idx: usize) {
        let n = self.n;
        let q = self.moduli[idx];
        let psi_inv_powers = &self.psi_inv_powers[idx];

        let mut t = 1;
        let mut m = n;

        while m > 1 {
            m >>= 1;
            for i in 0..m {
                let j1 = i * 2 * t;
                let w = psi_inv_powers[m + i];

                for j in j1..(j1 + t) {
                    let u = coeffs[j];
                    let v = coeffs[j + t];

                    coeffs[j] = if u + v >= q { u + v - q } else { u + v };
                    let diff = if u >= v { u - v } else { q - v + u };
                    coeffs[j + t] = self.montgomery_mul_at(diff, w, idx);
                }
            }
            t <<= 1;
        }

        for c in coeffs.iter_mut() {
            *c = self.montgomery_mul_at(*c, self.n_inv[idx], idx);
        }
    }

    /// Pointwise product of two NTT-domain vectors, written to `result`.
    ///
    /// # Panics
    ///
    /// Panics if any length differs from `n * crt_count`.
    pub fn pointwise_mul(&self, a: &[u64], b: &[u64], result: &mut [u64]) {
        self.check_len(a.len());
        self.check_len(b.len());
        self.check_len(result.len());

        for idx in 0..self.crt_count() {
            let start = idx * self.n;
            for i in start..start + self.n {
                result[i] = self.montgomery_mul_at(a[i], b[i], idx);
            }
        }
    }

    /// Fused `acc += a ⊙ b` in the NTT domain.
    ///
    /// # Panics
    ///
    /// Panics if any length differs from `n * crt_count`.
    pub fn pointwise_mul_acc(&self, acc: &mut [u64], a: &[u64], b: &[u64]) {
        self.check_len(acc.len());
        self.check_len(a.len());
        self.check_len(b.len());

        for idx in 0..self.crt_count() {
            let q = self.moduli[idx];
            let start = idx * self.n;
            for i in start..start + self.n {
                let sum = acc[i] + self.montgomery_mul_at(a[i], b[i], idx);
                acc[i] = if sum >= q { sum - q } else { sum };
            }
        }
    }

    /// Converts a value to Montgomery form for modulus `idx`.
    #[inline]
    pub fn to_mont_at(&self, a: u64, idx: usize) -> u64 {
        Self::to_montgomery(a, self.moduli[idx], self.r_squared[idx], self.q_inv_neg[idx])
    }

    /// Converts a value out of Montgomery form for modulus `idx`.
    #[inline]
    pub fn from_mont_at(&self, a: u64, idx: usize) -> u64 {
        self.montgomery_mul_at(a, 1, idx)
    }

    #[inline]
    fn check_len(&self, len: usize) {
        assert_eq!(
            len,
            self.n * self.crt_count(),
            "Input length must match dimension * crt_count"
        );
    }

    #[inline]
    fn montgomery_mul_at(&self, a: u64, b: u64, idx: usize) -> u64 {
        let q = self.moduli[idx];
        let ab = (a as u128) * (b as u128);
        let m = ((ab as u64).wrapping_mul(self.q_inv_neg[idx])) as u128;
        let t = ((ab + m * (q as u128)) >> 64) as u64;
        if t >= q {
            t - q
        } else {
            t
        }
    }

    fn to_montgomery(a: u64, q: u64, r_squared: u64, q_inv_neg: u64) -> u64 {
        let ab = (a as u128) * (r_squared as u128);
        let m = ((ab as u64).wrapping_mul(q_inv_neg)) as u128;
        let t = ((ab + m * (q as u128)) >> 64) as u64;
        if t >= q {
            t - q
        } else {
            t
        }
    }

    fn compute_q_inv_neg(q: u64) -> u64 {
        let mut y: u64 = 1;
        for i in 1..64 {
            let yi = y.wrapping_mul(q) & (1u64 << i);
            y |= yi;
        }
        y.wrapping_neg()
    }

    fn compute_r_squared(q: u64) -> u64 {
        let r_mod_q = (1u128 << 64) % (q as u128);
        ((r_mod_q * r_mod_q) % (q as u128)) as u64
    }

    pub(crate) fn mod_pow(mut base: u64, mut exp: u64, m: u64) -> u64 {
        let mut result = 1u64;
        base %= m;
        while exp > 0 {
            if exp & 1 == 1 {
                result = ((result as u128 * base as u128) % m as u128) as u64;
            }
            exp >>= 1;
            base = ((base as u128 * base as u128) % m as u128) as u64;
        }
        result
    }

    /// Find a primitive `order`-th root of unity modulo q
    fn find_primitive_root(order: u64, q: u64) -> u64 {
        let exp = (q - 1) / order;
        let mut g = 2;
        loop {
            let candidate = Self::mod_pow(g, exp, q);
            // order is a power of two, so ψ^(order/2) = -1 suffices
            if Self::mod_pow(candidate, order / 2, q) == q - 1 {
                return candidate;
            }
            g += 1;
        }
    }

    /// Twiddle factors in the bit-reversed order consumed by the butterflies
    fn compute_twiddle_factors(
        n: usize,
        psi: u64,
        q: u64,
        q_inv_neg: u64,
        r_squared: u64,
    ) -> Vec<u64> {
        let mont_mul = |a: u64, b: u64| -> u64 {
            let ab = (a as u128) * (b as u128);
            let mm = ((ab as u64).wrapping_mul(q_inv_neg)) as u128;
            let t = ((ab + mm * (q as u128)) >> 64) as u64;
            if t >= q {
                t - q
            } else {
                t
            }
        };

        let mut factors = vec![0u64; n];
        factors[1] = Self::to_montgomery(1, q, r_squared, q_inv_neg);

        for m in 1..n {
            if m.is_power_of_two() {
                // New level: ψ^(n/(2m))
                let exp = n / (2 * m);
                let mut pow = Self::to_montgomery(1, q, r_squared, q_inv_neg);
                for _ in 0..exp {
                    pow = mont_mul(pow, psi);
                }
                factors[m] = pow;
            } else {
                let prev_idx = m & (m - 1); // clear lowest set bit
                let step_idx = m & (!m + 1); // lowest set bit
                factors[m] = mont_mul(factors[prev_idx], factors[step_idx]);
            }
        }

        factors
    }
}

impl std::fmt::Debug for NttContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NttContext")
            .field("n", &self.n)
            .field("moduli", &self.moduli)
            .finish()
    }
}
