//! Polynomials over R_q = Z_q[X]/(X^n + 1) in RNS form.
//!
//! A [`Poly`] stores one block of `n` residues per RNS modulus, in the same
//! layout [`NttContext`] transforms: `coeffs[i * n + j]` is coefficient `j`
//! modulo `moduli[i]`. Polynomials are in either the coefficient domain or
//! the NTT domain; the NTT domain values are in Montgomery form.
//!
//! # Example
//!
//! ```
//! use mailbox_pir::math::{NttContext, Poly};
//! use mailbox_pir::params::{PRIME_54, PRIME_55};
//!
//! let moduli = [PRIME_54, PRIME_55];
//! let ctx = NttContext::with_moduli(256, &moduli);
//!
//! let mut x = Poly::from_signed(&[0, 1], 256, &moduli);
//! x.to_ntt(&ctx);
//! let mut x2 = x.mul(&x, &ctx);
//! x2.from_ntt(&ctx);
//! assert_eq!(x2.block(0)[2], 1);
//! ```

use super::gaussian::GaussianSampler;
use super::ntt::NttContext;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Polynomial in R_q with q given by its RNS moduli.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Poly {
    /// Residues, one block of `n` per modulus.
    coeffs: Vec<u64>,
    /// Ring dimension n.
    n: usize,
    /// RNS moduli.
    moduli: Vec<u64>,
    /// Whether residues are NTT-domain values.
    is_ntt: bool,
}

impl Poly {
    /// Zero polynomial
    pub fn zero(n: usize, moduli: &[u64]) -> Self {
        Self {
            coeffs: vec![0; n * moduli.len()],
            n,
            moduli: moduli.to_vec(),
            is_ntt: false,
        }
    }

    /// Build from full RNS residues, reducing each block by its modulus
    pub fn from_rns(mut coeffs: Vec<u64>, n: usize, moduli: &[u64]) -> Self {
        assert_eq!(coeffs.len(), n * moduli.len(), "RNS length mismatch");
        for (block, &q) in coeffs.chunks_mut(n).zip(moduli) {
            for c in block {
                *c %= q;
            }
        }
        Self {
            coeffs,
            n,
            moduli: moduli.to_vec(),
            is_ntt: false,
        }
    }

    /// Lift non-negative integer coefficients into every modulus
    ///
    /// `values` may be shorter than `n`; missing coefficients are zero.
    pub fn from_unsigned(values: &[u64], n: usize, moduli: &[u64]) -> Self {
        assert!(values.len() <= n, "too many coefficients");
        let mut poly = Self::zero(n, moduli);
        for (idx, &q) in moduli.iter().enumerate() {
            let block = &mut poly.coeffs[idx * n..(idx + 1) * n];
            for (c, &v) in block.iter_mut().zip(values) {
                *c = v % q;
            }
        }
        poly
    }

    /// Lift small signed integer coefficients into every modulus
    pub fn from_signed(values: &[i64], n: usize, moduli: &[u64]) -> Self {
        assert!(values.len() <= n, "too many coefficients");
        let mut poly = Self::zero(n, moduli);
        for (idx, &q) in moduli.iter().enumerate() {
            let block = &mut poly.coeffs[idx * n..(idx + 1) * n];
            for (c, &v) in block.iter_mut().zip(values) {
                *c = if v >= 0 {
                    v as u64 % q
                } else {
                    let abs = v.unsigned_abs() % q;
                    if abs == 0 {
                        0
                    } else {
                        q - abs
                    }
                };
            }
        }
        poly
    }

    /// Uniformly random polynomial in R_q
    ///
    /// Independent uniform residues per modulus are uniform modulo q by CRT.
    pub fn random(n: usize, moduli: &[u64], sampler: &mut GaussianSampler) -> Self {
        let mut poly = Self::zero(n, moduli);
        for (idx, &q) in moduli.iter().enumerate() {
            for c in &mut poly.coeffs[idx * n..(idx + 1) * n] {
                *c = sampler.uniform(q);
            }
        }
        poly
    }

    /// Polynomial with discrete Gaussian coefficients
    pub fn sample_gaussian(n: usize, moduli: &[u64], sampler: &mut GaussianSampler) -> Self {
        Self::from_signed(&sampler.sample_vec(n), n, moduli)
    }

    /// Get polynomial dimension
    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Get the RNS moduli
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Check if in NTT domain
    pub fn is_ntt(&self) -> bool {
        self.is_ntt
    }

    /// All residues, block by block
    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }

    /// Mutable access to all residues
    pub fn coeffs_mut(&mut self) -> &mut [u64] {
        &mut self.coeffs
    }

    /// Residues modulo `moduli[idx]`
    pub fn block(&self, idx: usize) -> &[u64] {
        &self.coeffs[idx * self.n..(idx + 1) * self.n]
    }

    /// Mutable residues modulo `moduli[idx]`
    pub fn block_mut(&mut self, idx: usize) -> &mut [u64] {
        &mut self.coeffs[idx * self.n..(idx + 1) * self.n]
    }

    #[cfg(test)]
    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0)
    }

    /// Convert to NTT domain
    pub fn to_ntt(&mut self, ctx: &NttContext) {
        if !self.is_ntt {
            ctx.forward(&mut self.coeffs);
            self.is_ntt = true;
        }
    }

    /// Convert from NTT domain to coefficient domain
    pub fn from_ntt(&mut self, ctx: &NttContext) {
        if self.is_ntt {
            ctx.inverse(&mut self.coeffs);
            self.is_ntt = false;
        }
    }

    /// Create a copy in NTT domain
    pub fn to_ntt_new(&self, ctx: &NttContext) -> Self {
        let mut result = self.clone();
        result.to_ntt(ctx);
        result
    }

    /// Product of two NTT-domain polynomials
    pub fn mul(&self, other: &Self, ctx: &NttContext) -> Self {
        assert!(
            self.is_ntt && other.is_ntt,
            "Both polynomials must be in NTT domain"
        );
        let mut result = Self {
            coeffs: vec![0; self.coeffs.len()],
            n: self.n,
            moduli: self.moduli.clone(),
            is_ntt: true,
        };
        ctx.pointwise_mul(&self.coeffs, &other.coeffs, &mut result.coeffs);
        result
    }

    /// In-place `self += a * b` with all three in NTT domain
    pub fn mul_acc(&mut self, a: &Self, b: &Self, ctx: &NttContext) {
        assert!(
            self.is_ntt && a.is_ntt && b.is_ntt,
            "All polynomials must be in NTT domain"
        );
        ctx.pointwise_mul_acc(&mut self.coeffs, &a.coeffs, &b.coeffs);
    }

    /// Multiply the residues modulo `moduli[i]` by `scalars[i]`
    ///
    /// Valid in either domain since scaling commutes with the NTT.
    pub fn scalar_mul_assign(&mut self, scalars: &[u64]) {
        assert_eq!(scalars.len(), self.moduli.len(), "one scalar per modulus");
        let n = self.n;
        for (idx, (&q, &s)) in self.moduli.iter().zip(scalars).enumerate() {
            for c in &mut self.coeffs[idx * n..(idx + 1) * n] {
                *c = ((*c as u128 * s as u128) % q as u128) as u64;
            }
        }
    }

    /// Apply the ring automorphism τ_g: X ↦ X^g
    ///
    /// X^i maps to X^(g·i mod 2n), negated when g·i mod 2n ≥ n since X^n = -1.
    /// Only defined in the coefficient domain; `g` must be odd.
    pub fn automorphism(&self, g: usize) -> Self {
        assert!(!self.is_ntt, "automorphism requires coefficient domain");
        assert!(g % 2 == 1, "Galois element must be odd");

        let n = self.n;
        let two_n = 2 * n;
        let mut result = Self::zero(n, &self.moduli);

        for (idx, &q) in self.moduli.iter().enumerate() {
            let src = &self.coeffs[idx * n..(idx + 1) * n];
            let dst = &mut result.coeffs[idx * n..(idx + 1) * n];
            for (i, &c) in src.iter().enumerate() {
                let target = (g * i) % two_n;
                if target < n {
                    dst[target] = c;
                } else {
                    dst[target - n] = if c == 0 { 0 } else { q - c };
                }
            }
        }

        result
    }

    fn assert_compatible(&self, other: &Self) {
        assert_eq!(self.moduli, other.moduli, "Moduli must match");
        assert_eq!(self.n, other.n, "Dimensions must match");
        assert_eq!(self.is_ntt, other.is_ntt, "NTT domains must match");
    }
}

impl Add for &Poly {
    type Output = Poly;

    fn add(self, rhs: Self) -> Self::Output {
        let mut result = self.clone();
        result += rhs;
        result
    }
}

impl AddAssign<&Poly> for Poly {
    fn add_assign(&mut self, rhs: &Poly) {
        self.assert_compatible(rhs);
        let n = self.n;
        for (idx, &q) in self.moduli.iter().enumerate() {
            let range = idx * n..(idx + 1) * n;
            for (a, &b) in self.coeffs[range.clone()].iter_mut().zip(&rhs.coeffs[range]) {
                let sum = *a + b;
                *a = if sum >= q { sum - q } else { sum };
            }
        }
    }
}

impl Sub for &Poly {
    type Output = Poly;

    fn sub(self, rhs: Self) -> Self::Output {
        let mut result = self.clone();
        result -= rhs;
        result
    }
}

impl SubAssign<&Poly> for Poly {
    fn sub_assign(&mut self, rhs: &Poly) {
        self.assert_compatible(rhs);
        let n = self.n;
        for (idx, &q) in self.moduli.iter().enumerate() {
            let range = idx * n..(idx + 1) * n;
            for (a, &b) in self.coeffs[range.clone()].iter_mut().zip(&rhs.coeffs[range]) {
                *a = if *a >= b { *a - b } else { q - b + *a };
            }
        }
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Self::Output {
        let mut result = self.clone();
        let n = self.n;
        for (idx, &q) in self.moduli.iter().enumerate() {
            for c in &mut result.coeffs[idx * n..(idx + 1) * n] {
                *c = if *c == 0 { 0 } else { q - *c };
            }
        }
        result
    }
}
