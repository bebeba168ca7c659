//! SIMD batching of plaintext slots
//!
//! Because t ≡ 1 (mod 2n), X^n + 1 splits into n linear factors modulo t and
//! a plaintext polynomial is equivalent to its n evaluations at the odd
//! powers of a primitive 2n-th root ζ. Slots are arranged as a 2 × (n/2)
//! matrix:
//!
//! - row 0, column k ↔ evaluation at ζ^(3^k)
//! - row 1, column k ↔ evaluation at ζ^(-3^k)
//!
//! With this order the automorphism X ↦ X^(3^k) rotates both rows left by
//! k, and X ↦ X^(2n-1) swaps the rows.

use std::collections::HashMap;
use std::sync::Arc;

use super::context::BfvContext;
use crate::math::{NttContext, Poly};
use crate::pir::error::{PirError, Result};

/// Plaintext polynomial with coefficients in [0, t)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plaintext {
    coeffs: Vec<u64>,
}

impl Plaintext {
    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }

    pub(crate) fn from_coeffs(coeffs: Vec<u64>) -> Self {
        Self { coeffs }
    }

    /// Lift into the ciphertext ring and transform, ready for
    /// [`Ciphertext::multiply_plain`](super::Ciphertext::multiply_plain).
    pub fn to_ntt(&self, ctx: &BfvContext) -> PlaintextNtt {
        let mut poly = Poly::from_unsigned(&self.coeffs, ctx.degree(), ctx.moduli());
        poly.to_ntt(ctx.ntt());
        PlaintextNtt(poly)
    }
}

/// Plaintext lifted into R_q and held in the NTT domain
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaintextNtt(pub(crate) Poly);

/// Batch encoder between slot vectors and plaintext polynomials
#[derive(Debug, Clone)]
pub struct BatchEncoder {
    ctx: Arc<BfvContext>,
    /// Slot index to position in the plaintext NTT output
    slot_to_ntt: Vec<usize>,
}

impl BatchEncoder {
    pub fn new(ctx: Arc<BfvContext>) -> Result<Self> {
        let n = ctx.degree();
        let t = ctx.params().plain_modulus;
        let plain = ctx.plain_ntt();

        // The NTT of X lists the evaluation point behind every output position.
        let mut x = vec![0u64; n];
        x[1] = 1;
        plain.forward(&mut x);
        let points: Vec<u64> = x.iter().map(|&v| plain.from_mont_at(v, 0)).collect();
        let position: HashMap<u64, usize> =
            points.iter().enumerate().map(|(i, &p)| (p, i)).collect();

        // Every point is a primitive 2n-th root; any of them serves as ζ.
        let zeta = points[0];
        let two_n = 2 * n as u64;
        let half = n / 2;
        let lookup = |exp: u64| -> Result<usize> {
            let point = NttContext::mod_pow(zeta, exp, t);
            position.get(&point).copied().ok_or_else(|| {
                PirError::InvalidParameters("plain modulus does not support batching".to_string())
            })
        };

        let mut slot_to_ntt = vec![0usize; n];
        let mut exp = 1u64;
        for k in 0..half {
            slot_to_ntt[k] = lookup(exp)?;
            slot_to_ntt[half + k] = lookup(two_n - exp)?;
            exp = exp * 3 % two_n;
        }

        Ok(Self { ctx, slot_to_ntt })
    }

    /// Number of slots
    pub fn slot_count(&self) -> usize {
        self.slot_to_ntt.len()
    }

    /// Encode slot values into a plaintext
    ///
    /// Values are reduced mod t; missing trailing slots are zero.
    ///
    /// # Panics
    ///
    /// Panics if more than `slot_count` values are given.
    pub fn encode(&self, values: &[u64]) -> Plaintext {
        assert!(values.len() <= self.slot_count(), "too many slot values");

        let plain = self.ctx.plain_ntt();
        let t = self.ctx.params().plain_modulus;
        let mut evals = vec![0u64; self.slot_count()];
        for (&pos, &v) in self.slot_to_ntt.iter().zip(values) {
            evals[pos] = plain.to_mont_at(v % t, 0);
        }
        plain.inverse(&mut evals);

        Plaintext { coeffs: evals }
    }

    /// Decode a plaintext into its slot values
    pub fn decode(&self, plaintext: &Plaintext) -> Vec<u64> {
        let plain = self.ctx.plain_ntt();
        let mut evals = plaintext.coeffs.clone();
        plain.forward(&mut evals);

        self.slot_to_ntt
            .iter()
            .map(|&pos| plain.from_mont_at(evals[pos], 0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::BfvParams;

    fn encoder(n: usize) -> BatchEncoder {
        BatchEncoder::new(BfvContext::new(BfvParams::with_degree(n)).unwrap()).unwrap()
    }

    fn apply_plain_automorphism(pt: &Plaintext, g: usize, t: u64) -> Plaintext {
        let n = pt.coeffs.len();
        let mut out = vec![0u64; n];
        for (i, &c) in pt.coeffs.iter().enumerate() {
            let target = (g * i) % (2 * n);
            if target < n {
                out[target] = c;
            } else {
                out[target - n] = (t - c) % t;
            }
        }
        Plaintext { coeffs: out }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let enc = encoder(4096);
        let values: Vec<u64> = (0..4096u64).map(|i| (i * 7919) % 270337).collect();
        assert_eq!(enc.decode(&enc.encode(&values)), values);
    }

    #[test]
    fn test_constant_slots_encode_to_constant_polynomial() {
        let enc = encoder(512);
        let pt = enc.encode(&[5; 512]);
        assert_eq!(pt.coeffs()[0], 5);
        assert!(pt.coeffs()[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_short_input_is_zero_padded() {
        let enc = encoder(512);
        let decoded = enc.decode(&enc.encode(&[1, 2, 3]));
        assert_eq!(&decoded[..3], &[1, 2, 3]);
        assert!(decoded[3..].iter().all(|&v| v == 0));
    }

    #[test]
    fn test_automorphism_three_rotates_rows_left() {
        let n = 512;
        let half = n / 2;
        let enc = encoder(n);
        let values: Vec<u64> = (0..n as u64).map(|i| i + 100).collect();
        let rotated = enc.decode(&apply_plain_automorphism(&enc.encode(&values), 3, 270337));

        for k in 0..half {
            assert_eq!(rotated[k], values[(k + 1) % half]);
            assert_eq!(rotated[half + k], values[half + (k + 1) % half]);
        }
    }

    #[test]
    fn test_automorphism_minus_one_swaps_rows() {
        let n = 512;
        let half = n / 2;
        let enc = encoder(n);
        let values: Vec<u64> = (0..n as u64).map(|i| i * 3 + 1).collect();
        let swapped = enc.decode(&apply_plain_automorphism(&enc.encode(&values), 2 * n - 1, 270337));

        assert_eq!(&swapped[..half], &values[half..]);
        assert_eq!(&swapped[half..], &values[..half]);
    }
}
