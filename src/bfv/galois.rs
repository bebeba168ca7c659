//! Galois automorphisms and slot rotations
//!
//! τ_g: X ↦ X^g maps an encryption under s to an encryption under τ_g(s).
//! A key-switching key for g brings it back under s. Keys use the RNS
//! gadget: digit i of c1 is its residue modulo q_i, and row i of the key
//! encrypts τ_g(s) scaled by the CRT idempotent of q_i (1 mod q_i, 0 mod
//! the other prime).
//!
//! For the batching layout (see [`super::encoder`]):
//! - g = 3^k (mod 2n) rotates both slot rows left by k
//! - g = 2n - 1 swaps the two rows

use std::collections::BTreeMap;

use super::ciphertext::Ciphertext;
use super::context::BfvContext;
use super::keys::SecretKey;
use crate::math::{GaussianSampler, Poly};
use crate::pir::error::{PirError, Result};

/// Galois element rotating slot rows by `steps` (positive = left)
pub fn galois_element(steps: isize, n: usize) -> usize {
    let half = (n / 2) as isize;
    let k = steps.rem_euclid(half) as u32;
    let two_n = 2 * n;

    let mut g = 1usize;
    for _ in 0..k {
        g = g * 3 % two_n;
    }
    g
}

/// Galois element swapping the two slot rows
pub fn column_swap_element(n: usize) -> usize {
    2 * n - 1
}

/// Key-switching key from τ_g(s) to s, one (b_i, a_i) row per RNS modulus,
/// stored in the NTT domain
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySwitchKey {
    pub(crate) rows: Vec<(Poly, Poly)>,
}

impl KeySwitchKey {
    fn generate(ctx: &BfvContext, sk: &SecretKey, g: usize, sampler: &mut GaussianSampler) -> Self {
        let n = ctx.degree();
        let moduli = ctx.moduli();
        let ntt = ctx.ntt();
        let s_g = sk.coeff_form().automorphism(g).to_ntt_new(ntt);

        let rows = (0..moduli.len())
            .map(|i| {
                let a = Poly::random(n, moduli, sampler).to_ntt_new(ntt);
                let e = Poly::sample_gaussian(n, moduli, sampler).to_ntt_new(ntt);

                // b = -a·s + e + τ_g(s)·[1 mod q_i, 0 elsewhere]
                let mut b = &e - &a.mul(sk.ntt_form(), ntt);
                let q_i = moduli[i];
                for (dst, &src) in b.block_mut(i).iter_mut().zip(s_g.block(i)) {
                    let sum = *dst + src;
                    *dst = if sum >= q_i { sum - q_i } else { sum };
                }
                (b, a)
            })
            .collect();

        Self { rows }
    }

    /// Switch (c0, c1), valid under τ_g(s), to a ciphertext valid under s
    fn switch(&self, ctx: &BfvContext, c0: Poly, c1: &Poly) -> Ciphertext {
        let n = ctx.degree();
        let moduli = ctx.moduli();
        let ntt = ctx.ntt();

        let mut acc0 = Poly::zero(n, moduli).to_ntt_new(ntt);
        let mut acc1 = acc0.clone();
        for (i, (b, a)) in self.rows.iter().enumerate() {
            let digit = Poly::from_unsigned(c1.block(i), n, moduli).to_ntt_new(ntt);
            acc0.mul_acc(&digit, b, ntt);
            acc1.mul_acc(&digit, a, ntt);
        }
        acc0.from_ntt(ntt);
        acc1.from_ntt(ntt);

        acc0 += &c0;
        Ciphertext { c0: acc0, c1: acc1 }
    }
}

/// Rotation key material, indexed by Galois element
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GaloisKeys {
    pub(crate) keys: BTreeMap<usize, KeySwitchKey>,
}

impl GaloisKeys {
    /// Generate keys for each Galois element in `elements`
    pub fn generate(
        ctx: &BfvContext,
        sk: &SecretKey,
        elements: &[usize],
        sampler: &mut GaussianSampler,
    ) -> Self {
        let keys = elements
            .iter()
            .map(|&g| (g, KeySwitchKey::generate(ctx, sk, g, sampler)))
            .collect();
        Self { keys }
    }

    pub fn contains(&self, g: usize) -> bool {
        self.keys.contains_key(&g)
    }

    /// Whether every key was generated in `ctx`'s ring
    pub fn fits(&self, ctx: &BfvContext) -> bool {
        let two_n = 2 * ctx.degree();
        self.keys.iter().all(|(&g, key)| {
            g % 2 == 1
                && g < two_n
                && key.rows.len() == ctx.moduli().len()
                && key.rows.iter().all(|(b, a)| {
                    [b, a]
                        .iter()
                        .all(|p| p.dimension() == ctx.degree() && p.moduli() == ctx.moduli())
                })
        })
    }

    /// Apply τ_g to a coefficient-domain ciphertext and switch back to s
    pub fn apply(&self, ctx: &BfvContext, ct: &Ciphertext, g: usize) -> Result<Ciphertext> {
        let key = self.keys.get(&g).ok_or(PirError::MissingGaloisKey(g))?;
        let c0 = ct.c0.automorphism(g);
        let c1 = ct.c1.automorphism(g);
        Ok(key.switch(ctx, c0, &c1))
    }

    /// Rotate both slot rows by `steps` (positive = left)
    pub fn rotate_rows(&self, ctx: &BfvContext, ct: &Ciphertext, steps: isize) -> Result<Ciphertext> {
        let g = galois_element(steps, ctx.degree());
        if g == 1 {
            return Ok(ct.clone());
        }
        self.apply(ctx, ct, g)
    }

    /// Swap the two slot rows
    pub fn rotate_columns(&self, ctx: &BfvContext, ct: &Ciphertext) -> Result<Ciphertext> {
        self.apply(ctx, ct, column_swap_element(ctx.degree()))
    }
}
