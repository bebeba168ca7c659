//! BFV ciphertexts: symmetric encryption, decryption and the linear
//! operations the PIR server needs.
//!
//! A ciphertext (c0, c1) decrypts under s as c0 + c1·s = Δ·m + e (mod q)
//! with Δ = ⌊q/t⌋; decryption recovers m = round(t·(c0 + c1·s)/q) mod t.

use super::context::BfvContext;
use super::encoder::{Plaintext, PlaintextNtt};
use super::keys::SecretKey;
use crate::math::{scale_round, GaussianSampler, Poly};

/// BFV ciphertext
///
/// Both components are in the same domain. Ciphertexts cross API and wire
/// boundaries in the coefficient domain; the NTT domain is used while
/// accumulating plaintext products.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ciphertext {
    pub(crate) c0: Poly,
    pub(crate) c1: Poly,
}

impl Ciphertext {
    /// Encrypt under the secret key with fresh randomness
    ///
    /// Every call draws a new uniform mask c1 and a new error e, so two
    /// encryptions of the same plaintext are unrelated.
    pub fn encrypt(
        ctx: &BfvContext,
        plaintext: &Plaintext,
        sk: &SecretKey,
        sampler: &mut GaussianSampler,
    ) -> Self {
        let n = ctx.degree();
        let moduli = ctx.moduli();

        let a = Poly::random(n, moduli, sampler);
        let e = Poly::sample_gaussian(n, moduli, sampler);

        let mut a_s = a.to_ntt_new(ctx.ntt()).mul(sk.ntt_form(), ctx.ntt());
        a_s.from_ntt(ctx.ntt());

        let mut scaled = Poly::from_unsigned(plaintext.coeffs(), n, moduli);
        scaled.scalar_mul_assign(ctx.delta_rns());

        // c0 = Δm + e - a·s
        let mut c0 = &scaled + &e;
        c0 -= &a_s;

        Self { c0, c1: a }
    }

    /// Transparent encryption of zero
    pub fn zero(ctx: &BfvContext) -> Self {
        Self {
            c0: Poly::zero(ctx.degree(), ctx.moduli()),
            c1: Poly::zero(ctx.degree(), ctx.moduli()),
        }
    }

    /// Decrypt to a plaintext with coefficients in [0, t)
    pub fn decrypt(&self, ctx: &BfvContext, sk: &SecretKey) -> Plaintext {
        let mut ct = self.clone();
        ct.from_ntt(ctx);

        let mut c1_s = ct.c1.to_ntt_new(ctx.ntt()).mul(sk.ntt_form(), ctx.ntt());
        c1_s.from_ntt(ctx.ntt());
        let phase = &ct.c0 + &c1_s;

        let t = ctx.params().plain_modulus;
        let q = ctx.params().coeff_modulus();
        let (r0, r1) = (phase.block(0), phase.block(1));
        let coeffs = r0
            .iter()
            .zip(r1)
            .map(|(&a0, &a1)| scale_round(ctx.compose(a0, a1), t, q))
            .collect();

        Plaintext::from_coeffs(coeffs)
    }

    /// Whether both components belong to `ctx`'s ring
    pub fn fits(&self, ctx: &BfvContext) -> bool {
        [&self.c0, &self.c1]
            .iter()
            .all(|p| p.dimension() == ctx.degree() && p.moduli() == ctx.moduli())
    }

    pub fn is_ntt(&self) -> bool {
        self.c0.is_ntt()
    }

    /// Move both components to the NTT domain
    pub fn to_ntt(&mut self, ctx: &BfvContext) {
        self.c0.to_ntt(ctx.ntt());
        self.c1.to_ntt(ctx.ntt());
    }

    /// Move both components to the coefficient domain
    pub fn from_ntt(&mut self, ctx: &BfvContext) {
        self.c0.from_ntt(ctx.ntt());
        self.c1.from_ntt(ctx.ntt());
    }

    /// Homomorphic addition; both operands must share a domain
    pub fn add_assign(&mut self, other: &Ciphertext) {
        self.c0 += &other.c0;
        self.c1 += &other.c1;
    }

    /// Ciphertext × plaintext product (NTT domain in and out)
    pub fn multiply_plain(&self, plaintext: &PlaintextNtt, ctx: &BfvContext) -> Ciphertext {
        assert!(self.is_ntt(), "multiply_plain requires an NTT-domain ciphertext");
        Self {
            c0: self.c0.mul(&plaintext.0, ctx.ntt()),
            c1: self.c1.mul(&plaintext.0, ctx.ntt()),
        }
    }

    /// Fused `self += ct × plaintext`, all in the NTT domain
    pub fn multiply_plain_acc(&mut self, ct: &Ciphertext, plaintext: &PlaintextNtt, ctx: &BfvContext) {
        self.c0.mul_acc(&ct.c0, &plaintext.0, ctx.ntt());
        self.c1.mul_acc(&ct.c1, &plaintext.0, ctx.ntt());
    }

    /// NTT-domain zero, the starting point for `multiply_plain_acc`
    pub fn zero_ntt(ctx: &BfvContext) -> Self {
        let mut zero = Self::zero(ctx);
        zero.to_ntt(ctx);
        zero
    }
}
