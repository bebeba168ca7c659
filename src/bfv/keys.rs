//! Secret keys

use zeroize::Zeroize;

use super::context::BfvContext;
use crate::math::{GaussianSampler, Poly};

/// Ternary BFV secret key s ∈ {-1, 0, 1}^n
///
/// Kept in both domains: the coefficient form feeds Galois key generation
/// (τ_g(s)), the NTT form every product with s. Both are wiped on drop.
pub struct SecretKey {
    coeff: Poly,
    ntt: Poly,
}

impl SecretKey {
    pub fn generate(ctx: &BfvContext, sampler: &mut GaussianSampler) -> Self {
        let n = ctx.degree();
        let mut values = sampler.sample_ternary(n);
        let coeff = Poly::from_signed(&values, n, ctx.moduli());
        values.zeroize();

        let ntt = coeff.to_ntt_new(ctx.ntt());
        Self { coeff, ntt }
    }

    pub(crate) fn coeff_form(&self) -> &Poly {
        &self.coeff
    }

    pub(crate) fn ntt_form(&self) -> &Poly {
        &self.ntt
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.coeff.coeffs_mut().zeroize();
        self.ntt.coeffs_mut().zeroize();
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("degree", &self.coeff.dimension())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::BfvParams;

    #[test]
    fn test_secret_is_ternary() {
        let ctx = BfvContext::new(BfvParams::with_degree(512)).unwrap();
        let mut sampler = GaussianSampler::with_seed(3.2, 3);
        let sk = SecretKey::generate(&ctx, &mut sampler);

        for (idx, &q) in ctx.moduli().iter().enumerate() {
            assert!(sk
                .coeff_form()
                .block(idx)
                .iter()
                .all(|&c| c == 0 || c == 1 || c == q - 1));
        }

        let mut back = sk.ntt_form().clone();
        back.from_ntt(ctx.ntt());
        assert_eq!(&back, sk.coeff_form());
    }

    #[test]
    fn test_debug_does_not_leak() {
        let ctx = BfvContext::new(BfvParams::with_degree(512)).unwrap();
        let sk = SecretKey::generate(&ctx, &mut GaussianSampler::with_seed(3.2, 4));
        let shown = format!("{:?}", sk);
        assert_eq!(shown, "SecretKey { degree: 512, .. }");
    }
}
