//! Shared precomputation for one parameter set

use std::sync::Arc;

use crate::math::{crt_compose_2, mod_inverse, NttContext};
use crate::params::BfvParams;
use crate::pir::error::{PirError, Result};

/// Validated parameters plus every table derived from them.
///
/// Built once and shared behind an `Arc` by encoders, keys, clients and
/// servers.
#[derive(Debug)]
pub struct BfvContext {
    params: BfvParams,
    /// NTT over the ciphertext RNS base
    ntt: NttContext,
    /// NTT over the plaintext modulus, used by batching
    plain_ntt: NttContext,
    /// Δ mod q_i
    delta_rns: Vec<u64>,
    /// q_0^(-1) mod q_1
    q0_inv_mod_q1: u64,
    fingerprint: u64,
}

impl BfvContext {
    /// Validate `params` and precompute NTT tables.
    pub fn new(params: BfvParams) -> Result<Arc<Self>> {
        params.validate()?;

        let n = params.poly_degree;
        let moduli = &params.coeff_moduli;
        let ntt = NttContext::with_moduli(n, moduli);
        let plain_ntt = NttContext::new(n, params.plain_modulus);

        let delta = params.delta();
        let delta_rns = moduli.iter().map(|&q| (delta % q as u128) as u64).collect();
        let q0_inv_mod_q1 = mod_inverse(moduli[0], moduli[1]).ok_or_else(|| {
            PirError::InvalidParameters("coefficient moduli must be coprime".to_string())
        })?;
        let fingerprint = params.fingerprint();

        Ok(Arc::new(Self {
            params,
            ntt,
            plain_ntt,
            delta_rns,
            q0_inv_mod_q1,
            fingerprint,
        }))
    }

    pub fn params(&self) -> &BfvParams {
        &self.params
    }

    /// Polynomial degree n
    pub fn degree(&self) -> usize {
        self.params.poly_degree
    }

    /// Ciphertext RNS moduli
    pub fn moduli(&self) -> &[u64] {
        &self.params.coeff_moduli
    }

    pub fn ntt(&self) -> &NttContext {
        &self.ntt
    }

    pub fn plain_ntt(&self) -> &NttContext {
        &self.plain_ntt
    }

    pub fn delta_rns(&self) -> &[u64] {
        &self.delta_rns
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Residues (mod q_0, mod q_1) to the integer in [0, q)
    #[inline]
    pub(crate) fn compose(&self, a0: u64, a1: u64) -> u128 {
        let moduli = self.moduli();
        crt_compose_2(a0, a1, moduli[0], moduli[1], self.q0_inv_mod_q1)
    }
}
