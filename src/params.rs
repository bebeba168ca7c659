//! Parameter sets for the mailbox PIR scheme
//!
//! Every client and server must agree on these values. Serialized keys and
//! ciphertexts carry [`BfvParams::fingerprint`] so that a mismatch is
//! rejected at deserialization instead of decrypting to garbage.

use serde::{Deserialize, Serialize};

use crate::pir::error::{PirError, Result};

/// Size in bytes of one database row.
pub const MESSAGE_SIZE: usize = 1024;

/// One database row: an opaque, fixed-size mailbox slot.
pub type Row = [u8; MESSAGE_SIZE];

/// Size in bits of one database row.
pub const MESSAGE_SIZE_BITS: usize = MESSAGE_SIZE * 8;

/// Meaningful bits per plaintext coefficient.
pub const PLAIN_BITS: usize = 18;

/// Plaintext coefficients needed to represent one row.
pub const SEAL_DB_COLUMNS: usize = MESSAGE_SIZE_BITS.div_ceil(PLAIN_BITS);

/// Client-trusted upper bound on the number of rows held by the server.
///
/// Queries are always sized against this bound rather than the row count the
/// server reports, so a server cannot partition clients by lying about it.
pub const CLIENT_DB_ROWS: usize = 360_000;

/// 54-bit NTT-friendly prime, ≡ 1 (mod 8192).
pub const PRIME_54: u64 = 18014398509309953;

/// 55-bit NTT-friendly prime, ≡ 1 (mod 8192).
pub const PRIME_55: u64 = 36028797018652673;

/// Batching-friendly plaintext prime, ≡ 1 (mod 8192).
pub const PLAIN_MODULUS: u64 = 270337;

/// Default Gaussian error width.
pub const DEFAULT_SIGMA: f64 = 3.2;

/// BFV parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BfvParams {
    /// Polynomial degree n (power of two)
    pub poly_degree: usize,

    /// RNS coefficient moduli q_0, q_1 with q = q_0 · q_1
    /// Each must be NTT-friendly: q_i ≡ 1 (mod 2n)
    pub coeff_moduli: Vec<u64>,

    /// Plaintext modulus t, ≡ 1 (mod 2n) so that batching is available
    pub plain_modulus: u64,

    /// Bits of each plaintext coefficient carrying row data
    pub plain_bits: usize,

    /// Standard deviation for Gaussian error sampling
    pub sigma: f64,
}

impl BfvParams {
    /// Production parameters: n = 4096, 109-bit q, t = 270337
    pub fn production() -> Self {
        Self::with_degree(4096)
    }

    /// Same moduli at a different degree.
    ///
    /// The moduli are ≡ 1 (mod 8192), so any power-of-two degree up to 4096
    /// keeps them NTT-friendly. Smaller degrees are insecure and only meant
    /// for tests.
    pub fn with_degree(poly_degree: usize) -> Self {
        Self {
            poly_degree,
            coeff_moduli: vec![PRIME_54, PRIME_55],
            plain_modulus: PLAIN_MODULUS,
            plain_bits: PLAIN_BITS,
            sigma: DEFAULT_SIGMA,
        }
    }

    /// Number of plaintext slots (SlotCount)
    pub fn slot_count(&self) -> usize {
        self.poly_degree
    }

    /// Slots per batching row; the slot matrix is 2 × (n/2)
    pub fn row_size(&self) -> usize {
        self.poly_degree / 2
    }

    /// Plaintext coefficients per database row
    pub fn db_columns(&self) -> usize {
        MESSAGE_SIZE_BITS.div_ceil(self.plain_bits)
    }

    /// Number of chunks needed to cover `rows` database rows
    pub fn chunk_count(&self, rows: usize) -> usize {
        rows.div_ceil(self.slot_count())
    }

    /// Composite coefficient modulus q
    pub fn coeff_modulus(&self) -> u128 {
        self.coeff_moduli.iter().map(|&q| q as u128).product()
    }

    /// Scaling factor Δ = ⌊q/t⌋
    pub fn delta(&self) -> u128 {
        self.coeff_modulus() / self.plain_modulus as u128
    }

    /// Stable digest of everything that changes the meaning of serialized
    /// keys and ciphertexts.
    pub fn fingerprint(&self) -> u64 {
        let mut state = blake2b_simd::Params::new().hash_length(8).to_state();
        state.update(b"mailbox-pir/bfv");
        state.update(&(self.poly_degree as u64).to_le_bytes());
        for q in &self.coeff_moduli {
            state.update(&q.to_le_bytes());
        }
        state.update(&self.plain_modulus.to_le_bytes());
        state.update(&(self.plain_bits as u64).to_le_bytes());

        let mut out = [0u8; 8];
        out.copy_from_slice(state.finalize().as_bytes());
        u64::from_le_bytes(out)
    }

    /// Check if parameters are usable
    pub fn validate(&self) -> Result<()> {
        let n = self.poly_degree;
        if !n.is_power_of_two() || n < 8 {
            return Err(invalid("poly_degree must be a power of two >= 8"));
        }
        let two_n = 2 * n as u64;

        if self.coeff_moduli.len() != 2 {
            return Err(invalid("exactly two coefficient moduli are supported"));
        }
        for &q in &self.coeff_moduli {
            if q >= 1 << 62 {
                return Err(invalid("coefficient moduli must be below 2^62"));
            }
            if q % two_n != 1 {
                return Err(invalid("coefficient moduli must be ≡ 1 (mod 2n)"));
            }
            if q <= self.plain_modulus {
                return Err(invalid("coefficient moduli must exceed the plaintext modulus"));
            }
        }
        if self.coeff_moduli[0] == self.coeff_moduli[1] {
            return Err(invalid("coefficient moduli must be distinct"));
        }

        if self.plain_modulus % two_n != 1 {
            return Err(invalid("plain_modulus must be ≡ 1 (mod 2n) for batching"));
        }
        if self.plain_bits == 0 || self.plain_bits > 63 {
            return Err(invalid("plain_bits must be in 1..=63"));
        }
        if self.plain_modulus < 1 << self.plain_bits {
            return Err(invalid("plain_modulus must hold plain_bits bits"));
        }
        if self.db_columns() > self.slot_count() {
            return Err(invalid("a row must fit in one ciphertext's slots"));
        }
        if self.sigma.is_nan() || self.sigma <= 0.0 {
            return Err(invalid("sigma must be positive"));
        }

        Ok(())
    }
}

impl Default for BfvParams {
    fn default() -> Self {
        Self::production()
    }
}

fn invalid(msg: &str) -> PirError {
    PirError::InvalidParameters(msg.to_string())
}
