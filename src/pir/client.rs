//! PIR client: query construction and answer decoding
//!
//! A client owns one secret key and the Galois keys derived from it. Every
//! query re-encrypts its selection vector with fresh randomness, so any
//! number of queries may be outstanding at once and each of their answers
//! decodes. Nothing else is remembered between calls.

use std::sync::Arc;

use tracing::debug;

use crate::bfv::{
    column_swap_element, galois_element, BatchEncoder, BfvContext, Ciphertext, GaloisKeys,
    SecretKey,
};
use crate::codec::pack_lsb_bits_dyn;
use crate::math::GaussianSampler;
use crate::params::{BfvParams, Row, MESSAGE_SIZE};

use super::error::{malformed, PirError, Result};
use super::query::{Answer, Query};

/// PIR client state
pub struct PirClient {
    ctx: Arc<BfvContext>,
    encoder: BatchEncoder,
    sk: SecretKey,
    /// One right step and the row swap, all the server's fold needs
    galois_keys: GaloisKeys,
}

impl PirClient {
    pub fn new(params: BfvParams) -> Result<Self> {
        Self::with_context(BfvContext::new(params)?)
    }

    pub fn with_context(ctx: Arc<BfvContext>) -> Result<Self> {
        let encoder = BatchEncoder::new(ctx.clone())?;
        let mut sampler = GaussianSampler::new(ctx.params().sigma);

        let sk = SecretKey::generate(&ctx, &mut sampler);
        let n = ctx.degree();
        let elements = [galois_element(-1, n), column_swap_element(n)];
        let galois_keys = GaloisKeys::generate(&ctx, &sk, &elements, &mut sampler);

        Ok(Self {
            ctx,
            encoder,
            sk,
            galois_keys,
        })
    }

    pub fn context(&self) -> &Arc<BfvContext> {
        &self.ctx
    }

    /// Build an encrypted query for row `index`.
    ///
    /// `believed_row_count` is the client's own bound on the database size
    /// (normally [`crate::params::CLIENT_DB_ROWS`]), never a figure reported by
    /// the server. The query holds one ciphertext per chunk of that many rows:
    /// a one-hot vector for the chunk holding `index`, zero vectors for the
    /// rest, each freshly randomized.
    pub fn build_query(&self, index: usize, believed_row_count: usize) -> Result<Query> {
        if index >= believed_row_count {
            return Err(PirError::IndexOutOfRange {
                index,
                row_count: believed_row_count,
            });
        }

        Ok(self.encrypt_selection(Some(index), believed_row_count))
    }

    /// Build a cover-traffic query of the same shape that selects nothing.
    ///
    /// Indistinguishable from a real query to the server; its answer decodes
    /// to an all-zero row.
    pub fn build_dummy_query(&self, believed_row_count: usize) -> Result<Query> {
        if believed_row_count == 0 {
            return Err(PirError::IndexOutOfRange {
                index: 0,
                row_count: 0,
            });
        }

        Ok(self.encrypt_selection(None, believed_row_count))
    }

    fn encrypt_selection(&self, target: Option<usize>, rows: usize) -> Query {
        let n = self.ctx.degree();
        let chunk_count = self.ctx.params().chunk_count(rows);
        let mut sampler = GaussianSampler::new(self.ctx.params().sigma);

        let zero = self.encoder.encode(&[]);
        let ciphertexts = (0..chunk_count)
            .map(|chunk| match target {
                Some(index) if index / n == chunk => {
                    let mut one_hot = vec![0u64; n];
                    one_hot[index % n] = 1;
                    let pt = self.encoder.encode(&one_hot);
                    Ciphertext::encrypt(&self.ctx, &pt, &self.sk, &mut sampler)
                }
                _ => Ciphertext::encrypt(&self.ctx, &zero, &self.sk, &mut sampler),
            })
            .collect();

        debug!(chunk_count, dummy = target.is_none(), "built PIR query");

        Query {
            galois_keys: self.galois_keys.clone(),
            ciphertexts,
        }
    }

    /// Decrypt an answer for `index` back into the row's bytes.
    ///
    /// The server leaves coefficient i of the row in slot
    /// `(index + i) mod n/2` of the row half holding `index`, with the upper
    /// columns in the other half. Decoding undoes that placement and repacks
    /// the coefficients. Every slot past the row's columns, and every packed
    /// bit past `MESSAGE_SIZE` bytes, is zero in a genuine answer; anything
    /// else is [`PirError::Undecodable`].
    pub fn decode(&self, answer: &Answer, index: usize) -> Result<Row> {
        if !answer.ciphertext.fits(&self.ctx) {
            return Err(malformed!("answer was computed in a different ring"));
        }

        let plaintext = answer.ciphertext.decrypt(&self.ctx, &self.sk);
        let mut slots = self.encoder.decode(&plaintext);

        let n = slots.len();
        let half = n / 2;
        if index % n >= half {
            slots.rotate_left(half);
        }
        let offset = index % half;
        slots[..half].rotate_left(offset);
        slots[half..].rotate_left(offset);

        let params = self.ctx.params();
        let db_columns = params.db_columns();
        if slots[db_columns..].iter().any(|&v| v != 0) {
            return Err(PirError::Undecodable(index));
        }

        let bytes = pack_lsb_bits_dyn(&slots[..db_columns], params.plain_bits);
        if bytes[MESSAGE_SIZE..].iter().any(|&b| b != 0) {
            return Err(PirError::Undecodable(index));
        }

        let mut row = [0u8; MESSAGE_SIZE];
        row.copy_from_slice(&bytes[..MESSAGE_SIZE]);
        Ok(row)
    }
}

impl std::fmt::Debug for PirClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PirClient")
            .field("params", self.ctx.params())
            .finish_non_exhaustive()
    }
}
