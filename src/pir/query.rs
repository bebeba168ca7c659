//! PIR query and answer messages
//!
//! Wire layout:
//! - Query: Galois key record, then one ciphertext record per chunk, with no
//!   count or delimiters; the reader consumes ciphertexts until the input is
//!   exhausted.
//! - Answer: exactly one ciphertext record.

use crate::bfv::{wire, BfvContext, Ciphertext, GaloisKeys};

use super::error::{malformed, Result};

/// Encrypted selection vector, one ciphertext per database chunk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    pub(crate) galois_keys: GaloisKeys,
    pub(crate) ciphertexts: Vec<Ciphertext>,
}

impl Query {
    /// Number of chunks the query covers
    pub fn chunk_count(&self) -> usize {
        self.ciphertexts.len()
    }

    pub fn galois_keys(&self) -> &GaloisKeys {
        &self.galois_keys
    }

    pub fn ciphertexts(&self) -> &[Ciphertext] {
        &self.ciphertexts
    }

    pub fn to_bytes(&self, ctx: &BfvContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        wire::write_galois_keys(ctx, &self.galois_keys, &mut out)?;
        for ct in &self.ciphertexts {
            wire::write_ciphertext(ctx, ct, &mut out)?;
        }
        Ok(out)
    }

    pub fn from_bytes(ctx: &BfvContext, bytes: &[u8]) -> Result<Self> {
        let mut input = bytes;
        let galois_keys = wire::read_galois_keys(ctx, &mut input)?;

        let mut ciphertexts = Vec::new();
        while !input.is_empty() {
            ciphertexts.push(wire::read_ciphertext(ctx, &mut input)?);
        }
        if ciphertexts.is_empty() {
            return Err(malformed!("query carries no ciphertexts"));
        }

        Ok(Self {
            galois_keys,
            ciphertexts,
        })
    }
}

/// Encrypted row, decodable only with the query's secret key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Answer {
    pub(crate) ciphertext: Ciphertext,
}

impl Answer {
    pub fn ciphertext(&self) -> &Ciphertext {
        &self.ciphertext
    }

    pub fn to_bytes(&self, ctx: &BfvContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        wire::write_ciphertext(ctx, &self.ciphertext, &mut out)?;
        Ok(out)
    }

    pub fn from_bytes(ctx: &BfvContext, bytes: &[u8]) -> Result<Self> {
        let mut input = bytes;
        let ciphertext = wire::read_ciphertext(ctx, &mut input)?;
        if !input.is_empty() {
            return Err(malformed!("{} trailing bytes after answer", input.len()));
        }
        Ok(Self { ciphertext })
    }
}
