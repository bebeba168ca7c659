//! Byte encoding of ciphertexts and Galois keys
//!
//! Records are bincode with fixed-width little-endian integers. Each record
//! starts with the parameter fingerprint, so material produced under other
//! parameters is refused instead of being misread. Polynomials travel in the
//! coefficient domain and every residue is checked against its modulus.

use bincode::Options;
use serde::{Deserialize, Serialize};

use super::ciphertext::Ciphertext;
use super::context::BfvContext;
use super::galois::{GaloisKeys, KeySwitchKey};
use crate::math::Poly;
use crate::pir::error::{malformed, PirError, Result};

/// Upper bound on a single record; generous for n = 4096.
const MAX_RECORD_BYTES: u64 = 1 << 26;

#[derive(Serialize, Deserialize)]
struct CiphertextRecord {
    fingerprint: u64,
    c0: Vec<u64>,
    c1: Vec<u64>,
}

#[derive(Serialize, Deserialize)]
struct GaloisKeysRecord {
    fingerprint: u64,
    keys: Vec<GaloisKeyRecord>,
}

#[derive(Serialize, Deserialize)]
struct GaloisKeyRecord {
    element: u64,
    /// (b_i, a_i) per RNS modulus
    rows: Vec<(Vec<u64>, Vec<u64>)>,
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(MAX_RECORD_BYTES)
}

/// Append the encoding of a ciphertext to `out`
pub fn write_ciphertext(ctx: &BfvContext, ct: &Ciphertext, out: &mut Vec<u8>) -> Result<()> {
    let mut ct = ct.clone();
    ct.from_ntt(ctx);
    let record = CiphertextRecord {
        fingerprint: ctx.fingerprint(),
        c0: ct.c0.coeffs().to_vec(),
        c1: ct.c1.coeffs().to_vec(),
    };
    options().serialize_into(out, &record)?;
    Ok(())
}

/// Read one ciphertext from the front of `input`, advancing it
pub fn read_ciphertext(ctx: &BfvContext, input: &mut &[u8]) -> Result<Ciphertext> {
    let record: CiphertextRecord = options().deserialize_from(input)?;
    check_fingerprint(ctx, record.fingerprint)?;
    Ok(Ciphertext {
        c0: poly_from_wire(ctx, record.c0)?,
        c1: poly_from_wire(ctx, record.c1)?,
    })
}

/// Append the encoding of a Galois key set to `out`
pub fn write_galois_keys(ctx: &BfvContext, keys: &GaloisKeys, out: &mut Vec<u8>) -> Result<()> {
    let ntt = ctx.ntt();
    let keys = keys
        .keys
        .iter()
        .map(|(&element, key)| GaloisKeyRecord {
            element: element as u64,
            rows: key
                .rows
                .iter()
                .map(|(b, a)| {
                    let mut b = b.clone();
                    let mut a = a.clone();
                    b.from_ntt(ntt);
                    a.from_ntt(ntt);
                    (b.coeffs().to_vec(), a.coeffs().to_vec())
                })
                .collect(),
        })
        .collect();

    let record = GaloisKeysRecord {
        fingerprint: ctx.fingerprint(),
        keys,
    };
    options().serialize_into(out, &record)?;
    Ok(())
}

/// Read a Galois key set from the front of `input`, advancing it
pub fn read_galois_keys(ctx: &BfvContext, input: &mut &[u8]) -> Result<GaloisKeys> {
    let record: GaloisKeysRecord = options().deserialize_from(input)?;
    check_fingerprint(ctx, record.fingerprint)?;

    let two_n = 2 * ctx.degree() as u64;
    let mut keys = GaloisKeys::default();
    for key in record.keys {
        if key.element % 2 == 0 || key.element >= two_n {
            return Err(malformed!("invalid Galois element {}", key.element));
        }
        if key.rows.len() != ctx.moduli().len() {
            return Err(malformed!(
                "Galois key has {} rows, expected {}",
                key.rows.len(),
                ctx.moduli().len()
            ));
        }

        let rows = key
            .rows
            .into_iter()
            .map(|(b, a)| {
                let mut b = poly_from_wire(ctx, b)?;
                let mut a = poly_from_wire(ctx, a)?;
                b.to_ntt(ctx.ntt());
                a.to_ntt(ctx.ntt());
                Ok((b, a))
            })
            .collect::<Result<Vec<_>>>()?;

        if keys.keys.insert(key.element as usize, KeySwitchKey { rows }).is_some() {
            return Err(malformed!("duplicate Galois element {}", key.element));
        }
    }

    Ok(keys)
}

fn check_fingerprint(ctx: &BfvContext, found: u64) -> Result<()> {
    if found != ctx.fingerprint() {
        return Err(PirError::ParameterMismatch {
            expected: ctx.fingerprint(),
            found,
        });
    }
    Ok(())
}

fn poly_from_wire(ctx: &BfvContext, coeffs: Vec<u64>) -> Result<Poly> {
    let n = ctx.degree();
    let moduli = ctx.moduli();
    if coeffs.len() != n * moduli.len() {
        return Err(malformed!(
            "polynomial has {} residues, expected {}",
            coeffs.len(),
            n * moduli.len()
        ));
    }
    for (block, &q) in coeffs.chunks(n).zip(moduli) {
        if block.iter().any(|&c| c >= q) {
            return Err(malformed!("residue out of range for modulus {}", q));
        }
    }
    Ok(Poly::from_rns(coeffs, n, moduli))
}
