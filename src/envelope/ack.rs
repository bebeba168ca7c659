//! Sealed acks and ack rows
//!
//! An ack is the little-endian u32 id of the last message received from a
//! friend. A row holds [`MAX_FRIENDS`] ack slots of [`ENCRYPTED_ACK_BYTES`]
//! each, every slot filled so that the number of friends does not show.

use chacha20poly1305::{
    aead::{Aead, AeadCore, OsRng},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

use super::{cipher, EnvelopeError, Result};
use super::{ACK_BYTES, ENCRYPTED_ACK_BYTES, KEY_BYTES, MAX_FRIENDS, NONCE_BYTES};
use crate::params::{Row, MESSAGE_SIZE};

/// One sealed ack: `[ciphertext + tag (20)][nonce (24)]`
pub type AckBlob = [u8; ENCRYPTED_ACK_BYTES];

const ACK_BODY_LEN: usize = ENCRYPTED_ACK_BYTES - NONCE_BYTES;

pub fn seal_ack(ack_id: u32, write_key: &[u8]) -> Result<AckBlob> {
    let cipher = cipher(write_key)?;
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, ack_id.to_le_bytes().as_slice())
        .map_err(|_| EnvelopeError::InvalidLength {
            expected: ACK_BYTES,
            found: ACK_BYTES,
        })?;

    let mut blob = [0u8; ENCRYPTED_ACK_BYTES];
    blob[..ACK_BODY_LEN].copy_from_slice(&ciphertext);
    blob[ACK_BODY_LEN..].copy_from_slice(&nonce);
    Ok(blob)
}

pub fn open_ack(blob: &[u8], read_key: &[u8]) -> Result<u32> {
    let cipher = cipher(read_key)?;
    if blob.len() != ENCRYPTED_ACK_BYTES {
        return Err(EnvelopeError::InvalidLength {
            expected: ENCRYPTED_ACK_BYTES,
            found: blob.len(),
        });
    }

    let (ciphertext, nonce) = blob.split_at(ACK_BODY_LEN);
    let plaintext = cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| EnvelopeError::Authentication)?;

    let id: [u8; ACK_BYTES] = plaintext
        .as_slice()
        .try_into()
        .map_err(|_| EnvelopeError::Malformed(format!("ack of {} bytes", plaintext.len())))?;
    Ok(u32::from_le_bytes(id))
}

/// Seal a full ack row.
///
/// `acks[i]` is the (ack id, write key) for the friend assigned slot `i`.
/// Empty and missing slots get an ack sealed under a throwaway random key;
/// the bytes after the last slot are zero.
pub fn seal_ack_row(acks: &[Option<(u32, &[u8])>]) -> Result<Row> {
    if acks.len() > MAX_FRIENDS {
        return Err(EnvelopeError::InvalidLength {
            expected: MAX_FRIENDS,
            found: acks.len(),
        });
    }

    let mut row = [0u8; MESSAGE_SIZE];
    for (slot, out) in row.chunks_exact_mut(ENCRYPTED_ACK_BYTES).enumerate() {
        let blob = match acks.get(slot).copied().flatten() {
            Some((ack_id, write_key)) => seal_ack(ack_id, write_key)?,
            None => {
                let mut dummy_key = Zeroizing::new([0u8; KEY_BYTES]);
                rand::rngs::OsRng.fill_bytes(dummy_key.as_mut_slice());
                seal_ack(0, dummy_key.as_slice())?
            }
        };
        out.copy_from_slice(&blob);
    }
    Ok(row)
}

/// Find and open the ack sealed for `read_key` in an ack row.
///
/// Returns the first slot that authenticates.
pub fn open_ack_row(row: &[u8], read_key: &[u8]) -> Result<u32> {
    cipher(read_key)?;
    if row.len() != MESSAGE_SIZE {
        return Err(EnvelopeError::InvalidLength {
            expected: MESSAGE_SIZE,
            found: row.len(),
        });
    }

    row.chunks_exact(ENCRYPTED_ACK_BYTES)
        .find_map(|blob| open_ack(blob, read_key).ok())
        .ok_or(EnvelopeError::Authentication)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRITE: [u8; KEY_BYTES] = [1u8; KEY_BYTES];

    #[test]
    fn test_ack_roundtrip() {
        let blob = seal_ack(42, &WRITE).unwrap();
        assert_eq!(open_ack(&blob, &WRITE).unwrap(), 42);
        assert_eq!(open_ack(&seal_ack(u32::MAX, &WRITE).unwrap(), &WRITE).unwrap(), u32::MAX);
    }

    #[test]
    fn test_ack_wrong_key() {
        let blob = seal_ack(42, &WRITE).unwrap();
        assert!(matches!(
            open_ack(&blob, &[2u8; KEY_BYTES]),
            Err(EnvelopeError::Authentication)
        ));
    }

    #[test]
    fn test_ack_bad_lengths() {
        assert!(matches!(
            seal_ack(1, &[0u8; 12]),
            Err(EnvelopeError::InvalidKeyLength { .. })
        ));
        assert!(matches!(
            open_ack(&[0u8; 43], &WRITE),
            Err(EnvelopeError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_ack_row_slots() {
        let alice = [3u8; KEY_BYTES];
        let bob = [4u8; KEY_BYTES];
        let carol = [5u8; KEY_BYTES];

        let mut acks: Vec<Option<(u32, &[u8])>> = vec![None; 5];
        acks[1] = Some((11, &alice[..]));
        acks[4] = Some((44, &bob[..]));
        let row = seal_ack_row(&acks).unwrap();

        assert_eq!(open_ack_row(&row, &alice).unwrap(), 11);
        assert_eq!(open_ack_row(&row, &bob).unwrap(), 44);
        assert!(matches!(open_ack_row(&row, &carol), Err(EnvelopeError::Authentication)));

        // every slot is occupied, the tail is zero
        let tail = MAX_FRIENDS * ENCRYPTED_ACK_BYTES;
        assert!(row[..tail]
            .chunks_exact(ENCRYPTED_ACK_BYTES)
            .all(|slot| slot.iter().any(|&b| b != 0)));
        assert!(row[tail..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_ack_row_too_many_friends() {
        let acks: Vec<Option<(u32, &[u8])>> = vec![None; MAX_FRIENDS + 1];
        assert!(matches!(
            seal_ack_row(&acks),
            Err(EnvelopeError::InvalidLength { .. })
        ));
    }
}
