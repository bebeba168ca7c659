//! Sealed messages, one per PIR row

use chacha20poly1305::{
    aead::{Aead, AeadCore, OsRng},
    XChaCha20Poly1305, XNonce,
};
use tracing::warn;
use zeroize::Zeroizing;

use super::{cipher, padding, EnvelopeError, Result};
use super::{GUARANTEED_SINGLE_MESSAGE_SIZE, NONCE_BYTES, PADDED_MESSAGE_LEN};
use crate::params::{Row, MESSAGE_SIZE};

const SEALED_BODY_LEN: usize = MESSAGE_SIZE - NONCE_BYTES;

/// A row ready for `PirServer::set_value`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedMessage {
    pub row: Row,
    /// The plaintext exceeded the row's capacity and only its first
    /// [`GUARANTEED_SINGLE_MESSAGE_SIZE`] bytes were sealed
    pub truncated: bool,
}

/// Encrypt `plaintext` into a full row under `write_key`.
///
/// Input longer than [`GUARANTEED_SINGLE_MESSAGE_SIZE`] is cut to that
/// length and flagged in the result; splitting longer messages across rows
/// is the caller's job.
pub fn seal_message(plaintext: &[u8], write_key: &[u8]) -> Result<SealedMessage> {
    let cipher = cipher(write_key)?;

    let truncated = plaintext.len() > GUARANTEED_SINGLE_MESSAGE_SIZE;
    if truncated {
        warn!(
            len = plaintext.len(),
            capacity = GUARANTEED_SINGLE_MESSAGE_SIZE,
            "message truncated to fit one row"
        );
    }
    let body = &plaintext[..plaintext.len().min(GUARANTEED_SINGLE_MESSAGE_SIZE)];
    let padded = Zeroizing::new(padding::pad(body, PADDED_MESSAGE_LEN));

    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, padded.as_slice())
        .map_err(|_| EnvelopeError::InvalidLength {
            expected: PADDED_MESSAGE_LEN,
            found: padded.len(),
        })?;

    let mut row = [0u8; MESSAGE_SIZE];
    row[..SEALED_BODY_LEN].copy_from_slice(&ciphertext);
    row[SEALED_BODY_LEN..].copy_from_slice(&nonce);

    Ok(SealedMessage { row, truncated })
}

/// Decrypt a row sealed by [`seal_message`].
///
/// Fails with [`EnvelopeError::Authentication`] for rows sealed under any
/// other key, which is the normal outcome for rows meant for someone else.
pub fn open_message(row: &[u8], read_key: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher(read_key)?;
    if row.len() != MESSAGE_SIZE {
        return Err(EnvelopeError::InvalidLength {
            expected: MESSAGE_SIZE,
            found: row.len(),
        });
    }

    let (ciphertext, nonce) = row.split_at(SEALED_BODY_LEN);
    let padded = Zeroizing::new(
        cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| EnvelopeError::Authentication)?,
    );

    let len = padding::unpad(&padded, PADDED_MESSAGE_LEN)?;
    Ok(padded[..len].to_vec())
}
