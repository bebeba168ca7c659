//! Authenticated encryption of the payloads stored in PIR rows
//!
//! Uses XChaCha20-Poly1305 (192-bit nonce).
//! Key size: 32 bytes. Nonce: 24 bytes (random). Tag: 16 bytes.
//!
//! Row wire format:
//!   [ ciphertext + tag (1000 bytes) | nonce (24 bytes) ]
//!
//! Messages are padded to a fixed length before encryption so that every
//! sealed row looks the same regardless of what it carries. Acks are a
//! fixed-width 4-byte id and need no padding; up to [`MAX_FRIENDS`] of them
//! share one row.

mod ack;
pub mod kx;
mod message;
pub mod padding;

pub use ack::{open_ack, open_ack_row, seal_ack, seal_ack_row, AckBlob};
pub use message::{open_message, seal_message, SealedMessage};

use chacha20poly1305::{KeyInit, XChaCha20Poly1305};
use thiserror::Error;

use crate::params::MESSAGE_SIZE;

/// AEAD key size
pub const KEY_BYTES: usize = 32;

/// AEAD nonce size
pub const NONCE_BYTES: usize = 24;

/// Poly1305 tag size
pub const TAG_BYTES: usize = 16;

/// Length every message is padded to before encryption
pub const PADDED_MESSAGE_LEN: usize = MESSAGE_SIZE - TAG_BYTES - NONCE_BYTES;

/// Largest message that fits in one row; padding takes at least one byte
pub const GUARANTEED_SINGLE_MESSAGE_SIZE: usize = PADDED_MESSAGE_LEN - 1;

/// Plaintext size of an ack id
pub const ACK_BYTES: usize = 4;

/// Size of one sealed ack
pub const ENCRYPTED_ACK_BYTES: usize = ACK_BYTES + TAG_BYTES + NONCE_BYTES;

/// Sealed acks that fit in one row
pub const MAX_FRIENDS: usize = MESSAGE_SIZE / ENCRYPTED_ACK_BYTES;

/// Envelope error
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("key must be {expected} bytes, got {found}")]
    InvalidKeyLength { expected: usize, found: usize },

    #[error("input must be {expected} bytes, got {found}")]
    InvalidLength { expected: usize, found: usize },

    /// Tag mismatch. Routine for rows sealed under someone else's key.
    #[error("authentication failed")]
    Authentication,

    #[error("malformed plaintext: {0}")]
    Malformed(String),

    #[error("key exchange failed: {0}")]
    KeyExchange(String),
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;

fn cipher(key: &[u8]) -> Result<XChaCha20Poly1305> {
    XChaCha20Poly1305::new_from_slice(key).map_err(|_| EnvelopeError::InvalidKeyLength {
        expected: KEY_BYTES,
        found: key.len(),
    })
}
