//! Mailbox PIR: metadata-hiding retrieval of fixed-size mailbox rows
//!
//! Key components:
//! - Codec: bit-level packing of 1024-byte rows into 18-bit plaintext
//!   coefficients and back
//! - BFV: batched symmetric encryption with plaintext products and
//!   Galois rotations over a two-prime RNS modulus
//! - PIR: client queries sized against a client-trusted row bound, server
//!   answers folded into a single ciphertext
//! - Envelope: XChaCha20-Poly1305 sealing of messages and acks placed in
//!   rows, with X25519 friend key exchange

pub mod params;
pub mod math;
pub mod codec;
pub mod bfv;
pub mod pir;
pub mod envelope;

pub use params::{BfvParams, Row, CLIENT_DB_ROWS, MESSAGE_SIZE, PLAIN_BITS, SEAL_DB_COLUMNS};
pub use pir::{Answer, PirClient, PirError, PirServer, Query};
pub use envelope::{
    open_ack, open_message, seal_ack, seal_message, EnvelopeError, SealedMessage,
};
