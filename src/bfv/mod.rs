//! BFV homomorphic encryption, restricted to what PIR needs
//!
//! Symmetric (secret-key) encryption of batched plaintexts, ciphertext
//! addition, ciphertext × plaintext products and slot rotations through
//! Galois automorphisms with key switching.
//!
//! # Overview
//!
//! ```text
//! slots ──BatchEncoder──▶ Plaintext ──encrypt──▶ Ciphertext
//!                                                  │  add / multiply_plain
//!                                                  │  rotate_rows / rotate_columns
//! slots ◀──BatchEncoder── Plaintext ◀──decrypt─────┘
//! ```

pub mod ciphertext;
pub mod context;
pub mod encoder;
pub mod galois;
pub mod keys;
pub mod wire;

pub use ciphertext::Ciphertext;
pub use context::BfvContext;
pub use encoder::{BatchEncoder, Plaintext, PlaintextNtt};
pub use galois::{column_swap_element, galois_element, GaloisKeys, KeySwitchKey};
pub use keys::SecretKey;
