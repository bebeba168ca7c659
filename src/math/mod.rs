//! Mathematical primitives for the BFV scheme.
//!
//! - **Number-Theoretic Transform (NTT)** with Montgomery arithmetic, over
//!   one prime (plaintext ring) or an RNS base (ciphertext ring)
//! - **Polynomial operations** over R_q = Z_q[X]/(X^n + 1) in RNS form
//! - **CRT composition** and exact t/q rescaling for decryption
//! - **Sampling** of Gaussian errors, ternary secrets and uniform masks

pub mod crt;
pub mod gaussian;
pub mod ntt;
pub mod poly;

pub use crt::{crt_compose_2, mod_inverse, scale_round};
pub use gaussian::GaussianSampler;
pub use ntt::NttContext;
pub use poly::Poly;
