//! CRT (Chinese Remainder Theorem) helpers for the two-prime RNS base.
//!
//! The composite modulus q = q_0 · q_1 is about 109 bits, so composed values
//! live in `u128`. Scaling by t/q during decryption needs up to 130 bits and
//! is done with an exact long division.

/// Compute a modular inverse using the extended Euclidean algorithm.
///
/// Returns `None` when `a` is not invertible modulo `modulus`.
pub fn mod_inverse(a: u64, modulus: u64) -> Option<u64> {
    let mut t: i128 = 0;
    let mut new_t: i128 = 1;
    let mut r: i128 = modulus as i128;
    let mut new_r: i128 = (a % modulus) as i128;

    while new_r != 0 {
        let quotient = r / new_r;
        (t, new_t) = (new_t, t - quotient * new_t);
        (r, new_r) = (new_r, r - quotient * new_r);
    }

    if r != 1 {
        return None;
    }
    if t < 0 {
        t += modulus as i128;
    }
    Some(t as u64)
}

/// Compose two CRT residues into a value modulo q0 * q1.
///
/// Formula:
///   x = a0 + q0 * ((a1 - a0) * q0^{-1} mod q1)
#[inline]
pub fn crt_compose_2(a0: u64, a1: u64, q0: u64, q1: u64, q0_inv_mod_q1: u64) -> u128 {
    let a0_mod_q1 = a0 % q1;
    let diff = if a1 >= a0_mod_q1 {
        a1 - a0_mod_q1
    } else {
        (a1 + q1) - a0_mod_q1
    };
    let k = ((diff as u128 * q0_inv_mod_q1 as u128) % q1 as u128) as u64;
    a0 as u128 + q0 as u128 * k as u128
}

/// Compute round(t · x / q) mod t for x in [0, q).
///
/// `t · x` may exceed 128 bits, so the product is kept as a (hi, lo) pair
/// and divided bit by bit. `q` must be below 2^126 and `t` below 2^32.
pub fn scale_round(x: u128, t: u64, q: u128) -> u64 {
    debug_assert!(x < q);
    debug_assert!(q < 1 << 126);

    // t · x as a 256-bit (hi, lo) pair
    let x_lo = x as u64 as u128;
    let x_hi = x >> 64;
    let p_lo = x_lo * t as u128;
    let p_hi = x_hi * t as u128;
    let (lo, carry) = p_lo.overflowing_add(p_hi << 64);
    let hi = (p_hi >> 64) + carry as u128;

    // + ⌊q/2⌋ for rounding
    let (lo, carry) = lo.overflowing_add(q >> 1);
    let hi = hi + carry as u128;

    let mut rem: u128 = 0;
    let mut quotient: u128 = 0;
    let top = 256 - hi.leading_zeros().min(128) as usize;
    for bit in (0..top.max(128)).rev() {
        let b = if bit >= 128 { (hi >> (bit - 128)) & 1 } else { (lo >> bit) & 1 };
        rem = (rem << 1) | b;
        quotient <<= 1;
        if rem >= q {
            rem -= q;
            quotient |= 1;
        }
    }

    (quotient % t as u128) as u64
}
