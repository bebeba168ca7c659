//! Bit-packing between database rows and plaintext coefficients
//!
//! The database is viewed as one flat, row-major bit matrix (most significant
//! bit of each byte first). [`extract_submatrix`] cuts narrow columns out of
//! it, one coefficient per matrix row, and [`pack_lsb_bits`] concatenates
//! coefficients back into bytes.

/// Read a column of `row_count` values out of a row-major bit matrix.
///
/// Output row `r` holds the `row_bit_length` bits that start at flat bit
/// offset `top_left_bit_offset + r * row_bit_width`, right-justified. Bits
/// past the end of `buffer` read as zero, so asking for more rows than the
/// buffer holds yields zero rows rather than an error. Offsets that overflow
/// `usize` are past the end too.
///
/// # Panics
///
/// Panics if `row_bit_length > 64`.
pub fn extract_submatrix(
    buffer: &[u8],
    row_bit_width: usize,
    top_left_bit_offset: usize,
    row_bit_length: usize,
    row_count: usize,
) -> Vec<u64> {
    assert!(row_bit_length <= 64, "at most 64 bits fit in a coefficient");

    (0..row_count)
        .map(|r| {
            r.checked_mul(row_bit_width)
                .and_then(|skip| skip.checked_add(top_left_bit_offset))
                .map_or(0, |start| read_bits(buffer, start, row_bit_length))
        })
        .collect()
}

/// Read `len` bits starting at bit `start`, zero past the buffer's end.
fn read_bits(buffer: &[u8], start: usize, len: usize) -> u64 {
    if len == 0 || start >= buffer.len() * 8 {
        return 0;
    }

    let end = start + len;
    let first_byte = start / 8;
    let last_byte = end.div_ceil(8);

    // at most 9 bytes
    let mut window: u128 = 0;
    for i in first_byte..last_byte {
        window = (window << 8) | buffer.get(i).copied().unwrap_or(0) as u128;
    }

    let shift = last_byte * 8 - end;
    ((window >> shift) as u64) & low_mask(len)
}

/// Concatenate the low `N` bits of every coefficient into bytes.
///
/// Bits are emitted most significant first, coefficient after coefficient;
/// the result has `ceil(len * N / 8)` bytes with the unused low bits of the
/// last byte cleared.
///
/// ```
/// use mailbox_pir::codec::pack_lsb_bits;
///
/// assert_eq!(pack_lsb_bits::<2>(&[1, 2, 3, 4]), vec![0b0110_1100]);
/// ```
pub fn pack_lsb_bits<const N: usize>(coefficients: &[u64]) -> Vec<u8> {
    pack_lsb_bits_dyn(coefficients, N)
}

/// [`pack_lsb_bits`] with a run-time width.
///
/// # Panics
///
/// Panics unless `1 <= width <= 64`.
pub fn pack_lsb_bits_dyn(coefficients: &[u64], width: usize) -> Vec<u8> {
    assert!((1..=64).contains(&width), "width must be in 1..=64");

    let mask = low_mask(width);
    let mut out = Vec::with_capacity((coefficients.len() * width).div_ceil(8));
    let mut acc: u128 = 0;
    let mut acc_bits = 0usize;

    for &c in coefficients {
        acc = (acc << width) | (c & mask) as u128;
        acc_bits += width;
        while acc_bits >= 8 {
            acc_bits -= 8;
            out.push((acc >> acc_bits) as u8);
        }
        acc &= (1u128 << acc_bits) - 1;
    }
    if acc_bits > 0 {
        out.push((acc << (8 - acc_bits)) as u8);
    }

    out
}

#[inline]
fn low_mask(bits: usize) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}
