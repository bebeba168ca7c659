//! ISO/IEC 7816-4 padding: a single 0x80 byte followed by zeros
//!
//! The padded length is the next multiple of the block size strictly above
//! the data length, so there is always at least one padding byte.

use super::{EnvelopeError, Result};

const MARKER: u8 = 0x80;

/// Pad `data` to a multiple of `block_size`.
///
/// # Panics
///
/// Panics if `block_size` is zero.
pub fn pad(data: &[u8], block_size: usize) -> Vec<u8> {
    assert!(block_size > 0, "block size must be positive");
    let padded_len = (data.len() / block_size + 1) * block_size;

    let mut out = Vec::with_capacity(padded_len);
    out.extend_from_slice(data);
    out.push(MARKER);
    out.resize(padded_len, 0);
    out
}

/// Length of the data inside a padded buffer.
///
/// Only the last block is scanned; the marker must be followed by zeros
/// alone.
pub fn unpad(padded: &[u8], block_size: usize) -> Result<usize> {
    if block_size == 0 || padded.is_empty() || padded.len() % block_size != 0 {
        return Err(EnvelopeError::Malformed(format!(
            "padded length {} is not a positive multiple of {}",
            padded.len(),
            block_size
        )));
    }

    let last_block = padded.len() - block_size;
    for i in (last_block..padded.len()).rev() {
        match padded[i] {
            0 => continue,
            MARKER => return Ok(i),
            _ => break,
        }
    }
    Err(EnvelopeError::Malformed("missing padding marker".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(b"", 8, &[0x80, 0, 0, 0, 0, 0, 0, 0]; "empty")]
    #[test_case(b"abc", 4, &[b'a', b'b', b'c', 0x80]; "one byte of padding")]
    #[test_case(b"abcd", 4, &[b'a', b'b', b'c', b'd', 0x80, 0, 0, 0]; "full block adds a block")]
    fn test_pad(data: &[u8], block: usize, expected: &[u8]) {
        let padded = pad(data, block);
        assert_eq!(padded, expected);
        assert_eq!(unpad(&padded, block).unwrap(), data.len());
    }

    #[test]
    fn test_data_ending_in_marker_and_zeros() {
        let data = [1, 0x80, 0, 0];
        let padded = pad(&data, 16);
        assert_eq!(unpad(&padded, 16).unwrap(), 4);
    }

    #[test_case(&[0, 0, 0, 0]; "all zeros")]
    #[test_case(&[1, 2, 3, 4]; "no marker")]
    #[test_case(&[0x80, 0, 0, 7]; "garbage after marker")]
    #[test_case(&[0x80, 0, 0]; "wrong length")]
    fn test_unpad_rejects(padded: &[u8]) {
        assert!(matches!(unpad(padded, 4), Err(EnvelopeError::Malformed(_))));
    }
}
