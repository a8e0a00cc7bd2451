//! Read and write varints.
//!
//! Variable length integers (_varints_) are the default encoding of integers
//! in Protocol Buffers messages, including field tags and numbers.
//!
//! See <https://protobuf.dev/programming-guides/encoding/#varints>.

/// Maximum number of bytes for an encoded varint.
///
/// A decoded varint is a u64 value. Each byte contains 7 value bits and one
/// continuation bit. Hence we need 9 "full" bytes plus one bit from the 10th byte.
pub const MAX_VARINT_LEN: usize = 10;

#[derive(Debug, PartialEq)]
pub enum VarintError {
    /// The buffer is empty.
    Eof,
    /// The varint length exceeds 64-bits, or the end of the buffer was reached
    /// before a full varint was read.
    InvalidVarint,
}

/// Read a varint value of up to 64-bits from the start of `buf`.
///
/// Returns the value and the number of bytes it occupied.
pub fn read_varint(buf: &[u8]) -> Result<(u64, usize), VarintError> {
    if buf.is_empty() {
        return Err(VarintError::Eof);
    }

    let mut value = 0;
    for (i, byte) in buf.iter().copied().take(MAX_VARINT_LEN).enumerate() {
        // High bit is continuation bit. Low 7 bits are the payload.
        value |= ((byte & 0x7f) as u64) << (i * 7);
        if byte <= 0x7f {
            // Only one value bit from the last byte may be used.
            if i + 1 == MAX_VARINT_LEN && byte > 0x01 {
                break;
            }
            return Ok((value, i + 1));
        }
    }

    Err(VarintError::InvalidVarint)
}

/// Append the varint encoding of `val` to `out`.
pub fn write_varint(out: &mut Vec<u8>, mut val: u64) {
    loop {
        let byte = (val & 0x7f) as u8;
        if val <= 0x7f {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
        val >>= 7;
    }
}

/// Return the number of bytes [`write_varint`] uses to encode `val`.
pub fn varint_len(val: u64) -> usize {
    let bits = 64 - val.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

#[cfg(test)]
mod tests {
    use super::{MAX_VARINT_LEN, VarintError, read_varint, varint_len, write_varint};

    fn encode(val: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        write_varint(&mut buf, val);
        buf
    }

    #[test]
    fn test_read_write_varint() {
        let mut values: Vec<u64> = (0..1024).collect();
        values.extend([u32::MAX as u64, u64::MAX - 1, u64::MAX]);
        for val in values {
            let buf = encode(val);
            assert_eq!(buf.len(), varint_len(val));
            assert_eq!(read_varint(&buf), Ok((val, buf.len())));
        }
    }

    #[test]
    fn test_read_varint_sequence() {
        // Example from https://protobuf.dev/programming-guides/encoding/#simple.
        let buf = [0x08, 0x96, 0x01];
        assert_eq!(read_varint(&buf), Ok((8, 1)));
        assert_eq!(read_varint(&buf[1..]), Ok((150, 2)));
        assert_eq!(read_varint(&buf[3..]), Err(VarintError::Eof));
    }

    #[test]
    fn test_invalid_varint() {
        let mut buf = encode(u64::MAX);
        assert_eq!(buf.len(), MAX_VARINT_LEN);
        buf[9] += 1;
        assert_eq!(read_varint(&buf), Err(VarintError::InvalidVarint));

        // Continuation bit set on the last byte of the buffer.
        assert_eq!(read_varint(&[0x96]), Err(VarintError::InvalidVarint));
    }
}
