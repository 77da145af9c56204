use crate::core::error::{Error, ErrorKind, Result};

/// Variable byte encoding for integers (best for small integers)
pub struct VByteEncoder;

impl VByteEncoder {
    /// Encode single u64 value, at most 10 bytes
    pub fn encode_u64(output: &mut Vec<u8>, mut value: u64) {
        while value >= 128 {
            output.push((value & 127) as u8 | 128);
            value >>= 7;
        }
        output.push(value as u8);
    }

    /// Encode into a stack buffer, returns (buffer, length)
    pub fn encode_u64_to_array(mut value: u64) -> ([u8; 10], usize) {
        let mut buf = [0u8; 10];
        let mut len = 0;
        while value >= 128 {
            buf[len] = (value & 127) as u8 | 128;
            value >>= 7;
            len += 1;
        }
        buf[len] = value as u8;
        (buf, len + 1)
    }

    /// Decode single u32 value, returns (value, bytes_consumed)
    pub fn decode_u32(input: &[u8]) -> Result<(u32, usize)> {
        let mut value = 0u32;
        let mut shift = 0;
        let mut consumed = 0;

        for &byte in input {
            consumed += 1;
            value |= ((byte & 127) as u32) << shift;

            if byte & 128 == 0 {  // No continuation bit
                return Ok((value, consumed));
            }

            shift += 7;
            if shift > 28 {  // Max 5 bytes for u32
                return Err(Error::new(ErrorKind::Corruption, "VByte overflow".to_string()));
            }
        }

        Err(Error::new(ErrorKind::Corruption, "Incomplete VByte".to_string()))
    }

    /// Decode single u64 value, returns (value, bytes_consumed)
    pub fn decode_u64(input: &[u8]) -> Result<(u64, usize)> {
        let mut value = 0u64;
        let mut shift = 0;
        let mut consumed = 0;

        for &byte in input {
            consumed += 1;
            value |= ((byte & 127) as u64) << shift;

            if byte & 128 == 0 {
                return Ok((value, consumed));
            }

            shift += 7;
            if shift > 63 {  // Max 10 bytes for u64
                return Err(Error::new(ErrorKind::Corruption, "VByte overflow".to_string()));
            }
        }

        Err(Error::new(ErrorKind::Corruption, "Incomplete VByte".to_string()))
    }
}
