use bytes::Bytes;
use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::data_input::{DataInput, IndexInput};
use crate::storage::data_output::DataOutput;

/// Bits needed to store every value in `0..=max`, never less than 1
#[inline]
pub fn bits_required(max: u64) -> u32 {
    (64 - max.leading_zeros()).max(1)
}

#[inline]
fn mask(bits: u32) -> u64 {
    if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 }
}

#[inline]
fn payload_len(count: usize, bits: u32) -> usize {
    ((count as u128 * bits as u128).div_ceil(8)) as usize
}

fn read_header(input: &mut IndexInput) -> Result<(u32, usize)> {
    let bits = input.read_vint()?;
    if bits == 0 || bits > 64 {
        return Err(Error::corruption(format!("invalid packed bitsPerValue: {}", bits), input.name()));
    }
    let count = input.read_vint()? as usize;
    Ok((bits, count))
}

/// Streams fixed-width values to an output.
///
/// Layout: `[bits:vint][count:vint][payload]`, the payload being a
/// little-endian bit stream of `count` values padded to a whole byte.
pub struct PackedWriter<'a, O: DataOutput + ?Sized> {
    out: &'a mut O,
    bits: u32,
    count: usize,
    written: usize,
    acc: u128,
    pending: u32,
}

impl<'a, O: DataOutput + ?Sized> PackedWriter<'a, O> {
    pub fn new(out: &'a mut O, count: usize, bits: u32) -> Result<Self> {
        if bits == 0 || bits > 64 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("bitsPerValue must be in 1..=64, got {}", bits),
            ));
        }
        out.write_vint(bits)?;
        out.write_vint(count as u32)?;
        Ok(PackedWriter { out, bits, count, written: 0, acc: 0, pending: 0 })
    }

    pub fn add(&mut self, value: u64) -> Result<()> {
        if self.written == self.count {
            return Err(Error::new(
                ErrorKind::InvalidState,
                format!("packed writer already received {} values", self.count),
            ));
        }
        debug_assert!(value <= mask(self.bits), "value {} needs more than {} bits", value, self.bits);
        self.acc |= ((value & mask(self.bits)) as u128) << self.pending;
        self.pending += self.bits;
        while self.pending >= 8 {
            self.out.write_byte(self.acc as u8)?;
            self.acc >>= 8;
            self.pending -= 8;
        }
        self.written += 1;
        Ok(())
    }

    pub fn finish(self) -> Result<()> {
        if self.written != self.count {
            return Err(Error::new(
                ErrorKind::InvalidState,
                format!("packed writer expected {} values, got {}", self.count, self.written),
            ));
        }
        if self.pending > 0 {
            self.out.write_byte(self.acc as u8)?;
        }
        Ok(())
    }
}

/// Mutable in-memory fixed-width array
#[derive(Debug, Clone)]
pub struct PackedInts {
    blocks: Vec<u64>,
    bits: u32,
    count: usize,
}

impl PackedInts {
    pub fn new(count: usize, bits: u32) -> Self {
        let words = (count as u128 * bits as u128).div_ceil(64) as usize;
        PackedInts { blocks: vec![0; words], bits, count }
    }

    /// Reads an array written by `PackedWriter`
    pub fn read(input: &mut IndexInput) -> Result<Self> {
        let (bits, count) = read_header(input)?;
        let payload = input.read_shared(payload_len(count, bits))?;
        let mut ints = PackedInts::new(count, bits);
        for (word, chunk) in ints.blocks.iter_mut().zip(payload.chunks(8)) {
            let mut buf = [0u8; 8];
            buf[..chunk.len()].copy_from_slice(chunk);
            *word = u64::from_le_bytes(buf);
        }
        Ok(ints)
    }

    #[inline]
    pub fn get(&self, index: usize) -> u64 {
        debug_assert!(index < self.count);
        let bit = index * self.bits as usize;
        let word = bit / 64;
        let shift = (bit % 64) as u32;
        let mut value = self.blocks[word] >> shift;
        if shift + self.bits > 64 {
            value |= self.blocks[word + 1] << (64 - shift);
        }
        value & mask(self.bits)
    }

    pub fn set(&mut self, index: usize, value: u64) {
        debug_assert!(index < self.count);
        let value = value & mask(self.bits);
        let bit = index * self.bits as usize;
        let word = bit / 64;
        let shift = (bit % 64) as u32;
        let m = mask(self.bits);
        self.blocks[word] = (self.blocks[word] & !(m << shift)) | (value << shift);
        if shift + self.bits > 64 {
            let spill = 64 - shift;
            self.blocks[word + 1] = (self.blocks[word + 1] & !(m >> spill)) | (value >> spill);
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn bits_per_value(&self) -> u32 {
        self.bits
    }

    pub fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>() + self.blocks.capacity() * 8
    }
}

/// Sequential reader over a packed array left on disk
pub struct PackedReaderIterator {
    payload: Bytes,
    bits: u32,
    count: usize,
    upto: usize,
    resource: String,
}

impl PackedReaderIterator {
    /// Consumes the header and payload from `input`
    pub fn new(input: &mut IndexInput) -> Result<Self> {
        let (bits, count) = read_header(input)?;
        let payload = input.read_shared(payload_len(count, bits))?;
        Ok(PackedReaderIterator {
            payload,
            bits,
            count,
            upto: 0,
            resource: input.name().to_string(),
        })
    }

    pub fn size(&self) -> usize {
        self.count
    }

    pub fn bits_per_value(&self) -> u32 {
        self.bits
    }

    pub fn ord(&self) -> usize {
        self.upto
    }

    pub fn next(&mut self) -> Result<u64> {
        if self.upto >= self.count {
            return Err(Error::corruption(
                format!("packed array exhausted after {} values", self.count),
                &self.resource,
            ));
        }
        let bit = self.upto * self.bits as usize;
        let start = bit / 8;
        let shift = (bit % 8) as u32;
        let end = (start + (shift + self.bits).div_ceil(8) as usize).min(self.payload.len());
        let mut buf = [0u8; 16];
        buf[..end - start].copy_from_slice(&self.payload[start..end]);
        let value = (u128::from_le_bytes(buf) >> shift) as u64 & mask(self.bits);
        self.upto += 1;
        Ok(value)
    }

    pub fn skip(&mut self, count: usize) {
        self.upto = (self.upto + count).min(self.count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::data_output::RamOutput;

    fn write_values(values: &[u64], bits: u32) -> IndexInput {
        let mut out = RamOutput::new();
        let mut writer = PackedWriter::new(&mut out, values.len(), bits).unwrap();
        for &v in values {
            writer.add(v).unwrap();
        }
        writer.finish().unwrap();
        IndexInput::new("packed", Bytes::copy_from_slice(out.as_bytes()))
    }

    #[test]
    fn test_bits_required() {
        assert_eq!(bits_required(0), 1);
        assert_eq!(bits_required(1), 1);
        assert_eq!(bits_required(255), 8);
        assert_eq!(bits_required(256), 9);
        assert_eq!(bits_required(u64::MAX), 64);
    }

    #[test]
    fn test_odd_widths_read_back() {
        for bits in [1u32, 3, 7, 13, 33, 63, 64] {
            let values: Vec<u64> = (0..37u64).map(|i| i.wrapping_mul(0x9E37_79B9_7F4A_7C15) & mask(bits)).collect();

            let mut input = write_values(&values, bits);
            let ints = PackedInts::read(&mut input).unwrap();
            assert_eq!(input.file_pointer(), input.len());
            assert_eq!(ints.len(), values.len());
            for (i, &v) in values.iter().enumerate() {
                assert_eq!(ints.get(i), v, "bits={} i={}", bits, i);
            }

            let mut input = write_values(&values, bits);
            let mut iter = PackedReaderIterator::new(&mut input).unwrap();
            for &v in &values {
                assert_eq!(iter.next().unwrap(), v);
            }
            assert!(iter.next().is_err());
        }
    }

    #[test]
    fn test_set_overwrites_across_words() {
        let mut ints = PackedInts::new(10, 13);
        for i in 0..10 {
            ints.set(i, 8191);
        }
        ints.set(4, 5);
        assert_eq!(ints.get(3), 8191);
        assert_eq!(ints.get(4), 5);
        assert_eq!(ints.get(5), 8191);
        assert!(ints.ram_bytes_used() >= 16);
    }

    #[test]
    fn test_iterator_skip() {
        let values: Vec<u64> = (0..10).collect();
        let mut input = write_values(&values, 4);
        let mut iter = PackedReaderIterator::new(&mut input).unwrap();
        iter.skip(3);
        assert_eq!(iter.next().unwrap(), 3);
        iter.skip(100);
        assert_eq!(iter.ord(), 10);
    }

    #[test]
    fn test_writer_count_mismatch() {
        let mut out = RamOutput::new();
        let mut writer = PackedWriter::new(&mut out, 1, 4).unwrap();
        writer.add(1).unwrap();
        assert!(writer.add(2).is_err());

        let mut out = RamOutput::new();
        let writer = PackedWriter::new(&mut out, 2, 4).unwrap();
        assert!(writer.finish().is_err());
    }
}
