use std::sync::Arc;
use bytes::Bytes;
use crate::compression::vbyte::VByteEncoder;
use crate::core::error::{Error, ErrorKind, Result};

/// Source for the encodings written through `DataOutput`
pub trait DataInput {
    fn read_byte(&mut self) -> Result<u8>;

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()>;

    fn skip_bytes(&mut self, count: usize) -> Result<()>;

    fn read_int(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_bytes(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }

    fn read_long(&mut self) -> Result<i64> {
        let mut buf = [0u8; 8];
        self.read_bytes(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }

    fn read_vint(&mut self) -> Result<u32>;

    fn read_vlong(&mut self) -> Result<u64>;

    fn read_string(&mut self) -> Result<String> {
        let len = self.read_vint()? as usize;
        let mut buf = vec![0u8; len];
        self.read_bytes(&mut buf)?;
        String::from_utf8(buf).map_err(|e| Error::new(
            ErrorKind::Corruption,
            format!("invalid UTF-8 string: {}", e),
        ))
    }
}

/// Positionable reader over a shared immutable file image.
///
/// Cloning is cheap (reference counted) and gives the clone its own
/// position, so every cursor can own one.
#[derive(Clone)]
pub struct IndexInput {
    name: Arc<str>,
    data: Bytes,
    pos: usize,
}

impl IndexInput {
    pub fn new(name: &str, data: Bytes) -> Self {
        IndexInput {
            name: Arc::from(name),
            data,
            pos: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn file_pointer(&self) -> u64 {
        self.pos as u64
    }

    pub fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.len() {
            return Err(Error::corruption(
                format!("seek past EOF: pos={} length={}", pos, self.len()),
                &self.name,
            ));
        }
        self.pos = pos as usize;
        Ok(())
    }

    /// Whole underlying file image
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Zero-copy read of the next `len` bytes
    pub fn read_shared(&mut self, len: usize) -> Result<Bytes> {
        self.ensure(len)?;
        let slice = self.data.slice(self.pos..self.pos + len);
        self.pos += len;
        Ok(slice)
    }

    fn ensure(&self, len: usize) -> Result<()> {
        if self.pos + len > self.data.len() {
            return Err(Error::corruption(
                format!("read past EOF: pos={} want={} length={}", self.pos, len, self.data.len()),
                &self.name,
            ));
        }
        Ok(())
    }

    fn corrupt_varint(&self, err: Error) -> Error {
        Error::corruption(format!("{} at pos={}", err.context, self.pos), &self.name)
    }
}

impl DataInput for IndexInput {
    fn read_byte(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let b = self.data[self.pos];
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        self.ensure(buf.len())?;
        buf.copy_from_slice(&self.data[self.pos..self.pos + buf.len()]);
        self.pos += buf.len();
        Ok(())
    }

    fn skip_bytes(&mut self, count: usize) -> Result<()> {
        self.ensure(count)?;
        self.pos += count;
        Ok(())
    }

    fn read_vint(&mut self) -> Result<u32> {
        let (value, consumed) = VByteEncoder::decode_u32(&self.data[self.pos..])
            .map_err(|e| self.corrupt_varint(e))?;
        self.pos += consumed;
        Ok(value)
    }

    fn read_vlong(&mut self) -> Result<u64> {
        let (value, consumed) = VByteEncoder::decode_u64(&self.data[self.pos..])
            .map_err(|e| self.corrupt_varint(e))?;
        self.pos += consumed;
        Ok(value)
    }
}

/// Growable scratch buffer read back with `DataInput`.
///
/// `fill_from` reuses the allocation, so slices handed out are only valid
/// until the next fill.
#[derive(Debug, Default)]
pub struct ByteArrayDataInput {
    bytes: Vec<u8>,
    len: usize,
    pos: usize,
}

impl ByteArrayDataInput {
    pub fn new() -> Self {
        ByteArrayDataInput::default()
    }

    /// Loads the next `len` bytes of `input` into this buffer and rewinds
    pub fn fill_from(&mut self, input: &mut IndexInput, len: usize) -> Result<()> {
        if self.bytes.len() < len {
            self.bytes.resize(oversize(len), 0);
        }
        input.read_bytes(&mut self.bytes[..len])?;
        self.len = len;
        self.pos = 0;
        Ok(())
    }

    /// Loads a copy of `data` and rewinds
    pub fn reset(&mut self, data: &[u8]) {
        if self.bytes.len() < data.len() {
            self.bytes.resize(oversize(data.len()), 0);
        }
        self.bytes[..data.len()].copy_from_slice(data);
        self.len = data.len();
        self.pos = 0;
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.len
    }

    /// Valid bytes of the current fill
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn ram_bytes_used(&self) -> usize {
        self.bytes.capacity()
    }

    fn ensure(&self, count: usize) -> Result<()> {
        if self.pos + count > self.len {
            return Err(Error::new(
                ErrorKind::Corruption,
                format!("read past end of block buffer: pos={} want={} length={}", self.pos, count, self.len),
            ));
        }
        Ok(())
    }
}

impl DataInput for ByteArrayDataInput {
    fn read_byte(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let b = self.bytes[self.pos];
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        self.ensure(buf.len())?;
        buf.copy_from_slice(&self.bytes[self.pos..self.pos + buf.len()]);
        self.pos += buf.len();
        Ok(())
    }

    fn skip_bytes(&mut self, count: usize) -> Result<()> {
        self.ensure(count)?;
        self.pos += count;
        Ok(())
    }

    fn read_vint(&mut self) -> Result<u32> {
        let (value, consumed) = VByteEncoder::decode_u32(&self.bytes[self.pos..self.len])?;
        self.pos += consumed;
        Ok(value)
    }

    fn read_vlong(&mut self) -> Result<u64> {
        let (value, consumed) = VByteEncoder::decode_u64(&self.bytes[self.pos..self.len])?;
        self.pos += consumed;
        Ok(value)
    }
}

/// Capacity to allocate for `min` bytes, leaving room to grow
pub fn oversize(min: usize) -> usize {
    (min + (min >> 3)).max(16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::data_output::{DataOutput, RamOutput};

    fn sample() -> Bytes {
        let mut out = RamOutput::new();
        out.write_int(7).unwrap();
        out.write_vlong(1 << 40).unwrap();
        out.write_string("term").unwrap();
        Bytes::copy_from_slice(out.as_bytes())
    }

    #[test]
    fn test_index_input_reads_back() {
        let mut input = IndexInput::new("sample", sample());
        assert_eq!(input.read_int().unwrap(), 7);
        assert_eq!(input.read_vlong().unwrap(), 1 << 40);
        assert_eq!(input.read_string().unwrap(), "term");
        assert_eq!(input.file_pointer(), input.len());
    }

    #[test]
    fn test_clones_have_independent_positions() {
        let mut a = IndexInput::new("sample", sample());
        let mut b = a.clone();
        a.seek(4).unwrap();
        assert_eq!(b.read_int().unwrap(), 7);
        assert_eq!(a.read_vlong().unwrap(), 1 << 40);
    }

    #[test]
    fn test_read_past_eof_is_corruption() {
        let mut input = IndexInput::new("tiny", Bytes::from_static(&[1, 2]));
        let err = input.read_int().unwrap_err();
        assert!(err.is_corruption());
        assert!(err.context.contains("resource=tiny"));
        assert!(input.seek(3).is_err());
    }

    #[test]
    fn test_byte_array_reuses_buffer() {
        let mut input = IndexInput::new("sample", sample());
        let mut scratch = ByteArrayDataInput::new();
        scratch.fill_from(&mut input, 4).unwrap();
        assert_eq!(scratch.read_int().unwrap(), 7);
        assert!(scratch.eof());
        let capacity = scratch.ram_bytes_used();

        scratch.reset(&[5]);
        assert_eq!(scratch.len(), 1);
        assert_eq!(scratch.ram_bytes_used(), capacity);
        assert_eq!(scratch.read_vint().unwrap(), 5);
        assert!(scratch.read_byte().is_err());
    }
}
