use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use crc32fast::Hasher;
use crate::compression::vbyte::VByteEncoder;
use crate::core::error::Result;

const FLUSH_THRESHOLD: usize = 64 * 1024;

/// Sink for the primitive encodings every file of the dictionary uses.
/// Fixed-width integers are big-endian.
pub trait DataOutput {
    fn write_byte(&mut self, b: u8) -> Result<()>;

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    fn write_int(&mut self, value: i32) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    fn write_long(&mut self, value: i64) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    fn write_vint(&mut self, value: u32) -> Result<()> {
        self.write_vlong(value as u64)
    }

    fn write_vlong(&mut self, value: u64) -> Result<()> {
        let (buf, len) = VByteEncoder::encode_u64_to_array(value);
        self.write_bytes(&buf[..len])
    }

    fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_vint(s.len() as u32)?;
        self.write_bytes(s.as_bytes())
    }
}

/// Append-only file output with a running CRC32 over every byte written
pub struct IndexOutput {
    name: String,
    file: File,
    buffer: Vec<u8>,
    hasher: Hasher,
    file_pointer: u64,
}

impl IndexOutput {
    pub fn create<P: AsRef<Path>>(path: P, name: &str) -> Result<Self> {
        let file = File::create(path)?;
        Ok(IndexOutput {
            name: name.to_string(),
            file,
            buffer: Vec::with_capacity(FLUSH_THRESHOLD),
            hasher: Hasher::new(),
            file_pointer: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of bytes written so far
    pub fn file_pointer(&self) -> u64 {
        self.file_pointer
    }

    /// CRC32 of everything written so far
    pub fn checksum(&self) -> u64 {
        self.hasher.clone().finalize() as u64
    }

    pub fn flush(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.file.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        Ok(())
    }

    /// Overwrites an already written long. Only the un-checksummed legacy
    /// layout needs this; the running checksum is not updated.
    pub fn patch_long(&mut self, pos: u64, value: i64) -> Result<()> {
        self.flush()?;
        self.file.seek(SeekFrom::Start(pos))?;
        self.file.write_all(&value.to_be_bytes())?;
        self.file.seek(SeekFrom::End(0))?;
        Ok(())
    }

    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        self.file.sync_all()?;
        log::debug!("closed {} ({} bytes)", self.name, self.file_pointer);
        Ok(())
    }
}

impl DataOutput for IndexOutput {
    fn write_byte(&mut self, b: u8) -> Result<()> {
        self.write_bytes(&[b])
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.hasher.update(bytes);
        self.buffer.extend_from_slice(bytes);
        self.file_pointer += bytes.len() as u64;
        if self.buffer.len() >= FLUSH_THRESHOLD {
            self.flush()?;
        }
        Ok(())
    }
}

/// In-memory scratch output, reset and reused between blocks
#[derive(Debug, Default)]
pub struct RamOutput {
    buffer: Vec<u8>,
}

impl RamOutput {
    pub fn new() -> Self {
        RamOutput { buffer: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn write_to<O: DataOutput + ?Sized>(&self, out: &mut O) -> Result<()> {
        out.write_bytes(&self.buffer)
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

impl DataOutput for RamOutput {
    fn write_byte(&mut self, b: u8) -> Result<()> {
        self.buffer.push(b);
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    fn write_vlong(&mut self, value: u64) -> Result<()> {
        VByteEncoder::encode_u64(&mut self.buffer, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ram_output_encodings() {
        let mut out = RamOutput::new();
        out.write_int(1).unwrap();
        out.write_long(-1).unwrap();
        out.write_vint(300).unwrap();
        out.write_string("ab").unwrap();

        let mut expected = vec![0, 0, 0, 1];
        expected.extend_from_slice(&[0xff; 8]);
        expected.extend_from_slice(&[0xac, 0x02]);
        expected.extend_from_slice(&[2, b'a', b'b']);
        assert_eq!(out.as_bytes(), &expected[..]);

        out.reset();
        assert!(out.is_empty());
    }

    #[test]
    fn test_index_output_tracks_pointer_and_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let mut out = IndexOutput::create(&path, "out.bin").unwrap();
        out.write_bytes(b"hello").unwrap();
        out.write_long(0).unwrap();
        assert_eq!(out.file_pointer(), 13);

        let mut hasher = Hasher::new();
        hasher.update(b"hello");
        hasher.update(&[0u8; 8]);
        assert_eq!(out.checksum(), hasher.finalize() as u64);

        out.patch_long(5, 42).unwrap();
        out.close().unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(&data[..5], b"hello");
        assert_eq!(i64::from_be_bytes(data[5..13].try_into().unwrap()), 42);
    }
}
