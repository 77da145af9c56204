use bytes::Bytes;
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::Path;
use crate::core::error::Result;

/// Memory-mapped file for zero-copy reads
pub struct MmapFile {
    pub mmap: Option<Mmap>,
    pub len: usize,
}

impl MmapFile {
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let metadata = file.metadata()?;
        let len = metadata.len() as usize;

        // Zero-length maps are rejected on some platforms
        if len == 0 {
            return Ok(MmapFile { mmap: None, len });
        }
        let mmap = unsafe { MmapOptions::new().len(len).map(&file)? };

        Ok(MmapFile { mmap: Some(mmap), len })
    }

    pub fn data(&self) -> &[u8] {
        match &self.mmap {
            Some(mmap) => &mmap[..],
            None => &[],
        }
    }

    /// Hands the mapping to a shared, cheaply cloneable buffer.
    /// The mapping stays alive until the last clone is dropped.
    pub fn into_bytes(self) -> Bytes {
        match self.mmap {
            Some(mmap) => Bytes::from_owner(mmap),
            None => Bytes::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"mapped").unwrap();

        let file = MmapFile::open_read_only(&path).unwrap();
        assert_eq!(file.len, 6);
        assert_eq!(file.data(), b"mapped");
        let bytes = file.into_bytes();
        assert_eq!(&bytes[..], b"mapped");
    }

    #[test]
    fn test_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::write(&path, b"").unwrap();

        let file = MmapFile::open_read_only(&path).unwrap();
        assert!(file.data().is_empty());
        assert!(file.into_bytes().is_empty());
    }
}
