use std::path::{Path, PathBuf};
use std::fs;
use crate::core::error::Result;
use crate::mmap::mmap_file::MmapFile;
use crate::storage::data_input::IndexInput;
use crate::storage::data_output::IndexOutput;

/// Directory holding the files of one or more segments
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(StorageLayout { base_dir })
    }

    /// `<segment>[_<suffix>].<ext>`
    pub fn segment_file_name(segment: &str, suffix: &str, ext: &str) -> String {
        if suffix.is_empty() {
            format!("{}.{}", segment, ext)
        } else {
            format!("{}_{}.{}", segment, suffix, ext)
        }
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    pub fn file_exists(&self, name: &str) -> bool {
        self.file_path(name).exists()
    }

    pub fn create_output(&self, name: &str) -> Result<IndexOutput> {
        log::debug!("creating {}", name);
        IndexOutput::create(self.file_path(name), name)
    }

    /// Maps the file read-only; clones of the returned input share the mapping
    pub fn open_input(&self, name: &str) -> Result<IndexInput> {
        let file = MmapFile::open_read_only(self.file_path(name))?;
        log::debug!("opened {} ({} bytes)", name, file.len);
        Ok(IndexInput::new(name, file.into_bytes()))
    }

    pub fn delete_file(&self, name: &str) -> Result<()> {
        fs::remove_file(self.file_path(name))?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.base_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::data_input::DataInput;
    use crate::storage::data_output::DataOutput;

    #[test]
    fn test_segment_file_name() {
        assert_eq!(StorageLayout::segment_file_name("_0", "", "tib"), "_0.tib");
        assert_eq!(StorageLayout::segment_file_name("_0", "Block_1", "tii"), "_0_Block_1.tii");
    }

    #[test]
    fn test_output_then_input() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().join("seg")).unwrap();

        let mut out = layout.create_output("_0.tib").unwrap();
        out.write_vlong(12345).unwrap();
        out.close().unwrap();
        assert!(layout.file_exists("_0.tib"));

        let mut input = layout.open_input("_0.tib").unwrap();
        assert_eq!(input.name(), "_0.tib");
        assert_eq!(input.read_vlong().unwrap(), 12345);

        layout.delete_file("_0.tib").unwrap();
        assert!(!layout.file_exists("_0.tib"));
        assert!(layout.open_input("_0.tib").is_err());
    }
}
