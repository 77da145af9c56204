//! Block term dictionary: terms of every field grouped into
//! prefix-compressed blocks, each block reachable from the term index.

pub mod block_terms_writer;
pub mod block_terms_reader;
pub mod segment_terms_enum;

use crate::core::error::{Error, Result};
use crate::storage::codec_util;
use crate::storage::data_input::{DataInput, IndexInput};
use crate::storage::data_output::{DataOutput, IndexOutput};

pub use block_terms_reader::{BlockTermsReader, FieldTerms};
pub use block_terms_writer::{BlockTermsWriter, FieldTermsWriter};
pub use segment_terms_enum::SegmentTermsEnum;

pub const TERMS_EXTENSION: &str = "tib";
pub const CODEC_NAME: &str = "BLOCK_TERMS_DICT";

// Format versions, shared by the dictionary and both term index files
pub const VERSION_START: i32 = 0;
/// Directory offset moved from a patched header slot to the file tail
pub const VERSION_APPEND_ONLY: i32 = 1;
/// Directory records the metadata longs per term
pub const VERSION_META_ARRAY: i32 = 2;
/// Whole-file checksum footer
pub const VERSION_CHECKSUM: i32 = 3;
pub const VERSION_CURRENT: i32 = VERSION_CHECKSUM;

/// Reserves the directory offset slot older layouts keep right after the header
pub(crate) fn write_dir_placeholder(out: &mut IndexOutput, version: i32) -> Result<()> {
    if version < VERSION_APPEND_ONLY {
        out.write_long(0)?;
    }
    Ok(())
}

/// Records where the directory starts and seals the file
pub(crate) fn write_trailer(out: &mut IndexOutput, version: i32, header_len: u64, dir_start: u64) -> Result<()> {
    if version < VERSION_APPEND_ONLY {
        out.patch_long(header_len, dir_start as i64)?;
    } else {
        out.write_long(dir_start as i64)?;
    }
    if version >= VERSION_CHECKSUM {
        codec_util::write_footer(out)?;
    }
    Ok(())
}

/// Locates the directory offset written by `write_trailer`
pub(crate) fn read_dir_offset(input: &IndexInput, version: i32, header_len: u64) -> Result<u64> {
    let mut tail = input.clone();
    let pos = if version < VERSION_APPEND_ONLY {
        header_len
    } else {
        let trailer_len = if version >= VERSION_CHECKSUM { codec_util::footer_length() + 8 } else { 8 };
        input.len().checked_sub(trailer_len).ok_or_else(|| {
            Error::corruption(format!("file too short for trailer: length={}", input.len()), input.name())
        })?
    };
    tail.seek(pos)?;
    let offset = tail.read_long()?;
    if offset < 0 || offset as u64 > input.len() {
        return Err(Error::corruption(format!("invalid directory offset: {}", offset), input.name()));
    }
    Ok(offset as u64)
}

/// Validates the header and, for checksummed versions, the whole file.
/// Returns the version.
pub(crate) fn open_checked(input: &mut IndexInput, codec: &str) -> Result<i32> {
    let version = codec_util::check_header(input, codec, VERSION_START, VERSION_CURRENT)?;
    if version >= VERSION_CHECKSUM {
        codec_util::checksum_entire_file(input)?;
    }
    Ok(version)
}

/// Per-field directory entry of the dictionary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMetaData {
    pub field_number: u32,
    pub num_terms: u64,
    pub terms_start_pointer: u64,
    pub sum_total_term_freq: i64,   // -1 for doc-only fields
    pub sum_doc_freq: u64,
    pub doc_count: u32,
    pub longs_size: usize,
}
