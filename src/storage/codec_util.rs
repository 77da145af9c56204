use crc32fast::Hasher;
use crate::core::error::{Error, Result};
use crate::storage::data_input::{DataInput, IndexInput};
use crate::storage::data_output::{DataOutput, IndexOutput};

/// First int of every file header
pub const CODEC_MAGIC: i32 = 0x3fd7_6c17;
/// First int of every file footer
pub const FOOTER_MAGIC: i32 = !CODEC_MAGIC;

const CHECKSUM_ALGORITHM: i32 = 0;  // CRC32 widened to 64 bits

// [ CODEC_MAGIC:int ][ codec:string ][ version:int ]
pub fn write_header<O: DataOutput>(out: &mut O, codec: &str, version: i32) -> Result<()> {
    out.write_int(CODEC_MAGIC)?;
    out.write_string(codec)?;
    out.write_int(version)
}

pub fn header_length(codec: &str) -> u64 {
    9 + codec.len() as u64
}

/// Validates magic and codec name, returns the version found.
pub fn check_header(input: &mut IndexInput, codec: &str, min_version: i32, max_version: i32) -> Result<i32> {
    let magic = input.read_int()?;
    if magic != CODEC_MAGIC {
        return Err(Error::corruption(
            format!("codec header mismatch: actual header={:#x} vs expected header={:#x}", magic, CODEC_MAGIC),
            input.name(),
        ));
    }
    let actual = input.read_string()?;
    if actual != codec {
        return Err(Error::corruption(
            format!("codec mismatch: actual codec={} vs expected codec={}", actual, codec),
            input.name(),
        ));
    }
    let version = input.read_int()?;
    if version < min_version || version > max_version {
        return Err(Error::corruption(
            format!("unsupported version {} (needs to be between {} and {})", version, min_version, max_version),
            input.name(),
        ));
    }
    Ok(version)
}

// [ FOOTER_MAGIC:int ][ algorithm:int ][ checksum:long ]
// The checksum covers every byte before it, the magic and algorithm included.
pub fn write_footer(out: &mut IndexOutput) -> Result<()> {
    out.write_int(FOOTER_MAGIC)?;
    out.write_int(CHECKSUM_ALGORITHM)?;
    let checksum = out.checksum();
    out.write_long(checksum as i64)
}

pub fn footer_length() -> u64 {
    16
}

/// Recomputes the CRC32 of the whole file and compares it with the footer
pub fn checksum_entire_file(input: &IndexInput) -> Result<u64> {
    let len = input.len();
    if len < footer_length() {
        return Err(Error::corruption(
            format!("misplaced codec footer (file truncated?): length={} but footerLength=={}", len, footer_length()),
            input.name(),
        ));
    }
    let data = input.data();
    let footer_start = (len - footer_length()) as usize;

    let mut footer = input.clone();
    footer.seek(footer_start as u64)?;
    let magic = footer.read_int()?;
    if magic != FOOTER_MAGIC {
        return Err(Error::corruption(
            format!("codec footer mismatch: actual footer={:#x} vs expected footer={:#x}", magic, FOOTER_MAGIC),
            input.name(),
        ));
    }
    let algorithm = footer.read_int()?;
    if algorithm != CHECKSUM_ALGORITHM {
        return Err(Error::corruption(format!("unknown checksum algorithm: {}", algorithm), input.name()));
    }
    let expected = footer.read_long()? as u64;

    let mut hasher = Hasher::new();
    hasher.update(&data[..footer_start + 8]);
    let actual = hasher.finalize() as u64;
    if actual != expected {
        return Err(Error::corruption(
            format!("checksum failed (hardware problem?) : expected={:#x} actual={:#x}", expected, actual),
            input.name(),
        ));
    }
    Ok(actual)
}
