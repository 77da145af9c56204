//! Sparse term indexes sitting beside the block dictionary.
//!
//! An index maps a subset of the terms ("index terms") to the dictionary
//! offset of the block each one starts. A lookup asks the index for the
//! floor entry of the target and then scans a single block.

pub mod selector;
pub mod fixed_gap_writer;
pub mod fixed_gap_reader;
pub mod variable_gap_writer;
pub mod variable_gap_reader;

use crate::core::config::{DictionaryConfig, TermIndexKind};
use crate::core::error::Result;
use crate::core::types::TermStats;
use crate::schema::schema::FieldInfo;
use crate::storage::segment::SegmentState;

pub use fixed_gap_reader::FixedGapTermsIndexReader;
pub use fixed_gap_writer::FixedGapTermsIndexWriter;
pub use selector::IndexTermSelector;
pub use variable_gap_reader::VariableGapTermsIndexReader;
pub use variable_gap_writer::VariableGapTermsIndexWriter;

/// Write side: one `FieldIndexWriter` per field, in increasing field order
pub trait TermIndexWriter {
    fn add_field(&mut self, field: &FieldInfo, terms_file_pointer: u64) -> Result<Box<dyn FieldIndexWriter + '_>>;

    /// Writes the directory and footer, then closes the file
    fn close(&mut self) -> Result<()>;
}

pub trait FieldIndexWriter {
    /// Called for every term of the field, in order. The first call always
    /// returns true.
    fn check_index_term(&mut self, text: &[u8], stats: &TermStats) -> bool;

    /// Records an accepted index term starting the block at `terms_file_pointer`
    fn add(&mut self, text: &[u8], stats: &TermStats, terms_file_pointer: u64) -> Result<()>;

    fn finish(&mut self, terms_file_pointer: u64) -> Result<()>;
}

/// Read side, shared by every cursor of a segment
pub trait TermIndexReader: Send + Sync {
    /// `None` while the field's index is not resident (lazy policy)
    fn field_enum(&self, field: &FieldInfo) -> Option<Box<dyn FieldIndexEnum>>;

    fn supports_ord(&self) -> bool;

    /// Divisor requested at open time; negative means nothing was loaded
    fn divisor(&self) -> i32;

    /// Builds the field's index with `divisor` if it is not resident yet.
    /// Loading happens at most once per field.
    fn load_field_index(&self, field: &FieldInfo, divisor: i32) -> Result<()>;

    fn ram_bytes_used(&self) -> usize;

    fn check_integrity(&self) -> Result<()>;
}

/// Cursor over the index terms of one field
pub trait FieldIndexEnum: Send {
    /// Current index term; may be a trimmed prefix of the real term
    fn term(&self) -> &[u8];

    /// Positions on the greatest index term <= `target` (or the first one)
    /// and returns its dictionary offset
    fn seek(&mut self, target: &[u8]) -> Result<u64>;

    /// Next index term's dictionary offset, `None` past the last one
    fn next(&mut self) -> Result<Option<u64>>;

    /// Ordinal of the current index term within all terms of the field
    fn ord(&self) -> Result<i64>;

    /// Positions on the index term at or before ordinal `ord`
    fn seek_ord(&mut self, ord: i64) -> Result<u64>;

    /// Divisor the field's index was loaded with
    fn divisor(&self) -> i32;
}

/// Creates the index writer selected by `config`
pub fn open_writer(state: &SegmentState, config: &DictionaryConfig) -> Result<Box<dyn TermIndexWriter>> {
    Ok(match config.term_index {
        TermIndexKind::FixedGap => Box::new(FixedGapTermsIndexWriter::new(
            state,
            config.term_index_interval,
            config.format_version,
        )?),
        TermIndexKind::VariableGap => Box::new(VariableGapTermsIndexWriter::new(
            state,
            IndexTermSelector::from_policy(config.selector),
            config.format_version,
        )?),
    })
}

/// Opens the index reader selected by `config`
pub fn open_reader(state: &SegmentState, config: &DictionaryConfig) -> Result<Box<dyn TermIndexReader>> {
    Ok(match config.term_index {
        TermIndexKind::FixedGap => Box::new(FixedGapTermsIndexReader::open(state, config.index_divisor)?),
        TermIndexKind::VariableGap => Box::new(VariableGapTermsIndexReader::open(state, config.index_divisor)?),
    })
}
