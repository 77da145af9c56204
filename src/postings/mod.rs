//! Contract between the block term dictionary and a postings codec.
//!
//! The dictionary stores per-term metadata it does not understand: a fixed
//! number of longs (delta-encoded against the previous term of the block
//! unless `absolute`) plus a byte blob. Codecs fill and read both through
//! the two traits below.

pub mod doc_list;

use std::fmt::Debug;
use roaring::RoaringBitmap;
use crate::core::error::Result;
use crate::schema::schema::FieldInfo;
use crate::storage::data_input::{ByteArrayDataInput, IndexInput};
use crate::storage::data_output::{IndexOutput, RamOutput};

pub use doc_list::{DocListPostingsReader, DocListPostingsWriter, DocListTermState, DocsEnum};

/// Term metadata tracked by the dictionary, wrapping the codec's own state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockTermState<S> {
    pub doc_freq: u32,
    pub total_term_freq: i64,
    pub ord: i64,                   // -1 when unknown
    pub block_file_pointer: u64,    // start of the block holding the term
    pub term_block_ord: usize,      // terms of the block up to and including this one
    pub postings: S,
}

impl<S: Default> BlockTermState<S> {
    pub fn new() -> Self {
        BlockTermState {
            ord: -1,
            ..Default::default()
        }
    }
}

bitflags::bitflags! {
    /// What a postings enum must report beyond document ids
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DocsFlags: u8 {
        const FREQS = 1 << 0;
        const OFFSETS = 1 << 1;
        const PAYLOADS = 1 << 2;
    }
}

pub trait PostingsWriterBase {
    type State: Debug + Clone + Default;

    /// Writes the codec's private header into the terms file
    fn init(&mut self, terms_out: &mut IndexOutput) -> Result<()>;

    /// Returns how many metadata longs each term of `field` needs
    fn set_field(&mut self, field: &FieldInfo) -> usize;

    fn start_term(&mut self) -> Result<()>;

    /// Seals the postings of the current term. `state` already carries the
    /// doc and term frequencies.
    fn finish_term(&mut self, state: &mut BlockTermState<Self::State>) -> Result<()>;

    /// `longs` has the length returned by `set_field`, which may be zero.
    fn encode_term(
        &mut self,
        longs: &mut [i64],
        out: &mut RamOutput,
        field: &FieldInfo,
        state: &BlockTermState<Self::State>,
        absolute: bool,
    ) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

pub trait PostingsReaderBase: Send + Sync {
    type State: Debug + Clone + Default + Send;

    /// Reads the header written by `PostingsWriterBase::init`
    fn init(&mut self, terms_in: &mut IndexInput) -> Result<()>;

    /// Mirrors `encode_term`; called once per term in block order, with
    /// `state` still holding the previous term's values.
    fn decode_term(
        &self,
        longs: &[i64],
        bytes: &mut ByteArrayDataInput,
        field: &FieldInfo,
        state: &mut BlockTermState<Self::State>,
        absolute: bool,
    ) -> Result<()>;

    fn docs<'a>(
        &self,
        field: &FieldInfo,
        state: &BlockTermState<Self::State>,
        live_docs: Option<&'a RoaringBitmap>,
        flags: DocsFlags,
    ) -> Result<DocsEnum<'a>>;

    /// `None` when the field does not index positions
    fn docs_and_positions<'a>(
        &self,
        field: &FieldInfo,
        state: &BlockTermState<Self::State>,
        live_docs: Option<&'a RoaringBitmap>,
        flags: DocsFlags,
    ) -> Result<Option<DocsEnum<'a>>>;

    fn check_integrity(&self) -> Result<()>;

    fn ram_bytes_used(&self) -> usize;
}
