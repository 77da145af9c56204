use crate::compression::packed::{bits_required, PackedWriter};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{indexed_term_prefix_len, TermStats};
use crate::index::{FieldIndexWriter, TermIndexWriter};
use crate::schema::schema::FieldInfo;
use crate::storage::codec_util;
use crate::storage::data_output::{DataOutput, IndexOutput};
use crate::storage::segment::SegmentState;
use crate::terms;

pub const FIXED_GAP_EXTENSION: &str = "tii";
pub(crate) const FIXED_GAP_CODEC: &str = "FIXED_GAP_TERMS_INDEX";

/// Indexes every `interval`-th term of each field (ordinals 0, interval,
/// 2*interval, ...), so an ordinal maps straight to an index slot.
///
/// File layout after the header and interval:
/// `[trimmed term bytes][packed dict offsets][packed byte offsets]` per
/// field, then the directory, trailer and footer.
pub struct FixedGapTermsIndexWriter {
    out: Option<IndexOutput>,
    interval: usize,
    version: i32,
    header_len: u64,
    fields: Vec<FieldEntry>,
}

#[derive(Debug, Clone)]
struct FieldEntry {
    number: u32,
    num_index_terms: usize,
    terms_start: u64,
    index_start: u64,
    packed_index_start: u64,
    packed_offsets_start: u64,
}

impl FixedGapTermsIndexWriter {
    pub fn new(state: &SegmentState, interval: usize, version: i32) -> Result<Self> {
        if interval < 1 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("term index interval must be >= 1, got {}", interval),
            ));
        }
        let mut out = state.layout.create_output(&state.file_name(FIXED_GAP_EXTENSION))?;
        codec_util::write_header(&mut out, FIXED_GAP_CODEC, version)?;
        let header_len = out.file_pointer();
        terms::write_dir_placeholder(&mut out, version)?;
        out.write_int(interval as i32)?;
        Ok(FixedGapTermsIndexWriter {
            out: Some(out),
            interval,
            version,
            header_len,
            fields: Vec::new(),
        })
    }
}

impl TermIndexWriter for FixedGapTermsIndexWriter {
    fn add_field(&mut self, field: &FieldInfo, terms_file_pointer: u64) -> Result<Box<dyn FieldIndexWriter + '_>> {
        let out = self.out.as_mut().ok_or_else(|| {
            Error::new(ErrorKind::InvalidState, "term index writer is closed".to_string())
        })?;
        let index_start = out.file_pointer();
        Ok(Box::new(FixedGapFieldWriter {
            out,
            fields: &mut self.fields,
            interval: self.interval,
            number: field.number,
            num_terms: 0,
            num_index_terms: 0,
            last_term: Vec::new(),
            terms_start: terms_file_pointer,
            last_terms_pointer: terms_file_pointer,
            index_start,
            term_lengths: Vec::new(),
            terms_pointer_deltas: Vec::new(),
            total_term_length: 0,
        }))
    }

    fn close(&mut self) -> Result<()> {
        let Some(mut out) = self.out.take() else {
            return Ok(());
        };
        let dir_start = out.file_pointer();
        out.write_vint(self.fields.len() as u32)?;
        for field in &self.fields {
            out.write_vint(field.number)?;
            out.write_vint(field.num_index_terms as u32)?;
            out.write_vlong(field.terms_start)?;
            out.write_vlong(field.index_start)?;
            out.write_vlong(field.packed_index_start)?;
            out.write_vlong(field.packed_offsets_start)?;
        }
        terms::write_trailer(&mut out, self.version, self.header_len, dir_start)?;
        out.close()
    }
}

struct FixedGapFieldWriter<'a> {
    out: &'a mut IndexOutput,
    fields: &'a mut Vec<FieldEntry>,
    interval: usize,
    number: u32,
    num_terms: usize,
    num_index_terms: usize,
    last_term: Vec<u8>,
    terms_start: u64,
    last_terms_pointer: u64,
    index_start: u64,
    term_lengths: Vec<u16>,
    terms_pointer_deltas: Vec<u64>,
    total_term_length: u64,
}

impl FieldIndexWriter for FixedGapFieldWriter<'_> {
    fn check_index_term(&mut self, text: &[u8], _stats: &TermStats) -> bool {
        let selected = self.num_terms % self.interval == 0;
        self.num_terms += 1;
        if !selected && self.num_terms % self.interval == 0 {
            // term right before the next index term, used for trimming
            self.last_term.clear();
            self.last_term.extend_from_slice(text);
        }
        selected
    }

    fn add(&mut self, text: &[u8], _stats: &TermStats, terms_file_pointer: u64) -> Result<()> {
        let len = indexed_term_prefix_len(&self.last_term, text);
        if len > u16::MAX as usize {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("index term prefix too long: {} bytes", len),
            ));
        }
        self.out.write_bytes(&text[..len])?;
        self.terms_pointer_deltas.push(terms_file_pointer - self.last_terms_pointer);
        self.last_terms_pointer = terms_file_pointer;
        self.term_lengths.push(len as u16);
        self.total_term_length += len as u64;
        self.last_term.clear();
        self.last_term.extend_from_slice(text);
        self.num_index_terms += 1;
        Ok(())
    }

    fn finish(&mut self, terms_file_pointer: u64) -> Result<()> {
        // dictionary offsets, relative to the field's first block
        let packed_index_start = self.out.file_pointer();
        let bits = bits_required(terms_file_pointer - self.terms_start);
        let mut writer = PackedWriter::new(&mut *self.out, self.num_index_terms, bits)?;
        let mut upto = 0u64;
        for &delta in &self.terms_pointer_deltas {
            upto += delta;
            writer.add(upto)?;
        }
        writer.finish()?;

        // start of each index term in the byte blob, plus the blob end
        let packed_offsets_start = self.out.file_pointer();
        let mut writer = PackedWriter::new(&mut *self.out, self.num_index_terms + 1, bits_required(self.total_term_length))?;
        let mut upto = 0u64;
        for &len in &self.term_lengths {
            writer.add(upto)?;
            upto += len as u64;
        }
        writer.add(upto)?;
        writer.finish()?;

        log::debug!(
            "fixed-gap index field={} terms={} index_terms={} term_bytes={}",
            self.number, self.num_terms, self.num_index_terms, self.total_term_length
        );
        if self.num_index_terms > 0 {
            self.fields.push(FieldEntry {
                number: self.number,
                num_index_terms: self.num_index_terms,
                terms_start: self.terms_start,
                index_start: self.index_start,
                packed_index_start,
                packed_offsets_start,
            });
        }
        Ok(())
    }
}
