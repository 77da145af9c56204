use fst::MapBuilder;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{indexed_term_prefix_len, TermStats};
use crate::index::selector::IndexTermSelector;
use crate::index::{FieldIndexWriter, TermIndexWriter};
use crate::schema::schema::FieldInfo;
use crate::storage::codec_util;
use crate::storage::data_output::{DataOutput, IndexOutput};
use crate::storage::segment::SegmentState;
use crate::terms;

pub const VARIABLE_GAP_EXTENSION: &str = "tiv";
pub(crate) const VARIABLE_GAP_CODEC: &str = "VARIABLE_GAP_TERMS_INDEX";

/// Keeps the terms picked by an `IndexTermSelector` in one FST per field,
/// mapping the trimmed term to its block's dictionary offset. The empty key
/// always maps to the field's first block.
pub struct VariableGapTermsIndexWriter {
    out: Option<IndexOutput>,
    selector: IndexTermSelector,
    version: i32,
    header_len: u64,
    fields: Vec<(u32, u64)>,    // (field number, index start)
}

impl VariableGapTermsIndexWriter {
    pub fn new(state: &SegmentState, selector: IndexTermSelector, version: i32) -> Result<Self> {
        let mut out = state.layout.create_output(&state.file_name(VARIABLE_GAP_EXTENSION))?;
        codec_util::write_header(&mut out, VARIABLE_GAP_CODEC, version)?;
        let header_len = out.file_pointer();
        terms::write_dir_placeholder(&mut out, version)?;
        Ok(VariableGapTermsIndexWriter {
            out: Some(out),
            selector,
            version,
            header_len,
            fields: Vec::new(),
        })
    }
}

impl TermIndexWriter for VariableGapTermsIndexWriter {
    fn add_field(&mut self, field: &FieldInfo, terms_file_pointer: u64) -> Result<Box<dyn FieldIndexWriter + '_>> {
        let out = self.out.as_mut().ok_or_else(|| {
            Error::new(ErrorKind::InvalidState, "term index writer is closed".to_string())
        })?;
        self.selector.new_field();
        let mut builder = MapBuilder::memory();
        builder.insert(b"", terms_file_pointer)?;
        Ok(Box::new(VariableGapFieldWriter {
            out,
            fields: &mut self.fields,
            selector: &mut self.selector,
            number: field.number,
            builder: Some(builder),
            first: true,
            last_term: Vec::new(),
            start_terms_file_pointer: terms_file_pointer,
            num_index_terms: 1,
        }))
    }

    fn close(&mut self) -> Result<()> {
        let Some(mut out) = self.out.take() else {
            return Ok(());
        };
        let dir_start = out.file_pointer();
        out.write_vint(self.fields.len() as u32)?;
        for &(number, index_start) in &self.fields {
            out.write_vint(number)?;
            out.write_vlong(index_start)?;
        }
        terms::write_trailer(&mut out, self.version, self.header_len, dir_start)?;
        out.close()
    }
}

struct VariableGapFieldWriter<'a> {
    out: &'a mut IndexOutput,
    fields: &'a mut Vec<(u32, u64)>,
    selector: &'a mut IndexTermSelector,
    number: u32,
    builder: Option<MapBuilder<Vec<u8>>>,
    first: bool,
    last_term: Vec<u8>,
    start_terms_file_pointer: u64,
    num_index_terms: usize,
}

impl FieldIndexWriter for VariableGapFieldWriter<'_> {
    fn check_index_term(&mut self, text: &[u8], stats: &TermStats) -> bool {
        // the selector is consulted for every term to keep its count,
        // but the first term is indexed regardless
        if self.selector.is_index_term(text, stats) || self.first {
            self.first = false;
            true
        } else {
            self.last_term.clear();
            self.last_term.extend_from_slice(text);
            false
        }
    }

    fn add(&mut self, text: &[u8], _stats: &TermStats, terms_file_pointer: u64) -> Result<()> {
        if text.is_empty() {
            // already present as the field's root entry
            debug_assert_eq!(terms_file_pointer, self.start_terms_file_pointer);
            return Ok(());
        }
        let builder = self.builder.as_mut().ok_or_else(|| {
            Error::new(ErrorKind::InvalidState, "field index already finished".to_string())
        })?;
        let len = indexed_term_prefix_len(&self.last_term, text);
        builder.insert(&text[..len], terms_file_pointer)?;
        self.last_term.clear();
        self.last_term.extend_from_slice(text);
        self.num_index_terms += 1;
        Ok(())
    }

    fn finish(&mut self, _terms_file_pointer: u64) -> Result<()> {
        let Some(builder) = self.builder.take() else {
            return Ok(());
        };
        let fst_bytes = builder.into_inner()?;
        let index_start = self.out.file_pointer();
        self.out.write_vlong(fst_bytes.len() as u64)?;
        self.out.write_bytes(&fst_bytes)?;
        self.fields.push((self.number, index_start));
        log::debug!(
            "variable-gap index field={} index_terms={} fst_bytes={}",
            self.number, self.num_index_terms, fst_bytes.len()
        );
        Ok(())
    }
}
