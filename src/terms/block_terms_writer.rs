use std::sync::Arc;
use crate::core::config::DictionaryConfig;
use crate::core::error::{close_all, Error, ErrorKind, Result};
use crate::core::types::{shared_prefix_len, TermStats};
use crate::index::{self, FieldIndexWriter, TermIndexWriter};
use crate::postings::{BlockTermState, PostingsWriterBase};
use crate::schema::schema::{FieldInfo, FieldInfos};
use crate::storage::codec_util;
use crate::storage::data_output::{DataOutput, IndexOutput, RamOutput};
use crate::storage::segment::SegmentState;
use crate::terms::{self, FieldMetaData, CODEC_NAME, TERMS_EXTENSION, VERSION_META_ARRAY};

/// Writes the block term dictionary of a segment.
///
/// Fields are added in increasing number order; each field's terms go
/// through a `FieldTermsWriter` which buffers terms until the term index
/// picks the next index term, then flushes them as one block:
///
/// ```text
/// [termCount:vint][prefixLen:vint]
/// [suffixLen:vint][suffix blob: (len:vint, bytes)*]
/// [statsLen:vint][stats blob: (docFreq:vint, totalTermFreq-docFreq:vlong unless doc-only)*]
/// [metaLen:vint][meta blob: (longs:vlong*, codec bytes)*]
/// ```
///
/// A block with termCount 0 ends the field.
pub struct BlockTermsWriter<P: PostingsWriterBase> {
    out: Option<IndexOutput>,
    postings: P,
    index: Box<dyn TermIndexWriter>,
    field_infos: Arc<FieldInfos>,
    version: i32,
    header_len: u64,
    fields: Vec<FieldMetaData>,
    last_field: Option<u32>,
}

impl<P: PostingsWriterBase> BlockTermsWriter<P> {
    pub fn new(state: &SegmentState, config: &DictionaryConfig, postings: P) -> Result<Self> {
        config.validate()?;
        let index = index::open_writer(state, config)?;
        Self::with_index(state, config.format_version, index, postings)
    }

    /// Uses an already created term index writer
    pub fn with_index(
        state: &SegmentState,
        version: i32,
        mut index: Box<dyn TermIndexWriter>,
        mut postings: P,
    ) -> Result<Self> {
        let name = state.file_name(TERMS_EXTENSION);
        let opened = state.layout.create_output(&name).and_then(|mut out| {
            codec_util::write_header(&mut out, CODEC_NAME, version)?;
            terms::write_dir_placeholder(&mut out, version)?;
            postings.init(&mut out)?;
            Ok(out)
        });
        let out = match opened {
            Ok(out) => out,
            Err(err) => {
                log::warn!("failed to create {}: {}", name, err);
                if let Err(suppressed) = postings.close().and(index.close()) {
                    log::warn!("suppressed error while closing after failed open: {}", suppressed);
                }
                return Err(err);
            }
        };
        Ok(BlockTermsWriter {
            out: Some(out),
            postings,
            index,
            field_infos: Arc::clone(&state.field_infos),
            version,
            header_len: codec_util::header_length(CODEC_NAME),
            fields: Vec::new(),
            last_field: None,
        })
    }

    /// Starts the terms of `field`, which must sort after every field added so far
    pub fn add_field(&mut self, field: &FieldInfo) -> Result<FieldTermsWriter<'_, P>> {
        if self.field_infos.by_number(field.number).is_none() {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("field {} ({}) is not part of the segment", field.name, field.number),
            ));
        }
        if let Some(last) = self.last_field {
            if field.number <= last {
                return Err(Error::new(
                    ErrorKind::InvalidArgument,
                    format!("fields out of order: {} after {}", field.number, last),
                ));
            }
        }
        let out = self.out.as_mut().ok_or_else(|| {
            Error::new(ErrorKind::InvalidState, "terms dictionary writer is closed".to_string())
        })?;
        self.last_field = Some(field.number);

        let terms_start_pointer = out.file_pointer();
        let field_index = self.index.add_field(field, terms_start_pointer)?;
        let longs_size = self.postings.set_field(field);
        // older layouts have no room for metadata longs
        let longs_size = if self.version >= VERSION_META_ARRAY { longs_size } else { 0 };

        Ok(FieldTermsWriter {
            field: field.clone(),
            out,
            postings: &mut self.postings,
            field_index,
            fields: &mut self.fields,
            longs_size,
            terms_start_pointer,
            num_terms: 0,
            num_blocks: 0,
            pending: Vec::new(),
            pending_count: 0,
            last_prev_term: Vec::new(),
            suffix_writer: RamOutput::new(),
            stats_writer: RamOutput::new(),
            meta_writer: RamOutput::new(),
            codec_writer: RamOutput::new(),
            longs: vec![0; longs_size],
        })
    }

    /// Writes the field directory and trailer, then closes the dictionary,
    /// the postings writer and the term index writer. Every one of them is
    /// closed even if an earlier one failed; the first error is returned.
    pub fn close(mut self) -> Result<()> {
        let dictionary = self.write_directory();
        let postings = self.postings.close();
        let index = self.index.close();
        close_all(vec![
            ("terms dictionary", dictionary),
            ("postings writer", postings),
            ("term index writer", index),
        ])
    }

    fn write_directory(&mut self) -> Result<()> {
        let Some(mut out) = self.out.take() else {
            return Ok(());
        };
        let dir_start = out.file_pointer();
        out.write_vint(self.fields.len() as u32)?;
        for field in &self.fields {
            let doc_only = self
                .field_infos
                .by_number(field.field_number)
                .is_some_and(|info| info.is_doc_only());
            out.write_vint(field.field_number)?;
            out.write_vlong(field.num_terms)?;
            out.write_vlong(field.terms_start_pointer)?;
            if !doc_only {
                out.write_vlong(field.sum_total_term_freq as u64)?;
            }
            out.write_vlong(field.sum_doc_freq)?;
            out.write_vint(field.doc_count)?;
            if self.version >= VERSION_META_ARRAY {
                out.write_vint(field.longs_size as u32)?;
            }
        }
        terms::write_trailer(&mut out, self.version, self.header_len, dir_start)?;
        log::debug!("wrote terms dictionary {} with {} fields", out.name(), self.fields.len());
        out.close()
    }
}

struct PendingTerm<S> {
    term: Vec<u8>,
    state: BlockTermState<S>,
}

/// Term sink for one field. Terms must arrive in strictly increasing byte
/// order; for each one call `start_term`, feed its postings through
/// `postings_mut`, then `finish_term`.
pub struct FieldTermsWriter<'a, P: PostingsWriterBase> {
    field: FieldInfo,
    out: &'a mut IndexOutput,
    postings: &'a mut P,
    field_index: Box<dyn FieldIndexWriter + 'a>,
    fields: &'a mut Vec<FieldMetaData>,
    longs_size: usize,
    terms_start_pointer: u64,
    num_terms: u64,
    num_blocks: usize,
    pending: Vec<PendingTerm<P::State>>,   // slots are reused across blocks
    pending_count: usize,
    last_prev_term: Vec<u8>,
    suffix_writer: RamOutput,
    stats_writer: RamOutput,
    meta_writer: RamOutput,
    codec_writer: RamOutput,
    longs: Vec<i64>,
}

impl<P: PostingsWriterBase> FieldTermsWriter<'_, P> {
    pub fn field(&self) -> &FieldInfo {
        &self.field
    }

    pub fn start_term(&mut self) -> Result<()> {
        self.postings.start_term()
    }

    /// Postings writer, to feed the documents of the current term
    pub fn postings_mut(&mut self) -> &mut P {
        self.postings
    }

    pub fn finish_term(&mut self, text: &[u8], stats: TermStats) -> Result<()> {
        if stats.doc_freq == 0 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("term {:?} of field {} has docFreq 0", text, self.field.name),
            ));
        }
        if self.num_terms > 0 {
            let last = match self.pending_count {
                0 => &self.last_prev_term,
                n => &self.pending[n - 1].term,
            };
            if text <= last.as_slice() {
                return Err(Error::new(
                    ErrorKind::InvalidArgument,
                    format!("terms out of order in field {}: {:?} after {:?}", self.field.name, text, last),
                ));
            }
        }

        if self.field_index.check_index_term(text, &stats) {
            if self.pending_count > 0 {
                self.flush_block()?;
            }
            self.field_index.add(text, &stats, self.out.file_pointer())?;
        }

        if self.pending.len() == self.pending_count {
            self.pending.push(PendingTerm { term: Vec::new(), state: BlockTermState::new() });
        }
        let slot = &mut self.pending[self.pending_count];
        slot.term.clear();
        slot.term.extend_from_slice(text);
        slot.state = BlockTermState::new();
        slot.state.doc_freq = stats.doc_freq;
        slot.state.total_term_freq = stats.total_term_freq;
        self.postings.finish_term(&mut slot.state)?;
        self.pending_count += 1;
        self.num_terms += 1;
        Ok(())
    }

    /// Flushes the last block, writes the end marker and records the field
    /// in the directory if it has any terms
    pub fn finish(mut self, sum_total_term_freq: i64, sum_doc_freq: u64, doc_count: u32) -> Result<()> {
        if self.pending_count > 0 {
            self.flush_block()?;
        }
        self.out.write_vint(0)?;
        self.field_index.finish(self.out.file_pointer())?;
        log::debug!(
            "finished field {}: terms={} blocks={}",
            self.field.name, self.num_terms, self.num_blocks
        );
        if self.num_terms > 0 {
            self.fields.push(FieldMetaData {
                field_number: self.field.number,
                num_terms: self.num_terms,
                terms_start_pointer: self.terms_start_pointer,
                sum_total_term_freq: if self.field.is_doc_only() { -1 } else { sum_total_term_freq },
                sum_doc_freq,
                doc_count,
                longs_size: self.longs_size,
            });
        }
        Ok(())
    }

    fn flush_block(&mut self) -> Result<()> {
        let pending = &self.pending[..self.pending_count];

        // prefix shared by every term of the block and the last term of
        // the previous block
        let common_prefix = pending
            .iter()
            .map(|p| shared_prefix_len(&self.last_prev_term, &p.term))
            .min()
            .unwrap_or(0);

        self.out.write_vint(pending.len() as u32)?;
        self.out.write_vint(common_prefix as u32)?;

        for p in pending {
            let suffix = &p.term[common_prefix..];
            self.suffix_writer.write_vint(suffix.len() as u32)?;
            self.suffix_writer.write_bytes(suffix)?;
        }
        self.out.write_vint(self.suffix_writer.len() as u32)?;
        self.suffix_writer.write_to(&mut *self.out)?;
        self.suffix_writer.reset();

        let doc_only = self.field.is_doc_only();
        for p in pending {
            self.stats_writer.write_vint(p.state.doc_freq)?;
            if !doc_only {
                self.stats_writer.write_vlong((p.state.total_term_freq - p.state.doc_freq as i64) as u64)?;
            }
        }
        self.out.write_vint(self.stats_writer.len() as u32)?;
        self.stats_writer.write_to(&mut *self.out)?;
        self.stats_writer.reset();

        for (i, p) in pending.iter().enumerate() {
            self.postings.encode_term(&mut self.longs, &mut self.codec_writer, &self.field, &p.state, i == 0)?;
            for &value in &self.longs {
                self.meta_writer.write_vlong(value as u64)?;
            }
            self.codec_writer.write_to(&mut self.meta_writer)?;
            self.codec_writer.reset();
        }
        self.out.write_vint(self.meta_writer.len() as u32)?;
        self.meta_writer.write_to(&mut *self.out)?;
        self.meta_writer.reset();

        self.last_prev_term.clear();
        self.last_prev_term.extend_from_slice(&pending[pending.len() - 1].term);
        self.pending_count = 0;
        self.num_blocks += 1;
        Ok(())
    }
}
