use roaring::RoaringBitmap;
use crate::core::error::{Error, ErrorKind, Result};
use crate::postings::{BlockTermState, DocsFlags, PostingsReaderBase, PostingsWriterBase};
use crate::schema::schema::FieldInfo;
use crate::storage::codec_util;
use crate::storage::data_input::{ByteArrayDataInput, DataInput, IndexInput};
use crate::storage::data_output::{DataOutput, IndexOutput, RamOutput};
use crate::storage::segment::SegmentState;

pub const DOC_EXTENSION: &str = "doc";

const TERMS_CODEC: &str = "DocListPostingsTerms";
const DOC_CODEC: &str = "DocListPostingsDoc";
const VERSION_START: i32 = 0;
const VERSION_CURRENT: i32 = VERSION_START;

/// Where a term's postings live
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocListTermState {
    pub doc_start_fp: u64,
    /// Set for single-document terms of fields without positions; nothing
    /// is written to the doc file for them.
    pub singleton_doc: Option<u32>,
}

// Doc file entry per document:
//   has freqs:  [(docDelta << 1 | freq==1):vint][freq:vint if freq != 1]
//   doc only:   [docDelta:vint]
//   positions:  [positionDelta:vint]^freq following the doc entry
pub struct DocListPostingsWriter {
    doc_out: Option<IndexOutput>,
    scratch: RamOutput,
    field: Option<FieldInfo>,
    last_doc: Option<u32>,
    first_doc: u32,
    doc_count: u32,
    total_freq: i64,
    positions_left: u32,
    last_position: u32,
    last_doc_start_fp: u64,
}

impl DocListPostingsWriter {
    pub fn new(state: &SegmentState) -> Result<Self> {
        let mut doc_out = state.layout.create_output(&state.file_name(DOC_EXTENSION))?;
        codec_util::write_header(&mut doc_out, DOC_CODEC, VERSION_CURRENT)?;
        Ok(DocListPostingsWriter {
            doc_out: Some(doc_out),
            scratch: RamOutput::new(),
            field: None,
            last_doc: None,
            first_doc: 0,
            doc_count: 0,
            total_freq: 0,
            positions_left: 0,
            last_position: 0,
            last_doc_start_fp: 0,
        })
    }

    fn current_field(&self) -> Result<&FieldInfo> {
        self.field.as_ref().ok_or_else(|| {
            Error::new(ErrorKind::InvalidState, "postings writer has no current field".to_string())
        })
    }

    pub fn start_doc(&mut self, doc: u32, freq: u32) -> Result<()> {
        let field = self.current_field()?;
        let has_freqs = field.has_freqs();
        let has_positions = field.has_positions();
        if self.positions_left != 0 {
            return Err(Error::new(
                ErrorKind::InvalidState,
                format!("{} positions missing for doc {:?}", self.positions_left, self.last_doc),
            ));
        }
        let delta = match self.last_doc {
            Some(last) if doc <= last => {
                return Err(Error::new(
                    ErrorKind::InvalidArgument,
                    format!("docs out of order: {} after {}", doc, last),
                ));
            }
            Some(last) => doc - last,
            None => doc,
        };
        if has_freqs && freq == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument, format!("zero freq for doc {}", doc)));
        }

        if has_freqs {
            if freq == 1 {
                self.scratch.write_vint((delta << 1) | 1)?;
            } else {
                self.scratch.write_vint(delta << 1)?;
                self.scratch.write_vint(freq)?;
            }
            self.total_freq += freq as i64;
        } else {
            self.scratch.write_vint(delta)?;
        }
        if self.doc_count == 0 {
            self.first_doc = doc;
        }
        self.doc_count += 1;
        self.last_doc = Some(doc);
        self.positions_left = if has_positions { freq } else { 0 };
        self.last_position = 0;
        Ok(())
    }

    pub fn add_position(&mut self, position: u32) -> Result<()> {
        if self.positions_left == 0 {
            return Err(Error::new(ErrorKind::InvalidState, "unexpected position".to_string()));
        }
        if position < self.last_position {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("positions out of order: {} after {}", position, self.last_position),
            ));
        }
        self.scratch.write_vint(position - self.last_position)?;
        self.last_position = position;
        self.positions_left -= 1;
        Ok(())
    }
}

impl PostingsWriterBase for DocListPostingsWriter {
    type State = DocListTermState;

    fn init(&mut self, terms_out: &mut IndexOutput) -> Result<()> {
        codec_util::write_header(terms_out, TERMS_CODEC, VERSION_CURRENT)
    }

    fn set_field(&mut self, field: &FieldInfo) -> usize {
        self.field = Some(field.clone());
        1
    }

    fn start_term(&mut self) -> Result<()> {
        self.scratch.reset();
        self.last_doc = None;
        self.doc_count = 0;
        self.total_freq = 0;
        self.positions_left = 0;
        Ok(())
    }

    fn finish_term(&mut self, state: &mut BlockTermState<DocListTermState>) -> Result<()> {
        let field = self.current_field()?;
        let has_freqs = field.has_freqs();
        let has_positions = field.has_positions();
        if self.positions_left != 0 {
            return Err(Error::new(
                ErrorKind::InvalidState,
                format!("{} positions missing at end of term", self.positions_left),
            ));
        }
        if self.doc_count != state.doc_freq {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("docFreq {} but {} docs were added", state.doc_freq, self.doc_count),
            ));
        }
        if has_freqs && self.total_freq != state.total_term_freq {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("totalTermFreq {} but freqs add up to {}", state.total_term_freq, self.total_freq),
            ));
        }

        let doc_out = self.doc_out.as_mut().ok_or_else(|| {
            Error::new(ErrorKind::InvalidState, "postings writer is closed".to_string())
        })?;
        let doc_start_fp = doc_out.file_pointer();
        let singleton_doc = if state.doc_freq == 1 && !has_positions {
            Some(self.first_doc)
        } else {
            self.scratch.write_to(doc_out)?;
            None
        };
        state.postings = DocListTermState { doc_start_fp, singleton_doc };
        Ok(())
    }

    // With no long slots (legacy dictionaries) the file pointer delta goes
    // into the byte blob instead.
    fn encode_term(
        &mut self,
        longs: &mut [i64],
        out: &mut RamOutput,
        _field: &FieldInfo,
        state: &BlockTermState<DocListTermState>,
        absolute: bool,
    ) -> Result<()> {
        if absolute {
            self.last_doc_start_fp = 0;
        }
        let delta = state.postings.doc_start_fp - self.last_doc_start_fp;
        match longs.first_mut() {
            Some(slot) => *slot = delta as i64,
            None => out.write_vlong(delta)?,
        }
        if let Some(doc) = state.postings.singleton_doc {
            out.write_vint(doc)?;
        }
        self.last_doc_start_fp = state.postings.doc_start_fp;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut doc_out) = self.doc_out.take() {
            codec_util::write_footer(&mut doc_out)?;
            doc_out.close()?;
        }
        Ok(())
    }
}

pub struct DocListPostingsReader {
    doc_in: IndexInput,
}

impl DocListPostingsReader {
    pub fn open(state: &SegmentState) -> Result<Self> {
        let mut doc_in = state.layout.open_input(&state.file_name(DOC_EXTENSION))?;
        codec_util::check_header(&mut doc_in, DOC_CODEC, VERSION_START, VERSION_CURRENT)?;
        Ok(DocListPostingsReader { doc_in })
    }

    fn open_enum<'a>(
        &self,
        field: &FieldInfo,
        state: &BlockTermState<DocListTermState>,
        live_docs: Option<&'a RoaringBitmap>,
        with_positions: bool,
        flags: DocsFlags,
    ) -> Result<DocsEnum<'a>> {
        if flags.contains(DocsFlags::OFFSETS) && !field.has_offsets() {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("field {} does not index offsets", field.name),
            ));
        }
        if flags.contains(DocsFlags::PAYLOADS) && !field.has_payloads {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("field {} does not index payloads", field.name),
            ));
        }
        let mut doc_in = self.doc_in.clone();
        if state.postings.singleton_doc.is_none() {
            doc_in.seek(state.postings.doc_start_fp)?;
        }
        Ok(DocsEnum {
            doc_in,
            singleton_doc: state.postings.singleton_doc,
            singleton_freq: state.total_term_freq.max(1) as u32,
            doc_freq: state.doc_freq,
            has_freqs: field.has_freqs(),
            report_freqs: field.has_freqs() && flags.contains(DocsFlags::FREQS),
            has_positions: field.has_positions(),
            with_positions,
            live_docs,
            upto: 0,
            doc: None,
            freq: 1,
            positions_left: 0,
            position: 0,
        })
    }
}

impl PostingsReaderBase for DocListPostingsReader {
    type State = DocListTermState;

    fn init(&mut self, terms_in: &mut IndexInput) -> Result<()> {
        codec_util::check_header(terms_in, TERMS_CODEC, VERSION_START, VERSION_CURRENT)?;
        Ok(())
    }

    fn decode_term(
        &self,
        longs: &[i64],
        bytes: &mut ByteArrayDataInput,
        field: &FieldInfo,
        state: &mut BlockTermState<DocListTermState>,
        absolute: bool,
    ) -> Result<()> {
        if absolute {
            state.postings.doc_start_fp = 0;
        }
        let delta = match longs.first() {
            Some(&delta) => delta as u64,
            None => bytes.read_vlong()?,
        };
        state.postings.doc_start_fp += delta;
        state.postings.singleton_doc = if state.doc_freq == 1 && !field.has_positions() {
            Some(bytes.read_vint()?)
        } else {
            None
        };
        Ok(())
    }

    fn docs<'a>(
        &self,
        field: &FieldInfo,
        state: &BlockTermState<DocListTermState>,
        live_docs: Option<&'a RoaringBitmap>,
        flags: DocsFlags,
    ) -> Result<DocsEnum<'a>> {
        self.open_enum(field, state, live_docs, false, flags)
    }

    fn docs_and_positions<'a>(
        &self,
        field: &FieldInfo,
        state: &BlockTermState<DocListTermState>,
        live_docs: Option<&'a RoaringBitmap>,
        flags: DocsFlags,
    ) -> Result<Option<DocsEnum<'a>>> {
        if !field.has_positions() {
            return Ok(None);
        }
        self.open_enum(field, state, live_docs, true, flags).map(Some)
    }

    fn check_integrity(&self) -> Result<()> {
        codec_util::checksum_entire_file(&self.doc_in)?;
        Ok(())
    }

    fn ram_bytes_used(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

/// Iterates the documents of one term, skipping deleted ones
pub struct DocsEnum<'a> {
    doc_in: IndexInput,
    singleton_doc: Option<u32>,
    singleton_freq: u32,
    doc_freq: u32,
    has_freqs: bool,
    report_freqs: bool,     // FREQS requested on a field that has them
    has_positions: bool,
    with_positions: bool,
    live_docs: Option<&'a RoaringBitmap>,
    upto: u32,
    doc: Option<u32>,
    freq: u32,
    positions_left: u32,
    position: u32,
}

impl<'a> DocsEnum<'a> {
    pub fn doc_freq(&self) -> u32 {
        self.doc_freq
    }

    /// Current document, `None` before the first `next_doc` and after the last
    pub fn doc(&self) -> Option<u32> {
        self.doc
    }

    /// Term frequency in the current document; 1 when freqs are not
    /// indexed or were not requested
    pub fn freq(&self) -> u32 {
        if self.report_freqs { self.freq } else { 1 }
    }

    pub fn next_doc(&mut self) -> Result<Option<u32>> {
        loop {
            if self.upto == self.doc_freq {
                self.doc = None;
                return Ok(None);
            }
            self.skip_positions()?;
            let doc = self.read_doc()?;
            self.upto += 1;
            let live = self.live_docs.is_none_or(|live| live.contains(doc));
            if live {
                self.doc = Some(doc);
                return Ok(self.doc);
            }
            self.doc = Some(doc);
        }
    }

    /// Next position of the current document
    pub fn next_position(&mut self) -> Result<u32> {
        if !self.with_positions {
            return Err(Error::new(ErrorKind::InvalidState, "enum was opened without positions".to_string()));
        }
        if self.positions_left == 0 {
            return Err(Error::new(ErrorKind::InvalidState, "no positions left for this document".to_string()));
        }
        self.position += self.doc_in.read_vint()?;
        self.positions_left -= 1;
        Ok(self.position)
    }

    fn read_doc(&mut self) -> Result<u32> {
        if let Some(doc) = self.singleton_doc {
            self.freq = if self.has_freqs { self.singleton_freq } else { 1 };
            return Ok(doc);
        }
        let last = self.doc.unwrap_or(0);
        let doc = if self.has_freqs {
            let code = self.doc_in.read_vint()?;
            self.freq = if code & 1 != 0 { 1 } else { self.doc_in.read_vint()? };
            last + (code >> 1)
        } else {
            self.freq = 1;
            last + self.doc_in.read_vint()?
        };
        self.positions_left = if self.has_positions { self.freq } else { 0 };
        self.position = 0;
        Ok(doc)
    }

    fn skip_positions(&mut self) -> Result<()> {
        while self.positions_left > 0 {
            self.doc_in.read_vint()?;
            self.positions_left -= 1;
        }
        Ok(())
    }
}
