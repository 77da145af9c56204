use std::cmp::Ordering;
use roaring::RoaringBitmap;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::SeekStatus;
use crate::index::{FieldIndexEnum, TermIndexReader};
use crate::postings::{BlockTermState, DocsEnum, DocsFlags, PostingsReaderBase};
use crate::storage::data_input::{ByteArrayDataInput, DataInput, IndexInput};
use crate::terms::block_terms_reader::FieldReader;

/// What the cursor knows about its position relative to the term index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CursorState {
    /// Positioned by an index seek and no index term crossed since
    pub index_is_current: bool,
    /// `next_index_term` holds the index term after the current block
    pub did_index_next: bool,
    pub next_index_term: Option<Vec<u8>>,
    /// Positioned from a caller supplied term state; the block is not loaded
    pub seek_pending: bool,
    pub blocks_since_seek: i32,
}

impl CursorState {
    pub fn on_index_seek(&mut self) {
        self.index_is_current = true;
        self.did_index_next = false;
        self.blocks_since_seek = 0;
        self.seek_pending = false;
    }

    /// With divisor d, an index entry covers d blocks
    pub fn on_block_loaded(&mut self, divisor: i32) {
        self.blocks_since_seek += 1;
        self.index_is_current = self.index_is_current && self.blocks_since_seek < divisor;
    }

    pub fn on_state_seek(&mut self) {
        self.seek_pending = true;
        self.index_is_current = false;
    }

    pub fn on_end(&mut self) {
        self.index_is_current = false;
    }

    /// True when `target`, which sorts after the current term, is known to
    /// sit before the next index term
    pub fn within_current_block_range(&self, target: &[u8]) -> bool {
        match &self.next_index_term {
            None => true,
            Some(next) => target < next.as_slice(),
        }
    }
}

/// Cursor over the terms of one field.
///
/// Each cursor owns a clone of the dictionary input and its own index
/// enum, so any number of them can run in parallel over one reader.
pub struct SegmentTermsEnum<'a, P: PostingsReaderBase> {
    postings: &'a P,
    index: &'a dyn TermIndexReader,
    field: &'a FieldReader,
    input: IndexInput,
    index_enum: Option<Box<dyn FieldIndexEnum>>,
    do_ord: bool,
    cursor: CursorState,
    state: BlockTermState<P::State>,
    term: Vec<u8>,
    term_block_prefix: usize,
    block_term_count: usize,
    suffixes: ByteArrayDataInput,
    freqs: ByteArrayDataInput,
    bytes: ByteArrayDataInput,
    longs: Vec<i64>,
    metadata_upto: usize,   // terms of the block whose metadata is decoded
}

impl<'a, P: PostingsReaderBase> SegmentTermsEnum<'a, P> {
    pub(crate) fn new(
        postings: &'a P,
        index: &'a dyn TermIndexReader,
        field: &'a FieldReader,
        mut input: IndexInput,
    ) -> Result<Self> {
        input.seek(field.meta.terms_start_pointer)?;
        let mut state = BlockTermState::new();
        state.total_term_freq = -1;
        Ok(SegmentTermsEnum {
            postings,
            index,
            field,
            input,
            index_enum: index.field_enum(&field.info),
            do_ord: index.supports_ord(),
            cursor: CursorState::default(),
            state,
            term: Vec::new(),
            term_block_prefix: 0,
            block_term_count: 0,
            suffixes: ByteArrayDataInput::new(),
            freqs: ByteArrayDataInput::new(),
            bytes: ByteArrayDataInput::new(),
            longs: vec![0; field.meta.longs_size],
            metadata_upto: 0,
        })
    }

    /// Current term; empty before the first positioning
    pub fn term(&self) -> &[u8] {
        &self.term
    }

    pub fn field_name(&self) -> &str {
        &self.field.info.name
    }

    /// Positions on the smallest term >= `target`
    pub fn seek_ceil(&mut self, target: &[u8]) -> Result<SeekStatus> {
        self.index_enum()?;

        let mut do_seek = true;
        if self.cursor.index_is_current {
            match self.term.as_slice().cmp(target) {
                Ordering::Equal => return Ok(SeekStatus::Found),
                Ordering::Less => {
                    if !self.cursor.did_index_next {
                        let index_enum = self.index_enum()?;
                        let next = match index_enum.next()? {
                            Some(_) => Some(index_enum.term().to_vec()),
                            None => None,
                        };
                        self.cursor.next_index_term = next;
                        self.cursor.did_index_next = true;
                    }
                    // target falls in the block range already loaded:
                    // scan on from here
                    if self.cursor.within_current_block_range(target) {
                        do_seek = false;
                    }
                }
                Ordering::Greater => {}
            }
        }

        if do_seek {
            let fp = self.index_enum()?.seek(target)?;
            self.position_at_index_term(fp)?;
        } else if self.state.term_block_ord == self.block_term_count && !self.next_block()? {
            self.cursor.on_end();
            return Ok(SeekStatus::End);
        }
        self.cursor.seek_pending = false;

        let mut common = 0;
        loop {
            // target must first match the prefix shared by the block
            if common < self.term_block_prefix {
                let cmp = match target.get(common) {
                    Some(&b) => self.term.get(common).copied().unwrap_or(0).cmp(&b),
                    None => Ordering::Greater,
                };
                match cmp {
                    Ordering::Less => {
                        // every term of this block sorts before the target;
                        // finish it so the last term seeds the next prefix
                        if self.state.term_block_ord < self.block_term_count {
                            while self.state.term_block_ord < self.block_term_count - 1 {
                                self.state.term_block_ord += 1;
                                self.bump_ord();
                                let suffix = self.suffixes.read_vint()? as usize;
                                self.suffixes.skip_bytes(suffix)?;
                            }
                            let suffix = self.suffixes.read_vint()? as usize;
                            self.fill_term(suffix)?;
                            self.bump_ord();
                        }
                        if !self.next_block()? {
                            self.cursor.on_end();
                            return Ok(SeekStatus::End);
                        }
                        common = 0;
                    }
                    Ordering::Greater => {
                        // the whole block sorts after the target
                        self.state.term_block_ord += 1;
                        self.bump_ord();
                        let suffix = self.suffixes.read_vint()? as usize;
                        self.fill_term(suffix)?;
                        return Ok(SeekStatus::NotFound);
                    }
                    Ordering::Equal => common += 1,
                }
                continue;
            }

            // prefix matches: compare suffixes without materializing terms
            loop {
                self.state.term_block_ord += 1;
                self.bump_ord();
                let suffix = self.suffixes.read_vint()? as usize;
                let cmp = {
                    let pos = self.suffixes.position();
                    let candidate = self.suffixes.bytes().get(pos..pos + suffix).ok_or_else(|| {
                        Error::corruption(
                            format!("term suffix of {} bytes overruns its block", suffix),
                            self.input.name(),
                        )
                    })?;
                    candidate.cmp(&target[self.term_block_prefix..])
                };
                match cmp {
                    Ordering::Equal => {
                        self.fill_term(suffix)?;
                        return Ok(SeekStatus::Found);
                    }
                    Ordering::Greater => {
                        self.fill_term(suffix)?;
                        return Ok(SeekStatus::NotFound);
                    }
                    Ordering::Less if self.state.term_block_ord == self.block_term_count => {
                        self.fill_term(suffix)?;
                        break;
                    }
                    Ordering::Less => self.suffixes.skip_bytes(suffix)?,
                }
            }

            if !self.next_block()? {
                self.cursor.on_end();
                return Ok(SeekStatus::End);
            }
            common = 0;
        }
    }

    pub fn seek_exact(&mut self, target: &[u8]) -> Result<bool> {
        Ok(self.seek_ceil(target)? == SeekStatus::Found)
    }

    /// Positions on `target` using a state previously returned by
    /// `term_state` for that term. Nothing is read until the caller asks
    /// for more than the state holds.
    pub fn seek_exact_state(&mut self, target: &[u8], state: &BlockTermState<P::State>) -> Result<()> {
        if self.do_ord && state.ord >= self.field.meta.num_terms as i64 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("term state ord {} out of range (numTerms={})", state.ord, self.field.meta.num_terms),
            ));
        }
        self.state.clone_from(state);
        self.cursor.on_state_seek();
        self.term.clear();
        self.term.extend_from_slice(target);
        Ok(())
    }

    /// Positions on the term with ordinal `ord`
    pub fn seek_exact_ord(&mut self, ord: i64) -> Result<()> {
        if !self.do_ord {
            return Err(Error::unsupported("term index does not support ordinals"));
        }
        if ord < 0 || ord as u64 >= self.field.meta.num_terms {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("ord {} out of range (numTerms={})", ord, self.field.meta.num_terms),
            ));
        }
        let fp = self.index_enum()?.seek_ord(ord)?;
        self.position_at_index_term(fp)?;
        let mut left = ord - self.state.ord;
        while left > 0 {
            if !self.advance()? {
                return Err(Error::corruption(
                    format!("field {} ended before ord {}", self.field.info.name, ord),
                    self.input.name(),
                ));
            }
            left -= 1;
        }
        Ok(())
    }

    /// Advances to the next term, `None` past the last one
    pub fn next(&mut self) -> Result<Option<&[u8]>> {
        if self.cursor.seek_pending {
            // reload the block the cached state points into and replay up
            // to the term, keeping the caller's ordinal
            self.input.seek(self.state.block_file_pointer)?;
            let pending = self.state.term_block_ord;
            if !self.next_block()? {
                return Err(Error::corruption(
                    format!("term state points at an empty block at {}", self.state.block_file_pointer),
                    self.input.name(),
                ));
            }
            let saved_ord = self.state.ord;
            while self.state.term_block_ord < pending {
                if !self.advance()? {
                    return Err(Error::corruption("term state points past its block", self.input.name()));
                }
            }
            self.cursor.seek_pending = false;
            self.state.ord = saved_ord;
        }
        Ok(if self.advance()? { Some(self.term.as_slice()) } else { None })
    }

    /// Ordinal of the current term
    pub fn ord(&self) -> Result<i64> {
        if !self.do_ord {
            return Err(Error::unsupported("term index does not support ordinals"));
        }
        Ok(self.state.ord)
    }

    pub fn doc_freq(&mut self) -> Result<u32> {
        self.decode_metadata()?;
        Ok(self.state.doc_freq)
    }

    /// -1 for fields without frequencies
    pub fn total_term_freq(&mut self) -> Result<i64> {
        self.decode_metadata()?;
        Ok(self.state.total_term_freq)
    }

    /// Snapshot of the current term's state, for `seek_exact_state`
    pub fn term_state(&mut self) -> Result<BlockTermState<P::State>> {
        self.decode_metadata()?;
        Ok(self.state.clone())
    }

    pub fn docs<'b>(&mut self, live_docs: Option<&'b RoaringBitmap>, flags: DocsFlags) -> Result<DocsEnum<'b>> {
        self.decode_metadata()?;
        self.postings.docs(&self.field.info, &self.state, live_docs, flags)
    }

    /// `None` when the field does not index positions
    pub fn docs_and_positions<'b>(
        &mut self,
        live_docs: Option<&'b RoaringBitmap>,
        flags: DocsFlags,
    ) -> Result<Option<DocsEnum<'b>>> {
        if !self.field.info.has_positions() {
            return Ok(None);
        }
        self.decode_metadata()?;
        self.postings.docs_and_positions(&self.field.info, &self.state, live_docs, flags)
    }

    fn index_enum(&mut self) -> Result<&mut Box<dyn FieldIndexEnum>> {
        // the field index may have been loaded since this cursor was created
        if self.index_enum.is_none() {
            self.index_enum = self.index.field_enum(&self.field.info);
        }
        self.index_enum
            .as_mut()
            .ok_or_else(|| Error::new(ErrorKind::InvalidState, "terms index was not loaded".to_string()))
    }

    fn divisor(&self) -> i32 {
        match &self.index_enum {
            Some(index_enum) => index_enum.divisor(),
            None => self.index.divisor(),
        }
    }

    /// Loads the block at `fp`, which the index enum is positioned on
    fn position_at_index_term(&mut self, fp: u64) -> Result<()> {
        self.input.seek(fp)?;
        if !self.next_block()? {
            return Err(Error::corruption(
                format!("term index points at an empty block at {}", fp),
                self.input.name(),
            ));
        }
        self.cursor.on_index_seek();
        let Some(index_enum) = self.index_enum.as_deref() else {
            return Err(Error::new(ErrorKind::InvalidState, "terms index was not loaded".to_string()));
        };
        self.state.ord = if self.do_ord { index_enum.ord()? - 1 } else { -1 };
        self.term.clear();
        self.term.extend_from_slice(index_enum.term());
        Ok(())
    }

    fn next_block(&mut self) -> Result<bool> {
        self.state.block_file_pointer = self.input.file_pointer();
        self.block_term_count = self.input.read_vint()? as usize;
        if self.block_term_count == 0 {
            // stay on the end marker so further calls keep reporting the end
            self.input.seek(self.state.block_file_pointer)?;
            self.state.term_block_ord = 0;
            return Ok(false);
        }
        self.term_block_prefix = self.input.read_vint()? as usize;

        let len = self.input.read_vint()? as usize;
        self.suffixes.fill_from(&mut self.input, len)?;
        let len = self.input.read_vint()? as usize;
        self.freqs.fill_from(&mut self.input, len)?;
        let len = self.input.read_vint()? as usize;
        self.bytes.fill_from(&mut self.input, len)?;

        self.metadata_upto = 0;
        self.state.term_block_ord = 0;
        let divisor = self.divisor();
        self.cursor.on_block_loaded(divisor);
        Ok(true)
    }

    fn advance(&mut self) -> Result<bool> {
        if self.state.term_block_ord == self.block_term_count && !self.next_block()? {
            self.cursor.on_end();
            return Ok(false);
        }
        let suffix = self.suffixes.read_vint()? as usize;
        self.fill_term(suffix)?;
        self.state.term_block_ord += 1;
        self.bump_ord();
        Ok(true)
    }

    /// Ordinals are only tracked when the index can seek by them;
    /// otherwise the state keeps -1
    fn bump_ord(&mut self) {
        if self.do_ord {
            self.state.ord += 1;
        }
    }

    /// Replaces the bytes after the block prefix with the next suffix
    fn fill_term(&mut self, suffix: usize) -> Result<()> {
        self.term.resize(self.term_block_prefix + suffix, 0);
        self.suffixes.read_bytes(&mut self.term[self.term_block_prefix..])
    }

    /// Decodes stats and codec metadata of the block's terms up to the
    /// current one. A pending state already carries them.
    fn decode_metadata(&mut self) -> Result<()> {
        if self.cursor.seek_pending {
            return Ok(());
        }
        let doc_only = self.field.info.is_doc_only();
        let limit = self.state.term_block_ord;
        let mut absolute = self.metadata_upto == 0;
        while self.metadata_upto < limit {
            self.state.doc_freq = self.freqs.read_vint()?;
            if !doc_only {
                self.state.total_term_freq = self.state.doc_freq as i64 + self.freqs.read_vlong()? as i64;
            }
            for slot in self.longs.iter_mut() {
                *slot = self.bytes.read_vlong()? as i64;
            }
            self.postings
                .decode_term(&self.longs, &mut self.bytes, &self.field.info, &mut self.state, absolute)?;
            self.metadata_upto += 1;
            absolute = false;
        }
        Ok(())
    }
}
