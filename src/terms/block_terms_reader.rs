use std::collections::BTreeMap;
use crate::core::config::DictionaryConfig;
use crate::core::error::{Error, Result};
use crate::index::{self, TermIndexReader};
use crate::postings::PostingsReaderBase;
use crate::schema::schema::FieldInfo;
use crate::storage::codec_util;
use crate::storage::data_input::{DataInput, IndexInput};
use crate::storage::segment::SegmentState;
use crate::terms::segment_terms_enum::SegmentTermsEnum;
use crate::terms::{self, FieldMetaData, CODEC_NAME, TERMS_EXTENSION, VERSION_APPEND_ONLY, VERSION_CHECKSUM, VERSION_META_ARRAY};

/// Directory entry of one field, resolved against the segment's fields
#[derive(Debug, Clone)]
pub struct FieldReader {
    pub(crate) info: FieldInfo,
    pub(crate) meta: FieldMetaData,
}

/// Read side of the block term dictionary of a segment.
///
/// Immutable once opened; cursors created through `terms(..).iterator()`
/// each clone the underlying input and can be used from many threads.
pub struct BlockTermsReader<P: PostingsReaderBase> {
    input: IndexInput,
    version: i32,
    postings: P,
    index: Box<dyn TermIndexReader>,
    fields: BTreeMap<String, FieldReader>,
}

impl<P: PostingsReaderBase> BlockTermsReader<P> {
    pub fn open(state: &SegmentState, config: &DictionaryConfig, postings: P) -> Result<Self> {
        config.validate()?;
        let index = index::open_reader(state, config)?;
        Self::with_index(state, index, postings)
    }

    /// Opens the dictionary on top of an already opened term index
    pub fn with_index(state: &SegmentState, index: Box<dyn TermIndexReader>, mut postings: P) -> Result<Self> {
        let mut input = state.layout.open_input(&state.file_name(TERMS_EXTENSION))?;
        let version = terms::open_checked(&mut input, CODEC_NAME)?;
        let header_len = codec_util::header_length(CODEC_NAME);
        if version < VERSION_APPEND_ONLY {
            // skip the patched directory offset slot
            input.seek(header_len + 8)?;
        }
        postings.init(&mut input)?;

        let dir_offset = terms::read_dir_offset(&input, version, header_len)?;
        input.seek(dir_offset)?;
        let fields = Self::read_directory(&mut input, version, state)?;

        log::debug!(
            "opened terms dictionary {} version={} fields={}",
            input.name(), version, fields.len()
        );
        Ok(BlockTermsReader { input, version, postings, index, fields })
    }

    fn read_directory(input: &mut IndexInput, version: i32, state: &SegmentState) -> Result<BTreeMap<String, FieldReader>> {
        let max_doc = state.segment.max_doc;
        let num_fields = input.read_vint()?;
        if num_fields > i32::MAX as u32 {
            return Err(Error::corruption(format!("invalid number of fields: {}", num_fields as i32), input.name()));
        }

        let mut fields = BTreeMap::new();
        for _ in 0..num_fields {
            let field_number = input.read_vint()?;
            let num_terms = input.read_vlong()?;
            if num_terms > i64::MAX as u64 {
                return Err(Error::corruption(format!("invalid numTerms: {}", num_terms as i64), input.name()));
            }
            let terms_start_pointer = input.read_vlong()?;
            let info = state.field_infos.by_number(field_number).ok_or_else(|| {
                Error::corruption(format!("invalid field number: {}", field_number), input.name())
            })?;
            let sum_total_term_freq = if info.is_doc_only() { -1 } else { input.read_vlong()? as i64 };
            let sum_doc_freq = input.read_vlong()? as i64;
            let doc_count = input.read_vint()? as i32;
            let longs_size = if version >= VERSION_META_ARRAY { input.read_vint()? as usize } else { 0 };

            if doc_count < 0 || doc_count as u32 > max_doc {
                return Err(Error::corruption(
                    format!("invalid docCount: {} maxDoc: {}", doc_count, max_doc),
                    input.name(),
                ));
            }
            if sum_doc_freq < doc_count as i64 {
                return Err(Error::corruption(
                    format!("invalid sumDocFreq: {} docCount: {}", sum_doc_freq, doc_count),
                    input.name(),
                ));
            }
            if sum_total_term_freq != -1 && sum_total_term_freq < sum_doc_freq {
                return Err(Error::corruption(
                    format!("invalid sumTotalTermFreq: {} sumDocFreq: {}", sum_total_term_freq, sum_doc_freq),
                    input.name(),
                ));
            }

            let meta = FieldMetaData {
                field_number,
                num_terms,
                terms_start_pointer,
                sum_total_term_freq,
                sum_doc_freq: sum_doc_freq as u64,
                doc_count: doc_count as u32,
                longs_size,
            };
            let previous = fields.insert(info.name.clone(), FieldReader { info: info.clone(), meta });
            if previous.is_some() {
                return Err(Error::corruption(format!("duplicate fields: {}", info.name), input.name()));
            }
        }
        Ok(fields)
    }

    /// Names of the fields with terms, in sorted order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|name| name.as_str())
    }

    pub fn terms(&self, field: &str) -> Option<FieldTerms<'_, P>> {
        self.fields.get(field).map(|field| FieldTerms { reader: self, field })
    }

    /// Number of fields with terms
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn term_index(&self) -> &dyn TermIndexReader {
        self.index.as_ref()
    }

    pub fn postings(&self) -> &P {
        &self.postings
    }

    pub fn ram_bytes_used(&self) -> usize {
        let fields: usize = self
            .fields
            .values()
            .map(|f| std::mem::size_of::<FieldReader>() + f.info.name.len())
            .sum();
        fields + self.index.ram_bytes_used() + self.postings.ram_bytes_used()
    }

    /// Verifies the dictionary checksum (when the version has one), then
    /// the term index and the postings
    pub fn check_integrity(&self) -> Result<()> {
        if self.version >= VERSION_CHECKSUM {
            codec_util::checksum_entire_file(&self.input)?;
        }
        self.index.check_integrity()?;
        self.postings.check_integrity()
    }
}

/// Terms of one field
pub struct FieldTerms<'a, P: PostingsReaderBase> {
    reader: &'a BlockTermsReader<P>,
    field: &'a FieldReader,
}

impl<'a, P: PostingsReaderBase> FieldTerms<'a, P> {
    pub fn field_info(&self) -> &'a FieldInfo {
        &self.field.info
    }

    /// Number of terms
    pub fn size(&self) -> u64 {
        self.field.meta.num_terms
    }

    pub fn sum_total_term_freq(&self) -> i64 {
        self.field.meta.sum_total_term_freq
    }

    pub fn sum_doc_freq(&self) -> u64 {
        self.field.meta.sum_doc_freq
    }

    pub fn doc_count(&self) -> u32 {
        self.field.meta.doc_count
    }

    pub fn has_freqs(&self) -> bool {
        self.field.info.has_freqs()
    }

    pub fn has_positions(&self) -> bool {
        self.field.info.has_positions()
    }

    pub fn has_offsets(&self) -> bool {
        self.field.info.has_offsets()
    }

    pub fn has_payloads(&self) -> bool {
        self.field.info.has_payloads
    }

    /// Loads this field's term index if the reader was opened lazily
    pub fn load_index(&self, divisor: i32) -> Result<()> {
        self.reader.index.load_field_index(&self.field.info, divisor)
    }

    /// New unpositioned cursor over the field's terms
    pub fn iterator(&self) -> Result<SegmentTermsEnum<'a, P>> {
        SegmentTermsEnum::new(
            &self.reader.postings,
            self.reader.index.as_ref(),
            self.field,
            self.reader.input.clone(),
        )
    }
}
