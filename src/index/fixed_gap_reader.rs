use std::collections::HashMap;
use std::sync::Arc;
use bytes::Bytes;
use parking_lot::RwLock;
use crate::compression::packed::{PackedInts, PackedReaderIterator};
use crate::core::error::{Error, ErrorKind, Result};
use crate::index::fixed_gap_writer::{FIXED_GAP_CODEC, FIXED_GAP_EXTENSION};
use crate::index::{FieldIndexEnum, TermIndexReader};
use crate::schema::schema::FieldInfo;
use crate::storage::codec_util;
use crate::storage::data_input::{DataInput, IndexInput};
use crate::storage::segment::SegmentState;
use crate::terms;

/// Reader for the fixed-gap index.
///
/// With divisor 1 the stored arrays are used as they are; with d > 1 only
/// every d-th index term is kept; with a negative divisor nothing is
/// loaded until `load_field_index`.
pub struct FixedGapTermsIndexReader {
    input: IndexInput,
    version: i32,
    interval: usize,
    divisor: i32,
    fields: HashMap<u32, FieldIndexData>,
}

struct FieldIndexData {
    num_index_terms: usize,
    terms_start: u64,
    index_start: u64,
    packed_index_start: u64,
    packed_offsets_start: u64,
    core: RwLock<Option<Arc<CoreFieldIndex>>>,
}

/// Resident index of one field, immutable once built
struct CoreFieldIndex {
    term_bytes: Bytes,
    terms_dict_offsets: PackedInts,   // relative to terms_start
    term_offsets: PackedInts,         // num_index_terms + 1 entries into term_bytes
    num_index_terms: usize,
    terms_start: u64,
    total_index_interval: i64,
    divisor: i32,
}

impl FixedGapTermsIndexReader {
    pub fn open(state: &SegmentState, divisor: i32) -> Result<Self> {
        if divisor == 0 || divisor < -1 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("index divisor must be -1 or >= 1, got {}", divisor),
            ));
        }
        let mut input = state.layout.open_input(&state.file_name(FIXED_GAP_EXTENSION))?;
        let version = terms::open_checked(&mut input, FIXED_GAP_CODEC)?;
        let header_len = codec_util::header_length(FIXED_GAP_CODEC);
        let dir_offset = terms::read_dir_offset(&input, version, header_len)?;

        let interval_pos = if version < terms::VERSION_APPEND_ONLY { header_len + 8 } else { header_len };
        input.seek(interval_pos)?;
        let interval = input.read_int()?;
        if interval < 1 {
            return Err(Error::corruption(format!("invalid indexInterval: {}", interval), input.name()));
        }

        input.seek(dir_offset)?;
        let num_fields = input.read_vint()?;
        if num_fields > i32::MAX as u32 {
            return Err(Error::corruption(format!("invalid numFields: {}", num_fields as i32), input.name()));
        }
        let mut fields = HashMap::new();
        for _ in 0..num_fields {
            let number = input.read_vint()?;
            let num_index_terms = input.read_vint()?;
            if num_index_terms == 0 || num_index_terms > i32::MAX as u32 {
                return Err(Error::corruption(
                    format!("invalid numIndexTerms: {} field={}", num_index_terms as i32, number),
                    input.name(),
                ));
            }
            let terms_start = input.read_vlong()?;
            let index_start = input.read_vlong()?;
            let packed_index_start = input.read_vlong()?;
            let packed_offsets_start = input.read_vlong()?;
            if packed_index_start < index_start {
                return Err(Error::corruption(
                    format!(
                        "invalid packedIndexStart: {} indexStart: {} numIndexTerms: {}",
                        packed_index_start, index_start, num_index_terms
                    ),
                    input.name(),
                ));
            }
            if state.field_infos.by_number(number).is_none() {
                return Err(Error::corruption(format!("invalid field number: {}", number), input.name()));
            }
            let data = FieldIndexData {
                num_index_terms: num_index_terms as usize,
                terms_start,
                index_start,
                packed_index_start,
                packed_offsets_start,
                core: RwLock::new(None),
            };
            if fields.insert(number, data).is_some() {
                return Err(Error::corruption(format!("duplicate field: {}", number), input.name()));
            }
        }

        let reader = FixedGapTermsIndexReader {
            input,
            version,
            interval: interval as usize,
            divisor,
            fields,
        };
        if divisor > 0 {
            for data in reader.fields.values() {
                data.load(&reader.input, reader.interval, divisor)?;
            }
        }
        log::debug!(
            "opened fixed-gap index {} fields={} interval={} divisor={}",
            reader.input.name(), reader.fields.len(), reader.interval, divisor
        );
        Ok(reader)
    }

    pub fn interval(&self) -> usize {
        self.interval
    }
}

impl FieldIndexData {
    /// Returns the resident index, building it first if needed. Concurrent
    /// callers may both build; the first one published wins.
    fn load(&self, input: &IndexInput, interval: usize, divisor: i32) -> Result<Arc<CoreFieldIndex>> {
        if let Some(core) = self.core.read().as_ref() {
            return Ok(Arc::clone(core));
        }
        let built = Arc::new(CoreFieldIndex::build(self, input, interval, divisor)?);
        let mut core = self.core.write();
        Ok(Arc::clone(core.get_or_insert(built)))
    }

    fn resident(&self) -> Option<Arc<CoreFieldIndex>> {
        self.core.read().clone()
    }
}

impl CoreFieldIndex {
    fn build(data: &FieldIndexData, input: &IndexInput, interval: usize, divisor: i32) -> Result<Self> {
        let step = divisor as usize;
        let num_index_terms = 1 + (data.num_index_terms - 1) / step;
        let mut clone = input.clone();
        clone.seek(data.index_start)?;

        let (term_bytes, terms_dict_offsets, term_offsets) = if step == 1 {
            let term_bytes = clone.read_shared((data.packed_index_start - data.index_start) as usize)?;
            let terms_dict_offsets = PackedInts::read(&mut clone)?;
            let term_offsets = PackedInts::read(&mut clone)?;
            (term_bytes, terms_dict_offsets, term_offsets)
        } else {
            let blob = clone.read_shared((data.packed_index_start - data.index_start) as usize)?;

            let mut dict_in = input.clone();
            dict_in.seek(data.packed_index_start)?;
            let mut dict_iter = PackedReaderIterator::new(&mut dict_in)?;
            let mut offsets_in = input.clone();
            offsets_in.seek(data.packed_offsets_start)?;
            let mut offsets_iter = PackedReaderIterator::new(&mut offsets_in)?;

            let mut terms_dict_offsets = PackedInts::new(num_index_terms, dict_iter.bits_per_value());
            let mut term_offsets = PackedInts::new(num_index_terms + 1, offsets_iter.bits_per_value());
            let mut bytes = Vec::new();
            let mut upto = 0;
            while upto < num_index_terms {
                terms_dict_offsets.set(upto, dict_iter.next()?);
                term_offsets.set(upto, bytes.len() as u64);
                let start = offsets_iter.next()? as usize;
                let end = offsets_iter.next()? as usize;
                let term = blob.get(start..end).ok_or_else(|| {
                    Error::corruption(format!("index term offsets out of range: {}..{}", start, end), input.name())
                })?;
                bytes.extend_from_slice(term);
                upto += 1;
                if upto == num_index_terms {
                    break;
                }
                // skip the index terms in between
                dict_iter.next()?;
                for _ in 0..step - 2 {
                    offsets_iter.next()?;
                    dict_iter.next()?;
                }
            }
            term_offsets.set(upto, bytes.len() as u64);
            log::debug!(
                "resampled fixed-gap index of {}: {} -> {} terms (divisor={})",
                input.name(), data.num_index_terms, num_index_terms, divisor
            );
            (Bytes::from(bytes), terms_dict_offsets, term_offsets)
        };

        let core = CoreFieldIndex {
            term_bytes,
            terms_dict_offsets,
            term_offsets,
            num_index_terms,
            terms_start: data.terms_start,
            total_index_interval: (interval * step) as i64,
            divisor,
        };
        core.validate(input.name())?;
        Ok(core)
    }

    fn validate(&self, resource: &str) -> Result<()> {
        if self.terms_dict_offsets.len() != self.num_index_terms
            || self.term_offsets.len() != self.num_index_terms + 1
        {
            return Err(Error::corruption(
                format!(
                    "packed array sizes {}/{} do not match numIndexTerms {}",
                    self.terms_dict_offsets.len(), self.term_offsets.len(), self.num_index_terms
                ),
                resource,
            ));
        }
        let mut last = 0;
        for i in 0..=self.num_index_terms {
            let offset = self.term_offsets.get(i);
            if offset < last || offset as usize > self.term_bytes.len() {
                return Err(Error::corruption(format!("invalid index term offset: {} at {}", offset, i), resource));
            }
            last = offset;
        }
        Ok(())
    }

    #[inline]
    fn term_at(&self, idx: usize) -> &[u8] {
        let start = self.term_offsets.get(idx) as usize;
        let end = self.term_offsets.get(idx + 1) as usize;
        &self.term_bytes[start..end]
    }

    #[inline]
    fn dict_offset(&self, idx: usize) -> u64 {
        self.terms_start + self.terms_dict_offsets.get(idx)
    }

    fn ram_bytes_used(&self) -> usize {
        self.term_bytes.len() + self.terms_dict_offsets.ram_bytes_used() + self.term_offsets.ram_bytes_used()
    }
}

impl TermIndexReader for FixedGapTermsIndexReader {
    fn field_enum(&self, field: &FieldInfo) -> Option<Box<dyn FieldIndexEnum>> {
        let core = self.fields.get(&field.number)?.resident()?;
        Some(Box::new(FixedGapIndexEnum { core, term: Vec::new(), ord: 0 }))
    }

    fn supports_ord(&self) -> bool {
        true
    }

    fn divisor(&self) -> i32 {
        self.divisor
    }

    fn load_field_index(&self, field: &FieldInfo, divisor: i32) -> Result<()> {
        if divisor < 1 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("index divisor must be >= 1 to load, got {}", divisor),
            ));
        }
        let data = self.fields.get(&field.number).ok_or_else(|| {
            Error::new(ErrorKind::InvalidArgument, format!("no term index for field {}", field.name))
        })?;
        data.load(&self.input, self.interval, divisor)?;
        Ok(())
    }

    fn ram_bytes_used(&self) -> usize {
        self.fields
            .values()
            .filter_map(|data| data.resident())
            .map(|core| core.ram_bytes_used())
            .sum()
    }

    fn check_integrity(&self) -> Result<()> {
        if self.version >= terms::VERSION_CHECKSUM {
            codec_util::checksum_entire_file(&self.input)?;
        }
        Ok(())
    }
}

struct FixedGapIndexEnum {
    core: Arc<CoreFieldIndex>,
    term: Vec<u8>,
    ord: i64,
}

impl FixedGapIndexEnum {
    fn position(&mut self, idx: usize) -> u64 {
        self.term.clear();
        self.term.extend_from_slice(self.core.term_at(idx));
        self.ord = idx as i64 * self.core.total_index_interval;
        self.core.dict_offset(idx)
    }
}

impl FieldIndexEnum for FixedGapIndexEnum {
    fn term(&self) -> &[u8] {
        &self.term
    }

    fn seek(&mut self, target: &[u8]) -> Result<u64> {
        let mut lo = 0i64;
        let mut hi = self.core.num_index_terms as i64 - 1;
        while hi >= lo {
            let mid = (lo + hi) >> 1;
            match target.cmp(self.core.term_at(mid as usize)) {
                std::cmp::Ordering::Less => hi = mid - 1,
                std::cmp::Ordering::Greater => lo = mid + 1,
                std::cmp::Ordering::Equal => return Ok(self.position(mid as usize)),
            }
        }
        // target sorts before every index term: use the first block
        let idx = hi.max(0) as usize;
        Ok(self.position(idx))
    }

    fn next(&mut self) -> Result<Option<u64>> {
        let idx = 1 + (self.ord / self.core.total_index_interval) as usize;
        if idx >= self.core.num_index_terms {
            return Ok(None);
        }
        Ok(Some(self.position(idx)))
    }

    fn ord(&self) -> Result<i64> {
        Ok(self.ord)
    }

    fn seek_ord(&mut self, ord: i64) -> Result<u64> {
        let idx = if ord < 0 { usize::MAX } else { (ord / self.core.total_index_interval) as usize };
        if idx >= self.core.num_index_terms {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("ord {} out of range for {} index terms", ord, self.core.num_index_terms),
            ));
        }
        Ok(self.position(idx))
    }

    fn divisor(&self) -> i32 {
        self.core.divisor
    }
}
