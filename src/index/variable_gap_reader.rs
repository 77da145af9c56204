use std::collections::HashMap;
use std::sync::Arc;
use bytes::Bytes;
use fst::raw::{CompiledAddr, Fst, Output};
use fst::{IntoStreamer, Map, MapBuilder, Streamer};
use parking_lot::RwLock;
use crate::core::error::{Error, ErrorKind, Result};
use crate::index::variable_gap_writer::{VARIABLE_GAP_CODEC, VARIABLE_GAP_EXTENSION};
use crate::index::{FieldIndexEnum, TermIndexReader};
use crate::schema::schema::FieldInfo;
use crate::storage::codec_util;
use crate::storage::data_input::{DataInput, IndexInput};
use crate::storage::segment::SegmentState;
use crate::terms;

/// Reader for the FST based index. Offers floor seeks only; the FST does
/// not know term ordinals.
pub struct VariableGapTermsIndexReader {
    input: IndexInput,
    version: i32,
    divisor: i32,
    fields: HashMap<u32, FieldIndexData>,
}

struct FieldIndexData {
    index_start: u64,
    index_end: u64,     // next field's blob or the directory
    fst: RwLock<Option<Arc<FieldFst>>>,
}

struct FieldFst {
    map: Map<Bytes>,
    divisor: i32,
}

impl VariableGapTermsIndexReader {
    pub fn open(state: &SegmentState, divisor: i32) -> Result<Self> {
        if divisor == 0 || divisor < -1 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("index divisor must be -1 or >= 1, got {}", divisor),
            ));
        }
        let mut input = state.layout.open_input(&state.file_name(VARIABLE_GAP_EXTENSION))?;
        let version = terms::open_checked(&mut input, VARIABLE_GAP_CODEC)?;
        let header_len = codec_util::header_length(VARIABLE_GAP_CODEC);
        let dir_offset = terms::read_dir_offset(&input, version, header_len)?;

        input.seek(dir_offset)?;
        let num_fields = input.read_vint()?;
        if num_fields > i32::MAX as u32 {
            return Err(Error::corruption(format!("invalid numFields: {}", num_fields as i32), input.name()));
        }
        let mut fields = HashMap::new();
        for _ in 0..num_fields {
            let number = input.read_vint()?;
            let index_start = input.read_vlong()?;
            if state.field_infos.by_number(number).is_none() {
                return Err(Error::corruption(format!("invalid field number: {}", number), input.name()));
            }
            if index_start < header_len || index_start >= dir_offset {
                return Err(Error::corruption(
                    format!("field {} index start {} outside the index body", number, index_start),
                    input.name(),
                ));
            }
            let data = FieldIndexData { index_start, index_end: dir_offset, fst: RwLock::new(None) };
            if fields.insert(number, data).is_some() {
                return Err(Error::corruption(format!("duplicate field: {}", number), input.name()));
            }
        }

        let mut starts: Vec<u64> = fields.values().map(|data| data.index_start).collect();
        starts.sort_unstable();
        for data in fields.values_mut() {
            let next = starts.partition_point(|&start| start <= data.index_start);
            if let Some(&end) = starts.get(next) {
                data.index_end = end;
            }
        }

        let reader = VariableGapTermsIndexReader { input, version, divisor, fields };
        if divisor > 0 {
            for data in reader.fields.values() {
                data.load(&reader.input, reader.version, divisor)?;
            }
        }
        log::debug!(
            "opened variable-gap index {} fields={} divisor={}",
            reader.input.name(), reader.fields.len(), divisor
        );
        Ok(reader)
    }
}

impl FieldIndexData {
    fn load(&self, input: &IndexInput, version: i32, divisor: i32) -> Result<Arc<FieldFst>> {
        if let Some(fst) = self.fst.read().as_ref() {
            return Ok(Arc::clone(fst));
        }
        let built = Arc::new(FieldFst::read(input, self.index_start, self.index_end, version, divisor)?);
        let mut fst = self.fst.write();
        Ok(Arc::clone(fst.get_or_insert(built)))
    }

    fn resident(&self) -> Option<Arc<FieldFst>> {
        self.fst.read().clone()
    }
}

impl FieldFst {
    fn read(input: &IndexInput, index_start: u64, index_end: u64, version: i32, divisor: i32) -> Result<Self> {
        let mut clone = input.clone();
        clone.seek(index_start)?;
        let len = clone.read_vlong()?;
        if clone.file_pointer().saturating_add(len) > index_end {
            return Err(Error::corruption(
                format!(
                    "term index FST at {} of {} bytes overruns its field (ends at {})",
                    index_start, len, index_end
                ),
                input.name(),
            ));
        }
        let data = clone.read_shared(len as usize)?;
        let map = Map::new(data).map_err(|e| {
            Error::corruption(format!("invalid term index FST at {}: {}", index_start, e), input.name())
        })?;
        // files without a footer were never checksummed; the FST carries its own
        if version < terms::VERSION_CHECKSUM {
            map.as_fst().verify().map_err(|e| {
                Error::corruption(
                    format!("term index FST at {} failed verification: {}", index_start, e),
                    input.name(),
                )
            })?;
        }
        if !map.contains_key(b"") {
            return Err(Error::corruption(
                format!("term index FST at {} lacks the root entry", index_start),
                input.name(),
            ));
        }
        let map = if divisor > 1 { Self::resample(&map, divisor as usize, input.name())? } else { map };
        Ok(FieldFst { map, divisor })
    }

    /// Keeps every `step`-th entry, starting with the root entry
    fn resample(map: &Map<Bytes>, step: usize, resource: &str) -> Result<Map<Bytes>> {
        let mut builder = MapBuilder::memory();
        let mut stream = map.stream();
        let mut count = step;
        while let Some((key, value)) = stream.next() {
            if count == step {
                builder.insert(key, value)?;
                count = 0;
            }
            count += 1;
        }
        let bytes = builder.into_inner()?;
        let resampled = Map::new(Bytes::from(bytes))?;
        log::debug!(
            "resampled variable-gap index of {}: {} -> {} terms (divisor={})",
            resource, map.len(), resampled.len(), step
        );
        Ok(resampled)
    }
}

/// Greatest key <= `target`, written to `key`, with its value
fn seek_floor(fst: &Fst<Bytes>, target: &[u8], key: &mut Vec<u8>) -> Option<u64> {
    // Best candidate so far. A deeper candidate shares more of the target
    // and always wins; at equal depth a smaller sibling beats the final key.
    enum Fallback {
        Prefix { depth: usize, out: Output },
        Sibling { depth: usize, inp: u8, out: Output, addr: CompiledAddr },
    }

    let mut node = fst.root();
    let mut out = Output::zero();
    let mut fallback = None;
    for (depth, &b) in target.iter().enumerate() {
        let smaller = node.transitions().filter(|t| t.inp < b).max_by_key(|t| t.inp);
        if let Some(t) = smaller {
            fallback = Some(Fallback::Sibling { depth, inp: t.inp, out: out.cat(t.out), addr: t.addr });
        } else if node.is_final() {
            fallback = Some(Fallback::Prefix { depth, out: out.cat(node.final_output()) });
        }
        match node.find_input(b) {
            Some(i) => {
                let t = node.transition(i);
                out = out.cat(t.out);
                node = fst.node(t.addr);
            }
            None => break,
        }
        if depth + 1 == target.len() && node.is_final() {
            key.clear();
            key.extend_from_slice(target);
            return Some(out.cat(node.final_output()).value());
        }
    }
    if target.is_empty() && node.is_final() {
        key.clear();
        return Some(node.final_output().value());
    }

    match fallback? {
        Fallback::Prefix { depth, out } => {
            key.clear();
            key.extend_from_slice(&target[..depth]);
            Some(out.value())
        }
        Fallback::Sibling { depth, inp, mut out, addr } => {
            key.clear();
            key.extend_from_slice(&target[..depth]);
            key.push(inp);
            // largest key below the sibling: keep taking the last transition
            let mut node = fst.node(addr);
            while let Some(t) = node.transitions().max_by_key(|t| t.inp) {
                key.push(t.inp);
                out = out.cat(t.out);
                node = fst.node(t.addr);
            }
            Some(out.cat(node.final_output()).value())
        }
    }
}

impl TermIndexReader for VariableGapTermsIndexReader {
    fn field_enum(&self, field: &FieldInfo) -> Option<Box<dyn FieldIndexEnum>> {
        let fst = self.fields.get(&field.number)?.resident()?;
        Some(Box::new(VariableGapIndexEnum { fst, term: Vec::new() }))
    }

    fn supports_ord(&self) -> bool {
        false
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
        data.load(&self.input, self.version, divisor)?;
        Ok(())
    }

    fn ram_bytes_used(&self) -> usize {
        self.fields
            .values()
            .filter_map(|data| data.resident())
            .map(|fst| fst.map.as_fst().size())
            .sum()
    }

    fn check_integrity(&self) -> Result<()> {
        if self.version >= terms::VERSION_CHECKSUM {
            codec_util::checksum_entire_file(&self.input)?;
        }
        Ok(())
    }
}

struct VariableGapIndexEnum {
    fst: Arc<FieldFst>,
    term: Vec<u8>,
}

impl FieldIndexEnum for VariableGapIndexEnum {
    fn term(&self) -> &[u8] {
        &self.term
    }

    fn seek(&mut self, target: &[u8]) -> Result<u64> {
        seek_floor(self.fst.map.as_fst(), target, &mut self.term).ok_or_else(|| {
            Error::new(ErrorKind::Corruption, "term index has no entry at or before the target".to_string())
        })
    }

    fn next(&mut self) -> Result<Option<u64>> {
        let found = {
            let mut stream = self.fst.map.range().gt(&self.term).into_stream();
            stream.next().map(|(key, value)| (key.to_vec(), value))
        };
        Ok(found.map(|(key, value)| {
            self.term = key;
            value
        }))
    }

    fn ord(&self) -> Result<i64> {
        Err(Error::unsupported("variable-gap term index does not track ordinals"))
    }

    fn seek_ord(&mut self, _ord: i64) -> Result<u64> {
        Err(Error::unsupported("variable-gap term index does not support seeking by ordinal"))
    }

    fn divisor(&self) -> i32 {
        self.fst.divisor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(keys: &[(&str, u64)]) -> Map<Bytes> {
        let mut builder = MapBuilder::memory();
        for (k, v) in keys {
            builder.insert(k, *v).unwrap();
        }
        Map::new(Bytes::from(builder.into_inner().unwrap())).unwrap()
    }

    fn floor(map: &Map<Bytes>, target: &str) -> (String, u64) {
        let mut key = Vec::new();
        let value = seek_floor(map.as_fst(), target.as_bytes(), &mut key).unwrap();
        (String::from_utf8(key).unwrap(), value)
    }

    #[test]
    fn test_floor_against_linear_scan() {
        let keys = [("", 0), ("ab", 10), ("abd", 20), ("b", 30), ("ba", 40), ("c", 50), ("cab", 60)];
        let map = build(&keys);
        for target in ["", "a", "ab", "abc", "abd", "abz", "az", "b", "b\u{0}", "bb", "c", "ca", "cac", "z"] {
            let expected = keys.iter().rev().find(|(k, _)| k.as_bytes() <= target.as_bytes()).unwrap();
            assert_eq!(floor(&map, target), (expected.0.to_string(), expected.1), "target={:?}", target);
        }
    }

    #[test]
    fn test_floor_without_root_entry() {
        let map = build(&[("m", 1)]);
        let mut key = Vec::new();
        assert_eq!(seek_floor(map.as_fst(), b"a", &mut key), None);
        assert_eq!(seek_floor(map.as_fst(), b"n", &mut key), Some(1));
        assert_eq!(key, b"m");
    }

    #[test]
    fn test_resample_keeps_first_and_every_nth() {
        let keys: Vec<(String, u64)> = (0..10u64).map(|i| (format!("k{}", i), i)).collect();
        let refs: Vec<(&str, u64)> = keys.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        let map = build(&refs);
        let resampled = FieldFst::resample(&map, 3, "test").unwrap();
        let mut stream = resampled.stream();
        let mut values = Vec::new();
        while let Some((_, v)) = stream.next() {
            values.push(v);
        }
        assert_eq!(values, vec![0, 3, 6, 9]);
    }
}
