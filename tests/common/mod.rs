#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;
use termdict::core::config::DictionaryConfig;
use termdict::core::error::Result;
use termdict::core::types::TermStats;
use termdict::postings::{DocListPostingsReader, DocListPostingsWriter};
use termdict::schema::schema::{FieldInfo, FieldInfos, IndexOptions};
use termdict::storage::layout::StorageLayout;
use termdict::storage::segment::{SegmentInfo, SegmentState};
use termdict::terms::{BlockTermsReader, BlockTermsWriter};

pub const MAX_DOC: u32 = 1000;

/// One term and its postings as (doc, freq)
#[derive(Debug, Clone)]
pub struct TermData {
    pub text: Vec<u8>,
    pub docs: Vec<(u32, u32)>,
}

impl TermData {
    pub fn new(text: &str, docs: &[(u32, u32)]) -> Self {
        TermData { text: text.as_bytes().to_vec(), docs: docs.to_vec() }
    }

    pub fn doc_freq(&self) -> u32 {
        self.docs.len() as u32
    }

    pub fn total_term_freq(&self) -> i64 {
        self.docs.iter().map(|&(_, freq)| freq as i64).sum()
    }

    pub fn stats(&self, field: &FieldInfo) -> TermStats {
        let ttf = if field.has_freqs() { self.total_term_freq() } else { -1 };
        TermStats::new(self.doc_freq(), ttf)
    }
}

pub fn body_field() -> FieldInfo {
    FieldInfo::new("body", 0, IndexOptions::DocsAndFreqsAndPositions)
}

pub fn text_field() -> FieldInfo {
    FieldInfo::new("f", 1, IndexOptions::DocsAndFreqs)
}

pub fn id_field() -> FieldInfo {
    FieldInfo::new("id", 2, IndexOptions::Docs)
}

pub struct Fixture {
    pub dir: TempDir,
    pub state: SegmentState,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_max_doc(MAX_DOC)
    }

    pub fn with_max_doc(max_doc: u32) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().to_path_buf()).unwrap();
        let infos = FieldInfos::from_fields(vec![body_field(), text_field(), id_field()]).unwrap();
        let state = SegmentState::new(layout, SegmentInfo::new("_0", max_doc), Arc::new(infos));
        Fixture { dir, state }
    }

    pub fn write(&self, config: &DictionaryConfig, fields: &[(FieldInfo, Vec<TermData>)]) {
        self.try_write(config, fields).unwrap();
    }

    pub fn try_write(&self, config: &DictionaryConfig, fields: &[(FieldInfo, Vec<TermData>)]) -> Result<()> {
        let postings = DocListPostingsWriter::new(&self.state)?;
        let mut writer = BlockTermsWriter::new(&self.state, config, postings)?;
        for (field, terms) in fields {
            write_field(&mut writer, field, terms)?;
        }
        writer.close()
    }

    pub fn open(&self, config: &DictionaryConfig) -> BlockTermsReader<DocListPostingsReader> {
        self.try_open(config).unwrap()
    }

    pub fn try_open(&self, config: &DictionaryConfig) -> Result<BlockTermsReader<DocListPostingsReader>> {
        let postings = DocListPostingsReader::open(&self.state)?;
        BlockTermsReader::open(&self.state, config, postings)
    }

    pub fn file_path(&self, ext: &str) -> std::path::PathBuf {
        self.state.layout.file_path(&self.state.file_name(ext))
    }
}

/// Feeds `terms` with consistent postings and field sums
pub fn write_field(
    writer: &mut BlockTermsWriter<DocListPostingsWriter>,
    field: &FieldInfo,
    terms: &[TermData],
) -> Result<()> {
    let (sum_ttf, sum_df, docs) = field_sums(field, terms);
    write_field_with_sums(writer, field, terms, sum_ttf, sum_df, docs)
}

pub fn write_field_with_sums(
    writer: &mut BlockTermsWriter<DocListPostingsWriter>,
    field: &FieldInfo,
    terms: &[TermData],
    sum_total_term_freq: i64,
    sum_doc_freq: u64,
    doc_count: u32,
) -> Result<()> {
    let mut field_writer = writer.add_field(field)?;
    for term in terms {
        field_writer.start_term()?;
        for &(doc, freq) in &term.docs {
            let postings = field_writer.postings_mut();
            postings.start_doc(doc, freq)?;
            if field.has_positions() {
                for position in 0..freq {
                    postings.add_position(position * 2)?;
                }
            }
        }
        field_writer.finish_term(&term.text, term.stats(field))?;
    }
    field_writer.finish(sum_total_term_freq, sum_doc_freq, doc_count)
}

pub fn field_sums(field: &FieldInfo, terms: &[TermData]) -> (i64, u64, u32) {
    let sum_df: u64 = terms.iter().map(|t| t.doc_freq() as u64).sum();
    let sum_ttf = if field.has_freqs() { terms.iter().map(|t| t.total_term_freq()).sum() } else { -1 };
    let docs: BTreeSet<u32> = terms.iter().flat_map(|t| t.docs.iter().map(|&(doc, _)| doc)).collect();
    (sum_ttf, sum_df, docs.len() as u32)
}

/// Terms with docs derived from their position in the list
pub fn terms_from(words: &[&str]) -> Vec<TermData> {
    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let i = i as u32;
            let docs: Vec<(u32, u32)> = (0..=(i % 3)).map(|k| (i + k * 7, 1 + (i + k) % 4)).collect();
            TermData::new(word, &docs)
        })
        .collect()
}

/// Sorted unique random terms over a small alphabet, so neighbours share
/// long prefixes
pub fn random_terms(seed: u64, count: usize) -> Vec<TermData> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut texts = BTreeSet::new();
    while texts.len() < count {
        let len = rng.gen_range(1..12);
        let text: Vec<u8> = (0..len).map(|_| b"abcde\xc3\xa9"[rng.gen_range(0..7)]).collect();
        texts.insert(text);
    }
    texts
        .into_iter()
        .map(|text| {
            let df = rng.gen_range(1..4u32);
            let mut docs = BTreeSet::new();
            while docs.len() < df as usize {
                docs.insert(rng.gen_range(0..MAX_DOC));
            }
            let docs = docs.into_iter().map(|doc| (doc, rng.gen_range(1..5u32))).collect();
            TermData { text, docs }
        })
        .collect()
}

/// Index of the smallest term >= target
pub fn ceil_index(terms: &[TermData], target: &[u8]) -> Option<usize> {
    terms.iter().position(|t| t.text.as_slice() >= target)
}
