use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use termdict::core::types::TermStats;
use termdict::postings::{DocListPostingsReader, DocListPostingsWriter};
use termdict::schema::schema::{FieldInfo, FieldInfos, IndexOptions};
use termdict::storage::layout::StorageLayout;
use termdict::storage::segment::{SegmentInfo, SegmentState};
use termdict::terms::{BlockTermsReader, BlockTermsWriter};
use termdict::{DictionaryConfig, SelectorPolicy, SeekStatus};

const MAX_DOC: u32 = 100_000;

// Helper to build sorted unique terms that share prefixes
fn make_terms(count: usize) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut terms = BTreeSet::new();
    while terms.len() < count {
        let len = rng.gen_range(3..14);
        let term: Vec<u8> = (0..len).map(|_| b'a' + rng.gen_range(0..16u8)).collect();
        terms.insert(term);
    }
    terms.into_iter().collect()
}

fn segment_state(dir: &std::path::Path, name: &str) -> SegmentState {
    let layout = StorageLayout::new(PathBuf::from(dir)).unwrap();
    let field = FieldInfo::new("body", 0, IndexOptions::DocsAndFreqs);
    let infos = FieldInfos::from_fields(vec![field]).unwrap();
    SegmentState::new(layout, SegmentInfo::new(name, MAX_DOC), Arc::new(infos))
}

fn write_segment(state: &SegmentState, config: &DictionaryConfig, terms: &[Vec<u8>]) {
    let field = state.field_infos.by_name("body").unwrap().clone();
    let postings = DocListPostingsWriter::new(state).unwrap();
    let mut writer = BlockTermsWriter::new(state, config, postings).unwrap();
    let mut field_writer = writer.add_field(&field).unwrap();
    for (i, term) in terms.iter().enumerate() {
        field_writer.start_term().unwrap();
        let doc_freq = 1 + (i % 3) as u32;
        for k in 0..doc_freq {
            field_writer.postings_mut().start_doc(i as u32 % 1000 + k * 1000, 1).unwrap();
        }
        field_writer.finish_term(term, TermStats::new(doc_freq, doc_freq as i64)).unwrap();
    }
    let sum = terms.iter().enumerate().map(|(i, _)| 1 + (i % 3) as u64).sum::<u64>();
    // docs 0..3000 are all used
    field_writer.finish(sum as i64, sum, 3000).unwrap();
    writer.close().unwrap();
}

fn configs() -> Vec<(&'static str, DictionaryConfig)> {
    vec![
        ("fixed_gap_32", DictionaryConfig::fixed_gap(32)),
        ("variable_gap_32", DictionaryConfig::variable_gap(SelectorPolicy::EveryN { interval: 32 })),
    ]
}

fn bench_seek(c: &mut Criterion) {
    let temp_dir = tempfile::tempdir().unwrap();
    let terms = make_terms(50_000);
    let probes: Vec<Vec<u8>> = terms.iter().step_by(97).cloned().collect();

    let mut group = c.benchmark_group("seek");
    for (name, config) in configs() {
        let state = segment_state(temp_dir.path(), name);
        write_segment(&state, &config, &terms);
        let postings = DocListPostingsReader::open(&state).unwrap();
        let reader = BlockTermsReader::open(&state, &config, postings).unwrap();
        let field_terms = reader.terms("body").unwrap();

        group.bench_with_input(BenchmarkId::new("seek_ceil", name), &probes, |b, probes| {
            let mut te = field_terms.iterator().unwrap();
            b.iter(|| {
                for probe in probes {
                    let status = te.seek_ceil(probe).unwrap();
                    debug_assert_eq!(status, SeekStatus::Found);
                    black_box(te.doc_freq().unwrap());
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("seek_exact_miss", name), &probes, |b, probes| {
            let mut te = field_terms.iterator().unwrap();
            let misses: Vec<Vec<u8>> = probes.iter().map(|p| [p.as_slice(), &b"~"[..]].concat()).collect();
            b.iter(|| {
                for miss in &misses {
                    black_box(te.seek_exact(miss).unwrap());
                }
            });
        });
    }
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let temp_dir = tempfile::tempdir().unwrap();
    let terms = make_terms(50_000);

    let mut group = c.benchmark_group("scan");
    for (name, config) in configs() {
        let state = segment_state(temp_dir.path(), name);
        write_segment(&state, &config, &terms);
        let postings = DocListPostingsReader::open(&state).unwrap();
        let reader = BlockTermsReader::open(&state, &config, postings).unwrap();

        group.bench_function(BenchmarkId::new("next", name), |b| {
            b.iter(|| {
                let mut te = reader.terms("body").unwrap().iterator().unwrap();
                let mut count = 0usize;
                while te.next().unwrap().is_some() {
                    count += 1;
                }
                black_box(count);
            });
        });

        // Open cost with the index loaded vs deferred
        group.bench_function(BenchmarkId::new("open_eager", name), |b| {
            b.iter(|| {
                let postings = DocListPostingsReader::open(&state).unwrap();
                black_box(BlockTermsReader::open(&state, &config, postings).unwrap());
            });
        });
        let lazy = config.clone().with_divisor(-1);
        group.bench_function(BenchmarkId::new("open_lazy", name), |b| {
            b.iter(|| {
                let postings = DocListPostingsReader::open(&state).unwrap();
                black_box(BlockTermsReader::open(&state, &lazy, postings).unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_seek, bench_scan);
criterion_main!(benches);
