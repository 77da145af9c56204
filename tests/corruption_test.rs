mod common;

use bytes::Bytes;
use common::*;
use termdict::core::config::DictionaryConfig;
use termdict::core::error::Result;
use termdict::postings::DocListPostingsWriter;
use termdict::schema::schema::FieldInfo;
use termdict::storage::data_input::{DataInput, IndexInput};
use termdict::terms::BlockTermsWriter;

fn write_with_sums(
    fixture: &Fixture,
    config: &DictionaryConfig,
    field: &FieldInfo,
    terms: &[TermData],
    sums: (i64, u64, u32),
) -> Result<()> {
    let postings = DocListPostingsWriter::new(&fixture.state)?;
    let mut writer = BlockTermsWriter::new(&fixture.state, config, postings)?;
    write_field_with_sums(&mut writer, field, terms, sums.0, sums.1, sums.2)?;
    writer.close()
}

fn assert_open_fails(fixture: &Fixture, config: &DictionaryConfig, message: &str) {
    let err = match fixture.try_open(config) {
        Ok(_) => panic!("expected open to fail with {:?}", message),
        Err(err) => err,
    };
    assert!(err.is_corruption(), "{}", err);
    assert!(err.context.contains(message), "{}", err);
}

#[test]
fn test_doc_count_above_max_doc() {
    let config = DictionaryConfig::fixed_gap(4);
    let fixture = Fixture::with_max_doc(5);
    let terms = terms_from(&["a", "b", "c", "d", "e"]);
    fixture.write(&config, &[(text_field(), terms)]);
    assert_open_fails(&fixture, &config, "invalid docCount: 9 maxDoc: 5");
}

#[test]
fn test_sum_doc_freq_below_doc_count() {
    let config = DictionaryConfig::fixed_gap(4);
    let fixture = Fixture::new();
    let terms = terms_from(&["a", "b", "c", "d", "e"]);
    let (sum_ttf, _, doc_count) = field_sums(&text_field(), &terms);
    write_with_sums(&fixture, &config, &text_field(), &terms, (sum_ttf, 1, doc_count)).unwrap();
    assert_open_fails(&fixture, &config, "invalid sumDocFreq: 1");
}

#[test]
fn test_sum_total_term_freq_below_sum_doc_freq() {
    let config = DictionaryConfig::fixed_gap(4);
    let fixture = Fixture::new();
    let terms = terms_from(&["a", "b", "c", "d", "e"]);
    let (_, sum_df, doc_count) = field_sums(&text_field(), &terms);
    write_with_sums(&fixture, &config, &text_field(), &terms, (2, sum_df, doc_count)).unwrap();
    assert_open_fails(&fixture, &config, "invalid sumTotalTermFreq: 2");
}

#[test]
fn test_doc_only_field_skips_total_term_freq_check() {
    let config = DictionaryConfig::fixed_gap(4);
    let fixture = Fixture::new();
    let terms = terms_from(&["a", "b", "c"]);
    let (_, sum_df, doc_count) = field_sums(&id_field(), &terms);
    write_with_sums(&fixture, &config, &id_field(), &terms, (-1, sum_df, doc_count)).unwrap();
    let reader = fixture.open(&config);
    assert_eq!(reader.terms("id").unwrap().sum_total_term_freq(), -1);
}

#[test]
fn test_duplicate_field_in_directory() {
    // version 2 has neither a checksum nor a header slot, so the directory
    // can be patched in place
    let config = DictionaryConfig::fixed_gap(4).with_format_version(2);
    let fixture = Fixture::new();
    fixture.write(
        &config,
        &[
            (body_field(), terms_from(&["apple", "banana"])),
            (text_field(), terms_from(&["cherry", "date", "elder"])),
        ],
    );

    let path = fixture.file_path("tib");
    let mut data = std::fs::read(&path).unwrap();
    let mut input = IndexInput::new("tib", Bytes::from(data.clone()));
    input.seek(data.len() as u64 - 8).unwrap();
    let dir_offset = input.read_long().unwrap() as u64;
    input.seek(dir_offset).unwrap();
    assert_eq!(input.read_vint().unwrap(), 2);

    // first record: number, numTerms, start, sumTTF, sumDF, docCount, longsSize
    assert_eq!(input.read_vint().unwrap(), 0);
    input.read_vlong().unwrap();
    input.read_vlong().unwrap();
    input.read_vlong().unwrap();
    input.read_vlong().unwrap();
    input.read_vint().unwrap();
    input.read_vint().unwrap();

    let second = input.file_pointer() as usize;
    assert_eq!(data[second], 1);
    data[second] = 0;
    std::fs::write(&path, data).unwrap();

    assert_open_fails(&fixture, &config, "duplicate fields: body");
}

#[test]
fn test_flipped_byte_fails_checksum_at_open() {
    let config = DictionaryConfig::fixed_gap(4);
    let fixture = Fixture::new();
    fixture.write(&config, &[(text_field(), random_terms(7, 80))]);

    let path = fixture.file_path("tib");
    let mut data = std::fs::read(&path).unwrap();
    let at = data.len() / 2;
    data[at] ^= 0x10;
    std::fs::write(&path, data).unwrap();

    assert_open_fails(&fixture, &config, "checksum failed");
}

#[test]
fn test_flipped_byte_in_term_index() {
    let config = DictionaryConfig::fixed_gap(4);
    let fixture = Fixture::new();
    fixture.write(&config, &[(text_field(), random_terms(9, 80))]);

    let path = fixture.file_path("tii");
    let mut data = std::fs::read(&path).unwrap();
    let at = data.len() / 2;
    data[at] ^= 0x01;
    std::fs::write(&path, data).unwrap();

    assert!(fixture.try_open(&config).err().unwrap().is_corruption());
}

#[test]
fn test_flipped_byte_in_legacy_variable_gap_index() {
    // version 2 has no footer, so only the FST's own checksum sees the flip
    let config =
        DictionaryConfig::variable_gap(termdict::SelectorPolicy::EveryN { interval: 4 }).with_format_version(2);
    let lazy = config.clone().with_divisor(-1);
    let fixture = Fixture::new();
    fixture.write(&config, &[(text_field(), random_terms(13, 80))]);

    let path = fixture.file_path("tiv");
    let mut data = std::fs::read(&path).unwrap();
    let mut input = IndexInput::new("tiv", Bytes::from(data.clone()));
    input.seek(data.len() as u64 - 8).unwrap();
    let dir_offset = input.read_long().unwrap() as u64;
    input.seek(dir_offset).unwrap();
    assert_eq!(input.read_vint().unwrap(), 1);
    input.read_vint().unwrap();
    let index_start = input.read_vlong().unwrap();
    input.seek(index_start).unwrap();
    let len = input.read_vlong().unwrap();
    let blob_start = input.file_pointer();
    assert!(blob_start + len <= dir_offset);

    let at = (blob_start + len / 2) as usize;
    data[at] ^= 0x20;
    std::fs::write(&path, data).unwrap();

    assert!(fixture.try_open(&config).err().unwrap().is_corruption());

    // a deferred index reports the damage when the field is loaded
    let reader = fixture.open(&lazy);
    let err = reader.terms("f").unwrap().load_index(1).unwrap_err();
    assert!(err.is_corruption(), "{}", err);
}

#[test]
fn test_truncated_dictionary() {
    let config = DictionaryConfig::variable_gap(termdict::SelectorPolicy::EveryN { interval: 4 });
    let fixture = Fixture::new();
    fixture.write(&config, &[(text_field(), random_terms(11, 40))]);

    let path = fixture.file_path("tib");
    let data = std::fs::read(&path).unwrap();
    std::fs::write(&path, &data[..data.len() - 3]).unwrap();

    assert!(fixture.try_open(&config).err().unwrap().is_corruption());
}

#[test]
fn test_bad_magic() {
    let config = DictionaryConfig::fixed_gap(4);
    let fixture = Fixture::new();
    fixture.write(&config, &[(text_field(), terms_from(&["a", "b"]))]);

    let path = fixture.file_path("tib");
    let mut data = std::fs::read(&path).unwrap();
    data[0] ^= 0xff;
    std::fs::write(&path, data).unwrap();

    assert_open_fails(&fixture, &config, "codec header mismatch");
}

#[test]
fn test_wrong_codec_name() {
    let config = DictionaryConfig::fixed_gap(4);
    let fixture = Fixture::new();
    fixture.write(&config, &[(text_field(), terms_from(&["a", "b"]))]);

    // the dictionary file handed to the term index reader
    std::fs::copy(fixture.file_path("tib"), fixture.file_path("tii")).unwrap();
    assert_open_fails(&fixture, &config, "codec mismatch");
}

#[test]
fn test_corrupt_postings_found_by_check_integrity() {
    let config = DictionaryConfig::fixed_gap(4);
    let fixture = Fixture::new();
    let terms = terms_from(&["a", "b", "c", "d", "e", "f"]);
    fixture.write(&config, &[(text_field(), terms)]);

    let reader = fixture.open(&config);
    reader.check_integrity().unwrap();
    drop(reader);

    let path = fixture.file_path("doc");
    let mut data = std::fs::read(&path).unwrap();
    // last payload byte, right before the footer
    let last = data.len() - 17;
    data[last] ^= 0x04;
    std::fs::write(&path, data).unwrap();

    // the doc file is only checksummed on demand
    let reader = fixture.open(&config);
    assert!(reader.check_integrity().unwrap_err().is_corruption());
}
