use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, ErrorKind, Result};

/// What the postings of a field record, from least to most
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexOptions {
    Docs,
    DocsAndFreqs,
    DocsAndFreqsAndPositions,
    DocsAndFreqsAndPositionsAndOffsets,
}

/// Field definition as the term dictionary sees it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub number: u32,
    pub index_options: IndexOptions,
    pub has_payloads: bool,
}

impl FieldInfo {
    pub fn new(name: &str, number: u32, index_options: IndexOptions) -> Self {
        FieldInfo {
            name: name.to_string(),
            number,
            index_options,
            has_payloads: false,
        }
    }

    pub fn with_payloads(mut self) -> Self {
        self.has_payloads = true;
        self
    }

    /// Doc-only fields store no term frequencies, so totalTermFreq is absent
    pub fn is_doc_only(&self) -> bool {
        self.index_options == IndexOptions::Docs
    }

    pub fn has_freqs(&self) -> bool {
        self.index_options >= IndexOptions::DocsAndFreqs
    }

    pub fn has_positions(&self) -> bool {
        self.index_options >= IndexOptions::DocsAndFreqsAndPositions
    }

    pub fn has_offsets(&self) -> bool {
        self.index_options >= IndexOptions::DocsAndFreqsAndPositionsAndOffsets
    }
}

/// Field table of a segment, addressable by number and by name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldInfos {
    fields: Vec<FieldInfo>,
    #[serde(skip)]
    by_number: HashMap<u32, usize>,
}

impl FieldInfos {
    pub fn new() -> Self {
        FieldInfos::default()
    }

    pub fn from_fields(fields: Vec<FieldInfo>) -> Result<Self> {
        let mut infos = FieldInfos::new();
        for field in fields {
            infos.add(field)?;
        }
        Ok(infos)
    }

    pub fn add(&mut self, field: FieldInfo) -> Result<()> {
        if self.by_number.contains_key(&field.number) {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("duplicate field number {}", field.number),
            ));
        }
        if self.by_name(&field.name).is_some() {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("duplicate field name {}", field.name),
            ));
        }
        self.by_number.insert(field.number, self.fields.len());
        self.fields.push(field);
        Ok(())
    }

    pub fn by_number(&self, number: u32) -> Option<&FieldInfo> {
        if self.by_number.len() != self.fields.len() {
            // deserialized without the lookup table
            return self.fields.iter().find(|f| f.number == number);
        }
        self.by_number.get(&number).map(|&i| &self.fields[i])
    }

    pub fn by_name(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_options_order() {
        let docs = FieldInfo::new("id", 0, IndexOptions::Docs);
        assert!(docs.is_doc_only());
        assert!(!docs.has_freqs());

        let body = FieldInfo::new("body", 1, IndexOptions::DocsAndFreqsAndPositions);
        assert!(!body.is_doc_only());
        assert!(body.has_positions());
        assert!(!body.has_offsets());
    }

    #[test]
    fn test_lookup_and_duplicates() {
        let mut infos = FieldInfos::from_fields(vec![
            FieldInfo::new("id", 0, IndexOptions::Docs),
            FieldInfo::new("body", 3, IndexOptions::DocsAndFreqs),
        ]).unwrap();

        assert_eq!(infos.by_number(3).unwrap().name, "body");
        assert_eq!(infos.by_name("id").unwrap().number, 0);
        assert!(infos.by_number(1).is_none());

        assert!(infos.add(FieldInfo::new("other", 3, IndexOptions::Docs)).is_err());
        assert!(infos.add(FieldInfo::new("id", 4, IndexOptions::Docs)).is_err());
        assert_eq!(infos.len(), 2);
    }

    #[test]
    fn test_serde_round_trip_keeps_lookup() {
        let infos = FieldInfos::from_fields(vec![
            FieldInfo::new("title", 7, IndexOptions::DocsAndFreqs).with_payloads(),
        ]).unwrap();
        let json = serde_json::to_string(&infos).unwrap();
        let back: FieldInfos = serde_json::from_str(&json).unwrap();
        let title = back.by_number(7).unwrap();
        assert!(title.has_payloads);
        assert_eq!(title.index_options, IndexOptions::DocsAndFreqs);
    }
}
