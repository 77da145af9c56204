use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::schema::schema::FieldInfos;
use crate::storage::layout::StorageLayout;

/// Identity of a segment as the dictionary sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentInfo {
    pub name: String,
    pub max_doc: u32,   // upper bound for any per-field doc count
}

impl SegmentInfo {
    pub fn new(name: &str, max_doc: u32) -> Self {
        SegmentInfo { name: name.to_string(), max_doc }
    }
}

/// Everything a segment file writer or reader needs to locate its files
#[derive(Debug, Clone)]
pub struct SegmentState {
    pub layout: StorageLayout,
    pub segment: SegmentInfo,
    pub field_infos: Arc<FieldInfos>,
    pub suffix: String,
}

impl SegmentState {
    pub fn new(layout: StorageLayout, segment: SegmentInfo, field_infos: Arc<FieldInfos>) -> Self {
        SegmentState {
            layout,
            segment,
            field_infos,
            suffix: String::new(),
        }
    }

    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffix = suffix.to_string();
        self
    }

    pub fn file_name(&self, ext: &str) -> String {
        StorageLayout::segment_file_name(&self.segment.name, &self.suffix, ext)
    }
}
