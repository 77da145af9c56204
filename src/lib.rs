pub mod core;
pub mod storage;
pub mod schema;
pub mod index;
pub mod terms;
pub mod postings;
pub mod mmap;
pub mod compression;

pub use crate::core::config::{DictionaryConfig, SelectorPolicy, TermIndexKind};
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::{SeekStatus, TermStats};

/*
┌──────────────────────────────── TERM DICTIONARY LAYOUT ────────────────────────────────┐
│                                                                                        │
│  BlockTermsWriter<P> ──writes──> _seg.tib   header │ codec header │ blocks │ dir │ tail │
│     │                                                                                  │
│     ├──per field──> FieldTermsWriter ──flush at index term──> Block                    │
│     │                  (termCount, prefixLen, suffix blob, stats blob, meta blob)      │
│     │                                                                                  │
│     ├──uses──> TermIndexWriter                                                         │
│     │             ├── FixedGapTermsIndexWriter    ──> _seg.tii  (packed offsets)       │
│     │             └── VariableGapTermsIndexWriter ──> _seg.tiv  (fst::Map per field)   │
│     │                                                                                  │
│     └──uses──> PostingsWriterBase (DocListPostingsWriter ──> _seg.doc)                 │
│                                                                                        │
│  BlockTermsReader<P> ──terms(field)──> FieldTerms ──iterator()──> SegmentTermsEnum     │
│     │                                                      │                           │
│     ├──shares──> TermIndexReader ──field_enum()──> FieldIndexEnum (floor seek)         │
│     └──shares──> PostingsReaderBase ──docs()──> DocsEnum                               │
│                                                                                        │
└────────────────────────────────────────────────────────────────────────────────────────┘
*/
