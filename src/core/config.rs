use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, ErrorKind, Result};
use crate::terms;

/// Which sparse index sits next to the block dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermIndexKind {
    FixedGap,
    VariableGap,
}

/// Index term selection for the variable-gap index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectorPolicy {
    EveryN { interval: usize },
    EveryNOrDocFreq { interval: usize, doc_freq_threshold: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    pub term_index: TermIndexKind,
    pub term_index_interval: usize,         // fixed-gap: every Nth term is indexed
    pub selector: SelectorPolicy,           // variable-gap only
    pub index_divisor: i32,                 // 1 = load all, d > 1 = keep every d-th, -1 = load lazily
    pub format_version: i32,                // file format version written by the writers
}

pub const DEFAULT_TERM_INDEX_INTERVAL: usize = 32;

impl Default for DictionaryConfig {
    fn default() -> Self {
        DictionaryConfig {
            term_index: TermIndexKind::FixedGap,
            term_index_interval: DEFAULT_TERM_INDEX_INTERVAL,
            selector: SelectorPolicy::EveryN { interval: DEFAULT_TERM_INDEX_INTERVAL },
            index_divisor: 1,
            format_version: terms::VERSION_CURRENT,
        }
    }
}

impl DictionaryConfig {
    pub fn fixed_gap(interval: usize) -> Self {
        DictionaryConfig {
            term_index: TermIndexKind::FixedGap,
            term_index_interval: interval,
            ..Default::default()
        }
    }

    pub fn variable_gap(selector: SelectorPolicy) -> Self {
        DictionaryConfig {
            term_index: TermIndexKind::VariableGap,
            selector,
            ..Default::default()
        }
    }

    pub fn with_divisor(mut self, divisor: i32) -> Self {
        self.index_divisor = divisor;
        self
    }

    pub fn with_format_version(mut self, version: i32) -> Self {
        self.format_version = version;
        self
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let config: DictionaryConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.term_index_interval < 1 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("term_index_interval must be >= 1, got {}", self.term_index_interval),
            ));
        }
        let selector_interval = match self.selector {
            SelectorPolicy::EveryN { interval } => interval,
            SelectorPolicy::EveryNOrDocFreq { interval, .. } => interval,
        };
        if selector_interval < 1 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("selector interval must be >= 1, got {}", selector_interval),
            ));
        }
        if self.index_divisor == 0 || self.index_divisor < -1 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("index_divisor must be -1 or >= 1, got {}", self.index_divisor),
            ));
        }
        if self.format_version < terms::VERSION_START || self.format_version > terms::VERSION_CURRENT {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("unknown format_version {}", self.format_version),
            ));
        }
        Ok(())
    }
}
