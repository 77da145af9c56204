use crate::core::config::SelectorPolicy;
use crate::core::types::TermStats;

/// Decides which terms of a field the variable-gap index keeps
#[derive(Debug, Clone)]
pub enum IndexTermSelector {
    EveryN(EveryNTermSelector),
    EveryNOrDocFreq(EveryNOrDocFreqTermSelector),
}

impl IndexTermSelector {
    pub fn from_policy(policy: SelectorPolicy) -> Self {
        match policy {
            SelectorPolicy::EveryN { interval } => {
                IndexTermSelector::EveryN(EveryNTermSelector::new(interval))
            }
            SelectorPolicy::EveryNOrDocFreq { interval, doc_freq_threshold } => {
                IndexTermSelector::EveryNOrDocFreq(EveryNOrDocFreqTermSelector::new(interval, doc_freq_threshold))
            }
        }
    }

    pub fn is_index_term(&mut self, term: &[u8], stats: &TermStats) -> bool {
        match self {
            IndexTermSelector::EveryN(s) => s.is_index_term(term, stats),
            IndexTermSelector::EveryNOrDocFreq(s) => s.is_index_term(term, stats),
        }
    }

    /// Resets the per-field counters
    pub fn new_field(&mut self) {
        match self {
            IndexTermSelector::EveryN(s) => s.new_field(),
            IndexTermSelector::EveryNOrDocFreq(s) => s.new_field(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EveryNTermSelector {
    interval: usize,
    count: usize,
}

impl EveryNTermSelector {
    pub fn new(interval: usize) -> Self {
        // First term of a field is always selected
        EveryNTermSelector { interval, count: interval }
    }

    pub fn is_index_term(&mut self, _term: &[u8], _stats: &TermStats) -> bool {
        if self.count >= self.interval {
            self.count = 1;
            true
        } else {
            self.count += 1;
            false
        }
    }

    pub fn new_field(&mut self) {
        self.count = self.interval;
    }
}

/// Every Nth term, plus any term whose doc frequency reaches the threshold.
/// Selecting a frequent term restarts the count.
#[derive(Debug, Clone)]
pub struct EveryNOrDocFreqTermSelector {
    interval: usize,
    doc_freq_threshold: u32,
    count: usize,
}

impl EveryNOrDocFreqTermSelector {
    pub fn new(interval: usize, doc_freq_threshold: u32) -> Self {
        EveryNOrDocFreqTermSelector { interval, doc_freq_threshold, count: interval }
    }

    pub fn is_index_term(&mut self, _term: &[u8], stats: &TermStats) -> bool {
        if stats.doc_freq >= self.doc_freq_threshold || self.count >= self.interval {
            self.count = 1;
            true
        } else {
            self.count += 1;
            false
        }
    }

    pub fn new_field(&mut self) {
        self.count = self.interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picks(selector: &mut IndexTermSelector, dfs: &[u32]) -> Vec<usize> {
        dfs.iter()
            .enumerate()
            .filter(|(_, df)| selector.is_index_term(b"t", &TermStats::new(**df, -1)))
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_every_n() {
        let mut selector = IndexTermSelector::from_policy(SelectorPolicy::EveryN { interval: 3 });
        assert_eq!(picks(&mut selector, &[1; 8]), vec![0, 3, 6]);

        selector.new_field();
        assert_eq!(picks(&mut selector, &[1; 2]), vec![0]);
    }

    #[test]
    fn test_every_n_or_doc_freq() {
        let mut selector = IndexTermSelector::from_policy(SelectorPolicy::EveryNOrDocFreq {
            interval: 3,
            doc_freq_threshold: 10,
        });
        // term 2 is frequent and restarts the count
        assert_eq!(picks(&mut selector, &[1, 1, 50, 1, 1, 1, 1]), vec![0, 2, 5]);
    }
}
