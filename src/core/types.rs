/// Per-term statistics handed to the dictionary writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermStats {
    pub doc_freq: u32,
    pub total_term_freq: i64,  // -1 when the field does not index frequencies
}

impl TermStats {
    pub fn new(doc_freq: u32, total_term_freq: i64) -> Self {
        TermStats { doc_freq, total_term_freq }
    }
}

/// Result of a ceiling seek
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekStatus {
    Found,
    NotFound,   // positioned on the smallest term > target
    End,
}

/// Length of the common prefix of two byte strings
#[inline]
pub fn shared_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Length of the shortest prefix of `indexed` that still sorts after `prior`.
///
/// Terms compare byte-wise, so everything past the first differing byte
/// carries no information for a floor lookup.
pub fn indexed_term_prefix_len(prior: &[u8], indexed: &[u8]) -> usize {
    let limit = prior.len().min(indexed.len());
    for i in 0..limit {
        if prior[i] != indexed[i] {
            return i + 1;
        }
    }
    (prior.len() + 1).min(indexed.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_prefix_len() {
        assert_eq!(shared_prefix_len(b"abc", b"abd"), 2);
        assert_eq!(shared_prefix_len(b"", b"abd"), 0);
        assert_eq!(shared_prefix_len(b"ab", b"abd"), 2);
    }

    #[test]
    fn test_indexed_term_prefix_len() {
        assert_eq!(indexed_term_prefix_len(b"ab", b"abc"), 3);
        assert_eq!(indexed_term_prefix_len(b"apple", b"banana"), 1);
        assert_eq!(indexed_term_prefix_len(b"", b"abc"), 1);
        assert_eq!(indexed_term_prefix_len(b"abc", b"abd"), 3);
        assert_eq!(indexed_term_prefix_len(b"abcx", b"abd"), 3);
    }
}
