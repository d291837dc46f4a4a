//! K-mer featurization shared by training and inference
//!
//! # Windowing Rule
//!
//! A sequence of `L` residues yields `max(L - k + 1, 0)` overlapping k-mers,
//! one starting at every residue index `0..=L-k`, in sequence order with
//! duplicates retained. Sequences shorter than `k` (including the empty
//! string) yield nothing; that is not an error.
//!
//! The fitted vectorizer's vocabulary was built with exactly this rule, so
//! every code path that turns a sequence into features goes through
//! [`kmer_iter`]. Any drift (different `k`, case folding, skipping symbols)
//! would silently corrupt predictions.
//!
//! # Alphabet
//!
//! Residues are opaque: no alphabet validation, no case normalization. The
//! window advances one `char` at a time, so plain ASCII protein strings are
//! windowed byte-for-byte and stray multi-byte symbols never split.
//!
//! # Examples
//!
//! ```
//! use protox::features::kmer::{featurize, KmerSize};
//!
//! let kmers = featurize("MKTAYIAK", KmerSize::default());
//! assert_eq!(kmers, vec!["MKT", "KTA", "TAY", "AYI", "YIA", "IAK"]);
//!
//! // Too short: empty, no error
//! assert!(featurize("MK", KmerSize::default()).is_empty());
//! ```

use crate::error::{ProtoxError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Default k-mer length
pub const DEFAULT_KMER_SIZE: usize = 3;

/// Validated k-mer length (k ≥ 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct KmerSize(usize);

impl KmerSize {
    /// Create a k-mer size, rejecting zero
    ///
    /// # Examples
    ///
    /// ```
    /// use protox::features::kmer::KmerSize;
    ///
    /// assert_eq!(KmerSize::new(5).unwrap().get(), 5);
    /// assert!(KmerSize::new(0).is_err());
    /// ```
    pub fn new(k: usize) -> Result<Self> {
        if k == 0 {
            return Err(ProtoxError::InvalidParameter(
                "k-mer size must be at least 1".to_string(),
            ));
        }
        Ok(Self(k))
    }

    /// The window length
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for KmerSize {
    fn default() -> Self {
        Self(DEFAULT_KMER_SIZE)
    }
}

impl TryFrom<usize> for KmerSize {
    type Error = ProtoxError;

    fn try_from(k: usize) -> Result<Self> {
        Self::new(k)
    }
}

impl From<KmerSize> for usize {
    fn from(k: KmerSize) -> usize {
        k.0
    }
}

impl fmt::Display for KmerSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extract all overlapping k-mers from a sequence
///
/// Returns borrowed slices of `sequence`, in order, duplicates included.
///
/// # Examples
///
/// ```
/// use protox::features::kmer::{featurize, KmerSize};
///
/// assert_eq!(featurize("MKT", KmerSize::default()), vec!["MKT"]);
/// assert!(featurize("", KmerSize::default()).is_empty());
/// ```
pub fn featurize(sequence: &str, k: KmerSize) -> Vec<&str> {
    kmer_iter(sequence, k).collect()
}

/// Streaming k-mer iterator (zero-copy)
///
/// Yields the same k-mers as [`featurize`] without allocating.
///
/// # Examples
///
/// ```
/// use protox::features::kmer::{kmer_iter, KmerSize};
///
/// let k = KmerSize::new(2).unwrap();
/// let kmers: Vec<_> = kmer_iter("ACDE", k).collect();
/// assert_eq!(kmers, vec!["AC", "CD", "DE"]);
/// ```
pub fn kmer_iter(sequence: &str, k: KmerSize) -> KmerIter<'_> {
    // Byte offset one past the k-th residue, if the sequence has k residues
    let end = match sequence.char_indices().nth(k.get()) {
        Some((offset, _)) => Some(offset),
        None if sequence.chars().count() == k.get() => Some(sequence.len()),
        None => None,
    };

    KmerIter {
        sequence,
        start: 0,
        end: end.unwrap_or(0),
        finished: end.is_none(),
    }
}

/// Iterator over the k-mers of a sequence, see [`kmer_iter`]
#[derive(Debug, Clone)]
pub struct KmerIter<'a> {
    sequence: &'a str,
    start: usize,
    end: usize,
    finished: bool,
}

impl<'a> KmerIter<'a> {
    fn char_len_at(&self, offset: usize) -> usize {
        self.sequence[offset..]
            .chars()
            .next()
            .map_or(0, char::len_utf8)
    }
}

impl<'a> Iterator for KmerIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let kmer = &self.sequence[self.start..self.end];

        if self.end == self.sequence.len() {
            self.finished = true;
        } else {
            self.start += self.char_len_at(self.start);
            self.end += self.char_len_at(self.end);
        }

        Some(kmer)
    }
}

/// Count k-mer occurrences in one sequence (multiset view of [`featurize`])
///
/// # Examples
///
/// ```
/// use protox::features::kmer::{kmer_counts, KmerSize};
///
/// let counts = kmer_counts("AAAA", KmerSize::new(2).unwrap());
/// assert_eq!(counts["AA"], 3);
/// ```
pub fn kmer_counts(sequence: &str, k: KmerSize) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for kmer in kmer_iter(sequence, k) {
        *counts.entry(kmer).or_insert(0) += 1;
    }
    counts
}

/// Number of k-mers a sequence of `residues` residues yields
pub fn expected_kmer_count(residues: usize, k: KmerSize) -> usize {
    (residues + 1).saturating_sub(k.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(n: usize) -> KmerSize {
        KmerSize::new(n).unwrap()
    }

    #[test]
    fn test_featurize_exact_length() {
        assert_eq!(featurize("MKT", k(3)), vec!["MKT"]);
    }

    #[test]
    fn test_featurize_protein() {
        let kmers = featurize("MKTAYIAK", k(3));
        assert_eq!(kmers, vec!["MKT", "KTA", "TAY", "AYI", "YIA", "IAK"]);
        assert!(kmers.iter().all(|kmer| kmer.len() == 3));
    }

    #[test]
    fn test_featurize_short_and_empty() {
        assert!(featurize("", k(3)).is_empty());
        assert!(featurize("MK", k(3)).is_empty());
        assert!(featurize("", k(1)).is_empty());
    }

    #[test]
    fn test_featurize_keeps_duplicates() {
        let kmers = featurize("GGGGG", k(3));
        assert_eq!(kmers, vec!["GGG", "GGG", "GGG"]);
    }

    #[test]
    fn test_featurize_no_case_folding() {
        let kmers = featurize("mKt", k(2));
        assert_eq!(kmers, vec!["mK", "Kt"]);
    }

    #[test]
    fn test_featurize_opaque_symbols() {
        // Ambiguous residues, gaps and stop symbols are not filtered
        let kmers = featurize("MX-*", k(2));
        assert_eq!(kmers, vec!["MX", "X-", "-*"]);
    }

    #[test]
    fn test_featurize_multibyte_symbols() {
        let kmers = featurize("AβC", k(2));
        assert_eq!(kmers, vec!["Aβ", "βC"]);
    }

    #[test]
    fn test_k_one() {
        assert_eq!(featurize("ACD", k(1)), vec!["A", "C", "D"]);
    }

    #[test]
    fn test_kmer_size_rejects_zero() {
        assert!(matches!(
            KmerSize::new(0),
            Err(ProtoxError::InvalidParameter(_))
        ));
        assert_eq!(KmerSize::default().get(), DEFAULT_KMER_SIZE);
    }

    #[test]
    fn test_kmer_size_serde() {
        let json = serde_json::to_string(&k(4)).unwrap();
        assert_eq!(json, "4");
        let parsed: KmerSize = serde_json::from_str("4").unwrap();
        assert_eq!(parsed, k(4));
        assert!(serde_json::from_str::<KmerSize>("0").is_err());
    }

    #[test]
    fn test_kmer_counts() {
        let counts = kmer_counts("MKTMKT", k(3));
        assert_eq!(counts["MKT"], 2);
        assert_eq!(counts["KTM"], 1);
        assert_eq!(counts["TMK"], 1);
        assert_eq!(counts.values().sum::<usize>(), 4);
    }

    #[test]
    fn test_expected_kmer_count() {
        assert_eq!(expected_kmer_count(8, k(3)), 6);
        assert_eq!(expected_kmer_count(3, k(3)), 1);
        assert_eq!(expected_kmer_count(2, k(3)), 0);
        assert_eq!(expected_kmer_count(0, k(1)), 0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: k-mer count matches max(L - k + 1, 0)
            #[test]
            fn prop_kmer_count(seq in ".{0,120}", n in 1usize..10) {
                let residues = seq.chars().count();
                let kmers = featurize(&seq, k(n));
                prop_assert_eq!(kmers.len(), expected_kmer_count(residues, k(n)));
            }

            /// Property: every k-mer has exactly k residues
            #[test]
            fn prop_kmer_width(seq in "[ACDEFGHIKLMNPQRSTVWY]{0,120}", n in 1usize..10) {
                for kmer in featurize(&seq, k(n)) {
                    prop_assert_eq!(kmer.chars().count(), n);
                }
            }

            /// Property: k-mers are the char windows of the sequence
            #[test]
            fn prop_matches_char_windows(seq in ".{0,60}", n in 1usize..6) {
                let chars: Vec<char> = seq.chars().collect();
                let expected: Vec<String> = chars
                    .windows(n)
                    .map(|window| window.iter().collect())
                    .collect();
                let actual: Vec<String> = featurize(&seq, k(n))
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                prop_assert_eq!(actual, expected);
            }

            /// Property: featurization is deterministic
            #[test]
            fn prop_deterministic(seq in ".{0,120}", n in 1usize..8) {
                prop_assert_eq!(featurize(&seq, k(n)), featurize(&seq, k(n)));
            }

            /// Property: counts sum to the number of k-mers
            #[test]
            fn prop_counts_sum(seq in "[ACDEFGHIKLMNPQRSTVWY]{0,120}", n in 1usize..6) {
                let total: usize = kmer_counts(&seq, k(n)).values().sum();
                prop_assert_eq!(total, featurize(&seq, k(n)).len());
            }
        }
    }
}
