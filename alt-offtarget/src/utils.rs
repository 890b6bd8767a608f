use aho_corasick::{AhoCorasick, MatchKind};
use anyhow::{Context, Result};
use clap::ValueEnum;
use hashbrown::{HashMap, HashSet};
use rayon::prelude::*;
use regex::bytes::Regex;
use serde::Serialize;

use config::reverse_complement;

// INFO: 4Mb per worker keeps every thread busy on human-sized chromosomes
pub const SCAN_CHUNK: usize = 1 << 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
pub enum Strategy {
    /// one automaton over every query, single pass per sequence
    #[default]
    Aho,
    /// one regex per query, for small query sets
    Naive,
}

/// Case-insensitive exact counting of a fixed set of literals
pub trait ExactCounter: Send + Sync {
    fn patterns(&self) -> &[String];

    /// add to `counts` every occurrence starting before `limit` in `haystack`
    fn count_into(&self, haystack: &[u8], limit: usize, counts: &mut [u64]);

    fn max_len(&self) -> usize {
        self.patterns().iter().map(|p| p.len()).max().unwrap_or(0)
    }
}

pub struct AhoCounter {
    patterns: Vec<String>,
    automaton: AhoCorasick,
}

impl AhoCounter {
    pub fn new(patterns: Vec<String>) -> Result<Self> {
        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::Standard)
            .build(&patterns)
            .context("ERROR: cannot build the off-target automaton")?;

        Ok(Self {
            patterns,
            automaton,
        })
    }
}

impl ExactCounter for AhoCounter {
    fn patterns(&self) -> &[String] {
        &self.patterns
    }

    fn count_into(&self, haystack: &[u8], limit: usize, counts: &mut [u64]) {
        for hit in self.automaton.find_overlapping_iter(haystack) {
            if hit.start() < limit {
                counts[hit.pattern().as_usize()] += 1;
            }
        }
    }
}

pub struct NaiveCounter {
    patterns: Vec<String>,
    regexes: Vec<Regex>,
}

impl NaiveCounter {
    pub fn new(patterns: Vec<String>) -> Result<Self> {
        let regexes = patterns
            .iter()
            .map(|p| {
                Regex::new(&format!("(?i){}", regex::escape(p)))
                    .with_context(|| format!("ERROR: cannot compile query {}", p))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns, regexes })
    }
}

impl ExactCounter for NaiveCounter {
    fn patterns(&self) -> &[String] {
        &self.patterns
    }

    fn count_into(&self, haystack: &[u8], limit: usize, counts: &mut [u64]) {
        for (idx, re) in self.regexes.iter().enumerate() {
            let mut pos = 0;
            while let Some(m) = re.find_at(haystack, pos) {
                if m.start() >= limit {
                    break;
                }
                counts[idx] += 1;
                pos = m.start() + 1;
            }
        }
    }
}

pub fn build_counter(patterns: Vec<String>, strategy: Strategy) -> Result<Box<dyn ExactCounter>> {
    Ok(match strategy {
        Strategy::Aho => Box::new(AhoCounter::new(patterns)?),
        Strategy::Naive => Box::new(NaiveCounter::new(patterns)?),
    })
}

/// strip the PAM delimiter, uppercase and dedupe, first appearance wins
pub fn normalize_queries<S: AsRef<str>>(queries: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();

    queries
        .iter()
        .map(|q| normalize_query(q.as_ref()))
        .filter(|q| !q.is_empty() && seen.insert(q.clone()))
        .collect()
}

pub fn normalize_query(query: &str) -> String {
    query.trim().replace('+', "").to_uppercase()
}

/// Queries expanded to both strands
///
/// Every query owns its forward literal and, unless it is its own reverse
/// complement, the reverse-complement literal. Literals shared between
/// queries are compiled once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrandedQueries {
    pub patterns: Vec<String>,
    strands: Vec<(usize, Option<usize>)>,
}

impl StrandedQueries {
    pub fn new(queries: &[String]) -> Self {
        let mut patterns = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut intern = |literal: String| {
            *index.entry(literal.clone()).or_insert_with(|| {
                patterns.push(literal);
                patterns.len() - 1
            })
        };

        let strands = queries
            .iter()
            .map(|q| {
                let rc = String::from_utf8_lossy(&reverse_complement(q.as_bytes())).into_owned();
                let palindrome = rc == *q;
                let fwd = intern(q.clone());
                let rev = (!palindrome).then(|| intern(rc));
                (fwd, rev)
            })
            .collect();

        Self { patterns, strands }
    }

    /// per-query totals from per-pattern counts, plus and minus strand summed
    pub fn fold(&self, pattern_counts: &[u64]) -> Vec<u64> {
        self.strands
            .iter()
            .map(|&(fwd, rev)| pattern_counts[fwd] + rev.map_or(0, |r| pattern_counts[r]))
            .collect()
    }
}

/// count every pattern over one sequence
///
/// The sequence is cut into chunks scanned in parallel. Chunks overlap by
/// the longest pattern minus one and a hit is only kept by the chunk it
/// starts in, so no occurrence is lost or counted twice.
pub fn scan_sequence(counter: &dyn ExactCounter, seq: &[u8], chunk: usize) -> Vec<u64> {
    let n = counter.patterns().len();
    let overlap = counter.max_len().saturating_sub(1);
    let chunk = chunk.max(1);

    if n == 0 || seq.is_empty() {
        return vec![0; n];
    }

    (0..seq.len())
        .step_by(chunk)
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|start| {
            let end = (start + chunk + overlap).min(seq.len());
            let mut counts = vec![0; n];
            counter.count_into(&seq[start..end], chunk, &mut counts);
            counts
        })
        .reduce(
            || vec![0; n],
            |mut acc, counts| {
                acc.iter_mut().zip(counts).for_each(|(a, c)| *a += c);
                acc
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both(patterns: &[&str]) -> Vec<Box<dyn ExactCounter>> {
        let patterns = patterns.iter().map(|p| p.to_string()).collect::<Vec<_>>();
        vec![
            build_counter(patterns.clone(), Strategy::Aho).unwrap(),
            build_counter(patterns, Strategy::Naive).unwrap(),
        ]
    }

    #[test]
    fn test_normalize_queries() {
        let queries = vec!["ccc+AGGT", "CCCAGGT", " gatt+aca ", "", "+"];
        assert_eq!(normalize_queries(&queries), vec!["CCCAGGT", "GATTACA"]);
    }

    #[test]
    fn test_overlapping_and_case_insensitive() {
        for counter in both(&["AAA", "ACG", "TTTT"]) {
            let counts = scan_sequence(counter.as_ref(), b"aaAAacgACGtt", SCAN_CHUNK);
            assert_eq!(counts, vec![3, 2, 0]);
        }
    }

    #[test]
    fn test_nested_patterns_are_counted_separately() {
        for counter in both(&["GATTACA", "ATTA", "A"]) {
            let counts = scan_sequence(counter.as_ref(), b"GATTACAGATTACA", SCAN_CHUNK);
            assert_eq!(counts, vec![2, 2, 6]);
        }
    }

    #[test]
    fn test_chunk_boundaries_do_not_lose_or_double_hits() {
        let seq = b"ACGTACGTACGTACGTACGTACGTACGTACGTACGTACGT";
        for counter in both(&["GTAC", "ACGTACGT", "TAC"]) {
            let whole = scan_sequence(counter.as_ref(), seq, SCAN_CHUNK);
            for chunk in [1, 2, 3, 5, 7, 11] {
                assert_eq!(scan_sequence(counter.as_ref(), seq, chunk), whole);
            }
            assert_eq!(whole, vec![9, 9, 9]);
        }
    }

    #[test]
    fn test_aho_matches_naive_oracle() {
        let seq = b"NNGATTACAgattacaNNCCCAGGTACGTNNcccaggtacgtaccagg";
        let patterns = ["GATTACA", "CCCAGG", "AGGTACGT", "CCAGG", "NN", "TTTTTT"];
        let counters = both(&patterns);

        let aho = scan_sequence(counters[0].as_ref(), seq, 8);
        let naive = scan_sequence(counters[1].as_ref(), seq, SCAN_CHUNK);
        assert_eq!(aho, naive);
        assert_eq!(aho[0], 2);
        assert_eq!(aho[5], 0);
    }

    #[test]
    fn test_stranded_queries_count_both_strands() {
        let queries = vec!["CCAAG".to_string(), "ACGT".to_string(), "CTTGG".to_string()];
        let stranded = StrandedQueries::new(&queries);

        // ACGT is its own reverse complement, CCAAG and CTTGG share literals
        assert_eq!(stranded.patterns, vec!["CCAAG", "CTTGG", "ACGT"]);

        let seq = b"CCAAGnnACGTnnccttggnn";
        for strategy in [Strategy::Aho, Strategy::Naive] {
            let counter = build_counter(stranded.patterns.clone(), strategy).unwrap();
            let counts = scan_sequence(counter.as_ref(), seq, 4);
            assert_eq!(counts, vec![1, 1, 1]);
            assert_eq!(stranded.fold(&counts), vec![2, 1, 2]);
        }
    }
}
