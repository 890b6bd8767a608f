use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use std::fmt;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpliceLabel {
    Constitutive,
    Skipped,
    Unique,
    A5ssLong,
    A5ssShort,
    A3ssLong,
    A3ssShort,
    Overlap,
    IntronRetention,
    Other,
}

impl SpliceLabel {
    pub const ALL: [SpliceLabel; 10] = [
        SpliceLabel::Constitutive,
        SpliceLabel::Skipped,
        SpliceLabel::Unique,
        SpliceLabel::A5ssLong,
        SpliceLabel::A5ssShort,
        SpliceLabel::A3ssLong,
        SpliceLabel::A3ssShort,
        SpliceLabel::Overlap,
        SpliceLabel::IntronRetention,
        SpliceLabel::Other,
    ];

    /// a3ss <-> a5ss, long/short is kept
    pub fn flip_strand(self) -> Self {
        match self {
            SpliceLabel::A5ssLong => SpliceLabel::A3ssLong,
            SpliceLabel::A5ssShort => SpliceLabel::A3ssShort,
            SpliceLabel::A3ssLong => SpliceLabel::A5ssLong,
            SpliceLabel::A3ssShort => SpliceLabel::A5ssShort,
            other => other,
        }
    }

    pub fn is_alternative(&self) -> bool {
        *self != SpliceLabel::Constitutive
    }

    pub fn is_cassette(&self) -> bool {
        matches!(self, SpliceLabel::Skipped | SpliceLabel::Unique)
    }
}

impl fmt::Display for SpliceLabel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            SpliceLabel::Constitutive => "constitutive",
            SpliceLabel::Skipped => "skipped",
            SpliceLabel::Unique => "unique",
            SpliceLabel::A5ssLong => "a5ss-long",
            SpliceLabel::A5ssShort => "a5ss-short",
            SpliceLabel::A3ssLong => "a3ss-long",
            SpliceLabel::A3ssShort => "a3ss-short",
            SpliceLabel::Overlap => "overlap",
            SpliceLabel::IntronRetention => "intron_retention",
            SpliceLabel::Other => "other",
        };

        write!(f, "{}", label)
    }
}

/// Lookups over the exons of one sibling transcript
#[derive(Debug, Clone)]
pub struct SiblingIndex {
    exons: Vec<(u64, u64)>,
    exact: HashSet<(u64, u64)>,
    by_start: HashMap<u64, Vec<u64>>,
    by_end: HashMap<u64, Vec<u64>>,
}

impl SiblingIndex {
    pub fn new(exons: &[(u64, u64)]) -> Self {
        let mut sorted = exons.to_vec();
        sorted.sort_unstable();

        let mut by_start: HashMap<u64, Vec<u64>> = HashMap::new();
        let mut by_end: HashMap<u64, Vec<u64>> = HashMap::new();
        for &(s, e) in sorted.iter() {
            by_start.entry(s).or_default().push(e);
            by_end.entry(e).or_default().push(s);
        }

        Self {
            exact: sorted.iter().copied().collect(),
            exons: sorted,
            by_start,
            by_end,
        }
    }

    pub fn contains(&self, exon: (u64, u64)) -> bool {
        self.exact.contains(&exon)
    }

    /// ends of sibling exons sharing only the start
    pub fn start_partners(&self, (start, end): (u64, u64)) -> impl Iterator<Item = u64> + '_ {
        self.by_start
            .get(&start)
            .into_iter()
            .flatten()
            .copied()
            .filter(move |&e| e != end)
    }

    /// starts of sibling exons sharing only the end
    pub fn end_partners(&self, (start, end): (u64, u64)) -> impl Iterator<Item = u64> + '_ {
        self.by_end
            .get(&end)
            .into_iter()
            .flatten()
            .copied()
            .filter(move |&s| s != start)
    }

    /// overlapping sibling exon sharing neither boundary
    pub fn overlaps_without_boundary(&self, (start, end): (u64, u64)) -> bool {
        let upper = self.exons.partition_point(|&(s, _)| s < end);
        self.exons[..upper]
            .iter()
            .any(|&(s, e)| e > start && s != start && e != end)
    }
}

/// Sibling boundary closest to `reference`, smaller coordinate on ties
pub fn nearest(reference: u64, candidates: &[u64]) -> Option<u64> {
    candidates
        .iter()
        .copied()
        .min_by_key(|&c| (c.abs_diff(reference), c))
}
