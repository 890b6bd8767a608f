use config::Strand;
use serde::{Deserialize, Serialize};

use std::fmt;

use crate::record::RefFlat;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum AnnotationSource {
    RefFlat,
    Gtf,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Coding {
    Coding,
    NonCoding,
    Unknown,
}

impl Coding {
    /// refFlat: NM/NR prefixes, GTF: an empty CDS means non-coding
    pub fn infer(record: &RefFlat, source: AnnotationSource) -> Self {
        match source {
            AnnotationSource::RefFlat => {
                if record.name.starts_with("NM") {
                    Coding::Coding
                } else if record.name.starts_with("NR") {
                    Coding::NonCoding
                } else {
                    Coding::Unknown
                }
            }
            AnnotationSource::Gtf => {
                if record.cds_start == record.cds_end {
                    Coding::NonCoding
                } else {
                    Coding::Coding
                }
            }
        }
    }
}

impl fmt::Display for Coding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Coding::Coding => write!(f, "coding"),
            Coding::NonCoding => write!(f, "non-coding"),
            Coding::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Frame {
    InFrame,
    OutFrame,
}

impl Frame {
    pub fn from_length(length: u64) -> Self {
        if length % 3 == 0 {
            Frame::InFrame
        } else {
            Frame::OutFrame
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Frame::InFrame => write!(f, "in-frame"),
            Frame::OutFrame => write!(f, "out-frame"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum CdsInfo {
    UtrExon,
    CdsExon,
    CdsEdgeExonStart,
    CdsEdgeExonEnd,
    CdsEdgeExonStartEnd,
}

impl CdsInfo {
    pub fn locate(start: u64, end: u64, cds_start: u64, cds_end: u64, coding: Coding) -> Self {
        if coding == Coding::NonCoding || end <= cds_start || start >= cds_end {
            return CdsInfo::UtrExon;
        }

        let cds_start_inside = start < cds_start && cds_start < end;
        let cds_end_inside = start < cds_end && cds_end < end;

        match (cds_start_inside, cds_end_inside) {
            (true, true) => CdsInfo::CdsEdgeExonStartEnd,
            (true, false) => CdsInfo::CdsEdgeExonStart,
            (false, true) => CdsInfo::CdsEdgeExonEnd,
            (false, false) => CdsInfo::CdsExon,
        }
    }
}

impl fmt::Display for CdsInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CdsInfo::UtrExon => write!(f, "utr_exon"),
            CdsInfo::CdsExon => write!(f, "cds_exon"),
            CdsInfo::CdsEdgeExonStart => write!(f, "cds_edge_exon_start"),
            CdsInfo::CdsEdgeExonEnd => write!(f, "cds_edge_exon_end"),
            CdsInfo::CdsEdgeExonStartEnd => write!(f, "cds_edge_exon_start_end"),
        }
    }
}

/// Position of an exon in transcription order
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum ExonPosition {
    First,
    Internal,
    Last,
    Single,
}

impl ExonPosition {
    /// tags for `count` exons listed in genomic order
    pub fn tags(count: usize, strand: Strand) -> Vec<ExonPosition> {
        if count == 1 {
            return vec![ExonPosition::Single];
        }

        let mut tags = (0..count)
            .map(|idx| match idx {
                0 => ExonPosition::First,
                i if i == count - 1 => ExonPosition::Last,
                _ => ExonPosition::Internal,
            })
            .collect::<Vec<_>>();

        if strand == Strand::Reverse {
            tags.reverse();
        }

        tags
    }

    pub fn has_acceptor(&self) -> bool {
        matches!(self, ExonPosition::Internal | ExonPosition::Last)
    }

    pub fn has_donor(&self) -> bool {
        matches!(self, ExonPosition::Internal | ExonPosition::First)
    }
}

impl fmt::Display for ExonPosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExonPosition::First => write!(f, "first"),
            ExonPosition::Internal => write!(f, "internal"),
            ExonPosition::Last => write!(f, "last"),
            ExonPosition::Single => write!(f, "single"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Exon {
    pub start: u64,
    pub end: u64,
    pub frame: Frame,
    pub cds_info: CdsInfo,
    pub position: ExonPosition,
}

impl Exon {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn coord(&self) -> (u64, u64) {
        (self.start, self.end)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub gene: String,
    pub name: String,
    pub chrom: String,
    pub strand: Strand,
    pub tx_start: u64,
    pub tx_end: u64,
    pub cds_start: u64,
    pub cds_end: u64,
    pub coding: Coding,
    pub exons: Vec<Exon>,
}

impl Transcript {
    pub fn from_record(record: RefFlat, source: AnnotationSource) -> Self {
        let coding = Coding::infer(&record, source);
        let tags = ExonPosition::tags(record.exons.len(), record.strand);

        let exons = record
            .exons
            .iter()
            .zip(tags)
            .map(|(&(start, end), position)| Exon {
                start,
                end,
                frame: Frame::from_length(end.saturating_sub(start)),
                cds_info: CdsInfo::locate(start, end, record.cds_start, record.cds_end, coding),
                position,
            })
            .collect();

        Transcript {
            gene: record.gene,
            name: record.name,
            chrom: record.chrom,
            strand: record.strand,
            tx_start: record.tx_start,
            tx_end: record.tx_end,
            cds_start: record.cds_start,
            cds_end: record.cds_end,
            coding,
            exons,
        }
    }

    pub fn intervals(&self) -> Vec<(u64, u64)> {
        self.exons.iter().map(Exon::coord).collect()
    }

    pub fn exon_count(&self) -> usize {
        self.exons.len()
    }
}

/// All selected transcripts sharing a gene symbol, ordered by name
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Gene {
    pub name: String,
    pub transcripts: Vec<Transcript>,
}

impl Gene {
    pub fn variant_count(&self) -> usize {
        self.transcripts.len()
    }

    pub fn is_multi_exon(&self) -> bool {
        self.transcripts.iter().any(|tx| tx.exon_count() > 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, strand: Strand, cds: (u64, u64), exons: Vec<(u64, u64)>) -> RefFlat {
        RefFlat {
            gene: "G".into(),
            name: name.into(),
            chrom: "chr1".into(),
            strand,
            tx_start: exons[0].0,
            tx_end: exons[exons.len() - 1].1,
            cds_start: cds.0,
            cds_end: cds.1,
            exons,
        }
    }

    #[test]
    fn test_position_tags_follow_strand() {
        use ExonPosition::*;

        assert_eq!(
            ExonPosition::tags(3, Strand::Forward),
            vec![First, Internal, Last]
        );
        assert_eq!(
            ExonPosition::tags(3, Strand::Reverse),
            vec![Last, Internal, First]
        );
        assert_eq!(ExonPosition::tags(1, Strand::Reverse), vec![Single]);
    }

    #[test]
    fn test_coding_from_prefix_and_cds() {
        let nm = record("NM_1", Strand::Forward, (10, 20), vec![(0, 30)]);
        let nr = record("NR_1", Strand::Forward, (10, 20), vec![(0, 30)]);
        let xm = record("XM_1", Strand::Forward, (30, 30), vec![(0, 30)]);

        assert_eq!(Coding::infer(&nm, AnnotationSource::RefFlat), Coding::Coding);
        assert_eq!(Coding::infer(&nr, AnnotationSource::RefFlat), Coding::NonCoding);
        assert_eq!(Coding::infer(&xm, AnnotationSource::RefFlat), Coding::Unknown);
        assert_eq!(Coding::infer(&xm, AnnotationSource::Gtf), Coding::NonCoding);
        assert_eq!(Coding::infer(&nr, AnnotationSource::Gtf), Coding::Coding);
    }

    #[test]
    fn test_cds_info_and_frame() {
        let tx = Transcript::from_record(
            record(
                "NM_1",
                Strand::Forward,
                (50, 260),
                vec![(0, 30), (40, 100), (150, 200), (250, 300)],
            ),
            AnnotationSource::RefFlat,
        );

        let info = tx.exons.iter().map(|e| e.cds_info).collect::<Vec<_>>();
        assert_eq!(
            info,
            vec![
                CdsInfo::UtrExon,
                CdsInfo::CdsEdgeExonStart,
                CdsInfo::CdsExon,
                CdsInfo::CdsEdgeExonEnd
            ]
        );
        assert_eq!(tx.exons[0].frame, Frame::InFrame);
        assert_eq!(tx.exons[2].frame, Frame::OutFrame);

        let both = CdsInfo::locate(0, 100, 20, 80, Coding::Unknown);
        assert_eq!(both, CdsInfo::CdsEdgeExonStartEnd);
        assert_eq!(
            CdsInfo::locate(0, 100, 20, 80, Coding::NonCoding),
            CdsInfo::UtrExon
        );
    }

    #[test]
    fn test_site_availability() {
        assert!(ExonPosition::Internal.has_acceptor());
        assert!(ExonPosition::Internal.has_donor());
        assert!(!ExonPosition::First.has_acceptor());
        assert!(!ExonPosition::Last.has_donor());
        assert!(!ExonPosition::Single.has_acceptor());
        assert!(!ExonPosition::Single.has_donor());
    }
}
