//! Target exons and their splice windows
//!
//! Exon occurrences are filtered by selection mode, collapsed to one
//! record per physical exon (chrom, start, end) and turned into fixed
//! width acceptor/donor windows on the side the exon actually has.

use clap::ValueEnum;
use hashbrown::HashMap;
use log::{info, warn};
use serde::Serialize;

use alt_classify::{ClassifiedGene, SpliceLabel};
use alt_pack::{CdsInfo, Coding, ExonPosition, Frame};
use config::{SpliceSite, Strand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
pub enum ExonSelection {
    /// every labelled exon
    #[default]
    All,
    /// every label except constitutive
    Alternative,
    /// skipped and unique exons
    Cassette,
}

impl ExonSelection {
    pub fn accepts(&self, label: SpliceLabel) -> bool {
        match self {
            ExonSelection::All => true,
            ExonSelection::Alternative => label.is_alternative(),
            ExonSelection::Cassette => label.is_cassette(),
        }
    }
}

/// acceptor side exists and is specific to this exon
pub fn acceptor_eligible(position: ExonPosition, label: SpliceLabel) -> bool {
    position.has_acceptor() && label != SpliceLabel::A5ssLong
}

/// donor side exists and is specific to this exon
pub fn donor_eligible(position: ExonPosition, label: SpliceLabel) -> bool {
    position.has_donor() && label != SpliceLabel::A3ssLong
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetExon {
    pub id: usize,
    pub gene: String,
    pub transcripts: Vec<String>,
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
    pub label: SpliceLabel,
    pub position: ExonPosition,
    pub coding: Coding,
    pub frame: Frame,
    pub cds_info: CdsInfo,
    pub acceptor: bool,
    pub donor: bool,
}

impl TargetExon {
    pub fn has_site(&self, site: SpliceSite) -> bool {
        match site {
            SpliceSite::Acceptor => self.acceptor,
            SpliceSite::Donor => self.donor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpliceWindow {
    pub exon_id: usize,
    pub site: SpliceSite,
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
}

/// one record per physical exon, first occurrence is canonical
pub fn extract_target_exons(genes: &[ClassifiedGene], selection: ExonSelection) -> Vec<TargetExon> {
    let mut exons: Vec<TargetExon> = Vec::new();
    let mut seen: HashMap<(String, u64, u64), usize> = HashMap::new();

    for gene in genes {
        for ct in gene.transcripts.iter() {
            let tx = &ct.transcript;
            for (exon, &label) in tx.exons.iter().zip(ct.labels.iter()) {
                if !selection.accepts(label) {
                    continue;
                }

                let acceptor = acceptor_eligible(exon.position, label);
                let donor = donor_eligible(exon.position, label);
                let key = (tx.chrom.clone(), exon.start, exon.end);

                match seen.get(&key) {
                    Some(&idx) => {
                        let canonical = &mut exons[idx];
                        canonical.acceptor |= acceptor;
                        canonical.donor |= donor;
                        if !canonical.transcripts.contains(&tx.name) {
                            canonical.transcripts.push(tx.name.clone());
                        }
                    }
                    None => {
                        seen.insert(key, exons.len());
                        exons.push(TargetExon {
                            id: 0,
                            gene: gene.name.clone(),
                            transcripts: vec![tx.name.clone()],
                            chrom: tx.chrom.clone(),
                            start: exon.start,
                            end: exon.end,
                            strand: tx.strand,
                            label,
                            position: exon.position,
                            coding: tx.coding,
                            frame: exon.frame,
                            cds_info: exon.cds_info,
                            acceptor,
                            donor,
                        });
                    }
                }
            }
        }
    }

    let mut exons = exons
        .into_iter()
        .filter(|e| e.acceptor || e.donor)
        .collect::<Vec<_>>();
    exons.iter_mut().enumerate().for_each(|(id, e)| e.id = id);

    info!(
        "Target exons: {} ({} acceptor sides, {} donor sides)",
        exons.len(),
        exons.iter().filter(|e| e.acceptor).count(),
        exons.iter().filter(|e| e.donor).count()
    );

    exons
}

/// genomic window centered on the splice boundary of one exon side
pub fn splice_window(exon: &TargetExon, site: SpliceSite, half_width: u64) -> Option<SpliceWindow> {
    let center = match (site, exon.strand) {
        (SpliceSite::Acceptor, Strand::Forward) | (SpliceSite::Donor, Strand::Reverse) => {
            exon.start
        }
        (SpliceSite::Donor, Strand::Forward) | (SpliceSite::Acceptor, Strand::Reverse) => exon.end,
    };

    if center < half_width {
        return None;
    }

    Some(SpliceWindow {
        exon_id: exon.id,
        site,
        chrom: exon.chrom.clone(),
        start: center - half_width,
        end: center + half_width,
        strand: exon.strand,
    })
}

/// every eligible window, acceptors then donors per exon
pub fn extract_windows(exons: &[TargetExon], half_width: u64) -> Vec<SpliceWindow> {
    let mut windows = Vec::new();

    for exon in exons {
        for site in SpliceSite::ALL {
            if !exon.has_site(site) {
                continue;
            }

            match splice_window(exon, site, half_width) {
                Some(window) => windows.push(window),
                None => warn!(
                    "{} window of {}:{}-{} runs past the chromosome start, skipping",
                    site, exon.chrom, exon.start, exon.end
                ),
            }
        }
    }

    windows
}
