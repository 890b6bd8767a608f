//! Annotation loading for altex
//!
//! Reads refFlat (or GTF, converted on the fly) annotations, keeps the genes
//! of interest, drops problematic transcripts and groups the survivors by
//! gene as annotated `Transcript`s.

use anyhow::{anyhow, Context, Result};
use config::{get_progress_bar, open_reader};
use hashbrown::{HashMap, HashSet};
use log::{info, warn};
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;

use std::io::Read;
use std::path::{Path, PathBuf};

pub mod gtf;
pub mod record;
pub mod transcript;

pub use gtf::{gtf_to_refflat, write_refflat};
pub use record::RefFlat;
pub use transcript::*;

pub const CHROM_PATTERN: &str = r"^chr(\d+|X|Y)$";

#[derive(Debug, Clone)]
pub enum Annotation {
    RefFlat(PathBuf),
    Gtf(PathBuf),
}

impl Annotation {
    pub fn from_args(refflat: Option<&PathBuf>, gtf: Option<&PathBuf>) -> Result<Self> {
        match (refflat, gtf) {
            (Some(path), None) => Ok(Annotation::RefFlat(path.clone())),
            (None, Some(path)) => Ok(Annotation::Gtf(path.clone())),
            _ => Err(anyhow!(
                "ERROR: exactly one of --refflat or --gtf must be provided"
            )),
        }
    }

    pub fn source(&self) -> AnnotationSource {
        match self {
            Annotation::RefFlat(_) => AnnotationSource::RefFlat,
            Annotation::Gtf(_) => AnnotationSource::Gtf,
        }
    }
}

/// Bookkeeping of the loading step, reported in the run summary
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct PackStats {
    pub genes_requested: usize,
    pub genes_found: usize,
    pub genes_missing: Vec<String>,
    pub genes_eligible: usize,
    pub dropped_duplicated: usize,
    pub dropped_zero_start: usize,
    pub dropped_chrom: usize,
}

#[derive(Debug, Clone)]
pub struct Pack {
    pub genes: Vec<Gene>,
    pub stats: PackStats,
}

pub fn read_refflat<P: AsRef<Path>>(path: P) -> Result<Vec<RefFlat>> {
    let mut contents = String::new();
    open_reader(path.as_ref())
        .with_context(|| format!("ERROR: cannot open refFlat {:?}", path.as_ref()))?
        .read_to_string(&mut contents)
        .with_context(|| format!("ERROR: cannot read refFlat {:?}", path.as_ref()))?;

    parse_refflat(&contents)
}

/// parse refFlat text in parallel, keeping file order
pub fn parse_refflat(contents: &str) -> Result<Vec<RefFlat>> {
    let lines = contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.starts_with('#') && !line.trim().is_empty())
        .collect::<Vec<_>>();

    let pb = get_progress_bar(lines.len() as u64, "Parsing refFlat records");
    let records = lines
        .par_iter()
        .map(|(idx, line)| {
            pb.inc(1);
            RefFlat::read(line).map_err(|e| anyhow!("ERROR: refFlat line {}: {}", idx + 1, e))
        })
        .collect::<Result<Vec<_>>>()?;
    pb.finish_and_clear();

    info!("Records parsed: {}", records.len());

    Ok(records)
}

/// Keep every transcript of the genes named by symbol or by transcript name
pub fn select_genes(
    records: Vec<RefFlat>,
    interest: &[String],
    stats: &mut PackStats,
) -> Result<Vec<RefFlat>> {
    let mut missing = Vec::new();
    let selected = {
        let by_symbol = records.iter().map(|r| r.gene.as_str()).collect::<HashSet<_>>();
        let by_name = records
            .iter()
            .map(|r| (r.name.as_str(), r.gene.as_str()))
            .collect::<HashMap<_, _>>();

        let mut selected: HashSet<String> = HashSet::new();
        for query in interest {
            if let Some(gene) = by_symbol.get(query.as_str()) {
                selected.insert(gene.to_string());
            } else if let Some(gene) = by_name.get(query.as_str()) {
                selected.insert(gene.to_string());
            } else {
                missing.push(query.clone());
            }
        }
        selected
    };

    stats.genes_requested = interest.len();
    stats.genes_found = selected.len();

    if !missing.is_empty() {
        warn!(
            "{} gene(s) not found in the annotation: {}",
            missing.len(),
            missing.join(", ")
        );
    }

    if selected.is_empty() {
        return Err(anyhow!(
            "ERROR: none of the requested genes were found in the annotation"
        ));
    }

    stats.genes_missing = missing;

    Ok(records
        .into_iter()
        .filter(|r| selected.contains(&r.gene))
        .collect())
}

/// duplicated names (every copy), exon starts at 0, non-canonical chromosomes
pub fn filter_records(records: Vec<RefFlat>, stats: &mut PackStats) -> Result<Vec<RefFlat>> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    records
        .iter()
        .for_each(|r| *counts.entry(r.name.clone()).or_default() += 1);

    let before = records.len();
    let records = records
        .into_iter()
        .filter(|r| counts.get(&r.name).copied().unwrap_or_default() == 1)
        .collect::<Vec<_>>();
    stats.dropped_duplicated = before - records.len();

    let before = records.len();
    let records = records
        .into_iter()
        .filter(|r| !r.exons.iter().any(|(s, _)| *s == 0))
        .collect::<Vec<_>>();
    stats.dropped_zero_start = before - records.len();

    let chrom = Regex::new(CHROM_PATTERN)?;
    let before = records.len();
    let records = records
        .into_iter()
        .filter(|r| chrom.is_match(&r.chrom))
        .collect::<Vec<_>>();
    stats.dropped_chrom = before - records.len();

    info!(
        "Transcripts dropped: {} duplicated, {} with exonStart 0, {} on other chromosomes",
        stats.dropped_duplicated, stats.dropped_zero_start, stats.dropped_chrom
    );

    Ok(records)
}

/// annotated transcripts grouped by gene, genes and transcripts sorted by name
pub fn group_genes(records: Vec<RefFlat>, source: AnnotationSource) -> Vec<Gene> {
    let mut acc: HashMap<String, Vec<Transcript>> = HashMap::new();
    records.into_iter().for_each(|record| {
        acc.entry(record.gene.clone())
            .or_default()
            .push(Transcript::from_record(record, source));
    });

    let mut genes = acc
        .into_iter()
        .map(|(name, mut transcripts)| {
            transcripts.sort_unstable_by(|a, b| a.name.cmp(&b.name));
            Gene { name, transcripts }
        })
        .collect::<Vec<_>>();
    genes.sort_unstable_by(|a, b| a.name.cmp(&b.name));

    genes
}

/// fail when nothing is left to design on
pub fn check_eligibility(genes: &[Gene], stats: &mut PackStats) -> Result<()> {
    if genes.is_empty() {
        return Err(anyhow!(
            "ERROR: no transcripts left for the requested genes after filtering"
        ));
    }

    let multi = genes.iter().filter(|g| g.is_multi_exon()).count();
    if multi == 0 {
        return Err(anyhow!(
            "ERROR: all requested genes are single-exon, no splice sites to target"
        ));
    }

    genes
        .iter()
        .filter(|g| g.variant_count() == 1)
        .for_each(|g| {
            warn!(
                "{} has a single transcript, all of its exons are constitutive",
                g.name
            )
        });

    stats.genes_eligible = multi;
    info!("Genes eligible for design: {} of {}", multi, genes.len());

    Ok(())
}

/// load, select, filter and group an annotation
pub fn pack(annotation: &Annotation, interest: &[String]) -> Result<Pack> {
    let records = match annotation {
        Annotation::RefFlat(path) => read_refflat(path)?,
        Annotation::Gtf(path) => gtf_to_refflat(path)?,
    };

    let mut stats = PackStats::default();
    let records = select_genes(records, interest, &mut stats)?;
    let records = filter_records(records, &mut stats)?;

    let genes = group_genes(records, annotation.source());
    check_eligibility(&genes, &mut stats)?;

    Ok(Pack { genes, stats })
}
