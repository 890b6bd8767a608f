//! GTF to refFlat conversion
//!
//! Only `transcript`, `exon` and `CDS` features are read. Coordinates are
//! moved from 1-based closed to 0-based half-open, chromosome names gain a
//! `chr` prefix when missing and rows keep the order in which each
//! transcript_id first appears.

use anyhow::{anyhow, Context, Result};
use config::{open_reader, write_collection, Strand, GTF_FIELDS};
use hashbrown::HashMap;
use log::{info, warn};

use std::io::BufRead;
use std::path::Path;

use crate::record::RefFlat;

#[derive(Debug, Default)]
struct TranscriptBuilder {
    gene: String,
    chrom: String,
    strand: Option<Strand>,
    bounds: Option<(u64, u64)>,
    cds: Option<(u64, u64)>,
    exons: Vec<(u64, u64)>,
}

impl TranscriptBuilder {
    fn build(mut self, name: String) -> Option<RefFlat> {
        if self.exons.is_empty() {
            return None;
        }

        self.exons.sort_unstable();

        let (tx_start, tx_end) = self.bounds.unwrap_or_else(|| {
            let start = self.exons.iter().map(|e| e.0).min().unwrap_or_default();
            let end = self.exons.iter().map(|e| e.1).max().unwrap_or_default();
            (start, end)
        });
        let (cds_start, cds_end) = self.cds.unwrap_or((tx_end, tx_end));

        Some(RefFlat {
            gene: self.gene,
            name,
            chrom: self.chrom,
            strand: self.strand?,
            tx_start,
            tx_end,
            cds_start,
            cds_end,
            exons: self.exons,
        })
    }
}

/// pull `key "value";` pairs out of the attribute column
pub fn parse_attributes(field: &str) -> HashMap<&str, &str> {
    field
        .split(';')
        .filter_map(|kv| {
            let mut parts = kv.trim().splitn(2, ' ');
            let key = parts.next()?.trim();
            let value = parts.next()?.trim().trim_matches('"');
            if key.is_empty() {
                None
            } else {
                Some((key, value))
            }
        })
        .collect()
}

pub fn gtf_to_refflat<P: AsRef<Path>>(gtf: P) -> Result<Vec<RefFlat>> {
    let reader = open_reader(gtf.as_ref())
        .with_context(|| format!("ERROR: cannot open GTF {:?}", gtf.as_ref()))?;

    let mut order: Vec<String> = Vec::new();
    let mut builders: HashMap<String, TranscriptBuilder> = HashMap::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("ERROR: cannot read GTF line {}", idx + 1))?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        let fields = line.split('\t').collect::<Vec<_>>();
        if fields.len() < GTF_FIELDS {
            return Err(anyhow!(
                "ERROR: GTF line {} has {} fields, expected {}",
                idx + 1,
                fields.len(),
                GTF_FIELDS
            ));
        }

        let feature = fields[2];
        if !matches!(feature, "transcript" | "exon" | "CDS") {
            continue;
        }

        let attributes = parse_attributes(fields[8]);
        let Some(tx_id) = attributes.get("transcript_id") else {
            continue;
        };

        let start = fields[3]
            .parse::<u64>()
            .with_context(|| format!("ERROR: bad start at GTF line {}", idx + 1))?;
        let end = fields[4]
            .parse::<u64>()
            .with_context(|| format!("ERROR: bad end at GTF line {}", idx + 1))?;
        let start = start.saturating_sub(1);

        let builder = builders.entry(tx_id.to_string()).or_insert_with(|| {
            order.push(tx_id.to_string());

            let chrom = if fields[0].starts_with("chr") {
                fields[0].to_string()
            } else {
                format!("chr{}", fields[0])
            };
            let gene = attributes
                .get("gene_name")
                .or_else(|| attributes.get("gene_id"))
                .map(|g| g.to_string())
                .unwrap_or_default();

            TranscriptBuilder {
                gene,
                chrom,
                strand: fields[6].parse::<Strand>().ok(),
                ..Default::default()
            }
        });

        match feature {
            "transcript" => builder.bounds = Some((start, end)),
            "exon" => builder.exons.push((start, end)),
            "CDS" => {
                builder.cds = Some(match builder.cds {
                    Some((s, e)) => (s.min(start), e.max(end)),
                    None => (start, end),
                })
            }
            _ => unreachable!(),
        }
    }

    let mut records = Vec::with_capacity(order.len());
    for name in order {
        let Some(builder) = builders.remove(&name) else {
            continue;
        };

        match builder.build(name.clone()) {
            Some(record) => records.push(record),
            None => warn!("Transcript {} has no exons or no valid strand, skipping", name),
        }
    }

    info!("Transcripts converted from GTF: {}", records.len());

    Ok(records)
}

pub fn write_refflat<P: AsRef<Path>>(records: &[RefFlat], output: P) -> Result<()> {
    let lines = records.iter().map(RefFlat::line).collect::<Vec<_>>();
    write_collection(&lines, None, output.as_ref())
        .with_context(|| format!("ERROR: cannot write {:?}", output.as_ref()))
}
