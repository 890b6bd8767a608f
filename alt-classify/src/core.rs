//! Core module for splicing-event classification
//! Alejandro Gonzales-Irribarren, 2025
//!
//! Every exon of every transcript is compared against all the
//! transcripts of its own gene. Exact matches, boundary-sharing sibling
//! exons and boundary-free overlaps are collected first and then resolved
//! into a single label with a fixed precedence: constitutive, skipped,
//! a5ss, a3ss, intron_retention, overlap, unique and finally other.
//!
//! Genes are independent of each other and are classified in parallel.
//! A gene that cannot be classified (malformed exons) is reported and
//! skipped without stopping the batch.

use anyhow::{bail, Result};
use hashbrown::HashMap;
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use alt_pack::{pack, Annotation, Gene, Transcript};
use config::{get_progress_bar, write_collection, Strand, CLASSIFIED_EXONS};

use crate::cli::Args;
use crate::utils::{nearest, SiblingIndex, SpliceLabel};

pub const CLASSIFIED_HEADER: &str = "geneName\tname\tchrom\tstrand\texonStart\texonEnd\texon_index\texontype\texon_position\tcoding\tframe\tcds_info";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedTranscript {
    pub transcript: Transcript,
    pub labels: Vec<SpliceLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedGene {
    pub name: String,
    pub transcripts: Vec<ClassifiedTranscript>,
}

impl ClassifiedGene {
    /// one line per exon occurrence
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for ct in self.transcripts.iter() {
            let tx = &ct.transcript;
            for (idx, (exon, label)) in tx.exons.iter().zip(ct.labels.iter()).enumerate() {
                lines.push(format!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    self.name,
                    tx.name,
                    tx.chrom,
                    tx.strand,
                    exon.start,
                    exon.end,
                    idx,
                    label,
                    exon.position,
                    tx.coding,
                    exon.frame,
                    exon.cds_info
                ));
            }
        }

        lines
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ClassifyStats {
    pub genes_classified: usize,
    pub genes_failed: Vec<String>,
    pub exons_per_label: BTreeMap<String, usize>,
}

#[derive(Debug, Default)]
struct ExonEvidence {
    exact: usize,
    start_partners: Vec<u64>,
    end_partners: Vec<u64>,
    overlap: bool,
}

impl ExonEvidence {
    fn collect(exon: (u64, u64), siblings: &[SiblingIndex]) -> Self {
        let mut evidence = ExonEvidence::default();

        for sibling in siblings {
            if sibling.contains(exon) {
                evidence.exact += 1;
                continue;
            }

            evidence.start_partners.extend(sibling.start_partners(exon));
            evidence.end_partners.extend(sibling.end_partners(exon));
            evidence.overlap |= sibling.overlaps_without_boundary(exon);
        }

        evidence
    }

    fn resolve(&self, (start, end): (u64, u64), total: usize) -> SpliceLabel {
        let start_match = !self.start_partners.is_empty();
        let end_match = !self.end_partners.is_empty();

        if self.exact == total {
            SpliceLabel::Constitutive
        } else if self.exact > 1 && !start_match && !end_match && !self.overlap {
            SpliceLabel::Skipped
        } else if start_match && !end_match {
            // shared start, alternative end
            match nearest(end, &self.start_partners) {
                Some(other) if end > other => SpliceLabel::A5ssLong,
                _ => SpliceLabel::A5ssShort,
            }
        } else if end_match && !start_match {
            match nearest(start, &self.end_partners) {
                Some(other) if start < other => SpliceLabel::A3ssLong,
                _ => SpliceLabel::A3ssShort,
            }
        } else if start_match && end_match {
            SpliceLabel::IntronRetention
        } else if self.overlap {
            SpliceLabel::Overlap
        } else if self.exact == 1 {
            SpliceLabel::Unique
        } else {
            SpliceLabel::Other
        }
    }
}

/// label every exon occurrence of a gene
pub fn classify_gene(gene: &Gene) -> Result<ClassifiedGene> {
    for tx in gene.transcripts.iter() {
        if let Some(exon) = tx.exons.iter().find(|e| e.start >= e.end) {
            bail!(
                "ERROR: {} has an empty or inverted exon {}-{}",
                tx.name,
                exon.start,
                exon.end
            );
        }
    }

    let siblings = gene
        .transcripts
        .iter()
        .map(|tx| SiblingIndex::new(&tx.intervals()))
        .collect::<Vec<_>>();
    let total = siblings.len();

    // INFO: the same physical exon is usually shared by many isoforms
    let mut memo: HashMap<(u64, u64), SpliceLabel> = HashMap::new();

    let transcripts = gene
        .transcripts
        .iter()
        .map(|tx| {
            let labels = tx
                .intervals()
                .into_iter()
                .map(|exon| {
                    let label = *memo.entry(exon).or_insert_with(|| {
                        ExonEvidence::collect(exon, &siblings).resolve(exon, total)
                    });

                    match tx.strand {
                        Strand::Forward => label,
                        Strand::Reverse => label.flip_strand(),
                    }
                })
                .collect();

            ClassifiedTranscript {
                transcript: tx.clone(),
                labels,
            }
        })
        .collect();

    Ok(ClassifiedGene {
        name: gene.name.clone(),
        transcripts,
    })
}

struct ParallelCounter {
    num_of_genes: AtomicU32,
    num_of_failed: AtomicU32,
}

impl Default for ParallelCounter {
    fn default() -> Self {
        Self {
            num_of_genes: AtomicU32::new(0),
            num_of_failed: AtomicU32::new(0),
        }
    }
}

impl ParallelCounter {
    fn inc_genes(&self) {
        self.num_of_genes.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_failed(&self) {
        self.num_of_failed.fetch_add(1, Ordering::Relaxed);
    }
}

/// classify genes in parallel, failed genes are logged and left out
pub fn classify_genes(genes: &[Gene]) -> (Vec<ClassifiedGene>, ClassifyStats) {
    let pb = get_progress_bar(genes.len() as u64, "Classifying exons");
    let counter = ParallelCounter::default();

    let results = genes
        .par_iter()
        .map(|gene| {
            pb.inc(1);
            counter.inc_genes();
            classify_gene(gene).map_err(|e| {
                counter.inc_failed();
                warn!("Skipping gene {}: {}", gene.name, e);
                gene.name.clone()
            })
        })
        .collect::<Vec<_>>();
    pb.finish_and_clear();

    let mut stats = ClassifyStats::default();
    let mut classified = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(gene) => classified.push(gene),
            Err(name) => stats.genes_failed.push(name),
        }
    }

    for gene in classified.iter() {
        for ct in gene.transcripts.iter() {
            for label in ct.labels.iter() {
                *stats.exons_per_label.entry(label.to_string()).or_default() += 1;
            }
        }
    }
    stats.genes_classified = classified.len();

    info!(
        "Genes classified: {} ({} failed)",
        counter.num_of_genes.load(Ordering::Relaxed) - counter.num_of_failed.load(Ordering::Relaxed),
        counter.num_of_failed.load(Ordering::Relaxed)
    );
    if let Some(other) = stats.exons_per_label.get("other") {
        warn!("{} exon occurrence(s) could not be classified (other)", other);
    }

    (classified, stats)
}

pub fn classify_exons(args: Args) -> Result<PathBuf> {
    let annotation = Annotation::from_args(args.refflat.as_ref(), args.gtf.as_ref())?;
    let genes = config::collect_genes(&args.genes, args.gene_file.as_ref())?;

    let pack = pack(&annotation, &genes)?;
    let (classified, _) = classify_genes(&pack.genes);

    std::fs::create_dir_all(&args.outdir)?;
    let output = args.outdir.join(CLASSIFIED_EXONS);
    let lines = classified
        .iter()
        .flat_map(ClassifiedGene::lines)
        .collect::<Vec<_>>();
    write_collection(&lines, Some(CLASSIFIED_HEADER), &output)?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alt_pack::{AnnotationSource, RefFlat};
    use crate::utils::SpliceLabel::*;

    fn gene(strand: Strand, transcripts: Vec<Vec<(u64, u64)>>) -> Gene {
        let transcripts = transcripts
            .into_iter()
            .enumerate()
            .map(|(idx, exons)| {
                Transcript::from_record(
                    RefFlat {
                        gene: "G".into(),
                        name: format!("NM_{}", idx),
                        chrom: "chr1".into(),
                        strand,
                        tx_start: exons[0].0,
                        tx_end: exons[exons.len() - 1].1,
                        cds_start: exons[0].0,
                        cds_end: exons[exons.len() - 1].1,
                        exons,
                    },
                    AnnotationSource::RefFlat,
                )
            })
            .collect();

        Gene {
            name: "G".into(),
            transcripts,
        }
    }

    fn labels(gene: &Gene) -> Vec<Vec<SpliceLabel>> {
        classify_gene(gene)
            .unwrap()
            .transcripts
            .into_iter()
            .map(|ct| ct.labels)
            .collect()
    }

    fn label_of(target: (u64, u64), siblings: Vec<(u64, u64)>) -> SpliceLabel {
        let g = gene(Strand::Forward, vec![vec![target], siblings]);
        labels(&g)[0][0]
    }

    #[test]
    fn test_skipped_unique_and_constitutive() {
        let g = gene(
            Strand::Forward,
            vec![
                vec![(0, 100), (150, 200), (250, 300)],
                vec![(0, 100), (250, 300)],
                vec![(0, 100), (110, 120), (150, 200), (250, 300)],
            ],
        );

        assert_eq!(
            labels(&g),
            vec![
                vec![Constitutive, Skipped, Constitutive],
                vec![Constitutive, Constitutive],
                vec![Constitutive, Unique, Skipped, Constitutive],
            ]
        );
    }

    #[test]
    fn test_two_transcript_scenario() {
        let g = gene(
            Strand::Forward,
            vec![
                vec![(0, 100), (150, 200), (250, 300)],
                vec![(0, 100), (250, 300)],
            ],
        );
        let classified = classify_gene(&g).unwrap();

        // only one transcript carries (150, 200)
        assert_eq!(
            classified.transcripts[0].labels,
            vec![Constitutive, Unique, Constitutive]
        );
        let positions = classified.transcripts[0]
            .transcript
            .exons
            .iter()
            .map(|e| e.position.to_string())
            .collect::<Vec<_>>();
        assert_eq!(positions, vec!["first", "internal", "last"]);
    }

    #[test]
    fn test_alternative_ends() {
        let g = gene(
            Strand::Forward,
            vec![vec![(100, 200), (250, 300)], vec![(100, 200), (250, 350)]],
        );
        assert_eq!(
            labels(&g),
            vec![
                vec![Constitutive, A5ssShort],
                vec![Constitutive, A5ssLong]
            ]
        );
    }

    #[test]
    fn test_boundary_vectors() {
        assert_eq!(label_of((155, 200), vec![(150, 200)]), A3ssShort);
        assert_eq!(label_of((140, 200), vec![(150, 200)]), A3ssLong);
        assert_eq!(label_of((150, 190), vec![(150, 200)]), A5ssShort);
        assert_eq!(label_of((150, 210), vec![(150, 200)]), A5ssLong);
        assert_eq!(label_of((151, 199), vec![(150, 200)]), Overlap);
        assert_eq!(label_of((110, 120), vec![(150, 200)]), Unique);
        assert_eq!(
            label_of((500, 700), vec![(500, 600), (600, 700)]),
            IntronRetention
        );
    }

    #[test]
    fn test_nearest_sibling_decides_length() {
        // siblings end at 190 and 230, the nearest one (190) is shorter
        let g = gene(
            Strand::Forward,
            vec![vec![(150, 200)], vec![(150, 190)], vec![(150, 230)]],
        );
        assert_eq!(labels(&g)[0][0], A5ssLong);
    }

    #[test]
    fn test_minus_strand_swaps_a3ss_a5ss() {
        let g = gene(
            Strand::Reverse,
            vec![vec![(100, 200), (250, 300)], vec![(100, 200), (250, 350)]],
        );
        assert_eq!(
            labels(&g),
            vec![
                vec![Constitutive, A3ssShort],
                vec![Constitutive, A3ssLong]
            ]
        );
    }

    #[test]
    fn test_single_transcript_is_constitutive() {
        let g = gene(Strand::Forward, vec![vec![(10, 20), (30, 40), (50, 60)]]);
        assert!(labels(&g)[0].iter().all(|l| *l == Constitutive));
    }

    #[test]
    fn test_one_label_per_exon() {
        let g = gene(
            Strand::Reverse,
            vec![
                vec![(0, 100), (150, 200), (250, 300)],
                vec![(0, 90), (151, 199), (260, 300)],
                vec![(0, 100), (500, 700)],
                vec![(0, 100), (500, 600), (600, 700)],
            ],
        );
        let classified = classify_gene(&g).unwrap();
        for ct in classified.transcripts {
            assert_eq!(ct.labels.len(), ct.transcript.exons.len());
        }
    }

    #[test]
    fn test_failed_gene_is_isolated() {
        let good = gene(Strand::Forward, vec![vec![(10, 20), (30, 40)]]);
        let mut bad = gene(Strand::Forward, vec![vec![(10, 20), (40, 30)]]);
        bad.name = "BAD".into();

        let (classified, stats) = classify_genes(&[good, bad]);

        assert_eq!(classified.len(), 1);
        assert_eq!(stats.genes_failed, vec!["BAD".to_string()]);
        assert_eq!(stats.exons_per_label.get("constitutive"), Some(&2));
    }

    #[test]
    fn test_classified_lines() {
        let g = gene(Strand::Forward, vec![vec![(10, 20), (30, 40)]]);
        let lines = classify_gene(&g).unwrap().lines();

        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "G\tNM_0\tchr1\t+\t10\t20\t0\tconstitutive\tfirst\tcoding\tout-frame\tcds_exon"
        );
    }

    #[test]
    fn test_classify_exons_writes_table() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let refflat = dir.path().join("annotation.txt");
        let mut file = std::fs::File::create(&refflat).unwrap();
        writeln!(file, "G\tNM_1\tchr1\t+\t10\t300\t10\t300\t3\t10,150,250,\t100,200,300,").unwrap();
        writeln!(file, "G\tNM_2\tchr1\t+\t10\t300\t10\t300\t2\t10,250,\t100,300,").unwrap();

        let args = Args::from(vec![
            "--refflat".to_string(),
            refflat.display().to_string(),
            "--genes".to_string(),
            "G".to_string(),
            "--outdir".to_string(),
            dir.path().join("out").display().to_string(),
        ]);
        let output = classify_exons(args).unwrap();

        let text = std::fs::read_to_string(output).unwrap();
        let rows = text.lines().collect::<Vec<_>>();
        assert_eq!(rows[0], CLASSIFIED_HEADER);
        assert_eq!(rows.len(), 6);
        assert!(rows[2].contains("\t150\t200\t1\tunique\tinternal\t"));
    }
}
