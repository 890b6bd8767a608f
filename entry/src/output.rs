//! Output assembly: the guide table, the UCSC custom track and the run
//! summary.

use anyhow::{Context, Result};
use hashbrown::HashSet;
use log::info;
use serde::Serialize;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use alt_classify::ClassifyStats;
use alt_design::core::DESIGN_HEADER;
use alt_design::{Design, DesignedGuide, TargetExon};
use alt_offtarget::OfftargetCounts;
use alt_pack::PackStats;
use config::{write_collection, MAX_BED_SCORE, SUMMARY_SUFFIX, TABLE_SUFFIX, TRACK_SUFFIX};

pub const COUNT_COLUMN: &str = "pam+20bp_exact_match_count";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub table: PathBuf,
    pub track: PathBuf,
    pub summary: PathBuf,
}

impl OutputPaths {
    pub fn new<P: AsRef<Path>>(outdir: P, prefix: &str) -> Self {
        let outdir = outdir.as_ref();
        Self {
            table: outdir.join(format!("{}_{}", prefix, TABLE_SUFFIX)),
            track: outdir.join(format!("{}_{}", prefix, TRACK_SUFFIX)),
            summary: outdir.join(format!("{}_{}", prefix, SUMMARY_SUFFIX)),
        }
    }
}

pub fn table_header() -> String {
    format!("{}\t{}", DESIGN_HEADER, COUNT_COLUMN)
}

fn count_of(guide: &DesignedGuide, counts: &OfftargetCounts) -> u64 {
    counts.get(&guide.query()).unwrap_or(0)
}

/// one row per (exon, site, editor, guide), in design order
pub fn table_rows(design: &Design, counts: &OfftargetCounts) -> Vec<String> {
    design
        .guides
        .iter()
        .filter_map(|guide| {
            design
                .exon(guide.exon_id)
                .map(|exon| format!("{}\t{}", guide.row(exon), count_of(guide, counts)))
        })
        .collect()
}

pub fn track_header(prefix: &str, assembly: &str) -> String {
    format!(
        "track name=\"{}\" description=\"sgRNAs designed by altex for {}\" visibility=2 itemRgb=\"On\"",
        prefix, assembly
    )
}

/// BED9 line of a guide, score is the clamped off-target count
pub fn bed_line(guide: &DesignedGuide, exon: &TargetExon, count: u64) -> String {
    format!(
        "{}\t{}\t{}\t{}_{}_{}_{}\t{}\t{}\t{}\t{}\t{}",
        guide.chrom,
        guide.genome_start,
        guide.genome_end,
        exon.gene,
        guide.site,
        guide.editor.name,
        exon.id,
        count.min(MAX_BED_SCORE),
        guide.strand,
        guide.genome_start,
        guide.genome_end,
        guide.editor.rgb()
    )
}

pub fn track_lines(design: &Design, counts: &OfftargetCounts) -> Vec<String> {
    design
        .guides
        .iter()
        .filter_map(|guide| {
            design
                .exon(guide.exon_id)
                .map(|exon| bed_line(guide, exon, count_of(guide, counts)))
        })
        .collect()
}

/// Numbers reported at the end of a run
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub genes_requested: usize,
    pub genes_found: usize,
    pub genes_missing: Vec<String>,
    pub genes_eligible: usize,
    pub genes_with_guides: usize,
    pub genes_failed: Vec<String>,
    pub transcripts_dropped: BTreeMap<String, usize>,
    pub exons_per_label: BTreeMap<String, usize>,
    pub target_exons: usize,
    pub windows_per_site: BTreeMap<String, usize>,
    pub windows_without_sequence: usize,
    pub windows_without_dinucleotide: usize,
    pub guides_per_editor: BTreeMap<String, usize>,
    pub guides_total: usize,
    pub unique_offtarget_queries: usize,
}

impl RunSummary {
    pub fn new(
        pack: &PackStats,
        classify: &ClassifyStats,
        design: &Design,
        counts: &OfftargetCounts,
    ) -> Self {
        let genes_with_guides = design
            .guides
            .iter()
            .filter_map(|g| design.exon(g.exon_id).map(|e| e.gene.as_str()))
            .collect::<HashSet<_>>()
            .len();

        let transcripts_dropped = BTreeMap::from([
            ("duplicated_name".to_string(), pack.dropped_duplicated),
            ("zero_start_exon".to_string(), pack.dropped_zero_start),
            ("non_canonical_chrom".to_string(), pack.dropped_chrom),
        ]);

        Self {
            genes_requested: pack.genes_requested,
            genes_found: pack.genes_found,
            genes_missing: pack.genes_missing.clone(),
            genes_eligible: pack.genes_eligible,
            genes_with_guides,
            genes_failed: classify.genes_failed.clone(),
            transcripts_dropped,
            exons_per_label: classify.exons_per_label.clone(),
            target_exons: design.stats.target_exons,
            windows_per_site: design.stats.windows_per_site.clone(),
            windows_without_sequence: design.stats.windows_without_sequence,
            windows_without_dinucleotide: design.stats.windows_without_dinucleotide,
            guides_per_editor: design.stats.guides_per_editor.clone(),
            guides_total: design.guides.len(),
            unique_offtarget_queries: counts.len(),
        }
    }

    pub fn log(&self) {
        info!(
            "Genes: {} requested, {} found, {} eligible, {} with guides",
            self.genes_requested, self.genes_found, self.genes_eligible, self.genes_with_guides
        );
        if !self.genes_failed.is_empty() {
            info!("Genes failed in classification: {:?}", self.genes_failed);
        }
        info!("Exons per label: {:?}", self.exons_per_label);
        info!(
            "Target exons: {}, windows per site: {:?}",
            self.target_exons, self.windows_per_site
        );
        info!("Guides per editor: {:?}", self.guides_per_editor);
        info!(
            "Guides designed: {} ({} unique off-target queries)",
            self.guides_total, self.unique_offtarget_queries
        );
    }
}

pub fn write_summary<P: AsRef<Path>>(summary: &RunSummary, path: P) -> Result<()> {
    let file = File::create(path.as_ref())
        .with_context(|| format!("ERROR: cannot create {:?}", path.as_ref()))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, summary)?;
    writeln!(writer)?;
    writer.flush()?;

    Ok(())
}

/// write table, track and summary under `paths`
pub fn write_outputs(
    paths: &OutputPaths,
    design: &Design,
    counts: &OfftargetCounts,
    summary: &RunSummary,
    prefix: &str,
    assembly: &str,
) -> Result<()> {
    write_collection(&table_rows(design, counts), Some(&table_header()), &paths.table)
        .with_context(|| format!("ERROR: cannot write {:?}", paths.table))?;
    write_collection(
        &track_lines(design, counts),
        Some(&track_header(prefix, assembly)),
        &paths.track,
    )
    .with_context(|| format!("ERROR: cannot write {:?}", paths.track))?;
    write_summary(summary, &paths.summary)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alt_classify::SpliceLabel;
    use alt_design::SgrnaInfo;
    use alt_pack::{CdsInfo, Coding, ExonPosition, Frame};
    use config::{get_preset, SpliceSite, Strand};

    fn exon() -> TargetExon {
        TargetExon {
            id: 7,
            gene: "SRSF1".into(),
            transcripts: vec!["NM_1".into(), "NM_2".into()],
            chrom: "chr17".into(),
            start: 1150,
            end: 1200,
            strand: Strand::Reverse,
            label: SpliceLabel::Skipped,
            position: ExonPosition::Internal,
            coding: Coding::Coding,
            frame: Frame::InFrame,
            cds_info: CdsInfo::CdsExon,
            acceptor: true,
            donor: true,
        }
    }

    fn guide(preset: &str) -> DesignedGuide {
        DesignedGuide {
            exon_id: 7,
            site: SpliceSite::Donor,
            editor: get_preset(preset).unwrap(),
            chrom: "chr17".into(),
            strand: Strand::Reverse,
            genome_start: 1130,
            genome_end: 1150,
            sgrna: SgrnaInfo {
                target_sequence: "CCN+ACGTACGTACGTACGTACGT".into(),
                spacer_sequence: "ACGTACGTACGTACGTACGT".into(),
                actual_sequence: "ACGUACGUACGUACGUACGU".into(),
                start_in_sequence: 10,
                end_in_sequence: 30,
                target_pos_in_sgrna: 16,
                overlap_between_cds_and_editing_window: 2,
                possible_unintended_edited_base_count: 1,
            },
        }
    }

    #[test]
    fn test_track_header() {
        assert_eq!(
            track_header("run", "hg38"),
            "track name=\"run\" description=\"sgRNAs designed by altex for hg38\" visibility=2 itemRgb=\"On\""
        );
    }

    #[test]
    fn test_bed_line_clamps_score_and_colors_by_chemistry() {
        let exon = exon();

        assert_eq!(
            bed_line(&guide("target-aid-ngg"), &exon, 250),
            "chr17\t1130\t1150\tSRSF1_donor_Target-AID_NGG_7\t100\t-\t1130\t1150\t0,0,255"
        );
        assert_eq!(
            bed_line(&guide("abe8e-ng"), &exon, 3),
            "chr17\t1130\t1150\tSRSF1_donor_ABE8e_NG_7\t3\t-\t1130\t1150\t255,0,0"
        );
    }

    #[test]
    fn test_table_header_has_every_column() {
        let header = table_header();
        assert_eq!(header.split('\t').count(), 28);
        assert!(header.starts_with("geneName\ttranscripts\tchrom"));
        assert!(header.ends_with("\tpam+20bp_exact_match_count"));
    }

    #[test]
    fn test_output_paths() {
        let paths = OutputPaths::new("/tmp/out", "run");
        assert_eq!(paths.table, PathBuf::from("/tmp/out/run_table.tsv"));
        assert_eq!(paths.track, PathBuf::from("/tmp/out/run_ucsc_custom_track.bed"));
        assert_eq!(paths.summary, PathBuf::from("/tmp/out/run_summary.json"));
    }
}
