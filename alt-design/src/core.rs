//! Core module for sgRNA design at alternative splice sites
//! Alejandro Gonzales-Irribarren, 2025
//!
//! This module glues the three design stages together. Classified
//! exons are reduced to one record per physical exon and turned into
//! acceptor/donor windows (window), windows are read from the genome on
//! their biological strand (annotate) and every window is scanned with
//! every configured base editor (engine).
//!
//! Windows are independent of each other and are designed in parallel.
//! Results carry the exon id, the site and the editor name so they can
//! be joined back to their canonical exon without mixing editors.

pub mod annotate;
pub mod engine;
pub mod window;

use anyhow::{bail, Result};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use alt_classify::{classify_genes, ClassifiedGene};
use alt_pack::{pack, Annotation};
use config::{
    build_editor_set, get_progress_bar, write_collection, BaseEditor, EditorSet, SpliceSite,
    Strand, DEFAULT_HALF_WIDTH, DESIGNED_GUIDES,
};

use crate::cli::Args;
use annotate::annotate_windows;
use engine::{design_sgrna, has_splice_dinucleotide, CompiledEditor, SgrnaInfo};
use window::{extract_target_exons, extract_windows, ExonSelection, SpliceWindow, TargetExon};

pub const DESIGN_HEADER: &str = "geneName\ttranscripts\tchrom\texonStart\texonEnd\tstrand\texon_id\texontype\texon_position\tcoding\tframe\tcds_info\tsite_type\tbase_editor_name\tbase_editor_pam\tbase_editor_editing_window_start\tbase_editor_editing_window_end\tbase_editor_type\tsgrna_target_sequence\tsgrna_actual_sequence\tsgrna_start_in_sequence\tsgrna_end_in_sequence\tsgrna_start_in_genome\tsgrna_end_in_genome\tsgrna_target_pos_in_sgrna\tsgrna_overlap_between_cds_and_editing_window\tsgrna_possible_unintended_edited_base_count";

/// One guide joined to the window and editor that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesignedGuide {
    pub exon_id: usize,
    pub site: SpliceSite,
    pub editor: BaseEditor,
    pub chrom: String,
    pub strand: Strand,
    pub genome_start: u64,
    pub genome_end: u64,
    pub sgrna: SgrnaInfo,
}

impl DesignedGuide {
    /// exon, editor and guide columns of the output table
    pub fn row(&self, exon: &TargetExon) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            exon.gene,
            exon.transcripts.join(","),
            exon.chrom,
            exon.start,
            exon.end,
            exon.strand,
            exon.id,
            exon.label,
            exon.position,
            exon.coding,
            exon.frame,
            exon.cds_info,
            self.site,
            self.editor.name,
            self.editor.pam,
            self.editor.window_start,
            self.editor.window_end,
            self.editor.editor_type,
            self.sgrna.target_sequence,
            self.sgrna.actual_sequence,
            self.sgrna.start_in_sequence,
            self.sgrna.end_in_sequence,
            self.genome_start,
            self.genome_end,
            self.sgrna.target_pos_in_sgrna,
            self.sgrna.overlap_between_cds_and_editing_window,
            self.sgrna.possible_unintended_edited_base_count
        )
    }

    /// PAM + 20bp literal used for off-target counting
    pub fn query(&self) -> String {
        self.sgrna.target_sequence.replace('+', "").to_uppercase()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DesignStats {
    pub target_exons: usize,
    pub windows_per_site: BTreeMap<String, usize>,
    pub windows_without_sequence: usize,
    pub windows_without_dinucleotide: usize,
    pub guides_per_editor: BTreeMap<String, usize>,
}

/// Everything downstream stages need from a design run
#[derive(Debug, Clone)]
pub struct Design {
    pub exons: Vec<TargetExon>,
    pub windows: Vec<SpliceWindow>,
    pub guides: Vec<DesignedGuide>,
    pub stats: DesignStats,
}

impl Design {
    pub fn exon(&self, id: usize) -> Option<&TargetExon> {
        self.exons.get(id)
    }

    pub fn rows(&self) -> Vec<String> {
        self.guides
            .iter()
            .filter_map(|g| self.exon(g.exon_id).map(|exon| g.row(exon)))
            .collect()
    }
}

/// map a window offset span to the genome, honoring the window strand
pub fn genome_span(window: &SpliceWindow, start: usize, end: usize) -> (u64, u64) {
    match window.strand {
        Strand::Forward => (window.start + start as u64, window.start + end as u64),
        Strand::Reverse => (window.end - end as u64, window.end - start as u64),
    }
}

/// central 2 x 25bp of a window, with its offset inside the window
///
/// Splice offsets are fixed relative to the window center, wider windows
/// are designed on their core and reported in full-window coordinates.
pub fn splice_core(seq: &str) -> (usize, &str) {
    let span = 2 * DEFAULT_HALF_WIDTH as usize;
    let shift = (seq.len() / 2).saturating_sub(DEFAULT_HALF_WIDTH as usize);

    match seq.get(shift..shift + span) {
        Some(center) => (shift, center),
        None => (0, seq),
    }
}

struct ParallelCounter {
    num_of_windows: AtomicU32,
    num_of_gated: AtomicU32,
}

impl Default for ParallelCounter {
    fn default() -> Self {
        Self {
            num_of_windows: AtomicU32::new(0),
            num_of_gated: AtomicU32::new(0),
        }
    }
}

impl ParallelCounter {
    fn inc_windows(&self) {
        self.num_of_windows.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_gated(&self) {
        self.num_of_gated.fetch_add(1, Ordering::Relaxed);
    }
}

/// design every window with every editor, windows in parallel
///
/// `sequences` is aligned with `windows`; windows without a sequence
/// are skipped. Output order follows windows, then editors, then the
/// guide position inside the window.
pub fn design_windows(
    windows: &[SpliceWindow],
    sequences: &[Option<String>],
    editors: &[CompiledEditor],
) -> (Vec<DesignedGuide>, DesignStats) {
    let pb = get_progress_bar(windows.len() as u64, "Designing sgRNAs");
    let counter = ParallelCounter::default();

    let guides = windows
        .par_iter()
        .zip(sequences.par_iter())
        .flat_map_iter(|(window, sequence)| {
            pb.inc(1);
            let mut guides = Vec::new();

            let Some(seq) = sequence else {
                return guides;
            };
            counter.inc_windows();

            let (shift, center) = splice_core(seq);
            if !has_splice_dinucleotide(center, window.site) {
                counter.inc_gated();
                debug!(
                    "No canonical {} dinucleotide in {}:{}-{}",
                    window.site, window.chrom, window.start, window.end
                );
                return guides;
            }

            for editor in editors {
                for mut sgrna in design_sgrna(center, editor, window.site) {
                    sgrna.start_in_sequence += shift;
                    sgrna.end_in_sequence += shift;
                    let (genome_start, genome_end) =
                        genome_span(window, sgrna.start_in_sequence, sgrna.end_in_sequence);

                    guides.push(DesignedGuide {
                        exon_id: window.exon_id,
                        site: window.site,
                        editor: editor.editor.clone(),
                        chrom: window.chrom.clone(),
                        strand: window.strand,
                        genome_start,
                        genome_end,
                        sgrna,
                    });
                }
            }

            guides
        })
        .collect::<Vec<_>>();
    pb.finish_and_clear();

    let mut stats = DesignStats::default();
    for window in windows {
        *stats.windows_per_site.entry(window.site.to_string()).or_default() += 1;
    }
    for editor in editors {
        stats.guides_per_editor.insert(editor.editor.name.clone(), 0);
    }
    for guide in guides.iter() {
        *stats.guides_per_editor.entry(guide.editor.name.clone()).or_default() += 1;
    }
    stats.windows_without_sequence = sequences.iter().filter(|s| s.is_none()).count();
    stats.windows_without_dinucleotide = counter.num_of_gated.load(Ordering::Relaxed) as usize;

    info!(
        "Windows designed: {} ({} without a canonical splice dinucleotide)",
        counter.num_of_windows.load(Ordering::Relaxed),
        stats.windows_without_dinucleotide
    );
    for (editor, count) in stats.guides_per_editor.iter() {
        info!("sgRNAs designed with {}: {}", editor, count);
    }

    (guides, stats)
}

/// extract, annotate and design over classified genes
pub fn design<P: AsRef<Path>>(
    genes: &[ClassifiedGene],
    fasta: P,
    editors: &EditorSet,
    selection: ExonSelection,
    half_width: u64,
) -> Result<Design> {
    let compiled = editors
        .iter()
        .map(CompiledEditor::new)
        .collect::<Result<Vec<_>>>()?;

    let exons = extract_target_exons(genes, selection);
    let windows = extract_windows(&exons, half_width);
    if windows.is_empty() {
        warn!("No splice windows to design, every output will be empty");
    }

    let sequences = annotate_windows(&windows, fasta)?;
    let (mut guides, mut stats) = design_windows(&windows, &sequences, &compiled);
    stats.target_exons = exons.len();

    guides.sort_by_cached_key(|g| {
        let exon = &exons[g.exon_id];
        (
            exon.gene.clone(),
            exon.chrom.clone(),
            exon.start,
            exon.end,
            g.site,
            g.editor.name.clone(),
            g.sgrna.start_in_sequence,
        )
    });

    Ok(Design {
        exons,
        windows,
        guides,
        stats,
    })
}

/// editors from presets, a base-editor file and inline parameters
pub fn editors_from_args(args: &Args) -> Result<EditorSet> {
    let editors = build_editor_set(&args.preset, args.be_file.as_deref(), &args.inline_editor())?;
    if editors.is_empty() {
        bail!("ERROR: no base editors configured");
    }

    for editor in editors.iter() {
        info!("Base editor: {}", editor);
    }

    Ok(editors)
}

pub fn design_guides(args: Args) -> Result<PathBuf> {
    let editors = editors_from_args(&args)?;

    let annotation = Annotation::from_args(args.refflat.as_ref(), args.gtf.as_ref())?;
    let genes = config::collect_genes(&args.genes, args.gene_file.as_ref())?;
    let pack = pack(&annotation, &genes)?;
    let (classified, _) = classify_genes(&pack.genes);

    let design = design(&classified, &args.fasta, &editors, args.exons, args.half_width)?;

    std::fs::create_dir_all(&args.outdir)?;
    let output = args.outdir.join(DESIGNED_GUIDES);
    write_collection(&design.rows(), Some(DESIGN_HEADER), &output)?;

    Ok(output)
}
