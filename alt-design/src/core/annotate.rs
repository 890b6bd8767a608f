//! Window sequences from a genome FASTA
//!
//! The genome is streamed once. Only chromosomes that hold at least one
//! window are sliced; every window gets its sequence on the biological
//! strand, read 5' to 3'.

use anyhow::{Context, Result};
use hashbrown::HashMap;
use log::{info, warn};

use std::path::Path;

use config::{get_progress_bar, reverse_complement, FastaReader, FastaRecord, Strand};

use crate::core::window::SpliceWindow;

/// slice one window out of its chromosome, None when it runs past the end
pub fn window_sequence(seq: &[u8], start: u64, end: u64, strand: Strand) -> Option<String> {
    let (start, end) = (start as usize, end as usize);
    if start >= end || end > seq.len() {
        return None;
    }

    let slice = &seq[start..end];
    let bases = match strand {
        Strand::Forward => slice.to_vec(),
        Strand::Reverse => reverse_complement(slice),
    };

    String::from_utf8(bases).ok()
}

/// annotate windows from an iterator of records, output is aligned with `windows`
pub fn annotate_records<I>(windows: &[SpliceWindow], records: I) -> Result<Vec<Option<String>>>
where
    I: Iterator<Item = std::io::Result<FastaRecord>>,
{
    let mut by_chrom: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, window) in windows.iter().enumerate() {
        by_chrom.entry(window.chrom.as_str()).or_default().push(idx);
    }

    let mut sequences: Vec<Option<String>> = vec![None; windows.len()];
    let mut seen = 0;

    for record in records {
        let record = record?;
        let Some(indices) = by_chrom.remove(record.name.as_str()) else {
            continue;
        };
        seen += 1;

        for idx in indices {
            let window = &windows[idx];
            sequences[idx] = window_sequence(&record.seq, window.start, window.end, window.strand);

            if sequences[idx].is_none() {
                warn!(
                    "Window {}:{}-{} is out of bounds for {} ({} bp), skipping",
                    window.chrom,
                    window.start,
                    window.end,
                    record.name,
                    record.seq.len()
                );
            }
        }

        if by_chrom.is_empty() {
            break;
        }
    }

    let mut missing = by_chrom.keys().copied().collect::<Vec<_>>();
    missing.sort_unstable();
    for chrom in missing {
        warn!("Chromosome {} is not in the genome, its windows are skipped", chrom);
    }

    info!(
        "Annotated {} of {} windows from {} chromosome(s)",
        sequences.iter().filter(|s| s.is_some()).count(),
        windows.len(),
        seen
    );

    Ok(sequences)
}

pub fn annotate_windows<P: AsRef<Path>>(
    windows: &[SpliceWindow],
    fasta: P,
) -> Result<Vec<Option<String>>> {
    let reader = FastaReader::from_path(fasta.as_ref())
        .with_context(|| format!("ERROR: cannot open genome {:?}", fasta.as_ref()))?;

    let pb = get_progress_bar(windows.len() as u64, "Reading window sequences");
    let sequences = annotate_records(windows, reader)
        .with_context(|| format!("ERROR: cannot read genome {:?}", fasta.as_ref()));
    pb.finish_and_clear();

    sequences
}
