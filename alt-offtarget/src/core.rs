//! Core module for exact off-target counting
//! Alejandro Gonzales-Irribarren, 2025
//!
//! Queries (PAM + 20bp literals, optionally '+' delimited) are
//! normalized once and compiled into a single counter. The genome is
//! then streamed one record at a time; each record is cut into
//! overlapping chunks that are scanned in parallel against the shared,
//! read-only counter. Both strands are counted by matching each query
//! and its reverse complement on the plus strand (a palindromic query
//! counts once per site). Matches never span two records and overlapping
//! occurrences are all counted.

use anyhow::{Context, Result};
use hashbrown::HashMap;
use log::info;

use std::io::Read;
use std::path::{Path, PathBuf};

use config::{get_progress_bar, open_reader, write_collection, FastaReader, OFFTARGET_COUNTS};

use crate::cli::Args;
use crate::utils::{
    build_counter, normalize_queries, normalize_query, scan_sequence, Strategy, StrandedQueries,
    SCAN_CHUNK,
};

/// Occurrences per normalized query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfftargetCounts {
    queries: Vec<String>,
    counts: HashMap<String, u64>,
}

impl OfftargetCounts {
    /// count for a raw query, delimiter and case are normalized first
    pub fn get(&self, query: &str) -> Option<u64> {
        self.counts.get(&normalize_query(query)).copied()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// (query, count) in first-appearance order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.queries
            .iter()
            .map(|q| (q.as_str(), self.counts.get(q).copied().unwrap_or(0)))
    }

    pub fn lines(&self) -> Vec<String> {
        self.iter().map(|(q, c)| format!("{}\t{}", q, c)).collect()
    }
}

/// count every query over an iterator of genome records
pub fn count_records<S, I>(queries: &[S], records: I, strategy: Strategy) -> Result<OfftargetCounts>
where
    S: AsRef<str>,
    I: Iterator<Item = std::io::Result<config::FastaRecord>>,
{
    let queries = normalize_queries(queries);
    info!("Unique off-target queries: {}", queries.len());

    if queries.is_empty() {
        return Ok(OfftargetCounts::default());
    }

    let stranded = StrandedQueries::new(&queries);
    let counter = build_counter(stranded.patterns.clone(), strategy)?;
    let mut totals = vec![0u64; stranded.patterns.len()];

    let pb = get_progress_bar(0, "Scanning genome");
    let mut scanned = 0;
    for record in records {
        let record = record.context("ERROR: cannot read genome record")?;
        pb.set_message(format!("Scanning {}", record.name));

        let counts = scan_sequence(counter.as_ref(), &record.seq, SCAN_CHUNK);
        totals.iter_mut().zip(counts).for_each(|(t, c)| *t += c);

        scanned += 1;
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!("Genome records scanned: {}", scanned);

    let counts = queries
        .iter()
        .cloned()
        .zip(stranded.fold(&totals))
        .collect::<HashMap<_, _>>();
    Ok(OfftargetCounts { queries, counts })
}

/// stream a FASTA once and count every query in it
pub fn count_offtargets<S, P>(queries: &[S], fasta: P, strategy: Strategy) -> Result<OfftargetCounts>
where
    S: AsRef<str>,
    P: AsRef<Path>,
{
    let reader = FastaReader::from_path(fasta.as_ref())
        .with_context(|| format!("ERROR: cannot open genome {:?}", fasta.as_ref()))?;

    count_records(queries, reader, strategy)
        .with_context(|| format!("ERROR: off-target scan of {:?} failed", fasta.as_ref()))
}

/// one query per line, blank lines and '#' comments skipped
pub fn read_queries<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let mut contents = String::new();
    open_reader(path.as_ref())
        .with_context(|| format!("ERROR: cannot open queries {:?}", path.as_ref()))?
        .read_to_string(&mut contents)?;

    Ok(contents
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect())
}

pub fn offtarget(args: Args) -> Result<PathBuf> {
    let mut queries = args.sequences.clone();
    if let Some(path) = args.queries.as_ref() {
        queries.extend(read_queries(path)?);
    }

    let counts = count_offtargets(&queries, &args.fasta, args.strategy)?;

    std::fs::create_dir_all(&args.outdir)?;
    let output = args.outdir.join(OFFTARGET_COUNTS);
    write_collection(&counts.lines(), Some("query\tcount"), &output)?;

    Ok(output)
}
