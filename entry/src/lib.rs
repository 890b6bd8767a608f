//! altex pipeline
//!
//! Runs every stage in-process: annotation loading, exon classification,
//! splice-window design, genome-wide off-target counting and output
//! assembly. Configuration errors (base editors) are raised before any
//! annotation or genome is read.

use anyhow::Result;
use config::{all_presets, preset_keys, ArgCheck};
use log::{info, warn};

use alt_classify::classify_genes;
use alt_design::{design, editors_from_args};
use alt_offtarget::count_offtargets;
use alt_pack::{gtf_to_refflat, pack, write_refflat, Annotation};

pub mod cli;
pub mod output;

use output::{write_outputs, OutputPaths, RunSummary};

/// full pipeline over already parsed arguments
pub fn run(args: &cli::Args) -> Result<(OutputPaths, RunSummary)> {
    let opts = &args.design;
    let editors = editors_from_args(opts)?;

    let annotation = Annotation::from_args(opts.refflat.as_ref(), opts.gtf.as_ref())?;
    let genes = config::collect_genes(&opts.genes, opts.gene_file.as_ref())?;
    let pack = pack(&annotation, &genes)?;

    let (classified, classify_stats) = classify_genes(&pack.genes);
    let design = design(&classified, &opts.fasta, &editors, opts.exons, opts.half_width)?;

    let queries = design.guides.iter().map(|g| g.query()).collect::<Vec<_>>();
    let counts = count_offtargets(&queries, &opts.fasta, args.strategy)?;

    let summary = RunSummary::new(&pack.stats, &classify_stats, &design, &counts);
    if design.guides.is_empty() {
        warn!("No sgRNAs were designed for the given genes and base editors");
    }

    std::fs::create_dir_all(&opts.outdir)?;
    let paths = OutputPaths::new(&opts.outdir, &args.prefix);
    write_outputs(&paths, &design, &counts, &summary, &args.prefix, &args.assembly)?;
    summary.log();

    Ok((paths, summary))
}

/// `altex run` from a raw argument vector
pub fn lib(args: Vec<String>) -> Result<OutputPaths> {
    let args = cli::Args::from(args);
    args.check()?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.design.threads)
        .build()?;
    let (paths, _) = pool.install(|| run(&args))?;

    info!("Table written to {}", paths.table.display());
    info!("Custom track written to {}", paths.track.display());
    info!("Run summary written to {}", paths.summary.display());

    Ok(paths)
}

pub fn lib_gtf2refflat(args: Vec<String>) -> Result<std::path::PathBuf> {
    let args = cli::GtfArgs::from(args);
    args.check()?;

    let records = gtf_to_refflat(&args.gtf)?;
    write_refflat(&records, &args.output)?;

    Ok(args.output)
}

/// preset table, one editor per line
pub fn presets() -> Vec<String> {
    let mut lines = vec!["preset\tbase_editor_name\tpam_sequence\tediting_window_start\tediting_window_end\tbase_editor_type".to_string()];

    lines.extend(preset_keys().into_iter().zip(all_presets().iter()).map(|(key, e)| {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            key, e.name, e.pam, e.window_start, e.window_end, e.editor_type
        )
    }));

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;

    // plus-strand gene, exon 2 (1150-1200) skipped by NM_2
    const REFFLAT: &str = "G\tNM_1\tchr1\t+\t1000\t1300\t1000\t1300\t3\t1000,1150,1250,\t1100,1200,1300,\n\
G\tNM_2\tchr1\t+\t1000\t1300\t1000\t1300\t2\t1000,1250,\t1100,1300,\n";

    /// 1400bp chr1 of 'A' with canonical AG|exon|GT around 1150-1200 and
    /// a single CCN upstream so one CBE guide hits the acceptor
    fn chromosome() -> String {
        let mut seq = vec![b'A'; 1400];
        seq[1129..1131].copy_from_slice(b"CC");
        seq[1148..1150].copy_from_slice(b"AG");
        seq[1200..1202].copy_from_slice(b"GT");
        String::from_utf8(seq).unwrap()
    }

    // the same gene mirrored onto the reverse strand of a 1400bp chr1
    const REFFLAT_MINUS: &str = "G\tNM_1\tchr1\t-\t100\t400\t100\t400\t3\t100,200,300,\t150,250,400,\n\
G\tNM_2\tchr1\t-\t100\t400\t100\t400\t2\t100,300,\t150,400,\n";

    fn reverse_chromosome() -> String {
        String::from_utf8(config::reverse_complement(chromosome().as_bytes())).unwrap()
    }

    fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", contents).unwrap();
        path
    }

    fn args(dir: &Path, refflat: &Path, fasta: &Path, extra: &[&str]) -> cli::Args {
        let mut raw = vec![
            "--refflat".to_string(),
            refflat.display().to_string(),
            "--fasta".to_string(),
            fasta.display().to_string(),
            "--genes".to_string(),
            "G".to_string(),
            "--outdir".to_string(),
            dir.join("out").display().to_string(),
            "--threads".to_string(),
            "1".to_string(),
        ];
        raw.extend(extra.iter().map(|s| s.to_string()));
        cli::Args::from(raw)
    }

    #[test]
    fn test_pipeline_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let refflat = write_file(dir.path(), "genes.txt", REFFLAT);
        let fasta = write_file(
            dir.path(),
            "genome.fa",
            &format!(">chr1\n{}\n>chr2\nACGT\n", chromosome()),
        );

        let args = args(
            dir.path(),
            &refflat,
            &fasta,
            &["--preset", "target-aid-ngg", "--exons", "alternative"],
        );
        args.check().unwrap();
        let (paths, summary) = run(&args).unwrap();

        assert_eq!(summary.genes_found, 1);
        assert_eq!(summary.target_exons, 1);
        assert_eq!(summary.windows_per_site["acceptor"], 1);
        assert_eq!(summary.windows_per_site["donor"], 1);
        assert_eq!(summary.guides_per_editor["Target-AID_NGG"], 1);
        assert_eq!(summary.genes_with_guides, 1);

        let table = std::fs::read_to_string(&paths.table).unwrap();
        let rows = table.lines().collect::<Vec<_>>();
        assert_eq!(rows.len(), 2);

        let row = rows[1].split('\t').collect::<Vec<_>>();
        assert_eq!(&row[..8], &["G", "NM_1", "chr1", "1150", "1200", "+", "0", "unique"]);
        assert_eq!(row[12], "acceptor");
        assert_eq!(row[18], "CCA+AAAAAAAAAAAAAAAAAGAA");
        assert_eq!((row[22], row[23]), ("1132", "1152"));
        assert_eq!(row[27], "1");

        let track = std::fs::read_to_string(&paths.track).unwrap();
        let bed = track.lines().collect::<Vec<_>>();
        assert!(bed[0].starts_with("track name=\"sgrnas_designed_by_altex\""));
        assert_eq!(
            bed[1],
            "chr1\t1132\t1152\tG_acceptor_Target-AID_NGG_0\t1\t+\t1132\t1152\t0,0,255"
        );

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.summary).unwrap()).unwrap();
        assert_eq!(json["guides_total"], 1);
    }

    #[test]
    fn test_pipeline_on_reverse_strand() {
        let dir = tempfile::tempdir().unwrap();
        let refflat = write_file(dir.path(), "genes.txt", REFFLAT_MINUS);
        let fasta = write_file(
            dir.path(),
            "genome.fa",
            &format!(">chr1\n{}\n>chr2\nACGT\n", reverse_chromosome()),
        );

        let args = args(
            dir.path(),
            &refflat,
            &fasta,
            &["--preset", "target-aid-ngg", "--exons", "alternative"],
        );
        let (paths, summary) = run(&args).unwrap();

        assert_eq!(summary.target_exons, 1);
        assert_eq!(summary.guides_per_editor["Target-AID_NGG"], 1);

        let table = std::fs::read_to_string(&paths.table).unwrap();
        let rows = table.lines().collect::<Vec<_>>();
        assert_eq!(rows.len(), 2);

        let row = rows[1].split('\t').collect::<Vec<_>>();
        assert_eq!(&row[..8], &["G", "NM_1", "chr1", "200", "250", "-", "0", "unique"]);
        assert_eq!(row[12], "acceptor");
        assert_eq!(row[18], "CCA+AAAAAAAAAAAAAAAAAGAA");
        assert_eq!((row[22], row[23]), ("248", "268"));
        // the guide's own site sits on the minus strand and still counts
        assert_eq!(row[27], "1");

        let track = std::fs::read_to_string(&paths.track).unwrap();
        assert_eq!(
            track.lines().nth(1).unwrap(),
            "chr1\t248\t268\tG_acceptor_Target-AID_NGG_0\t1\t-\t248\t268\t0,0,255"
        );
    }

    #[test]
    fn test_reruns_are_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let refflat = write_file(dir.path(), "genes.txt", REFFLAT);
        let fasta = write_file(
            dir.path(),
            "genome.fa",
            &format!(">chr1\n{}\n>chr2\nACGT\n", chromosome()),
        );
        let args = args(dir.path(), &refflat, &fasta, &[]);

        let (paths, _) = run(&args).unwrap();
        let first = [&paths.table, &paths.track, &paths.summary]
            .map(|p| std::fs::read(p).unwrap());

        let pool = rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap();
        let (paths, _) = pool.install(|| run(&args)).unwrap();
        let second = [&paths.table, &paths.track, &paths.summary]
            .map(|p| std::fs::read(p).unwrap());

        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_guides_still_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let refflat = write_file(dir.path(), "genes.txt", REFFLAT);
        let fasta = write_file(
            dir.path(),
            "genome.fa",
            &format!(">chr1\n{}\n", "A".repeat(1400)),
        );

        let args = args(dir.path(), &refflat, &fasta, &[]);
        let (paths, summary) = run(&args).unwrap();

        assert_eq!(summary.guides_total, 0);
        assert_eq!(std::fs::read_to_string(&paths.table).unwrap().lines().count(), 1);
        assert_eq!(std::fs::read_to_string(&paths.track).unwrap().lines().count(), 1);
        assert!(paths.summary.exists());
    }

    #[test]
    fn test_bad_editor_fails_before_reading_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.txt");

        let args = args(dir.path(), &missing, &missing, &["--preset", "no-such-editor"]);
        let err = run(&args).unwrap_err().to_string();
        assert!(err.contains("no-such-editor"));
    }

    #[test]
    fn test_presets_table() {
        let lines = presets();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[1], "target-aid-ngg\tTarget-AID_NGG\tNGG\t17\t19\tcbe");
    }
}
