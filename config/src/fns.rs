use flate2::read::MultiGzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{FASTA_EXTENSIONS, GTF_EXTENSIONS, REFFLAT_EXTENSIONS};

// os
#[cfg(not(windows))]
const TICK_SETTINGS: (&str, u64) = ("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ", 80);
#[cfg(windows)]
const TICK_SETTINGS: (&str, u64) = (r"+-x| ", 200);

/// return a pre-configured progress bar
pub fn get_progress_bar(length: u64, msg: &str) -> ProgressBar {
    let progressbar_style = ProgressStyle::default_spinner()
        .tick_chars(TICK_SETTINGS.0)
        .template(" {spinner} {msg:<30} {wide_bar} ETA {eta_precise} ")
        .expect("no template error");

    let progress_bar = ProgressBar::new(length);

    progress_bar.set_style(progressbar_style);
    progress_bar.enable_steady_tick(Duration::from_millis(TICK_SETTINGS.1));
    progress_bar.set_message(msg.to_owned());

    progress_bar
}

/// write an ordered collection of lines to a file, with an optional header
pub fn write_collection<P: AsRef<Path>>(
    data: &[String],
    header: Option<&str>,
    fname: P,
) -> std::io::Result<()> {
    log::info!(
        "Records in {}: {:?}. Writing...",
        fname.as_ref().display(),
        data.len()
    );
    let mut writer = BufWriter::new(File::create(fname.as_ref())?);

    if let Some(header) = header {
        writeln!(writer, "{}", header)?;
    }

    for line in data.iter() {
        writeln!(writer, "{}", line)?;
    }

    writer.flush()
}

/// open a plain or gzipped text file
pub fn open_reader<P: AsRef<Path>>(path: P) -> std::io::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path.as_ref())?;

    match path.as_ref().extension() {
        Some(ext) if ext == "gz" => Ok(Box::new(BufReader::new(MultiGzDecoder::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

/// argument checker for all subcommands
pub trait ArgCheck {
    fn check(&self) -> Result<(), CliError> {
        self.validate_args()
    }

    fn validate_args(&self) -> Result<(), CliError> {
        self.check_annotation()?;

        if let Some(fasta) = self.get_fasta() {
            validate(fasta, &FASTA_EXTENSIONS)?;
        } else {
            log::warn!("No genome FASTA provided. Skipping sequence checks...");
        }

        self.check_outdir()
    }

    fn check_annotation(&self) -> Result<(), CliError> {
        match (self.get_refflat(), self.get_gtf()) {
            (Some(refflat), None) => validate(refflat, &REFFLAT_EXTENSIONS),
            (None, Some(gtf)) => validate(gtf, &GTF_EXTENSIONS),
            (Some(_), Some(_)) => Err(CliError::InvalidInput(
                "ERROR: provide either a refFlat or a GTF annotation, not both".to_string(),
            )),
            (None, None) => Err(CliError::InvalidInput(
                "ERROR: no annotation file provided".to_string(),
            )),
        }
    }

    fn check_outdir(&self) -> Result<(), CliError> {
        let outdir = self.get_outdir();
        if outdir.exists() && !outdir.is_dir() {
            return Err(CliError::InvalidInput(format!(
                "ERROR: {:?} exists and is not a directory",
                outdir
            )));
        }

        Ok(())
    }

    fn get_refflat(&self) -> Option<&PathBuf>;
    fn get_gtf(&self) -> Option<&PathBuf>;
    fn get_fasta(&self) -> Option<&PathBuf>;
    fn get_outdir(&self) -> &PathBuf;
}

/// error handling for CLI
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// argument validation
pub fn validate(arg: &PathBuf, extensions: &[&str]) -> Result<(), CliError> {
    if !arg.exists() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} does not exist",
            arg
        )));
    }

    if !arg.is_file() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} is not a file",
            arg
        )));
    }

    match arg.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if extensions.contains(&ext.to_lowercase().as_str()) => (),
        _ => {
            return Err(CliError::InvalidInput(format!(
                "ERROR: file {:?} does not have any of the expected extensions {:?}",
                arg, extensions
            )))
        }
    }

    match std::fs::metadata(arg) {
        Ok(metadata) if metadata.len() == 0 => Err(CliError::InvalidInput(format!(
            "ERROR: file {:?} is empty",
            arg
        ))),
        Ok(_) => Ok(()),
        Err(e) => Err(CliError::IoError(e)),
    }
}

/// merge gene symbols/transcript ids given inline and through a file
///
/// The file holds one identifier per line, blank lines and '#' comments
/// are skipped. Order is preserved and duplicates are removed.
pub fn collect_genes(genes: &[String], gene_file: Option<&PathBuf>) -> Result<Vec<String>, CliError> {
    let mut acc: Vec<String> = Vec::new();

    let mut push = |gene: &str| {
        let gene = gene.trim();
        if !gene.is_empty() && !acc.iter().any(|g| g == gene) {
            acc.push(gene.to_string());
        }
    };

    genes.iter().for_each(|gene| push(gene.as_str()));

    if let Some(path) = gene_file {
        let reader = open_reader(path)?;
        for line in reader.lines() {
            let line = line?;
            if line.starts_with('#') {
                continue;
            }
            push(&line);
        }
    }

    if acc.is_empty() {
        return Err(CliError::InvalidInput(
            "ERROR: no genes of interest provided".to_string(),
        ));
    }

    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_collect_genes_merges_inline_and_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# genes").unwrap();
        writeln!(file, "PTBP1").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "MYGENE").unwrap();

        let genes = vec!["MYGENE".to_string(), "NM_000001".to_string()];
        let path = file.path().to_path_buf();
        let merged = collect_genes(&genes, Some(&path)).unwrap();

        assert_eq!(merged, vec!["MYGENE", "NM_000001", "PTBP1"]);
    }

    #[test]
    fn test_collect_genes_rejects_empty() {
        assert!(collect_genes(&[], None).is_err());
    }

    #[test]
    fn test_validate_rejects_wrong_extension() {
        let mut file = tempfile::Builder::new().suffix(".bed").tempfile().unwrap();
        writeln!(file, "chr1\t0\t10").unwrap();

        let path = file.path().to_path_buf();
        assert!(validate(&path, &FASTA_EXTENSIONS).is_err());
    }

    #[test]
    fn test_open_reader_reads_gzip() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let file = tempfile::Builder::new().suffix(".gz").tempfile().unwrap();
        let mut encoder = GzEncoder::new(file.reopen().unwrap(), Compression::default());
        writeln!(encoder, ">chr1\nACGT").unwrap();
        encoder.finish().unwrap();

        let lines: Vec<String> = open_reader(file.path())
            .unwrap()
            .lines()
            .map(|l| l.unwrap())
            .collect();

        assert_eq!(lines, vec![">chr1", "ACGT"]);
    }
}
