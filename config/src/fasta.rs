use std::io::{self, BufRead};
use std::path::Path;

use crate::open_reader;

const FA_NEEDLE: char = '>';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub name: String,
    pub seq: Vec<u8>,
}

/// Streams a (gzipped) FASTA one record at a time.
///
/// The record name is the first whitespace-delimited token of the header.
/// Sequence lines are concatenated without line breaks, case is kept.
pub struct FastaReader<R: BufRead> {
    reader: R,
    line: String,
    pending: Option<String>,
}

impl FastaReader<Box<dyn BufRead + Send>> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self::new(open_reader(path)?))
    }
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            pending: None,
        }
    }

    fn header_name(line: &str) -> String {
        line.trim_start_matches(FA_NEEDLE)
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    fn next_header(&mut self) -> io::Result<Option<String>> {
        if let Some(name) = self.pending.take() {
            return Ok(Some(name));
        }

        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }

            let line = self.line.trim_end();
            if line.is_empty() {
                continue;
            }
            if line.starts_with(FA_NEEDLE) {
                return Ok(Some(Self::header_name(line)));
            }

            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "ERROR: FASTA sequence found before the first header",
            ));
        }
    }

    fn read_record(&mut self) -> io::Result<Option<FastaRecord>> {
        let Some(name) = self.next_header()? else {
            return Ok(None);
        };

        let mut seq = Vec::new();
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                break;
            }

            let line = self.line.trim_end();
            if line.starts_with(FA_NEEDLE) {
                self.pending = Some(Self::header_name(line));
                break;
            }
            seq.extend_from_slice(line.as_bytes());
        }

        Ok(Some(FastaRecord { name, seq }))
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = io::Result<FastaRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}
