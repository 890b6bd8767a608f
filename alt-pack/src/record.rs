use config::{Strand, REFFLAT_FIELDS};
use serde::{Deserialize, Serialize};

/// One refFlat row. Exons are half-open, 0-based and kept in genomic order
/// regardless of the transcript strand.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct RefFlat {
    pub gene: String,
    pub name: String,
    pub chrom: String,
    pub strand: Strand,
    pub tx_start: u64,
    pub tx_end: u64,
    pub cds_start: u64,
    pub cds_end: u64,
    pub exons: Vec<(u64, u64)>,
}

impl RefFlat {
    #[inline(always)]
    pub fn read(line: &str) -> Result<RefFlat, &'static str> {
        if line.is_empty() {
            return Err("Empty line");
        }

        let fields = line.trim_end().split('\t').collect::<Vec<_>>();
        if fields.len() < REFFLAT_FIELDS {
            return Err("Expected 11 tab-separated refFlat fields");
        }

        let (
            gene,
            name,
            chrom,
            strand,
            tx_start,
            tx_end,
            cds_start,
            cds_end,
            exon_count,
            exon_starts,
            exon_ends,
        ) = (
            fields[0], fields[1], fields[2], fields[3], fields[4], fields[5], fields[6],
            fields[7], fields[8], fields[9], fields[10],
        );

        let get = |field: &str| field.trim().parse::<u64>().map_err(|_| "Cannot parse coordinate");
        let strand = strand
            .parse::<Strand>()
            .map_err(|_| "Strand is not + or -")?;

        let starts = split_coords(exon_starts)?;
        let ends = split_coords(exon_ends)?;
        let exon_count = exon_count
            .trim()
            .parse::<usize>()
            .map_err(|_| "Cannot parse exonCount")?;

        if starts.len() != ends.len() || starts.len() != exon_count {
            return Err("exonCount does not match exonStarts/exonEnds");
        }

        let mut exons = starts.into_iter().zip(ends).collect::<Vec<_>>();
        exons.sort_unstable();

        Ok(RefFlat {
            gene: gene.into(),
            name: name.into(),
            chrom: chrom.into(),
            strand,
            tx_start: get(tx_start)?,
            tx_end: get(tx_end)?,
            cds_start: get(cds_start)?,
            cds_end: get(cds_end)?,
            exons,
        })
    }

    pub fn exon_count(&self) -> usize {
        self.exons.len()
    }

    /// back to a refFlat line, with trailing commas on the exon lists
    pub fn line(&self) -> String {
        let starts = self
            .exons
            .iter()
            .map(|(s, _)| format!("{},", s))
            .collect::<String>();
        let ends = self
            .exons
            .iter()
            .map(|(_, e)| format!("{},", e))
            .collect::<String>();

        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.gene,
            self.name,
            self.chrom,
            self.strand,
            self.tx_start,
            self.tx_end,
            self.cds_start,
            self.cds_end,
            self.exon_count(),
            starts,
            ends
        )
    }
}

fn split_coords(field: &str) -> Result<Vec<u64>, &'static str> {
    field
        .split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(|x| x.parse::<u64>().map_err(|_| "Cannot parse exon coordinate"))
        .collect()
}
