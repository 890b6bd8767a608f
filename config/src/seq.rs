use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

impl FromStr for Strand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            _ => Err(format!("ERROR: Strand is not + or -: {}", s)),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// Exon boundary being targeted. Acceptor is the upstream (transcript 5')
/// intron-exon junction, donor the downstream one.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpliceSite {
    Acceptor,
    Donor,
}

impl SpliceSite {
    pub const ALL: [SpliceSite; 2] = [SpliceSite::Acceptor, SpliceSite::Donor];
}

impl fmt::Display for SpliceSite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SpliceSite::Acceptor => write!(f, "acceptor"),
            SpliceSite::Donor => write!(f, "donor"),
        }
    }
}

#[inline(always)]
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'a' => b't',
        b't' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        b'n' => b'n',
        _ => b'N',
    }
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

/// DNA -> RNA on the same strand (T -> U), case is kept
pub fn to_rna(seq: &str) -> String {
    seq.chars()
        .map(|c| match c {
            'T' => 'U',
            't' => 'u',
            _ => c,
        })
        .collect()
}

/// DNA -> RNA of the opposite strand, read 5' to 3'
pub fn to_rna_reverse_complement(seq: &str) -> String {
    seq.chars()
        .rev()
        .map(|c| match c {
            'A' => 'U',
            'T' => 'A',
            'C' => 'G',
            'G' => 'C',
            'a' => 'u',
            't' => 'a',
            'c' => 'g',
            'g' => 'c',
            'n' => 'n',
            _ => 'N',
        })
        .collect()
}

/// IUPAC code -> plus-strand bases it stands for
pub fn iupac_bases(code: char) -> Option<&'static str> {
    let bases = match code.to_ascii_uppercase() {
        'A' => "A",
        'C' => "C",
        'G' => "G",
        'T' | 'U' => "T",
        'R' => "AG",
        'Y' => "CT",
        'S' => "CG",
        'W' => "AT",
        'K' => "GT",
        'M' => "AC",
        'B' => "CGT",
        'D' => "AGT",
        'H' => "ACT",
        'V' => "ACG",
        'N' => "ACGT",
        _ => return None,
    };

    Some(bases)
}

/// IUPAC code of the complementary strand
pub fn iupac_complement(code: char) -> Option<char> {
    let comp = match code.to_ascii_uppercase() {
        'A' => 'T',
        'C' => 'G',
        'G' => 'C',
        'T' | 'U' => 'A',
        'R' => 'Y',
        'Y' => 'R',
        'S' => 'S',
        'W' => 'W',
        'K' => 'M',
        'M' => 'K',
        'B' => 'V',
        'D' => 'H',
        'H' => 'D',
        'V' => 'B',
        'N' => 'N',
        _ => return None,
    };

    Some(comp)
}
