use anyhow::{anyhow, Result};
use config::{iupac_bases, iupac_complement};
use regex::Regex;

/// IUPAC PAM -> regex with one character class per position.
///
/// Classes hold both cases of the concrete bases only, so an `N` in the
/// genome never satisfies a PAM position.
pub fn pam_pattern(pam: &str) -> Result<String> {
    let mut pattern = String::with_capacity(pam.len() * 10);

    for code in pam.chars() {
        let bases = iupac_bases(code)
            .ok_or_else(|| anyhow!("ERROR: '{}' is not an IUPAC code in PAM {}", code, pam))?;

        pattern.push('[');
        pattern.push_str(bases);
        pattern.push_str(&bases.to_lowercase());
        pattern.push(']');
    }

    Ok(pattern)
}

pub fn reverse_complement_pam(pam: &str) -> Result<String> {
    pam.chars()
        .rev()
        .map(|code| {
            iupac_complement(code)
                .ok_or_else(|| anyhow!("ERROR: '{}' is not an IUPAC code in PAM {}", code, pam))
        })
        .collect()
}

pub fn compile_pam(pam: &str) -> Result<Regex> {
    Ok(Regex::new(&pam_pattern(pam)?)?)
}

pub fn compile_reverse_pam(pam: &str) -> Result<Regex> {
    Ok(Regex::new(&pam_pattern(&reverse_complement_pam(pam)?)?)?)
}

/// every match, overlapping ones included, as (start, end)
pub fn find_overlapping(re: &Regex, seq: &str) -> Vec<(usize, usize)> {
    let mut hits = Vec::new();
    let mut pos = 0;

    while pos <= seq.len() {
        match re.find_at(seq, pos) {
            Some(m) => {
                hits.push((m.start(), m.end()));
                pos = m.start() + 1;
            }
            None => break,
        }
    }

    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pam_pattern() {
        assert_eq!(pam_pattern("NGG").unwrap(), "[ACGTacgt][Gg][Gg]");
        assert!(pam_pattern("NXG").is_err());
    }

    #[test]
    fn test_reverse_complement_pam() {
        assert_eq!(reverse_complement_pam("NGG").unwrap(), "CCN");
        assert_eq!(reverse_complement_pam("NNGRRT").unwrap(), "AYYCNN");
    }

    #[test]
    fn test_find_overlapping_matches() {
        let re = compile_reverse_pam("NGG").unwrap();
        assert_eq!(
            find_overlapping(&re, "NNNCCCCCNN"),
            vec![(3, 6), (4, 7), (5, 8)]
        );

        let re = compile_pam("NG").unwrap();
        assert_eq!(find_overlapping(&re, "aggN"), vec![(0, 2), (1, 3)]);
    }
}
