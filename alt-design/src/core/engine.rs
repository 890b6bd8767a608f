//! sgRNA design over one splice window
//!
//! The four (site, chemistry) combinations only differ in data: which
//! window offset holds the base to edit, which way the PAM is read and
//! which base identity counts as a collateral edit inside the CDS. They
//! are encoded in `SITE_RULES` and driven by a single scan.

use anyhow::Result;
use regex::Regex;
use serde::Serialize;

use config::{
    to_rna, to_rna_reverse_complement, BaseEditor, EditorType, SpliceSite,
    ACCEPTOR_CDS_BOUNDARY, ACCEPTOR_DINUCLEOTIDE, DONOR_CDS_BOUNDARY, DONOR_DINUCLEOTIDE,
    GUIDE_LENGTH,
};

use crate::utils::{compile_pam, compile_reverse_pam, find_overlapping};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    /// reverse-complement PAM on the plus strand, spacer 3' of it
    ReverseComplement,
    /// PAM as given on the plus strand, spacer 5' of it
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteRule {
    pub site: SpliceSite,
    pub editor_type: EditorType,
    pub target: usize,
    pub direction: ScanDirection,
    pub collateral_base: u8,
}

pub const CBE_ACCEPTOR: SiteRule = SiteRule {
    site: SpliceSite::Acceptor,
    editor_type: EditorType::Cbe,
    target: 24,
    direction: ScanDirection::ReverseComplement,
    collateral_base: b'G',
};

pub const CBE_DONOR: SiteRule = SiteRule {
    site: SpliceSite::Donor,
    editor_type: EditorType::Cbe,
    target: 25,
    direction: ScanDirection::ReverseComplement,
    collateral_base: b'G',
};

pub const ABE_ACCEPTOR: SiteRule = SiteRule {
    site: SpliceSite::Acceptor,
    editor_type: EditorType::Abe,
    target: 23,
    direction: ScanDirection::Direct,
    collateral_base: b'A',
};

pub const ABE_DONOR: SiteRule = SiteRule {
    site: SpliceSite::Donor,
    editor_type: EditorType::Abe,
    target: 26,
    direction: ScanDirection::ReverseComplement,
    collateral_base: b'T',
};

pub const SITE_RULES: [SiteRule; 4] = [CBE_ACCEPTOR, CBE_DONOR, ABE_ACCEPTOR, ABE_DONOR];

impl SiteRule {
    pub fn get(site: SpliceSite, editor_type: EditorType) -> &'static SiteRule {
        match (site, editor_type) {
            (SpliceSite::Acceptor, EditorType::Cbe) => &CBE_ACCEPTOR,
            (SpliceSite::Donor, EditorType::Cbe) => &CBE_DONOR,
            (SpliceSite::Acceptor, EditorType::Abe) => &ABE_ACCEPTOR,
            (SpliceSite::Donor, EditorType::Abe) => &ABE_DONOR,
        }
    }
}

/// One candidate guide inside a window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SgrnaInfo {
    /// PAM and spacer as read on the plus-strand window, joined by '+'
    pub target_sequence: String,
    pub spacer_sequence: String,
    pub actual_sequence: String,
    pub start_in_sequence: usize,
    pub end_in_sequence: usize,
    pub target_pos_in_sgrna: usize,
    pub overlap_between_cds_and_editing_window: usize,
    pub possible_unintended_edited_base_count: usize,
}

/// An editor with its PAM compiled for both scan directions
#[derive(Debug, Clone)]
pub struct CompiledEditor {
    pub editor: BaseEditor,
    direct: Regex,
    reverse: Regex,
}

impl CompiledEditor {
    pub fn new(editor: &BaseEditor) -> Result<Self> {
        Ok(Self {
            direct: compile_pam(&editor.pam)?,
            reverse: compile_reverse_pam(&editor.pam)?,
            editor: editor.clone(),
        })
    }

    fn pam(&self, direction: ScanDirection) -> &Regex {
        match direction {
            ScanDirection::Direct => &self.direct,
            ScanDirection::ReverseComplement => &self.reverse,
        }
    }
}

/// true when the canonical AG/GT sits at its fixed offset
pub fn has_splice_dinucleotide(seq: &str, site: SpliceSite) -> bool {
    let (offset, expected) = match site {
        SpliceSite::Acceptor => ACCEPTOR_DINUCLEOTIDE,
        SpliceSite::Donor => DONOR_DINUCLEOTIDE,
    };

    seq.get(offset..offset + expected.len())
        .map(|d| d.eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

/// overlap with the coding side of the window and collateral bases in it
fn cds_overlap(seq: &[u8], site: SpliceSite, window: (usize, usize), base: u8) -> (usize, usize) {
    let (ws, we) = window;
    let span = match site {
        SpliceSite::Acceptor if we >= ACCEPTOR_CDS_BOUNDARY => ACCEPTOR_CDS_BOUNDARY..we + 1,
        SpliceSite::Donor if ws <= DONOR_CDS_BOUNDARY => ws..DONOR_CDS_BOUNDARY + 1,
        _ => return (0, 0),
    };

    let collateral = seq[span.clone()]
        .iter()
        .filter(|b| b.to_ascii_uppercase() == base)
        .count();

    (span.len(), collateral)
}

/// every guide that puts the splice-site base inside the editing window
pub fn design_sgrna(seq: &str, editor: &CompiledEditor, site: SpliceSite) -> Vec<SgrnaInfo> {
    if !seq.is_ascii() || !has_splice_dinucleotide(seq, site) {
        return Vec::new();
    }

    let rule = SiteRule::get(site, editor.editor.editor_type);
    let (win_start, win_end) = (editor.editor.window_start, editor.editor.window_end);
    let t = rule.target;
    let bytes = seq.as_bytes();

    let mut guides = Vec::new();
    for (pam_start, pam_end) in find_overlapping(editor.pam(rule.direction), seq) {
        let (gs, ge) = match rule.direction {
            ScanDirection::ReverseComplement => (pam_end, pam_end + GUIDE_LENGTH),
            ScanDirection::Direct => {
                if pam_start < GUIDE_LENGTH {
                    continue;
                }
                (pam_start - GUIDE_LENGTH, pam_start)
            }
        };

        if ge > seq.len() || !(gs <= t && t < ge) {
            continue;
        }

        let (ws, we) = match rule.direction {
            ScanDirection::ReverseComplement => (gs + win_start - 1, gs + win_end - 1),
            ScanDirection::Direct => (ge - win_end, ge - win_start),
        };
        if !(ws <= t && t <= we) {
            continue;
        }

        let spacer = &seq[gs..ge];
        let pam = &seq[pam_start..pam_end];
        let (target_sequence, actual_sequence, target_pos) = match rule.direction {
            ScanDirection::ReverseComplement => (
                format!("{}+{}", pam, spacer),
                to_rna_reverse_complement(spacer),
                t - gs + 1,
            ),
            ScanDirection::Direct => (format!("{}+{}", spacer, pam), to_rna(spacer), ge - t),
        };

        let (overlap, collateral) = cds_overlap(bytes, site, (ws, we), rule.collateral_base);

        guides.push(SgrnaInfo {
            target_sequence,
            spacer_sequence: spacer.to_string(),
            actual_sequence,
            start_in_sequence: gs,
            end_in_sequence: ge,
            target_pos_in_sgrna: target_pos,
            overlap_between_cds_and_editing_window: overlap,
            possible_unintended_edited_base_count: collateral,
        });
    }

    guides
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor(pam: &str, start: usize, end: usize, kind: EditorType) -> CompiledEditor {
        let be = BaseEditor::new("test", pam, start, end, kind).unwrap();
        CompiledEditor::new(&be).unwrap()
    }

    fn summary(g: &SgrnaInfo) -> (usize, usize, usize, usize, usize) {
        (
            g.start_in_sequence,
            g.end_in_sequence,
            g.target_pos_in_sgrna,
            g.overlap_between_cds_and_editing_window,
            g.possible_unintended_edited_base_count,
        )
    }

    #[test]
    fn test_rule_table_is_complete() {
        for site in SpliceSite::ALL {
            for kind in [EditorType::Cbe, EditorType::Abe] {
                let rule = SiteRule::get(site, kind);
                assert_eq!((rule.site, rule.editor_type), (site, kind));
            }
        }
    }

    #[test]
    fn test_cbe_acceptor_three_guides() {
        let seq = "NNNCCCCCNNNNNNNNNNNNNNNAGGGNNNNNNNNNNNNNNNNNNNNNNN";
        let guides = design_sgrna(seq, &editor("NGG", 17, 19, EditorType::Cbe), SpliceSite::Acceptor);

        assert_eq!(guides.len(), 3);
        assert_eq!(summary(&guides[0]), (6, 26, 19, 0, 0));
        assert_eq!(summary(&guides[1]), (7, 27, 18, 1, 1));
        assert_eq!(summary(&guides[2]), (8, 28, 17, 2, 2));

        assert_eq!(guides[0].target_sequence, "CCC+CCNNNNNNNNNNNNNNNAGG");
        assert_eq!(guides[0].spacer_sequence, "CCNNNNNNNNNNNNNNNAGG");
        assert_eq!(guides[0].actual_sequence, "CCUNNNNNNNNNNNNNNNGG");
        assert_eq!(guides[1].actual_sequence, "CCCUNNNNNNNNNNNNNNNG");
        assert_eq!(guides[2].actual_sequence, "NCCCUNNNNNNNNNNNNNNN");
    }

    #[test]
    fn test_cbe_acceptor_single_guide() {
        let seq = "NNNNCCCNNNNNNNNNNNNNNNNAGNNNNNNNNNNNNNNNNNNNNNNNNN";
        let guides = design_sgrna(seq, &editor("NGG", 17, 19, EditorType::Cbe), SpliceSite::Acceptor);

        assert_eq!(guides.len(), 1);
        assert_eq!(summary(&guides[0]), (7, 27, 18, 1, 0));
        assert_eq!(guides[0].spacer_sequence, "NNNNNNNNNNNNNNNNAGNN");
        assert_eq!(guides[0].actual_sequence, "NNCUNNNNNNNNNNNNNNNN");
    }

    #[test]
    fn test_cbe_donor_single_guide() {
        let seq = "NNNNNCCCNNNNNNNNNNNNNNNNNGTNNNNNNNNNNNNNNNNNNNNNNN";
        let guides = design_sgrna(seq, &editor("NGG", 17, 19, EditorType::Cbe), SpliceSite::Donor);

        assert_eq!(guides.len(), 1);
        assert_eq!(summary(&guides[0]), (8, 28, 18, 1, 0));
        assert_eq!(guides[0].spacer_sequence, "NNNNNNNNNNNNNNNNNGTN");
        assert_eq!(guides[0].actual_sequence, "NACNNNNNNNNNNNNNNNNN");
    }

    #[test]
    fn test_abe_acceptor_reads_pam_downstream() {
        let seq = format!("{}AGA{}AGG{}", "N".repeat(23), "N".repeat(12), "N".repeat(9));
        let guides = design_sgrna(&seq, &editor("NGG", 13, 17, EditorType::Abe), SpliceSite::Acceptor);

        assert_eq!(guides.len(), 1);
        assert_eq!(summary(&guides[0]), (18, 38, 15, 1, 1));
        assert_eq!(guides[0].target_sequence, "NNNNNAGANNNNNNNNNNNN+AGG");
        assert_eq!(guides[0].actual_sequence, "NNNNNAGANNNNNNNNNNNN");
    }

    #[test]
    fn test_abe_donor_reads_pam_upstream() {
        let seq = format!("{}CCA{}TGT{}", "N".repeat(9), "N".repeat(12), "N".repeat(23));
        let guides = design_sgrna(&seq, &editor("NGG", 13, 17, EditorType::Abe), SpliceSite::Donor);

        assert_eq!(guides.len(), 1);
        assert_eq!(summary(&guides[0]), (12, 32, 15, 1, 1));
        assert_eq!(guides[0].target_sequence, "CCA+NNNNNNNNNNNNTGTNNNNN");
        assert_eq!(guides[0].actual_sequence, "NNNNNACANNNNNNNNNNNN");
    }

    #[test]
    fn test_gate_rejects_missing_dinucleotide() {
        let seq = "NNNCCCCCNNNNNNNNNNNNNNNTGGGNNNNNNNNNNNNNNNNNNNNNNN";
        let cbe = editor("NGG", 17, 19, EditorType::Cbe);

        assert!(design_sgrna(seq, &cbe, SpliceSite::Acceptor).is_empty());
        assert!(design_sgrna(seq, &cbe, SpliceSite::Donor).is_empty());
        assert!(design_sgrna("", &cbe, SpliceSite::Acceptor).is_empty());
    }

    #[test]
    fn test_gate_is_case_insensitive() {
        let seq = "nnncccccnnnnnnnnnnnnnnnagggnnnnnnnnnnnnnnnnnnnnnnn";
        let guides = design_sgrna(seq, &editor("NGG", 17, 19, EditorType::Cbe), SpliceSite::Acceptor);

        assert_eq!(guides.len(), 3);
        assert_eq!(guides[2].possible_unintended_edited_base_count, 2);
    }

    #[test]
    fn test_guides_are_contained_and_cover_target() {
        let seq = "ACCCAGTCCAGGCCTGCCCAGCTAGGTCTGGACCAGGTAAGCCCAGGTGG";
        for rule in SITE_RULES {
            let be = editor("NG", 1, 20, rule.editor_type);
            let guides = design_sgrna(seq, &be, rule.site);
            assert!(!guides.is_empty());

            for guide in guides {
                assert!(guide.start_in_sequence < guide.end_in_sequence);
                assert!(guide.end_in_sequence <= seq.len());
                assert_eq!(guide.end_in_sequence - guide.start_in_sequence, GUIDE_LENGTH);
                assert!(guide.start_in_sequence <= rule.target);
                assert!(rule.target < guide.end_in_sequence);
                assert!((1..=GUIDE_LENGTH).contains(&guide.target_pos_in_sgrna));
            }
        }
    }
}
