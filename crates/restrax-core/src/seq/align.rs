//! Pairwise sequence alignment between a reconstructed polymer and a
//! coordinate polymer.
//!
//! A plain Needleman-Wunsch over one-letter codes with coarse scoring and a
//! mild gap penalty; ties resolve toward the diagonal so that contiguous
//! match runs win over scattered ones.
use crate::nomenclature::comp_to_one_letter;
use crate::types::{PolymerChain, ReconstructedPolymer, SeqAlignment};

const MATCH: i32 = 2;
const MISMATCH: i32 = -2;
const GAP: i32 = -1;

/// Alignment column pairing: indices into the two input sequences, `None`
/// on a gap.
type Columns = Vec<(Option<usize>, Option<usize>)>;

fn needleman_wunsch(a: &[char], b: &[char]) -> Columns {
    let n = a.len();
    let m = b.len();
    let mut score = vec![vec![0i32; m + 1]; n + 1];
    for i in 0..=n {
        score[i][0] = GAP * i as i32;
    }
    for j in 0..=m {
        score[0][j] = GAP * j as i32;
    }
    for i in 1..=n {
        for j in 1..=m {
            let s = if chars_match(a[i - 1], b[j - 1]) {
                MATCH
            } else {
                MISMATCH
            };
            score[i][j] = (score[i - 1][j - 1] + s)
                .max(score[i - 1][j] + GAP)
                .max(score[i][j - 1] + GAP);
        }
    }

    // traceback, diagonal preferred on ties
    let mut cols: Columns = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        if i > 0 && j > 0 {
            let s = if chars_match(a[i - 1], b[j - 1]) {
                MATCH
            } else {
                MISMATCH
            };
            if score[i][j] == score[i - 1][j - 1] + s {
                cols.push((Some(i - 1), Some(j - 1)));
                i -= 1;
                j -= 1;
                continue;
            }
        }
        if i > 0 && score[i][j] == score[i - 1][j] + GAP {
            cols.push((Some(i - 1), None));
            i -= 1;
        } else {
            cols.push((None, Some(j - 1)));
            j -= 1;
        }
    }
    cols.reverse();
    cols
}

/// `.` is "unknown at observation time" and matches anything.
fn chars_match(a: char, b: char) -> bool {
    a == b || a == '.' || b == '.'
}

/// Align a reconstructed polymer (test) against a coordinate polymer (ref).
pub fn align_polymer(ref_chain: &PolymerChain, test: &ReconstructedPolymer) -> SeqAlignment {
    let ref_codes: Vec<char> = ref_chain
        .comp_ids
        .iter()
        .map(|c| comp_to_one_letter(c))
        .collect();
    let test_codes: Vec<char> = test.comp_ids.iter().map(|c| comp_to_one_letter(c)).collect();
    let cols = needleman_wunsch(&ref_codes, &test_codes);

    let mut matched = 0usize;
    let mut conflict = 0usize;
    let mut mid = String::with_capacity(cols.len());
    let mut ref_code = String::with_capacity(cols.len());
    let mut test_code = String::with_capacity(cols.len());
    let mut ref_seq_ids: Vec<Option<i32>> = Vec::with_capacity(cols.len());
    let mut test_seq_ids: Vec<Option<i32>> = Vec::with_capacity(cols.len());

    for (ri, ti) in &cols {
        match (ri, ti) {
            (Some(ri), Some(ti)) => {
                let rc = ref_codes[*ri];
                let tc = test_codes[*ti];
                if chars_match(rc, tc) {
                    matched += 1;
                    mid.push('|');
                } else {
                    conflict += 1;
                    mid.push(' ');
                }
                ref_code.push(rc);
                test_code.push(tc);
                ref_seq_ids.push(ref_chain.auth_seq_ids[*ri]);
                test_seq_ids.push(Some(test.seq_ids[*ti]));
            }
            (Some(ri), None) => {
                mid.push('-');
                ref_code.push(ref_codes[*ri]);
                test_code.push('-');
                ref_seq_ids.push(ref_chain.auth_seq_ids[*ri]);
                test_seq_ids.push(None);
            }
            (None, Some(ti)) => {
                mid.push('-');
                ref_code.push('-');
                test_code.push(test_codes[*ti]);
                ref_seq_ids.push(None);
                test_seq_ids.push(Some(test.seq_ids[*ti]));
            }
            (None, None) => unreachable!(),
        }
    }

    let coverage = if test.is_empty() {
        0.0
    } else {
        matched as f64 / test.len() as f64
    };

    SeqAlignment {
        ref_chain_id: ref_chain.auth_chain_id.clone(),
        test_chain_id: test.chain_tag.clone(),
        length: cols.len(),
        matched,
        conflict,
        ref_seq_ids,
        test_seq_ids,
        mid_code: mid,
        ref_code,
        test_code,
        sequence_coverage: coverage,
    }
}

/// Alignment accepted only when the conflict count stays within `c`.
pub fn align_with_conflicts(
    ref_chain: &PolymerChain,
    test: &ReconstructedPolymer,
    c: usize,
) -> Option<SeqAlignment> {
    let alignment = align_polymer(ref_chain, test);
    (alignment.conflict <= c).then_some(alignment)
}

/// The consistent seq-id offset over matched columns, if one exists.
/// `Some(k)` means `test_seq + k == ref_auth_seq` everywhere they match.
pub fn consistent_offset(alignment: &SeqAlignment) -> Option<i32> {
    let mut offset: Option<i32> = None;
    let mut any = false;
    for (col, mid) in alignment.mid_code.chars().enumerate() {
        if mid != '|' {
            continue;
        }
        let (Some(r), Some(t)) = (alignment.ref_seq_ids[col], alignment.test_seq_ids[col]) else {
            continue;
        };
        any = true;
        match offset {
            None => offset = Some(r - t),
            Some(k) if k != r - t => return None,
            _ => {}
        }
    }
    if any {
        offset
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PolymerType;
    use std::collections::HashSet;

    fn chain(id: &str, start: i32, comps: &[&str]) -> PolymerChain {
        PolymerChain {
            auth_chain_id: id.to_string(),
            polymer_type: PolymerType::Polypeptide,
            auth_seq_ids: (0..comps.len()).map(|i| Some(start + i as i32)).collect(),
            seq_ids: (1..=comps.len() as i32).collect(),
            comp_ids: comps.iter().map(|c| c.to_string()).collect(),
            auth_comp_ids: comps.iter().map(|c| c.to_string()).collect(),
            alt_comp_ids: None,
            identical_chain_ids: vec![],
            gap_in_auth_seq: false,
            ambig_auth_seq_ids: HashSet::new(),
        }
    }

    fn test_polymer(tag: &str, start: i32, comps: &[&str]) -> ReconstructedPolymer {
        ReconstructedPolymer {
            chain_tag: tag.to_string(),
            seq_ids: (0..comps.len()).map(|i| start + i as i32).collect(),
            comp_ids: comps.iter().map(|c| c.to_string()).collect(),
            auth_comp_ids: comps.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_exact_alignment() {
        let r = chain("A", 10, &["ALA", "CYS", "ASP", "GLU", "PHE"]);
        let t = test_polymer("1", 1, &["ALA", "CYS", "ASP", "GLU", "PHE"]);
        let a = align_polymer(&r, &t);
        assert_eq!(a.matched, 5);
        assert_eq!(a.conflict, 0);
        assert_eq!(a.mid_code, "|||||");
        assert_eq!(a.sequence_coverage, 1.0);
        assert_eq!(consistent_offset(&a), Some(9));
    }

    #[test]
    fn test_mismatch_and_gap() {
        let r = chain("A", 1, &["ALA", "CYS", "ASP", "GLU"]);
        let t = test_polymer("1", 1, &["ALA", "GLY", "ASP", "GLU"]);
        let a = align_polymer(&r, &t);
        assert_eq!(a.matched, 3);
        assert_eq!(a.conflict, 1);
        assert_eq!(a.mid_code, "| ||");

        let shorter = test_polymer("1", 1, &["ALA", "ASP", "GLU"]);
        let g = align_polymer(&r, &shorter);
        assert_eq!(g.matched, 3);
        assert!(g.mid_code.contains('-'));
        assert_eq!(g.test_seq_ids.iter().filter(|s| s.is_none()).count(), 1);
    }

    #[test]
    fn test_conflict_budget() {
        let r = chain("A", 1, &["ALA", "CYS", "ASP"]);
        let t = test_polymer("1", 1, &["ALA", "GLY", "ASP"]);
        assert!(align_with_conflicts(&r, &t, 0).is_none());
        assert!(align_with_conflicts(&r, &t, 1).is_some());
    }

    #[test]
    fn test_mid_code_symmetric() {
        // labeling swaps but the mid-code string must not
        let r = chain("A", 1, &["ALA", "CYS", "ASP", "GLU", "PHE"]);
        let t = test_polymer("1", 1, &["ALA", "CYS", "GLY", "GLU", "PHE"]);
        let ab = align_polymer(&r, &t);

        let r2 = chain("1", 1, &["ALA", "CYS", "GLY", "GLU", "PHE"]);
        let t2 = test_polymer("A", 1, &["ALA", "CYS", "ASP", "GLU", "PHE"]);
        let ba = align_polymer(&r2, &t2);
        assert_eq!(ab.mid_code, ba.mid_code);
    }

    #[test]
    fn test_unknown_matches_anything() {
        let r = chain("A", 1, &["ALA", "CYS", "ASP"]);
        let t = test_polymer("1", 1, &["ALA", ".", "ASP"]);
        let a = align_polymer(&r, &t);
        assert_eq!(a.matched, 3);
        assert_eq!(a.conflict, 0);
    }
}
