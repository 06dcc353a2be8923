//! Chain assignment: decide which coordinate chain each restraint-file
//! chain tag corresponds to, from the full alignment matrix.
use super::align::{align_polymer, consistent_offset};
use crate::coord::CoordinateIndex;
use crate::types::{ChainAssignment, ReconstructedPolymer, SeqAlignment};
use itertools::Itertools;
use log::debug;
use std::collections::BTreeMap;

/// Assignments with best-alignment coverage below this are trimmed.
pub const LOW_SEQ_COVERAGE: f64 = 0.3;
/// Backbone terminus gap (angstrom) below which a polymer is cyclic.
pub const CYCLIC_GAP_DISTANCE: f64 = 3.0;
/// Minimum matched run for a split-chain interval to count.
const MIN_SPLIT_INTERVAL: usize = 3;

/// Remap and clone hypotheses proposed by the assigner; the engine merges
/// them into the reasons for the next pass.
#[derive(Debug, Default, Clone)]
pub struct AssignProposals {
    /// test chain tag -> (test seq id -> ref auth seq id)
    pub chain_seq_id_remap: BTreeMap<String, BTreeMap<i32, i32>>,
    /// test chain tag -> ref chain id, for coerced orphans
    pub chain_id_remap: BTreeMap<String, String>,
    /// test chain tag -> clones sharing the same ref chain (exact NOEs)
    pub chain_id_clone: BTreeMap<String, Vec<String>>,
    /// ref chain id -> duplicated model chain ids to synthesize
    pub model_chain_id_ext: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default)]
pub struct ChainAssignOutcome {
    pub alignments: Vec<SeqAlignment>,
    pub assignments: Vec<ChainAssignment>,
    pub messages: Vec<String>,
    pub proposals: AssignProposals,
}

pub fn assign_chains(
    index: &CoordinateIndex,
    reconstructed: &[ReconstructedPolymer],
) -> ChainAssignOutcome {
    let mut out = ChainAssignOutcome::default();
    let polymers = index.polymers();
    if polymers.is_empty() {
        return out;
    }

    for test in reconstructed {
        if test.is_empty() {
            continue;
        }
        for ref_chain in polymers {
            out.alignments.push(align_polymer(ref_chain, test));
        }
    }

    // best ref per test chain: matched - conflict, then coverage, then id
    let mut best_per_test: BTreeMap<String, SeqAlignment> = BTreeMap::new();
    for test in reconstructed {
        let candidates: Vec<&SeqAlignment> = out
            .alignments
            .iter()
            .filter(|a| a.test_chain_id == test.chain_tag)
            .collect();
        let Some(best) = candidates.iter().copied().sorted_by(|a, b| {
            let ka = a.matched as i64 - a.conflict as i64;
            let kb = b.matched as i64 - b.conflict as i64;
            kb.cmp(&ka)
                .then(
                    b.sequence_coverage
                        .partial_cmp(&a.sequence_coverage)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
                .then(a.ref_chain_id.cmp(&b.ref_chain_id))
        }).next() else {
            continue;
        };
        best_per_test.insert(test.chain_tag.clone(), best.clone());
    }

    // split test chains: several strong refs over disjoint seq-id intervals
    for test in reconstructed {
        let strong: Vec<(&SeqAlignment, (i32, i32))> = out
            .alignments
            .iter()
            .filter(|a| {
                a.test_chain_id == test.chain_tag
                    && a.conflict == 0
                    && a.matched >= MIN_SPLIT_INTERVAL
            })
            .filter_map(|a| matched_test_interval(a).map(|iv| (a, iv)))
            .collect();
        if strong.len() < 2 {
            continue;
        }
        let disjoint = strong
            .iter()
            .tuple_combinations()
            .all(|((_, a), (_, b))| a.1 < b.0 || b.1 < a.0);
        if !disjoint {
            // overlapping intervals: keep separate assignments, do not guess
            continue;
        }
        let best_matched = best_per_test
            .get(&test.chain_tag)
            .map(|a| a.matched)
            .unwrap_or(0);
        let union: usize = strong.iter().map(|(a, _)| a.matched).sum();
        if union <= best_matched {
            continue;
        }
        let parts: Vec<String> = strong
            .iter()
            .map(|(a, iv)| format!("{}:{}..{}", a.ref_chain_id, iv.0, iv.1))
            .collect();
        out.messages.push(format!(
            "Concatenated sequence: restraint chain {} spans coordinate chains {}",
            test.chain_tag,
            parts.join(", ")
        ));
        let mut remap = BTreeMap::new();
        for (a, _) in &strong {
            for (col, mid) in a.mid_code.chars().enumerate() {
                if mid != '|' {
                    continue;
                }
                if let (Some(r), Some(t)) = (a.ref_seq_ids[col], a.test_seq_ids[col]) {
                    remap.insert(t, r);
                }
            }
        }
        out.proposals
            .chain_seq_id_remap
            .insert(test.chain_tag.clone(), remap);
    }

    // primary assignments with trimming
    for (test_tag, best) in &best_per_test {
        if best.sequence_coverage < LOW_SEQ_COVERAGE {
            out.messages.push(format!(
                "Low sequence coverage: restraint chain {} best matches coordinate chain {} at {:.2}",
                test_tag, best.ref_chain_id, best.sequence_coverage
            ));
            continue;
        }
        out.assignments.push(ChainAssignment {
            ref_chain_id: best.ref_chain_id.clone(),
            test_chain_id: test_tag.clone(),
            conflict: best.conflict,
            sequence_coverage: best.sequence_coverage,
        });
        if test_tag != &best.ref_chain_id {
            out.proposals
                .chain_id_remap
                .insert(test_tag.clone(), best.ref_chain_id.clone());
        }
        if let Some(offset) = consistent_offset(best) {
            if offset != 0 {
                let remap: BTreeMap<i32, i32> = best
                    .test_seq_ids
                    .iter()
                    .flatten()
                    .map(|t| (*t, t + offset))
                    .collect();
                out.proposals
                    .chain_seq_id_remap
                    .entry(test_tag.clone())
                    .or_insert(remap);
            }
        }
    }

    // cyclic polymers: wrap seq ids past the last residue
    for assignment in &out.assignments {
        let Some(ref_chain) = index.get_chain(&assignment.ref_chain_id) else {
            continue;
        };
        let Some(gap) = index.terminal_gap_distance(ref_chain) else {
            continue;
        };
        if gap >= CYCLIC_GAP_DISTANCE {
            continue;
        }
        debug!(
            "chain {} is cyclic (terminal gap {:.2} A)",
            ref_chain.auth_chain_id, gap
        );
        let Some((first, last)) = ref_chain.auth_seq_bounds() else {
            continue;
        };
        let period = last - first + 1;
        let remap = out
            .proposals
            .chain_seq_id_remap
            .entry(assignment.test_chain_id.clone())
            .or_default();
        for wrapped in 1..=period {
            remap.entry(last + wrapped).or_insert(first + wrapped - 1);
        }
    }

    // exact-NOE duplicates: identical test chains on one ref chain
    let by_ref: BTreeMap<String, Vec<String>> = out
        .assignments
        .iter()
        .filter(|a| a.conflict == 0)
        .map(|a| (a.ref_chain_id.clone(), a.test_chain_id.clone()))
        .into_group_map()
        .into_iter()
        .collect();
    for (ref_chain_id, mut test_chains) in by_ref {
        if test_chains.len() < 2 {
            continue;
        }
        test_chains.sort();
        let primary = test_chains[0].clone();
        let clones: Vec<String> = test_chains[1..].to_vec();
        out.messages.push(format!(
            "Exact NOE chain duplication: {} cloned onto {} for coordinate chain {}",
            primary,
            clones.join(", "),
            ref_chain_id
        ));
        out.proposals.chain_id_clone.insert(primary, clones.clone());
        out.proposals.model_chain_id_ext.insert(ref_chain_id, clones);
    }

    out
}

/// The inclusive test seq-id interval covered by matched columns.
fn matched_test_interval(alignment: &SeqAlignment) -> Option<(i32, i32)> {
    let matched: Vec<i32> = alignment
        .mid_code
        .chars()
        .enumerate()
        .filter(|(_, m)| *m == '|')
        .filter_map(|(col, _)| alignment.test_seq_ids[col])
        .collect();
    let first = *matched.iter().min()?;
    let last = *matched.iter().max()?;
    Some((first, last))
}
