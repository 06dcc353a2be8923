//! The reparse-reason record.
//!
//! Pass N proposes hypotheses about why assignment failed; pass N+1 is
//! driven with the same record as read-only input. Entries are additive: a
//! key, once set, is never removed within a pass; finalization may retract
//! extension entries a seq remap has superseded.
use crate::types::FailedResidue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Target of a non-polymer or branched remap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSeqTarget {
    pub chain_id: String,
    pub seq_id: i32,
    pub comp_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reasons {
    /// Use label numbering instead of auth numbering globally.
    pub label_seq_scheme: Option<bool>,
    /// Global `test seq id -> auth seq id` shift.
    pub seq_id_remap: Option<BTreeMap<i32, i32>>,
    /// Per-chain seq-id remaps.
    pub chain_seq_id_remap: Option<BTreeMap<String, BTreeMap<i32, i32>>>,
    /// Per-chain remaps for residues accepted beyond the polymer bounds.
    pub ext_chain_seq_id_remap: Option<BTreeMap<String, BTreeMap<i32, i32>>>,
    /// `(comp, seq)` of a restraint row -> non-polymer entity position.
    pub non_poly_remap: Option<BTreeMap<String, BTreeMap<i32, ChainSeqTarget>>>,
    pub branched_remap: Option<BTreeMap<String, BTreeMap<i32, ChainSeqTarget>>>,
    /// Restraint chain tag -> coordinate chain id.
    pub chain_id_remap: Option<BTreeMap<String, String>>,
    /// Primary restraint chain tag -> clones sharing its coordinate chain.
    pub chain_id_clone: Option<BTreeMap<String, Vec<String>>>,
    /// Coordinate chain id -> synthesized duplicates for exact NOEs.
    pub model_chain_id_ext: Option<BTreeMap<String, Vec<String>>>,
    /// `comp:atom` -> concrete atom set, user-declared ambiguous groups.
    pub ambig_atom_id_remap: Option<BTreeMap<String, Vec<String>>>,
    /// `comp:atom` -> single atom id.
    pub unambig_atom_id_remap: Option<BTreeMap<String, String>>,
    /// Residues that never resolved, carried verbatim for extension.
    pub extend_seq_scheme: Option<Vec<FailedResidue>>,
    /// Positions whose numbering is only locally consistent.
    pub local_seq_scheme: Option<Vec<(String, i32)>>,
    /// Dihedral bounds arrive swapped (lower > upper, both positive).
    pub dihed_unusual_order: Option<bool>,
}

impl Reasons {
    pub fn new() -> Self {
        Reasons::default()
    }

    pub fn is_empty(&self) -> bool {
        self.label_seq_scheme.is_none()
            && self.seq_id_remap.is_none()
            && self.chain_seq_id_remap.is_none()
            && self.ext_chain_seq_id_remap.is_none()
            && self.non_poly_remap.is_none()
            && self.branched_remap.is_none()
            && self.chain_id_remap.is_none()
            && self.chain_id_clone.is_none()
            && self.model_chain_id_ext.is_none()
            && self.ambig_atom_id_remap.is_none()
            && self.unambig_atom_id_remap.is_none()
            && self.extend_seq_scheme.is_none()
            && self.local_seq_scheme.is_none()
            && self.dihed_unusual_order.is_none()
    }

    pub fn set_label_seq_scheme(&mut self) {
        self.label_seq_scheme.get_or_insert(true);
    }

    pub fn add_seq_id_remap(&mut self, test_seq_id: i32, auth_seq_id: i32) {
        self.seq_id_remap
            .get_or_insert_with(BTreeMap::new)
            .entry(test_seq_id)
            .or_insert(auth_seq_id);
    }

    pub fn add_chain_seq_id_remap(&mut self, chain_tag: &str, test_seq_id: i32, auth_seq_id: i32) {
        self.chain_seq_id_remap
            .get_or_insert_with(BTreeMap::new)
            .entry(chain_tag.to_string())
            .or_default()
            .entry(test_seq_id)
            .or_insert(auth_seq_id);
    }

    pub fn add_ext_chain_seq_id_remap(
        &mut self,
        chain_tag: &str,
        test_seq_id: i32,
        auth_seq_id: i32,
    ) {
        self.ext_chain_seq_id_remap
            .get_or_insert_with(BTreeMap::new)
            .entry(chain_tag.to_string())
            .or_default()
            .entry(test_seq_id)
            .or_insert(auth_seq_id);
    }

    pub fn add_non_poly_remap(&mut self, comp_id: &str, seq_id: i32, target: ChainSeqTarget) {
        self.non_poly_remap
            .get_or_insert_with(BTreeMap::new)
            .entry(comp_id.to_string())
            .or_default()
            .entry(seq_id)
            .or_insert(target);
    }

    pub fn add_branched_remap(&mut self, comp_id: &str, seq_id: i32, target: ChainSeqTarget) {
        self.branched_remap
            .get_or_insert_with(BTreeMap::new)
            .entry(comp_id.to_string())
            .or_default()
            .entry(seq_id)
            .or_insert(target);
    }

    pub fn add_chain_id_remap(&mut self, chain_tag: &str, ref_chain_id: &str) {
        self.chain_id_remap
            .get_or_insert_with(BTreeMap::new)
            .entry(chain_tag.to_string())
            .or_insert_with(|| ref_chain_id.to_string());
    }

    pub fn add_chain_id_clone(&mut self, primary: &str, clones: Vec<String>) {
        self.chain_id_clone
            .get_or_insert_with(BTreeMap::new)
            .entry(primary.to_string())
            .or_insert(clones);
    }

    pub fn add_model_chain_id_ext(&mut self, ref_chain_id: &str, copies: Vec<String>) {
        self.model_chain_id_ext
            .get_or_insert_with(BTreeMap::new)
            .entry(ref_chain_id.to_string())
            .or_insert(copies);
    }

    pub fn add_ambig_atom_id_remap(&mut self, comp_id: &str, atom_id: &str, atoms: Vec<String>) {
        self.ambig_atom_id_remap
            .get_or_insert_with(BTreeMap::new)
            .entry(format!("{comp_id}:{atom_id}"))
            .or_insert(atoms);
    }

    pub fn add_unambig_atom_id_remap(&mut self, comp_id: &str, atom_id: &str, atom: &str) {
        self.unambig_atom_id_remap
            .get_or_insert_with(BTreeMap::new)
            .entry(format!("{comp_id}:{atom_id}"))
            .or_insert_with(|| atom.to_string());
    }

    pub fn set_extend_seq_scheme(&mut self, failed: Vec<FailedResidue>) {
        if self.extend_seq_scheme.is_none() && !failed.is_empty() {
            self.extend_seq_scheme = Some(failed);
        }
    }

    pub fn add_local_seq_scheme(&mut self, chain_tag: &str, seq_id: i32) {
        let list = self.local_seq_scheme.get_or_insert_with(Vec::new);
        let key = (chain_tag.to_string(), seq_id);
        if !list.contains(&key) {
            list.push(key);
        }
    }

    pub fn set_dihed_unusual_order(&mut self) {
        self.dihed_unusual_order.get_or_insert(true);
    }

    /// Retract per-residue extension entries once a seq remap explains the
    /// same positions. The alignment evidence outranks the residue-level
    /// as-is acceptance, and the remap must reach those positions on the
    /// next pass. `failed` is filtered the same way.
    pub fn retract_extensions_explained_by_remap(&mut self, failed: &mut Vec<FailedResidue>) {
        let global: BTreeSet<i32> = self
            .seq_id_remap
            .as_ref()
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default();
        let per_chain: BTreeMap<String, BTreeSet<i32>> = self
            .chain_seq_id_remap
            .as_ref()
            .map(|m| {
                m.iter()
                    .map(|(tag, remap)| (tag.clone(), remap.keys().copied().collect()))
                    .collect()
            })
            .unwrap_or_default();
        if global.is_empty() && per_chain.is_empty() {
            return;
        }
        let covered = |tag: &str, seq: i32| -> bool {
            global.contains(&seq)
                || per_chain.get(tag).map(|s| s.contains(&seq)).unwrap_or(false)
        };

        if let Some(ext) = self.ext_chain_seq_id_remap.as_mut() {
            for (tag, remap) in ext.iter_mut() {
                let tag = tag.clone();
                remap.retain(|seq, _| !covered(&tag, *seq));
            }
            ext.retain(|_, remap| !remap.is_empty());
        }
        if self
            .ext_chain_seq_id_remap
            .as_ref()
            .map(|m| m.is_empty())
            .unwrap_or(false)
        {
            self.ext_chain_seq_id_remap = None;
        }

        if let Some(local) = self.local_seq_scheme.as_mut() {
            local.retain(|(tag, seq)| !covered(tag, *seq));
        }
        if self
            .local_seq_scheme
            .as_ref()
            .map(|v| v.is_empty())
            .unwrap_or(false)
        {
            self.local_seq_scheme = None;
        }

        failed.retain(|f| !covered(&f.chain_tag, f.seq_id));
    }

    /// Remapped auth seq id for a `(chain tag, seq id)` reference, applying
    /// the per-chain tables before the global one.
    pub fn remapped_seq_id(&self, chain_tag: Option<&str>, seq_id: i32) -> Option<i32> {
        if let (Some(tag), Some(ext)) = (chain_tag, &self.ext_chain_seq_id_remap) {
            if let Some(hit) = ext.get(tag).and_then(|m| m.get(&seq_id)) {
                return Some(*hit);
            }
        }
        if let (Some(tag), Some(per_chain)) = (chain_tag, &self.chain_seq_id_remap) {
            if let Some(hit) = per_chain.get(tag).and_then(|m| m.get(&seq_id)) {
                return Some(*hit);
            }
        }
        self.seq_id_remap.as_ref().and_then(|m| m.get(&seq_id)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_additive_entries() {
        let mut reasons = Reasons::new();
        assert!(reasons.is_empty());
        reasons.add_seq_id_remap(1, 10);
        reasons.add_seq_id_remap(1, 99); // first write wins
        assert_eq!(reasons.seq_id_remap.as_ref().unwrap()[&1], 10);
        assert!(!reasons.is_empty());

        reasons.set_label_seq_scheme();
        reasons.set_label_seq_scheme();
        assert_eq!(reasons.label_seq_scheme, Some(true));
    }

    #[test]
    fn test_retract_extensions_covered_by_remap() {
        let mut reasons = Reasons::new();
        reasons.add_seq_id_remap(1, 10);
        reasons.add_ext_chain_seq_id_remap("1", 1, 1);
        reasons.add_ext_chain_seq_id_remap("1", 50, 50);
        reasons.add_local_seq_scheme("1", 1);
        let mut failed = vec![
            FailedResidue {
                chain_tag: "1".to_string(),
                seq_id: 1,
                comp_id: "ALA".to_string(),
            },
            FailedResidue {
                chain_tag: "1".to_string(),
                seq_id: 50,
                comp_id: "GLY".to_string(),
            },
        ];

        reasons.retract_extensions_explained_by_remap(&mut failed);

        let ext = reasons.ext_chain_seq_id_remap.as_ref().unwrap();
        assert_eq!(ext["1"].keys().copied().collect::<Vec<_>>(), vec![50]);
        assert!(reasons.local_seq_scheme.is_none());
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].seq_id, 50);
    }

    #[test]
    fn test_remap_priority() {
        let mut reasons = Reasons::new();
        reasons.add_seq_id_remap(5, 100);
        reasons.add_chain_seq_id_remap("A", 5, 200);
        reasons.add_ext_chain_seq_id_remap("A", 5, 300);
        // ext wins over per-chain wins over global
        assert_eq!(reasons.remapped_seq_id(Some("A"), 5), Some(300));
        assert_eq!(reasons.remapped_seq_id(Some("B"), 5), Some(100));
        assert_eq!(reasons.remapped_seq_id(None, 5), Some(100));
    }

    #[test]
    fn test_roundtrip_json() {
        let mut reasons = Reasons::new();
        reasons.add_chain_id_remap("1", "A");
        reasons.add_non_poly_remap(
            "ZN",
            900,
            ChainSeqTarget {
                chain_id: "C".to_string(),
                seq_id: 200,
                comp_id: "ZN".to_string(),
            },
        );
        let text = serde_json::to_string(&reasons).unwrap();
        let back: Reasons = serde_json::from_str(&text).unwrap();
        assert_eq!(back.chain_id_remap.unwrap()["1"], "A");
        assert_eq!(back.non_poly_remap.unwrap()["ZN"][&900].seq_id, 200);
    }
}
