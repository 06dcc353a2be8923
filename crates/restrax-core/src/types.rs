//! Shared data model for the reconciliation engine.
//!
//! The coordinate side (polymer chains, non-polymer entities, per-residue
//! atom sites) is a column-oriented mirror of what the mmCIF `atom_site`
//! loop carries; the restraint side (reconstructed polymers, alignments,
//! chain assignments) is accreted during parsing.
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use strum::{Display, EnumString};

/// Polymer classification from `entity_poly.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum PolymerType {
    #[strum(serialize = "polypeptide")]
    Polypeptide,
    #[strum(serialize = "polyribonucleotide")]
    Polyribonucleotide,
    #[strum(serialize = "polydeoxyribonucleotide")]
    Polydeoxyribonucleotide,
    #[strum(serialize = "carbohydrate")]
    Carbohydrate,
}

/// One polymer chain of the coordinate model with dual numbering.
///
/// Positions are parallel vectors: `auth_seq_ids[i]` (as deposited, `None`
/// on a gap), `seq_ids[i]` (label scheme, 1-based), `comp_ids[i]`
/// (canonical code) and `auth_comp_ids[i]` (as-deposited code).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolymerChain {
    pub auth_chain_id: String,
    pub polymer_type: PolymerType,
    pub auth_seq_ids: Vec<Option<i32>>,
    pub seq_ids: Vec<i32>,
    pub comp_ids: Vec<String>,
    pub auth_comp_ids: Vec<String>,
    pub alt_comp_ids: Option<Vec<String>>,
    /// Sequence-identical symmetry mates, self excluded.
    pub identical_chain_ids: Vec<String>,
    pub gap_in_auth_seq: bool,
    pub ambig_auth_seq_ids: HashSet<i32>,
}

impl PolymerChain {
    pub fn len(&self) -> usize {
        self.seq_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq_ids.is_empty()
    }

    /// Position of an auth seq id, skipping gap columns.
    pub fn index_of_auth_seq(&self, auth_seq_id: i32) -> Option<usize> {
        self.auth_seq_ids
            .iter()
            .position(|s| *s == Some(auth_seq_id))
    }

    pub fn index_of_label_seq(&self, seq_id: i32) -> Option<usize> {
        self.seq_ids.iter().position(|s| *s == seq_id)
    }

    pub fn comp_id_at_auth_seq(&self, auth_seq_id: i32) -> Option<&str> {
        self.index_of_auth_seq(auth_seq_id)
            .map(|i| self.comp_ids[i].as_str())
    }

    /// Smallest and largest real (non-gap) auth seq ids.
    pub fn auth_seq_bounds(&self) -> Option<(i32, i32)> {
        let mut it = self.auth_seq_ids.iter().flatten();
        let first = *it.next()?;
        let last = self.auth_seq_ids.iter().flatten().last().copied()?;
        Some((first.min(last), first.max(last)))
    }
}

/// A single-residue ligand, ion, water or cofactor. Branched
/// oligosaccharides may carry more than one position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonPolyEntity {
    pub auth_chain_id: String,
    pub auth_seq_ids: Vec<i32>,
    pub comp_ids: Vec<String>,
    pub auth_comp_ids: Vec<String>,
    /// Alternative annotation identity, when the entry was re-annotated.
    pub alt_comp_id: Option<String>,
    pub alt_auth_seq_id: Option<i32>,
    pub is_branched: bool,
}

impl NonPolyEntity {
    pub fn len(&self) -> usize {
        self.auth_seq_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.auth_seq_ids.is_empty()
    }
}

/// Atoms observed at one `(chain, seq)` position of the coordinate model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordAtomSite {
    pub chain_id: String,
    pub seq_id: i32,
    pub comp_id: String,
    pub atom_ids: Vec<String>,
    /// Alternate atom names seen for the same position (e.g. `auth_atom_id`
    /// differing from `label_atom_id`), keyed by the canonical name.
    pub alt_atom_ids: HashMap<String, String>,
}

impl CoordAtomSite {
    pub fn has_atom(&self, atom_id: &str) -> bool {
        self.atom_ids.iter().any(|a| a == atom_id)
            || self.alt_atom_ids.values().any(|a| a == atom_id)
    }
}

/// A ligand that annotation split into several residues. Keyed by the
/// original `(chain, seq, comp)`; each part lists the atoms it kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitLigandPart {
    pub auth_seq_id: i32,
    pub comp_id: String,
    pub atom_ids: Vec<String>,
}

/// Result of aligning one reconstructed polymer against one coordinate
/// polymer. `mid_code[i]` is `'|'` on a match, `' '` on a mismatch and
/// `'-'` on a gap column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeqAlignment {
    pub ref_chain_id: String,
    pub test_chain_id: String,
    pub length: usize,
    pub matched: usize,
    pub conflict: usize,
    pub ref_seq_ids: Vec<Option<i32>>,
    pub test_seq_ids: Vec<Option<i32>>,
    pub mid_code: String,
    pub ref_code: String,
    pub test_code: String,
    pub sequence_coverage: f64,
}

/// A surviving test-chain to ref-chain correspondence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainAssignment {
    pub ref_chain_id: String,
    pub test_chain_id: String,
    pub conflict: usize,
    pub sequence_coverage: f64,
}

/// Per chain-tag polymer record accreted while parsing a restraint file.
/// Comp id `"."` means "unknown at the time of observation".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconstructedPolymer {
    pub chain_tag: String,
    pub seq_ids: Vec<i32>,
    pub comp_ids: Vec<String>,
    pub auth_comp_ids: Vec<String>,
}

impl ReconstructedPolymer {
    pub fn new(chain_tag: &str) -> Self {
        ReconstructedPolymer {
            chain_tag: chain_tag.to_string(),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.seq_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq_ids.is_empty()
    }

    pub fn comp_id_at(&self, seq_id: i32) -> Option<&str> {
        self.seq_ids
            .iter()
            .position(|s| *s == seq_id)
            .map(|i| self.comp_ids[i].as_str())
    }
}

/// One candidate produced by the residue/atom resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidueCandidate {
    pub auth_chain_id: String,
    pub auth_seq_id: i32,
    pub comp_id: String,
    pub is_polymer: bool,
}

/// A fully resolved atom appended to the engine's selection set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomSelection {
    pub chain_id: String,
    pub seq_id: i32,
    pub comp_id: String,
    pub atom_id: String,
    pub asis: bool,
}

/// A residue the resolver could not place, kept for the reparse pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FailedResidue {
    pub chain_tag: String,
    pub seq_id: i32,
    pub comp_id: String,
}

/// Restraint subtype, the primary save-frame key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
pub enum RestraintSubtype {
    #[strum(serialize = "dist")]
    Dist,
    #[strum(serialize = "dihed")]
    Dihed,
    #[strum(serialize = "rdc")]
    Rdc,
    #[strum(serialize = "pcs")]
    Pcs,
    #[strum(serialize = "jcoup")]
    JCoup,
    #[strum(serialize = "peak")]
    PeakVolume,
}
