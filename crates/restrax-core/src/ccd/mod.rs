//! Chemical Component Dictionary lookup.
//!
//! Wraps the static tables in [`tables`] behind a lookup object that keeps a
//! one-deep cache of the most recently queried component. The cache makes
//! the lookup non-reentrant; the engine is single-threaded so this is fine,
//! but callers must not hold a borrow across another CCD call.
mod tables;

pub(crate) use tables::{backbone_atom_ids, element_symbols, CompKind};

use std::cell::RefCell;
use tables::{
    aromatic_ring_atoms, c_terminal_atom_ids, comp_table, leaving_atom_ids, n_terminal_atom_ids,
};

/// Classification triple returned by [`CcdLookup::type_of_comp_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompType {
    pub peptide: bool,
    pub nucleotide: bool,
    pub carbohydrate: bool,
}

#[derive(Default)]
pub struct CcdLookup {
    // (comp_id, table key) of the last successful query
    last: RefCell<Option<(String, &'static str)>>,
}

impl CcdLookup {
    pub fn new() -> Self {
        CcdLookup::default()
    }

    fn entry(&self, comp_id: &str) -> Option<&'static tables::CompEntry> {
        let table = comp_table();
        if let Some((cached, key)) = self.last.borrow().as_ref() {
            if cached == comp_id {
                return table.get(key);
            }
        }
        let (key, entry) = table.get_key_value(comp_id)?;
        *self.last.borrow_mut() = Some((comp_id.to_string(), key));
        Some(entry)
    }

    pub fn has_comp(&self, comp_id: &str) -> bool {
        self.entry(comp_id).is_some()
    }

    /// All atoms of a component, hydrogens included.
    pub fn atom_ids(&self, comp_id: &str) -> Option<&'static [&'static str]> {
        self.entry(comp_id).map(|e| e.atom_ids)
    }

    pub fn peptide_like(&self, comp_id: &str) -> bool {
        self.entry(comp_id)
            .map(|e| e.kind == CompKind::Peptide)
            .unwrap_or(false)
    }

    pub fn type_of_comp_id(&self, comp_id: &str) -> CompType {
        match self.entry(comp_id).map(|e| e.kind) {
            Some(CompKind::Peptide) => CompType {
                peptide: true,
                ..Default::default()
            },
            Some(CompKind::Dna) | Some(CompKind::Rna) => CompType {
                nucleotide: true,
                ..Default::default()
            },
            Some(CompKind::Carbohydrate) => CompType {
                carbohydrate: true,
                ..Default::default()
            },
            _ => CompType::default(),
        }
    }

    pub(crate) fn kind_of(&self, comp_id: &str) -> Option<CompKind> {
        self.entry(comp_id).map(|e| e.kind)
    }

    /// Atoms legal only when the residue sits at a chain terminus.
    pub fn is_terminal_atom(&self, comp_id: &str, atom_id: &str) -> bool {
        match self.entry(comp_id).map(|e| e.kind) {
            Some(kind) => {
                n_terminal_atom_ids(kind).contains(&atom_id)
                    || c_terminal_atom_ids(kind).contains(&atom_id)
            }
            None => false,
        }
    }

    pub fn is_leaving_atom(&self, comp_id: &str, atom_id: &str) -> bool {
        match self.entry(comp_id).map(|e| e.kind) {
            Some(kind) => leaving_atom_ids(kind).contains(&atom_id),
            None => false,
        }
    }

    /// Heavy atoms to average over for a centroid-style selection: ring
    /// atoms for aromatics, the whole side chain otherwise.
    pub fn get_centroid_atoms(&self, comp_id: &str) -> Vec<&'static str> {
        if let Some(ring) = aromatic_ring_atoms().get(comp_id) {
            return ring.to_vec();
        }
        let Some(entry) = self.entry(comp_id) else {
            return Vec::new();
        };
        let backbone = backbone_atom_ids(entry.kind);
        entry
            .atom_ids
            .iter()
            .filter(|a| !a.starts_with('H') && !backbone.contains(*a))
            .copied()
            .collect()
    }

    /// Reverse lookup: the component whose atom list best covers the given
    /// atom names. Used when the restraint file's residue label is
    /// unparseable. Requires every queried atom to be present; among full
    /// covers the smallest component wins.
    pub fn get_similar_comp_id_from_atom_ids(&self, atom_ids: &[&str]) -> Option<&'static str> {
        if atom_ids.is_empty() {
            return None;
        }
        let mut best: Option<(&'static str, usize)> = None;
        let mut keys: Vec<&&'static str> = comp_table().keys().collect();
        keys.sort();
        for key in keys {
            let entry = &comp_table()[*key];
            if atom_ids.iter().all(|a| entry.atom_ids.contains(a)) {
                let size = entry.atom_ids.len();
                if best.map(|(_, s)| size < s).unwrap_or(true) {
                    best = Some((key, size));
                }
            }
        }
        best.map(|(k, _)| k)
    }

    /// The heavy atom a hydrogen is bonded to, derived from the shared name
    /// stem (HB2 -> CB, HG1 on THR -> OG1, H -> N).
    pub fn bonded_heavy_atom(&self, comp_id: &str, h_atom_id: &str) -> Option<&'static str> {
        let entry = self.entry(comp_id)?;
        if !h_atom_id.starts_with('H') {
            return None;
        }
        if h_atom_id == "H" {
            return entry.atom_ids.iter().find(|a| **a == "N").copied();
        }
        let stem = h_atom_id.trim_start_matches('H');
        // drop a trailing branch digit: HB2 -> B, HG21 -> G2
        let mut candidates: Vec<&str> = vec![stem];
        if stem.len() > 1 && stem.ends_with(|c: char| c.is_ascii_digit()) {
            candidates.push(&stem[..stem.len() - 1]);
        }
        for cand in candidates {
            for heavy in ["C", "N", "O", "S"] {
                let name = format!("{heavy}{cand}");
                if let Some(found) = entry.atom_ids.iter().find(|a| **a == name) {
                    return Some(found);
                }
            }
        }
        None
    }
}
