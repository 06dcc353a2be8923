//! Immutable view of the coordinate model.
//!
//! Built once at startup, read-only afterwards. Everything the resolver
//! needs to answer "does this residue/atom exist, and under which
//! numbering" lives here: polymer chains with dual numbering, non-polymer
//! entities, per-residue atom sites, the auth<->label sequence maps, the
//! split-ligand table and the unobserved residue/atom sets.
use crate::ccd::CcdLookup;
use crate::types::{CoordAtomSite, NonPolyEntity, PolymerChain, PolymerType, SplitLigandPart};
use itertools::Itertools;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct CoordinateIndex {
    polymers: Vec<PolymerChain>,
    alt_polymers: Vec<PolymerChain>,
    non_polys: Vec<NonPolyEntity>,
    branched: Vec<NonPolyEntity>,
    atom_sites: HashMap<(String, i32), CoordAtomSite>,
    atom_sites_by_comp: HashMap<(String, i32, String), CoordAtomSite>,
    unobserved_residues: HashSet<(String, i32)>,
    unobserved_atoms: HashSet<(String, i32, String)>,
    auth_to_label: HashMap<(String, i32), (String, i32)>,
    label_to_auth: HashMap<(String, i32), (String, i32)>,
    split_ligands: HashMap<(String, i32, String), Vec<SplitLigandPart>>,
    /// As-deposited component id -> canonical id for re-annotated ligands.
    modified_comps: HashMap<String, String>,
    identical: HashMap<String, HashSet<String>>,
    atom_coords: HashMap<(String, i32, String), [f64; 3]>,
}

impl CoordinateIndex {
    pub fn builder() -> CoordinateIndexBuilder {
        CoordinateIndexBuilder::default()
    }

    pub fn polymers(&self) -> &[PolymerChain] {
        &self.polymers
    }

    pub fn alt_polymers(&self) -> &[PolymerChain] {
        &self.alt_polymers
    }

    pub fn non_polys(&self) -> &[NonPolyEntity] {
        &self.non_polys
    }

    pub fn branched(&self) -> &[NonPolyEntity] {
        &self.branched
    }

    pub fn get_chain(&self, auth_chain_id: &str) -> Option<&PolymerChain> {
        self.polymers.iter().find(|p| p.auth_chain_id == auth_chain_id)
    }

    pub fn get_non_poly(&self, auth_chain_id: &str) -> Option<&NonPolyEntity> {
        self.non_polys
            .iter()
            .find(|n| n.auth_chain_id == auth_chain_id)
    }

    /// Atom site keyed preferentially by the `(chain, seq, comp)` triple,
    /// falling back to `(chain, seq)` when the component is unspecified.
    pub fn get_atom_site(
        &self,
        chain_id: &str,
        seq_id: i32,
        comp_id: Option<&str>,
    ) -> Option<&CoordAtomSite> {
        if let Some(comp) = comp_id {
            let key = (chain_id.to_string(), seq_id, comp.to_string());
            if let Some(site) = self.atom_sites_by_comp.get(&key) {
                return Some(site);
            }
        }
        self.atom_sites.get(&(chain_id.to_string(), seq_id))
    }

    pub fn is_unobserved_residue(&self, chain_id: &str, seq_id: i32) -> bool {
        self.unobserved_residues
            .contains(&(chain_id.to_string(), seq_id))
    }

    pub fn is_unobserved_atom(&self, chain_id: &str, seq_id: i32, atom_id: &str) -> bool {
        self.unobserved_atoms
            .contains(&(chain_id.to_string(), seq_id, atom_id.to_string()))
    }

    pub fn auth_to_label(&self, chain_id: &str, auth_seq_id: i32) -> Option<(String, i32)> {
        self.auth_to_label
            .get(&(chain_id.to_string(), auth_seq_id))
            .cloned()
    }

    pub fn label_to_auth(&self, label_chain_id: &str, label_seq_id: i32) -> Option<(String, i32)> {
        self.label_to_auth
            .get(&(label_chain_id.to_string(), label_seq_id))
            .cloned()
    }

    /// Sequence-identical copies of a chain, itself included.
    pub fn identical_chains(&self, auth_chain_id: &str) -> HashSet<String> {
        self.identical
            .get(auth_chain_id)
            .cloned()
            .unwrap_or_else(|| HashSet::from([auth_chain_id.to_string()]))
    }

    pub fn split_ligand(
        &self,
        chain_id: &str,
        seq_id: i32,
        orig_comp_id: &str,
    ) -> Option<&[SplitLigandPart]> {
        self.split_ligands
            .get(&(chain_id.to_string(), seq_id, orig_comp_id.to_string()))
            .map(|v| v.as_slice())
    }

    pub fn split_ligand_any_chain(
        &self,
        seq_id: i32,
        orig_comp_id: &str,
    ) -> Option<(&str, &[SplitLigandPart])> {
        self.split_ligands
            .iter()
            .find(|((_, s, c), _)| *s == seq_id && c == orig_comp_id)
            .map(|((ch, _, _), v)| (ch.as_str(), v.as_slice()))
    }

    /// Canonical component id for a re-annotated ligand name.
    pub fn translate_ligand_name(&self, auth_comp_id: &str) -> Option<&str> {
        self.modified_comps.get(auth_comp_id).map(|s| s.as_str())
    }

    pub fn atom_coord(&self, chain_id: &str, seq_id: i32, atom_id: &str) -> Option<[f64; 3]> {
        self.atom_coords
            .get(&(chain_id.to_string(), seq_id, atom_id.to_string()))
            .copied()
    }

    /// Distance between the backbone termini of a polymer, used by the
    /// cyclic-polymer heuristic. `None` when either terminal atom is
    /// missing from the model.
    pub fn terminal_gap_distance(&self, chain: &PolymerChain) -> Option<f64> {
        let first = chain.auth_seq_ids.iter().flatten().next()?;
        let last = chain.auth_seq_ids.iter().flatten().last()?;
        let (head, tail) = match chain.polymer_type {
            PolymerType::Polypeptide => ("N", "C"),
            _ => ("P", "O3'"),
        };
        let a = self.atom_coord(&chain.auth_chain_id, *first, head)?;
        let b = self.atom_coord(&chain.auth_chain_id, *last, tail)?;
        let d2 = (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2);
        Some(d2.sqrt())
    }
}

/// Incremental builder; the reader (or a test) feeds residues and atoms in
/// file order, `build` derives the label numbering, gap flags, identity
/// groups and lookup maps.
#[derive(Debug, Default)]
pub struct CoordinateIndexBuilder {
    polymers: Vec<PolymerChain>,
    alt_polymers: Vec<PolymerChain>,
    non_polys: Vec<NonPolyEntity>,
    branched: Vec<NonPolyEntity>,
    atom_sites: Vec<CoordAtomSite>,
    unobserved_residues: HashSet<(String, i32)>,
    unobserved_atoms: HashSet<(String, i32, String)>,
    split_ligands: HashMap<(String, i32, String), Vec<SplitLigandPart>>,
    modified_comps: HashMap<String, String>,
    atom_coords: HashMap<(String, i32, String), [f64; 3]>,
}

impl CoordinateIndexBuilder {
    /// Append one polymer residue. Residues of a chain must arrive in
    /// deposition order; label seq ids are assigned 1-based per chain.
    pub fn polymer_residue(
        mut self,
        auth_chain_id: &str,
        polymer_type: PolymerType,
        auth_seq_id: Option<i32>,
        comp_id: &str,
        auth_comp_id: Option<&str>,
    ) -> Self {
        let idx = match self
            .polymers
            .iter()
            .position(|p| p.auth_chain_id == auth_chain_id)
        {
            Some(i) => i,
            None => {
                self.polymers.push(PolymerChain {
                    auth_chain_id: auth_chain_id.to_string(),
                    polymer_type,
                    auth_seq_ids: Vec::new(),
                    seq_ids: Vec::new(),
                    comp_ids: Vec::new(),
                    auth_comp_ids: Vec::new(),
                    alt_comp_ids: None,
                    identical_chain_ids: Vec::new(),
                    gap_in_auth_seq: false,
                    ambig_auth_seq_ids: HashSet::new(),
                });
                self.polymers.len() - 1
            }
        };
        let chain = &mut self.polymers[idx];
        let label = chain.seq_ids.len() as i32 + 1;
        chain.auth_seq_ids.push(auth_seq_id);
        chain.seq_ids.push(label);
        chain.comp_ids.push(comp_id.to_string());
        chain
            .auth_comp_ids
            .push(auth_comp_id.unwrap_or(comp_id).to_string());
        if let Some(auth) = auth_comp_id.filter(|a| *a != comp_id) {
            self.modified_comps
                .insert(auth.to_string(), comp_id.to_string());
        }
        self
    }

    /// A secondary polymer annotation for the same chain ids (`altPolySeq`).
    pub fn alt_polymer(mut self, chain: PolymerChain) -> Self {
        self.alt_polymers.push(chain);
        self
    }

    pub fn non_poly(
        mut self,
        auth_chain_id: &str,
        auth_seq_id: i32,
        comp_id: &str,
        auth_comp_id: Option<&str>,
    ) -> Self {
        self.non_polys.push(NonPolyEntity {
            auth_chain_id: auth_chain_id.to_string(),
            auth_seq_ids: vec![auth_seq_id],
            comp_ids: vec![comp_id.to_string()],
            auth_comp_ids: vec![auth_comp_id.unwrap_or(comp_id).to_string()],
            alt_comp_id: None,
            alt_auth_seq_id: None,
            is_branched: false,
        });
        if let Some(auth) = auth_comp_id {
            if auth != comp_id {
                self.modified_comps
                    .insert(auth.to_string(), comp_id.to_string());
            }
        }
        self
    }

    pub fn branched_entity(mut self, entity: NonPolyEntity) -> Self {
        self.branched.push(entity);
        self
    }

    /// Atoms observed at one position, with their coordinates.
    pub fn atom_site(
        mut self,
        chain_id: &str,
        seq_id: i32,
        comp_id: &str,
        atoms: &[(&str, [f64; 3])],
    ) -> Self {
        let site = CoordAtomSite {
            chain_id: chain_id.to_string(),
            seq_id,
            comp_id: comp_id.to_string(),
            atom_ids: atoms.iter().map(|(a, _)| a.to_string()).collect(),
            alt_atom_ids: HashMap::new(),
        };
        for (atom, xyz) in atoms {
            self.atom_coords
                .insert((chain_id.to_string(), seq_id, atom.to_string()), *xyz);
        }
        self.atom_sites.push(site);
        self
    }

    /// Shorthand without coordinates (origin-placed), for tests and for
    /// readers that drop positions.
    pub fn atom_site_names(self, chain_id: &str, seq_id: i32, comp_id: &str, atoms: &[&str]) -> Self {
        let with_coords: Vec<(&str, [f64; 3])> =
            atoms.iter().map(|a| (*a, [0.0, 0.0, 0.0])).collect();
        self.atom_site(chain_id, seq_id, comp_id, &with_coords)
    }

    pub fn unobserved_residue(mut self, chain_id: &str, seq_id: i32) -> Self {
        self.unobserved_residues
            .insert((chain_id.to_string(), seq_id));
        self
    }

    pub fn unobserved_atom(mut self, chain_id: &str, seq_id: i32, atom_id: &str) -> Self {
        self.unobserved_atoms
            .insert((chain_id.to_string(), seq_id, atom_id.to_string()));
        self
    }

    pub fn split_ligand(
        mut self,
        chain_id: &str,
        seq_id: i32,
        orig_comp_id: &str,
        parts: Vec<SplitLigandPart>,
    ) -> Self {
        self.split_ligands
            .insert((chain_id.to_string(), seq_id, orig_comp_id.to_string()), parts);
        self
    }

    pub fn modified_comp(mut self, auth_comp_id: &str, comp_id: &str) -> Self {
        self.modified_comps
            .insert(auth_comp_id.to_string(), comp_id.to_string());
        self
    }

    pub fn build(mut self) -> CoordinateIndex {
        // gap flags and ambiguous auth ids
        for chain in &mut self.polymers {
            let real: Vec<i32> = chain.auth_seq_ids.iter().flatten().copied().collect();
            chain.gap_in_auth_seq = chain.auth_seq_ids.iter().any(|s| s.is_none())
                || real.windows(2).any(|w| w[1] != w[0] + 1);
            chain.ambig_auth_seq_ids = real
                .iter()
                .duplicates()
                .copied()
                .collect();
        }

        // sequence-identity groups
        let mut identical: HashMap<String, HashSet<String>> = HashMap::new();
        for (a, b) in self.polymers.iter().tuple_combinations() {
            if a.comp_ids == b.comp_ids {
                identical
                    .entry(a.auth_chain_id.clone())
                    .or_default()
                    .insert(b.auth_chain_id.clone());
                identical
                    .entry(b.auth_chain_id.clone())
                    .or_default()
                    .insert(a.auth_chain_id.clone());
            }
        }
        for chain in &mut self.polymers {
            if let Some(set) = identical.get_mut(&chain.auth_chain_id) {
                set.insert(chain.auth_chain_id.clone());
                chain.identical_chain_ids = set
                    .iter()
                    .filter(|c| **c != chain.auth_chain_id)
                    .cloned()
                    .sorted()
                    .collect();
            }
        }

        // auth <-> label maps; the label chain id is the auth chain id here
        // since the reader already merges label asym ids
        let mut auth_to_label = HashMap::new();
        let mut label_to_auth = HashMap::new();
        for chain in &self.polymers {
            for (auth, label) in chain.auth_seq_ids.iter().zip(&chain.seq_ids) {
                if let Some(auth) = auth {
                    auth_to_label.insert(
                        (chain.auth_chain_id.clone(), *auth),
                        (chain.auth_chain_id.clone(), *label),
                    );
                    label_to_auth.insert(
                        (chain.auth_chain_id.clone(), *label),
                        (chain.auth_chain_id.clone(), *auth),
                    );
                }
            }
        }

        let mut atom_sites = HashMap::new();
        let mut atom_sites_by_comp = HashMap::new();
        for site in self.atom_sites {
            atom_sites_by_comp.insert(
                (site.chain_id.clone(), site.seq_id, site.comp_id.clone()),
                site.clone(),
            );
            atom_sites.insert((site.chain_id.clone(), site.seq_id), site);
        }

        CoordinateIndex {
            polymers: self.polymers,
            alt_polymers: self.alt_polymers,
            non_polys: self.non_polys,
            branched: self.branched,
            atom_sites,
            atom_sites_by_comp,
            unobserved_residues: self.unobserved_residues,
            unobserved_atoms: self.unobserved_atoms,
            auth_to_label,
            label_to_auth,
            split_ligands: self.split_ligands,
            modified_comps: self.modified_comps,
            identical,
            atom_coords: self.atom_coords,
        }
    }
}

/// Quick polymer-type classification from the component ids of a chain.
pub fn classify_polymer_type(ccd: &CcdLookup, comp_ids: &[String]) -> PolymerType {
    let mut peptide = 0usize;
    let mut dna = 0usize;
    let mut rna = 0usize;
    let mut carb = 0usize;
    for comp in comp_ids {
        let t = ccd.type_of_comp_id(comp);
        if t.peptide {
            peptide += 1;
        } else if t.nucleotide {
            match comp.as_str() {
                "DA" | "DC" | "DG" | "DT" => dna += 1,
                _ => rna += 1,
            }
        } else if t.carbohydrate {
            carb += 1;
        }
    }
    if carb > peptide && carb > dna && carb > rna {
        PolymerType::Carbohydrate
    } else if peptide >= dna && peptide >= rna {
        PolymerType::Polypeptide
    } else if dna >= rna {
        PolymerType::Polydeoxyribonucleotide
    } else {
        PolymerType::Polyribonucleotide
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_index() -> CoordinateIndex {
        CoordinateIndex::builder()
            .polymer_residue("A", PolymerType::Polypeptide, Some(10), "ALA", None)
            .polymer_residue("A", PolymerType::Polypeptide, Some(11), "CYS", None)
            .polymer_residue("A", PolymerType::Polypeptide, Some(13), "ASP", None)
            .polymer_residue("B", PolymerType::Polypeptide, Some(10), "ALA", None)
            .polymer_residue("B", PolymerType::Polypeptide, Some(11), "CYS", None)
            .polymer_residue("B", PolymerType::Polypeptide, Some(13), "ASP", None)
            .non_poly("C", 200, "ZN", None)
            .atom_site_names("A", 10, "ALA", &["N", "CA", "C", "O", "CB"])
            .atom_site_names("A", 11, "CYS", &["N", "CA", "C", "O", "CB", "SG"])
            .unobserved_residue("A", 12)
            .build()
    }

    #[test]
    fn test_lookup_paths() {
        let index = small_index();
        assert!(index.get_chain("A").is_some());
        assert!(index.get_chain("Z").is_none());
        assert!(index.get_non_poly("C").is_some());
        assert!(index.get_atom_site("A", 10, Some("ALA")).is_some());
        assert!(index.get_atom_site("A", 10, None).is_some());
        assert!(index.is_unobserved_residue("A", 12));
        assert!(!index.is_unobserved_residue("A", 10));
    }

    #[test]
    fn test_gap_flag_and_label_map() {
        let index = small_index();
        let chain = index.get_chain("A").unwrap();
        assert!(chain.gap_in_auth_seq);
        assert_eq!(index.auth_to_label("A", 13), Some(("A".to_string(), 3)));
        assert_eq!(index.label_to_auth("A", 3), Some(("A".to_string(), 13)));
    }

    #[test]
    fn test_classify_carbohydrate_chain() {
        let ccd = CcdLookup::new();
        let comps: Vec<String> = ["NAG", "BMA", "MAN"].iter().map(|s| s.to_string()).collect();
        assert_eq!(classify_polymer_type(&ccd, &comps), PolymerType::Carbohydrate);
    }

    #[test]
    fn test_identical_chains() {
        let index = small_index();
        let mates = index.identical_chains("A");
        assert!(mates.contains("A"));
        assert!(mates.contains("B"));
        let lone = index.identical_chains("C");
        assert_eq!(lone.len(), 1);
    }
}
