//! Abstract coordinate input.
//!
//! The engine never touches a structure file directly; a [`CoordReader`]
//! supplies typed `atom_site` rows and the index is derived from them. A
//! `pdbtbx`-backed reader covers mmCIF and PDB input.
use super::index::{classify_polymer_type, CoordinateIndex, CoordinateIndexBuilder};
use crate::ccd::CcdLookup;
use crate::types::NonPolyEntity;
use pdbtbx::PDB;

/// One row of the (flattened) atom_site loop.
#[derive(Debug, Clone)]
pub struct AtomSiteRow {
    pub chain_id: String,
    pub auth_seq_id: i32,
    pub comp_id: String,
    pub atom_id: String,
    pub is_hetero: bool,
    pub coord: [f64; 3],
}

pub trait CoordReader {
    fn atom_site_rows(&self) -> Vec<AtomSiteRow>;

    fn exptl_method(&self) -> Option<String> {
        None
    }
}

/// Reader over an already-parsed `pdbtbx` model.
pub struct PdbtbxReader {
    pdb: PDB,
}

impl PdbtbxReader {
    pub fn new(pdb: PDB) -> Self {
        PdbtbxReader { pdb }
    }

    pub fn open(path: &str) -> Result<Self, String> {
        match pdbtbx::open(path) {
            Ok((pdb, _errors)) => Ok(PdbtbxReader { pdb }),
            Err(errors) => Err(errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")),
        }
    }
}

impl CoordReader for PdbtbxReader {
    // PDB -> Chain -> Residue -> Atom; flatten in one pass
    fn atom_site_rows(&self) -> Vec<AtomSiteRow> {
        self.pdb
            .chains()
            .flat_map(|chain| {
                let chain_id = chain.id().to_string();
                chain.residues().flat_map(move |residue| {
                    let (res_number, _insertion_code) = residue.id();
                    let auth_seq_id = res_number as i32;
                    let comp_id = residue.name().unwrap_or_default().to_string();
                    let chain_id = chain_id.clone();
                    residue.atoms().map(move |atom| {
                        let (x, y, z) = atom.pos();
                        AtomSiteRow {
                            chain_id: chain_id.clone(),
                            auth_seq_id,
                            comp_id: comp_id.clone(),
                            atom_id: atom.name().to_string(),
                            is_hetero: atom.hetero(),
                            coord: [x, y, z],
                        }
                    })
                })
            })
            .collect()
    }
}

/// Build the immutable index from any reader.
///
/// Residues whose component the CCD classifies as polymeric and that are
/// not HETATM records become polymer positions; everything else becomes a
/// non-polymer entity. Label numbering is assigned 1-based per chain in
/// deposition order.
pub fn index_from_reader(reader: &dyn CoordReader, ccd: &CcdLookup) -> CoordinateIndex {
    let rows = reader.atom_site_rows();

    // group rows into residues, preserving order
    let mut residues: Vec<(String, i32, String, bool, Vec<(String, [f64; 3])>)> = Vec::new();
    for row in rows {
        match residues.last_mut() {
            Some((chain, seq, comp, _, atoms))
                if *chain == row.chain_id && *seq == row.auth_seq_id && *comp == row.comp_id =>
            {
                atoms.push((row.atom_id, row.coord));
            }
            _ => residues.push((
                row.chain_id,
                row.auth_seq_id,
                row.comp_id,
                row.is_hetero,
                vec![(row.atom_id, row.coord)],
            )),
        }
    }

    // chain-level polymer typing from the component census
    let mut chain_comps: Vec<(String, Vec<String>)> = Vec::new();
    for (chain, _, comp, hetero, _) in &residues {
        if *hetero {
            continue;
        }
        match chain_comps.iter_mut().find(|(c, _)| c == chain) {
            Some((_, comps)) => comps.push(comp.clone()),
            None => chain_comps.push((chain.clone(), vec![comp.clone()])),
        }
    }

    let mut builder = CoordinateIndex::builder();
    // hetero sugar residues on one chain form one branched entity
    let mut glycans: Vec<(String, Vec<i32>, Vec<String>)> = Vec::new();
    for (chain, seq, comp, hetero, atoms) in &residues {
        let t = ccd.type_of_comp_id(comp);
        let polymeric = !*hetero && (t.peptide || t.nucleotide || t.carbohydrate);
        if polymeric {
            let comps = chain_comps
                .iter()
                .find(|(c, _)| c == chain)
                .map(|(_, comps)| comps.as_slice())
                .unwrap_or(&[]);
            let ptype = classify_polymer_type(ccd, comps);
            builder = builder.polymer_residue(chain, ptype, Some(*seq), comp, None);
        } else if t.carbohydrate {
            match glycans.iter_mut().find(|(c, _, _)| c == chain) {
                Some((_, seqs, comps)) => {
                    seqs.push(*seq);
                    comps.push(comp.clone());
                }
                None => glycans.push((chain.clone(), vec![*seq], vec![comp.clone()])),
            }
        } else {
            builder = builder.non_poly(chain, *seq, comp, None);
        }
        let named: Vec<(&str, [f64; 3])> = atoms.iter().map(|(a, c)| (a.as_str(), *c)).collect();
        builder = builder.atom_site(chain, *seq, comp, &named);
    }
    for (chain, seqs, comps) in glycans {
        builder = builder.branched_entity(NonPolyEntity {
            auth_chain_id: chain,
            auth_seq_ids: seqs,
            auth_comp_ids: comps.clone(),
            comp_ids: comps,
            alt_comp_id: None,
            alt_auth_seq_id: None,
            is_branched: true,
        });
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeReader(Vec<AtomSiteRow>);

    impl CoordReader for FakeReader {
        fn atom_site_rows(&self) -> Vec<AtomSiteRow> {
            self.0.clone()
        }
    }

    fn row(chain: &str, seq: i32, comp: &str, atom: &str, hetero: bool) -> AtomSiteRow {
        AtomSiteRow {
            chain_id: chain.to_string(),
            auth_seq_id: seq,
            comp_id: comp.to_string(),
            atom_id: atom.to_string(),
            is_hetero: hetero,
            coord: [0.0, 0.0, 0.0],
        }
    }

    #[test]
    fn test_index_from_reader() {
        let reader = FakeReader(vec![
            row("A", 1, "MET", "N", false),
            row("A", 1, "MET", "CA", false),
            row("A", 2, "ALA", "N", false),
            row("A", 2, "ALA", "CA", false),
            row("B", 500, "ZN", "ZN", true),
        ]);
        let ccd = CcdLookup::new();
        let index = index_from_reader(&reader, &ccd);
        let chain = index.get_chain("A").unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.seq_ids, vec![1, 2]);
        assert!(index.get_non_poly("B").is_some());
        assert!(index.get_atom_site("A", 2, Some("ALA")).unwrap().has_atom("CA"));
    }

    #[test]
    fn test_hetero_sugars_form_branched_entity() {
        let reader = FakeReader(vec![
            row("A", 1, "MET", "CA", false),
            row("C", 1, "NAG", "C1", true),
            row("C", 2, "NAG", "C1", true),
            row("C", 3, "BMA", "C1", true),
        ]);
        let ccd = CcdLookup::new();
        let index = index_from_reader(&reader, &ccd);
        assert!(index.get_non_poly("C").is_none());
        assert_eq!(index.branched().len(), 1);
        let glycan = &index.branched()[0];
        assert!(glycan.is_branched);
        assert_eq!(glycan.auth_seq_ids, vec![1, 2, 3]);
        assert_eq!(glycan.comp_ids, ["NAG", "NAG", "BMA"]);
    }
}
