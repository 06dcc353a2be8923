//! Static chemical-component tables.
//!
//! Atom lists follow PDB v3 nomenclature (hydrogens included) for the
//! canonical amino acids, the eight standard nucleotides, the common
//! terminal caps and a handful of ions/solvent. Everything here is
//! read-only configuration handed to the engine at construction.
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

pub(crate) struct CompEntry {
    pub atom_ids: &'static [&'static str],
    pub kind: CompKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompKind {
    Peptide,
    Dna,
    Rna,
    Carbohydrate,
    NonPoly,
}

static COMP_TABLE: OnceLock<HashMap<&'static str, CompEntry>> = OnceLock::new();

#[rustfmt::skip]
pub(crate) fn comp_table() -> &'static HashMap<&'static str, CompEntry> {
    COMP_TABLE.get_or_init(|| {
        let mut m = HashMap::new();
        let mut pep = |name: &'static str, atoms: &'static [&'static str]| {
            m.insert(name, CompEntry { atom_ids: atoms, kind: CompKind::Peptide });
        };
        pep("ALA", &["N", "CA", "C", "O", "CB",
                     "H", "HA", "HB1", "HB2", "HB3"]);
        pep("ARG", &["N", "CA", "C", "O", "CB", "CG", "CD", "NE", "CZ", "NH1", "NH2",
                     "H", "HA", "HB2", "HB3", "HG2", "HG3", "HD2", "HD3", "HE",
                     "HH11", "HH12", "HH21", "HH22"]);
        pep("ASN", &["N", "CA", "C", "O", "CB", "CG", "OD1", "ND2",
                     "H", "HA", "HB2", "HB3", "HD21", "HD22"]);
        pep("ASP", &["N", "CA", "C", "O", "CB", "CG", "OD1", "OD2",
                     "H", "HA", "HB2", "HB3", "HD2"]);
        pep("CYS", &["N", "CA", "C", "O", "CB", "SG",
                     "H", "HA", "HB2", "HB3", "HG"]);
        pep("GLN", &["N", "CA", "C", "O", "CB", "CG", "CD", "OE1", "NE2",
                     "H", "HA", "HB2", "HB3", "HG2", "HG3", "HE21", "HE22"]);
        pep("GLU", &["N", "CA", "C", "O", "CB", "CG", "CD", "OE1", "OE2",
                     "H", "HA", "HB2", "HB3", "HG2", "HG3", "HE2"]);
        pep("GLY", &["N", "CA", "C", "O",
                     "H", "HA2", "HA3"]);
        pep("HIS", &["N", "CA", "C", "O", "CB", "CG", "ND1", "CD2", "CE1", "NE2",
                     "H", "HA", "HB2", "HB3", "HD1", "HD2", "HE1", "HE2"]);
        pep("ILE", &["N", "CA", "C", "O", "CB", "CG1", "CG2", "CD1",
                     "H", "HA", "HB", "HG12", "HG13", "HG21", "HG22", "HG23",
                     "HD11", "HD12", "HD13"]);
        pep("LEU", &["N", "CA", "C", "O", "CB", "CG", "CD1", "CD2",
                     "H", "HA", "HB2", "HB3", "HG",
                     "HD11", "HD12", "HD13", "HD21", "HD22", "HD23"]);
        pep("LYS", &["N", "CA", "C", "O", "CB", "CG", "CD", "CE", "NZ",
                     "H", "HA", "HB2", "HB3", "HG2", "HG3", "HD2", "HD3",
                     "HE2", "HE3", "HZ1", "HZ2", "HZ3"]);
        pep("MET", &["N", "CA", "C", "O", "CB", "CG", "SD", "CE",
                     "H", "HA", "HB2", "HB3", "HG2", "HG3", "HE1", "HE2", "HE3"]);
        pep("PHE", &["N", "CA", "C", "O", "CB", "CG", "CD1", "CD2", "CE1", "CE2", "CZ",
                     "H", "HA", "HB2", "HB3", "HD1", "HD2", "HE1", "HE2", "HZ"]);
        pep("PRO", &["N", "CA", "C", "O", "CB", "CG", "CD",
                     "HA", "HB2", "HB3", "HG2", "HG3", "HD2", "HD3"]);
        pep("SER", &["N", "CA", "C", "O", "CB", "OG",
                     "H", "HA", "HB2", "HB3", "HG"]);
        pep("THR", &["N", "CA", "C", "O", "CB", "OG1", "CG2",
                     "H", "HA", "HB", "HG1", "HG21", "HG22", "HG23"]);
        pep("TRP", &["N", "CA", "C", "O", "CB", "CG", "CD1", "CD2", "NE1", "CE2",
                     "CE3", "CZ2", "CZ3", "CH2",
                     "H", "HA", "HB2", "HB3", "HD1", "HE1", "HE3", "HZ2", "HZ3", "HH2"]);
        pep("TYR", &["N", "CA", "C", "O", "CB", "CG", "CD1", "CD2", "CE1", "CE2", "CZ", "OH",
                     "H", "HA", "HB2", "HB3", "HD1", "HD2", "HE1", "HE2", "HH"]);
        pep("VAL", &["N", "CA", "C", "O", "CB", "CG1", "CG2",
                     "H", "HA", "HB", "HG11", "HG12", "HG13", "HG21", "HG22", "HG23"]);
        // terminal caps
        pep("ACE", &["C", "O", "CH3", "H1", "H2", "H3"]);
        pep("NH2", &["N", "HN1", "HN2"]);

        let mut rna = |name: &'static str, base: &'static [&'static str]| {
            m.insert(name, CompEntry { atom_ids: base, kind: CompKind::Rna });
        };
        rna("A", &["P", "OP1", "OP2", "O5'", "C5'", "C4'", "O4'", "C3'", "O3'",
                   "C2'", "O2'", "C1'",
                   "N9", "C8", "N7", "C5", "C6", "N6", "N1", "C2", "N3", "C4",
                   "H5'", "H5''", "H4'", "H3'", "H2'", "HO2'", "H1'",
                   "H8", "H61", "H62", "H2"]);
        rna("G", &["P", "OP1", "OP2", "O5'", "C5'", "C4'", "O4'", "C3'", "O3'",
                   "C2'", "O2'", "C1'",
                   "N9", "C8", "N7", "C5", "C6", "O6", "N1", "C2", "N2", "N3", "C4",
                   "H5'", "H5''", "H4'", "H3'", "H2'", "HO2'", "H1'",
                   "H8", "H1", "H21", "H22"]);
        rna("C", &["P", "OP1", "OP2", "O5'", "C5'", "C4'", "O4'", "C3'", "O3'",
                   "C2'", "O2'", "C1'",
                   "N1", "C2", "O2", "N3", "C4", "N4", "C5", "C6",
                   "H5'", "H5''", "H4'", "H3'", "H2'", "HO2'", "H1'",
                   "H41", "H42", "H5", "H6"]);
        rna("U", &["P", "OP1", "OP2", "O5'", "C5'", "C4'", "O4'", "C3'", "O3'",
                   "C2'", "O2'", "C1'",
                   "N1", "C2", "O2", "N3", "C4", "O4", "C5", "C6",
                   "H5'", "H5''", "H4'", "H3'", "H2'", "HO2'", "H1'",
                   "H3", "H5", "H6"]);

        let mut dna = |name: &'static str, base: &'static [&'static str]| {
            m.insert(name, CompEntry { atom_ids: base, kind: CompKind::Dna });
        };
        dna("DA", &["P", "OP1", "OP2", "O5'", "C5'", "C4'", "O4'", "C3'", "O3'",
                    "C2'", "C1'",
                    "N9", "C8", "N7", "C5", "C6", "N6", "N1", "C2", "N3", "C4",
                    "H5'", "H5''", "H4'", "H3'", "H2'", "H2''", "H1'",
                    "H8", "H61", "H62", "H2"]);
        dna("DG", &["P", "OP1", "OP2", "O5'", "C5'", "C4'", "O4'", "C3'", "O3'",
                    "C2'", "C1'",
                    "N9", "C8", "N7", "C5", "C6", "O6", "N1", "C2", "N2", "N3", "C4",
                    "H5'", "H5''", "H4'", "H3'", "H2'", "H2''", "H1'",
                    "H8", "H1", "H21", "H22"]);
        dna("DC", &["P", "OP1", "OP2", "O5'", "C5'", "C4'", "O4'", "C3'", "O3'",
                    "C2'", "C1'",
                    "N1", "C2", "O2", "N3", "C4", "N4", "C5", "C6",
                    "H5'", "H5''", "H4'", "H3'", "H2'", "H2''", "H1'",
                    "H41", "H42", "H5", "H6"]);
        dna("DT", &["P", "OP1", "OP2", "O5'", "C5'", "C4'", "O4'", "C3'", "O3'",
                    "C2'", "C1'",
                    "N1", "C2", "O2", "N3", "C4", "O4", "C5", "C7", "C6",
                    "H5'", "H5''", "H4'", "H3'", "H2'", "H2''", "H1'",
                    "H3", "H71", "H72", "H73", "H6"]);

        let mut carb = |name: &'static str, atoms: &'static [&'static str]| {
            m.insert(name, CompEntry { atom_ids: atoms, kind: CompKind::Carbohydrate });
        };
        carb("NAG", &["C1", "C2", "C3", "C4", "C5", "C6", "C7", "C8",
                      "N2", "O1", "O3", "O4", "O5", "O6", "O7",
                      "H1", "H2", "H3", "H4", "H5", "H61", "H62",
                      "H81", "H82", "H83", "HN2", "HO1", "HO3", "HO4", "HO6"]);
        carb("NDG", &["C1", "C2", "C3", "C4", "C5", "C6", "C7", "C8",
                      "N2", "O1", "O3", "O4", "O5", "O6", "O7",
                      "H1", "H2", "H3", "H4", "H5", "H61", "H62",
                      "H81", "H82", "H83", "HN2", "HO1", "HO3", "HO4", "HO6"]);
        carb("BMA", &["C1", "C2", "C3", "C4", "C5", "C6",
                      "O1", "O2", "O3", "O4", "O5", "O6",
                      "H1", "H2", "H3", "H4", "H5", "H61", "H62",
                      "HO1", "HO2", "HO3", "HO4", "HO6"]);
        carb("MAN", &["C1", "C2", "C3", "C4", "C5", "C6",
                      "O1", "O2", "O3", "O4", "O5", "O6",
                      "H1", "H2", "H3", "H4", "H5", "H61", "H62",
                      "HO1", "HO2", "HO3", "HO4", "HO6"]);
        carb("GLC", &["C1", "C2", "C3", "C4", "C5", "C6",
                      "O1", "O2", "O3", "O4", "O5", "O6",
                      "H1", "H2", "H3", "H4", "H5", "H61", "H62",
                      "HO1", "HO2", "HO3", "HO4", "HO6"]);
        carb("BGC", &["C1", "C2", "C3", "C4", "C5", "C6",
                      "O1", "O2", "O3", "O4", "O5", "O6",
                      "H1", "H2", "H3", "H4", "H5", "H61", "H62",
                      "HO1", "HO2", "HO3", "HO4", "HO6"]);
        carb("GAL", &["C1", "C2", "C3", "C4", "C5", "C6",
                      "O1", "O2", "O3", "O4", "O5", "O6",
                      "H1", "H2", "H3", "H4", "H5", "H61", "H62",
                      "HO1", "HO2", "HO3", "HO4", "HO6"]);
        carb("FUC", &["C1", "C2", "C3", "C4", "C5", "C6",
                      "O1", "O2", "O3", "O4", "O5",
                      "H1", "H2", "H3", "H4", "H5", "H61", "H62", "H63",
                      "HO1", "HO2", "HO3", "HO4"]);

        let mut np = |name: &'static str, atoms: &'static [&'static str]| {
            m.insert(name, CompEntry { atom_ids: atoms, kind: CompKind::NonPoly });
        };
        np("HOH", &["O", "H1", "H2"]);
        np("ZN",  &["ZN"]);
        np("CA",  &["CA"]);
        np("MG",  &["MG"]);
        np("MN",  &["MN"]);
        np("FE",  &["FE"]);
        np("CU",  &["CU"]);
        np("NA",  &["NA"]);
        np("K",   &["K"]);
        np("CL",  &["CL"]);
        np("NI",  &["NI"]);
        np("CO",  &["CO"]);
        np("CD",  &["CD"]);
        m
    })
}

/// Atoms dropped when the residue is polymerized (CCD leaving-atom flags),
/// by polymer family.
pub(crate) fn leaving_atom_ids(kind: CompKind) -> &'static [&'static str] {
    match kind {
        CompKind::Peptide => &["OXT", "HXT", "H2", "H3"],
        CompKind::Dna | CompKind::Rna => &["OP3", "HOP3", "HO5'", "HO3'"],
        _ => &[],
    }
}

/// Extra hydrogens legal only at the N-terminus (peptide) or 5' end.
pub(crate) fn n_terminal_atom_ids(kind: CompKind) -> &'static [&'static str] {
    match kind {
        CompKind::Peptide => &["H1", "H2", "H3"],
        CompKind::Dna | CompKind::Rna => &["HO5'"],
        _ => &[],
    }
}

pub(crate) fn c_terminal_atom_ids(kind: CompKind) -> &'static [&'static str] {
    match kind {
        CompKind::Peptide => &["OXT", "HXT"],
        CompKind::Dna | CompKind::Rna => &["HO3'"],
        _ => &[],
    }
}

static AROMATIC_RINGS: OnceLock<HashMap<&'static str, &'static [&'static str]>> = OnceLock::new();

/// Ring atoms used for centroid selection on aromatic side chains and bases.
#[rustfmt::skip]
pub(crate) fn aromatic_ring_atoms() -> &'static HashMap<&'static str, &'static [&'static str]> {
    AROMATIC_RINGS.get_or_init(|| {
        let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        m.insert("PHE", &["CG", "CD1", "CD2", "CE1", "CE2", "CZ"]);
        m.insert("TYR", &["CG", "CD1", "CD2", "CE1", "CE2", "CZ"]);
        m.insert("TRP", &["CD2", "CE2", "CE3", "CZ2", "CZ3", "CH2"]);
        m.insert("HIS", &["CG", "ND1", "CD2", "CE1", "NE2"]);
        m
    })
}

static ELEMENT_SYMBOLS: OnceLock<HashSet<&'static str>> = OnceLock::new();

/// Mono- and diatomic element symbols that show up as bare ion names in
/// restraint files.
pub(crate) fn element_symbols() -> &'static HashSet<&'static str> {
    ELEMENT_SYMBOLS.get_or_init(|| {
        [
            "ZN", "CA", "MG", "MN", "FE", "CU", "NA", "K", "CL", "NI", "CO", "CD", "HG", "SR",
            "BA", "LI", "BR", "I", "F",
        ]
        .into_iter()
        .collect()
    })
}

/// Backbone atoms per polymer family, used for consistency checks and
/// cyclic-polymer detection.
pub(crate) fn backbone_atom_ids(kind: CompKind) -> &'static [&'static str] {
    match kind {
        CompKind::Peptide => &["N", "CA", "C", "O"],
        CompKind::Dna | CompKind::Rna => &["P", "O5'", "C5'", "C4'", "C3'", "O3'"],
        _ => &[],
    }
}
