//! Atom and residue nomenclature translation.
//!
//! Restraint files arrive with CYANA/XPLOR/CHARMM/AMBER/GROMACS naming;
//! everything here rewrites those names onto the CCD convention. The
//! translator is pure: it never decides which chain a name belongs to.
use crate::ccd::CcdLookup;

/// One-letter code for the aligner alphabet. Non-standard residues map to
/// `X` so they align against anything with a mismatch penalty only.
#[rustfmt::skip]
pub fn comp_to_one_letter(comp_id: &str) -> char {
    match comp_id {
        "ALA" => 'A', "CYS" => 'C', "ASP" => 'D',
        "GLU" => 'E', "PHE" => 'F', "GLY" => 'G',
        "HIS" => 'H', "ILE" => 'I', "LYS" => 'K',
        "LEU" => 'L', "MET" => 'M', "ASN" => 'N',
        "PRO" => 'P', "GLN" => 'Q', "ARG" => 'R',
        "SER" => 'S', "THR" => 'T', "VAL" => 'V',
        "TRP" => 'W', "TYR" => 'Y',
        "A" => 'a', "C" => 'c', "G" => 'g', "U" => 'u',
        "DA" => 'a', "DC" => 'c', "DG" => 'g', "DT" => 't',
        "." => '.',  _ => 'X',
    }
}

/// Canonicalize a residue name coming from a restraint or topology file.
///
/// Idempotent on canonical names. When `ref_comp_id` is given and the
/// translation disagrees with it but the raw name matches, the reference
/// wins (the coordinate annotation is authoritative).
#[rustfmt::skip]
pub fn translate_std_res_name(comp_id: &str, ref_comp_id: Option<&str>) -> String {
    let upper = comp_id.trim().to_uppercase();
    let translated = match upper.as_str() {
        // protonation / tautomer variants (AMBER, CHARMM, GROMACS)
        "HID" | "HIE" | "HIP" | "HSD" | "HSE" | "HSP" | "HIS+" => "HIS",
        "CYX" | "CYM" | "CYS2"                                 => "CYS",
        "ASH" | "ASPH"                                         => "ASP",
        "GLH" | "GLUH"                                         => "GLU",
        "LYN" | "LYSH"                                         => "LYS",
        "ARN"                                                  => "ARG",
        "TRQ"                                                  => "TRP",
        // nucleotide spellings
        "ADE" | "RA" | "RA3" | "RA5" | "A3" | "A5"   => "A",
        "GUA" | "RG" | "RG3" | "RG5" | "G3" | "G5"   => "G",
        "CYT" | "RC" | "RC3" | "RC5" | "C3" | "C5"   => "C",
        "URA" | "URI" | "RU" | "RU3" | "RU5"         => "U",
        "THY" | "DT3" | "DT5"                        => "DT",
        "DA3" | "DA5"                                => "DA",
        "DG3" | "DG5"                                => "DG",
        "DC3" | "DC5"                                => "DC",
        // solvent
        "WAT" | "TIP" | "TIP3" | "TIP4" | "SPC" | "SOL" | "H2O" => "HOH",
        other => other,
    };
    if let Some(r) = ref_comp_id {
        if translated != r && upper == r {
            return r.to_string();
        }
    }
    translated.to_string()
}

/// Canonicalize an atom name for a given component.
///
/// Handles `HN <-> H`, `HT*`/`OT*` termini, leading-digit re-ordering
/// (`1HB` -> `HB1`), XPLOR primes (`C5*` -> `C5'`) and doubled quotes on
/// sugar atoms. Idempotent: translating a translated name is a no-op.
pub fn translate_std_atom_name(
    atom_id: &str,
    comp_id: &str,
    known_atom_ids: Option<&[String]>,
    unambig: bool,
) -> String {
    let raw = atom_id.trim().to_uppercase();
    let accepts = |name: &str| -> bool {
        match known_atom_ids {
            Some(known) => known.iter().any(|k| k == name),
            None => true,
        }
    };
    if let Some(known) = known_atom_ids {
        if known.iter().any(|k| k == &raw) {
            return raw;
        }
    }

    let mut name = raw.clone();

    // XPLOR writes sugar primes as asterisks; a star after a position
    // digit is a prime, elsewhere it stays a wildcard
    if name.ends_with('*') {
        let stripped = name.trim_end_matches('*');
        if stripped.ends_with(|c: char| c.is_ascii_digit()) {
            let primes = "'".repeat(name.len() - stripped.len());
            name = format!("{stripped}{primes}");
        }
    }
    if name.contains('"') {
        name = name.replace('"', "''");
    }

    // leading branch digit goes to the tail: 1HB -> HB1, 2HG1 -> HG12
    if name
        .chars()
        .next()
        .map(|c| c.is_ascii_digit())
        .unwrap_or(false)
        && name.len() > 1
        && name[1..].starts_with(|c: char| c.is_ascii_alphabetic())
    {
        let digit = &name[..1];
        name = format!("{}{}", &name[1..], digit);
    }

    // amide/terminal conventions
    if comp_id != "NH2" {
        name = match name.as_str() {
            "HN" => "H".to_string(),
            "HN1" | "HT1" => "H1".to_string(),
            "HN2" | "HT2" => "H2".to_string(),
            "HN3" | "HT3" => "H3".to_string(),
            "OT1" => "O".to_string(),
            "OT2" | "OT" | "OXT'" => "OXT".to_string(),
            _ => name,
        };
    }

    if accepts(&name) {
        return name;
    }

    // unambiguous last resort: a lone H on a residue whose backbone amide
    // is present under another name
    if unambig && name == "H" {
        for alt in ["H1", "HN"] {
            if accepts(alt) {
                return alt.to_string();
            }
        }
    }
    name
}

/// Result of a wildcard/pseudo-atom expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct StarAtomExpansion {
    pub atom_ids: Vec<String>,
    /// NMR-STAR style: 1 unique, 2 geminal/methylene pair, 3 methyl or
    /// aromatic set.
    pub ambiguity_code: i32,
    pub details: Option<String>,
}

/// Expand a possibly wildcarded or pseudo atom name into concrete CCD atom
/// ids for `comp_id`.
///
/// `*` matches any suffix, `%` a single character, `#` any trailing digits.
/// `Q`/`M` prefixes denote pseudo-atoms over hydrogen groups; `M` insists
/// on a methyl triplet, as does a bare `Q*`/`M*`.
pub fn get_valid_star_atom_in_xplor(
    ccd: &CcdLookup,
    comp_id: &str,
    atom_id: &str,
) -> StarAtomExpansion {
    let raw = atom_id.trim().to_uppercase();
    let Some(atom_table) = ccd.atom_ids(comp_id) else {
        return StarAtomExpansion {
            atom_ids: Vec::new(),
            ambiguity_code: 1,
            details: Some(format!("unknown component {comp_id}")),
        };
    };

    if let Some(exp) = expand_pseudo(&raw, atom_table) {
        return exp;
    }

    let matched: Vec<String> = atom_table
        .iter()
        .filter(|a| wildcard_match(&raw, a))
        .map(|a| a.to_string())
        .collect();
    let code = ambiguity_of(&matched);
    StarAtomExpansion {
        atom_ids: matched,
        ambiguity_code: code,
        details: None,
    }
}

fn ambiguity_of(atoms: &[String]) -> i32 {
    match atoms.len() {
        0 | 1 => 1,
        2 => 2,
        _ => 3,
    }
}

fn expand_pseudo(name: &str, atom_table: &[&'static str]) -> Option<StarAtomExpansion> {
    let (prefix, methyl_only) = match name.chars().next()? {
        'Q' => ('Q', false),
        'M' => ('M', true),
        _ => return None,
    };
    let suffix = &name[1..];
    // MET or MG are real atoms/components, not pseudo names
    if atom_table.contains(&name) {
        return None;
    }

    let hydrogens: Vec<&'static str> = atom_table
        .iter()
        .filter(|a| a.starts_with('H') && a.len() > 1)
        .copied()
        .collect();

    // group hydrogens by stem (name minus the trailing branch digit)
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for h in &hydrogens {
        let stem = match h.rfind(|c: char| c.is_ascii_digit()) {
            Some(i) if i == h.len() - 1 => h[..i].to_string(),
            _ => h.to_string(),
        };
        match groups.iter_mut().find(|(s, _)| *s == stem) {
            Some((_, members)) => members.push(h.to_string()),
            None => groups.push((stem, vec![h.to_string()])),
        }
    }

    let wants_any = suffix == "*" || suffix == "%" || suffix == "#" || suffix.is_empty();
    let mut selected: Vec<String> = Vec::new();
    for (stem, members) in &groups {
        if members.len() < 2 {
            continue;
        }
        if (methyl_only || wants_any) && members.len() != 3 {
            continue;
        }
        let group_suffix = stem.trim_start_matches('H');
        if wants_any || wildcard_match(suffix, group_suffix) {
            selected.extend(members.iter().cloned());
        }
    }
    if selected.is_empty() {
        return None;
    }
    let code = ambiguity_of(&selected);
    Some(StarAtomExpansion {
        atom_ids: selected,
        ambiguity_code: code,
        details: Some(format!("pseudo atom {prefix}{suffix}")),
    })
}

/// `*` any suffix, `%` exactly one character, `#` one or more digits.
fn wildcard_match(pattern: &str, name: &str) -> bool {
    fn rec(p: &[u8], n: &[u8]) -> bool {
        match p.first() {
            None => n.is_empty(),
            Some(b'*') => (0..=n.len()).any(|k| rec(&p[1..], &n[k..])),
            Some(b'%') => !n.is_empty() && rec(&p[1..], &n[1..]),
            Some(b'#') => (1..=n.len())
                .take_while(|&k| n[k - 1].is_ascii_digit())
                .any(|k| rec(&p[1..], &n[k..])),
            Some(c) => n.first() == Some(c) && rec(&p[1..], &n[1..]),
        }
    }
    rec(pattern.as_bytes(), name.as_bytes())
}

/// Guess which component the file meant from the atoms it references,
/// restricted to components actually present in the coordinate polymers.
pub fn guess_comp_id_from_atom_id(
    ccd: &CcdLookup,
    atom_ids: &[&str],
    polymer_comp_ids: &[String],
) -> Vec<String> {
    let mut out = Vec::new();
    for comp in polymer_comp_ids {
        if let Some(table) = ccd.atom_ids(comp) {
            if atom_ids
                .iter()
                .all(|a| table.contains(a) || !wildcard_free(a))
            {
                if !out.contains(comp) {
                    out.push(comp.clone());
                }
            }
        }
    }
    if out.is_empty() {
        if let Some(similar) = ccd.get_similar_comp_id_from_atom_ids(atom_ids) {
            out.push(similar.to_string());
        }
    }
    out
}

fn wildcard_free(atom_id: &str) -> bool {
    !atom_id.contains(['*', '%', '#'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_res_name_translation() {
        assert_eq!(translate_std_res_name("HID", None), "HIS");
        assert_eq!(translate_std_res_name("his+", None), "HIS");
        assert_eq!(translate_std_res_name("ALA", None), "ALA");
        assert_eq!(translate_std_res_name("ADE", None), "A");
        assert_eq!(translate_std_res_name("TIP3", None), "HOH");
        // idempotent
        let once = translate_std_res_name("CYX", None);
        assert_eq!(translate_std_res_name(&once, None), once);
    }

    #[test]
    fn test_atom_name_translation() {
        assert_eq!(translate_std_atom_name("HN", "ALA", None, true), "H");
        assert_eq!(translate_std_atom_name("1HB", "ALA", None, true), "HB1");
        assert_eq!(translate_std_atom_name("2HG1", "VAL", None, true), "HG12");
        assert_eq!(translate_std_atom_name("OT2", "GLY", None, true), "OXT");
        assert_eq!(translate_std_atom_name("C5*", "DA", None, true), "C5'");
        assert_eq!(translate_std_atom_name("H5\"", "DA", None, true), "H5''");
        // HN1/HN2 are canonical on the NH2 cap and must survive
        assert_eq!(translate_std_atom_name("HN1", "NH2", None, true), "HN1");
    }

    #[test]
    fn test_atom_name_idempotence() {
        for (atom, comp) in [("HN", "ALA"), ("1HB", "ALA"), ("C5*", "DA"), ("CA", "GLY")] {
            let once = translate_std_atom_name(atom, comp, None, true);
            assert_eq!(translate_std_atom_name(&once, comp, None, true), once);
        }
    }

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("HB*", "HB2"));
        assert!(wildcard_match("HB%", "HB2"));
        assert!(!wildcard_match("HB%", "HB"));
        assert!(wildcard_match("HG1#", "HG12"));
        assert!(!wildcard_match("HG1#", "HG1"));
        assert!(wildcard_match("CA", "CA"));
        assert!(!wildcard_match("CA", "CB"));
    }

    #[test]
    fn test_methyl_expansion() {
        let ccd = CcdLookup::new();
        let exp = get_valid_star_atom_in_xplor(&ccd, "MET", "Q*");
        assert_eq!(exp.atom_ids, vec!["HE1", "HE2", "HE3"]);
        assert_eq!(exp.ambiguity_code, 3);

        let qb = get_valid_star_atom_in_xplor(&ccd, "MET", "QB");
        assert_eq!(qb.atom_ids, vec!["HB2", "HB3"]);
        assert_eq!(qb.ambiguity_code, 2);

        let val = get_valid_star_atom_in_xplor(&ccd, "VAL", "MG1");
        assert_eq!(val.atom_ids, vec!["HG11", "HG12", "HG13"]);
    }

    #[test]
    fn test_wildcard_expansion() {
        let ccd = CcdLookup::new();
        let exp = get_valid_star_atom_in_xplor(&ccd, "ALA", "HB*");
        assert_eq!(exp.atom_ids, vec!["HB1", "HB2", "HB3"]);
        let one = get_valid_star_atom_in_xplor(&ccd, "ALA", "CA");
        assert_eq!(one.atom_ids, vec!["CA"]);
        assert_eq!(one.ambiguity_code, 1);
    }

    #[test]
    fn test_guess_comp_id() {
        let ccd = CcdLookup::new();
        let polymers = vec!["THR".to_string(), "ALA".to_string()];
        let guessed = guess_comp_id_from_atom_id(&ccd, &["OG1", "HG1"], &polymers);
        assert_eq!(guessed, vec!["THR".to_string()]);
    }
}
