//! Generic restraint front-end.
//!
//! Parses tab/space/comma separated distance and dihedral rows and drives
//! the engine with them. `#` starts a comment; `.` marks an absent value;
//! a residue reference is `[CHAIN:]SEQ COMP ATOM`.

use log::warn;
use restrax_core::engine::{
    ReconcileEngine, RestraintFrontEnd, SfKey, DIST_AMBIG_LOW, DIST_AMBIG_UP,
};
use restrax_core::types::{AtomSelection, ResidueCandidate, RestraintSubtype};

pub struct GenericFrontEnd;

struct AtomRef {
    chain_id: Option<String>,
    seq_id: i32,
    comp_id: String,
    atom_id: String,
}

fn parse_atom_ref(tokens: &[&str]) -> Result<AtomRef, String> {
    let seq_tok = tokens[0];
    let (chain_id, seq_str) = match seq_tok.split_once(':') {
        Some((c, s)) => (Some(c.to_string()), s),
        None => (None, seq_tok),
    };
    let seq_id = seq_str
        .parse::<i32>()
        .map_err(|_| format!("invalid sequence id `{seq_tok}`"))?;
    Ok(AtomRef {
        chain_id,
        seq_id,
        comp_id: tokens[1].to_string(),
        atom_id: tokens[2].to_string(),
    })
}

fn parse_value(tok: &str) -> Result<Option<f64>, String> {
    if tok == "." || tok == "?" {
        return Ok(None);
    }
    tok.parse::<f64>()
        .map(Some)
        .map_err(|_| format!("invalid value `{tok}`"))
}

fn resolve(engine: &mut ReconcileEngine<'_>, r: &AtomRef) -> (Vec<ResidueCandidate>, bool) {
    match &r.chain_id {
        Some(c) => {
            engine.assign_coord_polymer_sequence_with_chain_id(c, r.seq_id, &r.comp_id, &r.atom_id)
        }
        None => engine.assign_coord_polymer_sequence(r.seq_id, &r.comp_id, &r.atom_id),
    }
}

fn atom_columns(suffix: &str, sel: &AtomSelection, columns: &mut Vec<(String, String)>) {
    columns.push((format!("auth_asym_id_{suffix}"), sel.chain_id.clone()));
    columns.push((format!("auth_seq_id_{suffix}"), sel.seq_id.to_string()));
    columns.push((format!("comp_id_{suffix}"), sel.comp_id.clone()));
    columns.push((format!("atom_id_{suffix}"), sel.atom_id.clone()));
}

fn value_columns(
    weight: f64,
    target: Option<f64>,
    lower: Option<f64>,
    upper: Option<f64>,
    columns: &mut Vec<(String, String)>,
) {
    columns.push(("weight".to_string(), weight.to_string()));
    if let Some(v) = target {
        columns.push(("target_value".to_string(), v.to_string()));
    }
    if let Some(v) = lower {
        columns.push(("lower_limit".to_string(), v.to_string()));
    }
    if let Some(v) = upper {
        columns.push(("upper_limit".to_string(), v.to_string()));
    }
}

fn handle_dist(engine: &mut ReconcileEngine<'_>, tokens: &[&str]) -> Result<(), String> {
    if tokens.len() != 10 {
        return Err(format!("expected 10 fields in a dist row, got {}", tokens.len()));
    }
    let r1 = parse_atom_ref(&tokens[1..4])?;
    let r2 = parse_atom_ref(&tokens[4..7])?;
    let target = parse_value(tokens[7])?;
    let lower = parse_value(tokens[8])?;
    let upper = parse_value(tokens[9])?;

    let Some(dst) = engine.validate_distance_range(1.0, target, lower, upper, None, false) else {
        return Ok(());
    };

    let (c1, asis1) = resolve(engine, &r1);
    let (c2, asis2) = resolve(engine, &r2);
    if c1.is_empty() || c2.is_empty() {
        return Ok(());
    }
    let n1 = engine.select_coord_atoms(&c1, &r1.atom_id, true, asis1);
    let sel1 = engine.take_atom_selection_set();
    let n2 = engine.select_coord_atoms(&c2, &r2.atom_id, true, asis2);
    let sel2 = engine.take_atom_selection_set();
    if sel1.is_empty() || sel2.is_empty() {
        return Ok(());
    }

    let ambiguous = n1 > 1 || n2 > 1;
    // bounds outside the usual NOE window mark the list ambiguous even
    // when both selections are single atoms
    let wide_bounds = dst.upper_limit.map_or(false, |u| u > DIST_AMBIG_UP)
        || dst.lower_limit.map_or(false, |l| l < DIST_AMBIG_LOW);
    let key = SfKey::new(RestraintSubtype::Dist).with_constraint_type("NOE");
    let sf = engine.get_sf(&key);
    if ambiguous || wide_bounds {
        sf.promote_to_ambi();
    }
    for a in &sel1 {
        for b in &sel2 {
            let mut columns = Vec::new();
            atom_columns("1", a, &mut columns);
            atom_columns("2", b, &mut columns);
            if ambiguous {
                columns.push(("member_logic_code".to_string(), "OR".to_string()));
            }
            value_columns(
                dst.weight,
                dst.target_value,
                dst.lower_limit,
                dst.upper_limit,
                &mut columns,
            );
            sf.add_row(columns);
        }
    }
    Ok(())
}

fn handle_dihed(engine: &mut ReconcileEngine<'_>, tokens: &[&str]) -> Result<(), String> {
    if tokens.len() != 17 {
        return Err(format!(
            "expected 17 fields in a dihed row, got {}",
            tokens.len()
        ));
    }
    let angle_name = tokens[1].to_string();
    let mut refs = Vec::new();
    for i in 0..4 {
        refs.push(parse_atom_ref(&tokens[2 + i * 3..5 + i * 3])?);
    }
    let target = parse_value(tokens[14])?;
    let lower = parse_value(tokens[15])?;
    let upper = parse_value(tokens[16])?;

    let Some(dst) = engine.validate_angle_range(1.0, target, lower, upper) else {
        return Ok(());
    };

    let mut selections = Vec::new();
    for r in &refs {
        let (cands, asis) = resolve(engine, r);
        if cands.is_empty() {
            return Ok(());
        }
        // dihedral atoms must be single
        if engine.select_coord_atoms(&cands, &r.atom_id, false, asis) == 0 {
            return Ok(());
        }
        let mut taken = engine.take_atom_selection_set();
        selections.push(taken.remove(0));
    }

    let key = SfKey::new(RestraintSubtype::Dihed);
    let sf = engine.get_sf(&key);
    let mut columns = vec![("angle_name".to_string(), angle_name)];
    for (i, sel) in selections.iter().enumerate() {
        atom_columns(&(i + 1).to_string(), sel, &mut columns);
    }
    value_columns(
        dst.weight,
        dst.target_value,
        dst.lower_limit,
        dst.upper_limit,
        &mut columns,
    );
    sf.add_row(columns);
    Ok(())
}

impl RestraintFrontEnd for GenericFrontEnd {
    fn parse(&mut self, engine: &mut ReconcileEngine<'_>, content: &str) -> Result<(), String> {
        for (lineno, raw) in content.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").replace(',', " ");
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            let outcome = match tokens[0].to_ascii_lowercase().as_str() {
                "dist" => handle_dist(engine, &tokens),
                "dihed" => handle_dihed(engine, &tokens),
                other => Err(format!("unknown restraint keyword `{other}`")),
            };
            if let Err(e) = outcome {
                warn!("line {}: {e}", lineno + 1);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restrax_core::engine::ConstraintSubsubtype;
    use restrax_core::types::PolymerType;
    use restrax_core::CoordinateIndex;

    #[test]
    fn test_wide_bound_distance_marks_list_ambiguous() {
        let index = CoordinateIndex::builder()
            .polymer_residue("A", PolymerType::Polypeptide, Some(1), "GLY", None)
            .atom_site_names("A", 1, "GLY", &["N", "CA", "C", "O"])
            .polymer_residue("A", PolymerType::Polypeptide, Some(2), "ALA", None)
            .atom_site_names("A", 2, "ALA", &["N", "CA", "C", "O"])
            .build();
        let mut engine = ReconcileEngine::new(&index);
        GenericFrontEnd
            .parse(&mut engine, "dist 1 GLY CA 2 ALA CA . 1.8 6.0")
            .unwrap();
        let frames = engine.get_save_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].subsubtype, ConstraintSubsubtype::Ambi);
        assert_eq!(frames[0].rows.len(), 1);
        // single-atom pairs carry no member logic code
        assert!(frames[0].rows[0]
            .columns
            .iter()
            .all(|(k, _)| k != "member_logic_code"));
    }

    #[test]
    fn test_parse_atom_ref_with_chain() {
        let r = parse_atom_ref(&["A:101", "MET", "HA"]).unwrap();
        assert_eq!(r.chain_id.as_deref(), Some("A"));
        assert_eq!(r.seq_id, 101);
        assert_eq!(r.comp_id, "MET");
    }

    #[test]
    fn test_parse_atom_ref_bare_seq() {
        let r = parse_atom_ref(&["3", "GLY", "H"]).unwrap();
        assert!(r.chain_id.is_none());
        assert_eq!(r.seq_id, 3);
    }

    #[test]
    fn test_parse_value_placeholder() {
        assert_eq!(parse_value(".").unwrap(), None);
        assert_eq!(parse_value("2.5").unwrap(), Some(2.5));
        assert!(parse_value("abc").is_err());
    }
}
