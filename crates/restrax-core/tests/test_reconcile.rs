//! End-to-end reconciliation: resolution, reparse reasons and the second
//! pass, against built indices and a real coordinate file.

use restrax_core::coord::{index_from_reader, PdbtbxReader};
use restrax_core::engine::SfKey;
use restrax_core::types::{PolymerType, RestraintSubtype};
use restrax_core::{CcdLookup, CoordinateIndex, ReconcileEngine};
use restrax_test_data::TestFile;

const OFFSET_COMPS: [&str; 11] = [
    "ALA", "CYS", "ASP", "GLU", "PHE", "GLY", "HIS", "ILE", "LYS", "LEU", "MET",
];

/// `ACDEFGHIKLM` at author numbering 10..=20.
fn offset_index() -> CoordinateIndex {
    let mut b = CoordinateIndex::builder();
    for (i, comp) in OFFSET_COMPS.iter().enumerate() {
        let seq = 10 + i as i32;
        b = b
            .polymer_residue("A", PolymerType::Polypeptide, Some(seq), comp, None)
            .atom_site_names("A", seq, comp, &["N", "CA", "C", "O"]);
    }
    b.build()
}

/// Label numbering 1..=5 over gapped author numbering.
fn gapped_index() -> CoordinateIndex {
    let comps = ["MET", "ALA", "GLY", "LEU", "VAL"];
    let auth = [101, 103, 104, 106, 108];
    let mut b = CoordinateIndex::builder();
    for (comp, seq) in comps.iter().zip(auth) {
        b = b
            .polymer_residue("A", PolymerType::Polypeptide, Some(seq), comp, None)
            .atom_site_names("A", seq, comp, &["N", "CA", "C", "O"]);
    }
    b.build()
}

#[test]
fn test_offset_numbering_two_pass_round_trip() {
    let index = offset_index();

    let mut first = ReconcileEngine::new(&index);
    let mut resolved_first = 0;
    for (i, comp) in OFFSET_COMPS.iter().enumerate() {
        let (candidates, asis) = first.assign_coord_polymer_sequence(i as i32 + 1, comp, "CA");
        if i == 0 {
            // below the author range the reference is provisionally taken
            // as-is
            assert!(asis);
            assert_eq!(candidates[0].auth_seq_id, 1);
        }
        resolved_first += usize::from(!candidates.is_empty());
    }
    first.exit();

    let reasons = first.get_reasons_for_reparsing().expect("reasons").clone();
    let remap = reasons.seq_id_remap.as_ref().expect("seq remap");
    for k in 1..=11 {
        assert_eq!(remap.get(&k), Some(&(k + 9)));
    }
    // the consistent offset explains every provisional acceptance, so no
    // extension entry survives finalization
    assert!(reasons.ext_chain_seq_id_remap.is_none());
    assert!(reasons.local_seq_scheme.is_none());
    assert!(reasons.extend_seq_scheme.is_none());

    let mut second = ReconcileEngine::with_reasons(&index, Some(reasons));
    let mut resolved_second = 0;
    for (i, comp) in OFFSET_COMPS.iter().enumerate() {
        let (candidates, _) = second.assign_coord_polymer_sequence(i as i32 + 1, comp, "CA");
        if let Some(c) = candidates.first() {
            assert_eq!(c.auth_seq_id, i as i32 + 10);
            resolved_second += 1;
        }
    }
    assert_eq!(resolved_second, 11);
    // a pass driven by reasons never resolves less than the pass that
    // recorded them
    assert!(resolved_second >= resolved_first);
    assert!(second.diagnostics().is_empty());
}

#[test]
fn test_label_scheme_two_pass_round_trip() {
    let index = gapped_index();
    let comps = ["MET", "ALA", "GLY", "LEU", "VAL"];
    let auth = [101, 103, 104, 106, 108];

    let mut first = ReconcileEngine::new(&index);
    for (i, comp) in comps.iter().enumerate() {
        // a distance row references two atoms per residue pair
        first.assign_coord_polymer_sequence(i as i32 + 1, comp, "CA");
        first.assign_coord_polymer_sequence(i as i32 + 1, comp, "N");
    }
    first.exit();
    let reasons = first.get_reasons_for_reparsing().expect("reasons").clone();
    assert_eq!(reasons.label_seq_scheme, Some(true));

    let mut second = ReconcileEngine::with_reasons(&index, Some(reasons));
    for ((i, comp), expect_auth) in comps.iter().enumerate().zip(auth) {
        let (candidates, _) = second.assign_coord_polymer_sequence(i as i32 + 1, comp, "CA");
        assert_eq!(candidates.len(), 1, "label seq {} unresolved", i + 1);
        assert_eq!(candidates[0].auth_seq_id, expect_auth);
    }
}

#[test]
fn test_frames_accumulate_and_trim() {
    let index = offset_index();
    let mut engine = ReconcileEngine::new(&index);

    let key = SfKey::new(RestraintSubtype::Dist).with_constraint_type("NOE");
    let sf = engine.get_sf(&key);
    sf.add_row(vec![("target_value".to_string(), "3.1".to_string())]);
    // a second frame created in error stays empty and is reclaimed
    let other = SfKey::new(RestraintSubtype::Dist).with_constraint_type("hydrogen bond");
    engine.get_sf(&other);
    engine.exit();

    assert_eq!(engine.get_save_frames().len(), 1);
    let counts = engine.get_content_subtype();
    assert_eq!(counts.get(&RestraintSubtype::Dist), Some(&1));
}

#[test]
fn test_reader_index_from_cif() {
    let (ciffile, _tmp) = TestFile::peptide_cif().create_temp().unwrap();
    let reader = PdbtbxReader::open(&ciffile).unwrap();
    let ccd = CcdLookup::new();
    let index = index_from_reader(&reader, &ccd);

    assert_eq!(index.polymers().len(), 1);
    let chain = &index.polymers()[0];
    assert_eq!(chain.auth_chain_id, "A");
    assert_eq!(chain.comp_ids, ["MET", "ALA", "GLY", "LEU", "VAL"]);
    assert_eq!(index.non_polys().len(), 1);
    assert_eq!(index.non_polys()[0].comp_ids[0], "ZN");

    let mut engine = ReconcileEngine::new(&index);
    let (candidates, _) =
        engine.assign_coord_polymer_sequence_with_chain_id("A", 104, "LEU", "HA");
    assert_eq!(candidates.len(), 1);
    assert!(candidates[0].is_polymer);

    let (zn, _) = engine.assign_coord_polymer_sequence(201, "ZN", "ZN");
    assert_eq!(zn.len(), 1);
    assert!(!zn[0].is_polymer);
}

#[test]
fn test_validation_feeds_frames() {
    let index = offset_index();
    let mut engine = ReconcileEngine::new(&index);

    let dst = engine
        .validate_distance_range(1.0, None, Some(1.8), Some(5.0), None, false)
        .expect("valid distance");
    let (c1, asis1) = engine.assign_coord_polymer_sequence(12, "ASP", "CA");
    assert_eq!(c1.len(), 1);
    let n = engine.select_coord_atoms(&c1, "CA", true, asis1);
    assert_eq!(n, 1);
    let selections = engine.take_atom_selection_set();

    let key = SfKey::new(RestraintSubtype::Dist).with_constraint_type("NOE");
    let sf = engine.get_sf(&key);
    let mut columns = vec![
        ("auth_seq_id_1".to_string(), selections[0].seq_id.to_string()),
        ("lower_limit".to_string(), dst.lower_limit.unwrap().to_string()),
    ];
    columns.push(("weight".to_string(), dst.weight.to_string()));
    assert_eq!(sf.add_row(columns), 1);

    engine.exit();
    assert_eq!(engine.get_save_frames()[0].rows.len(), 1);
}
