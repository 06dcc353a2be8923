//! The reconciliation engine.
//!
//! One engine instance per restraint file per pass. Format front-ends
//! drive it synchronously: residue/atom references go through
//! [`ReconcileEngine::assign_coord_polymer_sequence`] and
//! [`ReconcileEngine::select_coord_atoms`], values through the
//! `validate_*` wrappers, rows into frames obtained from
//! [`ReconcileEngine::get_sf`]. `exit` runs the global alignment, chain
//! assignment and reason finalization.
mod reasons;
mod resolver;
mod saveframe;
mod validate;

pub use reasons::{ChainSeqTarget, Reasons};
pub use resolver::MAX_ALLOWED_EXT_SEQ;
pub use saveframe::{ConstraintSubsubtype, SaveFrame, SaveFrameAccumulator, SfKey, SfRow};
pub use validate::{
    validate_angle_range, validate_coup_range, validate_distance_range, validate_pcs_range,
    validate_peak_volume_range, validate_rdc_range, DstFunc, Validation, DIST_AMBIG_LOW,
    DIST_AMBIG_MED, DIST_AMBIG_UNCERT, DIST_AMBIG_UP, DIST_ERROR_MAX, DIST_ERROR_MIN,
    DIST_RANGE_MAX, DIST_RANGE_MIN, PLANE_LIKE_LIMIT, THRESHOLD_FOR_CIRCULAR_SHIFT,
};

use crate::ccd::CcdLookup;
use crate::coord::CoordinateIndex;
use crate::nomenclature::translate_std_res_name;
use crate::seq::{assign_chains, SequenceReconstructor};
use crate::types::{
    AtomSelection, ChainAssignment, CoordAtomSite, FailedResidue, ReconstructedPolymer,
    RestraintSubtype, SeqAlignment,
};
use log::debug;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use strum::Display;

/// A restraint-file pass raises the label-scheme preference once this many
/// label-side matches have been seen.
pub const MAX_PREF_LABEL_SCHEME_COUNT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum DiagnosticKind {
    #[strum(serialize = "Atom not found")]
    AtomNotFound,
    #[strum(serialize = "Sequence mismatch")]
    SequenceMismatch,
    #[strum(serialize = "Sequence mismatch warning")]
    SequenceMismatchWarning,
    #[strum(serialize = "Invalid atom nomenclature")]
    InvalidAtomNomenclature,
    #[strum(serialize = "Invalid atom selection")]
    InvalidAtomSelection,
    #[strum(serialize = "Range value error")]
    RangeValueError,
    #[strum(serialize = "Range value warning")]
    RangeValueWarning,
    #[strum(serialize = "Hydrogen not instantiated")]
    HydrogenNotInstantiated,
    #[strum(serialize = "Coordinate issue")]
    CoordinateIssue,
    #[strum(serialize = "Unknown residue name")]
    UnknownResidueName,
    #[strum(serialize = "Unknown atom name")]
    UnknownAtomName,
    #[strum(serialize = "Concatenated sequence")]
    ConcatenatedSequence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

pub struct ReconcileEngine<'a> {
    pub(crate) index: &'a CoordinateIndex,
    pub(crate) ccd: CcdLookup,
    /// Reasons handed in from the previous pass, read-only.
    pub(crate) reasons: Option<Reasons>,
    /// Reasons proposed for the next pass.
    pub(crate) reasons_for_reparsing: Reasons,
    /// Collected diagnostics, deduplicated at exit.
    pub(crate) f: Vec<Diagnostic>,
    pub(crate) reconstructor: SequenceReconstructor,
    pub(crate) poly_seq_rst_failed: Vec<FailedResidue>,
    pub(crate) prefer_auth_seq_count: usize,
    pub(crate) prefer_label_seq_count: usize,
    pub(crate) atom_selection_set: Vec<AtomSelection>,
    pub(crate) saveframes: SaveFrameAccumulator,
    alignments: Vec<SeqAlignment>,
    assignments: Vec<ChainAssignment>,
    /// External atom-name mapping for this restraint file:
    /// `(seq, comp, atom) -> (seq, comp, atom)`.
    pub(crate) mr_atom_name_mapping: HashMap<(i32, String, String), (i32, String, String)>,
    /// User-declared pseudo-atom expansions: `(comp, atom) -> atoms`.
    pub(crate) ambig_atom_name_mapping: HashMap<(String, String), Vec<String>>,
    res_name_memo: RefCell<HashMap<(String, Option<String>), String>>,
    atom_site_memo: RefCell<HashMap<(String, i32, Option<String>), Option<CoordAtomSite>>>,
    cancel_requested: bool,
    finalized: bool,
}

impl<'a> ReconcileEngine<'a> {
    pub fn new(index: &'a CoordinateIndex) -> Self {
        Self::with_reasons(index, None)
    }

    pub fn with_reasons(index: &'a CoordinateIndex, reasons: Option<Reasons>) -> Self {
        ReconcileEngine {
            index,
            ccd: CcdLookup::new(),
            reasons,
            reasons_for_reparsing: Reasons::new(),
            f: Vec::new(),
            reconstructor: SequenceReconstructor::new(),
            poly_seq_rst_failed: Vec::new(),
            prefer_auth_seq_count: 0,
            prefer_label_seq_count: 0,
            atom_selection_set: Vec::new(),
            saveframes: SaveFrameAccumulator::new(),
            alignments: Vec::new(),
            assignments: Vec::new(),
            mr_atom_name_mapping: HashMap::new(),
            ambig_atom_name_mapping: HashMap::new(),
            res_name_memo: RefCell::new(HashMap::new()),
            atom_site_memo: RefCell::new(HashMap::new()),
            cancel_requested: false,
            finalized: false,
        }
    }

    pub fn set_mr_atom_name_mapping(
        &mut self,
        mapping: HashMap<(i32, String, String), (i32, String, String)>,
    ) {
        self.mr_atom_name_mapping = mapping;
    }

    pub fn set_ambig_atom_name_mapping(
        &mut self,
        mapping: HashMap<(String, String), Vec<String>>,
    ) {
        self.ambig_atom_name_mapping = mapping;
    }

    /// Cooperative cancellation: checked at the top of `exit`.
    pub fn request_cancel(&mut self) {
        self.cancel_requested = true;
    }

    pub(crate) fn diag(&mut self, kind: DiagnosticKind, message: String) {
        self.f.push(Diagnostic { kind, message });
    }

    /// Memoized residue-name canonicalization, cleared on `exit`.
    pub(crate) fn translate_std_res_name_wrapper(
        &self,
        comp_id: &str,
        ref_comp_id: Option<&str>,
    ) -> String {
        let key = (comp_id.to_string(), ref_comp_id.map(|s| s.to_string()));
        if let Some(hit) = self.res_name_memo.borrow().get(&key) {
            return hit.clone();
        }
        let translated = translate_std_res_name(comp_id, ref_comp_id);
        self.res_name_memo.borrow_mut().insert(key, translated.clone());
        translated
    }

    /// Memoized atom-site lookup, cleared on `exit`.
    pub(crate) fn get_coord_atom_site_of(
        &self,
        chain_id: &str,
        seq_id: i32,
        comp_id: Option<&str>,
    ) -> Option<CoordAtomSite> {
        let key = (
            chain_id.to_string(),
            seq_id,
            comp_id.map(|s| s.to_string()),
        );
        if let Some(hit) = self.atom_site_memo.borrow().get(&key) {
            return hit.clone();
        }
        let site = self.index.get_atom_site(chain_id, seq_id, comp_id).cloned();
        self.atom_site_memo.borrow_mut().insert(key, site.clone());
        site
    }

    /// True once the label scheme is globally preferred, either through the
    /// carried-in reasons or the running counters.
    pub(crate) fn label_scheme_preferred(&self) -> bool {
        self.reasons
            .as_ref()
            .and_then(|r| r.label_seq_scheme)
            .unwrap_or(false)
            || (self.prefer_label_seq_count > MAX_PREF_LABEL_SCHEME_COUNT
                && self.prefer_label_seq_count > self.prefer_auth_seq_count)
    }

    pub(crate) fn bump_label_preference(&mut self) {
        self.prefer_label_seq_count += 1;
        if self.prefer_label_seq_count > MAX_PREF_LABEL_SCHEME_COUNT {
            self.reasons_for_reparsing.set_label_seq_scheme();
        }
    }

    // ---- validators -----------------------------------------------------

    fn absorb(&mut self, validation: Validation) -> Option<DstFunc> {
        for warning in &validation.warnings {
            self.diag(DiagnosticKind::RangeValueWarning, warning.clone());
        }
        for error in &validation.errors {
            self.diag(DiagnosticKind::RangeValueError, error.clone());
        }
        if validation.unusual_order {
            self.reasons_for_reparsing.set_dihed_unusual_order();
        }
        validation.dst
    }

    pub fn validate_distance_range(
        &mut self,
        weight: f64,
        target_value: Option<f64>,
        lower_limit: Option<f64>,
        upper_limit: Option<f64>,
        target_uncertainty: Option<f64>,
        omit_outlier: bool,
    ) -> Option<DstFunc> {
        let v = validate_distance_range(
            weight,
            target_value,
            lower_limit,
            upper_limit,
            target_uncertainty,
            omit_outlier,
        );
        self.absorb(v)
    }

    pub fn validate_angle_range(
        &mut self,
        weight: f64,
        target_value: Option<f64>,
        lower_limit: Option<f64>,
        upper_limit: Option<f64>,
    ) -> Option<DstFunc> {
        let v = validate_angle_range(weight, target_value, lower_limit, upper_limit);
        self.absorb(v)
    }

    pub fn validate_rdc_range(
        &mut self,
        weight: f64,
        target_value: Option<f64>,
        lower_limit: Option<f64>,
        upper_limit: Option<f64>,
    ) -> Option<DstFunc> {
        let v = validate_rdc_range(weight, target_value, lower_limit, upper_limit);
        self.absorb(v)
    }

    pub fn validate_pcs_range(
        &mut self,
        weight: f64,
        target_value: Option<f64>,
        lower_limit: Option<f64>,
        upper_limit: Option<f64>,
    ) -> Option<DstFunc> {
        let v = validate_pcs_range(weight, target_value, lower_limit, upper_limit);
        self.absorb(v)
    }

    pub fn validate_coup_range(
        &mut self,
        weight: f64,
        target_value: Option<f64>,
        lower_limit: Option<f64>,
        upper_limit: Option<f64>,
    ) -> Option<DstFunc> {
        let v = validate_coup_range(weight, target_value, lower_limit, upper_limit);
        self.absorb(v)
    }

    pub fn validate_peak_volume_range(&mut self, weight: f64, volume: Option<f64>) -> Option<DstFunc> {
        let v = validate_peak_volume_range(weight, volume);
        self.absorb(v)
    }

    // ---- save frames ----------------------------------------------------

    pub fn get_sf(&mut self, key: &SfKey) -> &mut SaveFrame {
        self.saveframes.get_sf(key)
    }

    /// Take (and clear) the atoms selected since the last call.
    pub fn take_atom_selection_set(&mut self) -> Vec<AtomSelection> {
        std::mem::take(&mut self.atom_selection_set)
    }

    // ---- finalization ---------------------------------------------------

    /// Finalize the pass: sort and align the reconstructed sequences,
    /// assign chains, merge the assigner's remap proposals into the next
    /// pass's reasons, trim empty frames and deduplicate diagnostics.
    pub fn exit(&mut self) {
        if self.cancel_requested || self.finalized {
            return;
        }
        self.finalized = true;

        self.reconstructor.sort();
        let outcome = assign_chains(self.index, self.reconstructor.polymers());
        self.alignments = outcome.alignments;
        self.assignments = outcome.assignments;
        for message in outcome.messages {
            let kind = if message.starts_with("Concatenated") {
                DiagnosticKind::ConcatenatedSequence
            } else {
                DiagnosticKind::SequenceMismatchWarning
            };
            self.diag(kind, message);
        }

        // a single restraint chain proposes a global remap, several propose
        // per-chain remaps
        let single_chain = self.reconstructor.polymers().len() == 1;
        for (tag, remap) in outcome.proposals.chain_seq_id_remap {
            for (test_seq, auth_seq) in remap {
                if single_chain {
                    self.reasons_for_reparsing.add_seq_id_remap(test_seq, auth_seq);
                } else {
                    self.reasons_for_reparsing
                        .add_chain_seq_id_remap(&tag, test_seq, auth_seq);
                }
            }
        }
        for (tag, ref_chain) in outcome.proposals.chain_id_remap {
            self.reasons_for_reparsing.add_chain_id_remap(&tag, &ref_chain);
        }
        for (primary, clones) in outcome.proposals.chain_id_clone {
            self.reasons_for_reparsing.add_chain_id_clone(&primary, clones);
        }
        for (ref_chain, copies) in outcome.proposals.model_chain_id_ext {
            self.reasons_for_reparsing
                .add_model_chain_id_ext(&ref_chain, copies);
        }

        self.reasons_for_reparsing
            .retract_extensions_explained_by_remap(&mut self.poly_seq_rst_failed);

        if !self.poly_seq_rst_failed.is_empty() {
            let failed = std::mem::take(&mut self.poly_seq_rst_failed);
            self.reasons_for_reparsing.set_extend_seq_scheme(failed.clone());
            self.poly_seq_rst_failed = failed;
        }

        self.saveframes.trim_empty();

        // dedup diagnostics, first occurrence order
        let mut seen: Vec<Diagnostic> = Vec::new();
        for d in self.f.drain(..) {
            if !seen.contains(&d) {
                seen.push(d);
            }
        }
        self.f = seen;

        self.res_name_memo.borrow_mut().clear();
        self.atom_site_memo.borrow_mut().clear();
        debug!(
            "pass finalized: {} frames, {} rows, {} diagnostics",
            self.saveframes.frames().len(),
            self.saveframes.total_rows(),
            self.f.len()
        );
    }

    // ---- downstream -----------------------------------------------------

    pub fn get_content_subtype(&self) -> BTreeMap<RestraintSubtype, usize> {
        self.saveframes.content_subtype()
    }

    pub fn get_polymer_sequence(&self) -> &[ReconstructedPolymer] {
        self.reconstructor.polymers()
    }

    pub fn get_sequence_alignment(&self) -> &[SeqAlignment] {
        &self.alignments
    }

    pub fn get_chain_assignment(&self) -> &[ChainAssignment] {
        &self.assignments
    }

    /// The reasons proposed during this pass, `None` when nothing needs a
    /// second pass.
    pub fn get_reasons_for_reparsing(&self) -> Option<&Reasons> {
        (!self.reasons_for_reparsing.is_empty()).then_some(&self.reasons_for_reparsing)
    }

    pub fn get_save_frames(&self) -> &[SaveFrame] {
        self.saveframes.frames()
    }

    pub fn get_sf_dict(
        &self,
    ) -> (
        BTreeMap<RestraintSubtype, i32>,
        BTreeMap<SfKey, Vec<&SaveFrame>>,
    ) {
        self.saveframes.sf_dict()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.f
    }

    pub fn warnings_and_errors(&self) -> Vec<String> {
        self.f.iter().map(|d| d.to_string()).collect()
    }
}

/// Capability set every format front-end drives. Thin adapters over the
/// engine implement this per format.
pub trait RestraintFrontEnd {
    fn parse(&mut self, engine: &mut ReconcileEngine<'_>, content: &str) -> Result<(), String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::CoordinateIndex;
    use crate::types::PolymerType;

    fn tiny_index() -> CoordinateIndex {
        CoordinateIndex::builder()
            .polymer_residue("A", PolymerType::Polypeptide, Some(1), "MET", None)
            .atom_site_names("A", 1, "MET", &["N", "CA", "C", "O", "CB"])
            .build()
    }

    #[test]
    fn test_validator_diagnostic_collection() {
        let index = tiny_index();
        let mut engine = ReconcileEngine::new(&index);
        assert!(engine
            .validate_distance_range(1.0, Some(200.0), None, None, None, false)
            .is_none());
        assert_eq!(engine.diagnostics().len(), 1);
        assert_eq!(engine.diagnostics()[0].kind, DiagnosticKind::RangeValueError);
    }

    #[test]
    fn test_diagnostic_dedup_on_exit() {
        let index = tiny_index();
        let mut engine = ReconcileEngine::new(&index);
        for _ in 0..3 {
            engine.validate_distance_range(1.0, Some(200.0), None, None, None, false);
        }
        engine.exit();
        assert_eq!(engine.diagnostics().len(), 1);
    }

    #[test]
    fn test_cancel_skips_finalization() {
        let index = tiny_index();
        let mut engine = ReconcileEngine::new(&index);
        engine.request_cancel();
        engine.exit();
        assert!(engine.get_sequence_alignment().is_empty());
    }

    #[test]
    fn test_dihed_unusual_order_reason() {
        let index = tiny_index();
        let mut engine = ReconcileEngine::new(&index);
        engine.validate_angle_range(1.0, None, Some(170.0), Some(30.0));
        engine.exit();
        let reasons = engine.get_reasons_for_reparsing().unwrap();
        assert_eq!(reasons.dihed_unusual_order, Some(true));
    }
}
