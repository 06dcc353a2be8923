//! Two-pass processing driver.
//!
//! The first pass over a restraint file may only discover how the file's
//! numbering relates to the coordinates; when it records reparse reasons,
//! a second pass applies them. Reasons never survive past the second pass.

use crate::frontend::GenericFrontEnd;
use anyhow::{Context, Result};
use log::info;
use restrax_core::coord::{index_from_reader, PdbtbxReader};
use restrax_core::engine::{Diagnostic, Reasons, ReconcileEngine, RestraintFrontEnd, SaveFrame};
use restrax_core::types::{
    ChainAssignment, ReconstructedPolymer, RestraintSubtype, SeqAlignment,
};
use restrax_core::CcdLookup;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;

#[derive(Serialize)]
pub struct ProcessReport {
    pub passes: usize,
    pub content_subtype: BTreeMap<RestraintSubtype, usize>,
    pub polymer_sequence: Vec<ReconstructedPolymer>,
    pub alignments: Vec<SeqAlignment>,
    pub assignments: Vec<ChainAssignment>,
    pub frames: Vec<SaveFrame>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasons: Option<Reasons>,
}

impl ProcessReport {
    pub fn print_summary(&self) {
        println!("passes: {}", self.passes);
        for (subtype, count) in &self.content_subtype {
            println!("{subtype}: {count} list(s)");
        }
        for frame in &self.frames {
            println!(
                "frame {} [{:?}]: {} row(s)",
                frame.sf_framecode,
                frame.subsubtype,
                frame.rows.len()
            );
        }
        for assignment in &self.assignments {
            println!(
                "chain {} -> {} (coverage {:.2})",
                assignment.test_chain_id, assignment.ref_chain_id, assignment.sequence_coverage
            );
        }
        for diagnostic in &self.diagnostics {
            println!("{diagnostic}");
        }
    }
}

pub fn process_file(
    coord_path: &str,
    restraint_path: &str,
    allow_second_pass: bool,
) -> Result<ProcessReport> {
    let reader = PdbtbxReader::open(coord_path)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("failed to read coordinates from {coord_path}"))?;
    let ccd = CcdLookup::new();
    let index = index_from_reader(&reader, &ccd);
    let content = fs::read_to_string(restraint_path)
        .with_context(|| format!("failed to read restraints from {restraint_path}"))?;

    let mut passes = 1;
    let mut engine = run_pass(&index, &content, None)?;
    if allow_second_pass {
        if let Some(reasons) = engine.get_reasons_for_reparsing().cloned() {
            info!("reparsing with {reasons:?}");
            engine = run_pass(&index, &content, Some(reasons))?;
            passes = 2;
        }
    }

    Ok(ProcessReport {
        passes,
        content_subtype: engine.get_content_subtype(),
        polymer_sequence: engine.get_polymer_sequence().to_vec(),
        alignments: engine.get_sequence_alignment().to_vec(),
        assignments: engine.get_chain_assignment().to_vec(),
        frames: engine.get_save_frames().to_vec(),
        diagnostics: engine.diagnostics().to_vec(),
        reasons: engine.get_reasons_for_reparsing().cloned(),
    })
}

fn run_pass<'a>(
    index: &'a restrax_core::CoordinateIndex,
    content: &str,
    reasons: Option<Reasons>,
) -> Result<ReconcileEngine<'a>> {
    let mut engine = ReconcileEngine::with_reasons(index, reasons);
    let mut frontend = GenericFrontEnd;
    frontend
        .parse(&mut engine, content)
        .map_err(anyhow::Error::msg)?;
    engine.exit();
    Ok(engine)
}
