//! # restrax-core
//!
//! A library for reconciling NMR restraint and chemical-shift data against
//! deposited coordinate models.
//!
//! __restrax-core__ provides functionality for:
//! * Indexing polymer, non-polymer and branched entities from coordinate files
//! * Translating legacy residue and atom nomenclature (XPLOR, AMBER, CHARMM)
//! * Reconstructing the polymer sequence a restraint file was written against
//! * Aligning and assigning restraint chains to coordinate chains
//! * Resolving residue and atom references through a fixed-priority strategy chain
//! * Validating distance, dihedral, RDC, PCS and coupling-constant values
//! * Accumulating validated rows into keyed save frames
//!
//! The main entry point is the [`ReconcileEngine`] struct, which a format
//! front-end drives row by row; a second pass over the same file picks up
//! the reparse reasons the first pass recorded.

pub mod ccd;
pub mod coord;
pub mod engine;
pub mod nomenclature;
pub mod seq;
pub mod types;

pub use self::ccd::CcdLookup;
pub use self::coord::{index_from_reader, CoordReader, CoordinateIndex, PdbtbxReader};
pub use self::engine::{
    Diagnostic, DiagnosticKind, Reasons, ReconcileEngine, RestraintFrontEnd, SaveFrame, SfKey,
};
pub use self::seq::SequenceReconstructor;
pub use self::types::{AtomSelection, ResidueCandidate, RestraintSubtype};
