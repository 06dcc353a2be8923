mod align;
mod assign;
mod reconstruct;

pub use align::{align_polymer, align_with_conflicts, consistent_offset};
pub use assign::{
    assign_chains, AssignProposals, ChainAssignOutcome, CYCLIC_GAP_DISTANCE, LOW_SEQ_COVERAGE,
};
pub use reconstruct::SequenceReconstructor;
