//! Model reconstruction.

use partial_ref::{partial, PartialRef};

use crate::context::{AssignmentP, Context, ModelP, PreprocessorP, SolverStateP};
use crate::lit::Lit;
use crate::state::SatState;

/// The satisfying assignment, once search succeeds.
#[derive(Default)]
pub struct Model {
    assignment: Vec<Option<bool>>,
}

impl Model {
    /// Assignment of the model.
    ///
    /// Only valid if the solver state is SAT.
    pub fn assignment(&self) -> &[Option<bool>] {
        &self.assignment
    }

    /// Whether a given literal is true in the model.
    ///
    /// Only valid if the solver state is SAT.
    pub fn lit_is_true(&self, lit: Lit) -> bool {
        self.assignment[lit.var().index()] == Some(lit.is_positive())
    }
}

/// Build the full model once search finds a satisfying assignment.
///
/// Extends the assignment found by search to the variables eliminated during preprocessing, by
/// walking the elimination stack in reverse order.
pub fn reconstruct_model(
    mut ctx: partial!(Context, mut ModelP, mut SolverStateP, AssignmentP, PreprocessorP),
) {
    let (model, mut ctx) = ctx.split_part_mut(ModelP);

    model.assignment.clear();
    model
        .assignment
        .extend_from_slice(ctx.part(AssignmentP).assignment());

    ctx.part(PreprocessorP).extend_model(&mut model.assignment);

    ctx.part_mut(SolverStateP).sat_state = SatState::Sat;
}
