//! Pushing assumption literals onto the trail before search begins.

use partial_ref::{partial, PartialRef};

use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, Context, ImplGraphP, TrailP, WatchlistsP,
};
use crate::lit::Lit;
use crate::prop::{enqueue_assignment, propagate, Reason};

/// Push a set of assumption literals onto the trail, each as its own decision level.
///
/// An assumption already implied by the current assignment is skipped, so it does not open a
/// spurious decision level. Returns `false` if an assumption contradicts the current assignment,
/// or if propagating it conflicts with an earlier one, meaning the formula is unsatisfiable under
/// these assumptions; the caller is responsible for turning that into a solver state.
///
/// On success, marks the current decision level as the assumption prefix: restarts performed
/// during the rest of the search will not backtrack past it.
pub fn push_assumptions(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ImplGraphP,
        mut TrailP,
        mut WatchlistsP,
    ),
    assumptions: &[Lit],
) -> bool {
    for &lit in assumptions {
        if ctx.part(AssignmentP).lit_is_true(lit) {
            continue;
        }
        if ctx.part(AssignmentP).lit_is_false(lit) {
            return false;
        }

        ctx.part_mut(TrailP).new_decision_level();
        enqueue_assignment(ctx.borrow(), lit, Reason::Unit);

        if propagate(ctx.borrow()).is_err() {
            return false;
        }
    }

    ctx.part_mut(TrailP).confirm_assumption_level();

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use crate::context::{set_var_count, SolverStateP, TrailP};
    use crate::load::load_clause;
    use crate::state::SatState;

    #[test]
    fn already_satisfied_assumption_opens_no_level() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let formula = cnf_formula![1;];
        set_var_count(ctx.borrow(), formula.var_count());
        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause);
        }

        let ok = push_assumptions(ctx.borrow(), &[Lit::from_dimacs(1)]);

        assert!(ok);
        assert_eq!(ctx.part(TrailP).current_level(), 0);
    }

    #[test]
    fn contradicted_assumption_fails() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let formula = cnf_formula![1;];
        set_var_count(ctx.borrow(), formula.var_count());
        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause);
        }

        let ok = push_assumptions(ctx.borrow(), &[Lit::from_dimacs(-1)]);

        assert!(!ok);
    }

    #[test]
    fn unassigned_assumptions_open_their_own_levels() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 2);

        let ok = push_assumptions(
            ctx.borrow(),
            &[Lit::from_dimacs(1), Lit::from_dimacs(2)],
        );

        assert!(ok);
        assert_eq!(ctx.part(TrailP).current_level(), 2);
        assert_eq!(ctx.part(TrailP).assumption_level(), 2);
        assert!(ctx.part(AssignmentP).lit_is_true(Lit::from_dimacs(1)));
        assert!(ctx.part(AssignmentP).lit_is_true(Lit::from_dimacs(2)));
        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unknown);
    }

    #[test]
    fn propagation_conflict_between_assumptions_fails() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let formula = cnf_formula![
            -1, 2;
        ];
        set_var_count(ctx.borrow(), 2);
        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause);
        }

        let ok = push_assumptions(
            ctx.borrow(),
            &[Lit::from_dimacs(1), Lit::from_dimacs(-2)],
        );

        assert!(!ok);
    }
}
