//! Branching decisions.
use partial_ref::{partial, PartialRef};

pub mod vsids;

use crate::context::{AssignmentP, Context, ImplGraphP, TrailP, VsidsP};
use crate::lit::Var;
use crate::prop::enqueue_assignment;
use crate::prop::Reason;

/// Make a variable available for future decisions again.
///
/// Called when backtracking unassigns a variable.
pub fn make_available(mut ctx: partial!(Context, mut VsidsP), var: Var) {
    ctx.part_mut(VsidsP).make_available(var);
}

/// Make a new decision, branching on the next unassigned variable chosen by VSIDS.
///
/// Returns whether a decision could be made. If not, the current assignment is complete and
/// satisfies the formula.
pub fn make_decision(
    mut ctx: partial!(Context, mut AssignmentP, mut ImplGraphP, mut TrailP, mut VsidsP),
) -> bool {
    loop {
        let var = match ctx.part_mut(VsidsP).next() {
            Some(var) => var,
            None => return false,
        };

        if ctx.part(AssignmentP).var_value(var).is_some() {
            continue;
        }

        if ctx.part(VsidsP).is_excluded(var) {
            continue;
        }

        let last_value = ctx.part(AssignmentP).last_var_value(var);
        let lit = var.lit(last_value);

        ctx.part_mut(TrailP).new_decision_level();
        enqueue_assignment(ctx.borrow(), lit, Reason::Unit);

        return true;
    }
}
