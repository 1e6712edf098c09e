//! Unit propagation.
use partial_ref::{partial, PartialRef};

pub mod assignment;
pub mod binary;
pub mod graph;
pub mod long;
pub mod watch;

pub use assignment::{backtrack, enqueue_assignment, restart, restart_search, Assignment, Trail};
pub use binary::propagate_binary;
pub use graph::{Conflict, ImplGraph, ImplNode, Reason};
pub use long::propagate_long;
pub use watch::{Watch, Watchlists};

use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, Context, ImplGraphP, TrailP, WatchlistsP,
};

/// Propagate all literals enqueued on the trail, following both binary and long clauses.
///
/// On conflict, returns the conflicting clause. The trail's propagation queue is left fully
/// processed, whether or not a conflict was found.
pub fn propagate(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ImplGraphP,
        mut TrailP,
        mut WatchlistsP,
    ),
) -> Result<(), Conflict> {
    loop {
        let lit = match ctx.part_mut(TrailP).pop_queue() {
            Some(lit) => lit,
            None => return Ok(()),
        };

        propagate_binary(ctx.borrow(), lit)?;
        propagate_long(ctx.borrow(), lit)?;
    }
}
