//! Database for long clauses.
use std::mem::transmute;

use partial_ref::{partial, PartialRef};

use super::{header::HEADER_LEN, ClauseAlloc, ClauseHeader, ClauseRef};

use crate::context::{AssignmentP, ClauseAllocP, ClauseDbP, Context, ImplGraphP};
use crate::lit::Lit;
use crate::prop::Reason;

/// Partitions of the clause database.
///
/// The long clauses are partitioned into 4 [`Tier`]s. This follows the approach described by
/// Chanseok Oh in ["Between SAT and UNSAT: The Fundamental Difference in CDCL
/// SAT"](https://doi.org/10.1007/978-3-319-24318-4_23), section 4.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Tier {
    Irred = 0,
    Core = 1,
    Mid = 2,
    Local = 3,
}

impl Tier {
    /// Total number of tiers.
    pub const fn count() -> usize {
        4
    }

    /// Cast an index into the corresponding tier.
    pub unsafe fn from_index(index: usize) -> Tier {
        debug_assert!(index < Tier::count());
        transmute(index as u8)
    }
}

#[derive(Default)]
/// Database for long clauses.
///
/// Removal of clauses from the `clauses` and the `by_tier` fields can be delayed. The clause
/// header's deleted and tier fields need to be checked when iterating over these. `by_tier` may
/// also contain duplicate entries.
pub struct ClauseDb {
    /// May contain deleted clauses, see above
    pub(crate) clauses: Vec<ClauseRef>,
    /// May contain deleted and moved clauses, see above
    pub(crate) by_tier: [Vec<ClauseRef>; Tier::count()],
    /// These counts should always be up to date
    count_by_tier: [usize; Tier::count()],
    /// Size of deleted but not collected clauses
    pub(crate) garbage_size: usize,
}

impl ClauseDb {
    /// The number of long clauses of a given tier.
    pub fn count_by_tier(&self, tier: Tier) -> usize {
        self.count_by_tier[tier as usize]
    }
}

/// Add a long clause to the database.
pub fn add_clause(
    mut ctx: partial!(Context, mut ClauseDbP, mut ClauseAllocP),
    header: ClauseHeader,
    lits: &[Lit],
) -> ClauseRef {
    let tier = header.tier();

    let cref = ctx.part_mut(ClauseAllocP).add_clause(header, lits);

    let db = ctx.part_mut(ClauseDbP);

    db.clauses.push(cref);
    db.by_tier[tier as usize].push(cref);
    db.count_by_tier[tier as usize] += 1;

    cref
}

/// Change the tier of a long clause.
///
/// This is a noop for a clause already of the specified tier.
pub fn set_clause_tier(
    mut ctx: partial!(Context, mut ClauseDbP, mut ClauseAllocP),
    cref: ClauseRef,
    tier: Tier,
) {
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let db = ctx.part_mut(ClauseDbP);

    let old_tier = alloc.header(cref).tier();
    if old_tier != tier {
        db.count_by_tier[old_tier as usize] -= 1;
        db.count_by_tier[tier as usize] += 1;

        alloc.header_mut(cref).set_tier(tier);
        db.by_tier[tier as usize].push(cref);
    }
}

/// Delete a long clause from the database.
pub fn delete_clause(mut ctx: partial!(Context, mut ClauseDbP, mut ClauseAllocP), cref: ClauseRef) {
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let db = ctx.part_mut(ClauseDbP);

    let header = alloc.header_mut(cref);

    debug_assert!(
        !header.deleted(),
        "delete_clause for already deleted clause"
    );

    header.set_deleted(true);

    db.count_by_tier[header.tier() as usize] -= 1;

    db.garbage_size += header.len() + HEADER_LEN;
}

/// Delete a long clause unless it is currently the reason for an assignment.
///
/// Returns whether the clause was deleted.
pub fn try_delete_clause(
    mut ctx: partial!(Context, mut ClauseDbP, mut ClauseAllocP, AssignmentP, ImplGraphP),
    cref: ClauseRef,
) -> bool {
    let is_active_reason = {
        let alloc = ctx.part(ClauseAllocP);
        let asserted_lit = alloc.clause(cref).lits()[0];
        ctx.part(AssignmentP).lit_is_true(asserted_lit)
            && *ctx.part(ImplGraphP).reason(asserted_lit.var()) == Reason::Long(cref)
    };

    if is_active_reason {
        false
    } else {
        delete_clause(ctx.borrow(), cref);
        true
    }
}

/// Delete existing long clauses subsumed by a newly learned clause.
///
/// A clause is subsumed when every literal of `clause` also appears in it: the existing clause is
/// then implied by `clause` and keeping it around only wastes propagation work. Checks at most
/// `limit` clauses, since scanning the whole database after every learned clause would be too
/// expensive.
pub fn subsume_learned_clauses(
    mut ctx: partial!(Context, mut ClauseDbP, mut ClauseAllocP, AssignmentP, ImplGraphP),
    clause: &[Lit],
    limit: usize,
) {
    let crefs = ctx.part(ClauseDbP).clauses.clone();

    for &cref in crefs.iter().take(limit) {
        if ctx.part(ClauseAllocP).header(cref).deleted() {
            continue;
        }

        let subsumed = {
            let existing = ctx.part(ClauseAllocP).clause(cref).lits();
            existing.len() > clause.len() && clause.iter().all(|lit| existing.contains(lit))
        };

        if subsumed {
            try_delete_clause(ctx.borrow(), cref);
        }
    }
}

/// Mutate or delete every non-deleted long clause.
///
/// `f` is called with the clause allocator and a reference to each non-deleted long clause. It can
/// mutate the clause (shrinking it is allowed) and returns whether the clause should be kept.
pub fn filter_clauses(
    mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP),
    mut f: impl FnMut(&mut ClauseAlloc, ClauseRef) -> bool,
) {
    let clauses = ctx.part(ClauseDbP).clauses.clone();

    for cref in clauses {
        if ctx.part(ClauseAllocP).header(cref).deleted() {
            continue;
        }

        let keep = f(ctx.part_mut(ClauseAllocP), cref);

        if !keep {
            delete_clause(ctx.borrow(), cref);
        }
    }
}
