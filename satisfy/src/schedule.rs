//! Scheduling of processing and solving steps.
//!
//! The current implementation is temporary and will be replaced with something more flexible.
use std::time::Instant;

use log::info;

use partial_ref::{partial, PartialRef};

use crate::cdcl::conflict_step;
use crate::clause::reduce::{reduce_locals, reduce_mids};
use crate::clause::{collect_garbage, Tier};
use crate::context::{
    AnalyzeConflictP, AssignmentP, BinaryClausesP, ClauseActivityP, ClauseAllocP, ClauseDbP,
    Context, ImplGraphP, ModelP, PreprocessorP, ProofP, ScheduleP, SolverConfigP, SolverStateP,
    TmpDataP, TrailP, VsidsP, WatchlistsP,
};
use crate::prop::restart_search;
use crate::state::SatState;

mod glucose;
mod luby;

use glucose::GlucoseEma;
use luby::LubySequence;

/// Number of conflicts between garbage collection checks.
const GC_CHECK_INTERVAL: u64 = 30_000;

/// Scheduling of processing and solving steps.
#[derive(Default)]
pub struct Schedule {
    conflicts: u64,
    conflicts_since_restart: u64,
    restarts: u64,
    luby: LubySequence,
    next_luby_restart: u64,
    glucose: GlucoseEma,
    /// When the current search started, set on the first scheduling step. Used to enforce
    /// [`SolverConfig::max_time`](crate::config::SolverConfig::max_time).
    start_time: Option<Instant>,
}

impl Schedule {
    /// Total number of conflicts encountered so far.
    pub fn conflicts(&self) -> u64 {
        self.conflicts
    }

    /// Total number of restarts performed so far.
    pub fn restarts(&self) -> u64 {
        self.restarts
    }
}

/// Perform one step of the schedule.
pub fn schedule_step<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut BinaryClausesP,
        mut ClauseActivityP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut ModelP,
        mut PreprocessorP,
        mut ProofP<'a>,
        mut ScheduleP,
        mut SolverStateP,
        mut TmpDataP,
        mut TrailP,
        mut VsidsP,
        mut WatchlistsP,
        SolverConfigP,
    ),
) -> bool {
    let (schedule, mut ctx) = ctx.split_part_mut(ScheduleP);

    if ctx.part(SolverStateP).sat_state == SatState::Unknown {
        let start_time = *schedule.start_time.get_or_insert_with(Instant::now);

        let exhausted = {
            let config = ctx.part(SolverConfigP);
            config.max_conflicts.map_or(false, |max| schedule.conflicts >= max)
                || config
                    .max_decisions
                    .map_or(false, |max| ctx.part(TrailP).decisions_made() >= max)
                || config
                    .max_time
                    .map_or(false, |max| start_time.elapsed() >= max)
        };

        if exhausted {
            ctx.part_mut(SolverStateP).sat_state = SatState::OutOfResources;
            return false;
        }

        if schedule.conflicts > 0 && schedule.conflicts % 5000 == 0 {
            let db = ctx.part(ClauseDbP);
            let units = ctx.part(TrailP).top_level_trail_length();
            info!(
                "confl: {}k rest: {} vars: {} bin: {} irred: {} core: {} mid: {} local: {}",
                schedule.conflicts / 1000,
                schedule.restarts,
                ctx.part(AssignmentP).assignment().len() - units,
                ctx.part(BinaryClausesP).count(),
                db.count_by_tier(Tier::Irred),
                db.count_by_tier(Tier::Core),
                db.count_by_tier(Tier::Mid),
                db.count_by_tier(Tier::Local)
            );
        }

        // A pure Luby schedule acts as a fallback lower bound so restarts still happen on
        // formulas that never accumulate enough conflicts to calibrate the glue averages.
        if schedule.next_luby_restart == schedule.conflicts {
            restart_search(ctx.borrow());
            schedule.restarts += 1;
            schedule.conflicts_since_restart = 0;
            schedule.next_luby_restart +=
                ctx.part(SolverConfigP).luby_restart_interval_scale * schedule.luby.advance();
        }

        if schedule.conflicts % 15000 == 0 {
            reduce_locals(ctx.borrow());
        }
        if schedule.conflicts % 10000 == 0 {
            reduce_mids(ctx.borrow());
        }

        if schedule.conflicts % GC_CHECK_INTERVAL == 0 {
            collect_garbage(ctx.borrow());
        }

        if let Some(glue) = conflict_step(ctx.borrow()) {
            let config = ctx.part(SolverConfigP);
            schedule
                .glucose
                .update(glue, config.restart_lbd_fast_alpha, config.restart_lbd_slow_alpha);
            schedule.conflicts_since_restart += 1;

            if schedule.conflicts_since_restart >= config.restart_min_conflicts
                && schedule.glucose.should_restart(config.restart_margin)
            {
                restart_search(ctx.borrow());
                schedule.restarts += 1;
                schedule.conflicts_since_restart = 0;
            }
        }

        schedule.conflicts += 1;
        true
    } else {
        false
    }
}
