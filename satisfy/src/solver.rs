//! Boolean satisfiability solver.
use std::io;

use partial_ref::{partial, IntoPartialRef, IntoPartialRefMut, PartialRef};

use anyhow::Error;
use log::info;

use satisfy_dimacs::DimacsParser;

use crate::assumptions::push_assumptions;
use crate::clause::Tier;
use crate::cnf::CnfFormula;
use crate::config::{SolverConfig, SolverConfigUpdate};
use crate::context::{
    config_changed, ensure_var_count, AssignmentP, ClauseDbP, Context, PreprocessorP, ProofP,
    ScheduleP, SolverConfigP, SolverStateP, TrailP,
};
use crate::lit::{Lit, Var};
use crate::load::load_clause;
use crate::preprocess::preprocess;
use crate::proof::ProofFormat;
use crate::prop::restart;
use crate::schedule::schedule_step;
use crate::state::SatState;

/// A snapshot of solver progress, used for periodic reporting.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub decisions: u64,
    pub propagations: u64,
    pub conflicts: u64,
    pub restarts: u64,
    pub learned_clauses: usize,
    pub decision_level: usize,
    pub trail_len: usize,
}

fn progress_snapshot(ctx: partial!(Context, TrailP, ScheduleP, ClauseDbP)) -> Progress {
    let trail = ctx.part(TrailP);
    let schedule = ctx.part(ScheduleP);
    let db = ctx.part(ClauseDbP);
    Progress {
        decisions: trail.decisions_made(),
        propagations: trail.propagations(),
        conflicts: schedule.conflicts(),
        restarts: schedule.restarts(),
        learned_clauses: db.count_by_tier(Tier::Core)
            + db.count_by_tier(Tier::Mid)
            + db.count_by_tier(Tier::Local),
        decision_level: trail.current_level(),
        trail_len: trail.trail_len(),
    }
}

/// A boolean satisfiability solver.
#[derive(Default)]
pub struct Solver<'a> {
    ctx: Box<Context<'a>>,
}

impl<'a> Solver<'a> {
    /// Create a new solver.
    pub fn new() -> Solver<'a> {
        Solver::default()
    }

    /// Start writing a proof of unsatisfiability to the given target.
    pub fn write_proof(&mut self, target: impl io::Write + 'a, format: ProofFormat) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        ctx.part_mut(ProofP).write_proof(target, format);
    }

    /// Stop writing the proof, flushing any buffered output.
    pub fn close_proof(&mut self) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        ctx.part_mut(ProofP).close_proof();
    }

    /// Replace the solver configuration.
    ///
    /// Applies immediately, including to values cached elsewhere (e.g. decay factors).
    pub fn set_config(&mut self, config: SolverConfig) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        *ctx.part_mut(SolverConfigP) = config;
        config_changed(ctx.borrow(), &SolverConfigUpdate {});
    }

    /// Add a formula to the solver.
    pub fn add_formula(&mut self, formula: &CnfFormula) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        ensure_var_count(ctx.borrow(), formula.var_count());
        let preprocessor = ctx.part_mut(PreprocessorP);
        for clause in formula.iter() {
            preprocessor.add_clause(&mut clause.to_vec());
        }
    }

    /// Reads and adds a formula in DIMACS CNF format.
    ///
    /// Using this avoids creating a temporary [`CnfFormula`].
    pub fn add_dimacs_cnf(&mut self, input: impl io::Read) -> Result<(), Error> {
        use io::BufRead;

        let mut buffer = io::BufReader::new(input);
        let mut parser = DimacsParser::new();

        loop {
            let data = buffer.fill_buf()?;
            if data.is_empty() {
                break;
            }
            parser.parse_chunk(data)?;
            let len = data.len();
            buffer.consume(len);

            self.add_formula(&parser.take_formula());
        }
        parser.eof()?;
        self.add_formula(&parser.take_formula());
        parser.check_header()?;

        info!(
            "Parsed formula with {} variables and {} clauses",
            parser.var_count(),
            parser.clause_count()
        );

        Ok(())
    }

    /// Check the satisfiability of the current formula under the given assumptions.
    ///
    /// Assumptions are only in effect for this call; they do not persist across calls to `solve`.
    pub fn solve(&mut self, assumptions: &[Lit]) -> Option<bool> {
        self.solve_with_progress(assumptions, |_| {})
    }

    /// Check the satisfiability of the current formula under the given assumptions, calling
    /// `on_step` with a progress snapshot after each scheduling step.
    ///
    /// Used by callers that want to report progress (e.g. in response to a signal) without
    /// polling from a separate thread.
    pub fn solve_with_progress(
        &mut self,
        assumptions: &[Lit],
        mut on_step: impl FnMut(Progress),
    ) -> Option<bool> {
        let mut ctx = self.ctx.into_partial_ref_mut();

        preprocess(ctx.borrow());

        // A previous call may have given up on resource limits; resuming (possibly after the
        // caller raised the budget via `set_config`) restarts the search from scratch rather
        // than picking up mid-search state.
        if ctx.part(SolverStateP).sat_state == SatState::OutOfResources {
            ctx.part_mut(SolverStateP).sat_state = SatState::Unknown;
        }

        // A cached `Sat` verdict only holds for the empty assumption set it was found under;
        // non-empty assumptions always need a fresh check. A cached `Unsat` verdict holds
        // regardless of assumptions, since adding assumptions can only shrink the solution space.
        if !assumptions.is_empty() && ctx.part(SolverStateP).sat_state == SatState::Sat {
            ctx.part_mut(SolverStateP).sat_state = SatState::Unknown;
        }

        if ctx.part(SolverStateP).sat_state == SatState::Unknown {
            restart(ctx.borrow());
            if !push_assumptions(ctx.borrow(), assumptions) {
                // Unsatisfiable under these assumptions only, not the formula itself: undo the
                // assumption trail and report the result without touching the persistent state.
                restart(ctx.borrow());
                return Some(false);
            }
        }

        while ctx.part(SolverStateP).sat_state == SatState::Unknown {
            if !schedule_step(ctx.borrow()) {
                break;
            }
            on_step(progress_snapshot(ctx.borrow()));
        }
        match ctx.part(SolverStateP).sat_state {
            SatState::Unknown => None,
            SatState::Sat => Some(true),
            SatState::Unsat => Some(false),
            SatState::OutOfResources => None,
        }
    }

    /// Snapshot of current search progress, suitable for periodic reporting.
    pub fn progress(&mut self) -> Progress {
        let mut ctx = self.ctx.into_partial_ref_mut();
        progress_snapshot(ctx.borrow())
    }

    /// Set of literals that satisfy the formula.
    pub fn model(&self) -> Option<Vec<Lit>> {
        let mut ctx = self.ctx.into_partial_ref();
        if ctx.part(SolverStateP).sat_state == SatState::Sat {
            Some(
                ctx.part(AssignmentP)
                    .assignment()
                    .iter()
                    .enumerate()
                    .flat_map(|(index, assignment)| {
                        assignment.map(|polarity| Lit::from_var(Var::from_index(index), !polarity))
                    })
                    .collect(),
            )
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use crate::cnf::CnfFormula;
    use crate::lit::Lit;
    use satisfy_dimacs::write_dimacs;

    use crate::test::{sat_formula, sgen_unsat_formula};

    #[test]
    fn unit_cascade() {
        let mut solver = Solver::new();

        let formula = cnf_formula![
            1;
            -1, 2;
            -2, 3;
        ];
        solver.add_formula(&formula);

        assert_eq!(solver.solve(&[]), Some(true));

        let model = solver.model().unwrap();
        assert!(model.contains(&Lit::from_dimacs(1)));
        assert!(model.contains(&Lit::from_dimacs(2)));
        assert!(model.contains(&Lit::from_dimacs(3)));
    }

    #[test]
    fn small_unsat() {
        let mut solver = Solver::new();

        let formula = cnf_formula![
            1;
            -1;
        ];
        solver.add_formula(&formula);

        assert_eq!(solver.solve(&[]), Some(false));
    }

    #[test]
    fn binary_implication_chain_conflict() {
        let mut solver = Solver::new();

        let formula = cnf_formula![
            1, 2;
            -1, 3;
            -2, 3;
            -3;
        ];
        solver.add_formula(&formula);

        assert_eq!(solver.solve(&[]), Some(false));
    }

    #[test]
    fn gives_up_after_conflict_budget() {
        // Pigeonhole formulas force the solver to backtrack and conflict repeatedly, so a tight
        // conflict budget is guaranteed to be hit before a verdict is reached.
        fn var(i: usize, j: usize) -> isize {
            ((i - 1) * 2 + j) as isize
        }

        let mut formula = CnfFormula::new();

        for i in 1..=4 {
            formula.add_clause(vec![
                Lit::from_dimacs(var(i, 1)),
                Lit::from_dimacs(var(i, 2)),
                Lit::from_dimacs(var(i, 3)),
            ]);
        }

        for j in 1..=3 {
            for i in 1..=4 {
                for i_other in (i + 1)..=4 {
                    formula.add_clause(vec![
                        Lit::from_dimacs(-var(i, j)),
                        Lit::from_dimacs(-var(i_other, j)),
                    ]);
                }
            }
        }

        let mut solver = Solver::new();
        solver.set_config(SolverConfig {
            max_conflicts: Some(0),
            ..SolverConfig::default()
        });
        solver.add_formula(&formula);

        assert_eq!(solver.solve(&[]), None);
    }

    #[test]
    fn assumptions_are_scoped_to_a_single_call() {
        let mut solver = Solver::new();

        let formula = cnf_formula![
            1, 2;
        ];
        solver.add_formula(&formula);

        assert_eq!(
            solver.solve(&[Lit::from_dimacs(-1), Lit::from_dimacs(-2)]),
            Some(false)
        );

        // The previous call's assumptions must not persist: with no assumptions the clause
        // `1 v 2` is satisfiable again.
        assert_eq!(solver.solve(&[]), Some(true));
    }

    #[test]
    fn pigeonhole_3_into_2() {
        // Variable for pigeon i, hole j (1-based i in 1..=3, j in 1..=2): var(i, j) = (i-1)*2+j.
        fn var(i: usize, j: usize) -> isize {
            ((i - 1) * 2 + j) as isize
        }

        let mut formula = CnfFormula::new();

        for i in 1..=3 {
            formula.add_clause(vec![
                Lit::from_dimacs(var(i, 1)),
                Lit::from_dimacs(var(i, 2)),
            ]);
        }

        for j in 1..=2 {
            for i in 1..=3 {
                for i_other in (i + 1)..=3 {
                    formula.add_clause(vec![
                        Lit::from_dimacs(-var(i, j)),
                        Lit::from_dimacs(-var(i_other, j)),
                    ]);
                }
            }
        }

        let mut solver = Solver::new();
        solver.add_formula(&formula);

        assert_eq!(solver.solve(&[]), Some(false));
    }

    #[test]
    fn sat_3sat_20_vars_86_clauses_fixed() {
        // Deterministic analogue of the `sat` proptest below: every clause contains the literal
        // that is true under the all-positive assignment, so satisfiability is true by
        // construction regardless of the other (arbitrarily seeded) literals in each clause.
        let var_count = 20usize;
        let mut formula = CnfFormula::new();
        formula.set_var_count(var_count);

        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        for i in 0..86usize {
            let fixed_var = i % var_count;
            let mut clause = vec![Lit::from_index(fixed_var, true)];
            for _ in 0..2 {
                let v = (next() as usize) % var_count;
                let polarity = next() % 2 == 0;
                clause.push(Lit::from_index(v, polarity));
            }
            formula.add_clause(clause);
        }

        let mut solver = Solver::new();
        solver.add_formula(&formula);

        assert_eq!(solver.solve(&[]), Some(true));

        let model = solver.model().unwrap();
        for clause in formula.iter() {
            assert!(clause.iter().any(|lit| model.contains(lit)));
        }
    }

    proptest! {
        #[test]
        fn sgen_unsat(formula in sgen_unsat_formula(1..7usize)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(&[]), Some(false));
        }

        #[test]
        fn sat(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(&[]), Some(true));

            let model = solver.model().unwrap();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|lit| model.contains(lit)));
            }
        }

        #[test]
        fn sat_via_dimacs(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut solver = Solver::new();

            let mut dimacs = vec![];

            write_dimacs(&mut dimacs, &formula).unwrap();

            solver.add_dimacs_cnf(&mut &dimacs[..]).unwrap();

            prop_assert_eq!(solver.solve(&[]), Some(true));

            let model = solver.model().unwrap();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|lit| model.contains(lit)));
            }
        }

        #[test]
        fn sgen_unsat_incremetal_clauses(formula in sgen_unsat_formula(1..7usize)) {
            let mut solver = Solver::new();

            let mut last_state = Some(true);

            for clause in formula.iter() {
                let single_clause = CnfFormula::from(Some(clause));
                solver.add_formula(&single_clause);

                let state = solver.solve(&[]);
                if state != last_state {
                    prop_assert_eq!(state, Some(false));
                    prop_assert_eq!(last_state, Some(true));
                    last_state = state;
                }
            }

            prop_assert_eq!(last_state, Some(false));
        }
    }

}
