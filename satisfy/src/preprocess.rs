//! Preprocessing: blocked clause elimination and bounded variable elimination.
//!
//! Clauses added to the solver are buffered here instead of being installed directly. The first
//! call to [`preprocess`] runs BCE followed by BVE over the buffered clauses, then feeds whatever
//! remains through the normal clause loading path. Both techniques only preserve satisfiability
//! equivalence, so every elimination records a reconstruction witness used to extend the model
//! found by search back to the eliminated variables.

use partial_ref::{partial, PartialRef};

use crate::config::SolverConfig;
use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, Context, ImplGraphP, PreprocessorP,
    ProofP, SolverConfigP, SolverStateP, TmpDataP, TrailP, VsidsP, WatchlistsP,
};
use crate::lit::{Lit, Var};
use crate::load::load_clause;

/// State accumulated by preprocessing.
#[derive(Default)]
pub struct Preprocessor {
    /// Clauses added to the solver but not yet installed.
    pending: Vec<Vec<Lit>>,
    /// Eliminated variables together with a witness clause used to extend the model.
    ///
    /// Entries are in elimination order; [`extend_model`] walks them in reverse.
    eliminated: Vec<(Var, Vec<Lit>)>,
    /// Whether [`preprocess`] has already run.
    done: bool,
}

impl Preprocessor {
    /// Buffer a clause for preprocessing instead of installing it immediately.
    ///
    /// Drops tautological clauses and deduplicates literals, mirroring what
    /// [`crate::load::load_clause`] would do anyway.
    pub fn add_clause(&mut self, lits: &mut Vec<Lit>) {
        lits.sort_unstable();
        lits.dedup();

        for window in lits.windows(2) {
            if window[0] == !window[1] {
                return;
            }
        }

        self.pending.push(lits.clone());
    }

    /// Extend a full-variable assignment to the variables eliminated during preprocessing.
    pub fn extend_model(&self, assignment: &mut [Option<bool>]) {
        for (var, clause) in self.eliminated.iter().rev() {
            let own_lit = clause
                .iter()
                .find(|lit| lit.var() == *var)
                .copied()
                .expect("elimination witness must contain its own variable");

            let satisfied = clause.iter().any(|&lit| {
                lit.var() != *var && assignment[lit.var().index()] == Some(lit.is_positive())
            });

            assignment[var.index()] = Some(if satisfied {
                true
            } else {
                own_lit.is_positive()
            });
        }
    }
}

/// Run preprocessing once, then install the resulting clauses.
///
/// A no-op on every call after the first.
pub fn preprocess(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut PreprocessorP,
        mut ProofP,
        mut SolverStateP,
        mut TmpDataP,
        mut TrailP,
        mut VsidsP,
        mut WatchlistsP,
        SolverConfigP,
    ),
) {
    let (preprocessor, mut ctx) = ctx.split_part_mut(PreprocessorP);

    if preprocessor.pending.is_empty() && preprocessor.done {
        return;
    }

    let (config, mut ctx) = ctx.split_part(SolverConfigP);

    let mut clauses: Vec<Option<Vec<Lit>>> =
        preprocessor.pending.drain(..).map(Some).collect();

    // BCE and BVE only ever run once, over whatever clauses have been buffered by the first call.
    // Clauses added afterwards (e.g. incrementally, between `solve` calls) are installed as-is.
    if !preprocessor.done {
        preprocessor.done = true;

        if config.use_bce {
            run_bce(&mut clauses, &mut preprocessor.eliminated);
        }
        if config.use_bve {
            let fully_eliminated = run_bve(&mut clauses, &mut preprocessor.eliminated, config);
            for var in fully_eliminated {
                // Eliminated variables no longer occur in any remaining clause; excluding them
                // from VSIDS keeps the solver from branching on a variable it can never propagate.
                ctx.part_mut(VsidsP).exclude(var);
            }
        }
    }

    for clause in clauses.into_iter().flatten() {
        load_clause(ctx.borrow(), &clause);
    }
}

/// Occurrence lists of active (non-deleted) clauses, indexed by literal code.
fn occurrences(clauses: &[Option<Vec<Lit>>], lit_count: usize) -> Vec<Vec<usize>> {
    let mut occ = vec![vec![]; lit_count];
    for (index, clause) in clauses.iter().enumerate() {
        if let Some(lits) = clause {
            for &lit in lits {
                occ[lit.code()].push(index);
            }
        }
    }
    occ
}

/// Whether resolving `a` and `b` on `pivot` yields a tautology.
///
/// Assumes `pivot` appears in `a` and `!pivot` appears in `b`.
fn resolvent_is_tautological(a: &[Lit], b: &[Lit], pivot: Var) -> bool {
    a.iter()
        .filter(|lit| lit.var() != pivot)
        .any(|&lit| b.contains(&!lit))
}

/// Remove clauses that are blocked on one of their literals.
fn run_bce(clauses: &mut [Option<Vec<Lit>>], eliminated: &mut Vec<(Var, Vec<Lit>)>) {
    let lit_count = clauses
        .iter()
        .flatten()
        .flatten()
        .map(|lit| lit.code() + 1)
        .max()
        .unwrap_or(0);

    loop {
        let occ = occurrences(clauses, lit_count);
        let mut changed = false;

        for index in 0..clauses.len() {
            let lits = match &clauses[index] {
                Some(lits) => lits.clone(),
                None => continue,
            };

            let blocking_lit = lits.iter().find(|&&lit| {
                occ[(!lit).code()].iter().all(|&other| {
                    let other_lits = clauses[other].as_ref().unwrap();
                    resolvent_is_tautological(&lits, other_lits, lit.var())
                })
            });

            if let Some(&lit) = blocking_lit {
                eliminated.push((lit.var(), lits.clone()));
                clauses[index] = None;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }
}

/// Eliminate variables whose resolution does not grow the clause count too much.
///
/// Returns the variables that were fully eliminated, i.e. that no longer occur in any remaining
/// clause and must be excluded from future decisions. This is a subset of the variables recorded
/// in `eliminated`, which also receives entries from [`run_bce`] for variables that may still
/// occur in clauses other than the one they were blocked on.
fn run_bve(
    clauses: &mut Vec<Option<Vec<Lit>>>,
    eliminated: &mut Vec<(Var, Vec<Lit>)>,
    config: &SolverConfig,
) -> Vec<Var> {
    let mut fully_eliminated = vec![];

    let max_var = clauses
        .iter()
        .flatten()
        .flatten()
        .map(|lit| lit.var().index())
        .max();

    let max_var = match max_var {
        Some(index) => index,
        None => return fully_eliminated,
    };

    for var_index in 0..=max_var {
        let var = Var::from_index(var_index);
        let pos_lit = var.lit(true);
        let neg_lit = var.lit(false);

        let pos: Vec<usize> = clauses
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, Some(lits) if lits.contains(&pos_lit)))
            .map(|(i, _)| i)
            .collect();
        let neg: Vec<usize> = clauses
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, Some(lits) if lits.contains(&neg_lit)))
            .map(|(i, _)| i)
            .collect();

        if pos.is_empty() && neg.is_empty() {
            continue;
        }

        if pos.len() > config.bve_max_occ || neg.len() > config.bve_max_occ {
            continue;
        }

        let mut resolvents = vec![];
        let mut too_large = false;

        for &p in &pos {
            for &n in &neg {
                let p_lits = clauses[p].as_ref().unwrap();
                let n_lits = clauses[n].as_ref().unwrap();
                if resolvent_is_tautological(p_lits, n_lits, var) {
                    continue;
                }

                let mut resolvent: Vec<Lit> = p_lits
                    .iter()
                    .filter(|lit| lit.var() != var)
                    .chain(n_lits.iter().filter(|lit| lit.var() != var))
                    .copied()
                    .collect();
                resolvent.sort_unstable();
                resolvent.dedup();

                if config.bve_max_clause_len > 0 && resolvent.len() > config.bve_max_clause_len {
                    too_large = true;
                    break;
                }

                resolvents.push(resolvent);
            }
            if too_large {
                break;
            }
        }

        if too_large {
            continue;
        }

        let allowed = pos.len() + neg.len();
        let grow = if config.bve_growth < 0 {
            0
        } else {
            config.bve_growth as usize
        };

        if resolvents.len() > allowed + grow {
            continue;
        }

        let witness = pos
            .first()
            .map(|&i| clauses[i].clone().unwrap())
            .or_else(|| neg.first().map(|&i| clauses[i].clone().unwrap()));

        let witness = match witness {
            Some(witness) => witness,
            None => continue,
        };

        eliminated.push((var, witness));
        fully_eliminated.push(var);

        for &i in pos.iter().chain(neg.iter()) {
            clauses[i] = None;
        }

        for resolvent in resolvents {
            clauses.push(Some(resolvent));
        }
    }

    fully_eliminated
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::SolverConfig;

    fn lits(dimacs: &[isize]) -> Vec<Lit> {
        dimacs.iter().map(|&x| Lit::from_dimacs(x)).collect()
    }

    #[test]
    fn bve_reducibility_example() {
        let mut clauses: Vec<Option<Vec<Lit>>> = vec![
            Some(lits(&[1, 5])),  // a v p
            Some(lits(&[2, 5])),  // b v p
            Some(lits(&[3, -5])), // c v -p
            Some(lits(&[4, -5])), // d v -p
        ];

        let mut eliminated = vec![];
        let config = SolverConfig::default();

        let fully_eliminated = run_bve(&mut clauses, &mut eliminated, &config);

        assert_eq!(eliminated.len(), 1);
        assert_eq!(eliminated[0].0, Var::from_dimacs(5));
        assert_eq!(fully_eliminated, vec![Var::from_dimacs(5)]);

        let remaining: Vec<_> = clauses.into_iter().flatten().collect();
        assert_eq!(remaining.len(), 4);

        for clause in &remaining {
            assert!(!clause.iter().any(|lit| lit.var() == Var::from_dimacs(5)));
        }
    }

    #[test]
    fn bce_removes_blocked_clause() {
        // (x v y) is blocked on x: the only clause containing -x is (-x v y), whose resolvent
        // with (x v y) on x is the tautology (y v -y)... here we use a minimal case where the
        // blocking variable has no opposing occurrences at all, which is trivially blocked.
        let mut clauses: Vec<Option<Vec<Lit>>> = vec![Some(lits(&[1, 2]))];
        let mut eliminated = vec![];

        run_bce(&mut clauses, &mut eliminated);

        assert_eq!(eliminated.len(), 1);
        assert!(clauses[0].is_none());
    }
}
