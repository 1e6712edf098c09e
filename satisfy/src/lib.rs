//! A CDCL SAT solver.
#[macro_use]
extern crate satisfy_formula;

pub use satisfy_formula::{cnf, lit};
pub use satisfy_formula::{CnfFormula, Lit, Var};

#[cfg(any(test, feature = "internal-testing"))]
pub use satisfy_formula::test;

mod analyze_conflict;
mod assumptions;
mod binary;
mod cdcl;
mod clause;
mod config;
mod context;
mod decision;
mod glue;
mod load;
mod model;
mod preprocess;
mod proof;
mod prop;
mod schedule;
mod simplify;
mod solver;
mod state;
mod tmp;

mod vec_mut_scan;

pub use config::SolverConfig;
pub use proof::ProofFormat;
pub use solver::{Progress, Solver};
