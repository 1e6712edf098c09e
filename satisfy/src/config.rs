//! Solver configuration.

/// Configurable parameters used during solving.
pub struct SolverConfig {
    /// Multiplicative decay for the VSIDS decision heuristic. (Default: 0.95)
    pub vsids_decay: f32,

    /// Multiplicative decay for clause activities. (Default: 0.999)
    pub clause_activity_decay: f32,

    /// Number of conflicts between local clause reductions. (Default: 15000)
    pub reduce_locals_interval: u64,

    /// Number of conflicts between mid clause reductions. (Default: 10000)
    pub reduce_mids_interval: u64,

    /// Scaling factor for luby sequence based restarts (number of conflicts). (Default: 128)
    pub luby_restart_interval_scale: u64,

    /// Decay factor of the fast (short window) conflict-LBD moving average. (Default: 1/32)
    pub restart_lbd_fast_alpha: f32,

    /// Decay factor of the slow (long window) conflict-LBD moving average. (Default: 1/4096)
    pub restart_lbd_slow_alpha: f32,

    /// Minimum number of conflicts between Glucose-style restarts. (Default: 50)
    pub restart_min_conflicts: u64,

    /// Trigger a restart once the fast average exceeds the slow average scaled by this margin.
    /// (Default: 1.25)
    pub restart_margin: f32,

    /// Whether blocked clause elimination is run during preprocessing. (Default: true)
    pub use_bce: bool,

    /// Whether bounded variable elimination is run during preprocessing. (Default: true)
    pub use_bve: bool,

    /// Maximum allowed increase in the number of literals when eliminating a variable via
    /// resolution. (Default: 0)
    pub bve_growth: isize,

    /// Variables with more than this many positive or negative occurrences are not eliminated by
    /// BVE. (Default: 20)
    pub bve_max_occ: usize,

    /// Resolvents larger than this many literals are rejected during BVE, independently of the
    /// growth bound. (Default: 20)
    pub bve_max_clause_len: usize,

    /// Maximum number of subsumption checks performed per simplification round. (Default: 1000)
    pub subsumption_limit: usize,

    /// Give up and report [`SatState::OutOfResources`](crate::state::SatState::OutOfResources)
    /// after this many conflicts. `None` means no limit. (Default: None)
    pub max_conflicts: Option<u64>,

    /// Give up after this many decisions. `None` means no limit. (Default: None)
    pub max_decisions: Option<u64>,

    /// Give up after search has run for this long. `None` means no limit. (Default: None)
    pub max_time: Option<std::time::Duration>,
}

impl Default for SolverConfig {
    fn default() -> SolverConfig {
        SolverConfig {
            vsids_decay: 0.95,
            clause_activity_decay: 0.999,
            reduce_locals_interval: 15000,
            reduce_mids_interval: 10000,
            luby_restart_interval_scale: 128,
            restart_lbd_fast_alpha: 1.0 / 32.0,
            restart_lbd_slow_alpha: 1.0 / 4096.0,
            restart_min_conflicts: 50,
            restart_margin: 1.25,
            use_bce: true,
            use_bve: true,
            bve_growth: 0,
            bve_max_occ: 20,
            bve_max_clause_len: 20,
            subsumption_limit: 1000,
            max_conflicts: None,
            max_decisions: None,
            max_time: None,
        }
    }
}

/// Changes to the solver configuration.
///
/// Passed to [`crate::context::config_changed`] so parts depending on the configuration can react
/// to changes without re-checking every field.
pub struct SolverConfigUpdate {}
