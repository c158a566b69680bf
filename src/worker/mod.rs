//! The solver state a stability collector and import selector are attached to.
//!
//! The CDCL loop is not part of this crate. A [`Worker`] exposes the hooks
//! such a loop calls on decisions, propagations, backjumps and conflicts, and
//! keeps stability estimates, trail samples and glue statistics up to date
//! while it does.

mod clause_db;
mod namespace;
mod state;
mod trail;
mod watch_list;

pub use self::{
    clause_db::{
        Clause,
        ClauseDb,
        ClauseDbIter,
        ClauseId,
    },
    state::VariableState,
    trail::{
        DecisionLevel,
        TrailEntry,
    },
    watch_list::Watcher,
};
use self::state::State;
use crate::{
    config::{
        ConfigError,
        ImportConfig,
    },
    diagnostics::{
        ConflictSample,
        FuzzyLbdSample,
        NullRecorder,
        Recorder,
    },
    import::{
        ImportError,
        ImportReport,
        ImportSelector,
        ImportTarget,
    },
    lbd_stats::LbdStats,
    stability::StabilityCollector,
    trail_sample::{
        AssignmentReason,
        TrailSampler,
    },
    Literal,
    Variable,
};
use core::fmt;
use thiserror::Error;
use tracing::{
    debug,
    warn,
};

/// Errors of the worker hooks.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("clauses can only be added at decision level 0 but the worker is at level {0}")]
    NotAtRootLevel(DecisionLevel),
    #[error("cannot register {requested} variables in total")]
    TooManyVariables { requested: usize },
    #[error("invalid external variable {0}")]
    InvalidExternalVariable(u32),
    #[error("external variable {0} is already in use")]
    ExternalVariableInUse(u32),
    #[error("variable {0} is already assigned")]
    AlreadyAssigned(Variable),
    #[error("variable {0} does not take part in search")]
    InactiveVariable(Variable),
    #[error("failed to import clauses")]
    Import(#[from] ImportError),
}

/// Outcome of assigning a literal that could not be assigned.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AssignError {
    /// The literal is already true.
    AlreadySatisfied,
    /// The literal is already false.
    Conflict,
}

impl AssignError {
    /// Returns `true` if the error was caused by a conflict.
    pub fn is_conflict(self) -> bool {
        matches!(self, Self::Conflict)
    }
}

/// Receives every clause a worker derives on top of its input formula.
///
/// Literals are in the external namespace.
pub trait ProofTracer {
    fn add_derived_clause(&mut self, literals: &[i32]);
}

/// A single-threaded portfolio worker.
pub struct Worker {
    config: ImportConfig,
    tick: i64,
    state: State,
    stability: StabilityCollector,
    sampler: TrailSampler,
    lbd_stats: LbdStats,
    selector: ImportSelector,
    recorder: Box<dyn Recorder>,
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Worker")
            .field("config", &self.config)
            .field("tick", &self.tick)
            .field("len_variables", &self.len_variables())
            .field("decision_level", &self.decision_level())
            .field("len_clauses", &self.state.clauses.len())
            .finish_non_exhaustive()
    }
}

impl Worker {
    /// Creates a worker without variables.
    ///
    /// # Errors
    ///
    /// If the configuration is invalid.
    pub fn new(config: ImportConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            tick: 0,
            state: State::default(),
            stability: StabilityCollector::new(config.stability_ema_alpha),
            sampler: TrailSampler::new(config.trail_sample_alpha),
            lbd_stats: LbdStats::default(),
            selector: ImportSelector::new(&config),
            recorder: Box::new(NullRecorder),
        })
    }

    /// Replaces the diagnostics recorder.
    pub fn set_recorder(&mut self, recorder: Box<dyn Recorder>) {
        self.recorder = recorder;
    }

    /// Traces every derived clause from now on.
    pub fn set_proof_tracer(&mut self, tracer: Box<dyn ProofTracer>) {
        self.state.proof.set(tracer);
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Returns the current conflict tick.
    pub fn tick(&self) -> i64 {
        self.tick
    }

    pub fn len_variables(&self) -> usize {
        self.state.len_variables()
    }

    pub fn decision_level(&self) -> DecisionLevel {
        self.state.trail.decision_level()
    }

    /// Returns the value of the literal if its variable is assigned.
    ///
    /// # Panics
    ///
    /// If the variable has not been registered.
    pub fn value(&self, literal: Literal) -> Option<bool> {
        self.state.literal_value(literal)
    }

    pub fn variable_state(&self, variable: Variable) -> VariableState {
        self.state.variable_state(variable)
    }

    pub fn clauses(&self) -> &ClauseDb {
        &self.state.clauses
    }

    /// Returns the clauses watching the literal.
    pub fn watchers(&self, literal: Literal) -> &[Watcher] {
        self.state.watch_list.watchers(literal)
    }

    /// Iterates over the trail in assignment order.
    pub fn trail(&self) -> impl Iterator<Item = (Literal, AssignmentReason)> + '_ {
        self.state.trail.iter()
    }

    pub fn stability(&self) -> &StabilityCollector {
        &self.stability
    }

    pub fn sampler(&self) -> &TrailSampler {
        &self.sampler
    }

    pub fn lbd_stats(&self) -> &LbdStats {
        &self.lbd_stats
    }

    pub fn is_unsat(&self) -> bool {
        self.state.is_unsat()
    }

    pub fn is_satisfied(&self) -> bool {
        self.state.is_satisfied()
    }

    /// Translates an external literal into the internal namespace.
    pub fn internalize(&self, external: i32) -> Option<Literal> {
        self.state.namespace.internalize(external)
    }

    /// Translates an internal literal into the external namespace.
    pub fn externalize(&self, literal: Literal) -> Option<i32> {
        self.state.namespace.externalize(literal)
    }

    /// Registers the given number of additional variables.
    ///
    /// New variables map to the external variables of the same DIMACS index.
    ///
    /// # Errors
    ///
    /// If the total number of variables exceeds [`Variable::MAX_LEN`].
    pub fn register_variables(&mut self, additional: usize) -> Result<(), WorkerError> {
        let requested = self.len_variables().saturating_add(additional);
        if requested > Variable::MAX_LEN {
            return Err(WorkerError::TooManyVariables { requested })
        }
        self.state.register_variables(additional);
        self.stability.register_variables(additional, self.tick);
        self.sampler.register_variables(additional);
        Ok(())
    }

    /// Maps an external variable to an internal variable.
    ///
    /// # Errors
    ///
    /// If the external variable is invalid or already mapped elsewhere.
    pub fn map_external(&mut self, external: u32, variable: Variable) -> Result<(), WorkerError> {
        self.state.namespace.map(external, variable)
    }

    /// Marks an external literal as witness literal that must not be imported.
    pub fn mark_witness(&mut self, external: i32) {
        self.state.mark_witness(external);
    }

    /// Marks the variable as eliminated.
    ///
    /// # Errors
    ///
    /// If the variable is assigned.
    pub fn eliminate(&mut self, variable: Variable) -> Result<(), WorkerError> {
        self.deactivate(variable, VariableState::Eliminated)
    }

    /// Marks the variable as substituted by an equivalent variable.
    ///
    /// # Errors
    ///
    /// If the variable is assigned.
    pub fn substitute(&mut self, variable: Variable) -> Result<(), WorkerError> {
        self.deactivate(variable, VariableState::Substituted)
    }

    fn deactivate(&mut self, variable: Variable, state: VariableState) -> Result<(), WorkerError> {
        if self.state.level(variable).is_some() {
            return Err(WorkerError::AlreadyAssigned(variable))
        }
        self.state.deactivate(variable, state);
        Ok(())
    }

    /// Adds a clause of the input formula.
    ///
    /// The empty clause makes the worker unsatisfiable and a unit clause is
    /// assigned instead of stored. Returns the identifier of stored clauses.
    ///
    /// # Errors
    ///
    /// If the worker is above decision level 0.
    pub fn add_clause(&mut self, literals: Vec<Literal>) -> Result<Option<ClauseId>, WorkerError> {
        let level = self.decision_level();
        if !level.is_root() {
            return Err(WorkerError::NotAtRootLevel(level))
        }
        match literals.len() {
            0 => {
                self.state.set_unsat();
                Ok(None)
            }
            1 => {
                // Root level conflicts are recorded by the state and a
                // duplicate unit is already satisfied.
                let _ = self.assign(literals[0]);
                Ok(None)
            }
            _ => Ok(Some(self.state.add_clause(Clause::irredundant(literals)))),
        }
    }

    /// Opens a new decision level and assigns the literal there.
    ///
    /// # Errors
    ///
    /// If the variable is assigned or inactive.
    pub fn decide(&mut self, literal: Literal) -> Result<DecisionLevel, WorkerError> {
        let variable = literal.variable();
        if !self.state.variable_state(variable).is_active() {
            return Err(WorkerError::InactiveVariable(variable))
        }
        if self.state.level(variable).is_some() {
            return Err(WorkerError::AlreadyAssigned(variable))
        }
        self.stability.sync_variable(variable, self.tick, &self.state);
        let level = self.state.trail.new_decision_level();
        self.state
            .assign(literal, AssignmentReason::Decision)
            .expect("encountered unexpected assigned decision variable");
        Ok(level)
    }

    /// Assigns a propagated literal at the current decision level.
    ///
    /// # Errors
    ///
    /// If the variable is already assigned. A conflict at the root level
    /// makes the worker unsatisfiable.
    pub fn assign(&mut self, literal: Literal) -> Result<(), AssignError> {
        self.stability
            .sync_variable(literal.variable(), self.tick, &self.state);
        self.state.assign(literal, AssignmentReason::Propagation)
    }

    /// Backjumps to the given decision level.
    ///
    /// # Panics
    ///
    /// If `level` is above the current decision level.
    pub fn backtrack(&mut self, level: DecisionLevel) {
        let above = self
            .state
            .trail
            .iter()
            .skip(self.state.trail.level_start(level));
        for (literal, _) in above {
            self.stability
                .sync_variable(literal.variable(), self.tick, &self.state);
        }
        self.state.backtrack(level);
    }

    /// Advances the conflict tick and returns it.
    pub fn conflict(&mut self) -> i64 {
        self.tick += 1;
        self.tick
    }

    /// Catches up the stability records of all variables.
    pub fn sync_stability(&mut self) {
        self.stability.sync_all(self.tick, &self.state);
    }

    /// Samples decision ratios and polarities from the current trail.
    pub fn sample_trail(&mut self) {
        self.sampler.sample(self.state.trail.iter());
    }

    /// Runs one import pass over the batch of offered clauses.
    ///
    /// See [`ImportSelector::import`] for the payload layout.
    ///
    /// # Errors
    ///
    /// - If the worker is above decision level 0.
    /// - If the batch contains a malformed payload.
    pub fn import_clauses<I>(&mut self, batch: I) -> Result<ImportReport, WorkerError>
    where
        I: IntoIterator,
        I::Item: AsRef<[i32]>,
    {
        let level = self.decision_level();
        if !level.is_root() {
            return Err(WorkerError::NotAtRootLevel(level))
        }
        // Units assigned by the pass do not need to sync since all records
        // are up to date at the current tick.
        self.sync_stability();
        let report = self
            .selector
            .import(&mut self.state, &self.stability, batch)?;
        debug!(
            tick = self.tick,
            imported = report.imported,
            units = report.units,
            "worker imported clauses"
        );
        Ok(report)
    }

    /// Stores a clause learned by the search loop.
    ///
    /// Units are not stored since the search loop assigns them after
    /// backjumping. Returns the identifier of stored clauses.
    pub fn learn(&mut self, literals: Vec<Literal>, glue: u32) -> Option<ClauseId> {
        self.record_learned_clause(&literals, glue);
        if literals.len() < 2 {
            return None
        }
        Some(self.state.add_clause(Clause::learned(literals, glue)))
    }

    /// Records the glue of a learned clause and compares it with its fuzzy glue.
    pub fn record_learned_clause(&mut self, literals: &[Literal], glue: u32) {
        let external = literals
            .iter()
            .filter_map(|&literal| self.externalize(literal))
            .collect::<Vec<_>>();
        self.lbd_stats.update(&external, glue);
        let sample = FuzzyLbdSample {
            fuzzy: self.sampler.fuzzy_lbd(literals),
            expected: glue,
            size: literals.len(),
        };
        if let Err(error) = self.recorder.record_fuzzy_lbd(&sample) {
            warn!(%error, "failed to record fuzzy glue sample");
        }
    }

    /// Records the polarity estimates of a conflicting clause.
    pub fn record_conflict_clause(&mut self, literals: &[Literal]) {
        let sample = ConflictSample {
            conflict_probability: self.sampler.estimated_conflict_probability(literals),
            stability_sum: self.sampler.stability_sum(literals),
            size: literals.len(),
        };
        if let Err(error) = self.recorder.record_conflict(&sample) {
            warn!(%error, "failed to record conflict sample");
        }
    }
}
