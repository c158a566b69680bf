use super::{
    clause_db::{
        Clause,
        ClauseDb,
        ClauseId,
    },
    namespace::Namespace,
    trail::{
        DecisionLevel,
        Trail,
    },
    watch_list::WatchList,
    AssignError,
    ProofTracer,
};
use crate::{
    import::{
        ImportTarget,
        LiteralStatus,
    },
    stability::VariableValues,
    trail_sample::AssignmentReason,
    Literal,
    Sign,
    Variable,
    VariableArray,
};
use ahash::AHashSet;
use core::fmt;

/// Whether a variable still takes part in search.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VariableState {
    Active,
    Eliminated,
    Substituted,
}

impl VariableState {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// The optional proof tracer of a worker.
#[derive(Default)]
pub struct Proof(Option<Box<dyn ProofTracer>>);

impl fmt::Debug for Proof {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Proof").field(&self.0.is_some()).finish()
    }
}

impl Proof {
    pub fn set(&mut self, tracer: Box<dyn ProofTracer>) {
        self.0 = Some(tracer);
    }

    fn add_derived_clause(&mut self, namespace: &Namespace, literals: &[Literal]) {
        if let Some(tracer) = &mut self.0 {
            let external = literals
                .iter()
                .filter_map(|&literal| namespace.externalize(literal))
                .collect::<Vec<_>>();
            tracer.add_derived_clause(&external);
        }
    }
}

/// The assignment, clauses and variable bookkeeping of a worker.
#[derive(Debug, Default)]
pub struct State {
    values: VariableArray<Option<Sign>>,
    levels: VariableArray<DecisionLevel>,
    states: VariableArray<VariableState>,
    len_inactive: usize,
    pub trail: Trail,
    pub namespace: Namespace,
    witnesses: AHashSet<i32>,
    pub clauses: ClauseDb,
    pub watch_list: WatchList,
    pub proof: Proof,
    unsat: bool,
}

impl State {
    /// Returns the number of registered variables.
    pub fn len_variables(&self) -> usize {
        self.values.len()
    }

    /// Registers the given number of additional variables.
    pub fn register_variables(&mut self, additional: usize) {
        let new_len = self.len_variables() + additional;
        self.values.resize_with(new_len, || None);
        self.levels.resize_with(new_len, || DecisionLevel::ROOT);
        self.states.resize_with(new_len, || VariableState::Active);
        self.namespace.register_variables(additional);
        self.watch_list.register_variables(additional);
    }

    /// Returns the value of the literal if its variable is assigned.
    pub fn literal_value(&self, literal: Literal) -> Option<bool> {
        self.values[literal.variable()].map(|sign| sign == literal.sign())
    }

    /// Returns the decision level of the variable if it is assigned.
    pub fn level(&self, variable: Variable) -> Option<DecisionLevel> {
        self.values[variable].map(|_| self.levels[variable])
    }

    pub fn variable_state(&self, variable: Variable) -> VariableState {
        self.states[variable]
    }

    /// Assigns the literal at the current decision level.
    ///
    /// A conflict at the root level makes the state unsatisfiable.
    ///
    /// # Errors
    ///
    /// If the variable of the literal is already assigned.
    pub fn assign(&mut self, literal: Literal, reason: AssignmentReason) -> Result<(), AssignError> {
        match self.literal_value(literal) {
            Some(true) => Err(AssignError::AlreadySatisfied),
            Some(false) => {
                if self.trail.decision_level().is_root() {
                    self.unsat = true;
                }
                Err(AssignError::Conflict)
            }
            None => {
                let variable = literal.variable();
                self.values[variable] = Some(literal.sign());
                self.levels[variable] = self.trail.decision_level();
                self.trail.push(literal, reason);
                Ok(())
            }
        }
    }

    /// Backjumps to the given decision level and unassigns everything above.
    pub fn backtrack(&mut self, level: DecisionLevel) {
        let Self { trail, values, .. } = self;
        trail.pop_to_level(level, |literal| values[literal.variable()] = None);
    }

    /// Marks an unassigned active variable as inactive.
    ///
    /// Returns `false` if the variable was already inactive.
    pub fn deactivate(&mut self, variable: Variable, state: VariableState) -> bool {
        debug_assert!(!state.is_active());
        debug_assert!(self.values[variable].is_none());
        if !self.states[variable].is_active() {
            return false
        }
        self.states[variable] = state;
        self.len_inactive += 1;
        true
    }

    /// Marks an external literal as witness literal.
    pub fn mark_witness(&mut self, external: i32) {
        self.witnesses.insert(external);
    }

    /// Marks the state as unsatisfiable.
    pub fn set_unsat(&mut self) {
        self.unsat = true;
    }

    /// Adds the clause to the clause database and watches it.
    ///
    /// Redundant clauses are traced as derived clauses.
    ///
    /// # Panics
    ///
    /// If the clause has less than two literals.
    pub fn add_clause(&mut self, clause: Clause) -> ClauseId {
        let Self {
            clauses,
            watch_list,
            namespace,
            proof,
            ..
        } = self;
        let id = clauses.push(clause);
        let clause = clauses
            .resolve(id)
            .expect("encountered unexpected invalid clause ID");
        watch_list.watch(id, clause);
        if clause.is_redundant() {
            proof.add_derived_clause(namespace, clause.literals());
        }
        id
    }
}

impl VariableValues for State {
    fn value(&self, variable: Variable) -> Option<Sign> {
        self.values[variable]
    }
}

impl ImportTarget for State {
    fn is_witness(&self, external: i32) -> bool {
        self.witnesses.contains(&external)
    }

    fn internalize(&self, external: i32) -> Option<Literal> {
        self.namespace.internalize(external)
    }

    fn literal_status(&self, literal: Literal) -> LiteralStatus {
        let variable = literal.variable();
        match self.states[variable] {
            VariableState::Eliminated => LiteralStatus::Eliminated,
            VariableState::Substituted => LiteralStatus::Substituted,
            VariableState::Active => {
                match self.level(variable) {
                    Some(level) if level.is_root() => {
                        LiteralStatus::Fixed(self.literal_value(literal) == Some(true))
                    }
                    _ => LiteralStatus::Active,
                }
            }
        }
    }

    fn assign_unit(&mut self, literal: Literal) {
        debug_assert!(self.trail.decision_level().is_root());
        let assigned = self.assign(literal, AssignmentReason::Propagation);
        debug_assert!(assigned.is_ok(), "tried to import assigned unit {}", literal);
        let Self {
            namespace, proof, ..
        } = self;
        proof.add_derived_clause(namespace, &[literal]);
    }

    fn add_imported_clause(&mut self, literals: Vec<Literal>, glue: u32) {
        self.add_clause(Clause::imported(literals, glue));
    }

    fn is_unsat(&self) -> bool {
        self.unsat
    }

    /// Every active variable is assigned and the assignment satisfies all
    /// irredundant clauses. Clauses with an inactive variable are not checked.
    fn is_satisfied(&self) -> bool {
        if self.unsat || self.trail.len() + self.len_inactive != self.len_variables() {
            return false
        }
        self.clauses
            .iter()
            .filter(|(_, clause)| !clause.is_redundant())
            .all(|(_, clause)| {
                clause.literals().iter().any(|&literal| {
                    !self.states[literal.variable()].is_active()
                        || self.literal_value(literal) == Some(true)
                })
            })
    }
}
