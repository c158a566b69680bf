//! Selection of externally learned clauses for import.
//!
//! Clauses offered by other portfolio workers are filtered against the live
//! state of the receiving worker, ranked by a [`Heuristic`] and admitted in
//! rank order until the literal budget of the pass is exhausted.

use crate::{
    config::ImportConfig,
    heuristic::{
        Heuristic,
        HeuristicParams,
    },
    stability::LiteralProbabilities,
    Literal,
};
use core::mem;
use thiserror::Error;
use tracing::{
    debug,
    trace,
};

/// Protocol violations in the offered clause stream.
///
/// These indicate corrupted inter-worker state and are not recoverable.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("received an empty external clause")]
    EmptyClause,
    #[error("received a non-unit external clause with invalid glue {0}")]
    InvalidGlue(i32),
    #[error("received an external clause containing the zero literal")]
    ZeroLiteral,
}

/// The state of an internal literal as seen by the import filter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LiteralStatus {
    /// The variable takes part in search normally.
    Active,
    /// The variable has been substituted by an equivalent one.
    Substituted,
    /// The variable has been eliminated and must not reappear.
    Eliminated,
    /// The variable is fixed at the root level.
    ///
    /// Holds `true` if the literal itself is fixed to true.
    Fixed(bool),
}

/// The worker state an import pass reads from and writes into.
pub trait ImportTarget {
    /// Returns `true` if the external literal must not be imported.
    fn is_witness(&self, external: i32) -> bool;

    /// Translates an external literal into the internal namespace.
    ///
    /// Returns `None` if the external variable is unknown to the worker.
    fn internalize(&self, external: i32) -> Option<Literal>;

    /// Returns the state of the internal literal.
    fn literal_status(&self, literal: Literal) -> LiteralStatus;

    /// Assigns the literal at the root level.
    fn assign_unit(&mut self, literal: Literal);

    /// Adds a redundant clause tagged as imported and watches it.
    fn add_imported_clause(&mut self, literals: Vec<Literal>, glue: u32);

    /// Returns `true` if the worker has derived the empty clause.
    fn is_unsat(&self) -> bool;

    /// Returns `true` if the worker has found a satisfying assignment.
    fn is_satisfied(&self) -> bool;
}

/// Whether the worker was solved during the pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImportStatus {
    Unknown,
    Satisfied,
    Unsatisfied,
}

impl Default for ImportStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

impl ImportStatus {
    /// Returns the status of the import target.
    fn of<T>(target: &T) -> Self
    where
        T: ImportTarget + ?Sized,
    {
        if target.is_unsat() {
            Self::Unsatisfied
        } else if target.is_satisfied() {
            Self::Satisfied
        } else {
            Self::Unknown
        }
    }

    /// Returns `true` if the worker has been solved.
    pub fn is_solved(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Statistics of a single import pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportReport {
    pub status: ImportStatus,
    /// Number of consumed external clauses.
    pub received: usize,
    /// Number of assigned unit clauses.
    pub units: usize,
    /// Number of unit clauses that were skipped.
    pub skipped_units: usize,
    /// Number of clauses that entered ranking.
    pub candidates: usize,
    /// Number of admitted candidates.
    pub imported: usize,
    pub discarded_witness: usize,
    pub discarded_unknown: usize,
    pub discarded_eliminated: usize,
    pub discarded_satisfied: usize,
    pub discarded_falsified: usize,
    /// Number of root-level false literals removed from clauses.
    pub dropped_literals: usize,
    /// Literals plus terminators charged against the budget.
    pub charged: usize,
    /// The literal budget of the pass.
    pub budget: f64,
}

impl ImportReport {
    /// Returns the number of clauses discarded by the filter.
    pub fn discarded(&self) -> usize {
        self.discarded_witness
            + self.discarded_unknown
            + self.discarded_eliminated
            + self.discarded_satisfied
            + self.discarded_falsified
    }
}

/// A filtered clause waiting to be ranked.
#[derive(Debug, Clone)]
struct Candidate {
    literals: Vec<Literal>,
    glue: u32,
}

impl Candidate {
    /// Literals plus the terminator.
    fn charge(&self) -> usize {
        self.literals.len() + 1
    }
}

/// A candidate index with its heuristic value.
#[derive(Debug, Copy, Clone)]
struct Ranked {
    index: usize,
    value: f64,
}

/// Outcome of filtering the literals of one non-unit clause.
enum Filtered {
    Discarded,
    Unit(i32),
    Candidate,
}

/// Selects which offered clauses a worker imports.
#[derive(Debug, Clone)]
pub struct ImportSelector {
    heuristic: Heuristic,
    params: HeuristicParams,
    ratio: f64,
    candidates: Vec<Candidate>,
    ranking: Vec<Ranked>,
}

impl ImportSelector {
    /// Creates a selector from a validated configuration.
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            heuristic: config.import_heuristic,
            params: config.heuristic_params(),
            ratio: config.import_ratio(),
            candidates: Vec::new(),
            ranking: Vec::new(),
        }
    }

    /// Returns the ranking heuristic.
    pub fn heuristic(&self) -> Heuristic {
        self.heuristic
    }

    /// Runs one import pass over the batch.
    ///
    /// Every element of the batch is a payload in learn-source convention:
    /// `[literal]` for a unit clause and `[glue, literals...]` otherwise,
    /// literals being in the external namespace.
    ///
    /// Returns early as soon as the target is found to be solved.
    ///
    /// # Errors
    ///
    /// On a malformed payload. Units assigned before the malformed payload
    /// stay assigned.
    pub fn import<T, P, I>(
        &mut self,
        target: &mut T,
        probabilities: &P,
        batch: I,
    ) -> Result<ImportReport, ImportError>
    where
        T: ImportTarget + ?Sized,
        P: LiteralProbabilities + ?Sized,
        I: IntoIterator,
        I::Item: AsRef<[i32]>,
    {
        self.candidates.clear();
        let mut report = ImportReport::default();
        for payload in batch {
            report.received += 1;
            let unit = match payload.as_ref() {
                [] => return Err(ImportError::EmptyClause),
                [unit] => {
                    if *unit == 0 {
                        return Err(ImportError::ZeroLiteral)
                    }
                    Some(*unit)
                }
                [glue, literals @ ..] => {
                    if *glue <= 0 {
                        return Err(ImportError::InvalidGlue(*glue))
                    }
                    if literals.contains(&0) {
                        return Err(ImportError::ZeroLiteral)
                    }
                    match self.filter_clause(target, *glue as u32, literals, &mut report) {
                        Filtered::Unit(unit) => Some(unit),
                        Filtered::Discarded | Filtered::Candidate => None,
                    }
                }
            };
            if let Some(unit) = unit {
                Self::import_unit(target, unit, &mut report);
            }
            report.status = ImportStatus::of(target);
            if report.status.is_solved() {
                debug!(status = ?report.status, received = report.received, "import pass solved worker");
                self.candidates.clear();
                return Ok(report)
            }
        }
        self.admit(target, probabilities, &mut report);
        report.status = ImportStatus::of(target);
        debug!(
            heuristic = %self.heuristic,
            received = report.received,
            candidates = report.candidates,
            imported = report.imported,
            units = report.units,
            discarded = report.discarded(),
            charged = report.charged,
            budget = report.budget,
            "import pass finished"
        );
        Ok(report)
    }

    /// Filters the literals of a non-unit clause against the target.
    fn filter_clause<T>(
        &mut self,
        target: &T,
        glue: u32,
        literals: &[i32],
        report: &mut ImportReport,
    ) -> Filtered
    where
        T: ImportTarget + ?Sized,
    {
        let mut kept = Vec::with_capacity(literals.len());
        let mut last_kept = 0;
        for &external in literals {
            if target.is_witness(external) {
                trace!(literal = external, "discard clause with witness literal");
                report.discarded_witness += 1;
                return Filtered::Discarded
            }
            let literal = match target.internalize(external) {
                Some(literal) => literal,
                None => {
                    trace!(literal = external, "discard clause with unknown variable");
                    report.discarded_unknown += 1;
                    return Filtered::Discarded
                }
            };
            match target.literal_status(literal) {
                LiteralStatus::Eliminated => {
                    trace!(literal = external, "discard clause with eliminated variable");
                    report.discarded_eliminated += 1;
                    return Filtered::Discarded
                }
                LiteralStatus::Fixed(true) => {
                    report.discarded_satisfied += 1;
                    return Filtered::Discarded
                }
                LiteralStatus::Fixed(false) => {
                    report.dropped_literals += 1;
                }
                LiteralStatus::Active | LiteralStatus::Substituted => {
                    kept.push(literal);
                    last_kept = external;
                }
            }
        }
        match kept.len() {
            0 => {
                report.discarded_falsified += 1;
                Filtered::Discarded
            }
            1 => Filtered::Unit(last_kept),
            _ => {
                self.candidates.push(Candidate {
                    literals: kept,
                    glue,
                });
                report.candidates += 1;
                Filtered::Candidate
            }
        }
    }

    /// Assigns an external unit unless the target cannot take it.
    fn import_unit<T>(target: &mut T, external: i32, report: &mut ImportReport)
    where
        T: ImportTarget + ?Sized,
    {
        if target.is_witness(external) {
            report.skipped_units += 1;
            return
        }
        let literal = match target.internalize(external) {
            Some(literal) => literal,
            None => {
                report.skipped_units += 1;
                return
            }
        };
        match target.literal_status(literal) {
            LiteralStatus::Active => {
                target.assign_unit(literal);
                report.units += 1;
                report.charged += 2;
            }
            LiteralStatus::Substituted
            | LiteralStatus::Eliminated
            | LiteralStatus::Fixed(_) => {
                report.skipped_units += 1;
            }
        }
    }

    /// Ranks the queued candidates and admits them until the budget is met.
    fn admit<T, P>(&mut self, target: &mut T, probabilities: &P, report: &mut ImportReport)
    where
        T: ImportTarget + ?Sized,
        P: LiteralProbabilities + ?Sized,
    {
        let offered = self.candidates.iter().map(Candidate::charge).sum::<usize>()
            + report.charged;
        let budget = self.ratio * offered as f64;
        report.budget = budget;
        let Self {
            heuristic,
            params,
            candidates,
            ranking,
            ..
        } = self;
        let heuristic = *heuristic;
        let params = *params;
        ranking.clear();
        ranking.extend(candidates.iter().enumerate().map(|(index, candidate)| {
            Ranked {
                index,
                value: heuristic.evaluate(&params, probabilities, &candidate.literals),
            }
        }));
        // Stable, so equal candidates keep their arrival order.
        ranking.sort_by(|lhs, rhs| {
            heuristic.cmp_values(lhs.value, rhs.value).then_with(|| {
                candidates[lhs.index]
                    .literals
                    .len()
                    .cmp(&candidates[rhs.index].literals.len())
            })
        });
        for ranked in ranking.iter() {
            if report.charged as f64 >= budget {
                break
            }
            let candidate = &mut candidates[ranked.index];
            report.charged += candidate.charge();
            report.imported += 1;
            let literals = mem::take(&mut candidate.literals);
            target.add_imported_clause(literals, candidate.glue);
        }
        candidates.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Sign,
        Variable,
    };
    use ahash::AHashMap;

    /// In-memory import target with configurable filter state.
    #[derive(Debug, Default)]
    struct Target {
        len_variables: usize,
        witness: Vec<i32>,
        eliminated: Vec<Variable>,
        substituted: Vec<Variable>,
        fixed: AHashMap<Variable, Sign>,
        added: Vec<(Vec<i32>, u32)>,
        units: Vec<i32>,
        satisfied_after_units: Option<usize>,
        unsat: bool,
    }

    impl Target {
        fn new(len_variables: usize) -> Self {
            Self {
                len_variables,
                ..Self::default()
            }
        }

        fn fix(mut self, lit: i32) -> Self {
            let lit = Literal::from(lit);
            self.fixed.insert(lit.variable(), lit.sign());
            self
        }

        fn added(&self) -> Vec<Vec<i32>> {
            self.added.iter().map(|(lits, _)| lits.clone()).collect()
        }
    }

    impl ImportTarget for Target {
        fn is_witness(&self, external: i32) -> bool {
            self.witness.contains(&external)
        }

        fn internalize(&self, external: i32) -> Option<Literal> {
            if external.unsigned_abs() as usize > self.len_variables {
                return None
            }
            Some(Literal::from(external))
        }

        fn literal_status(&self, literal: Literal) -> LiteralStatus {
            let variable = literal.variable();
            if self.eliminated.contains(&variable) {
                return LiteralStatus::Eliminated
            }
            if self.substituted.contains(&variable) {
                return LiteralStatus::Substituted
            }
            match self.fixed.get(&variable) {
                Some(sign) => LiteralStatus::Fixed(*sign == literal.sign()),
                None => LiteralStatus::Active,
            }
        }

        fn assign_unit(&mut self, literal: Literal) {
            self.units.push(literal.into_dimacs());
            self.fixed.insert(literal.variable(), literal.sign());
        }

        fn add_imported_clause(&mut self, literals: Vec<Literal>, glue: u32) {
            let literals = literals.into_iter().map(Literal::into_dimacs).collect();
            self.added.push((literals, glue));
        }

        fn is_unsat(&self) -> bool {
            self.unsat
        }

        fn is_satisfied(&self) -> bool {
            self.satisfied_after_units
                .map_or(false, |after| self.units.len() >= after)
        }
    }

    /// False probabilities per DIMACS literal, 0.5 if not listed.
    #[derive(Default)]
    struct FalseProbabilities(AHashMap<i32, f64>);

    impl LiteralProbabilities for FalseProbabilities {
        fn probability_false(&self, literal: Literal) -> f64 {
            self.0.get(&literal.into_dimacs()).copied().unwrap_or(0.5)
        }

        fn probability_true(&self, literal: Literal) -> f64 {
            1.0 - self.probability_false(literal)
        }
    }

    fn selector(percent: u8, heuristic: Heuristic) -> ImportSelector {
        ImportSelector::new(&ImportConfig {
            import_percent: percent,
            import_heuristic: heuristic,
            ..ImportConfig::default()
        })
    }

    #[test]
    fn budget_admits_best_half() {
        let mut target = Target::new(20);
        let batch = vec![
            vec![2, 1, 2, 3],
            vec![2, 4, 5, 6],
            vec![2, 7, 8, 9],
            vec![2, 10, 11, 12],
        ];
        let report = selector(50, Heuristic::Size)
            .import(&mut target, &FalseProbabilities::default(), &batch)
            .unwrap();
        assert_eq!(report.candidates, 4);
        assert_eq!(report.budget, 8.0);
        assert_eq!(report.imported, 2);
        assert_eq!(report.charged, 8);
        assert_eq!(target.added(), vec![vec![1, 2, 3], vec![4, 5, 6]]);
        assert_eq!(report.status, ImportStatus::Unknown);
    }

    #[test]
    fn equal_scores_keep_arrival_order_regardless_of_position() {
        let batch = vec![
            vec![3, 10, 11, 12],
            vec![3, 1, 2, 3],
            vec![3, 4, 5, 6],
            vec![3, 7, 8, 9],
        ];
        let mut target = Target::new(20);
        selector(50, Heuristic::Size)
            .import(&mut target, &FalseProbabilities::default(), &batch)
            .unwrap();
        assert_eq!(target.added(), vec![vec![10, 11, 12], vec![1, 2, 3]]);
    }

    #[test]
    fn size_prefers_short_clauses() {
        let batch = vec![vec![1, 1, 2, 3, 4], vec![1, 5, 6]];
        let mut target = Target::new(10);
        let report = selector(50, Heuristic::Size)
            .import(&mut target, &FalseProbabilities::default(), &batch)
            .unwrap();
        // Budget is 4: the short clause charges 3 and the long one still fits in.
        assert_eq!(report.budget, 4.0);
        assert_eq!(target.added(), vec![vec![5, 6], vec![1, 2, 3, 4]]);
    }

    #[test]
    fn admission_stops_once_budget_is_met() {
        let batch = vec![vec![1, 1, 2], vec![1, 3, 4, 5, 6, 7], vec![1, 8, 9]];
        let mut target = Target::new(10);
        let report = selector(40, Heuristic::Size)
            .import(&mut target, &FalseProbabilities::default(), &batch)
            .unwrap();
        // Offered 3 + 6 + 3 = 12, budget 4.8: the second short clause
        // overshoots the budget, the long one is never reached.
        assert_eq!(target.added(), vec![vec![1, 2], vec![8, 9]]);
        assert_eq!(report.charged, 6);
    }

    #[test]
    fn ties_are_broken_by_length_then_arrival() {
        let batch = vec![vec![1, 1, 2, 3], vec![1, 4, 5], vec![1, 6, 7]];
        let mut target = Target::new(10);
        selector(100, Heuristic::Min)
            .import(&mut target, &FalseProbabilities::default(), &batch)
            .unwrap();
        assert_eq!(target.added(), vec![vec![4, 5], vec![6, 7], vec![1, 2, 3]]);
    }

    #[test]
    fn higher_is_better_heuristics_rank_descending() {
        let probabilities = FalseProbabilities(
            [(1, 0.1), (2, 0.1), (3, 0.9), (4, 0.9), (5, 0.5), (6, 0.5)]
                .into_iter()
                .collect(),
        );
        let batch = vec![vec![1, 1, 2], vec![1, 3, 4], vec![1, 5, 6]];
        let mut target = Target::new(10);
        selector(100, Heuristic::ProductNorm)
            .import(&mut target, &probabilities, &batch)
            .unwrap();
        assert_eq!(target.added(), vec![vec![3, 4], vec![5, 6], vec![1, 2]]);
    }

    #[test]
    fn eliminated_variable_is_never_admitted() {
        let mut target = Target::new(10);
        target.eliminated.push(Variable::from_index(1).unwrap());
        let probabilities = FalseProbabilities([(-2, 1.0), (3, 1.0)].into_iter().collect());
        let batch = vec![vec![1, -2, 3], vec![1, 4, 5]];
        let report = selector(100, Heuristic::ProductNorm)
            .import(&mut target, &probabilities, &batch)
            .unwrap();
        assert_eq!(report.discarded_eliminated, 1);
        assert_eq!(target.added(), vec![vec![4, 5]]);
    }

    #[test]
    fn witness_and_unknown_literals_discard_clause() {
        let mut target = Target::new(5);
        target.witness.push(-3);
        let batch = vec![vec![1, 1, -3], vec![1, 2, 6], vec![1, 3, 4]];
        let report = selector(100, Heuristic::Size)
            .import(&mut target, &FalseProbabilities::default(), &batch)
            .unwrap();
        assert_eq!(report.discarded_witness, 1);
        assert_eq!(report.discarded_unknown, 1);
        assert_eq!(target.added(), vec![vec![3, 4]]);
    }

    #[test]
    fn fixed_literals_drop_or_discard() {
        let mut target = Target::new(10).fix(1).fix(-2);
        let batch = vec![
            // Satisfied by 1.
            vec![1, 1, 3, 4],
            // -2 is false and dropped.
            vec![1, 2, 3, 4],
        ];
        let report = selector(100, Heuristic::Size)
            .import(&mut target, &FalseProbabilities::default(), &batch)
            .unwrap();
        assert_eq!(report.discarded_satisfied, 1);
        assert_eq!(report.dropped_literals, 1);
        assert_eq!(target.added(), vec![vec![3, 4]]);
    }

    #[test]
    fn clause_shrinking_to_unit_is_assigned() {
        let mut target = Target::new(10).fix(-1).fix(-2);
        let batch = vec![vec![4, 1, 2, -7], vec![2, 3, 4]];
        let report = selector(0, Heuristic::Size)
            .import(&mut target, &FalseProbabilities::default(), &batch)
            .unwrap();
        assert_eq!(target.units, vec![-7]);
        assert_eq!(report.units, 1);
        assert_eq!(report.candidates, 1);
        assert_eq!(report.charged, 2);
        assert!(target.added.is_empty());
    }

    #[test]
    fn clause_with_only_false_literals_is_discarded() {
        let mut target = Target::new(10).fix(-1).fix(-2);
        let report = selector(100, Heuristic::Size)
            .import(&mut target, &FalseProbabilities::default(), &[vec![1, 1, 2]])
            .unwrap();
        assert_eq!(report.discarded_falsified, 1);
        assert!(target.units.is_empty());
    }

    #[test]
    fn units_bypass_ranking_and_are_charged_two() {
        let mut target = Target::new(10);
        let batch = vec![vec![5], vec![1, 1, 2, 3], vec![-6]];
        let report = selector(50, Heuristic::Size)
            .import(&mut target, &FalseProbabilities::default(), &batch)
            .unwrap();
        assert_eq!(target.units, vec![5, -6]);
        assert_eq!(report.units, 2);
        // Offered 4 + 2 * 2 = 8, budget 4, units already charged 4.
        assert_eq!(report.budget, 4.0);
        assert_eq!(report.imported, 0);
        assert_eq!(report.charged, 4);
    }

    #[test]
    fn units_that_cannot_be_assigned_are_skipped() {
        let mut target = Target::new(10).fix(3);
        target.witness.push(1);
        target.substituted.push(Variable::from_index(1).unwrap());
        let batch = vec![vec![1], vec![2], vec![-3], vec![11]];
        let report = selector(100, Heuristic::Size)
            .import(&mut target, &FalseProbabilities::default(), &batch)
            .unwrap();
        assert_eq!(report.skipped_units, 4);
        assert_eq!(report.charged, 0);
        assert!(target.units.is_empty());
    }

    #[test]
    fn stops_as_soon_as_solved() {
        let mut target = Target::new(10);
        target.satisfied_after_units = Some(1);
        let batch = vec![vec![1, 2, 3], vec![4], vec![1, 5, 6], vec![7]];
        let report = selector(100, Heuristic::Size)
            .import(&mut target, &FalseProbabilities::default(), &batch)
            .unwrap();
        assert_eq!(report.status, ImportStatus::Satisfied);
        assert_eq!(report.received, 2);
        assert!(target.added.is_empty());
        assert_eq!(target.units, vec![4]);
    }

    #[test]
    fn unsat_target_stops_pass() {
        let mut target = Target::new(10);
        target.unsat = true;
        let report = selector(100, Heuristic::Size)
            .import(&mut target, &FalseProbabilities::default(), &[vec![1, 2, 3]])
            .unwrap();
        assert_eq!(report.status, ImportStatus::Unsatisfied);
        assert!(target.added.is_empty());
    }

    #[test]
    fn malformed_payloads_are_protocol_violations() {
        let mut selector = selector(100, Heuristic::Size);
        let probabilities = FalseProbabilities::default();
        let mut target = Target::new(10);
        let empty: Vec<Vec<i32>> = vec![vec![]];
        assert_eq!(
            selector.import(&mut target, &probabilities, &empty),
            Err(ImportError::EmptyClause)
        );
        assert_eq!(
            selector.import(&mut target, &probabilities, &[vec![0, 1, 2]]),
            Err(ImportError::InvalidGlue(0))
        );
        assert_eq!(
            selector.import(&mut target, &probabilities, &[vec![-3, 1, 2]]),
            Err(ImportError::InvalidGlue(-3))
        );
        assert_eq!(
            selector.import(&mut target, &probabilities, &[vec![2, 1, 0, 3]]),
            Err(ImportError::ZeroLiteral)
        );
        assert_eq!(
            selector.import(&mut target, &probabilities, &[vec![0]]),
            Err(ImportError::ZeroLiteral)
        );
    }

    #[test]
    fn duplicate_variables_are_kept() {
        let mut target = Target::new(10);
        selector(100, Heuristic::Size)
            .import(&mut target, &FalseProbabilities::default(), &[vec![1, 3, 3, 4]])
            .unwrap();
        assert_eq!(target.added, vec![(vec![3, 3, 4], 1)]);
    }

    #[test]
    fn glue_is_passed_through() {
        let mut target = Target::new(10);
        selector(100, Heuristic::Size)
            .import(&mut target, &FalseProbabilities::default(), &[vec![7, 1, 2]])
            .unwrap();
        assert_eq!(target.added, vec![(vec![1, 2], 7)]);
    }
}
