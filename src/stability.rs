use crate::{
    cema::{
        decay_factor,
        Cema,
    },
    Literal,
    Sign,
    Variable,
    VariableArray,
};

/// Read access to the three-valued assignment of variables.
///
/// Implemented by whatever owns the assignment of a worker.
pub trait VariableValues {
    /// Returns the value of the variable or `None` if it is unassigned.
    fn value(&self, variable: Variable) -> Option<Sign>;
}

/// Per-literal probabilities as consumed by the clause heuristics.
///
/// All returned values lie in `[0, 1]`.
pub trait LiteralProbabilities {
    /// Probability that the literal has recently been false.
    fn probability_false(&self, literal: Literal) -> f64;

    /// Probability that the literal has recently been true.
    fn probability_true(&self, literal: Literal) -> f64;

    /// Probability that the literal's variable has recently been unassigned.
    fn probability_unassigned(&self, literal: Literal) -> f64 {
        clamp_probability(
            1.0 - self.probability_true(literal) - self.probability_false(literal),
        )
    }
}

/// Clamps the value into `[0, 1]`.
#[inline]
pub(crate) fn clamp_probability(value: f64) -> f64 {
    value.max(0.0).min(1.0)
}

/// The stability estimators of a single variable.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StabilityRecord {
    true_stability: Cema,
    false_stability: Cema,
    last_updated: i64,
}

impl StabilityRecord {
    fn new(alpha: f64) -> Self {
        Self {
            true_stability: Cema::new(alpha),
            false_stability: Cema::new(alpha),
            last_updated: 0,
        }
    }

    /// Returns how often the variable has recently been assigned to true.
    pub fn true_stability(&self) -> &Cema {
        &self.true_stability
    }

    /// Returns how often the variable has recently been assigned to false.
    pub fn false_stability(&self) -> &Cema {
        &self.false_stability
    }

    /// Returns the tick of the last synchronization.
    pub fn last_updated(&self) -> i64 {
        self.last_updated
    }
}

/// Memoizes the most recent `(1 - alpha)^repetition`.
#[derive(Debug, Copy, Clone, PartialEq)]
struct ExpFactorCache {
    repetition: i64,
    factor: f64,
}

impl Default for ExpFactorCache {
    fn default() -> Self {
        Self {
            repetition: 0,
            factor: 1.0,
        }
    }
}

impl ExpFactorCache {
    fn get_or_compute(&mut self, alpha: f64, repetition: i64) -> f64 {
        if self.repetition != repetition {
            self.repetition = repetition;
            self.factor = decay_factor(alpha, repetition);
        }
        self.factor
    }
}

/// Keeps a lazily updated true/false stability estimate for every variable.
///
/// Records of variables that are not touched are not updated on every tick.
/// Instead they are caught up in a single step the next time they are
/// synchronized, which yields the same estimate as updating them on every
/// tick since their assignment did not change in the meantime.
#[derive(Debug, Clone)]
pub struct StabilityCollector {
    alpha: f64,
    records: VariableArray<StabilityRecord>,
    cache: ExpFactorCache,
}

impl StabilityCollector {
    /// Creates a new collector with the given decay rate.
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            records: VariableArray::default(),
            cache: ExpFactorCache::default(),
        }
    }

    /// Registers the given number of additional variables.
    ///
    /// New records start at tick `current_tick`.
    pub fn register_variables(&mut self, additional: usize, current_tick: i64) {
        let alpha = self.alpha;
        let new_len = self.records.len() + additional;
        self.records.resize_with(new_len, || {
            StabilityRecord {
                last_updated: current_tick,
                ..StabilityRecord::new(alpha)
            }
        });
    }

    /// Returns the decay rate shared by all records.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Returns the number of registered variables.
    pub fn len_variables(&self) -> usize {
        self.records.len()
    }

    /// Returns the record of the variable.
    ///
    /// # Panics
    ///
    /// If the variable has not been registered.
    pub fn record(&self, variable: Variable) -> &StabilityRecord {
        &self.records[variable]
    }

    /// Catches up the record of the variable to `current_tick`.
    ///
    /// All ticks since the last synchronization are attributed to the
    /// variable's current value. Calling this twice within the same tick is
    /// a no-op the second time.
    ///
    /// # Panics
    ///
    /// If the variable has not been registered.
    pub fn sync_variable<V>(&mut self, variable: Variable, current_tick: i64, values: &V)
    where
        V: VariableValues + ?Sized,
    {
        let Self {
            alpha,
            records,
            cache,
        } = self;
        let record = &mut records[variable];
        let repetition = current_tick - record.last_updated;
        debug_assert!(
            repetition >= 0,
            "tried to back-date stability record of variable {}",
            variable
        );
        if repetition <= 0 {
            return
        }
        let (true_observation, false_observation) = match values.value(variable) {
            Some(Sign::True) => (1.0, 0.0),
            Some(Sign::False) => (0.0, 1.0),
            None => (0.0, 0.0),
        };
        let exp_factor = cache.get_or_compute(*alpha, repetition);
        record
            .true_stability
            .bulk_update_with_factor(true_observation, repetition, exp_factor);
        record
            .false_stability
            .bulk_update_with_factor(false_observation, repetition, exp_factor);
        record.last_updated = current_tick;
    }

    /// Catches up the records of all registered variables to `current_tick`.
    pub fn sync_all<V>(&mut self, current_tick: i64, values: &V)
    where
        V: VariableValues + ?Sized,
    {
        for index in 0..self.records.len() {
            let variable = Variable::from_index(index)
                .expect("encountered out of range variable index");
            self.sync_variable(variable, current_tick, values);
        }
    }

    /// Returns the clamped value of the estimator of the variable being `sign`.
    fn stability(&self, variable: Variable, sign: Sign) -> f64 {
        let record = &self.records[variable];
        let estimate = match sign {
            Sign::True => record.true_stability.value(),
            Sign::False => record.false_stability.value(),
        };
        clamp_probability(estimate)
    }
}

impl LiteralProbabilities for StabilityCollector {
    fn probability_false(&self, literal: Literal) -> f64 {
        self.stability(literal.variable(), !literal.sign())
    }

    fn probability_true(&self, literal: Literal) -> f64 {
        self.stability(literal.variable(), literal.sign())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Assignment used to drive the collector in tests.
    #[derive(Default)]
    struct Values(Vec<Option<Sign>>);

    impl VariableValues for Values {
        fn value(&self, variable: Variable) -> Option<Sign> {
            self.0[variable.into_index()]
        }
    }

    fn var(index: usize) -> Variable {
        Variable::from_index(index).unwrap()
    }

    fn collector(len: usize, alpha: f64) -> StabilityCollector {
        let mut collector = StabilityCollector::new(alpha);
        collector.register_variables(len, 0);
        collector
    }

    #[test]
    fn sync_is_idempotent_within_tick() {
        let values = Values(vec![Some(Sign::True)]);
        let mut collector = collector(1, 0.1);
        collector.sync_variable(var(0), 5, &values);
        let after_first = *collector.record(var(0));
        collector.sync_variable(var(0), 5, &values);
        assert_eq!(*collector.record(var(0)), after_first);
        assert_eq!(after_first.last_updated(), 5);
    }

    #[test]
    fn lazy_sync_matches_eager_sync() {
        let alpha = 0.05;
        let mut values = Values(vec![None, None]);
        let mut lazy = collector(2, alpha);
        let mut eager = collector(2, alpha);
        let schedule = [
            (3, Some(Sign::True)),
            (10, Some(Sign::False)),
            (11, None),
            (40, Some(Sign::True)),
        ];
        let mut tick = 0;
        for (until, next) in schedule.iter().copied() {
            while tick < until {
                tick += 1;
                eager.sync_all(tick, &values);
            }
            lazy.sync_all(tick, &values);
            values.0[0] = next;
        }
        for tick in tick + 1..=60 {
            eager.sync_all(tick, &values);
        }
        lazy.sync_all(60, &values);
        for v in [var(0), var(1)] {
            let l = lazy.record(v);
            let e = eager.record(v);
            assert!((l.true_stability().value() - e.true_stability().value()).abs() < 1e-9);
            assert!((l.false_stability().value() - e.false_stability().value()).abs() < 1e-9);
        }
    }

    #[test]
    fn sync_before_change_matches_eager_sync() {
        let alpha = 0.1;
        let mut lazy_values = Values(vec![None; 3]);
        let mut eager_values = Values(vec![None; 3]);
        let mut lazy = collector(3, alpha);
        let mut eager = collector(3, alpha);
        // (tick, variable, new value), several changes within one tick.
        let changes = [
            (1, 0, Some(Sign::True)),
            (1, 1, Some(Sign::False)),
            (4, 0, None),
            (4, 2, Some(Sign::True)),
            (4, 1, Some(Sign::True)),
            (9, 2, Some(Sign::False)),
            (13, 0, Some(Sign::False)),
        ];
        let mut changes = changes.iter().peekable();
        for tick in 1..=20 {
            // Changes of a tick apply before its observation.
            while let Some((_, index, next)) = changes.next_if(|(at, _, _)| *at == tick) {
                lazy.sync_variable(var(*index), tick - 1, &lazy_values);
                lazy_values.0[*index] = *next;
                eager_values.0[*index] = *next;
            }
            eager.sync_all(tick, &eager_values);
            if tick % 8 == 0 {
                lazy.sync_all(tick, &lazy_values);
            }
        }
        lazy.sync_all(20, &lazy_values);
        for index in 0..3 {
            let l = lazy.record(var(index));
            let e = eager.record(var(index));
            assert_eq!(l.last_updated(), 20);
            assert!((l.true_stability().value() - e.true_stability().value()).abs() < 1e-9);
            assert!((l.false_stability().value() - e.false_stability().value()).abs() < 1e-9);
        }
    }

    #[test]
    fn probabilities_follow_polarity() {
        let values = Values(vec![Some(Sign::True)]);
        let mut collector = collector(1, 0.5);
        collector.sync_variable(var(0), 3, &values);
        let pos = Literal::from(1);
        let neg = Literal::from(-1);
        assert!((collector.probability_true(pos) - 1.0).abs() < 1e-9);
        assert!(collector.probability_false(pos).abs() < 1e-9);
        assert!((collector.probability_false(neg) - 1.0).abs() < 1e-9);
        assert!(collector.probability_true(neg).abs() < 1e-9);
        assert!(collector.probability_unassigned(pos).abs() < 1e-9);
    }

    #[test]
    fn unassigned_variable_is_unassigned_with_certainty() {
        let values = Values(vec![None]);
        let mut collector = collector(1, 0.5);
        collector.sync_variable(var(0), 8, &values);
        let lit = Literal::from(1);
        assert!((collector.probability_unassigned(lit) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn shared_factor_cache_is_reused_for_equal_repetitions() {
        let values = Values(vec![Some(Sign::True), Some(Sign::False)]);
        let mut collector = collector(2, 0.2);
        collector.sync_all(7, &values);
        assert_eq!(collector.cache.repetition, 7);
        assert!((collector.cache.factor - 0.8f64.powi(7)).abs() < 1e-15);
        let t = collector.record(var(0)).true_stability().value();
        let f = collector.record(var(1)).false_stability().value();
        assert!((t - f).abs() < 1e-15);
    }

    #[test]
    fn registered_variables_start_at_given_tick() {
        let mut collector = collector(1, 0.2);
        collector.register_variables(2, 42);
        assert_eq!(collector.len_variables(), 3);
        assert_eq!(collector.record(var(0)).last_updated(), 0);
        assert_eq!(collector.record(var(2)).last_updated(), 42);
    }

    fn sign() -> impl Strategy<Value = Option<Sign>> {
        prop_oneof![
            Just(None),
            Just(Some(Sign::True)),
            Just(Some(Sign::False)),
        ]
    }

    proptest! {
        #[test]
        fn true_and_false_probabilities_sum_to_at_most_one(
            alpha in 0.001f64..1.0,
            steps in prop::collection::vec((sign(), 1i64..30), 1..20),
        ) {
            let mut values = Values(vec![None]);
            let mut collector = collector(1, alpha);
            let mut tick = 0;
            for (next, delta) in steps {
                values.0[0] = next;
                tick += delta;
                collector.sync_variable(var(0), tick, &values);
                for lit in [Literal::from(1), Literal::from(-1)] {
                    let pt = collector.probability_true(lit);
                    let pf = collector.probability_false(lit);
                    let pu = collector.probability_unassigned(lit);
                    prop_assert!(pt + pf <= 1.0 + 1e-9);
                    prop_assert!((0.0..=1.0).contains(&pt));
                    prop_assert!((0.0..=1.0).contains(&pf));
                    prop_assert!((0.0..=1.0).contains(&pu));
                }
            }
        }
    }
}
