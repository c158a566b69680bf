//! Decaying estimator with an exponential and a cumulative part.
//!
//! The exponential part is a plain exponential moving average that starts at
//! zero. The cumulative part compensates for that start bias and vanishes
//! over time, so that [`Cema::value`] is an unbiased estimate from the first
//! observation on.
//!
//! Both parts can be advanced by `k` identical observations in constant time
//! which allows estimators of idle variables to be caught up lazily.

/// A cumulative exponential moving average.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Cema {
    exponential_part: f64,
    cumulative_part: f64,
    elapsed_ticks: f64,
    /// Always `(1 - alpha)^elapsed_ticks`, maintained incrementally.
    cumulative_factor: f64,
    alpha: f64,
}

impl Cema {
    /// Creates a new estimator with the given decay rate.
    ///
    /// # Note
    ///
    /// `alpha` is expected to lie in `(0, 1]`, which is enforced when the
    /// configuration is validated.
    pub fn new(alpha: f64) -> Self {
        debug_assert!(alpha > 0.0 && alpha <= 1.0);
        Self {
            exponential_part: 0.0,
            cumulative_part: 0.0,
            elapsed_ticks: 0.0,
            cumulative_factor: 1.0,
            alpha,
        }
    }

    /// Returns the decay rate of the estimator.
    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Returns the number of observations consumed so far.
    #[inline]
    pub fn elapsed_ticks(&self) -> f64 {
        self.elapsed_ticks
    }

    /// Returns `(1 - alpha)^elapsed_ticks`.
    #[inline]
    pub fn cumulative_factor(&self) -> f64 {
        self.cumulative_factor
    }

    /// Returns the current estimate.
    ///
    /// # Note
    ///
    /// Floating point drift may push the estimate slightly outside of the
    /// range of the observations. Callers that need a probability must clamp.
    #[inline]
    pub fn value(&self) -> f64 {
        self.exponential_part + self.cumulative_part
    }

    /// Returns `(1 - alpha)^repetition` for this estimator's decay rate.
    #[inline]
    pub fn exp_factor(&self, repetition: i64) -> f64 {
        decay_factor(self.alpha, repetition)
    }

    /// Advances the estimator by a single observation.
    #[inline]
    pub fn update(&mut self, observation: f64) {
        self.bulk_update_with_factor(observation, 1, 1.0 - self.alpha)
    }

    /// Advances the estimator by `repetition` identical observations.
    ///
    /// Equivalent to calling [`Cema::update`] `repetition` times.
    /// A repetition of zero leaves the estimator untouched.
    pub fn bulk_update(&mut self, observation: f64, repetition: i64) {
        if repetition <= 0 {
            return
        }
        let exp_factor = self.exp_factor(repetition);
        self.bulk_update_with_factor(observation, repetition, exp_factor)
    }

    /// Advances the estimator by `repetition` identical observations using a
    /// precomputed `exp_factor == (1 - alpha)^repetition`.
    ///
    /// This allows callers to share one `powf` between many estimators that
    /// are caught up by the same amount of ticks.
    pub fn bulk_update_with_factor(
        &mut self,
        observation: f64,
        repetition: i64,
        exp_factor: f64,
    ) {
        if repetition <= 0 {
            return
        }
        let repetition = repetition as f64;
        let exponential_part =
            observation + (self.exponential_part - observation) * exp_factor;
        if self.cumulative_factor != 0.0 || self.cumulative_part != 0.0 {
            let total = self.elapsed_ticks + repetition;
            self.cumulative_part = exp_factor
                * (self.cumulative_part
                    + repetition
                        * (self.cumulative_factor * observation - self.cumulative_part)
                        / total);
        }
        self.exponential_part = exponential_part;
        self.elapsed_ticks += repetition;
        self.cumulative_factor *= exp_factor;
    }
}

/// Returns `(1 - alpha)^repetition`.
#[inline]
pub fn decay_factor(alpha: f64, repetition: i64) -> f64 {
    match i32::try_from(repetition) {
        Ok(repetition) => (1.0 - alpha).powi(repetition),
        Err(_) => (1.0 - alpha).powf(repetition as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn fresh_estimator_is_zero() {
        let cema = Cema::new(0.1);
        assert_eq!(cema.value(), 0.0);
        assert_eq!(cema.cumulative_factor(), 1.0);
        assert_eq!(cema.elapsed_ticks(), 0.0);
    }

    #[test]
    fn first_observation_is_unbiased() {
        for alpha in [0.001, 0.1, 0.5, 0.9] {
            let mut cema = Cema::new(alpha);
            cema.update(1.0);
            assert!((cema.value() - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn constant_observations_converge_immediately() {
        let mut cema = Cema::new(0.3);
        for _ in 0..50 {
            cema.update(1.0);
            assert!((cema.value() - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn alternating_observations_match_reference() {
        // Reference values computed for alpha = 0.3.
        let expected = [1.0, 0.455, 0.675_666_666_666_666_6, 0.792_975];
        let mut cema = Cema::new(0.3);
        for (observation, expected) in [1.0, 0.0, 1.0, 1.0].iter().zip(expected) {
            cema.update(*observation);
            assert!((cema.value() - expected).abs() < EPSILON);
        }
    }

    #[test]
    fn zero_repetition_is_noop() {
        let mut cema = Cema::new(0.2);
        cema.update(1.0);
        let before = cema;
        cema.bulk_update(0.0, 0);
        assert_eq!(cema, before);
        cema.bulk_update_with_factor(0.0, 0, 0.5);
        assert_eq!(cema, before);
    }

    #[test]
    fn cumulative_factor_tracks_elapsed_ticks() {
        let mut cema = Cema::new(0.25);
        cema.bulk_update(1.0, 3);
        cema.update(0.0);
        cema.bulk_update(0.0, 6);
        assert_eq!(cema.elapsed_ticks(), 10.0);
        assert!((cema.cumulative_factor() - 0.75f64.powi(10)).abs() < 1e-15);
    }

    #[test]
    fn precomputed_factor_matches_computed_factor() {
        let mut lhs = Cema::new(0.05);
        let mut rhs = Cema::new(0.05);
        lhs.bulk_update(1.0, 17);
        rhs.bulk_update_with_factor(1.0, 17, decay_factor(0.05, 17));
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn alpha_one_tracks_last_observation() {
        let mut cema = Cema::new(1.0);
        cema.update(1.0);
        cema.update(0.0);
        assert!(cema.value().abs() < EPSILON);
        cema.bulk_update(1.0, 4);
        assert!((cema.value() - 1.0).abs() < EPSILON);
    }

    fn history() -> impl Strategy<Value = Vec<(bool, i64)>> {
        prop::collection::vec((any::<bool>(), 0i64..40), 0..12)
    }

    proptest! {
        #[test]
        fn bulk_update_equals_repeated_update(
            alpha in 0.001f64..0.999,
            prefix in history(),
            observation in any::<bool>(),
            repetition in 0i64..200,
        ) {
            let mut bulk = Cema::new(alpha);
            let mut single = Cema::new(alpha);
            for (value, count) in prefix {
                let value = if value { 1.0 } else { 0.0 };
                bulk.bulk_update(value, count);
                for _ in 0..count {
                    single.update(value);
                }
            }
            let observation = if observation { 1.0 } else { 0.0 };
            bulk.bulk_update(observation, repetition);
            for _ in 0..repetition {
                single.update(observation);
            }
            prop_assert!((bulk.value() - single.value()).abs() < EPSILON);
            prop_assert_eq!(bulk.elapsed_ticks(), single.elapsed_ticks());
        }

        #[test]
        fn binary_observations_stay_near_unit_interval(
            alpha in 0.001f64..0.999,
            steps in history(),
        ) {
            let mut cema = Cema::new(alpha);
            for (value, count) in steps {
                cema.bulk_update(if value { 1.0 } else { 0.0 }, count);
                prop_assert!(cema.value() > -1e-6 && cema.value() < 1.0 + 1e-6);
            }
        }
    }
}
