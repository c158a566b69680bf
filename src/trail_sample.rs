//! Decaying per-variable statistics sampled from the trail.
//!
//! The samples back two cheap clause quality proxies: the fuzzy glue of a
//! clause, which approximates its glue without knowing the decision levels of
//! its literals, and the estimated probability that a clause is in conflict.

use crate::{
    cema::Cema,
    stability::clamp_probability,
    Literal,
    VariableArray,
};

/// Why a literal ended up on the trail.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AssignmentReason {
    Decision,
    Propagation,
}

impl AssignmentReason {
    fn observation(self) -> f64 {
        match self {
            Self::Decision => 1.0,
            Self::Propagation => 0.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct TrailRecord {
    /// Observes 1 for decisions and 0 for propagations.
    reason: Cema,
    /// Observes 1 if assigned true and 0 if assigned false.
    polarity: Cema,
}

/// Per-variable assignment reason and polarity averages.
#[derive(Debug, Clone)]
pub struct TrailSampler {
    alpha: f64,
    records: VariableArray<TrailRecord>,
    samples: u64,
}

impl TrailSampler {
    /// Creates a new sampler with the given decay rate.
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            records: VariableArray::default(),
            samples: 0,
        }
    }

    /// Registers the given number of additional variables.
    pub fn register_variables(&mut self, additional: usize) {
        let alpha = self.alpha;
        let new_len = self.records.len() + additional;
        self.records.resize_with(new_len, || {
            TrailRecord {
                reason: Cema::new(alpha),
                polarity: Cema::new(alpha),
            }
        });
    }

    /// Returns the number of trails sampled so far.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Updates the averages of every variable on the trail.
    ///
    /// Variables that are not on the trail are left untouched.
    ///
    /// # Panics
    ///
    /// If the trail contains an unregistered variable.
    pub fn sample<I>(&mut self, trail: I)
    where
        I: IntoIterator<Item = (Literal, AssignmentReason)>,
    {
        for (literal, reason) in trail {
            let record = &mut self.records[literal.variable()];
            record.reason.update(reason.observation());
            record.polarity.update(if literal.is_positive() { 1.0 } else { 0.0 });
        }
        self.samples += 1;
    }

    /// Returns how often the literal's variable has recently been a decision.
    pub fn decision_ratio(&self, literal: Literal) -> f64 {
        self.records[literal.variable()].reason.value()
    }

    /// Returns the estimated probability that the literal is satisfied.
    pub fn probability_satisfied(&self, literal: Literal) -> f64 {
        let positive = clamp_probability(self.records[literal.variable()].polarity.value());
        match literal.is_positive() {
            true => positive,
            false => 1.0 - positive,
        }
    }

    /// Sums the decision ratios of the clause's literals.
    pub fn fuzzy_lbd(&self, literals: &[Literal]) -> f64 {
        literals
            .iter()
            .map(|&literal| self.decision_ratio(literal))
            .sum()
    }

    /// Returns the estimated probability that no literal is satisfied.
    pub fn estimated_conflict_probability(&self, literals: &[Literal]) -> f64 {
        literals
            .iter()
            .map(|&literal| 1.0 - self.probability_satisfied(literal))
            .product()
    }

    /// Returns one plus the sum of satisfaction probabilities.
    pub fn stability_sum(&self, literals: &[Literal]) -> f64 {
        1.0 + literals
            .iter()
            .map(|&literal| self.probability_satisfied(literal))
            .sum::<f64>()
    }
}
