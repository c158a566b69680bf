use ahash::RandomState;
use std::collections::{
    hash_map,
    HashMap,
};

/// Running mean and variance of the glue observed for one clause.
///
/// Uses Welford's online algorithm.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LbdAggregate {
    count: i64,
    mean: f64,
    m2: f64,
}

impl LbdAggregate {
    /// Creates an aggregate from its first observation.
    pub fn new(first: f64) -> Self {
        Self {
            count: 1,
            mean: first,
            m2: 0.0,
        }
    }

    /// Adds an observation.
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Returns the number of observations.
    pub fn count(&self) -> i64 {
        self.count
    }

    /// Returns the mean of all observations.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Returns the sample variance of all observations.
    ///
    /// Zero for a single observation.
    pub fn variance(&self) -> f64 {
        if self.count <= 1 {
            return 0.0
        }
        self.m2 / (self.count - 1) as f64
    }
}

/// Glue statistics keyed by clause signature.
///
/// The signature of a clause is its sorted list of DIMACS literals, so that
/// the same clause learned with a different literal order is aggregated
/// together. Entries are never removed.
#[derive(Debug, Default, Clone)]
pub struct LbdStats {
    data: HashMap<Box<[i32]>, LbdAggregate, RandomState>,
}

impl LbdStats {
    /// Records the glue of a clause given by its DIMACS literals.
    pub fn update(&mut self, literals: &[i32], glue: u32) {
        let signature = Self::signature(literals);
        let glue = f64::from(glue);
        match self.data.entry(signature) {
            hash_map::Entry::Occupied(mut entry) => entry.get_mut().update(glue),
            hash_map::Entry::Vacant(entry) => {
                entry.insert(LbdAggregate::new(glue));
            }
        }
    }

    /// Returns the aggregate of the clause if it has been recorded.
    pub fn get(&self, literals: &[i32]) -> Option<&LbdAggregate> {
        self.data.get(&Self::signature(literals))
    }

    /// Returns the number of distinct clause signatures.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterates over all signatures and their aggregates in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&[i32], &LbdAggregate)> {
        self.data
            .iter()
            .map(|(signature, aggregate)| (&signature[..], aggregate))
    }

    /// Returns all entries whose glue varied, sorted by signature.
    pub fn varying(&self) -> Vec<(&[i32], &LbdAggregate)> {
        let mut entries = self
            .iter()
            .filter(|(_, aggregate)| aggregate.variance() != 0.0)
            .collect::<Vec<_>>();
        entries.sort_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs));
        entries
    }

    fn signature(literals: &[i32]) -> Box<[i32]> {
        let mut signature = literals.to_vec().into_boxed_slice();
        signature.sort_unstable();
        signature
    }
}
