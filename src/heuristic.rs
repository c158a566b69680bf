use crate::{
    config::ConfigError,
    stability::LiteralProbabilities,
    Literal,
};
use core::{
    cmp::Ordering,
    fmt,
};

/// Thresholds and penalties consumed by some of the heuristics.
///
/// All values are fractions in `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HeuristicParams {
    /// Literals with a false probability above this count as stable.
    pub false_threshold: f64,
    /// Literals with a true probability above this are penalized.
    pub true_threshold: f64,
    /// Penalty for literals that are likely true.
    pub true_penalty: f64,
}

impl Default for HeuristicParams {
    fn default() -> Self {
        Self {
            false_threshold: 0.9,
            true_threshold: 0.9,
            true_penalty: 0.5,
        }
    }
}

/// The clause quality heuristics available for ranking imported clauses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Heuristic {
    /// Number of literals.
    Size,
    /// Product of the literals' false probabilities.
    ProductNorm,
    /// Mean of the literals' false probabilities.
    Average,
    /// Łukasiewicz t-norm over the literals' false probabilities.
    Lukasiewicz,
    /// Smallest false probability.
    Min,
    /// Second smallest false probability.
    SecondMin,
    /// Number of literals that are not stably false.
    UnstableLiteralCount,
    /// Like `UnstableLiteralCount` but with a configurable penalty for
    /// literals that are likely true.
    GeneralizedUnstableLiteralCount,
    /// Sum of unassigned probability and penalized true probability.
    LiteralScoreSum,
}

impl Heuristic {
    /// All heuristics ordered by their configuration code.
    pub const ALL: [Heuristic; 9] = [
        Self::Size,
        Self::ProductNorm,
        Self::Average,
        Self::Lukasiewicz,
        Self::Min,
        Self::SecondMin,
        Self::UnstableLiteralCount,
        Self::GeneralizedUnstableLiteralCount,
        Self::LiteralScoreSum,
    ];

    /// Returns the heuristic for the configuration code.
    ///
    /// # Errors
    ///
    /// If the code does not name a heuristic.
    pub fn from_code(code: u8) -> Result<Self, ConfigError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(ConfigError::UnknownHeuristic(code))
    }

    /// Returns the configuration code of the heuristic.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns `true` if higher values indicate better clauses.
    pub fn higher_is_better(self) -> bool {
        match self {
            Self::Size
            | Self::UnstableLiteralCount
            | Self::GeneralizedUnstableLiteralCount
            | Self::LiteralScoreSum => false,
            Self::ProductNorm
            | Self::Average
            | Self::Lukasiewicz
            | Self::Min
            | Self::SecondMin => true,
        }
    }

    /// Returns `true` if the value `lhs` is strictly better than `rhs`.
    #[inline]
    pub fn is_better(self, lhs: f64, rhs: f64) -> bool {
        match self.higher_is_better() {
            true => lhs > rhs,
            false => lhs < rhs,
        }
    }

    /// Orders two heuristic values so that the better one comes first.
    pub fn cmp_values(self, lhs: f64, rhs: f64) -> Ordering {
        match self.higher_is_better() {
            true => rhs.total_cmp(&lhs),
            false => lhs.total_cmp(&rhs),
        }
    }

    /// Evaluates the clause.
    ///
    /// Pure with respect to `probabilities`.
    pub fn evaluate<P>(
        self,
        params: &HeuristicParams,
        probabilities: &P,
        literals: &[Literal],
    ) -> f64
    where
        P: LiteralProbabilities + ?Sized,
    {
        let pf = |literal: &Literal| probabilities.probability_false(*literal);
        match self {
            Self::Size => literals.len() as f64,
            Self::ProductNorm => literals.iter().map(pf).product(),
            Self::Average => {
                if literals.is_empty() {
                    return 0.0
                }
                literals.iter().map(pf).sum::<f64>() / literals.len() as f64
            }
            Self::Lukasiewicz => {
                literals
                    .iter()
                    .map(pf)
                    .fold(1.0, |acc, pf| (acc + pf - 1.0).max(0.0))
            }
            Self::Min => literals.iter().map(pf).fold(1.0, f64::min),
            Self::SecondMin => second_min(literals.iter().map(pf)),
            Self::UnstableLiteralCount => {
                literals
                    .iter()
                    .map(pf)
                    .filter(|&pf| pf <= params.false_threshold)
                    .count() as f64
            }
            Self::GeneralizedUnstableLiteralCount => {
                literals
                    .iter()
                    .map(|&literal| {
                        if probabilities.probability_false(literal) > params.false_threshold {
                            0.0
                        } else if probabilities.probability_true(literal)
                            > params.true_threshold
                        {
                            params.true_penalty
                        } else {
                            1.0
                        }
                    })
                    .sum()
            }
            Self::LiteralScoreSum => {
                literals
                    .iter()
                    .map(|&literal| {
                        probabilities.probability_unassigned(literal)
                            + probabilities.probability_true(literal) * params.true_penalty
                    })
                    .sum()
            }
        }
    }
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Size => "size",
            Self::ProductNorm => "product-norm",
            Self::Average => "average",
            Self::Lukasiewicz => "lukasiewicz",
            Self::Min => "min",
            Self::SecondMin => "second-min",
            Self::UnstableLiteralCount => "unstable-literal-count",
            Self::GeneralizedUnstableLiteralCount => "generalized-unstable-literal-count",
            Self::LiteralScoreSum => "literal-score-sum",
        };
        write!(f, "{}", name)
    }
}

/// Returns the second smallest value, or the smallest if there is only one.
///
/// Returns `1.0` for an empty input.
fn second_min<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut min = f64::INFINITY;
    let mut second = f64::INFINITY;
    for value in values {
        if value < min {
            second = min;
            min = value;
        } else if value < second {
            second = value;
        }
    }
    if second.is_finite() {
        second
    } else if min.is_finite() {
        min
    } else {
        1.0
    }
}
