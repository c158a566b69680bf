use crate::{
    config::{
        ConfigError,
        ImportConfig,
    },
    worker::{
        Worker,
        WorkerError,
    },
    Literal,
};
use cnf_parser::{
    Input,
    Output,
};
use thiserror::Error;

/// Errors raised while building a worker from DIMACS input.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing problem line before clause inputs")]
    MissingProblemLine,
    #[error("literal {literal} exceeds the {len_variables} declared variables")]
    UndeclaredVariable { literal: i32, len_variables: usize },
    #[error("failed to set up worker")]
    Worker(#[from] WorkerError),
}

/// Builds a [`Worker`] from a DIMACS CNF formula.
///
/// Literals of a clause are sorted and deduplicated and tautological
/// clauses are skipped.
#[derive(Debug)]
pub struct WorkerBuilder {
    worker: Worker,
    len_variables: Option<usize>,
    current_clause: Vec<Literal>,
    tautologies: usize,
}

impl WorkerBuilder {
    /// Creates a builder for a worker with the given configuration.
    ///
    /// # Errors
    ///
    /// If the configuration is invalid.
    pub fn new(config: ImportConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            worker: Worker::new(config)?,
            len_variables: None,
            current_clause: Vec::new(),
            tautologies: 0,
        })
    }

    /// Returns the number of skipped tautological clauses.
    pub fn tautologies(&self) -> usize {
        self.tautologies
    }

    fn finalize_current_clause(&mut self) -> Result<(), BuildError> {
        if self.len_variables.is_none() {
            return Err(BuildError::MissingProblemLine)
        }
        let mut literals = core::mem::take(&mut self.current_clause);
        literals.sort_unstable();
        literals.dedup();
        // Both literals of a variable are neighbours after sorting.
        let tautological = literals
            .windows(2)
            .any(|pair| pair[0].variable() == pair[1].variable());
        if tautological {
            self.tautologies += 1;
            return Ok(())
        }
        self.worker.add_clause(literals)?;
        Ok(())
    }

    pub fn finalize(self) -> Worker {
        self.worker
    }
}

impl Output for WorkerBuilder {
    type Error = BuildError;

    fn problem(&mut self, num_variables: u32, _num_clauses: u32) -> Result<(), Self::Error> {
        let num_variables = num_variables as usize;
        self.len_variables = Some(num_variables);
        self.worker.register_variables(num_variables)?;
        Ok(())
    }

    fn literal(&mut self, literal: cnf_parser::Literal) -> Result<(), Self::Error> {
        let literal = Literal::from(literal);
        let len_variables = self.len_variables.ok_or(BuildError::MissingProblemLine)?;
        if literal.variable().into_index() >= len_variables {
            return Err(BuildError::UndeclaredVariable {
                literal: literal.into_dimacs(),
                len_variables,
            })
        }
        self.current_clause.push(literal);
        Ok(())
    }

    fn finalize_clause(&mut self) -> Result<(), Self::Error> {
        self.finalize_current_clause()
    }

    fn finish(&mut self) -> Result<(), Self::Error> {
        if !self.current_clause.is_empty() {
            self.finalize_current_clause()?;
        }
        Ok(())
    }
}

impl Worker {
    /// Builds a worker from a DIMACS CNF formula.
    ///
    /// # Errors
    ///
    /// - If the configuration is invalid.
    /// - If the input is not a valid DIMACS CNF formula.
    pub fn from_cnf<I>(config: ImportConfig, input: &mut I) -> Result<Self, crate::Error>
    where
        I: Input,
    {
        let mut builder = WorkerBuilder::new(config)?;
        cnf_parser::parse_cnf(input, &mut builder).map_err(crate::Error::Cnf)?;
        Ok(builder.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Error,
        Heuristic,
    };

    fn build(cnf: &str) -> Result<Worker, Error> {
        Worker::from_cnf(ImportConfig::default(), &mut cnf.as_bytes())
    }

    #[test]
    fn builds_clauses_and_units() {
        let worker = build("p cnf 4 3\n1 -2 0\n3 0\n-1 2 4 0\n").unwrap();
        assert_eq!(worker.len_variables(), 4);
        assert_eq!(worker.clauses().len(), 2);
        assert_eq!(worker.value(Literal::from(3)), Some(true));
        assert!(!worker.is_unsat());
    }

    #[test]
    fn normalizes_clauses() {
        let mut builder = WorkerBuilder::new(ImportConfig::default()).unwrap();
        cnf_parser::parse_cnf(&mut "p cnf 3 2\n2 1 2 0\n1 -1 3 0\n".as_bytes(), &mut builder)
            .unwrap();
        assert_eq!(builder.tautologies(), 1);
        let worker = builder.finalize();
        let (_, clause) = worker.clauses().iter().next().unwrap();
        assert_eq!(clause.literals(), &[Literal::from(1), Literal::from(2)]);
        assert_eq!(worker.clauses().len(), 1);
    }

    #[test]
    fn conflicting_units_are_unsat() {
        let worker = build("p cnf 1 2\n1 0\n-1 0\n").unwrap();
        assert!(worker.is_unsat());
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let config = ImportConfig {
            import_percent: 101,
            import_heuristic: Heuristic::Min,
            ..ImportConfig::default()
        };
        assert!(matches!(
            Worker::from_cnf(config, &mut "p cnf 1 1\n1 0\n".as_bytes()),
            Err(Error::Config(ConfigError::PercentOutOfRange { value: 101, .. }))
        ));
    }

    #[test]
    fn undeclared_variables_are_rejected() {
        assert!(matches!(
            build("p cnf 2 1\n1 3 0\n"),
            Err(Error::Cnf(_))
        ));
    }
}
