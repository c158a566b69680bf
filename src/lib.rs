//! Literal stability estimation and clause import selection for a
//! portfolio CDCL worker.
//!
//! Every worker keeps a lazily updated estimate of how often each of its
//! variables has recently been true or false. Clauses learned by other
//! workers are ranked by one of several [`Heuristic`]s over those estimates
//! and admitted under a literal budget.

#![forbid(unsafe_code)]

mod builder;
pub mod cema;
pub mod config;
pub mod diagnostics;
pub mod heuristic;
pub mod import;
pub mod lbd_stats;
mod literal;
pub mod stability;
pub mod trail_sample;
mod variable_array;
pub mod wire;
pub mod worker;


pub use crate::{
    builder::{
        BuildError,
        WorkerBuilder,
    },
    cema::Cema,
    config::{
        ConfigError,
        ImportConfig,
    },
    heuristic::{
        Heuristic,
        HeuristicParams,
    },
    import::{
        ImportError,
        ImportReport,
        ImportSelector,
        ImportStatus,
    },
    lbd_stats::{
        LbdAggregate,
        LbdStats,
    },
    literal::{
        Literal,
        Sign,
        Variable,
    },
    stability::{
        LiteralProbabilities,
        StabilityCollector,
    },
    variable_array::{
        OutOfBoundsAccess,
        VariableArray,
    },
    wire::WireError,
    worker::{
        Worker,
        WorkerError,
    },
};
use thiserror::Error;

/// Any error of this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),
    #[error("clause import failed")]
    Import(#[from] ImportError),
    #[error("clause transport failed")]
    Wire(#[from] WireError),
    #[error("worker hook failed")]
    Worker(#[from] WorkerError),
    #[error("out of bounds variable access")]
    OutOfBounds(#[from] OutOfBoundsAccess),
    #[error("invalid DIMACS input: {0:?}")]
    Cnf(cnf_parser::Error<BuildError>),
}
