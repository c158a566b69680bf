use import::{
    wire::ClauseReader,
    ConfigError,
    Heuristic,
    ImportConfig,
    ImportError,
    ImportReport,
    LbdStats,
    Worker,
    WorkerError,
};
use std::{
    fs::{
        self,
        File,
    },
    io::{
        self,
        BufReader,
    },
    path::{
        Path,
        PathBuf,
    },
    process,
};
use structopt::StructOpt;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(StructOpt, Debug)]
#[structopt(name = "s3sat-import")]
enum Command {
    /// Runs one import pass of a wire clause stream into a worker built
    /// from a DIMACS CNF file.
    Import(ImportOpt),
    /// Aggregates the glue of every clause signature found in wire streams.
    Aggregate {
        #[structopt(name = "wire streams", parse(from_os_str), required = true)]
        streams: Vec<PathBuf>,
    },
}

#[derive(StructOpt, Debug)]
struct ImportOpt {
    #[structopt(name = "input .cnf file", parse(from_os_str))]
    cnf: PathBuf,
    #[structopt(name = "clause stream", parse(from_os_str))]
    clauses: PathBuf,
    /// External variables to mark as eliminated before importing.
    #[structopt(long = "eliminate")]
    eliminate: Vec<u32>,
    /// External literals that must never be imported.
    #[structopt(long = "witness", allow_hyphen_values = true)]
    witness: Vec<i32>,
    #[structopt(flatten)]
    config: ConfigOpt,
}

#[derive(StructOpt, Debug)]
struct ConfigOpt {
    #[structopt(long, default_value = "100")]
    import_percent: u8,
    /// Code of the ranking heuristic in 0..=8.
    #[structopt(long, default_value = "0")]
    import_heuristic: u8,
    #[structopt(long, default_value = "90")]
    false_stability_threshold: u8,
    #[structopt(long, default_value = "90")]
    true_stability_threshold: u8,
    #[structopt(long, default_value = "50")]
    true_literal_penalty: u8,
    #[structopt(long, default_value = "0.001")]
    stability_ema_alpha: f64,
    #[structopt(long, default_value = "0.01")]
    trail_sample_alpha: f64,
}

impl ConfigOpt {
    fn into_config(self) -> Result<ImportConfig, ConfigError> {
        let config = ImportConfig {
            import_percent: self.import_percent,
            import_heuristic: Heuristic::from_code(self.import_heuristic)?,
            false_stability_threshold: self.false_stability_threshold,
            true_stability_threshold: self.true_stability_threshold,
            true_literal_penalty: self.true_literal_penalty,
            stability_ema_alpha: self.stability_ema_alpha,
            trail_sample_alpha: self.trail_sample_alpha,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Error)]
enum DriverError {
    #[error("couldn't read {}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("unknown external variable {0}")]
    UnknownVariable(u32),
    #[error(transparent)]
    Import(#[from] import::Error),
}

impl From<ConfigError> for DriverError {
    fn from(error: ConfigError) -> Self {
        Self::Import(error.into())
    }
}

impl From<WorkerError> for DriverError {
    fn from(error: WorkerError) -> Self {
        Self::Import(error.into())
    }
}

fn open(path: &Path) -> Result<ClauseReader<BufReader<File>>, DriverError> {
    let file = File::open(path).map_err(|source| {
        DriverError::Io {
            path: path.to_owned(),
            source,
        }
    })?;
    Ok(ClauseReader::new(BufReader::new(file)))
}

fn run_import(opt: ImportOpt) -> Result<ImportReport, DriverError> {
    let config = opt.config.into_config()?;
    let cnf_contents = fs::read(&opt.cnf).map_err(|source| {
        DriverError::Io {
            path: opt.cnf.clone(),
            source,
        }
    })?;
    let mut worker = Worker::from_cnf(config, &mut &cnf_contents[..])?;
    for external in opt.eliminate {
        let literal = i32::try_from(external)
            .ok()
            .and_then(|external| worker.internalize(external))
            .ok_or(DriverError::UnknownVariable(external))?;
        worker.eliminate(literal.variable())?;
    }
    for literal in opt.witness {
        worker.mark_witness(literal);
    }
    let batch = open(&opt.clauses)?
        .map(|clause| clause.map(|clause| clause.into_payload()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(import::Error::from)?;
    info!(
        len_variables = worker.len_variables(),
        len_clauses = worker.clauses().len(),
        received = batch.len(),
        "starting import pass"
    );
    let report = worker.import_clauses(&batch)?;
    Ok(report)
}

fn print_report(report: &ImportReport) {
    println!("status = {:?}", report.status);
    println!("received = {}", report.received);
    println!("units = {} (skipped {})", report.units, report.skipped_units);
    println!("candidates = {}", report.candidates);
    println!("imported = {}", report.imported);
    println!(
        "discarded = {} (witness {}, unknown {}, eliminated {}, satisfied {}, falsified {})",
        report.discarded(),
        report.discarded_witness,
        report.discarded_unknown,
        report.discarded_eliminated,
        report.discarded_satisfied,
        report.discarded_falsified,
    );
    println!("dropped literals = {}", report.dropped_literals);
    println!("charged = {} of budget {:.1}", report.charged, report.budget);
}

fn run_aggregate(streams: Vec<PathBuf>) -> Result<LbdStats, DriverError> {
    let mut stats = LbdStats::default();
    for path in streams {
        for clause in open(&path)? {
            let clause = clause.map_err(import::Error::from)?;
            let glue = u32::try_from(clause.glue)
                .map_err(|_| import::Error::from(ImportError::InvalidGlue(clause.glue)))?;
            stats.update(&clause.literals, glue);
        }
    }
    Ok(stats)
}

fn print_aggregate(stats: &LbdStats) {
    for (literals, aggregate) in stats.varying() {
        println!(
            "{:?}: count = {}, mean = {:.3}, variance = {:.3}",
            literals,
            aggregate.count(),
            aggregate.mean(),
            aggregate.variance(),
        );
    }
    println!("unique clauses = {}", stats.len());
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let result = match Command::from_args() {
        Command::Import(opt) => run_import(opt).map(|report| print_report(&report)),
        Command::Aggregate { streams } => {
            run_aggregate(streams).map(|stats| print_aggregate(&stats))
        }
    };
    if let Err(error) = result {
        eprintln!("error: {}", error);
        let mut source = std::error::Error::source(&error);
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        process::exit(1);
    }
}
