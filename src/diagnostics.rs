//! Diagnostic samples for validating the cheap clause quality proxies.
//!
//! A [`Recorder`] is owned by the worker that produces the samples. Samples
//! never influence solving.

use std::io::{
    self,
    Write,
};

/// Fuzzy glue of a learned clause next to its actual glue.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FuzzyLbdSample {
    pub fuzzy: f64,
    pub expected: u32,
    pub size: usize,
}

impl FuzzyLbdSample {
    /// Returns the absolute error of the fuzzy glue.
    pub fn error(&self) -> f64 {
        (self.fuzzy - f64::from(self.expected)).abs()
    }
}

/// Polarity based estimates for a conflicting clause.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConflictSample {
    pub conflict_probability: f64,
    pub stability_sum: f64,
    pub size: usize,
}

/// Sink for diagnostic samples.
pub trait Recorder {
    /// Records the fuzzy glue of a learned clause.
    fn record_fuzzy_lbd(&mut self, sample: &FuzzyLbdSample) -> io::Result<()>;

    /// Records the estimates for a conflicting clause.
    fn record_conflict(&mut self, sample: &ConflictSample) -> io::Result<()>;
}

/// Discards all samples.
#[derive(Debug, Default, Copy, Clone)]
pub struct NullRecorder;

impl Recorder for NullRecorder {
    fn record_fuzzy_lbd(&mut self, _sample: &FuzzyLbdSample) -> io::Result<()> {
        Ok(())
    }

    fn record_conflict(&mut self, _sample: &ConflictSample) -> io::Result<()> {
        Ok(())
    }
}

/// Writes samples as comma separated rows into two streams.
#[derive(Debug)]
pub struct CsvRecorder<W> {
    lbd: W,
    conflict: W,
}

impl<W> CsvRecorder<W>
where
    W: Write,
{
    /// Creates a recorder and writes the header row of both streams.
    ///
    /// # Errors
    ///
    /// If writing a header fails.
    pub fn new(mut lbd: W, mut conflict: W) -> io::Result<Self> {
        writeln!(lbd, "fuzzy, expected, error, size")?;
        writeln!(conflict, "fuzzy, sum, size")?;
        Ok(Self { lbd, conflict })
    }

    /// Flushes and returns both streams.
    ///
    /// # Errors
    ///
    /// If flushing fails.
    pub fn into_inner(mut self) -> io::Result<(W, W)> {
        self.lbd.flush()?;
        self.conflict.flush()?;
        Ok((self.lbd, self.conflict))
    }
}

impl<W> Recorder for CsvRecorder<W>
where
    W: Write,
{
    fn record_fuzzy_lbd(&mut self, sample: &FuzzyLbdSample) -> io::Result<()> {
        writeln!(
            self.lbd,
            "{}, {}, {}, {}",
            sample.fuzzy,
            sample.expected,
            sample.error(),
            sample.size
        )
    }

    fn record_conflict(&mut self, sample: &ConflictSample) -> io::Result<()> {
        writeln!(
            self.conflict,
            "{}, {}, {}",
            sample.conflict_probability, sample.stability_sum, sample.size
        )
    }
}
