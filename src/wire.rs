//! Stream framing of learned clauses exchanged between portfolio workers.
//!
//! A clause is sent as its literals followed by the trailer `[0, glue]`,
//! every value being a native-endian `i32`. There is no length prefix: the
//! `0` sentinel, which is never a valid literal, ends the literals.

use std::io::{
    self,
    Read,
    Write,
};
use thiserror::Error;

const WORD: usize = core::mem::size_of::<i32>();

/// Errors of the clause transport.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("clause transport failed")]
    Io(#[from] io::Error),
    #[error("partial write of {written} out of {expected} bytes")]
    PartialWrite { expected: usize, written: usize },
    #[error("clause stream ended in the middle of a clause")]
    Truncated,
}

/// A clause as received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireClause {
    /// Literals in the external namespace.
    pub literals: Vec<i32>,
    pub glue: i32,
}

impl WireClause {
    /// Converts the clause into the payload layout consumed by the import
    /// selector: `[literal]` for units and `[glue, literals...]` otherwise.
    ///
    /// A clause without literals yields an empty payload.
    pub fn into_payload(self) -> Vec<i32> {
        match self.literals.len() {
            0 => Vec::new(),
            1 => self.literals,
            len => {
                let mut payload = Vec::with_capacity(len + 1);
                payload.push(self.glue);
                payload.extend(self.literals);
                payload
            }
        }
    }
}

/// Sends clauses over a byte stream.
#[derive(Debug)]
pub struct ClauseWriter<W> {
    inner: W,
    sent: u64,
}

impl<W> ClauseWriter<W>
where
    W: Write,
{
    pub fn new(inner: W) -> Self {
        Self { inner, sent: 0 }
    }

    /// Returns the number of clauses sent so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Sends a clause.
    ///
    /// The literals and the trailer are each handed to a single `write`.
    ///
    /// # Errors
    ///
    /// If a `write` fails or accepts fewer bytes than requested. Partial
    /// writes are not retried.
    pub fn send(&mut self, literals: &[i32], glue: i32) -> Result<(), WireError> {
        let bytes = literals
            .iter()
            .flat_map(|literal| literal.to_ne_bytes())
            .collect::<Vec<u8>>();
        self.write_all_once(&bytes)?;
        let mut trailer = [0u8; 2 * WORD];
        trailer[WORD..].copy_from_slice(&glue.to_ne_bytes());
        self.write_all_once(&trailer)?;
        self.sent += 1;
        Ok(())
    }

    fn write_all_once(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        if bytes.is_empty() {
            return Ok(())
        }
        let written = self.inner.write(bytes)?;
        if written != bytes.len() {
            return Err(WireError::PartialWrite {
                expected: bytes.len(),
                written,
            })
        }
        Ok(())
    }

    /// Flushes the underlying stream.
    ///
    /// # Errors
    ///
    /// If flushing fails.
    pub fn flush(&mut self) -> Result<(), WireError> {
        self.inner.flush().map_err(Into::into)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Receives clauses from a byte stream.
#[derive(Debug)]
pub struct ClauseReader<R> {
    inner: R,
}

impl<R> ClauseReader<R>
where
    R: Read,
{
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads the next clause.
    ///
    /// Returns `None` if the stream ends cleanly between two clauses.
    ///
    /// # Errors
    ///
    /// If reading fails or the stream ends in the middle of a clause.
    pub fn read_clause(&mut self) -> Result<Option<WireClause>, WireError> {
        let mut literals = Vec::new();
        let mut word = match self.read_word()? {
            Some(word) => word,
            None => return Ok(None),
        };
        while word != 0 {
            literals.push(word);
            word = self.read_word()?.ok_or(WireError::Truncated)?;
        }
        let glue = self.read_word()?.ok_or(WireError::Truncated)?;
        Ok(Some(WireClause { literals, glue }))
    }

    /// Reads one word, returning `None` on a clean end of stream.
    fn read_word(&mut self) -> Result<Option<i32>, WireError> {
        let mut buffer = [0u8; WORD];
        let mut filled = 0;
        while filled < WORD {
            match self.inner.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(error.into()),
            }
        }
        match filled {
            0 => Ok(None),
            WORD => Ok(Some(i32::from_ne_bytes(buffer))),
            _ => Err(WireError::Truncated),
        }
    }
}

impl<R> Iterator for ClauseReader<R>
where
    R: Read,
{
    type Item = Result<WireClause, WireError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_clause().transpose()
    }
}
