use crate::{
    trail_sample::AssignmentReason,
    Literal,
};
use core::fmt;

/// The decision level of an assignment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecisionLevel(u32);

impl DecisionLevel {
    /// The level of assignments that hold unconditionally.
    pub const ROOT: Self = Self(0);

    /// Returns the decision level with the given index.
    pub fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn into_index(self) -> usize {
        self.0 as usize
    }

    /// Returns `true` if this is the root level.
    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl fmt::Display for DecisionLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An assigned literal in assignment order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TrailEntry {
    pub literal: Literal,
    pub reason: AssignmentReason,
}

/// The assigned literals in assignment order, split into decision levels.
#[derive(Debug, Default, Clone)]
pub struct Trail {
    entries: Vec<TrailEntry>,
    /// The start of every decision level above the root.
    limits: Vec<usize>,
}

impl Trail {
    /// Returns the number of assigned literals.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the current decision level.
    pub fn decision_level(&self) -> DecisionLevel {
        DecisionLevel::from_index(self.limits.len())
    }

    /// Opens a new decision level and returns it.
    pub fn new_decision_level(&mut self) -> DecisionLevel {
        self.limits.push(self.entries.len());
        self.decision_level()
    }

    /// Pushes an assigned literal onto the current decision level.
    pub fn push(&mut self, literal: Literal, reason: AssignmentReason) {
        self.entries.push(TrailEntry { literal, reason });
    }

    /// Returns the number of assigned literals at or below the given level.
    ///
    /// # Panics
    ///
    /// If `level` is above the current decision level.
    pub fn level_start(&self, level: DecisionLevel) -> usize {
        assert!(
            level <= self.decision_level(),
            "tried to backjump upwards to decision level {}",
            level
        );
        self.limits
            .get(level.into_index())
            .copied()
            .unwrap_or_else(|| self.entries.len())
    }

    /// Backjumps to the given decision level.
    ///
    /// Calls back with every removed literal, most recent first.
    ///
    /// # Panics
    ///
    /// If `level` is above the current decision level.
    pub fn pop_to_level<F>(&mut self, level: DecisionLevel, mut observer: F)
    where
        F: FnMut(Literal),
    {
        let limit = self.level_start(level);
        self.limits.truncate(level.into_index());
        for entry in self.entries.drain(limit..).rev() {
            observer(entry.literal);
        }
    }

    /// Iterates over all assigned literals and the reason of their assignment.
    pub fn iter(&self) -> impl Iterator<Item = (Literal, AssignmentReason)> + '_ {
        self.entries.iter().map(|entry| (entry.literal, entry.reason))
    }
}
