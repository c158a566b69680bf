use super::clause_db::{
    Clause,
    ClauseId,
};
use crate::{
    Literal,
    Sign,
    VariableArray,
};

/// A clause watching a literal.
///
/// The blocker is another literal of the clause. While it is true the clause
/// is satisfied and does not need to be visited.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Watcher {
    pub clause: ClauseId,
    pub blocker: Literal,
}

/// The watchers of both polarities of a single variable.
#[derive(Debug, Clone, Default)]
struct VariableWatchers {
    pos: Vec<Watcher>,
    neg: Vec<Watcher>,
}

impl VariableWatchers {
    fn literal_watchers(&self, literal: Literal) -> &[Watcher] {
        match literal.sign() {
            Sign::True => &self.pos,
            Sign::False => &self.neg,
        }
    }

    fn literal_watchers_mut(&mut self, literal: Literal) -> &mut Vec<Watcher> {
        match literal.sign() {
            Sign::True => &mut self.pos,
            Sign::False => &mut self.neg,
        }
    }
}

/// Records which clauses watch which literals.
#[derive(Debug, Default, Clone)]
pub struct WatchList {
    watchers: VariableArray<VariableWatchers>,
}

impl WatchList {
    /// Registers the given number of additional variables.
    pub fn register_variables(&mut self, additional: usize) {
        let new_len = self.watchers.len() + additional;
        self.watchers.resize_with(new_len, Default::default);
    }

    /// Watches the first two literals of the clause.
    ///
    /// # Panics
    ///
    /// If the clause has less than two literals.
    pub fn watch(&mut self, id: ClauseId, clause: &Clause) {
        match clause.literals() {
            [first, second, ..] => {
                self.register_for_lit(*first, Watcher {
                    clause: id,
                    blocker: *second,
                });
                self.register_for_lit(*second, Watcher {
                    clause: id,
                    blocker: *first,
                });
            }
            _ => panic!("tried to watch clause with less than two literals"),
        }
    }

    fn register_for_lit(&mut self, literal: Literal, watcher: Watcher) {
        self.watchers[literal.variable()]
            .literal_watchers_mut(literal)
            .push(watcher)
    }

    /// Returns the watchers of the literal.
    pub fn watchers(&self, literal: Literal) -> &[Watcher] {
        self.watchers[literal.variable()].literal_watchers(literal)
    }
}
