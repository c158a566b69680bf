use crate::Literal;

/// Identifies a clause of the clause database.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ClauseId(usize);

impl ClauseId {
    fn from_index(index: usize) -> Self {
        Self(index)
    }

    fn into_index(self) -> usize {
        self.0
    }
}

/// A clause owned by the clause database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    literals: Box<[Literal]>,
    glue: u32,
    redundant: bool,
    imported: bool,
}

impl Clause {
    /// Creates a clause of the input formula.
    pub fn irredundant(literals: Vec<Literal>) -> Self {
        let glue = literals.len() as u32;
        Self {
            literals: literals.into_boxed_slice(),
            glue,
            redundant: false,
            imported: false,
        }
    }

    /// Creates a clause learned by this worker.
    pub fn learned(literals: Vec<Literal>, glue: u32) -> Self {
        Self {
            literals: literals.into_boxed_slice(),
            glue,
            redundant: true,
            imported: false,
        }
    }

    /// Creates a clause learned by another worker.
    pub fn imported(literals: Vec<Literal>, glue: u32) -> Self {
        Self {
            imported: true,
            ..Self::learned(literals, glue)
        }
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn glue(&self) -> u32 {
        self.glue
    }

    /// Returns `true` if the clause may be removed without changing the formula.
    pub fn is_redundant(&self) -> bool {
        self.redundant
    }

    pub fn is_imported(&self) -> bool {
        self.imported
    }
}

/// Owns all clauses of a worker.
#[derive(Debug, Default, Clone)]
pub struct ClauseDb {
    clauses: Vec<Clause>,
    len_imported: usize,
}

impl ClauseDb {
    /// Returns the number of stored clauses.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Returns the number of stored imported clauses.
    pub fn len_imported(&self) -> usize {
        self.len_imported
    }

    /// Pushes a clause and returns its identifier.
    pub fn push(&mut self, clause: Clause) -> ClauseId {
        let id = ClauseId::from_index(self.len());
        if clause.is_imported() {
            self.len_imported += 1;
        }
        self.clauses.push(clause);
        id
    }

    /// Returns the clause with the given identifier if any.
    pub fn resolve(&self, id: ClauseId) -> Option<&Clause> {
        self.clauses.get(id.into_index())
    }

    /// Iterates over all clauses and their identifiers in insertion order.
    pub fn iter(&self) -> ClauseDbIter<'_> {
        ClauseDbIter {
            current: 0,
            iter: self.clauses.iter(),
        }
    }
}

impl<'a> IntoIterator for &'a ClauseDb {
    type Item = (ClauseId, &'a Clause);
    type IntoIter = ClauseDbIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct ClauseDbIter<'a> {
    current: usize,
    iter: core::slice::Iter<'a, Clause>,
}

impl<'a> Iterator for ClauseDbIter<'a> {
    type Item = (ClauseId, &'a Clause);

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|clause| {
            let id = ClauseId::from_index(self.current);
            self.current += 1;
            (id, clause)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lits(dimacs: &[i32]) -> Vec<Literal> {
        dimacs.iter().copied().map(Literal::from).collect()
    }

    #[test]
    fn push_and_resolve() {
        let mut db = ClauseDb::default();
        let a = db.push(Clause::irredundant(lits(&[1, 2])));
        let b = db.push(Clause::imported(lits(&[-1, 3, 4]), 2));
        assert_eq!(db.len(), 2);
        assert_eq!(db.len_imported(), 1);
        let imported = db.resolve(b).unwrap();
        assert!(imported.is_redundant() && imported.is_imported());
        assert_eq!(imported.glue(), 2);
        assert!(!db.resolve(a).unwrap().is_redundant());
        let ids = db.iter().map(|(id, _)| id).collect::<Vec<_>>();
        assert_eq!(ids, vec![a, b]);
    }
}
