use crate::Variable;
use core::{
    marker::PhantomData,
    ops,
    slice,
};
use thiserror::Error;

/// Error returned when a variable does not fit the registered range.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
#[error("variable index out of bounds")]
pub struct OutOfBoundsAccess;

/// Dense storage with one slot per registered variable.
///
/// Slots are indexed by [`Variable`] and only reachable after the variable
/// has been registered via [`VariableArray::resize_with`].
#[derive(Debug, Clone, PartialEq)]
pub struct VariableArray<T> {
    values: Vec<T>,
    marker: PhantomData<fn() -> Variable>,
}

impl<T> Default for VariableArray<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            marker: Default::default(),
        }
    }
}

impl<T> VariableArray<T> {
    /// Creates a new array for `len` variables with slots initialized by `init`.
    pub fn with_len<F>(len: usize, mut init: F) -> Self
    where
        F: FnMut(Variable) -> T,
    {
        Self {
            values: (0..len)
                .map(|index| {
                    init(
                        Variable::from_index(index)
                            .expect("encountered out of range variable index"),
                    )
                })
                .collect(),
            marker: Default::default(),
        }
    }

    /// Returns the number of registered variables.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no variable has been registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Grows or shrinks the array to `new_len` variables.
    ///
    /// New slots are filled with values produced by `placeholder`.
    #[inline]
    pub fn resize_with<F>(&mut self, new_len: usize, placeholder: F)
    where
        F: FnMut() -> T,
    {
        self.values.resize_with(new_len, placeholder);
    }

    #[inline]
    fn ensure_valid(&self, variable: Variable) -> Result<usize, OutOfBoundsAccess> {
        let index = variable.into_index();
        if index >= self.len() {
            return Err(OutOfBoundsAccess)
        }
        Ok(index)
    }

    /// Returns a shared reference to the slot of the variable.
    ///
    /// # Errors
    ///
    /// If the variable has not been registered.
    #[inline]
    pub fn get(&self, variable: Variable) -> Result<&T, OutOfBoundsAccess> {
        self.ensure_valid(variable)
            .map(move |index| &self.values[index])
    }

    /// Returns an exclusive reference to the slot of the variable.
    ///
    /// # Errors
    ///
    /// If the variable has not been registered.
    #[inline]
    pub fn get_mut(&mut self, variable: Variable) -> Result<&mut T, OutOfBoundsAccess> {
        self.ensure_valid(variable)
            .map(move |index| &mut self.values[index])
    }

    /// Returns an iterator over all variables and their slots.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            index: 0,
            values: self.values.iter(),
        }
    }

    /// Returns an iterator over all variables and exclusive references to their slots.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            index: 0,
            values: self.values.iter_mut(),
        }
    }
}

impl<T> ops::Index<Variable> for VariableArray<T> {
    type Output = T;

    /// # Panics
    ///
    /// If the variable has not been registered.
    #[inline]
    fn index(&self, variable: Variable) -> &Self::Output {
        self.get(variable)
            .expect("encountered unregistered variable")
    }
}

impl<T> ops::IndexMut<Variable> for VariableArray<T> {
    /// # Panics
    ///
    /// If the variable has not been registered.
    #[inline]
    fn index_mut(&mut self, variable: Variable) -> &mut Self::Output {
        self.get_mut(variable)
            .expect("encountered unregistered variable")
    }
}

/// Iterator over the slots of a [`VariableArray`].
pub struct Iter<'a, T> {
    index: usize,
    values: slice::Iter<'a, T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Variable, &'a T);

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.values.next()?;
        let variable = Variable::from_index(self.index)
            .expect("encountered out of range variable index");
        self.index += 1;
        Some((variable, value))
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}

/// Iterator over exclusive references to the slots of a [`VariableArray`].
pub struct IterMut<'a, T> {
    index: usize,
    values: slice::IterMut<'a, T>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = (Variable, &'a mut T);

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.values.next()?;
        let variable = Variable::from_index(self.index)
            .expect("encountered out of range variable index");
        self.index += 1;
        Some((variable, value))
    }
}

impl<'a, T> ExactSizeIterator for IterMut<'a, T> {}
