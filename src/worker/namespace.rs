use super::WorkerError;
use crate::{
    Literal,
    Sign,
    Variable,
    VariableArray,
};
use ahash::AHashMap;

/// Translates between external and internal variables.
///
/// New variables map to the external variable of the same DIMACS index unless
/// that external variable is already taken.
#[derive(Debug, Default, Clone)]
pub struct Namespace {
    internal: AHashMap<u32, Variable>,
    /// Zero for internal variables without external counterpart.
    external: VariableArray<u32>,
}

impl Namespace {
    /// Registers the given number of additional internal variables.
    pub fn register_variables(&mut self, additional: usize) {
        let old_len = self.external.len();
        self.external.resize_with(old_len + additional, || 0);
        for index in old_len..old_len + additional {
            let variable =
                Variable::from_index(index).expect("encountered out of range variable index");
            let external = variable.into_dimacs() as u32;
            if !self.internal.contains_key(&external) {
                self.internal.insert(external, variable);
                self.external[variable] = external;
            }
        }
    }

    /// Maps the external variable to the internal variable.
    ///
    /// The previous external variable of `variable` becomes unknown.
    ///
    /// # Errors
    ///
    /// - If `external` is zero.
    /// - If `external` is already mapped to another variable.
    ///
    /// # Panics
    ///
    /// If `variable` has not been registered.
    pub fn map(&mut self, external: u32, variable: Variable) -> Result<(), WorkerError> {
        if external == 0 || external > i32::MAX as u32 {
            return Err(WorkerError::InvalidExternalVariable(external))
        }
        match self.internal.get(&external) {
            Some(&mapped) if mapped == variable => return Ok(()),
            Some(_) => return Err(WorkerError::ExternalVariableInUse(external)),
            None => (),
        }
        let previous = self.external[variable];
        if previous != 0 {
            self.internal.remove(&previous);
        }
        self.internal.insert(external, variable);
        self.external[variable] = external;
        Ok(())
    }

    /// Translates an external literal.
    ///
    /// Returns `None` if the external variable is unknown.
    pub fn internalize(&self, external: i32) -> Option<Literal> {
        let variable = self.internal.get(&external.unsigned_abs())?;
        Some(variable.into_literal(Sign::from_bool(external > 0)))
    }

    /// Translates an internal literal.
    ///
    /// Returns `None` if the variable has no external counterpart.
    pub fn externalize(&self, literal: Literal) -> Option<i32> {
        let external = *self.external.get(literal.variable()).ok()?;
        if external == 0 {
            return None
        }
        let external = external as i32;
        match literal.is_positive() {
            true => Some(external),
            false => Some(-external),
        }
    }
}
