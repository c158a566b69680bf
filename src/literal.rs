use core::{
    convert::TryFrom,
    fmt,
    ops::Not,
};

/// The polarity of a literal or the value of an assigned variable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Sign {
    True = 0,
    False = 1,
}

impl Sign {
    /// Creates a sign from the given `bool` value.
    ///
    /// - `true` becomes `Sign::True`
    /// - `false` becomes `Sign::False`
    #[inline]
    pub fn from_bool(value: bool) -> Self {
        match value {
            true => Self::True,
            false => Self::False,
        }
    }

    /// Converts the sign into a `bool` value.
    #[inline]
    pub fn into_bool(self) -> bool {
        matches!(self, Self::True)
    }
}

impl Not for Sign {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
        }
    }
}

/// A variable of the internal namespace of a worker.
///
/// Variables are dense and zero based. The DIMACS variable `n` is the
/// variable with index `n - 1`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Variable {
    value: u32,
}

impl Variable {
    /// The maximum supported number of unique variables.
    pub const MAX_LEN: usize = (i32::MAX as usize) - 1;

    /// Returns the variable for the given index if valid.
    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= Self::MAX_LEN {
            return None
        }
        u32::try_from(index).ok().map(|value| Self { value })
    }

    /// Returns the index of the variable.
    #[inline]
    pub fn into_index(self) -> usize {
        self.value as usize
    }

    /// Returns the literal for the variable with the given polarity.
    #[inline]
    pub fn into_literal(self, sign: Sign) -> Literal {
        Literal {
            value: (self.value << 1) | sign as u32,
        }
    }

    /// Returns the 1-based DIMACS representation of the variable.
    #[inline]
    pub fn into_dimacs(self) -> i32 {
        self.value as i32 + 1
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.into_dimacs())
    }
}

/// A literal of a variable with its polarity.
///
/// The lowest bit stores the polarity, so that both literals of the same
/// variable are direct neighbours under the natural ordering.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
#[repr(transparent)]
pub struct Literal {
    value: u32,
}

impl Literal {
    /// Creates a new literal from the given variable and polarity.
    #[inline]
    pub fn new(variable: Variable, sign: Sign) -> Self {
        variable.into_literal(sign)
    }

    /// Returns the variable of the literal.
    #[inline]
    pub fn variable(self) -> Variable {
        Variable {
            value: self.value >> 1,
        }
    }

    /// Returns the polarity of the literal.
    #[inline]
    pub fn sign(self) -> Sign {
        match self.is_positive() {
            true => Sign::True,
            false => Sign::False,
        }
    }

    /// Returns `true` if the literal has positive polarity.
    #[inline]
    pub fn is_positive(self) -> bool {
        self.value & 1 == 0
    }

    /// Returns `true` if the literal has negative polarity.
    #[inline]
    pub fn is_negative(self) -> bool {
        !self.is_positive()
    }

    /// Returns the signed DIMACS representation of the literal.
    #[inline]
    pub fn into_dimacs(self) -> i32 {
        let variable = self.variable().into_dimacs();
        match self.is_positive() {
            true => variable,
            false => -variable,
        }
    }
}

impl From<i32> for Literal {
    /// Converts a DIMACS literal.
    ///
    /// # Panics
    ///
    /// In debug mode if `x` is zero.
    #[inline]
    fn from(x: i32) -> Self {
        debug_assert!(x != 0);
        let variable = x.unsigned_abs() - 1;
        let sign = (x < 0) as u32;
        Literal {
            value: (variable << 1) | sign,
        }
    }
}

impl From<cnf_parser::Literal> for Literal {
    #[inline]
    fn from(literal: cnf_parser::Literal) -> Self {
        Self::from(literal.into_value().get())
    }
}

impl Not for Literal {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self {
            value: self.value ^ 1,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.into_dimacs())
    }
}
