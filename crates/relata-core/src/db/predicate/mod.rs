//! Condition tree.
//!
//! Pure data: a condition holds column names and values only. Column names are
//! resolved and placeholders assigned when the compiler renders it against a
//! table descriptor and dialect.


use crate::{traits::FieldValue, value::Value};

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

///
/// ColumnFunction
///
/// Case-folding applied to a column before comparison or LIKE.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnFunction {
    Lower,
    Upper,
}

impl ColumnFunction {
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Lower => "LOWER",
            Self::Upper => "UPPER",
        }
    }
}

///
/// ColumnExpr
///
/// A column reference by logical name, optionally case-folded.
/// Method-based builders produce `Condition` nodes.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnExpr {
    name: String,
    function: Option<ColumnFunction>,
}

/// Reference a column by logical name.
#[must_use]
pub fn col(name: impl Into<String>) -> ColumnExpr {
    ColumnExpr {
        name: name.into(),
        function: None,
    }
}

impl ColumnExpr {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn function(&self) -> Option<ColumnFunction> {
        self.function
    }

    #[must_use]
    pub fn lower(mut self) -> Self {
        self.function = Some(ColumnFunction::Lower);
        self
    }

    #[must_use]
    pub fn upper(mut self) -> Self {
        self.function = Some(ColumnFunction::Upper);
        self
    }

    // ------------------------------------------------------------------
    // Comparison predicates
    // ------------------------------------------------------------------

    /// Equality; a null operand compiles to `IS NULL`.
    #[must_use]
    pub fn eq(self, operand: impl IntoOperand) -> Condition {
        self.compare(CompareOp::Eq, operand)
    }

    /// Inequality; a null operand compiles to `IS NOT NULL`.
    #[must_use]
    pub fn ne(self, operand: impl IntoOperand) -> Condition {
        self.compare(CompareOp::Ne, operand)
    }

    #[must_use]
    pub fn lt(self, operand: impl IntoOperand) -> Condition {
        self.compare(CompareOp::Lt, operand)
    }

    #[must_use]
    pub fn lte(self, operand: impl IntoOperand) -> Condition {
        self.compare(CompareOp::Lte, operand)
    }

    #[must_use]
    pub fn gt(self, operand: impl IntoOperand) -> Condition {
        self.compare(CompareOp::Gt, operand)
    }

    #[must_use]
    pub fn gte(self, operand: impl IntoOperand) -> Condition {
        self.compare(CompareOp::Gte, operand)
    }

    #[must_use]
    pub fn compare(self, op: CompareOp, operand: impl IntoOperand) -> Condition {
        Condition::Compare {
            column: self,
            op,
            operand: operand.into_operand(),
        }
    }

    // ------------------------------------------------------------------
    // Other predicates
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn is_null(self) -> Condition {
        Condition::IsNull { column: self }
    }

    #[must_use]
    pub const fn is_not_null(self) -> Condition {
        Condition::IsNotNull { column: self }
    }

    /// SQL `LIKE` with the pattern bound as a parameter.
    #[must_use]
    pub fn like(self, pattern: impl Into<String>) -> Condition {
        Condition::Like {
            column: self,
            pattern: pattern.into(),
        }
    }

    /// Membership in a fixed list; an empty list matches nothing.
    #[must_use]
    pub fn in_list<I, V>(self, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: FieldValue,
    {
        self.in_values(values.into_iter().map(|v| v.to_value()).collect())
    }

    #[must_use]
    pub const fn in_values(self, values: Vec<Value>) -> Condition {
        Condition::In {
            column: self,
            values,
        }
    }
}

///
/// Operand
///
/// Right-hand side of a comparison.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Value(Value),
    Column(ColumnExpr),
}

///
/// IntoOperand
///

pub trait IntoOperand {
    fn into_operand(self) -> Operand;
}

impl<T: FieldValue> IntoOperand for T {
    fn into_operand(self) -> Operand {
        Operand::Value(self.to_value())
    }
}

impl IntoOperand for Value {
    fn into_operand(self) -> Operand {
        Operand::Value(self)
    }
}

impl IntoOperand for ColumnExpr {
    fn into_operand(self) -> Operand {
        Operand::Column(self)
    }
}

///
/// Condition
///
/// Immutable predicate tree. `Empty` is the identity for `and`/`or` and
/// renders no WHERE clause.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Condition {
    #[default]
    Empty,
    Compare {
        column: ColumnExpr,
        op: CompareOp,
        operand: Operand,
    },
    And(Box<Self>, Box<Self>),
    Or(Box<Self>, Box<Self>),
    Not(Box<Self>),
    Like {
        column: ColumnExpr,
        pattern: String,
    },
    IsNull {
        column: ColumnExpr,
    },
    IsNotNull {
        column: ColumnExpr,
    },
    In {
        column: ColumnExpr,
        values: Vec<Value>,
    },
}

impl Condition {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::Empty, other) => other,
            (this, Self::Empty) => this,
            (this, other) => Self::And(Box::new(this), Box::new(other)),
        }
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::Empty, other) => other,
            (this, Self::Empty) => this,
            (this, other) => Self::Or(Box::new(this), Box::new(other)),
        }
    }

    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::Empty => Self::Empty,
            this => Self::Not(Box::new(this)),
        }
    }
}

/// `(a) AND (b)`.
#[must_use]
pub fn and(left: Condition, right: Condition) -> Condition {
    left.and(right)
}

/// `(a) OR (b)`.
#[must_use]
pub fn or(left: Condition, right: Condition) -> Condition {
    left.or(right)
}

/// `NOT (a)`.
#[must_use]
pub fn not(inner: Condition) -> Condition {
    inner.negate()
}

/// Fold conditions left to right with `and`.
#[must_use]
pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Condition {
    conditions.into_iter().fold(Condition::Empty, Condition::and)
}
