//! Core traits that power the typed condition builders.

use crate::{
    expr::ops::{BinaryOp, InOp, LikeOp, LogicalOp, NullOp},
    query::Fragment,
    value::Value,
};

/// A trait for types that can be rendered into a parameterized SQL fragment.
///
/// Implementors include [`crate::expr::Col<T>`] and the compound operators
/// in [`crate::expr::ops`]. Anything implementing `Expression` converts into a
/// [`Fragment`], so it can be passed straight to `filter`, `having` or join
/// conditions.
///
/// # Example
///
/// ```rust
/// use silq_db::expr::Col;
/// use silq_db::traits::Expression as _;
///
/// let title = Col::<String>::new("Title");
/// let fragment = title.eq("Hello").to_fragment();
/// assert_eq!(fragment.sql, "\"Title\" = ?");
/// assert_eq!(fragment.parameters.len(), 1);
/// ```
pub trait Expression: Sized {
    /// Renders the expression, returning its SQL text and the parameters for
    /// its placeholders in textual order.
    fn to_fragment(&self) -> Fragment;

    fn eq<T: Into<Value>>(self, value: T) -> BinaryOp<Self> {
        BinaryOp::new(self, "=", value.into())
    }

    fn ne<T: Into<Value>>(self, value: T) -> BinaryOp<Self> {
        BinaryOp::new(self, "!=", value.into())
    }

    fn gt<T: Into<Value>>(self, value: T) -> BinaryOp<Self> {
        BinaryOp::new(self, ">", value.into())
    }

    fn lt<T: Into<Value>>(self, value: T) -> BinaryOp<Self> {
        BinaryOp::new(self, "<", value.into())
    }

    fn gte<T: Into<Value>>(self, value: T) -> BinaryOp<Self> {
        BinaryOp::new(self, ">=", value.into())
    }

    fn lte<T: Into<Value>>(self, value: T) -> BinaryOp<Self> {
        BinaryOp::new(self, "<=", value.into())
    }

    /// `LIKE` with the pattern bound as-is, wildcards included.
    fn like(self, pattern: impl Into<String>) -> LikeOp<Self> {
        LikeOp::new(self, pattern.into(), false)
    }

    /// Case-insensitive `LIKE`, portable across engines.
    fn ilike(self, pattern: impl Into<String>) -> LikeOp<Self> {
        LikeOp::new(self, pattern.into(), true)
    }

    fn in_<T, I>(self, values: I) -> InOp<Self>
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        InOp::new(self, values.into_iter().map(Into::into).collect(), false)
    }

    fn not_in<T, I>(self, values: I) -> InOp<Self>
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        InOp::new(self, values.into_iter().map(Into::into).collect(), true)
    }

    fn null(self) -> NullOp<Self> {
        NullOp::new(self, true)
    }

    fn not_null(self) -> NullOp<Self> {
        NullOp::new(self, false)
    }

    fn and<E: Expression>(self, other: E) -> LogicalOp<Self, E> {
        LogicalOp::new(self, other, "AND")
    }

    fn or<E: Expression>(self, other: E) -> LogicalOp<Self, E> {
        LogicalOp::new(self, other, "OR")
    }
}
