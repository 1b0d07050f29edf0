//! SQL condition operators.
//!
//! Each operator renders its left side first and then its own placeholders,
//! so parameters always follow the textual order of the generated SQL.

use crate::{query::Fragment, traits::Expression, value::Value};

/// A binary comparison such as `=`, `>` or `<=`.
pub struct BinaryOp<L> {
    left: L,
    op: &'static str,
    right: Value,
}

impl<L> BinaryOp<L> {
    pub fn new(left: L, op: &'static str, right: Value) -> Self {
        Self {
            left,
            op,
            right,
        }
    }
}

impl<L: Expression> Expression for BinaryOp<L> {
    fn to_fragment(&self) -> Fragment {
        let mut fragment = self.left.to_fragment();
        fragment.push_str(&format!(" {} ?", self.op));
        fragment.bind(self.right.clone())
    }
}

/// A `LIKE` match, optionally case-insensitive.
pub struct LikeOp<L> {
    left: L,
    pattern: String,
    case_insensitive: bool,
}

impl<L> LikeOp<L> {
    pub const fn new(left: L, pattern: String, case_insensitive: bool) -> Self {
        Self {
            left,
            pattern,
            case_insensitive,
        }
    }
}

impl<L: Expression> Expression for LikeOp<L> {
    fn to_fragment(&self) -> Fragment {
        let left = self.left.to_fragment();
        let fragment = if self.case_insensitive {
            left.wrap("LOWER(", ") LIKE LOWER(?)")
        } else {
            left.wrap("", " LIKE ?")
        };
        fragment.bind(self.pattern.as_str())
    }
}

/// An `IN` or `NOT IN` list.
///
/// An empty list renders a constant predicate instead of the invalid `IN ()`.
pub struct InOp<L> {
    left: L,
    values: Vec<Value>,
    negated: bool,
}

impl<L> InOp<L> {
    pub fn new(left: L, values: Vec<Value>, negated: bool) -> Self {
        Self {
            left,
            values,
            negated,
        }
    }
}

impl<L: Expression> Expression for InOp<L> {
    fn to_fragment(&self) -> Fragment {
        if self.values.is_empty() {
            return Fragment::new(if self.negated { "1 = 1" } else { "1 = 0" });
        }

        let mut fragment = self.left.to_fragment();
        let placeholders = vec!["?"; self.values.len()].join(", ");
        let op = if self.negated { "NOT IN" } else { "IN" };
        fragment.push_str(&format!(" {op} ({placeholders})"));
        fragment
            .parameters
            .extend(self.values.iter().cloned().map(Into::into));
        fragment
    }
}

/// `IS NULL` / `IS NOT NULL`.
pub struct NullOp<L> {
    left: L,
    is_null: bool,
}

impl<L> NullOp<L> {
    pub fn new(left: L, is_null: bool) -> Self {
        Self {
            left,
            is_null,
        }
    }
}

impl<L: Expression> Expression for NullOp<L> {
    fn to_fragment(&self) -> Fragment {
        let op = if self.is_null {
            " IS NULL"
        } else {
            " IS NOT NULL"
        };
        self.left.to_fragment().wrap("", op)
    }
}

/// Two conditions joined by `AND` or `OR`, parenthesized.
pub struct LogicalOp<L, R> {
    left: L,
    right: R,
    op: &'static str,
}

impl<L, R> LogicalOp<L, R> {
    pub fn new(left: L, right: R, op: &'static str) -> Self {
        Self {
            left,
            right,
            op,
        }
    }
}

impl<L: Expression, R: Expression> Expression for LogicalOp<L, R> {
    fn to_fragment(&self) -> Fragment {
        let mut fragment = self.left.to_fragment().wrap("(", "");
        fragment.push_str(&format!(" {} ", self.op));
        fragment.append(self.right.to_fragment());
        fragment.push_str(")");
        fragment
    }
}
