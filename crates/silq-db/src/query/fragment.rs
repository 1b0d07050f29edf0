use crate::{traits::Expression, value::Parameter};

/// A piece of SQL text together with the parameters its `?` placeholders bind.
///
/// The Nth placeholder in `sql` corresponds to the Nth entry of `parameters`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub sql: String,
    pub parameters: Vec<Parameter>,
}

impl Fragment {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameters<I, P>(sql: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Parameter>,
    {
        Self {
            sql: sql.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds a parameter for the next placeholder.
    pub fn bind(mut self, parameter: impl Into<Parameter>) -> Self {
        self.parameters.push(parameter.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sql.trim().is_empty()
    }

    /// Appends text and parameters of `other`, in that order.
    pub fn append(&mut self, other: Fragment) {
        self.sql.push_str(&other.sql);
        self.parameters.extend(other.parameters);
    }

    pub fn push_str(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Joins fragments with `separator`, skipping empty ones.
    pub fn join<I>(fragments: I, separator: &str) -> Fragment
    where
        I: IntoIterator<Item = Fragment>,
    {
        let mut joined = Fragment::default();
        for fragment in fragments.into_iter().filter(|f| !f.is_empty()) {
            if !joined.sql.is_empty() {
                joined.sql.push_str(separator);
            }
            joined.append(fragment);
        }
        joined
    }

    /// Joins fragments with `separator`, keeping empty ones in place.
    pub fn concat<I>(fragments: I, separator: &str) -> Fragment
    where
        I: IntoIterator<Item = Fragment>,
    {
        let mut joined = Fragment::default();
        for (i, fragment) in fragments.into_iter().enumerate() {
            if i > 0 {
                joined.sql.push_str(separator);
            }
            joined.append(fragment);
        }
        joined
    }

    /// Wraps the SQL text as `prefix` + sql + `suffix`.
    pub fn wrap(mut self, prefix: &str, suffix: &str) -> Self {
        self.sql = format!("{prefix}{}{suffix}", self.sql);
        self
    }
}

impl From<&str> for Fragment {
    fn from(sql: &str) -> Self {
        Fragment::new(sql)
    }
}

impl From<String> for Fragment {
    fn from(sql: String) -> Self {
        Fragment::new(sql)
    }
}

impl<E: Expression> From<E> for Fragment {
    fn from(expr: E) -> Self {
        expr.to_fragment()
    }
}
