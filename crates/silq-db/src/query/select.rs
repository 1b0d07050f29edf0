use indexmap::IndexMap;

use crate::query::{
    conditional::{Conditional, ConditionalQuery},
    Fragment,
};

/// The LIMIT of a SELECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// A bare row count, emitted verbatim.
    Count(u64),
    /// A row count plus offset. `limit: None` means "no cap, but skip
    /// `start` rows"; dialects express it with their unbounded sentinel.
    Paged { limit: Option<u64>, start: u64 },
}

/// A SELECT statement.
///
/// # Example
///
/// ```rust
/// use silq_db::query::{ConditionalQuery as _, Fragment, SqlSelect};
///
/// let select = SqlSelect::new()
///     .select(["\"Title\""])
///     .from_table("Page")
///     .filter(Fragment::new("\"Title\" = ?").bind("Hello"))
///     .order_by("Title", "ASC")
///     .set_limit(Some(10), 0);
/// assert!(!select.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SqlSelect {
    conditional: Conditional,
    distinct: bool,
    select: IndexMap<String, String>,
    group_by: Vec<String>,
    having: Vec<Fragment>,
    order_by: IndexMap<String, String>,
    limit: Option<Limit>,
}

impl Default for SqlSelect {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionalQuery for SqlSelect {
    fn conditional(&self) -> &Conditional {
        &self.conditional
    }

    fn conditional_mut(&mut self) -> &mut Conditional {
        &mut self.conditional
    }
}

/// Derives the output alias of a select expression: the trailing quoted
/// identifier if there is one, otherwise the expression itself.
fn default_alias(field: &str) -> String {
    let trimmed = field.trim_end();
    if let Some(inner) = trimmed.strip_suffix('"') {
        if let Some(start) = inner.rfind('"') {
            let alias = &inner[start + 1..];
            if !alias.is_empty() {
                return alias.to_string();
            }
        }
    }
    field.to_string()
}

impl SqlSelect {
    /// A `SELECT *` with no FROM, which is empty until a table is added.
    pub fn new() -> Self {
        let mut select = IndexMap::new();
        select.insert("*".to_string(), "*".to_string());
        Self {
            conditional: Conditional::default(),
            distinct: false,
            select,
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: IndexMap::new(),
            limit: None,
        }
    }

    /// Replaces the select list with `fields`, aliased by their trailing
    /// quoted identifier.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.clear();
        for field in fields {
            self = self.field(field);
        }
        self
    }

    /// Adds one select expression. Selecting anything drops the implicit `*`.
    pub fn field(self, field: impl Into<String>) -> Self {
        let field = field.into();
        let alias = default_alias(&field);
        self.field_as(field, alias)
    }

    pub fn field_as(mut self, field: impl Into<String>, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        if alias != "*" {
            self.select.shift_remove("*");
        }
        self.select.insert(alias, field.into());
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    pub fn having(mut self, predicate: impl Into<Fragment>) -> Self {
        let predicate = predicate.into();
        if !predicate.is_empty() {
            self.having.push(predicate);
        }
        self
    }

    /// Orders by `column`; re-adding a column replaces its direction.
    pub fn order_by(mut self, column: impl Into<String>, direction: impl Into<String>) -> Self {
        self.order_by.insert(column.into(), direction.into());
        self
    }

    /// Parses `"col"`, `"col DESC"` or `"col asc"` into an ORDER BY entry.
    pub fn order_by_spec(self, spec: &str) -> Self {
        let spec = spec.trim();
        match spec.rsplit_once(char::is_whitespace) {
            Some((column, dir))
                if dir.eq_ignore_ascii_case("asc") || dir.eq_ignore_ascii_case("desc") =>
            {
                self.order_by(column.trim_end(), dir)
            }
            _ => self.order_by(spec, ""),
        }
    }

    /// Sets a bare row count.
    pub fn limit(mut self, count: u64) -> Self {
        self.limit = Some(Limit::Count(count));
        self
    }

    /// Sets the limit the way paginating callers do: a zero or missing limit
    /// with no offset clears the LIMIT, a missing limit with an offset pages
    /// without a cap.
    pub fn set_limit(mut self, limit: Option<u64>, offset: u64) -> Self {
        self.limit = match (limit.filter(|n| *n > 0), offset) {
            (None, 0) => None,
            (limit, start) => Some(Limit::Paged { limit, start }),
        };
        self
    }

    pub fn set_limit_value(mut self, limit: Option<Limit>) -> Self {
        self.limit = limit;
        self
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn select_list(&self) -> &IndexMap<String, String> {
        &self.select
    }

    pub fn group_by_list(&self) -> &[String] {
        &self.group_by
    }

    pub fn having_fragments(&self) -> &[Fragment] {
        &self.having
    }

    pub fn order_by_list(&self) -> &IndexMap<String, String> {
        &self.order_by
    }

    pub fn limit_value(&self) -> Option<Limit> {
        self.limit
    }

    /// Empty when nothing is selected, or `*` is selected without a FROM.
    pub fn is_empty(&self) -> bool {
        self.select.is_empty() || (self.conditional.is_empty() && self.select.contains_key("*"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_alias() {
        assert_eq!(default_alias("\"Title\""), "Title");
        assert_eq!(default_alias("\"Page\".\"Title\""), "Title");
        assert_eq!(default_alias("COUNT(*)"), "COUNT(*)");
    }

    #[test]
    fn test_new_select_is_empty_until_from() {
        let select = SqlSelect::new();
        assert!(select.is_empty());
        assert!(!select.from_table("Page").is_empty());
        assert!(!SqlSelect::new().field("1").is_empty());
        assert!(SqlSelect::new().select(Vec::<String>::new()).from_table("Page").is_empty());
    }

    #[test]
    fn test_field_replaces_star() {
        let select = SqlSelect::new().field("\"Title\"").field_as("COUNT(*)", "Total");
        let keys: Vec<_> = select.select_list().keys().cloned().collect();
        assert_eq!(keys, vec!["Title", "Total"]);
    }

    #[test]
    fn test_set_limit_semantics() {
        assert_eq!(SqlSelect::new().set_limit(Some(0), 0).limit_value(), None);
        assert_eq!(SqlSelect::new().set_limit(None, 0).limit_value(), None);
        assert_eq!(
            SqlSelect::new().set_limit(Some(0), 5).limit_value(),
            Some(Limit::Paged {
                limit: None,
                start: 5
            })
        );
        assert_eq!(
            SqlSelect::new().set_limit(Some(10), 20).limit_value(),
            Some(Limit::Paged {
                limit: Some(10),
                start: 20
            })
        );
        assert_eq!(SqlSelect::new().limit(3).limit_value(), Some(Limit::Count(3)));
    }

    #[test]
    fn test_order_by_spec() {
        let select = SqlSelect::new()
            .order_by_spec("\"Created\" DESC")
            .order_by_spec("Title")
            .order_by_spec("\"Sort\" asc");
        let entries: Vec<_> = select
            .order_by_list()
            .iter()
            .map(|(c, d)| (c.as_str(), d.as_str()))
            .collect();
        assert_eq!(
            entries,
            vec![("\"Created\"", "DESC"), ("Title", ""), ("\"Sort\"", "asc")]
        );
    }
}
