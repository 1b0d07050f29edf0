//! FROM / JOIN / WHERE state shared by SELECT, UPDATE and DELETE.

use std::fmt;

use crate::query::Fragment;

/// The boolean operator joining WHERE and HAVING fragments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Connective {
    #[default]
    And,
    Or,
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connective::And => f.write_str("AND"),
            Connective::Or => f.write_str("OR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub on: Fragment,
    /// Joins are emitted in ascending `order`; ties keep insertion order.
    pub order: i32,
}

/// One entry of the FROM list: a base table or a joined table.
#[derive(Debug, Clone, PartialEq)]
pub struct FromItem {
    pub table: String,
    pub alias: Option<String>,
    pub join: Option<Join>,
}

impl FromItem {
    fn alias_clause(&self) -> String {
        match &self.alias {
            Some(alias) if alias != &self.table => format!(" AS \"{alias}\""),
            _ => String::new(),
        }
    }

    /// Renders this item with the parameters of its join condition.
    pub fn to_fragment(&self) -> Fragment {
        let head = format!("{}{}", self.table, self.alias_clause());
        match &self.join {
            None => Fragment::new(head),
            Some(join) => {
                let mut fragment = Fragment::new(format!("{} {head} ON (", join.kind.keyword()));
                fragment.append(join.on.clone());
                fragment.push_str(")");
                fragment
            }
        }
    }
}

/// Conditional clause data: FROM items, WHERE fragments and their connective.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditional {
    from: Vec<FromItem>,
    wheres: Vec<Fragment>,
    connective: Connective,
}

impl Conditional {
    pub fn from_items(&self) -> &[FromItem] {
        &self.from
    }

    pub fn where_fragments(&self) -> &[Fragment] {
        &self.wheres
    }

    pub fn connective(&self) -> Connective {
        self.connective
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_empty()
    }

    /// FROM items as fragments: base tables first, in insertion order,
    /// then joins ordered by their `order` key.
    pub fn joins(&self) -> (Vec<Fragment>, Vec<Fragment>) {
        let tables = self
            .from
            .iter()
            .filter(|item| item.join.is_none())
            .map(FromItem::to_fragment)
            .collect();

        let mut joined: Vec<&FromItem> = self.from.iter().filter(|item| item.join.is_some()).collect();
        joined.sort_by_key(|item| item.join.as_ref().map_or(0, |join| join.order));

        (tables, joined.into_iter().map(FromItem::to_fragment).collect())
    }

    pub(crate) fn push_from(&mut self, table: String, alias: Option<String>, join: Option<Join>) {
        // A base table is added once per alias.
        let duplicate = self
            .from
            .iter()
            .any(|item| item.join.is_none() && item.table == table && item.alias == alias);
        if join.is_none() && duplicate {
            return;
        }
        self.from.push(FromItem {
            table,
            alias,
            join,
        });
    }

    pub(crate) fn push_where(&mut self, fragment: Fragment) {
        if !fragment.is_empty() {
            self.wheres.push(fragment);
        }
    }

    pub(crate) fn set_connective(&mut self, connective: Connective) {
        self.connective = connective;
    }
}

/// Chainable builder methods for statements that carry a [`Conditional`].
pub trait ConditionalQuery: Sized {
    fn conditional(&self) -> &Conditional;

    fn conditional_mut(&mut self) -> &mut Conditional;

    /// Adds a base table. The same table is only listed once.
    fn from_table(mut self, table: impl Into<String>) -> Self {
        self.conditional_mut().push_from(table.into(), None, None);
        self
    }

    fn from_aliased(mut self, table: impl Into<String>, alias: impl Into<String>) -> Self {
        self.conditional_mut()
            .push_from(table.into(), Some(alias.into()), None);
        self
    }

    /// Adds a join; `on` may carry its own parameters.
    fn join(
        mut self,
        kind: JoinKind,
        table: impl Into<String>,
        on: impl Into<Fragment>,
        alias: Option<&str>,
        order: i32,
    ) -> Self {
        let join = Join {
            kind,
            on: on.into(),
            order,
        };
        self.conditional_mut()
            .push_from(table.into(), alias.map(str::to_string), Some(join));
        self
    }

    fn inner_join(self, table: impl Into<String>, on: impl Into<Fragment>) -> Self {
        self.join(JoinKind::Inner, table, on, None, 20)
    }

    fn left_join(self, table: impl Into<String>, on: impl Into<Fragment>) -> Self {
        self.join(JoinKind::Left, table, on, None, 20)
    }

    fn right_join(self, table: impl Into<String>, on: impl Into<Fragment>) -> Self {
        self.join(JoinKind::Right, table, on, None, 20)
    }

    /// Adds a WHERE predicate.
    fn filter(mut self, predicate: impl Into<Fragment>) -> Self {
        self.conditional_mut().push_where(predicate.into());
        self
    }

    /// Adds a single WHERE predicate that matches when any of `predicates` does.
    fn filter_any<I, F>(mut self, predicates: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Fragment>,
    {
        let parts = predicates
            .into_iter()
            .map(|p| p.into().wrap("(", ")"))
            .collect::<Vec<_>>();
        self.conditional_mut().push_where(Fragment::join(parts, " OR "));
        self
    }

    fn use_disjunction(mut self) -> Self {
        self.conditional_mut().set_connective(Connective::Or);
        self
    }

    fn use_conjunction(mut self) -> Self {
        self.conditional_mut().set_connective(Connective::And);
        self
    }
}
