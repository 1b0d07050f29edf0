//! Compiles expression-model statements into SQL text plus parameters.
//!
//! [`QueryBuilder`] has one method per SQL clause, each returning a
//! [`Fragment`]. Statement builders call the clause methods in a fixed order
//! and join the non-empty results with [`QueryBuilder::separator`], so the
//! parameter list always follows the placeholder order of the final text.
//! Dialects override single clause methods (LIMIT, in practice) and inherit
//! the rest.

pub mod dialect;

pub use dialect::{AnsiQueryBuilder, MySqlQueryBuilder, PostgresQueryBuilder, SqliteQueryBuilder};

use crate::{
    error::{DbError, Result},
    query::{
        Conditional, ConditionalQuery as _, Fragment, Limit, SqlDelete, SqlExpression, SqlInsert,
        SqlSelect, SqlUpdate,
    },
    value::{flatten_parameters, Parameter, Value},
};

/// A compiled statement: SQL text and the parameters for its placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub parameters: Vec<Parameter>,
}

impl CompiledQuery {
    /// Parameter values with type hints stripped.
    pub fn values(&self) -> Vec<Value> {
        flatten_parameters(&self.parameters)
    }
}

impl From<Fragment> for CompiledQuery {
    fn from(fragment: Fragment) -> Self {
        Self {
            sql: fragment.sql,
            parameters: fragment.parameters,
        }
    }
}

/// Renders a LIMIT clause.
///
/// `unbounded` is the dialect's "no cap" token used when only an offset is
/// given; `None` makes such a limit an error.
pub fn render_limit(limit: Option<Limit>, unbounded: Option<&str>) -> Result<Fragment> {
    let (count, start) = match limit {
        None | Some(Limit::Count(0)) => return Ok(Fragment::default()),
        Some(Limit::Count(count)) => return Ok(Fragment::new(format!("LIMIT {count}"))),
        Some(Limit::Paged { limit: Some(count), start }) => (count.to_string(), start),
        Some(Limit::Paged { limit: None, start }) => match unbounded {
            Some(_) if start == 0 => return Ok(Fragment::default()),
            Some(token) => (token.to_string(), start),
            None => {
                return Err(DbError::InvalidLimit(format!(
                    "offset {start} given without a numeric row count"
                )))
            }
        },
    };

    let mut clause = format!("LIMIT {count}");
    if start != 0 {
        clause.push_str(&format!(" OFFSET {start}"));
    }
    Ok(Fragment::new(clause))
}

/// Compiles [`SqlExpression`]s for one SQL dialect.
pub trait QueryBuilder {
    /// Dialect name, for logs.
    fn name(&self) -> &'static str;

    /// Whitespace placed between clauses.
    fn separator(&self) -> &str {
        "\n "
    }

    /// Compiles `expression`, returning `None` when it is empty.
    fn build(&self, expression: &SqlExpression) -> Result<Option<CompiledQuery>> {
        if expression.is_empty() {
            return Ok(None);
        }

        let fragment = match expression {
            SqlExpression::Select(select) => self.build_select(select)?,
            SqlExpression::Insert(insert) => self.build_insert(insert)?,
            SqlExpression::Update(update) => self.build_update(update)?,
            SqlExpression::Delete(delete) => self.build_delete(delete)?,
        };

        Ok(Some(fragment.into()))
    }

    fn build_select(&self, select: &SqlSelect) -> Result<Fragment> {
        let clauses = vec![
            self.select_clause(select),
            self.from_clause(select.conditional()),
            self.where_clause(select.conditional()),
            self.group_by_clause(select),
            self.having_clause(select),
            self.order_by_clause(select),
            self.limit_clause(select)?,
        ];
        Ok(Fragment::join(clauses, self.separator()))
    }

    fn build_insert(&self, insert: &SqlInsert) -> Result<Fragment> {
        Ok(self.insert_clause(insert))
    }

    fn build_update(&self, update: &SqlUpdate) -> Result<Fragment> {
        let clauses = vec![
            self.update_clause(update),
            self.where_clause(update.conditional()),
        ];
        Ok(Fragment::join(clauses, self.separator()))
    }

    fn build_delete(&self, delete: &SqlDelete) -> Result<Fragment> {
        let clauses = vec![
            self.delete_clause(delete),
            self.from_clause(delete.conditional()),
            self.where_clause(delete.conditional()),
        ];
        Ok(Fragment::join(clauses, self.separator()))
    }

    /// `SELECT [DISTINCT] ...`, omitting aliases that repeat the expression.
    fn select_clause(&self, select: &SqlSelect) -> Fragment {
        let columns = select
            .select_list()
            .iter()
            .map(|(alias, field)| {
                let quoted = format!("\"{alias}\"");
                if alias == field || field.ends_with(&quoted) {
                    field.clone()
                } else {
                    format!("{field} AS {quoted}")
                }
            })
            .collect::<Vec<_>>();

        let distinct = if select.is_distinct() { "DISTINCT " } else { "" };
        Fragment::new(format!("SELECT {distinct}{}", columns.join(", ")))
    }

    /// `FROM` with base tables and joins; join parameters follow join order.
    fn from_clause(&self, conditional: &Conditional) -> Fragment {
        let (tables, joins) = conditional.joins();
        let mut parts = vec![Fragment::join(tables, ", ")];
        parts.extend(joins);

        let from = Fragment::join(parts, " ");
        if from.is_empty() {
            return from;
        }
        from.wrap("FROM ", "")
    }

    fn where_clause(&self, conditional: &Conditional) -> Fragment {
        self.predicate_clause(
            "WHERE",
            conditional.where_fragments(),
            &conditional.connective().to_string(),
        )
    }

    fn having_clause(&self, select: &SqlSelect) -> Fragment {
        self.predicate_clause(
            "HAVING",
            select.having_fragments(),
            &select.conditional().connective().to_string(),
        )
    }

    /// `KEYWORD (p1) <connective> (p2)`; nothing at all for zero predicates.
    fn predicate_clause(&self, keyword: &str, predicates: &[Fragment], connective: &str) -> Fragment {
        if predicates.is_empty() {
            return Fragment::default();
        }
        let glue = format!("){}{connective} (", self.separator());
        Fragment::concat(predicates.iter().cloned(), &glue).wrap(&format!("{keyword} ("), ")")
    }

    fn group_by_clause(&self, select: &SqlSelect) -> Fragment {
        let group_by = select.group_by_list();
        if group_by.is_empty() {
            return Fragment::default();
        }
        Fragment::new(format!("GROUP BY {}", group_by.join(", ")))
    }

    /// `ORDER BY col DIR, ...` with directions upper-cased, ASC by default.
    fn order_by_clause(&self, select: &SqlSelect) -> Fragment {
        let order_by = select.order_by_list();
        if order_by.is_empty() {
            return Fragment::default();
        }

        let statements = order_by
            .iter()
            .map(|(column, direction)| {
                let direction = direction.trim().to_uppercase();
                let direction = if direction.is_empty() {
                    "ASC"
                } else {
                    direction.as_str()
                };
                format!("{column} {direction}").trim().to_string()
            })
            .collect::<Vec<_>>();

        Fragment::new(format!("ORDER BY {}", statements.join(", ")))
    }

    /// Base LIMIT handling: offsets need a numeric row count.
    fn limit_clause(&self, select: &SqlSelect) -> Result<Fragment> {
        render_limit(select.limit_value(), None)
    }

    /// `INSERT INTO t (cols) VALUES (...), (...)`.
    ///
    /// Every row supplies every column of the union; a missing column binds
    /// an explicit NULL.
    fn insert_clause(&self, insert: &SqlInsert) -> Fragment {
        let sep = self.separator();
        let columns = insert.columns();

        let rows = insert
            .rows()
            .iter()
            .filter(|row| !row.is_empty())
            .map(|row| {
                let values = columns.iter().map(|column| match row.get(column) {
                    Some(assignment) => assignment.clone(),
                    None => Fragment::new("?").bind(Value::Null),
                });
                Fragment::concat(values, ", ").wrap("(", ")")
            });

        let mut fragment = Fragment::new(format!(
            "INSERT INTO {}{sep}({}){sep}VALUES{sep}",
            insert.table(),
            columns.join(", ")
        ));
        fragment.append(Fragment::concat(rows, &format!(",{sep}")));
        fragment
    }

    /// `UPDATE t SET col = expr, ...` in declaration order.
    fn update_clause(&self, update: &SqlUpdate) -> Fragment {
        let assignments = update.assignments().iter().map(|(column, assignment)| {
            assignment.clone().wrap(&format!("{column} = "), "")
        });

        let mut fragment = Fragment::new(format!("UPDATE {}", update.table_name()));
        if !update.assignments().is_empty() {
            fragment.push_str(self.separator());
            fragment.append(Fragment::concat(assignments, ", ").wrap("SET ", ""));
        }
        fragment
    }

    fn delete_clause(&self, delete: &SqlDelete) -> Fragment {
        match delete.targets() {
            [] => Fragment::new("DELETE"),
            targets => Fragment::new(format!("DELETE {}", targets.join(", "))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expr::Col,
        query::{AssignmentRow, ConditionalQuery as _},
        traits::Expression as _,
    };

    const ID: Col<i64> = Col::new("ID");
    const STATUS: Col<String> = Col::new("Status");

    fn compile(expr: impl Into<SqlExpression>) -> CompiledQuery {
        SqliteQueryBuilder.build(&expr.into()).unwrap().unwrap()
    }

    fn placeholders(sql: &str) -> usize {
        sql.matches('?').count()
    }

    #[test]
    fn test_end_to_end_select() {
        let select = SqlSelect::new()
            .field_as("\"Title\"", "Title")
            .from_table("Page")
            .filter(Fragment::new("\"Title\" = ?").bind("Hello"))
            .order_by("Title", "ASC")
            .set_limit(Some(10), 0);

        let compiled = AnsiQueryBuilder.build(&select.into()).unwrap().unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT \"Title\"\n FROM Page\n WHERE (\"Title\" = ?)\n ORDER BY Title ASC\n LIMIT 10"
        );
        assert_eq!(compiled.values(), vec![Value::Text("Hello".into())]);
    }

    #[test]
    fn test_empty_expressions_compile_to_nothing() {
        let builder = AnsiQueryBuilder;
        assert_eq!(builder.build(&SqlSelect::new().into()).unwrap(), None);
        assert_eq!(builder.build(&SqlInsert::into_table("\"T\"").into()).unwrap(), None);
        assert_eq!(builder.build(&SqlUpdate::table("\"T\"").into()).unwrap(), None);
        assert_eq!(builder.build(&SqlDelete::new().into()).unwrap(), None);
    }

    #[test]
    fn test_parameters_follow_placeholder_order() {
        let select = SqlSelect::new()
            .select(["\"ID\"", "COUNT(*)"])
            .from_table("\"Page\"")
            .inner_join("\"Owner\"", Fragment::new("\"Owner\".\"Kind\" = ?").bind("join"))
            .filter(ID.gt(1))
            .filter(STATUS.in_(["a", "b"]))
            .group_by("\"ID\"")
            .having(Fragment::new("COUNT(*) > ?").bind(2))
            .limit(5);

        let compiled = compile(select);
        assert_eq!(placeholders(&compiled.sql), compiled.parameters.len());
        assert_eq!(
            compiled.values(),
            vec![
                Value::Text("join".into()),
                Value::Integer(1),
                Value::Text("a".into()),
                Value::Text("b".into()),
                Value::Integer(2),
            ]
        );
    }

    #[test]
    fn test_compilation_is_idempotent() {
        let expr: SqlExpression = SqlUpdate::table("\"Page\"")
            .set("\"Title\"", "New")
            .set_sql("\"Version\"", Fragment::new("\"Version\" + ?").bind(1))
            .filter(ID.eq(9))
            .into();

        let builder = PostgresQueryBuilder;
        assert_eq!(builder.build(&expr).unwrap(), builder.build(&expr).unwrap());
    }

    #[test]
    fn test_no_where_clause_without_predicates() {
        let compiled = compile(SqlSelect::new().from_table("\"Page\""));
        assert_eq!(compiled.sql, "SELECT *\n FROM \"Page\"");
        assert!(!compiled.sql.contains("WHERE"));
        assert!(!compiled.sql.contains("HAVING"));
    }

    #[test]
    fn test_where_uses_connective() {
        let compiled = compile(
            SqlDelete::from("\"Page\"")
                .filter(ID.lt(3))
                .filter(STATUS.null())
                .use_disjunction(),
        );
        assert_eq!(
            compiled.sql,
            "DELETE\n FROM \"Page\"\n WHERE (\"ID\" < ?)\n OR (\"Status\" IS NULL)"
        );
    }

    #[test]
    fn test_insert_unions_columns_with_null_fill() {
        let insert = SqlInsert::into_table("\"T\"")
            .row(AssignmentRow::new().set("a", 1).set("b", 2))
            .row(AssignmentRow::new().set("a", 3).set("c", 4));

        let compiled = compile(insert);
        assert_eq!(
            compiled.sql,
            "INSERT INTO \"T\"\n (a, b, c)\n VALUES\n (?, ?, ?),\n (?, ?, ?)"
        );
        assert_eq!(
            compiled.values(),
            vec![
                Value::Integer(1),
                Value::Integer(2),
                Value::Null,
                Value::Integer(3),
                Value::Null,
                Value::Integer(4),
            ]
        );
    }

    #[test]
    fn test_update_assignments_in_declaration_order() {
        let compiled = compile(
            SqlUpdate::table("\"Page\"")
                .set("\"B\"", 2)
                .set_sql("\"A\"", Fragment::new("\"A\" + ?").bind(1))
                .filter(ID.eq(7)),
        );
        assert_eq!(
            compiled.sql,
            "UPDATE \"Page\"\n SET \"B\" = ?, \"A\" = \"A\" + ?\n WHERE (\"ID\" = ?)"
        );
        assert_eq!(
            compiled.values(),
            vec![Value::Integer(2), Value::Integer(1), Value::Integer(7)]
        );
    }

    #[test]
    fn test_delete_with_targets() {
        let compiled = compile(
            SqlDelete::from("\"Page\"")
                .left_join("\"Page_Live\"", "\"Page_Live\".\"ID\" = \"Page\".\"ID\"")
                .target("\"Page\"")
                .target("\"Page_Live\""),
        );
        assert!(compiled.sql.starts_with("DELETE \"Page\", \"Page_Live\"\n FROM \"Page\" LEFT JOIN"));
    }

    #[test]
    fn test_limit_edge_cases() {
        let base = || SqlSelect::new().from_table("\"Page\"");
        let tail = |select: SqlSelect| {
            let sql = AnsiQueryBuilder.build(&select.into()).unwrap().unwrap().sql;
            sql.lines().last().unwrap().trim().to_string()
        };

        assert_eq!(tail(base().limit(10)), "LIMIT 10");
        assert_eq!(tail(base().set_limit(Some(10), 0)), "LIMIT 10");
        assert_eq!(tail(base().set_limit(Some(10), 20)), "LIMIT 10 OFFSET 20");
        assert_eq!(tail(base().limit(0)), "FROM \"Page\"");
        assert_eq!(tail(base().set_limit(Some(0), 0)), "FROM \"Page\"");
    }

    #[test]
    fn test_select_alias_rules() {
        let compiled = compile(
            SqlSelect::new()
                .field("\"Page\".\"Title\"")
                .field_as("\"Page\".\"Created\"", "Date")
                .field("NOW()")
                .distinct(true)
                .from_table("\"Page\""),
        );
        assert_eq!(
            compiled.sql.lines().next().unwrap(),
            "SELECT DISTINCT \"Page\".\"Title\", \"Page\".\"Created\" AS \"Date\", NOW()"
        );
    }

    #[test]
    fn test_select_without_from() {
        let compiled = compile(SqlSelect::new().field_as("1", "One"));
        assert_eq!(compiled.sql, "SELECT 1 AS \"One\"");
    }

    #[test]
    fn test_order_by_normalizes_direction() {
        let compiled = compile(
            SqlSelect::new()
                .from_table("\"Page\"")
                .order_by("\"Sort\"", " desc ")
                .order_by("\"ID\"", ""),
        );
        assert!(compiled.sql.ends_with("ORDER BY \"Sort\" DESC, \"ID\" ASC"));
    }
}
