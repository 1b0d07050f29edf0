//! Plain-text SQL formatting for diagnostics.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("unable to compile whitespace regex"));

static CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s+\b(SELECT|FROM|WHERE|GROUP BY|HAVING|ORDER BY|LIMIT|OFFSET|VALUES|SET|UNION(?: ALL)?|(?:(?:INNER|LEFT|RIGHT|FULL|CROSS)(?: OUTER)? )?JOIN)\b",
    )
    .expect("unable to compile clause regex")
});

/// Collapses whitespace and starts every major clause on its own line.
///
/// Keyword case is preserved. Text inside string literals is not treated
/// specially, so this is only meant for logs and error messages.
pub fn format_plain(sql: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(sql.trim(), " ");
    CLAUSE_RE.replace_all(&collapsed, "\n${1}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_clauses_on_own_lines() {
        let sql = "SELECT \"ID\", \"Title\"\n FROM \"Page\"   WHERE (\"ID\" > ?) ORDER BY \"ID\" DESC LIMIT 5 OFFSET 10";
        assert_eq!(
            format_plain(sql),
            "SELECT \"ID\", \"Title\"\nFROM \"Page\"\nWHERE (\"ID\" > ?)\nORDER BY \"ID\" DESC\nLIMIT 5\nOFFSET 10"
        );
    }

    #[test]
    fn test_joins_and_case() {
        let sql = "select * from a left outer join b on (a.id = b.id) inner join c on (1 = 1)";
        assert_eq!(
            format_plain(sql),
            "select *\nfrom a\nleft outer join b on (a.id = b.id)\ninner join c on (1 = 1)"
        );
    }

    #[test]
    fn test_write_statements() {
        assert_eq!(
            format_plain("UPDATE t SET a = 1 WHERE b = 2"),
            "UPDATE t\nSET a = 1\nWHERE b = 2"
        );
        assert_eq!(
            format_plain("INSERT INTO t (a, b) VALUES (?, ?)"),
            "INSERT INTO t (a, b)\nVALUES (?, ?)"
        );
    }

    #[test]
    fn test_subselect_stays_inline() {
        assert_eq!(
            format_plain("SELECT * FROM t WHERE id IN (SELECT id FROM u)"),
            "SELECT *\nFROM t\nWHERE id IN (SELECT id\nFROM u)"
        );
    }
}
