use std::{
    fmt::Display,
    sync::atomic::{AtomicBool, Ordering},
};

use clap::ArgMatches;
use nu_ansi_term::Color;
use silq_db::{BindType, Fragment, Parameter, Value};

use crate::error::{CliError, Result};

pub static COLOR: AtomicBool = AtomicBool::new(true);

pub fn set_color(enabled: bool) {
    COLOR.store(enabled, Ordering::Relaxed);
}

pub struct Colored<T: Display>(pub Color, pub T);

impl<T: Display> Display for Colored<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if COLOR.load(Ordering::Relaxed) {
            write!(f, "{}", self.0.prefix())?;
            self.1.fmt(f)?;
            write!(f, "{}", self.0.suffix())
        } else {
            self.1.fmt(f)
        }
    }
}

/// Parses an untyped command-line value. Numbers bind as numbers, anything
/// else as text.
pub fn parse_value(raw: &str) -> Value {
    if let Ok(integer) = raw.parse::<i64>() {
        return Value::Integer(integer);
    }
    if let Ok(float) = raw.parse::<f64>() {
        if float.is_finite() {
            return Value::Float(float);
        }
    }
    Value::Text(raw.to_string())
}

/// Parses `type:value` into a typed parameter. The value is kept as text
/// and coerced when the connector binds it.
pub fn parse_typed(raw: &str) -> Result<Parameter> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| CliError::InvalidParameter(raw.to_string()))?;
    let bind_type =
        BindType::from_name(name).ok_or_else(|| CliError::InvalidParameter(raw.to_string()))?;
    Ok(Parameter::typed(bind_type, value))
}

/// Collects `--param` and `--typed` values in the order they were given on
/// the command line.
pub fn ordered_parameters(matches: &ArgMatches) -> Result<Vec<Parameter>> {
    let mut indexed = Vec::new();

    if let (Some(values), Some(indices)) = (
        matches.get_many::<String>("params"),
        matches.indices_of("params"),
    ) {
        for (index, value) in indices.zip(values) {
            indexed.push((index, Parameter::from(parse_value(value))));
        }
    }

    if let (Some(values), Some(indices)) = (
        matches.get_many::<String>("typed"),
        matches.indices_of("typed"),
    ) {
        for (index, value) in indices.zip(values) {
            indexed.push((index, parse_typed(value)?));
        }
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, param)| param).collect())
}

/// Splits `expr:alias`. The alias must be a bare word so casts such as
/// `"ID"::text` stay intact.
pub fn split_field(spec: &str) -> (&str, Option<&str>) {
    match spec.rsplit_once(':') {
        Some((expr, alias))
            if !expr.is_empty()
                && !expr.ends_with(':')
                && !alias.is_empty()
                && alias.chars().all(|c| c.is_alphanumeric() || c == '_') =>
        {
            (expr, Some(alias))
        }
        _ => (spec, None),
    }
}

/// Pairs each predicate with as many parameters as it has placeholders.
pub fn bind_predicates(predicates: &[String], parameters: Vec<Parameter>) -> Result<Vec<Fragment>> {
    let expected: usize = predicates.iter().map(|p| p.matches('?').count()).sum();
    if expected != parameters.len() {
        return Err(CliError::ParameterCount {
            expected,
            given: parameters.len(),
        });
    }

    let mut parameters = parameters.into_iter();
    Ok(predicates
        .iter()
        .map(|predicate| {
            let count = predicate.matches('?').count();
            Fragment::with_parameters(predicate.as_str(), parameters.by_ref().take(count))
        })
        .collect())
}

pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => Colored(Color::DarkGray, "NULL").to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;
    use crate::cli::Args;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("42"), Value::Integer(42));
        assert_eq!(parse_value("-1.5"), Value::Float(-1.5));
        assert_eq!(parse_value("inf"), Value::Text("inf".into()));
        assert_eq!(parse_value("hello"), Value::Text("hello".into()));
    }

    #[test]
    fn test_parse_typed() {
        assert_eq!(
            parse_typed("int:7").unwrap(),
            Parameter::typed(BindType::Integer, "7")
        );
        assert_eq!(
            parse_typed("string:a:b").unwrap(),
            Parameter::typed(BindType::String, "a:b")
        );
        assert!(matches!(parse_typed("7"), Err(CliError::InvalidParameter(_))));
        assert!(matches!(parse_typed("uuid:x"), Err(CliError::InvalidParameter(_))));
    }

    #[test]
    fn test_parameters_keep_command_line_order() {
        let matches = Args::command()
            .try_get_matches_from([
                "silq", "query", "SELECT ?, ?, ?", "-p", "1", "-t", "bool:true", "-p", "x",
            ])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();

        let params = ordered_parameters(sub).unwrap();
        assert_eq!(
            params,
            vec![
                Parameter::from(1),
                Parameter::typed(BindType::Boolean, "true"),
                Parameter::from("x"),
            ]
        );
    }

    #[test]
    fn test_split_field() {
        assert_eq!(split_field("\"Title\""), ("\"Title\"", None));
        assert_eq!(split_field("COUNT(*):Total"), ("COUNT(*)", Some("Total")));
        assert_eq!(split_field("\"ID\"::text"), ("\"ID\"::text", None));
        assert_eq!(split_field("a:b c"), ("a:b c", None));
    }

    #[test]
    fn test_bind_predicates() {
        let predicates = vec!["\"A\" = ?".to_string(), "\"B\" BETWEEN ? AND ?".to_string()];
        let params = vec![Parameter::from(1), Parameter::from(2), Parameter::from(3)];

        let fragments = bind_predicates(&predicates, params).unwrap();
        assert_eq!(fragments[0].parameters, vec![Parameter::from(1)]);
        assert_eq!(
            fragments[1].parameters,
            vec![Parameter::from(2), Parameter::from(3)]
        );

        let err = bind_predicates(&predicates, vec![Parameter::from(1)]).unwrap_err();
        assert!(matches!(err, CliError::ParameterCount { expected: 3, given: 1 }));
    }
}
