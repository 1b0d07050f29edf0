use nu_ansi_term::Color::{Cyan, Yellow};
use silq_config::Config;
use silq_db::{
    database::connector_for, format::format_plain, ConditionalQuery, Database, ErrorLevel,
    Parameter, QueryOutcome, ResultCursor, SqlExpression, SqlSelect,
};
use tabled::{builder::Builder, settings::Style};
use tracing::{debug, info};

use crate::{
    error::Result,
    utils::{bind_predicates, display_value, split_field, Colored},
};

/// Clauses of a `select` invocation.
pub struct SelectArgs {
    pub from: String,
    pub fields: Vec<String>,
    pub wheres: Vec<String>,
    pub any: bool,
    pub order_by: Vec<String>,
    pub limit: Option<u64>,
    pub offset: u64,
    pub distinct: bool,
}

impl SelectArgs {
    pub fn into_select(self, parameters: Vec<Parameter>) -> Result<SqlSelect> {
        let mut select = SqlSelect::new()
            .from_table(self.from)
            .distinct(self.distinct)
            .set_limit(self.limit, self.offset);

        for field in &self.fields {
            select = match split_field(field) {
                (expr, Some(alias)) => select.field_as(expr, alias),
                (expr, None) => select.field(expr),
            };
        }

        for predicate in bind_predicates(&self.wheres, parameters)? {
            select = select.filter(predicate);
        }
        if self.any {
            select = select.use_disjunction();
        }

        for spec in &self.order_by {
            select = select.order_by_spec(spec);
        }

        Ok(select)
    }
}

pub fn run_query(config: &Config, sql: &str, parameters: &[Parameter], json: bool) -> Result<()> {
    debug!(sql, parameters = parameters.len(), "running query");
    let mut db = Database::connect(config)?;
    let outcome = db.prepared_query(sql, parameters, ErrorLevel::Fatal)?;
    report(outcome, json)
}

pub fn run_select(
    config: &Config,
    args: SelectArgs,
    parameters: Vec<Parameter>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let expression = SqlExpression::from(args.into_select(parameters)?);

    if dry_run {
        let connector = connector_for(config.connection.driver(), config.connector.clone())?;
        let Some(compiled) = connector.query_builder().build(&expression)? else {
            info!("{}", Colored(Yellow, "Nothing to run"));
            return Ok(());
        };

        if json {
            info!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "sql": &compiled.sql,
                    "parameters": compiled.values(),
                }))?
            );
        } else {
            info!("{}", format_plain(&compiled.sql));
            for (index, value) in compiled.values().iter().enumerate() {
                info!("  {} {}", Colored(Cyan, format!("${}", index + 1)), value);
            }
        }
        return Ok(());
    }

    let mut db = Database::connect(config)?;
    let outcome = db.execute(&expression, ErrorLevel::Fatal)?;
    report(outcome, json)
}

fn report(outcome: QueryOutcome<'_>, json: bool) -> Result<()> {
    match outcome {
        QueryOutcome::Rows(mut cursor) => print_rows(cursor.as_mut(), json),
        QueryOutcome::Done { affected } => {
            info!(affected, "{} row(s) affected", Colored(Cyan, affected));
            Ok(())
        }
        QueryOutcome::Skipped => {
            info!("{}", Colored(Yellow, "Write skipped (preview mode)"));
            Ok(())
        }
        QueryOutcome::Failed => Ok(()),
    }
}

fn print_rows(cursor: &mut (dyn ResultCursor + '_), json: bool) -> Result<()> {
    let columns = cursor.columns().to_vec();
    let records = cursor.records()?;
    cursor.close();

    if json {
        info!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let mut builder = Builder::new();
    builder.push_record(columns.iter().map(|column| Colored(Cyan, column).to_string()));
    for record in &records {
        builder.push_record(record.values().map(display_value));
    }

    let table = builder.build().with(Style::rounded()).to_string();
    info!("\n{table}");
    info!("{} row(s)", records.len());
    Ok(())
}
