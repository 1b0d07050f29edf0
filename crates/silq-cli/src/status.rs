use nu_ansi_term::Color::{Cyan, Green, Red};
use silq_config::Config;
use silq_db::{connector::is_query_type, Database};
use tabled::{builder::Builder, settings::Style};
use tracing::{debug, info};

use crate::{error::Result, utils::Colored};

pub fn ping(config: &Config) -> Result<()> {
    let mut db = Database::connect(config)?;
    let driver = db.connector().name();
    let version = db.connector_mut().version()?;

    debug!(driver, version = %version, "ping");

    let mut builder = Builder::new();
    builder.push_record(["Driver".to_string(), Colored(Cyan, driver).to_string()]);
    builder.push_record(["Version".to_string(), Colored(Green, &version).to_string()]);
    builder.push_record([
        "Database".to_string(),
        match db.selected_database() {
            Some(name) => Colored(Green, name).to_string(),
            None => Colored(Red, "none").to_string(),
        },
    ]);

    let table = builder.build().with(Style::rounded()).to_string();
    info!("\n{table}");
    Ok(())
}

fn yes_no(flag: bool) -> String {
    if flag {
        Colored(Green, "yes").to_string()
    } else {
        Colored(Red, "no").to_string()
    }
}

pub fn classify(config: &Config, sql: &str) -> Result<()> {
    let settings = &config.connector;
    let write = is_query_type(sql, settings.write_keywords());
    let ddl = is_query_type(sql, settings.ddl_keywords());

    info!(
        write,
        ddl,
        mutable = write || ddl,
        "write: {}\nddl: {}\nmutable: {}",
        yes_no(write),
        yes_no(ddl),
        yes_no(write || ddl)
    );
    Ok(())
}
