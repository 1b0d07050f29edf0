use clap::{ArgMatches, CommandFactory, FromArgMatches};
use cli::{Args, Commands};
use error::Result;
use logging::setup_logging;
use query::{run_query, run_select, SelectArgs};
use silq_config::config::{config_path, generate_default_config, Config};
use silq_db::Parameter;
use status::{classify, ping};
use tracing::debug;
use utils::{ordered_parameters, set_color};

mod cli;
mod error;
mod logging;
mod query;
mod status;
mod utils;

fn command_parameters(matches: &ArgMatches) -> Result<Vec<Parameter>> {
    match matches.subcommand() {
        Some((_, sub)) => ordered_parameters(sub),
        None => Ok(Vec::new()),
    }
}

fn handle_cli() -> Result<()> {
    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());

    setup_logging(&args);

    if args.no_color {
        set_color(false);
    }

    let path = config_path(args.config.as_deref());

    if let Commands::DefConfig = args.command {
        generate_default_config(&path)?;
        return Ok(());
    }

    debug!("loading config from {}", path.display());
    let config = Config::load(&path)?;

    match args.command {
        Commands::DefConfig => unreachable!(),
        Commands::Ping => ping(&config)?,
        Commands::Classify {
            sql,
        } => classify(&config, &sql)?,
        Commands::Query {
            sql, ..
        } => {
            let parameters = command_parameters(&matches)?;
            run_query(&config, &sql, &parameters, args.json)?;
        }
        Commands::Select {
            from,
            fields,
            wheres,
            any,
            order_by,
            limit,
            offset,
            distinct,
            dry_run,
            ..
        } => {
            let parameters = command_parameters(&matches)?;
            let select = SelectArgs {
                from,
                fields,
                wheres,
                any,
                order_by,
                limit,
                offset,
                distinct,
            };
            run_select(&config, select, parameters, dry_run, args.json)?;
        }
    }

    Ok(())
}

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli() {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
