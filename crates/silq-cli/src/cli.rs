use clap::{ArgAction, Parser, Subcommand, ValueHint};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Provide custom config file
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write an annotated default configuration file
    #[clap(name = "defconfig")]
    DefConfig,

    /// Connect and show the server version and selected database
    Ping,

    /// Show how a statement is classified
    #[command(arg_required_else_help = true)]
    Classify {
        /// SQL statement to classify
        sql: String,
    },

    /// Run a statement with bound parameters
    #[command(arg_required_else_help = true)]
    #[clap(visible_alias = "q")]
    Query {
        /// SQL statement with `?` placeholders
        sql: String,

        /// Bind a value to the next placeholder
        #[arg(required = false, short = 'p', long = "param")]
        params: Vec<String>,

        /// Bind a value with a type hint, as `type:value`
        #[arg(required = false, short = 't', long = "typed")]
        typed: Vec<String>,
    },

    /// Build a SELECT from its clauses and run it
    #[command(arg_required_else_help = true)]
    #[clap(visible_alias = "s")]
    Select {
        /// Table to select from
        #[arg(required = true, long)]
        from: String,

        /// Select expression, optionally suffixed with `:alias`
        #[arg(required = false, short, long = "field")]
        fields: Vec<String>,

        /// WHERE predicate; `?` placeholders take the next parameters
        #[arg(required = false, short, long = "where")]
        wheres: Vec<String>,

        /// Match rows satisfying any WHERE predicate instead of all
        #[arg(required = false, long)]
        any: bool,

        /// Bind a value to the next placeholder
        #[arg(required = false, short = 'p', long = "param")]
        params: Vec<String>,

        /// Bind a value with a type hint, as `type:value`
        #[arg(required = false, short = 't', long = "typed")]
        typed: Vec<String>,

        /// Order by `column [ASC|DESC]`
        #[arg(required = false, short, long)]
        order_by: Vec<String>,

        /// Maximum number of rows
        #[arg(required = false, short, long)]
        limit: Option<u64>,

        /// Rows to skip
        #[arg(required = false, long, default_value_t = 0)]
        offset: u64,

        /// Select distinct rows
        #[arg(required = false, long)]
        distinct: bool,

        /// Print the compiled statement without running it
        #[arg(required = false, long)]
        dry_run: bool,
    },
}
