mod commands;
mod config;
mod input;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use commands::answers::cmd_answers;
use commands::parse::cmd_parse;
use commands::period::cmd_period;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// DSN social-declaration parser and reporting toolkit.
#[derive(Parser)]
#[command(
    name = "dsn",
    version,
    about = "DSN social-declaration parser and reporting toolkit"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a TOML config file (defaults to ./dsn.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log parser decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a DSN file and print the company / establishment / employee tree
    Parse {
        /// Path to the DSN .txt file
        file: PathBuf,
    },

    /// Print the reporting period covered by a DSN file
    Period {
        /// Path to the DSN .txt file
        file: PathBuf,
    },

    /// Compute reporting answers from a DSN file
    Answers {
        /// Path to the DSN .txt file
        file: PathBuf,
        /// JSON object of question id -> answer that replaces computed values
        #[arg(long)]
        overrides: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Parse { file } => {
            cmd_parse(&file, &config, cli.output, cli.quiet);
        }
        Commands::Period { file } => {
            cmd_period(&file, &config, cli.output, cli.quiet);
        }
        Commands::Answers { file, overrides } => {
            cmd_answers(
                &file,
                overrides.as_deref(),
                &config,
                cli.output,
                cli.quiet,
            );
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
