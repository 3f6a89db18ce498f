use clap::Parser;
use filesorter::cli::{Command, run_cli};
use filesorter::config::{DEFAULT_RULES_FILE, RuleStore};
use filesorter::output::OutputFormatter;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Rules file to read and update
    #[arg(long, short = 'r', default_value = DEFAULT_RULES_FILE, global = true)]
    rules: PathBuf,

    /// Log every moved file
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();

    let store = RuleStore::new(args.rules);
    match run_cli(args.command, &store) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&e);
            ExitCode::FAILURE
        }
    }
}
