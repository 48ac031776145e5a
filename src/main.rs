mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod probe;
mod runner;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub dry_run: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        dry_run: cli.dry_run,
    };

    let result = match cli.command {
        Command::Install(args) => commands::install::run(&ctx, &args.app),
        Command::Update(args) => commands::update::run(&ctx, &args.app),
        Command::MakeItSo(args) => commands::make_it_so::run(&ctx, &args.app),
        Command::Remove(args) => commands::remove::run(&ctx, args),
        Command::Check(args) => commands::check::run(&args.app, args.json),
        Command::List(args) => commands::list::run(args.json),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "selfman", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = &result
        && let Some(err) = e.downcast_ref::<reconcile::Error>()
    {
        let kind = err.kind();
        ui::hint(&format!("{kind}. {}", kind.advice()));
    }
    result
}
