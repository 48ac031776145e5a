use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "selfman")]
#[command(version)]
#[command(about = "Keep self-built command-line tools in sync with their declarations", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (also shows full step descriptions)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Show the plan without changing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Install an app from scratch
    Install(AppArgs),

    /// Fetch, check out and rebuild an installed app unconditionally
    Update(AppArgs),

    /// Bring an app to its declared state with as little work as possible
    #[command(visible_alias = "mis")]
    MakeItSo(AppArgs),

    /// Remove an app's links and built artifacts
    #[command(visible_alias = "rm")]
    Remove(RemoveArgs),

    /// Show the probed state of one app
    Check(CheckArgs),

    /// List configured apps and their state
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct AppArgs {
    /// App name, as declared in its config file
    pub app: String,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// App name, as declared in its config file
    pub app: String,

    /// Also delete the source checkout or download
    #[arg(long)]
    pub remove_source: bool,

    /// Skip confirmation prompts
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct CheckArgs {
    /// App name
    pub app: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
