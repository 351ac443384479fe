use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, CommandFactory, Parser, Subcommand};

pub use crate::cli_ops::*;

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

pub fn styled_command() -> clap::Command {
    Cli::command()
}

#[derive(Debug, Parser)]
#[command(name = "roam")]
#[command(bin_name = "roam")]
#[command(version)]
#[command(about = "Command-line client for Roam Research graphs")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'g',
        long,
        help = "Graph name (overrides ROAM_GRAPH_NAME and config)."
    )]
    pub graph: Option<String>,

    #[arg(long, help = "API token (overrides ROAM_API_TOKEN and config).")]
    pub token: Option<String>,

    #[arg(
        short = 'L',
        long,
        help = "Use the desktop app's Local API (encrypted graphs)."
    )]
    pub local: bool,

    #[arg(long, help = "Cloud API base URL.")]
    pub base_url: Option<String>,

    #[arg(short = 't', long, help = "Request timeout in seconds.")]
    pub timeout: Option<u64>,

    #[arg(
        long,
        help = "Local API port file (defaults to ~/.roam-api-port)."
    )]
    pub port_file: Option<PathBuf>,

    #[arg(
        short = 'c',
        long,
        help = "Config file (defaults to ~/.config/roam/config.toml)."
    )]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Log requests to stderr (ROAM_LOG takes precedence).")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Run a Datalog query.")]
    Query(QueryArgs),
    #[command(about = "Pull one entity.")]
    Pull(PullArgs),
    #[command(about = "Pull several entities.")]
    PullMany(PullManyArgs),
    #[command(about = "Read and write pages.")]
    Page(PageArgs),
    #[command(about = "Read and write blocks.")]
    Block(BlockArgs),
    #[command(about = "Find blocks containing text.")]
    Search(SearchArgs),
    #[command(about = "Work with daily notes.")]
    Daily(DailyArgs),
    #[command(about = "Run a batch of write actions from JSON.")]
    Batch(BatchArgs),
    #[command(about = "Append blocks through the Append API.")]
    Append(AppendArgs),
    #[command(about = "Desktop-only Local API actions.")]
    Local(LocalArgs),
    #[command(about = "Show or edit the config file.")]
    Config(ConfigArgs),
    #[command(about = "Generate or install shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
#[command(about = "Generate or install shell completions.")]
pub struct CompletionsArgs {
    #[arg(help = "Shell name (bash, zsh, fish). Auto-detected if omitted.")]
    pub shell: Option<String>,

    #[arg(
        short = 'i',
        long = "install",
        help = "Write completions to the canonical path for the shell."
    )]
    pub install: bool,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[arg(help = "Datalog query, e.g. '[:find ?t :where [?e :node/title ?t]]'.")]
    pub query: String,

    #[arg(short = 'a', long, help = "Query inputs as a JSON array.")]
    pub args: Option<String>,
}

#[derive(Debug, Args)]
pub struct PullArgs {
    #[arg(help = "Entity id: a number or a lookup ref like '[:block/uid \"abc\"]'.")]
    pub eid: String,

    #[arg(short = 'p', long, default_value = "[*]", help = "Pull selector.")]
    pub pattern: String,
}

#[derive(Debug, Args)]
pub struct PullManyArgs {
    #[arg(required = true, help = "Entity ids or lookup refs.")]
    pub eids: Vec<String>,

    #[arg(short = 'p', long, default_value = "[*]", help = "Pull selector.")]
    pub pattern: String,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(help = "Text to look for.")]
    pub text: String,

    #[arg(
        short = 'n',
        long,
        default_value_t = 20,
        help = "Maximum results (0 for all)."
    )]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    #[arg(
        short = 'f',
        long,
        help = "JSON file with an array of actions (stdin when omitted)."
    )]
    pub file: Option<PathBuf>,

    #[arg(
        short = 'n',
        long,
        help = "Print the resolved actions without sending them."
    )]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct AppendArgs {
    #[arg(help = "Target page title.")]
    pub page: String,

    #[arg(help = "Indented outline to append (stdin when omitted).")]
    pub text: Option<String>,

    #[arg(long, help = "Group the blocks under a block with this text.")]
    pub nest_under: Option<String>,

    #[arg(long, help = "Append API base URL.")]
    pub api_url: Option<String>,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
