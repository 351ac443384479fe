mod api;
mod app;
mod cli;
mod cli_ops;
mod completions;
mod config;
mod config_commands;
mod graph_commands;
mod local_commands;
mod logging;
#[cfg(test)]
mod main_tests;
mod roamdb;
mod ui;

use std::io::Read;
use std::path::Path;

use serde_json::Value;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

/// Reads a whole file, or stdin when no path is given.
fn read_input(path: Option<&Path>) -> Result<String, app::AppError> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Parses `raw` as a JSON array; `what` names the input in errors.
fn parse_json_array(raw: &str, what: &str) -> Result<Vec<Value>, app::AppError> {
    let value: Value = serde_json::from_str(raw.trim()).map_err(|err| {
        app::AppError::InvalidArgument(format!("{what} must be a JSON array: {err}"))
    })?;
    match value {
        Value::Array(items) => Ok(items),
        other => Err(app::AppError::InvalidArgument(format!(
            "{what} must be a JSON array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn run() -> Result<(), app::AppError> {
    use clap::Parser;
    use cli::Commands;

    let cli = cli::Cli::parse();
    logging::init(cli.debug);

    if let Commands::Completions(args) = &cli.command {
        return completions::run_completions_command(args.shell.as_deref(), args.install);
    }

    let session = app::Session::open(&cli)?;
    match cli.command {
        Commands::Config(args) => config_commands::run_config_command(&args, &session),
        Commands::Batch(args) if args.dry_run => graph_commands::dry_run_batch(&args),
        Commands::Append(args) => graph_commands::run_append(&args, &session),
        Commands::Local(args) => {
            let client = session.connect()?;
            local_commands::run_local_command(&args, &client)
        }
        command => {
            let client = session.connect()?;
            tracing::debug!(mode = %client.mode(), "connected");
            graph_commands::run_graph_command(command, &client, session.prefers_json())
        }
    }
}
