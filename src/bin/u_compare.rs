//! u-compare command line front end.
//!
//! Prints analysis reports and comparison results as JSON on stdout. On
//! failure an error body is printed instead and the process exits with
//! 2 for bad input or 1 for internal faults.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, Level};
use u_compare::compare::ComparisonRequest;
use u_compare::config::CompareConfig;
use u_compare::error::{CompareError, ErrorClass, ErrorResponse};
use u_compare::loader::load_path;
use u_compare::logging::{init_tracing, LogConfig};
use u_compare::profiling::analyze;
use u_compare::render::SvgRenderer;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file overriding the default caps and thresholds
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    /// Log decisions at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pretty-print the JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Profile every column of a .csv or .xlsx file
    Analyze {
        file: PathBuf,
    },
    /// Compare two columns of a .csv or .xlsx file
    Compare {
        file: PathBuf,
        /// Column whose values form the groups (or the x axis)
        #[arg(long)]
        group: String,
        /// Column being summarized (or the y axis)
        #[arg(long)]
        value: String,
    },
}

fn main() {
    let args = Args::parse();

    let log_config = LogConfig::default()
        .with_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_json_format(args.json_logs);
    if let Err(e) = init_tracing(&log_config) {
        eprintln!("logging disabled: {e}");
    }

    match run(&args) {
        Ok(output) => println!("{output}"),
        Err(err) => {
            let response = error_response(&err);
            error!(error = %response.error, class = ?response.class, "request failed");
            match serde_json::to_string(&response) {
                Ok(body) => println!("{body}"),
                Err(_) => println!("{{\"error\":\"{}\"}}", response.error.replace('"', "'")),
            }
            process::exit(match response.class {
                ErrorClass::Client => 2,
                ErrorClass::Server => 1,
            });
        }
    }
}

fn run(args: &Args) -> Result<String> {
    let config = load_config(args.config.as_deref())?;
    let renderer = SvgRenderer::default();

    let value = match &args.command {
        Command::Analyze { file } => {
            let df = load_path(file).with_context(|| format!("reading {}", file.display()))?;
            serde_json::to_value(analyze(&df, &config, &renderer)?)?
        }
        Command::Compare { file, group, value } => {
            let df = load_path(file).with_context(|| format!("reading {}", file.display()))?;
            let request = ComparisonRequest::new(group, value);
            serde_json::to_value(request.run(&df, &config, &renderer)?)?
        }
    };

    let output = if args.pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(output)
}

fn load_config(path: Option<&Path>) -> Result<CompareConfig> {
    let Some(path) = path else {
        return Ok(CompareConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| CompareError::reading(path, e))
        .with_context(|| format!("reading config {}", path.display()))?;
    Ok(CompareConfig::from_json(&text)?)
}

/// Request errors keep their own class; anything else is an internal fault.
fn error_response(err: &anyhow::Error) -> ErrorResponse {
    match err.downcast_ref::<CompareError>() {
        Some(e) => e.to_response(),
        None => ErrorResponse {
            error: format!("{err:#}"),
            class: ErrorClass::Server,
        },
    }
}
