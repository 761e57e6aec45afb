//! CLI argument definitions for the case decomposer.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "commons-decompose",
    version,
    about = "Decompose nested case documents into relational tables",
    long_about = "Decompose nested case documents into relational tables.\n\n\
                  Field groups seen at most once per parent are flattened into their\n\
                  ancestor table; repeated field groups become their own table with\n\
                  reference and count columns."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow row values in trace logs.
    ///
    /// Case documents usually hold patient data; values are redacted unless
    /// this flag is set.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,

    /// Field-group configuration file (default: $COMMONS_FIELD_GROUPS).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the configured field groups.
    Groups,

    /// Analyze a population and show the tables it decomposes into.
    Plan(PlanArgs),

    /// Decompose a population and write one JSONL file per table.
    Decompose(DecomposeArgs),
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Case documents as a JSON array or JSON Lines.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Write the table schemas as JSON.
    #[arg(long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Parser)]
pub struct DecomposeArgs {
    /// Case documents as a JSON array or JSON Lines.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Directory receiving `<table>.jsonl` and `<table>.schema.json`.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Skip documents that do not fit the plan instead of stopping.
    #[arg(long = "skip-invalid")]
    pub skip_invalid: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
