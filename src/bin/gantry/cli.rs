//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Gantry - select variants by their attributes
#[derive(Parser)]
#[command(name = "gantry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Select the best candidates for the requests of a matching file
    Select(SelectArgs),

    /// Explain how the candidates compare with one request
    Explain(ExplainArgs),

    /// Show the attributes, rules and precedence of a matching file
    Schema(SchemaArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct SelectArgs {
    /// Matching file to evaluate
    pub file: PathBuf,

    /// Evaluate only this request
    #[arg(long)]
    pub request: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ExplainArgs {
    /// Matching file to evaluate
    pub file: PathBuf,

    /// Request to explain
    #[arg(long)]
    pub request: String,
}

#[derive(Args)]
pub struct SchemaArgs {
    /// Matching file to describe
    pub file: PathBuf,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
