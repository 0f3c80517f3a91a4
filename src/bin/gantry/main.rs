//! Gantry CLI - variant selection over attribute-matching files

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gantry::attributes::AttributeError;
use gantry::util::config::{global_config_path, load_config, project_config_path};
use gantry::util::diagnostic::{emit, suggestions, Diagnostic};

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{CommandError, Session};

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("gantry=debug")
    } else {
        EnvFilter::new("gantry=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let session = Session::new(cli.no_color);
    if let Err(e) = run(cli.command, &session) {
        emit(&report(&e), session.color);
        std::process::exit(1);
    }
}

fn run(command: Commands, session: &Session) -> Result<()> {
    match command {
        Commands::Select(args) => commands::select::execute(args, session),
        Commands::Explain(args) => commands::explain::execute(args, session),
        Commands::Schema(args) => commands::schema::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Turn a command failure into a diagnostic with a suggested next step.
fn report(error: &anyhow::Error) -> Diagnostic {
    if let Some(err) = error.downcast_ref::<CommandError>() {
        return Diagnostic::from_report(err).with_suggestion(suggestions::UNKNOWN_REQUEST);
    }
    if let Some(err) = error.downcast_ref::<AttributeError>() {
        return err
            .to_diagnostic()
            .with_suggestion(suggestions::MALFORMED_MATCHING_FILE);
    }

    let diag = Diagnostic::from_anyhow(error);
    if error.chain().any(|cause| cause.is::<toml::de::Error>()) {
        diag.with_suggestion(suggestions::MALFORMED_MATCHING_FILE)
    } else {
        diag
    }
}

impl Session {
    fn new(no_color: bool) -> Self {
        let config = match std::env::current_dir() {
            Ok(cwd) => load_config(global_config_path().as_deref(), &project_config_path(&cwd)),
            Err(e) => {
                tracing::warn!("cannot determine working directory: {}", e);
                Default::default()
            }
        };
        let color = !no_color && config.color();
        Session { config, color }
    }
}
