//! `gantry select` command
//!
//! Evaluates the requests of a matching file in parallel against one shared
//! matcher.

use anyhow::Result;
use rayon::prelude::*;
use serde::Serialize;

use gantry::attributes::{AttributeMatcher, NoopExplanationBuilder};
use gantry::util::diagnostic::{emit, suggestions, Diagnostic};

use super::{Session, Workspace};
use crate::cli::SelectArgs;

/// The outcome of one request.
#[derive(Debug, Serialize)]
struct Selection {
    request: String,
    selected: Vec<String>,
}

pub fn execute(args: SelectArgs, session: &Session) -> Result<()> {
    let workspace = Workspace::load(&args.file, &session.config)?;

    let names: Vec<String> = match &args.request {
        Some(name) => vec![name.clone()],
        None => workspace.file.request_names().map(str::to_string).collect(),
    };

    let selections = names
        .par_iter()
        .map(|name| select(&workspace, name))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        requests = selections.len(),
        cache_misses = workspace.matcher.cache_misses(),
        "selection complete"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&selections)?);
    } else {
        for selection in &selections {
            if selection.selected.is_empty() {
                println!("{}: no match", selection.request);
            } else {
                println!("{}: {}", selection.request, selection.selected.join(", "));
            }
        }
    }

    let unmatched = selections.iter().filter(|s| s.selected.is_empty()).count();
    if unmatched > 0 {
        let note = Diagnostic::note(format!(
            "{} request(s) matched no candidate",
            unmatched
        ))
        .with_suggestion(suggestions::NO_MATCH);
        emit(&note, session.color);
    }

    Ok(())
}

fn select(workspace: &Workspace, name: &str) -> Result<Selection> {
    let requested = workspace.request(name)?;
    let selected = workspace.matcher.match_multiple_candidates(
        &workspace.candidates,
        &requested,
        &mut NoopExplanationBuilder,
    );

    tracing::debug!("request `{}` selected {} candidate(s)", name, selected.len());

    Ok(Selection {
        request: name.to_string(),
        selected: selected
            .into_iter()
            .map(|variant| variant.name().to_string())
            .collect(),
    })
}
