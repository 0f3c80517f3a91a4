//! `gantry explain` command
//!
//! Shows how every candidate compares with one request, then replays the
//! selection with its explanation recorded.

use anyhow::Result;

use gantry::attributes::{AttributeMatcher, AttributeMatchingCandidate, RecordingExplanationBuilder};

use super::{Session, Workspace};
use crate::cli::ExplainArgs;

pub fn execute(args: ExplainArgs, session: &Session) -> Result<()> {
    let workspace = Workspace::load(&args.file, &session.config)?;
    let requested = workspace.request(&args.request)?;
    let matcher = &workspace.matcher;

    println!("request `{}`: {}", args.request, requested);

    for variant in &workspace.candidates {
        let verdict = if matcher.is_matching_candidate(variant.attributes(), &requested) {
            "compatible"
        } else {
            "incompatible"
        };
        println!();
        println!("{} ({})", variant.name(), verdict);
        for description in matcher.describe_matching(variant.attributes(), &requested) {
            println!("  {}", description);
        }
    }

    let mut explanation = RecordingExplanationBuilder::new();
    let selected =
        matcher.match_multiple_candidates(&workspace.candidates, &requested, &mut explanation);

    if !explanation.events().is_empty() {
        println!();
        println!("events:");
        for event in explanation.events() {
            let line = event.describe(|index| {
                workspace
                    .candidates
                    .get(index)
                    .map(|variant| format!("`{}`", variant.name()))
                    .unwrap_or_else(|| format!("candidate #{}", index))
            });
            println!("  {}", line);
        }
    }

    println!();
    if selected.is_empty() {
        println!("selected: none");
    } else {
        let names: Vec<&str> = selected.iter().map(|variant| variant.name()).collect();
        println!("selected: {}", names.join(", "));
    }

    Ok(())
}
