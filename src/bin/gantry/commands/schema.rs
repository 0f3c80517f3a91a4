//! `gantry schema` command

use anyhow::Result;

use gantry::util::MatchingFile;

use crate::cli::SchemaArgs;

pub fn execute(args: SchemaArgs) -> Result<()> {
    let file = MatchingFile::load(&args.file)?;
    let schema = file.schema()?;

    println!("attributes:");
    for strategy in schema.strategies() {
        let attribute = strategy.attribute();
        println!("  {} ({})", attribute.name(), attribute.ty());
        for rule in strategy.compatibility_rules().describe() {
            println!("    {}", rule);
        }
        for rule in strategy.disambiguation_rules().describe() {
            println!("    {}", rule);
        }
    }

    let precedence: Vec<String> = schema.precedence().map(|name| name.to_string()).collect();
    if precedence.is_empty() {
        println!("precedence: none");
    } else {
        println!("precedence: {}", precedence.join(", "));
    }

    println!("candidates: {}", file.candidates.len());
    println!("requests: {}", file.requests.len());

    Ok(())
}
