//! docql - compile a query description into pipeline stages

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use docql::config::{CompilerConfig, GroupFallback, DEFAULT_ID_FIELD};
use docql::pipeline::{Query, QueryCompiler};
use docql::value::Value;
use log::info;
use std::collections::HashMap;
use std::path::PathBuf;

/// docql - compiles WHERE/SELECT/GROUP BY/HAVING/ORDER BY expression trees
/// into document-store pipeline stages
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON query description
    query: PathBuf,

    /// JSON object mapping binding keys (`source.field`, variable id or field) to live values
    #[arg(short, long)]
    bindings: Option<PathBuf>,

    /// Field compared through the object-id template
    #[arg(long, default_value = DEFAULT_ID_FIELD)]
    id_field: String,

    /// Accumulator for non-key, non-aggregate attributes when grouping
    #[arg(long, value_enum, default_value_t = GroupFallback::First)]
    fallback: GroupFallback,

    /// Print the pipeline as JSON instead of one stage per line
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let query = Query::from_path(&args.query)?;
    let config = CompilerConfig {
        id_field: args.id_field,
        group_fallback: args.fallback,
    };

    let pipeline = QueryCompiler::new(config)
        .compile_query(&query)
        .with_context(|| format!("Failed to compile {}", args.query.display()))?;
    info!(
        "compiled {} stage(s), {} runtime placeholder(s)",
        pipeline.stages().len(),
        pipeline.placeholders().len()
    );

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&pipeline).context("Failed to serialize pipeline")?
        );
        return Ok(());
    }

    let stages = match &args.bindings {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read bindings file {}", path.display()))?;
            let bindings: HashMap<String, Value> = serde_json::from_str(&text)
                .with_context(|| format!("Invalid bindings in {}", path.display()))?;
            pipeline
                .resolve(&bindings)
                .context("Failed to resolve runtime placeholders")?
        }
        None => pipeline.render(),
    };

    for stage in stages {
        println!("{}", stage);
    }

    if args.bindings.is_none() && !pipeline.placeholders().is_empty() {
        println!();
        println!("Runtime placeholders:");
        for (name, binding) in pipeline.placeholders().iter() {
            println!("   - {} <- {} ({})", name, binding.key(), binding.ty);
        }
    }

    Ok(())
}
