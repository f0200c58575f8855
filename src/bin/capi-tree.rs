//! capi-tree CLI
//!
//! Reads a resource snapshot, builds the tree of one cluster and prints it
//! as JSON.

use anyhow::Context;
use capi_tree::core::TreeEngine;
use capi_tree::logging::init_logging;
use capi_tree::{Category, SnapshotSource, TreeConfig};
use clap::{ArgAction, Parser};
use serde::Serialize;
use std::path::PathBuf;

/// Build the categorized resource tree of a Cluster API cluster.
#[derive(Parser, Debug)]
#[command(name = "capi-tree")]
#[command(version = capi_tree::VERSION)]
#[command(about = "Build the categorized resource tree of a Cluster API cluster")]
#[command(after_help = "EXAMPLES:
  # Print the tree of cluster 'dev'
  capi-tree snapshot.json --cluster dev

  # Write compact JSON to a file
  capi-tree snapshot.json --cluster dev --compact -o tree.json

  # Show how every resource was categorized
  capi-tree snapshot.json --cluster dev --categories -v
")]
struct Cli {
    /// Snapshot file with resource types and instances
    #[arg(value_name = "SNAPSHOT")]
    snapshot: PathBuf,

    /// Name of the cluster to build the tree for
    #[arg(long = "cluster", value_name = "NAME")]
    cluster: String,

    /// Output file path (default: stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Config file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit compact JSON instead of pretty-printed JSON
    #[arg(long = "compact")]
    compact: bool,

    /// Print the settled flat resource list instead of the tree
    #[arg(long = "categories")]
    categories: bool,

    /// More diagnostics on stderr (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CategoryEntry {
    key: String,
    category: Option<Category>,
    parent_id: Option<String>,
}

fn to_json<T: Serialize>(value: &T, compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => TreeConfig::load(path)?,
        None => TreeConfig::default(),
    };
    let source = SnapshotSource::load(&cli.snapshot)?;
    let engine = TreeEngine::new(config);

    let json = if cli.categories {
        let entries: Vec<CategoryEntry> = engine
            .settle_cluster(&source, &cli.cluster)?
            .into_iter()
            .map(|n| CategoryEntry {
                key: n.key,
                category: n.category,
                parent_id: n.parent_id,
            })
            .collect();
        to_json(&entries, cli.compact)?
    } else {
        let tree = engine.build_cluster(&source, &cli.cluster)?;
        to_json(&tree, cli.compact)?
    };

    match &cli.output {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
