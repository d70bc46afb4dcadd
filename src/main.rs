//! clirel CLI: parse-tree enrichment and composite kernels for clinical relations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Deserialize;

use clirel::config::KernelConfig;
use clirel::corpus::SentenceBank;
use clirel::enrich::{self, EnrichmentMode};
use clirel::export::{entity_features, instance_line};
use clirel::kernel::{CompositeKernel, KernelInput};
use clirel::relation::{EntitySpan, EntityType, RelationInstance, RelationType};
use clirel::tree::parse::strip_outer;
use clirel::tree::{ParseTree, parse_or_empty};

#[derive(Parser)]
#[command(name = "clirel", version, about = "Tree kernels for clinical relation extraction")]
struct Cli {
    /// Kernel configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enrichment mode, overriding the config file (spt, insert, suffix).
    #[arg(long, global = true)]
    mode: Option<EnrichmentMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a parser output file (one bracketed tree per line) and print it as JSON.
    Parse {
        /// Path to the parse file.
        file: PathBuf,
    },

    /// Enrich one tree for a pair of entities.
    Enrich {
        /// Bracketed tree, e.g. "(S (NP (NN pain)) (VP (VBD improved)))".
        #[arg(long)]
        tree: String,

        /// First entity as start:end:type, e.g. "0:0:problem".
        #[arg(long, value_parser = parse_entity)]
        first: EntitySpan,

        /// Second entity as start:end:type.
        #[arg(long, value_parser = parse_entity)]
        second: EntitySpan,
    },

    /// Compute the composite kernel matrix over a set of relation instances.
    Kernel {
        /// JSON file: [{"tree": "...", "first": {...}, "second": {...}}, ...].
        #[arg(long)]
        instances: PathBuf,

        /// Order each instance's entities by start index before enrichment.
        #[arg(long)]
        canonical: bool,
    },

    /// Write SVM-light-TK instance lines for a set of relation instances.
    Export {
        /// JSON file of relation instances.
        #[arg(long)]
        instances: PathBuf,

        /// Emit +1/-1 targets for this relation type.
        #[arg(long)]
        label: Option<RelationType>,

        /// Order each instance's entities by start index before enrichment.
        #[arg(long)]
        canonical: bool,
    },
}

/// One relation instance as read from JSON.
#[derive(Deserialize)]
struct InstanceRecord {
    tree: String,
    first: EntitySpan,
    second: EntitySpan,
    #[serde(default)]
    relation: Option<RelationType>,
}

fn parse_entity(s: &str) -> std::result::Result<EntitySpan, String> {
    let mut parts = s.splitn(3, ':');
    let (Some(start), Some(end), Some(kind)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected start:end:type, got \"{s}\""));
    };
    let start = start
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("bad start index: {e}"))?;
    let end = end
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("bad end index: {e}"))?;
    let kind = kind.parse::<EntityType>().map_err(|e| e.to_string())?;
    Ok(EntitySpan::new(start, end, kind))
}

fn load_instances(
    path: &Path,
    canonical: bool,
) -> Result<Vec<(RelationInstance, Option<RelationType>)>> {
    let content = std::fs::read_to_string(path).into_diagnostic()?;
    let records: Vec<InstanceRecord> = serde_json::from_str(&content).into_diagnostic()?;

    let mut instances = Vec::with_capacity(records.len());
    for record in records {
        let tree = parse_or_empty(strip_outer(&record.tree));
        let instance = RelationInstance::new(Arc::new(tree), record.first, record.second)?;
        let instance = if canonical { instance.canonical() } else { instance };
        instances.push((instance, record.relation));
    }
    tracing::info!(count = instances.len(), path = %path.display(), "loaded relation instances");
    Ok(instances)
}

/// Enrich an instance; on failure, log and fall back to the empty tree so the
/// instance still occupies its row of the output.
fn kernel_input(index: usize, instance: &RelationInstance, mode: EnrichmentMode) -> KernelInput {
    match instance.enriched(mode) {
        Ok(input) => input,
        Err(e) => {
            tracing::warn!(index, error = %e, "enrichment failed, using empty tree");
            KernelInput::new(ParseTree::empty(), instance.pair())
        }
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => KernelConfig::load(path)?,
        None => KernelConfig::default(),
    };
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }

    match cli.command {
        Commands::Parse { file } => {
            let mut bank = SentenceBank::new();
            let report = bank.load_file(&file)?;
            let document = SentenceBank::document_name(&file);

            let sentences: Vec<serde_json::Value> = (1..=report.sentences)
                .filter_map(|line| {
                    let tree = bank.get(&document, line)?;
                    Some(serde_json::json!({
                        "line": line,
                        "tree": tree.to_string(),
                        "leaves": tree.leaves(),
                    }))
                })
                .collect();
            let json = serde_json::to_string_pretty(&sentences).into_diagnostic()?;
            println!("{json}");
        }

        Commands::Enrich {
            tree,
            first,
            second,
        } => {
            let tree = ParseTree::from_parser_line(&tree)?;
            let enriched = enrich::enrich(&tree, config.mode, first.mark(), second.mark())?;
            println!("{enriched}");
        }

        Commands::Kernel {
            instances,
            canonical,
        } => {
            let instances = load_instances(&instances, canonical)?;
            let inputs: Vec<KernelInput> = instances
                .iter()
                .enumerate()
                .map(|(idx, (instance, _))| kernel_input(idx, instance, config.mode))
                .collect();

            let kernel = CompositeKernel::new(config.params());
            let matrix = kernel.gram_matrix(&inputs);

            let mut rows = Vec::with_capacity(matrix.rows());
            for i in 0..matrix.rows() {
                let mut row = Vec::with_capacity(matrix.cols());
                for j in 0..matrix.cols() {
                    match matrix.get(i, j) {
                        Some(Ok(value)) => row.push(Some(*value)),
                        Some(Err(e)) => {
                            // mirrored cells repeat the same error; report each pair once
                            if j >= i {
                                tracing::warn!(row = i, col = j, error = %e, "kernel evaluation failed");
                            }
                            row.push(None);
                        }
                        None => row.push(None),
                    }
                }
                rows.push(row);
            }

            let out = serde_json::json!({
                "mode": config.mode.to_string(),
                "alpha": config.alpha,
                "beta": config.beta,
                "failures": matrix.failures(),
                "matrix": rows,
            });
            let json = serde_json::to_string_pretty(&out).into_diagnostic()?;
            println!("{json}");
        }

        Commands::Export {
            instances,
            label,
            canonical,
        } => {
            let instances = load_instances(&instances, canonical)?;
            for (idx, (instance, relation)) in instances.iter().enumerate() {
                let input = kernel_input(idx, instance, config.mode);
                let target = label.map(|l| *relation == Some(l));
                let features = entity_features(instance.pair());
                println!("{}", instance_line(target, input.tree(), &features));
            }
        }
    }

    Ok(())
}
