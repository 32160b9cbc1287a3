//! Activity graph CLI - series, tooltips and data tables from project analysis history

#![deny(warnings)]

// Global invariants enforced:
// - stdout carries only the requested JSON or table; diagnostics go to stderr
// - Identical input and configuration yield identical output

use activity_graph_core::config::{self, ResolvedConfig};
use activity_graph_core::date::parse_date;
use activity_graph_core::{
    render_text, ActivityData, GraphHistory, GraphType, TableExporter,
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "activity-graph")]
#[command(about = "Project activity graph: series, tooltips and data tables from analysis history")]
#[command(version = env!("ACTIVITY_GRAPH_VERSION"))]
struct Cli {
    /// Log debug diagnostics to stderr (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the render model (visible series, domain, metric type) as JSON
    Series {
        #[command(flatten)]
        graph: GraphArgs,
    },
    /// Print the tooltip payload for a pointer date as JSON
    Tooltip {
        #[command(flatten)]
        graph: GraphArgs,

        /// Pointer date (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        at: String,

        /// Pin the selection as a click would
        #[arg(long)]
        pin: bool,

        /// Pointer x position reported by the renderer
        #[arg(long, default_value = "0")]
        x: f64,
    },
    /// Print the data table for the current domain
    Table {
        #[command(flatten)]
        graph: GraphArgs,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Maximum rows to print (overrides config file)
        #[arg(long)]
        max_rows: Option<usize>,
    },
    /// Validate or show the configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct GraphArgs {
    /// Activity document (JSON)
    file: PathBuf,

    /// Graph to show (overrides config file)
    #[arg(long)]
    graph: Option<GraphType>,

    /// Metric of a custom graph, repeatable (implies --graph custom)
    #[arg(long = "metric")]
    metrics: Vec<String>,

    /// Hide a series of a static graph, repeatable
    #[arg(long = "hide")]
    hidden: Vec<String>,

    /// Zoom start (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// Zoom end (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    to: Option<String>,

    /// Path to config file (default: auto-discover)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Series { graph: args } => {
            let (graph, _) = load_graph(&args)?;
            println!("{}", serde_json::to_string_pretty(&graph.render_model())?);
        }
        Commands::Tooltip {
            graph: args,
            at,
            pin,
            x,
        } => {
            let (mut graph, _) = load_graph(&args)?;
            let at = parse_date(&at).context("invalid --at date")?;
            if pin {
                graph.click(at, x);
            } else {
                graph.pointer_move(at, x);
            }

            match graph.tooltip_payload() {
                Some(payload) => println!("{}", serde_json::to_string_pretty(&payload)?),
                None => anyhow::bail!("no visible data point to select"),
            }
        }
        Commands::Table {
            graph: args,
            format,
            max_rows,
        } => {
            let (graph, resolved) = load_graph(&args)?;

            // CLI flags override config file values
            let max_rows = max_rows.unwrap_or(resolved.table_max_rows);
            if max_rows == 0 {
                anyhow::bail!("--max-rows must be at least 1");
            }

            let exporter = TableExporter::new(resolved.table_date_format.clone())?;
            let table = graph.data_table(&exporter).limited(max_rows);
            match format {
                OutputFormat::Text => print!("{}", render_text(&table)),
                OutputFormat::Json => println!("{}", table.to_json()?),
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                match config::load_and_resolve(&project_root, path.as_deref()) {
                    Ok(resolved) => {
                        if let Some(ref p) = resolved.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;
                print_config(&resolved);
            }
        },
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load document and configuration, then apply legend and zoom flags
fn load_graph(args: &GraphArgs) -> anyhow::Result<(GraphHistory, ResolvedConfig)> {
    let project_root = std::env::current_dir()?;
    let mut resolved = config::load_and_resolve(&project_root, args.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(ref config_path) = resolved.config_path {
        tracing::debug!("using config: {}", config_path.display());
    }

    // CLI flags override config file values
    match (args.graph, args.metrics.is_empty()) {
        (Some(graph), _) => resolved.graph = graph,
        (None, false) => resolved.graph = GraphType::Custom,
        (None, true) => {}
    }
    if !args.metrics.is_empty() {
        resolved.custom_metrics = args.metrics.clone();
    }
    if resolved.graph == GraphType::Custom
        && resolved.custom_metrics.len() > resolved.max_custom_metrics
    {
        anyhow::bail!(
            "custom graph holds at most {} metrics ({} given)",
            resolved.max_custom_metrics,
            resolved.custom_metrics.len()
        );
    }

    let data = ActivityData::load(&args.file)?;
    let mut graph = GraphHistory::from_config(data, &resolved)
        .context("pass at least one --metric for a custom graph")?;

    for metric in &args.hidden {
        graph
            .toggle_series(metric)
            .with_context(|| format!("cannot hide '{}'", metric))?;
    }

    let from = parse_optional_date(args.from.as_deref()).context("invalid --from date")?;
    let to = parse_optional_date(args.to.as_deref()).context("invalid --to date")?;
    if from.is_some() || to.is_some() {
        graph.zoom(from, to).context("invalid zoom window")?;
    }

    Ok((graph, resolved))
}

fn parse_optional_date(raw: Option<&str>) -> anyhow::Result<Option<DateTime<Utc>>> {
    raw.map(parse_date).transpose()
}

fn print_config(resolved: &ResolvedConfig) {
    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!();
    println!("Graph:");
    println!("  graph: {}", resolved.graph);
    println!(
        "  custom_metrics: {}",
        if resolved.custom_metrics.is_empty() {
            "none".to_string()
        } else {
            resolved.custom_metrics.join(", ")
        }
    );
    println!("  max_custom_metrics: {}", resolved.max_custom_metrics);
    println!();
    println!("Interaction:");
    println!("  tie_break: {}", resolved.tie_break);
    println!("  min_zoom_hours: {}", resolved.min_zoom_hours);
    println!();
    println!("Table:");
    println!("  max_rows: {}", resolved.table_max_rows);
    println!("  date_format: {}", resolved.table_date_format);
}
