use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use tracefold::input::read_traces;
use tracefold::logging::init_logging;
use tracefold::render::{render_trace, services_summary};
use tracefold_core::{normalize_batch, Config, ServiceSpanCount, Trace};

#[derive(Parser)]
#[command(name = "tracefold")]
#[command(about = "Rebuild ordered span trees from Jaeger trace exports", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "tracefold.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize traces and print them as JSON
    Normalize {
        /// Trace payload file, or `-` for stdin
        file: PathBuf,
        /// Print single-line JSON regardless of config
        #[arg(long)]
        compact: bool,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show each trace as an indented span tree
    Tree {
        /// Trace payload file, or `-` for stdin
        file: PathBuf,
    },

    /// List span counts per service for each trace
    Services {
        /// Trace payload file, or `-` for stdin
        file: PathBuf,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration
    Config,
}

#[derive(Debug, Serialize)]
struct TraceServices<'a> {
    trace_id: &'a str,
    trace_name: &'a str,
    services: &'a [ServiceSpanCount],
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_file_or_default(&cli.config)?;
    config.validate()?;

    init_logging(&config.logging);
    tracing::debug!("Using configuration from {:?}", cli.config);

    match cli.command {
        Commands::Normalize {
            file,
            compact,
            output,
        } => {
            let traces = load(&file, &config)?;
            let rendered = if compact || !config.output.pretty {
                serde_json::to_string(&traces)?
            } else {
                serde_json::to_string_pretty(&traces)?
            };

            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    tracing::info!("✅ Wrote {} trace(s) to {:?}", traces.len(), path);
                }
                None => println!("{}", rendered),
            }
        }
        Commands::Tree { file } => {
            let traces = load(&file, &config)?;
            if traces.is_empty() {
                println!("No traces found");
            }
            for trace in &traces {
                println!("{}", render_trace(trace));
            }
        }
        Commands::Services { file, json } => {
            let traces = load(&file, &config)?;
            handle_services(&traces, json)?;
        }
        Commands::Config => {
            print!("{}", Config::default_toml()?);
        }
    }

    Ok(())
}

fn load(file: &std::path::Path, config: &Config) -> Result<Vec<Trace>> {
    let raws = read_traces(file)?;
    let palette = config.palette()?;
    normalize_batch(raws, &palette).context("Failed to normalize traces")
}

fn handle_services(traces: &[Trace], json: bool) -> Result<()> {
    if json {
        let data: Vec<TraceServices> = traces
            .iter()
            .map(|t| TraceServices {
                trace_id: &t.trace_id,
                trace_name: &t.trace_name,
                services: &t.services,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("{:<34} {:>6} {}", "TRACE ID", "SPANS", "SERVICES");
    for trace in traces {
        println!(
            "{:<34} {:>6} {}",
            trace.trace_id,
            trace.spans.len(),
            services_summary(trace)
        );
    }

    Ok(())
}
