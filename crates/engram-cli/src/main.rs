//! Engram CLI: boots an in-process engine and runs one command.

mod cli;
mod config;
mod dotenv;

use anyhow::{bail, Context};
use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use engram_engine::clock::SystemClock;
use engram_engine::Engine;
use engram_types::config::EngramConfig;
use engram_types::event::IngestEvent;
use engram_types::retrieval::RetrievalRequest;
use std::sync::Arc;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn build_engine(config: &EngramConfig) -> anyhow::Result<Engine> {
    let store = engram_store::build_store(&config.store).context("building graph store")?;
    let model = engram_llm::build_model(&config.llm).context("building language model")?;
    Ok(Engine::new(
        store,
        model,
        Arc::new(SystemClock),
        config.routes.clone(),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::load_dotenv();
    init_tracing();

    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref());
    let engine = build_engine(&config)?;

    match cli.command {
        Commands::InitDb => {
            engine.init().await?;
            println!(
                "{} schema ensured (backend={:?})",
                "OK".green(),
                config.store.backend
            );
        }

        Commands::Ask { text, source } => {
            engine.init().await?;
            let outcome = engine.chat(&text, &source).await?;

            println!("\n{}", "Entities:".bold());
            for entity in &outcome.entities {
                println!("- {} ({})", entity.name, entity.entity_type);
            }

            let context = if outcome.context.is_empty() {
                "(empty)".to_string()
            } else {
                outcome.context.clone()
            };
            println!("\n{}\n{}", "Context pack:".bold(), context);
            println!("\n{}\n{}", "Answer:".bold().green(), outcome.answer);
            println!("\n{}\n{}", "Judge:".bold(), outcome.judge);
        }

        Commands::Ingest { json, file } => {
            let raw = match (json, file) {
                (Some(json), _) => json,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => bail!("provide the event JSON inline or via --file"),
            };
            let event: IngestEvent =
                serde_json::from_str(&raw).context("parsing ingestion event")?;
            engine.init().await?;
            let report = engine.ingest(&event).await?;
            println!(
                "{} {} facts -> {} nodes, {} edges",
                "OK".green(),
                report.facts.len(),
                report.nodes,
                report.edges
            );
        }

        Commands::Retrieve {
            query,
            file,
            mode,
            priority,
        } => {
            engine.init().await?;
            let result = engine
                .retrieve(&RetrievalRequest {
                    query,
                    current_file: file,
                    mode: mode.into(),
                    priority: priority.into(),
                })
                .await?;
            println!(
                "{} model={} budget={} files={}",
                "Route:".bold(),
                result.model,
                result.token_budget,
                result.trace.selection.len()
            );
            println!("\n{}", result.context_pack);
        }

        Commands::Housekeep { consolidate } => {
            engine.init().await?;
            let report = engine.housekeep(consolidate).await?;
            println!(
                "{} scored={} archived={} summaries={} ({}ms)",
                "OK".green(),
                report.scored,
                report.archived,
                report.summaries,
                report.duration_ms
            );
        }

        Commands::PlanCheck { plan } => {
            engine.init().await?;
            let warnings = engine.plan_warnings(&plan).await?;
            if warnings.is_empty() {
                println!("{} no matching negative-learning signals", "OK".green());
            } else {
                for warning in &warnings {
                    println!(
                        "{} [{}] {} (evidence: {})",
                        "WARN".yellow().bold(),
                        warning.kind,
                        warning.message,
                        warning.evidence.join(", ")
                    );
                }
            }
        }

        Commands::Export { limit_nodes } => {
            engine.init().await?;
            let export = engine.export(limit_nodes).await?;
            println!("{}", serde_json::to_string_pretty(&export)?);
        }

        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.api.bind.clone());
            engram_api::serve(engine, &bind).await?;
        }
    }

    Ok(())
}
