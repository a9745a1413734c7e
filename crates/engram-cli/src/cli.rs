//! Command-line argument definitions.

use clap::{Parser, Subcommand, ValueEnum};
use engram_types::retrieval::{RetrievalMode, RetrievalPriority};
use std::path::PathBuf;

/// Engram: a provenance-tracked knowledge graph for a conversational
/// agent.
#[derive(Parser)]
#[command(name = "engram", version, about)]
pub struct Cli {
    /// Config file path (default: ./engram.toml, then ~/.engram/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the graph schema.
    InitDb,

    /// Ask a question; stores extracted entities and answers from memory.
    Ask {
        /// The question or statement.
        text: String,
        /// Provenance source recorded for this turn.
        #[arg(long, default_value = "cli")]
        source: String,
    },

    /// Ingest a typed event, given as JSON inline or from a file.
    Ingest {
        /// The event as JSON: {"type": ..., "source": ..., "payload": ...}.
        json: Option<String>,
        /// Read the event JSON from a file instead.
        #[arg(long, conflicts_with = "json")]
        file: Option<PathBuf>,
    },

    /// Retrieve a scored, budgeted context pack for a query.
    Retrieve {
        /// The question or task description.
        query: String,
        /// The file currently being worked on (anchors traversal).
        #[arg(long)]
        file: Option<String>,
        /// Work budget mode.
        #[arg(long, value_enum, default_value = "balanced")]
        mode: ModeArg,
        /// Cost/quality priority.
        #[arg(long, value_enum, default_value = "quality")]
        priority: PriorityArg,
    },

    /// Recompute decay/importance, archive stale nodes, optionally
    /// consolidate archived clusters into summaries.
    Housekeep {
        /// Also consolidate archived clusters.
        #[arg(long)]
        consolidate: bool,
    },

    /// Check a proposed plan against stored negative-learning signals.
    PlanCheck {
        /// The plan text.
        plan: String,
    },

    /// Export the graph as JSON.
    Export {
        /// Maximum nodes to export.
        #[arg(long, default_value_t = 1000)]
        limit_nodes: usize,
    },

    /// Serve the HTTP API.
    Serve {
        /// Bind address; overrides the config.
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Fast,
    Balanced,
    Thorough,
}

impl From<ModeArg> for RetrievalMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Fast => RetrievalMode::Fast,
            ModeArg::Balanced => RetrievalMode::Balanced,
            ModeArg::Thorough => RetrievalMode::Thorough,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PriorityArg {
    Quality,
    Cheap,
}

impl From<PriorityArg> for RetrievalPriority {
    fn from(priority: PriorityArg) -> Self {
        match priority {
            PriorityArg::Quality => RetrievalPriority::Quality,
            PriorityArg::Cheap => RetrievalPriority::Cheap,
        }
    }
}
