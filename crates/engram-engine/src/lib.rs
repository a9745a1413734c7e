//! Memory engine core for Engram.
//!
//! Turns raw ingestion events into canonical graph nodes/edges, resolves
//! conflicting updates via versioning, ages and archives stale knowledge,
//! consolidates archived clusters into summaries, and answers retrieval
//! queries with a traversal-scored, token-budgeted context pack plus
//! negative-learning warnings.
//!
//! Every component is a stateless transform over batches passed to and
//! from the [`GraphStore`](engram_types::store::GraphStore); durable
//! state lives behind that boundary.

pub mod clock;
pub mod connect;
pub mod conflict;
pub mod extract;
pub mod housekeep;
pub mod normalize;
pub mod orchestrator;
pub mod policy;
pub mod retrieve;

mod engine;
pub use engine::{Engine, IngestReport};
