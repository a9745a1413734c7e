//! Policy checker: warn when a plan repeats a past mistake.
//!
//! Advisory only; the caller is never blocked.

use engram_types::error::EngramResult;
use engram_types::graph::label;
use engram_types::retrieval::PolicyWarning;
use engram_types::store::{GraphStore, NodeFilter};

/// How many recent negative signals are checked.
const SIGNAL_LIMIT: usize = 50;

/// Match a proposed plan against stored negative-learning signals.
///
/// A warning is emitted for every non-archived NegativeSignal whose
/// `reason` appears (case-insensitively) in the plan text. Empty when the
/// store has no aggregate access.
pub async fn warnings_for_plan(
    store: &dyn GraphStore,
    plan: &str,
) -> EngramResult<Vec<PolicyWarning>> {
    if !store.capabilities().aggregates {
        return Ok(Vec::new());
    }
    let signals = store
        .recent_nodes(&NodeFilter::label(label::NEGATIVE_SIGNAL), SIGNAL_LIMIT)
        .await?;

    let plan_lower = plan.to_lowercase();
    let mut warnings = Vec::new();
    for signal in &signals {
        let Some(reason) = signal.prop_str("reason").map(str::trim).filter(|r| !r.is_empty())
        else {
            continue;
        };
        if !plan_lower.contains(&reason.to_lowercase()) {
            continue;
        }
        let kind = signal
            .prop_str("kind")
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or("signal");
        warnings.push(PolicyWarning {
            kind: format!("negative_learning:{kind}"),
            message: format!("This plan matches a past negative-learning signal: {reason}"),
            evidence: vec![signal.id.clone()],
        });
    }
    Ok(warnings)
}
