// THEORY:
// The `HazardMatcher` is the decision layer. The vision stage hands it a list of
// short hazard descriptors; it hands back the set of response protocols those
// descriptors call for. It is a thin, pure layer over the `RuleStore`:
//
// 1.  The descriptors are joined, in order, into one lower-case blob of text.
// 2.  The store finds every protocol whose hazard keyword is contained in it.
// 3.  The result is treated as a set: duplicates collapse on (action, code) and
//     the output is sorted, so the order of the input never matters.
//
// Callers always get at least one entry. No match yields the observation-only
// sentinel; a store failure yields a clearly labelled `DB_ERROR` entry so the
// pipeline can keep polling in a visibly degraded state.

use crate::core_modules::rule_store::{ProtocolRecommendation, RuleStore};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// One entry of the matcher's answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Recommendation {
    /// A protocol reached from a matching keyword.
    Protocol(ProtocolRecommendation),
    /// Nothing matched: log the observation, take no action.
    ObservationOnly,
    /// The rule store could not be consulted. Carries the cause.
    StoreUnavailable(String),
}

impl Recommendation {
    pub fn protocol(&self) -> Option<&ProtocolRecommendation> {
        match self {
            Recommendation::Protocol(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::Protocol(p) => write!(f, "{p}"),
            Recommendation::ObservationOnly => f.write_str("LOG_OBSERVATION (No Protocol)"),
            Recommendation::StoreUnavailable(cause) => write!(f, "DB_ERROR: {cause}"),
        }
    }
}

/// Resolves hazard descriptors into protocol recommendations.
#[derive(Clone)]
pub struct HazardMatcher {
    store: Arc<dyn RuleStore>,
}

impl HazardMatcher {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, hazards: &[String]) -> Vec<Recommendation> {
        let text = hazards.join(" ").to_lowercase();

        let protocols = match self.store.find_triggered_protocols(&text).await {
            Ok(protocols) => protocols,
            Err(e) => {
                warn!("Rule store unavailable, degrading to error recommendation: {}", e);
                return vec![Recommendation::StoreUnavailable(e.to_string())];
            }
        };

        let unique: BTreeSet<ProtocolRecommendation> = protocols.into_iter().collect();
        if unique.is_empty() {
            debug!("No protocol matched {:?}", text);
            return vec![Recommendation::ObservationOnly];
        }
        unique.into_iter().map(Recommendation::Protocol).collect()
    }
}
