// THEORY:
// This file is the entry point for the `cloud_sentinel` library crate. It exposes
// the `Sentinel` polling loop and the data structures around it (`RuleSet`,
// `HazardReport`, `Recommendation`, ...) as the public API. The binaries in
// `sentinel_drone` only ever go through these exports.
//
// The internal layers live in `core_modules`, leaf first: the rule set and rule
// store, the hazard matcher on top of them, the report and gateway boundary to
// the vision model, the cooldown gate, and the frame sources.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod events;
pub mod sentinel;

pub use config::SentinelConfig;
pub use core_modules::cooldown::{CooldownGate, GateState, Tick};
pub use core_modules::frame_source::{Frame, FrameSource, ImageDirSource, encode_jpeg};
pub use core_modules::gateway::{AnalysisGateway, GeminiGateway, HAZARD_PROMPT, observe};
pub use core_modules::hazard_matcher::{HazardMatcher, Recommendation};
pub use core_modules::report::{HazardReport, HazardStatus};
pub use core_modules::rule_set::{HazardRule, Protocol, RuleSet, Severity, TriggerEdge};
pub use core_modules::rule_store::{
    KeywordMatch, LoadSummary, ProtocolRecommendation, RuleStore, SqliteRuleStore,
};
pub use error::{ConfigError, GatewayError, RuleSetError, SourceError, StoreError};
pub use events::{CycleReport, RunSummary, SentinelBus, SentinelEvent, StopReason};
pub use sentinel::{Sentinel, assess};
