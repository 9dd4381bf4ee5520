pub mod cooldown;
pub mod frame_source;
pub mod gateway;
pub mod hazard_matcher;
pub mod report;
pub mod rule_set;
pub mod rule_store;
