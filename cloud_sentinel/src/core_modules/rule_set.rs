// THEORY:
// A `RuleSet` is the complete, validated description of what the sentinel knows:
// which hazard keywords exist, which response protocols exist, and which hazard
// triggers which protocol. It is the unit of the administrative reload. The
// store never receives a partial or inconsistent set, because every identity
// rule (unique keywords, unique codes, edges that point at real nodes) is
// checked here, before anything touches the database.
//
// Keywords are normalized once, on the way in: trimmed and lower-cased. The
// matcher relies on that when it compares against lower-cased hazard text.

use crate::error::RuleSetError;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How serious a hazard is considered to be. Stored as its upper-case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Moderate,
    High,
    Severe,
    Critical,
    Catastrophic,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Moderate => "MODERATE",
            Severity::High => "HIGH",
            Severity::Severe => "SEVERE",
            Severity::Critical => "CRITICAL",
            Severity::Catastrophic => "CATASTROPHIC",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = RuleSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Severity::Low),
            "MODERATE" => Ok(Severity::Moderate),
            "HIGH" => Ok(Severity::High),
            "SEVERE" => Ok(Severity::Severe),
            "CRITICAL" => Ok(Severity::Critical),
            "CATASTROPHIC" => Ok(Severity::Catastrophic),
            _ => Err(RuleSetError::UnknownSeverity(s.to_string())),
        }
    }
}

/// A hazard keyword and its severity. Identity is the keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HazardRule {
    /// Always trimmed and lower-case.
    pub keyword: String,
    pub category: Severity,
}

impl HazardRule {
    pub fn new(keyword: &str, category: Severity) -> Self {
        Self {
            keyword: normalize_keyword(keyword),
            category,
        }
    }
}

/// A named response action. Identity is the code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Protocol {
    pub action: String,
    pub code: String,
}

impl Protocol {
    pub fn new(action: &str, code: &str) -> Self {
        Self {
            action: action.trim().to_string(),
            code: code.trim().to_string(),
        }
    }
}

/// Directed "triggers" relation from a hazard keyword to a protocol code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct TriggerEdge {
    pub keyword: String,
    pub code: String,
}

impl TriggerEdge {
    pub fn new(keyword: &str, code: &str) -> Self {
        Self {
            keyword: normalize_keyword(keyword),
            code: code.trim().to_string(),
        }
    }
}

/// On-disk shape of a rule file. Severities are read as text so a lower-case
/// `critical` is accepted and an unknown one gets a precise error.
#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    hazards: Vec<RuleFileHazard>,
    #[serde(default)]
    protocols: Vec<Protocol>,
    #[serde(default)]
    triggers: Vec<TriggerEdge>,
}

#[derive(Debug, Deserialize)]
struct RuleFileHazard {
    keyword: String,
    category: String,
}

/// A validated collection of hazards, protocols and trigger edges.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    hazards: Vec<HazardRule>,
    protocols: Vec<Protocol>,
    triggers: Vec<TriggerEdge>,
}

impl RuleSet {
    /// Validates and builds a rule set. Duplicate trigger edges are merged.
    pub fn new(
        hazards: Vec<HazardRule>,
        protocols: Vec<Protocol>,
        triggers: Vec<TriggerEdge>,
    ) -> Result<Self, RuleSetError> {
        let hazards: Vec<HazardRule> = hazards
            .into_iter()
            .map(|h| HazardRule::new(&h.keyword, h.category))
            .collect();
        let protocols: Vec<Protocol> = protocols
            .into_iter()
            .map(|p| Protocol::new(&p.action, &p.code))
            .collect();

        let mut keywords = HashSet::new();
        for hazard in &hazards {
            if hazard.keyword.is_empty() {
                return Err(RuleSetError::EmptyKeyword);
            }
            if !keywords.insert(hazard.keyword.as_str()) {
                return Err(RuleSetError::DuplicateKeyword(hazard.keyword.clone()));
            }
        }

        let mut codes = HashSet::new();
        for protocol in &protocols {
            if protocol.code.is_empty() {
                return Err(RuleSetError::EmptyCode);
            }
            if protocol.action.is_empty() {
                return Err(RuleSetError::EmptyAction(protocol.code.clone()));
            }
            if !codes.insert(protocol.code.as_str()) {
                return Err(RuleSetError::DuplicateCode(protocol.code.clone()));
            }
        }

        let mut seen_edges = HashSet::new();
        let mut unique_triggers = Vec::with_capacity(triggers.len());
        for edge in triggers {
            let edge = TriggerEdge::new(&edge.keyword, &edge.code);
            if !keywords.contains(edge.keyword.as_str()) {
                return Err(RuleSetError::UnknownKeyword(edge.keyword));
            }
            if !codes.contains(edge.code.as_str()) {
                return Err(RuleSetError::UnknownCode(edge.code));
            }
            if seen_edges.insert(edge.clone()) {
                unique_triggers.push(edge);
            }
        }

        Ok(Self {
            hazards,
            protocols,
            triggers: unique_triggers,
        })
    }

    /// The industrial rule set the sentinel ships with: fire, smoke, roof
    /// damage, structural collapse and chemical spills.
    pub fn standard() -> Self {
        let hazards = vec![
            HazardRule::new("fire", Severity::Critical),
            HazardRule::new("smoke", Severity::High),
            HazardRule::new("roof", Severity::Severe),
            HazardRule::new("collapse", Severity::Catastrophic),
            HazardRule::new("spill", Severity::Moderate),
        ];
        let protocols = vec![
            Protocol::new("ACTIVATE_SPRINKLERS", "RED-FIRE"),
            Protocol::new("EVACUATE_SECTOR", "RED-EVAC"),
            Protocol::new("STRUCTURAL_LOCKDOWN", "BLACK-COLLAPSE"),
            Protocol::new("DEPLOY_HAZMAT", "AMBER-SPILL"),
        ];
        let triggers = vec![
            TriggerEdge::new("fire", "RED-FIRE"),
            TriggerEdge::new("smoke", "RED-EVAC"),
            TriggerEdge::new("roof", "BLACK-COLLAPSE"),
            TriggerEdge::new("collapse", "BLACK-COLLAPSE"),
            TriggerEdge::new("spill", "AMBER-SPILL"),
        ];
        // Constant data, checked by `standard_rules_are_valid` below.
        Self {
            hazards,
            protocols,
            triggers,
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, RuleSetError> {
        let file: RuleFile = serde_yaml::from_str(text)?;
        let hazards = file
            .hazards
            .into_iter()
            .map(|h| Ok(HazardRule::new(&h.keyword, h.category.parse()?)))
            .collect::<Result<Vec<_>, RuleSetError>>()?;
        Self::new(hazards, file.protocols, file.triggers)
    }

    pub fn from_yaml_path(path: impl AsRef<Path>) -> Result<Self, RuleSetError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn hazards(&self) -> &[HazardRule] {
        &self.hazards
    }

    pub fn protocols(&self) -> &[Protocol] {
        &self.protocols
    }

    pub fn triggers(&self) -> &[TriggerEdge] {
        &self.triggers
    }

    /// True when there are no hazards, so nothing could ever match.
    pub fn is_empty(&self) -> bool {
        self.hazards.is_empty()
    }
}

fn normalize_keyword(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}
