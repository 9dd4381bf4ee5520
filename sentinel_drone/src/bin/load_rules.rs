// Wipes the rule store and loads a rule set: the bundled industrial set, or a YAML file.

use cloud_sentinel::{RuleSet, RuleStore, SqliteRuleStore};
use sentinel_drone::bootstrap;
use std::env;
use tracing::{info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = bootstrap()?;

    let rules = match env::args().nth(1) {
        Some(path) => {
            info!("Reading rule set from {}", path);
            RuleSet::from_yaml_path(&path)?
        }
        None => RuleSet::standard(),
    };

    if rules.is_empty() {
        warn!("Rule set has no hazards; the store will be left empty.");
    }

    let store = SqliteRuleStore::open(&config.rules_db)?;
    let summary = store.reset_and_load(&rules).await?;

    println!("🧠 Rule store: {}", store.location());
    println!(
        "✅ Loaded {} hazards, {} protocols, {} triggers",
        summary.hazards, summary.protocols, summary.triggers
    );
    Ok(())
}
