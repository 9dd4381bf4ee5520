// Checks that the rule store is populated and that a probe phrase reaches a protocol.

use cloud_sentinel::{RuleStore, SqliteRuleStore};
use sentinel_drone::bootstrap;
use std::env;

const DEFAULT_PROBE: &str = "significant roof damage detected";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = bootstrap()?;
    let store = SqliteRuleStore::open(&config.rules_db)?;

    println!("🔍 Rule store: {}", store.location());
    let keywords = store.list_hazard_keywords().await?;
    if keywords.is_empty() {
        anyhow::bail!("rule store has no hazards; run `load_rules` first");
    }
    println!("   Keywords: {}", keywords.join(", "));

    let args: Vec<String> = env::args().skip(1).collect();
    let probe = if args.is_empty() {
        DEFAULT_PROBE.to_string()
    } else {
        args.join(" ")
    };
    println!("\n🧪 Probe: \"{}\"", probe);

    let matches = store.find_keyword_matches(&probe.to_lowercase()).await?;
    if matches.is_empty() {
        println!("   ⚠️  No keyword matched; the probe would be observation-only.");
    }
    for m in &matches {
        println!("   ✅ '{}' -> {} ({})", m.keyword, m.action, m.code);
    }
    Ok(())
}
