use cloud_sentinel::{GeminiGateway, HazardMatcher, RuleStore, Sentinel, SentinelBus, SqliteRuleStore};
use sentinel_drone::{bootstrap, console, video};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // --- 1. Configuration & Argument Parsing ---
    let config = bootstrap()?;
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        println!("Usage: sentinel_drone [video_file | stills_directory]");
        return Ok(());
    }
    let feed = args.get(1).map(PathBuf::from).unwrap_or_else(|| config.feed.clone());
    config.require_api_key()?;

    // --- 2. Rule Store ---
    let store = SqliteRuleStore::open(&config.rules_db)?;
    match store.list_hazard_keywords().await {
        Ok(keywords) if keywords.is_empty() => {
            warn!("Rule store is empty; run `load_rules` first. Every cycle will be observation-only.")
        }
        Ok(keywords) => info!("🧠 {} hazard keywords loaded: {:?}", keywords.len(), keywords),
        Err(e) => warn!("Rule store check failed, continuing degraded: {}", e),
    }

    // --- 3. Gateway & Feed ---
    let gateway = GeminiGateway::from_config(&config)?;
    info!("☁️  Vision model: {}", gateway.model());
    let source = video::open_feed(&feed)?;

    // --- 4. Presentation & Interrupt ---
    let bus = SentinelBus::new(256);
    let printer = tokio::spawn(console::print_events(bus.subscribe()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing current cycle...");
            let _ = shutdown_tx.send(true);
        }
    });

    // --- 5. Main Polling Loop ---
    let summary = Sentinel::new(source, Arc::new(gateway), HazardMatcher::new(Arc::new(store)), &config)
        .with_bus(bus)
        .run(shutdown_rx)
        .await;

    printer.await?;
    info!("Run finished: {:?}", summary.stop);
    Ok(())
}
