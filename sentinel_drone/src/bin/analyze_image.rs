// One-shot analysis of a single still image, without the polling loop.

use cloud_sentinel::{Frame, GeminiGateway, HazardMatcher, SqliteRuleStore, assess};
use sentinel_drone::{bootstrap, console};
use std::env;
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = bootstrap()?;
    let Some(path) = env::args().nth(1) else {
        anyhow::bail!("usage: analyze_image <image_file>");
    };
    config.require_api_key()?;

    let frame = Frame::from_image_path(&path, 0)?;
    let gateway = GeminiGateway::from_config(&config)?;
    let matcher = HazardMatcher::new(Arc::new(SqliteRuleStore::open(&config.rules_db)?));

    let cycle = assess(&gateway, &matcher, &frame, 1).await;
    println!("{}", console::render_cycle(&cycle));
    Ok(())
}
