// Lists the models the configured API key can call.

use cloud_sentinel::GeminiGateway;
use sentinel_drone::bootstrap;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = bootstrap()?;
    config.require_api_key()?;

    let gateway = GeminiGateway::from_config(&config)?;
    let models = gateway.list_models().await?;
    for name in &models {
        println!("FOUND: {}", name);
    }
    println!("{} models available (configured: {})", models.len(), gateway.model());
    Ok(())
}
