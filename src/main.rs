use moodboard::config::RelayConfig;
use moodboard::relay;
use moodboard::store::MemoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "failed to read .env"),
    }

    let config = RelayConfig::from_env();
    relay::serve(&config, MemoryStore::new()).await?;
    Ok(())
}
