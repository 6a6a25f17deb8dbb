//! `vitrine migrate` - create the store tables.

use anyhow::Context;
use vitrine_core::VitrineConfig;
use vitrine_store_pg::{connect, ensure_schema};

pub async fn run(config: &VitrineConfig) -> anyhow::Result<()> {
    let pool = connect(&config.store)
        .await
        .context("Failed to connect to the public dashboard store")?;
    ensure_schema(&pool).await?;
    println!("✔ Schema is up to date");
    Ok(())
}
