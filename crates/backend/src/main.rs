pub mod dashboards;
pub mod domain;
pub mod shared;
pub mod system;
pub mod usecases;

use anyhow::Context;

use crate::shared::config::load_config;
use crate::shared::docstore;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    system::tracing::initialize()?;

    let config = load_config().context("cannot load configuration")?;
    tracing::info!(
        "Store: {} (database '{}', collection '{}')",
        config.store.url,
        config.store.database,
        config.store.collection
    );

    let store = docstore::open(&config.store)
        .await
        .with_context(|| format!("cannot open store {}", config.store.url))?;

    let report = usecases::u500_sales_workflow::run(store.as_ref(), &config.pipeline).await?;
    tracing::info!(
        "Done: {} seeded, {} charts, {} discounted, {} exported",
        report.seeded,
        report.charts,
        report.discount.modified,
        report.exported
    );
    Ok(())
}
