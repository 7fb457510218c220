use std::{sync::Arc, time::Duration};

use mongo_quiesce::{quiesce, CommandDiscovery, HttpAdminConnector, QuiesceOptions};
use tracing::subscriber::set_global_default;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    // Address of the command gateway fronting the seed member, not the mongod port itself.
    let seed: String =
        std::env::var("QUIESCE_SEED").unwrap_or_else(|_| "localhost:27017".to_string());
    let timeout_secs = std::env::var("QUIESCE_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(60);

    let options = QuiesceOptions::builder()
        .set_command_timeout(Duration::from_secs(timeout_secs))
        .set_require_https(std::env::var("QUIESCE_SCHEME").as_deref() == Ok("https"))
        .build()?;
    let connector = Arc::new(HttpAdminConnector::new(&options)?);
    let discovery = CommandDiscovery::new(connector.clone(), seed, &options);

    let report = quiesce(&discovery, connector.as_ref(), &options).await?;
    for failure in report.oplog().failures().chain(report.fsync().failures()) {
        if let Err(e) = &failure.result {
            tracing::warn!("{:?} `{}` failed: {}", failure.kind, failure.target, e);
        }
    }

    if !report.success() {
        anyhow::bail!("Deployment did not quiesce");
    }
    println!("Quiesced {:#?}", report.topology());

    Ok(())
}

fn setup_tracing() {
    // Redirect all `log`'s events to the subscriber
    LogTracer::init().expect("Failed to set logger");
    // Set up tracing
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let formatting_layer = BunyanFormattingLayer::new("mongo-quiesce-demo".into(), std::io::stdout);
    let subscriber = Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    set_global_default(subscriber).expect("Failed to set subscriber");
}
