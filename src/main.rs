use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use outreach_core::{settings_from_env, RecordServices};

/// Main entry point for the outreach service
///
/// Opens (and migrates) the SQLite database, loads the division dataset and serves the REST
/// API. CORS is permissive.
///
/// # Environment Variables
/// - `OUTREACH_CONFIG`: optional YAML config file
/// - `OUTREACH_DATABASE_PATH`: SQLite file (default: "outreach.db")
/// - `OUTREACH_DIVISIONS_FILE`: division dataset override (default: embedded dataset)
/// - `OUTREACH_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, storage setup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("outreach=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = settings_from_env()?;
    let services = RecordServices::open(&settings.core)?;

    tracing::info!("++ Starting outreach REST on {}", settings.rest_addr);

    let app = api_rest::router(services);
    let listener = tokio::net::TcpListener::bind(settings.rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
