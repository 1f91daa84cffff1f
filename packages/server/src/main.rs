use tracing_subscriber::{fmt, EnvFilter};

use server::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,server=debug,api=debug"))?;
    fmt().with_env_filter(filter).with_target(true).init();

    let settings = Settings::new()?;
    server::run(settings).await
}
