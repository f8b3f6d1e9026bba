use anyhow::Context;
use bookreview_app::Application;
use bookreview_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;
    bookreview_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        port = settings.server.port,
        "bookreview bootstrap starting"
    );

    Application::connect(settings).await?.run().await
}
