use anyhow::Context;
use bookreview_app::Application;
use bookreview_kernel::settings::Settings;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bookreview", version, about = "Book review service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print the effective configuration with secrets redacted
    Config,
    /// Print the merged OpenAPI document
    Openapi,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().context("failed to load settings")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            bookreview_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "bookreview serve");
            Application::connect(settings).await?.run().await
        }
        Command::Config => print_json(&settings.redacted()),
        Command::Openapi => {
            let mut settings = settings;
            // Routes and schemas do not depend on the signing key.
            if settings.auth.jwt_secret.trim().is_empty() {
                settings.auth.jwt_secret = "openapi-export".to_string();
            }
            let app = Application::new(settings)?;
            print_json(&bookreview_http::router::collect_openapi(app.registry()))
        }
    }
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to render JSON")?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["bookreview"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["bookreview", "openapi"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Openapi)));
    }
}
