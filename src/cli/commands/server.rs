use clap::Subcommand;
use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::config::{load_environment_config, save_environment_config};
use crate::cli::utils::{output_record, output_success};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Switch to server (persistent selection) or show current server")]
    Use {
        #[arg(help = "Server base URL, e.g. http://localhost:3000")]
        url: Option<String>,
    },

    #[command(about = "Show server information from API root endpoint")]
    Info,

    #[command(about = "Check server health status from API /health endpoint")]
    Health,
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Use { url: Some(url) } => {
            let parsed = url::Url::parse(&url).map_err(|e| anyhow::anyhow!("Invalid server URL '{}': {}", url, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("Server URL must use http or https");
            }

            let mut config = load_environment_config()?;
            let url = url.trim_end_matches('/').to_string();
            if config.server_url.as_deref() != Some(url.as_str()) {
                // A token from another server is useless here
                config.clear_session();
            }
            config.server_url = Some(url.clone());
            save_environment_config(&config)?;

            output_success(
                &output_format,
                &format!("Switched to server {}", url),
                Some(json!({ "server_url": url })),
            )
        }
        ServerCommands::Use { url: None } => {
            let config = load_environment_config()?;
            output_record(
                &output_format,
                &json!({
                    "server_url": config.server_url(),
                    "email": config.email,
                    "role": config.role,
                }),
            )
        }
        ServerCommands::Info => {
            let info = ApiClient::from_env()?.get("/").await?;
            output_record(&output_format, &info)
        }
        ServerCommands::Health => {
            let client = ApiClient::from_env()?;
            let health = client.get("/health").await?;
            output_success(
                &output_format,
                &format!("{} is healthy", client.base_url()),
                Some(health),
            )
        }
    }
}
