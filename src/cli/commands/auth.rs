use anyhow::Context;
use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::client::ApiClient;
use crate::cli::config::{load_environment_config, save_environment_config};
use crate::cli::utils::{output_record, output_success};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Create a vendor or partner account")]
    Signup {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Full name")]
        name: String,
        #[arg(long, help = "Account role: vendor or partner")]
        role: String,
        #[arg(long, env = "REZOLLO_PASSWORD", help = "Password")]
        password: String,
    },

    #[command(about = "Login to server")]
    Login {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, env = "REZOLLO_PASSWORD", help = "Password")]
        password: String,
    },

    #[command(about = "Show current account and profile")]
    Whoami,

    #[command(about = "Refresh authentication token")]
    Refresh,

    #[command(about = "Logout from server")]
    Logout,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = ApiClient::from_env()?;

    match cmd {
        AuthCommands::Signup { email, name, role, password } => {
            let data = client
                .post(
                    "/auth/signup",
                    &json!({ "email": email, "password": password, "full_name": name, "role": role }),
                )
                .await?;
            store_session(&data)?;
            output_success(&output_format, &format!("Signed up as {}", email), Some(account_of(&data)))
        }
        AuthCommands::Login { email, password } => {
            let data = client
                .post("/auth/login", &json!({ "email": email, "password": password }))
                .await?;
            store_session(&data)?;
            output_success(&output_format, &format!("Logged in as {}", email), Some(account_of(&data)))
        }
        AuthCommands::Whoami => {
            let me = client.get("/api/auth/whoami").await?;
            output_record(&output_format, &me)
        }
        AuthCommands::Refresh => {
            let data = client.post("/auth/refresh", &json!({})).await?;
            store_session(&data)?;
            output_success(&output_format, "Token refreshed", None)
        }
        AuthCommands::Logout => {
            client.post("/api/auth/logout", &json!({})).await?;
            let mut config = load_environment_config()?;
            config.clear_session();
            save_environment_config(&config)?;
            output_success(&output_format, "Logged out", None)
        }
    }
}

fn account_of(data: &Value) -> Value {
    data.get("account").cloned().unwrap_or(Value::Null)
}

fn store_session(data: &Value) -> anyhow::Result<()> {
    let token = data["token"].as_str().context("response carried no token")?;
    let account = &data["account"];
    let mut config = load_environment_config()?;
    config.set_session(
        token.to_string(),
        account["email"].as_str().unwrap_or_default().to_string(),
        account["role"].as_str().unwrap_or_default().to_string(),
    );
    save_environment_config(&config)
}
