use clap::Subcommand;
use serde_json::json;

use crate::cli::config::{load_environment_config, ping_server, save_environment_config, ServerStatus};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::client::CrmClient;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Select the server used by every other command")]
    Use {
        #[arg(help = "Server URL, e.g. http://localhost:5000")]
        url: String,
    },

    #[command(about = "Show the selected server")]
    Show,

    #[command(about = "Check the selected server via GET /status")]
    Ping,
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut env = load_environment_config()?;

    match cmd {
        ServerCommands::Use { url } => {
            let parsed = url::Url::parse(&url).map_err(|e| anyhow::anyhow!("Invalid server URL '{}': {}", url, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("Server URL must use http or https");
            }
            env.server_url = Some(url.trim_end_matches('/').to_string());
            env.status = ServerStatus::Unknown;
            save_environment_config(&env)?;
            output_success(&output_format, &format!("Using server {}", url), Some(json!({ "server_url": env.server_url })))
        }
        ServerCommands::Show => {
            let details = json!({
                "server_url": env.server_url,
                "status": env.status,
                "last_ping": env.last_ping,
                "api_key_set": env.api_key.is_some(),
            });
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&details)?),
                OutputFormat::Text => match &env.server_url {
                    Some(url) => println!("Current server: {} ({:?})", url, env.status),
                    None => println!("No current server set"),
                },
            }
            Ok(())
        }
        ServerCommands::Ping => {
            let url = env
                .server_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("No server selected; run `crm server use <url>` first"))?;
            let status = ping_server(&CrmClient::new(url.clone())).await;
            env.update_ping(status);
            save_environment_config(&env)?;

            if status != ServerStatus::Up {
                anyhow::bail!("Server {} is not responding", url);
            }
            output_success(&output_format, &format!("Server {} is up", url), Some(json!({ "status": status })))
        }
    }
}
