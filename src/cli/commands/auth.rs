use clap::Subcommand;
use serde_json::json;

use crate::auth::generate_api_key;
use crate::cli::config::{load_environment_config, save_environment_config};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::{NewPrincipal, Role};

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Register a principal and store its API key")]
    Register {
        #[arg(help = "Display name")]
        name: String,
        #[arg(help = "Email")]
        email: String,
        #[arg(long, default_value = "agent", help = "admin, agent or viewer")]
        role: Role,
        #[arg(long, help = "API key to register (generated when omitted)")]
        api_key: Option<String>,
    },

    #[command(about = "Store an existing API key")]
    Use {
        #[arg(help = "API key")]
        api_key: String,
    },

    #[command(about = "Show the stored API key")]
    Show,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut env = load_environment_config()?;

    match cmd {
        AuthCommands::Register { name, email, role, api_key } => {
            let api_key = api_key.unwrap_or_else(generate_api_key);
            let client = env.client()?;
            let id = client
                .register(&NewPrincipal { name, email, role, api_key: api_key.clone() })
                .await?;

            env.api_key = Some(api_key.clone());
            save_environment_config(&env)?;
            output_success(
                &output_format,
                &format!("Registered principal {} ({}); API key stored", id, role),
                Some(json!({ "id": id, "api_key": api_key })),
            )
        }
        AuthCommands::Use { api_key } => {
            env.api_key = Some(api_key);
            save_environment_config(&env)?;
            output_success(&output_format, "API key stored", None)
        }
        AuthCommands::Show => {
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({ "api_key": env.api_key }))?),
                OutputFormat::Text => match &env.api_key {
                    Some(key) => println!("API key: {}", key),
                    None => println!("No API key stored"),
                },
            }
            Ok(())
        }
    }
}
