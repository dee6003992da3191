use clap::Subcommand;
use serde_json::json;

use crate::cli::config::load_environment_config;
use crate::cli::utils::{output_records, output_success};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum UsersCommands {
    #[command(about = "List principals, newest first")]
    List,

    #[command(about = "Delete a principal")]
    Delete {
        #[arg(help = "Principal id")]
        id: i64,
    },
}

pub async fn handle(cmd: UsersCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = load_environment_config()?.client()?;

    match cmd {
        UsersCommands::List => {
            let users = client.list_users().await?;
            let records = users.iter().map(serde_json::to_value).collect::<Result<Vec<_>, _>>()?;
            output_records(&output_format, &records, "No users registered")
        }
        UsersCommands::Delete { id } => {
            client.delete_user(id).await?;
            output_success(&output_format, &format!("User {} deleted", id), Some(json!({ "id": id })))
        }
    }
}
