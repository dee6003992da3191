use clap::Subcommand;
use serde_json::json;

use crate::cli::config::load_environment_config;
use crate::cli::utils::{output_records, output_success};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum PersonasCommands {
    #[command(about = "Link personas to a campaign (existing links are kept)")]
    Link {
        #[arg(help = "Campaign id")]
        campaign_id: i64,
        #[arg(required = true, help = "Persona ids")]
        persona_ids: Vec<i64>,
    },

    #[command(about = "List personas linked to a campaign")]
    List {
        #[arg(help = "Campaign id")]
        campaign_id: i64,
    },
}

pub async fn handle(cmd: PersonasCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = load_environment_config()?.client()?;

    match cmd {
        PersonasCommands::Link { campaign_id, persona_ids } => {
            let linked = client.link_personas(campaign_id, &persona_ids).await?;
            output_success(
                &output_format,
                &format!("Linked {} new persona(s) to campaign {}", linked, campaign_id),
                Some(json!({ "linked": linked })),
            )
        }
        PersonasCommands::List { campaign_id } => {
            let personas = client.linked_personas(campaign_id).await?;
            output_records(&output_format, &personas, "No personas linked")
        }
    }
}
