use clap::Subcommand;
use serde_json::json;
use std::path::PathBuf;

use crate::cli::config::load_environment_config;
use crate::cli::utils::{output_record, output_records, output_success, parse_field_pairs, read_json_input};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum DataCommands {
    #[command(about = "List records of a resource")]
    List {
        #[arg(help = "Resource name, e.g. contacts")]
        resource: String,
        #[arg(long, help = "Page size")]
        limit: Option<i64>,
        #[arg(long, default_value_t = 0, help = "Rows to skip (with --limit)")]
        offset: i64,
    },

    #[command(about = "Show one record")]
    Get {
        #[arg(help = "Resource name")]
        resource: String,
        #[arg(help = "Record id")]
        id: i64,
    },

    #[command(about = "Create a record from --data or stdin")]
    Create {
        #[arg(help = "Resource name")]
        resource: String,
        #[arg(long, help = "JSON object (reads stdin when omitted)")]
        data: Option<String>,
    },

    #[command(about = "Replace a record from --data or stdin")]
    Update {
        #[arg(help = "Resource name")]
        resource: String,
        #[arg(help = "Record id")]
        id: i64,
        #[arg(long, help = "JSON object (reads stdin when omitted)")]
        data: Option<String>,
    },

    #[command(about = "Delete a record")]
    Delete {
        #[arg(help = "Resource name")]
        resource: String,
        #[arg(help = "Record id")]
        id: i64,
    },

    #[command(about = "Create a record with a file attachment (quotes, payments)")]
    Upload {
        #[arg(help = "Resource name")]
        resource: String,
        #[arg(help = "File to attach")]
        file: PathBuf,
        #[arg(long = "field", help = "Form field as key=value, repeatable")]
        fields: Vec<String>,
    },
}

pub async fn handle(cmd: DataCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = load_environment_config()?.client()?;

    match cmd {
        DataCommands::List { resource, limit, offset } => match limit {
            Some(limit) => {
                let page = client.list_page(&resource, limit, offset).await?;
                output_records(&output_format, &page.items, &format!("No {} found", resource))?;
                if let (OutputFormat::Text, Some(total)) = (&output_format, page.total) {
                    println!("({} of {} total)", page.items.len(), total);
                }
                Ok(())
            }
            None => {
                let records = client.list(&resource).await?;
                output_records(&output_format, &records, &format!("No {} found", resource))
            }
        },
        DataCommands::Get { resource, id } => {
            let record = client.get(&resource, id).await?;
            output_record(&output_format, &record)
        }
        DataCommands::Create { resource, data } => {
            let body = read_json_input(data)?;
            let created = client.create(&resource, &body).await?;
            output_success(&output_format, &format!("Created {} record", resource), Some(created))
        }
        DataCommands::Update { resource, id, data } => {
            let body = read_json_input(data)?;
            client.update(&resource, id, &body).await?;
            output_success(&output_format, &format!("Updated {} {}", resource, id), Some(json!({ "id": id })))
        }
        DataCommands::Delete { resource, id } => {
            client.delete(&resource, id).await?;
            output_success(&output_format, &format!("Deleted {} {}", resource, id), Some(json!({ "id": id })))
        }
        DataCommands::Upload { resource, file, fields } => {
            let fields = parse_field_pairs(&fields)?;
            let body = tokio::fs::read(&file).await?;
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload")
                .to_string();
            let created = client.create_with_attachment(&resource, &fields, &file_name, body).await?;
            output_success(&output_format, &format!("Created {} record with attachment", resource), Some(created))
        }
    }
}
