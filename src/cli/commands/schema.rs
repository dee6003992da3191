use clap::Subcommand;
use serde_json::json;
use std::path::PathBuf;

use crate::cli::OutputFormat;
use crate::schema::{ddl::catalog_ddl, Catalog};

#[derive(Subcommand)]
pub enum SchemaCommands {
    #[command(about = "List entities and their fields")]
    List {
        #[arg(long, help = "YAML catalog instead of the built-in one")]
        file: Option<PathBuf>,
    },

    #[command(about = "Print CREATE TABLE statements for the catalog")]
    Ddl {
        #[arg(long, help = "YAML catalog instead of the built-in one")]
        file: Option<PathBuf>,
    },
}

fn load(file: Option<PathBuf>) -> anyhow::Result<Catalog> {
    let catalog = match file {
        Some(path) => Catalog::from_yaml_file(path)?,
        None => Catalog::builtin(),
    };
    catalog.validate()?;
    Ok(catalog)
}

pub async fn handle(cmd: SchemaCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        SchemaCommands::List { file } => {
            let catalog = load(file)?;
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&catalog)?),
                OutputFormat::Text => {
                    for entity in &catalog.entities {
                        let fields: Vec<&str> = entity.fields.iter().map(|f| f.name.as_str()).collect();
                        println!("/{:<22} {:<28} {}", entity.name, entity.table, fields.join(", "));
                    }
                }
            }
            Ok(())
        }
        SchemaCommands::Ddl { file } => {
            let statements = catalog_ddl(&load(file)?);
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({ "statements": statements }))?),
                OutputFormat::Text => {
                    for statement in statements {
                        println!("{};\n", statement.trim_end_matches(';'));
                    }
                }
            }
            Ok(())
        }
    }
}
