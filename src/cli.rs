use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use crate::commands;
use crate::core::features::unit_converter::Category;
use crate::core::history::ConversionHistory;
use crate::shared::error::AppResult;
use crate::shared::settings::AppSettings;
use crate::shared::types::ConvertUnitsRequest;

#[derive(Parser)]
#[command(name = "unit-converter")]
#[command(author, version, about = "Convert values between units and keep a history of conversions")]
#[command(propagate_version = true)]
pub struct Cli {
    /// History file (defaults to the configured path, `conversion_history.csv`)
    #[arg(long, global = true, env = "UNIT_CONVERTER_HISTORY")]
    pub history: Option<PathBuf>,

    /// Settings file (defaults to the per-user config directory)
    #[arg(long, global = true, env = "UNIT_CONVERTER_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Print responses as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a value and record it in the history
    Convert {
        /// Category (e.g., Length, "Data Storage", data-storage)
        category: String,

        /// Value to convert (must not be negative)
        #[arg(allow_negative_numbers = true)]
        value: f64,

        /// Source unit (e.g., Meter)
        from: String,

        /// Target unit (e.g., Kilometer)
        to: String,
    },

    /// Convert a free-text query such as "5 km to mi"
    #[command(alias = "q")]
    Query {
        /// Query text; quoting is optional
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        text: Vec<String>,
    },

    /// Show the most recent conversions
    Recent {
        /// How many records to show (defaults to the configured limit)
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// List categories and their units
    Units {
        /// Only list this category
        category: Option<String>,
    },

    /// Write a copy of the full history to a file
    Export {
        /// Destination file
        dest: PathBuf,
    },
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run one command against `history`.
pub fn execute(command: Commands, json: bool, history: &ConversionHistory, settings: &AppSettings) -> AppResult<()> {
    match command {
        Commands::Convert { category, value, from, to } => {
            let response = commands::convert_units_command(
                history,
                ConvertUnitsRequest {
                    category,
                    amount: value,
                    from_unit: from,
                    to_unit: to,
                },
            )?;
            if json {
                print_json(&response)?;
            } else {
                println!("Result: {} {}", response.formatted_result, response.to_unit);
            }
        }
        Commands::Query { text } => {
            let response = commands::convert_query_command(history, &text.join(" "))?;
            if json {
                print_json(&response)?;
            } else {
                println!(
                    "{} {} = {} {}",
                    response.amount, response.from_unit, response.formatted_result, response.to_unit
                );
            }
        }
        Commands::Recent { limit } => {
            let limit = limit.unwrap_or(settings.history.recent_limit);
            let recent = commands::get_recent_conversions(history, limit)?;
            if json {
                print_json(&recent)?;
            } else if recent.items.is_empty() {
                println!("No history available.");
            } else {
                println!("Recent Conversions ({} of {})", recent.items.len(), recent.total);
                for record in &recent.items {
                    println!("🔹 {}", record);
                }
            }
        }
        Commands::Units { category } => {
            let categories = match category {
                Some(name) => vec![name.parse::<Category>()?],
                None => Category::ALL.to_vec(),
            };
            if json {
                let units: Vec<_> = commands::get_all_units_command()
                    .units
                    .into_iter()
                    .filter(|unit| categories.iter().any(|c| c.label() == unit.category))
                    .collect();
                print_json(&units)?;
            } else {
                for category in categories {
                    println!("{}: {}", category, category.units().join(", "));
                }
            }
        }
        Commands::Export { dest } => {
            let response = commands::export_history_command(history, &dest)?;
            if json {
                print_json(&response)?;
            } else {
                println!("Exported {} records to {}", response.records, response.path);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_convert_with_negative_value() {
        let cli = Cli::try_parse_from(["unit-converter", "convert", "Length", "-5", "Meter", "Kilometer"]).unwrap();
        match cli.command {
            Commands::Convert { value, .. } => assert_eq!(value, -5.0),
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_parse_unquoted_query() {
        let cli = Cli::try_parse_from(["unit-converter", "--json", "query", "5", "km", "to", "mi"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Query { text } => assert_eq!(text.join(" "), "5 km to mi"),
            _ => panic!("expected query"),
        }
    }

    #[test]
    fn test_execute_records_conversion() {
        let history = ConversionHistory::in_memory();
        let settings = AppSettings::default();
        let command = Commands::Convert {
            category: "Weight".to_string(),
            value: 2.0,
            from: "Pound".to_string(),
            to: "Ounce".to_string(),
        };

        execute(command, false, &history, &settings).unwrap();
        assert_eq!(history.load_all().unwrap()[0].result, 32.0);
    }
}
