use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "geo-sheets")]
#[command(about = "Cached Nominatim lookups and workbook-to-CSV inspection")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional JSON config file merged over the builtin defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print every sheet of a workbook as CSV
    Sheets {
        /// Path to the workbook (xlsx, xlsm, xlsb, xls or ods)
        workbook: PathBuf,
    },

    /// Search an address with Nominatim and print the JSON result
    Geocode {
        /// Free-form address to search for
        address: String,

        #[arg(short, long)]
        format: Option<String>,

        #[arg(short, long)]
        limit: Option<u32>,

        /// Extra search parameter, repeatable (e.g. countrycodes=de)
        #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}
