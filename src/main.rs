mod cli;

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Commands};
use geo_sheets::compat;
use geo_sheets::config::{load_config, Config};
use geo_sheets::geocode::{self, Geocoder, SearchQuery};
use geo_sheets::sheets;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    let bindings = compat::init(config.compat.runtime_major)?;
    log::debug!("compat bindings resolved to {:?}", bindings.generation);

    match cli.command {
        Commands::Sheets { ref workbook } => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            sheets::print_workbook(workbook, &mut out)?;
        }
        Commands::Geocode {
            address,
            format,
            limit,
            params,
        } => {
            geocode(&config, address, format, limit, params)?;
        }
    }

    Ok(())
}

fn geocode(
    config: &Config,
    address: String,
    format: Option<String>,
    limit: Option<u32>,
    params: Vec<(String, String)>,
) -> Result<()> {
    let geocoder =
        Geocoder::from_config(config.geocoder.clone()).context("Failed to set up geocoder")?;
    geocode::install_shared_geocoder(geocoder)?;

    let mut query = SearchQuery::with_defaults(address, &config.geocoder);
    if let Some(format) = format {
        query = query.format(format);
    }
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    for (name, value) in params {
        query = query.param(name, value);
    }

    let results = geocode::nominatim_search(&query)?;

    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &results)?;
    writeln!(out)?;
    Ok(())
}
