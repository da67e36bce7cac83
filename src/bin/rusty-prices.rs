//! rusty-prices CLI - inspect and feed the BTC fiat price history
//!
//! ## Example Usage
//!
//! ```bash
//! # Create the database
//! rusty-prices init
//!
//! # Store one observation
//! rusty-prices save --time 1700000000 --usd 36500 --eur 33600 --jpy 5480000
//!
//! # Load a CSV export
//! rusty-prices import prices.csv
//!
//! # Last observation before a time, with current exchange rates
//! rusty-prices nearest 1650000000
//! ```

use anyhow::{bail, Context};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use colored::Colorize;
use rusty_prices::import::{import_csv, parse_time};
use rusty_prices::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use std::process;

/// rusty-prices: BTC fiat price history
#[derive(Parser)]
#[command(name = "rusty-prices")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "BTC fiat price history with derived exchange rates", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and prices table
    Init,

    /// Store one observation (omitted currencies are missing)
    Save {
        /// Unix seconds or YYYY-MM-DD
        #[arg(short = 't', long)]
        time: String,
        #[arg(long, default_value_t = MISSING_PRICE, allow_hyphen_values = true)]
        usd: i64,
        #[arg(long, default_value_t = MISSING_PRICE, allow_hyphen_values = true)]
        eur: i64,
        #[arg(long, default_value_t = MISSING_PRICE, allow_hyphen_values = true)]
        gbp: i64,
        #[arg(long, default_value_t = MISSING_PRICE, allow_hyphen_values = true)]
        cad: i64,
        #[arg(long, default_value_t = MISSING_PRICE, allow_hyphen_values = true)]
        chf: i64,
        #[arg(long, default_value_t = MISSING_PRICE, allow_hyphen_values = true)]
        aud: i64,
        #[arg(long, default_value_t = MISSING_PRICE, allow_hyphen_values = true)]
        jpy: i64,
    },

    /// Import observations from CSV
    Import {
        #[arg(value_name = "CSV_FILE")]
        file: PathBuf,
    },

    /// Oldest observation time with a USD price
    Oldest,

    /// Latest observation time with a USD price
    Latest,

    /// Id of the latest observation with a USD price
    LatestId,

    /// List observation times
    Times {
        /// Include ids and USD prices (and rows without USD)
        #[arg(long)]
        with_ids: bool,
    },

    /// Prices of the latest observation
    Rates,

    /// Last observation before a time, with current exchange rates
    Nearest {
        /// Unix seconds or YYYY-MM-DD
        #[arg(value_name = "TIME")]
        time: Option<String>,
    },

    /// Every observation, newest first, with exchange rates
    History,

    /// Show store information
    Info,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = StoreConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    if cli.verbose {
        println!(
            "{} v{}",
            "rusty-prices".cyan().bold(),
            env!("CARGO_PKG_VERSION")
        );
        println!(
            "Database: {}",
            config.database_path.display().to_string().dimmed()
        );
    }

    let store = PriceStore::open(&config)
        .with_context(|| format!("opening {}", config.database_path.display()))?;

    match cli.command {
        Commands::Init => {
            println!("{} {}", "Ready:".green().bold(), config.database_path.display());
        }

        Commands::Save {
            time,
            usd,
            eur,
            gbp,
            cad,
            chf,
            aud,
            jpy,
        } => {
            let time = parse_time_arg(&time)?;
            let prices = FiatPrices {
                usd,
                eur,
                gbp,
                cad,
                chf,
                aud,
                jpy,
            };
            if store.save(time, &prices)? {
                println!("{} observation at {}", "Stored".green().bold(), format_time(time));
            } else {
                println!("{} no USD price, nothing stored", "Skipped:".yellow());
            }
        }

        Commands::Import { file } => {
            let summary = import_csv(&store, &file)?;
            println!(
                "{} {} rows, {} skipped",
                "Imported".green().bold(),
                summary.stored,
                summary.skipped
            );
        }

        Commands::Oldest => print_time(store.oldest_observation_time()?),

        Commands::Latest => print_time(store.latest_observation_time()?),

        Commands::LatestId => match store.latest_observation_id()? {
            Some(id) => println!("{}", id),
            None => println!("{}", "none".dimmed()),
        },

        Commands::Times { with_ids } => {
            if with_ids {
                print_json(&store.observation_times_and_ids()?)?;
            } else {
                print_json(&store.observation_times()?)?;
            }
        }

        Commands::Rates => print_json(&store.latest_rates()?)?,

        Commands::Nearest { time } => {
            let timestamp = time.as_deref().map(parse_time_arg).transpose()?;
            match store.nearest_prior_observation(timestamp) {
                Some(conversion) => print_json(&conversion)?,
                None => bail!("could not load nearest historical price"),
            }
        }

        Commands::History => match store.historical_observations() {
            Some(conversion) => print_json(&conversion)?,
            None => bail!("could not load historical prices"),
        },

        Commands::Info => show_info(&store, &config)?,
    }

    Ok(())
}

fn parse_time_arg(value: &str) -> anyhow::Result<i64> {
    parse_time(value).with_context(|| format!("invalid time '{}'", value))
}

fn format_time(time: i64) -> String {
    DateTime::from_timestamp(time, 0)
        .map(|dt| format!("{} ({})", time, dt.format("%Y-%m-%d %H:%M:%S UTC")))
        .unwrap_or_else(|| time.to_string())
}

fn print_time(time: i64) {
    if time == 0 {
        println!("{}", "no observations".dimmed());
    } else {
        println!("{}", format_time(time));
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn show_info(store: &PriceStore, config: &StoreConfig) -> anyhow::Result<()> {
    println!("{}", "Price store".cyan().bold());
    println!("  Database:       {}", config.database_path.display());
    println!("  Pool size:      {}", config.pool_size);
    println!("  Missing policy: {:?}", store.missing_policy());
    println!("  Rows:           {}", store.count()?);

    let oldest = store.oldest_observation_time()?;
    if oldest != 0 {
        println!("  Oldest:         {}", format_time(oldest));
        println!("  Latest:         {}", format_time(store.latest_observation_time()?));
    }

    let rates = derive_exchange_rates(&store.latest_rates()?);
    if rates.is_defined() {
        println!("{}", "Exchange rates (per USD)".cyan().bold());
        for currency in Currency::FOREIGN {
            println!(
                "  {} {:>10.2} {}",
                currency,
                rates.rate(currency),
                currency.symbol()
            );
        }
    }
    Ok(())
}
