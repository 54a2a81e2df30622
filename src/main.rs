use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use env_logger::Env;

use crate::config::Config;

mod bond;
mod chart;
mod clean;
mod config;
mod frame;
mod market;
mod montecarlo;
mod portfolio;
mod prompt;
mod util;
mod validate;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// Config file path
    #[clap(long)]
    config: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clean a transactions CSV file
    Clean {
        /// Raw transactions CSV
        input: PathBuf,
        /// Where the cleaned CSV is written
        output: PathBuf,
    },

    /// Plot line and candlestick charts for a ticker
    Chart {
        /// Ticker symbol
        #[clap(long, default_value = "AAPL")]
        ticker: String,
        /// Start date YYYY-MM-DD
        #[clap(long, default_value = "2024-01-01")]
        start: String,
        /// End date YYYY-MM-DD, defaults to today
        #[clap(long)]
        end: Option<String>,
        /// CSV with Date,Open,High,Low,Close,Volume instead of downloading
        #[clap(long)]
        csv: Option<PathBuf>,
        /// Output directory for images
        #[clap(long)]
        outdir: Option<PathBuf>,
    },

    /// Simulate random portfolios and plot the risk distribution
    Simulate {
        /// Number of random portfolios
        #[clap(long, default_value_t = 1000)]
        portfolios: usize,
        /// RNG seed
        #[clap(long, default_value_t = 42)]
        seed: u64,
        /// Output directory for images
        #[clap(long)]
        outdir: Option<PathBuf>,
    },

    /// Interactive portfolio statistics from entered return series
    Portfolio {
        /// Daily risk-free rate for Sharpe ratios
        #[clap(long)]
        risk_free: Option<f64>,
    },

    /// Price a fixed-coupon bond
    Bond {
        /// Face value
        #[clap(long)]
        face: Option<f64>,
        /// Coupon rate in percent
        #[clap(long)]
        coupon: Option<f64>,
        /// Years to maturity
        #[clap(long)]
        years: Option<f64>,
        /// Coupon payments per year
        #[clap(long)]
        frequency: Option<u32>,
        /// Discount rate in percent
        #[clap(long)]
        discount: Option<f64>,
    },
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli: Cli = Cli::parse();
    if let Err(err) = run(cli) {
        println!("{}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(file) => Config::load_from_file(file)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Clean { input, output } => clean::run_clean(&input, &output, &config),
        Command::Chart { ticker, start, end, csv, outdir } => chart::run_chart(
            &ticker,
            &start,
            end.as_deref(),
            csv.as_deref(),
            &chart_dir(outdir, &config),
            &config,
        ),
        Command::Simulate { portfolios, seed, outdir } => {
            montecarlo::run_simulate(portfolios, seed, &chart_dir(outdir, &config))
        }
        Command::Portfolio { risk_free } => {
            portfolio::run_portfolio(risk_free.unwrap_or(config.risk_free_rate))
        }
        Command::Bond { face, coupon, years, frequency, discount } => {
            bond::run_bond(face, coupon, years, frequency, discount)
        }
    }
}

fn chart_dir(outdir: Option<PathBuf>, config: &Config) -> PathBuf {
    outdir.unwrap_or_else(|| Path::new(&config.chart_dir).to_path_buf())
}
