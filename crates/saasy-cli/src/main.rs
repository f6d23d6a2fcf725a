//! `saasy`: ARR reports from a file of subscription contracts.
//!
//! # Usage
//!
//! ```text
//! saasy events contracts.csv --customer acme
//! saasy timeline contracts.json
//! saasy --format json snowball contracts.csv --periodicity monthly
//! saasy arr contracts.csv --date 2021-06-30
//! ```
//!
//! Settings come from `saasy.toml` (or `--config`), then `SAASY_*`
//! environment variables, then command-line flags.

mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use report::Report;
use saasy_core::{ArrSettings, ArrSnowball, Customer, CustomerMap, dateutils::Periodicity};
use saasy_import::{InputFormat, into_contracts};
use serde::Deserialize;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "saasy", author, version, about = "ARR analytics for subscription contracts")]
struct Cli {
  /// Path to a TOML settings file. Missing files are ignored.
  #[arg(short, long, value_name = "FILE", default_value = "saasy.toml")]
  config: PathBuf,

  /// Report layout on stdout.
  #[arg(long, value_enum)]
  format: Option<OutputFormat>,

  /// Maximum days between one contract ending and the next starting for
  /// the pair to count as a renewal.
  #[arg(long, value_name = "DAYS")]
  renewal_gap_days: Option<u32>,

  /// Decimal places kept when converting a contract's length to years.
  #[arg(long, value_name = "N")]
  duration_decimals: Option<u32>,

  /// Decimal places kept in a contract's annualised value.
  #[arg(long, value_name = "N")]
  acv_decimals: Option<u32>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Args, Debug)]
struct Input {
  /// Contract file (`.json` or `.csv`).
  file: PathBuf,

  /// Override the format implied by the file extension.
  #[arg(long, value_name = "FORMAT")]
  input_format: Option<InputFormat>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Classified ARR events per customer.
  Events {
    #[command(flatten)]
    input:    Input,
    /// Restrict the report to one customer.
    #[arg(long, value_name = "ID")]
    customer: Option<String>,
  },
  /// Constant-ARR intervals per customer.
  Timeline {
    #[command(flatten)]
    input:    Input,
    #[arg(long, value_name = "ID")]
    customer: Option<String>,
  },
  /// Period-by-period ARR roll-forward across all customers.
  Snowball {
    #[command(flatten)]
    input:       Input,
    /// monthly, quarterly or yearly.
    #[arg(long)]
    periodicity: Option<Periodicity>,
  },
  /// ARR in force on a date.
  Arr {
    #[command(flatten)]
    input:    Input,
    #[arg(long, value_name = "YYYY-MM-DD")]
    date:     NaiveDate,
    #[arg(long, value_name = "ID")]
    customer: Option<String>,
  },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
enum OutputFormat {
  #[default]
  Text,
  Json,
}

// ─── Settings ─────────────────────────────────────────────────────────────────

/// Shape of the layered configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
struct Settings {
  renewal_gap_days:  u32,
  duration_decimals: u32,
  acv_decimals:      u32,
  periodicity:       Periodicity,
  format:            OutputFormat,
}

impl Default for Settings {
  fn default() -> Self {
    let arr = ArrSettings::default();
    Self {
      renewal_gap_days:  arr.renewal_gap_days,
      duration_decimals: arr.duration_decimals,
      acv_decimals:      arr.acv_decimals,
      periodicity:       Periodicity::default(),
      format:            OutputFormat::default(),
    }
  }
}

impl Settings {
  fn load(cli: &Cli) -> Result<Self> {
    let layered = config::Config::builder()
      .add_source(config::File::from(cli.config.as_path()).required(false))
      .add_source(config::Environment::with_prefix("SAASY").try_parsing(true))
      .build()
      .with_context(|| format!("failed to read settings from {}", cli.config.display()))?;

    let settings: Self = layered
      .try_deserialize()
      .context("failed to deserialise settings")?;
    Ok(settings.with_overrides(cli))
  }

  /// Command-line flags win over the file and the environment.
  fn with_overrides(self, cli: &Cli) -> Self {
    let periodicity = match &cli.command {
      Command::Snowball { periodicity, .. } => *periodicity,
      _ => None,
    };
    Self {
      renewal_gap_days:  cli.renewal_gap_days.unwrap_or(self.renewal_gap_days),
      duration_decimals: cli.duration_decimals.unwrap_or(self.duration_decimals),
      acv_decimals:      cli.acv_decimals.unwrap_or(self.acv_decimals),
      periodicity:       periodicity.unwrap_or(self.periodicity),
      format:            cli.format.unwrap_or(self.format),
    }
  }

  fn arr(&self) -> ArrSettings {
    ArrSettings {
      renewal_gap_days:  self.renewal_gap_days,
      duration_decimals: self.duration_decimals,
      acv_decimals:      self.acv_decimals,
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

fn main() -> Result<()> {
  // Logs go to stderr; stdout carries only the report.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli)?;
  let arr_settings = settings.arr();

  let report = match &cli.command {
    Command::Events { input, customer } => {
      let customers = load_customers(input, &arr_settings)?;
      Report::events(&select(&customers, customer.as_deref())?)
    }
    Command::Timeline { input, customer } => {
      let customers = load_customers(input, &arr_settings)?;
      Report::timeline(&select(&customers, customer.as_deref())?)
    }
    Command::Snowball { input, .. } => {
      let customers = load_customers(input, &arr_settings)?;
      let snowball = ArrSnowball::new(&customers, settings.periodicity)
        .context("failed to build ARR snowball")?;
      Report::Snowball(snowball)
    }
    Command::Arr { input, date, customer } => {
      let customers = load_customers(input, &arr_settings)?;
      Report::arr(*date, &select(&customers, customer.as_deref())?)?
    }
  };

  println!("{}", report.render(settings.format)?);
  Ok(())
}

// ─── Loading ──────────────────────────────────────────────────────────────────

fn load_customers(input: &Input, settings: &ArrSettings) -> Result<CustomerMap> {
  let format = resolve_format(&input.file, input.input_format)?;
  let raw = std::fs::read_to_string(&input.file)
    .with_context(|| format!("failed to read {}", input.file.display()))?;

  let records = format
    .parse(&raw)
    .with_context(|| format!("failed to parse {} as {format}", input.file.display()))?;
  let contracts = into_contracts(records, settings)
    .with_context(|| format!("invalid contract in {}", input.file.display()))?;
  let contract_count = contracts.len();

  let customers = CustomerMap::with_settings(contracts, settings)
    .context("failed to classify contracts")?;
  info!(
    file = %input.file.display(),
    contracts = contract_count,
    customers = customers.len(),
    "loaded contracts"
  );
  Ok(customers)
}

fn resolve_format(path: &Path, explicit: Option<InputFormat>) -> Result<InputFormat> {
  match explicit.or_else(|| InputFormat::from_path(path)) {
    Some(format) => Ok(format),
    None => bail!(
      "cannot tell the format of {} from its extension; pass --input-format json|csv",
      path.display()
    ),
  }
}

/// Every customer, or only `customer_id` when given.
fn select<'a>(
  customers: &'a CustomerMap,
  customer_id: Option<&str>,
) -> Result<Vec<&'a Customer>> {
  match customer_id {
    None => Ok(customers.iter().collect()),
    Some(id) => match customers.get(id) {
      Some(customer) => Ok(vec![customer]),
      None => bail!("no contracts for customer {id:?}"),
    },
  }
}
