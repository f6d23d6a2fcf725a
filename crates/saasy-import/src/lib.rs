//! Contract-record codecs for Saasy.
//!
//! Decodes JSON and CSV text into [`saasy_core::ContractRecord`]s and
//! validates them into [`saasy_core::Contract`]s. Pure synchronous; reading
//! the bytes off disk is the caller's job.
//!
//! # Quick start
//!
//! ```no_run
//! use saasy_core::ArrSettings;
//! use saasy_import::{into_contracts, parse_csv};
//!
//! let csv = "customer_id,start_date,end_date,tcv\nacme,2020-01-01,2020-12-31,1200\n";
//! let contracts = into_contracts(parse_csv(csv).unwrap(), &ArrSettings::default()).unwrap();
//! println!("{} contracts", contracts.len());
//! ```

mod csv;
pub mod error;

use std::{fmt, path::Path, str::FromStr};

pub use error::{Error, Result};
use saasy_core::{ArrSettings, Contract, ContractRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ─── Formats ─────────────────────────────────────────────────────────────────

/// Text layout of a contract file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
  Json,
  Csv,
}

impl InputFormat {
  /// Guess the format from a file extension (case-insensitive).
  pub fn from_path(path: &Path) -> Option<Self> {
    path.extension()?.to_str()?.parse().ok()
  }

  pub fn parse(self, input: &str) -> Result<Vec<ContractRecord>> {
    match self {
      Self::Json => parse_json(input),
      Self::Csv => parse_csv(input),
    }
  }
}

impl FromStr for InputFormat {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "json" => Ok(Self::Json),
      "csv" => Ok(Self::Csv),
      _ => Err(Error::UnknownFormat(s.to_string())),
    }
  }
}

impl fmt::Display for InputFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Json => "json",
      Self::Csv => "csv",
    })
  }
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Parse a JSON array of `{customer_id, start_date, end_date, tcv}` objects.
///
/// Dates are ISO `YYYY-MM-DD`; `tcv` may be a number or a decimal string.
pub fn parse_json(input: &str) -> Result<Vec<ContractRecord>> {
  let records: Vec<ContractRecord> = serde_json::from_str(input)?;
  debug!(records = records.len(), "parsed JSON contract records");
  Ok(records)
}

/// Parse CSV with a header row naming `customer_id`, `start_date`,
/// `end_date` and `tcv` in any order.
pub fn parse_csv(input: &str) -> Result<Vec<ContractRecord>> {
  let records = csv::parse(input)?;
  debug!(records = records.len(), "parsed CSV contract records");
  Ok(records)
}

/// Validate every record. The first invalid record fails the batch.
pub fn into_contracts(
  records: Vec<ContractRecord>,
  settings: &ArrSettings,
) -> Result<Vec<Contract>> {
  records
    .into_iter()
    .map(|record| record.into_contract(settings).map_err(Error::from))
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use rust_decimal::Decimal;

  use super::*;

  const JSON: &str = r#"[
    {"customer_id": "acme", "start_date": "2020-01-01", "end_date": "2020-12-31", "tcv": 1200},
    {"customer_id": "acme", "start_date": "2021-01-01", "end_date": "2022-12-31", "tcv": "3000.50"}
  ]"#;

  #[test]
  fn json_accepts_numbers_and_strings() {
    let records = parse_json(JSON).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].tcv, Decimal::from(1200));
    assert_eq!(records[1].tcv, Decimal::new(300050, 2));
    assert_eq!(
      records[1].end_date,
      NaiveDate::from_ymd_opt(2022, 12, 31).unwrap()
    );
  }

  #[test]
  fn json_rejects_missing_field() {
    let err = parse_json(r#"[{"customer_id": "a", "start_date": "2020-01-01"}]"#)
      .unwrap_err();
    assert!(matches!(err, Error::Json(_)), "{err:?}");
  }

  #[test]
  fn into_contracts_derives_acv() {
    let contracts =
      into_contracts(parse_json(JSON).unwrap(), &ArrSettings::default()).unwrap();
    assert_eq!(contracts[0].acv(), Decimal::from(1200));
    assert_eq!(contracts[1].duration_years(), Decimal::from(2));
  }

  #[test]
  fn into_contracts_surfaces_core_errors() {
    let records = parse_csv(
      "customer_id,start_date,end_date,tcv\nacme,2020-12-31,2020-01-01,100\n",
    )
    .unwrap();
    let err = into_contracts(records, &ArrSettings::default()).unwrap_err();
    assert!(
      matches!(err, Error::Core(saasy_core::Error::EndBeforeStart { .. })),
      "{err:?}"
    );
  }

  #[test]
  fn format_from_extension() {
    assert_eq!(
      InputFormat::from_path(Path::new("data/contracts.CSV")),
      Some(InputFormat::Csv)
    );
    assert_eq!(
      InputFormat::from_path(Path::new("contracts.json")),
      Some(InputFormat::Json)
    );
    assert_eq!(InputFormat::from_path(Path::new("contracts.xlsx")), None);
    assert_eq!(InputFormat::from_path(Path::new("contracts")), None);
  }

  #[test]
  fn format_dispatches_to_codec() {
    let records = InputFormat::Json.parse(JSON).unwrap();
    let csv = InputFormat::Csv
      .parse(
        "tcv,customer_id,start_date,end_date\n\
         1200,acme,2020-01-01,2020-12-31\n\
         3000.50,acme,2021-01-01,2022-12-31\n",
      )
      .unwrap();
    assert_eq!(records, csv);
  }
}
