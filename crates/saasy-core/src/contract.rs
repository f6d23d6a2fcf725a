//! Contracts: the immutable input of the ARR engine.
//!
//! A contract is validated once, at construction. Its duration and
//! annualised value are derived eagerly so every later stage can rely on
//! `acv` being defined.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  dateutils::{mround, yearfrac},
  settings::ArrSettings,
};

// ─── Raw record ──────────────────────────────────────────────────────────────

/// The unvalidated shape of a contract as it arrives from an input provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
  pub customer_id: String,
  pub start_date:  NaiveDate,
  pub end_date:    NaiveDate,
  /// Total contract value.
  pub tcv:         Decimal,
}

impl ContractRecord {
  /// Validate the record into a [`Contract`] using `settings` for the
  /// duration rounding.
  pub fn into_contract(self, settings: &ArrSettings) -> Result<Contract> {
    Contract::with_settings(
      self.customer_id,
      self.start_date,
      self.end_date,
      self.tcv,
      settings,
    )
  }
}

impl TryFrom<ContractRecord> for Contract {
  type Error = Error;

  fn try_from(record: ContractRecord) -> Result<Self> {
    record.into_contract(&ArrSettings::default())
  }
}

// ─── Contract ────────────────────────────────────────────────────────────────

/// A validated subscription contract.
///
/// Invariants: `end_date >= start_date` and `duration_years != 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contract {
  customer_id:    String,
  start_date:     NaiveDate,
  end_date:       NaiveDate,
  tcv:            Decimal,
  duration_years: Decimal,
  acv:            Decimal,
}

impl Contract {
  /// Build a contract with the default duration rounding (one decimal).
  pub fn new(
    customer_id: impl Into<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    tcv: Decimal,
  ) -> Result<Self> {
    Self::with_settings(
      customer_id,
      start_date,
      end_date,
      tcv,
      &ArrSettings::default(),
    )
  }

  pub fn with_settings(
    customer_id: impl Into<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    tcv: Decimal,
    settings: &ArrSettings,
  ) -> Result<Self> {
    let customer_id = customer_id.into();
    if end_date < start_date {
      return Err(Error::EndBeforeStart {
        customer_id,
        start: start_date,
        end: end_date,
      });
    }

    let duration_years =
      yearfrac(start_date, end_date, settings.duration_decimals, true);
    if duration_years.is_zero() {
      return Err(Error::ZeroDuration {
        customer_id,
        start: start_date,
        end: end_date,
        decimals: settings.duration_decimals,
      });
    }

    let acv = tcv
      .checked_div(duration_years)
      .ok_or_else(|| Error::AcvOverflow { customer_id: customer_id.clone(), tcv })?;
    let acv = mround(acv, settings.acv_decimals).normalize();

    Ok(Self {
      customer_id,
      start_date,
      end_date,
      tcv,
      duration_years,
      acv,
    })
  }

  pub fn customer_id(&self) -> &str { &self.customer_id }

  pub fn start_date(&self) -> NaiveDate { self.start_date }

  pub fn end_date(&self) -> NaiveDate { self.end_date }

  /// Total contract value.
  pub fn tcv(&self) -> Decimal { self.tcv }

  /// Length in 365-day years, rounded when the contract was built.
  pub fn duration_years(&self) -> Decimal { self.duration_years }

  /// Annualised contract value, `tcv / duration_years` rounded to the
  /// configured ACV scale.
  pub fn acv(&self) -> Decimal { self.acv }
}

impl fmt::Display for Contract {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} {}..{} (tcv {})",
      self.customer_id, self.start_date, self.end_date, self.tcv
    )
  }
}
