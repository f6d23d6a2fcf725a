//! Calendar helpers: year fractions, proximity checks and reporting periods.
//!
//! Everything here is a pure function of its arguments.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Months, NaiveDate, TimeDelta};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const DAYS_PER_YEAR: Decimal = Decimal::from_parts(365, 0, 0, false, 0);

/// Largest scale a [`Decimal`] can carry.
const MAX_DECIMALS: u32 = 28;

// ─── Year fractions ──────────────────────────────────────────────────────────

/// Length of `a..b` in 365-day years, rounded to `decimals` places.
///
/// With `absolute` the result is never negative, so argument order does not
/// matter.
pub fn yearfrac(a: NaiveDate, b: NaiveDate, decimals: u32, absolute: bool) -> Decimal {
  let days = Decimal::from(b.signed_duration_since(a).num_days());
  let frac = mround(days / DAYS_PER_YEAR, decimals);
  if absolute { frac.abs() } else { frac }
}

/// Round half away from zero to `decimals` places.
pub fn mround(value: Decimal, decimals: u32) -> Decimal {
  value.round_dp_with_strategy(
    decimals.min(MAX_DECIMALS),
    RoundingStrategy::MidpointAwayFromZero,
  )
}

// ─── Proximity ───────────────────────────────────────────────────────────────

/// `true` when `a` and `b` are at most `days` calendar days apart.
pub fn within_days(a: NaiveDate, b: NaiveDate, days: u32) -> bool {
  b.signed_duration_since(a).num_days().abs() <= i64::from(days)
}

/// Shift `date` by a signed number of days; `None` outside chrono's range.
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
  TimeDelta::try_days(days).and_then(|delta| date.checked_add_signed(delta))
}

// ─── Reporting periods ───────────────────────────────────────────────────────

/// Granularity of a reporting calendar.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Periodicity {
  Monthly,
  #[default]
  Quarterly,
  Yearly,
}

impl Periodicity {
  fn months(self) -> u32 {
    match self {
      Self::Monthly => 1,
      Self::Quarterly => 3,
      Self::Yearly => 12,
    }
  }

  /// First day of the period containing `date`.
  fn period_start(self, date: NaiveDate) -> Result<NaiveDate> {
    let month = match self {
      Self::Monthly => date.month(),
      Self::Quarterly => (date.month0() / 3) * 3 + 1,
      Self::Yearly => 1,
    };
    NaiveDate::from_ymd_opt(date.year(), month, 1)
      .ok_or(Error::DateOutOfRange(date))
  }

  fn label(self, start: NaiveDate) -> String {
    match self {
      Self::Monthly => start.format("%b %Y").to_string(),
      Self::Quarterly => format!("{} Q{}", start.year(), start.month0() / 3 + 1),
      Self::Yearly => start.year().to_string(),
    }
  }
}

impl FromStr for Periodicity {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "monthly" | "month" => Ok(Self::Monthly),
      "quarterly" | "quarter" => Ok(Self::Quarterly),
      "yearly" | "year" | "annual" => Ok(Self::Yearly),
      _ => Err(Error::UnknownPeriodicity(s.to_string())),
    }
  }
}

impl fmt::Display for Periodicity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Monthly => "monthly",
      Self::Quarterly => "quarterly",
      Self::Yearly => "yearly",
    })
  }
}

/// A closed calendar range `[start, end]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
  pub start:       NaiveDate,
  pub end:         NaiveDate,
  pub label:       String,
  pub periodicity: Periodicity,
}

impl Period {
  pub fn contains(&self, date: NaiveDate) -> bool {
    self.start <= date && date <= self.end
  }
}

/// Inclusive bounds of a set of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
  pub min: NaiveDate,
  pub max: NaiveDate,
}

/// Contiguous periods from the one containing `range.min` through the one
/// containing `range.max`. An inverted range yields no periods.
pub fn periods(range: DateRange, periodicity: Periodicity) -> Result<Vec<Period>> {
  let last = periodicity.period_start(range.max)?;
  let step = Months::new(periodicity.months());

  let mut periods = Vec::new();
  let mut start = periodicity.period_start(range.min)?;
  while start <= last {
    let next = start
      .checked_add_months(step)
      .ok_or(Error::DateOutOfRange(start))?;
    let end = next.pred_opt().ok_or(Error::DateOutOfRange(next))?;
    periods.push(Period {
      start,
      end,
      label: periodicity.label(start),
      periodicity,
    });
    start = next;
  }
  Ok(periods)
}
