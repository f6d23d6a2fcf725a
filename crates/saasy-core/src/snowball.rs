//! ARR snowball: per-period roll-forward of ARR across all customers.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
  Error, Result,
  arr_event::ArrEventKind,
  customer::CustomerMap,
  dateutils::{Period, Periodicity, add_days, periods},
};

/// ARR movements over one reporting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnowballPeriod {
  pub period:       Period,
  /// Total ARR on the day before the period starts.
  pub starting_arr: Decimal,
  pub new:          Decimal,
  pub expansion:    Decimal,
  pub downsell:     Decimal,
  pub churn:        Decimal,
  /// Total ARR on the last day of the period.
  pub ending_arr:   Decimal,
}

impl SnowballPeriod {
  fn new(customers: &CustomerMap, period: Period) -> Result<Self> {
    let starting_arr = match add_days(period.start, -1) {
      Some(day_before) => customers.arr_at(day_before)?,
      None => Decimal::ZERO,
    };
    let ending_arr = customers.arr_at(period.end)?;

    let mut new = Decimal::ZERO;
    let mut expansion = Decimal::ZERO;
    let mut downsell = Decimal::ZERO;
    let mut churn = Decimal::ZERO;
    let events = customers.iter().flat_map(|c| c.arr_events().iter());
    for event in events.filter(|e| period.contains(e.event_date())) {
      let bucket = match event.kind() {
        ArrEventKind::New => &mut new,
        ArrEventKind::Expansion => &mut expansion,
        ArrEventKind::Downsell => &mut downsell,
        ArrEventKind::Churn => &mut churn,
        ArrEventKind::Renewal => continue,
      };
      *bucket = bucket.checked_add(event.arr_change()).ok_or_else(|| {
        Error::MovementOverflow {
          period: period.label.clone(),
          kind:   event.kind(),
        }
      })?;
    }

    Ok(Self {
      period,
      starting_arr,
      new,
      expansion,
      downsell,
      churn,
      ending_arr,
    })
  }
}

/// Snowball over the full contract date range of a [`CustomerMap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrSnowball {
  pub periodicity: Periodicity,
  pub periods:     Vec<SnowballPeriod>,
}

impl ArrSnowball {
  pub fn new(customers: &CustomerMap, periodicity: Periodicity) -> Result<Self> {
    let periods = match customers.date_range() {
      Some(range) => periods(range, periodicity)?
        .into_iter()
        .map(|period| SnowballPeriod::new(customers, period))
        .collect::<Result<_>>()?,
      None => Vec::new(),
    };
    Ok(Self { periodicity, periods })
  }
}
