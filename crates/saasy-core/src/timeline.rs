//! ARR interval timeline: a piecewise-constant view of ARR over all dates.
//!
//! The timeline is a minimal, ordered list of intervals that partitions the
//! whole date line. Bound inclusivity is explicit on both sides of every
//! interval:
//!
//! - a change caused by a contract **start** takes effect on that date, so
//!   the interval before it is open at the date and the one after is closed;
//! - a change caused by a contract **end** takes effect the day after, so the
//!   interval before it is closed at the date and the one after is open.

use std::{collections::BTreeMap, fmt, ops::Index, slice};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
  Error, Result, arr_event::ArrEventStream, contract_event::ContractEventKind,
};

// ─── Bounds ──────────────────────────────────────────────────────────────────

/// An interval endpoint; the infinities sort below and above every date.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(tag = "kind", content = "date", rename_all = "snake_case")]
pub enum Endpoint {
  NegInfinity,
  Date(NaiveDate),
  PosInfinity,
}

impl Endpoint {
  pub fn date(self) -> Option<NaiveDate> {
    match self {
      Self::Date(date) => Some(date),
      Self::NegInfinity | Self::PosInfinity => None,
    }
  }
}

impl fmt::Display for Endpoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NegInfinity => f.write_str("-inf"),
      Self::Date(date) => write!(f, "{date}"),
      Self::PosInfinity => f.write_str("+inf"),
    }
  }
}

/// Whether an endpoint belongs to its interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundKind {
  Open,
  Closed,
}

// ─── ArrInterval ─────────────────────────────────────────────────────────────

/// A date interval over which ARR is constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrInterval {
  pub lower_bound: BoundKind,
  pub lower:       Endpoint,
  pub upper:       Endpoint,
  pub upper_bound: BoundKind,
  pub arr:         Decimal,
}

impl ArrInterval {
  /// `(lower, upper)`
  pub fn open(lower: Endpoint, upper: Endpoint, arr: Decimal) -> Self {
    Self::with_bounds(BoundKind::Open, lower, upper, BoundKind::Open, arr)
  }

  /// `[lower, upper]`
  pub fn closed(lower: Endpoint, upper: Endpoint, arr: Decimal) -> Self {
    Self::with_bounds(BoundKind::Closed, lower, upper, BoundKind::Closed, arr)
  }

  /// `[lower, upper)`
  pub fn closed_open(lower: Endpoint, upper: Endpoint, arr: Decimal) -> Self {
    Self::with_bounds(BoundKind::Closed, lower, upper, BoundKind::Open, arr)
  }

  /// `(lower, upper]`
  pub fn open_closed(lower: Endpoint, upper: Endpoint, arr: Decimal) -> Self {
    Self::with_bounds(BoundKind::Open, lower, upper, BoundKind::Closed, arr)
  }

  pub fn with_bounds(
    lower_bound: BoundKind,
    lower: Endpoint,
    upper: Endpoint,
    upper_bound: BoundKind,
    arr: Decimal,
  ) -> Self {
    Self { lower_bound, lower, upper, upper_bound, arr }
  }

  pub fn contains(&self, date: NaiveDate) -> bool {
    let point = Endpoint::Date(date);
    let above_lower = match self.lower_bound {
      BoundKind::Open => point > self.lower,
      BoundKind::Closed => point >= self.lower,
    };
    let below_upper = match self.upper_bound {
      BoundKind::Open => point < self.upper,
      BoundKind::Closed => point <= self.upper,
    };
    above_lower && below_upper
  }
}

impl fmt::Display for ArrInterval {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let open = match self.lower_bound {
      BoundKind::Open => '(',
      BoundKind::Closed => '[',
    };
    let close = match self.upper_bound {
      BoundKind::Open => ')',
      BoundKind::Closed => ']',
    };
    write!(f, "{open}{}, {}{close} {}", self.lower, self.upper, self.arr)
  }
}

/// A point where the ARR level changes between two adjacent intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary {
  pub date:  NaiveDate,
  /// Which kind of contract event moved the level, and therefore on which
  /// side of `date` the change lands.
  pub kind:  ContractEventKind,
  pub delta: Decimal,
}

// ─── ArrIntervalTimeline ─────────────────────────────────────────────────────

/// Minimal ordered partition of the date line into constant-ARR intervals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrIntervalTimeline {
  intervals:  Vec<ArrInterval>,
  boundaries: Vec<Boundary>,
}

impl ArrIntervalTimeline {
  /// Fails only when a level or a per-date net change does not fit a
  /// `Decimal`.
  pub fn new(events: &ArrEventStream) -> Result<Self> {
    // Net change per date, split by the role of the originating contract
    // event. Pure renewals net to zero and place no boundary.
    let mut net: BTreeMap<NaiveDate, (Decimal, Decimal)> = BTreeMap::new();
    for event in events {
      let date = event.event_date();
      let entry = net.entry(date).or_default();
      let slot = match event.contract_event().kind() {
        ContractEventKind::Start => &mut entry.0,
        ContractEventKind::End => &mut entry.1,
      };
      let (level, delta) = (*slot, event.arr_change());
      *slot = level
        .checked_add(delta)
        .ok_or(Error::TimelineOverflow { date, level, delta })?;
    }

    let mut builder = TimelineBuilder::default();
    for (date, (start_delta, end_delta)) in net {
      // A start counts from its date, an end only after it; applying the
      // start first keeps the single-day interval between them non-empty.
      builder.boundary(date, ContractEventKind::Start, start_delta)?;
      builder.boundary(date, ContractEventKind::End, end_delta)?;
    }
    Ok(builder.finish())
  }

  /// ARR in force on `date`.
  pub fn arr_at(&self, date: NaiveDate) -> Decimal {
    self
      .intervals
      .iter()
      .find(|interval| interval.contains(date))
      .map_or(Decimal::ZERO, |interval| interval.arr)
  }

  /// The level changes between consecutive intervals, in date order.
  pub fn boundaries(&self) -> &[Boundary] { &self.boundaries }

  pub fn len(&self) -> usize { self.intervals.len() }

  /// Always `false`: even an empty event stream yields `(-inf, +inf)`.
  pub fn is_empty(&self) -> bool { self.intervals.is_empty() }

  pub fn get(&self, index: usize) -> Option<&ArrInterval> {
    self.intervals.get(index)
  }

  pub fn iter(&self) -> slice::Iter<'_, ArrInterval> { self.intervals.iter() }

  pub fn as_slice(&self) -> &[ArrInterval] { &self.intervals }
}

impl Index<usize> for ArrIntervalTimeline {
  type Output = ArrInterval;

  fn index(&self, index: usize) -> &ArrInterval { &self.intervals[index] }
}

impl<'a> IntoIterator for &'a ArrIntervalTimeline {
  type IntoIter = slice::Iter<'a, ArrInterval>;
  type Item = &'a ArrInterval;

  fn into_iter(self) -> Self::IntoIter { self.intervals.iter() }
}

// ─── Builder ─────────────────────────────────────────────────────────────────

struct TimelineBuilder {
  intervals:   Vec<ArrInterval>,
  boundaries:  Vec<Boundary>,
  lower_bound: BoundKind,
  lower:       Endpoint,
  level:       Decimal,
}

impl Default for TimelineBuilder {
  fn default() -> Self {
    Self {
      intervals:   Vec::new(),
      boundaries:  Vec::new(),
      lower_bound: BoundKind::Open,
      lower:       Endpoint::NegInfinity,
      level:       Decimal::ZERO,
    }
  }
}

impl TimelineBuilder {
  fn boundary(
    &mut self,
    date: NaiveDate,
    kind: ContractEventKind,
    delta: Decimal,
  ) -> Result<()> {
    if delta.is_zero() {
      return Ok(());
    }
    let level = self.level.checked_add(delta).ok_or(Error::TimelineOverflow {
      date,
      level: self.level,
      delta,
    })?;
    let (upper_bound, next_lower_bound) = match kind {
      ContractEventKind::Start => (BoundKind::Open, BoundKind::Closed),
      ContractEventKind::End => (BoundKind::Closed, BoundKind::Open),
    };
    self.intervals.push(ArrInterval::with_bounds(
      self.lower_bound,
      self.lower,
      Endpoint::Date(date),
      upper_bound,
      self.level,
    ));
    self.lower_bound = next_lower_bound;
    self.lower = Endpoint::Date(date);
    self.level = level;
    self.boundaries.push(Boundary { date, kind, delta });
    trace!(%date, %kind, %delta, level = %self.level, "timeline boundary");
    Ok(())
  }

  fn finish(mut self) -> ArrIntervalTimeline {
    self.intervals.push(ArrInterval::with_bounds(
      self.lower_bound,
      self.lower,
      Endpoint::PosInfinity,
      BoundKind::Open,
      self.level,
    ));
    ArrIntervalTimeline {
      intervals:  self.intervals,
      boundaries: self.boundaries,
    }
  }
}
