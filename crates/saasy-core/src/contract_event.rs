//! Contract events: the chronological linearisation of a contract set.
//!
//! Every contract contributes exactly two events, its start and its end.
//! The stream is sorted once by [`chronological`] and never mutated after.

use std::{cmp::Ordering, fmt, ops::Index, slice, sync::Arc};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::contract::Contract;

// ─── Event role ──────────────────────────────────────────────────────────────

/// Whether an event marks the first or the last day of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractEventKind {
  Start,
  End,
}

impl ContractEventKind {
  /// Secondary sort key: ends sort before starts on the same date.
  fn tie_rank(self) -> u8 {
    match self {
      Self::End => 0,
      Self::Start => 1,
    }
  }
}

impl fmt::Display for ContractEventKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Start => f.write_str("start"),
      Self::End => f.write_str("end"),
    }
  }
}

// ─── ContractEvent ───────────────────────────────────────────────────────────

/// A contract paired with one of its two roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractEvent {
  contract: Arc<Contract>,
  kind:     ContractEventKind,
}

impl ContractEvent {
  pub fn new(contract: Arc<Contract>, kind: ContractEventKind) -> Self {
    Self { contract, kind }
  }

  pub fn contract(&self) -> &Contract { &self.contract }

  pub fn kind(&self) -> ContractEventKind { self.kind }

  pub fn event_date(&self) -> NaiveDate {
    match self.kind {
      ContractEventKind::Start => self.contract.start_date(),
      ContractEventKind::End => self.contract.end_date(),
    }
  }

  /// `+acv` for a start, `-acv` for an end.
  pub fn signed_delta(&self) -> Decimal {
    match self.kind {
      ContractEventKind::Start => self.contract.acv(),
      ContractEventKind::End => -self.contract.acv(),
    }
  }
}

impl fmt::Display for ContractEvent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} of {} on {}", self.kind, self.contract, self.event_date())
  }
}

/// Total order over contract events: by date, then ends before starts.
///
/// Events equal under this order are left in input order by the stable sort
/// in [`ContractEventStream::new`].
pub fn chronological(a: &ContractEvent, b: &ContractEvent) -> Ordering {
  a.event_date()
    .cmp(&b.event_date())
    .then_with(|| a.kind.tie_rank().cmp(&b.kind.tie_rank()))
}

// ─── ContractEventStream ─────────────────────────────────────────────────────

/// All start and end events of a contract set, in [`chronological`] order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractEventStream {
  events: Vec<ContractEvent>,
}

impl ContractEventStream {
  pub fn new<I>(contracts: I) -> Self
  where
    I: IntoIterator<Item = Contract>,
  {
    Self::from_shared(contracts.into_iter().map(Arc::new))
  }

  /// Build from contracts that are already shared with another owner.
  pub fn from_shared<I>(contracts: I) -> Self
  where
    I: IntoIterator<Item = Arc<Contract>>,
  {
    let mut events: Vec<ContractEvent> = contracts
      .into_iter()
      .flat_map(|contract| {
        [
          ContractEvent::new(Arc::clone(&contract), ContractEventKind::Start),
          ContractEvent::new(contract, ContractEventKind::End),
        ]
      })
      .collect();
    events.sort_by(chronological);
    Self { events }
  }

  pub fn len(&self) -> usize { self.events.len() }

  pub fn is_empty(&self) -> bool { self.events.is_empty() }

  pub fn get(&self, index: usize) -> Option<&ContractEvent> {
    self.events.get(index)
  }

  pub fn iter(&self) -> slice::Iter<'_, ContractEvent> { self.events.iter() }

  pub fn as_slice(&self) -> &[ContractEvent] { &self.events }
}

impl Index<usize> for ContractEventStream {
  type Output = ContractEvent;

  fn index(&self, index: usize) -> &ContractEvent { &self.events[index] }
}

impl<'a> IntoIterator for &'a ContractEventStream {
  type IntoIter = slice::Iter<'a, ContractEvent>;
  type Item = &'a ContractEvent;

  fn into_iter(self) -> Self::IntoIter { self.events.iter() }
}
