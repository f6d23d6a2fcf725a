//! ARR events: the classified account of how a customer's ARR moves.
//!
//! Classification is a single left-to-right fold over a
//! [`ContractEventStream`]. The only state carried between steps is the
//! running ARR level and the events emitted so far; the most recent emitted
//! event is consulted (and sometimes retracted) to detect renewals.
//!
//! ```text
//! Start:  first event ............................ New
//!         after Churn, within gap ................ Renewal [+ Expansion | Downsell]
//!         after Churn, beyond gap ................ New
//!         while ARR is live ...................... Expansion
//! End:    within gap of previous event ........... Renewal [+ Expansion | Downsell]
//!         takes ARR to zero ...................... Churn
//!         leaves ARR positive .................... Downsell
//! ```

use std::{fmt, ops::Index, slice};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
  Error, Result,
  contract_event::{ContractEvent, ContractEventKind, ContractEventStream},
  dateutils::within_days,
  settings::ArrSettings,
};

// ─── Classification ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrEventKind {
  New,
  Expansion,
  Downsell,
  Churn,
  /// A contract succeeded by another within the renewal gap. Always carries
  /// a zero change; any change in value is emitted separately.
  Renewal,
}

impl fmt::Display for ArrEventKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(match self {
      Self::New => "new",
      Self::Expansion => "expansion",
      Self::Downsell => "downsell",
      Self::Churn => "churn",
      Self::Renewal => "renewal",
    })
  }
}

/// A labelled change in ARR, attributed to the contract event that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrEvent {
  contract_event: ContractEvent,
  kind:           ArrEventKind,
  arr_change:     Decimal,
}

impl ArrEvent {
  pub fn new(
    contract_event: ContractEvent,
    kind: ArrEventKind,
    arr_change: Decimal,
  ) -> Self {
    Self { contract_event, kind, arr_change }
  }

  pub fn contract_event(&self) -> &ContractEvent { &self.contract_event }

  pub fn kind(&self) -> ArrEventKind { self.kind }

  pub fn arr_change(&self) -> Decimal { self.arr_change }

  pub fn event_date(&self) -> NaiveDate { self.contract_event.event_date() }
}

// ─── ArrEventStream ──────────────────────────────────────────────────────────

/// The classified ARR events of one customer, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrEventStream {
  events:    Vec<ArrEvent>,
  final_arr: Decimal,
}

impl ArrEventStream {
  /// Classify `contract_events` with the default renewal gap.
  pub fn new(contract_events: &ContractEventStream) -> Result<Self> {
    Self::with_settings(contract_events, &ArrSettings::default())
  }

  /// Classify `contract_events`. Any invariant violation aborts the whole
  /// stream; no partial result is returned.
  pub fn with_settings(
    contract_events: &ContractEventStream,
    settings: &ArrSettings,
  ) -> Result<Self> {
    let classifier = Classifier { renewal_gap_days: settings.renewal_gap_days };
    let state = contract_events
      .iter()
      .try_fold(ClassifierState::default(), |state, ce| {
        classifier.step(state, ce)
      })?;
    Ok(Self {
      events:    state.emitted,
      final_arr: state.current_arr,
    })
  }

  /// Running ARR after the last event; zero exactly when the stream ends in
  /// a churn (or is empty).
  pub fn final_arr(&self) -> Decimal { self.final_arr }

  pub fn len(&self) -> usize { self.events.len() }

  pub fn is_empty(&self) -> bool { self.events.is_empty() }

  pub fn get(&self, index: usize) -> Option<&ArrEvent> { self.events.get(index) }

  pub fn last(&self) -> Option<&ArrEvent> { self.events.last() }

  pub fn iter(&self) -> slice::Iter<'_, ArrEvent> { self.events.iter() }

  pub fn as_slice(&self) -> &[ArrEvent] { &self.events }
}

impl Index<usize> for ArrEventStream {
  type Output = ArrEvent;

  fn index(&self, index: usize) -> &ArrEvent { &self.events[index] }
}

impl<'a> IntoIterator for &'a ArrEventStream {
  type IntoIter = slice::Iter<'a, ArrEvent>;
  type Item = &'a ArrEvent;

  fn into_iter(self) -> Self::IntoIter { self.events.iter() }
}

// ─── Fold state ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ClassifierState {
  current_arr: Decimal,
  emitted:     Vec<ArrEvent>,
}

impl ClassifierState {
  fn last(&self) -> Option<&ArrEvent> { self.emitted.last() }

  fn emit(
    mut self,
    ce: &ContractEvent,
    kind: ArrEventKind,
    arr_change: Decimal,
  ) -> Result<Self> {
    let arr = self.current_arr;
    self.current_arr = arr.checked_add(arr_change).ok_or_else(|| {
      Error::ArrOverflow { arr, change: arr_change, event: ce.clone() }
    })?;
    debug!(
      customer = ce.contract().customer_id(),
      date = %ce.event_date(),
      %kind,
      %arr_change,
      arr = %self.current_arr,
      "classified ARR event"
    );
    self.emitted.push(ArrEvent::new(ce.clone(), kind, arr_change));
    Ok(self)
  }

  /// Retract the last emitted event and re-emit `anchor` as a renewal,
  /// followed by an expansion or downsell for any change in value.
  fn renew(mut self, anchor: &ContractEvent, trigger: &ContractEvent) -> Result<Self> {
    let retracted = self
      .emitted
      .pop()
      .ok_or_else(|| Error::MissingRenewalAnchor { event: trigger.clone() })?;
    self.current_arr = checked_sub(self.current_arr, retracted.arr_change, trigger)?;
    debug!(
      customer = anchor.contract().customer_id(),
      retracted = %retracted.kind,
      date = %retracted.event_date(),
      arr = %self.current_arr,
      "retracted ARR event for renewal"
    );

    let delta = checked_sub(anchor.signed_delta(), self.current_arr, anchor)?;
    let state = self.emit(anchor, ArrEventKind::Renewal, Decimal::ZERO)?;
    if delta.is_zero() {
      return Ok(state);
    }
    let kind = if delta < Decimal::ZERO {
      ArrEventKind::Downsell
    } else {
      ArrEventKind::Expansion
    };
    state.emit(anchor, kind, delta)
  }
}

/// `arr - change`, or [`Error::ArrOverflow`] attributed to `event`.
fn checked_sub(arr: Decimal, change: Decimal, event: &ContractEvent) -> Result<Decimal> {
  arr.checked_sub(change).ok_or_else(|| Error::ArrOverflow {
    arr,
    change: -change,
    event:  event.clone(),
  })
}

// ─── Transitions ─────────────────────────────────────────────────────────────

enum StartTransition {
  New,
  /// Reverses the preceding churn.
  Renewal,
  /// Another contract starts while ARR is live.
  Overlap,
}

enum EndTransition {
  /// The previous event started close enough to this end to be its renewal.
  EarlyRenewal { anchor: ContractEvent },
  Churn,
  Downsell,
}

struct Classifier {
  renewal_gap_days: u32,
}

impl Classifier {
  fn step(
    &self,
    state: ClassifierState,
    ce: &ContractEvent,
  ) -> Result<ClassifierState> {
    if state.current_arr < Decimal::ZERO {
      return Err(Error::NegativeArr {
        arr:   state.current_arr,
        event: ce.clone(),
      });
    }

    match ce.kind() {
      ContractEventKind::Start => match self.start_transition(&state, ce)? {
        StartTransition::New => state.emit(ce, ArrEventKind::New, ce.signed_delta()),
        StartTransition::Renewal => state.renew(ce, ce),
        // Overlapping starts are always labelled expansion, whatever the sign.
        StartTransition::Overlap => {
          state.emit(ce, ArrEventKind::Expansion, ce.signed_delta())
        }
      },
      ContractEventKind::End => match self.end_transition(&state, ce)? {
        EndTransition::EarlyRenewal { anchor } => state.renew(&anchor, ce),
        EndTransition::Churn => {
          let arr_change = -state.current_arr;
          state.emit(ce, ArrEventKind::Churn, arr_change)
        }
        EndTransition::Downsell => {
          state.emit(ce, ArrEventKind::Downsell, ce.signed_delta())
        }
      },
    }
  }

  fn start_transition(
    &self,
    state: &ClassifierState,
    ce: &ContractEvent,
  ) -> Result<StartTransition> {
    let Some(prev) = state.last() else {
      return Ok(StartTransition::New);
    };

    if prev.kind == ArrEventKind::Churn {
      if !state.current_arr.is_zero() {
        return Err(Error::ChurnWithLiveArr {
          arr:   state.current_arr,
          event: ce.clone(),
        });
      }
      return Ok(if self.is_continuous(prev, ce) {
        StartTransition::Renewal
      } else {
        StartTransition::New
      });
    }

    if state.current_arr <= Decimal::ZERO {
      return Err(Error::NoLiveArr {
        arr:   state.current_arr,
        event: ce.clone(),
      });
    }
    Ok(StartTransition::Overlap)
  }

  fn end_transition(
    &self,
    state: &ClassifierState,
    ce: &ContractEvent,
  ) -> Result<EndTransition> {
    let Some(prev) = state.last() else {
      return Err(Error::EndWithoutPriorEvent { event: ce.clone() });
    };
    if state.current_arr.is_zero() {
      return Err(Error::EndWithZeroArr { event: ce.clone() });
    }

    if self.is_continuous(prev, ce) {
      return Ok(EndTransition::EarlyRenewal {
        anchor: prev.contract_event.clone(),
      });
    }

    let projected = state
      .current_arr
      .checked_add(ce.signed_delta())
      .ok_or_else(|| Error::ArrOverflow {
        arr:    state.current_arr,
        change: ce.signed_delta(),
        event:  ce.clone(),
      })?;
    if projected < Decimal::ZERO {
      return Err(Error::ArrWouldGoNegative {
        arr: state.current_arr,
        projected,
        event: ce.clone(),
      });
    }
    if projected.is_zero() {
      return Ok(EndTransition::Churn);
    }
    if ce.signed_delta() < Decimal::ZERO {
      return Ok(EndTransition::Downsell);
    }
    Err(Error::UnclassifiableEnd {
      arr: state.current_arr,
      projected,
      event: ce.clone(),
    })
  }

  fn is_continuous(&self, prev: &ArrEvent, ce: &ContractEvent) -> bool {
    within_days(prev.event_date(), ce.event_date(), self.renewal_gap_days)
  }
}
