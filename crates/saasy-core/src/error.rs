//! Error types for `saasy-core`.
//!
//! Configuration errors reject a malformed contract. Invariant violations
//! are raised while classifying an event stream; none of them is
//! recoverable for the stream being built. Overflow errors report ARR sums
//! that do not fit a `Decimal`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{arr_event::ArrEventKind, contract_event::ContractEvent};

#[derive(Debug, Error)]
pub enum Error {
  // ── Configuration ──────────────────────────────────────────────────────
  #[error("contract for {customer_id} ends on {end}, before it starts on {start}")]
  EndBeforeStart {
    customer_id: String,
    start:       NaiveDate,
    end:         NaiveDate,
  },

  #[error(
    "contract for {customer_id} from {start} to {end} rounds to zero years at \
     {decimals} decimal(s)"
  )]
  ZeroDuration {
    customer_id: String,
    start:       NaiveDate,
    end:         NaiveDate,
    decimals:    u32,
  },

  #[error("annualised value of contract for {customer_id} (tcv {tcv}) overflows")]
  AcvOverflow { customer_id: String, tcv: Decimal },

  #[error("date arithmetic out of range at {0}")]
  DateOutOfRange(NaiveDate),

  #[error("unknown periodicity {0:?} (expected monthly, quarterly or yearly)")]
  UnknownPeriodicity(String),

  // ── Invariant violations ───────────────────────────────────────────────
  #[error("running ARR is negative ({arr}) before {event}")]
  NegativeArr { arr: Decimal, event: ContractEvent },

  #[error("previous event was a churn but running ARR is {arr} at {event}")]
  ChurnWithLiveArr { arr: Decimal, event: ContractEvent },

  #[error("running ARR is {arr} without a preceding churn at {event}")]
  NoLiveArr { arr: Decimal, event: ContractEvent },

  #[error("contract end with no previous ARR event: {event}")]
  EndWithoutPriorEvent { event: ContractEvent },

  #[error("contract end while running ARR is zero: {event}")]
  EndWithZeroArr { event: ContractEvent },

  #[error("no ARR event to reverse when renewing at {event}")]
  MissingRenewalAnchor { event: ContractEvent },

  #[error("{event} would take running ARR below zero ({arr} to {projected})")]
  ArrWouldGoNegative {
    arr:       Decimal,
    projected: Decimal,
    event:     ContractEvent,
  },

  #[error("{event} is neither churn nor downsell (running ARR {arr} to {projected})")]
  UnclassifiableEnd {
    arr:       Decimal,
    projected: Decimal,
    event:     ContractEvent,
  },

  // ── Overflow ───────────────────────────────────────────────────────────
  #[error("running ARR {arr} overflows applying {change} at {event}")]
  ArrOverflow {
    arr:    Decimal,
    change: Decimal,
    event:  ContractEvent,
  },

  #[error("timeline level {level} overflows applying {delta} on {date}")]
  TimelineOverflow {
    date:  NaiveDate,
    level: Decimal,
    delta: Decimal,
  },

  #[error("ARR summed over customers overflows on {date}")]
  TotalArrOverflow { date: NaiveDate },

  #[error("{kind} movements in period {period} overflow")]
  MovementOverflow { period: String, kind: ArrEventKind },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
