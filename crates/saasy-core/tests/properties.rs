//! Property tests over generated contract sets.
//!
//! Most properties run over chains of one customer's non-overlapping
//! contracts, separated by gaps that fall on either side of the renewal
//! tolerance. Durations range well beyond a year either way, so ACVs are
//! usually non-terminating fractions of the TCV.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use saasy_core::{
  ArrEvent, ArrEventKind, ArrEventStream, ArrIntervalTimeline, BoundKind,
  Contract, ContractEventKind, ContractEventStream, Endpoint,
  contract_event::chronological, dateutils::add_days, timeline::Boundary,
};

fn base() -> NaiveDate { NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() }

/// `(duration_days, gap_days_before, tcv)` per contract.
fn chain() -> impl Strategy<Value = Vec<(i64, i64, i64)>> {
  prop::collection::vec((200i64..=800, 0i64..=40, 1i64..=1000), 1..8)
}

/// `(first_days, offset_days, overhang_days, first_tcv, second_tcv)`: the
/// second contract starts `offset_days` into the first and ends
/// `overhang_days` after it.
fn overlap() -> impl Strategy<Value = (i64, i64, i64, i64, i64)> {
  (300i64..=800, 20i64..=150, 11i64..=400, 1i64..=1000, 1i64..=1000)
}

fn contracts(links: &[(i64, i64, i64)]) -> Vec<Contract> {
  let mut out = Vec::with_capacity(links.len());
  let mut cursor = base();
  for &(duration, gap, tcv) in links {
    let start = add_days(cursor, gap).unwrap();
    let end = add_days(start, duration).unwrap();
    out.push(Contract::new("c", start, end, Decimal::from(tcv)).unwrap());
    cursor = end;
  }
  out
}

fn pipeline(
  links: &[(i64, i64, i64)],
) -> (ContractEventStream, ArrEventStream, ArrIntervalTimeline) {
  let ces = ContractEventStream::new(contracts(links));
  let aes = ArrEventStream::new(&ces).unwrap();
  let timeline = ArrIntervalTimeline::new(&aes).unwrap();
  (ces, aes, timeline)
}

proptest! {
  // ─── Contract events ───────────────────────────────────────────────────────

  #[test]
  fn contract_events_are_chronological(links in chain()) {
    let ces = ContractEventStream::new(contracts(&links));
    prop_assert_eq!(ces.len(), links.len() * 2);
    for pair in ces.as_slice().windows(2) {
      prop_assert_ne!(chronological(&pair[0], &pair[1]), std::cmp::Ordering::Greater);
    }
  }

  // ─── Classification ────────────────────────────────────────────────────────

  #[test]
  fn chains_classify_and_wind_down_to_zero(links in chain()) {
    let ces = ContractEventStream::new(contracts(&links));
    let aes = ArrEventStream::new(&ces);
    prop_assert!(aes.is_ok(), "{:?}", aes);
    let aes = aes.unwrap();

    let sum: Decimal = aes.iter().map(ArrEvent::arr_change).sum();
    prop_assert_eq!(aes.final_arr(), sum);
    prop_assert!(aes.final_arr().is_zero());
    prop_assert_eq!(aes.last().map(ArrEvent::kind), Some(ArrEventKind::Churn));
  }

  #[test]
  fn running_arr_never_goes_negative(links in chain()) {
    let (_, aes, _) = pipeline(&links);
    let mut running = Decimal::ZERO;
    for event in &aes {
      running += event.arr_change();
      prop_assert!(running >= Decimal::ZERO, "{} after {:?}", running, event);
    }
  }

  #[test]
  fn gaps_decide_renewal_or_new(links in chain()) {
    let (_, aes, _) = pipeline(&links);
    let news = aes.iter().filter(|e| e.kind() == ArrEventKind::New).count();
    let renewals = aes.iter().filter(|e| e.kind() == ArrEventKind::Renewal).count();
    let long_gaps = links.iter().skip(1).filter(|&&(_, gap, _)| gap > 10).count();
    prop_assert_eq!(news, 1 + long_gaps);
    prop_assert_eq!(renewals, links.len() - 1 - long_gaps);
  }

  // ─── Timeline ──────────────────────────────────────────────────────────────

  #[test]
  fn timeline_partitions_the_date_line(links in chain()) {
    let (_, _, timeline) = pipeline(&links);
    let first = &timeline[0];
    let last = &timeline[timeline.len() - 1];
    prop_assert_eq!(first.lower, Endpoint::NegInfinity);
    prop_assert_eq!(first.lower_bound, BoundKind::Open);
    prop_assert!(first.arr.is_zero());
    prop_assert_eq!(last.upper, Endpoint::PosInfinity);
    prop_assert_eq!(last.upper_bound, BoundKind::Open);
    prop_assert!(last.arr.is_zero());

    for pair in timeline.as_slice().windows(2) {
      prop_assert_eq!(pair[0].upper, pair[1].lower);
      prop_assert_ne!(pair[0].upper_bound, pair[1].lower_bound);
      prop_assert_ne!(pair[0].arr, pair[1].arr);
    }
  }

  #[test]
  fn timeline_reports_each_contract_value(links in chain()) {
    let (_, _, timeline) = pipeline(&links);
    for contract in contracts(&links) {
      let inside = add_days(contract.start_date(), 100).unwrap();
      prop_assert_eq!(timeline.arr_at(inside), contract.acv());
    }
  }

  #[test]
  fn boundaries_are_net_changes(links in chain()) {
    let (_, aes, timeline) = pipeline(&links);

    // Starts land before ends on a shared date.
    let mut net: BTreeMap<(NaiveDate, u8), Decimal> = BTreeMap::new();
    for event in &aes {
      let rank = match event.contract_event().kind() {
        ContractEventKind::Start => 0,
        ContractEventKind::End => 1,
      };
      *net.entry((event.event_date(), rank)).or_default() += event.arr_change();
    }
    let expected: Vec<Boundary> = net
      .into_iter()
      .filter(|(_, delta)| !delta.is_zero())
      .map(|((date, rank), delta)| Boundary {
        date,
        kind: if rank == 0 { ContractEventKind::Start } else { ContractEventKind::End },
        delta,
      })
      .collect();

    prop_assert_eq!(timeline.boundaries(), expected);
  }

  // ─── Overlaps ──────────────────────────────────────────────────────────────

  #[test]
  fn overlapping_pair_ends_in_churn_at_zero(
    (first_days, offset, overhang, first_tcv, second_tcv) in overlap()
  ) {
    let first_start = base();
    let first_end = add_days(first_start, first_days).unwrap();
    let second_start = add_days(first_start, offset).unwrap();
    let second_end = add_days(first_end, overhang).unwrap();
    let ces = ContractEventStream::new(vec![
      Contract::new("c", first_start, first_end, Decimal::from(first_tcv)).unwrap(),
      Contract::new("c", second_start, second_end, Decimal::from(second_tcv)).unwrap(),
    ]);
    let aes = ArrEventStream::new(&ces).unwrap();

    let kinds: Vec<_> = aes.iter().map(ArrEvent::kind).collect();
    prop_assert_eq!(
      kinds,
      [ArrEventKind::New, ArrEventKind::Expansion, ArrEventKind::Downsell, ArrEventKind::Churn]
    );
    prop_assert!(aes.final_arr().is_zero());

    let timeline = ArrIntervalTimeline::new(&aes).unwrap();
    prop_assert!(timeline[timeline.len() - 1].arr.is_zero());
    prop_assert_eq!(timeline.arr_at(second_end), ces[3].contract().acv());
  }
}
