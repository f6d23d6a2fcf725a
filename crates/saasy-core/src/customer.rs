//! Customers: one independent ARR pipeline per customer id.

use std::{
  collections::{BTreeMap, btree_map},
  sync::Arc,
};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::{
  Error, Result,
  arr_event::ArrEventStream,
  contract::Contract,
  contract_event::ContractEventStream,
  dateutils::DateRange,
  settings::ArrSettings,
  timeline::ArrIntervalTimeline,
};

// ─── Customer ────────────────────────────────────────────────────────────────

/// A customer's contracts and everything derived from them.
#[derive(Debug, Clone)]
pub struct Customer {
  customer_id:     String,
  contracts:       Vec<Arc<Contract>>,
  contract_events: ContractEventStream,
  arr_events:      ArrEventStream,
  timeline:        ArrIntervalTimeline,
}

impl Customer {
  /// Build from the contracts of a single customer with default settings.
  pub fn new(
    customer_id: impl Into<String>,
    contracts: Vec<Contract>,
  ) -> Result<Self> {
    Self::with_settings(customer_id, contracts, &ArrSettings::default())
  }

  pub fn with_settings(
    customer_id: impl Into<String>,
    contracts: Vec<Contract>,
    settings: &ArrSettings,
  ) -> Result<Self> {
    let customer_id = customer_id.into();
    let contracts: Vec<Arc<Contract>> =
      contracts.into_iter().map(Arc::new).collect();
    let contract_events =
      ContractEventStream::from_shared(contracts.iter().cloned());
    let arr_events = ArrEventStream::with_settings(&contract_events, settings)?;
    let timeline = ArrIntervalTimeline::new(&arr_events)?;

    debug!(
      customer = %customer_id,
      contracts = contracts.len(),
      arr_events = arr_events.len(),
      intervals = timeline.len(),
      "built customer ARR timeline"
    );

    Ok(Self {
      customer_id,
      contracts,
      contract_events,
      arr_events,
      timeline,
    })
  }

  pub fn customer_id(&self) -> &str { &self.customer_id }

  pub fn contracts(&self) -> impl Iterator<Item = &Contract> {
    self.contracts.iter().map(Arc::as_ref)
  }

  pub fn contract_events(&self) -> &ContractEventStream { &self.contract_events }

  pub fn arr_events(&self) -> &ArrEventStream { &self.arr_events }

  pub fn timeline(&self) -> &ArrIntervalTimeline { &self.timeline }

  pub fn arr_at(&self, date: NaiveDate) -> Decimal { self.timeline.arr_at(date) }
}

// ─── CustomerMap ─────────────────────────────────────────────────────────────

/// Every customer in a contract set, keyed and ordered by customer id.
#[derive(Debug, Clone, Default)]
pub struct CustomerMap {
  customers: BTreeMap<String, Customer>,
}

impl CustomerMap {
  pub fn new<I>(contracts: I) -> Result<Self>
  where
    I: IntoIterator<Item = Contract>,
  {
    Self::with_settings(contracts, &ArrSettings::default())
  }

  /// Group `contracts` by customer id and build each customer. The first
  /// customer that fails classification fails the whole map.
  pub fn with_settings<I>(contracts: I, settings: &ArrSettings) -> Result<Self>
  where
    I: IntoIterator<Item = Contract>,
  {
    let mut grouped: BTreeMap<String, Vec<Contract>> = BTreeMap::new();
    for contract in contracts {
      grouped
        .entry(contract.customer_id().to_string())
        .or_default()
        .push(contract);
    }

    let customers = grouped
      .into_iter()
      .map(|(id, contracts)| {
        let customer = Customer::with_settings(id.clone(), contracts, settings)?;
        Ok((id, customer))
      })
      .collect::<Result<BTreeMap<_, _>>>()?;

    debug!(customers = customers.len(), "built customer map");
    Ok(Self { customers })
  }

  pub fn get(&self, customer_id: &str) -> Option<&Customer> {
    self.customers.get(customer_id)
  }

  pub fn contains(&self, customer_id: &str) -> bool {
    self.customers.contains_key(customer_id)
  }

  pub fn len(&self) -> usize { self.customers.len() }

  pub fn is_empty(&self) -> bool { self.customers.is_empty() }

  pub fn iter(&self) -> btree_map::Values<'_, String, Customer> {
    self.customers.values()
  }

  pub fn customer_ids(&self) -> impl Iterator<Item = &str> {
    self.customers.keys().map(String::as_str)
  }

  /// Every contract of every customer.
  pub fn contracts(&self) -> impl Iterator<Item = &Contract> {
    self.customers.values().flat_map(Customer::contracts)
  }

  /// Earliest start and latest end over all contracts.
  pub fn date_range(&self) -> Option<DateRange> {
    self.contracts().fold(None, |range, c| {
      Some(match range {
        None => DateRange { min: c.start_date(), max: c.end_date() },
        Some(DateRange { min, max }) => DateRange {
          min: min.min(c.start_date()),
          max: max.max(c.end_date()),
        },
      })
    })
  }

  /// Total ARR over all customers on `date`.
  pub fn arr_at(&self, date: NaiveDate) -> Result<Decimal> {
    self
      .customers
      .values()
      .try_fold(Decimal::ZERO, |total, c| total.checked_add(c.arr_at(date)))
      .ok_or(Error::TotalArrOverflow { date })
  }
}

impl<'a> IntoIterator for &'a CustomerMap {
  type IntoIter = btree_map::Values<'a, String, Customer>;
  type Item = &'a Customer;

  fn into_iter(self) -> Self::IntoIter { self.customers.values() }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  fn contract(customer: &str, start: &str, end: &str, tcv: i64) -> Contract {
    Contract::new(
      customer,
      NaiveDate::from_str(start).unwrap(),
      NaiveDate::from_str(end).unwrap(),
      Decimal::from(tcv),
    )
    .unwrap()
  }

  fn d(s: &str) -> NaiveDate { NaiveDate::from_str(s).unwrap() }

  #[test]
  fn groups_contracts_by_customer() {
    let map = CustomerMap::new([
      contract("b", "2020-01-01", "2020-12-31", 100),
      contract("a", "2020-03-01", "2021-02-28", 50),
      contract("b", "2021-01-01", "2021-12-31", 100),
    ])
    .unwrap();

    assert_eq!(map.len(), 2);
    assert_eq!(map.customer_ids().collect::<Vec<_>>(), ["a", "b"]);
    assert_eq!(map.get("b").unwrap().contracts().count(), 2);
    assert_eq!(map.contracts().count(), 3);
    assert!(map.contains("a"));
    assert!(!map.contains("c"));
  }

  #[test]
  fn arr_at_sums_customers() {
    let map = CustomerMap::new([
      contract("a", "2020-01-01", "2020-12-31", 100),
      contract("b", "2020-06-01", "2021-05-31", 40),
    ])
    .unwrap();

    assert_eq!(map.arr_at(d("2019-12-31")).unwrap(), Decimal::ZERO);
    assert_eq!(map.arr_at(d("2020-03-01")).unwrap(), Decimal::from(100));
    assert_eq!(map.arr_at(d("2020-07-01")).unwrap(), Decimal::from(140));
    assert_eq!(map.arr_at(d("2020-12-31")).unwrap(), Decimal::from(140));
    assert_eq!(map.arr_at(d("2021-01-01")).unwrap(), Decimal::from(40));
    assert_eq!(map.arr_at(d("2021-06-01")).unwrap(), Decimal::ZERO);
  }

  #[test]
  fn arr_total_overflow_is_an_error() {
    let huge = |customer: &str| {
      Contract::new(customer, d("2020-01-01"), d("2020-12-31"), Decimal::MAX)
        .unwrap()
    };
    let map = CustomerMap::new([huge("a"), huge("b")]).unwrap();

    assert_eq!(map.get("a").unwrap().arr_at(d("2020-06-01")), Decimal::MAX);
    let err = map.arr_at(d("2020-06-01")).unwrap_err();
    assert!(matches!(err, Error::TotalArrOverflow { .. }), "{err:?}");
    assert_eq!(map.arr_at(d("2021-06-01")).unwrap(), Decimal::ZERO);
  }

  #[test]
  fn date_range_spans_all_contracts() {
    let map = CustomerMap::new([
      contract("a", "2020-03-01", "2021-02-28", 100),
      contract("b", "2019-06-01", "2020-05-31", 40),
    ])
    .unwrap();
    assert_eq!(
      map.date_range(),
      Some(DateRange { min: d("2019-06-01"), max: d("2021-02-28") })
    );
  }

  #[test]
  fn empty_map() {
    let map = CustomerMap::new(Vec::new()).unwrap();
    assert!(map.is_empty());
    assert_eq!(map.date_range(), None);
    assert_eq!(map.arr_at(d("2020-01-01")).unwrap(), Decimal::ZERO);
  }
}
