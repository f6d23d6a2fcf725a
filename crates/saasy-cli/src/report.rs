//! Report rows and their text / JSON rendering.

use anyhow::{Context as _, Result, anyhow};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use saasy_core::{
  ArrEventKind, ArrInterval, ArrSnowball, ContractEventKind, Customer,
};
use serde::Serialize;

use crate::OutputFormat;

// ─── Rows ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRow {
  pub customer_id:    String,
  pub date:           NaiveDate,
  pub kind:           ArrEventKind,
  pub arr_change:     Decimal,
  /// Which side of the originating contract produced the event.
  pub contract_event: ContractEventKind,
  pub contract_start: NaiveDate,
  pub contract_end:   NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerTimeline {
  pub customer_id: String,
  pub intervals:   Vec<ArrInterval>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerArr {
  pub customer_id: String,
  pub arr:         Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrOnDate {
  pub date:      NaiveDate,
  pub customers: Vec<CustomerArr>,
  pub total:     Decimal,
}

// ─── Report ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Report {
  Events(Vec<EventRow>),
  Timeline(Vec<CustomerTimeline>),
  Snowball(ArrSnowball),
  Arr(ArrOnDate),
}

impl Report {
  pub fn events(customers: &[&Customer]) -> Self {
    let rows = customers
      .iter()
      .flat_map(|customer| {
        customer.arr_events().iter().map(|event| {
          let contract = event.contract_event().contract();
          EventRow {
            customer_id:    customer.customer_id().to_string(),
            date:           event.event_date(),
            kind:           event.kind(),
            arr_change:     event.arr_change(),
            contract_event: event.contract_event().kind(),
            contract_start: contract.start_date(),
            contract_end:   contract.end_date(),
          }
        })
      })
      .collect();
    Self::Events(rows)
  }

  pub fn timeline(customers: &[&Customer]) -> Self {
    let rows = customers
      .iter()
      .map(|customer| CustomerTimeline {
        customer_id: customer.customer_id().to_string(),
        intervals:   customer.timeline().iter().copied().collect(),
      })
      .collect();
    Self::Timeline(rows)
  }

  pub fn arr(date: NaiveDate, customers: &[&Customer]) -> Result<Self> {
    let customers: Vec<CustomerArr> = customers
      .iter()
      .map(|customer| CustomerArr {
        customer_id: customer.customer_id().to_string(),
        arr:         customer.arr_at(date),
      })
      .collect();
    let total = customers
      .iter()
      .try_fold(Decimal::ZERO, |total, c| total.checked_add(c.arr))
      .ok_or_else(|| anyhow!("total ARR on {date} overflows"))?;
    Ok(Self::Arr(ArrOnDate { date, customers, total }))
  }

  pub fn render(&self, format: OutputFormat) -> Result<String> {
    match format {
      OutputFormat::Json => {
        serde_json::to_string_pretty(self).context("failed to serialise report")
      }
      OutputFormat::Text => Ok(self.to_text()),
    }
  }

  fn to_text(&self) -> String {
    match self {
      Self::Events(rows) => events_text(rows),
      Self::Timeline(rows) => timeline_text(rows),
      Self::Snowball(snowball) => snowball_text(snowball),
      Self::Arr(arr) => arr_text(arr),
    }
  }
}

// ─── Text layouts ─────────────────────────────────────────────────────────────

fn events_text(rows: &[EventRow]) -> String {
  let id_width = column_width("customer", rows.iter().map(|r| r.customer_id.len()));
  let mut lines = vec![format!(
    "{:<id_width$}  {:<10}  {:<9}  {:>12}  contract",
    "customer", "date", "kind", "arr_change"
  )];
  lines.extend(rows.iter().map(|row| {
    format!(
      "{:<id_width$}  {}  {:<9}  {:>12}  {} {}..{}",
      row.customer_id,
      row.date,
      row.kind,
      row.arr_change,
      row.contract_event,
      row.contract_start,
      row.contract_end,
    )
  }));
  lines.join("\n")
}

fn timeline_text(rows: &[CustomerTimeline]) -> String {
  let mut lines = Vec::new();
  for row in rows {
    lines.push(format!("{}:", row.customer_id));
    lines.extend(row.intervals.iter().map(|interval| format!("  {interval}")));
  }
  lines.join("\n")
}

/// Periods as columns, movements as rows.
fn snowball_text(snowball: &ArrSnowball) -> String {
  const LABELS: [&str; 6] =
    ["Starting ARR", "New", "Expansion", "Downsell", "Churn", "Ending ARR"];

  let columns: Vec<(String, [String; 6])> = snowball
    .periods
    .iter()
    .map(|p| {
      let values = [
        p.starting_arr,
        p.new,
        p.expansion,
        p.downsell,
        p.churn,
        p.ending_arr,
      ]
      .map(|v| v.normalize().to_string());
      (p.period.label.clone(), values)
    })
    .collect();

  let label_width = column_width("", LABELS.iter().map(|l| l.len()));
  let widths: Vec<usize> = columns
    .iter()
    .map(|(label, values)| {
      column_width(label, values.iter().map(String::len))
    })
    .collect();

  let mut header = format!("{:<label_width$}", "");
  for ((label, _), width) in columns.iter().zip(widths.iter().copied()) {
    header.push_str(&format!("  {label:>width$}"));
  }
  let mut lines = vec![header];
  for (i, name) in LABELS.iter().enumerate() {
    let mut line = format!("{name:<label_width$}");
    for ((_, values), width) in columns.iter().zip(widths.iter().copied()) {
      line.push_str(&format!("  {:>width$}", values[i]));
    }
    lines.push(line);
  }
  lines.join("\n")
}

fn arr_text(arr: &ArrOnDate) -> String {
  let id_width = column_width("total", arr.customers.iter().map(|c| c.customer_id.len()));
  let mut lines = vec![format!("ARR on {}", arr.date)];
  lines.extend(arr.customers.iter().map(|customer| {
    format!("{:<id_width$}  {:>12}", customer.customer_id, customer.arr)
  }));
  lines.push(format!("{:<id_width$}  {:>12}", "total", arr.total));
  lines.join("\n")
}

fn column_width(header: &str, cells: impl Iterator<Item = usize>) -> usize {
  cells.fold(header.len(), usize::max)
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use saasy_core::{Contract, CustomerMap, dateutils::Periodicity};

  use super::*;

  fn d(s: &str) -> NaiveDate { NaiveDate::from_str(s).unwrap() }

  fn customers() -> CustomerMap {
    let contract = |id: &str, start: &str, end: &str, tcv: i64| {
      Contract::new(id, d(start), d(end), Decimal::from(tcv)).unwrap()
    };
    CustomerMap::new([
      contract("acme", "2020-01-01", "2020-12-31", 100),
      contract("acme", "2021-01-01", "2021-12-31", 150),
      contract("globex", "2020-07-01", "2021-06-30", 40),
    ])
    .unwrap()
  }

  #[test]
  fn event_rows_follow_customer_order() {
    let map = customers();
    let all: Vec<_> = map.iter().collect();
    let Report::Events(rows) = Report::events(&all) else {
      panic!("expected events report");
    };
    let summary: Vec<_> = rows
      .iter()
      .map(|r| (r.customer_id.as_str(), r.kind))
      .collect();
    assert_eq!(
      summary,
      [
        ("acme", ArrEventKind::New),
        ("acme", ArrEventKind::Renewal),
        ("acme", ArrEventKind::Expansion),
        ("acme", ArrEventKind::Churn),
        ("globex", ArrEventKind::New),
        ("globex", ArrEventKind::Churn),
      ]
    );
    assert_eq!(rows[2].contract_event, ContractEventKind::Start);
    assert_eq!(rows[2].contract_start, d("2021-01-01"));
  }

  #[test]
  fn timeline_text_uses_interval_notation() {
    let map = customers();
    let globex = [map.get("globex").unwrap()];
    let text = Report::timeline(&globex).render(OutputFormat::Text).unwrap();
    assert_eq!(
      text,
      "globex:\n  (-inf, 2020-07-01) 0\n  [2020-07-01, 2021-06-30] 40\n  (2021-06-30, +inf) 0"
    );
  }

  #[test]
  fn arr_report_totals_customers() {
    let map = customers();
    let all: Vec<_> = map.iter().collect();
    let Report::Arr(arr) = Report::arr(d("2021-03-01"), &all).unwrap() else {
      panic!("expected arr report");
    };
    assert_eq!(arr.total, Decimal::from(190));
    assert_eq!(arr.customers[0].arr, Decimal::from(150));
    assert_eq!(arr.customers[1].arr, Decimal::from(40));
  }

  #[test]
  fn arr_text_ends_with_the_total() {
    let map = customers();
    let all: Vec<_> = map.iter().collect();
    let text = Report::arr(d("2021-03-01"), &all)
      .unwrap()
      .render(OutputFormat::Text)
      .unwrap();
    assert_eq!(
      text,
      "ARR on 2021-03-01\nacme             150\nglobex            40\ntotal            190"
    );
  }

  #[test]
  fn arr_report_rejects_an_overflowing_total() {
    let huge = |id: &str| {
      Contract::new(id, d("2020-01-01"), d("2020-12-31"), Decimal::MAX).unwrap()
    };
    let map = CustomerMap::new([huge("acme"), huge("globex")]).unwrap();
    let all: Vec<_> = map.iter().collect();
    assert!(Report::arr(d("2020-06-01"), &all).is_err());
    assert!(Report::arr(d("2021-06-01"), &all).is_ok());
  }

  #[test]
  fn snowball_text_has_a_column_per_period() {
    let snowball = ArrSnowball::new(&customers(), Periodicity::Yearly).unwrap();
    let text = Report::Snowball(snowball).render(OutputFormat::Text).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 7);
    assert!(lines[0].ends_with("2020  2021"), "{text}");
    assert!(lines[1].starts_with("Starting ARR"));
    assert!(lines[6].starts_with("Ending ARR"));
    assert!(lines[6].ends_with("140   150"), "{text}");
  }

  #[test]
  fn json_render_is_an_array_of_rows() {
    let map = customers();
    let acme = [map.get("acme").unwrap()];
    let json = Report::events(&acme).render(OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value.as_array().map(Vec::len), Some(4));
    assert_eq!(value[0]["kind"], "new");
    assert_eq!(value[0]["contract_event"], "start");
    assert_eq!(value[0]["date"], "2020-01-01");
  }
}
