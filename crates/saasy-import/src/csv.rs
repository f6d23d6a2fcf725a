//! CSV contract-record parser.
//!
//! Pipeline:
//!   raw &str
//!     └─ numbered, non-blank lines
//!          └─ split_fields()     → Vec<String>
//!               ├─ first line:  Header::from_fields() → column positions
//!               └─ other lines: Header::record()      → ContractRecord
//!
//! Quoted fields may contain commas and `""` escapes but not line breaks.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use saasy_core::ContractRecord;

use crate::error::{Error, Result};

const CUSTOMER_ID: &str = "customer_id";
const START_DATE: &str = "start_date";
const END_DATE: &str = "end_date";
const TCV: &str = "tcv";

/// Accepted date layouts, tried in order.
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

// ─── Field splitting ─────────────────────────────────────────────────────────

/// Split one line on commas outside double quotes. Surrounding whitespace is
/// trimmed from unquoted fields only.
fn split_fields(line: &str, line_no: usize) -> Result<Vec<String>> {
  let mut fields = Vec::new();
  let mut field = String::new();
  let mut quoted = false;
  let mut in_quotes = false;
  let mut chars = line.chars().peekable();

  while let Some(c) = chars.next() {
    match c {
      '"' if in_quotes => {
        if chars.peek() == Some(&'"') {
          chars.next();
          field.push('"');
        } else {
          in_quotes = false;
        }
      }
      '"' if field.trim().is_empty() && !quoted => {
        field.clear();
        quoted = true;
        in_quotes = true;
      }
      ',' if !in_quotes => {
        fields.push(finish_field(&mut field, quoted));
        quoted = false;
      }
      _ if quoted && !in_quotes => {
        if !c.is_whitespace() {
          return Err(Error::MalformedRow {
            line:   line_no,
            reason: format!("unexpected {c:?} after closing quote"),
          });
        }
      }
      _ => field.push(c),
    }
  }

  if in_quotes {
    return Err(Error::MalformedRow {
      line:   line_no,
      reason: "unterminated quoted field".to_string(),
    });
  }
  fields.push(finish_field(&mut field, quoted));
  Ok(fields)
}

fn finish_field(field: &mut String, quoted: bool) -> String {
  let value = std::mem::take(field);
  if quoted { value } else { value.trim().to_string() }
}

// ─── Header ──────────────────────────────────────────────────────────────────

/// Column positions of the four contract fields. Other columns are ignored.
#[derive(Debug, PartialEq, Eq)]
struct Header {
  customer_id: usize,
  start_date:  usize,
  end_date:    usize,
  tcv:         usize,
  width:       usize,
}

impl Header {
  fn from_fields(fields: &[String], line_no: usize) -> Result<Self> {
    let find = |name: &str| -> Result<usize> {
      let mut matches = fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.trim().eq_ignore_ascii_case(name))
        .map(|(i, _)| i);
      let first = matches.next().ok_or_else(|| Error::MalformedHeader {
        line:   line_no,
        reason: format!("missing column {name:?}"),
      })?;
      if matches.next().is_some() {
        return Err(Error::MalformedHeader {
          line:   line_no,
          reason: format!("duplicate column {name:?}"),
        });
      }
      Ok(first)
    };

    Ok(Self {
      customer_id: find(CUSTOMER_ID)?,
      start_date:  find(START_DATE)?,
      end_date:    find(END_DATE)?,
      tcv:         find(TCV)?,
      width:       fields.len(),
    })
  }

  fn record(&self, fields: &[String], line_no: usize) -> Result<ContractRecord> {
    if fields.len() != self.width {
      return Err(Error::MalformedRow {
        line:   line_no,
        reason: format!(
          "expected {} fields, found {}",
          self.width,
          fields.len()
        ),
      });
    }

    let customer_id = fields[self.customer_id].clone();
    if customer_id.is_empty() {
      return Err(Error::MalformedRow {
        line:   line_no,
        reason: format!("empty {CUSTOMER_ID}"),
      });
    }

    Ok(ContractRecord {
      customer_id,
      start_date: parse_date(&fields[self.start_date], START_DATE, line_no)?,
      end_date: parse_date(&fields[self.end_date], END_DATE, line_no)?,
      tcv: parse_decimal(&fields[self.tcv], TCV, line_no)?,
    })
  }
}

// ─── Scalars ─────────────────────────────────────────────────────────────────

fn parse_date(value: &str, column: &'static str, line_no: usize) -> Result<NaiveDate> {
  let trimmed = value.trim();
  DATE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
    .ok_or_else(|| Error::InvalidDate {
      line: line_no,
      column,
      value: value.to_string(),
    })
}

fn parse_decimal(value: &str, column: &'static str, line_no: usize) -> Result<Decimal> {
  let trimmed = value.trim();
  Decimal::from_str(trimmed)
    .or_else(|_| Decimal::from_scientific(trimmed))
    .map_err(|_| Error::InvalidDecimal {
      line: line_no,
      column,
      value: value.to_string(),
    })
}

// ─── Entry point ─────────────────────────────────────────────────────────────

pub(crate) fn parse(input: &str) -> Result<Vec<ContractRecord>> {
  let input = input.strip_prefix('\u{feff}').unwrap_or(input);
  let mut lines = input
    .lines()
    .enumerate()
    .map(|(i, line)| (i + 1, line))
    .filter(|(_, line)| !line.trim().is_empty());

  let Some((header_line, header)) = lines.next() else {
    return Ok(Vec::new());
  };
  let header = Header::from_fields(&split_fields(header, header_line)?, header_line)?;

  lines
    .map(|(line_no, line)| header.record(&split_fields(line, line_no)?, line_no))
    .collect()
}
