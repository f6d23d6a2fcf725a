//! Tunable constants of the ARR engine.

use serde::{Deserialize, Serialize};

/// Maximum day-count difference between a contract ending and its successor
/// starting for the two to be treated as continuous.
pub const RENEWAL_GAP_DAYS: u32 = 10;

/// Decimal places kept when rounding a contract's length in years.
pub const DURATION_DECIMALS: u32 = 1;

/// Decimal places kept in a contract's annualised value. A fixed scale keeps
/// every running sum of ACVs exact, so a fully ended set nets to zero.
pub const ACV_DECIMALS: u32 = 10;

/// Knobs shared by contract construction and classification.
///
/// `ArrSettings::default()` reproduces [`RENEWAL_GAP_DAYS`],
/// [`DURATION_DECIMALS`] and [`ACV_DECIMALS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrSettings {
  pub renewal_gap_days:  u32,
  pub duration_decimals: u32,
  pub acv_decimals:      u32,
}

impl Default for ArrSettings {
  fn default() -> Self {
    Self {
      renewal_gap_days:  RENEWAL_GAP_DAYS,
      duration_decimals: DURATION_DECIMALS,
      acv_decimals:      ACV_DECIMALS,
    }
  }
}
