//! Core ARR engine for the Saasy revenue toolkit.
//!
//! Turns subscription contracts into a classified stream of ARR movements
//! and a piecewise-constant ARR timeline:
//!
//! ```text
//! Contracts ─▶ ContractEventStream ─▶ ArrEventStream ─▶ ArrIntervalTimeline
//! ```
//!
//! This crate is pure and synchronous: no I/O, no shared state. Each
//! customer's contracts are processed independently.

pub mod arr_event;
pub mod contract;
pub mod contract_event;
pub mod customer;
pub mod dateutils;
pub mod error;
pub mod settings;
pub mod snowball;
pub mod timeline;

pub use arr_event::{ArrEvent, ArrEventKind, ArrEventStream};
pub use contract::{Contract, ContractRecord};
pub use contract_event::{ContractEvent, ContractEventKind, ContractEventStream};
pub use customer::{Customer, CustomerMap};
pub use error::{Error, Result};
pub use settings::ArrSettings;
pub use snowball::{ArrSnowball, SnowballPeriod};
pub use timeline::{ArrInterval, ArrIntervalTimeline, BoundKind, Endpoint};
