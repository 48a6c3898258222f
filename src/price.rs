//! Electricity spot price integration (elprisetjustnu.se)
//!
//! Fetches the day's price list for the configured zone and selects the
//! interval covering the current instant. Prices are exposed in öre/kWh.

pub mod client;
pub mod types;

pub use client::{ElprisClient, PriceSource, day_url, parse_day, select_current};
pub use types::{PricePoint, PriceZone};
