use crate::error::{HeatgateError, Result};
use chrono::{DateTime, FixedOffset, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Swedish electricity price area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum PriceZone {
    #[serde(rename = "SE1", alias = "se1")]
    Se1,
    #[serde(rename = "SE2", alias = "se2")]
    Se2,
    #[serde(rename = "SE3", alias = "se3")]
    Se3,
    #[serde(rename = "SE4", alias = "se4")]
    Se4,
}

impl PriceZone {
    pub const ALL: [PriceZone; 4] = [
        PriceZone::Se1,
        PriceZone::Se2,
        PriceZone::Se3,
        PriceZone::Se4,
    ];

    pub fn code(self) -> &'static str {
        match self {
            PriceZone::Se1 => "SE1",
            PriceZone::Se2 => "SE2",
            PriceZone::Se3 => "SE3",
            PriceZone::Se4 => "SE4",
        }
    }
}

impl fmt::Display for PriceZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PriceZone {
    type Err = HeatgateError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        PriceZone::ALL
            .into_iter()
            .find(|z| z.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                HeatgateError::config(format!(
                    "Unknown price zone '{}', expected one of SE1, SE2, SE3, SE4",
                    s
                ))
            })
    }
}

/// One price interval from the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Price in öre/kWh, rounded to two decimals
    pub ore_per_kwh: f64,

    /// Raw price in SEK/kWh
    pub sek_per_kwh: f64,

    /// Start of validity (inclusive)
    pub valid_from: DateTime<FixedOffset>,

    /// End of validity (exclusive)
    pub valid_until: DateTime<FixedOffset>,
}

impl PricePoint {
    pub fn from_sek(
        sek_per_kwh: f64,
        valid_from: DateTime<FixedOffset>,
        valid_until: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            ore_per_kwh: (sek_per_kwh * 10_000.0).round() / 100.0,
            sek_per_kwh,
            valid_from,
            valid_until,
        }
    }

    pub fn covers(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && now < self.valid_until
    }
}

/// Entry as published by elprisetjustnu.se
#[derive(Debug, Clone, Deserialize)]
pub struct FeedEntry {
    #[serde(rename = "SEK_per_kWh")]
    pub sek_per_kwh: f64,
    pub time_start: DateTime<FixedOffset>,
    pub time_end: DateTime<FixedOffset>,
}

impl From<FeedEntry> for PricePoint {
    fn from(e: FeedEntry) -> Self {
        PricePoint::from_sek(e.sek_per_kwh, e.time_start, e.time_end)
    }
}
