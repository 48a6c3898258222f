use crate::config::PriceConfig;
use crate::error::{HeatgateError, Result};
use crate::logging::{LogContext, get_logger_with_context};
use crate::price::types::{FeedEntry, PricePoint, PriceZone};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use reqwest::header::{ACCEPT, USER_AGENT};
use std::time::Duration;
use tokio::sync::Mutex;

/// Anything that can tell the price valid at a given instant
#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    /// Price point covering `now`
    async fn current_price(&self, now: DateTime<Utc>) -> Result<PricePoint>;

    /// Configured zone, for display
    fn zone(&self) -> PriceZone;
}

/// elprisetjustnu.se client with a per-day cache
pub struct ElprisClient {
    http: reqwest::Client,
    api_base: String,
    zone: PriceZone,
    timezone: Tz,
    logger: crate::logging::StructuredLogger,
    cached_day: Mutex<Option<(NaiveDate, Vec<PricePoint>)>>,
}

impl ElprisClient {
    /// Create new price client
    pub fn new(cfg: &PriceConfig) -> Result<Self> {
        let timezone: Tz = cfg.timezone.parse().map_err(|_| {
            HeatgateError::validation("price.timezone", format!("Unknown timezone '{}'", cfg.timezone))
        })?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds.max(1)))
            .build()
            .map_err(|e| HeatgateError::config(format!("HTTP client init failed: {}", e)))?;
        let logger = get_logger_with_context(
            LogContext::new("price").with_field("zone", cfg.zone.to_string()),
        );
        Ok(Self {
            http,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            zone: cfg.zone,
            timezone,
            logger,
            cached_day: Mutex::new(None),
        })
    }

    /// Feed URL for a local calendar day
    pub fn day_url(&self, date: NaiveDate) -> String {
        day_url(&self.api_base, self.zone, date)
    }

    /// Local calendar day of `now` in the configured timezone
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    /// Download all price points for one day
    pub async fn fetch_day(&self, date: NaiveDate) -> Result<Vec<PricePoint>> {
        let url = self.day_url(date);
        self.logger.debug(&format!("Fetching price from: {}", url));

        let resp = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("heatgate/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| HeatgateError::fetch(format!("Price request failed: {}", e)))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(HeatgateError::fetch(format!(
                "No prices published for {} in {}",
                date, self.zone
            )));
        }
        if !status.is_success() {
            return Err(HeatgateError::fetch(format!(
                "Price API returned HTTP {}",
                status
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| HeatgateError::fetch(format!("Reading price response failed: {}", e)))?;
        parse_day(&body)
    }
}

#[async_trait::async_trait]
impl PriceSource for ElprisClient {
    async fn current_price(&self, now: DateTime<Utc>) -> Result<PricePoint> {
        let date = self.local_date(now);
        let mut cache = self.cached_day.lock().await;

        if let Some((cached_date, points)) = cache.as_ref()
            && *cached_date == date
            && let Some(p) = select_current(points, now)
        {
            return Ok(p.clone());
        }

        let points = self.fetch_day(date).await?;
        let current = select_current(&points, now).cloned().ok_or_else(|| {
            HeatgateError::fetch(format!(
                "No price data covering {}",
                now.with_timezone(&self.timezone).format("%Y-%m-%d %H:%M")
            ))
        })?;
        self.logger.info(&format!(
            "Current price: {:.2} öre/kWh ({} entries for {})",
            current.ore_per_kwh,
            points.len(),
            date
        ));
        *cache = Some((date, points));
        Ok(current)
    }

    fn zone(&self) -> PriceZone {
        self.zone
    }
}

/// `{base}/{YYYY}/{MM}-{DD}_{ZONE}.json`
pub fn day_url(api_base: &str, zone: PriceZone, date: NaiveDate) -> String {
    format!(
        "{}/{}/{:02}-{:02}_{}.json",
        api_base.trim_end_matches('/'),
        date.year(),
        date.month(),
        date.day(),
        zone.code()
    )
}

/// Parse a day document into price points sorted by start time
pub fn parse_day(body: &str) -> Result<Vec<PricePoint>> {
    let entries: Vec<FeedEntry> = serde_json::from_str(body)
        .map_err(|e| HeatgateError::fetch(format!("Malformed price response: {}", e)))?;
    if entries.is_empty() {
        return Err(HeatgateError::fetch("Price response contained no entries"));
    }
    let mut points: Vec<PricePoint> = entries.into_iter().map(PricePoint::from).collect();
    points.sort_by_key(|p| p.valid_from);
    Ok(points)
}

/// Point whose interval contains `now`
pub fn select_current(points: &[PricePoint], now: DateTime<Utc>) -> Option<&PricePoint> {
    points.iter().find(|p| p.covers(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"[
        {"SEK_per_kWh":0.41234,"EUR_per_kWh":0.0361,"EXR":11.42,"time_start":"2024-01-15T01:00:00+01:00","time_end":"2024-01-15T02:00:00+01:00"},
        {"SEK_per_kWh":0.38,"EUR_per_kWh":0.0333,"EXR":11.42,"time_start":"2024-01-15T00:00:00+01:00","time_end":"2024-01-15T01:00:00+01:00"}
    ]"#;

    #[test]
    fn url_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            day_url("https://www.elprisetjustnu.se/api/v1/prices/", PriceZone::Se3, date),
            "https://www.elprisetjustnu.se/api/v1/prices/2024/03-07_SE3.json"
        );
    }

    #[test]
    fn parse_sorts_and_converts_to_ore() {
        let points = parse_day(SAMPLE).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].ore_per_kwh, 38.0);
        assert_eq!(points[1].ore_per_kwh, 41.23);
    }

    #[test]
    fn select_by_interval() {
        let points = parse_day(SAMPLE).unwrap();
        // 00:30 UTC == 01:30 CET
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 0, 30, 0).unwrap();
        let p = select_current(&points, now).unwrap();
        assert_eq!(p.ore_per_kwh, 41.23);

        let end = Utc.with_ymd_and_hms(2024, 1, 15, 1, 0, 0).unwrap();
        assert!(select_current(&points, end).is_none());
    }

    #[test]
    fn malformed_and_empty_are_fetch_errors() {
        assert!(matches!(
            parse_day("{\"oops\":1}"),
            Err(HeatgateError::Fetch { .. })
        ));
        assert!(matches!(parse_day("[]"), Err(HeatgateError::Fetch { .. })));
    }

    #[test]
    fn local_date_follows_timezone() {
        let client = ElprisClient::new(&PriceConfig::default()).unwrap();
        // 23:30 UTC on Jan 14 is already Jan 15 in Stockholm
        let now = Utc.with_ymd_and_hms(2024, 1, 14, 23, 30, 0).unwrap();
        assert_eq!(
            client.local_date(now),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
    }
}
