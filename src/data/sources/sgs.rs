//! SGS (Sistema Gerenciador de Séries Temporais) rate source
//!
//! Series endpoint: `{base}/dados/serie/bcdata.sgs.{series}/dados` with
//! `formato=json`, `dataInicial` and `dataFinal` in `DD/MM/YYYY`. The payload
//! is an array of `{"data": "DD/MM/YYYY", "valor": "0.043739"}` objects.

use crate::data::benchmarks::{parse_rate, BenchmarkRate};
use crate::error::{PortfolioError, Result};
use chrono::NaiveDate;
use serde::Deserialize;

#[cfg(feature = "async")]
use crate::types::TradeDate;
#[cfg(feature = "async")]
use reqwest::Client;
#[cfg(feature = "async")]
use std::time::Duration;

pub const SGS_BASE_URL: &str = "https://api.bcb.gov.br";
/// CDI daily rate series
pub const CDI_SERIES: u32 = 12;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const SGS_DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Deserialize)]
struct SgsEntry {
    data: String,
    valor: serde_json::Value,
}

/// Parse an SGS JSON payload into rates sorted by date
pub fn parse_sgs_payload(body: &str) -> Result<Vec<BenchmarkRate>> {
    let entries: Vec<SgsEntry> = serde_json::from_str(body)?;

    let mut rates = entries
        .into_iter()
        .map(|entry| -> Result<BenchmarkRate> {
            let date = NaiveDate::parse_from_str(entry.data.trim(), SGS_DATE_FORMAT).map_err(|e| {
                PortfolioError::ParseError(format!("SGS date {:?}: {}", entry.data, e))
            })?;
            let rate = match &entry.valor {
                serde_json::Value::String(s) => parse_rate(s).map_err(PortfolioError::ParseError)?,
                serde_json::Value::Number(n) => n.as_f64().ok_or_else(|| {
                    PortfolioError::ParseError(format!("SGS value {} out of range", n))
                })?,
                other => {
                    return Err(PortfolioError::ParseError(format!(
                        "unexpected SGS value {}",
                        other
                    )))
                }
            };
            Ok(BenchmarkRate::new(date, rate))
        })
        .collect::<Result<Vec<_>>>()?;

    rates.sort_by_key(|r| r.date);
    Ok(rates)
}

/// HTTP client for one SGS series
#[cfg(feature = "async")]
pub struct SgsRateSource {
    base_url: String,
    series: u32,
    client: Client,
}

#[cfg(feature = "async")]
impl SgsRateSource {
    /// CDI source against the public endpoint
    pub fn cdi() -> Result<Self> {
        Self::new(
            SGS_BASE_URL.to_string(),
            CDI_SERIES,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn new(base_url: String, series: u32, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                PortfolioError::HttpError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            series,
            client,
        })
    }

    fn series_url(&self) -> String {
        format!("{}/dados/serie/bcdata.sgs.{}/dados", self.base_url, self.series)
    }
}

#[cfg(feature = "async")]
impl super::RateSource for SgsRateSource {
    async fn fetch_rates(&self, start: TradeDate, end: TradeDate) -> Result<Vec<BenchmarkRate>> {
        let start_param = start.format(SGS_DATE_FORMAT).to_string();
        let end_param = end.format(SGS_DATE_FORMAT).to_string();
        let response = self
            .client
            .get(self.series_url())
            .query(&[
                ("formato", "json"),
                ("dataInicial", start_param.as_str()),
                ("dataFinal", end_param.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PortfolioError::HttpError(format!("HTTP request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| PortfolioError::HttpError(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| PortfolioError::HttpError(format!("Failed to read response: {}", e)))?;

        let rates = parse_sgs_payload(&body)?;
        log::info!(
            "Fetched {} rates from SGS series {} ({} to {})",
            rates.len(),
            self.series,
            start,
            end
        );
        Ok(rates)
    }

    fn name(&self) -> &str {
        "sgs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sgs_payload() {
        let body = r#"[
            {"data": "03/01/2024", "valor": "0.043739"},
            {"data": "02/01/2024", "valor": "0.043739"},
            {"data": "04/01/2024", "valor": 0.05}
        ]"#;
        let rates = parse_sgs_payload(body).unwrap();

        assert_eq!(rates.len(), 3);
        assert_eq!(rates[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(rates[0].rate, 0.043739);
        assert_eq!(rates[2].rate, 0.05);
    }

    #[test]
    fn test_parse_sgs_payload_rejects_bad_dates() {
        let body = r#"[{"data": "2024-01-02", "valor": "0.04"}]"#;
        assert!(matches!(
            parse_sgs_payload(body),
            Err(PortfolioError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_sgs_payload_rejects_non_json() {
        assert!(matches!(
            parse_sgs_payload("<html>maintenance</html>"),
            Err(PortfolioError::SerdeError(_))
        ));
    }

    #[cfg(feature = "async")]
    fn jan(d: u32) -> TradeDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_fetch_rates_sends_date_range() {
        use crate::data::sources::RateSource;
        use mockito::Matcher;

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/dados/serie/bcdata.sgs.12/dados")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("formato".into(), "json".into()),
                Matcher::UrlEncoded("dataInicial".into(), "02/01/2024".into()),
                Matcher::UrlEncoded("dataFinal".into(), "03/01/2024".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"data": "03/01/2024", "valor": "0.05"},
                    {"data": "02/01/2024", "valor": "0.043739"}]"#,
            )
            .create_async()
            .await;

        let source = SgsRateSource::new(server.url(), CDI_SERIES, Duration::from_secs(5)).unwrap();
        let rates = source.fetch_rates(jan(2), jan(3)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0].date, jan(2));
        assert_eq!(rates[1].rate, 0.05);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_fetch_rates_maps_error_status() {
        use crate::data::sources::RateSource;

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/dados/serie/bcdata.sgs.12/dados")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let source = SgsRateSource::new(server.url(), CDI_SERIES, Duration::from_secs(5)).unwrap();
        let err = source.fetch_rates(jan(2), jan(3)).await.unwrap_err();
        assert!(matches!(err, PortfolioError::HttpError(ref msg) if msg.contains("503")));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_sgs_source_creation() {
        let source = SgsRateSource::cdi().unwrap();
        assert_eq!(
            source.series_url(),
            "https://api.bcb.gov.br/dados/serie/bcdata.sgs.12/dados"
        );
    }
}
