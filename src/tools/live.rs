//! HTTP-backed tool runner
//!
//! - index snapshot: Yahoo Finance chart API
//! - disclosures: OpenDART `list.json`
//! - news search: Naver news search API (demo data without credentials)
//!
//! Top sectors, macro snapshot and forum sentiment have no live provider
//! yet and reuse the demo data.

use crate::config::AppConfig;
use crate::error::ReportError;
use crate::models::ToolRecord;
use crate::tools::{mock, policy, MockToolRunner, ToolRunner};
use crate::Result;
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const DART_LIST_URL: &str = "https://opendart.fss.or.kr/api/list.json";
const NAVER_NEWS_URL: &str = "https://openapi.naver.com/v1/search/news.json";

const KST_OFFSET_SECS: i32 = 9 * 3600;

fn index_ticker(name: &str) -> Option<&'static str> {
    match name {
        "KOSPI" => Some("^KS11"),
        "KOSDAQ" => Some("^KQ11"),
        _ => None,
    }
}

#[derive(Clone)]
struct NaverCredentials {
    client_id: String,
    client_secret: String,
}

/// Holds one pooled HTTP client for the life of the process; the report
/// date arrives with each call.
pub struct LiveToolRunner {
    client: Client,
    dart_api_key: String,
    naver: Option<NaverCredentials>,
}

impl LiveToolRunner {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let dart_api_key = config.dart_api_key.clone().ok_or_else(|| {
            ReportError::ConfigError("DART_API_KEY is required for live tools".to_string())
        })?;

        let naver = match (&config.naver_client_id, &config.naver_client_secret) {
            (Some(id), Some(secret)) => Some(NaverCredentials {
                client_id: id.clone(),
                client_secret: secret.clone(),
            }),
            _ => None,
        };

        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent("Mozilla/5.0 (daily-stock-report)")
            .build()?;

        Ok(Self {
            client,
            dart_api_key,
            naver,
        })
    }

    async fn fetch_daily_closes(
        &self,
        ticker: &str,
        target_date: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>> {
        let kst = FixedOffset::east_opt(KST_OFFSET_SECS)
            .ok_or_else(|| ReportError::ToolError("invalid KST offset".to_string()))?;

        // about ten calendar days up to the target date
        let start = target_date - ChronoDuration::days(10);
        let end = target_date + ChronoDuration::days(1);
        let period1 = start.and_hms_opt(0, 0, 0).map(|t| t.and_utc().timestamp()).unwrap_or(0);
        let period2 = end.and_hms_opt(0, 0, 0).map(|t| t.and_utc().timestamp()).unwrap_or(0);

        let url = format!("{}/{}", YAHOO_CHART_URL, ticker);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await
            .map_err(|e| ReportError::ToolError(format!("Yahoo chart request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::ToolError(format!(
                "Yahoo chart returned {} for {}",
                status, ticker
            )));
        }

        let chart: ChartResponse = response.json().await?;
        let Some(result) = chart.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(Vec::new());
        };

        let closes = result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default();

        let mut series: Vec<(NaiveDate, f64)> = result
            .timestamp
            .into_iter()
            .zip(closes)
            .filter_map(|(ts, close)| {
                let close = close?;
                let date = DateTime::from_timestamp(ts, 0)?.with_timezone(&kst).date_naive();
                Some((date, close))
            })
            .collect();

        series.sort_by_key(|(date, _)| *date);
        Ok(series)
    }
}

/// Two-decimal index level with thousands separators, e.g. `4,040.00`
fn format_points(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (integer_part, decimal_part) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), "00"));

    let grouped: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| if i > 0 && i % 3 == 0 { vec![',', c] } else { vec![c] })
        .collect::<Vec<char>>()
        .into_iter()
        .rev()
        .collect();

    if value < 0.0 {
        format!("-{}.{}", grouped, decimal_part)
    } else {
        format!("{}.{}", grouped, decimal_part)
    }
}

/// Render an index record from the last two closes of a series
fn index_record(name: &str, target_date: NaiveDate, series: &[(NaiveDate, f64)]) -> ToolRecord {
    let Some(&(last_date, close)) = series.last() else {
        return ToolRecord::new(
            format!("{} 지수 스냅샷 (데이터 없음)", name),
            format!("야후 파이낸스에서 {} 지수 데이터를 가져오지 못했습니다.", name),
        )
        .tags(&[name, "index", "error"])
        .source("yahoo_finance")
        .scores(0.3, 0.0, 0.3, 0.3);
    };

    let change_pct = match series.len().checked_sub(2).map(|i| series[i].1) {
        Some(prev) if prev > 0.0 => (close / prev - 1.0) * 100.0,
        _ => 0.0,
    };

    let mut body = format!(
        "{} {}pt, 전일 대비 {:+.2}% (야후 파이낸스 기준, {} 종가)",
        name,
        format_points(close),
        change_pct,
        last_date
    );
    if last_date != target_date {
        body.push_str(&format!(
            " - {}은(는) 휴장일로, 가장 가까운 과거 거래일 데이터를 사용했습니다.",
            target_date
        ));
    }

    let recency = policy::recency_from_day_gap((target_date - last_date).num_days());

    ToolRecord::new(format!("{} 지수 스냅샷", name), body)
        .tags(&[name, "index"])
        .source("yahoo_finance")
        .scores(0.9, recency, 0.9, 0.9)
}

#[async_trait::async_trait]
impl ToolRunner for LiveToolRunner {
    async fn get_index_snapshot(
        &self,
        indices: &[String],
        target_date: NaiveDate,
    ) -> Result<Vec<ToolRecord>> {
        let mut records = Vec::new();

        for idx in indices {
            let name = idx.to_uppercase();
            let Some(ticker) = index_ticker(&name) else {
                debug!(index = %name, "Skipping unknown index");
                continue;
            };

            let series = self.fetch_daily_closes(ticker, target_date).await?;
            records.push(index_record(&name, target_date, &series));
        }

        Ok(records)
    }

    async fn get_top_sectors(&self, limit: usize) -> Result<Vec<ToolRecord>> {
        Ok(mock::top_sectors(limit))
    }

    async fn get_dart_disclosures(
        &self,
        importance: &str,
        target_date: NaiveDate,
    ) -> Result<Vec<ToolRecord>> {
        let ymd = target_date.format("%Y%m%d").to_string();

        let response = self
            .client
            .get(DART_LIST_URL)
            .query(&[
                ("crtfc_key", self.dart_api_key.as_str()),
                ("bgn_de", ymd.as_str()),
                ("end_de", ymd.as_str()),
                ("corp_cls", "Y,K"),
                ("page_no", "1"),
                ("page_count", "100"),
            ])
            .send()
            .await;

        // provider trouble is reported as a low-trust record, not a failure
        let list: DartListResponse = match response {
            Ok(resp) => match resp.json().await {
                Ok(list) => list,
                Err(e) => {
                    warn!(error = %e, "OpenDART returned an unreadable body");
                    return Ok(vec![policy::dart_failure_record(
                        "DART 공시 조회 실패".to_string(),
                        format!("OpenDART list.json 호출 중 오류 발생: {}", e),
                    )]);
                }
            },
            Err(e) => {
                warn!(error = %e, "OpenDART request failed");
                return Ok(vec![policy::dart_failure_record(
                    "DART 공시 조회 실패".to_string(),
                    format!("OpenDART list.json 호출 중 오류 발생: {}", e),
                )]);
            }
        };

        if list.status != "000" {
            let message = list.message.unwrap_or_else(|| "알 수 없는 오류".to_string());
            return Ok(vec![policy::dart_failure_record(
                format!("DART 공시 조회 실패 (status={})", list.status),
                format!("OpenDART list.json 에서 에러 응답: {}", message),
            )]);
        }

        let items = list.list.unwrap_or_default();
        if items.is_empty() {
            return Ok(vec![policy::dart_empty_record(&ymd)]);
        }

        Ok(policy::select_disclosures(items, importance)
            .iter()
            .map(policy::disclosure_record)
            .collect())
    }

    async fn get_macro_snapshot(&self) -> Result<Vec<ToolRecord>> {
        Ok(mock::macro_snapshot())
    }

    async fn search_kr_stock_news(
        &self,
        query: &str,
        limit: usize,
        target_date: NaiveDate,
    ) -> Result<Vec<ToolRecord>> {
        let Some(naver) = &self.naver else {
            return MockToolRunner
                .search_kr_stock_news(query, limit, target_date)
                .await;
        };

        let display = limit.clamp(1, 100).to_string();
        let response = self
            .client
            .get(NAVER_NEWS_URL)
            .header("X-Naver-Client-Id", &naver.client_id)
            .header("X-Naver-Client-Secret", &naver.client_secret)
            .query(&[
                ("query", query),
                ("display", display.as_str()),
                ("start", "1"),
                ("sort", "date"),
            ])
            .send()
            .await
            .map_err(|e| ReportError::ToolError(format!("Naver news request failed: {}", e)))?
            .error_for_status()?;

        let body: NaverNewsResponse = response.json().await?;

        Ok(body
            .items
            .iter()
            .map(|item| policy::news_record(item, target_date))
            .collect())
    }

    async fn get_forum_sentiment(&self, topics: &[String]) -> Result<Vec<ToolRecord>> {
        Ok(mock::forum_sentiment(topics))
    }
}

//
// ================= Provider payloads =================
//

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct DartListResponse {
    #[serde(default)]
    status: String,
    message: Option<String>,
    list: Option<Vec<policy::DartListItem>>,
}

#[derive(Debug, Deserialize)]
struct NaverNewsResponse {
    #[serde(default)]
    items: Vec<policy::NaverNewsItem>,
}
