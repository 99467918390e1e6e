//! Data-shaping policy for live providers
//!
//! Keyword tables, thresholds and record templates that turn raw provider
//! payloads into [`ToolRecord`]s. Kept separate from the HTTP code so the
//! heuristics can be swapped without touching the clients.

use crate::models::ToolRecord;
use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Report-name keywords that mark a disclosure as important
pub const DISCLOSURE_KEYWORDS: &[&str] = &[
    "합병", "분할", "분할합병", "유상증자", "무상증자", "증자", "감자",
    "자기주식", "자사주", "배당", "영업양수도", "영업양도", "영업양수",
    "주요계약", "전환사채", "신주인수권부사채", "교환사채",
];

pub const DISCLOSURE_TOP_N: usize = 10;

/// One row of the OpenDART `list.json` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DartListItem {
    #[serde(default)]
    pub corp_name: String,
    #[serde(default)]
    pub report_nm: String,
    #[serde(default)]
    pub rcept_no: String,
    #[serde(default)]
    pub rcept_dt: String,
}

/// One item of the Naver news search response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NaverNewsItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub originallink: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "pubDate")]
    pub pub_date: String,
}

pub fn importance_score(report_nm: &str) -> usize {
    DISCLOSURE_KEYWORDS
        .iter()
        .filter(|kw| report_nm.contains(**kw))
        .count()
}

/// Pick the disclosures worth reporting.
///
/// With `importance == "high"` only keyword hits survive, unless there are
/// none, in which case every item is a candidate. Candidates are ordered by
/// keyword hits (stable) and cut to [`DISCLOSURE_TOP_N`].
pub fn select_disclosures(items: Vec<DartListItem>, importance: &str) -> Vec<DartListItem> {
    let mut scored: Vec<(usize, DartListItem)> = items
        .iter()
        .map(|item| (importance_score(&item.report_nm), item.clone()))
        .collect();

    if importance == "high" {
        scored.retain(|(score, _)| *score > 0);
    }

    if scored.is_empty() {
        scored = items.into_iter().map(|item| (0, item)).collect();
    }

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored
        .into_iter()
        .take(DISCLOSURE_TOP_N)
        .map(|(_, item)| item)
        .collect()
}

/// `YYYYMMDD` → `YYYY-MM-DD`; other shapes pass through
pub fn pretty_receipt_date(rcept_dt: &str) -> String {
    if rcept_dt.len() == 8 && rcept_dt.is_ascii() {
        format!("{}-{}-{}", &rcept_dt[0..4], &rcept_dt[4..6], &rcept_dt[6..8])
    } else {
        rcept_dt.to_string()
    }
}

pub fn disclosure_record(item: &DartListItem) -> ToolRecord {
    let corp_name = item.corp_name.trim();
    let report_nm = item.report_nm.trim();
    let rcept_no = item.rcept_no.trim();
    let pretty_dt = pretty_receipt_date(item.rcept_dt.trim());

    let title = if corp_name.is_empty() && report_nm.is_empty() {
        "무제 공시".to_string()
    } else {
        format!("{} - {}", corp_name, report_nm)
    };

    let mut body_lines = Vec::new();
    if !pretty_dt.is_empty() {
        body_lines.push(format!("접수일자: {}", pretty_dt));
    }
    if !rcept_no.is_empty() {
        body_lines.push(format!("접수번호: {}", rcept_no));
        body_lines.push(format!(
            "공시보기: https://dart.fss.or.kr/dsaf001/main.do?rcpNo={}",
            rcept_no
        ));
    }
    let body = if body_lines.is_empty() {
        "세부 정보 없음".to_string()
    } else {
        body_lines.join("\n")
    };

    // same-day filings, so recency is near the top
    ToolRecord::new(title, body)
        .tags(&["dart", "disclosure"])
        .source("opendart_list")
        .scores(0.95, 0.95, 0.9, 0.9)
}

pub fn dart_failure_record(title: String, body: String) -> ToolRecord {
    ToolRecord::new(title, body)
        .tags(&["dart", "error"])
        .source("opendart_list")
        .scores(0.4, 0.0, 0.5, 0.5)
}

pub fn dart_empty_record(ymd: &str) -> ToolRecord {
    ToolRecord::new(
        "당일 주요 공시 없음",
        format!("{} 기준으로 유가/코스닥 공시 목록이 없습니다.", ymd),
    )
    .tags(&["dart", "empty"])
    .source("opendart_list")
    .scores(0.8, 0.9, 0.8, 0.8)
}

/// 0.9 for same-day data, minus 0.05 per day of gap, floored at 0.5
pub fn recency_from_day_gap(days: i64) -> f64 {
    if days <= 0 {
        0.9
    } else {
        (0.9 - 0.05 * days as f64).max(0.5)
    }
}

fn html_tag() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("HTML tag pattern is a valid regex"))
}

pub fn strip_html(text: &str) -> String {
    html_tag().replace_all(text, "").into_owned()
}

pub fn news_record(item: &NaverNewsItem, target_date: NaiveDate) -> ToolRecord {
    let title = strip_html(&item.title).trim().to_string();
    let summary = strip_html(&item.description).trim().to_string();
    let url = if item.link.is_empty() {
        item.originallink.as_str()
    } else {
        item.link.as_str()
    };

    // unparseable dates are treated as a week old
    let recency = DateTime::parse_from_rfc2822(&item.pub_date)
        .map(|published| recency_from_day_gap((target_date - published.date_naive()).num_days()))
        .unwrap_or(0.5);

    let title = if title.is_empty() { "(제목 없음)".to_string() } else { title };
    let summary = if summary.is_empty() { "(요약 없음)".to_string() } else { summary };
    let body = if url.is_empty() {
        summary
    } else {
        format!("{}\n{}", summary, url)
    };

    ToolRecord::new(title, body)
        .tags(&["news", "naver"])
        .source("naver_news")
        .scores(0.7, recency, 0.7, 0.6)
}
