//! Demo tool runner that returns fixed data without any network access

use crate::models::ToolRecord;
use crate::tools::ToolRunner;
use crate::Result;
use chrono::NaiveDate;

pub(crate) const SECTOR_LINES: [&str; 5] = [
    "반도체 : +2.3%, 거래대금 상위",
    "2차 전지 : +1.8%",
    "인터넷/플랫폼: +1.2%",
    "바이오: -0.5",
    "철강/소재: -1.0%",
];

/// Keeps the pipeline runnable without provider credentials
pub struct MockToolRunner;

pub(crate) fn top_sectors(limit: usize) -> Vec<ToolRecord> {
    let lines: Vec<&str> = SECTOR_LINES.iter().take(limit).copied().collect();
    vec![ToolRecord::new(format!("섹터/테마 상위 {} (모의)", limit), lines.join("\n"))
        .tags(&["sector", "mock"])
        .source("mock_price")
        .scores(0.8, 0.8, 0.8, 0.7)]
}

pub(crate) fn macro_snapshot() -> Vec<ToolRecord> {
    vec![ToolRecord::new(
        "거시 지표 스냅샷(모의)",
        "기준금리 3.50%, 3년국채 3.20%, USD/KRW 1,350원 (모의 데이터)",
    )
    .tags(&["macro", "rate", "fx", "mock"])
    .source("mock_macro")
    .scores(0.9, 0.8, 0.8, 0.8)]
}

pub(crate) fn forum_sentiment(topics: &[String]) -> Vec<ToolRecord> {
    let topics_str = if topics.is_empty() {
        "시장 전반".to_string()
    } else {
        topics.join(", ")
    };

    // opinion data is deliberately low on source trust
    vec![ToolRecord::new(
        format!("커뮤니티 심리 요약(모의) - {}", topics_str),
        format!(
            "[모의] 커뮤니티에서 {} 관련 낙관/비관 의견이 혼재된 상태라는 요약",
            topics_str
        ),
    )
    .tags(&["forum", "sentiment", "mock"])
    .source("mock_forum")
    .scores(0.3, 0.8, 0.6, 0.4)]
}

#[async_trait::async_trait]
impl ToolRunner for MockToolRunner {
    async fn get_index_snapshot(
        &self,
        indices: &[String],
        _target_date: NaiveDate,
    ) -> Result<Vec<ToolRecord>> {
        let records = indices
            .iter()
            .map(|idx| {
                let upper = idx.to_uppercase();
                let body = match upper.as_str() {
                    "KOSPI" => "KOSPI 4,000.1pt, 전일 대비 -0.7% (모의 데이터)".to_string(),
                    "KOSDAQ" => "KOSDAQ 930.5pt, 전일 대비 +1.2% (모의 데이터)".to_string(),
                    _ => format!("{} 지수 (모의 데이터)", idx),
                };
                let mut record = ToolRecord::new(format!("{} 지수 스냅샷(모의)", idx), body)
                    .source("mock_price")
                    .scores(0.9, 0.9, 0.9, 0.9);
                record.tags = vec![upper, "index".to_string(), "mock".to_string()];
                record
            })
            .collect();

        Ok(records)
    }

    async fn get_top_sectors(&self, limit: usize) -> Result<Vec<ToolRecord>> {
        Ok(top_sectors(limit))
    }

    async fn get_dart_disclosures(
        &self,
        _importance: &str,
        _target_date: NaiveDate,
    ) -> Result<Vec<ToolRecord>> {
        Ok(vec![
            ToolRecord::new(
                "[모의] 삼성전자 - 자사주 소각 결정",
                "주주가치 제고를 위한 자사주 일부 소각 (모의 데이터)",
            )
            .tags(&["공시", "주주환원", "mock"])
            .source("mock_dart")
            .scores(0.95, 0.9, 0.9, 0.8),
            ToolRecord::new(
                "[모의] 카카오 - 신사업 투자 공시",
                "AI/클라우드 관련 대규모 투자 계획 공시 (모의 데이터)",
            )
            .tags(&["공시", "투자", "mock"])
            .source("mock_dart")
            .scores(0.9, 0.9, 0.8, 0.7),
        ])
    }

    async fn get_macro_snapshot(&self) -> Result<Vec<ToolRecord>> {
        Ok(macro_snapshot())
    }

    async fn search_kr_stock_news(
        &self,
        query: &str,
        limit: usize,
        _target_date: NaiveDate,
    ) -> Result<Vec<ToolRecord>> {
        let lines: Vec<String> = (1..=2)
            .take(limit)
            .map(|n| format!("[모의 뉴스] '{}' 관련 시황 기사 {}", query, n))
            .collect();

        Ok(vec![ToolRecord::new(
            format!("국내 증시 뉴스 요약(모의) - {}", query),
            lines.join("\n"),
        )
        .tags(&["news", "mock"])
        .source("mock_news")
        .scores(0.7, 0.7, 0.7, 0.6)])
    }

    async fn get_forum_sentiment(&self, topics: &[String]) -> Result<Vec<ToolRecord>> {
        Ok(forum_sentiment(topics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> MockToolRunner {
        MockToolRunner
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 4).unwrap()
    }

    #[tokio::test]
    async fn test_index_snapshot_one_record_per_index() {
        let indices = vec!["kospi".to_string(), "KOSDAQ".to_string(), "NIKKEI".to_string()];
        let records = runner().get_index_snapshot(&indices, date()).await.unwrap();

        assert_eq!(records.len(), 3);
        assert!(records[0].body.as_deref().unwrap().starts_with("KOSPI 4,000.1pt"));
        assert_eq!(records[0].tags[0], "KOSPI");
        assert_eq!(records[2].body.as_deref(), Some("NIKKEI 지수 (모의 데이터)"));
    }

    #[tokio::test]
    async fn test_news_lines_respect_limit() {
        let records = runner().search_kr_stock_news("코스닥", 1, date()).await.unwrap();
        assert_eq!(
            records[0].body.as_deref(),
            Some("[모의 뉴스] '코스닥' 관련 시황 기사 1")
        );
    }

    #[tokio::test]
    async fn test_forum_sentiment_without_topics() {
        let records = runner().get_forum_sentiment(&[]).await.unwrap();
        assert_eq!(
            records[0].title.as_deref(),
            Some("커뮤니티 심리 요약(모의) - 시장 전반")
        );
        assert_eq!(records[0].source_score, Some(0.3));
    }
}
