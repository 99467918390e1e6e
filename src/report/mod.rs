//! Report assembly
//!
//! Turns a collected dataset into the layered text report and into the
//! payload handed to a downstream summarizer. Both read the dataset only.

use crate::models::{
    DailyStockReportData, DailyStockReportOutput, DataLayer, LayeredSummary, ReportSection,
    RiskTag,
};
use serde::{Deserialize, Serialize};
use serde_json::Map;

/// Layers in the order sections appear in the report
pub const DISPLAY_ORDER: [DataLayer; 5] = [
    DataLayer::Price,
    DataLayer::Disclosure,
    DataLayer::Macro,
    DataLayer::News,
    DataLayer::Opinion,
];

pub const OPINION_CAUTION: &str = "커뮤니티 데이터로 신뢰도가 낮을 수 있습니다.";

pub const PROMPT_GUIDANCE: &str = "정량 데이터는 있는 그대로 보고, 신뢰도가 낮은 레이어(opinion)는 추측임을 명확히 표시하라. 지수/섹터/공시/정책/심리 순으로 요약을 구성한다.";

/// Blocks scoring at or above this are tagged `confirmed` in the prompt
pub const CONFIRMED_THRESHOLD: f64 = 0.7;

pub fn section_heading(layer: DataLayer) -> &'static str {
    match layer {
        DataLayer::Price => "지수/섹터",
        DataLayer::Disclosure => "공시/기업 이벤트",
        DataLayer::Macro => "거시/정책",
        DataLayer::News => "뉴스/해석",
        DataLayer::Opinion => "시장 심리",
        DataLayer::Risk => "리스크",
    }
}

/// Summarization payload built from a dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPrompt {
    pub date: String,
    pub summaries: Vec<LayeredSummary>,
    pub guidance: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ReportBuilder;

impl ReportBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Layered text report. Layers without blocks get no section.
    pub fn build_report(&self, data: DailyStockReportData) -> DailyStockReportOutput {
        let sections = self.build_sections(&data);

        DailyStockReportOutput {
            date: data.date,
            sections,
            raw_data: data,
            metadata: Map::new(),
        }
    }

    pub fn build_sections(&self, data: &DailyStockReportData) -> Vec<ReportSection> {
        DISPLAY_ORDER
            .iter()
            .filter_map(|&layer| {
                let blocks: Vec<_> = data
                    .iter_blocks()
                    .filter(|block| block.meta.layer == layer)
                    .collect();
                if blocks.is_empty() {
                    return None;
                }

                Some(ReportSection {
                    heading: section_heading(layer).to_string(),
                    summary: blocks
                        .iter()
                        .map(|b| b.title.as_str())
                        .collect::<Vec<_>>()
                        .join("; "),
                    details: blocks.iter().map(|b| b.body.clone()).collect(),
                    caution: (layer == DataLayer::Opinion).then(|| OPINION_CAUTION.to_string()),
                    layer,
                })
            })
            .collect()
    }

    /// Flattened per-block payload with a risk tag for every entry
    pub fn build_prompt(&self, data: &DailyStockReportData) -> ReportPrompt {
        let summaries = data
            .iter_blocks()
            .map(|block| LayeredSummary {
                layer: block.meta.layer,
                content: format!("{}: {}", block.title, block.body),
                risk: if block.meta.quality_score() >= CONFIRMED_THRESHOLD {
                    RiskTag::Confirmed
                } else {
                    RiskTag::LowConfidence
                },
                references: block.tags.clone(),
            })
            .collect();

        ReportPrompt {
            date: data.date.to_string(),
            summaries,
            guidance: PROMPT_GUIDANCE.to_string(),
        }
    }
}
