//! Core data models for the daily stock report pipeline
//!
//! These types travel between the planner, the execution engine and the
//! report builder.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

//
// ================= Enums =================
//

/// Semantic layer of a collected record.
///
/// Price, disclosure and macro data come from numeric or official sources;
/// news and opinion add context and crowd mood and are trusted less.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DataLayer {
    Price,
    Disclosure,
    Macro,
    News,
    Opinion,
    Risk,
}

impl DataLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataLayer::Price => "price",
            DataLayer::Disclosure => "disclosure",
            DataLayer::Macro => "macro",
            DataLayer::News => "news",
            DataLayer::Opinion => "opinion",
            DataLayer::Risk => "risk",
        }
    }
}

impl fmt::Display for DataLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of data-fetch tools a plan may schedule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolName {
    #[serde(rename = "get_index_snapshot")]
    IndexSnapshot,
    #[serde(rename = "get_macro_snapshot")]
    MacroSnapshot,
    #[serde(rename = "get_dart_disclosures")]
    Disclosures,
    #[serde(rename = "get_top_sectors")]
    TopSectors,
    #[serde(rename = "search_kr_stock_news")]
    NewsSearch,
    #[serde(rename = "get_forum_sentiment")]
    ForumSentiment,
}

impl ToolName {
    pub const ALL: [ToolName; 6] = [
        ToolName::IndexSnapshot,
        ToolName::MacroSnapshot,
        ToolName::Disclosures,
        ToolName::TopSectors,
        ToolName::NewsSearch,
        ToolName::ForumSentiment,
    ];

    /// Wire name used by planners and raw task lists
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::IndexSnapshot => "get_index_snapshot",
            ToolName::MacroSnapshot => "get_macro_snapshot",
            ToolName::Disclosures => "get_dart_disclosures",
            ToolName::TopSectors => "get_top_sectors",
            ToolName::NewsSearch => "search_kr_stock_news",
            ToolName::ForumSentiment => "get_forum_sentiment",
        }
    }

    /// Look up a tool by wire name; `None` for anything outside the set
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence tag attached to prompt payload entries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskTag {
    Confirmed,
    LowConfidence,
    Speculative,
}

//
// ================= Quality Metadata =================
//

/// Trust and quality metadata for one collected record.
///
/// - `source_score`: primary/secondary/community source trust
/// - `recency_score`: today / yesterday / last week weighting
/// - `structure_score`: required fields present, no outliers
/// - `consistency_score`: agreement with other sources
///
/// Scoring lives in [`crate::quality`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMeta {
    pub source_id: String,
    pub layer: DataLayer,
    pub source_score: f64,
    pub recency_score: f64,
    pub structure_score: f64,
    pub consistency_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    pub title: String,
    pub body: String,
    pub meta: SourceMeta,
    #[serde(default)]
    pub tags: Vec<String>,
}

//
// ================= Plan =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub tool: ToolName,
    #[serde(default)]
    pub args: Map<String, Value>,
    pub purpose: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStockReportPlan {
    pub date: NaiveDate,
    pub tasks: Vec<TaskPlan>,
    #[serde(default)]
    pub base_tasks: Vec<ToolName>,
    pub enrichment_reason: Option<String>,
}

impl DailyStockReportPlan {
    /// Number of scheduled calls for `tool`
    pub fn count_tool(&self, tool: ToolName) -> usize {
        self.tasks.iter().filter(|task| task.tool == tool).count()
    }
}

//
// ================= Collected Data =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedBucket {
    pub tool: ToolName,
    pub blocks: Vec<ContentBlock>,
}

/// Blocks collected during one run, bucketed per tool in first-call order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStockReportData {
    pub date: NaiveDate,
    #[serde(default)]
    pub collected: Vec<CollectedBucket>,
}

impl DailyStockReportData {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            collected: Vec::new(),
        }
    }

    pub fn add_block(&mut self, tool: ToolName, block: ContentBlock) {
        match self.collected.iter_mut().find(|bucket| bucket.tool == tool) {
            Some(bucket) => bucket.blocks.push(block),
            None => self.collected.push(CollectedBucket {
                tool,
                blocks: vec![block],
            }),
        }
    }

    pub fn blocks(&self, tool: ToolName) -> &[ContentBlock] {
        self.collected
            .iter()
            .find(|bucket| bucket.tool == tool)
            .map(|bucket| bucket.blocks.as_slice())
            .unwrap_or(&[])
    }

    /// All blocks, bucket by bucket
    pub fn iter_blocks(&self) -> impl Iterator<Item = &ContentBlock> {
        self.collected.iter().flat_map(|bucket| bucket.blocks.iter())
    }

    pub fn block_count(&self) -> usize {
        self.collected.iter().map(|bucket| bucket.blocks.len()).sum()
    }
}

//
// ================= Report =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub heading: String,
    pub summary: String,
    #[serde(default)]
    pub details: Vec<String>,
    pub caution: Option<String>,
    pub layer: DataLayer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStockReportOutput {
    pub date: NaiveDate,
    pub sections: Vec<ReportSection>,
    pub raw_data: DailyStockReportData,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl DailyStockReportOutput {
    /// Render a human-readable text report
    pub fn to_text(&self) -> String {
        let mut lines = vec![format!("국내 주식 일일 리포트 ({})", self.date)];
        for section in &self.sections {
            lines.push(format!("\n## {}", section.heading));
            lines.push(section.summary.clone());
            for detail in &section.details {
                lines.push(format!("- {}", detail));
            }
            if let Some(caution) = &section.caution {
                lines.push(format!("[주의] {}", caution));
            }
        }
        lines.join("\n")
    }
}

/// One entry of the summarization prompt payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayeredSummary {
    pub layer: DataLayer,
    pub content: String,
    pub risk: RiskTag,
    #[serde(default)]
    pub references: Vec<String>,
}

//
// ================= Tool I/O =================
//

/// Metadata fields a tool may nest under `meta`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub source_id: Option<String>,
    pub source_score: Option<f64>,
    pub recency_score: Option<f64>,
    pub structure_score: Option<f64>,
    pub consistency_score: Option<f64>,
}

/// One record returned by a tool call.
///
/// Every field is optional; the execution engine fills the gaps with
/// per-field defaults. A nested `meta` object wins over the flat fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source_id: Option<String>,
    pub source_score: Option<f64>,
    pub recency_score: Option<f64>,
    pub structure_score: Option<f64>,
    pub consistency_score: Option<f64>,
    pub meta: Option<RecordMeta>,
}

impl ToolRecord {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn source(mut self, source_id: &str) -> Self {
        self.source_id = Some(source_id.to_string());
        self
    }

    /// Set source, recency, structure and consistency scores in that order
    pub fn scores(mut self, source: f64, recency: f64, structure: f64, consistency: f64) -> Self {
        self.source_score = Some(source);
        self.recency_score = Some(recency);
        self.structure_score = Some(structure);
        self.consistency_score = Some(consistency);
        self
    }
}
