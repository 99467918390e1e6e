//! Execution engine for compiled plans
//!
//! Walks the plan in order, calls each tool, attaches layer and quality
//! metadata to every returned record and keeps only records that clear
//! the minimum quality. The planner is NOT consulted here.

use crate::models::{
    ContentBlock, DailyStockReportData, DailyStockReportPlan, DataLayer, SourceMeta, ToolName,
    ToolRecord,
};
use crate::quality::{DEFAULT_MAIN_THRESHOLD, DEFAULT_MINIMUM_QUALITY};
use crate::tools::{ToolCall, ToolRunner};
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

const DEFAULT_SOURCE_ID: &str = "unknown";
const DEFAULT_SOURCE_SCORE: f64 = 0.6;
const DEFAULT_OPINION_SOURCE_SCORE: f64 = 0.3;
const DEFAULT_RECENCY_SCORE: f64 = 0.8;
const DEFAULT_STRUCTURE_SCORE: f64 = 0.7;
const DEFAULT_CONSISTENCY_SCORE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionConfig {
    /// Records scoring below this are dropped
    pub minimum_quality: f64,
    /// Records at or above this are `main` band
    pub main_threshold: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            minimum_quality: DEFAULT_MINIMUM_QUALITY,
            main_threshold: DEFAULT_MAIN_THRESHOLD,
        }
    }
}

/// Build quality metadata for a record, falling back to per-field defaults.
///
/// Fields nested under `meta` take precedence over flat fields.
pub fn meta_from_record(record: &ToolRecord, layer: DataLayer) -> SourceMeta {
    let nested = record.meta.clone().unwrap_or_default();
    let default_source_score = if layer == DataLayer::Opinion {
        DEFAULT_OPINION_SOURCE_SCORE
    } else {
        DEFAULT_SOURCE_SCORE
    };

    SourceMeta {
        source_id: nested
            .source_id
            .or_else(|| record.source_id.clone())
            .unwrap_or_else(|| DEFAULT_SOURCE_ID.to_string()),
        layer,
        source_score: nested
            .source_score
            .or(record.source_score)
            .unwrap_or(default_source_score),
        recency_score: nested
            .recency_score
            .or(record.recency_score)
            .unwrap_or(DEFAULT_RECENCY_SCORE),
        structure_score: nested
            .structure_score
            .or(record.structure_score)
            .unwrap_or(DEFAULT_STRUCTURE_SCORE),
        consistency_score: nested
            .consistency_score
            .or(record.consistency_score)
            .unwrap_or(DEFAULT_CONSISTENCY_SCORE),
    }
}

/// Executes a compiled plan step by step
pub struct ExecutionEngine {
    runner: Arc<dyn ToolRunner>,
    config: ExecutionConfig,
}

impl ExecutionEngine {
    pub fn new(runner: Arc<dyn ToolRunner>, config: ExecutionConfig) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Run every task in plan order (fail-fast: the first tool error ends
    /// the run and no partial dataset is returned)
    pub async fn execute(&self, plan: &DailyStockReportPlan) -> Result<DailyStockReportData> {
        let mut dataset = DailyStockReportData::new(plan.date);

        debug!(date = %plan.date, task_count = plan.tasks.len(), "Starting plan execution");

        for (order, task) in plan.tasks.iter().enumerate() {
            let call = ToolCall::from_task(task)?;
            let start = Instant::now();

            let records = self.runner.call(&call, plan.date).await?;

            debug!(
                step_order = order + 1,
                tool_name = %task.tool,
                record_count = records.len(),
                execution_time_ms = start.elapsed().as_millis() as u64,
                "Tool call finished"
            );

            for record in records {
                if let Some(block) = self.to_block(task.tool, record) {
                    dataset.add_block(task.tool, block);
                }
            }
        }

        info!(
            date = %plan.date,
            block_count = dataset.block_count(),
            "Plan execution completed"
        );

        Ok(dataset)
    }

    fn to_block(&self, tool: ToolName, record: ToolRecord) -> Option<ContentBlock> {
        let meta = meta_from_record(&record, tool.layer());
        let score = meta.quality_score();

        if score < self.config.minimum_quality {
            debug!(
                tool_name = %tool,
                source_id = %meta.source_id,
                score,
                "Dropping record below minimum quality"
            );
            return None;
        }

        debug!(
            tool_name = %tool,
            score,
            band = %meta.quality_band(self.config.main_threshold, self.config.minimum_quality),
            "Record kept"
        );

        Some(ContentBlock {
            title: record.title.unwrap_or_else(|| tool.as_str().to_string()),
            body: record.body.unwrap_or_default(),
            meta,
            tags: record.tags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use crate::models::RecordMeta;
    use crate::planner::{build_base_plan, enrich_plan};
    use crate::tools::MockToolRunner;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 4).unwrap()
    }

    /// Runner returning the same records from every tool and logging calls
    struct FixedRunner {
        records: Vec<ToolRecord>,
        calls: Mutex<Vec<ToolName>>,
        dates: Mutex<Vec<NaiveDate>>,
        fail_on: Option<ToolName>,
    }

    impl FixedRunner {
        fn new(records: Vec<ToolRecord>) -> Self {
            Self {
                records,
                calls: Mutex::new(Vec::new()),
                dates: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn answer(&self, tool: ToolName) -> Result<Vec<ToolRecord>> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(tool);
            }
            if self.fail_on == Some(tool) {
                return Err(ReportError::ToolError(format!("{} is down", tool)));
            }
            Ok(self.records.clone())
        }

        fn answer_for(&self, tool: ToolName, target_date: NaiveDate) -> Result<Vec<ToolRecord>> {
            if let Ok(mut dates) = self.dates.lock() {
                dates.push(target_date);
            }
            self.answer(tool)
        }
    }

    #[async_trait::async_trait]
    impl ToolRunner for FixedRunner {
        async fn get_index_snapshot(
            &self,
            _indices: &[String],
            target_date: NaiveDate,
        ) -> Result<Vec<ToolRecord>> {
            self.answer_for(ToolName::IndexSnapshot, target_date)
        }

        async fn get_top_sectors(&self, _limit: usize) -> Result<Vec<ToolRecord>> {
            self.answer(ToolName::TopSectors)
        }

        async fn get_dart_disclosures(
            &self,
            _importance: &str,
            target_date: NaiveDate,
        ) -> Result<Vec<ToolRecord>> {
            self.answer_for(ToolName::Disclosures, target_date)
        }

        async fn get_macro_snapshot(&self) -> Result<Vec<ToolRecord>> {
            self.answer(ToolName::MacroSnapshot)
        }

        async fn search_kr_stock_news(
            &self,
            _query: &str,
            _limit: usize,
            target_date: NaiveDate,
        ) -> Result<Vec<ToolRecord>> {
            self.answer_for(ToolName::NewsSearch, target_date)
        }

        async fn get_forum_sentiment(&self, _topics: &[String]) -> Result<Vec<ToolRecord>> {
            self.answer(ToolName::ForumSentiment)
        }
    }

    #[test]
    fn test_meta_defaults() {
        let record = ToolRecord::default();

        let news = meta_from_record(&record, DataLayer::News);
        assert_eq!(news.source_id, "unknown");
        assert_eq!(news.source_score, 0.6);
        assert_eq!(news.recency_score, 0.8);
        assert_eq!(news.structure_score, 0.7);
        assert_eq!(news.consistency_score, 0.6);

        let opinion = meta_from_record(&record, DataLayer::Opinion);
        assert_eq!(opinion.source_score, 0.3);
        assert_eq!(opinion.layer, DataLayer::Opinion);
    }

    #[test]
    fn test_nested_meta_wins_over_flat_fields() {
        let mut record = ToolRecord::new("t", "b").source("flat").scores(0.1, 0.1, 0.1, 0.1);
        record.meta = Some(RecordMeta {
            source_id: Some("nested".to_string()),
            source_score: Some(0.9),
            ..RecordMeta::default()
        });

        let meta = meta_from_record(&record, DataLayer::Price);
        assert_eq!(meta.source_id, "nested");
        assert_eq!(meta.source_score, 0.9);
        assert_eq!(meta.recency_score, 0.1);
    }

    #[tokio::test]
    async fn test_threshold_keeps_high_and_drops_low() {
        let runner = Arc::new(FixedRunner::new(vec![
            ToolRecord::new("high", "kept").scores(0.9, 0.9, 0.9, 0.9),
            ToolRecord::new("low", "dropped").scores(0.1, 0.1, 0.1, 0.1),
        ]));
        let engine = ExecutionEngine::new(runner, ExecutionConfig::default());

        let data = engine.execute(&build_base_plan(date())).await.unwrap();

        for tool in [ToolName::IndexSnapshot, ToolName::MacroSnapshot, ToolName::Disclosures] {
            let blocks = data.blocks(tool);
            assert_eq!(blocks.len(), 1);
            assert_eq!(blocks[0].title, "high");
            assert!((blocks[0].meta.quality_score() - 0.9).abs() < 1e-9);
        }
        assert!(data.iter_blocks().all(|b| b.title != "low"));
    }

    #[tokio::test]
    async fn test_calls_follow_plan_order() {
        let runner = Arc::new(FixedRunner::new(vec![]));
        let engine = ExecutionEngine::new(runner.clone(), ExecutionConfig::default());
        let plan = enrich_plan(&build_base_plan(date()), &["밸류업"]);

        let data = engine.execute(&plan).await.unwrap();
        assert_eq!(data.block_count(), 0);

        let calls = runner.calls.lock().unwrap().clone();
        let planned: Vec<ToolName> = plan.tasks.iter().map(|t| t.tool).collect();
        assert_eq!(calls, planned);
    }

    #[tokio::test]
    async fn test_plan_date_reaches_date_sensitive_tools() {
        let runner = Arc::new(FixedRunner::new(vec![]));
        let engine = ExecutionEngine::new(runner.clone(), ExecutionConfig::default());
        let other_day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

        engine
            .execute(&enrich_plan(&build_base_plan(other_day), &["반도체"]))
            .await
            .unwrap();
        engine.execute(&build_base_plan(date())).await.unwrap();

        // index, disclosures and news for the first plan; index and disclosures for the second
        let dates = runner.dates.lock().unwrap().clone();
        assert_eq!(dates, vec![other_day, other_day, other_day, date(), date()]);
    }

    #[tokio::test]
    async fn test_missing_title_uses_tool_name() {
        let mut record = ToolRecord::default();
        record.source_score = Some(0.9);
        let runner = Arc::new(FixedRunner::new(vec![record]));
        let engine = ExecutionEngine::new(runner, ExecutionConfig::default());

        let data = engine.execute(&build_base_plan(date())).await.unwrap();
        let block = &data.blocks(ToolName::MacroSnapshot)[0];
        assert_eq!(block.title, "get_macro_snapshot");
        assert_eq!(block.body, "");
        assert_eq!(block.meta.source_id, "unknown");
    }

    #[tokio::test]
    async fn test_tool_failure_aborts_run() {
        let mut runner = FixedRunner::new(vec![ToolRecord::new("t", "b").scores(0.9, 0.9, 0.9, 0.9)]);
        runner.fail_on = Some(ToolName::MacroSnapshot);
        let runner = Arc::new(runner);
        let engine = ExecutionEngine::new(runner.clone(), ExecutionConfig::default());

        let result = engine.execute(&build_base_plan(date())).await;
        assert!(matches!(result, Err(ReportError::ToolError(_))));

        // disclosures never ran
        let calls = runner.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![ToolName::IndexSnapshot, ToolName::MacroSnapshot]);
    }

    #[tokio::test]
    async fn test_mock_forum_sentiment_survives_default_threshold() {
        let engine = ExecutionEngine::new(Arc::new(MockToolRunner), ExecutionConfig::default());
        let plan = enrich_plan(&build_base_plan(date()), &["코스닥"]);

        let data = engine.execute(&plan).await.unwrap();

        // 0.35*0.3 + 0.25*0.8 + 0.2*0.6 + 0.2*0.4 = 0.505
        let forum = data.blocks(ToolName::ForumSentiment);
        assert_eq!(forum.len(), 1);
        assert_eq!(forum[0].meta.quality_score(), 0.505);
        assert_eq!(data.blocks(ToolName::IndexSnapshot).len(), 2);
        assert_eq!(data.blocks(ToolName::Disclosures).len(), 2);
    }
}
