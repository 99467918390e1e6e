//! Daily report pipeline
//!
//! PLAN → COLLECT → REPORT
//!
//! The baseline routine (index, macro, disclosures) is always collected;
//! cue- or planner-driven enrichment is merged on top, and only records
//! that pass the quality filter reach the report.

use crate::config::AppConfig;
use crate::execution::{ExecutionConfig, ExecutionEngine};
use crate::models::{DailyStockReportData, DailyStockReportOutput, DailyStockReportPlan};
use crate::planner::{GeminiPlannerClient, LlmPlanBuilder, PlannerClient};
use crate::report::{ReportBuilder, ReportPrompt};
use crate::tools::{create_runner, ToolRunner};
use crate::Result;
use chrono::{Duration, NaiveDate, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Current calendar date in Korea (UTC+9)
pub fn today_kst() -> NaiveDate {
    (Utc::now() + Duration::hours(9)).date_naive()
}

pub struct DailyReportPipeline {
    planner: LlmPlanBuilder,
    executor: ExecutionEngine,
    report_builder: ReportBuilder,
}

impl DailyReportPipeline {
    pub fn new(
        planner: LlmPlanBuilder,
        runner: Arc<dyn ToolRunner>,
        execution: ExecutionConfig,
    ) -> Self {
        Self {
            planner,
            executor: ExecutionEngine::new(runner, execution),
            report_builder: ReportBuilder::new(),
        }
    }

    /// Wire the pipeline from configuration. The Gemini planner is used when
    /// a key is present; live tools when `live_tools` is set. The result is
    /// not tied to a date, so one instance serves every run of a process.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client: Option<Arc<dyn PlannerClient>> = match &config.gemini_api_key {
            Some(key) => Some(Arc::new(GeminiPlannerClient::new(key.clone())?)),
            None => None,
        };
        let runner = create_runner(config)?;

        info!(
            planner = if client.is_some() { "gemini" } else { "cue_fallback" },
            live_tools = config.live_tools,
            "Pipeline initialized"
        );

        Ok(Self::new(LlmPlanBuilder::new(client), runner, config.execution))
    }

    pub async fn build_plan(
        &self,
        target_date: NaiveDate,
        cues: &[String],
        base_snapshot: Option<&Value>,
    ) -> Result<DailyStockReportPlan> {
        self.planner.build(target_date, cues, base_snapshot).await
    }

    pub async fn collect(&self, plan: &DailyStockReportPlan) -> Result<DailyStockReportData> {
        self.executor.execute(plan).await
    }

    pub fn build_report(&self, data: DailyStockReportData) -> DailyStockReportOutput {
        self.report_builder.build_report(data)
    }

    pub fn build_llm_prompt(&self, data: &DailyStockReportData) -> ReportPrompt {
        self.report_builder.build_prompt(data)
    }

    /// Plan, collect and assemble the text report in one go
    pub async fn run(
        &self,
        target_date: NaiveDate,
        cues: &[String],
        base_snapshot: Option<&Value>,
    ) -> Result<DailyStockReportOutput> {
        let start = Instant::now();

        info!(date = %target_date, cue_count = cues.len(), "Report run starting");

        let plan = self.build_plan(target_date, cues, base_snapshot).await?;
        let data = self.collect(&plan).await?;
        let block_count = data.block_count();

        let mut output = self.build_report(data);
        output.metadata.insert("task_count".to_string(), json!(plan.tasks.len()));
        output
            .metadata
            .insert("enrichment_reason".to_string(), json!(plan.enrichment_reason));
        output.metadata.insert("block_count".to_string(), json!(block_count));

        info!(
            date = %target_date,
            task_count = plan.tasks.len(),
            block_count,
            section_count = output.sections.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Report run completed"
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use crate::models::{DataLayer, ToolRecord};
    use crate::report::OPINION_CAUTION;
    use crate::tools::MockToolRunner;
    use async_trait::async_trait;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 4).unwrap()
    }

    fn cues(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// One record per call; forum records use the given scores
    struct UniformRunner {
        forum_scores: (f64, f64, f64, f64),
    }

    impl UniformRunner {
        fn high_quality() -> Self {
            Self {
                forum_scores: (0.8, 0.8, 0.8, 0.8),
            }
        }

        fn record(title: &str) -> Vec<ToolRecord> {
            vec![ToolRecord::new(title, format!("{} 상세", title)).scores(0.9, 0.9, 0.8, 0.8)]
        }
    }

    #[async_trait]
    impl ToolRunner for UniformRunner {
        async fn get_index_snapshot(
            &self,
            _indices: &[String],
            _target_date: NaiveDate,
        ) -> Result<Vec<ToolRecord>> {
            Ok(Self::record("지수"))
        }

        async fn get_top_sectors(&self, _limit: usize) -> Result<Vec<ToolRecord>> {
            Ok(Self::record("섹터"))
        }

        async fn get_dart_disclosures(
            &self,
            _importance: &str,
            _target_date: NaiveDate,
        ) -> Result<Vec<ToolRecord>> {
            Ok(Self::record("공시"))
        }

        async fn get_macro_snapshot(&self) -> Result<Vec<ToolRecord>> {
            Ok(Self::record("거시"))
        }

        async fn search_kr_stock_news(
            &self,
            query: &str,
            _limit: usize,
            _target_date: NaiveDate,
        ) -> Result<Vec<ToolRecord>> {
            Ok(Self::record(&format!("{} 뉴스", query)))
        }

        async fn get_forum_sentiment(&self, _topics: &[String]) -> Result<Vec<ToolRecord>> {
            let (s, r, st, c) = self.forum_scores;
            Ok(vec![ToolRecord::new("심리", "커뮤니티 요약").scores(s, r, st, c)])
        }
    }

    struct BrokenNewsRunner;

    #[async_trait]
    impl ToolRunner for BrokenNewsRunner {
        async fn get_index_snapshot(
            &self,
            indices: &[String],
            target_date: NaiveDate,
        ) -> Result<Vec<ToolRecord>> {
            MockToolRunner.get_index_snapshot(indices, target_date).await
        }

        async fn get_top_sectors(&self, limit: usize) -> Result<Vec<ToolRecord>> {
            MockToolRunner.get_top_sectors(limit).await
        }

        async fn get_dart_disclosures(
            &self,
            importance: &str,
            target_date: NaiveDate,
        ) -> Result<Vec<ToolRecord>> {
            MockToolRunner.get_dart_disclosures(importance, target_date).await
        }

        async fn get_macro_snapshot(&self) -> Result<Vec<ToolRecord>> {
            MockToolRunner.get_macro_snapshot().await
        }

        async fn search_kr_stock_news(
            &self,
            _query: &str,
            _limit: usize,
            _target_date: NaiveDate,
        ) -> Result<Vec<ToolRecord>> {
            Err(ReportError::ToolError("news provider unavailable".to_string()))
        }

        async fn get_forum_sentiment(&self, topics: &[String]) -> Result<Vec<ToolRecord>> {
            MockToolRunner.get_forum_sentiment(topics).await
        }
    }

    fn pipeline(runner: Arc<dyn ToolRunner>, execution: ExecutionConfig) -> DailyReportPipeline {
        DailyReportPipeline::new(LlmPlanBuilder::default(), runner, execution)
    }

    #[tokio::test]
    async fn test_end_to_end_sections_in_display_order() {
        let pipeline = pipeline(
            Arc::new(UniformRunner::high_quality()),
            ExecutionConfig::default(),
        );

        let output = pipeline.run(date(), &cues(&["밸류업"]), None).await.unwrap();

        let layers: Vec<DataLayer> = output.sections.iter().map(|s| s.layer).collect();
        assert_eq!(
            layers,
            vec![
                DataLayer::Price,
                DataLayer::Disclosure,
                DataLayer::Macro,
                DataLayer::News,
                DataLayer::Opinion,
            ]
        );
        for section in &output.sections {
            assert!(!section.summary.is_empty());
            if section.layer == DataLayer::Opinion {
                assert_eq!(section.caution.as_deref(), Some(OPINION_CAUTION));
            } else {
                assert!(section.caution.is_none());
            }
        }
        assert_eq!(output.sections[3].summary, "밸류업 뉴스");
    }

    #[tokio::test]
    async fn test_run_fills_metadata() {
        let pipeline = pipeline(
            Arc::new(UniformRunner::high_quality()),
            ExecutionConfig::default(),
        );

        let output = pipeline
            .run(date(), &cues(&["코스닥", "밸류업"]), None)
            .await
            .unwrap();

        assert_eq!(output.metadata.get("task_count"), Some(&json!(7)));
        assert_eq!(output.metadata.get("block_count"), Some(&json!(7)));
        assert_eq!(
            output.metadata.get("enrichment_reason"),
            Some(&json!("코스닥, 밸류업"))
        );
        assert_eq!(output.raw_data.block_count(), 7);
        assert_eq!(output.date, date());
    }

    #[tokio::test]
    async fn test_low_quality_opinion_is_filtered_out() {
        // 0.35*0.2 + 0.25*0.5 + 0.2*0.3 + 0.2*0.3 = 0.315
        let runner = UniformRunner {
            forum_scores: (0.2, 0.5, 0.3, 0.3),
        };
        let pipeline = pipeline(Arc::new(runner), ExecutionConfig::default());

        let output = pipeline.run(date(), &cues(&["밸류업"]), None).await.unwrap();

        assert!(output.sections.iter().all(|s| s.heading != "시장 심리"));
        assert!(output.sections.iter().all(|s| s.caution.is_none()));
        assert_eq!(output.sections.len(), 4);
    }

    #[tokio::test]
    async fn test_stricter_threshold_drops_mock_sentiment() {
        let strict = ExecutionConfig {
            minimum_quality: 0.6,
            ..ExecutionConfig::default()
        };
        let pipeline = pipeline(Arc::new(MockToolRunner), strict);

        let output = pipeline.run(date(), &cues(&["반도체"]), None).await.unwrap();

        assert!(output.sections.iter().all(|s| s.layer != DataLayer::Opinion));
        assert!(output.sections.iter().any(|s| s.layer == DataLayer::News));
    }

    #[tokio::test]
    async fn test_mock_run_without_cues() {
        let pipeline = pipeline(Arc::new(MockToolRunner), ExecutionConfig::default());

        let output = pipeline.run(date(), &[], None).await.unwrap();

        let headings: Vec<&str> = output.sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["지수/섹터", "공시/기업 이벤트", "거시/정책"]);
        assert_eq!(output.metadata.get("task_count"), Some(&json!(3)));
        assert_eq!(output.metadata.get("enrichment_reason"), Some(&Value::Null));
        assert!(output.to_text().starts_with("국내 주식 일일 리포트 (2025-12-04)"));
    }

    #[tokio::test]
    async fn test_prompt_from_collected_data() {
        let pipeline = pipeline(Arc::new(MockToolRunner), ExecutionConfig::default());

        let plan = pipeline
            .build_plan(date(), &cues(&["밸류업"]), None)
            .await
            .unwrap();
        let data = pipeline.collect(&plan).await.unwrap();
        let prompt = pipeline.build_llm_prompt(&data);

        assert_eq!(prompt.summaries.len(), data.block_count());
        assert_eq!(prompt.date, "2025-12-04");
    }

    #[tokio::test]
    async fn test_tool_failure_fails_the_run() {
        let pipeline = pipeline(Arc::new(BrokenNewsRunner), ExecutionConfig::default());

        let result = pipeline.run(date(), &cues(&["밸류업"]), None).await;
        assert!(matches!(result, Err(ReportError::ToolError(_))));
    }

    #[test]
    fn test_from_default_config_uses_mock_tools() {
        let pipeline = DailyReportPipeline::from_config(&AppConfig::default()).unwrap();
        assert!(!pipeline.planner.has_client());
    }

    #[tokio::test]
    async fn test_one_pipeline_serves_several_dates() {
        let pipeline = DailyReportPipeline::from_config(&AppConfig::default()).unwrap();
        let next_day = NaiveDate::from_ymd_opt(2025, 12, 5).unwrap();

        let first = pipeline.run(date(), &[], None).await.unwrap();
        let second = pipeline.run(next_day, &[], None).await.unwrap();

        assert_eq!(first.date, date());
        assert_eq!(second.date, next_day);
        assert_eq!(second.raw_data.date, next_day);
    }

    struct CannedPlanner(&'static str);

    #[async_trait]
    impl PlannerClient for CannedPlanner {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_planner_tasks_with_bad_args_do_not_fail_the_run() {
        let planner = LlmPlanBuilder::new(Some(Arc::new(CannedPlanner(
            r#"{"tasks": [
                {"tool": "search_kr_stock_news", "args": {}},
                {"tool": "get_top_sectors", "args": {"limit": "3"}},
                {"tool": "search_kr_stock_news", "args": {"query": "반도체"}}
            ]}"#,
        ))));
        let pipeline = DailyReportPipeline::new(
            planner,
            Arc::new(MockToolRunner),
            ExecutionConfig::default(),
        );

        let output = pipeline.run(date(), &[], None).await.unwrap();

        assert_eq!(output.metadata.get("task_count"), Some(&json!(4)));
        let news = output.raw_data.blocks(crate::models::ToolName::NewsSearch);
        assert_eq!(news.len(), 1);
        assert!(news[0].title.contains("반도체"));
    }
}
