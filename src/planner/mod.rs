//! Planner: fixed baseline routine plus optional enrichment
//!
//! The baseline (index, macro, disclosures) is always scheduled. A planner
//! client (LLM) may only propose extra news / sentiment / sector tasks,
//! which go through [`PlanCompiler`] before they reach the executor.

use crate::models::{DailyStockReportPlan, TaskPlan, ToolName};
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod compiler;
pub mod gemini;

pub use compiler::{PlanCompiler, RawPlan, RawTask};
pub use gemini::GeminiPlannerClient;

/// Tools every plan runs exactly once
pub const BASE_TASKS: [ToolName; 3] = [
    ToolName::IndexSnapshot,
    ToolName::MacroSnapshot,
    ToolName::Disclosures,
];

/// External text-completion service used to propose enrichment tasks
#[async_trait]
pub trait PlannerClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Minimum plan: index snapshot, macro snapshot and high-importance disclosures
pub fn build_base_plan(target_date: NaiveDate) -> DailyStockReportPlan {
    let tasks = vec![
        TaskPlan {
            tool: ToolName::IndexSnapshot,
            args: object(json!({"indices": ["KOSPI", "KOSDAQ"]})),
            purpose: Some("지수 스냅샷".to_string()),
        },
        TaskPlan {
            tool: ToolName::MacroSnapshot,
            args: Map::new(),
            purpose: Some("금리/환율 등 거시".to_string()),
        },
        TaskPlan {
            tool: ToolName::Disclosures,
            args: object(json!({"importance": "high"})),
            purpose: Some("주요 공시 이벤트".to_string()),
        },
    ];

    DailyStockReportPlan {
        date: target_date,
        tasks,
        base_tasks: BASE_TASKS.to_vec(),
        enrichment_reason: None,
    }
}

/// Append a news search and a forum sentiment task per cue
pub fn enrich_plan<S: AsRef<str>>(base_plan: &DailyStockReportPlan, cues: &[S]) -> DailyStockReportPlan {
    let mut tasks = base_plan.tasks.clone();

    for cue in cues {
        let cue = cue.as_ref();
        tasks.push(TaskPlan {
            tool: ToolName::NewsSearch,
            args: object(json!({"query": cue, "limit": 5})),
            purpose: Some(format!("{} 관련 뉴스 보강", cue)),
        });
        tasks.push(TaskPlan {
            tool: ToolName::ForumSentiment,
            args: object(json!({"topics": [cue]})),
            purpose: Some(format!("{} 시장 심리", cue)),
        });
    }

    DailyStockReportPlan {
        date: base_plan.date,
        tasks,
        base_tasks: base_plan.base_tasks.clone(),
        enrichment_reason: join_cues(cues),
    }
}

fn join_cues<S: AsRef<str>>(cues: &[S]) -> Option<String> {
    if cues.is_empty() {
        None
    } else {
        Some(
            cues.iter()
                .map(|c| c.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

/// Context rendered into the planner prompt
#[derive(Debug, Clone)]
pub struct PlannerContext {
    pub target_date: NaiveDate,
    pub cues: Vec<String>,
    pub base_snapshot: Option<Value>,
}

impl PlannerContext {
    pub fn describe(&self) -> String {
        let snapshot = self
            .base_snapshot
            .as_ref()
            .filter(|v| !is_empty_snapshot(v))
            .map(|v| v.to_string())
            .unwrap_or_else(|| "요약 없음".to_string());
        let cue_line = join_cues(self.cues.as_slice()).unwrap_or_else(|| "없음".to_string());

        format!(
            "대상 일자: {}\n시장 키워드: {}\n최근 스냅샷: {}",
            self.target_date, cue_line, snapshot
        )
    }
}

fn is_empty_snapshot(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Strip markdown fences and parse a planner response as a [`RawPlan`]
pub fn parse_raw_plan(response: &str) -> Option<RawPlan> {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    serde_json::from_str(cleaned).ok()
}

/// Builds the day's plan: baseline plus planner-proposed (or cue-derived)
/// enrichment.
#[derive(Default)]
pub struct LlmPlanBuilder {
    client: Option<Arc<dyn PlannerClient>>,
}

impl LlmPlanBuilder {
    pub fn new(client: Option<Arc<dyn PlannerClient>>) -> Self {
        Self { client }
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    fn render_prompt(&self, context: &PlannerContext) -> String {
        format!(
            r#"너는 국내 주식 일일 리포트용 정보 수집 플래너이다.
반드시 MCP 툴 이름과 args만 포함된 JSON을 출력하라. 다른 텍스트는 금지.
필수 툴: get_index_snapshot, get_macro_snapshot, get_dart_disclosures는 항상 포함한다.
신뢰성 높은 데이터(지수/거시/공시) 위주로 두고, 필요시 뉴스/커뮤니티 확장을 추가한다.
뉴스/커뮤니티는 다양한 관점을 섞기 위해 여러 query를 사용할 수 있다.
사용 가능한 툴: {}
structure: {{
  "date": "YYYY-MM-DD",
  "tasks": [ {{ "tool": "name", "args": {{...}}, "purpose": "optional" }} ],
  "enrichment_reason": "optional"
}}
컨텍스트:
{}
"#,
            ToolName::ALL
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            context.describe()
        )
    }

    /// Paired news + sentiment tasks per cue, used when no planner answer
    /// is available
    fn fallback_plan(target_date: NaiveDate, cues: &[String]) -> RawPlan {
        let mut tasks = Vec::with_capacity(cues.len() * 2);
        for cue in cues {
            tasks.push(RawTask::new(
                ToolName::NewsSearch.as_str(),
                json!({"query": cue, "limit": 5}),
                Some(format!("{} 뉴스 보강", cue)),
            ));
            tasks.push(RawTask::new(
                ToolName::ForumSentiment.as_str(),
                json!({"topics": [cue]}),
                Some(format!("{} 커뮤니티 심리", cue)),
            ));
        }

        RawPlan {
            date: Some(target_date.to_string()),
            tasks,
            enrichment_reason: join_cues(cues),
        }
    }

    pub async fn build(
        &self,
        target_date: NaiveDate,
        cues: &[String],
        base_snapshot: Option<&Value>,
    ) -> Result<DailyStockReportPlan> {
        let base_plan = build_base_plan(target_date);

        let raw_plan = match &self.client {
            Some(client) => {
                let context = PlannerContext {
                    target_date,
                    cues: cues.to_vec(),
                    base_snapshot: base_snapshot.cloned(),
                };
                let prompt = self.render_prompt(&context);
                let response = client.complete(&prompt).await?;

                match parse_raw_plan(&response) {
                    Some(raw) => {
                        debug!(task_count = raw.tasks.len(), "Planner response parsed");
                        raw
                    }
                    None => {
                        warn!(
                            response_len = response.len(),
                            "Planner response is not a task list, using cue fallback"
                        );
                        Self::fallback_plan(target_date, cues)
                    }
                }
            }
            None => Self::fallback_plan(target_date, cues),
        };

        if cues.is_empty() && raw_plan.tasks.is_empty() {
            // nothing to enrich with: baseline only
            return Ok(enrich_plan(&base_plan, cues));
        }

        let plan = PlanCompiler::new(target_date).merge_with_base(&base_plan, &raw_plan);

        info!(
            date = %target_date,
            task_count = plan.tasks.len(),
            enrichment = ?plan.enrichment_reason,
            "Plan compiled"
        );

        Ok(plan)
    }
}
