//! Plan compiler
//!
//! Normalizes an untrusted task list (usually parsed from planner output)
//! into typed [`TaskPlan`]s and merges it onto the baseline plan.

use crate::models::{DailyStockReportPlan, TaskPlan, ToolName};
use crate::planner::BASE_TASKS;
use crate::tools::ToolCall;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Task list shape a planner is asked to produce
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPlan {
    pub date: Option<String>,
    #[serde(default)]
    pub tasks: Vec<RawTask>,
    pub enrichment_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTask {
    pub tool: Option<String>,
    #[serde(default)]
    pub args: Map<String, Value>,
    pub purpose: Option<String>,
}

impl RawTask {
    pub fn new(tool: &str, args: Value, purpose: Option<String>) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            tool: Some(tool.to_string()),
            args,
            purpose,
        }
    }
}

/// Safe argument defaults for tools with required parameters
pub fn default_tool_args(tool: ToolName) -> Map<String, Value> {
    let defaults = match tool {
        ToolName::IndexSnapshot => json!({"indices": ["KOSPI", "KOSDAQ"]}),
        ToolName::Disclosures => json!({"importance": "high"}),
        ToolName::NewsSearch => json!({"limit": 5}),
        ToolName::TopSectors => json!({"limit": 5}),
        ToolName::ForumSentiment => json!({"topics": []}),
        ToolName::MacroSnapshot => json!({}),
    };

    match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub struct PlanCompiler {
    target_date: NaiveDate,
    allowed_tools: Vec<ToolName>,
}

impl PlanCompiler {
    /// Compiler accepting the full tool whitelist
    pub fn new(target_date: NaiveDate) -> Self {
        Self::with_allowed_tools(target_date, &ToolName::ALL)
    }

    pub fn with_allowed_tools(target_date: NaiveDate, allowed_tools: &[ToolName]) -> Self {
        Self {
            target_date,
            allowed_tools: allowed_tools.to_vec(),
        }
    }

    fn resolve(&self, name: Option<&str>) -> Option<ToolName> {
        let tool = ToolName::from_name(name?)?;
        self.allowed_tools.contains(&tool).then_some(tool)
    }

    /// Drop tasks naming no tool or a tool outside the whitelist, overlay
    /// caller args onto the tool's defaults, and drop tasks whose merged
    /// args do not fit the tool's signature.
    pub fn compile_tasks(&self, raw_tasks: &[RawTask]) -> Vec<TaskPlan> {
        let mut tasks = Vec::with_capacity(raw_tasks.len());

        for item in raw_tasks {
            let Some(tool) = self.resolve(item.tool.as_deref()) else {
                debug!(tool = ?item.tool, "Dropping task outside the tool whitelist");
                continue;
            };

            let mut args = default_tool_args(tool);
            for (key, value) in &item.args {
                args.insert(key.clone(), value.clone());
            }

            let task = TaskPlan {
                tool,
                args,
                purpose: item.purpose.clone(),
            };
            if let Err(e) = ToolCall::from_task(&task) {
                debug!(tool = %tool, error = %e, "Dropping task with unusable args");
                continue;
            }

            tasks.push(task);
        }

        tasks
    }

    /// Baseline tasks first, then the compiled extras. Mandatory tools that
    /// the baseline already schedules are not added a second time.
    pub fn merge_with_base(
        &self,
        base_plan: &DailyStockReportPlan,
        raw_plan: &RawPlan,
    ) -> DailyStockReportPlan {
        let extra_tasks = self.compile_tasks(&raw_plan.tasks);
        let mut merged = base_plan.tasks.clone();

        for task in extra_tasks {
            let in_base = base_plan.tasks.iter().any(|t| t.tool == task.tool);
            if in_base && BASE_TASKS.contains(&task.tool) {
                continue;
            }
            merged.push(task);
        }

        DailyStockReportPlan {
            date: self.target_date,
            tasks: merged,
            base_tasks: base_plan.base_tasks.clone(),
            enrichment_reason: raw_plan.enrichment_reason.clone(),
        }
    }
}
