//! Tool runner trait and typed tool calls
//!
//! A plan task names one of the whitelisted tools plus a JSON argument
//! object. Before a call is made the task is turned into a [`ToolCall`],
//! so each tool receives exactly the arguments it declares.

use crate::config::AppConfig;
use crate::error::ReportError;
use crate::models::{TaskPlan, ToolName, ToolRecord};
use crate::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub mod live;
pub mod mock;
pub mod policy;

pub use live::LiveToolRunner;
pub use mock::MockToolRunner;

/// Data-fetch collaborator. Implementations should only reach
/// whitelisted provider domains. Date-sensitive operations receive the
/// report date with each call.
#[async_trait::async_trait]
pub trait ToolRunner: Send + Sync {
    async fn get_index_snapshot(
        &self,
        indices: &[String],
        target_date: NaiveDate,
    ) -> Result<Vec<ToolRecord>>;

    async fn get_top_sectors(&self, limit: usize) -> Result<Vec<ToolRecord>>;

    async fn get_dart_disclosures(
        &self,
        importance: &str,
        target_date: NaiveDate,
    ) -> Result<Vec<ToolRecord>>;

    async fn get_macro_snapshot(&self) -> Result<Vec<ToolRecord>>;

    async fn search_kr_stock_news(
        &self,
        query: &str,
        limit: usize,
        target_date: NaiveDate,
    ) -> Result<Vec<ToolRecord>>;

    async fn get_forum_sentiment(&self, topics: &[String]) -> Result<Vec<ToolRecord>>;

    /// Dispatch a typed call to the matching operation
    async fn call(&self, call: &ToolCall, target_date: NaiveDate) -> Result<Vec<ToolRecord>> {
        match call {
            ToolCall::IndexSnapshot { indices } => {
                self.get_index_snapshot(indices, target_date).await
            }
            ToolCall::TopSectors { limit } => self.get_top_sectors(*limit).await,
            ToolCall::Disclosures { importance } => {
                self.get_dart_disclosures(importance, target_date).await
            }
            ToolCall::MacroSnapshot {} => self.get_macro_snapshot().await,
            ToolCall::NewsSearch { query, limit } => {
                self.search_kr_stock_news(query, *limit, target_date).await
            }
            ToolCall::ForumSentiment { topics } => self.get_forum_sentiment(topics).await,
        }
    }
}

/// A tool invocation with its arguments checked against the tool's shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "args")]
pub enum ToolCall {
    #[serde(rename = "get_index_snapshot")]
    IndexSnapshot { indices: Vec<String> },
    #[serde(rename = "get_top_sectors")]
    TopSectors { limit: usize },
    #[serde(rename = "get_dart_disclosures")]
    Disclosures { importance: String },
    #[serde(rename = "get_macro_snapshot")]
    MacroSnapshot {},
    #[serde(rename = "search_kr_stock_news")]
    NewsSearch { query: String, limit: usize },
    #[serde(rename = "get_forum_sentiment")]
    ForumSentiment { topics: Vec<String> },
}

impl ToolCall {
    pub fn from_task(task: &TaskPlan) -> Result<Self> {
        let value = json!({
            "tool": task.tool.as_str(),
            "args": task.args,
        });

        serde_json::from_value(value).map_err(|e| {
            ReportError::InvalidToolInput(format!("{} rejected its args: {}", task.tool, e))
        })
    }

    pub fn tool(&self) -> ToolName {
        match self {
            ToolCall::IndexSnapshot { .. } => ToolName::IndexSnapshot,
            ToolCall::TopSectors { .. } => ToolName::TopSectors,
            ToolCall::Disclosures { .. } => ToolName::Disclosures,
            ToolCall::MacroSnapshot {} => ToolName::MacroSnapshot,
            ToolCall::NewsSearch { .. } => ToolName::NewsSearch,
            ToolCall::ForumSentiment { .. } => ToolName::ForumSentiment,
        }
    }
}

/// Live providers when enabled, demo data otherwise. The returned runner
/// is date-independent and can serve every request of a process.
pub fn create_runner(config: &AppConfig) -> Result<Arc<dyn ToolRunner>> {
    if config.live_tools {
        Ok(Arc::new(LiveToolRunner::from_config(config)?))
    } else {
        Ok(Arc::new(MockToolRunner))
    }
}
