//! Gemini-backed planner client
//!
//! Sends the planning prompt to Gemini and hands back the raw text; parsing
//! and fallback happen in [`crate::planner::LlmPlanBuilder`].

use crate::gemini::GeminiClient;
use crate::planner::PlannerClient;
use crate::Result;
use async_trait::async_trait;
use tracing::debug;

const PLANNER_SYSTEM_PROMPT: &str = r#"You are a data-collection planner for a daily Korean stock market report.

Rules:
- Return ONLY valid JSON
- No explanation text
- Reference only the tools listed in the request
- Keep the mandatory tools; add news / sentiment / sector tasks only when useful"#;

pub struct GeminiPlannerClient {
    client: GeminiClient,
}

impl GeminiPlannerClient {
    pub fn new(api_key: String) -> Result<Self> {
        Ok(Self {
            client: GeminiClient::new(api_key)?,
        })
    }
}

#[async_trait]
impl PlannerClient for GeminiPlannerClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self.client.generate(prompt, PLANNER_SYSTEM_PROMPT).await?;

        debug!(response_len = response.len(), "Planner response received");

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;

    #[tokio::test]
    async fn test_complete_without_key_fails_before_any_request() {
        let client = GeminiPlannerClient::new(String::new()).unwrap();
        let result = client.complete("plan").await;
        assert!(matches!(result, Err(ReportError::PlanningError(_))));
    }
}
