//! Daily Korean Stock Report Controller
//!
//! Builds a daily domestic stock market report that:
//! - Always collects a trusted baseline (index, macro, disclosures)
//! - Enriches it with cue- or LLM-proposed news and sentiment tasks
//! - Compiles every proposed task against a closed tool whitelist
//! - Scores each collected record and drops low-quality ones
//! - Assembles a layered text report and a summarization payload
//!
//! PIPELINE:
//! PLAN → COMPILE → EXECUTE → FILTER → REPORT

pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod execution;
pub mod gemini;
pub mod models;
pub mod pipeline;
pub mod planner;
pub mod quality;
pub mod report;
pub mod tools;

pub use error::{ReportError, Result};

// Re-export common types
pub use classifier::layer_for_tool;
pub use config::AppConfig;
pub use models::*;
pub use pipeline::DailyReportPipeline;
pub use quality::QualityBand;
pub use report::{ReportBuilder, ReportPrompt};
