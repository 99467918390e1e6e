//! Layer Classifier
//!
//! Maps a tool to the semantic layer its records belong to:
//! - Price: index snapshot, top sectors
//! - Disclosure: regulatory disclosures
//! - Macro: rates / FX snapshot
//! - News: news search, and anything unrecognised
//! - Opinion: forum sentiment

use crate::models::{DataLayer, ToolName};

impl ToolName {
    pub fn layer(&self) -> DataLayer {
        match self {
            ToolName::IndexSnapshot | ToolName::TopSectors => DataLayer::Price,
            ToolName::Disclosures => DataLayer::Disclosure,
            ToolName::MacroSnapshot => DataLayer::Macro,
            ToolName::NewsSearch => DataLayer::News,
            ToolName::ForumSentiment => DataLayer::Opinion,
        }
    }
}

/// Classify a tool by wire name. Unknown names fall back to `News`.
pub fn layer_for_tool(tool: &str) -> DataLayer {
    ToolName::from_name(tool)
        .map(|t| t.layer())
        .unwrap_or(DataLayer::News)
}
