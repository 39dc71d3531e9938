use std::time::Duration;

use parley_client::GenerationConfig;
use serde::{Deserialize, Serialize};

use crate::sources::SourceDisplay;

pub const DEFAULT_GREETING: &str = "Hello, how can I help you?";
pub const DEFAULT_PLACEHOLDER: &str = "Type a message";
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Everything a host application configures on one widget instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub dark_mode: bool,
    pub generation: GenerationConfig,
    /// Shown as the first assistant message of an empty thread; empty disables it.
    pub greeting: String,
    pub placeholder: String,
    pub starter_prompts: Vec<String>,
    pub source_display: SourceDisplay,
    pub page_size: u32,
    pub pacing: RevealPacing,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            dark_mode: false,
            generation: GenerationConfig::default(),
            greeting: DEFAULT_GREETING.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            starter_prompts: Vec::new(),
            source_display: SourceDisplay::default(),
            page_size: DEFAULT_PAGE_SIZE,
            pacing: RevealPacing::default(),
        }
    }
}

/// Timing of the simulated typing and of job polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealPacing {
    /// Models whose ticks are revealed over the longer budget.
    pub high_tier_models: Vec<String>,
    pub high_tier_reveal_ms: u64,
    pub standard_reveal_ms: u64,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

impl Default for RevealPacing {
    fn default() -> Self {
        Self {
            high_tier_models: vec!["gpt-4".to_string()],
            high_tier_reveal_ms: 500,
            standard_reveal_ms: 250,
            poll_interval_ms: 500,
            max_polls: 200,
        }
    }
}

impl RevealPacing {
    /// Total time one tick's chunks take to reveal, whatever their count.
    pub fn tick_budget(&self, model: &str) -> Duration {
        if self.high_tier_models.iter().any(|m| m == model) {
            Duration::from_millis(self.high_tier_reveal_ms)
        } else {
            Duration::from_millis(self.standard_reveal_ms)
        }
    }

    /// Pause after each chunk when a tick yields `chunks` chunks.
    pub fn chunk_delay(&self, model: &str, chunks: usize) -> Duration {
        let chunks = u32::try_from(chunks.max(1)).unwrap_or(u32::MAX);
        self.tick_budget(model) / chunks
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_delay_splits_budget() {
        let pacing = RevealPacing::default();
        assert_eq!(pacing.chunk_delay("gpt-4", 4), Duration::from_millis(125));
        assert_eq!(pacing.chunk_delay("gpt-3.5-turbo", 5), Duration::from_millis(50));
        assert_eq!(pacing.chunk_delay("gpt-4", 0), Duration::from_millis(500));
    }

    #[test]
    fn test_defaults() {
        let config = WidgetConfig::default();
        assert_eq!(config.greeting, DEFAULT_GREETING);
        assert_eq!(config.page_size, 10);
        assert_eq!(config.pacing.max_polls, 200);
        assert_eq!(config.source_display, SourceDisplay::LinkToSourceOnly);
    }
}
