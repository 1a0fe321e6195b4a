//! Engine configuration.
//!
//! `EngineConfig` is a plain value handed to [`Runtime::with_config`](crate::Runtime::with_config).
//! It derives serde so hosts can embed it in their own config files.

use serde::{Deserialize, Serialize};

/// How the keyed list differ realises a move of a keyed child that is not
/// part of the longest increasing subsequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveStrategy {
    /// Destroy the live node and recreate it at the new position. Component
    /// children keep their runtime record (state carry); everything else in
    /// the subtree is rebuilt, so node-local transient state is lost.
    #[default]
    Recreate,
    /// Detach the existing node and reinsert it at the new position, then
    /// reconcile it in place. The whole subtree survives.
    Relocate,
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tag used when a template does not name one.
    pub default_tag: String,
    /// Tag of the document's permanent root element.
    pub root_tag: String,
    /// Keyed move realisation.
    pub move_strategy: MoveStrategy,
    /// Upper bound on re-render batches processed in one checkpoint. Enqueues
    /// made during a flush start a new batch.
    pub max_flush_passes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_tag: "div".to_string(),
            root_tag: "body".to_string(),
            move_strategy: MoveStrategy::Recreate,
            max_flush_passes: 16,
        }
    }
}

impl EngineConfig {
    pub fn with_default_tag(mut self, tag: impl Into<String>) -> Self {
        self.default_tag = tag.into();
        self
    }

    pub fn with_root_tag(mut self, tag: impl Into<String>) -> Self {
        self.root_tag = tag.into();
        self
    }

    pub fn with_move_strategy(mut self, strategy: MoveStrategy) -> Self {
        self.move_strategy = strategy;
        self
    }

    /// Clamped to at least one pass.
    pub fn with_max_flush_passes(mut self, passes: usize) -> Self {
        self.max_flush_passes = passes.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_tag, "div");
        assert_eq!(config.root_tag, "body");
        assert_eq!(config.move_strategy, MoveStrategy::Recreate);
        assert_eq!(config.max_flush_passes, 16);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "move_strategy": "relocate" }"#).unwrap();
        assert_eq!(config.move_strategy, MoveStrategy::Relocate);
        assert_eq!(config.default_tag, "div");
    }

    #[test]
    fn test_flush_passes_clamped() {
        let config = EngineConfig::default().with_max_flush_passes(0);
        assert_eq!(config.max_flush_passes, 1);
    }
}
