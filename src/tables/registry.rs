//! Mapping from detection method to extractor.
//!
//! Registration happens once, before extraction starts; lookups afterwards
//! only read. There is no discovery: an extractor is available only if it
//! was registered explicitly.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::tables::ai_driven::{AiDrivenExtractor, LayoutModel};
use crate::tables::extractor::TableExtractor;
use crate::tables::hybrid::HybridExtractor;
use crate::tables::method::DetectionMethod;
use crate::tables::rule_based::RuleBasedExtractor;

/// Registered extractors, in registration order.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: IndexMap<DetectionMethod, Arc<dyn TableExtractor>>,
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.extractors.iter().map(|(m, e)| (m.as_str(), e.name())))
            .finish()
    }
}

impl ExtractorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in extractors.
    ///
    /// Rule-based is always registered. With a layout model, AI-driven and
    /// hybrid are registered too; without one they stay unknown and the
    /// service falls back past them.
    pub fn with_defaults(config: &ExtractionConfig, model: Option<Arc<dyn LayoutModel>>) -> Self {
        let mut registry = Self::new();
        let rules = RuleBasedExtractor::new(config);
        registry.register(DetectionMethod::RuleBased, Arc::new(rules.clone()));

        if let Some(model) = model {
            let ai = AiDrivenExtractor::new(model, config);
            registry.register(DetectionMethod::AiDriven, Arc::new(ai.clone()));
            registry.register(
                DetectionMethod::Hybrid,
                Arc::new(HybridExtractor::new(ai, rules, config)),
            );
        }

        registry
    }

    /// Bind an extractor to a method. A second registration for the same
    /// method replaces the first.
    pub fn register(&mut self, method: DetectionMethod, extractor: Arc<dyn TableExtractor>) {
        let name = extractor.name();
        match self.extractors.insert(method, extractor) {
            Some(previous) => log::info!(
                "Replaced extractor for {}: {} -> {}",
                method,
                previous.name(),
                name
            ),
            None => log::debug!("Registered extractor {} for {}", name, method),
        }
    }

    /// Look up the extractor for a method.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownMethod`] if nothing is registered for `method`.
    pub fn resolve(&self, method: DetectionMethod) -> Result<Arc<dyn TableExtractor>> {
        self.extractors
            .get(&method)
            .cloned()
            .ok_or(Error::UnknownMethod(method))
    }

    /// Whether a method is registered.
    pub fn contains(&self, method: DetectionMethod) -> bool {
        self.extractors.contains_key(&method)
    }

    /// Registered methods in registration order.
    pub fn methods(&self) -> impl Iterator<Item = DetectionMethod> + '_ {
        self.extractors.keys().copied()
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}
