//! Strategy registration: maps a store-type identifier to its scrape strategy.
//!
//! Adding a new store type: implement `ScrapeStrategy` under `plugins/` and
//! append one entry to `BUILTIN_STRATEGIES`.

use rustc_hash::FxHashMap;

use crate::plugins::{ScrapeStrategy, example_store};

pub(crate) struct StrategyInit {
    pub id: &'static str,
    pub build: fn() -> Box<dyn ScrapeStrategy>,
}

pub(crate) const BUILTIN_STRATEGIES: &[StrategyInit] = &[StrategyInit {
    id: example_store::STRATEGY_ID,
    build: example_store::boxed,
}];

/// Immutable once built; lookups never fail loudly.
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: FxHashMap<String, Box<dyn ScrapeStrategy>>,
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding every built-in strategy.
    pub fn with_builtins() -> Self {
        BUILTIN_STRATEGIES
            .iter()
            .fold(Self::empty(), |reg, init| reg.register_as(init.id, (init.build)()))
    }

    /// Installs `strategy` under its own id, replacing any previous entry.
    pub fn register(self, strategy: Box<dyn ScrapeStrategy>) -> Self {
        let id = strategy.id().to_string();
        self.register_as(&id, strategy)
    }

    pub fn register_as(mut self, id: &str, strategy: Box<dyn ScrapeStrategy>) -> Self {
        self.strategies.insert(id.to_string(), strategy);
        self
    }

    pub fn resolve(&self, strategy_id: &str) -> Option<&dyn ScrapeStrategy> {
        self.strategies.get(strategy_id).map(|s| s.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_include_reference_strategy() {
        let reg = StrategyRegistry::with_builtins();
        assert!(reg.resolve("example_store_type_1").is_some());
        assert_eq!(
            reg.resolve("example_store_type_1").map(|s| s.id()),
            Some("example_store_type_1")
        );
    }

    #[test]
    fn test_unknown_id_resolves_to_none() {
        let reg = StrategyRegistry::with_builtins();
        assert!(reg.resolve("no_such_store").is_none());
        assert!(StrategyRegistry::empty().resolve("example_store_type_1").is_none());
    }
}
