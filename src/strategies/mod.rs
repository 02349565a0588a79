//! Prompt strategies: named templates that phrase the analysis request.
//!
//! A strategy is a pure function of `(source, language)`. The catalog maps ids to
//! strategies and never fails a lookup: unknown ids resolve to [`DEFAULT_STRATEGY`].

pub mod contract;
pub mod default;
pub mod ensemble;
pub mod example;
pub mod known;
pub mod smell;
pub mod tagging;

use std::sync::Arc;

pub use contract::{output_contract, response_schema, schema_instruction};

/// Id of the strategy unknown ids fall back to.
pub const DEFAULT_STRATEGY: &str = "DEFAULT";

/// One way of phrasing the request sent to the model.
///
/// Implementations must be deterministic and must embed [`output_contract`]
/// verbatim, since the response parser relies on that shape.
pub trait Strategy: Send + Sync {
    /// Unique id, upper-case by convention.
    fn id(&self) -> &'static str;

    /// One-line description shown in strategy selectors.
    fn description(&self) -> &'static str;

    /// Render the full prompt text for this source fragment.
    fn render(&self, source: &str, language: &str) -> String;
}

/// Ordered, immutable-after-construction mapping from id to strategy.
#[derive(Clone)]
pub struct StrategyCatalog {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StrategyCatalog {
    /// Catalog with every built-in strategy, `DEFAULT` first.
    pub fn builtin() -> Self {
        Self {
            strategies: vec![
                Arc::new(default::DefaultStrategy),
                Arc::new(ensemble::EnsembleStrategy),
                Arc::new(example::ExampleStrategy),
                Arc::new(smell::SmellStrategy),
                Arc::new(known::KnownViolationStrategy),
                Arc::new(tagging::TaggingStrategy),
            ],
        }
    }

    /// Register an additional strategy. An existing id is replaced in place,
    /// keeping its position in the listing.
    pub fn with(mut self, strategy: impl Strategy + 'static) -> Self {
        let strategy: Arc<dyn Strategy> = Arc::new(strategy);
        match self
            .strategies
            .iter()
            .position(|s| s.id().eq_ignore_ascii_case(strategy.id()))
        {
            Some(idx) => self.strategies[idx] = strategy,
            None => self.strategies.push(strategy),
        }
        self
    }

    /// Strategy ids in registration order.
    pub fn list_strategy_ids(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    /// `(id, description)` pairs in registration order.
    pub fn describe(&self) -> Vec<(&'static str, &'static str)> {
        self.strategies
            .iter()
            .map(|s| (s.id(), s.description()))
            .collect()
    }

    /// Exact lookup (trimmed, ASCII case-insensitive). `None` for unknown ids.
    pub fn get(&self, id: &str) -> Option<&dyn Strategy> {
        let id = id.trim();
        self.strategies
            .iter()
            .find(|s| s.id().eq_ignore_ascii_case(id))
            .map(|s| s.as_ref())
    }

    /// Lookup that never fails: unknown ids resolve to the default strategy.
    pub fn resolve(&self, id: &str) -> &dyn Strategy {
        if let Some(strategy) = self.get(id) {
            return strategy;
        }
        tracing::debug!(strategy = id, "unknown strategy, using {DEFAULT_STRATEGY}");
        self.get(DEFAULT_STRATEGY)
            .or_else(|| self.strategies.first().map(|s| s.as_ref()))
            .unwrap_or(&default::DefaultStrategy)
    }

    /// Render the prompt for `id`, falling back to the default strategy.
    /// Returns the id actually used alongside the prompt.
    pub fn build_prompt(&self, id: &str, source: &str, language: &str) -> (&'static str, String) {
        let strategy = self.resolve(id);
        (strategy.id(), strategy.render(source, language))
    }
}

impl std::fmt::Debug for StrategyCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyCatalog")
            .field("strategies", &self.list_strategy_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "public class Report {\n    void print() {}\n    void save() {}\n}";

    #[test]
    fn builtin_ids_are_ordered_and_unique() {
        let catalog = StrategyCatalog::builtin();
        let ids = catalog.list_strategy_ids();
        assert_eq!(ids, vec!["DEFAULT", "ENSEMBLE", "EXAMPLE", "SMELL", "KNOWN", "TAGGING"]);
    }

    #[test]
    fn unknown_id_resolves_to_default() {
        let catalog = StrategyCatalog::builtin();
        assert_eq!(catalog.resolve("not-a-real-id").id(), DEFAULT_STRATEGY);
        assert_eq!(catalog.resolve("").id(), DEFAULT_STRATEGY);
    }

    #[test]
    fn lookup_ignores_case_and_whitespace() {
        let catalog = StrategyCatalog::builtin();
        assert_eq!(catalog.resolve("  smell ").id(), "SMELL");
        assert!(catalog.get("Ensemble").is_some());
    }

    #[test]
    fn every_template_embeds_output_contract() {
        let catalog = StrategyCatalog::builtin();
        for lang in ["Java", "Python", "demo"] {
            let contract = output_contract(lang);
            for id in catalog.list_strategy_ids() {
                let (_, prompt) = catalog.build_prompt(id, SOURCE, lang);
                assert!(
                    prompt.contains(&contract),
                    "strategy {id} does not embed the output contract for {lang}"
                );
                assert!(prompt.contains(SOURCE), "strategy {id} drops the source");
            }
        }
    }

    #[test]
    fn rendering_is_deterministic() {
        let catalog = StrategyCatalog::builtin();
        for id in catalog.list_strategy_ids() {
            let (used, a) = catalog.build_prompt(id, SOURCE, "Java");
            let (_, b) = catalog.build_prompt(id, SOURCE, "Java");
            assert_eq!(used, id);
            assert_eq!(a, b, "strategy {id} is not deterministic");
        }
    }

    #[test]
    fn templates_are_distinct() {
        let catalog = StrategyCatalog::builtin();
        let mut prompts: Vec<String> = catalog
            .list_strategy_ids()
            .into_iter()
            .map(|id| catalog.build_prompt(id, SOURCE, "Java").1)
            .collect();
        prompts.sort();
        prompts.dedup();
        assert_eq!(prompts.len(), 6);
    }

    struct Shout;

    impl Strategy for Shout {
        fn id(&self) -> &'static str {
            "SHOUT"
        }
        fn description(&self) -> &'static str {
            "test strategy"
        }
        fn render(&self, source: &str, language: &str) -> String {
            format!("FIX THIS\n{}\n{source}", output_contract(language))
        }
    }

    #[test]
    fn with_registers_new_strategy_at_end() {
        let catalog = StrategyCatalog::builtin().with(Shout);
        assert_eq!(catalog.list_strategy_ids().last(), Some(&"SHOUT"));
        let (used, prompt) = catalog.build_prompt("shout", "x", "Go");
        assert_eq!(used, "SHOUT");
        assert!(prompt.starts_with("FIX THIS"));
    }

    struct OtherDefault;

    impl Strategy for OtherDefault {
        fn id(&self) -> &'static str {
            "DEFAULT"
        }
        fn description(&self) -> &'static str {
            "replacement"
        }
        fn render(&self, source: &str, _language: &str) -> String {
            source.to_string()
        }
    }

    #[test]
    fn with_replaces_existing_id_in_place() {
        let catalog = StrategyCatalog::builtin().with(OtherDefault);
        assert_eq!(catalog.list_strategy_ids().len(), 6);
        assert_eq!(catalog.list_strategy_ids()[0], "DEFAULT");
        assert_eq!(catalog.resolve("nope").description(), "replacement");
    }
}
