//! Ordered field extraction strategies
//!
//! A `StrategyChain` is a named list of pure extractors tried in order; the
//! first non-empty value wins. Supporting a new page layout means inserting
//! another strategy at the right position.

use scraper::Html;
use tracing::trace;

type Extractor = Box<dyn Fn(&Html) -> Option<String> + Send + Sync>;

struct Strategy {
    name: &'static str,
    extract: Extractor,
}

pub struct StrategyChain {
    field: &'static str,
    strategies: Vec<Strategy>,
}

impl StrategyChain {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            strategies: Vec::new(),
        }
    }

    /// Append a strategy (lowest priority so far).
    pub fn then<F>(mut self, name: &'static str, extract: F) -> Self
    where
        F: Fn(&Html) -> Option<String> + Send + Sync + 'static,
    {
        self.strategies.push(Strategy {
            name,
            extract: Box::new(extract),
        });
        self
    }

    /// Insert a strategy ahead of the one at `index`.
    pub fn insert<F>(&mut self, index: usize, name: &'static str, extract: F)
    where
        F: Fn(&Html) -> Option<String> + Send + Sync + 'static,
    {
        let index = index.min(self.strategies.len());
        self.strategies.insert(
            index,
            Strategy {
                name,
                extract: Box::new(extract),
            },
        );
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name).collect()
    }

    pub fn extract(&self, document: &Html) -> Option<String> {
        for strategy in &self.strategies {
            if let Some(value) = (strategy.extract)(document) {
                let value = value.trim();
                if !value.is_empty() {
                    trace!("{}: matched by '{}'", self.field, strategy.name);
                    return Some(value.to_string());
                }
            }
        }
        trace!("{}: no strategy matched", self.field);
        None
    }
}

impl std::fmt::Debug for StrategyChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyChain")
            .field("field", &self.field)
            .field("strategies", &self.names())
            .finish()
    }
}
