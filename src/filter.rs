//! Allow-lists that decide which backend-reported models callers may see.
//!
//! Built once from configuration and only read afterwards, so a filter is
//! shared across in-flight requests without locking.

use std::collections::BTreeSet;

/// Models the hosted backend exposes unless configuration overrides it.
pub const DEFAULT_HOSTED_MODELS: [&str; 6] = [
    "gpt-4o-mini",
    "gpt-4o",
    "gpt-4.1-mini",
    "gpt-4.1",
    "o4-mini",
    "o3-mini",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModelFilter {
    /// Every model passes.
    #[default]
    AllowAll,
    /// Only listed models pass; anything unregistered is rejected.
    AllowList(BTreeSet<String>),
}

impl ModelFilter {
    pub fn allow_list<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::AllowList(
            models
                .into_iter()
                .map(|m| m.as_ref().trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
        )
    }

    /// Allow-list from a comma-separated string, e.g. an env var.
    pub fn from_csv(csv: &str) -> Self {
        Self::allow_list(csv.split(','))
    }

    pub fn hosted_default() -> Self {
        Self::allow_list(DEFAULT_HOSTED_MODELS)
    }

    pub fn allows(&self, model: &str) -> bool {
        match self {
            Self::AllowAll => true,
            Self::AllowList(allowed) => allowed.contains(model),
        }
    }

    /// Keep allowed models, sorted and de-duplicated.
    pub fn apply(&self, models: Vec<String>) -> Vec<String> {
        let kept: BTreeSet<String> = models.into_iter().filter(|m| self.allows(m)).collect();
        kept.into_iter().collect()
    }
}
