//! Context-token budgets per model.

use super::ModelSpec;

/// Budget used for models absent from the table.
pub const DEFAULT_TOKEN_LIMIT: i64 = 128_000;

/// Built-in budgets, matched by model-name prefix.
///
/// Longest matching prefix wins, so family entries can be overridden by more
/// specific ones.
const BUILTIN_LIMITS: &[(&str, i64)] = &[
    ("claude-opus-4", 200_000),
    ("claude-sonnet-4", 200_000),
    ("claude-haiku", 200_000),
    ("gpt-5", 400_000),
    ("gpt-4.1", 1_000_000),
    ("gemini-2.5", 1_048_576),
    ("gemini-1.5-pro", 2_097_152),
    ("glm-4", 128_000),
    ("doubao", 256_000),
];

/// Pure lookup from model identifier to maximum context-token budget.
#[derive(Debug, Clone)]
pub struct TokenLimitTable {
    entries: Vec<(String, i64)>,
    default_limit: i64,
}

impl Default for TokenLimitTable {
    fn default() -> Self {
        Self {
            entries: BUILTIN_LIMITS
                .iter()
                .map(|(name, limit)| ((*name).to_string(), *limit))
                .collect(),
            default_limit: DEFAULT_TOKEN_LIMIT,
        }
    }
}

impl TokenLimitTable {
    /// A table with only the given entries and default.
    pub fn with_entries(entries: Vec<(String, i64)>, default_limit: i64) -> Self {
        Self {
            entries,
            default_limit,
        }
    }

    /// Add or override an entry.
    pub fn insert(&mut self, model: impl Into<String>, limit: i64) {
        self.entries.push((model.into(), limit));
    }

    /// Maximum context-token budget for `model`.
    ///
    /// Accepts either a bare model id or a "provider/model" spec; the
    /// provider segment is ignored for matching.
    pub fn limit(&self, model: &str) -> i64 {
        let spec = model.parse::<ModelSpec>().ok();
        let name = spec.as_ref().map_or(model, |s| s.model.as_str());
        self.entries
            .iter()
            .filter(|(prefix, _)| name.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(self.default_limit, |(_, limit)| *limit)
    }
}

#[cfg(test)]
#[path = "token_limits.test.rs"]
mod tests;
