//! Built-in model registry with per-million-token pricing.

use crate::{CostInfo, Model};

/// Model used when neither the command line nor the config names one.
pub const DEFAULT_MODEL_ID: &str = "claude-sonnet-4-5-20250929";

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

struct ModelEntry {
    id: &'static str,
    name: &'static str,
    context_window: u32,
    max_tokens: u32,
    input: f64,
    output: f64,
    cache_write: f64,
    cache_read: f64,
}

const MODEL_ENTRIES: &[ModelEntry] = &[
    ModelEntry {
        id: "claude-opus-4-1-20250805",
        name: "Claude Opus 4.1",
        context_window: 200_000,
        max_tokens: 32_000,
        input: 15.0,
        output: 75.0,
        cache_write: 18.75,
        cache_read: 1.5,
    },
    ModelEntry {
        id: "claude-opus-4-20250514",
        name: "Claude Opus 4",
        context_window: 200_000,
        max_tokens: 32_000,
        input: 15.0,
        output: 75.0,
        cache_write: 18.75,
        cache_read: 1.5,
    },
    ModelEntry {
        id: "claude-sonnet-4-5-20250929",
        name: "Claude Sonnet 4.5",
        context_window: 200_000,
        max_tokens: 64_000,
        input: 3.0,
        output: 15.0,
        cache_write: 3.75,
        cache_read: 0.3,
    },
    ModelEntry {
        id: "claude-sonnet-4-20250514",
        name: "Claude Sonnet 4",
        context_window: 200_000,
        max_tokens: 64_000,
        input: 3.0,
        output: 15.0,
        cache_write: 3.75,
        cache_read: 0.3,
    },
    ModelEntry {
        id: "claude-3-7-sonnet-20250219",
        name: "Claude Sonnet 3.7",
        context_window: 200_000,
        max_tokens: 64_000,
        input: 3.0,
        output: 15.0,
        cache_write: 3.75,
        cache_read: 0.3,
    },
    ModelEntry {
        id: "claude-haiku-4-5-20251001",
        name: "Claude Haiku 4.5",
        context_window: 200_000,
        max_tokens: 64_000,
        input: 1.0,
        output: 5.0,
        cache_write: 1.25,
        cache_read: 0.1,
    },
    ModelEntry {
        id: "claude-3-5-haiku-20241022",
        name: "Claude Haiku 3.5",
        context_window: 200_000,
        max_tokens: 8_192,
        input: 0.8,
        output: 4.0,
        cache_write: 1.0,
        cache_read: 0.08,
    },
];

impl ModelEntry {
    fn to_model(&self) -> Model {
        Model {
            id: self.id.to_string(),
            name: self.name.to_string(),
            base_url: ANTHROPIC_BASE_URL.to_string(),
            cost: CostInfo {
                input: self.input,
                output: self.output,
                cache_write: self.cache_write,
                cache_read: self.cache_read,
            },
            context_window: self.context_window,
            max_tokens: self.max_tokens,
        }
    }
}

/// Look up a model by ID.
pub fn get_model(id: &str) -> Option<Model> {
    MODEL_ENTRIES.iter().find(|e| e.id == id).map(|e| e.to_model())
}

/// Get all registered models.
pub fn get_all_models() -> Vec<Model> {
    MODEL_ENTRIES.iter().map(|e| e.to_model()).collect()
}

/// Build a model for an ID missing from the registry. Pricing is zero until
/// the caller supplies one.
pub fn custom_model(id: &str) -> Model {
    Model {
        id: id.to_string(),
        name: id.to_string(),
        base_url: ANTHROPIC_BASE_URL.to_string(),
        cost: CostInfo::default(),
        context_window: 200_000,
        max_tokens: 8_192,
    }
}
