//! Session cost summary

use kestrel_ai::{CostBreakdown, CostInfo, Usage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token totals and dollar cost over a usage log
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    /// Number of model calls covered
    pub calls: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_write_tokens: u64,
    pub cache_read_tokens: u64,
    pub cost: CostBreakdown,
}

impl CostSummary {
    /// Summarize `usage_log` priced with `pricing` (dollars per million tokens)
    pub fn from_usage(usage_log: &[Usage], pricing: &CostInfo) -> Self {
        usage_log.iter().fold(Self::default(), |mut summary, usage| {
            summary.calls += 1;
            summary.input_tokens += u64::from(usage.input_tokens);
            summary.output_tokens += u64::from(usage.output_tokens);
            summary.cache_write_tokens += u64::from(usage.cache_creation_tokens.unwrap_or(0));
            summary.cache_read_tokens += u64::from(usage.cache_read_tokens.unwrap_or(0));
            summary.cost += usage.calculate_cost(pricing);
            summary
        })
    }
}

impl fmt::Display for CostSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cost: ${:.4} ({} input, {} output, {} cache write, {} cache read tokens over {} call{})",
            self.cost.total,
            self.input_tokens,
            self.output_tokens,
            self.cache_write_tokens,
            self.cache_read_tokens,
            self.calls,
            if self.calls == 1 { "" } else { "s" }
        )
    }
}
