//src/filter.rs

use crate::types::Hit;

/// Acceptance limits applied to every hit as it is parsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Maximum acceptable E-value.
    pub max_evalue: f64,
    /// Minimum acceptable bit score.
    pub min_bitscore: f64,
    /// Minimum number of title separators in the subject definition.
    pub min_def_level: u32,
    /// Minimum recomputed percent identity.
    pub min_pct_identity: f64,
}

impl Default for Thresholds {
    /// Lets everything through.
    fn default() -> Self {
        Self {
            max_evalue: f64::INFINITY,
            min_bitscore: f64::NEG_INFINITY,
            min_def_level: 0,
            min_pct_identity: f64::NEG_INFINITY,
        }
    }
}

impl Thresholds {
    /// `true` when the hit satisfies every limit.
    pub fn passes(&self, hit: &Hit) -> bool {
        hit.evalue <= self.max_evalue
            && hit.bitscore >= self.min_bitscore
            && hit.def_level() >= self.min_def_level
            && hit.pct_identity >= self.min_pct_identity
    }
}
