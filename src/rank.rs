//src/rank.rs

use std::cmp::Ordering;

use crate::types::Hit;

/// Primary ordering of a query's hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankKey {
    /// Lowest E-value first.
    #[default]
    Evalue,
    /// Highest bit score first.
    Bitscore,
    /// Highest percent identity first.
    Identity,
    /// Most detailed subject definition first.
    DefinitionLevel,
}

/// Tolerance around the best hit inside which a richer definition is preferred.
/// At most one kind can be active, and it has to agree with the `RankKey`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ToleranceWindow {
    #[default]
    None,
    Evalue(f64),
    Bitscore(f64),
    Identity(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RankConfig {
    pub key: RankKey,
    pub window: ToleranceWindow,
    /// Hits to keep per query; 0 keeps all of them.
    pub max_hits: usize,
}

fn compare(key: RankKey, a: &Hit, b: &Hit) -> Ordering {
    match key {
        RankKey::Evalue => a.evalue.total_cmp(&b.evalue),
        RankKey::Bitscore => b.bitscore.total_cmp(&a.bitscore),
        RankKey::Identity => b.pct_identity.total_cmp(&a.pct_identity),
        RankKey::DefinitionLevel => b.def_level().cmp(&a.def_level()),
    }
}

/// Stable sort by `key`; equal hits keep their discovery order.
pub fn sort_hits(hits: &mut [Hit], key: RankKey) {
    hits.sort_by(|a, b| compare(key, a, b));
}

/// Length of the leading run of `hits` that lies within the window of the best value.
fn window_len(hits: &[Hit], window: ToleranceWindow) -> usize {
    match window {
        ToleranceWindow::None => hits.len(),
        ToleranceWindow::Evalue(w) => {
            let best = hits.iter().map(|h| h.evalue).fold(f64::INFINITY, f64::min);
            hits.iter().take_while(|h| h.evalue <= best + w).count()
        }
        ToleranceWindow::Bitscore(w) => {
            let best = hits.iter().map(|h| h.bitscore).fold(f64::NEG_INFINITY, f64::max);
            hits.iter().take_while(|h| h.bitscore >= best - w).count()
        }
        ToleranceWindow::Identity(w) => {
            let best = hits.iter().map(|h| h.pct_identity).fold(f64::NEG_INFINITY, f64::max);
            hits.iter().take_while(|h| h.pct_identity >= best - w).count()
        }
    }
}

/// Order a query's filtered hits and keep the ones to report.
///
/// 1. sort by `cfg.key`;
/// 2. with a tolerance window, keep only the leading hits within the window
///    of the best value and reorder those by definition level (descending);
/// 3. truncate to `cfg.max_hits` when it is nonzero.
pub fn rank_hits(mut hits: Vec<Hit>, cfg: &RankConfig) -> Vec<Hit> {
    sort_hits(&mut hits, cfg.key);

    if cfg.window != ToleranceWindow::None {
        let keep = window_len(&hits, cfg.window);
        hits.truncate(keep);
        sort_hits(&mut hits, RankKey::DefinitionLevel);
    }

    if cfg.max_hits > 0 {
        hits.truncate(cfg.max_hits);
    }
    hits
}
