// src/lib.rs
pub mod config;
pub mod error;
pub mod filter;
pub mod input;
pub mod parse;
pub mod rank;
pub mod report;
pub mod types;

use std::io::Write;

use crate::config::RunConfig;
use crate::error::Result;
use crate::input::open_input;
use crate::parse::QueryParser;
use crate::rank::{rank_hits, RankConfig};
use crate::report::{ReportWriter, StagedReports};
use crate::types::Query;

/// Counts gathered over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Queries read from the input.
    pub queries: usize,
    /// Queries with at least one hit left after filtering.
    pub queries_with_hits: usize,
    /// Lines written to the hits report.
    pub hits_emitted: usize,
}

/// Rank each finished query and hand it to the reports, one query at a time.
///
/// Stops at the first error; whatever was written before it should not be
/// trusted. `run_qc` discards it.
pub fn process_queries<I, W>(
    queries: I,
    rank: &RankConfig,
    reports: &mut ReportWriter<W>,
) -> Result<RunSummary>
where
    I: IntoIterator<Item = Result<Query>>,
    W: Write,
{
    let mut summary = RunSummary::default();

    for query in queries {
        let mut query = query?;
        let retained = query.hits.len();
        query.hits = rank_hits(std::mem::take(&mut query.hits), rank);

        let emitted = reports.write_query(&query)?;
        log::debug!(
            "query {}: {} hits passed filters, {} reported",
            query.id,
            retained,
            emitted
        );

        summary.queries += 1;
        if emitted > 0 {
            summary.queries_with_hits += 1;
        }
        summary.hits_emitted += emitted;
    }

    Ok(summary)
}

/// Full run: validate the configuration, parse, filter, rank and write the
/// three reports next to `config.output_base`.
///
/// The reports only appear once every query went through. On error the
/// staged files are dropped and existing reports at those paths are left as
/// they were.
pub fn run_qc(config: &RunConfig) -> Result<RunSummary> {
    config.validate()?;

    let input = open_input(config.input.as_deref())?;
    log::info!(
        "Parsing {} results ({:?} search), ordering by {:?}",
        config.format,
        config.mode,
        config.order
    );
    let parser = QueryParser::new(config.format, input, config.parse_options());

    let mut reports = StagedReports::create(&config.output_base, config.format)?;
    let summary = process_queries(parser, &config.rank_config(), &mut reports)?;
    reports.persist(&config.output_base)?;

    log::info!(
        "Processed {} queries: {} with hits ({} hits reported), {} without",
        summary.queries,
        summary.queries_with_hits,
        summary.hits_emitted,
        summary.queries - summary.queries_with_hits
    );
    Ok(summary)
}
