//src/parse/mod.rs

pub mod tabular;
pub mod xml;

use std::io::BufRead;

use crate::error::Result;
use crate::filter::Thresholds;
use crate::types::{InputFormat, Query, SearchMode};

pub use tabular::TabularQueries;
pub use xml::XmlQueries;

/// Settings shared by both parsers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParseOptions {
    pub mode: SearchMode,
    /// Applied to each hit as soon as it is read.
    pub thresholds: Thresholds,
    /// Whether anything downstream looks at definition levels; used to warn
    /// about tabular input without a `salltitles` column.
    pub needs_definitions: bool,
}

impl ParseOptions {
    pub fn new(mode: SearchMode) -> Self {
        Self {
            mode,
            thresholds: Thresholds::default(),
            needs_definitions: false,
        }
    }
}

/// A single-pass stream of finished queries, whichever the input format.
/// Yields at most one `Err`, after which it is exhausted.
pub enum QueryParser<R: BufRead> {
    Xml(XmlQueries<R>),
    Tabular(TabularQueries<R>),
}

impl<R: BufRead> QueryParser<R> {
    pub fn new(format: InputFormat, reader: R, opts: ParseOptions) -> Self {
        match format {
            InputFormat::Xml => QueryParser::Xml(XmlQueries::new(reader, opts)),
            InputFormat::Tabular => QueryParser::Tabular(TabularQueries::new(reader, opts)),
        }
    }
}

impl<R: BufRead> Iterator for QueryParser<R> {
    type Item = Result<Query>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            QueryParser::Xml(p) => p.next(),
            QueryParser::Tabular(p) => p.next(),
        }
    }
}
