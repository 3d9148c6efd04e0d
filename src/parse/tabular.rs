//src/parse/tabular.rs

use std::fmt::Display;
use std::io::{BufRead, Lines};
use std::str::FromStr;

use ahash::AHashSet;

use super::ParseOptions;
use crate::error::{BlastQcError, Result};
use crate::types::{Hit, Query, SubjectDescriptor};

/// `-outfmt "6 std salltitles"` column names, in order.
pub const COLUMNS: [&str; 13] = [
    "qseqid", "sseqid", "pident", "length", "mismatch", "gapopen", "qstart", "qend", "sstart",
    "send", "evalue", "bitscore", "salltitles",
];

/// Columns every row must have; `salltitles` is optional.
const REQUIRED_COLUMNS: usize = 12;

/// Query ids remembered for the regrouping warning. Past this many the check
/// stops, so memory stays flat on inputs with millions of reads.
const MAX_TRACKED_QUERIES: usize = 1 << 20;

struct Row<'a> {
    fields: Vec<&'a str>,
    line_no: usize,
}

impl<'a> Row<'a> {
    fn split(line: &'a str, line_no: usize) -> Result<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < REQUIRED_COLUMNS {
            return Err(BlastQcError::parse(
                format!("line {line_no}"),
                format!(
                    "expected at least {REQUIRED_COLUMNS} tab-separated columns, found {}",
                    fields.len()
                ),
            ));
        }
        Ok(Self { fields, line_no })
    }

    fn error(&self, col: usize, message: impl Into<String>) -> BlastQcError {
        BlastQcError::parse(format!("line {}, column {}", self.line_no, COLUMNS[col]), message)
    }

    fn get<T>(&self, col: usize) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.fields[col].trim();
        raw.parse()
            .map_err(|e| self.error(col, format!("cannot parse {raw:?}: {e}")))
    }

    fn float(&self, col: usize) -> Result<f64> {
        let v: f64 = self.get(col)?;
        if v.is_nan() {
            return Err(self.error(col, "value is NaN"));
        }
        Ok(v)
    }

    fn query_id(&self) -> &'a str {
        self.fields[0]
    }

    fn titles(&self) -> Option<&'a str> {
        self.fields.get(12).copied()
    }

    fn to_hit(&self, opts: &ParseOptions) -> Result<Hit> {
        let pident = self.float(2)?;
        if !(0.0..=100.0).contains(&pident) {
            return Err(self.error(2, format!("{pident} is not a percentage")));
        }
        let align_len: u32 = self.get(3)?;
        if align_len == 0 {
            return Err(self.error(3, "alignment length is zero"));
        }
        // Only the percentage is reported here; rebuild the identity count it came from.
        let identity = (pident * f64::from(align_len) / 100.0).round() as u32;

        let definition = self.titles().map(str::to_string);
        let def_level = definition
            .as_deref()
            .map_or(0, |d| opts.mode.definition_level(d));

        let hit = Hit {
            subject: SubjectDescriptor {
                id: self.fields[1].to_string(),
                accession: None,
                definition,
                length: None,
                def_level,
            },
            identity,
            align_len,
            positive: None,
            mismatch: Some(self.get(4)?),
            gap_open: Some(self.get(5)?),
            evalue: self.float(10)?,
            bitscore: self.float(11)?,
            score: None,
            query_start: self.get(6)?,
            query_end: self.get(7)?,
            hit_start: self.get(8)?,
            hit_end: self.get(9)?,
            query_frame: None,
            pct_identity: 0.0,
            pct_conserved: None,
        };
        Ok(hit.with_derived_percentages())
    }
}

/// Streams queries out of BLAST tabular output, one `Query` per run of
/// consecutive rows with the same `qseqid`.
///
/// Comment lines (`#`, as written by `-outfmt 7`) and blank lines are skipped.
/// A query whose rows all fail the thresholds is still produced, with no hits.
pub struct TabularQueries<R: BufRead> {
    lines: Lines<R>,
    line_no: usize,
    opts: ParseOptions,
    current: Option<Query>,
    seen: AHashSet<String>,
    seen_limit: usize,
    warned_untitled: bool,
    done: bool,
}

impl<R: BufRead> TabularQueries<R> {
    pub fn new(reader: R, opts: ParseOptions) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            opts,
            current: None,
            seen: AHashSet::new(),
            seen_limit: MAX_TRACKED_QUERIES,
            warned_untitled: false,
            done: false,
        }
    }

    /// Begin a new query, handing back the one that was accumulating.
    fn start_query(&mut self, id: &str) -> Option<Query> {
        if self.seen.contains(id) {
            log::warn!(
                "query {id} reappears at line {} after other queries; input is not grouped by query, \
                 its rows will be reported as a separate query",
                self.line_no
            );
        } else if self.seen.len() < self.seen_limit {
            self.seen.insert(id.to_string());
            if self.seen.len() == self.seen_limit {
                log::debug!(
                    "tracked {} query ids, no longer checking for regrouped queries",
                    self.seen_limit
                );
            }
        }
        self.current.replace(Query::new(id))
    }

    fn next_query(&mut self) -> Result<Option<Query>> {
        while let Some(line) = self.lines.next() {
            let line = line?;
            self.line_no += 1;

            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let row = Row::split(line, self.line_no)?;
            let hit = row.to_hit(&self.opts)?;

            if row.titles().is_none() && self.opts.needs_definitions && !self.warned_untitled {
                log::warn!(
                    "line {}: no salltitles column, definition levels are 0; \
                     run BLAST with -outfmt \"6 std salltitles\" to rank or filter by definition",
                    self.line_no
                );
                self.warned_untitled = true;
            }

            let same_query = self
                .current
                .as_ref()
                .is_some_and(|q| q.id == row.query_id());
            let finished = if same_query {
                None
            } else {
                self.start_query(row.query_id())
            };

            if self.opts.thresholds.passes(&hit) {
                if let Some(query) = self.current.as_mut() {
                    query.hits.push(hit);
                }
            }

            if finished.is_some() {
                return Ok(finished);
            }
        }
        Ok(self.current.take())
    }
}

impl<R: BufRead> Iterator for TabularQueries<R> {
    type Item = Result<Query>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.next_query().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Thresholds;
    use crate::types::SearchMode;

    const ROWS: &str = "\
# BLASTN 2.12.0+
# Query: q1
q1\tgi|11\t99.00\t100\t1\t0\t1\t100\t201\t300\t1e-45\t180.5\tfoo;bar;baz
q1\tgi|12\t90.00\t50\t5\t0\t1\t50\t10\t59\t1e-10\t80.0\tfoo
q2\tgi|21\t75.50\t200\t49\t2\t1\t200\t400\t201\t0.0\t250.0\ta;b

q3\tgi|31\t100.00\t30\t0\t0\t1\t30\t1\t30\t5\t20.1\tx
";

    fn parse(input: &str, opts: ParseOptions) -> Vec<Query> {
        TabularQueries::new(input.as_bytes(), opts)
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn groups_consecutive_rows_by_query() {
        let queries = parse(ROWS, ParseOptions::new(SearchMode::Nucleotide));
        let ids: Vec<&str> = queries.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["q1", "q2", "q3"]);
        assert_eq!(queries[0].hits.len(), 2);
        assert_eq!(queries[1].hits.len(), 1);
        assert_eq!(queries[2].hits.len(), 1);
    }

    #[test]
    fn equal_identifiers_from_separate_lines_group_together() {
        // each line allocates its own string; grouping must compare values
        let input: String = (0..5)
            .map(|i| format!("{}\ts{i}\t90\t10\t1\t0\t1\t10\t1\t10\t1e-3\t20\n", String::from("same")))
            .collect();
        let queries = parse(&input, ParseOptions::new(SearchMode::Nucleotide));
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].hits.len(), 5);
    }

    #[test]
    fn row_fields_land_in_the_hit() {
        let queries = parse(ROWS, ParseOptions::new(SearchMode::Nucleotide));
        let h = &queries[1].hits[0];
        assert_eq!(h.subject.id, "gi|21");
        assert_eq!(h.align_len, 200);
        assert_eq!(h.mismatch, Some(49));
        assert_eq!(h.gap_open, Some(2));
        assert_eq!((h.query_start, h.query_end), (1, 200));
        assert_eq!((h.hit_start, h.hit_end), (400, 201));
        assert_eq!(h.evalue, 0.0);
        assert_eq!(h.bitscore, 250.0);
        assert_eq!(h.subject.definition.as_deref(), Some("a;b"));
        assert_eq!(h.def_level(), 1);
        assert_eq!(h.positive, None);
        assert_eq!(h.pct_conserved, None);
        assert_eq!(queries[0].hits[0].def_level(), 2);
    }

    #[test]
    fn percent_identity_is_recomputed() {
        let queries = parse(ROWS, ParseOptions::new(SearchMode::Nucleotide));
        // 75.50% of 200 -> 151 identical positions -> 75.5
        assert_eq!(queries[1].hits[0].identity, 151);
        assert_eq!(queries[1].hits[0].pct_identity, 75.5);

        let odd = "q\ts\t33.33\t3\t2\t0\t1\t3\t1\t3\t1\t10\n";
        let queries = parse(odd, ParseOptions::new(SearchMode::Nucleotide));
        let h = &queries[0].hits[0];
        assert_eq!(h.identity, 1);
        assert_eq!(h.pct_identity, 33.3);
    }

    #[test]
    fn missing_titles_column_means_level_zero() {
        let input = "q\ts\t90\t10\t1\t0\t1\t10\t1\t10\t1e-3\t20\n";
        let mut opts = ParseOptions::new(SearchMode::Protein);
        opts.needs_definitions = true;
        let queries = parse(input, opts);
        let h = &queries[0].hits[0];
        assert_eq!(h.subject.definition, None);
        assert_eq!(h.def_level(), 0);
    }

    #[test]
    fn query_with_only_failing_rows_is_kept_empty() {
        let mut opts = ParseOptions::new(SearchMode::Nucleotide);
        opts.thresholds = Thresholds {
            max_evalue: 1.0,
            ..Thresholds::default()
        };
        let queries = parse(ROWS, opts);
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[2].id, "q3");
        assert!(queries[2].hits.is_empty());
    }

    #[test]
    fn first_row_of_a_query_is_filtered_too() {
        let mut opts = ParseOptions::new(SearchMode::Nucleotide);
        opts.thresholds = Thresholds {
            min_bitscore: 100.0,
            ..Thresholds::default()
        };
        let queries = parse(ROWS, opts);
        assert_eq!(queries[0].hits.len(), 1);
        assert_eq!(queries[0].hits[0].subject.id, "gi|11");
        assert_eq!(queries[1].hits.len(), 1);
    }

    #[test]
    fn regrouped_query_is_reported_again() {
        let input = "\
a\ts1\t90\t10\t1\t0\t1\t10\t1\t10\t1e-3\t20
b\ts2\t90\t10\t1\t0\t1\t10\t1\t10\t1e-3\t20
a\ts3\t90\t10\t1\t0\t1\t10\t1\t10\t1e-3\t20
";
        let ids: Vec<String> = parse(input, ParseOptions::new(SearchMode::Nucleotide))
            .into_iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(ids, ["a", "b", "a"]);
    }

    #[test]
    fn regroup_tracking_is_bounded() {
        let input = "\
a\ts1\t90\t10\t1\t0\t1\t10\t1\t10\t1e-3\t20
b\ts2\t90\t10\t1\t0\t1\t10\t1\t10\t1e-3\t20
c\ts3\t90\t10\t1\t0\t1\t10\t1\t10\t1e-3\t20
a\ts4\t90\t10\t1\t0\t1\t10\t1\t10\t1e-3\t20
";
        let mut parser = TabularQueries::new(input.as_bytes(), ParseOptions::new(SearchMode::Nucleotide));
        parser.seen_limit = 2;
        let ids: Vec<String> = parser
            .by_ref()
            .map(|q| q.unwrap().id)
            .collect();
        assert_eq!(ids, ["a", "b", "c", "a"]);
        assert_eq!(parser.seen.len(), 2);
    }

    #[test]
    fn space_separated_rows_are_rejected() {
        let input = "q1 gi|11 99.00 100 1 0 1 100 201 300 1e-45 180.5\n";
        let mut parser = TabularQueries::new(input.as_bytes(), ParseOptions::new(SearchMode::Nucleotide));
        let err = parser.next().unwrap().unwrap_err();
        assert!(err.to_string().contains("line 1"), "{err}");
        assert!(err.to_string().contains("found 1"), "{err}");
        assert!(parser.next().is_none());
    }

    #[test]
    fn bad_number_names_line_and_column() {
        let input = "\
q\ts\t90\t10\t1\t0\t1\t10\t1\t10\t1e-3\t20
q\ts\t90\t10\t1\t0\t1\t10\t1\t10\tlow\t20
";
        let results: Vec<Result<Query>> =
            TabularQueries::new(input.as_bytes(), ParseOptions::new(SearchMode::Nucleotide)).collect();
        assert_eq!(results.len(), 1);
        let err = results.into_iter().next().unwrap().unwrap_err();
        assert!(matches!(err, BlastQcError::Parse { ref location, .. } if location == "line 2, column evalue"));
    }

    #[test]
    fn percent_identity_outside_zero_to_hundred_is_rejected() {
        for pident in ["-40", "250", "100.01"] {
            let input = format!("q\ts\t{pident}\t10\t1\t0\t1\t10\t1\t10\t1e-3\t20\n");
            let err = TabularQueries::new(input.as_bytes(), ParseOptions::new(SearchMode::Nucleotide))
                .next()
                .unwrap()
                .unwrap_err();
            assert!(
                matches!(err, BlastQcError::Parse { ref location, .. } if location == "line 1, column pident"),
                "{pident}: {err}"
            );
        }

        let edges = "\
q\ts\t0\t10\t10\t0\t1\t10\t1\t10\t1e-3\t20
q\ts\t100\t10\t0\t0\t1\t10\t1\t10\t1e-3\t20
";
        let queries = parse(edges, ParseOptions::new(SearchMode::Nucleotide));
        let pcts: Vec<f64> = queries[0].hits.iter().map(|h| h.pct_identity).collect();
        assert_eq!(pcts, [0.0, 100.0]);
    }

    #[test]
    fn empty_input_has_no_queries() {
        assert!(parse("", ParseOptions::new(SearchMode::Nucleotide)).is_empty());
        assert!(parse("# only comments\n\n", ParseOptions::new(SearchMode::Nucleotide)).is_empty());
    }
}
