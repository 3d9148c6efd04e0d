//src/types.rs

use std::fmt;

/// Which BLAST program family produced the results. Decides the delimiter
/// counted for the definition level of a subject description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Nucleotide,
    Protein,
}

impl SearchMode {
    /// Separator packed between sub-descriptions in a subject title.
    pub fn definition_delimiter(self) -> char {
        match self {
            SearchMode::Nucleotide => ';',
            SearchMode::Protein => '>',
        }
    }

    /// Number of delimiter occurrences in `definition`.
    pub fn definition_level(self, definition: &str) -> u32 {
        let delim = self.definition_delimiter();
        definition.chars().filter(|&c| c == delim).count() as u32
    }
}

/// The two BLAST result layouts we understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// `-outfmt 5`
    Xml,
    /// `-outfmt 6` (optionally `"6 std salltitles"`)
    Tabular,
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Xml => f.write_str("XML"),
            InputFormat::Tabular => f.write_str("tab"),
        }
    }
}

/// `100 * count / align_len`, rounded to one decimal place the way `{:.1}`
/// prints it (exact ties go to the even digit, so 6.25 becomes 6.2).
///
/// Callers guarantee `0 < align_len` and `count <= align_len`.
pub fn percent_of(count: u32, align_len: u32) -> f64 {
    debug_assert!(align_len > 0 && count <= align_len, "{count}/{align_len}");
    let raw = 100.0 * f64::from(count) / f64::from(align_len);
    format!("{raw:.1}").parse().unwrap_or(raw)
}

/// Subject metadata shared by every sub-alignment against one database sequence.
/// Copied into each `Hit`, never shared.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubjectDescriptor {
    pub id: String,
    pub accession: Option<String>,
    pub definition: Option<String>,
    pub length: Option<u32>,
    pub def_level: u32,
}

/// One retained alignment between a query and a subject.
///
/// Format-specific statistics are `Option`s: `positive`, `score` and
/// `query_frame` only exist in XML output, `mismatch` and `gap_open` only in
/// tabular output.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub subject: SubjectDescriptor,

    pub identity: u32,
    pub align_len: u32,
    pub positive: Option<u32>,
    pub mismatch: Option<u32>,
    pub gap_open: Option<u32>,

    pub evalue: f64,
    pub bitscore: f64,
    pub score: Option<u32>,

    pub query_start: u32,
    pub query_end: u32,
    pub hit_start: u32,
    pub hit_end: u32,
    pub query_frame: Option<i32>,

    /// Always derived from `identity` / `align_len`.
    pub pct_identity: f64,
    /// Derived from `positive` / `align_len` when `positive` is known.
    pub pct_conserved: Option<f64>,
}

impl Hit {
    pub fn def_level(&self) -> u32 {
        self.subject.def_level
    }

    /// Fill in the derived percentage fields from the raw counts.
    pub(crate) fn with_derived_percentages(mut self) -> Self {
        self.pct_identity = percent_of(self.identity, self.align_len);
        self.pct_conserved = self.positive.map(|p| percent_of(p, self.align_len));
        self
    }
}

/// One searched sequence and the hits retained for it.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// `qseqid` in tabular output; `Iteration_query-ID` (or the iteration
    /// number when that tag is absent) in XML output.
    pub id: String,
    /// `Iteration_iter-num`
    pub num: Option<u32>,
    pub definition: Option<String>,
    pub length: Option<u32>,
    pub hits: Vec<Hit>,
}

impl Query {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Name used in the reports: the definition line when there is one,
    /// otherwise the identifier.
    pub fn label(&self) -> &str {
        self.definition.as_deref().unwrap_or(&self.id)
    }
}

// Queries are the same query when their identifiers match.
impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Query {}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A tabular-style hit with the given statistics; handy for filter and rank tests.
    pub fn hit(id: &str, evalue: f64, bitscore: f64, identity: u32, def_level: u32) -> Hit {
        Hit {
            subject: SubjectDescriptor {
                id: id.to_string(),
                def_level,
                ..SubjectDescriptor::default()
            },
            identity,
            align_len: 100,
            positive: None,
            mismatch: Some(100 - identity),
            gap_open: Some(0),
            evalue,
            bitscore,
            score: None,
            query_start: 1,
            query_end: 100,
            hit_start: 1,
            hit_end: 100,
            query_frame: None,
            pct_identity: 0.0,
            pct_conserved: None,
        }
        .with_derived_percentages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_rounded_to_one_decimal() {
        assert_eq!(percent_of(1, 3), 33.3);
        assert_eq!(percent_of(2, 3), 66.7);
        assert_eq!(percent_of(150, 150), 100.0);
        assert_eq!(percent_of(0, 42), 0.0);
    }

    #[test]
    fn percent_ties_round_like_printed_output() {
        // 1/16 = 6.25% and 3/16 = 18.75% are exact ties
        assert_eq!(percent_of(1, 16), 6.2);
        assert_eq!(percent_of(3, 16), 18.8);
        assert_eq!(percent_of(5, 16), 31.2);
        for len in 1..200u32 {
            for count in 0..=len {
                let p = percent_of(count, len);
                assert_eq!(format!("{p:.1}"), format!("{:.1}", 100.0 * f64::from(count) / f64::from(len)));
            }
        }
    }

    #[test]
    fn percent_never_leaves_range() {
        for len in 1..60u32 {
            for count in 0..=len {
                let p = percent_of(count, len);
                assert!((0.0..=100.0).contains(&p), "{count}/{len} -> {p}");
            }
        }
    }

    #[test]
    fn definition_level_counts_mode_delimiter() {
        let title = "cytochrome b [Homo sapiens];>gi|2 cyt b;>gi|3 cyt b";
        assert_eq!(SearchMode::Nucleotide.definition_level(title), 2);
        assert_eq!(SearchMode::Protein.definition_level(title), 2);
        assert_eq!(SearchMode::Nucleotide.definition_level("a;b;c;d"), 3);
        assert_eq!(SearchMode::Protein.definition_level("a;b;c;d"), 0);
        assert_eq!(SearchMode::Protein.definition_level(""), 0);
    }

    #[test]
    fn derived_percentages_ignore_stale_values() {
        let mut hit = fixtures::hit("s1", 1e-5, 40.0, 90, 0);
        hit.pct_identity = 12.0;
        hit.positive = Some(95);
        let hit = hit.with_derived_percentages();
        assert_eq!(hit.pct_identity, 90.0);
        assert_eq!(hit.pct_conserved, Some(95.0));
    }

    #[test]
    fn query_equality_is_by_identifier_value() {
        let a = Query::new(String::from("q1"));
        let mut b = Query::new("q1");
        b.definition = Some("something else".into());
        assert_eq!(a, b);
        assert_ne!(a, Query::new("q2"));
    }

    #[test]
    fn label_prefers_definition() {
        let mut q = Query::new("Query_1");
        assert_eq!(q.label(), "Query_1");
        q.definition = Some("contig_7".into());
        assert_eq!(q.label(), "contig_7");
    }
}
