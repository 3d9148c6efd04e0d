//src/report.rs

use std::ffi::OsString;
use std::fmt::Display;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::types::{Hit, InputFormat, Query};

pub const XML_HITS_HEADER: &str = "query_name\tquery_length\taccession_number\tsubject_length\t\
     subject_description\tE_value\tbit_score\tframe\tquery_start\tquery_end\thit_start\thit_end\t\
     %_conserved\t%_identity";
pub const XML_NOHITS_HEADER: &str = "query_name";
pub const XML_HEADER_HEADER: &str = "query_name\tsubject_description";

pub const TAB_HITS_HEADER: &str =
    "qseqid\tsseqid\tpident\tlength\tmismatch\tgapopen\tqstart\tqend\tsstart\tsend\tevalue\tbitscore\tsalltitles";
pub const TAB_NOHITS_HEADER: &str = "qseqid";
pub const TAB_HEADER_HEADER: &str = "qseqid\tsseqid";

/// `<base>.hits.txt`, `<base>.nohits.txt`, `<base>.hits.header`
pub fn report_paths(base: &Path) -> [PathBuf; 3] {
    let with = |suffix: &str| {
        let mut name = OsString::from(base.as_os_str());
        name.push(suffix);
        PathBuf::from(name)
    };
    [with(".hits.txt"), with(".nohits.txt"), with(".hits.header")]
}

/// E-values as BLAST prints them: `0.0`, scientific below 0.001, decimal otherwise.
pub fn format_evalue(evalue: f64) -> String {
    if evalue == 0.0 {
        "0.0".to_string()
    } else if evalue < 0.001 {
        format!("{:.2e}", evalue)
    } else {
        format!("{}", evalue)
    }
}

fn or_blank<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// The three report channels of a run.
///
/// Every channel starts with its column header line. Queries with retained
/// hits go to the hits and header channels; queries without go to the
/// no-hits channel only.
pub struct ReportWriter<W: Write> {
    format: InputFormat,
    hits: W,
    nohits: W,
    header: W,
}

/// Report files being written: temporary siblings of the final paths until
/// [`ReportWriter::persist`] moves them into place.
pub type StagedReports = ReportWriter<BufWriter<NamedTempFile>>;

impl StagedReports {
    /// Stage the three reports in the directory of `base`.
    ///
    /// Nothing at the final report paths changes until `persist`; dropping
    /// the writer instead removes the staged files.
    pub fn create(base: &Path, format: InputFormat) -> io::Result<Self> {
        let dir = match base.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let staged = || NamedTempFile::new_in(dir).map(BufWriter::new);
        Self::new(format, staged()?, staged()?, staged()?)
    }

    /// Flush the staged reports and rename them to `report_paths(base)`.
    pub fn persist(self, base: &Path) -> io::Result<()> {
        let (hits, nohits, header) = self.finish()?;
        let [hits_path, nohits_path, header_path] = report_paths(base);
        log::info!(
            "Writing reports to {}, {} and {}",
            hits_path.display(),
            nohits_path.display(),
            header_path.display()
        );
        for (staged, path) in [(hits, hits_path), (nohits, nohits_path), (header, header_path)] {
            let file = staged.into_inner().map_err(|e| e.into_error())?;
            file.persist(path)?;
        }
        Ok(())
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn new(format: InputFormat, mut hits: W, mut nohits: W, mut header: W) -> io::Result<Self> {
        let (h, n, hd) = match format {
            InputFormat::Xml => (XML_HITS_HEADER, XML_NOHITS_HEADER, XML_HEADER_HEADER),
            InputFormat::Tabular => (TAB_HITS_HEADER, TAB_NOHITS_HEADER, TAB_HEADER_HEADER),
        };
        writeln!(hits, "{h}")?;
        writeln!(nohits, "{n}")?;
        writeln!(header, "{hd}")?;
        Ok(Self {
            format,
            hits,
            nohits,
            header,
        })
    }

    /// Emit one ranked query. Returns the number of hit lines written.
    pub fn write_query(&mut self, query: &Query) -> io::Result<usize> {
        if query.hits.is_empty() {
            writeln!(self.nohits, "{}", query.label())?;
            return Ok(0);
        }
        for hit in &query.hits {
            match self.format {
                InputFormat::Xml => {
                    self.write_xml_hit(query, hit)?;
                    writeln!(
                        self.header,
                        "{}\t{}",
                        query.label(),
                        hit.subject.definition.as_deref().unwrap_or_default()
                    )?;
                }
                InputFormat::Tabular => {
                    self.write_tab_hit(query, hit)?;
                    writeln!(self.header, "{}\t{}", query.id, hit.subject.id)?;
                }
            }
        }
        Ok(query.hits.len())
    }

    fn write_xml_hit(&mut self, query: &Query, hit: &Hit) -> io::Result<()> {
        writeln!(
            self.hits,
            "{}\t{}\t{}\t{}\t{}\t{}\t{:.1}\t{}\t{}\t{}\t{}\t{}\t{}%\t{:.1}%",
            query.label(),
            or_blank(query.length),
            hit.subject.accession.as_deref().unwrap_or_default(),
            or_blank(hit.subject.length),
            hit.subject.definition.as_deref().unwrap_or_default(),
            format_evalue(hit.evalue),
            hit.bitscore,
            or_blank(hit.query_frame),
            hit.query_start,
            hit.query_end,
            hit.hit_start,
            hit.hit_end,
            or_blank(hit.pct_conserved.map(|p| format!("{p:.1}"))),
            hit.pct_identity,
        )
    }

    fn write_tab_hit(&mut self, query: &Query, hit: &Hit) -> io::Result<()> {
        writeln!(
            self.hits,
            "{}\t{}\t{:.1}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.1}\t{}",
            query.id,
            hit.subject.id,
            hit.pct_identity,
            hit.align_len,
            or_blank(hit.mismatch),
            or_blank(hit.gap_open),
            hit.query_start,
            hit.query_end,
            hit.hit_start,
            hit.hit_end,
            format_evalue(hit.evalue),
            hit.bitscore,
            hit.subject.definition.as_deref().unwrap_or_default(),
        )
    }

    /// Flush all channels and hand back the underlying writers
    /// (hits, no-hits, header).
    pub fn finish(mut self) -> io::Result<(W, W, W)> {
        self.hits.flush()?;
        self.nohits.flush()?;
        self.header.flush()?;
        Ok((self.hits, self.nohits, self.header))
    }
}
