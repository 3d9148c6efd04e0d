//src/parse/xml.rs

use std::fmt::Display;
use std::io::BufRead;
use std::str::FromStr;

use ahash::AHashMap;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::ParseOptions;
use crate::error::{BlastQcError, Result};
use crate::types::{Hit, Query, SubjectDescriptor};

/// Leaf tags we extract, grouped by the block they belong to.
const ITERATION_TAGS: &[&str] = &[
    "Iteration_iter-num",
    "Iteration_query-ID",
    "Iteration_query-def",
    "Iteration_query-len",
];
const HIT_TAGS: &[&str] = &["Hit_id", "Hit_def", "Hit_accession", "Hit_len"];
const HSP_TAGS: &[&str] = &[
    "Hsp_bit-score",
    "Hsp_score",
    "Hsp_evalue",
    "Hsp_query-from",
    "Hsp_query-to",
    "Hsp_hit-from",
    "Hsp_hit-to",
    "Hsp_query-frame",
    "Hsp_identity",
    "Hsp_positive",
    "Hsp_align-len",
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Element {
    Iteration,
    Hit,
    Hsp,
    Field(&'static str),
    Other,
}

fn element(name: &[u8]) -> Element {
    match name {
        b"Iteration" => Element::Iteration,
        b"Hit" => Element::Hit,
        b"Hsp" => Element::Hsp,
        _ => ITERATION_TAGS
            .iter()
            .chain(HIT_TAGS)
            .chain(HSP_TAGS)
            .copied()
            .find(|t| t.as_bytes() == name)
            .map_or(Element::Other, Element::Field),
    }
}

/// What one XML event means for us, detached from the reader's buffer.
enum Step {
    Open(Element),
    Close(Element),
    Empty(Element),
    Text(String),
    Eof,
}

/// Raw text of the leaf fields seen so far in one block.
#[derive(Debug, Default)]
struct Fields(AHashMap<&'static str, String>);

impl Fields {
    fn insert(&mut self, tag: &'static str, value: String) {
        self.0.insert(tag, value);
    }

    fn optional(&self, tag: &'static str) -> Option<&str> {
        self.0.get(tag).map(String::as_str)
    }

    fn text(&self, tag: &'static str) -> Result<&str> {
        self.optional(tag)
            .ok_or_else(|| BlastQcError::parse(format!("<{tag}>"), "required element is missing"))
    }

    fn number<T>(&self, tag: &'static str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.text(tag)?;
        raw.trim().parse().map_err(|e| {
            BlastQcError::parse(format!("<{tag}>"), format!("cannot parse {raw:?}: {e}"))
        })
    }

    fn float(&self, tag: &'static str) -> Result<f64> {
        let v: f64 = self.number(tag)?;
        if v.is_nan() {
            return Err(BlastQcError::parse(format!("<{tag}>"), "value is NaN"));
        }
        Ok(v)
    }
}

fn subject_descriptor(fields: &Fields, opts: &ParseOptions) -> Result<SubjectDescriptor> {
    let definition = fields.text("Hit_def")?.to_string();
    Ok(SubjectDescriptor {
        id: fields.text("Hit_id")?.to_string(),
        accession: Some(fields.text("Hit_accession")?.to_string()),
        length: Some(fields.number("Hit_len")?),
        def_level: opts.mode.definition_level(&definition),
        definition: Some(definition),
    })
}

fn hit_from_hsp(subject: &SubjectDescriptor, hsp: &Fields) -> Result<Hit> {
    let align_len: u32 = hsp.number("Hsp_align-len")?;
    if align_len == 0 {
        return Err(BlastQcError::parse("<Hsp_align-len>", "alignment length is zero"));
    }
    let within_alignment = |tag: &'static str| -> Result<u32> {
        let count: u32 = hsp.number(tag)?;
        if count > align_len {
            return Err(BlastQcError::parse(
                format!("<{tag}>"),
                format!("{count} exceeds the alignment length {align_len}"),
            ));
        }
        Ok(count)
    };
    let hit = Hit {
        subject: subject.clone(),
        identity: within_alignment("Hsp_identity")?,
        align_len,
        positive: Some(within_alignment("Hsp_positive")?),
        mismatch: None,
        gap_open: None,
        evalue: hsp.float("Hsp_evalue")?,
        bitscore: hsp.float("Hsp_bit-score")?,
        score: Some(hsp.number("Hsp_score")?),
        query_start: hsp.number("Hsp_query-from")?,
        query_end: hsp.number("Hsp_query-to")?,
        hit_start: hsp.number("Hsp_hit-from")?,
        hit_end: hsp.number("Hsp_hit-to")?,
        query_frame: Some(hsp.number("Hsp_query-frame")?),
        pct_identity: 0.0,
        pct_conserved: None,
    };
    Ok(hit.with_derived_percentages())
}

/// Streams `<Iteration>` blocks of a BLAST XML report (`-outfmt 5`) as queries.
///
/// Every `<Hsp>` of every `<Hit>` becomes its own `Hit`, carrying a copy of
/// the subject's metadata. Hits failing the thresholds are dropped as they
/// are read.
pub struct XmlQueries<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    opts: ParseOptions,
    text: String,

    iteration: Option<Fields>,
    query: Option<Query>,
    hit_fields: Option<Fields>,
    subject: Option<SubjectDescriptor>,
    hsp: Option<Fields>,

    done: bool,
}

impl<R: BufRead> XmlQueries<R> {
    pub fn new(reader: R, opts: ParseOptions) -> Self {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            buf: Vec::with_capacity(1024),
            opts,
            text: String::new(),
            iteration: None,
            query: None,
            hit_fields: None,
            subject: None,
            hsp: None,
            done: false,
        }
    }

    fn read_step(&mut self) -> Result<Option<Step>> {
        self.buf.clear();
        let step = match self.reader.read_event_into(&mut self.buf)? {
            Event::Start(e) => Step::Open(element(e.name().as_ref())),
            Event::End(e) => Step::Close(element(e.name().as_ref())),
            Event::Empty(e) => Step::Empty(element(e.name().as_ref())),
            Event::Text(t) => Step::Text(t.unescape()?.into_owned()),
            Event::CData(c) => Step::Text(String::from_utf8_lossy(&c).into_owned()),
            Event::Eof => Step::Eof,
            _ => return Ok(None),
        };
        Ok(Some(step))
    }

    /// Build the query from the iteration header once its fields are in.
    fn ensure_query(&mut self) -> Result<()> {
        if self.query.is_some() {
            return Ok(());
        }
        let fields = self
            .iteration
            .as_ref()
            .ok_or_else(|| BlastQcError::parse("<Hit>", "hit found outside of an <Iteration>"))?;

        let num: u32 = fields.number("Iteration_iter-num")?;
        let definition = fields.text("Iteration_query-def")?.to_string();
        let length: u32 = fields.number("Iteration_query-len")?;
        let id = fields
            .optional("Iteration_query-ID")
            .map_or_else(|| num.to_string(), str::to_string);

        self.query = Some(Query {
            id,
            num: Some(num),
            definition: Some(definition),
            length: Some(length),
            hits: Vec::new(),
        });
        Ok(())
    }

    fn store_field(&mut self, tag: &'static str, value: String) {
        let target = if tag.starts_with("Hsp_") {
            self.hsp.as_mut()
        } else if tag.starts_with("Hit_") {
            self.hit_fields.as_mut()
        } else {
            self.iteration.as_mut()
        };
        if let Some(fields) = target {
            fields.insert(tag, value);
        }
    }

    fn open(&mut self, el: Element) -> Result<()> {
        match el {
            Element::Iteration => {
                self.iteration = Some(Fields::default());
                self.query = None;
            }
            Element::Hit => {
                self.ensure_query()?;
                self.hit_fields = Some(Fields::default());
                self.subject = None;
            }
            Element::Hsp => {
                if self.subject.is_none() {
                    let fields = self.hit_fields.as_ref().ok_or_else(|| {
                        BlastQcError::parse("<Hsp>", "alignment found outside of a <Hit>")
                    })?;
                    self.subject = Some(subject_descriptor(fields, &self.opts)?);
                }
                self.hsp = Some(Fields::default());
            }
            Element::Field(_) | Element::Other => self.text.clear(),
        }
        Ok(())
    }

    /// Returns the finished query when an `</Iteration>` closes.
    fn close(&mut self, el: Element) -> Result<Option<Query>> {
        match el {
            Element::Field(tag) => {
                let value = std::mem::take(&mut self.text);
                self.store_field(tag, value);
            }
            Element::Hsp => {
                if let (Some(subject), Some(hsp)) = (&self.subject, self.hsp.take()) {
                    let hit = hit_from_hsp(subject, &hsp)?;
                    if self.opts.thresholds.passes(&hit) {
                        if let Some(query) = self.query.as_mut() {
                            query.hits.push(hit);
                        }
                    }
                }
            }
            Element::Hit => {
                self.hit_fields = None;
                self.subject = None;
            }
            Element::Iteration => {
                self.ensure_query()?;
                self.iteration = None;
                return Ok(self.query.take());
            }
            Element::Other => self.text.clear(),
        }
        Ok(None)
    }

    fn next_query(&mut self) -> Result<Option<Query>> {
        loop {
            let Some(step) = self.read_step()? else {
                continue;
            };
            match step {
                Step::Open(el) => self.open(el)?,
                Step::Close(el) => {
                    if let Some(query) = self.close(el)? {
                        return Ok(Some(query));
                    }
                }
                Step::Empty(Element::Field(tag)) => self.store_field(tag, String::new()),
                Step::Empty(_) => {}
                Step::Text(s) => self.text.push_str(&s),
                Step::Eof => {
                    if self.iteration.is_some() {
                        return Err(BlastQcError::parse(
                            "<Iteration>",
                            "document ended before the iteration was closed",
                        ));
                    }
                    return Ok(None);
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for XmlQueries<R> {
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
