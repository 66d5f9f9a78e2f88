//! GATE XML documents.
//!
//! A GATE document stores its raw text inside `<TextWithNodes>`, with empty
//! `<Node id="N"/>` markers at every offset an annotation refers to, and one or
//! more `<AnnotationSet>` elements whose `<Annotation>` records point into
//! that text through `StartNode`/`EndNode` offsets:
//!
//! ```xml
//! <GateDocument>
//!   <TextWithNodes><Node id="0"/>Mary<Node id="4"/> <Node id="5"/>had<Node id="8"/></TextWithNodes>
//!   <AnnotationSet Name="entities">
//!     <Annotation Id="1" Type="PERSON" StartNode="0" EndNode="4"/>
//!   </AnnotationSet>
//! </GateDocument>
//! ```

use std::{fs, path::Path};

use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

use crate::error::{Error, Result};

/// Set GATE fills with the markup of the source format rather than with
/// hand annotations.
pub const ORIGINAL_MARKUPS: &str = "Original markups";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub kind: String,
    pub start: usize,
    pub end: usize,
    /// Name of the enclosing annotation set, `None` for the default set.
    pub set: Option<String>,
}

/// Text slice paired with the type of the annotation covering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub kind: String,
}

impl Span {
    pub fn new(text: &str, kind: &str) -> Self {
        Self { text: text.to_string(), kind: kind.to_string() }
    }
}

#[derive(Debug, Default, Clone)]
pub struct GateDocument {
    pub text: String,
    pub annotations: Vec<Annotation>,
}

impl GateDocument {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let xml = fs::read_to_string(path)?;
        Self::parse(&xml)
    }

    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut doc = GateDocument::default();
        let mut saw_root = false;
        let mut closed_root = false;
        let mut saw_text = false;
        let mut in_text = false;
        let mut set: Option<String> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"GateDocument" => saw_root = true,
                    b"TextWithNodes" => {
                        saw_text = true;
                        in_text = true;
                    }
                    b"AnnotationSet" => set = optional_attr(&e, "Name")?,
                    b"Annotation" => doc.annotations.push(parse_annotation(&e, &set)?),
                    _ => {}
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"TextWithNodes" => saw_text = true,
                    b"Annotation" => doc.annotations.push(parse_annotation(&e, &set)?),
                    _ => {}
                },
                Event::End(e) => match e.name().as_ref() {
                    b"GateDocument" => closed_root = true,
                    b"TextWithNodes" => in_text = false,
                    b"AnnotationSet" => set = None,
                    _ => {}
                },
                Event::Text(t) if in_text => doc.text.push_str(&t.unescape()?),
                Event::CData(t) if in_text => doc.text.push_str(&String::from_utf8_lossy(&t.into_inner())),
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_root {
            return Err(Error::Parse("missing GateDocument element".into()));
        }
        if !saw_text {
            return Err(Error::Parse("missing TextWithNodes element".into()));
        }
        // quick-xml stops at Eof without reporting open elements.
        if in_text || !closed_root {
            return Err(Error::Parse("unexpected end of document".into()));
        }
        Ok(doc)
    }

    /// Text covered by `[start, end)`. Offsets count UTF-16 code units, the
    /// way GATE (a Java program) writes them. Offsets past the end of the text
    /// are clamped, an inverted range is empty.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let units: Vec<u16> = self.text.encode_utf16().collect();
        let end = end.min(units.len());
        let start = start.min(end);
        String::from_utf16_lossy(&units[start..end])
    }

    /// Annotated spans in ascending start order; equal starts keep document
    /// order. With `set == None` every set except [`ORIGINAL_MARKUPS`] is used.
    pub fn spans(&self, set: Option<&str>) -> Vec<Span> {
        let mut selected: Vec<&Annotation> = self
            .annotations
            .iter()
            .filter(|a| match set {
                Some(name) => a.set.as_deref() == Some(name),
                None => a.set.as_deref() != Some(ORIGINAL_MARKUPS),
            })
            .collect();
        selected.sort_by_key(|a| a.start);
        selected
            .into_iter()
            .map(|a| Span { text: self.slice(a.start, a.end), kind: a.kind.clone() })
            .collect()
    }
}

/// Loads the annotated spans of one GATE document.
pub fn load<P: AsRef<Path>>(path: P, set: Option<&str>) -> Result<Vec<Span>> {
    Ok(GateDocument::from_path(path)?.spans(set))
}

fn optional_attr(e: &BytesStart, name: &str) -> Result<Option<String>> {
    match e.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn required_attr(e: &BytesStart, name: &str) -> Result<String> {
    optional_attr(e, name)?.ok_or_else(|| Error::Parse(format!("annotation without {name} attribute")))
}

fn offset_attr(e: &BytesStart, name: &str) -> Result<usize> {
    let value = required_attr(e, name)?;
    value
        .trim()
        .parse()
        .map_err(|_| Error::Parse(format!("invalid {name} offset: {value:?}")))
}

fn parse_annotation(e: &BytesStart, set: &Option<String>) -> Result<Annotation> {
    Ok(Annotation {
        kind: required_attr(e, "Type")?,
        start: offset_attr(e, "StartNode")?,
        end: offset_attr(e, "EndNode")?,
        set: set.clone(),
    })
}
