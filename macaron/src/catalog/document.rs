//! Generic dictionary view of the catalog XML.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use xml::reader::{EventReader, XmlEvent};

use super::record::DriverPackageRecord;
use super::{CatalogError, CatalogResult};

/// Element name of a catalog dictionary.
const DICT_ELEMENT: &str = "dict";

/// One `dict` element: its text-only direct children, in order.
///
/// Children that themselves contain elements (nested `dict`s, arrays) are
/// not recorded as entries; nested `dict`s appear as their own
/// [`CatalogDict`] in the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogDict {
    entries: Vec<(String, String)>,
}

impl CatalogDict {
    /// Create a dictionary from `(name, text)` pairs.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Text of the first child with the given name.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Text of every child with the given name, in order.
    pub fn all(&self, name: &str) -> impl Iterator<Item = &str> + '_ {
        let name = name.to_owned();
        self.entries
            .iter()
            .filter(move |(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// All `(name, text)` pairs.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }
}

/// The parsed catalog: every `dict` element in document order.
///
/// Order follows the opening tags, so an enclosing `dict` comes before the
/// `dict`s nested inside it.
#[derive(Debug, Clone, Default)]
pub struct CatalogDocument {
    dicts: Vec<CatalogDict>,
}

/// A direct child of a `dict` whose text is being collected.
struct Capture {
    dict: usize,
    depth: usize,
    name: String,
    text: String,
    has_elements: bool,
}

enum Frame {
    Dict(usize),
    Element,
}

impl CatalogDocument {
    /// Load and parse a catalog file.
    pub fn from_file(path: &Path) -> CatalogResult<Self> {
        let file = File::open(path).map_err(|e| CatalogError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse a catalog from any reader.
    pub fn from_reader<R: Read>(reader: R) -> CatalogResult<Self> {
        let mut dicts: Vec<CatalogDict> = Vec::new();
        let mut frames: Vec<Frame> = Vec::new();
        let mut captures: Vec<Capture> = Vec::new();

        for event in EventReader::new(reader) {
            let event = event.map_err(|e| CatalogError::Malformed(e.to_string()))?;

            match event {
                XmlEvent::StartElement { name, .. } => {
                    let depth = frames.len();

                    if let Some(capture) = captures.last_mut() {
                        capture.has_elements = true;
                    }

                    if let Some(Frame::Dict(dict)) = frames.last() {
                        captures.push(Capture {
                            dict: *dict,
                            depth,
                            name: name.local_name.clone(),
                            text: String::new(),
                            has_elements: false,
                        });
                    }

                    if name.local_name == DICT_ELEMENT {
                        dicts.push(CatalogDict::default());
                        frames.push(Frame::Dict(dicts.len() - 1));
                    } else {
                        frames.push(Frame::Element);
                    }
                }
                XmlEvent::EndElement { .. } => {
                    frames.pop();
                    let depth = frames.len();

                    if matches!(captures.last(), Some(c) if c.depth == depth) {
                        if let Some(capture) = captures.pop() {
                            if !capture.has_elements {
                                dicts[capture.dict]
                                    .entries
                                    .push((capture.name, capture.text));
                            }
                        }
                    }
                }
                XmlEvent::Characters(text) | XmlEvent::CData(text) | XmlEvent::Whitespace(text) => {
                    if let Some(capture) = captures.last_mut() {
                        if !capture.has_elements {
                            capture.text.push_str(&text);
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(Self { dicts })
    }

    /// Number of `dict` elements.
    pub fn len(&self) -> usize {
        self.dicts.len()
    }

    /// Whether the document contains no `dict` elements.
    pub fn is_empty(&self) -> bool {
        self.dicts.is_empty()
    }

    /// The dictionaries in document order.
    pub fn dicts(&self) -> &[CatalogDict] {
        &self.dicts
    }

    /// Project every dictionary into a driver package record.
    pub fn records(&self) -> Vec<DriverPackageRecord> {
        self.dicts.iter().map(DriverPackageRecord::from_dict).collect()
    }
}
