//! A small, owned XML element tree and the entry points for building typed
//! records out of XML documents.
//!
//! Agilent's metadata documents are tiny, so each one is read in full with
//! [`quick_xml::NsReader`] into an [`Element`] tree, the file is closed, and only
//! then are records constructed from the tree with [`FromXml`].
use std::borrow::Cow;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use indexmap::IndexMap;
use log::warn;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use crate::error::{MetadataError, MetadataResult};

/// The deepest element nesting the tree builder will accept
pub const MAX_DEPTH: usize = 256;

/**
The primitive type a leaf element's text will be coerced to.

An explicit `xsi:type` or `py:pytype` annotation is honored when the text agrees with it,
otherwise the kind is inferred from the text itself.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafKind {
    Int,
    Float,
    Text,
    Raw,
}

impl LeafKind {
    fn from_annotation(annotation: &str) -> Option<Self> {
        let annotation = annotation.rsplit(':').next().unwrap_or(annotation);
        match annotation.to_ascii_lowercase().as_str() {
            "int" | "long" | "integer" | "short" => Some(Self::Int),
            "float" | "double" | "decimal" => Some(Self::Float),
            "str" | "string" => Some(Self::Text),
            _ => None,
        }
    }

    fn accepts(&self, text: &str) -> bool {
        match self {
            Self::Int => is_integer(text),
            Self::Float => text.parse::<f64>().is_ok(),
            Self::Text | Self::Raw => true,
        }
    }

    fn infer(text: &str) -> Self {
        if text.is_empty()
            || text.eq_ignore_ascii_case("true")
            || text.eq_ignore_ascii_case("false")
        {
            Self::Raw
        } else if is_integer(text) {
            Self::Int
        } else if is_float(text) {
            Self::Float
        } else {
            Self::Text
        }
    }
}

fn is_integer(text: &str) -> bool {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) && text.parse::<i64>().is_ok()
}

fn is_float(text: &str) -> bool {
    // `f64::from_str` also accepts words like "inf" and "NaN", which are names, not numbers here
    text.bytes().any(|b| b.is_ascii_digit()) && text.parse::<f64>().is_ok()
}

/**
An XML element with its resolved namespace, attributes, and either text or children.

An element is a leaf or a container, never both: text interleaved with child elements
is dropped when the tree is built.
*/
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: IndexMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = Some(text.into());
        self.children.clear();
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.text = None;
        self.children.push(child);
        self
    }

    pub fn with_attribute<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// The element's local name
    pub fn local_name(&self) -> &str {
        &self.name
    }

    /// The tag in Clark notation, `{namespace}LocalName`, or just the local name
    /// when the element is not in a namespace.
    pub fn tag(&self) -> Cow<'_, str> {
        match &self.namespace {
            Some(ns) => Cow::Owned(format!("{{{ns}}}{}", self.name)),
            None => Cow::Borrowed(&self.name),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The leaf text, or an empty string for containers and empty elements
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// Look up an attribute by its qualified name, falling back to its local name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        if let Some(v) = self.attributes.get(name) {
            return Some(v.as_str());
        }
        self.attributes
            .iter()
            .find(|(k, _)| k.rsplit(':').next() == Some(name))
            .map(|(_, v)| v.as_str())
    }

    /// The first direct child with the local name `name`
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn require_child(&self, name: &str) -> MetadataResult<&Element> {
        self.child(name).ok_or_else(|| MetadataError::MissingElement {
            parent: self.name.clone(),
            name: name.to_string(),
        })
    }

    /// Every direct child with the local name `name`, in document order
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn leaf_kind(&self) -> LeafKind {
        if !self.is_leaf() {
            return LeafKind::Raw;
        }
        let text = self.text();
        let annotated = self
            .attribute("pytype")
            .or_else(|| self.attribute("type"))
            .and_then(LeafKind::from_annotation);
        match annotated {
            Some(kind) if kind.accepts(text) => kind,
            Some(kind) => {
                warn!("<{}> is annotated as {kind:?} but holds {text:?}", self.name);
                LeafKind::infer(text)
            }
            _ => LeafKind::infer(text),
        }
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(|c| c.depth()).max().unwrap_or(0)
    }

    /// Read a complete document from `reader` and return its root element
    pub fn from_reader<R: BufRead>(reader: R) -> MetadataResult<Element> {
        let mut reader = NsReader::from_reader(reader);
        reader.trim_text(true);
        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let (ns, event) = reader.read_resolved_event_into(&mut buf)?;
            let namespace = match ns {
                ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.0).into_owned()),
                _ => None,
            };
            match event {
                Event::Start(e) => {
                    if stack.len() >= MAX_DEPTH {
                        return Err(MetadataError::NestingTooDeep(MAX_DEPTH));
                    }
                    stack.push(element_from_start(&e, namespace)?);
                }
                Event::Empty(e) => {
                    if stack.len() >= MAX_DEPTH {
                        return Err(MetadataError::NestingTooDeep(MAX_DEPTH));
                    }
                    let element = element_from_start(&e, namespace)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        MetadataError::MalformedDocument("closing tag without an opening tag".into())
                    })?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(t) => {
                    let text = t.unescape()?;
                    push_text(&mut stack, &text);
                }
                Event::CData(c) => {
                    let raw = c.into_inner();
                    push_text(&mut stack, &String::from_utf8_lossy(&raw));
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(MetadataError::MalformedDocument(format!(
                "<{}> was never closed",
                open.name
            )));
        }
        root.ok_or_else(|| MetadataError::MalformedDocument("no root element".into()))
    }

    pub fn parse_str(text: &str) -> MetadataResult<Element> {
        Self::from_reader(text.as_bytes())
    }

    /// Read the document at `path`. The file handle is released before this returns.
    pub fn from_path<P: AsRef<Path>>(path: P) -> MetadataResult<Element> {
        let path = path.as_ref();
        let handle = fs::File::open(path).map_err(|e| io_error(path, e))?;
        Self::from_reader(BufReader::new(handle)).map_err(|e| e.in_file(path))
    }
}

fn io_error(path: &Path, source: io::Error) -> MetadataError {
    MetadataError::IOError {
        path: path.to_path_buf(),
        source,
    }
}

fn element_from_start(event: &BytesStart<'_>, namespace: Option<String>) -> MetadataResult<Element> {
    let name = String::from_utf8_lossy(event.local_name().as_ref()).into_owned();
    let mut element = Element {
        name,
        namespace,
        ..Default::default()
    };
    for attr in event.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let value = attr.unescape_value()?.into_owned();
        element.attributes.insert(key, value);
    }
    Ok(element)
}

fn push_text(stack: &mut [Element], text: &str) {
    if let Some(current) = stack.last_mut() {
        if current.children.is_empty() {
            current.text.get_or_insert_with(String::new).push_str(text);
        }
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> MetadataResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.text = None;
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(MetadataError::MalformedDocument(format!(
            "a second root element <{}> was found",
            element.name
        ))),
    }
}

/// Construct a value from an XML element. Implementations fail fast on the
/// first malformed field.
pub trait FromXml: Sized {
    fn from_xml(element: &Element) -> MetadataResult<Self>;

    fn from_xml_str(text: &str) -> MetadataResult<Self> {
        Self::from_xml(&Element::parse_str(text)?)
    }

    fn from_xml_reader<R: BufRead>(reader: R) -> MetadataResult<Self> {
        Self::from_xml(&Element::from_reader(reader)?)
    }

    fn from_xml_file<P: AsRef<Path>>(path: P) -> MetadataResult<Self> {
        let path = path.as_ref();
        let root = Element::from_path(path)?;
        Self::from_xml(&root).map_err(|e| e.in_file(path))
    }
}
