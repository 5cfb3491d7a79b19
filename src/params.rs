//! Coercion of XML leaf elements into native values keyed by snake_case names.
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{MetadataError, MetadataResult};
use crate::io::xml::{Element, LeafKind};
use crate::meta::enums::{resolve, CodedEnum, EnumCode, EnumInput};

/**
A coerced leaf value. Which variant is produced is decided by the element's [`LeafKind`].
*/
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Raw(String),
}

impl Value {
    pub fn from_element(element: &Element) -> Value {
        let text = element.text();
        match element.leaf_kind() {
            LeafKind::Int => text
                .parse()
                .map(Value::Int)
                .unwrap_or_else(|_| Value::Raw(text.to_string())),
            LeafKind::Float => text
                .parse()
                .map(Value::Float)
                .unwrap_or_else(|_| Value::Raw(text.to_string())),
            LeafKind::Text => Value::Text(text.to_string()),
            LeafKind::Raw => Value::Raw(text.to_string()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(_) => None,
            Self::Text(s) | Self::Raw(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) | Self::Raw(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Int(0) => Some(false),
            Self::Int(1) => Some(true),
            Self::Text(s) | Self::Raw(s) => parse_bool(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) | Self::Raw(s) => Cow::Borrowed(s.as_str()),
            Self::Int(i) => Cow::Owned(i.to_string()),
            Self::Float(f) => Cow::Owned(f.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Raw(s) if s.is_empty())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

pub(crate) fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") || text == "1" {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") || text == "0" {
        Some(false)
    } else {
        None
    }
}

/// Convert a CamelCase name to snake_case: `MSLevel` becomes `ms_level` and `DeviceID` becomes `device_id`.
pub fn camel_to_snake(name: &str) -> String {
    static WORD: OnceLock<Regex> = OnceLock::new();
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    let word = WORD.get_or_init(|| Regex::new("(.)([A-Z][a-z]+)").unwrap());
    let boundary = BOUNDARY.get_or_init(|| Regex::new("([a-z0-9])([A-Z])").unwrap());
    let name = word.replace_all(name, "${1}_${2}");
    boundary.replace_all(&name, "${1}_${2}").to_lowercase()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NamespaceRule {
    /// Keep tags exactly as written, including any `{namespace}` prefix
    #[default]
    Keep,
    /// Remove this one namespace prefix
    Strip(String),
    /// Remove whatever namespace prefix a tag carries
    StripAll,
}

/**
How tag names become canonical keys: an optional namespace strip, then an
explicit override lookup, then [`camel_to_snake`].
*/
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyTransform {
    pub namespace: NamespaceRule,
    pub overrides: HashMap<String, String>,
}

impl KeyTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// The transform the metadata parsers use, ignoring namespaces entirely
    pub fn local() -> Self {
        Self {
            namespace: NamespaceRule::StripAll,
            overrides: HashMap::new(),
        }
    }

    pub fn with_namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.namespace = NamespaceRule::Strip(namespace.into());
        self
    }

    pub fn with_override<K: Into<String>, V: Into<String>>(mut self, tag: K, key: V) -> Self {
        self.overrides.insert(tag.into(), key.into());
        self
    }

    pub fn canonical_key(&self, tag: &str) -> String {
        let name = match &self.namespace {
            NamespaceRule::Keep => tag,
            NamespaceRule::Strip(ns) => tag
                .strip_prefix('{')
                .and_then(|rest| rest.strip_prefix(ns.as_str()))
                .and_then(|rest| rest.strip_prefix('}'))
                .unwrap_or(tag),
            NamespaceRule::StripAll => match tag.strip_prefix('{') {
                Some(rest) => rest.split_once('}').map(|(_, local)| local).unwrap_or(tag),
                None => tag,
            },
        };
        match self.overrides.get(name) {
            Some(key) => key.clone(),
            None => camel_to_snake(name),
        }
    }
}

/**
An ordered mapping from canonical key to coerced value.

Keys keep the position of their first occurrence; a repeated key takes the value of
its last occurrence.
*/
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldMap(IndexMap<String, Value>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>>(&mut self, key: K, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<'a> IntoIterator for &'a FieldMap {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Build a [`FieldMap`] from the direct children of `element`. This never fails:
/// anything that can't be read as a number is kept as text.
pub fn fields_from_element(element: &Element, transform: &KeyTransform) -> FieldMap {
    let mut fields = FieldMap::new();
    for child in element.children.iter() {
        fields.insert(transform.canonical_key(&child.tag()), Value::from_element(child));
    }
    fields
}

/**
Typed access to the children of a record element by canonical key.

Every key read is marked as consumed; [`FieldReader::finish`] collects whatever is
left into a [`FieldMap`] so vendor fields without a dedicated accessor are carried
along rather than dropped.
*/
#[derive(Debug)]
pub struct FieldReader<'a> {
    element: &'a Element,
    transform: KeyTransform,
    index: HashMap<String, &'a Element>,
    consumed: HashSet<String>,
}

impl<'a> FieldReader<'a> {
    pub fn new(element: &'a Element) -> Self {
        Self::with_transform(element, KeyTransform::local())
    }

    pub fn with_transform(element: &'a Element, transform: KeyTransform) -> Self {
        let mut index = HashMap::new();
        for child in element.children.iter() {
            index.insert(transform.canonical_key(&child.tag()), child);
        }
        Self {
            element,
            transform,
            index,
            consumed: HashSet::new(),
        }
    }

    pub fn element(&self) -> &'a Element {
        self.element
    }

    /// Mark `key` as handled without reading it
    pub fn skip(&mut self, key: &str) {
        self.consumed.insert(key.to_string());
    }

    pub fn node(&mut self, key: &str) -> Option<&'a Element> {
        self.consumed.insert(key.to_string());
        self.index.get(key).copied()
    }

    pub fn text(&mut self, key: &str) -> Option<&'a str> {
        self.node(key).map(|e| e.text())
    }

    /// The text of `key`, treating an empty element the same as an absent one
    pub fn string(&mut self, key: &str) -> Option<String> {
        self.text(key).filter(|s| !s.is_empty()).map(String::from)
    }

    pub fn value(&mut self, key: &str) -> Option<Value> {
        self.node(key).map(Value::from_element)
    }

    /// The value of the attribute `attribute` on the record element, or else the text of the child `key`
    pub fn attribute_or_text(&mut self, attribute: &str, key: &str) -> Option<&'a str> {
        match self.element.attribute(attribute) {
            Some(v) => {
                self.consumed.insert(key.to_string());
                Some(v)
            }
            None => self.text(key).filter(|s| !s.is_empty()),
        }
    }

    pub fn require_text(&mut self, key: &str) -> MetadataResult<&'a str> {
        self.text(key)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| self.missing(key))
    }

    pub fn parse<T: FromStr>(&mut self, key: &str, expected: &'static str) -> MetadataResult<Option<T>> {
        match self.node(key) {
            Some(node) if !node.text().is_empty() => node
                .text()
                .parse()
                .map(Some)
                .map_err(|_| MetadataError::malformed(node.name.clone(), node.text(), expected)),
            _ => Ok(None),
        }
    }

    pub fn int(&mut self, key: &str) -> MetadataResult<Option<i64>> {
        self.parse(key, "an integer")
    }

    pub fn float(&mut self, key: &str) -> MetadataResult<Option<f64>> {
        self.parse(key, "a number")
    }

    pub fn bool(&mut self, key: &str) -> MetadataResult<Option<bool>> {
        match self.node(key) {
            Some(node) if !node.text().is_empty() => parse_bool(node.text())
                .map(Some)
                .ok_or_else(|| MetadataError::malformed(node.name.clone(), node.text(), "a boolean")),
            _ => Ok(None),
        }
    }

    pub fn require_int(&mut self, key: &str) -> MetadataResult<i64> {
        self.int(key)?.ok_or_else(|| self.missing(key))
    }

    pub fn require_float(&mut self, key: &str) -> MetadataResult<f64> {
        self.float(key)?.ok_or_else(|| self.missing(key))
    }

    /// Resolve the text of `key` as a member of `E`. Absent or empty elements give `None`,
    /// unrecognized codes are an error.
    pub fn enumeration<E, D>(&mut self, key: &str, decoder: D) -> MetadataResult<Option<E>>
    where
        E: CodedEnum,
        D: Fn(&str) -> Option<EnumCode>,
    {
        match self.text(key) {
            Some(text) if !text.is_empty() => resolve(EnumInput::Raw(text), decoder).map(Some),
            _ => Ok(None),
        }
    }

    pub fn require_enumeration<E, D>(&mut self, key: &str, decoder: D) -> MetadataResult<E>
    where
        E: CodedEnum,
        D: Fn(&str) -> Option<EnumCode>,
    {
        self.enumeration(key, decoder)?.ok_or_else(|| self.missing(key))
    }

    fn missing(&self, key: &str) -> MetadataError {
        MetadataError::MissingElement {
            parent: self.element.name.clone(),
            name: key.to_string(),
        }
    }

    /// Coerce every child that wasn't read into a [`FieldMap`], in document order
    pub fn finish(self) -> FieldMap {
        let mut rest = FieldMap::new();
        for child in self.element.children.iter() {
            let key = self.transform.canonical_key(&child.tag());
            if !self.consumed.contains(&key) {
                rest.insert(key, Value::from_element(child));
            }
        }
        rest
    }
}
