use std::ops::{Deref, Index};
use std::slice;

use log::trace;

use crate::error::{MetadataError, MetadataResult};
use crate::io::xml::{Element, FromXml};

/// Read the schema version of a document root, from either a `Version` attribute or a `Version` child
pub fn read_version(element: &Element) -> MetadataResult<u32> {
    let raw = element
        .attribute("Version")
        .or_else(|| element.child("Version").map(|c| c.text()))
        .ok_or_else(|| MetadataError::MalformedVersion(String::new()))?;
    let text = raw.trim();
    if let Ok(version) = text.parse() {
        return Ok(version);
    }
    // Some writers emit the version as a float, e.g. `1.0`
    match text.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&v) => Ok(v as u32),
        _ => Err(MetadataError::MalformedVersion(raw.to_string())),
    }
}

/**
An ordered list of records read from repeated sibling elements, tagged with the
schema version of the document they came from.

The version is fixed when the list is created. Records can only be added by
[`VersionedList::append_from_element`] and [`VersionedList::extend_from_element`];
read access is through the slice this dereferences to.
*/
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VersionedList<T> {
    version: u32,
    records: Vec<T>,
}

impl<T> VersionedList<T> {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            records: Vec::new(),
        }
    }

    /// Create an empty list carrying the version declared by `element`
    pub fn from_xml_root(element: &Element) -> MetadataResult<Self> {
        Ok(Self::new(read_version(element)?))
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /**
    Build a record with `builder` from each direct child of `element` named `name`,
    appending them in document order. No matching children is not an error.
    The first failure is returned and nothing after it is appended.
    */
    pub fn append_from_element<F>(
        &mut self,
        element: &Element,
        name: &str,
        mut builder: F,
    ) -> MetadataResult<&mut Self>
    where
        F: FnMut(&Element) -> MetadataResult<T>,
    {
        let before = self.records.len();
        for child in element.children_named(name) {
            self.records.push(builder(child)?);
        }
        trace!(
            "Appended {} <{name}> records to <{}>",
            self.records.len() - before,
            element.name
        );
        Ok(self)
    }

    /// [`append_from_element`](Self::append_from_element) using `C`'s [`FromXml`] implementation
    pub fn extend_from_element<C>(&mut self, element: &Element, name: &str) -> MetadataResult<&mut Self>
    where
        C: FromXml + Into<T>,
    {
        self.append_from_element(element, name, |child| C::from_xml(child).map(Into::into))
    }

    pub fn as_slice(&self) -> &[T] {
        &self.records
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.records.iter()
    }
}

impl<T> Deref for VersionedList<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

impl<T> Index<usize> for VersionedList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.records[index]
    }
}

impl<'a, T> IntoIterator for &'a VersionedList<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl<T> IntoIterator for VersionedList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Entry {
        A(String),
        B(i64),
    }

    struct B(i64);

    impl FromXml for B {
        fn from_xml(element: &Element) -> MetadataResult<Self> {
            element
                .text()
                .parse()
                .map(B)
                .map_err(|_| MetadataError::malformed("B", element.text(), "an integer"))
        }
    }

    impl From<B> for Entry {
        fn from(value: B) -> Self {
            Entry::B(value.0)
        }
    }

    #[test]
    fn test_append_order() -> MetadataResult<()> {
        let root = Element::parse_str(
            "<Root><Version>3</Version><B>1</B><A>x</A><B>2</B><A>y</A><C/></Root>",
        )?;
        let mut list: VersionedList<Entry> = VersionedList::from_xml_root(&root)?;
        assert_eq!(list.version(), 3);
        assert!(list.is_empty());

        list.append_from_element(&root, "A", |e| Ok(Entry::A(e.text().to_string())))?
            .extend_from_element::<B>(&root, "B")?
            .append_from_element(&root, "Missing", |_| unreachable!())?;

        assert_eq!(list.len(), 4);
        assert_eq!(list.version(), 3);
        assert_eq!(
            list.as_slice(),
            [
                Entry::A("x".into()),
                Entry::A("y".into()),
                Entry::B(1),
                Entry::B(2)
            ]
        );
        assert_eq!(list[2], Entry::B(1));
        assert_eq!(list.iter().count(), 4);
        Ok(())
    }

    #[test]
    fn test_version() -> MetadataResult<()> {
        let root = Element::parse_str(r#"<Root Version="7"/>"#)?;
        assert_eq!(read_version(&root)?, 7);

        let root = Element::parse_str("<Root><Version>2.0</Version></Root>")?;
        assert_eq!(read_version(&root)?, 2);

        for doc in [
            "<Root/>",
            "<Root><Version>one</Version></Root>",
            "<Root><Version>-1</Version></Root>",
            "<Root><Version>1.5</Version></Root>",
            "<Root><Version>NaN</Version></Root>",
        ] {
            let root = Element::parse_str(doc)?;
            assert!(matches!(
                VersionedList::<Entry>::from_xml_root(&root),
                Err(MetadataError::MalformedVersion(_))
            ));
        }
        Ok(())
    }

    #[test]
    fn test_fail_fast() -> MetadataResult<()> {
        let root = Element::parse_str("<Root Version=\"1\"><B>1</B><B>x</B><B>3</B></Root>")?;
        let mut list: VersionedList<Entry> = VersionedList::from_xml_root(&root)?;
        let err = list.extend_from_element::<B>(&root, "B").unwrap_err();
        assert!(matches!(err, MetadataError::MalformedValue { .. }));
        Ok(())
    }
}
