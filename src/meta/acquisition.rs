//! Value types shared by acquisition settings: numeric ranges and scan polarity.
use std::fmt::Display;

use crate::error::{MetadataError, MetadataResult};
use crate::io::xml::Element;

/// A closed interval `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// A degenerate range covering a single value
    pub fn point(value: f64) -> Self {
        Self::new(value, value)
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// The smallest range covering both `self` and `other`
    pub fn span(&self, other: &Range) -> Range {
        Range::new(self.min.min(other.min), self.max.max(other.max))
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

fn bound(element: &Element, name: &str) -> MetadataResult<Option<f64>> {
    let raw = match element.attribute(name) {
        Some(v) => v,
        None => match element.child(name) {
            Some(c) => c.text(),
            None => return Ok(None),
        },
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if !v.is_nan() => Ok(Some(v)),
        _ => Err(MetadataError::malformed(
            format!("{}/{name}", element.name),
            raw,
            "a number",
        )),
    }
}

/// Read one range from an element carrying `Min` and `Max` (as attributes or children),
/// or a single `Value` for a point.
pub fn range_from_element(element: &Element) -> MetadataResult<Range> {
    match (bound(element, "Min")?, bound(element, "Max")?) {
        (Some(min), Some(max)) if min <= max => Ok(Range::new(min, max)),
        (Some(min), Some(max)) => Err(MetadataError::malformed(
            element.name.clone(),
            format!("{min}-{max}"),
            "a range with Min <= Max",
        )),
        (None, None) => match bound(element, "Value")? {
            Some(v) => Ok(Range::point(v)),
            None => Err(MetadataError::MissingElement {
                parent: element.name.clone(),
                name: "Min".into(),
            }),
        },
        (Some(_), None) => Err(MetadataError::MissingElement {
            parent: element.name.clone(),
            name: "Max".into(),
        }),
        (None, Some(_)) => Err(MetadataError::MissingElement {
            parent: element.name.clone(),
            name: "Min".into(),
        }),
    }
}

/**
Normalize a vendor range field to a list of [`Range`].

An absent or empty container gives an empty list. A container of `Range` children
gives one entry per child in document order, and a container that is itself a range
gives a single entry.
*/
pub fn ranges_from_element(container: Option<&Element>) -> MetadataResult<Vec<Range>> {
    let container = match container {
        Some(c) => c,
        None => return Ok(Vec::new()),
    };
    let is_range_itself = ["Min", "Max", "Value"]
        .iter()
        .any(|n| container.attribute(n).is_some() || container.child(n).is_some());
    if is_range_itself {
        return Ok(vec![range_from_element(container)?]);
    }
    container
        .children_named("Range")
        .map(range_from_element)
        .collect()
}

/**
Describes the polarity of a mass spectrum. A spectrum is either `Positive` (1+), `Negative` (-1)
or `Unknown` (0). The `Unknown` state is the default.
*/
#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScanPolarity {
    #[default]
    Unknown = 0,
    Positive = 1,
    Negative = -1,
}

impl ScanPolarity {
    pub fn sign(&self) -> i8 {
        *self as i8
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Positive => "+",
            Self::Negative => "-",
            Self::Unknown => "",
        }
    }
}

/// Vendor polarity codes. The code space includes values like `Mixed` and `Unassigned`
/// which carry no sign.
const POLARITY_CODES: &[(&str, ScanPolarity)] = &[
    ("0", ScanPolarity::Positive),
    ("Positive", ScanPolarity::Positive),
    ("+", ScanPolarity::Positive),
    ("1", ScanPolarity::Negative),
    ("Negative", ScanPolarity::Negative),
    ("-", ScanPolarity::Negative),
    ("2", ScanPolarity::Unknown),
    ("Unassigned", ScanPolarity::Unknown),
    ("3", ScanPolarity::Unknown),
    ("Mixed", ScanPolarity::Unknown),
    ("+-", ScanPolarity::Unknown),
    ("NotApplicable", ScanPolarity::Unknown),
    ("", ScanPolarity::Unknown),
];

/// Map a vendor polarity code through the lookup table, case-insensitively
pub fn polarity_from_code(code: &str) -> MetadataResult<ScanPolarity> {
    let code = code.trim();
    POLARITY_CODES
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(code))
        .map(|(_, v)| *v)
        .ok_or_else(|| MetadataError::UnknownPolarity(code.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_range_normalization() -> MetadataResult<()> {
        let root = Element::parse_str(
            r#"<Root>
                <None/>
                <One><Range><Min>0.047</Min><Max>14.998</Max></Range></One>
                <Many><Range Min="40" Max="100"/><Range Min="100" Max="200"/><Range><Value>195.08</Value></Range></Many>
                <Itself Min="1" Max="2"/>
            </Root>"#,
        )?;
        assert!(ranges_from_element(root.child("Absent"))?.is_empty());
        assert!(ranges_from_element(root.child("None"))?.is_empty());
        assert_eq!(
            ranges_from_element(root.child("One"))?,
            [Range::new(0.047, 14.998)]
        );
        assert_eq!(
            ranges_from_element(root.child("Many"))?,
            [
                Range::new(40.0, 100.0),
                Range::new(100.0, 200.0),
                Range::point(195.08)
            ]
        );
        assert_eq!(ranges_from_element(root.child("Itself"))?, [Range::new(1.0, 2.0)]);
        Ok(())
    }

    #[test]
    fn test_bad_ranges() -> MetadataResult<()> {
        for doc in [
            r#"<R><Range Min="5" Max="1"/></R>"#,
            r#"<R><Range Min="a" Max="1"/></R>"#,
            r#"<R><Range Min="1"/></R>"#,
            r#"<R><Range/></R>"#,
            r#"<R><Range Min="NaN" Max="1"/></R>"#,
            r#"<R><Range><Value>NaN</Value></Range></R>"#,
        ] {
            let root = Element::parse_str(doc)?;
            assert!(ranges_from_element(Some(&root)).is_err(), "{doc}");
        }
        Ok(())
    }

    #[test]
    fn test_range_ops() {
        let r = Range::new(40.0, 100.0);
        assert!(r.contains(40.0));
        assert!(!r.contains(100.1));
        assert_eq!(r.width(), 60.0);
        assert_eq!(r.span(&Range::new(10.0, 50.0)), Range::new(10.0, 100.0));
        assert_eq!(r.to_string(), "40-100");
    }

    #[test]
    fn test_polarity() -> MetadataResult<()> {
        assert_eq!(polarity_from_code("Positive")?, ScanPolarity::Positive);
        assert_eq!(polarity_from_code("negative")?, ScanPolarity::Negative);
        assert_eq!(polarity_from_code("0")?, ScanPolarity::Positive);
        assert_eq!(polarity_from_code("1")?, ScanPolarity::Negative);
        assert_eq!(polarity_from_code("Mixed")?, ScanPolarity::Unknown);
        assert_eq!(polarity_from_code("")?, ScanPolarity::Unknown);
        assert_eq!(ScanPolarity::Negative.sign(), -1);
        assert!(matches!(
            polarity_from_code("sideways"),
            Err(MetadataError::UnknownPolarity(_))
        ));
        Ok(())
    }
}
