use crate::error::{MetadataError, MetadataResult};
use crate::io::xml::{Element, FromXml};
use crate::meta::acquisition::{ranges_from_element, Range};
use crate::meta::enums::{decode_any, CalibrationTechnique};
use crate::meta::versioned::VersionedList;
use crate::params::{FieldMap, FieldReader};

/// One stage of a mass calibration, applied in order of `number`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationStep {
    pub number: i64,
    pub technique: CalibrationTechnique,
    pub coefficients: Vec<f64>,
    pub mass_ranges: Vec<Range>,
    pub extra: FieldMap,
}

/// Coefficients are written either as `Coefficient` children or as a single
/// whitespace or comma separated list
fn read_coefficients(element: &Element) -> MetadataResult<Vec<f64>> {
    let parse = |raw: &str| {
        raw.trim()
            .parse::<f64>()
            .map_err(|_| MetadataError::malformed("Coefficient", raw, "a number"))
    };
    if element.is_leaf() {
        element
            .text()
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(parse)
            .collect()
    } else {
        element
            .children_named("Coefficient")
            .map(|c| parse(c.text()))
            .collect()
    }
}

impl FromXml for CalibrationStep {
    fn from_xml(element: &Element) -> MetadataResult<Self> {
        let mut fields = FieldReader::new(element);
        let number = match fields.attribute_or_text("Number", "number") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| MetadataError::malformed("Step/Number", raw, "an integer"))?,
            None => fields.require_int("number")?,
        };
        let technique = fields.require_enumeration("calibration_technique", decode_any)?;
        let coefficients = match fields.node("coefficients") {
            Some(node) => read_coefficients(node)?,
            None => Vec::new(),
        };
        let mass_ranges = ranges_from_element(fields.node("mass_range"))?;
        Ok(Self {
            number,
            technique,
            coefficients,
            mass_ranges,
            extra: fields.finish(),
        })
    }
}

/// A complete mass calibration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Calibration {
    pub calibration_id: i64,
    /// Whether this came from the `DefaultCalibration` element
    pub is_default: bool,
    pub steps: Vec<CalibrationStep>,
    pub extra: FieldMap,
}

impl Calibration {
    pub fn step(&self, number: i64) -> Option<&CalibrationStep> {
        self.steps.iter().find(|s| s.number == number)
    }
}

impl FromXml for Calibration {
    fn from_xml(element: &Element) -> MetadataResult<Self> {
        let mut fields = FieldReader::new(element);
        fields.skip("step");
        let steps = element
            .children_named("Step")
            .map(CalibrationStep::from_xml)
            .collect::<MetadataResult<Vec<_>>>()?;
        Ok(Self {
            calibration_id: fields.require_int("calibration_id")?,
            is_default: false,
            steps,
            extra: fields.finish(),
        })
    }
}

/// The calibration table in `DefaultMassCal.xml`
pub type CalibrationList = VersionedList<Calibration>;

impl FromXml for CalibrationList {
    fn from_xml(element: &Element) -> MetadataResult<Self> {
        let mut calibrations = Self::from_xml_root(element)?;
        calibrations
            .append_from_element(element, "DefaultCalibration", |e| {
                let mut cal = Calibration::from_xml(e)?;
                cal.is_default = true;
                Ok(cal)
            })?
            .extend_from_element::<Calibration>(element, "Calibration")?;
        Ok(calibrations)
    }
}

impl CalibrationList {
    pub fn default_calibration(&self) -> Option<&Calibration> {
        self.iter().find(|c| c.is_default)
    }

    pub fn by_id(&self, calibration_id: i64) -> Option<&Calibration> {
        self.iter().find(|c| c.calibration_id == calibration_id)
    }
}
