use crate::error::MetadataResult;
use crate::io::xml::{Element, FromXml};
use crate::meta::versioned::VersionedList;
use crate::params::{FieldMap, FieldReader};

/// The definition of one instrument reading ("actual") recorded alongside each scan
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActualDef {
    pub actual_id: i64,
    pub display_name: String,
    pub data_type: Option<i64>,
    pub display_format: Option<i64>,
    pub display_digits: Option<i64>,
    pub display_effects: Option<i64>,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub extra: FieldMap,
}

impl FromXml for ActualDef {
    fn from_xml(element: &Element) -> MetadataResult<Self> {
        let mut fields = FieldReader::new(element);
        Ok(Self {
            actual_id: fields.require_int("actual_id")?,
            display_name: fields.require_text("display_name")?.to_string(),
            data_type: fields.int("data_type")?,
            display_format: fields.int("display_format")?,
            display_digits: fields.int("display_digits")?,
            display_effects: fields.int("display_effects")?,
            unit: fields.string("unit"),
            category: fields.string("category"),
            extra: fields.finish(),
        })
    }
}

/// The actuals definitions in `MSActualDefs.xml`
pub type ActualsDef = VersionedList<ActualDef>;

impl FromXml for ActualsDef {
    fn from_xml(element: &Element) -> MetadataResult<Self> {
        let mut defs = Self::from_xml_root(element)?;
        defs.extend_from_element::<ActualDef>(element, "ActualDef")?;
        Ok(defs)
    }
}

impl ActualsDef {
    pub fn by_name(&self, display_name: &str) -> Option<&ActualDef> {
        self.iter().find(|d| d.display_name == display_name)
    }

    pub fn by_id(&self, actual_id: i64) -> Option<&ActualDef> {
        self.iter().find(|d| d.actual_id == actual_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_actuals() -> MetadataResult<()> {
        let defs = ActualsDef::from_xml_file("test/data/QC1.d/AcqData/MSActualDefs.xml")?;
        assert_eq!(defs.version(), 1);
        assert_eq!(defs.len(), 2);
        let vac = defs.by_name("TOF Vac").unwrap();
        assert_eq!(vac.actual_id, 2);
        assert_eq!(vac.unit.as_deref(), Some("Torr"));
        assert_eq!(vac.display_digits, Some(2));
        assert_eq!(defs.by_id(1).unwrap().category.as_deref(), Some("Source"));
        assert!(defs.by_name("Fan Speed").is_none());
        Ok(())
    }

    #[test]
    fn test_missing_id() {
        let err = ActualsDef::from_xml_str(
            "<ActualsDef Version=\"1\"><ActualDef><DisplayName>X</DisplayName></ActualDef></ActualsDef>",
        )
        .unwrap_err();
        assert!(matches!(err, crate::error::MetadataError::MissingElement { .. }));
    }
}
